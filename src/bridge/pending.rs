//! Future adapter over callback-style bridge calls.

use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll};

use tokio::sync::oneshot;

use super::host::{ErrorHandler, SuccessHandler};
use crate::error::{BridgeError, BridgeResult, LockResultExt};

/// Result of a bridge call that has not completed yet.
///
/// Resolves exactly once. If the bridge drops the continuation without
/// calling it (for example because the bridge itself was dropped), the
/// future resolves to [`BridgeError::Abandoned`].
#[must_use = "a Pending does nothing unless awaited"]
pub struct Pending<T> {
    receiver: oneshot::Receiver<BridgeResult<T>>,
}

/// Sending half of a [`Pending`].
pub struct Completer<T> {
    sender: oneshot::Sender<BridgeResult<T>>,
}

impl<T> Completer<T> {
    /// Resolve the paired [`Pending`].
    pub fn complete(self, result: BridgeResult<T>) {
        // A dropped receiver means nobody awaits the result any more.
        let _ = self.sender.send(result);
    }
}

impl<T> Pending<T> {
    /// Create a connected completer/future pair.
    pub fn pair() -> (Completer<T>, Pending<T>) {
        let (sender, receiver) = oneshot::channel();
        (Completer { sender }, Pending { receiver })
    }

    /// A future that is already complete.
    pub fn resolved(result: BridgeResult<T>) -> Self {
        let (completer, pending) = Self::pair();
        completer.complete(result);
        pending
    }
}

impl<T> Future for Pending<T> {
    type Output = BridgeResult<T>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.receiver)
            .poll(cx)
            .map(|received| received.unwrap_or(Err(BridgeError::Abandoned)))
    }
}

/// Split one completer into the success and error handlers the callback API
/// takes. Whichever runs first completes the future.
pub(crate) fn completion<T: Send + 'static>() -> (SuccessHandler<T>, ErrorHandler, Pending<T>) {
    let (completer, pending) = Pending::pair();
    let shared = Arc::new(Mutex::new(Some(completer)));
    let on_error_slot = shared.clone();

    let on_success: SuccessHandler<T> = Box::new(move |value| {
        if let Some(completer) = take_completer(&shared) {
            completer.complete(Ok(value));
        }
    });
    let on_error: ErrorHandler = Box::new(move |error| {
        if let Some(completer) = take_completer(&on_error_slot) {
            completer.complete(Err(error));
        }
    });
    (on_success, on_error, pending)
}

fn take_completer<T>(slot: &Mutex<Option<Completer<T>>>) -> Option<Completer<T>> {
    slot.lock().recover_poison("pending::completion").take()
}
