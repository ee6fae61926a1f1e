//! Error handling types for musicbridge
//!
//! This module provides the error taxonomy shared by the bridge, the typed
//! SDK surface and the queue reconciler.

use std::collections::BTreeMap;
use std::sync::{MutexGuard, PoisonError};

use thiserror::Error;

use crate::bridge::DecodingError;
use crate::catalog::CatalogError;

/// Comprehensive error type for calls into the embedded runtime
#[derive(Debug, Error)]
pub enum BridgeError {
    /// The injected script threw, or the runtime refused to evaluate it.
    ///
    /// `fragment` holds the script text that was evaluated, when known, so the
    /// failure can be diagnosed without reproducing it.
    #[error("Error evaluating JavaScript: {message}")]
    JavaScript {
        message: String,
        fragment: Option<String>,
    },

    /// The awaited asynchronous operation inside the runtime rejected
    #[error("Runtime rejected promise: {context:?}")]
    PromiseRejected { context: BTreeMap<String, String> },

    /// A successful response could not be converted to the expected type
    #[error(transparent)]
    Decoding(#[from] DecodingError),

    /// Catalog collaborator failure (transport, status, envelope, empty response)
    #[error("Catalog request failed: {0}")]
    Catalog(#[from] CatalogError),

    /// The host page of the runtime failed to load
    #[error("Runtime page navigation failed: {message}")]
    NavigationFailed { message: String },

    /// The runtime reported that it could not finish loading
    #[error("{message}")]
    LoadingFailed { message: String },

    /// The runtime did not signal readiness before the load watchdog expired
    #[error("Runtime was not loaded after a timeout of {secs} seconds")]
    Timeout { secs: u64 },

    /// The continuation of a call was dropped before the runtime answered
    #[error("Call was abandoned before the runtime responded")]
    Abandoned,

    /// A local queue edit was attempted while another update was in flight
    #[error("Queue update already in progress")]
    QueueBusy,

    /// The local mirror and the runtime queue disagree on the queue length
    #[error("Local queue has {local} items but the runtime reports {remote}")]
    QueueOutOfSync { local: usize, remote: usize },

    /// One of the independent removals of a write-back failed
    #[error("Write-back removal at index {index} failed: {source}")]
    WriteBackIncomplete {
        index: usize,
        #[source]
        source: Box<BridgeError>,
    },
}

/// Result type for bridge operations
pub type BridgeResult<T> = Result<T, BridgeError>;

/// Helper functions for common error patterns
impl BridgeError {
    /// Create a JavaScript evaluation error carrying the originating fragment
    pub fn javascript(message: impl Into<String>, fragment: Option<String>) -> Self {
        BridgeError::JavaScript {
            message: message.into(),
            fragment,
        }
    }

    /// Create a navigation failure
    pub fn navigation_failed(message: impl Into<String>) -> Self {
        BridgeError::NavigationFailed {
            message: message.into(),
        }
    }

    /// Create a loading failure
    pub fn loading_failed(message: impl Into<String>) -> Self {
        BridgeError::LoadingFailed {
            message: message.into(),
        }
    }

    /// Create a promise rejection with a single context entry
    pub fn rejected(key: impl Into<String>, value: impl Into<String>) -> Self {
        let mut context = BTreeMap::new();
        context.insert(key.into(), value.into());
        BridgeError::PromiseRejected { context }
    }
}

/// Helper trait to recover a guard from a poisoned mutex
pub trait LockResultExt<'a, T> {
    /// Recover the guard from a poisoned lock, logging which operation hit it.
    ///
    /// Bridge state is only mutated inside short critical sections that never
    /// run caller code, so the data behind a poisoned lock is still coherent.
    fn recover_poison(self, context: &str) -> MutexGuard<'a, T>;
}

impl<'a, T> LockResultExt<'a, T>
    for Result<MutexGuard<'a, T>, PoisonError<MutexGuard<'a, T>>>
{
    fn recover_poison(self, context: &str) -> MutexGuard<'a, T> {
        match self {
            Ok(guard) => guard,
            Err(poisoned) => {
                log::warn!(
                    target: "musicbridge::lock_recovery",
                    "Recovered from poisoned lock in {}",
                    context
                );
                poisoned.into_inner()
            }
        }
    }
}
