//! In-memory stand-ins for the embedded runtime and the remote queue.
//!
//! Compiled for the crate's own tests and behind the `testing` feature for
//! integration tests. Neither type talks to a real runtime.

use std::collections::BTreeSet;
use std::sync::Mutex;

use serde_json::Value;

use crate::bridge::{EvalCompletion, PageRequest, Pending, ScriptChannel, ScriptError};
use crate::domain::{MediaId, MediaItem, MediaItemAttributes};
use crate::error::{BridgeError, BridgeResult, LockResultExt};
use crate::queue::QueueRemote;

type Responder = Box<dyn Fn(&str) -> Option<Result<Value, ScriptError>> + Send + Sync>;

#[derive(Default)]
struct ChannelLog {
    executed: Vec<String>,
    registered: Vec<String>,
    unregistered: Vec<String>,
    loads: Vec<PageRequest>,
    completions: Vec<(String, EvalCompletion)>,
}

/// A [`ScriptChannel`] that records everything sent to it.
///
/// Without a responder, completions are kept until taken with
/// [`take_completions`](Self::take_completions). With one, the responder
/// decides per script whether the completion fires right away.
#[derive(Default)]
pub struct RecordingChannel {
    log: Mutex<ChannelLog>,
    responder: Option<Responder>,
}

impl RecordingChannel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_responder<F>(responder: F) -> Self
    where
        F: Fn(&str) -> Option<Result<Value, ScriptError>> + Send + Sync + 'static,
    {
        Self {
            log: Mutex::default(),
            responder: Some(Box::new(responder)),
        }
    }

    pub fn executed(&self) -> Vec<String> {
        self.log().executed.clone()
    }

    pub fn registered(&self) -> Vec<String> {
        self.log().registered.clone()
    }

    pub fn unregistered(&self) -> Vec<String> {
        self.log().unregistered.clone()
    }

    pub fn loads(&self) -> Vec<PageRequest> {
        self.log().loads.clone()
    }

    /// Completions still waiting for a result, with the script they belong to.
    pub fn take_completions(&self) -> Vec<(String, EvalCompletion)> {
        std::mem::take(&mut self.log().completions)
    }

    pub fn clear(&self) {
        let mut log = self.log();
        log.executed.clear();
        log.registered.clear();
        log.unregistered.clear();
        log.loads.clear();
    }

    fn log(&self) -> std::sync::MutexGuard<'_, ChannelLog> {
        self.log.lock().recover_poison("RecordingChannel")
    }
}

impl ScriptChannel for RecordingChannel {
    fn execute(&self, source: &str, completion: Option<EvalCompletion>) {
        self.log().executed.push(source.to_string());
        let Some(completion) = completion else {
            return;
        };
        match self.responder.as_ref().and_then(|respond| respond(source)) {
            Some(result) => completion(result),
            None => self
                .log()
                .completions
                .push((source.to_string(), completion)),
        }
    }

    fn register_channel(&self, name: &str) {
        self.log().registered.push(name.to_string());
    }

    fn unregister_channel(&self, name: &str) {
        self.log().unregistered.push(name.to_string());
    }

    fn load(&self, page: &PageRequest) {
        self.log().loads.push(page.clone());
    }
}

/// A call received by [`MemoryQueue`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoteCall {
    Position,
    Items,
    Length,
    SetQueue(Vec<MediaId>),
    Append(Vec<MediaId>),
    Prepend(Vec<MediaId>),
    Remove(usize),
    RemoveMany(Vec<usize>),
    ChangeToIndex(usize),
}

type FailWhen = Box<dyn Fn(&RemoteCall) -> bool + Send + Sync>;
type Delivery = Box<dyn FnOnce() + Send>;

struct QueueState {
    items: Vec<MediaItem>,
    position: i64,
    calls: Vec<RemoteCall>,
    fail_when: Option<FailWhen>,
    holding: bool,
    held: Vec<Delivery>,
}

/// A [`QueueRemote`] backed by a vector.
///
/// Edits apply when the call is issued, as the real queue does; only the
/// response can be held back. A call matched by [`fail_when`](Self::fail_when)
/// fails without touching the queue.
pub struct MemoryQueue {
    state: Mutex<QueueState>,
}

impl Default for MemoryQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryQueue {
    pub fn new() -> Self {
        Self::with_items(&[], -1)
    }

    pub fn with_items(ids: &[&str], position: i64) -> Self {
        Self {
            state: Mutex::new(QueueState {
                items: ids.iter().map(|id| item(id)).collect(),
                position,
                calls: Vec::new(),
                fail_when: None,
                holding: false,
                held: Vec::new(),
            }),
        }
    }

    pub fn calls(&self) -> Vec<RemoteCall> {
        self.lock().calls.clone()
    }

    pub fn clear_calls(&self) {
        self.lock().calls.clear();
    }

    pub fn item_ids(&self) -> Vec<MediaId> {
        self.lock().items.iter().map(|item| item.id.clone()).collect()
    }

    pub fn set_position(&self, position: i64) {
        self.lock().position = position;
    }

    /// Edit the queue behind the reconciler's back.
    pub fn remove_now(&self, index: usize) {
        let mut state = self.lock();
        if index < state.items.len() {
            state.items.remove(index);
        }
    }

    /// Edit the queue behind the reconciler's back.
    pub fn append_now(&self, ids: &[&str]) {
        self.lock().items.extend(ids.iter().map(|id| item(id)));
    }

    pub fn fail_when<F>(&self, predicate: F)
    where
        F: Fn(&RemoteCall) -> bool + Send + Sync + 'static,
    {
        self.lock().fail_when = Some(Box::new(predicate));
    }

    /// Keep responses until [`release_responses`](Self::release_responses).
    pub fn hold_responses(&self) {
        self.lock().holding = true;
    }

    pub fn release_responses(&self) {
        let held = {
            let mut state = self.lock();
            state.holding = false;
            std::mem::take(&mut state.held)
        };
        for deliver in held {
            deliver();
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, QueueState> {
        self.state.lock().recover_poison("MemoryQueue")
    }

    /// Record `call`, apply `effect` unless the call is set to fail, and
    /// answer.
    fn issue<T, F>(&self, call: RemoteCall, effect: F) -> Pending<T>
    where
        T: Send + 'static,
        F: FnOnce(&mut QueueState) -> T,
    {
        let (completer, pending) = Pending::pair();
        let mut state = self.lock();
        let fails = state.fail_when.as_ref().is_some_and(|f| f(&call));
        let result: BridgeResult<T> = if fails {
            Err(BridgeError::javascript(format!("{call:?} failed"), None))
        } else {
            Ok(effect(&mut state))
        };
        state.calls.push(call);
        if state.holding {
            state.held.push(Box::new(move || completer.complete(result)));
        } else {
            drop(state);
            completer.complete(result);
        }
        pending
    }
}

fn item(id: &str) -> MediaItem {
    MediaItem::new(id, MediaItemAttributes::default())
}

impl QueueRemote for MemoryQueue {
    fn position(&self) -> Pending<i64> {
        self.issue(RemoteCall::Position, |state| state.position)
    }

    fn items(&self) -> Pending<Vec<MediaItem>> {
        self.issue(RemoteCall::Items, |state| state.items.clone())
    }

    fn length(&self) -> Pending<usize> {
        self.issue(RemoteCall::Length, |state| state.items.len())
    }

    fn set_queue(&self, ids: &[MediaId]) -> Pending<()> {
        self.issue(RemoteCall::SetQueue(ids.to_vec()), |state| {
            state.items = ids.iter().map(|id| item(id)).collect();
            state.position = 0;
        })
    }

    fn append(&self, ids: &[MediaId]) -> Pending<()> {
        self.issue(RemoteCall::Append(ids.to_vec()), |state| {
            state.items.extend(ids.iter().map(|id| item(id)));
        })
    }

    fn prepend(&self, ids: &[MediaId]) -> Pending<()> {
        self.issue(RemoteCall::Prepend(ids.to_vec()), |state| {
            let at = usize::try_from(state.position + 1)
                .unwrap_or(0)
                .min(state.items.len());
            state
                .items
                .splice(at..at, ids.iter().map(|id| item(id)));
        })
    }

    fn remove(&self, index: usize) -> Pending<()> {
        self.issue(RemoteCall::Remove(index), |state| {
            if index < state.items.len() {
                state.items.remove(index);
            }
        })
    }

    fn remove_many(&self, indexes: &BTreeSet<usize>) -> Pending<()> {
        let call = RemoteCall::RemoveMany(indexes.iter().copied().collect());
        self.issue(call, |state| {
            for &index in indexes.iter().rev() {
                if index < state.items.len() {
                    state.items.remove(index);
                }
            }
        })
    }

    fn change_to_index(&self, index: usize) -> Pending<()> {
        self.issue(RemoteCall::ChangeToIndex(index), |state| {
            state.position = index as i64;
        })
    }
}
