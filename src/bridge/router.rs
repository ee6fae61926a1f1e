//! Pending-call table.
//!
//! Maps each in-flight [`CallId`] to the continuation that settles it. The
//! table is the only place ids are allocated, so an id is always registered
//! before the script that references it is injected.

use std::collections::HashMap;
use std::sync::Mutex;

use serde_json::Value;

use super::call_id::{CallId, CallIdAllocator};
use crate::error::{BridgeError, LockResultExt};

/// How a pending call ended.
#[derive(Debug)]
pub(crate) enum Settlement {
    /// Fulfilled with the posted payload.
    Fulfilled(Value),
    /// Rejected with the posted payload (serialized error text).
    Rejected(Value),
    /// The injection itself failed; the runtime will never answer.
    Failed(BridgeError),
}

pub(crate) type Settle = Box<dyn FnOnce(Settlement) + Send + 'static>;

/// Thread-safe table of unsettled calls.
///
/// Continuations are removed before they run, so each settles at most once
/// and never under the table lock.
pub(crate) struct PendingCallTable {
    state: Mutex<TableState>,
}

struct TableState {
    ids: CallIdAllocator,
    pending: HashMap<CallId, Settle>,
}

impl PendingCallTable {
    pub(crate) fn new() -> Self {
        Self {
            state: Mutex::new(TableState {
                ids: CallIdAllocator::new(),
                pending: HashMap::new(),
            }),
        }
    }

    /// Allocate an id and park `settle` under it.
    pub(crate) fn register(&self, settle: Settle) -> CallId {
        let mut state = self.state.lock().recover_poison("PendingCallTable::register");
        let id = state.ids.next();
        state.pending.insert(id, settle);
        log::trace!(
            target: "musicbridge::bridge::router",
            "Registered call {} ({} pending)",
            id,
            state.pending.len()
        );
        id
    }

    /// Remove and return the continuation for `id`, if still pending.
    pub(crate) fn take(&self, id: CallId) -> Option<Settle> {
        self.state
            .lock()
            .recover_poison("PendingCallTable::take")
            .pending
            .remove(&id)
    }

    pub(crate) fn contains(&self, id: CallId) -> bool {
        self.state
            .lock()
            .recover_poison("PendingCallTable::contains")
            .pending
            .contains_key(&id)
    }

    pub(crate) fn pending_count(&self) -> usize {
        self.state
            .lock()
            .recover_poison("PendingCallTable::pending_count")
            .pending
            .len()
    }
}
