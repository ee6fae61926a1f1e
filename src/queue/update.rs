/// Notification sent to queue update listeners after each reload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueueUpdate {
    /// First load after the runtime became ready.
    Setup,
    /// The items changed for a reason outside this process.
    ItemsChanged,
    /// The now-playing position moved by `by` (signed).
    PositionChanged { by: i64 },
    /// The items changed because of an edit made through the reconciler.
    UserModified,
    /// A reorder could not be applied or a write-back failed.
    Error,
}

/// Why a reload was requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReloadTrigger {
    Setup,
    ItemsChanged,
    PositionChanged,
    UserModified,
}

impl ReloadTrigger {
    pub(crate) fn update(self, position_delta: i64) -> QueueUpdate {
        match self {
            ReloadTrigger::Setup => QueueUpdate::Setup,
            ReloadTrigger::ItemsChanged => QueueUpdate::ItemsChanged,
            ReloadTrigger::PositionChanged => QueueUpdate::PositionChanged {
                by: position_delta,
            },
            ReloadTrigger::UserModified => QueueUpdate::UserModified,
        }
    }
}

/// What a call to `reload` ended up doing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReloadOutcome {
    /// A fresh snapshot was fetched and applied.
    Applied,
    /// Another reload or write-back was in flight; the trigger was dropped.
    Coalesced,
    /// A snapshot was applied but the pending reorder did not match it.
    ReorderRejected,
}
