//! Playback queue mirror and reconciliation.

mod reconciler;
mod remote;
mod snapshot;
mod update;

pub use reconciler::{PendingReorder, QueueReconciler, UpdateListener};
pub use remote::QueueRemote;
pub use snapshot::QueueSnapshot;
pub use update::{QueueUpdate, ReloadOutcome, ReloadTrigger};
