//! Queue fixtures.

use std::sync::{Arc, Mutex};

use musicbridge::domain::MediaId;
use musicbridge::queue::{QueueReconciler, QueueRemote, QueueUpdate};

pub fn ids(values: &[&str]) -> Vec<MediaId> {
    values.iter().map(|value| value.to_string()).collect()
}

pub fn local_ids<R: QueueRemote>(reconciler: &QueueReconciler<R>) -> Vec<String> {
    reconciler.items().into_iter().map(|item| item.id).collect()
}

/// Collect every update the reconciler emits from now on.
pub fn record_updates<R: QueueRemote>(
    reconciler: &QueueReconciler<R>,
) -> Arc<Mutex<Vec<QueueUpdate>>> {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = seen.clone();
    reconciler.add_update_listener(move |update| sink.lock().unwrap().push(update));
    seen
}
