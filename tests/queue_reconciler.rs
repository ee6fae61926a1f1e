//! Queue reconciliation scenarios against an in-memory remote queue.

mod helpers;

use std::sync::Arc;

use helpers::queue::{ids, local_ids, record_updates};
use musicbridge::bridge::{Bridge, Dispatch};
use musicbridge::queue::{QueueReconciler, QueueUpdate, ReloadOutcome, ReloadTrigger};
use musicbridge::testing::{MemoryQueue, RecordingChannel, RemoteCall};
use musicbridge::BridgeError;
use serde_json::json;

async fn set_up(items: &[&str], position: i64) -> (Arc<MemoryQueue>, Arc<QueueReconciler<Arc<MemoryQueue>>>) {
    let remote = Arc::new(MemoryQueue::with_items(items, position));
    let reconciler = Arc::new(QueueReconciler::new(remote.clone()));
    reconciler.reload(ReloadTrigger::Setup).await.unwrap();
    remote.clear_calls();
    (remote, reconciler)
}

/// Yield to spawned tasks until `done` holds.
async fn wait_until(mut done: impl FnMut() -> bool) {
    for _ in 0..100 {
        if done() {
            return;
        }
        tokio::task::yield_now().await;
    }
    panic!("condition not reached");
}

#[tokio::test]
async fn insert_in_middle_is_written_back() {
    let (remote, reconciler) = set_up(&["a", "b", "c", "d"], 0).await;
    let updates = record_updates(&reconciler);

    reconciler.insert(&ids(&["x", "y"]), 1).await.unwrap();
    assert_eq!(remote.calls(), vec![RemoteCall::Append(ids(&["x", "y"]))]);
    assert!(reconciler.pending_reorder().is_some());

    let outcome = reconciler.handle_items_changed().await.unwrap();

    assert_eq!(outcome, ReloadOutcome::Applied);
    assert_eq!(local_ids(&reconciler), ["a", "b", "x", "y", "c", "d"]);
    assert_eq!(remote.item_ids(), ["a", "b", "x", "y", "c", "d"]);
    assert_eq!(
        remote.calls(),
        vec![
            RemoteCall::Append(ids(&["x", "y"])),
            RemoteCall::Position,
            RemoteCall::Items,
            RemoteCall::Length,
            RemoteCall::Position,
            RemoteCall::Remove(5),
            RemoteCall::Remove(4),
            RemoteCall::Remove(3),
            RemoteCall::Remove(2),
            RemoteCall::Append(ids(&["x", "y", "c", "d"])),
        ]
    );
    assert_eq!(*updates.lock().unwrap(), vec![QueueUpdate::UserModified]);
    assert!(!reconciler.is_updating());
    assert_eq!(reconciler.pending_reorder(), None);
}

#[tokio::test]
async fn write_back_echo_is_reported_as_user_modified_once() {
    let (_remote, reconciler) = set_up(&["a", "b", "c", "d"], 0).await;
    reconciler.insert(&ids(&["x"]), 0).await.unwrap();
    reconciler.handle_items_changed().await.unwrap();
    let updates = record_updates(&reconciler);

    reconciler.handle_items_changed().await.unwrap();
    reconciler.handle_items_changed().await.unwrap();

    assert_eq!(
        *updates.lock().unwrap(),
        vec![QueueUpdate::UserModified, QueueUpdate::ItemsChanged]
    );
}

#[tokio::test]
async fn trigger_during_reload_is_coalesced() {
    let (remote, reconciler) = set_up(&["a", "b"], 0).await;
    let updates = record_updates(&reconciler);

    remote.hold_responses();
    let first = {
        let reconciler = reconciler.clone();
        tokio::spawn(async move { reconciler.reload(ReloadTrigger::ItemsChanged).await })
    };
    wait_until(|| reconciler.is_updating()).await;

    let second = reconciler.reload(ReloadTrigger::PositionChanged).await.unwrap();
    assert_eq!(second, ReloadOutcome::Coalesced);

    remote.release_responses();
    assert_eq!(first.await.unwrap().unwrap(), ReloadOutcome::Applied);
    // the dropped trigger is not replayed
    assert_eq!(*updates.lock().unwrap(), vec![QueueUpdate::ItemsChanged]);
    assert_eq!(
        remote
            .calls()
            .iter()
            .filter(|call| **call == RemoteCall::Items)
            .count(),
        1
    );
}

#[tokio::test]
async fn partial_write_back_failure_is_surfaced() {
    let (remote, reconciler) = set_up(&["a", "b", "c", "d"], 0).await;
    let updates = record_updates(&reconciler);
    remote.fail_when(|call| *call == RemoteCall::Remove(3));

    reconciler.insert(&ids(&["x", "y"]), 1).await.unwrap();
    let error = reconciler.handle_items_changed().await.unwrap_err();

    match error {
        BridgeError::WriteBackIncomplete { index, source } => {
            assert_eq!(index, 3);
            assert!(matches!(*source, BridgeError::JavaScript { .. }));
        }
        other => panic!("unexpected error: {other:?}"),
    }
    // every removal and the append were still issued
    assert!(remote.calls().contains(&RemoteCall::Remove(2)));
    assert!(remote.calls().contains(&RemoteCall::Append(ids(&["x", "y", "c", "d"]))));
    assert_eq!(
        *updates.lock().unwrap(),
        vec![QueueUpdate::UserModified, QueueUpdate::Error]
    );
    assert!(!reconciler.is_updating());

    // the next notification is treated as an external change
    let outcome = reconciler.handle_items_changed().await.unwrap();
    assert_eq!(outcome, ReloadOutcome::Applied);
    assert_eq!(updates.lock().unwrap().last(), Some(&QueueUpdate::ItemsChanged));
}

#[tokio::test]
async fn insert_while_reorder_pending_is_busy() {
    let (_remote, reconciler) = set_up(&["a", "b"], 0).await;

    reconciler.insert(&ids(&["x"]), 0).await.unwrap();

    assert!(matches!(
        reconciler.insert(&ids(&["y"]), 0).await,
        Err(BridgeError::QueueBusy)
    ));
}

#[tokio::test]
async fn prepend_and_append_pass_through_on_non_empty_queue() {
    let (remote, reconciler) = set_up(&["a", "b"], 0).await;

    reconciler.prepend(&ids(&["p"])).await.unwrap();
    reconciler.append(&ids(&["z"])).await.unwrap();

    assert_eq!(
        remote.calls(),
        vec![
            RemoteCall::Prepend(ids(&["p"])),
            RemoteCall::Append(ids(&["z"])),
        ]
    );
    assert_eq!(remote.item_ids(), ["a", "p", "b", "z"]);
}

#[tokio::test]
async fn bridge_events_drive_reloads() {
    let channel = Arc::new(RecordingChannel::new());
    let bridge = Bridge::new(channel.clone());
    let remote = Arc::new(MemoryQueue::with_items(&["a", "b", "c"], 0));
    let reconciler = Arc::new(QueueReconciler::new(remote.clone()));
    let updates = record_updates(&reconciler);
    reconciler.attach(&bridge);

    assert_eq!(bridge.handle_message("runtimeLoaded", json!("")), Dispatch::Handled);
    wait_until(|| !updates.lock().unwrap().is_empty()).await;
    assert_eq!(*updates.lock().unwrap(), vec![QueueUpdate::Setup]);
    wait_until(|| !reconciler.is_updating()).await;

    remote.set_position(2);
    bridge.handle_message("eventListenerCallback", json!("queuePositionDidChange"));
    wait_until(|| updates.lock().unwrap().len() == 2).await;

    assert_eq!(
        updates.lock().unwrap()[1],
        QueueUpdate::PositionChanged { by: 2 }
    );
    assert_eq!(reconciler.upcoming_count(), 0);
}
