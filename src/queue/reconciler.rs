//! Queue reconciler.
//!
//! Keeps a local [`QueueSnapshot`] consistent with the remote queue while
//! local edits and remote change notifications interleave.
//!
//! # In-flight guard
//!
//! At most one reload or write-back runs at a time. A trigger arriving while
//! one is in flight is dropped, not replayed: the running pass fetches fresh
//! state anyway, and the remote fires another notification for any change it
//! has not seen yet.
//!
//! # Insert in the middle
//!
//! The remote queue only supports prepend and append. An insert at an
//! arbitrary position appends, records a [`PendingReorder`], and lets the
//! next reload move the new items into place locally and write the corrected
//! tail back (remove every item from the first changed index, then append
//! them again in order).

use std::collections::BTreeSet;
use std::sync::{Arc, Mutex};

use tokio::runtime::Handle;

use super::remote::QueueRemote;
use super::snapshot::QueueSnapshot;
use super::update::{QueueUpdate, ReloadOutcome, ReloadTrigger};
use crate::bridge::{Bridge, BridgeEvent, Pending};
use crate::domain::{MediaId, MediaItem};
use crate::error::{BridgeError, BridgeResult, LockResultExt};

const LOG_TARGET: &str = "musicbridge::queue";

/// Listener for [`QueueUpdate`]s.
pub type UpdateListener = Arc<dyn Fn(QueueUpdate) + Send + Sync + 'static>;

/// A requested reorder the remote has not confirmed yet.
///
/// Indexes are absolute and were captured when the insert was issued.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingReorder {
    pub source_indexes: BTreeSet<usize>,
    pub destination: usize,
}

impl PendingReorder {
    /// Lowest index whose item changes once the reorder is applied.
    fn first_changed(&self) -> usize {
        self.source_indexes
            .first()
            .map_or(self.destination, |&first| first.min(self.destination))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum InFlight {
    Reload,
    WriteBack,
}

struct ReconcilerState {
    snapshot: QueueSnapshot,
    in_flight: Option<InFlight>,
    /// Set when a write-back completes; the next items-changed notification
    /// is our own echo.
    wrote_back: bool,
    pending_reorder: Option<PendingReorder>,
}

#[derive(Debug, Clone, Copy)]
enum QueueSignal {
    Ready,
    ItemsChanged,
    PositionChanged,
}

/// Local mirror of the runtime's playback queue.
///
/// Every trigger funnels into [`reload`](Self::reload), which fetches position
/// and items together and swaps them in as one unit. At most one reload or
/// write-back is in flight; triggers arriving meanwhile are dropped, not
/// replayed.
///
/// # Usage
///
/// ```ignore
/// let reconciler = Arc::new(QueueReconciler::new(queue));
/// reconciler.attach(&bridge);
/// reconciler.add_update_listener(Arc::new(|update| log::info!("{:?}", update)));
///
/// // insert two songs after the next one
/// reconciler.insert(&ids, 1).await?;
/// ```
pub struct QueueReconciler<R> {
    remote: R,
    state: Mutex<ReconcilerState>,
    listeners: Mutex<Vec<UpdateListener>>,
}

impl<R: QueueRemote> QueueReconciler<R> {
    /// Create an empty mirror of `remote`. Nothing is fetched until the first
    /// reload.
    pub fn new(remote: R) -> Self {
        Self {
            remote,
            state: Mutex::new(ReconcilerState {
                snapshot: QueueSnapshot::default(),
                in_flight: None,
                wrote_back: false,
                pending_reorder: None,
            }),
            listeners: Mutex::new(Vec::new()),
        }
    }

    /// The remote queue edits are issued against.
    pub fn remote(&self) -> &R {
        &self.remote
    }

    /// Subscribe to bridge events that drive reloads.
    ///
    /// Reloads run on the tokio runtime current when the event fires, or the
    /// one current at attach time when the event is delivered elsewhere.
    pub fn attach(self: &Arc<Self>, bridge: &Bridge) {
        let fallback = Handle::try_current().ok();
        self.listen(bridge, BridgeEvent::BridgeReady, QueueSignal::Ready, fallback.clone());
        self.listen(
            bridge,
            BridgeEvent::QueueItemsDidChange,
            QueueSignal::ItemsChanged,
            fallback.clone(),
        );
        self.listen(
            bridge,
            BridgeEvent::QueuePositionDidChange,
            QueueSignal::PositionChanged,
            fallback,
        );
    }

    fn listen(
        self: &Arc<Self>,
        bridge: &Bridge,
        event: BridgeEvent,
        signal: QueueSignal,
        fallback: Option<Handle>,
    ) {
        let weak = Arc::downgrade(self);
        bridge.add_event_listener(event, move || {
            let Some(reconciler) = weak.upgrade() else {
                return;
            };
            let Some(handle) = Handle::try_current().ok().or_else(|| fallback.clone()) else {
                log::warn!(target: LOG_TARGET, "No async runtime to handle {}", event);
                return;
            };
            handle.spawn(async move {
                reconciler.on_signal(signal).await;
            });
        });
    }

    async fn on_signal(&self, signal: QueueSignal) {
        let result = match signal {
            QueueSignal::Ready => self.reload(ReloadTrigger::Setup).await,
            QueueSignal::ItemsChanged => self.handle_items_changed().await,
            QueueSignal::PositionChanged => self.reload(ReloadTrigger::PositionChanged).await,
        };
        if let Err(error) = result {
            log::warn!(target: LOG_TARGET, "Queue reload after {:?} failed: {}", signal, error);
        }
    }

    /// Register a listener for every [`QueueUpdate`]. Listeners run in the
    /// order they were added, outside the reconciler's lock.
    pub fn add_update_listener<F>(&self, listener: F)
    where
        F: Fn(QueueUpdate) + Send + Sync + 'static,
    {
        self.listeners
            .lock()
            .recover_poison("QueueReconciler::add_update_listener")
            .push(Arc::new(listener));
    }

    fn emit(&self, update: QueueUpdate) {
        let listeners = self
            .listeners
            .lock()
            .recover_poison("QueueReconciler::emit")
            .clone();
        log::debug!(target: LOG_TARGET, "Queue update {:?}", update);
        for listener in listeners {
            listener(update);
        }
    }

    // ---------------------------------------------------------------------
    // Accessors
    // ---------------------------------------------------------------------

    /// Copy of the mirrored items and position, taken under one lock.
    pub fn snapshot(&self) -> QueueSnapshot {
        self.lock("snapshot").snapshot.clone()
    }

    /// Mirrored items, including the ones already played.
    pub fn items(&self) -> Vec<MediaItem> {
        self.lock("items").snapshot.items.clone()
    }

    /// Absolute index of the now-playing item, `-1` when none.
    pub fn position(&self) -> i64 {
        self.lock("position").snapshot.position
    }

    /// Number of items after the now-playing one.
    pub fn upcoming_count(&self) -> usize {
        self.lock("upcoming_count").snapshot.upcoming_count()
    }

    /// Translate an upcoming index against the current position.
    pub fn to_absolute(&self, relative: usize) -> usize {
        self.lock("to_absolute").snapshot.to_absolute(relative)
    }

    /// Translate an absolute index against the current position; `None` for
    /// items at or before the now-playing one.
    pub fn to_relative(&self, absolute: usize) -> Option<usize> {
        self.lock("to_relative").snapshot.to_relative(absolute)
    }

    /// Whether a reload or write-back is in flight.
    pub fn is_updating(&self) -> bool {
        self.lock("is_updating").in_flight.is_some()
    }

    /// The insert waiting for its items-changed confirmation, if any.
    pub fn pending_reorder(&self) -> Option<PendingReorder> {
        self.lock("pending_reorder").pending_reorder.clone()
    }

    fn lock(&self, context: &'static str) -> std::sync::MutexGuard<'_, ReconcilerState> {
        self.state.lock().recover_poison(context)
    }

    fn release(&self) {
        self.lock("release").in_flight = None;
    }

    // ---------------------------------------------------------------------
    // Reload
    // ---------------------------------------------------------------------

    /// Items-changed notification from the remote.
    ///
    /// The first notification after a completed write-back is the echo of
    /// our own edit and is reported as [`QueueUpdate::UserModified`].
    pub async fn handle_items_changed(&self) -> BridgeResult<ReloadOutcome> {
        let trigger = {
            let mut state = self.lock("handle_items_changed");
            if state.wrote_back && state.in_flight.is_none() {
                state.wrote_back = false;
                ReloadTrigger::UserModified
            } else {
                ReloadTrigger::ItemsChanged
            }
        };
        self.reload(trigger).await
    }

    /// Fetch the authoritative queue and apply it.
    pub async fn reload(&self, trigger: ReloadTrigger) -> BridgeResult<ReloadOutcome> {
        {
            let mut state = self.lock("reload");
            if let Some(in_flight) = state.in_flight {
                log::debug!(
                    target: LOG_TARGET,
                    "Dropping {:?} reload, {:?} in flight",
                    trigger,
                    in_flight
                );
                return Ok(ReloadOutcome::Coalesced);
            }
            state.in_flight = Some(InFlight::Reload);
        }

        let (position, items) = tokio::join!(self.remote.position(), self.remote.items());
        let (position, items) = match (position, items) {
            (Ok(position), Ok(items)) => (position, items),
            (Err(error), _) | (_, Err(error)) => {
                self.release();
                return Err(error);
            }
        };

        let (update, write_back) = {
            let mut state = self.lock("reload");
            let size_delta = items.len() as i64 - state.snapshot.len() as i64;
            let previous_position = state.snapshot.position;
            state.snapshot = QueueSnapshot::new(items, position);
            let position_delta = position - previous_position;

            match state.pending_reorder.take() {
                Some(reorder) if reorder.source_indexes.len() as i64 == size_delta => {
                    state
                        .snapshot
                        .move_items(&reorder.source_indexes, reorder.destination);
                    state.in_flight = Some(InFlight::WriteBack);
                    (QueueUpdate::UserModified, Some(reorder.first_changed()))
                }
                Some(reorder) => {
                    state.in_flight = None;
                    drop(state);
                    log::error!(
                        target: LOG_TARGET,
                        "Discarding reorder {:?}: queue size changed by {}",
                        reorder,
                        size_delta
                    );
                    self.emit(QueueUpdate::Error);
                    return Ok(ReloadOutcome::ReorderRejected);
                }
                None => {
                    state.in_flight = None;
                    (trigger.update(position_delta), None)
                }
            }
        };

        self.emit(update);
        if let Some(first_changed) = write_back {
            self.write_back(first_changed).await?;
        }
        Ok(ReloadOutcome::Applied)
    }

    // ---------------------------------------------------------------------
    // Write-back
    // ---------------------------------------------------------------------

    /// Push the local order of everything from `first_changed` to the remote.
    ///
    /// Must be entered holding the write-back guard; always releases it.
    async fn write_back(&self, first_changed: usize) -> BridgeResult<()> {
        let result = self.push_tail(first_changed).await;
        {
            let mut state = self.lock("write_back");
            state.in_flight = None;
            if result.is_ok() {
                state.wrote_back = true;
            }
        }
        if let Err(error) = &result {
            log::error!(target: LOG_TARGET, "Queue write-back failed: {}", error);
            self.emit(QueueUpdate::Error);
        }
        result
    }

    async fn push_tail(&self, first_changed: usize) -> BridgeResult<()> {
        let (length, position) = tokio::join!(self.remote.length(), self.remote.position());
        let (length, position) = (length?, position?);

        let (start, ids) = {
            let state = self.lock("push_tail");
            let local = state.snapshot.len();
            if local != length {
                return Err(BridgeError::QueueOutOfSync {
                    local,
                    remote: length,
                });
            }
            let after_now_playing = usize::try_from(position + 1).unwrap_or(0);
            let start = after_now_playing.max(first_changed).min(local);
            let ids: Vec<MediaId> = state.snapshot.items[start..]
                .iter()
                .map(|item| item.id.clone())
                .collect();
            (start, ids)
        };
        if ids.is_empty() {
            return Ok(());
        }

        log::debug!(
            target: LOG_TARGET,
            "Writing back {} item(s) from index {}",
            ids.len(),
            start
        );
        // Descending, so each removal leaves the lower indexes untouched.
        let removals: Vec<(usize, Pending<()>)> = (start..length)
            .rev()
            .map(|index| (index, self.remote.remove(index)))
            .collect();
        let appended = self.remote.append(&ids);

        let mut first_failure = None;
        for (index, removal) in removals {
            if let Err(error) = removal.await {
                log::warn!(target: LOG_TARGET, "Removing index {} failed: {}", index, error);
                first_failure.get_or_insert((index, error));
            }
        }
        let appended = appended.await;

        match first_failure {
            Some((index, source)) => Err(BridgeError::WriteBackIncomplete {
                index,
                source: Box::new(source),
            }),
            None => appended,
        }
    }

    // ---------------------------------------------------------------------
    // Edits (indexes are upcoming/relative)
    // ---------------------------------------------------------------------

    /// Insert `ids` so the first lands at upcoming index `relative`.
    pub async fn insert(&self, ids: &[MediaId], relative: usize) -> BridgeResult<()> {
        if ids.is_empty() {
            return Ok(());
        }
        let empty = {
            let mut state = self.lock("insert");
            if state.snapshot.is_empty() {
                true
            } else {
                if state.in_flight.is_some() || state.pending_reorder.is_some() {
                    return Err(BridgeError::QueueBusy);
                }
                let len = state.snapshot.len();
                let destination = state.snapshot.to_absolute(relative).min(len);
                state.pending_reorder = Some(PendingReorder {
                    source_indexes: (len..len + ids.len()).collect(),
                    destination,
                });
                false
            }
        };
        if empty {
            return self.replace_queue(ids).await;
        }

        if let Err(error) = self.remote.append(ids).await {
            self.lock("insert").pending_reorder = None;
            return Err(error);
        }
        Ok(())
    }

    /// Queue `ids` right after the now-playing item.
    ///
    /// On an empty queue this replaces the queue instead, since the runtime
    /// sends no change notification for it.
    pub async fn prepend(&self, ids: &[MediaId]) -> BridgeResult<()> {
        let empty = self.lock("prepend").snapshot.is_empty();
        if empty {
            return self.replace_queue(ids).await;
        }
        self.remote.prepend(ids).await
    }

    /// Queue `ids` after the last item; replaces an empty queue.
    pub async fn append(&self, ids: &[MediaId]) -> BridgeResult<()> {
        let empty = self.lock("append").snapshot.is_empty();
        if empty {
            return self.replace_queue(ids).await;
        }
        self.remote.append(ids).await
    }

    /// The remote does not notify on edits to an empty queue, so replace it
    /// and reload explicitly.
    async fn replace_queue(&self, ids: &[MediaId]) -> BridgeResult<()> {
        self.remote.set_queue(ids).await?;
        self.reload(ReloadTrigger::UserModified).await?;
        Ok(())
    }

    /// Remove one upcoming item. The mirror catches up on the change
    /// notification.
    pub async fn delete(&self, relative: usize) -> BridgeResult<()> {
        let index = self.to_absolute(relative);
        self.remote.remove(index).await
    }

    /// Remove several upcoming items in one evaluation.
    pub async fn delete_many(&self, relative: &BTreeSet<usize>) -> BridgeResult<()> {
        let indexes = self.lock("delete_many").snapshot.to_absolute_set(relative);
        self.remote.remove_many(&indexes).await
    }

    /// Skip ahead to an upcoming item.
    pub async fn change_to_item(&self, relative: usize) -> BridgeResult<()> {
        let index = self.to_absolute(relative);
        self.remote.change_to_index(index).await
    }

    /// Move one upcoming item and write the new order back.
    pub async fn move_item(&self, source: usize, destination: usize) -> BridgeResult<()> {
        self.move_items(&BTreeSet::from([source]), destination).await
    }

    /// Move upcoming items so they land before `destination` and write the
    /// new order back. `destination` may equal the upcoming count.
    pub async fn move_items(
        &self,
        sources: &BTreeSet<usize>,
        destination: usize,
    ) -> BridgeResult<()> {
        let first_changed = {
            let mut state = self.lock("move_items");
            if state.in_flight.is_some() {
                return Err(BridgeError::QueueBusy);
            }
            let reorder = PendingReorder {
                source_indexes: state.snapshot.to_absolute_set(sources),
                destination: state.snapshot.to_absolute(destination),
            };
            state
                .snapshot
                .move_items(&reorder.source_indexes, reorder.destination);
            state.in_flight = Some(InFlight::WriteBack);
            reorder.first_changed()
        };
        self.emit(QueueUpdate::UserModified);
        self.write_back(first_changed).await
    }
}
