use std::collections::BTreeSet;
use std::sync::Arc;

use crate::bridge::Pending;
use crate::domain::{MediaId, MediaItem};

/// The remote playback queue, as the reconciler sees it.
///
/// Every method issues its call immediately and returns a future for the
/// outcome, so several calls can be in flight at once. Indexes are absolute.
pub trait QueueRemote: Send + Sync + 'static {
    fn position(&self) -> Pending<i64>;
    fn items(&self) -> Pending<Vec<MediaItem>>;
    fn length(&self) -> Pending<usize>;
    /// Replace the whole queue.
    fn set_queue(&self, ids: &[MediaId]) -> Pending<()>;
    /// Insert after the last item.
    fn append(&self, ids: &[MediaId]) -> Pending<()>;
    /// Insert right after the now-playing item.
    fn prepend(&self, ids: &[MediaId]) -> Pending<()>;
    fn remove(&self, index: usize) -> Pending<()>;
    fn remove_many(&self, indexes: &BTreeSet<usize>) -> Pending<()>;
    fn change_to_index(&self, index: usize) -> Pending<()>;
}

impl<T: QueueRemote> QueueRemote for Arc<T> {
    fn position(&self) -> Pending<i64> {
        (**self).position()
    }

    fn items(&self) -> Pending<Vec<MediaItem>> {
        (**self).items()
    }

    fn length(&self) -> Pending<usize> {
        (**self).length()
    }

    fn set_queue(&self, ids: &[MediaId]) -> Pending<()> {
        (**self).set_queue(ids)
    }

    fn append(&self, ids: &[MediaId]) -> Pending<()> {
        (**self).append(ids)
    }

    fn prepend(&self, ids: &[MediaId]) -> Pending<()> {
        (**self).prepend(ids)
    }

    fn remove(&self, index: usize) -> Pending<()> {
        (**self).remove(index)
    }

    fn remove_many(&self, indexes: &BTreeSet<usize>) -> Pending<()> {
        (**self).remove_many(indexes)
    }

    fn change_to_index(&self, index: usize) -> Pending<()> {
        (**self).change_to_index(index)
    }
}
