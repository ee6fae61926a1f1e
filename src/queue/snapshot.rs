//! Local mirror of the remote queue and index translation.
//!
//! Two coordinate systems are in play. *Absolute* indexes address the whole
//! queue. *Upcoming* (relative) indexes address only the items after the
//! now-playing position, which is what a "Up Next" list shows:
//!
//! ```text
//! absolute:  0   1   2   3   4
//! items:    [a] [b] [c] [d] [e]      position = 1
//! upcoming:          0   1   2
//! ```

use std::collections::BTreeSet;

use crate::domain::MediaItem;

/// Items and position, always replaced together.
#[derive(Debug, Clone, PartialEq)]
pub struct QueueSnapshot {
    pub items: Vec<MediaItem>,
    /// Absolute index of the now-playing item, `-1` when nothing is current.
    pub position: i64,
}

impl Default for QueueSnapshot {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            position: -1,
        }
    }
}

impl QueueSnapshot {
    pub fn new(items: Vec<MediaItem>, position: i64) -> Self {
        Self { items, position }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Absolute index of upcoming index `relative`.
    pub fn to_absolute(&self, relative: usize) -> usize {
        (relative as i64 + self.position + 1).max(0) as usize
    }

    /// Upcoming index of absolute index `absolute`, if it lies after the
    /// now-playing item.
    pub fn to_relative(&self, absolute: usize) -> Option<usize> {
        let relative = absolute as i64 - self.position - 1;
        usize::try_from(relative).ok()
    }

    pub fn to_absolute_set(&self, relative: &BTreeSet<usize>) -> BTreeSet<usize> {
        relative.iter().map(|&index| self.to_absolute(index)).collect()
    }

    /// Number of items after the now-playing item.
    pub fn upcoming_count(&self) -> usize {
        (self.items.len() as i64 - self.position - 1).max(0) as usize
    }

    /// Move the items at `sources` so they land before the item that was at
    /// `destination`, keeping their relative order.
    ///
    /// `destination` is an offset into the queue *before* the move and may be
    /// `len()` to move to the end. Out-of-range sources are ignored.
    pub fn move_items(&mut self, sources: &BTreeSet<usize>, destination: usize) {
        let len = self.items.len();
        let destination = destination.min(len);
        let sources: Vec<usize> = sources.iter().copied().filter(|&i| i < len).collect();
        if sources.is_empty() {
            return;
        }
        let shift = sources.iter().filter(|&&i| i < destination).count();

        let mut moved = Vec::with_capacity(sources.len());
        for &index in sources.iter().rev() {
            moved.push(self.items.remove(index));
        }
        moved.reverse();

        let insert_at = destination - shift;
        self.items.splice(insert_at..insert_at, moved);
    }

    pub fn move_item(&mut self, source: usize, destination: usize) {
        self.move_items(&BTreeSet::from([source]), destination);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::MediaItemAttributes;

    fn snapshot(ids: &[&str], position: i64) -> QueueSnapshot {
        QueueSnapshot::new(
            ids.iter()
                .map(|id| MediaItem::new(*id, MediaItemAttributes::default()))
                .collect(),
            position,
        )
    }

    fn ids(snapshot: &QueueSnapshot) -> Vec<&str> {
        snapshot.items.iter().map(|item| item.id.as_str()).collect()
    }

    #[test]
    fn index_translation_round_trips() {
        let queue = snapshot(&["a", "b", "c", "d", "e"], 1);
        for relative in 0..queue.upcoming_count() {
            let absolute = queue.to_absolute(relative);
            assert_eq!(queue.to_relative(absolute), Some(relative));
        }
        assert_eq!(queue.to_absolute(0), 2);
        assert_eq!(queue.to_relative(1), None);
        assert_eq!(queue.upcoming_count(), 3);
    }

    #[test]
    fn translation_before_playback_starts() {
        let queue = snapshot(&["a", "b"], -1);
        assert_eq!(queue.to_absolute(0), 0);
        assert_eq!(queue.upcoming_count(), 2);
    }

    #[test]
    fn set_translation_is_elementwise() {
        let queue = snapshot(&["a", "b", "c", "d"], 0);
        assert_eq!(
            queue.to_absolute_set(&BTreeSet::from([0, 2])),
            BTreeSet::from([1, 3])
        );
    }

    #[test]
    fn move_tail_into_middle() {
        let mut queue = snapshot(&["a", "b", "c", "d", "x", "y"], 0);
        queue.move_items(&BTreeSet::from([4, 5]), 2);
        assert_eq!(ids(&queue), ["a", "b", "x", "y", "c", "d"]);
    }

    #[test]
    fn move_forward_uses_offset_semantics() {
        let mut queue = snapshot(&["a", "b", "c", "d"], -1);
        queue.move_item(0, 3);
        assert_eq!(ids(&queue), ["b", "c", "a", "d"]);

        let mut queue = snapshot(&["a", "b", "c", "d"], -1);
        queue.move_item(0, 4);
        assert_eq!(ids(&queue), ["b", "c", "d", "a"]);
    }

    #[test]
    fn move_scattered_sources_keeps_their_order() {
        let mut queue = snapshot(&["a", "b", "c", "d", "e"], -1);
        queue.move_items(&BTreeSet::from([0, 3]), 2);
        assert_eq!(ids(&queue), ["b", "a", "d", "c", "e"]);
    }

    #[test]
    fn move_ignores_out_of_range_sources() {
        let mut queue = snapshot(&["a", "b"], -1);
        queue.move_items(&BTreeSet::from([7]), 0);
        assert_eq!(ids(&queue), ["a", "b"]);
    }
}
