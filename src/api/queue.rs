//! Typed access to `music.player.queue`.

use std::collections::BTreeSet;

use super::music::QueueSource;
use crate::bridge::script::js_array;
use crate::bridge::{Bridge, DecodeStrategy, Pending};
use crate::domain::{MediaId, MediaItem};
use crate::queue::QueueRemote;

const QUEUE: &str = "music.player.queue";

/// Where song ids are resolved before they are queued.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SongKind {
    /// Catalog ids, resolved with `music.api.songs`.
    #[default]
    Catalog,
    /// Library ids, resolved with `music.api.library.songs`.
    Library,
}

impl SongKind {
    fn lookup(self) -> &'static str {
        match self {
            SongKind::Catalog => "music.api.songs",
            SongKind::Library => "music.api.library.songs",
        }
    }
}

/// The runtime's playback queue.
///
/// All indexes are absolute. Ids passed to `append`/`prepend` through
/// [`QueueRemote`] are resolved as the queue's configured [`SongKind`].
#[derive(Clone)]
pub struct Queue {
    bridge: Bridge,
    song_kind: SongKind,
}

impl Queue {
    pub fn new(bridge: Bridge) -> Self {
        Self {
            bridge,
            song_kind: SongKind::default(),
        }
    }

    pub fn with_song_kind(mut self, song_kind: SongKind) -> Self {
        self.song_kind = song_kind;
        self
    }

    pub fn song_kind(&self) -> SongKind {
        self.song_kind
    }

    pub fn is_empty(&self) -> Pending<bool> {
        self.bridge
            .value(&format!("{QUEUE}.isEmpty"), DecodeStrategy::Primitive)
    }

    /// Insert right after the now-playing item.
    pub fn prepend_songs(&self, ids: &[MediaId], kind: SongKind) -> Pending<()> {
        self.bridge.promise(&insert_fragment("prepend", ids, kind))
    }

    /// Insert after the last item.
    pub fn append_songs(&self, ids: &[MediaId], kind: SongKind) -> Pending<()> {
        self.bridge.promise(&insert_fragment("append", ids, kind))
    }
}

fn insert_fragment(method: &str, ids: &[MediaId], kind: SongKind) -> String {
    format!(
        "{}({}, null).then(function(songs) {{ return {QUEUE}.{method}(songs); }})",
        kind.lookup(),
        js_array(ids)
    )
}

impl QueueRemote for Queue {
    fn position(&self) -> Pending<i64> {
        self.bridge
            .value(&format!("{QUEUE}.position"), DecodeStrategy::Primitive)
    }

    fn items(&self) -> Pending<Vec<MediaItem>> {
        self.bridge.value(
            &format!("JSON.stringify({QUEUE}.items)"),
            DecodeStrategy::JsonText,
        )
    }

    fn length(&self) -> Pending<usize> {
        self.bridge
            .value(&format!("{QUEUE}.length"), DecodeStrategy::Primitive)
    }

    fn set_queue(&self, ids: &[MediaId]) -> Pending<()> {
        self.bridge
            .promise(&QueueSource::Songs(ids.to_vec()).fragment())
    }

    fn append(&self, ids: &[MediaId]) -> Pending<()> {
        self.append_songs(ids, self.song_kind)
    }

    fn prepend(&self, ids: &[MediaId]) -> Pending<()> {
        self.prepend_songs(ids, self.song_kind)
    }

    fn remove(&self, index: usize) -> Pending<()> {
        self.bridge.run(&format!("{QUEUE}.remove({index})"))
    }

    /// Removes from the highest index down so earlier removals do not shift
    /// later ones.
    fn remove_many(&self, indexes: &BTreeSet<usize>) -> Pending<()> {
        let indexes: Vec<usize> = indexes.iter().copied().collect();
        self.bridge.run(&format!(
            "{}.reverse().forEach(function(element) {{ {QUEUE}.remove(element); }})",
            js_array(&indexes)
        ))
    }

    fn change_to_index(&self, index: usize) -> Pending<()> {
        self.bridge
            .promise(&format!("music.player.changeToMediaAtIndex({index})"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::RecordingChannel;
    use serde_json::json;
    use std::sync::Arc;

    #[test]
    fn library_append_resolves_through_library_api() {
        let fragment = insert_fragment("append", &["i.abc".to_string()], SongKind::Library);
        assert_eq!(
            fragment,
            "music.api.library.songs([\"i.abc\"], null).then(function(songs) { \
             return music.player.queue.append(songs); })"
        );
    }

    #[tokio::test]
    async fn remove_many_reverses_in_page() {
        let channel = Arc::new(RecordingChannel::with_responder(|_| Some(Ok(json!(null)))));
        let queue = Queue::new(Bridge::new(channel.clone()));

        queue.remove_many(&BTreeSet::from([4, 2])).await.unwrap();

        assert_eq!(
            channel.executed(),
            vec![
                "[2,4].reverse().forEach(function(element) { \
                 music.player.queue.remove(element); })"
            ]
        );
    }

    #[tokio::test]
    async fn items_decode_from_json_text() {
        let channel = Arc::new(RecordingChannel::with_responder(|_| {
            Some(Ok(json!(r#"[{"id":"1","type":"song","attributes":{"name":"A"}}]"#)))
        }));
        let queue = Queue::new(Bridge::new(channel));

        let items = queue.items().await.unwrap();

        assert_eq!(items.len(), 1);
        assert_eq!(items[0].id, "1");
    }
}
