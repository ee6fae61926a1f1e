//! Library collections resolved by the runtime's own API client.
//!
//! Albums and playlists come from `music.api.library`, which authenticates
//! with the tokens the runtime already holds. Song lookups go over HTTP
//! instead; see [`catalog::Library`](crate::catalog::Library).

use crate::bridge::script::js_array;
use crate::bridge::{Bridge, DecodeStrategy, Pending};
use crate::domain::{Album, LibraryPlaylist, MediaId};

const LIBRARY: &str = "music.api.library";

/// The signed-in user's albums and playlists.
#[derive(Clone)]
pub struct CloudLibrary {
    bridge: Bridge,
}

impl CloudLibrary {
    pub fn new(bridge: Bridge) -> Self {
        Self { bridge }
    }

    /// Albums by library id. No ids lists every album.
    pub fn albums(&self, ids: &[MediaId]) -> Pending<Vec<Album>> {
        self.fetch(&by_ids("albums", ids))
    }

    /// One page of the library's albums.
    pub fn albums_page(&self, limit: usize, offset: usize) -> Pending<Vec<Album>> {
        self.fetch(&paged("albums", limit, offset))
    }

    /// Playlists by library id. No ids lists every playlist.
    pub fn playlists(&self, ids: &[MediaId]) -> Pending<Vec<LibraryPlaylist>> {
        self.fetch(&by_ids("playlists", ids))
    }

    /// One page of the library's playlists.
    pub fn playlists_page(&self, limit: usize, offset: usize) -> Pending<Vec<LibraryPlaylist>> {
        self.fetch(&paged("playlists", limit, offset))
    }

    fn fetch<T>(&self, fragment: &str) -> Pending<Vec<T>>
    where
        T: serde::de::DeserializeOwned + Send + 'static,
    {
        self.bridge
            .promise_value(fragment, DecodeStrategy::Structured)
    }
}

fn by_ids(collection: &str, ids: &[MediaId]) -> String {
    let ids = if ids.is_empty() {
        "null".to_string()
    } else {
        js_array(ids)
    };
    format!("{LIBRARY}.{collection}({ids}, null)")
}

fn paged(collection: &str, limit: usize, offset: usize) -> String {
    format!("{LIBRARY}.{collection}(null, {{ limit: {limit}, offset: {offset} }})")
}
