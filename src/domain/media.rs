//! Media resources as the runtime and catalog serialize them.
//!
//! Field names follow the SDK's camelCase JSON. Most attributes are optional
//! in practice (library items and region-locked songs omit them), so
//! decoding is lenient and missing fields fall back to defaults.

use serde::{Deserialize, Deserializer, Serialize};

/// Catalog or library identifier of a media resource.
pub type MediaId = String;

/// A single audio or video item in the playback queue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaItem {
    pub id: MediaId,
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(rename = "assetURL", default, skip_serializing_if = "Option::is_none")]
    pub asset_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub flavor: Option<String>,
    #[serde(default)]
    pub attributes: MediaItemAttributes,
}

impl MediaItem {
    pub fn new(id: impl Into<MediaId>, attributes: MediaItemAttributes) -> Self {
        Self {
            id: id.into(),
            kind: "song".to_string(),
            asset_url: None,
            flavor: None,
            attributes,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MediaItemAttributes {
    pub album_name: String,
    pub artist_name: String,
    pub artwork: Option<Artwork>,
    pub composer_name: Option<String>,
    pub content_rating: Option<ContentRating>,
    pub disc_number: Option<u32>,
    pub duration_in_millis: u64,
    pub genre_names: Vec<String>,
    pub isrc: Option<String>,
    pub name: String,
    pub play_params: Option<PlayParams>,
    pub release_date: Option<String>,
    pub track_number: Option<u32>,
    pub url: Option<String>,
}

impl MediaItemAttributes {
    pub fn duration_in_secs(&self) -> u64 {
        self.duration_in_millis / 1000
    }
}

/// Parameters the player needs to start playback of an item.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayParams {
    /// Sometimes a string and sometimes a number on the wire.
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    #[serde(default)]
    pub catalog_id: Option<String>,
    #[serde(default)]
    pub is_library: Option<bool>,
    #[serde(default)]
    pub kind: String,
    #[serde(default)]
    pub reporting: Option<bool>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawId {
    Text(String),
    Integer(i64),
    Float(f64),
}

fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match RawId::deserialize(deserializer)? {
        RawId::Text(text) => text,
        RawId::Integer(number) => number.to_string(),
        RawId::Float(number) => number.to_string(),
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentRating {
    Clean,
    Explicit,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Artwork {
    #[serde(default)]
    pub height: Option<u32>,
    #[serde(default)]
    pub width: Option<u32>,
    pub url: String,
}

impl Artwork {
    /// Artwork URLs are templates with `{w}` and `{h}` placeholders.
    pub fn url_for_size(&self, width: u32, height: u32) -> String {
        self.url
            .replace("{w}", &width.to_string())
            .replace("{h}", &height.to_string())
    }
}

/// A song resource returned by the catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Song {
    pub id: MediaId,
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub href: String,
    #[serde(default)]
    pub attributes: SongAttributes,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SongAttributes {
    pub album_name: String,
    pub artist_name: String,
    pub artwork: Option<Artwork>,
    pub duration_in_millis: u64,
    pub name: String,
    /// Absent when the song is no longer playable from the catalog.
    pub play_params: Option<PlayParams>,
    pub track_number: Option<u32>,
}

impl SongAttributes {
    /// Duration formatted as `m:ss`.
    pub fn track_time(&self) -> String {
        let total = self.duration_in_millis / 1000;
        format!("{}:{:02}", total / 60, total % 60)
    }
}

/// An album in the user's library.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Album {
    pub id: MediaId,
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub href: String,
    #[serde(default)]
    pub attributes: AlbumAttributes,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AlbumAttributes {
    pub artist_name: String,
    pub artwork: Option<Artwork>,
    pub date_added: Option<String>,
    pub name: String,
    pub play_params: Option<PlayParams>,
    pub release_date: Option<String>,
    pub track_count: u32,
}

/// A playlist in the user's library.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LibraryPlaylist {
    pub id: MediaId,
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub href: String,
    #[serde(default)]
    pub attributes: LibraryPlaylistAttributes,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LibraryPlaylistAttributes {
    pub artwork: Option<Artwork>,
    pub can_edit: bool,
    pub date_added: Option<String>,
    pub description: Option<PlaylistDescription>,
    /// Whether the playlist also exists in the catalog.
    pub has_catalog: bool,
    pub name: String,
    pub play_params: Option<PlayParams>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlaylistDescription {
    pub standard: String,
    pub short: Option<String>,
}
