//! Plain data models exchanged with the runtime and the catalog.

pub mod media;
pub mod playback;

pub use media::{
    Album, AlbumAttributes, Artwork, ContentRating, LibraryPlaylist, LibraryPlaylistAttributes,
    MediaId, MediaItem, MediaItemAttributes, PlayParams, PlaylistDescription, Song,
    SongAttributes,
};
pub use playback::{PlaybackState, RepeatMode, ShuffleMode, UnknownCase};
