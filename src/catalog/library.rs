use super::{CatalogClient, CatalogError, CatalogResult, Meta};
use crate::domain::{MediaId, Song};

/// The signed-in user's cloud library.
pub struct Library<C> {
    client: C,
}

impl<C: CatalogClient> Library<C> {
    pub fn new(client: C) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    /// Look up one library song.
    pub fn song(&self, id: &str) -> CatalogResult<Song> {
        let songs: Vec<Song> = self
            .client
            .request(&format!("me/library/songs/{id}"), false)?;
        songs.into_iter().next().ok_or(CatalogError::EmptyResponse)
    }

    /// Look up several library songs at once.
    pub fn songs(&self, ids: &[MediaId]) -> CatalogResult<Vec<Song>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        self.client
            .request(&format!("me/library/songs?ids={}", ids.join(",")), true)
    }

    /// One page of the library, in library order.
    ///
    /// `Meta::total` tells how many songs the whole library holds.
    pub fn songs_page(&self, limit: usize, offset: usize) -> CatalogResult<(Vec<Song>, Option<Meta>)> {
        self.client.request_page(
            &format!("me/library/songs?limit={limit}&offset={offset}"),
            true,
        )
    }

    /// One page of the tracks of a library playlist.
    pub fn playlist_songs(
        &self,
        playlist: &str,
        limit: usize,
        offset: usize,
    ) -> CatalogResult<(Vec<Song>, Option<Meta>)> {
        self.client.request_page(
            &format!("me/library/playlists/{playlist}/tracks?limit={limit}&offset={offset}"),
            true,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::client::tests::canned;

    #[test]
    fn empty_song_lookup_is_an_error() {
        let library = Library::new(canned(None));
        assert_eq!(library.song("i.abc").unwrap_err(), CatalogError::EmptyResponse);
        assert_eq!(
            *library.client().requested.lock().unwrap(),
            vec!["https://api.example.com/v1/me/library/songs/i.abc"]
        );
    }

    #[test]
    fn songs_need_a_signed_in_user() {
        let library = Library::new(canned(None));
        let error = library.songs(&["i.a".to_string()]).unwrap_err();
        assert_eq!(error, CatalogError::RequiresUserToken);
    }

    #[test]
    fn no_ids_skips_the_request() {
        let library = Library::new(canned(None));
        assert!(library.songs(&[]).unwrap().is_empty());
        assert!(library.client().requested.lock().unwrap().is_empty());
    }

    #[test]
    fn page_query_carries_limit_and_offset() {
        let library = Library::new(canned(Some("user")));
        library.songs_page(25, 50).unwrap();
        assert_eq!(
            *library.client().requested.lock().unwrap(),
            vec!["https://api.example.com/v1/me/library/songs?limit=25&offset=50"]
        );
    }

    #[test]
    fn page_returns_library_total() {
        let mut client = canned(Some("user"));
        client.response = (200, br#"{"data":[],"meta":{"total":812}}"#.to_vec());
        let library = Library::new(client);

        let (songs, meta) = library.songs_page(25, 0).unwrap();

        assert!(songs.is_empty());
        assert_eq!(meta, Some(Meta { total: 812 }));
    }

    #[test]
    fn playlist_tracks_are_paged() {
        let library = Library::new(canned(Some("user")));

        let (_, meta) = library.playlist_songs("p.mix", 10, 20).unwrap();

        assert_eq!(meta, None);
        assert_eq!(
            *library.client().requested.lock().unwrap(),
            vec!["https://api.example.com/v1/me/library/playlists/p.mix/tracks?limit=10&offset=20"]
        );
    }

    #[test]
    fn playlist_tracks_need_a_signed_in_user() {
        let library = Library::new(canned(None));
        assert_eq!(
            library.playlist_songs("p.mix", 10, 0).unwrap_err(),
            CatalogError::RequiresUserToken
        );
    }
}
