use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde::de::DeserializeOwned;
use serde_json::Value;

use super::{CatalogError, CatalogResult};

/// One entry of an envelope's `errors` array.
///
/// Kept as the raw string map the API sends (`id`, `title`, `detail`,
/// `status`, `code`, ...).
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(transparent)]
pub struct ApiError(pub BTreeMap<String, String>);

impl ApiError {
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    pub(crate) fn join(errors: &[ApiError]) -> String {
        errors
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join("; ")
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.get("title"), self.get("detail")) {
            (Some(title), Some(detail)) => write!(f, "{title}: {detail}"),
            (Some(title), None) => f.write_str(title),
            _ => write!(f, "{:?}", self.0),
        }
    }
}

/// Paging metadata of a response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Meta {
    pub total: u64,
}

#[derive(Deserialize)]
struct Envelope {
    data: Option<Value>,
    meta: Option<Meta>,
    errors: Option<Vec<ApiError>>,
}

/// Decode a response body.
///
/// `data` wins over `errors`. A body that is not an envelope at all is
/// reported by status when the status signals failure, otherwise as a
/// decoding error.
pub fn decode_envelope<T: DeserializeOwned>(status: u16, body: &[u8]) -> CatalogResult<T> {
    decode_page(status, body).map(|(data, _)| data)
}

/// Like [`decode_envelope`], but also hands back the paging metadata.
pub fn decode_page<T: DeserializeOwned>(
    status: u16,
    body: &[u8],
) -> CatalogResult<(T, Option<Meta>)> {
    let envelope: Envelope = match serde_json::from_slice(body) {
        Ok(envelope) => envelope,
        Err(_) if status >= 400 => return Err(CatalogError::Status(status)),
        Err(error) => return Err(CatalogError::Decoding(error.to_string())),
    };
    match (envelope.data, envelope.errors) {
        (Some(data), _) => serde_json::from_value(data)
            .map(|data| (data, envelope.meta))
            .map_err(|e| CatalogError::Decoding(e.to_string())),
        (None, Some(errors)) => Err(CatalogError::Api(errors)),
        (None, None) => Err(CatalogError::MissingEnvelope),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Song;

    #[test]
    fn data_decodes_into_songs() {
        let body = br#"{"data":[{"id":"1","type":"library-songs","href":"/v1/me/library/songs/1",
            "attributes":{"name":"Song","artistName":"Artist","albumName":"Album","durationInMillis":61000}}],
            "meta":{"total":1}}"#;

        let songs: Vec<Song> = decode_envelope(200, body).unwrap();

        assert_eq!(songs.len(), 1);
        assert_eq!(songs[0].attributes.track_time(), "1:01");
    }

    #[test]
    fn page_keeps_meta_when_present() {
        let with_meta = br#"{"data":[],"meta":{"total":120}}"#;
        let without_meta = br#"{"data":[]}"#;

        let (songs, meta) = decode_page::<Vec<Song>>(200, with_meta).unwrap();
        assert!(songs.is_empty());
        assert_eq!(meta, Some(Meta { total: 120 }));
        assert_eq!(decode_page::<Vec<Song>>(200, without_meta).unwrap().1, None);
    }

    #[test]
    fn errors_array_is_reported() {
        let body = br#"{"errors":[{"id":"X","title":"Unauthorized","detail":"bad token","status":"401","code":"40100"}]}"#;

        let error = decode_envelope::<Vec<Song>>(401, body).unwrap_err();

        match error {
            CatalogError::Api(errors) => {
                assert_eq!(errors[0].get("code"), Some("40100"));
                assert_eq!(errors[0].to_string(), "Unauthorized: bad token");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn non_envelope_with_error_status_reports_status() {
        let error = decode_envelope::<Value>(503, b"<html>down</html>").unwrap_err();
        assert_eq!(error, CatalogError::Status(503));
    }

    #[test]
    fn non_envelope_with_ok_status_is_decoding_error() {
        let error = decode_envelope::<Value>(200, b"not json").unwrap_err();
        assert!(matches!(error, CatalogError::Decoding(_)));
    }

    #[test]
    fn empty_object_is_missing_envelope() {
        let error = decode_envelope::<Value>(200, b"{}").unwrap_err();
        assert_eq!(error, CatalogError::MissingEnvelope);
    }
}
