use std::fmt;
use std::sync::Arc;

use arc_swap::ArcSwap;
use serde::de::DeserializeOwned;
use url::Url;

use super::envelope::{Meta, decode_page};
use super::{CatalogError, CatalogResult};

const LOG_TARGET: &str = "musicbridge::catalog";

/// Tokens a catalog request is authenticated with.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Credentials {
    pub developer_token: String,
    /// Present once a user has signed in.
    pub user_token: Option<String>,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("developer_token", &"<redacted>")
            .field("user_token", &self.user_token.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// Access to the catalog web API.
///
/// Implementors supply the transport; [`request`](Self::request) handles
/// authentication requirements and response decoding.
pub trait CatalogClient: Send + Sync {
    /// Base every endpoint is resolved against.
    fn base_url(&self) -> &Url;

    fn credentials(&self) -> Credentials;

    /// Perform a GET and return the status code and raw body.
    fn send(&self, url: &Url, credentials: &Credentials) -> CatalogResult<(u16, Vec<u8>)>;

    /// Request `endpoint` (relative to [`base_url`](Self::base_url)) and
    /// decode the `data` of the response envelope.
    fn request<T: DeserializeOwned>(&self, endpoint: &str, requires_user_token: bool) -> CatalogResult<T>
    where
        Self: Sized,
    {
        self.request_page(endpoint, requires_user_token)
            .map(|(data, _)| data)
    }

    /// [`request`](Self::request) for paged endpoints; the envelope's `meta`
    /// comes back alongside the data.
    fn request_page<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        requires_user_token: bool,
    ) -> CatalogResult<(T, Option<Meta>)>
    where
        Self: Sized,
    {
        let credentials = self.credentials();
        if requires_user_token && credentials.user_token.is_none() {
            return Err(CatalogError::RequiresUserToken);
        }
        let url = self
            .base_url()
            .join(endpoint)
            .map_err(|e| CatalogError::InvalidUrl(format!("{endpoint}: {e}")))?;

        log::debug!(target: LOG_TARGET, "GET {}", url);
        let (status, body) = self.send(&url, &credentials)?;
        log::trace!(target: LOG_TARGET, "{} answered {} ({} bytes)", url, status, body.len());
        decode_page(status, &body)
    }
}

/// [`CatalogClient`] over blocking HTTP.
///
/// Must not be called from inside an async task; use
/// `tokio::task::spawn_blocking` there.
pub struct HttpCatalog {
    http: reqwest::blocking::Client,
    base_url: Url,
    credentials: ArcSwap<Credentials>,
}

impl HttpCatalog {
    pub fn new(base_url: Url, credentials: Credentials) -> CatalogResult<Self> {
        let http = reqwest::blocking::Client::builder()
            .user_agent(concat!("musicbridge/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| CatalogError::Transport(e.to_string()))?;
        Ok(Self {
            http,
            base_url,
            credentials: ArcSwap::from_pointee(credentials),
        })
    }

    /// Replace the tokens used by subsequent requests.
    pub fn set_credentials(&self, credentials: Credentials) {
        self.credentials.store(Arc::new(credentials));
    }
}

impl fmt::Debug for HttpCatalog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpCatalog")
            .field("base_url", &self.base_url.as_str())
            .field("credentials", &**self.credentials.load())
            .finish()
    }
}

impl CatalogClient for HttpCatalog {
    fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn credentials(&self) -> Credentials {
        (**self.credentials.load()).clone()
    }

    fn send(&self, url: &Url, credentials: &Credentials) -> CatalogResult<(u16, Vec<u8>)> {
        let mut request = self
            .http
            .get(url.clone())
            .bearer_auth(&credentials.developer_token);
        if let Some(user_token) = &credentials.user_token {
            request = request.header("Music-User-Token", user_token);
        }
        let response = request
            .send()
            .map_err(|e| CatalogError::Transport(e.to_string()))?;
        let status = response.status().as_u16();
        let body = response
            .bytes()
            .map_err(|e| CatalogError::Transport(e.to_string()))?;
        Ok((status, body.to_vec()))
    }
}
