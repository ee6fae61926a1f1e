//! Web catalog collaborator.
//!
//! Requests go straight to the catalog web API over HTTP, authenticated with
//! the developer token (and the user token for personal library endpoints)
//! that the runtime hands out.

mod client;
mod envelope;
mod library;

pub use client::{CatalogClient, Credentials, HttpCatalog};
pub use envelope::{ApiError, Meta, decode_envelope, decode_page};
pub use library::Library;

use thiserror::Error;

/// Result type for catalog requests
pub type CatalogResult<T> = Result<T, CatalogError>;

/// Failures of a catalog request
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CatalogError {
    /// The request never produced a response
    #[error("HTTP error: {0}")]
    Transport(String),

    /// The response was not an envelope and carried an error status
    #[error("URL request failed with status code {0}")]
    Status(u16),

    /// The envelope carried an `errors` array
    #[error("Catalog returned errors: {}", ApiError::join(.0))]
    Api(Vec<ApiError>),

    /// The envelope had neither `data` nor `errors`
    #[error("Expected values for keys named \"data\" or \"errors\"")]
    MissingEnvelope,

    /// The endpoint needs a signed-in user and there is none
    #[error("This endpoint requires that a user is signed in")]
    RequiresUserToken,

    /// The endpoint could not be joined onto the catalog base URL
    #[error("The URL supplied for the endpoint is invalid: {0}")]
    InvalidUrl(String),

    /// The body was not valid JSON or `data` had an unexpected shape
    #[error("Failed to decode catalog response: {0}")]
    Decoding(String),

    /// The request succeeded but returned nothing
    #[error("The catalog returned an empty response")]
    EmptyResponse,
}
