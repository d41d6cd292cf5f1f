//! Error taxonomy for the package lifecycle
//!
//! Every variant here ends up as a transient status message in the UI; none of
//! them are fatal to the main loop.

use std::path::PathBuf;
use thiserror::Error;

/// Failure of a single HTTP fetch
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FetchError {
    /// Server answered with a non-200 status
    #[error("HTTP {0}")]
    Status(u16),

    /// Request never produced a response
    #[error("{0}")]
    Transport(String),
}

/// Errors surfaced by the catalog, version store and installer
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("WiFi not connected")]
    NetworkUnavailable,

    #[error("Failed Loading Scripts ({0})")]
    CatalogFetchFailed(FetchError),

    #[error("Malformed catalog: {0}")]
    MalformedCatalog(String),

    #[error("Failed Loading Metadata ({source})")]
    MetadataFetchFailed {
        reference: String,
        #[source]
        source: FetchError,
    },

    #[error("Malformed metadata for {reference}: {reason}")]
    MalformedMetadata { reference: String, reason: String },

    #[error("Download failed: {source} for {file}")]
    FileFetchFailed {
        file: String,
        #[source]
        source: FetchError,
    },

    #[error("Failed to write file: {}", .path.display())]
    FileWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to delete file: {}", .path.display())]
    FileDeleteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Persisted version map could not be read back; treated as empty state
    #[error("Version store corrupt: {0}")]
    StorageCorrupt(String),
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;
