//! Error taxonomy shared by the service client and the core pipeline.
//!
//! Command handlers wrap these in `anyhow` with context; everything below the
//! command layer returns [`MixtapeError`] so callers can tell a structural
//! failure (missing source, failed creation) from a per-item one.

use std::time::Duration;
use thiserror::Error;

/// Result alias for core operations
pub type Result<T> = std::result::Result<T, MixtapeError>;

#[derive(Error, Debug)]
pub enum MixtapeError {
    /// Playlist, track or genre group could not be resolved
    #[error("Not found: {0}")]
    NotFound(String),

    /// An operation needs at least one item and got none
    #[error("Nothing to work with: {0}")]
    EmptyInput(String),

    /// The remote service answered with a failure or could not be reached
    #[error("Spotify error: {0}")]
    ExternalService(String),

    /// The remote service throttled the request
    #[error("Rate limited by Spotify, retry after {}s", retry_after.as_secs())]
    RateLimited { retry_after: Duration },

    /// A new playlist could not be created
    #[error("Could not create playlist: {0}")]
    Creation(String),

    /// User supplied something unusable (bad URL, empty genre name, ...)
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}
