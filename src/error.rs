//! Error taxonomy for source resolution.
//!
//! Only [`SourceError::Auth`] is meant to escape a resolution attempt; every
//! other variant is recovered at the pipeline boundary and turned into an
//! empty result.

use thiserror::Error;

/// Source resolution errors
#[derive(Error, Debug)]
pub enum SourceError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{url} returned status {status}")]
    Status { url: String, status: u16 },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Malformed response: {0}")]
    Malformed(String),

    #[error("Authentication failed: {0}")]
    Auth(String),

    #[error("Unknown source: {0}")]
    UnknownSource(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Config error: {0}")]
    Config(String),
}

impl SourceError {
    /// Auth failures have no sensible empty substitute and must propagate.
    #[must_use]
    pub fn is_auth(&self) -> bool {
        matches!(self, Self::Auth(_))
    }

    /// Errors that abort the caller rather than degrade to "nothing found".
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Auth(_) | Self::UnknownSource(_) | Self::Config(_))
    }
}

pub type Result<T> = std::result::Result<T, SourceError>;
