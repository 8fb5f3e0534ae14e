//! Content sources and video extractors
//!
//! A [`ContentSource`] turns a title into episodes and mirrors for one
//! external site or API; a [`VideoExtractor`] turns one mirror into
//! playable streams.

pub mod extractor;
pub mod extractors;
pub mod malsync;
pub mod provider;
pub mod providers;

pub use extractor::VideoExtractor;
pub use malsync::MalSyncBackup;
pub use provider::ContentSource;
