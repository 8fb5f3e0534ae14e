//! Reusable extraction strategies

pub mod embed;
pub mod select;

pub use embed::EmbedExtractor;
pub use select::{select_stream, select_subtitle, Manifest, Selection, SubtitleTrack};
