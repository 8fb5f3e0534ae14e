//! Content source implementations

pub mod hentaimama;
pub mod kamyroll;

pub use hentaimama::HentaiMamaSource;
pub use kamyroll::{KamyrollAuth, KamyrollSettings, KamyrollSource};
