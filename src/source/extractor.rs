//! Video extractor trait.
//!
//! An extractor is bound to one [`VideoServer`] by
//! [`ContentSource::video_extractor`](super::ContentSource::video_extractor)
//! and knows how to decode that server's embed into streams.

use async_trait::async_trait;

use crate::error::Result;
use crate::model::{VideoContainer, VideoServer};

#[async_trait]
pub trait VideoExtractor: Send + Sync {
    /// The server this extractor was created for.
    fn server(&self) -> &VideoServer;

    /// Resolve the server into streams.
    ///
    /// "Nothing playable" is `Ok` with an empty container; `Err` is reserved
    /// for transport, parse and auth failures.
    async fn extract(&self) -> Result<VideoContainer>;
}
