//! `anisource` - resolve anime titles to playable streams
//!
//! # Features
//!
//! - **Interchangeable sources**: one [`ContentSource`] per site or API,
//!   looked up by name through [`SourceRegistry`]
//! - **Episode merging**: per-season and per-dub listings folded into one
//!   numbered list
//! - **Defensive extraction**: direct media elements, repaired inline
//!   player scripts, locale-aware manifest selection
//! - **Graceful degradation**: failures become empty results, auth
//!   failures propagate
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use anisource::{
//!     Config, MemoryShowCache, ReqwestClient, ResolutionPipeline, SourceRegistry, TitleMetadata,
//!     TracingStatus,
//! };
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load()?;
//!     let http = Arc::new(ReqwestClient::new(&config.http)?);
//!     let pipeline = ResolutionPipeline::new(
//!         SourceRegistry::with_defaults(&config, http),
//!         Arc::new(MemoryShowCache::new()),
//!         Arc::new(TracingStatus),
//!     );
//!
//!     let title = TitleMetadata::new(21, "One Piece");
//!     if let Some(resolution) = pipeline.resolve("kamyroll", &title, "1", false).await? {
//!         println!("{} servers", resolution.servers.len());
//!     }
//!     Ok(())
//! }
//! ```

pub mod aggregate;
pub mod cache;
pub mod config;
pub mod error;
pub mod http_client;
pub mod model;
pub mod pipeline;
pub mod registry;
pub mod script;
pub mod similarity;
pub mod source;
pub mod status;
pub mod token;

pub use cache::{FileShowCache, MemoryShowCache, ShowCache};
pub use config::Config;
pub use error::{Result, SourceError};
pub use http_client::{HttpClient, HttpResponse, ReqwestClient, Request};
pub use model::{
    AccessToken, Episode, FileUrl, ShowResponse, Subtitle, TitleMetadata, Video, VideoContainer,
    VideoServer,
};
pub use pipeline::{Resolution, ResolutionPipeline, ResolvedServer};
pub use registry::SourceRegistry;
pub use source::{ContentSource, VideoExtractor};
pub use status::{NoStatus, StatusSink, TracingStatus};
pub use token::{TokenCache, TokenExchange};

/// Version of anisource
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
