//! Extractor for player embed pages.
//!
//! Tries a direct `<video><source>` element first. Failing that, it reads
//! the `sources: [...]` array that JW-style players inline in a script,
//! repairs it into JSON and maps each `{type, file}` entry to a video.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use futures::future::join_all;
use scraper::Selector;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::error::Result;
use crate::http_client::{HttpClient, Request};
use crate::model::{FileUrl, Video, VideoContainer, VideoServer};
use crate::script::{find_between, parse_js_array, parse_lenient_list};
use crate::source::VideoExtractor;

const SOURCES_START: &str = "sources: [";
const SOURCES_END: &str = "],";

pub struct EmbedExtractor {
    http: Arc<dyn HttpClient>,
    server: VideoServer,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ScriptSource {
    #[serde(rename = "type", default)]
    pub kind: String,
    pub file: String,
}

/// What an embed page exposes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EmbedContent {
    Direct(String),
    Script(Vec<ScriptSource>),
    Nothing,
}

impl EmbedExtractor {
    pub fn new(http: Arc<dyn HttpClient>, server: VideoServer) -> Self {
        Self { http, server }
    }

    async fn fetch_size(&self, url: &str) -> Option<u64> {
        match self.http.content_length(url, &HashMap::new()).await {
            Ok(size) => size,
            Err(e) => {
                debug!("Size lookup failed for {url}: {e}");
                None
            }
        }
    }

    async fn script_video(&self, source: ScriptSource) -> Video {
        let is_m3u8 = source.kind == "hls";
        let size_in_bytes = if is_m3u8 {
            None
        } else {
            self.fetch_size(&source.file).await
        };
        Video {
            resolution: None,
            is_m3u8,
            url: FileUrl::new(source.file),
            size_in_bytes,
        }
    }
}

/// Classify an embed page body. Pure, so it never holds the DOM across I/O.
pub fn parse_embed_page(body: &str) -> EmbedContent {
    if let Some(src) = direct_source(body) {
        return EmbedContent::Direct(src);
    }

    let Some(raw) = find_between(body, SOURCES_START, SOURCES_END) else {
        return EmbedContent::Nothing;
    };

    match parse_js_array(&format!("[{raw}]")) {
        Ok(values) => EmbedContent::Script(parse_lenient_list(values)),
        Err(e) => {
            warn!("Unparseable player sources: {e}");
            EmbedContent::Nothing
        }
    }
}

fn direct_source(body: &str) -> Option<String> {
    let document = scraper::Html::parse_document(body);
    let selector = Selector::parse("video > source").ok()?;
    document
        .select(&selector)
        .next()
        .and_then(|el| el.value().attr("src"))
        .map(str::trim)
        .filter(|src| !src.is_empty())
        .map(ToString::to_string)
}

#[async_trait]
impl VideoExtractor for EmbedExtractor {
    fn server(&self) -> &VideoServer {
        &self.server
    }

    async fn extract(&self) -> Result<VideoContainer> {
        let response = self
            .http
            .get(Request::new(&self.server.embed.url).headers(&self.server.embed.headers))
            .await?
            .error_for_status()?;

        let videos = match parse_embed_page(&response.text) {
            EmbedContent::Direct(src) => {
                let is_m3u8 = src.contains(".m3u8");
                let size_in_bytes = if is_m3u8 { None } else { self.fetch_size(&src).await };
                vec![Video {
                    resolution: None,
                    is_m3u8,
                    url: FileUrl::new(src),
                    size_in_bytes,
                }]
            }
            EmbedContent::Script(sources) => {
                join_all(sources.into_iter().map(|s| self.script_video(s))).await
            }
            EmbedContent::Nothing => {
                debug!(server = %self.server.name, "No player sources on embed page");
                Vec::new()
            }
        };

        Ok(VideoContainer {
            videos,
            subtitles: Vec::new(),
        })
    }
}
