//! `HentaiMama` source (WordPress/DooPlay theme HTML site)
//!
//! Listings are scraped from HTML; mirrors come from the theme's
//! `admin-ajax.php` player endpoint as a JSON list of iframe snippets.

use std::sync::Arc;

use async_trait::async_trait;
use scraper::{ElementRef, Html, Selector};

use crate::error::Result;
use crate::http_client::{HttpClient, Request};
use crate::model::{Episode, ShowResponse, VideoServer};
use crate::script::find_between;
use crate::source::extractors::EmbedExtractor;
use crate::source::provider::{ContentSource, Extra};
use crate::source::VideoExtractor;

const HENTAIMAMA_BASE: &str = "https://hentaimama.io";

const SEARCH_ITEM: &str = "div.result-item article";
const SEARCH_LINK: &str = "div.details div.title a";
const SEARCH_COVER: &str = "div.image div a img";
const EPISODE_ITEM: &str =
    "div#episodes.sbox.fixidtab div.module.series div.content.series div.items article";
const EPISODE_NUMBER: &str = "div.data h3";
const EPISODE_LINK: &str = "div.poster div.season_m.animation-3 a";
const EPISODE_THUMB: &str = "div.poster img";
const POST_ID: &str = "#post_report > input:nth-child(5)";

pub struct HentaiMamaSource {
    http: Arc<dyn HttpClient>,
    host: String,
}

impl HentaiMamaSource {
    pub fn new(http: Arc<dyn HttpClient>) -> Self {
        Self::with_host(http, HENTAIMAMA_BASE)
    }

    pub fn with_host(http: Arc<dyn HttpClient>, host: &str) -> Self {
        Self {
            http,
            host: host.trim_end_matches('/').to_string(),
        }
    }

    fn search_url(&self, query: &str) -> String {
        format!("{}/?s={}", self.host, urlencoding::encode(query))
    }

    fn ajax_url(&self) -> String {
        format!("{}/wp-admin/admin-ajax.php", self.host)
    }
}

fn first_attr(scope: ElementRef<'_>, css: &str, attr: &str) -> Option<String> {
    let selector = Selector::parse(css).ok()?;
    scope
        .select(&selector)
        .next()
        .and_then(|el| el.value().attr(attr))
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(ToString::to_string)
}

fn first_text(scope: ElementRef<'_>, css: &str) -> String {
    let Ok(selector) = Selector::parse(css) else {
        return String::new();
    };
    scope
        .select(&selector)
        .next()
        .map(|el| el.text().collect::<String>())
        .unwrap_or_default()
        .trim()
        .to_string()
}

/// Parse the search results page. Items without a link are skipped.
fn parse_search(body: &str) -> Vec<ShowResponse> {
    let Ok(items) = Selector::parse(SEARCH_ITEM) else {
        return Vec::new();
    };
    let document = Html::parse_document(body);
    document
        .select(&items)
        .filter_map(|item| {
            let link = first_attr(item, SEARCH_LINK, "href")?;
            let title = first_text(item, SEARCH_LINK);
            let cover = first_attr(item, SEARCH_COVER, "src").unwrap_or_default();
            Some(ShowResponse::new(title, link, cover))
        })
        .collect()
}

/// Parse a show page. The site lists newest first; output is ascending.
fn parse_episodes(body: &str) -> Vec<Episode> {
    let Ok(items) = Selector::parse(EPISODE_ITEM) else {
        return Vec::new();
    };
    let document = Html::parse_document(body);
    let mut episodes: Vec<Episode> = document
        .select(&items)
        .filter_map(|item| {
            let link = first_attr(item, EPISODE_LINK, "href")?;
            let number = first_text(item, EPISODE_NUMBER)
                .replace("Episode", "")
                .trim()
                .to_string();
            let mut episode = Episode::new(number, link);
            episode.thumbnail = first_attr(item, EPISODE_THUMB, "data-src");
            Some(episode)
        })
        .collect();
    episodes.reverse();
    episodes
}

fn parse_post_id(body: &str) -> Option<String> {
    let document = Html::parse_document(body);
    let root = document.root_element();
    first_attr(root, POST_ID, "value")
}

/// Turn the player snippets into mirrors, numbering them in order.
fn parse_servers(snippets: &[String]) -> Vec<VideoServer> {
    snippets
        .iter()
        .filter_map(|snippet| find_between(snippet, "src=\"", "\""))
        .enumerate()
        .map(|(i, url)| VideoServer::new(format!("Mirror {i}"), url))
        .collect()
}

#[async_trait]
impl ContentSource for HentaiMamaSource {
    fn name(&self) -> &'static str {
        "Hentaimama"
    }

    fn save_name(&self) -> &'static str {
        "hentaimama"
    }

    fn host_url(&self) -> &str {
        &self.host
    }

    fn is_nsfw(&self) -> bool {
        true
    }

    async fn search(&self, query: &str) -> Result<Vec<ShowResponse>> {
        let response = self
            .http
            .get(Request::new(self.search_url(query)))
            .await?
            .error_for_status()?;
        Ok(parse_search(&response.text))
    }

    async fn load_episodes(&self, show_link: &str, _extra: &Extra) -> Result<Vec<Episode>> {
        let response = self
            .http
            .get(Request::new(show_link))
            .await?
            .error_for_status()?;
        Ok(parse_episodes(&response.text))
    }

    async fn load_video_servers(
        &self,
        episode_link: &str,
        _extra: &Extra,
    ) -> Result<Vec<VideoServer>> {
        let page = self
            .http
            .get(Request::new(episode_link))
            .await?
            .error_for_status()?;
        let Some(post_id) = parse_post_id(&page.text) else {
            tracing::debug!("No post id on {episode_link}");
            return Ok(Vec::new());
        };

        let request = Request::new(self.ajax_url())
            .form("action", "get_player_contents")
            .form("a", post_id);
        let snippets: Vec<String> = self.http.post(request).await?.error_for_status()?.json()?;
        Ok(parse_servers(&snippets))
    }

    fn video_extractor(&self, server: VideoServer) -> Box<dyn VideoExtractor> {
        Box::new(EmbedExtractor::new(self.http.clone(), server))
    }
}
