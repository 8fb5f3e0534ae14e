//! Kamyroll (Crunchyroll mirror API) source
//!
//! Every endpoint needs a bearer token obtained by exchanging a refresh
//! token; the token is held in a shared [`TokenCache`]. Seasons and dubs
//! come back as separate objects and are merged by sequence number.

use std::cmp::Reverse;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use crate::aggregate::{aggregate, PartialEpisode};
use crate::config::Config;
use crate::error::{Result, SourceError};
use crate::http_client::{HttpClient, HttpResponse, Request};
use crate::model::{AccessToken, Episode, ShowResponse, TitleMetadata, VideoContainer, VideoServer};
use crate::script::parse_lenient_list;
use crate::similarity::rank_by_similarity;
use crate::source::extractors::{select_stream, Manifest, Selection, SubtitleTrack};
use crate::source::malsync::MalSyncBackup;
use crate::source::provider::{ContentSource, Extra};
use crate::source::VideoExtractor;
use crate::token::{TokenCache, TokenExchange};

const LISTING_TIMEOUT: Duration = Duration::from_secs(100);
const STREAMS_TIMEOUT: Duration = Duration::from_secs(60);
const SEARCH_LIMIT: &str = "25";
const POSTER_INDEX: usize = 5;
const EPISODE_THUMB_INDEX: usize = 6;
const MOVIE_THUMB_INDEX: usize = 5;
const MALSYNC_SITE: &str = "Crunchyroll";

/// API settings shared by the source and its extractors.
#[derive(Debug, Clone)]
pub struct KamyrollSettings {
    pub api_url: String,
    pub channel: String,
    pub service: String,
    pub locale: String,
    pub subtitle_fallback_locale: String,
    pub malsync_url: String,
}

impl KamyrollSettings {
    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        Self {
            api_url: config.kamyroll.api_url.trim_end_matches('/').to_string(),
            channel: config.kamyroll.channel.clone(),
            service: config.kamyroll.service.clone(),
            locale: config.locale.clone(),
            subtitle_fallback_locale: config.subtitle_fallback_locale.clone(),
            malsync_url: config.malsync_url.clone(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.api_url)
    }

    fn request(&self, path: &str) -> Request {
        Request::new(self.url(path))
            .param("channel_id", &self.channel)
            .param("locale", &self.locale)
    }
}

/// Refresh-token exchange against `/auth/v1/token`.
pub struct KamyrollAuth {
    http: Arc<dyn HttpClient>,
    api_url: String,
    basic_auth: Option<String>,
    refresh_token: Option<String>,
}

impl KamyrollAuth {
    #[must_use]
    pub fn new(http: Arc<dyn HttpClient>, config: &Config) -> Self {
        Self {
            http,
            api_url: config.kamyroll.api_url.trim_end_matches('/').to_string(),
            basic_auth: config.kamyroll.basic_auth.clone(),
            refresh_token: config.kamyroll.refresh_token.clone(),
        }
    }
}

#[async_trait]
impl TokenExchange for KamyrollAuth {
    async fn exchange(&self) -> Result<AccessToken> {
        let (Some(basic), Some(refresh)) = (&self.basic_auth, &self.refresh_token) else {
            return Err(SourceError::Auth(
                "kamyroll credentials are not configured".to_string(),
            ));
        };

        let request = Request::new(format!("{}/auth/v1/token", self.api_url))
            .header("authorization", format!("Basic {basic}"))
            .form("refresh_token", refresh)
            .form("grant_type", "refresh_token")
            .form("scope", "offline_access");

        let response = self
            .http
            .post(request)
            .await
            .map_err(|e| SourceError::Auth(format!("token exchange failed: {e}")))?;
        if !response.is_success() {
            return Err(SourceError::Auth(format!(
                "token exchange returned {}",
                response.status
            )));
        }

        let token: TokenResponse = response
            .json()
            .map_err(|e| SourceError::Auth(format!("unreadable token response: {e}")))?;
        Ok(AccessToken {
            value: token.access_token,
            scheme: token.token_type,
        })
    }
}

/// Authenticated GET. A 401 drops the cached token.
async fn api_get(http: &dyn HttpClient, tokens: &TokenCache, request: Request) -> Result<HttpResponse> {
    let headers = tokens.headers().await?;
    let response = http.get(request.headers(&headers)).await?;
    if response.status == 401 {
        tokens.invalidate();
        return Err(SourceError::Auth(format!("{} rejected the access token", response.url)));
    }
    response.error_for_status()
}

pub struct KamyrollSource {
    http: Arc<dyn HttpClient>,
    tokens: Arc<TokenCache>,
    settings: Arc<KamyrollSettings>,
    malsync: MalSyncBackup,
}

impl KamyrollSource {
    pub fn new(http: Arc<dyn HttpClient>, tokens: Arc<TokenCache>, settings: KamyrollSettings) -> Self {
        let malsync = MalSyncBackup::with_base(http.clone(), &settings.malsync_url);
        Self {
            http,
            tokens,
            settings: Arc::new(settings),
            malsync,
        }
    }

    /// Search, tagging results with a season `filter` when one is given.
    pub async fn search_with_filter(
        &self,
        query: &str,
        filter: Option<&str>,
    ) -> Result<Vec<ShowResponse>> {
        let request = self
            .settings
            .request("/content/v1/search")
            .param("limit", SEARCH_LIMIT)
            .param("query", query);
        let response: SearchResponse = api_get(self.http.as_ref(), &self.tokens, request)
            .await?
            .json()?;

        let mut shows: Vec<ShowResponse> = response
            .items
            .unwrap_or_default()
            .into_iter()
            .flat_map(|bucket| parse_lenient_list::<SearchItem>(bucket.items))
            .map(|item| {
                let cover = item
                    .images
                    .and_then(|i| i.poster_tall)
                    .and_then(|p| p.into_iter().nth(POSTER_INDEX))
                    .and_then(|p| p.source)
                    .unwrap_or_default();
                let mut show = ShowResponse::new(item.title, item.id, cover)
                    .with_extra("type", item.media_type);
                if let Some(filter) = filter {
                    show = show.with_extra("filter", filter);
                }
                show
            })
            .collect();

        rank_by_similarity(&mut shows, query, |s| s.name.as_str());
        Ok(shows)
    }

    async fn load_series(&self, series_id: &str, extra: &Extra) -> Result<Vec<Episode>> {
        let mut request = self
            .settings
            .request("/content/v1/seasons")
            .param("id", series_id)
            .timeout(LISTING_TIMEOUT);
        if let Some(filter) = extra.get("filter") {
            request = request.param("filter", filter);
        }
        let response: SeasonsResponse = api_get(self.http.as_ref(), &self.tokens, request)
            .await?
            .json()?;

        let dub = extra.get("dub").map(|v| v == "true");
        let parts = partial_episodes(response, dub);
        debug!(records = parts.len(), "Aggregating season episodes");
        Ok(aggregate(parts))
    }

    async fn load_movie(&self, movie_id: &str) -> Result<Vec<Episode>> {
        let request = self
            .settings
            .request("/content/v1/movies")
            .param("id", movie_id)
            .timeout(LISTING_TIMEOUT);
        let response: MoviesResponse = api_get(self.http.as_ref(), &self.tokens, request)
            .await?
            .json()?;

        let movies: Vec<KamyEpisode> = parse_lenient_list(response.items.unwrap_or_default());
        Ok(longest_movie(movies).into_iter().collect())
    }
}

/// Flatten season listings into per-variant records, keeping only
/// episodes whose dubbed flag matches `dub` when it is set.
fn partial_episodes(response: SeasonsResponse, dub: Option<bool>) -> Vec<PartialEpisode> {
    parse_lenient_list::<SeasonItem>(response.items.unwrap_or_default())
        .into_iter()
        .filter_map(|season| Some((season.title?, season.episodes?)))
        .flat_map(|(variant, episodes)| {
            parse_lenient_list::<KamyEpisode>(episodes)
                .into_iter()
                .filter(move |ep| dub.map_or(true, |d| ep.is_dubbed.unwrap_or(false) == d))
                .filter_map(move |ep| {
                    Some(PartialEpisode {
                        sequence: ep.sequence_number?,
                        variant: variant.clone(),
                        thumbnail: ep.thumbnail(EPISODE_THUMB_INDEX),
                        link: ep.id,
                        title: ep.title,
                        description: ep.description,
                    })
                })
        })
        .collect()
}

/// The movie item with the longest runtime, as episode "1".
fn longest_movie(movies: Vec<KamyEpisode>) -> Option<Episode> {
    let movie = movies
        .into_iter()
        .enumerate()
        .max_by_key(|(i, m)| (m.duration_ms.unwrap_or(0), Reverse(*i)))
        .map(|(_, m)| m)?;

    let mut episode = Episode::new("1", movie.id.clone());
    episode.thumbnail = movie.thumbnail(MOVIE_THUMB_INDEX);
    episode.title = movie.title;
    episode.description = movie.description;
    Some(episode)
}

#[async_trait]
impl ContentSource for KamyrollSource {
    fn name(&self) -> &'static str {
        "Kamyroll"
    }

    fn save_name(&self) -> &'static str {
        "kamyroll"
    }

    fn host_url(&self) -> &str {
        &self.settings.api_url
    }

    fn is_dub_available_separately(&self) -> bool {
        true
    }

    async fn search(&self, query: &str) -> Result<Vec<ShowResponse>> {
        self.search_with_filter(query, None).await
    }

    async fn load_episodes(&self, show_link: &str, extra: &Extra) -> Result<Vec<Episode>> {
        if extra.get("type").map(String::as_str) == Some("series") {
            self.load_series(show_link, extra).await
        } else {
            self.load_movie(show_link).await
        }
    }

    async fn load_video_servers(
        &self,
        episode_link: &str,
        extra: &Extra,
    ) -> Result<Vec<VideoServer>> {
        if extra.is_empty() {
            return Ok(vec![VideoServer::new(&self.settings.channel, episode_link)]);
        }
        Ok(extra
            .iter()
            .map(|(variant, id)| VideoServer::new(variant, id))
            .collect())
    }

    fn video_extractor(&self, server: VideoServer) -> Box<dyn VideoExtractor> {
        Box::new(KamyrollExtractor {
            http: self.http.clone(),
            tokens: self.tokens.clone(),
            settings: self.settings.clone(),
            server,
        })
    }

    async fn cross_reference(&self, title: &TitleMetadata, dub: bool) -> Option<ShowResponse> {
        let show = match title.vrv_id.as_ref().or(title.crunchy_slug.as_ref()) {
            Some(id) => ShowResponse::new("Automatically", id.clone(), ""),
            None => self.malsync.lookup(title.id, MALSYNC_SITE, dub).await?,
        };
        let kind = if title.is_series() { "series" } else { "" };
        Some(
            show.with_extra("type", kind)
                .with_extra("filter", title.preferred_name()),
        )
    }

    async fn search_for(&self, _title: &TitleMetadata, name: &str) -> Result<Vec<ShowResponse>> {
        self.search_with_filter(name, Some(name)).await
    }
}

/// Resolves an episode id to an adaptive HLS manifest plus subtitle.
pub struct KamyrollExtractor {
    http: Arc<dyn HttpClient>,
    tokens: Arc<TokenCache>,
    settings: Arc<KamyrollSettings>,
    server: VideoServer,
}

#[async_trait]
impl VideoExtractor for KamyrollExtractor {
    fn server(&self) -> &VideoServer {
        &self.server
    }

    async fn extract(&self) -> Result<VideoContainer> {
        let request = self
            .settings
            .request("/videos/v1/streams")
            .param("id", &self.server.embed.url)
            .param("type", "adaptive_hls")
            .param("format", "vtt")
            .param("service", &self.settings.service)
            .timeout(STREAMS_TIMEOUT);
        let response: StreamsResponse = api_get(self.http.as_ref(), &self.tokens, request)
            .await?
            .json()?;

        let streams: Vec<Manifest> = parse_lenient_list(response.streams.unwrap_or_default());
        let subtitles: Vec<SubtitleTrack> =
            parse_lenient_list(response.subtitles.unwrap_or_default());

        let selection = select_stream(
            &streams,
            &subtitles,
            &self.settings.locale,
            &self.settings.subtitle_fallback_locale,
        );
        Ok(selection.map_or_else(VideoContainer::empty, Selection::into_container))
    }
}

// Serde structures for Kamyroll API responses
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    token_type: String,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    items: Option<Vec<SearchBucket>>,
}

#[derive(Debug, Deserialize)]
struct SearchBucket {
    #[serde(default)]
    items: Vec<Value>,
}

#[derive(Debug, Deserialize)]
struct SearchItem {
    id: String,
    media_type: String,
    title: String,
    images: Option<SearchImages>,
}

#[derive(Debug, Deserialize)]
struct SearchImages {
    poster_tall: Option<Vec<Image>>,
}

#[derive(Debug, Deserialize)]
struct Image {
    source: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SeasonsResponse {
    items: Option<Vec<Value>>,
}

#[derive(Debug, Deserialize)]
struct SeasonItem {
    title: Option<String>,
    episodes: Option<Vec<Value>>,
}

#[derive(Debug, Deserialize)]
struct MoviesResponse {
    items: Option<Vec<Value>>,
}

#[derive(Debug, Deserialize)]
struct KamyEpisode {
    id: String,
    sequence_number: Option<u64>,
    title: Option<String>,
    description: Option<String>,
    is_dubbed: Option<bool>,
    images: Option<EpisodeImages>,
    duration_ms: Option<u64>,
}

impl KamyEpisode {
    fn thumbnail(&self, index: usize) -> Option<String> {
        self.images
            .as_ref()?
            .thumbnail
            .as_ref()?
            .get(index)?
            .source
            .clone()
    }
}

#[derive(Debug, Deserialize)]
struct EpisodeImages {
    thumbnail: Option<Vec<Image>>,
}

#[derive(Debug, Deserialize)]
struct StreamsResponse {
    subtitles: Option<Vec<Value>>,
    streams: Option<Vec<Value>>,
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn episode(id: &str, seq: u64, dubbed: bool) -> Value {
        json!({ "id": id, "sequence_number": seq, "is_dubbed": dubbed, "title": format!("Ep {seq}") })
    }

    #[test]
    fn partial_episodes_filters_by_dub_flag() {
        let response: SeasonsResponse = serde_json::from_value(json!({
            "items": [
                { "title": "Show", "episodes": [episode("s1", 1, false), episode("s2", 2, false)] },
                { "title": "Show (English Dub)", "episodes": [episode("d1", 1, true)] }
            ]
        }))
        .unwrap();

        let subs = partial_episodes(response, Some(false));
        assert_eq!(subs.len(), 2);
        assert!(subs.iter().all(|p| p.variant == "Show"));
    }

    #[test]
    fn partial_episodes_skips_malformed_records() {
        let response: SeasonsResponse = serde_json::from_value(json!({
            "items": [
                { "title": "Show", "episodes": [
                    episode("s1", 1, false),
                    { "sequence_number": 2 },
                    { "id": "s3", "sequence_number": "three" },
                    { "id": "s4" },
                    episode("s5", 5, false)
                ] },
                { "episodes": [episode("x", 1, false)] },
                "not an object"
            ]
        }))
        .unwrap();

        let parts = partial_episodes(response, None);
        let links: Vec<_> = parts.iter().map(|p| p.link.as_str()).collect();
        assert_eq!(links, vec!["s1", "s5"]);
    }

    #[test]
    fn longest_movie_wins_first_on_tie() {
        let movies: Vec<KamyEpisode> = parse_lenient_list(vec![
            json!({ "id": "trailer", "duration_ms": 60_000 }),
            json!({ "id": "feature", "duration_ms": 6_000_000,
                    "images": { "thumbnail": [{}, {}, {}, {}, {}, { "source": "thumb-5" }] } }),
            json!({ "id": "feature-alt", "duration_ms": 6_000_000 }),
        ]);
        let episode = longest_movie(movies).unwrap();
        assert_eq!(episode.number, "1");
        assert_eq!(episode.link, "feature");
        assert_eq!(episode.thumbnail.as_deref(), Some("thumb-5"));
    }

    #[test]
    fn no_movies_no_episode() {
        assert!(longest_movie(Vec::new()).is_none());
    }

    #[test]
    fn settings_request_carries_channel_and_locale() {
        let settings = KamyrollSettings::from_config(&Config::default());
        let request = settings.request("/content/v1/search");
        assert_eq!(request.url, "https://beta-kamyroll.herokuapp.com/content/v1/search");
        assert!(request
            .params
            .contains(&("channel_id".to_string(), "crunchyroll".to_string())));
        assert!(request
            .params
            .contains(&("locale".to_string(), "en-US".to_string())));
    }
}
