mod common;

use std::collections::BTreeMap;
use std::sync::Arc;

use anisource::source::providers::{KamyrollAuth, KamyrollSettings, KamyrollSource};
use anisource::{
    ContentSource, SourceError, TitleMetadata, TokenCache, VideoExtractor, VideoServer,
};
use serde_json::json;

use common::{kamyroll_config, param, FakeHttp, Method, API, MALSYNC, TOKEN_BODY};

fn source(http: Arc<FakeHttp>) -> KamyrollSource {
    let config = kamyroll_config();
    let tokens = Arc::new(TokenCache::new(Arc::new(KamyrollAuth::new(
        http.clone(),
        &config,
    ))));
    KamyrollSource::new(http, tokens, KamyrollSettings::from_config(&config))
}

fn season(title: &str, prefix: &str, dubbed: bool) -> serde_json::Value {
    let episodes: Vec<_> = (1..=12)
        .map(|n| {
            json!({
                "id": format!("{prefix}{n}"),
                "sequence_number": n,
                "is_dubbed": dubbed,
                "title": format!("{title} {n}")
            })
        })
        .collect();
    json!({ "title": title, "episodes": episodes })
}

fn seasons_body() -> String {
    json!({
        "items": [
            season("Show (English Dub)", "en", true),
            season("Show (German Dub)", "de", true),
            season("Show", "ja", false)
        ]
    })
    .to_string()
}

fn series_extra(dub: bool) -> BTreeMap<String, String> {
    BTreeMap::from([
        ("type".to_string(), "series".to_string()),
        ("dub".to_string(), dub.to_string()),
    ])
}

#[tokio::test]
async fn subbed_listing_merges_by_sequence() {
    let http = Arc::new(
        FakeHttp::new()
            .post(&format!("{API}/auth/v1/token"), TOKEN_BODY)
            .get(&format!("{API}/content/v1/seasons"), &seasons_body()),
    );
    let source = source(http.clone());

    let episodes = source.load_episodes("GR123", &series_extra(false)).await.unwrap();

    assert_eq!(episodes.len(), 12);
    let numbers: Vec<_> = episodes.iter().map(|e| e.number.as_str()).collect();
    assert_eq!(numbers.first(), Some(&"1"));
    assert_eq!(numbers.last(), Some(&"12"));
    for (i, episode) in episodes.iter().enumerate() {
        assert_eq!(episode.extra.len(), 1);
        assert_eq!(episode.extra.get("Show"), Some(&format!("ja{}", i + 1)));
    }
}

#[tokio::test]
async fn dubbed_listing_carries_every_dub_variant() {
    let http = Arc::new(
        FakeHttp::new()
            .post(&format!("{API}/auth/v1/token"), TOKEN_BODY)
            .get(&format!("{API}/content/v1/seasons"), &seasons_body()),
    );
    let source = source(http.clone());

    let episodes = source.load_episodes("GR123", &series_extra(true)).await.unwrap();

    assert_eq!(episodes.len(), 12);
    let first = &episodes[0];
    assert_eq!(first.link, "en1");
    assert_eq!(first.title.as_deref(), Some("Show (English Dub) 1"));
    assert_eq!(first.extra.len(), 2);
    assert_eq!(first.extra["Show (German Dub)"], "de1");

    let servers = source.load_video_servers(&first.link, &first.extra).await.unwrap();
    let names: Vec<_> = servers.iter().map(|s| s.name.as_str()).collect();
    assert_eq!(names, vec!["Show (English Dub)", "Show (German Dub)"]);
}

#[tokio::test]
async fn requests_carry_bearer_token_and_query_params() {
    let http = Arc::new(
        FakeHttp::new()
            .post(&format!("{API}/auth/v1/token"), TOKEN_BODY)
            .get(&format!("{API}/content/v1/seasons"), &seasons_body()),
    );
    let source = source(http.clone());

    let mut extra = series_extra(false);
    extra.insert("filter".to_string(), "Show".to_string());
    source.load_episodes("GR123", &extra).await.unwrap();
    source.load_episodes("GR123", &extra).await.unwrap();

    assert_eq!(http.count(Method::Post, &format!("{API}/auth/v1/token")), 1);
    let requests = http.requests_to(&format!("{API}/content/v1/seasons"));
    assert_eq!(requests.len(), 2);
    let request = &requests[0];
    assert_eq!(
        request.headers.get("authorization").map(String::as_str),
        Some("Bearer tok")
    );
    assert_eq!(param(request, "id"), Some("GR123"));
    assert_eq!(param(request, "filter"), Some("Show"));
    assert_eq!(param(request, "channel_id"), Some("crunchyroll"));
    assert_eq!(param(request, "locale"), Some("en-US"));
}

#[tokio::test]
async fn search_results_are_ranked_by_similarity() {
    let body = json!({
        "items": [{
            "items": [
                { "id": "a", "media_type": "series", "title": "Naruto Shippuden" },
                { "id": "broken" },
                { "id": "b", "media_type": "series", "title": "Naruto" },
                { "id": "c", "media_type": "movie", "title": "Boruto" }
            ]
        }]
    })
    .to_string();
    let http = Arc::new(
        FakeHttp::new()
            .post(&format!("{API}/auth/v1/token"), TOKEN_BODY)
            .get(&format!("{API}/content/v1/search"), &body),
    );
    let source = source(http.clone());

    let shows = source.search("Naruto").await.unwrap();
    let names: Vec<_> = shows.iter().map(|s| s.name.as_str()).collect();
    assert_eq!(names, vec!["Naruto", "Boruto", "Naruto Shippuden"]);
    assert_eq!(shows[0].link, "b");
    assert_eq!(shows[0].extra["type"], "series");
    assert!(!shows[0].extra.contains_key("filter"));

    let request = &http.requests_to(&format!("{API}/content/v1/search"))[0];
    assert_eq!(param(request, "query"), Some("Naruto"));
    assert_eq!(param(request, "limit"), Some("25"));
}

#[tokio::test]
async fn movie_listing_picks_longest_item() {
    let body = json!({
        "items": [
            { "id": "extra", "duration_ms": 90_000, "title": "Trailer" },
            { "id": "film", "duration_ms": 7_200_000, "title": "The Movie" }
        ]
    })
    .to_string();
    let http = Arc::new(
        FakeHttp::new()
            .post(&format!("{API}/auth/v1/token"), TOKEN_BODY)
            .get(&format!("{API}/content/v1/movies"), &body),
    );
    let source = source(http);

    let extra = BTreeMap::from([("type".to_string(), "movie".to_string())]);
    let episodes = source.load_episodes("MV1", &extra).await.unwrap();
    assert_eq!(episodes.len(), 1);
    assert_eq!(episodes[0].number, "1");
    assert_eq!(episodes[0].link, "film");
}

#[tokio::test]
async fn failed_token_exchange_is_auth_error() {
    let http = Arc::new(
        FakeHttp::new()
            .route(Method::Post, &format!("{API}/auth/v1/token"), 403, "denied")
            .get(&format!("{API}/content/v1/search"), r#"{"items":[]}"#),
    );
    let source = source(http.clone());

    let err = source.search("anything").await.unwrap_err();
    assert!(err.is_auth());
    assert_eq!(http.count(Method::Get, &format!("{API}/content/v1/search")), 0);
}

#[tokio::test]
async fn missing_credentials_is_auth_error() {
    let http = Arc::new(FakeHttp::new());
    let config = anisource::Config {
        kamyroll: anisource::config::KamyrollConfig {
            api_url: API.to_string(),
            ..Default::default()
        },
        ..Default::default()
    };
    let tokens = Arc::new(TokenCache::new(Arc::new(KamyrollAuth::new(
        http.clone(),
        &config,
    ))));
    let source = KamyrollSource::new(http.clone(), tokens, KamyrollSettings::from_config(&config));

    assert!(matches!(source.search("x").await, Err(SourceError::Auth(_))));
    assert!(http.requests_to(API).is_empty());
}

#[tokio::test]
async fn rejected_token_is_dropped() {
    let http = Arc::new(
        FakeHttp::new()
            .post(&format!("{API}/auth/v1/token"), TOKEN_BODY)
            .route(Method::Get, &format!("{API}/content/v1/search"), 401, ""),
    );
    let config = kamyroll_config();
    let tokens = Arc::new(TokenCache::new(Arc::new(KamyrollAuth::new(
        http.clone(),
        &config,
    ))));
    let source = KamyrollSource::new(
        http.clone(),
        tokens.clone(),
        KamyrollSettings::from_config(&config),
    );

    assert!(source.search("x").await.unwrap_err().is_auth());
    assert!(!tokens.is_populated());

    assert!(source.search("x").await.unwrap_err().is_auth());
    assert_eq!(http.count(Method::Post, &format!("{API}/auth/v1/token")), 2);
}

#[tokio::test]
async fn stream_extraction_prefers_hardsub_locale() {
    let body = json!({
        "streams": [
            { "hardsub_locale": "", "url": "https://cdn/raw.m3u8" },
            { "hardsub_locale": "en-US", "url": "https://cdn/en.m3u8" }
        ],
        "subtitles": [{ "locale": "en-US", "url": "https://cdn/en.vtt", "format": "vtt" }]
    })
    .to_string();
    let http = Arc::new(
        FakeHttp::new()
            .post(&format!("{API}/auth/v1/token"), TOKEN_BODY)
            .get(&format!("{API}/videos/v1/streams"), &body),
    );
    let source = source(http.clone());

    let container = source
        .video_extractor(VideoServer::new("Show", "ja1"))
        .extract()
        .await
        .unwrap();

    assert_eq!(container.videos.len(), 1);
    let video = &container.videos[0];
    assert!(video.is_m3u8);
    assert_eq!(video.url.url, "https://cdn/en.m3u8");
    assert_eq!(video.url.headers.get("accept").map(String::as_str), Some("*/*"));
    assert!(container.subtitles.is_empty());

    let request = &http.requests_to(&format!("{API}/videos/v1/streams"))[0];
    assert_eq!(param(request, "id"), Some("ja1"));
    assert_eq!(param(request, "type"), Some("adaptive_hls"));
    assert_eq!(param(request, "service"), Some("google"));
}

#[tokio::test]
async fn stream_extraction_falls_back_to_regional_subtitle() {
    let body = json!({
        "streams": [
            { "hardsub_locale": "fr-FR", "url": "https://cdn/fr.m3u8" },
            { "hardsub_locale": "", "url": "https://cdn/raw.m3u8" }
        ],
        "subtitles": [
            { "locale": "fr-FR", "url": "https://cdn/fr.ass", "format": "ass" },
            { "locale": "en-GB", "url": "https://cdn/gb.vtt" }
        ]
    })
    .to_string();
    let http = Arc::new(
        FakeHttp::new()
            .post(&format!("{API}/auth/v1/token"), TOKEN_BODY)
            .get(&format!("{API}/videos/v1/streams"), &body),
    );
    let source = source(http);

    let container = source
        .video_extractor(VideoServer::new("Show", "ja1"))
        .extract()
        .await
        .unwrap();

    assert_eq!(container.videos[0].url.url, "https://cdn/raw.m3u8");
    assert_eq!(container.subtitles.len(), 1);
    assert_eq!(container.subtitles[0].language, "en-GB");
    assert_eq!(container.subtitles[0].format, "vtt");
}

#[tokio::test]
async fn no_usable_stream_is_empty_container() {
    let body = json!({ "streams": [{ "hardsub_locale": "de-DE", "url": "https://cdn/de.m3u8" }] })
        .to_string();
    let http = Arc::new(
        FakeHttp::new()
            .post(&format!("{API}/auth/v1/token"), TOKEN_BODY)
            .get(&format!("{API}/videos/v1/streams"), &body),
    );
    let source = source(http);

    let container = source
        .video_extractor(VideoServer::new("Show", "ja1"))
        .extract()
        .await
        .unwrap();
    assert!(container.is_empty());
}

const MALSYNC_BODY: &str = r#"{
    "id": 21,
    "Pages": {
        "Crunchyroll": {
            "one-piece-old": { "identifier": "GOLD", "title": "One Piece", "active": false },
            "one-piece": { "identifier": "GRMG8ZQZR", "title": "One Piece", "image": "https://img/op.jpg", "active": true }
        }
    }
}"#;

fn malsync_url(id: u64) -> String {
    format!("{MALSYNC}/anilist/anime/{id}.json")
}

fn catalog_title() -> TitleMetadata {
    let mut title = TitleMetadata::new(21, "One Piece");
    title.format = Some("TV".to_string());
    title.name_user_preferred = Some("ONE PIECE".to_string());
    title
}

#[tokio::test]
async fn catalog_ids_cross_reference_without_lookup() {
    let http = Arc::new(FakeHttp::new());
    let source = source(http.clone());

    let mut title = catalog_title();
    title.crunchy_slug = Some("one-piece".to_string());
    title.vrv_id = Some("GRMG8ZQZR".to_string());
    let show = source.cross_reference(&title, false).await.unwrap();

    assert_eq!(show.name, "Automatically");
    assert_eq!(show.link, "GRMG8ZQZR");
    assert_eq!(show.extra["type"], "series");
    assert_eq!(show.extra["filter"], "ONE PIECE");
    assert!(http.requests_to(MALSYNC).is_empty());
}

#[tokio::test]
async fn malsync_active_page_is_used() {
    let http = Arc::new(FakeHttp::new().get(&malsync_url(21), MALSYNC_BODY));
    let source = source(http.clone());

    let show = source.cross_reference(&catalog_title(), false).await.unwrap();

    assert_eq!(show.link, "GRMG8ZQZR");
    assert_eq!(show.name, "One Piece");
    assert_eq!(show.cover_url, "https://img/op.jpg");
    assert_eq!(show.extra["type"], "series");
    assert_eq!(show.extra["filter"], "ONE PIECE");
}

#[tokio::test]
async fn malsync_inactive_pages_are_ignored() {
    let body = r#"{"Pages":{"Crunchyroll":{"a":{"identifier":"GOLD","title":"One Piece","active":false},"b":{"identifier":"GNULL","title":"One Piece"}}}}"#;
    let http = Arc::new(FakeHttp::new().get(&malsync_url(21), body));
    let source = source(http);

    assert!(source.cross_reference(&catalog_title(), false).await.is_none());
}

#[tokio::test]
async fn malsync_dub_flag_must_match() {
    let http = Arc::new(FakeHttp::new().get(&malsync_url(21), MALSYNC_BODY));
    let source = source(http);

    assert!(source.cross_reference(&catalog_title(), true).await.is_none());
}

#[tokio::test]
async fn malsync_missing_file_is_none() {
    let http = Arc::new(FakeHttp::new().route(
        Method::Get,
        &malsync_url(21),
        404,
        "404: Not Found",
    ));
    let source = source(http.clone());

    assert!(source.cross_reference(&catalog_title(), false).await.is_none());
    assert_eq!(http.requests_to(MALSYNC).len(), 1);
}

#[tokio::test]
async fn malsync_failures_are_swallowed() {
    let http = Arc::new(FakeHttp::new().get(&malsync_url(21), "{ not json"));
    let source = source(http);

    assert!(source.cross_reference(&catalog_title(), false).await.is_none());
}
