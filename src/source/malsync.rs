//! Cross-references from catalog ids to source-native identifiers.
//!
//! MAL-Sync-Backup publishes one JSON file per `AniList` id listing the
//! pages each streaming site has for that title. Lookups are best-effort:
//! any failure is logged and treated as "no mapping".

use std::collections::HashMap;
use std::sync::Arc;

use serde::Deserialize;
use serde_json::{Map, Value};
use tracing::debug;

use crate::error::Result;
use crate::http_client::{HttpClient, Request};
use crate::model::ShowResponse;

pub const MALSYNC_BASE: &str =
    "https://raw.githubusercontent.com/MALSync/MAL-Sync-Backup/master/data";

/// Body GitHub's raw host serves for a missing file.
const NOT_FOUND_BODY: &str = "404: Not Found";

#[derive(Debug, Deserialize)]
struct Backup {
    #[serde(rename = "Pages")]
    pages: Option<HashMap<String, Map<String, Value>>>,
}

/// One site's page for a title.
#[derive(Debug, Deserialize)]
struct Page {
    identifier: String,
    title: String,
    image: Option<String>,
    active: Option<bool>,
}

impl Page {
    fn is_dub(&self) -> bool {
        self.title.to_lowercase().replace(' ', "").ends_with("(dub)")
    }
}

pub struct MalSyncBackup {
    http: Arc<dyn HttpClient>,
    base: String,
}

impl MalSyncBackup {
    pub fn new(http: Arc<dyn HttpClient>) -> Self {
        Self::with_base(http, MALSYNC_BASE)
    }

    pub fn with_base(http: Arc<dyn HttpClient>, base: &str) -> Self {
        Self {
            http,
            base: base.trim_end_matches('/').to_string(),
        }
    }

    fn anime_url(&self, anilist_id: u64) -> String {
        format!("{}/anilist/anime/{anilist_id}.json", self.base)
    }

    /// The first active page under `site` whose dub marker matches `dub`.
    pub async fn lookup(&self, anilist_id: u64, site: &str, dub: bool) -> Option<ShowResponse> {
        match self.fetch(anilist_id, site, dub).await {
            Ok(show) => show,
            Err(e) => {
                debug!(anilist_id, site, "MalSync lookup failed: {e}");
                None
            }
        }
    }

    async fn fetch(&self, anilist_id: u64, site: &str, dub: bool) -> Result<Option<ShowResponse>> {
        let response = self.http.get(Request::new(self.anime_url(anilist_id))).await?;
        if response.text.trim() == NOT_FOUND_BODY {
            return Ok(None);
        }
        pick_page(&response.error_for_status()?.text, site, dub)
    }
}

/// Select the mapping for `site` from a backup file body.
fn pick_page(body: &str, site: &str, dub: bool) -> Result<Option<ShowResponse>> {
    let backup: Backup = serde_json::from_str(body)?;
    let Some(pages) = backup.pages.and_then(|mut p| p.remove(site)) else {
        return Ok(None);
    };

    Ok(pages
        .into_iter()
        .filter_map(|(_, value)| serde_json::from_value::<Page>(value).ok())
        .find(|page| page.active == Some(true) && page.is_dub() == dub)
        .map(|page| {
            ShowResponse::new(page.title, page.identifier, page.image.unwrap_or_default())
        }))
}
