//! Content source trait.
//!
//! Each implementor wraps one external site or API and normalizes its
//! listings into [`ShowResponse`], [`Episode`] and [`VideoServer`].

use std::collections::BTreeMap;

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::cache::ShowCache;
use crate::error::Result;
use crate::model::{Episode, ShowResponse, TitleMetadata, VideoServer};
use crate::source::VideoExtractor;
use crate::status::StatusSink;

/// Routing hints passed between listing calls (`type`, `filter`, `dub`, ...).
pub type Extra = BTreeMap<String, String>;

#[async_trait]
pub trait ContentSource: Send + Sync {
    /// Display name (e.g., `"Kamyroll"`).
    fn name(&self) -> &'static str;

    /// Stable lowercase identifier used for lookup and cache keys.
    fn save_name(&self) -> &'static str;

    fn host_url(&self) -> &str;

    /// Whether dubbed and subbed releases are listed separately and the
    /// `dub` routing hint is honoured by [`load_episodes`](Self::load_episodes).
    fn is_dub_available_separately(&self) -> bool {
        false
    }

    fn is_nsfw(&self) -> bool {
        false
    }

    /// Query the source's catalog. No match is an empty vec.
    async fn search(&self, query: &str) -> Result<Vec<ShowResponse>>;

    /// Full episode list for a show, ascending.
    async fn load_episodes(&self, show_link: &str, extra: &Extra) -> Result<Vec<Episode>>;

    /// Mirrors for one episode, in the order the source declares them.
    async fn load_video_servers(&self, episode_link: &str, extra: &Extra)
        -> Result<Vec<VideoServer>>;

    /// Bind a server to the extractor that can decode it.
    fn video_extractor(&self, server: VideoServer) -> Box<dyn VideoExtractor>;

    /// Map the title to a source-native show without searching, either from
    /// identifiers it already carries or from an external cross-reference.
    async fn cross_reference(&self, title: &TitleMetadata, dub: bool) -> Option<ShowResponse> {
        let _ = (title, dub);
        None
    }

    /// Search on behalf of [`auto_search`](Self::auto_search). Sources can
    /// attach routing hints derived from the searched name.
    async fn search_for(&self, title: &TitleMetadata, name: &str) -> Result<Vec<ShowResponse>> {
        let _ = title;
        self.search(name).await
    }

    /// Resolve a title without user interaction.
    ///
    /// In order: a cached mapping (re-confirmed), a cross-reference, a
    /// search by main name, a search by romaji name. Whatever comes out,
    /// including nothing, is written back to the cache.
    async fn auto_search(
        &self,
        title: &TitleMetadata,
        dub: bool,
        cache: &dyn ShowCache,
        status: &dyn StatusSink,
    ) -> Result<Option<ShowResponse>> {
        if let Some(saved) = cache.load(self.save_name(), title.id) {
            debug!(source = self.save_name(), id = title.id, "Using cached mapping");
            cache.save(self.save_name(), title.id, Some(&saved), true);
            return Ok(Some(saved));
        }

        let mut response = self.cross_reference(title, dub).await;

        let mut names = vec![title.main_name()];
        if title.name_romaji != title.main_name() {
            names.push(&title.name_romaji);
        }

        for name in names {
            if response.is_some() {
                break;
            }
            status.report(&format!("Searching: {name}"));
            response = match self.search_for(title, name).await {
                Ok(results) => results.into_iter().next(),
                Err(e) if e.is_fatal() => return Err(e),
                Err(e) => {
                    warn!("{} search for {name:?} failed: {e}", self.name());
                    None
                }
            };
        }

        cache.save(self.save_name(), title.id, response.as_ref(), false);
        Ok(response)
    }
}
