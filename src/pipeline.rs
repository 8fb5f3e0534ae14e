//! Resolution pipeline: title → show → episode → servers → streams.
//!
//! Every source call goes through [`recover`], which turns transport and
//! parse failures into empty results so that one failing source or mirror
//! never aborts a resolution. Auth and configuration failures propagate.

use std::sync::Arc;

use futures::future::join_all;
use serde::Serialize;
use tracing::{debug, info, instrument, warn};

use crate::cache::ShowCache;
use crate::error::Result;
use crate::model::{Episode, ShowResponse, TitleMetadata, VideoContainer, VideoServer};
use crate::registry::SourceRegistry;
use crate::source::provider::Extra;
use crate::source::ContentSource;
use crate::status::StatusSink;

/// Streams extracted from one server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedServer {
    pub server: VideoServer,
    pub container: VideoContainer,
}

/// Outcome of resolving one episode on one source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Resolution {
    pub source: String,
    pub show: ShowResponse,
    pub episode: Episode,
    pub servers: Vec<ResolvedServer>,
}

impl Resolution {
    /// At least one server produced a playable video.
    #[must_use]
    pub fn has_streams(&self) -> bool {
        self.servers.iter().any(|s| !s.container.is_empty())
    }
}

fn recover<T: Default>(source: &str, operation: &str, result: Result<T>) -> Result<T> {
    match result {
        Ok(value) => Ok(value),
        Err(e) if e.is_fatal() => Err(e),
        Err(e) => {
            warn!(source, operation, "Treating failure as empty result: {e}");
            Ok(T::default())
        }
    }
}

pub struct ResolutionPipeline {
    registry: SourceRegistry,
    cache: Arc<dyn ShowCache>,
    status: Arc<dyn StatusSink>,
}

impl ResolutionPipeline {
    pub fn new(
        registry: SourceRegistry,
        cache: Arc<dyn ShowCache>,
        status: Arc<dyn StatusSink>,
    ) -> Self {
        Self {
            registry,
            cache,
            status,
        }
    }

    #[must_use]
    pub fn registry(&self) -> &SourceRegistry {
        &self.registry
    }

    pub async fn search(&self, source: &str, query: &str) -> Result<Vec<ShowResponse>> {
        let source = self.registry.get(source)?;
        recover(source.save_name(), "search", source.search(query).await)
    }

    pub async fn auto_search(
        &self,
        source: &str,
        title: &TitleMetadata,
        dub: bool,
    ) -> Result<Option<ShowResponse>> {
        let source = self.registry.get(source)?;
        self.auto_search_with(source.as_ref(), title, dub).await
    }

    async fn auto_search_with(
        &self,
        source: &dyn ContentSource,
        title: &TitleMetadata,
        dub: bool,
    ) -> Result<Option<ShowResponse>> {
        let result = source
            .auto_search(title, dub, self.cache.as_ref(), self.status.as_ref())
            .await;
        recover(source.save_name(), "auto_search", result)
    }

    /// Episodes of `show`. `dub` is forwarded only to sources that list
    /// dubs separately.
    pub async fn episodes(&self, source: &str, show: &ShowResponse, dub: bool) -> Result<Vec<Episode>> {
        let source = self.registry.get(source)?;
        self.episodes_with(source.as_ref(), show, dub).await
    }

    async fn episodes_with(
        &self,
        source: &dyn ContentSource,
        show: &ShowResponse,
        dub: bool,
    ) -> Result<Vec<Episode>> {
        let mut extra: Extra = show.extra.clone();
        if source.is_dub_available_separately() {
            extra.insert("dub".to_string(), dub.to_string());
        }
        let result = source.load_episodes(&show.link, &extra).await;
        recover(source.save_name(), "load_episodes", result)
    }

    pub async fn servers(&self, source: &str, episode: &Episode) -> Result<Vec<VideoServer>> {
        let source = self.registry.get(source)?;
        let result = source.load_video_servers(&episode.link, &episode.extra).await;
        recover(source.save_name(), "load_video_servers", result)
    }

    pub async fn extract(&self, source: &str, server: VideoServer) -> Result<VideoContainer> {
        let source = self.registry.get(source)?;
        Self::extract_with(source.as_ref(), server).await
    }

    async fn extract_with(source: &dyn ContentSource, server: VideoServer) -> Result<VideoContainer> {
        let extractor = source.video_extractor(server);
        let result = extractor.extract().await;
        recover(source.save_name(), "extract", result)
    }

    /// Resolve one episode of `title` on one source.
    ///
    /// `Ok(None)` means the show or episode could not be found. A
    /// resolution whose servers all came back empty is still returned.
    #[instrument(skip(self, title), fields(title = %title.main_name()))]
    pub async fn resolve(
        &self,
        source: &str,
        title: &TitleMetadata,
        episode_number: &str,
        dub: bool,
    ) -> Result<Option<Resolution>> {
        let source = self.registry.get(source)?;
        let source = source.as_ref();

        let Some(show) = self.auto_search_with(source, title, dub).await? else {
            info!("No show found");
            return Ok(None);
        };
        debug!(show = %show.name, link = %show.link, "Show resolved");

        let episodes = self.episodes_with(source, &show, dub).await?;
        let Some(episode) = episodes.into_iter().find(|e| e.number == episode_number) else {
            info!("Episode {episode_number} not listed");
            return Ok(None);
        };

        let servers = recover(
            source.save_name(),
            "load_video_servers",
            source
                .load_video_servers(&episode.link, &episode.extra)
                .await,
        )?;
        debug!(servers = servers.len(), "Extracting servers");

        let extracted = join_all(servers.into_iter().map(|server| async move {
            let container = Self::extract_with(source, server.clone()).await?;
            Ok::<_, crate::error::SourceError>(ResolvedServer { server, container })
        }))
        .await;
        let servers = extracted.into_iter().collect::<Result<Vec<_>>>()?;

        Ok(Some(Resolution {
            source: source.save_name().to_string(),
            show,
            episode,
            servers,
        }))
    }

    /// Try `sources` in order; the first resolution with a playable video wins.
    ///
    /// A source that fails, even with an auth error, is skipped. The first
    /// error is returned only when no source got as far as a resolution.
    pub async fn resolve_first(
        &self,
        sources: &[&str],
        title: &TitleMetadata,
        episode_number: &str,
        dub: bool,
    ) -> Result<Option<Resolution>> {
        let mut first_error = None;
        let mut resolved_any = false;

        for source in sources {
            match self.resolve(source, title, episode_number, dub).await {
                Ok(Some(resolution)) if resolution.has_streams() => return Ok(Some(resolution)),
                Ok(Some(_)) => resolved_any = true,
                Ok(None) => {}
                Err(e) => {
                    warn!(source, "Skipping source: {e}");
                    first_error.get_or_insert(e);
                }
            }
        }

        match first_error {
            Some(e) if !resolved_any => Err(e),
            _ => Ok(None),
        }
    }

    /// Resolve on every source concurrently, keeping the ones that found the episode.
    ///
    /// Failing sources are skipped; the first error is returned only when
    /// nothing resolved.
    pub async fn resolve_all(
        &self,
        sources: &[&str],
        title: &TitleMetadata,
        episode_number: &str,
        dub: bool,
    ) -> Result<Vec<Resolution>> {
        let results = join_all(
            sources
                .iter()
                .map(|source| self.resolve(source, title, episode_number, dub)),
        )
        .await;

        let mut resolutions = Vec::new();
        let mut first_error = None;
        for (source, result) in sources.iter().zip(results) {
            match result {
                Ok(Some(resolution)) => resolutions.push(resolution),
                Ok(None) => {}
                Err(e) => {
                    warn!(source, "Skipping source: {e}");
                    first_error.get_or_insert(e);
                }
            }
        }

        match first_error {
            Some(e) if resolutions.is_empty() => Err(e),
            _ => Ok(resolutions),
        }
    }
}
