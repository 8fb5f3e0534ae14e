//! Lookup of content sources by identifier.
//!
//! Sources are kept in registration order; lookup is by
//! [`ContentSource::save_name`].

use std::sync::Arc;

use crate::config::Config;
use crate::error::{Result, SourceError};
use crate::http_client::HttpClient;
use crate::source::providers::{HentaiMamaSource, KamyrollAuth, KamyrollSettings, KamyrollSource};
use crate::source::ContentSource;
use crate::token::TokenCache;

#[derive(Default)]
pub struct SourceRegistry {
    sources: Vec<Arc<dyn ContentSource>>,
}

impl SourceRegistry {
    /// An empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with every built-in source. Adult sources are only added
    /// when `config.allow_nsfw` is set.
    pub fn with_defaults(config: &Config, http: Arc<dyn HttpClient>) -> Self {
        let tokens = Arc::new(TokenCache::new(Arc::new(KamyrollAuth::new(
            http.clone(),
            config,
        ))));

        let mut registry = Self::new();
        registry.register(Arc::new(KamyrollSource::new(
            http.clone(),
            tokens,
            KamyrollSettings::from_config(config),
        )));
        if config.allow_nsfw {
            registry.register(Arc::new(HentaiMamaSource::new(http)));
        }
        registry
    }

    /// Add a source. A source with the same `save_name` is replaced.
    pub fn register(&mut self, source: Arc<dyn ContentSource>) {
        self.sources.retain(|s| s.save_name() != source.save_name());
        self.sources.push(source);
    }

    pub fn get(&self, name: &str) -> Result<Arc<dyn ContentSource>> {
        let wanted = name.to_lowercase();
        self.sources
            .iter()
            .find(|s| s.save_name() == wanted)
            .cloned()
            .ok_or_else(|| SourceError::UnknownSource(name.to_string()))
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.sources.iter().map(|s| s.save_name()).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<dyn ContentSource>> {
        self.sources.iter()
    }
}
