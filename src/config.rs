//! Configuration loaded from `~/.config/anisource/config.toml`.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::error::{Result, SourceError};

/// Top-level configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Preferred locale for hardsubs and subtitle tracks.
    pub locale: String,
    /// Subtitle locale used when no track matches `locale`.
    pub subtitle_fallback_locale: String,
    /// Register adult sources.
    pub allow_nsfw: bool,
    /// Base of the MAL-Sync-Backup data tree used for cross-references.
    pub malsync_url: String,
    pub http: HttpConfig,
    pub kamyroll: KamyrollConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            locale: "en-US".to_string(),
            subtitle_fallback_locale: "en-GB".to_string(),
            allow_nsfw: false,
            malsync_url: crate::source::malsync::MALSYNC_BASE.to_string(),
            http: HttpConfig::default(),
            kamyroll: KamyrollConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    pub timeout_secs: u64,
    pub connect_timeout_secs: u64,
    pub user_agent: String,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 30,
            connect_timeout_secs: 10,
            user_agent: format!("anisource/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl HttpConfig {
    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    #[must_use]
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }
}

/// Settings for the Kamyroll API source.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct KamyrollConfig {
    pub api_url: String,
    pub channel: String,
    pub service: String,
    /// Client credential sent as `Basic <basic_auth>` during token exchange.
    pub basic_auth: Option<String>,
    pub refresh_token: Option<String>,
}

impl Default for KamyrollConfig {
    fn default() -> Self {
        Self {
            api_url: "https://beta-kamyroll.herokuapp.com".to_string(),
            channel: "crunchyroll".to_string(),
            service: "google".to_string(),
            basic_auth: None,
            refresh_token: None,
        }
    }
}

impl Config {
    /// Load from the default path, then apply environment overrides.
    ///
    /// A missing file is not an error: defaults are used.
    pub fn load() -> Result<Self> {
        let mut config = Self::load_from(&config_path())?;
        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)?;
        Self::parse(&content)
            .map_err(|e| SourceError::Config(format!("invalid TOML in {}: {e}", path.display())))
    }

    pub fn parse(content: &str) -> std::result::Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    fn apply_env(&mut self, var: impl Fn(&str) -> Option<String>) {
        if let Some(locale) = var("ANISOURCE_LOCALE") {
            self.locale = locale;
        }
        if let Some(basic) = var("ANISOURCE_KAMYROLL_BASIC") {
            self.kamyroll.basic_auth = Some(basic);
        }
        if let Some(token) = var("ANISOURCE_KAMYROLL_REFRESH_TOKEN") {
            self.kamyroll.refresh_token = Some(token);
        }
    }
}

/// Return the path to the config file.
pub fn config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("anisource")
        .join("config.toml")
}
