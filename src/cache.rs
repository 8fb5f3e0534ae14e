//! Remembered title → source mappings used by auto-search.
//!
//! Entries are keyed by source `save_name` plus the global title id. A
//! mapping to "nothing" is recorded too, but never reported as a hit.

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::Result;
use crate::model::ShowResponse;

/// Persistence for auto-search results.
pub trait ShowCache: Send + Sync {
    fn load(&self, source: &str, title_id: u64) -> Option<ShowResponse>;

    /// Record the outcome of a lookup. `confirmed` marks a mapping that was
    /// re-used (or picked by the user) rather than guessed.
    fn save(&self, source: &str, title_id: u64, response: Option<&ShowResponse>, confirmed: bool);
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheEntry {
    pub response: Option<ShowResponse>,
    pub confirmed: bool,
    pub saved_at: DateTime<Utc>,
}

impl CacheEntry {
    fn new(response: Option<&ShowResponse>, confirmed: bool) -> Self {
        Self {
            response: response.cloned(),
            confirmed,
            saved_at: Utc::now(),
        }
    }
}

fn cache_key(source: &str, title_id: u64) -> String {
    format!("{source}_{title_id}")
}

/// Process-local cache.
#[derive(Default)]
pub struct MemoryShowCache {
    entries: Mutex<HashMap<String, CacheEntry>>,
}

impl MemoryShowCache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entry(&self, source: &str, title_id: u64) -> Option<CacheEntry> {
        self.lock().get(&cache_key(source, title_id)).cloned()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, CacheEntry>> {
        self.entries
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

impl ShowCache for MemoryShowCache {
    fn load(&self, source: &str, title_id: u64) -> Option<ShowResponse> {
        self.lock()
            .get(&cache_key(source, title_id))
            .and_then(|e| e.response.clone())
    }

    fn save(&self, source: &str, title_id: u64, response: Option<&ShowResponse>, confirmed: bool) {
        self.lock().insert(
            cache_key(source, title_id),
            CacheEntry::new(response, confirmed),
        );
    }
}

/// JSON file cache at `~/.cache/anisource/shows.json`.
///
/// `save` updates memory under the lock and hands a snapshot to
/// [`CacheWriter`]. Inside a tokio runtime the write runs on the blocking
/// pool, so async callers never wait on disk.
pub struct FileShowCache {
    state: Mutex<FileState>,
    writer: Arc<CacheWriter>,
}

#[derive(Default)]
struct FileState {
    entries: BTreeMap<String, CacheEntry>,
    version: u64,
}

/// Serializes snapshots to disk. Older snapshots never overwrite newer ones.
struct CacheWriter {
    path: PathBuf,
    written: Mutex<u64>,
}

impl CacheWriter {
    fn persist(&self, version: u64, entries: &BTreeMap<String, CacheEntry>) -> Result<()> {
        let mut written = self
            .written
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        if *written >= version {
            return Ok(());
        }

        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(entries)?;
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, json)?;
        std::fs::rename(&tmp, &self.path)?;
        *written = version;
        Ok(())
    }

    fn persist_logged(&self, version: u64, entries: &BTreeMap<String, CacheEntry>) {
        if let Err(e) = self.persist(version, entries) {
            warn!("Failed to write show cache {}: {e}", self.path.display());
        }
    }
}

impl FileShowCache {
    /// Open the cache at the default location.
    pub fn open_default() -> Result<Self> {
        Self::open(default_path())
    }

    /// Open (or start) a cache file. A corrupt file is discarded.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let entries = if path.exists() {
            let content = std::fs::read_to_string(&path)?;
            serde_json::from_str(&content).unwrap_or_else(|e| {
                warn!("Discarding corrupt show cache {}: {e}", path.display());
                BTreeMap::new()
            })
        } else {
            BTreeMap::new()
        };
        debug!(entries = entries.len(), "Show cache opened");

        Ok(Self {
            state: Mutex::new(FileState {
                entries,
                version: 0,
            }),
            writer: Arc::new(CacheWriter {
                path,
                written: Mutex::new(0),
            }),
        })
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.writer.path
    }

    /// Number of remembered mappings, including "nothing" entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, FileState> {
        self.state
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

impl ShowCache for FileShowCache {
    fn load(&self, source: &str, title_id: u64) -> Option<ShowResponse> {
        self.lock()
            .entries
            .get(&cache_key(source, title_id))
            .and_then(|e| e.response.clone())
    }

    fn save(&self, source: &str, title_id: u64, response: Option<&ShowResponse>, confirmed: bool) {
        let (version, snapshot) = {
            let mut state = self.lock();
            state.entries.insert(
                cache_key(source, title_id),
                CacheEntry::new(response, confirmed),
            );
            state.version += 1;
            (state.version, state.entries.clone())
        };

        let writer = Arc::clone(&self.writer);
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn_blocking(move || writer.persist_logged(version, &snapshot));
            }
            Err(_) => writer.persist_logged(version, &snapshot),
        }
    }
}

/// Return the path to the show cache file.
pub fn default_path() -> PathBuf {
    dirs::cache_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("anisource")
        .join("shows.json")
}
