//! Common result shapes shared by every content source.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

/// A title as identified by one specific source.
///
/// `link` is opaque and only meaningful to the source that produced it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShowResponse {
    /// Display title as the source lists it.
    pub name: String,
    /// Source-native identifier: a page URL or an API id.
    pub link: String,
    /// Poster image URL, empty when the source has none.
    pub cover_url: String,
    /// Routing hints for episode listing, e.g. `type` and `filter`.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub extra: BTreeMap<String, String>,
}

impl ShowResponse {
    pub fn new(name: impl Into<String>, link: impl Into<String>, cover_url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            link: link.into(),
            cover_url: cover_url.into(),
            extra: BTreeMap::new(),
        }
    }

    #[must_use]
    pub fn with_extra(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.extra.insert(key.into(), value.into());
        self
    }
}

/// One episode of a show. `number` is the merge key across dub/sub variants.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Episode {
    /// Episode number as text ("1", "12.5").
    pub number: String,
    /// Source-native identifier of the episode.
    pub link: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Preview image URL.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thumbnail: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Marked filler by the source.
    #[serde(default)]
    pub is_filler: bool,
    /// Source-specific routing data, e.g. variant label to variant episode id.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub extra: BTreeMap<String, String>,
}

impl Episode {
    pub fn new(number: impl Into<String>, link: impl Into<String>) -> Self {
        Self {
            number: number.into(),
            link: link.into(),
            title: None,
            thumbnail: None,
            description: None,
            is_filler: false,
            extra: BTreeMap::new(),
        }
    }
}

/// A URL plus the headers needed to fetch it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileUrl {
    /// Absolute URL.
    pub url: String,
    /// Headers to send with every request for `url`, e.g. `referer`.
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub headers: HashMap<String, String>,
}

impl FileUrl {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            headers: HashMap::new(),
        }
    }

    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }
}

/// One mirror exposed by a source for one episode.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VideoServer {
    /// Mirror label shown to the user, e.g. "Mirror 0" or a dub variant.
    pub name: String,
    /// Where the extractor starts: an embed page or a source API id.
    pub embed: FileUrl,
}

impl VideoServer {
    pub fn new(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            embed: FileUrl::new(url),
        }
    }
}

/// A single playable stream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Video {
    /// Height label such as "1080p", when known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resolution: Option<String>,
    /// HLS playlist rather than a single file.
    pub is_m3u8: bool,
    /// Stream location and the headers needed to play it.
    pub url: FileUrl,
    /// Reported content length. Never set for HLS playlists.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size_in_bytes: Option<u64>,
}

/// An external subtitle track delivered alongside a stream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subtitle {
    /// Locale tag such as `en-US`.
    pub language: String,
    /// Subtitle file URL.
    pub url: String,
    /// File format, e.g. `vtt` or `ass`.
    pub format: String,
}

/// Terminal output of extraction for one server.
///
/// An empty `videos` list means "no stream found" and is not an error.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VideoContainer {
    /// Playable streams, best first.
    pub videos: Vec<Video>,
    /// Subtitle tracks for the streams.
    pub subtitles: Vec<Subtitle>,
}

impl VideoContainer {
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.videos.is_empty()
    }
}

/// A bearer credential held by [`crate::token::TokenCache`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessToken {
    /// Opaque token text.
    pub value: String,
    /// Authorization scheme, usually `Bearer`.
    pub scheme: String,
}

impl AccessToken {
    /// Value for the `authorization` header, e.g. `Bearer abc`.
    #[must_use]
    pub fn header_value(&self) -> String {
        format!("{} {}", self.scheme, self.value)
    }
}

/// Metadata about a title taken from the global catalog (e.g. `AniList`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TitleMetadata {
    /// Global title id, used as the cache key.
    pub id: u64,
    /// Romanized title, always present.
    pub name_romaji: String,
    /// English title, when the catalog has one.
    #[serde(default)]
    pub name_english: Option<String>,
    /// Title in the catalog user's preferred language.
    #[serde(default)]
    pub name_user_preferred: Option<String>,
    /// Catalog format such as `TV`, `MOVIE`, `OVA`.
    #[serde(default)]
    pub format: Option<String>,
    /// Crunchyroll series id from the catalog's external links.
    #[serde(default)]
    pub crunchy_slug: Option<String>,
    /// VRV series id from the catalog's external links.
    #[serde(default)]
    pub vrv_id: Option<String>,
}

impl TitleMetadata {
    pub fn new(id: u64, name_romaji: impl Into<String>) -> Self {
        Self {
            id,
            name_romaji: name_romaji.into(),
            ..Self::default()
        }
    }

    /// Primary search name: English when known, romaji otherwise.
    #[must_use]
    pub fn main_name(&self) -> &str {
        self.name_english.as_deref().unwrap_or(&self.name_romaji)
    }

    /// The name the catalog user sees, used as a season filter.
    #[must_use]
    pub fn preferred_name(&self) -> &str {
        self.name_user_preferred
            .as_deref()
            .unwrap_or(&self.name_romaji)
    }

    #[must_use]
    pub fn is_series(&self) -> bool {
        self.format.as_deref() == Some("TV")
    }
}
