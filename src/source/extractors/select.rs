//! Locale fallback chain for pre-resolved, hardsub-tagged manifests.
//!
//! 1. A manifest hardsubbed in the preferred locale needs no subtitle.
//! 2. Otherwise a manifest without hardsubs (empty locale) is used and an
//!    external subtitle is attached: the preferred locale if available,
//!    else the fallback regional variant, else none.
//! 3. Otherwise nothing is selected.

use serde::Deserialize;

use crate::model::{FileUrl, Subtitle, Video, VideoContainer};

/// A candidate stream manifest.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct Manifest {
    #[serde(default)]
    pub hardsub_locale: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
}

/// A candidate external subtitle track.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct SubtitleTrack {
    #[serde(default)]
    pub locale: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub format: Option<String>,
}

/// Outcome of [`select_stream`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selection {
    pub manifest_url: String,
    /// Set when the manifest has no hardsubs and a matching track was found.
    pub subtitle: Option<Subtitle>,
    /// Whether the chosen manifest needed an external subtitle at all.
    pub needs_subtitle: bool,
}

impl Selection {
    /// Build the terminal container: one HLS video plus the optional subtitle.
    #[must_use]
    pub fn into_container(self) -> VideoContainer {
        let url = FileUrl::new(self.manifest_url).with_header("accept", "*/*");
        VideoContainer {
            videos: vec![Video {
                resolution: None,
                is_m3u8: true,
                url,
                size_in_bytes: None,
            }],
            subtitles: self.subtitle.into_iter().collect(),
        }
    }
}

/// Pick a manifest (and subtitle if needed) for `locale`.
///
/// Manifests without a URL are ignored. Deterministic: the first matching
/// entry in input order wins at each step.
pub fn select_stream(
    manifests: &[Manifest],
    subtitles: &[SubtitleTrack],
    locale: &str,
    fallback_locale: &str,
) -> Option<Selection> {
    let with_locale = |wanted: &str| {
        manifests.iter().find_map(|m| match (&m.hardsub_locale, &m.url) {
            (Some(l), Some(url)) if l == wanted => Some(url.clone()),
            _ => None,
        })
    };

    if let Some(url) = with_locale(locale) {
        return Some(Selection {
            manifest_url: url,
            subtitle: None,
            needs_subtitle: false,
        });
    }

    let url = with_locale("")?;
    Some(Selection {
        manifest_url: url,
        subtitle: select_subtitle(subtitles, locale, fallback_locale),
        needs_subtitle: true,
    })
}

/// Subtitle for `locale`, falling back to `fallback_locale`.
pub fn select_subtitle(
    subtitles: &[SubtitleTrack],
    locale: &str,
    fallback_locale: &str,
) -> Option<Subtitle> {
    let find = |wanted: &str| {
        subtitles.iter().find_map(|track| match (&track.locale, &track.url) {
            (Some(l), Some(url)) if l == wanted => Some(Subtitle {
                language: l.clone(),
                url: url.clone(),
                format: track.format.clone().unwrap_or_else(|| "vtt".to_string()),
            }),
            _ => None,
        })
    };

    find(locale).or_else(|| find(fallback_locale))
}
