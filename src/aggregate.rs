//! Merges per-season and per-dub episode records into one numbered list.
//!
//! Sources that expose each season or audio variant as its own API object
//! return the same episode several times. Records are grouped by sequence
//! number; the first record seen for a number supplies the scalar fields and
//! every record contributes its variant id to `extra`.

use std::collections::btree_map::Entry;
use std::collections::BTreeMap;

use crate::model::Episode;

/// One variant's view of an episode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartialEpisode {
    /// Source-independent ordinal shared by all variants.
    pub sequence: u64,
    /// Display label of the variant, e.g. the season title.
    pub variant: String,
    /// Variant-specific episode id.
    pub link: String,
    pub title: Option<String>,
    pub thumbnail: Option<String>,
    pub description: Option<String>,
}

/// Group `parts` by sequence number into episodes sorted ascending.
///
/// Scalar fields follow first-writer-wins in input order, so callers that
/// fetch concurrently must collect results in request order, not arrival
/// order. The `extra` union itself does not depend on order.
pub fn aggregate<I>(parts: I) -> Vec<Episode>
where
    I: IntoIterator<Item = PartialEpisode>,
{
    let mut by_number: BTreeMap<u64, Episode> = BTreeMap::new();

    for part in parts {
        match by_number.entry(part.sequence) {
            Entry::Vacant(slot) => {
                let mut episode = Episode::new(part.sequence.to_string(), part.link.clone());
                episode.title = part.title;
                episode.thumbnail = part.thumbnail;
                episode.description = part.description;
                episode.extra.insert(part.variant, part.link);
                slot.insert(episode);
            }
            Entry::Occupied(mut slot) => {
                let episode = slot.get_mut();
                if episode.title.is_none() {
                    episode.title = part.title;
                }
                if episode.thumbnail.is_none() {
                    episode.thumbnail = part.thumbnail;
                }
                if episode.description.is_none() {
                    episode.description = part.description;
                }
                episode.extra.entry(part.variant).or_insert(part.link);
            }
        }
    }

    by_number.into_values().collect()
}
