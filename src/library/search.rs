//! Catalog search: focused (facet) filtering with a free-text fallback.

use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::model::TrackRecord;

/// Structured search facet supplied by a controller (e.g. a voice assistant
/// asking for "songs by Artist A").
///
/// Optional parts do not constrain the match when absent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "focus", rename_all = "kebab-case")]
pub enum SearchFocus {
    Genre {
        genre: String,
    },
    Artist {
        artist: String,
    },
    Album {
        album: String,
        artist: Option<String>,
    },
    Song {
        title: String,
        artist: Option<String>,
        album: Option<String>,
    },
}

impl SearchFocus {
    pub fn matches(&self, t: &TrackRecord) -> bool {
        fn opt_eq(want: &Option<String>, have: &str) -> bool {
            want.as_deref().is_none_or(|w| w == have)
        }

        match self {
            SearchFocus::Genre { genre } => t.genre == *genre,
            SearchFocus::Artist { artist } => t.artist == *artist,
            SearchFocus::Album { album, artist } => t.album == *album && opt_eq(artist, &t.artist),
            SearchFocus::Song {
                title,
                artist,
                album,
            } => t.title == *title && opt_eq(artist, &t.artist) && opt_eq(album, &t.album),
        }
    }
}

fn contains_ignore_case(haystack: &str, needle_lower: &str) -> bool {
    haystack.to_lowercase().contains(needle_lower)
}

/// Search `tracks`.
///
/// A focused search wins when it yields anything. Otherwise a non-blank
/// `query` is matched case-insensitively against title and genre, keeping
/// catalog order. A blank query returns the whole catalog shuffled.
pub fn search_tracks(
    tracks: &[TrackRecord],
    query: &str,
    focus: Option<&SearchFocus>,
) -> Vec<TrackRecord> {
    if let Some(focus) = focus {
        let focused: Vec<TrackRecord> = tracks.iter().filter(|t| focus.matches(t)).cloned().collect();
        debug!(?focus, hits = focused.len(), "focused search");
        if !focused.is_empty() {
            return focused;
        }
    }

    let query = query.trim();
    if query.is_empty() {
        debug!("unfocused search without keyword");
        let mut all = tracks.to_vec();
        all.shuffle(&mut rand::rng());
        return all;
    }

    let needle = query.to_lowercase();
    tracks
        .iter()
        .filter(|t| contains_ignore_case(&t.title, &needle) || contains_ignore_case(&t.genre, &needle))
        .cloned()
        .collect()
}
