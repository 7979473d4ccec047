use serde::{Deserialize, Serialize};

/// Duration value used when a track's length is not known.
pub const UNKNOWN_DURATION: i64 = -1;

/// One playable track as produced by a catalog loader.
///
/// Records are never mutated after loading; the session and the browse tree
/// hold clones.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackRecord {
    pub id: String,
    pub title: String,
    pub album: String,
    pub artist: String,
    /// Opaque locator handed to the player (a path or URI).
    pub content_locator: String,
    /// Length in milliseconds, or [`UNKNOWN_DURATION`].
    pub duration_ms: i64,
    pub track_number: u32,
    pub total_track_count: u32,
    pub genre: String,
}

impl TrackRecord {
    /// The "nothing playing" record: every field empty, id `""`.
    pub fn nothing() -> Self {
        Self {
            id: String::new(),
            title: String::new(),
            album: String::new(),
            artist: String::new(),
            content_locator: String::new(),
            duration_ms: 0,
            track_number: 0,
            total_track_count: 0,
            genre: String::new(),
        }
    }

    pub fn is_nothing(&self) -> bool {
        self.id.is_empty()
    }

    pub fn has_known_duration(&self) -> bool {
        self.duration_ms >= 0
    }
}
