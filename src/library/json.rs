//! Catalog loader for JSON documents of the form `{"music": [ ... ]}`.
//!
//! Each entry carries `id`, `title`, `album`, `artist`, `genre`, `source`,
//! `trackNumber`, `totalTrackCount` and `duration` (seconds). Missing fields
//! take their defaults; a duration of `-1` stays unknown.

use std::path::PathBuf;

use serde::Deserialize;
use tracing::info;

use crate::error::{Error, Result};

use super::model::{TrackRecord, UNKNOWN_DURATION};
use super::source::CatalogLoader;

#[derive(Debug, Default, Deserialize)]
struct Catalog {
    #[serde(default)]
    music: Vec<CatalogEntry>,
}

#[derive(Debug, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct CatalogEntry {
    id: String,
    title: String,
    album: String,
    artist: String,
    genre: String,
    source: String,
    track_number: u32,
    total_track_count: u32,
    #[serde(deserialize_with = "lenient_i64")]
    duration: i64,
}

impl Default for CatalogEntry {
    fn default() -> Self {
        Self {
            id: String::new(),
            title: String::new(),
            album: String::new(),
            artist: String::new(),
            genre: String::new(),
            source: String::new(),
            track_number: 0,
            total_track_count: 0,
            duration: UNKNOWN_DURATION,
        }
    }
}

/// Media indexes export numbers as strings (`"duration": "215"`); take both.
fn lenient_i64<'de, D>(d: D) -> std::result::Result<i64, D::Error>
where
    D: serde::Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum NumOrString {
        Num(i64),
        Str(String),
    }

    match NumOrString::deserialize(d)? {
        NumOrString::Num(n) => Ok(n),
        NumOrString::Str(s) => s.trim().parse().map_err(serde::de::Error::custom),
    }
}

impl From<CatalogEntry> for TrackRecord {
    fn from(e: CatalogEntry) -> Self {
        let duration_ms = if e.duration < 0 {
            UNKNOWN_DURATION
        } else {
            e.duration.saturating_mul(1000)
        };
        TrackRecord {
            id: e.id,
            title: e.title,
            album: e.album,
            artist: e.artist,
            content_locator: e.source,
            duration_ms,
            track_number: e.track_number,
            total_track_count: e.total_track_count,
            genre: e.genre,
        }
    }
}

/// Parse a catalog document.
pub fn parse_catalog(text: &str) -> Result<Vec<TrackRecord>> {
    let catalog: Catalog =
        serde_json::from_str(text).map_err(|e| Error::SourceLoad(e.to_string()))?;
    Ok(catalog.music.into_iter().map(TrackRecord::from).collect())
}

pub struct JsonCatalogLoader {
    path: PathBuf,
}

impl JsonCatalogLoader {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl CatalogLoader for JsonCatalogLoader {
    fn load(&self) -> Result<Vec<TrackRecord>> {
        let text = std::fs::read_to_string(&self.path)
            .map_err(|e| Error::SourceLoad(format!("{}: {e}", self.path.display())))?;
        let tracks = parse_catalog(&text)?;
        info!(path = %self.path.display(), count = tracks.len(), "loaded json catalog");
        Ok(tracks)
    }
}
