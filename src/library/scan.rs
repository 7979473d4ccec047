use std::collections::HashSet;
use std::ffi::OsStr;
use std::path::{Path, PathBuf};

use lofty::prelude::*;
use tracing::{debug, info};
use walkdir::{DirEntry, WalkDir};
use xxhash_rust::xxh64::xxh64;

use crate::config::LibrarySettings;
use crate::error::{Error, Result};

use super::model::{TrackRecord, UNKNOWN_DURATION};
use super::source::CatalogLoader;

/// Catalog loader that walks a music directory and reads tags with `lofty`.
pub struct DirectoryLoader {
    root: PathBuf,
    settings: LibrarySettings,
}

impl DirectoryLoader {
    pub fn new(root: impl Into<PathBuf>, settings: LibrarySettings) -> Self {
        Self {
            root: root.into(),
            settings,
        }
    }
}

impl CatalogLoader for DirectoryLoader {
    fn load(&self) -> Result<Vec<TrackRecord>> {
        if !self.root.is_dir() {
            return Err(Error::SourceLoad(format!(
                "{} is not a directory",
                self.root.display()
            )));
        }
        let tracks = scan(&self.root, &self.settings);
        info!(root = %self.root.display(), count = tracks.len(), "scanned music directory");
        Ok(tracks)
    }
}

/// Lower-cased extensions without the leading dot.
fn audio_extensions(settings: &LibrarySettings) -> HashSet<String> {
    settings
        .extensions
        .iter()
        .map(|e| e.trim().trim_start_matches('.').to_ascii_lowercase())
        .filter(|e| !e.is_empty())
        .collect()
}

fn has_extension(path: &Path, extensions: &HashSet<String>) -> bool {
    path.extension()
        .and_then(OsStr::to_str)
        .is_some_and(|ext| extensions.contains(&ext.to_ascii_lowercase()))
}

fn is_dotfile(path: &Path) -> bool {
    path.file_name()
        .and_then(OsStr::to_str)
        .is_some_and(|name| name.starts_with('.'))
}

/// Stable id derived from the file path, so ids survive rescans.
pub(crate) fn track_id_for(path: &Path) -> String {
    format!("{:016x}", xxh64(path.to_string_lossy().as_bytes(), 0))
}

fn non_empty(v: Option<std::borrow::Cow<'_, str>>) -> Option<String> {
    v.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
}

fn read_record(path: &Path) -> TrackRecord {
    let mut record = TrackRecord {
        id: track_id_for(path),
        title: path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("UNKNOWN")
            .to_string(),
        album: String::new(),
        artist: String::new(),
        content_locator: path.to_string_lossy().into_owned(),
        duration_ms: UNKNOWN_DURATION,
        track_number: 0,
        total_track_count: 0,
        genre: String::new(),
    };

    match lofty::read_from_path(path) {
        Ok(tagged) => {
            record.duration_ms = tagged.properties().duration().as_millis() as i64;

            if let Some(tag) = tagged.primary_tag().or_else(|| tagged.first_tag()) {
                if let Some(v) = non_empty(tag.title()) {
                    record.title = v;
                }
                if let Some(v) = non_empty(tag.artist()) {
                    record.artist = v;
                }
                if let Some(v) = non_empty(tag.album()) {
                    record.album = v;
                }
                if let Some(v) = non_empty(tag.genre()) {
                    record.genre = v;
                }
                record.track_number = tag.track().unwrap_or(0);
                record.total_track_count = tag.track_total().unwrap_or(0);
            }
        }
        Err(e) => debug!(path = %path.display(), error = %e, "no readable tags"),
    }

    record
}

/// Walk `dir` and build one record per audio file, ordered by title.
pub fn scan(dir: &Path, settings: &LibrarySettings) -> Vec<TrackRecord> {
    let extensions = audio_extensions(settings);
    let max_depth = match (settings.recursive, settings.max_depth) {
        (false, _) => Some(1),
        (true, depth) => depth,
    };

    let mut walker = WalkDir::new(dir).follow_links(settings.follow_links);
    if let Some(depth) = max_depth {
        walker = walker.max_depth(depth);
    }

    let visible = |e: &DirEntry| settings.include_hidden || e.depth() == 0 || !is_dotfile(e.path());
    let mut tracks = Vec::new();
    for entry in walker.into_iter().filter_entry(visible) {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                debug!(error = %e, "skipping unreadable entry");
                continue;
            }
        };
        let is_file = entry.file_type().is_file() || (settings.follow_links && entry.path().is_file());
        if is_file && has_extension(entry.path(), &extensions) {
            tracks.push(read_record(entry.path()));
        }
    }

    tracks.sort_by_cached_key(|t| (t.title.to_lowercase(), t.content_locator.clone()));
    tracks
}
