//! Browse tree: a read-only index from node id to ordered children.
//!
//! ```text
//! /
//! +-- __RECOMMENDED__      first track of every album
//! +-- __ALBUMS__
//! |    +-- __ALBUMS__/Alpha
//! |    |    +-- Song One
//! |    |    +-- Song Two
//! +-- __RECENT__           last played track, when it is in the catalog
//! ```
//!
//! A tree is built once from a ready source and never mutated; a reload of
//! the source needs a new tree.

use std::collections::HashMap;

use tracing::debug;

use super::media_id::{CATEGORY_SEPARATOR, encode_component};
use super::model::TrackRecord;
use super::source::MusicSource;

pub const BROWSABLE_ROOT: &str = "/";
pub const RECOMMENDED_ROOT: &str = "__RECOMMENDED__";
pub const ALBUMS_ROOT: &str = "__ALBUMS__";
pub const RECENT_ROOT: &str = "__RECENT__";
/// Root handed to callers that fail authorization. Always has no children.
pub const EMPTY_ROOT: &str = "@empty@";

const UNKNOWN_ALBUM: &str = "Unknown Album";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryItem {
    pub id: String,
    pub title: String,
    pub subtitle: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BrowseEntry {
    /// A node with children of its own.
    Category(CategoryItem),
    /// A playable leaf.
    Track(TrackRecord),
}

impl BrowseEntry {
    pub fn id(&self) -> &str {
        match self {
            BrowseEntry::Category(c) => &c.id,
            BrowseEntry::Track(t) => &t.id,
        }
    }

    pub fn title(&self) -> &str {
        match self {
            BrowseEntry::Category(c) => &c.title,
            BrowseEntry::Track(t) => &t.title,
        }
    }

    pub fn is_browsable(&self) -> bool {
        matches!(self, BrowseEntry::Category(_))
    }
}

/// Node id for the album called `album`.
pub fn album_node_id(album: &str) -> String {
    format!("{ALBUMS_ROOT}{CATEGORY_SEPARATOR}{}", encode_component(album))
}

#[derive(Debug, Default)]
pub struct BrowseTree {
    children: HashMap<String, Vec<BrowseEntry>>,
}

impl BrowseTree {
    /// Build from the current catalog of `source`.
    pub fn from_source(source: &MusicSource, recent_id: Option<&str>) -> Self {
        Self::build(&source.tracks(), recent_id)
    }

    pub fn build(tracks: &[TrackRecord], recent_id: Option<&str>) -> Self {
        let mut children: HashMap<String, Vec<BrowseEntry>> = HashMap::new();
        children.insert(RECOMMENDED_ROOT.to_string(), Vec::new());
        children.insert(ALBUMS_ROOT.to_string(), Vec::new());
        children.insert(EMPTY_ROOT.to_string(), Vec::new());

        let mut recent: Option<TrackRecord> = None;

        for track in tracks {
            let album_id = album_node_id(&track.album);
            if !children.contains_key(&album_id) {
                let title = if track.album.is_empty() {
                    UNKNOWN_ALBUM.to_string()
                } else {
                    track.album.clone()
                };
                children
                    .entry(ALBUMS_ROOT.to_string())
                    .or_default()
                    .push(BrowseEntry::Category(CategoryItem {
                        id: album_id.clone(),
                        title,
                        subtitle: track.artist.clone(),
                    }));
            }
            children
                .entry(album_id)
                .or_default()
                .push(BrowseEntry::Track(track.clone()));

            if track.track_number == 1 {
                children
                    .entry(RECOMMENDED_ROOT.to_string())
                    .or_default()
                    .push(BrowseEntry::Track(track.clone()));
            }

            if recent_id == Some(track.id.as_str()) {
                recent = Some(track.clone());
            }
        }

        let mut root = vec![
            BrowseEntry::Category(CategoryItem {
                id: RECOMMENDED_ROOT.to_string(),
                title: "Recommended".to_string(),
                subtitle: String::new(),
            }),
            BrowseEntry::Category(CategoryItem {
                id: ALBUMS_ROOT.to_string(),
                title: "Albums".to_string(),
                subtitle: String::new(),
            }),
        ];
        if let Some(track) = recent {
            root.push(BrowseEntry::Category(CategoryItem {
                id: RECENT_ROOT.to_string(),
                title: "Recent".to_string(),
                subtitle: String::new(),
            }));
            children.insert(RECENT_ROOT.to_string(), vec![BrowseEntry::Track(track)]);
        }
        children.insert(BROWSABLE_ROOT.to_string(), root);

        debug!(nodes = children.len(), tracks = tracks.len(), "built browse tree");
        Self { children }
    }

    /// Children of `node_id`. `None` means the node does not exist, which is
    /// different from a node with no children.
    pub fn get(&self, node_id: &str) -> Option<&[BrowseEntry]> {
        self.children.get(node_id).map(Vec::as_slice)
    }

    pub fn contains(&self, node_id: &str) -> bool {
        self.children.contains_key(node_id)
    }
}
