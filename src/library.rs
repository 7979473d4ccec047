//! Catalog, search and browse index.
//!
//! Loaders turn a music directory or a JSON document into [`TrackRecord`]s;
//! the [`MusicSource`] owns them and the [`BrowseTree`] indexes them for
//! browsing.

pub mod browse;
pub mod display;
pub mod json;
pub mod media_id;
pub mod model;
pub mod playlist;
pub mod scan;
pub mod search;
pub mod source;

pub use browse::{BrowseEntry, BrowseTree, CategoryItem};
pub use model::TrackRecord;
pub use search::SearchFocus;
pub use source::{CatalogLoader, MusicSource, SourceState};
