//! Persistent position store.
//!
//! Remembers the active playlist and the selected index across restarts.
//! An index of `-1` on disk means "no selection".

mod file;
mod memory;

pub use file::JsonFileStore;
pub use memory::MemoryStore;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::library::TrackRecord;

/// What a store hands back on `load`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SavedSession {
    pub playlist: Vec<TrackRecord>,
    #[serde(with = "index_repr")]
    pub index: Option<usize>,
}

impl SavedSession {
    /// The selected track, if the index points inside the playlist.
    pub fn current(&self) -> Option<&TrackRecord> {
        self.index.and_then(|i| self.playlist.get(i))
    }

    pub fn is_empty(&self) -> bool {
        self.playlist.is_empty()
    }
}

pub trait PositionStore: Send {
    fn store(&mut self, playlist: &[TrackRecord], index: Option<usize>) -> Result<()>;

    /// Only the index changed; the stored playlist is kept.
    fn store_index(&mut self, index: Option<usize>) -> Result<()> {
        let saved = self.load()?;
        self.store(&saved.playlist, index)
    }

    /// A store that has never been written loads as an empty session.
    fn load(&self) -> Result<SavedSession>;

    fn clear(&mut self) -> Result<()>;
}

mod index_repr {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(index: &Option<usize>, s: S) -> Result<S::Ok, S::Error> {
        match index {
            Some(i) => s.serialize_i64(*i as i64),
            None => s.serialize_i64(-1),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<usize>, D::Error> {
        let raw = i64::deserialize(d)?;
        Ok(usize::try_from(raw).ok())
    }
}
