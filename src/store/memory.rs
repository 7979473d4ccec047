use std::sync::{Arc, Mutex};

use crate::error::Result;
use crate::library::TrackRecord;

use super::{PositionStore, SavedSession};

/// In-process store. Clones share the same slot, so a test can keep one
/// handle while the session owns another.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    slot: Arc<Mutex<SavedSession>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(saved: SavedSession) -> Self {
        Self {
            slot: Arc::new(Mutex::new(saved)),
        }
    }

    pub fn snapshot(&self) -> SavedSession {
        self.slot.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

impl PositionStore for MemoryStore {
    fn store(&mut self, playlist: &[TrackRecord], index: Option<usize>) -> Result<()> {
        let mut slot = self.slot.lock().unwrap_or_else(|e| e.into_inner());
        slot.playlist = playlist.to_vec();
        slot.index = index;
        Ok(())
    }

    fn store_index(&mut self, index: Option<usize>) -> Result<()> {
        self.slot.lock().unwrap_or_else(|e| e.into_inner()).index = index;
        Ok(())
    }

    fn load(&self) -> Result<SavedSession> {
        Ok(self.snapshot())
    }

    fn clear(&mut self) -> Result<()> {
        *self.slot.lock().unwrap_or_else(|e| e.into_inner()) = SavedSession::default();
        Ok(())
    }
}
