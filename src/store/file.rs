use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::library::TrackRecord;

use super::{PositionStore, SavedSession};

/// Keeps the session in `<dir>/<namespace>.json`.
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(dir: impl AsRef<Path>, namespace: &str) -> Self {
        Self {
            path: dir.as_ref().join(format!("{namespace}.json")),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn write(&self, saved: &SavedSession) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let body = serde_json::to_vec_pretty(saved)?;
        // Write then rename so a crash never leaves a half-written file.
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, body)?;
        fs::rename(&tmp, &self.path)?;
        debug!(path = %self.path.display(), index = ?saved.index, "stored session");
        Ok(())
    }
}

impl PositionStore for JsonFileStore {
    fn store(&mut self, playlist: &[TrackRecord], index: Option<usize>) -> Result<()> {
        self.write(&SavedSession {
            playlist: playlist.to_vec(),
            index,
        })
    }

    fn load(&self) -> Result<SavedSession> {
        let bytes = match fs::read(&self.path) {
            Ok(b) => b,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(SavedSession::default()),
            Err(e) => return Err(e.into()),
        };
        serde_json::from_slice(&bytes).map_err(|e| {
            warn!(path = %self.path.display(), error = %e, "unreadable session file");
            Error::Store(format!("{}: {e}", self.path.display()))
        })
    }

    fn clear(&mut self) -> Result<()> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
