//! MapStore - whole-file world map storage with atomic replace.
//!
//! Writes go to a temporary file in the target's directory and are renamed
//! over the target only once fully written and synced, so a reader sees
//! either the previous map or the new one, never a partial file. Reads load
//! the whole file before decoding anything.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use tracing::debug;

use crate::subsystem::MapArchive;

use super::config::PersistenceConfig;
use super::error::PersistenceError;

/// Prefix of in-progress temporary files next to the map.
const TEMP_PREFIX: &str = ".worldmap-";

/// Suffix of in-progress temporary files next to the map.
const TEMP_SUFFIX: &str = ".tmp";

/// Single-slot store for the persisted world map.
#[derive(Debug, Clone)]
pub struct MapStore {
    path: PathBuf,
}

impl MapStore {
    pub fn new(config: &PersistenceConfig) -> Self {
        Self {
            path: config.map_path.clone(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.is_file()
    }

    /// Read the whole persisted file.
    pub fn read(&self) -> Result<Vec<u8>, PersistenceError> {
        fs::read(&self.path).map_err(|source| PersistenceError::FileRead {
            path: self.path.clone(),
            source,
        })
    }

    /// Write `bytes` to a temporary file next to the map without touching
    /// the map itself. Nothing is visible at the map path until
    /// [`StagedMap::commit`].
    pub fn stage(&self, bytes: &[u8]) -> Result<StagedMap, PersistenceError> {
        let write_err = |source: std::io::Error| PersistenceError::FileWrite {
            path: self.path.clone(),
            source,
        };

        let dir = match self.path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir,
            _ => Path::new("."),
        };
        let mut tmp = tempfile::Builder::new()
            .prefix(TEMP_PREFIX)
            .suffix(TEMP_SUFFIX)
            .tempfile_in(dir)
            .map_err(write_err)?;
        tmp.write_all(bytes).map_err(write_err)?;
        tmp.as_file().sync_all().map_err(write_err)?;

        Ok(StagedMap {
            tmp,
            target: self.path.clone(),
        })
    }

    /// Replace the persisted file with `bytes` atomically.
    pub fn write_atomic(&self, bytes: &[u8]) -> Result<(), PersistenceError> {
        self.stage(bytes)?.commit()
    }

    /// Archive `map` and persist it. Returns the number of bytes written.
    ///
    /// On any failure the previously persisted file is left as it was.
    pub fn save<M: MapArchive>(&self, map: &M) -> Result<usize, PersistenceError> {
        let bytes = map.archive().map_err(PersistenceError::Serialize)?;
        self.write_atomic(&bytes)?;
        debug!("Wrote {} bytes to {}", bytes.len(), self.path.display());
        Ok(bytes.len())
    }

    /// Read and decode the persisted map.
    pub fn load<M: MapArchive>(&self) -> Result<M, PersistenceError> {
        let bytes = self.read()?;
        M::unarchive(&bytes).map_err(|source| PersistenceError::Deserialize {
            path: self.path.clone(),
            source,
        })
    }
}

/// A fully written temporary file waiting to replace the map.
///
/// Dropping it without committing removes the temporary file and leaves the
/// persisted map untouched.
pub struct StagedMap {
    tmp: NamedTempFile,
    target: PathBuf,
}

impl StagedMap {
    pub fn temp_path(&self) -> &Path {
        self.tmp.path()
    }

    /// Underlying temporary file.
    pub fn file(&self) -> &fs::File {
        self.tmp.as_file()
    }

    /// Rename the temporary file over the map.
    pub fn commit(self) -> Result<(), PersistenceError> {
        let target = self.target;
        self.tmp
            .persist(&target)
            .map(|_| ())
            .map_err(|e| PersistenceError::FileWrite {
                path: target.clone(),
                source: e.error,
            })
    }
}
