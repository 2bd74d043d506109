//! Persistence error kinds.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::subsystem::{ArchiveError, SubsystemError};

/// A failed save or load of the persisted world map.
///
/// These never leave the session controller as hard failures; they are
/// turned into status messages where they occur.
#[derive(Debug, Error)]
pub enum PersistenceError {
    /// File missing or unreadable.
    #[error("failed to read world map file {}: {source}", path.display())]
    FileRead {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Bytes present but not a valid world map.
    #[error("world map file {} is not a valid world map: {source}", path.display())]
    Deserialize {
        path: PathBuf,
        #[source]
        source: ArchiveError,
    },

    /// The snapshot could not be encoded.
    #[error("failed to encode world map: {0}")]
    Serialize(#[source] ArchiveError),

    /// Encoding succeeded but persisting the bytes failed.
    #[error("failed to write world map file {}: {source}", path.display())]
    FileWrite {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The tracking session failed to produce a snapshot.
    #[error("tracking subsystem could not provide a world map: {0}")]
    Subsystem(#[from] SubsystemError),

    /// Another save has not completed yet.
    #[error("a world map save is already in progress")]
    SaveInProgress,
}

impl PersistenceError {
    /// True when the load failed only because nothing was saved yet.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::FileRead { source, .. } if source.kind() == io::ErrorKind::NotFound)
    }
}
