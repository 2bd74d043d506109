//! Serializer/deserializer contract for subsystem world maps.

use thiserror::Error;

use crate::world::Anchor;

/// Failure encoding or decoding a world map.
#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("failed to encode world map: {0}")]
    Encode(String),

    #[error("failed to decode world map: {0}")]
    Decode(String),

    #[error("data is not a world map archive")]
    BadMagic,

    #[error("unsupported world map archive version {0}")]
    UnsupportedVersion(u16),
}

/// An opaque world map snapshot produced by a tracking subsystem.
///
/// The byte format belongs to the subsystem. Callers must treat the output
/// of [`MapArchive::archive`] as a blob that only [`MapArchive::unarchive`]
/// understands.
pub trait MapArchive: Sized + Send + 'static {
    /// Encode the whole map into a single byte buffer.
    fn archive(&self) -> Result<Vec<u8>, ArchiveError>;

    /// Decode a buffer produced by [`MapArchive::archive`].
    ///
    /// Must fail (not panic) on truncated or foreign data.
    fn unarchive(bytes: &[u8]) -> Result<Self, ArchiveError>;

    /// Anchors captured in this map.
    fn anchors(&self) -> &[Anchor];
}
