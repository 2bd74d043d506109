//! Core ID and input types.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for an Anchor.
///
/// Anchors outlive the session that created them (they travel inside a saved
/// world map), so ids are random UUIDs instead of per-session counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AnchorId(pub Uuid);

impl AnchorId {
    /// Generate a fresh random id.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for AnchorId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for AnchorId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "A{}", self.0.simple())
    }
}

/// A location on the camera image, in pixels (origin top-left, +y down).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScreenPoint {
    pub x: f64,
    pub y: f64,
}

impl ScreenPoint {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_anchor_ids_are_unique() {
        let a = AnchorId::new();
        let b = AnchorId::new();
        assert_ne!(a, b);
    }

    #[test]
    fn test_anchor_id_display() {
        let id = AnchorId(Uuid::nil());
        assert_eq!(format!("{}", id), format!("A{}", "0".repeat(32)));
    }
}
