//! Anchor - a user-placed point of interest in the world frame.

use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

use crate::geometry::SE3;

use super::types::AnchorId;

/// A fixed pose in the tracking session's world coordinate frame.
///
/// Anchors are created from hit-test results and registered with the active
/// session. They become part of the world map when a snapshot is captured
/// and reappear when a session is resumed from that map.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Anchor {
    pub id: AnchorId,

    /// Pose of the anchor (T_wa: anchor to world).
    pub transform: SE3,

    /// Optional user-facing label.
    pub name: Option<String>,
}

impl Anchor {
    /// Create an unnamed anchor at the given world pose.
    pub fn new(transform: SE3) -> Self {
        Self {
            id: AnchorId::new(),
            transform,
            name: None,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn position(&self) -> Vector3<f64> {
        self.transform.translation
    }
}
