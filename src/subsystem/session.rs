//! The tracking session capability interface.

use thiserror::Error;

use crate::geometry::SE3;
use crate::world::{Anchor, ScreenPoint};

use super::archive::MapArchive;
use super::config::{HitTestKind, RunOptions, TrackingConfiguration};

/// Failure reported by the subsystem itself.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SubsystemError {
    #[error("tracking session is not running")]
    SessionNotRunning,

    #[error("not enough features mapped yet ({observed} observed, {required} required)")]
    InsufficientFeatures { observed: usize, required: usize },

    #[error("tracking subsystem failure: {0}")]
    Internal(String),
}

/// One-shot completion for an asynchronous world map request.
///
/// Invoked exactly once, from whatever thread the subsystem chooses.
pub type SnapshotCompletion<M> = Box<dyn FnOnce(Result<M, SubsystemError>) + Send + 'static>;

/// First intersection of a hit-test ray with the reconstruction.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HitTestResult {
    pub kind: HitTestKind,
    /// Pose of the intersection in the world frame.
    pub world_transform: SE3,
    /// Distance from the camera along the ray, in meters.
    pub distance: f64,
}

/// A running (or runnable) spatial tracking session.
pub trait TrackingSubsystem: Send {
    /// Opaque world map snapshot type.
    type Map: MapArchive;

    /// (Re)start tracking with the given configuration.
    fn run(&mut self, configuration: TrackingConfiguration<Self::Map>, options: RunOptions);

    /// Suspend tracking.
    fn pause(&mut self);

    /// Register an anchor with the session.
    fn add_anchor(&mut self, anchor: Anchor);

    /// Cast a ray from a screen location into the reconstruction.
    fn hit_test(&self, point: ScreenPoint, kinds: &[HitTestKind]) -> Option<HitTestResult>;

    /// Request the current world map. Must not block the caller.
    fn current_world_map(&self, completion: SnapshotCompletion<Self::Map>);
}
