//! Boundary to the external AR tracking subsystem.
//!
//! Tracking, map building and relocalization all live behind these traits.
//! The session controller only orchestrates calls to them:
//! - [`TrackingSubsystem`] - run / pause / add anchor / hit test / snapshot
//! - [`MapArchive`] - the subsystem's serializer/deserializer pair for its
//!   opaque world map type
//!
//! [`simulated`] provides an in-process implementation used by the tests and
//! the demo binary.

pub mod archive;
pub mod config;
pub mod session;
pub mod simulated;

pub use archive::{ArchiveError, MapArchive};
pub use config::{HitTestKind, PlaneDetection, RunOptions, TrackingConfiguration};
pub use session::{HitTestResult, SnapshotCompletion, SubsystemError, TrackingSubsystem};
pub use simulated::{SimWorldMap, SimulatedConfig, SimulatedSubsystem};
