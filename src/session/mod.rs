//! Session persistence controller.
//!
//! Owns one tracking session and the persisted world map, and turns user
//! actions (tap, save, load, reset) and lifecycle events (activate,
//! deactivate) into calls on the tracking subsystem and the map store.
//!
//! # Threading Model
//!
//! The controller is driven from a single serial context. The subsystem's
//! world map request is the one asynchronous boundary: its completion only
//! forwards the result over a channel. Encoding, the file write and the
//! resulting status update happen when the owning context drains that
//! channel via [`SessionPersistenceController::poll_save`] or
//! [`SessionPersistenceController::wait_for_save`].

pub mod controller;
pub mod state;
pub mod status;

pub use controller::{ControllerConfig, SessionPersistenceController};
pub use state::{SessionState, StartMode};
pub use status::{StatusLog, StatusMessage, StatusSink, TracingStatus};
