//! Durable storage of the session's world map.
//!
//! One binary file at a fixed location holds the latest archived map:
//! - [`PersistenceConfig`] - where that file lives, resolved once at start-up
//! - [`MapStore`] - whole-file reads and atomic replace-on-write
//! - [`PersistenceError`] - everything that can go wrong on the way

pub mod config;
pub mod error;
pub mod store;

pub use config::{ConfigError, PersistenceConfig};
pub use error::PersistenceError;
pub use store::{MapStore, StagedMap};
