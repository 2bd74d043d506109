//! World-anchored content placed by the user.
//!
//! - [`Anchor`] - a fixed pose in the session's world frame
//! - [`AnchorId`] - stable identifier that survives save / resume
//! - [`ScreenPoint`] - 2D input location fed to hit testing

pub mod anchor;
pub mod types;

pub use anchor::Anchor;
pub use types::{AnchorId, ScreenPoint};
