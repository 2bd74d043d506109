//! Input files for the demo driver.

pub mod tap_script;

pub use tap_script::{ScriptAction, load_script, parse_script};
