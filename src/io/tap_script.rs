//! Scripted user actions for the demo driver.
//!
//! One action per row, `#` starts a comment:
//!
//! ```text
//! # action, arg1, arg2
//! observe, 200
//! tap, 640, 360
//! save
//! reset
//! load
//! ```

use std::io::Read;
use std::path::Path;

use anyhow::{Context, Result, bail};
use csv::{ReaderBuilder, StringRecord};

use crate::world::ScreenPoint;

/// One scripted user or lifecycle event.
#[derive(Debug, Clone, PartialEq)]
pub enum ScriptAction {
    /// Sweep the camera, mapping this many feature points.
    Observe(usize),
    /// Tap the screen.
    Tap(ScreenPoint),
    /// Save button.
    Save,
    /// Block until the pending save completes.
    Wait,
    /// Load button.
    Load,
    /// Reload button.
    Reset,
    /// View disappeared.
    Pause,
    /// View appeared.
    Resume,
}

/// Read a script file.
pub fn load_script<P: AsRef<Path>>(path: P) -> Result<Vec<ScriptAction>> {
    let path = path.as_ref();
    let file = std::fs::File::open(path)
        .with_context(|| format!("Failed to open {}", path.display()))?;
    parse_script(file).with_context(|| format!("Failed to parse {}", path.display()))
}

/// Parse script rows from any reader.
pub fn parse_script<R: Read>(reader: R) -> Result<Vec<ScriptAction>> {
    let mut rdr = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(csv::Trim::All)
        .comment(Some(b'#'))
        .from_reader(reader);

    let mut actions = Vec::new();
    for (line, rec) in rdr.records().enumerate() {
        let rec = rec?;
        if rec.is_empty() || rec[0].is_empty() {
            continue;
        }
        let action = parse_row(&rec).with_context(|| format!("Bad script row {}", line + 1))?;
        actions.push(action);
    }
    Ok(actions)
}

fn parse_row(rec: &StringRecord) -> Result<ScriptAction> {
    let action = match rec[0].to_ascii_lowercase().as_str() {
        "observe" => {
            let count = rec.get(1).context("observe needs a feature count")?;
            ScriptAction::Observe(count.parse()?)
        }
        "tap" => {
            if rec.len() < 3 {
                bail!("tap needs x and y");
            }
            ScriptAction::Tap(ScreenPoint::new(rec[1].parse()?, rec[2].parse()?))
        }
        "save" => ScriptAction::Save,
        "wait" => ScriptAction::Wait,
        "load" => ScriptAction::Load,
        "reset" => ScriptAction::Reset,
        "pause" => ScriptAction::Pause,
        "resume" => ScriptAction::Resume,
        other => bail!("unknown action '{}'", other),
    };
    Ok(action)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_all_actions() {
        let script = "\
# warm up
observe, 150
tap, 640.5, 360
save
wait
reset
load
pause
resume
";
        let actions = parse_script(script.as_bytes()).unwrap();
        assert_eq!(
            actions,
            vec![
                ScriptAction::Observe(150),
                ScriptAction::Tap(ScreenPoint::new(640.5, 360.0)),
                ScriptAction::Save,
                ScriptAction::Wait,
                ScriptAction::Reset,
                ScriptAction::Load,
                ScriptAction::Pause,
                ScriptAction::Resume,
            ]
        );
    }

    #[test]
    fn test_unknown_action_is_an_error() {
        let err = parse_script("jump, 1\n".as_bytes()).unwrap_err();
        assert!(format!("{:#}", err).contains("unknown action 'jump'"));
    }

    #[test]
    fn test_tap_without_coordinates_is_an_error() {
        assert!(parse_script("tap, 10\n".as_bytes()).is_err());
    }
}
