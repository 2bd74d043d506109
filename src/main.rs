use std::time::Duration;

use anyhow::{Context, Result};
use tracing_subscriber::EnvFilter;

use worldmap_persist::io::{ScriptAction, load_script};
use worldmap_persist::persistence::PersistenceConfig;
use worldmap_persist::session::{ControllerConfig, SessionPersistenceController, TracingStatus};
use worldmap_persist::subsystem::{SimulatedConfig, SimulatedSubsystem};
use worldmap_persist::world::ScreenPoint;

/// How long the demo blocks on a pending save before moving on.
const SAVE_WAIT: Duration = Duration::from_secs(10);

/// Used when no script is given: map, drop two anchors, save, start over,
/// then bring the anchors back from disk.
fn default_script() -> Vec<ScriptAction> {
    vec![
        ScriptAction::Resume,
        ScriptAction::Observe(300),
        ScriptAction::Tap(ScreenPoint::new(640.0, 360.0)),
        ScriptAction::Tap(ScreenPoint::new(420.0, 300.0)),
        ScriptAction::Save,
        ScriptAction::Wait,
        ScriptAction::Reset,
        ScriptAction::Load,
        ScriptAction::Pause,
    ]
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // Without a place to keep the map there is nothing to demonstrate.
    let persistence = PersistenceConfig::resolve().context("Cannot resolve world map location")?;
    println!("World map file: {}", persistence.map_path.display());

    let script = match std::env::args().nth(1) {
        Some(path) => load_script(&path)?,
        None => default_script(),
    };

    let sim = SimulatedSubsystem::new(SimulatedConfig::default());
    let mut controller = SessionPersistenceController::new(
        sim.clone(),
        &persistence,
        ControllerConfig::default(),
        Box::new(TracingStatus),
    );

    for action in script {
        // Deliver any save that finished while the previous action ran.
        if let Some(outcome) = controller.poll_save() {
            report_save(outcome);
        }

        match action {
            ScriptAction::Observe(n) => {
                let added = sim.observe(n);
                println!("Mapped {} feature points ({} total)", added, sim.feature_count());
            }
            ScriptAction::Tap(point) => match controller.place_anchor(point) {
                Some(id) => println!("Tap ({:.0}, {:.0}) -> anchor {}", point.x, point.y, id),
                None => println!("Tap ({:.0}, {:.0}) -> nothing there", point.x, point.y),
            },
            ScriptAction::Save => {
                if let Err(e) = controller.save_current_map() {
                    println!("Save not started: {}", e);
                }
            }
            ScriptAction::Wait => {
                if let Some(outcome) = controller.wait_for_save(SAVE_WAIT) {
                    report_save(outcome);
                }
            }
            ScriptAction::Load => {
                if controller.resume_from_saved() {
                    println!(
                        "Resumed from saved map with {} anchors",
                        controller.anchor_ids().len()
                    );
                }
            }
            ScriptAction::Reset => {
                controller.reset_tracking();
            }
            ScriptAction::Pause => controller.deactivate(),
            ScriptAction::Resume => {
                controller.activate();
            }
        }
    }

    if let Some(outcome) = controller.wait_for_save(SAVE_WAIT) {
        report_save(outcome);
    }

    println!(
        "Done. Session {:?}, {} anchors in simulated world",
        controller.state(),
        sim.anchors().len()
    );
    Ok(())
}

fn report_save(outcome: Result<(), worldmap_persist::persistence::PersistenceError>) {
    match outcome {
        Ok(()) => println!("World map saved"),
        Err(e) => println!("World map not saved: {}", e),
    }
}
