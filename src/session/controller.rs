//! SessionPersistenceController - one tracking session and its saved map.

use std::time::Duration;

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, TryRecvError, bounded};
use tracing::{debug, info, warn};

use crate::persistence::{MapStore, PersistenceConfig, PersistenceError};
use crate::subsystem::{
    HitTestKind, MapArchive, PlaneDetection, RunOptions, SubsystemError, TrackingConfiguration,
    TrackingSubsystem,
};
use crate::world::{Anchor, AnchorId, ScreenPoint};

use super::state::{SessionState, StartMode};
use super::status::{StatusMessage, StatusSink};

/// Capacity of the snapshot delivery channel. At most one save is in flight,
/// so a single slot never blocks the subsystem's completion.
const SNAPSHOT_CHANNEL_CAPACITY: usize = 1;

/// Result handed back by the subsystem for one world map request.
type SnapshotDelivery<M> = Result<M, SubsystemError>;

/// Configuration for the session controller.
#[derive(Debug, Clone)]
pub struct ControllerConfig {
    /// Plane detection requested on every run.
    pub plane_detection: PlaneDetection,

    /// Ask the subsystem to draw raw feature points.
    pub show_feature_points: bool,

    /// What a tap may land on.
    pub hit_test_kinds: Vec<HitTestKind>,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            plane_detection: PlaneDetection::Horizontal,
            show_feature_points: true,
            hit_test_kinds: vec![
                HitTestKind::FeaturePoint,
                HitTestKind::EstimatedHorizontalPlane,
            ],
        }
    }
}

/// Manages one tracking session, user anchor placement, and save / load of
/// the session's world map to a single persisted file.
///
/// All failures end up as a status message; none is raised past this type.
pub struct SessionPersistenceController<S: TrackingSubsystem> {
    /// The external tracking subsystem.
    subsystem: S,

    /// Persisted world map file.
    store: MapStore,

    /// Configuration.
    config: ControllerConfig,

    /// Status surface.
    status: Box<dyn StatusSink>,

    /// Last message shown on the status surface.
    last_status: Option<StatusMessage>,

    /// Session state machine.
    state: SessionState,

    /// Anchors known to be part of the current run.
    anchors: Vec<AnchorId>,

    /// Snapshot completions arrive here from the subsystem's thread.
    snapshot_tx: Sender<SnapshotDelivery<S::Map>>,
    snapshot_rx: Receiver<SnapshotDelivery<S::Map>>,

    /// A world map request has been dispatched and not yet consumed.
    save_in_flight: bool,
}

impl<S: TrackingSubsystem> SessionPersistenceController<S> {
    /// Create a controller. The session stays stopped until
    /// [`Self::activate`] or [`Self::start_session`].
    pub fn new(
        subsystem: S,
        persistence: &PersistenceConfig,
        config: ControllerConfig,
        status: Box<dyn StatusSink>,
    ) -> Self {
        let (snapshot_tx, snapshot_rx) = bounded(SNAPSHOT_CHANNEL_CAPACITY);

        Self {
            subsystem,
            store: MapStore::new(persistence),
            config,
            status,
            last_status: None,
            state: SessionState::Stopped,
            anchors: Vec::new(),
            snapshot_tx,
            snapshot_rx,
            save_in_flight: false,
        }
    }

    // ------------------------------------------------------------------
    // Session lifecycle
    // ------------------------------------------------------------------

    /// (Re)start tracking, optionally resuming from a saved world map.
    ///
    /// Always a full restart: previous tracking state and anchors are
    /// discarded. A paused session only restarts fresh, so `initial_map` is
    /// dropped in that case.
    pub fn start_session(&mut self, initial_map: Option<S::Map>) -> SessionState {
        let initial_map = match initial_map {
            Some(_) if !self.state.accepts_initial_map() => {
                warn!("Session is paused; restarting fresh and ignoring saved world map");
                None
            }
            other => other,
        };

        let next_state = self.state.started(initial_map.is_some());

        let mut configuration = TrackingConfiguration::new(self.config.plane_detection);
        configuration.show_feature_points = self.config.show_feature_points;

        self.anchors.clear();
        let message = match initial_map {
            Some(map) => {
                self.anchors.extend(map.anchors().iter().map(|a| a.id));
                configuration = configuration.with_initial_map(map);
                StatusMessage::FoundSavedMap
            }
            None => StatusMessage::MappingInProgress,
        };

        self.subsystem.run(configuration, RunOptions::full_reset());
        info!(
            "Tracking session {:?} -> {:?} ({} anchors)",
            self.state,
            next_state,
            self.anchors.len()
        );
        self.state = next_state;
        self.show(message);
        self.state
    }

    /// Suspend the active session. Calling it again has no further effect.
    pub fn pause_session(&mut self) {
        if !self.state.is_running() {
            debug!("pause_session ignored in state {:?}", self.state);
            return;
        }
        self.subsystem.pause();
        self.state = self.state.paused();
        info!("Tracking session paused");
    }

    /// The controller became visible.
    pub fn activate(&mut self) -> SessionState {
        self.start_session(None)
    }

    /// The controller is no longer visible.
    pub fn deactivate(&mut self) {
        self.pause_session();
    }

    /// Discard the current session and start mapping from scratch.
    pub fn reset_tracking(&mut self) -> SessionState {
        self.start_session(None)
    }

    // ------------------------------------------------------------------
    // Anchors
    // ------------------------------------------------------------------

    /// Drop an anchor where a ray through `point` meets the reconstruction.
    ///
    /// Returns `None` and leaves the session untouched when nothing is hit.
    pub fn place_anchor(&mut self, point: ScreenPoint) -> Option<AnchorId> {
        if !self.state.is_running() {
            debug!("Tap at ({:.1}, {:.1}) ignored: session not running", point.x, point.y);
            return None;
        }

        let Some(hit) = self.subsystem.hit_test(point, &self.config.hit_test_kinds) else {
            debug!("Tap at ({:.1}, {:.1}) hit nothing", point.x, point.y);
            return None;
        };

        let anchor = Anchor::new(hit.world_transform);
        let id = anchor.id;
        let p = anchor.position();
        self.subsystem.add_anchor(anchor);
        self.anchors.push(id);
        info!(
            "Placed anchor {} on {:?} at [{:.3}, {:.3}, {:.3}] ({:.2} m away)",
            id, hit.kind, p.x, p.y, p.z, hit.distance
        );
        Some(id)
    }

    // ------------------------------------------------------------------
    // Save
    // ------------------------------------------------------------------

    /// Request the current world map and persist it once it arrives.
    ///
    /// Returns as soon as the request is dispatched. The outcome is reported
    /// by [`Self::poll_save`] / [`Self::wait_for_save`]. A request made while
    /// another is in flight is rejected.
    pub fn save_current_map(&mut self) -> Result<(), PersistenceError> {
        if self.save_in_flight {
            warn!("World map save requested while another is in flight; rejected");
            self.show(StatusMessage::SaveInProgress);
            return Err(PersistenceError::SaveInProgress);
        }

        self.save_in_flight = true;
        let tx = self.snapshot_tx.clone();
        self.subsystem.current_world_map(Box::new(move |result| {
            // Only forwards; everything else happens on the owning context.
            let _ = tx.send(result);
        }));
        debug!("World map requested");
        Ok(())
    }

    /// Finish a pending save if its snapshot has arrived. Never blocks.
    pub fn poll_save(&mut self) -> Option<Result<(), PersistenceError>> {
        match self.snapshot_rx.try_recv() {
            Ok(delivery) => Some(self.finish_save(delivery)),
            Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => None,
        }
    }

    /// Block up to `timeout` for a pending save to complete.
    ///
    /// Returns `None` when no save is in flight or the wait timed out; a
    /// timed-out save stays pending.
    pub fn wait_for_save(&mut self, timeout: Duration) -> Option<Result<(), PersistenceError>> {
        if !self.save_in_flight {
            return None;
        }
        match self.snapshot_rx.recv_timeout(timeout) {
            Ok(delivery) => Some(self.finish_save(delivery)),
            Err(RecvTimeoutError::Timeout) => {
                debug!("Still waiting for world map after {:?}", timeout);
                None
            }
            Err(RecvTimeoutError::Disconnected) => None,
        }
    }

    fn finish_save(&mut self, delivery: SnapshotDelivery<S::Map>) -> Result<(), PersistenceError> {
        self.save_in_flight = false;

        let map = match delivery {
            Ok(map) => map,
            Err(e) => {
                warn!("Error getting current world map: {}", e);
                self.show(StatusMessage::SnapshotFailed);
                return Err(e.into());
            }
        };

        match self.store.save(&map) {
            Ok(bytes) => {
                info!(
                    "World map saved to {} ({} bytes, {} anchors)",
                    self.store.path().display(),
                    bytes,
                    map.anchors().len()
                );
                self.show(StatusMessage::MapSaved);
                Ok(())
            }
            Err(e) => {
                warn!("Error saving world map: {}", e);
                self.show(StatusMessage::SaveFailed);
                Err(e)
            }
        }
    }

    // ------------------------------------------------------------------
    // Load
    // ------------------------------------------------------------------

    /// Read and decode the persisted world map.
    ///
    /// `None` when the file is missing, unreadable or not a valid map.
    pub fn load_persisted_map(&mut self) -> Option<S::Map> {
        match self.store.load::<S::Map>() {
            Ok(map) => {
                debug!(
                    "Loaded world map from {} ({} anchors)",
                    self.store.path().display(),
                    map.anchors().len()
                );
                Some(map)
            }
            Err(e @ PersistenceError::Deserialize { .. }) => {
                warn!("{}", e);
                self.show(StatusMessage::CorruptMap);
                None
            }
            Err(e) => {
                if e.is_not_found() {
                    info!("No saved world map at {}", self.store.path().display());
                } else {
                    warn!("{}", e);
                }
                self.show(StatusMessage::ReadFailed);
                None
            }
        }
    }

    /// Load the saved map and restart the session from it.
    ///
    /// Returns false, leaving the session as it was, when there is no
    /// usable saved map. Also false when a paused session restarted fresh
    /// without it.
    pub fn resume_from_saved(&mut self) -> bool {
        match self.load_persisted_map() {
            Some(map) => {
                self.start_session(Some(map)) == SessionState::Running(StartMode::Resumed)
            }
            None => false,
        }
    }

    // ------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Whether the current run was resumed from a saved map.
    pub fn is_resumed(&self) -> bool {
        self.state == SessionState::Running(StartMode::Resumed)
    }

    pub fn last_status(&self) -> Option<StatusMessage> {
        self.last_status
    }

    pub fn anchor_ids(&self) -> &[AnchorId] {
        &self.anchors
    }

    pub fn is_save_in_flight(&self) -> bool {
        self.save_in_flight
    }

    pub fn store(&self) -> &MapStore {
        &self.store
    }

    pub fn subsystem(&self) -> &S {
        &self.subsystem
    }

    fn show(&mut self, message: StatusMessage) {
        self.last_status = Some(message);
        self.status.show(message.text());
    }
}
