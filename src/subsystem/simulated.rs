//! In-process tracking subsystem.
//!
//! A stand-in for a device AR framework: a static scene of horizontal
//! surfaces seen through a pinhole camera. "Mapping" is simulated by
//! sampling feature points on the surfaces, and relocalization against an
//! initial map is instantaneous. It implements the same capability traits a
//! device binding would, so the session controller cannot tell the
//! difference.

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use nalgebra::Vector3;
use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::geometry::SE3;
use crate::world::{Anchor, ScreenPoint};

use super::archive::{ArchiveError, MapArchive};
use super::config::{HitTestKind, PlaneDetection, RunOptions, TrackingConfiguration};
use super::session::{HitTestResult, SnapshotCompletion, SubsystemError, TrackingSubsystem};

/// Leading bytes of every archived [`SimWorldMap`].
const ARCHIVE_MAGIC: &[u8; 4] = b"WMAP";

/// Current archive layout version.
const ARCHIVE_VERSION: u16 = 1;

/// Header size: magic + little-endian version.
const ARCHIVE_HEADER_LEN: usize = 6;

/// Allowed deviation from unit length for a decoded rotation.
const UNIT_NORM_TOLERANCE: f64 = 1e-6;

/// Pinhole intrinsics of the simulated camera, in pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraIntrinsics {
    pub fx: f64,
    pub fy: f64,
    pub cx: f64,
    pub cy: f64,
    pub width: u32,
    pub height: u32,
}

impl CameraIntrinsics {
    /// Unit-depth ray in the camera frame (x right, y down, z forward).
    pub fn unproject(&self, point: ScreenPoint) -> Vector3<f64> {
        Vector3::new((point.x - self.cx) / self.fx, (point.y - self.cy) / self.fy, 1.0)
    }

    /// Pixel location of a camera-frame point, None if behind the camera.
    pub fn project(&self, p_cam: &Vector3<f64>) -> Option<ScreenPoint> {
        if p_cam.z <= 1e-6 {
            return None;
        }
        Some(ScreenPoint::new(
            self.fx * p_cam.x / p_cam.z + self.cx,
            self.fy * p_cam.y / p_cam.z + self.cy,
        ))
    }
}

impl Default for CameraIntrinsics {
    fn default() -> Self {
        Self {
            fx: 1000.0,
            fy: 1000.0,
            cx: 640.0,
            cy: 360.0,
            width: 1280,
            height: 720,
        }
    }
}

/// Axis-aligned horizontal surface (world +Y is up).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HorizontalSurface {
    pub height: f64,
    pub min_x: f64,
    pub max_x: f64,
    pub min_z: f64,
    pub max_z: f64,
}

impl HorizontalSurface {
    fn contains(&self, x: f64, z: f64) -> bool {
        x >= self.min_x && x <= self.max_x && z >= self.min_z && z <= self.max_z
    }

    /// Zero for empty or inverted bounds.
    fn area(&self) -> f64 {
        (self.max_x - self.min_x).max(0.0) * (self.max_z - self.min_z).max(0.0)
    }
}

/// Configuration of the simulated device and its surroundings.
#[derive(Debug, Clone)]
pub struct SimulatedConfig {
    pub intrinsics: CameraIntrinsics,

    /// Device pose (T_wc: camera to world).
    pub camera_pose: SE3,

    /// Real-world surfaces the camera can see.
    pub surfaces: Vec<HorizontalSurface>,

    /// Feature points required before a world map can be produced.
    pub min_features_for_map: usize,

    /// Artificial delay before the snapshot completion fires.
    pub snapshot_latency: Duration,

    /// Max pixel distance between a tap and a projected feature point.
    pub feature_hit_radius_px: f64,

    /// Seed for feature sampling.
    pub seed: u64,
}

impl SimulatedConfig {
    /// Camera 1.5 m above the floor, looking along world +Z, pitched 30° down.
    pub fn default_camera_pose() -> SE3 {
        let flip = nalgebra::UnitQuaternion::from_axis_angle(
            &Vector3::z_axis(),
            std::f64::consts::PI,
        );
        let pitch = nalgebra::UnitQuaternion::from_axis_angle(
            &Vector3::x_axis(),
            30f64.to_radians(),
        );
        SE3 {
            rotation: pitch * flip,
            translation: Vector3::new(0.0, 1.5, 0.0),
        }
    }
}

impl Default for SimulatedConfig {
    fn default() -> Self {
        Self {
            intrinsics: CameraIntrinsics::default(),
            camera_pose: Self::default_camera_pose(),
            surfaces: vec![
                // Floor
                HorizontalSurface {
                    height: 0.0,
                    min_x: -2.5,
                    max_x: 2.5,
                    min_z: 0.5,
                    max_z: 5.0,
                },
                // Table top
                HorizontalSurface {
                    height: 0.75,
                    min_x: -0.5,
                    max_x: 0.5,
                    min_z: 1.5,
                    max_z: 2.5,
                },
            ],
            min_features_for_map: 50,
            snapshot_latency: Duration::ZERO,
            feature_hit_radius_px: 12.0,
            seed: 7,
        }
    }
}

/// A mapped 3D feature point, tagged with the surface it was sampled on.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MapFeature {
    pub position: Vector3<f64>,
    pub surface: usize,
}

/// World map snapshot of the simulated subsystem.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimWorldMap {
    pub features: Vec<MapFeature>,
    pub anchors: Vec<Anchor>,
}

impl SimWorldMap {
    /// Reject poses and points a real session could never have produced.
    fn validate(&self) -> Result<(), ArchiveError> {
        for anchor in &self.anchors {
            let rotation = anchor.transform.rotation.quaternion();
            let finite = rotation.coords.iter().all(|c| c.is_finite())
                && anchor.transform.translation.iter().all(|c| c.is_finite());
            if !finite || (rotation.norm() - 1.0).abs() > UNIT_NORM_TOLERANCE {
                return Err(ArchiveError::Decode(format!(
                    "anchor {} has an invalid pose",
                    anchor.id
                )));
            }
        }
        if self
            .features
            .iter()
            .any(|f| !f.position.iter().all(|c| c.is_finite()))
        {
            return Err(ArchiveError::Decode("non-finite feature point".into()));
        }
        Ok(())
    }
}

impl MapArchive for SimWorldMap {
    fn archive(&self) -> Result<Vec<u8>, ArchiveError> {
        let body = bincode::serialize(self).map_err(|e| ArchiveError::Encode(e.to_string()))?;

        let mut bytes = Vec::with_capacity(ARCHIVE_HEADER_LEN + body.len());
        bytes.extend_from_slice(ARCHIVE_MAGIC);
        bytes.extend_from_slice(&ARCHIVE_VERSION.to_le_bytes());
        bytes.extend_from_slice(&body);
        Ok(bytes)
    }

    fn unarchive(bytes: &[u8]) -> Result<Self, ArchiveError> {
        if bytes.len() < ARCHIVE_HEADER_LEN || &bytes[..4] != ARCHIVE_MAGIC {
            return Err(ArchiveError::BadMagic);
        }
        let version = u16::from_le_bytes([bytes[4], bytes[5]]);
        if version != ARCHIVE_VERSION {
            return Err(ArchiveError::UnsupportedVersion(version));
        }

        let body = &bytes[ARCHIVE_HEADER_LEN..];
        let map: SimWorldMap =
            bincode::deserialize(body).map_err(|e| ArchiveError::Decode(e.to_string()))?;

        // Trailing bytes mean the blob is not what we wrote.
        let consumed = bincode::serialized_size(&map)
            .map_err(|e| ArchiveError::Decode(e.to_string()))?;
        if consumed as usize != body.len() {
            return Err(ArchiveError::Decode(format!(
                "{} trailing bytes after world map",
                body.len() - consumed as usize
            )));
        }

        map.validate()?;
        Ok(map)
    }

    fn anchors(&self) -> &[Anchor] {
        &self.anchors
    }
}

/// Mutable device state, shared with snapshot worker threads.
struct SimState {
    running: bool,
    plane_detection: PlaneDetection,
    show_feature_points: bool,
    camera_pose: SE3,
    features: Vec<MapFeature>,
    anchors: Vec<Anchor>,
    rng: StdRng,
    run_count: usize,
    pause_count: usize,
    resumed_from_map: bool,
    injected_snapshot_error: Option<SubsystemError>,
}

/// Simulated tracking subsystem.
///
/// Cloning yields another handle to the same device, which is how tests
/// observe what the controller did to it.
#[derive(Clone)]
pub struct SimulatedSubsystem {
    config: Arc<SimulatedConfig>,
    state: Arc<Mutex<SimState>>,
}

impl SimulatedSubsystem {
    pub fn new(config: SimulatedConfig) -> Self {
        let state = SimState {
            running: false,
            plane_detection: PlaneDetection::None,
            show_feature_points: false,
            camera_pose: config.camera_pose,
            features: Vec::new(),
            anchors: Vec::new(),
            rng: StdRng::seed_from_u64(config.seed),
            run_count: 0,
            pause_count: 0,
            resumed_from_map: false,
            injected_snapshot_error: None,
        };
        Self {
            config: Arc::new(config),
            state: Arc::new(Mutex::new(state)),
        }
    }

    /// Simulate the user sweeping the camera: map `count` new feature points
    /// on the visible surfaces. Does nothing while not running.
    ///
    /// Returns the number of points added.
    pub fn observe(&self, count: usize) -> usize {
        let mut state = self.state.lock();
        if !state.running {
            return 0;
        }

        // Degenerate or inverted bounds cannot be sampled.
        let usable: Vec<(usize, f64)> = self
            .config
            .surfaces
            .iter()
            .enumerate()
            .map(|(i, s)| (i, s.area()))
            .filter(|(_, area)| *area > 0.0)
            .collect();
        let Some(&(last_idx, _)) = usable.last() else {
            return 0;
        };
        let total_area: f64 = usable.iter().map(|(_, area)| area).sum();

        for _ in 0..count {
            let mut pick = state.rng.gen_range(0.0..total_area);
            let mut surface_idx = last_idx;
            for &(i, area) in &usable {
                if pick < area {
                    surface_idx = i;
                    break;
                }
                pick -= area;
            }

            let s = &self.config.surfaces[surface_idx];
            let x = state.rng.gen_range(s.min_x..=s.max_x);
            let z = state.rng.gen_range(s.min_z..=s.max_z);
            state.features.push(MapFeature {
                position: Vector3::new(x, s.height, z),
                surface: surface_idx,
            });
        }
        count
    }

    /// Move the device.
    pub fn set_camera_pose(&self, pose: SE3) {
        self.state.lock().camera_pose = pose;
    }

    /// Make the next snapshot request fail with `error`.
    pub fn inject_snapshot_error(&self, error: SubsystemError) {
        self.state.lock().injected_snapshot_error = Some(error);
    }

    pub fn is_running(&self) -> bool {
        self.state.lock().running
    }

    pub fn anchors(&self) -> Vec<Anchor> {
        self.state.lock().anchors.clone()
    }

    pub fn feature_count(&self) -> usize {
        self.state.lock().features.len()
    }

    pub fn run_count(&self) -> usize {
        self.state.lock().run_count
    }

    pub fn pause_count(&self) -> usize {
        self.state.lock().pause_count
    }

    /// Whether the last `run` was handed an initial world map.
    pub fn resumed_from_map(&self) -> bool {
        self.state.lock().resumed_from_map
    }

    pub fn shows_feature_points(&self) -> bool {
        self.state.lock().show_feature_points
    }

    /// Pixel location of a world point as seen by the current camera.
    pub fn project_world_point(&self, p_world: &Vector3<f64>) -> Option<ScreenPoint> {
        let pose = self.state.lock().camera_pose;
        let p_cam = pose.inverse().transform_point(p_world);
        self.config.intrinsics.project(&p_cam)
    }

    fn capture(state: &SimState, min_features: usize) -> Result<SimWorldMap, SubsystemError> {
        if !state.running {
            return Err(SubsystemError::SessionNotRunning);
        }
        if state.features.len() < min_features {
            return Err(SubsystemError::InsufficientFeatures {
                observed: state.features.len(),
                required: min_features,
            });
        }
        Ok(SimWorldMap {
            features: state.features.clone(),
            anchors: state.anchors.clone(),
        })
    }

    fn hit_feature_point(
        &self,
        state: &SimState,
        point: ScreenPoint,
        camera_cw: &SE3,
    ) -> Option<HitTestResult> {
        let radius_sq = self.config.feature_hit_radius_px.powi(2);
        state
            .features
            .iter()
            .filter_map(|f| {
                let p_cam = camera_cw.transform_point(&f.position);
                let px = self.config.intrinsics.project(&p_cam)?;
                let d_sq = (px.x - point.x).powi(2) + (px.y - point.y).powi(2);
                (d_sq <= radius_sq).then_some((d_sq, f, p_cam.norm()))
            })
            .min_by(|a, b| a.0.total_cmp(&b.0))
            .map(|(_, f, distance)| HitTestResult {
                kind: HitTestKind::FeaturePoint,
                world_transform: SE3::from_yaw(camera_yaw(&state.camera_pose), f.position),
                distance,
            })
    }

    fn hit_horizontal_plane(
        &self,
        state: &SimState,
        origin: &Vector3<f64>,
        direction: &Vector3<f64>,
    ) -> Option<HitTestResult> {
        if !state.plane_detection.includes_horizontal() || direction.y.abs() < 1e-9 {
            return None;
        }

        self.config
            .surfaces
            .iter()
            .enumerate()
            // A plane is only estimated once features have been mapped on it.
            .filter(|(i, _)| state.features.iter().any(|f| f.surface == *i))
            .filter_map(|(_, s)| {
                let t = (s.height - origin.y) / direction.y;
                if t <= 0.0 {
                    return None;
                }
                let hit = origin + direction * t;
                s.contains(hit.x, hit.z).then_some((t, hit))
            })
            .min_by(|a, b| a.0.total_cmp(&b.0))
            .map(|(distance, hit)| HitTestResult {
                kind: HitTestKind::EstimatedHorizontalPlane,
                world_transform: SE3::from_yaw(camera_yaw(&state.camera_pose), hit),
                distance,
            })
    }
}

impl Default for SimulatedSubsystem {
    fn default() -> Self {
        Self::new(SimulatedConfig::default())
    }
}

/// Heading of the camera's optical axis about world +Y.
fn camera_yaw(pose: &SE3) -> f64 {
    let forward = pose.transform_vector(&Vector3::z());
    forward.x.atan2(forward.z)
}

impl TrackingSubsystem for SimulatedSubsystem {
    type Map = SimWorldMap;

    fn run(&mut self, configuration: TrackingConfiguration<SimWorldMap>, options: RunOptions) {
        let mut state = self.state.lock();
        if options.reset_tracking {
            state.features.clear();
        }
        if options.remove_existing_anchors {
            state.anchors.clear();
        }

        state.resumed_from_map = configuration.initial_map.is_some();
        if let Some(map) = configuration.initial_map {
            // Relocalized instantly against the prior map.
            state.features = map.features;
            state.anchors = map.anchors;
        }

        state.plane_detection = configuration.plane_detection;
        state.show_feature_points = configuration.show_feature_points;
        state.running = true;
        state.run_count += 1;
        debug!(
            "Simulated session running (run #{}, {} features, {} anchors)",
            state.run_count,
            state.features.len(),
            state.anchors.len()
        );
    }

    fn pause(&mut self) {
        let mut state = self.state.lock();
        state.running = false;
        state.pause_count += 1;
    }

    fn add_anchor(&mut self, anchor: Anchor) {
        self.state.lock().anchors.push(anchor);
    }

    fn hit_test(&self, point: ScreenPoint, kinds: &[HitTestKind]) -> Option<HitTestResult> {
        let state = self.state.lock();
        if !state.running {
            return None;
        }

        let camera_wc = state.camera_pose;
        let camera_cw = camera_wc.inverse();
        let origin = camera_wc.translation;
        let direction = camera_wc
            .transform_vector(&self.config.intrinsics.unproject(point))
            .normalize();

        kinds
            .iter()
            .filter_map(|kind| match kind {
                HitTestKind::FeaturePoint => self.hit_feature_point(&state, point, &camera_cw),
                HitTestKind::EstimatedHorizontalPlane => {
                    self.hit_horizontal_plane(&state, &origin, &direction)
                }
            })
            .min_by(|a, b| a.distance.total_cmp(&b.distance))
    }

    fn current_world_map(&self, completion: SnapshotCompletion<SimWorldMap>) {
        let state = Arc::clone(&self.state);
        let latency = self.config.snapshot_latency;
        let min_features = self.config.min_features_for_map;

        thread::spawn(move || {
            if !latency.is_zero() {
                thread::sleep(latency);
            }
            let result = {
                let mut guard = state.lock();
                match guard.injected_snapshot_error.take() {
                    Some(err) => Err(err),
                    None => Self::capture(&guard, min_features),
                }
            };
            completion(result);
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn running_subsystem() -> SimulatedSubsystem {
        let mut sim = SimulatedSubsystem::default();
        sim.run(
            TrackingConfiguration::new(PlaneDetection::Horizontal),
            RunOptions::full_reset(),
        );
        sim
    }

    fn sample_map() -> SimWorldMap {
        SimWorldMap {
            features: vec![MapFeature {
                position: Vector3::new(0.1, 0.0, 2.0),
                surface: 0,
            }],
            anchors: vec![Anchor::new(SE3::from_yaw(0.3, Vector3::new(1.0, 0.0, 2.0)))],
        }
    }

    #[test]
    fn test_archive_unarchive_preserves_map() {
        let map = sample_map();
        let bytes = map.archive().unwrap();
        assert_eq!(&bytes[..4], ARCHIVE_MAGIC);

        let restored = SimWorldMap::unarchive(&bytes).unwrap();
        assert_eq!(restored, map);
    }

    #[test]
    fn test_unarchive_rejects_foreign_data() {
        assert!(matches!(
            SimWorldMap::unarchive(b"not a map at all"),
            Err(ArchiveError::BadMagic)
        ));
        assert!(matches!(SimWorldMap::unarchive(&[]), Err(ArchiveError::BadMagic)));
    }

    #[test]
    fn test_unarchive_rejects_other_version() {
        let mut bytes = sample_map().archive().unwrap();
        bytes[4] = 9;
        assert!(matches!(
            SimWorldMap::unarchive(&bytes),
            Err(ArchiveError::UnsupportedVersion(9))
        ));
    }

    #[test]
    fn test_unarchive_rejects_truncated_body() {
        let bytes = sample_map().archive().unwrap();
        let truncated = &bytes[..bytes.len() - 5];
        assert!(matches!(
            SimWorldMap::unarchive(truncated),
            Err(ArchiveError::Decode(_))
        ));
    }

    #[test]
    fn test_unarchive_rejects_invalid_poses() {
        let mut map = sample_map();
        map.anchors[0].transform.translation.x = f64::NAN;
        let bytes = map.archive().unwrap();
        assert!(matches!(
            SimWorldMap::unarchive(&bytes),
            Err(ArchiveError::Decode(_))
        ));

        let mut map = sample_map();
        let stretched = nalgebra::Quaternion::new(2.0, 0.0, 0.0, 0.0);
        map.anchors[0].transform.rotation = nalgebra::UnitQuaternion::new_unchecked(stretched);
        let bytes = map.archive().unwrap();
        assert!(matches!(
            SimWorldMap::unarchive(&bytes),
            Err(ArchiveError::Decode(_))
        ));

        let mut map = sample_map();
        map.features[0].position.z = f64::INFINITY;
        let bytes = map.archive().unwrap();
        assert!(SimWorldMap::unarchive(&bytes).is_err());
    }

    #[test]
    fn test_project_unproject_consistent() {
        let k = CameraIntrinsics::default();
        let px = ScreenPoint::new(800.0, 200.0);
        let ray = k.unproject(px);
        let back = k.project(&(ray * 3.0)).unwrap();
        assert_relative_eq!(back.x, px.x, epsilon = 1e-9);
        assert_relative_eq!(back.y, px.y, epsilon = 1e-9);
    }

    #[test]
    fn test_observe_requires_running_session() {
        let sim = SimulatedSubsystem::default();
        assert_eq!(sim.observe(10), 0);
        assert_eq!(sim.feature_count(), 0);

        let sim = running_subsystem();
        assert_eq!(sim.observe(10), 10);
        assert_eq!(sim.feature_count(), 10);
    }

    #[test]
    fn test_observe_skips_inverted_surfaces() {
        let floor = SimulatedConfig::default().surfaces[0];
        let inverted = HorizontalSurface {
            height: 0.75,
            min_x: 0.5,
            max_x: -0.5,
            min_z: 1.5,
            max_z: 2.5,
        };
        let mut sim = SimulatedSubsystem::new(SimulatedConfig {
            surfaces: vec![floor, inverted],
            ..SimulatedConfig::default()
        });
        sim.run(
            TrackingConfiguration::new(PlaneDetection::Horizontal),
            RunOptions::full_reset(),
        );

        assert_eq!(sim.observe(200), 200);
        assert!(sim.state.lock().features.iter().all(|f| f.surface == 0));

        let mut only_inverted = SimulatedSubsystem::new(SimulatedConfig {
            surfaces: vec![inverted],
            ..SimulatedConfig::default()
        });
        only_inverted.run(
            TrackingConfiguration::new(PlaneDetection::Horizontal),
            RunOptions::full_reset(),
        );
        assert_eq!(only_inverted.observe(10), 0);
        assert_eq!(only_inverted.feature_count(), 0);
    }

    #[test]
    fn test_center_tap_hits_floor() {
        let sim = running_subsystem();
        sim.observe(100);

        let hit = sim
            .hit_test(
                ScreenPoint::new(640.0, 360.0),
                &[HitTestKind::EstimatedHorizontalPlane],
            )
            .expect("center ray should hit the floor");

        // 1.5 m high, 30 deg pitch: the optical axis meets the floor 3 m out.
        assert_relative_eq!(hit.distance, 3.0, epsilon = 1e-9);
        assert_relative_eq!(hit.world_transform.translation.y, 0.0, epsilon = 1e-9);
        assert_relative_eq!(
            hit.world_transform.translation.z,
            3.0 * 30f64.to_radians().cos(),
            epsilon = 1e-9
        );
    }

    #[test]
    fn test_planes_unknown_before_mapping() {
        let sim = running_subsystem();
        let hit = sim.hit_test(
            ScreenPoint::new(640.0, 360.0),
            &[HitTestKind::FeaturePoint, HitTestKind::EstimatedHorizontalPlane],
        );
        assert!(hit.is_none());
    }

    #[test]
    fn test_top_of_image_misses_everything() {
        let sim = running_subsystem();
        sim.observe(500);
        let hit = sim.hit_test(
            ScreenPoint::new(640.0, 0.0),
            &[HitTestKind::FeaturePoint, HitTestKind::EstimatedHorizontalPlane],
        );
        assert!(hit.is_none());
    }

    #[test]
    fn test_feature_point_hit_at_projection() {
        let sim = running_subsystem();
        sim.observe(20);
        let feature = sim.state.lock().features[0];
        let px = sim.project_world_point(&feature.position).unwrap();

        let hit = sim
            .hit_test(px, &[HitTestKind::FeaturePoint])
            .expect("tap on a projected feature must hit it");
        assert_eq!(hit.kind, HitTestKind::FeaturePoint);
    }

    #[test]
    fn test_snapshot_reports_insufficient_features() {
        let sim = running_subsystem();
        sim.observe(3);

        let (tx, rx) = crossbeam_channel::bounded(1);
        sim.current_world_map(Box::new(move |result| {
            let _ = tx.send(result);
        }));
        let result = rx.recv_timeout(Duration::from_secs(5)).unwrap();
        assert!(matches!(
            result,
            Err(SubsystemError::InsufficientFeatures { observed: 3, .. })
        ));
    }

    #[test]
    fn test_run_with_initial_map_restores_anchors() {
        let map = sample_map();
        let mut sim = running_subsystem();
        sim.observe(10);

        sim.run(
            TrackingConfiguration::new(PlaneDetection::Horizontal).with_initial_map(map.clone()),
            RunOptions::full_reset(),
        );
        assert!(sim.resumed_from_map());
        assert_eq!(sim.anchors(), map.anchors);
        assert_eq!(sim.feature_count(), 1);
    }
}
