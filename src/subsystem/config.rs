//! Run configuration passed to the tracking subsystem.

/// Which real-world planes the subsystem should detect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PlaneDetection {
    None,
    #[default]
    Horizontal,
}

impl PlaneDetection {
    pub fn includes_horizontal(self) -> bool {
        self == Self::Horizontal
    }
}

/// What a hit test is allowed to intersect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HitTestKind {
    /// Sparse 3D feature points of the reconstruction.
    FeaturePoint,
    /// Horizontal planes estimated from feature points, not yet bounded.
    EstimatedHorizontalPlane,
}

/// World tracking configuration.
///
/// `initial_map` is the state from a previous session to attempt to resume
/// with. It is handed over as prior state on `run`, never merged into a
/// session that is already running.
#[derive(Debug, Clone)]
pub struct TrackingConfiguration<M> {
    pub plane_detection: PlaneDetection,

    /// Render the raw feature points as a debug overlay.
    pub show_feature_points: bool,

    pub initial_map: Option<M>,
}

impl<M> TrackingConfiguration<M> {
    pub fn new(plane_detection: PlaneDetection) -> Self {
        Self {
            plane_detection,
            show_feature_points: false,
            initial_map: None,
        }
    }

    pub fn with_initial_map(mut self, map: M) -> Self {
        self.initial_map = Some(map);
        self
    }
}

/// Options controlling how `run` treats the previous session state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RunOptions {
    /// Restart device tracking from scratch.
    pub reset_tracking: bool,
    /// Drop every anchor of the previous run.
    pub remove_existing_anchors: bool,
}

impl RunOptions {
    /// Full reset: both tracking and anchors.
    pub fn full_reset() -> Self {
        Self {
            reset_tracking: true,
            remove_existing_anchors: true,
        }
    }
}
