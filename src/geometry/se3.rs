//! SE3: rigid-body transform (rotation + translation).
//!
//! Used for anchor poses and the simulated camera pose. `SE3` transforms
//! points as `p' = R * p + t`, so a pose stored as T_wc maps camera-frame
//! points into the world frame.

use nalgebra::{Matrix4, UnitQuaternion, Vector3};
use serde::{Deserialize, Serialize};

/// 6-DOF rigid transformation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SE3 {
    pub rotation: UnitQuaternion<f64>,
    pub translation: Vector3<f64>,
}

impl SE3 {
    pub fn identity() -> Self {
        Self {
            rotation: UnitQuaternion::identity(),
            translation: Vector3::zeros(),
        }
    }

    pub fn inverse(&self) -> Self {
        let rotation = self.rotation.inverse();
        Self {
            rotation,
            translation: -(rotation * self.translation),
        }
    }

    /// `self * other`.
    pub fn compose(&self, other: &SE3) -> Self {
        Self {
            rotation: self.rotation * other.rotation,
            translation: self.rotation * other.translation + self.translation,
        }
    }

    pub fn transform_point(&self, p: &Vector3<f64>) -> Vector3<f64> {
        self.rotation * p + self.translation
    }

    /// Rotate a direction vector (translation is ignored).
    pub fn transform_vector(&self, v: &Vector3<f64>) -> Vector3<f64> {
        self.rotation * v
    }

    /// Homogeneous 4x4 matrix, the layout AR frameworks call a "world transform".
    pub fn to_matrix(&self) -> Matrix4<f64> {
        let mut m = Matrix4::identity();
        m.fixed_view_mut::<3, 3>(0, 0)
            .copy_from(self.rotation.to_rotation_matrix().matrix());
        m.fixed_view_mut::<3, 1>(0, 3).copy_from(&self.translation);
        m
    }

    /// Yaw-only rotation about the world up axis (+Y), plus translation.
    ///
    /// Anchors placed on horizontal surfaces keep gravity alignment and only
    /// inherit the heading of the camera that placed them.
    pub fn from_yaw(yaw: f64, translation: Vector3<f64>) -> Self {
        Self {
            rotation: UnitQuaternion::from_axis_angle(&Vector3::y_axis(), yaw),
            translation,
        }
    }
}

impl Default for SE3 {
    fn default() -> Self {
        Self::identity()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_identity_transform() {
        let p = Vector3::new(1.0, -2.0, 3.0);
        assert_relative_eq!(SE3::identity().transform_point(&p), p, epsilon = 1e-12);
    }

    #[test]
    fn test_inverse_compose_is_identity() {
        let pose = SE3::from_yaw(0.7, Vector3::new(0.5, 1.0, -2.0));
        let composed = pose.compose(&pose.inverse());

        assert_relative_eq!(composed.translation.norm(), 0.0, epsilon = 1e-12);
        assert_relative_eq!(composed.rotation.angle(), 0.0, epsilon = 1e-12);
    }

    #[test]
    fn test_to_matrix_matches_transform_point() {
        let pose = SE3::from_yaw(std::f64::consts::FRAC_PI_2, Vector3::new(1.0, 0.0, 0.0));
        let p = Vector3::new(0.0, 0.0, 1.0);

        let m = pose.to_matrix();
        let ph = m * p.push(1.0);
        let expected = pose.transform_point(&p);

        assert_relative_eq!(ph.xyz(), expected, epsilon = 1e-12);
        // +Z rotated 90 degrees about +Y lands on +X
        assert_relative_eq!(expected, Vector3::new(2.0, 0.0, 0.0), epsilon = 1e-12);
    }
}
