//! Rigid-body camera poses in the TUM RGB-D convention.

use std::fmt;

use glam::{DQuat, DVec3};

/// Camera-to-world rigid transform.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Pose {
    pub rotation: DQuat,
    pub translation: DVec3,
}

impl Pose {
    pub const IDENTITY: Pose = Pose {
        rotation: DQuat::IDENTITY,
        translation: DVec3::ZERO,
    };

    pub fn new(rotation: DQuat, translation: DVec3) -> Self {
        Self {
            rotation,
            translation,
        }
    }

    /// Map a point from camera space into world space.
    pub fn transform_point(&self, point: DVec3) -> DVec3 {
        self.rotation * point + self.translation
    }

    pub fn inverse(&self) -> Pose {
        let rotation = self.rotation.inverse();
        Pose {
            rotation,
            translation: -(rotation * self.translation),
        }
    }
}

impl Default for Pose {
    fn default() -> Self {
        Self::IDENTITY
    }
}

/// Formats as `tx ty tz qx qy qz qw`, the pose part of a TUM trajectory
/// line.
impl fmt::Display for Pose {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let t = self.translation;
        let q = self.rotation;
        write!(
            f,
            "{:.6} {:.6} {:.6} {:.6} {:.6} {:.6} {:.6}",
            t.x, t.y, t.z, q.x, q.y, q.z, q.w
        )
    }
}

/// A pose tagged with its trajectory timestamp in seconds.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TimedPose {
    pub timestamp: f64,
    pub pose: Pose,
}

impl fmt::Display for TimedPose {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.6} {}", self.timestamp, self.pose)
    }
}
