//! Pinhole camera models for the supported RGB-D datasets.

use std::str::FromStr;

use glam::{DVec2, DVec3};
use thiserror::Error;

/// Depth images store `u16` values of `meters * DEPTH_SCALE`.
pub const DEPTH_SCALE: f64 = 5000.0;

/// Pinhole intrinsics. Focal lengths and principal point are in pixels;
/// a negative `focal.y` flips the vertical axis, as published for ICL-NUIM.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Intrinsics {
    pub principal: DVec2,
    pub focal: DVec2,
    pub skew: f64,
}

impl Intrinsics {
    /// Project a camera-space point onto the image plane.
    pub fn project(&self, point: DVec3) -> DVec2 {
        DVec2::new(
            (self.focal.x * point.x + self.skew * point.y) / point.z + self.principal.x,
            self.focal.y * point.y / point.z + self.principal.y,
        )
    }

    /// Lift a pixel at the given depth (meters) back into camera space.
    pub fn back_project(&self, pixel: DVec2, depth: f64) -> DVec3 {
        let y = (pixel.y - self.principal.y) * depth / self.focal.y;
        let x = ((pixel.x - self.principal.x) * depth - self.skew * y) / self.focal.x;
        DVec3::new(x, y, depth)
    }
}

/// Calibration presets keyed by dataset tag.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CameraProfile {
    /// TUM freiburg1 sequences.
    Fr1,
    /// TUM freiburg2 sequences.
    Fr2,
    /// TUM freiburg3 sequences.
    Fr3,
    /// ICL-NUIM synthetic sequences.
    IclNuim,
}

impl CameraProfile {
    pub fn intrinsics(&self) -> Intrinsics {
        match self {
            CameraProfile::Fr1 => Intrinsics {
                principal: DVec2::new(318.643040, 255.313989),
                focal: DVec2::new(517.306408, 516.469215),
                skew: 0.0,
            },
            CameraProfile::Fr2 => Intrinsics {
                principal: DVec2::new(325.141442, 249.701764),
                focal: DVec2::new(520.908620, 521.007327),
                skew: 0.0,
            },
            CameraProfile::Fr3 => Intrinsics {
                principal: DVec2::new(320.106653, 247.632132),
                focal: DVec2::new(535.433105, 539.212524),
                skew: 0.0,
            },
            CameraProfile::IclNuim => Intrinsics {
                principal: DVec2::new(319.5, 239.5),
                focal: DVec2::new(481.20, -480.0),
                skew: 0.0,
            },
        }
    }

    pub fn tag(&self) -> &'static str {
        match self {
            CameraProfile::Fr1 => "fr1",
            CameraProfile::Fr2 => "fr2",
            CameraProfile::Fr3 => "fr3",
            CameraProfile::IclNuim => "icl",
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown camera profile: {0:?} (expected fr1, fr2, fr3 or icl)")]
pub struct UnknownProfile(pub String);

impl FromStr for CameraProfile {
    type Err = UnknownProfile;

    fn from_str(tag: &str) -> Result<Self, Self::Err> {
        match tag {
            "fr1" => Ok(CameraProfile::Fr1),
            "fr2" => Ok(CameraProfile::Fr2),
            "fr3" => Ok(CameraProfile::Fr3),
            "icl" => Ok(CameraProfile::IclNuim),
            other => Err(UnknownProfile(other.to_string())),
        }
    }
}
