//! Ground-truth camera trajectories in the TUM format.
//!
//! One pose per line: `timestamp tx ty tz qx qy qz qw`, `#` comments
//! allowed. Timestamps are assumed non-decreasing, as written by the
//! dataset capture tools.

use glam::{DQuat, DVec3};
use pointflow_core::{Pose, TimedPose};

use crate::error::{ArchiveError, ArchiveResult};

/// A camera trajectory ordered by timestamp.
#[derive(Clone, Debug, Default)]
pub struct Trajectory {
    poses: Vec<TimedPose>,
}

impl Trajectory {
    /// Parse a `groundtruth.txt` buffer.
    pub fn parse(bytes: &[u8]) -> ArchiveResult<Self> {
        let text = std::str::from_utf8(bytes)
            .map_err(|e| ArchiveError::parse(0, format!("trajectory is not UTF-8: {e}")))?;

        let mut poses = Vec::new();
        for (idx, line) in text.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let raw: Vec<&str> = line.split_whitespace().collect();
            if raw.len() != 8 {
                return Err(ArchiveError::parse(
                    idx + 1,
                    "expected `timestamp tx ty tz qx qy qz qw`",
                ));
            }
            let mut fields = [0.0f64; 8];
            for (slot, field) in fields.iter_mut().zip(&raw) {
                *slot = field
                    .parse::<f64>()
                    .map_err(|_| ArchiveError::parse(idx + 1, format!("bad number {field:?}")))?;
            }
            poses.push(TimedPose {
                timestamp: fields[0],
                pose: Pose::new(
                    DQuat::from_xyzw(fields[4], fields[5], fields[6], fields[7]),
                    DVec3::new(fields[1], fields[2], fields[3]),
                ),
            });
        }
        poses.sort_by(|a, b| a.timestamp.total_cmp(&b.timestamp));
        Ok(Self { poses })
    }

    pub fn len(&self) -> usize {
        self.poses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.poses.is_empty()
    }

    pub fn poses(&self) -> &[TimedPose] {
        &self.poses
    }

    /// Pose with the timestamp closest to `timestamp`, if it lies within
    /// `tolerance` seconds.
    pub fn nearest(&self, timestamp: f64, tolerance: f64) -> Option<&TimedPose> {
        if self.poses.is_empty() {
            return None;
        }
        let split = self
            .poses
            .partition_point(|tp| tp.timestamp < timestamp);
        let candidates = [split.checked_sub(1), Some(split)];
        let best = candidates
            .into_iter()
            .flatten()
            .filter_map(|i| self.poses.get(i))
            .min_by(|a, b| {
                (a.timestamp - timestamp)
                    .abs()
                    .total_cmp(&(b.timestamp - timestamp).abs())
            })?;
        ((best.timestamp - timestamp).abs() <= tolerance).then_some(best)
    }
}
