//! The tracking interface the frame loop drives.

use std::fmt;

use pointflow_archive::EntryMap;
use pointflow_core::{CameraProfile, PointBatch, Pose};

use crate::error::TrackResult;

/// Why a frame could not be tracked.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LostReason {
    /// The frame id lies outside the indexed range.
    OutOfRange,
    /// No trajectory pose close enough to the frame timestamp.
    NoPose,
    /// The frame's image data could not be read or decoded.
    BadFrame,
}

impl fmt::Display for LostReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            LostReason::OutOfRange => "frame id out of range",
            LostReason::NoPose => "no pose within tolerance",
            LostReason::BadFrame => "unreadable frame data",
        };
        f.write_str(text)
    }
}

/// Per-frame tracking verdict. A lost frame is an ordinary outcome, not an
/// error: the loop logs it and moves on to the next frame.
#[derive(Clone, Debug, PartialEq)]
pub enum TrackStatus {
    Tracked(Pose),
    Lost(LostReason),
}

impl TrackStatus {
    pub fn is_tracked(&self) -> bool {
        matches!(self, TrackStatus::Tracked(_))
    }
}

/// What happened to one frame.
#[derive(Clone, Debug, PartialEq)]
pub struct FrameDescriptor {
    pub frame_id: u32,
    pub timestamp: f64,
    pub status: TrackStatus,
}

impl FrameDescriptor {
    pub fn tracked(frame_id: u32, timestamp: f64, pose: Pose) -> Self {
        Self {
            frame_id,
            timestamp,
            status: TrackStatus::Tracked(pose),
        }
    }

    pub fn lost(frame_id: u32, timestamp: f64, reason: LostReason) -> Self {
        Self {
            frame_id,
            timestamp,
            status: TrackStatus::Lost(reason),
        }
    }
}

/// Tracked frames format as a TUM trajectory line; lost frames as a
/// comment, so a replay transcript stays loadable as a trajectory.
impl fmt::Display for FrameDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.status {
            TrackStatus::Tracked(pose) => write!(f, "{:.6} {}", self.timestamp, pose),
            TrackStatus::Lost(reason) => {
                write!(f, "# frame {} lost: {}", self.frame_id, reason)
            }
        }
    }
}

/// A source of camera poses and world-space points, fed one frame at a
/// time from an indexed archive.
///
/// Frame ids are 0-based; frame 0 is the bootstrap frame consumed by
/// [`Tracker::init`] and the loop then requests ids `1..frame_count`
/// strictly in order. Points accumulate inside the tracker until
/// [`Tracker::take_points`] drains them.
pub trait Tracker {
    /// Load metadata from the archive, consume the bootstrap frame and
    /// return the number of discoverable frames. Zero means there is
    /// nothing to track, which is a valid outcome.
    fn init(
        &mut self,
        archive: &[u8],
        index: &EntryMap,
        profile: CameraProfile,
    ) -> TrackResult<u32>;

    /// Process one frame. Failures surface in the descriptor status; this
    /// never aborts the loop.
    fn track(&mut self, archive: &[u8], frame_id: u32) -> FrameDescriptor;

    /// Drain every point emitted since the previous call.
    fn take_points(&mut self) -> PointBatch;

    /// Forget all loaded state, returning to the pre-`init` condition.
    fn reset(&mut self);
}
