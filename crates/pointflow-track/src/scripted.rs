//! A tracker that plays back a predetermined script.
//!
//! Used by the frame-loop tests and the headless tools to exercise the
//! pipeline without touching image data.

use pointflow_archive::EntryMap;
use pointflow_core::{CameraProfile, PointBatch, Pose};

use crate::error::TrackResult;
use crate::tracker::{FrameDescriptor, LostReason, TrackStatus, Tracker};

/// One scripted frame: its verdict and the points it contributes.
#[derive(Clone, Debug)]
pub struct ScriptedFrame {
    pub status: TrackStatus,
    pub points: PointBatch,
}

impl ScriptedFrame {
    pub fn tracked(points: PointBatch) -> Self {
        Self {
            status: TrackStatus::Tracked(Pose::IDENTITY),
            points,
        }
    }

    pub fn lost(reason: LostReason) -> Self {
        Self {
            status: TrackStatus::Lost(reason),
            points: PointBatch::new(),
        }
    }
}

#[derive(Debug, Default)]
pub struct ScriptedTracker {
    bootstrap: PointBatch,
    frames: Vec<ScriptedFrame>,
    frame_count: u32,
    pending: PointBatch,
    requested: Vec<u32>,
}

impl ScriptedTracker {
    /// Script with a bootstrap batch for frame 0 and one entry per
    /// subsequent frame. `init` will report `1 + frames.len()` frames.
    pub fn new(bootstrap: PointBatch, frames: Vec<ScriptedFrame>) -> Self {
        let frame_count = 1 + frames.len() as u32;
        Self {
            bootstrap,
            frames,
            frame_count,
            pending: PointBatch::new(),
            requested: Vec::new(),
        }
    }

    /// A dataset with no frames at all.
    pub fn empty() -> Self {
        Self::default()
    }

    /// `total_frames` frames (bootstrap included) of `points_per_frame`
    /// deterministic points each.
    pub fn uniform(total_frames: u32, points_per_frame: usize, seed: u64) -> Self {
        if total_frames == 0 {
            return Self::empty();
        }
        let frames = (1..total_frames)
            .map(|i| ScriptedFrame::tracked(batch(seed.wrapping_add(i as u64), points_per_frame)))
            .collect();
        Self::new(batch(seed, points_per_frame), frames)
    }

    /// Frame ids seen by `track`, in call order.
    pub fn requested(&self) -> &[u32] {
        &self.requested
    }
}

fn batch(seed: u64, count: usize) -> PointBatch {
    let mut state = seed;
    let mut next = move || {
        state = state
            .wrapping_mul(6364136223846793005)
            .wrapping_add(1442695040888963407);
        (state >> 33) as f32 / (1u64 << 31) as f32
    };
    let mut batch = PointBatch::new();
    for _ in 0..count {
        batch.push(
            [next() * 2.0 - 1.0, next() * 2.0 - 1.0, next() * 3.0],
            [next(), next(), next()],
        );
    }
    batch
}

impl Tracker for ScriptedTracker {
    fn init(
        &mut self,
        _archive: &[u8],
        _index: &EntryMap,
        _profile: CameraProfile,
    ) -> TrackResult<u32> {
        self.pending = self.bootstrap.clone();
        self.requested.clear();
        Ok(self.frame_count)
    }

    fn track(&mut self, _archive: &[u8], frame_id: u32) -> FrameDescriptor {
        self.requested.push(frame_id);
        let timestamp = frame_id as f64 / 30.0;
        let entry = frame_id
            .checked_sub(1)
            .and_then(|idx| self.frames.get(idx as usize));
        match entry {
            Some(frame) => {
                if frame.status.is_tracked() {
                    self.pending.extend(&frame.points);
                }
                FrameDescriptor {
                    frame_id,
                    timestamp,
                    status: frame.status.clone(),
                }
            }
            None => FrameDescriptor::lost(frame_id, timestamp, LostReason::OutOfRange),
        }
    }

    fn take_points(&mut self) -> PointBatch {
        std::mem::take(&mut self.pending)
    }

    fn reset(&mut self) {
        self.pending.clear();
        self.requested.clear();
    }
}
