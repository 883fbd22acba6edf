//! Ground-truth replay tracking.
//!
//! Replays a recorded trajectory instead of estimating motion: each frame's
//! depth image is back-projected through the pose nearest to its timestamp,
//! colored from the paired RGB image, and emitted as world-space points.

use glam::DVec2;
use pointflow_archive::{
    decode_color, decode_depth, parse_associations, Association, EntryMap, Trajectory,
    ASSOCIATIONS_PATH, TRAJECTORY_PATH,
};
use pointflow_core::{CameraProfile, Intrinsics, PointBatch, Pose};

use crate::error::TrackResult;
use crate::tracker::{FrameDescriptor, LostReason, Tracker};

#[derive(Clone, Copy, Debug)]
pub struct ReplayConfig {
    /// Sample every `stride`-th pixel in both axes.
    pub stride: u32,
    /// Maximum timestamp distance when pairing a frame with a pose, in
    /// seconds.
    pub pose_tolerance: f64,
}

impl Default for ReplayConfig {
    fn default() -> Self {
        Self {
            stride: 4,
            pose_tolerance: 0.02,
        }
    }
}

/// Archive state held between `init` and `reset`.
#[derive(Debug)]
struct Loaded {
    intrinsics: Intrinsics,
    associations: Vec<Association>,
    trajectory: Trajectory,
    index: EntryMap,
}

impl Loaded {
    fn pose_for(&self, idx: usize, tolerance: f64) -> Option<Pose> {
        let assoc = &self.associations[idx];
        self.trajectory
            .nearest(assoc.depth_timestamp, tolerance)
            .map(|tp| tp.pose)
    }

    /// Decode frame `idx` and back-project its sampled pixels through
    /// `pose` into world space.
    fn collect_points(
        &self,
        config: &ReplayConfig,
        archive: &[u8],
        idx: usize,
        pose: Pose,
    ) -> TrackResult<PointBatch> {
        let assoc = &self.associations[idx];
        let depth = decode_depth(self.index.slice(archive, &assoc.depth_path)?)?;
        let color = decode_color(self.index.slice(archive, &assoc.color_path)?)?;

        let width = depth.width.min(color.width);
        let height = depth.height.min(color.height);
        let stride = config.stride.max(1) as usize;

        let mut batch = PointBatch::new();
        for y in (0..height).step_by(stride) {
            for x in (0..width).step_by(stride) {
                let Some(z) = depth.depth_at(x, y) else {
                    continue;
                };
                let camera = self
                    .intrinsics
                    .back_project(DVec2::new(x as f64, y as f64), z);
                let world = pose.transform_point(camera);
                batch.push(
                    [world.x as f32, world.y as f32, world.z as f32],
                    color.rgb_at(x, y),
                );
            }
        }
        Ok(batch)
    }
}

#[derive(Debug, Default)]
pub struct ReplayTracker {
    config: ReplayConfig,
    loaded: Option<Loaded>,
    pending: PointBatch,
}

impl ReplayTracker {
    pub fn new(config: ReplayConfig) -> Self {
        Self {
            config,
            loaded: None,
            pending: PointBatch::new(),
        }
    }
}

impl Tracker for ReplayTracker {
    fn init(
        &mut self,
        archive: &[u8],
        index: &EntryMap,
        profile: CameraProfile,
    ) -> TrackResult<u32> {
        self.reset();

        let associations = parse_associations(index.slice(archive, ASSOCIATIONS_PATH)?)?;
        let trajectory = Trajectory::parse(index.slice(archive, TRAJECTORY_PATH)?)?;
        let loaded = Loaded {
            intrinsics: profile.intrinsics(),
            associations,
            trajectory,
            index: index.clone(),
        };

        let frame_count = loaded.associations.len() as u32;
        if frame_count > 0 {
            // Bootstrap: frame 0 seeds the cloud before the loop starts.
            match loaded.pose_for(0, self.config.pose_tolerance) {
                Some(pose) => {
                    let batch = loaded.collect_points(&self.config, archive, 0, pose)?;
                    tracing::debug!(points = batch.len(), "bootstrap frame consumed");
                    self.pending.extend(&batch);
                }
                None => tracing::warn!("no pose for bootstrap frame, starting empty"),
            }
        }

        self.loaded = Some(loaded);
        Ok(frame_count)
    }

    fn track(&mut self, archive: &[u8], frame_id: u32) -> FrameDescriptor {
        let Some(loaded) = &self.loaded else {
            return FrameDescriptor::lost(frame_id, 0.0, LostReason::OutOfRange);
        };
        let idx = frame_id as usize;
        let Some(assoc) = loaded.associations.get(idx) else {
            return FrameDescriptor::lost(frame_id, 0.0, LostReason::OutOfRange);
        };
        let timestamp = assoc.depth_timestamp;

        let Some(pose) = loaded.pose_for(idx, self.config.pose_tolerance) else {
            return FrameDescriptor::lost(frame_id, timestamp, LostReason::NoPose);
        };

        match loaded.collect_points(&self.config, archive, idx, pose) {
            Ok(batch) => {
                self.pending.extend(&batch);
                FrameDescriptor::tracked(frame_id, timestamp, pose)
            }
            Err(error) => {
                tracing::warn!(frame = frame_id, %error, "frame decode failed");
                FrameDescriptor::lost(frame_id, timestamp, LostReason::BadFrame)
            }
        }
    }

    fn take_points(&mut self) -> PointBatch {
        std::mem::take(&mut self.pending)
    }

    fn reset(&mut self) {
        self.loaded = None;
        self.pending.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TrackError;
    use crate::tracker::TrackStatus;
    use pointflow_archive::frame::{encode_color, encode_depth};
    use pointflow_archive::{generate_archive, SynthConfig};

    fn synth_blob(frames: u32) -> (Vec<u8>, EntryMap) {
        let blob = generate_archive(&SynthConfig {
            frames,
            width: 32,
            height: 24,
            seed: 11,
        })
        .expect("generate");
        let index = EntryMap::build(&blob).expect("index");
        (blob, index)
    }

    #[test]
    fn test_init_reports_frame_count_and_bootstraps() {
        let (blob, index) = synth_blob(4);
        let mut tracker = ReplayTracker::default();
        let frames = tracker
            .init(&blob, &index, CameraProfile::IclNuim)
            .expect("init");
        assert_eq!(frames, 4);
        let bootstrap = tracker.take_points();
        assert!(
            !bootstrap.is_empty(),
            "bootstrap frame should seed the cloud"
        );
        assert!(
            tracker.take_points().is_empty(),
            "take_points must drain pending points"
        );
    }

    #[test]
    fn test_track_emits_world_points() {
        let (blob, index) = synth_blob(3);
        let mut tracker = ReplayTracker::new(ReplayConfig {
            stride: 2,
            ..ReplayConfig::default()
        });
        tracker
            .init(&blob, &index, CameraProfile::IclNuim)
            .expect("init");
        tracker.take_points();

        let descriptor = tracker.track(&blob, 1);
        assert!(
            descriptor.status.is_tracked(),
            "expected tracked, got {descriptor:?}"
        );
        assert_eq!(descriptor.frame_id, 1);

        let points = tracker.take_points();
        assert!(!points.is_empty());
        for color in points.colors() {
            for channel in color {
                assert!((0.0..=1.0).contains(channel), "color out of range: {color:?}");
            }
        }
        for position in points.positions() {
            assert!(position.iter().all(|v| v.is_finite()));
        }
    }

    #[test]
    fn test_track_out_of_range_is_lost() {
        let (blob, index) = synth_blob(2);
        let mut tracker = ReplayTracker::default();
        tracker
            .init(&blob, &index, CameraProfile::IclNuim)
            .expect("init");
        tracker.take_points();

        let descriptor = tracker.track(&blob, 17);
        assert_eq!(
            descriptor.status,
            TrackStatus::Lost(LostReason::OutOfRange)
        );
        assert!(
            tracker.take_points().is_empty(),
            "an out-of-range frame must not emit points"
        );
    }

    /// Archive with a second frame that has no nearby pose and a third
    /// whose images are missing.
    fn degenerate_blob() -> (Vec<u8>, EntryMap) {
        let mut builder = tar::Builder::new(Vec::new());
        let mut add = |name: &str, data: &[u8]| {
            let mut header = tar::Header::new_gnu();
            header.set_size(data.len() as u64);
            header.set_mode(0o644);
            header.set_cksum();
            builder.append_data(&mut header, name, data).expect("append");
        };

        let depth = encode_depth(8, 8, |_, _| 5000).expect("depth png");
        let color = encode_color(8, 8, |_, _| [10, 20, 30]).expect("color png");
        add("depth/0.png", &depth);
        add("rgb/0.png", &color);

        add(
            "associations.txt",
            b"0.0 depth/0.png 0.0 rgb/0.png\n\
              1.0 depth/1.png 1.0 rgb/1.png\n\
              2.0 depth/2.png 2.0 rgb/2.png\n",
        );
        // Poses exist for frames 0 and 2 only.
        add(
            "groundtruth.txt",
            b"0.0 0.0 0.0 0.0 0.0 0.0 0.0 1.0\n\
              2.0 0.5 0.0 0.0 0.0 0.0 0.0 1.0\n",
        );

        let blob = builder.into_inner().expect("tar");
        let index = EntryMap::build(&blob).expect("index");
        (blob, index)
    }

    #[test]
    fn test_track_without_pose_is_lost_not_fatal() {
        let (blob, index) = degenerate_blob();
        let mut tracker = ReplayTracker::default();
        let frames = tracker
            .init(&blob, &index, CameraProfile::Fr1)
            .expect("init");
        assert_eq!(frames, 3);

        let descriptor = tracker.track(&blob, 1);
        assert_eq!(descriptor.status, TrackStatus::Lost(LostReason::NoPose));
        assert_eq!(descriptor.timestamp, 1.0);
    }

    #[test]
    fn test_track_with_missing_images_is_lost() {
        let (blob, index) = degenerate_blob();
        let mut tracker = ReplayTracker::default();
        tracker.init(&blob, &index, CameraProfile::Fr1).expect("init");
        tracker.take_points();

        let descriptor = tracker.track(&blob, 2);
        assert_eq!(descriptor.status, TrackStatus::Lost(LostReason::BadFrame));
        assert!(
            tracker.take_points().is_empty(),
            "a lost frame must not emit points"
        );
    }

    #[test]
    fn test_missing_associations_fails_init() {
        let mut builder = tar::Builder::new(Vec::new());
        let mut header = tar::Header::new_gnu();
        header.set_size(1);
        header.set_mode(0o644);
        header.set_cksum();
        builder
            .append_data(&mut header, "readme.md", b"x".as_slice())
            .expect("append");
        let blob = builder.into_inner().expect("tar");
        let index = EntryMap::build(&blob).expect("index");

        let mut tracker = ReplayTracker::default();
        let err = tracker
            .init(&blob, &index, CameraProfile::Fr1)
            .unwrap_err();
        assert!(
            matches!(err, TrackError::Archive(_)),
            "init failures come from the archive, got {err:?}"
        );
    }

    #[test]
    fn test_reset_forgets_archive() {
        let (blob, index) = synth_blob(2);
        let mut tracker = ReplayTracker::default();
        tracker
            .init(&blob, &index, CameraProfile::IclNuim)
            .expect("init");
        tracker.reset();

        let descriptor = tracker.track(&blob, 1);
        assert_eq!(
            descriptor.status,
            TrackStatus::Lost(LostReason::OutOfRange),
            "a reset tracker knows no frames"
        );
        assert!(tracker.take_points().is_empty());
    }
}
