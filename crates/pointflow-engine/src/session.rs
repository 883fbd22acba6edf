//! One end-to-end tracking session: archive bytes in, reconciled render
//! buffers out.

use pointflow_core::{Arena, CameraProfile, PointStore, Span};
use pointflow_track::Tracker;

use crate::advancer::{FrameAdvancer, Phase, StepOutcome};
use crate::error::EngineResult;
use crate::sync::{BufferSync, RenderBuffers};
use crate::transfer;

/// Default point capacity, enough for a full recorded sequence at the
/// default sampling stride.
pub const DEFAULT_CAPACITY: u32 = 1_000_000;

/// Owns the arena, the store, the tracker and the loop state for one
/// archive at a time.
///
/// `load` ingests an archive, `step` consumes one frame per call and keeps
/// the given render buffers in sync, `reset` returns to the idle state.
pub struct Session {
    tracker: Box<dyn Tracker>,
    capacity: u32,
    arena: Arena,
    blob: Option<Span>,
    store: Option<PointStore>,
    advancer: FrameAdvancer,
    sync: BufferSync,
    dropped_total: u64,
}

/// Progress snapshot for status lines and summaries.
#[derive(Clone, Copy, Debug)]
pub struct SessionStats {
    pub phase: Phase,
    pub frame_count: u32,
    pub next_frame_id: u32,
    pub frames_lost: u32,
    pub valid_points: u32,
    pub capacity: u32,
    pub dropped_points: u64,
    pub rebinds: u32,
    pub range_writes: u32,
}

impl Session {
    pub fn new(tracker: Box<dyn Tracker>, capacity: u32) -> Self {
        Self {
            tracker,
            capacity,
            arena: Arena::new(),
            blob: None,
            store: None,
            advancer: FrameAdvancer::idle(),
            sync: BufferSync::new(),
            dropped_total: 0,
        }
    }

    /// Ingest an archive and prepare the frame loop. Returns the number of
    /// discoverable frames, bootstrap included.
    ///
    /// Any previously loaded archive is discarded first. On error the
    /// session is left idle with no partial state.
    pub fn load(&mut self, bytes: &[u8], profile: CameraProfile) -> EngineResult<u32> {
        self.reset();

        let mut arena = Arena::new();
        let blob = transfer::allocate(&mut arena, bytes.len());
        transfer::copy(&mut arena, blob, bytes)?;
        let index = transfer::index(&arena, blob)?;
        let frame_count = self.tracker.init(arena.bytes(blob), &index, profile)?;
        let store = PointStore::new(&mut arena, self.capacity);

        self.arena = arena;
        self.blob = Some(blob);
        self.store = Some(store);
        self.advancer = FrameAdvancer::indexed(frame_count);
        tracing::info!(
            frames = frame_count,
            blob_bytes = bytes.len(),
            capacity = self.capacity,
            "archive loaded"
        );
        Ok(frame_count)
    }

    /// Advance the loop by one frame and reconcile `gpu` with the store.
    pub fn step(&mut self, gpu: &mut dyn RenderBuffers) -> StepOutcome {
        let (Some(store), Some(blob)) = (self.store.as_mut(), self.blob) else {
            return StepOutcome::Idle;
        };
        let outcome = self
            .advancer
            .step(&mut self.arena, blob, self.tracker.as_mut(), store);
        if let StepOutcome::Stepped(report) = &outcome {
            self.dropped_total += report.dropped as u64;
            self.sync.reconcile(&self.arena, store, report.delta, gpu);
        }
        outcome
    }

    /// Drop the loaded archive and every structure derived from it.
    pub fn reset(&mut self) {
        self.arena = Arena::new();
        self.blob = None;
        self.store = None;
        self.advancer = FrameAdvancer::idle();
        self.sync = BufferSync::new();
        self.dropped_total = 0;
        self.tracker.reset();
    }

    pub fn phase(&self) -> Phase {
        self.advancer.phase()
    }

    pub fn frame_count(&self) -> u32 {
        self.advancer.frame_count()
    }

    pub fn valid_count(&self) -> u32 {
        match &self.store {
            Some(store) => store.valid_count(),
            None => 0,
        }
    }

    pub fn capacity(&self) -> u32 {
        self.capacity
    }

    /// Valid prefix of the position channel; empty while idle.
    pub fn positions(&self) -> &[f32] {
        match &self.store {
            Some(store) => store.positions(&self.arena),
            None => &[],
        }
    }

    /// Valid prefix of the color channel; empty while idle.
    pub fn colors(&self) -> &[f32] {
        match &self.store {
            Some(store) => store.colors(&self.arena),
            None => &[],
        }
    }

    pub fn stats(&self) -> SessionStats {
        SessionStats {
            phase: self.advancer.phase(),
            frame_count: self.advancer.frame_count(),
            next_frame_id: self.advancer.next_frame_id(),
            frames_lost: self.advancer.frames_lost(),
            valid_points: self.valid_count(),
            capacity: self.capacity,
            dropped_points: self.dropped_total,
            rebinds: self.sync.rebinds(),
            range_writes: self.sync.range_writes(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sync::MirrorBuffers;
    use pointflow_archive::{generate_archive, SynthConfig};
    use pointflow_track::ScriptedTracker;

    fn tiny_blob(frames: u32) -> Vec<u8> {
        generate_archive(&SynthConfig {
            frames,
            width: 16,
            height: 12,
            seed: 13,
        })
        .expect("generate")
    }

    fn profile() -> CameraProfile {
        "icl".parse().expect("tag")
    }

    #[test]
    fn test_idle_session_does_not_step() {
        let mut session = Session::new(Box::new(ScriptedTracker::uniform(3, 2, 1)), 100);
        let mut gpu = MirrorBuffers::new();
        assert_eq!(session.step(&mut gpu), StepOutcome::Idle);
        assert_eq!(session.phase(), Phase::Idle);
        assert!(session.positions().is_empty());
    }

    #[test]
    fn test_load_step_finish() {
        let blob = tiny_blob(4);
        let mut session = Session::new(Box::new(ScriptedTracker::uniform(4, 5, 2)), 1000);
        let frames = session.load(&blob, profile()).expect("load");
        assert_eq!(frames, 4);
        assert_eq!(session.phase(), Phase::Indexed);

        let mut gpu = MirrorBuffers::new();
        let mut steps = 0;
        while let StepOutcome::Stepped(_) = session.step(&mut gpu) {
            steps += 1;
        }
        assert_eq!(steps, 3);
        assert_eq!(session.phase(), Phase::Done);
        assert_eq!(session.valid_count(), 4 * 5);
        assert_eq!(gpu.visible(), session.valid_count());
        assert_eq!(gpu.positions(), session.positions());
        assert_eq!(gpu.colors(), session.colors());
    }

    #[test]
    fn test_load_failure_leaves_session_idle() {
        let mut session = Session::new(Box::new(ScriptedTracker::uniform(2, 2, 3)), 100);
        let err = session.load(&[0xFFu8; 3000], profile());
        assert!(err.is_err(), "garbage bytes are not a tar archive");
        assert_eq!(session.phase(), Phase::Idle);
        assert_eq!(session.valid_count(), 0);
        assert!(session.positions().is_empty());

        let mut gpu = MirrorBuffers::new();
        assert_eq!(session.step(&mut gpu), StepOutcome::Idle);
    }

    #[test]
    fn test_reset_returns_to_idle() {
        let blob = tiny_blob(3);
        let mut session = Session::new(Box::new(ScriptedTracker::uniform(3, 4, 4)), 100);
        session.load(&blob, profile()).expect("load");
        let mut gpu = MirrorBuffers::new();
        session.step(&mut gpu);
        assert!(session.valid_count() > 0);

        session.reset();
        assert_eq!(session.phase(), Phase::Idle);
        assert_eq!(session.valid_count(), 0);
        assert_eq!(session.frame_count(), 0);
        assert_eq!(session.stats().dropped_points, 0);
    }

    #[test]
    fn test_reload_starts_fresh() {
        let blob = tiny_blob(3);
        let mut session = Session::new(Box::new(ScriptedTracker::uniform(3, 2, 5)), 100);
        session.load(&blob, profile()).expect("load");
        let mut gpu = MirrorBuffers::new();
        while let StepOutcome::Stepped(_) = session.step(&mut gpu) {}
        let first_run = session.valid_count();
        assert!(first_run > 0);

        session.load(&blob, profile()).expect("reload");
        assert_eq!(session.phase(), Phase::Indexed);
        assert_eq!(session.valid_count(), 0, "reload must discard old points");

        while let StepOutcome::Stepped(_) = session.step(&mut gpu) {}
        assert_eq!(session.valid_count(), first_run);
        assert_eq!(gpu.visible(), first_run);
    }

    #[test]
    fn test_stats_progress() {
        let blob = tiny_blob(5);
        let mut session = Session::new(Box::new(ScriptedTracker::uniform(5, 3, 6)), 1000);
        session.load(&blob, profile()).expect("load");
        let mut gpu = MirrorBuffers::new();

        session.step(&mut gpu);
        let stats = session.stats();
        assert_eq!(stats.frame_count, 5);
        assert_eq!(stats.next_frame_id, 2);
        assert_eq!(stats.valid_points, 6, "bootstrap plus frame 1");
        assert_eq!(stats.rebinds, 1);
        assert_eq!(stats.range_writes, 0);

        session.step(&mut gpu);
        let stats = session.stats();
        assert_eq!(stats.valid_points, 9);
        assert_eq!(stats.range_writes, 1);
    }
}
