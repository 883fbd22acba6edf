//! The per-frame state machine driving a tracking session.
//!
//! The loop is externally clocked: whoever owns the session (a render loop,
//! a CLI) calls `step` once per tick and the advancer consumes exactly one
//! frame, appends whatever the tracker emitted and reports the grown range.

use pointflow_core::{Arena, DeltaRange, PointStore, Span};
use pointflow_track::{FrameDescriptor, TrackStatus, Tracker};

/// Lifecycle of one loaded archive.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Phase {
    /// No archive loaded.
    Idle,
    /// Archive indexed and tracker initialized; the loop has not started.
    Indexed,
    /// Frames are being consumed one step at a time.
    Tracking,
    /// Every frame has been consumed. Terminal until the next load.
    Done,
}

/// What one `step` call did.
#[derive(Clone, Debug, PartialEq)]
pub enum StepOutcome {
    /// Nothing is loaded; stepping has no effect.
    Idle,
    /// One frame was consumed.
    Stepped(StepReport),
    /// All frames were already consumed; the call was a no-op.
    Finished,
}

#[derive(Clone, Debug, PartialEq)]
pub struct StepReport {
    /// The frame the tracker processed. `None` for the single flush step
    /// of a dataset with no frames beyond the bootstrap.
    pub descriptor: Option<FrameDescriptor>,
    /// Range of points that became valid during this step.
    pub delta: DeltaRange,
    /// Points discarded because the store was full.
    pub dropped: u32,
}

#[derive(Debug)]
pub struct FrameAdvancer {
    phase: Phase,
    next_frame_id: u32,
    frame_count: u32,
    frames_lost: u32,
}

impl FrameAdvancer {
    pub fn idle() -> Self {
        Self {
            phase: Phase::Idle,
            next_frame_id: 1,
            frame_count: 0,
            frames_lost: 0,
        }
    }

    /// Start the loop over a freshly indexed archive of `frame_count`
    /// frames, the bootstrap frame included.
    pub fn indexed(frame_count: u32) -> Self {
        Self {
            phase: Phase::Indexed,
            next_frame_id: 1,
            frame_count,
            frames_lost: 0,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn frame_count(&self) -> u32 {
        self.frame_count
    }

    /// Id the next `step` call will hand to the tracker.
    pub fn next_frame_id(&self) -> u32 {
        self.next_frame_id
    }

    pub fn frames_lost(&self) -> u32 {
        self.frames_lost
    }

    /// Consume one frame.
    ///
    /// Frame ids go to the tracker strictly sequentially starting at 1.
    /// The first step also flushes the bootstrap frame's points, so they
    /// land in the same append as frame 1's. A lost frame is logged and
    /// skipped; the loop never stops early. Once `next_frame_id` reaches
    /// `frame_count` the machine is `Done` and further steps are no-ops.
    pub fn step(
        &mut self,
        arena: &mut Arena,
        blob: Span,
        tracker: &mut dyn Tracker,
        store: &mut PointStore,
    ) -> StepOutcome {
        match self.phase {
            Phase::Idle => StepOutcome::Idle,
            Phase::Done => StepOutcome::Finished,
            Phase::Indexed | Phase::Tracking => {
                self.phase = Phase::Tracking;

                let descriptor = if self.next_frame_id < self.frame_count {
                    let descriptor = tracker.track(arena.bytes(blob), self.next_frame_id);
                    if let TrackStatus::Lost(reason) = &descriptor.status {
                        self.frames_lost += 1;
                        tracing::warn!(frame = descriptor.frame_id, %reason, "frame lost");
                    }
                    self.next_frame_id += 1;
                    Some(descriptor)
                } else {
                    None
                };

                let batch = tracker.take_points();
                let outcome = store.append(arena, &batch);
                if outcome.dropped > 0 {
                    tracing::warn!(
                        dropped = outcome.dropped,
                        valid = store.valid_count(),
                        "point store full, discarding points"
                    );
                }

                if self.next_frame_id >= self.frame_count {
                    self.phase = Phase::Done;
                    tracing::info!(
                        frames = self.frame_count,
                        lost = self.frames_lost,
                        points = store.valid_count(),
                        "tracking finished"
                    );
                }

                StepOutcome::Stepped(StepReport {
                    descriptor,
                    delta: outcome.range,
                    dropped: outcome.dropped,
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pointflow_core::PointBatch;
    use pointflow_track::{LostReason, ScriptedFrame, ScriptedTracker};

    #[test]
    fn test_fifty_frames_take_forty_nine_steps() {
        let mut tracker = ScriptedTracker::uniform(50, 3, 21);
        let mut arena = Arena::new();
        let blob = arena.alloc(0);
        let mut store = PointStore::new(&mut arena, 10_000);
        tracker
            .init(&[], &Default::default(), "fr1".parse().expect("tag"))
            .expect("init");

        let mut advancer = FrameAdvancer::indexed(50);
        let mut steps = 0;
        while let StepOutcome::Stepped(_) = advancer.step(&mut arena, blob, &mut tracker, &mut store) {
            steps += 1;
            assert!(steps <= 50, "loop must terminate");
        }
        assert_eq!(steps, 49, "bootstrap rides along with frame 1");
        assert_eq!(advancer.phase(), Phase::Done);
        assert_eq!(advancer.next_frame_id(), 50);
        let expected: Vec<u32> = (1..50).collect();
        assert_eq!(tracker.requested(), &expected[..], "ids must be sequential");
    }

    #[test]
    fn test_first_step_flushes_bootstrap_points() {
        let mut bootstrap = PointBatch::new();
        for i in 0..5 {
            bootstrap.push([i as f32, 0.0, 0.0], [1.0, 1.0, 1.0]);
        }
        let mut frame1 = PointBatch::new();
        for _ in 0..4 {
            frame1.push([0.0, 1.0, 0.0], [0.5, 0.5, 0.5]);
        }
        let mut tracker =
            ScriptedTracker::new(bootstrap, vec![ScriptedFrame::tracked(frame1)]);
        let mut arena = Arena::new();
        let blob = arena.alloc(0);
        let mut store = PointStore::new(&mut arena, 100);
        tracker
            .init(&[], &Default::default(), "fr1".parse().expect("tag"))
            .expect("init");

        let mut advancer = FrameAdvancer::indexed(2);
        let StepOutcome::Stepped(report) =
            advancer.step(&mut arena, blob, &mut tracker, &mut store)
        else {
            panic!("expected a step");
        };
        assert_eq!(
            report.delta,
            DeltaRange::new(0, 9),
            "bootstrap and frame 1 points must land in one append"
        );
        assert_eq!(advancer.phase(), Phase::Done);
    }

    #[test]
    fn test_lost_frame_continues_loop() {
        let mut points = PointBatch::new();
        points.push([1.0, 2.0, 3.0], [1.0, 0.0, 0.0]);
        let mut tracker = ScriptedTracker::new(
            PointBatch::new(),
            vec![
                ScriptedFrame::lost(LostReason::NoPose),
                ScriptedFrame::tracked(points),
            ],
        );
        let mut arena = Arena::new();
        let blob = arena.alloc(0);
        let mut store = PointStore::new(&mut arena, 100);
        tracker
            .init(&[], &Default::default(), "fr1".parse().expect("tag"))
            .expect("init");

        let mut advancer = FrameAdvancer::indexed(3);

        let StepOutcome::Stepped(first) =
            advancer.step(&mut arena, blob, &mut tracker, &mut store)
        else {
            panic!("expected a step");
        };
        assert!(first.delta.is_empty(), "lost frame emits nothing");
        assert_eq!(advancer.phase(), Phase::Tracking, "loss must not stop the loop");
        assert_eq!(advancer.frames_lost(), 1);

        let StepOutcome::Stepped(second) =
            advancer.step(&mut arena, blob, &mut tracker, &mut store)
        else {
            panic!("expected a step");
        };
        assert_eq!(second.delta, DeltaRange::new(0, 1));
        assert_eq!(advancer.phase(), Phase::Done);
    }

    #[test]
    fn test_empty_dataset_finishes_in_one_step() {
        let mut tracker = ScriptedTracker::empty();
        let mut arena = Arena::new();
        let blob = arena.alloc(0);
        let mut store = PointStore::new(&mut arena, 10);
        tracker
            .init(&[], &Default::default(), "fr1".parse().expect("tag"))
            .expect("init");

        let mut advancer = FrameAdvancer::indexed(0);
        let outcome = advancer.step(&mut arena, blob, &mut tracker, &mut store);
        let StepOutcome::Stepped(report) = outcome else {
            panic!("expected a step, got {outcome:?}");
        };
        assert!(report.descriptor.is_none(), "no frame to track");
        assert!(report.delta.is_empty());
        assert_eq!(advancer.phase(), Phase::Done);
        assert_eq!(
            advancer.step(&mut arena, blob, &mut tracker, &mut store),
            StepOutcome::Finished
        );
    }

    #[test]
    fn test_bootstrap_only_dataset() {
        let mut bootstrap = PointBatch::new();
        bootstrap.push([0.0, 0.0, 1.0], [0.0, 1.0, 0.0]);
        let mut tracker = ScriptedTracker::new(bootstrap, Vec::new());
        let mut arena = Arena::new();
        let blob = arena.alloc(0);
        let mut store = PointStore::new(&mut arena, 10);
        tracker
            .init(&[], &Default::default(), "fr1".parse().expect("tag"))
            .expect("init");

        let mut advancer = FrameAdvancer::indexed(1);
        let StepOutcome::Stepped(report) =
            advancer.step(&mut arena, blob, &mut tracker, &mut store)
        else {
            panic!("expected a step");
        };
        assert!(report.descriptor.is_none());
        assert_eq!(report.delta, DeltaRange::new(0, 1), "bootstrap still flushes");
        assert_eq!(advancer.phase(), Phase::Done);
    }

    #[test]
    fn test_overflow_is_reported_per_step() {
        let mut tracker = ScriptedTracker::uniform(3, 6, 33);
        let mut arena = Arena::new();
        let blob = arena.alloc(0);
        let mut store = PointStore::new(&mut arena, 10);
        tracker
            .init(&[], &Default::default(), "fr1".parse().expect("tag"))
            .expect("init");

        let mut advancer = FrameAdvancer::indexed(3);

        let StepOutcome::Stepped(first) =
            advancer.step(&mut arena, blob, &mut tracker, &mut store)
        else {
            panic!("expected a step");
        };
        // Bootstrap plus frame 1: 12 points into a 10-point store.
        assert_eq!(first.delta, DeltaRange::new(0, 10));
        assert_eq!(first.dropped, 2);

        let StepOutcome::Stepped(second) =
            advancer.step(&mut arena, blob, &mut tracker, &mut store)
        else {
            panic!("expected a step");
        };
        assert!(second.delta.is_empty());
        assert_eq!(second.dropped, 6, "a full store drops whole batches");
        assert_eq!(store.valid_count(), 10);
    }

    #[test]
    fn test_idle_advancer_does_nothing() {
        let mut tracker = ScriptedTracker::uniform(2, 1, 1);
        let mut arena = Arena::new();
        let blob = arena.alloc(0);
        let mut store = PointStore::new(&mut arena, 10);

        let mut advancer = FrameAdvancer::idle();
        assert_eq!(
            advancer.step(&mut arena, blob, &mut tracker, &mut store),
            StepOutcome::Idle
        );
        assert_eq!(store.valid_count(), 0);
    }

    #[test]
    fn test_done_is_terminal() {
        let mut tracker = ScriptedTracker::uniform(2, 2, 8);
        let mut arena = Arena::new();
        let blob = arena.alloc(0);
        let mut store = PointStore::new(&mut arena, 100);
        tracker
            .init(&[], &Default::default(), "fr1".parse().expect("tag"))
            .expect("init");

        let mut advancer = FrameAdvancer::indexed(2);
        advancer.step(&mut arena, blob, &mut tracker, &mut store);
        assert_eq!(advancer.phase(), Phase::Done);

        let valid = store.valid_count();
        for _ in 0..3 {
            assert_eq!(
                advancer.step(&mut arena, blob, &mut tracker, &mut store),
                StepOutcome::Finished
            );
        }
        assert_eq!(store.valid_count(), valid, "no-op steps must not append");
    }
}
