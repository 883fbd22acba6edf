//! Core storage and camera math for the pointflow pipeline.
//!
//! Everything that must stay allocation-stable across the tracking loop
//! lives here: the growable [`arena::Arena`], the append-only
//! [`store::PointStore`] carved out of it, and the pose/intrinsics types
//! shared by dataset parsing, tracking and rendering.

pub mod arena;
pub mod camera;
pub mod pose;
pub mod store;


pub use arena::{Arena, ArenaStamp, Span};
pub use camera::{CameraProfile, Intrinsics, UnknownProfile, DEPTH_SCALE};
pub use pose::{Pose, TimedPose};
pub use store::{AppendOutcome, DeltaRange, PointBatch, PointStore, CHANNEL_STRIDE};
