//! Trackers turn archived frames into camera poses and world-space points.

pub mod error;
pub mod replay;
pub mod scripted;
pub mod tracker;

pub use error::{TrackError, TrackResult};
pub use replay::{ReplayConfig, ReplayTracker};
pub use scripted::{ScriptedFrame, ScriptedTracker};
pub use tracker::{FrameDescriptor, LostReason, TrackStatus, Tracker};
