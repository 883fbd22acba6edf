//! The pointflow engine: archive ingestion, the frame loop and the
//! renderer reconciliation protocol.
//!
//! A [`session::Session`] ties the pieces together. Ingestion moves the
//! archive into the arena and indexes it in place ([`transfer`]), the
//! [`advancer::FrameAdvancer`] consumes one frame per external tick, and
//! [`sync::BufferSync`] forwards newly valid points to whatever implements
//! [`sync::RenderBuffers`], re-uploading from scratch only when arena
//! growth invalidated the renderer's view.

pub mod advancer;
pub mod error;
pub mod session;
pub mod sync;
pub mod transfer;

pub use advancer::{FrameAdvancer, Phase, StepOutcome, StepReport};
pub use error::{EngineError, EngineResult};
pub use session::{Session, SessionStats, DEFAULT_CAPACITY};
pub use sync::{BufferSync, Channel, MirrorBuffers, RenderBuffers};
