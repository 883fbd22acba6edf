//! GPU-side point cloud rendering.
//!
//! [`PointBuffers`] owns the vertex buffers the reconcile pass writes into
//! and [`PointPipeline`] draws them as a point list.

pub mod buffers;
pub mod pipeline;

pub use buffers::{PointBuffers, POINT_STRIDE};
pub use pipeline::{create_depth_texture, CameraUniform, PointPipeline};
