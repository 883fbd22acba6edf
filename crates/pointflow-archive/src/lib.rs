//! Reading and writing the RGB-D dataset archives consumed by pointflow.
//!
//! Archives are plain tar files holding per-frame depth and color PNGs
//! plus two metadata files: an association list pairing depth and color
//! images by timestamp, and a ground-truth camera trajectory.

pub mod associations;
pub mod error;
pub mod frame;
pub mod index;
pub mod synth;
pub mod trajectory;

pub use associations::{parse_associations, Association};
pub use error::{ArchiveError, ArchiveResult};
pub use frame::{decode_color, decode_depth, ColorImage, DepthImage};
pub use index::{EntryMap, FileEntry};
pub use synth::{generate_archive, SynthConfig};
pub use trajectory::Trajectory;

/// Well-known metadata paths inside an archive.
pub const ASSOCIATIONS_PATH: &str = "associations.txt";
pub const TRAJECTORY_PATH: &str = "groundtruth.txt";
