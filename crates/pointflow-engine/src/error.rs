use pointflow_archive::ArchiveError;
use pointflow_track::TrackError;
use thiserror::Error;

pub type EngineResult<T> = Result<T, EngineError>;

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("blob length mismatch: reserved {reserved} bytes, copying {actual}")]
    LengthMismatch { reserved: usize, actual: usize },

    #[error("archive error: {0}")]
    Archive(#[from] ArchiveError),

    #[error("tracker error: {0}")]
    Track(#[from] TrackError),
}
