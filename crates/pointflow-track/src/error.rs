use pointflow_archive::ArchiveError;
use thiserror::Error;

pub type TrackResult<T> = Result<T, TrackError>;

#[derive(Error, Debug)]
pub enum TrackError {
    #[error("archive error: {0}")]
    Archive(#[from] ArchiveError),
}
