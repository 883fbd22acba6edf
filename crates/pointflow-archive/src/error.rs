use thiserror::Error;

pub type ArchiveResult<T> = Result<T, ArchiveError>;

#[derive(Error, Debug)]
pub enum ArchiveError {
    #[error("malformed archive: {0}")]
    Malformed(#[from] std::io::Error),

    #[error("archive entry not found: {0}")]
    MissingEntry(String),

    #[error("archive entry {name} is truncated ({offset}+{len} exceeds {total} bytes)")]
    Truncated {
        name: String,
        offset: u64,
        len: u64,
        total: usize,
    },

    #[error("image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("parse error at line {line}: {message}")]
    Parse { line: usize, message: String },
}

impl ArchiveError {
    pub(crate) fn parse(line: usize, message: impl Into<String>) -> Self {
        ArchiveError::Parse {
            line,
            message: message.into(),
        }
    }
}
