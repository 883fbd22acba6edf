//! TUM RGB-D association lists.
//!
//! One line per frame, four whitespace-separated fields:
//! `depth_timestamp depth_path color_timestamp color_path`.
//! Comment lines start with `#`.

use crate::error::{ArchiveError, ArchiveResult};

/// A depth/color image pair captured at (nearly) the same instant.
#[derive(Clone, Debug, PartialEq)]
pub struct Association {
    pub depth_timestamp: f64,
    pub depth_path: String,
    pub color_timestamp: f64,
    pub color_path: String,
}

/// Parse an `associations.txt` buffer.
pub fn parse_associations(bytes: &[u8]) -> ArchiveResult<Vec<Association>> {
    let text = std::str::from_utf8(bytes)
        .map_err(|e| ArchiveError::parse(0, format!("associations are not UTF-8: {e}")))?;

    let mut associations = Vec::new();
    for (idx, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let fields: Vec<&str> = line.split_whitespace().collect();
        if fields.len() != 4 {
            return Err(ArchiveError::parse(
                idx + 1,
                format!("expected 4 fields, got {}", fields.len()),
            ));
        }
        let timestamp = |s: &str| {
            s.parse::<f64>()
                .map_err(|_| ArchiveError::parse(idx + 1, format!("bad timestamp {s:?}")))
        };
        associations.push(Association {
            depth_timestamp: timestamp(fields[0])?,
            depth_path: fields[1].to_string(),
            color_timestamp: timestamp(fields[2])?,
            color_path: fields[3].to_string(),
        });
    }
    Ok(associations)
}
