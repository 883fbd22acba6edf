//! Zero-copy index over an in-memory tar archive.

use std::collections::HashMap;

use crate::error::{ArchiveError, ArchiveResult};

/// Location of one file inside the archive blob.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FileEntry {
    pub offset: u64,
    pub len: u64,
}

/// Map from entry path to byte location, built in a single pass over the
/// tar headers. File contents are never copied; readers borrow directly
/// from the blob the archive was indexed from.
#[derive(Clone, Debug, Default)]
pub struct EntryMap {
    entries: HashMap<String, FileEntry>,
}

impl EntryMap {
    /// Walk the tar headers in `blob` and record every regular file.
    pub fn build(blob: &[u8]) -> ArchiveResult<Self> {
        let mut archive = tar::Archive::new(blob);
        let mut entries = HashMap::new();
        for entry in archive.entries()? {
            let entry = entry?;
            if !entry.header().entry_type().is_file() {
                continue;
            }
            let name = entry.path()?.to_string_lossy().into_owned();
            entries.insert(
                name,
                FileEntry {
                    offset: entry.raw_file_position(),
                    len: entry.header().size()?,
                },
            );
        }
        tracing::debug!(entries = entries.len(), "indexed archive");
        Ok(Self { entries })
    }

    pub fn get(&self, name: &str) -> Option<FileEntry> {
        self.entries.get(name).copied()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// Borrow the contents of `name` out of `blob`.
    ///
    /// `blob` must be the same bytes the map was built from; entries whose
    /// recorded range falls outside it are reported as truncated.
    pub fn slice<'a>(&self, blob: &'a [u8], name: &str) -> ArchiveResult<&'a [u8]> {
        let entry = self
            .get(name)
            .ok_or_else(|| ArchiveError::MissingEntry(name.to_string()))?;
        let start = entry.offset as usize;
        let end = start + entry.len as usize;
        if end > blob.len() {
            return Err(ArchiveError::Truncated {
                name: name.to_string(),
                offset: entry.offset,
                len: entry.len,
                total: blob.len(),
            });
        }
        Ok(&blob[start..end])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_tar() -> Vec<u8> {
        let mut builder = tar::Builder::new(Vec::new());
        for (name, data) in [
            ("associations.txt", b"a b c d\n".as_slice()),
            ("depth/0.png", b"not really a png"),
        ] {
            let mut header = tar::Header::new_gnu();
            header.set_size(data.len() as u64);
            header.set_mode(0o644);
            header.set_cksum();
            builder
                .append_data(&mut header, name, data)
                .expect("append tar entry");
        }
        builder.into_inner().expect("finish tar")
    }

    #[test]
    fn test_index_finds_entries() {
        let blob = sample_tar();
        let index = EntryMap::build(&blob).expect("index");
        assert_eq!(index.len(), 2);
        assert!(index.contains("associations.txt"));
        assert_eq!(
            index.slice(&blob, "associations.txt").expect("slice"),
            b"a b c d\n"
        );
        assert_eq!(
            index.slice(&blob, "depth/0.png").expect("slice"),
            b"not really a png"
        );
    }

    #[test]
    fn test_missing_entry_is_reported() {
        let blob = sample_tar();
        let index = EntryMap::build(&blob).expect("index");
        let err = index.slice(&blob, "rgb/0.png").unwrap_err();
        assert!(matches!(err, ArchiveError::MissingEntry(name) if name == "rgb/0.png"));
    }

    #[test]
    fn test_truncated_blob_is_reported() {
        let blob = sample_tar();
        let index = EntryMap::build(&blob).expect("index");
        let err = index.slice(&blob[..600], "depth/0.png").unwrap_err();
        assert!(matches!(err, ArchiveError::Truncated { .. }));
    }

    #[test]
    fn test_garbage_blob_is_malformed() {
        let blob = vec![0xAB; 4096];
        assert!(EntryMap::build(&blob).is_err());
    }
}
