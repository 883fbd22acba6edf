//! Moving an archive blob into the arena and indexing it in place.
//!
//! Ingestion is a three-step handshake: reserve space sized to the blob,
//! copy the bytes in, then index the tar headers without copying any file
//! contents back out. After `index` succeeds every entry is served as a
//! slice of the arena.

use pointflow_archive::EntryMap;
use pointflow_core::{Arena, Span};

use crate::error::{EngineError, EngineResult};

/// Reserve `length` bytes in the arena for an incoming blob.
///
/// This is the only step that can grow the arena; callers holding derived
/// addresses must re-derive them afterwards.
pub fn allocate(arena: &mut Arena, length: usize) -> Span {
    let span = arena.alloc(length);
    tracing::debug!(bytes = length, generation = arena.generation(), "blob space reserved");
    span
}

/// Copy archive bytes into a previously reserved span.
///
/// The blob must fill the reservation exactly; a mismatch aborts ingestion
/// before any bytes move.
pub fn copy(arena: &mut Arena, span: Span, bytes: &[u8]) -> EngineResult<()> {
    if bytes.len() != span.len() {
        return Err(EngineError::LengthMismatch {
            reserved: span.len(),
            actual: bytes.len(),
        });
    }
    arena.bytes_mut(span).copy_from_slice(bytes);
    Ok(())
}

/// Index the tar blob held in `span`.
pub fn index(arena: &Arena, span: Span) -> EngineResult<EntryMap> {
    Ok(EntryMap::build(arena.bytes(span))?)
}
