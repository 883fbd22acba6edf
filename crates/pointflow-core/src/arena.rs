//! Growable byte arena that backs the archive blob and the point store.

/// A range of bytes inside an [`Arena`].
///
/// Spans stay valid across arena growth: they are plain offsets, resolved
/// against the arena on every access. Raw pointers derived from a span are
/// only good until the next allocation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Span {
    offset: usize,
    len: usize,
}

impl Span {
    /// Byte offset from the start of the arena.
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Length in bytes.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

/// Snapshot of the arena's identity at one point in time.
///
/// The generation increments whenever the backing allocation grows, so two
/// equal stamps guarantee that no address handed out between them has been
/// invalidated. The base address is carried for diagnostics.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ArenaStamp {
    pub generation: u64,
    pub base: usize,
}

/// Contiguous, growable memory region.
///
/// Allocations are bump-style and never freed individually; the arena is
/// dropped wholesale when a session resets. Backing storage is a `Vec<u64>`
/// and every span is 8-byte aligned, so `f32` views over a span are always
/// validly aligned.
#[derive(Debug, Default)]
pub struct Arena {
    words: Vec<u64>,
    len: usize,
    generation: u64,
}

impl Arena {
    pub fn new() -> Self {
        Self::default()
    }

    /// Total bytes allocated so far.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Reserve `len` bytes and return their span. The new bytes are zeroed.
    ///
    /// Growing the backing storage may relocate everything already in the
    /// arena; when that can happen the generation is bumped and any cached
    /// address or slice must be re-derived.
    pub fn alloc(&mut self, len: usize) -> Span {
        let offset = self.len;
        let padded = (len + 7) & !7;
        let new_len = offset + padded;
        let new_words = new_len / 8;
        if new_words > self.words.capacity() {
            self.generation += 1;
        }
        self.words.resize(new_words, 0);
        self.len = new_len;
        Span { offset, len }
    }

    /// Current identity stamp. Compare against a stored stamp to decide
    /// whether previously derived addresses are still valid.
    pub fn stamp(&self) -> ArenaStamp {
        ArenaStamp {
            generation: self.generation,
            base: self.words.as_ptr() as usize,
        }
    }

    /// Base address of a span in the current allocation.
    pub fn address(&self, span: Span) -> usize {
        self.bytes(span).as_ptr() as usize
    }

    pub fn bytes(&self, span: Span) -> &[u8] {
        let all: &[u8] = bytemuck::cast_slice(&self.words);
        &all[span.offset..span.offset + span.len]
    }

    pub fn bytes_mut(&mut self, span: Span) -> &mut [u8] {
        let all: &mut [u8] = bytemuck::cast_slice_mut(&mut self.words);
        &mut all[span.offset..span.offset + span.len]
    }

    /// Typed `f32` view over a span. The span length must be a multiple of
    /// four bytes; alignment is guaranteed by construction.
    pub fn floats(&self, span: Span) -> &[f32] {
        bytemuck::cast_slice(self.bytes(span))
    }

    pub fn floats_mut(&mut self, span: Span) -> &mut [f32] {
        bytemuck::cast_slice_mut(self.bytes_mut(span))
    }
}
