//! Append-only dual-channel point storage.

use crate::arena::{Arena, Span};

/// Half-open range of point indices, `[start, end)`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DeltaRange {
    pub start: u32,
    pub end: u32,
}

impl DeltaRange {
    pub fn new(start: u32, end: u32) -> Self {
        Self { start, end }
    }

    pub fn len(&self) -> u32 {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }
}

/// Result of one append: the range of newly valid points plus how many
/// points did not fit and were discarded.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AppendOutcome {
    pub range: DeltaRange,
    pub dropped: u32,
}

/// A batch of points produced by a tracker, pending insertion into a store.
#[derive(Clone, Debug, Default)]
pub struct PointBatch {
    positions: Vec<[f32; 3]>,
    colors: Vec<[f32; 3]>,
}

impl PointBatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, position: [f32; 3], color: [f32; 3]) {
        self.positions.push(position);
        self.colors.push(color);
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    pub fn positions(&self) -> &[[f32; 3]] {
        &self.positions
    }

    pub fn colors(&self) -> &[[f32; 3]] {
        &self.colors
    }

    pub fn extend(&mut self, other: &PointBatch) {
        self.positions.extend_from_slice(&other.positions);
        self.colors.extend_from_slice(&other.colors);
    }

    pub fn clear(&mut self) {
        self.positions.clear();
        self.colors.clear();
    }
}

/// Fixed-capacity point cloud living inside an [`Arena`].
///
/// Two parallel channels, interleaved per channel as `x y z` / `r g b`
/// triples of `f32`. Points are only ever appended; `valid_count` is the
/// monotone high-water mark of initialized points. Data below `valid_count`
/// is never rewritten, so a renderer only has to fetch the tail that grew
/// since its last sync.
#[derive(Debug)]
pub struct PointStore {
    positions: Span,
    colors: Span,
    capacity: u32,
    valid: u32,
}

/// Floats per point in each channel.
pub const CHANNEL_STRIDE: usize = 3;

impl PointStore {
    /// Reserve storage for `capacity` points inside `arena`.
    pub fn new(arena: &mut Arena, capacity: u32) -> Self {
        let bytes = capacity as usize * CHANNEL_STRIDE * std::mem::size_of::<f32>();
        let positions = arena.alloc(bytes);
        let colors = arena.alloc(bytes);
        Self {
            positions,
            colors,
            capacity,
            valid: 0,
        }
    }

    pub fn capacity(&self) -> u32 {
        self.capacity
    }

    /// Number of initialized points. Monotonically non-decreasing for the
    /// lifetime of the store.
    pub fn valid_count(&self) -> u32 {
        self.valid
    }

    pub fn is_full(&self) -> bool {
        self.valid == self.capacity
    }

    /// Append as many points from `batch` as still fit.
    ///
    /// Writes land exclusively in `[valid, valid + taken)`; earlier points
    /// are untouched. Points beyond capacity are discarded and reported in
    /// the outcome rather than silently lost. Appending never grows the
    /// arena, so it can never invalidate addresses.
    pub fn append(&mut self, arena: &mut Arena, batch: &PointBatch) -> AppendOutcome {
        let space = (self.capacity - self.valid) as usize;
        let taken = batch.len().min(space);
        let dropped = (batch.len() - taken) as u32;

        let start = self.valid as usize * CHANNEL_STRIDE;
        let end = (self.valid as usize + taken) * CHANNEL_STRIDE;

        let dst = &mut arena.floats_mut(self.positions)[start..end];
        dst.copy_from_slice(bytemuck::cast_slice(&batch.positions()[..taken]));
        let dst = &mut arena.floats_mut(self.colors)[start..end];
        dst.copy_from_slice(bytemuck::cast_slice(&batch.colors()[..taken]));

        let range = DeltaRange::new(self.valid, self.valid + taken as u32);
        self.valid = range.end;
        AppendOutcome { range, dropped }
    }

    /// Valid prefix of the position channel, `valid_count * 3` floats.
    pub fn positions<'a>(&self, arena: &'a Arena) -> &'a [f32] {
        &arena.floats(self.positions)[..self.valid as usize * CHANNEL_STRIDE]
    }

    /// Valid prefix of the color channel.
    pub fn colors<'a>(&self, arena: &'a Arena) -> &'a [f32] {
        &arena.floats(self.colors)[..self.valid as usize * CHANNEL_STRIDE]
    }

    /// Current base address of the position channel. Stale after any arena
    /// growth; re-derive instead of caching.
    pub fn positions_address(&self, arena: &Arena) -> usize {
        arena.address(self.positions)
    }

    pub fn colors_address(&self, arena: &Arena) -> usize {
        arena.address(self.colors)
    }
}
