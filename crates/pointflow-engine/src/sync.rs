//! Reconciling the point store with renderer-owned buffers.

use pointflow_core::{Arena, ArenaStamp, DeltaRange, PointStore, CHANNEL_STRIDE};

/// The two per-point attribute channels a renderer mirrors.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Channel {
    Position,
    Color,
}

/// Renderer-side storage fed by [`BufferSync`].
///
/// Implementations own one buffer per channel plus a visible count; they
/// never reach into the store on their own.
pub trait RenderBuffers {
    /// Replace both buffers with the full valid prefix.
    fn rebind(&mut self, positions: &[f32], colors: &[f32]);

    /// Overwrite points `[start_point, start_point + data.len() / 3)` of
    /// one channel.
    fn write_range(&mut self, channel: Channel, start_point: u32, data: &[f32]);

    /// Raise the number of points drawn. Always called after the data it
    /// exposes has been uploaded.
    fn set_visible_count(&mut self, count: u32);
}

/// Keeps renderer buffers consistent with the point store, uploading only
/// the range that grew whenever that is safe.
///
/// The sync remembers the arena stamp of its previous reconcile. An
/// unchanged stamp proves that nothing the renderer already holds was
/// relocated, so the delta range alone is written. A changed stamp means
/// every previously derived address is stale and the whole valid prefix is
/// uploaded again.
#[derive(Debug, Default)]
pub struct BufferSync {
    stamp: Option<ArenaStamp>,
    rebinds: u32,
    range_writes: u32,
}

impl BufferSync {
    pub fn new() -> Self {
        Self::default()
    }

    /// Full uploads issued so far.
    pub fn rebinds(&self) -> u32 {
        self.rebinds
    }

    /// Partial uploads issued so far.
    pub fn range_writes(&self) -> u32 {
        self.range_writes
    }

    /// Bring `gpu` up to date after an append that reported `delta`.
    ///
    /// An empty delta is a complete no-op: no upload, no visible-count
    /// change, no stamp bookkeeping.
    pub fn reconcile(
        &mut self,
        arena: &Arena,
        store: &PointStore,
        delta: DeltaRange,
        gpu: &mut dyn RenderBuffers,
    ) {
        if delta.is_empty() {
            return;
        }

        let stamp = arena.stamp();
        if self.stamp != Some(stamp) {
            gpu.rebind(store.positions(arena), store.colors(arena));
            self.stamp = Some(stamp);
            self.rebinds += 1;
            tracing::debug!(
                generation = stamp.generation,
                points = store.valid_count(),
                "arena moved, full rebind"
            );
        } else {
            let start = delta.start as usize * CHANNEL_STRIDE;
            let end = delta.end as usize * CHANNEL_STRIDE;
            gpu.write_range(
                Channel::Position,
                delta.start,
                &store.positions(arena)[start..end],
            );
            gpu.write_range(
                Channel::Color,
                delta.start,
                &store.colors(arena)[start..end],
            );
            self.range_writes += 1;
        }
        gpu.set_visible_count(delta.end);
    }

    /// Forget the remembered stamp; the next non-empty reconcile performs
    /// a full upload.
    pub fn invalidate(&mut self) {
        self.stamp = None;
    }
}

/// CPU-side [`RenderBuffers`]: a plain mirror of what a GPU renderer
/// would hold. Backs the headless replay tool and the loop tests.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MirrorBuffers {
    positions: Vec<f32>,
    colors: Vec<f32>,
    visible: u32,
}

impl MirrorBuffers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Position floats for every point uploaded so far.
    pub fn positions(&self) -> &[f32] {
        &self.positions
    }

    pub fn colors(&self) -> &[f32] {
        &self.colors
    }

    pub fn visible(&self) -> u32 {
        self.visible
    }
}

impl RenderBuffers for MirrorBuffers {
    fn rebind(&mut self, positions: &[f32], colors: &[f32]) {
        self.positions = positions.to_vec();
        self.colors = colors.to_vec();
    }

    fn write_range(&mut self, channel: Channel, start_point: u32, data: &[f32]) {
        let start = start_point as usize * CHANNEL_STRIDE;
        let buffer = match channel {
            Channel::Position => &mut self.positions,
            Channel::Color => &mut self.colors,
        };
        if buffer.len() < start + data.len() {
            buffer.resize(start + data.len(), 0.0);
        }
        buffer[start..start + data.len()].copy_from_slice(data);
    }

    fn set_visible_count(&mut self, count: u32) {
        self.visible = count;
    }
}
