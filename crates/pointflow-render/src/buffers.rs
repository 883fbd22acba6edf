//! GPU-resident point buffers fed by the engine's sync protocol.

use std::sync::Arc;

use pointflow_core::CHANNEL_STRIDE;
use pointflow_engine::{Channel, RenderBuffers};

/// Bytes per point in each channel (three `f32`s).
pub const POINT_STRIDE: u64 = (CHANNEL_STRIDE * std::mem::size_of::<f32>()) as u64;

/// Two fixed-capacity vertex buffers (positions and colors) plus the draw
/// range. Uploads go through `queue.write_buffer`; partial writes land at
/// the exact byte offset of the first touched point, so steady-state frames
/// move only the points that appeared since the previous one.
pub struct PointBuffers {
    positions: wgpu::Buffer,
    colors: wgpu::Buffer,
    queue: Arc<wgpu::Queue>,
    capacity: u32,
    visible: u32,
}

impl PointBuffers {
    pub fn new(device: &wgpu::Device, queue: Arc<wgpu::Queue>, capacity: u32) -> Self {
        let size = capacity as u64 * POINT_STRIDE;
        let positions = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Point Position Buffer"),
            size,
            usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let colors = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Point Color Buffer"),
            size,
            usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        tracing::debug!(capacity, bytes_per_channel = size, "point buffers created");

        Self {
            positions,
            colors,
            queue,
            capacity,
            visible: 0,
        }
    }

    pub fn capacity(&self) -> u32 {
        self.capacity
    }

    /// Points currently drawn.
    pub fn visible(&self) -> u32 {
        self.visible
    }

    /// Record the vertex buffers and draw every visible point.
    pub fn draw<'pass>(&'pass self, rpass: &mut wgpu::RenderPass<'pass>) {
        if self.visible == 0 {
            return;
        }
        rpass.set_vertex_buffer(0, self.positions.slice(..));
        rpass.set_vertex_buffer(1, self.colors.slice(..));
        rpass.draw(0..self.visible, 0..1);
    }

    fn buffer(&self, channel: Channel) -> &wgpu::Buffer {
        match channel {
            Channel::Position => &self.positions,
            Channel::Color => &self.colors,
        }
    }
}

impl RenderBuffers for PointBuffers {
    fn rebind(&mut self, positions: &[f32], colors: &[f32]) {
        let limit = self.capacity as usize * CHANNEL_STRIDE;
        let positions = &positions[..positions.len().min(limit)];
        let colors = &colors[..colors.len().min(limit)];
        self.queue
            .write_buffer(&self.positions, 0, bytemuck::cast_slice(positions));
        self.queue
            .write_buffer(&self.colors, 0, bytemuck::cast_slice(colors));
    }

    fn write_range(&mut self, channel: Channel, start_point: u32, data: &[f32]) {
        let limit = self.capacity as usize * CHANNEL_STRIDE;
        let start = start_point as usize * CHANNEL_STRIDE;
        if start >= limit {
            return;
        }
        let data = &data[..data.len().min(limit - start)];
        self.queue.write_buffer(
            self.buffer(channel),
            start_point as u64 * POINT_STRIDE,
            bytemuck::cast_slice(data),
        );
    }

    fn set_visible_count(&mut self, count: u32) {
        self.visible = count.min(self.capacity);
    }
}
