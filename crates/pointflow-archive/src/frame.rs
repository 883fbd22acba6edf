//! Depth and color image decoding.

use image::{DynamicImage, ImageFormat};
use pointflow_core::DEPTH_SCALE;

use crate::error::ArchiveResult;

/// A decoded 16-bit depth image. Raw values are `meters * DEPTH_SCALE`;
/// zero marks a pixel with no depth reading.
#[derive(Clone, Debug)]
pub struct DepthImage {
    pub width: u32,
    pub height: u32,
    data: Vec<u16>,
}

impl DepthImage {
    /// Depth in meters at `(x, y)`, or `None` where the sensor saw nothing.
    pub fn depth_at(&self, x: u32, y: u32) -> Option<f64> {
        let raw = self.data[(y * self.width + x) as usize];
        (raw != 0).then(|| raw as f64 / DEPTH_SCALE)
    }

    pub fn raw(&self) -> &[u16] {
        &self.data
    }
}

/// A decoded 8-bit RGB image.
#[derive(Clone, Debug)]
pub struct ColorImage {
    pub width: u32,
    pub height: u32,
    data: Vec<u8>,
}

impl ColorImage {
    /// Color at `(x, y)` as normalized `[r, g, b]` in `[0, 1]`.
    pub fn rgb_at(&self, x: u32, y: u32) -> [f32; 3] {
        let idx = 3 * (y * self.width + x) as usize;
        [
            self.data[idx] as f32 / 255.0,
            self.data[idx + 1] as f32 / 255.0,
            self.data[idx + 2] as f32 / 255.0,
        ]
    }

    pub fn raw(&self) -> &[u8] {
        &self.data
    }
}

/// Decode a 16-bit grayscale PNG into a depth image.
pub fn decode_depth(bytes: &[u8]) -> ArchiveResult<DepthImage> {
    let image = image::load_from_memory_with_format(bytes, ImageFormat::Png)?.into_luma16();
    Ok(DepthImage {
        width: image.width(),
        height: image.height(),
        data: image.into_raw(),
    })
}

/// Decode a PNG into an RGB color image.
pub fn decode_color(bytes: &[u8]) -> ArchiveResult<ColorImage> {
    let image = image::load_from_memory_with_format(bytes, ImageFormat::Png)?.into_rgb8();
    Ok(ColorImage {
        width: image.width(),
        height: image.height(),
        data: image.into_raw(),
    })
}

/// Encode raw depth values as a 16-bit grayscale PNG.
pub fn encode_depth(width: u32, height: u32, depth: impl Fn(u32, u32) -> u16) -> ArchiveResult<Vec<u8>> {
    let image = image::ImageBuffer::from_fn(width, height, |x, y| image::Luma([depth(x, y)]));
    let mut bytes = std::io::Cursor::new(Vec::new());
    DynamicImage::ImageLuma16(image).write_to(&mut bytes, ImageFormat::Png)?;
    Ok(bytes.into_inner())
}

/// Encode RGB values as an 8-bit color PNG.
pub fn encode_color(width: u32, height: u32, rgb: impl Fn(u32, u32) -> [u8; 3]) -> ArchiveResult<Vec<u8>> {
    let image = image::ImageBuffer::from_fn(width, height, |x, y| image::Rgb(rgb(x, y)));
    let mut bytes = std::io::Cursor::new(Vec::new());
    DynamicImage::ImageRgb8(image).write_to(&mut bytes, ImageFormat::Png)?;
    Ok(bytes.into_inner())
}
