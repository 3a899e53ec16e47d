use std::io::{Seek, Write};
use std::path::Path;

use image::{ImageBuffer, Rgb as ImageRgb, RgbImage};

use super::params::Rgb;

/// Fixed-size RGB raster addressed in logical pixels.
///
/// Each logical pixel covers a `rescale × rescale` block of device pixels.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    logical_width: u32,
    logical_height: u32,
    rescale: u32,
    pixels: Vec<u8>,
}

impl Frame {
    pub fn new(logical_width: u32, logical_height: u32, rescale: u32, fill: Rgb) -> Self {
        let width = logical_width * rescale;
        let height = logical_height * rescale;
        let pixels = fill
            .to_array()
            .iter()
            .copied()
            .cycle()
            .take(width as usize * height as usize * 3)
            .collect();
        Self {
            logical_width,
            logical_height,
            rescale,
            pixels,
        }
    }

    pub fn logical_width(&self) -> u32 {
        self.logical_width
    }

    pub fn logical_height(&self) -> u32 {
        self.logical_height
    }

    /// Width in device pixels.
    pub fn width(&self) -> u32 {
        self.logical_width * self.rescale
    }

    /// Height in device pixels.
    pub fn height(&self) -> u32 {
        self.logical_height * self.rescale
    }

    /// Paint one logical pixel. Coordinates outside the frame are ignored.
    pub fn put(&mut self, x: u32, y: u32, color: Rgb) {
        if x >= self.logical_width || y >= self.logical_height {
            return;
        }
        let width = self.width() as usize;
        let rgb = color.to_array();
        for dy in 0..self.rescale {
            let row = (y * self.rescale + dy) as usize;
            let start = (row * width + (x * self.rescale) as usize) * 3;
            let end = start + self.rescale as usize * 3;
            for chunk in self.pixels[start..end].chunks_exact_mut(3) {
                chunk.copy_from_slice(&rgb);
            }
        }
    }

    /// Color of a logical pixel.
    pub fn get(&self, x: u32, y: u32) -> Option<Rgb> {
        if x >= self.logical_width || y >= self.logical_height {
            return None;
        }
        let offset = ((y * self.rescale) as usize * self.width() as usize
            + (x * self.rescale) as usize)
            * 3;
        let p = &self.pixels[offset..offset + 3];
        Some(Rgb(p[0], p[1], p[2]))
    }

    pub fn to_image(&self) -> RgbImage {
        ImageBuffer::from_fn(self.width(), self.height(), |x, y| {
            let offset = (y as usize * self.width() as usize + x as usize) * 3;
            ImageRgb([
                self.pixels[offset],
                self.pixels[offset + 1],
                self.pixels[offset + 2],
            ])
        })
    }

    /// Encode the frame as a PNG into `writer`.
    pub fn write_png<W: Write + Seek>(&self, writer: &mut W) -> Result<(), image::ImageError> {
        self.to_image().write_to(writer, image::ImageFormat::Png)
    }

    /// Write the frame as a PNG.
    pub fn save_png(&self, path: &Path) -> Result<(), image::ImageError> {
        image::save_buffer_with_format(
            path,
            &self.pixels,
            self.width(),
            self.height(),
            image::ExtendedColorType::Rgb8,
            image::ImageFormat::Png,
        )
    }
}
