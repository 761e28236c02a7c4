//! RGBA8 images for box textures and traced frames
//!
//! Every decode path ends in tightly packed RGBA8 so the device and the CPU
//! tracer never deal with other pixel formats.

use std::path::Path;

use image::{DynamicImage, RgbaImage};

use crate::assets::AssetError;

/// Row-major RGBA8 pixels
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageData {
    /// Four bytes per pixel, top row first
    pub data: Vec<u8>,
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
}

impl ImageData {
    /// Decode a texture file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, AssetError> {
        let path = path.as_ref();
        log::debug!("Decoding texture {}", path.display());
        let decoded = image::open(path)
            .map_err(|e| AssetError::LoadFailed(format!("texture {}: {e}", path.display())))?;
        Ok(Self::from_decoded(decoded))
    }

    /// Decode an encoded image held in memory
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, AssetError> {
        let decoded =
            image::load_from_memory(bytes).map_err(|e| AssetError::LoadFailed(format!("texture bytes: {e}")))?;
        Ok(Self::from_decoded(decoded))
    }

    fn from_decoded(decoded: DynamicImage) -> Self {
        let rgba = decoded.into_rgba8();
        let (width, height) = rgba.dimensions();
        log::trace!("Texture is {}x{}", width, height);
        Self { data: rgba.into_raw(), width, height }
    }

    /// Single-colour image
    pub fn solid_color(width: u32, height: u32, color: [u8; 4]) -> Self {
        Self { data: color.repeat(width as usize * height as usize), width, height }
    }

    /// Pixel at column `x`, row `y`; `None` outside the image
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        let offset = self.offset(x, y)?;
        let mut out = [0; 4];
        out.copy_from_slice(&self.data[offset..offset + 4]);
        Some(out)
    }

    /// Overwrite one pixel; returns `false` outside the image
    pub fn put_pixel(&mut self, x: u32, y: u32, color: [u8; 4]) -> bool {
        match self.offset(x, y) {
            Some(offset) => {
                self.data[offset..offset + 4].copy_from_slice(&color);
                true
            }
            None => false,
        }
    }

    fn offset(&self, x: u32, y: u32) -> Option<usize> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let offset = (y as usize * self.width as usize + x as usize) * 4;
        (offset + 4 <= self.data.len()).then_some(offset)
    }

    /// Write the image as PNG, e.g. a frame from the CPU tracer
    pub fn save_png<P: AsRef<Path>>(&self, path: P) -> Result<(), AssetError> {
        let path = path.as_ref();
        let buffer = RgbaImage::from_raw(self.width, self.height, self.data.clone()).ok_or_else(|| {
            AssetError::InvalidData(format!("{} bytes for a {}x{} image", self.data.len(), self.width, self.height))
        })?;
        buffer
            .save_with_format(path, image::ImageFormat::Png)
            .map_err(|e| AssetError::LoadFailed(format!("writing {}: {e}", path.display())))?;
        log::info!("Wrote {}x{} image to {}", self.width, self.height, path.display());
        Ok(())
    }
}
