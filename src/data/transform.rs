// ============================================================
// Layer 4: Image Transform
// ============================================================
// Turns a decoded image into the model's input layout:
//
//   1. Resize to size × size (bilinear)
//   2. Scale u8 pixels to [0, 1]
//   3. Normalise each channel: (x - mean[c]) / std[c]
//   4. Lay out channel-first (CHW), the order Conv2d expects
//
// The mean/std defaults are the ImageNet statistics.

use anyhow::{Context, Result};
use image::{imageops::FilterType, DynamicImage};
use std::path::Path;

pub const IMAGENET_MEAN: [f32; 3] = [0.485, 0.456, 0.406];
pub const IMAGENET_STD:  [f32; 3] = [0.229, 0.224, 0.225];

#[derive(Debug, Clone)]
pub struct ImageTransform {
    pub size: usize,
    pub mean: [f32; 3],
    pub std:  [f32; 3],
}

impl ImageTransform {
    /// Resize to `size × size` and normalise with ImageNet statistics
    pub fn new(size: usize) -> Self {
        Self { size, mean: IMAGENET_MEAN, std: IMAGENET_STD }
    }

    /// Number of floats produced per image (3 × size × size)
    pub fn output_len(&self) -> usize {
        3 * self.size * self.size
    }

    /// Decode an image file and transform it
    pub fn load(&self, path: &Path) -> Result<Vec<f32>> {
        let img = image::open(path)
            .with_context(|| format!("Cannot decode image '{}'", path.display()))?;
        Ok(self.apply(&img))
    }

    /// Transform an already decoded image into a CHW float buffer
    pub fn apply(&self, img: &DynamicImage) -> Vec<f32> {
        let side = self.size as u32;
        let rgb  = img.resize_exact(side, side, FilterType::Triangle).to_rgb8();

        let plane = self.size * self.size;
        let mut out = vec![0.0f32; self.output_len()];

        for (i, pixel) in rgb.pixels().enumerate() {
            for c in 0..3 {
                let x = pixel.0[c] as f32 / 255.0;
                out[c * plane + i] = (x - self.mean[c]) / self.std[c];
            }
        }
        out
    }
}
