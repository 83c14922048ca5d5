// ============================================================
// Layer 4: Image Batcher
// ============================================================
// Implements Burn's Batcher trait: turns a Vec<ImageSample> into
// one tensor batch.
//
//   Input:  N ImageSamples (path + label)
//   Output: images [N, 3, S, S]  (normalised, channel-first)
//           labels [N]           (class indices)
//           paths  Vec<PathBuf>  (kept for reporting)
//
// The DataLoader calls batch() on its worker threads, so image
// decoding is parallelised by Burn, not by this code.
//
// A file that decoded fine during the folder scan but fails here
// is replaced by a zero image rather than aborting the epoch.

use burn::{
    data::dataloader::batcher::Batcher,
    prelude::*,
    tensor::TensorData,
};
use std::path::PathBuf;

use crate::data::transform::ImageTransform;
use crate::domain::sample::ImageSample;

#[derive(Debug, Clone)]
pub struct ImageBatch<B: Backend> {
    /// Normalised images, shape [batch_size, 3, size, size]
    pub images: Tensor<B, 4>,

    /// Class indices, shape [batch_size]
    pub labels: Tensor<B, 1, Int>,

    /// Source file of each image, in batch order
    pub paths: Vec<PathBuf>,
}

#[derive(Clone, Debug)]
pub struct ImageBatcher<B: Backend> {
    pub device:    B::Device,
    pub transform: ImageTransform,
}

impl<B: Backend> ImageBatcher<B> {
    pub fn new(device: B::Device, transform: ImageTransform) -> Self {
        Self { device, transform }
    }
}

impl<B: Backend> Batcher<ImageSample, ImageBatch<B>> for ImageBatcher<B> {
    fn batch(&self, items: Vec<ImageSample>) -> ImageBatch<B> {
        let batch_size = items.len();
        let size       = self.transform.size;
        let per_image  = self.transform.output_len();

        let mut pixels = Vec::with_capacity(batch_size * per_image);
        for item in &items {
            match self.transform.load(&item.path) {
                Ok(buf) => pixels.extend(buf),
                Err(e)  => {
                    tracing::error!("{e:#}; using a blank image");
                    pixels.extend(std::iter::repeat(0.0f32).take(per_image));
                }
            }
        }

        let labels: Vec<i64> = items.iter().map(|s| s.label as i64).collect();

        let images = Tensor::<B, 4>::from_data(
            TensorData::new(pixels, [batch_size, 3, size, size]).convert::<B::FloatElem>(),
            &self.device,
        );
        let labels = Tensor::<B, 1, Int>::from_data(
            TensorData::new(labels, [batch_size]).convert::<B::IntElem>(),
            &self.device,
        );

        ImageBatch {
            images,
            labels,
            paths: items.into_iter().map(|s| s.path).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;
    use image::{Rgb, RgbImage};

    type TestBackend = NdArray<f32>;

    #[test]
    fn test_batch_shapes_and_labels() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("a.png");
        let b = dir.path().join("b.png");
        RgbImage::from_pixel(5, 7, Rgb([10, 20, 30])).save(&a).unwrap();
        RgbImage::from_pixel(3, 3, Rgb([200, 0, 90])).save(&b).unwrap();

        let batcher = ImageBatcher::<TestBackend>::new(Default::default(), ImageTransform::new(8));
        let batch   = batcher.batch(vec![ImageSample::new(&a, 3), ImageSample::new(&b, 1)]);

        assert_eq!(batch.images.dims(), [2, 3, 8, 8]);
        assert_eq!(batch.labels.dims(), [2]);
        let labels: Vec<i64> = batch.labels.into_data().iter::<i64>().collect();
        assert_eq!(labels, vec![3, 1]);
        assert_eq!(batch.paths, vec![a, b]);
    }

    #[test]
    fn test_undecodable_file_becomes_blank_image() {
        let dir = tempfile::tempdir().unwrap();
        let bad = dir.path().join("bad.png");
        std::fs::write(&bad, b"garbage").unwrap();

        let batcher = ImageBatcher::<TestBackend>::new(Default::default(), ImageTransform::new(4));
        let batch   = batcher.batch(vec![ImageSample::new(&bad, 0)]);

        assert_eq!(batch.images.dims(), [1, 3, 4, 4]);
        let sum: f32 = batch.images.abs().sum().into_scalar();
        assert_eq!(sum, 0.0);
    }
}
