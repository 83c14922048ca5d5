use burn::data::dataset::Dataset;

use crate::domain::sample::ImageSample;

/// Labelled image samples; pixels are decoded by the batcher.
pub struct ImageDataset {
    samples: Vec<ImageSample>,
}

impl ImageDataset {
    pub fn new(samples: Vec<ImageSample>) -> Self { Self { samples } }

    pub fn sample_count(&self) -> usize { self.samples.len() }

    /// Number of samples per label, for class-balance logging
    pub fn class_counts(&self, num_classes: usize) -> Vec<usize> {
        let mut counts = vec![0usize; num_classes];
        for s in &self.samples {
            if let Some(c) = counts.get_mut(s.label) {
                *c += 1;
            }
        }
        counts
    }
}

impl Dataset<ImageSample> for ImageDataset {
    fn get(&self, index: usize) -> Option<ImageSample> {
        self.samples.get(index).cloned()
    }

    fn len(&self) -> usize {
        self.samples.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_and_len() {
        let ds = ImageDataset::new(vec![
            ImageSample::new("a.png", 0),
            ImageSample::new("b.png", 2),
        ]);
        assert_eq!(ds.len(), 2);
        assert_eq!(ds.get(1).unwrap().label, 2);
        assert!(ds.get(2).is_none());
    }

    #[test]
    fn test_class_counts() {
        let ds = ImageDataset::new(vec![
            ImageSample::new("a.png", 0),
            ImageSample::new("b.png", 2),
            ImageSample::new("c.png", 2),
        ]);
        assert_eq!(ds.class_counts(3), vec![1, 0, 2]);
    }
}
