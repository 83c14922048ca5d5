// ============================================================
// Layer 5: Inferencer
// ============================================================
// Rebuilds the network from train_config.json, loads the latest
// weights and classifies single images.

use anyhow::Result;
use burn::{prelude::*, tensor::activation::softmax};
use std::path::Path;

use crate::data::transform::ImageTransform;
use crate::infra::checkpoint::CheckpointManager;
use crate::ml::model::DenseNet;

#[derive(Debug, Clone)]
pub struct Prediction {
    pub label:         usize,
    pub probability:   f32,
    pub probabilities: Vec<f32>,
}

impl Prediction {
    pub fn from_probabilities(probabilities: Vec<f32>) -> Self {
        let (label, probability) = probabilities
            .iter()
            .copied()
            .enumerate()
            .fold((0, f32::NEG_INFINITY), |best, (i, p)| if p > best.1 { (i, p) } else { best });
        Self { label, probability, probabilities }
    }

    /// The `k` most likely labels, most likely first.
    pub fn top_k(&self, k: usize) -> Vec<(usize, f32)> {
        let mut ranked: Vec<(usize, f32)> = self.probabilities.iter().copied().enumerate().collect();
        ranked.sort_by(|a, b| b.1.total_cmp(&a.1));
        ranked.truncate(k);
        ranked
    }
}

pub struct Inferencer<B: Backend> {
    model:     DenseNet<B>,
    transform: ImageTransform,
    device:    B::Device,
}

impl<B: Backend> Inferencer<B> {
    pub fn from_checkpoint(ckpt: &CheckpointManager, device: B::Device) -> Result<Self> {
        let cfg   = ckpt.load_config()?;
        let model = cfg.model_config().init::<B>(&device);
        let model = ckpt.load_model(model, &device)?;
        tracing::info!("Model loaded from checkpoint");
        Ok(Self::new(model, ImageTransform::new(cfg.img_size), device))
    }

    pub fn new(model: DenseNet<B>, transform: ImageTransform, device: B::Device) -> Self {
        Self { model, transform, device }
    }

    pub fn predict(&self, image: &Path) -> Result<Prediction> {
        let size   = self.transform.size;
        let pixels = self.transform.load(image)?;
        let input  = Tensor::<B, 4>::from_data(
            TensorData::new(pixels, [1, 3, size, size]).convert::<B::FloatElem>(),
            &self.device,
        );

        let probs = softmax(self.model.forward(input), 1);
        let probabilities: Vec<f32> = probs.into_data().iter::<f32>().collect();
        Ok(Prediction::from_probabilities(probabilities))
    }
}
