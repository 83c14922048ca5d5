// ============================================================
// Layer 2: PredictUseCase
// ============================================================
// Classifies one image with the latest checkpoint and maps the
// winning label back to its flower name.

use anyhow::{Context, Result};
use std::path::Path;

use crate::data::class_file::load_class_names;
use crate::domain::class_names::ClassNames;
use crate::infra::checkpoint::CheckpointManager;
use crate::ml::{
    inferencer::{Inferencer, Prediction},
    CpuBackend, GpuBackend,
};

/// One ranked guess for an image
#[derive(Debug, Clone, PartialEq)]
pub struct NamedPrediction {
    pub name:        String,
    pub probability: f32,
}

pub struct PredictUseCase {
    checkpoint_dir: String,
    cpu:            bool,
}

impl PredictUseCase {
    pub fn new(checkpoint_dir: String, cpu: bool) -> Self {
        Self { checkpoint_dir, cpu }
    }

    /// The `top_k` most likely classes for `image`, best first.
    pub fn predict(&self, image: &Path, top_k: usize) -> Result<Vec<NamedPrediction>> {
        let ckpt    = CheckpointManager::new(&self.checkpoint_dir)?;
        let cfg     = ckpt.load_config()?;
        let classes = load_class_names(&cfg.class_names_path, cfg.class_num)?;

        let prediction = if self.cpu {
            Inferencer::<CpuBackend>::from_checkpoint(&ckpt, Default::default())?.predict(image)?
        } else {
            Inferencer::<GpuBackend>::from_checkpoint(&ckpt, Default::default())?.predict(image)?
        };
        tracing::debug!("label {} with p={:.4}", prediction.label, prediction.probability);

        name_predictions(&prediction, &classes, top_k.max(1))
    }
}

fn name_predictions(
    prediction: &Prediction,
    classes:    &ClassNames,
    top_k:      usize,
) -> Result<Vec<NamedPrediction>> {
    prediction
        .top_k(top_k)
        .into_iter()
        .map(|(label, probability)| {
            let name = classes
                .name(label)
                .with_context(|| format!("Label {label} has no class name"))?;
            Ok(NamedPrediction { name: name.to_string(), probability })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::train_use_case::TrainConfig;
    use std::fs;

    #[test]
    fn test_predicts_named_classes() {
        let dir   = tempfile::tempdir().unwrap();
        let root  = dir.path();
        let names = root.join("names.txt");
        fs::write(&names, "Daffodil\nTulip\nIris\n").unwrap();
        let image = root.join("flower.png");
        image::RgbImage::from_pixel(12, 12, image::Rgb([250, 220, 10])).save(&image).unwrap();

        let cfg = TrainConfig {
            class_names_path: names.display().to_string(),
            class_num:        3,
            img_size:         32,
            initial_channels: 4,
            growth_rate:      2,
            block_sizes:      vec![1, 1],
            ..TrainConfig::default()
        };
        let ckpt   = CheckpointManager::new(root.join("ckpt")).unwrap();
        let device = Default::default();
        ckpt.save_config(&cfg).unwrap();
        ckpt.save_model(&cfg.model_config().init::<CpuBackend>(&device), 1).unwrap();

        let use_case = PredictUseCase::new(root.join("ckpt").display().to_string(), true);
        let ranked   = use_case.predict(&image, 3).unwrap();

        assert_eq!(ranked.len(), 3);
        assert!(ranked[0].probability >= ranked[1].probability);
        assert!(ranked.iter().any(|p| p.name == "Iris"));
    }

    #[test]
    fn test_unknown_label_is_an_error() {
        let classes    = ClassNames::parse("Daffodil\n", 1).unwrap();
        let prediction = Prediction::from_probabilities(vec![0.2, 0.8]);
        assert!(name_predictions(&prediction, &classes, 1).is_err());
    }
}
