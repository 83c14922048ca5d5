// ============================================================
// Layer 2: TestUseCase
// ============================================================
// Re-evaluates a trained checkpoint on the test folder:
//
//   Step 1: Load train_config.json        (Layer 6 - infra)
//   Step 2: Load class names              (Layer 4 - data)
//   Step 3: Scan the test folder          (Layer 4 - data)
//   Step 4: Rebuild network, load weights (Layer 5 - ml)
//   Step 5: Evaluate with batch size 1    (Layer 5 - ml)

use anyhow::Result;
use burn::{data::dataloader::DataLoaderBuilder, prelude::*};

use crate::application::train_use_case::TrainConfig;
use crate::data::{
    batcher::ImageBatcher,
    class_file::load_class_names,
    dataset::ImageDataset,
    image_folder::ImageFolder,
    transform::ImageTransform,
};
use crate::domain::{class_names::ClassNames, traits::SampleSource};
use crate::infra::checkpoint::CheckpointManager;
use crate::ml::{
    evaluator::{evaluate, EvaluationReport},
    CpuBackend, GpuBackend,
};

pub struct TestUseCase {
    checkpoint_dir: String,
    /// Overrides the test folder stored in the config
    test_dir:       Option<String>,
    cpu:            bool,
    verbose:        bool,
}

impl TestUseCase {
    pub fn new(checkpoint_dir: String, test_dir: Option<String>, cpu: bool, verbose: bool) -> Self {
        Self { checkpoint_dir, test_dir, cpu, verbose }
    }

    pub fn execute(&self) -> Result<(ClassNames, EvaluationReport)> {
        let ckpt = CheckpointManager::new(&self.checkpoint_dir)?;
        let cfg  = ckpt.load_config()?;

        let classes  = load_class_names(&cfg.class_names_path, cfg.class_num)?;
        let test_dir = self.test_dir.clone().unwrap_or_else(|| cfg.test_dir.clone());
        let samples  = ImageFolder::new(&test_dir).load_samples(&classes)?;
        tracing::info!("total test images : {}", samples.len());
        let dataset  = ImageDataset::new(samples);

        let report = if self.cpu {
            self.run::<CpuBackend>(&ckpt, &cfg, dataset, Default::default())?
        } else {
            self.run::<GpuBackend>(&ckpt, &cfg, dataset, Default::default())?
        };
        Ok((classes, report))
    }

    fn run<B: Backend>(
        &self,
        ckpt:    &CheckpointManager,
        cfg:     &TrainConfig,
        dataset: ImageDataset,
        device:  B::Device,
    ) -> Result<EvaluationReport> {
        let model = cfg.model_config().init::<B>(&device);
        let model = ckpt.load_model(model, &device)?;

        let batcher = ImageBatcher::<B>::new(device, ImageTransform::new(cfg.img_size));
        let loader  = DataLoaderBuilder::new(batcher).batch_size(1).build(dataset);

        Ok(evaluate(&model, loader.as_ref(), cfg.class_num, self.verbose))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_missing_checkpoint_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let use_case = TestUseCase::new(dir.path().display().to_string(), None, true, false);
        let err = use_case.execute().unwrap_err();
        assert!(err.to_string().contains("train"));
    }

    #[test]
    fn test_evaluates_saved_checkpoint() {
        let dir   = tempfile::tempdir().unwrap();
        let root  = dir.path();
        let names = root.join("names.txt");
        fs::write(&names, "Daffodil\nTulip\n").unwrap();
        for class in ["Daffodil", "Tulip"] {
            let class_dir = root.join("test").join(class);
            fs::create_dir_all(&class_dir).unwrap();
            image::RgbImage::new(8, 8).save(class_dir.join("0.png")).unwrap();
        }

        let cfg = TrainConfig {
            class_names_path: names.display().to_string(),
            class_num:        2,
            test_dir:         root.join("test").display().to_string(),
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

        let use_case = TestUseCase::new(root.join("ckpt").display().to_string(), None, true, false);
        let (classes, report) = use_case.execute().unwrap();

        assert_eq!(classes.len(), 2);
        assert_eq!(report.samples, 2);
        assert_eq!(report.per_class.len(), 2);
    }
}
