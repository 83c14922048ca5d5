// ============================================================
// Layer 2: TrainUseCase
// ============================================================
// Orchestrates the full training pipeline in order:
//
//   Step 1: Load + validate class names   (Layer 4 - data)
//   Step 2: Scan train/valid/test folders (Layer 4 - data)
//   Step 3: Build datasets                (Layer 4 - data)
//   Step 4: Save config                   (Layer 6 - infra)
//   Step 5: Train, validate, test         (Layer 5 - ml)
//   Step 6: Plot the loss curve           (Layer 6 - infra)

use anyhow::{ensure, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::data::{
    class_file::load_class_names,
    dataset::ImageDataset,
    image_folder::ImageFolder,
    splitter::split_train_val,
};
use crate::domain::{class_names::ClassNames, traits::SampleSource};
use crate::infra::{
    checkpoint::CheckpointManager,
    loss_plot::{load_font, save_loss_curve},
    metrics::MetricsLogger,
};
use crate::ml::{
    evaluator::EvaluationReport,
    model::DenseNetConfig,
    trainer::{run_training, TrainingData},
};

// ─── Training Configuration ──────────────────────────────────────────────────
// Every knob of a training run. Saved to train_config.json so the
// `test` and `predict` commands rebuild exactly the same network.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainConfig {
    pub class_names_path: String,
    pub class_num:        usize,
    pub train_dir:        String,
    pub valid_dir:        String,
    pub test_dir:         String,
    pub checkpoint_dir:   String,

    pub img_size:         usize,
    pub batch_size:       usize,
    pub valid_batch_size: usize,
    pub train_workers:    usize,
    pub valid_workers:    usize,
    pub train_shuffle:    bool,
    pub valid_shuffle:    bool,

    pub epochs:           usize,
    pub lr:               f64,
    pub beta1:            f32,
    pub beta2:            f32,

    pub valid:            bool,
    pub valid_every:      usize,
    /// Training share kept when no validation folder exists
    pub train_fraction:   f64,
    pub test:             bool,
    pub verbose:          bool,
    pub seed:             u64,

    pub initial_channels: usize,
    pub growth_rate:      usize,
    pub block_sizes:      Vec<usize>,

    pub resume:           bool,
    pub cpu:              bool,

    /// TrueType font for the loss-curve labels; system fonts otherwise
    #[serde(default)]
    pub plot_font:        Option<String>,
}

impl Default for TrainConfig {
    fn default() -> Self {
        Self {
            class_names_path: "data/17_flowers_name.txt".to_string(),
            class_num:        17,
            train_dir:        "data/17_flowers/train".to_string(),
            valid_dir:        "data/17_flowers/valid".to_string(),
            test_dir:         "data/17_flowers/test".to_string(),
            checkpoint_dir:   "checkpoints".to_string(),
            img_size:         224,
            batch_size:       32,
            valid_batch_size: 1,
            train_workers:    2,
            valid_workers:    2,
            train_shuffle:    true,
            valid_shuffle:    true,
            epochs:           20,
            lr:               1e-4,
            beta1:            0.5,
            beta2:            0.999,
            valid:            true,
            valid_every:      5,
            train_fraction:   0.8,
            test:             true,
            verbose:          false,
            seed:             42,
            initial_channels: 64,
            growth_rate:      32,
            block_sizes:      vec![4, 4, 4, 4],
            resume:           false,
            cpu:              false,
            plot_font:        None,
        }
    }
}

impl TrainConfig {
    /// Network topology described by this config
    pub fn model_config(&self) -> DenseNetConfig {
        DenseNetConfig::new(self.class_num)
            .with_initial_channels(self.initial_channels)
            .with_growth_rate(self.growth_rate)
            .with_block_sizes(self.block_sizes.clone())
    }
}

// ─── TrainUseCase ─────────────────────────────────────────────────────────────
pub struct TrainUseCase {
    config: TrainConfig,
}

impl TrainUseCase {
    pub fn new(config: TrainConfig) -> Self {
        Self { config }
    }

    /// Run the pipeline; returns the class names and, when testing
    /// is enabled, the test report.
    pub fn execute(&self) -> Result<(ClassNames, Option<EvaluationReport>)> {
        let cfg = &self.config;

        let min_size = cfg.model_config().min_input_size();
        ensure!(
            cfg.img_size >= min_size,
            "Image size {} is too small for this network; it needs at least {}",
            cfg.img_size,
            min_size
        );
        ensure!(
            cfg.train_fraction > 0.0 && cfg.train_fraction <= 1.0,
            "Train fraction must be in (0, 1], got {}",
            cfg.train_fraction
        );

        // ── Step 1: Class names ───────────────────────────────────────────────
        // Wrong count or unreadable file stops here, before any image I/O
        let classes = load_class_names(&cfg.class_names_path, cfg.class_num)?;

        // ── Step 2 + 3: Datasets ──────────────────────────────────────────────
        let data = self.build_datasets(&classes)?;
        tracing::info!("total training images : {}", data.train.sample_count());
        if let Some(valid) = &data.valid {
            tracing::info!("total validation images : {}", valid.sample_count());
        }
        if let Some(test) = &data.test {
            tracing::info!("total test images : {}", test.sample_count());
        }
        if cfg.verbose {
            tracing::info!("training images per class: {:?}", data.train.class_counts(cfg.class_num));
        }

        // ── Step 4: Save config for test / predict ────────────────────────────
        let ckpt = CheckpointManager::new(&cfg.checkpoint_dir)?;
        ckpt.save_config(cfg)?;
        let metrics = MetricsLogger::new(ckpt.dir(), cfg.resume)?;

        // ── Step 5: Train / validate / test (Layer 5) ─────────────────────────
        let report = run_training(cfg, &classes, data, &ckpt, &metrics)?;

        // ── Step 6: Loss curve ────────────────────────────────────────────────
        let points: Vec<(f64, f64)> = metrics
            .read_all()?
            .iter()
            .map(|m| (m.epoch as f64, m.train_loss))
            .collect();
        tracing::info!("Metrics written to '{}'", metrics.csv_path().display());
        let font = load_font(cfg.plot_font.as_deref().map(Path::new));
        save_loss_curve(&points, &ckpt.dir().join("loss_curve.png"), font.as_ref())?;

        Ok((classes, report))
    }

    fn build_datasets(&self, classes: &ClassNames) -> Result<TrainingData> {
        let cfg = &self.config;

        let mut train = ImageFolder::new(&cfg.train_dir).load_samples(classes)?;

        let valid = if !cfg.valid {
            None
        } else if Path::new(&cfg.valid_dir).is_dir() {
            Some(ImageFolder::new(&cfg.valid_dir).load_samples(classes)?)
        } else {
            tracing::warn!(
                "Validation folder '{}' not found; holding out {:.0}% of training images",
                cfg.valid_dir,
                (1.0 - cfg.train_fraction) * 100.0
            );
            let (kept, held_out) = split_train_val(train, cfg.train_fraction, cfg.seed);
            train = kept;
            Some(held_out)
        };

        let test = if cfg.test {
            Some(ImageFolder::new(&cfg.test_dir).load_samples(classes)?)
        } else {
            None
        };

        Ok(TrainingData {
            train: ImageDataset::new(train),
            valid: valid.map(ImageDataset::new),
            test:  test.map(ImageDataset::new),
        })
    }
}
