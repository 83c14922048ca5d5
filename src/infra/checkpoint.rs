// ============================================================
// Layer 6: Checkpoint Manager
// ============================================================
// Saves and restores DenseNet weights using Burn's CompactRecorder
// (MessagePack + gzip, half precision).
//
// File layout:
//   checkpoints/
//     model_epoch_1.mpk.gz   ← weights after epoch 1
//     model_epoch_2.mpk.gz
//     ...
//     latest_epoch.json      ← number of the newest saved epoch
//     train_config.json      ← hyperparameters + topology
//
// The config is needed to rebuild a network of the same shape
// before the weights can be loaded into it.

use anyhow::{Context, Result};
use std::{fs, path::{Path, PathBuf}};
use burn::{
    prelude::*,
    record::{CompactRecorder, Recorder},
};

use crate::application::train_use_case::TrainConfig;
use crate::ml::model::DenseNet;

const LATEST_EPOCH_FILE: &str = "latest_epoch.json";
const CONFIG_FILE:       &str = "train_config.json";

pub struct CheckpointManager {
    dir: PathBuf,
}

impl CheckpointManager {
    /// Create a manager rooted at `dir`, creating the directory if needed.
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)
            .with_context(|| format!("Cannot create checkpoint directory '{}'", dir.display()))?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Save model weights for `epoch` and move the latest-epoch pointer.
    pub fn save_model<B: Backend>(&self, model: &DenseNet<B>, epoch: usize) -> Result<()> {
        let path = self.model_path(epoch);

        CompactRecorder::new()
            .record(model.clone().into_record(), path.clone())
            .with_context(|| format!("Failed to save checkpoint to '{}'", path.display()))?;

        let latest_path = self.dir.join(LATEST_EPOCH_FILE);
        fs::write(&latest_path, serde_json::to_string(&epoch)?)
            .with_context(|| format!("Failed to write '{}'", latest_path.display()))?;

        tracing::debug!("Saved checkpoint: epoch {}", epoch);
        Ok(())
    }

    /// Load the weights of the latest saved epoch into `model`.
    pub fn load_model<B: Backend>(
        &self,
        model:  DenseNet<B>,
        device: &B::Device,
    ) -> Result<DenseNet<B>> {
        let epoch = self
            .latest_epoch()?
            .context("No checkpoint found. Have you run 'train' first?")?;
        self.load_epoch(model, epoch, device)
    }

    pub fn load_epoch<B: Backend>(
        &self,
        model:  DenseNet<B>,
        epoch:  usize,
        device: &B::Device,
    ) -> Result<DenseNet<B>> {
        let path = self.model_path(epoch);
        tracing::info!("Loading checkpoint from epoch {}", epoch);

        let record = CompactRecorder::new()
            .load(path.clone(), device)
            .with_context(|| format!("Cannot load checkpoint '{}'", path.display()))?;

        Ok(model.load_record(record))
    }

    pub fn save_config(&self, cfg: &TrainConfig) -> Result<()> {
        let path = self.dir.join(CONFIG_FILE);
        let json = serde_json::to_string_pretty(cfg)?;

        fs::write(&path, json)
            .with_context(|| format!("Cannot write config to '{}'", path.display()))?;

        tracing::debug!("Saved training config to '{}'", path.display());
        Ok(())
    }

    pub fn load_config(&self) -> Result<TrainConfig> {
        let path = self.dir.join(CONFIG_FILE);

        let json = fs::read_to_string(&path).with_context(|| {
            format!(
                "Cannot read config from '{}'. Make sure you have run 'train' first.",
                path.display()
            )
        })?;

        serde_json::from_str(&json)
            .with_context(|| format!("Malformed config '{}'", path.display()))
    }

    /// Newest saved epoch, or None when nothing has been saved yet.
    pub fn latest_epoch(&self) -> Result<Option<usize>> {
        let path = self.dir.join(LATEST_EPOCH_FILE);
        if !path.exists() {
            return Ok(None);
        }

        let s = fs::read_to_string(&path)
            .with_context(|| format!("Cannot read '{}'", path.display()))?;
        Ok(Some(serde_json::from_str::<usize>(s.trim())?))
    }

    /// Base path of an epoch's weights; the recorder appends `.mpk.gz`.
    fn model_path(&self, epoch: usize) -> PathBuf {
        self.dir.join(format!("model_epoch_{epoch}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ml::model::DenseNetConfig;
    use burn::backend::NdArray;

    type TestBackend = NdArray<f32>;

    fn tiny() -> DenseNetConfig {
        DenseNetConfig::new(3)
            .with_initial_channels(4)
            .with_growth_rate(2)
            .with_block_sizes(vec![1, 1])
    }

    #[test]
    fn test_no_checkpoint_yet() {
        let dir  = tempfile::tempdir().unwrap();
        let ckpt = CheckpointManager::new(dir.path()).unwrap();
        assert_eq!(ckpt.latest_epoch().unwrap(), None);

        let device = Default::default();
        let model: DenseNet<TestBackend> = tiny().init(&device);
        assert!(ckpt.load_model(model, &device).is_err());
    }

    #[test]
    fn test_save_then_load_restores_weights() {
        let dir    = tempfile::tempdir().unwrap();
        let ckpt   = CheckpointManager::new(dir.path()).unwrap();
        let device = Default::default();

        let saved: DenseNet<TestBackend> = tiny().init(&device);
        ckpt.save_model(&saved, 3).unwrap();
        assert_eq!(ckpt.latest_epoch().unwrap(), Some(3));
        assert!(dir.path().join("model_epoch_3.mpk.gz").exists());

        let fresh: DenseNet<TestBackend> = tiny().init(&device);
        let loaded = ckpt.load_model(fresh, &device).unwrap();

        let x = Tensor::<TestBackend, 4>::ones([1, 3, 32, 32], &device);
        let a: Vec<f32> = saved.forward(x.clone()).into_data().iter::<f32>().collect();
        let b: Vec<f32> = loaded.forward(x).into_data().iter::<f32>().collect();
        // Half-precision storage
        for (a, b) in a.iter().zip(&b) {
            assert!((a - b).abs() < 1e-2, "{a} vs {b}");
        }
    }

    #[test]
    fn test_config_round_trip() {
        let dir  = tempfile::tempdir().unwrap();
        let ckpt = CheckpointManager::new(dir.path()).unwrap();

        let cfg = TrainConfig { epochs: 7, class_num: 5, ..TrainConfig::default() };
        ckpt.save_config(&cfg).unwrap();
        let back = ckpt.load_config().unwrap();
        assert_eq!(back.epochs, 7);
        assert_eq!(back.class_num, 5);
    }
}
