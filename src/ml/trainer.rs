// ============================================================
// Layer 5: Training Loop
// ============================================================
// Train + periodic validation + final test, using Burn's
// DataLoader and Adam (lr 1e-4, β = (0.5, 0.999)).
//
// Backend notes:
//   - Training runs on Autodiff<Backend> so loss.backward() works
//     and batch-norm uses batch statistics
//   - model.valid() returns the model on the inner backend; batch
//     norm then uses its running statistics
//   - Validation/test batchers therefore use B::InnerBackend

use anyhow::Result;
use burn::{
    backend::Autodiff,
    data::dataloader::DataLoaderBuilder,
    module::AutodiffModule,
    optim::{AdamConfig, GradientsParams, Optimizer},
    prelude::*,
    tensor::{backend::AutodiffBackend, Distribution},
};

use crate::application::train_use_case::TrainConfig;
use crate::data::{batcher::ImageBatcher, dataset::ImageDataset, transform::ImageTransform};
use crate::domain::class_names::ClassNames;
use crate::infra::{checkpoint::CheckpointManager, metrics::{EpochMetrics, MetricsLogger}};
use crate::ml::{
    evaluator::{evaluate, EvaluationReport},
    model::DenseNet,
    CpuBackend, GpuBackend,
};

/// Datasets for one run; validation and test are optional.
pub struct TrainingData {
    pub train: ImageDataset,
    pub valid: Option<ImageDataset>,
    pub test:  Option<ImageDataset>,
}

/// Pick the device and run the training loop on it.
pub fn run_training(
    cfg:     &TrainConfig,
    classes: &ClassNames,
    data:    TrainingData,
    ckpt:    &CheckpointManager,
    metrics: &MetricsLogger,
) -> Result<Option<EvaluationReport>> {
    if cfg.cpu {
        tracing::info!("Training on CPU.");
        train_loop::<Autodiff<CpuBackend>>(cfg, classes, data, ckpt, metrics, Default::default())
    } else {
        let device = burn::backend::wgpu::WgpuDevice::default();
        tracing::info!("Training on GPU: {:?}", device);
        train_loop::<Autodiff<GpuBackend>>(cfg, classes, data, ckpt, metrics, device)
    }
}

/// Forward a random [1, 3, size, size] image and log the logits shape.
pub fn shape_check<B: Backend>(model: &DenseNet<B>, img_size: usize, device: &B::Device) -> [usize; 2] {
    let x = Tensor::<B, 4>::random([1, 3, img_size, img_size], Distribution::Normal(0.0, 1.0), device);
    let dims = model.forward(x).dims();
    tracing::info!("Output shape for a [1, 3, {img_size}, {img_size}] input: {:?}", dims);
    dims
}

fn train_loop<B: AutodiffBackend>(
    cfg:     &TrainConfig,
    classes: &ClassNames,
    data:    TrainingData,
    ckpt:    &CheckpointManager,
    metrics: &MetricsLogger,
    device:  B::Device,
) -> Result<Option<EvaluationReport>> {
    B::seed(cfg.seed);

    // ── Build model ───────────────────────────────────────────────────────────
    let model_cfg = cfg.model_config();
    let mut model: DenseNet<B> = model_cfg.init(&device);
    tracing::info!(
        "DenseNet ready: {} parameters, channels {:?}, {} features into the classifier",
        model.num_params(),
        model_cfg.feature_channels(),
        model_cfg.output_channels()
    );
    shape_check(&model.valid(), cfg.img_size, &device);

    let mut start_epoch = 1;
    if cfg.resume {
        match ckpt.latest_epoch()? {
            Some(epoch) => {
                model = ckpt.load_epoch(model, epoch, &device)?;
                start_epoch = epoch + 1;
                tracing::info!("Resuming after epoch {}", epoch);
            }
            None => tracing::warn!("--resume given but no checkpoint found; starting fresh"),
        }
    }

    // ── Adam optimiser ────────────────────────────────────────────────────────
    let mut optim = AdamConfig::new()
        .with_beta_1(cfg.beta1)
        .with_beta_2(cfg.beta2)
        .init();

    let transform = ImageTransform::new(cfg.img_size);

    // ── Training data loader (AutodiffBackend) ────────────────────────────────
    let train_batcher = ImageBatcher::<B>::new(device.clone(), transform.clone());
    let mut train_builder = DataLoaderBuilder::new(train_batcher).batch_size(cfg.batch_size);
    // Zero workers means batching on the calling thread
    if cfg.train_workers > 0 {
        train_builder = train_builder.num_workers(cfg.train_workers);
    }
    if cfg.train_shuffle {
        train_builder = train_builder.shuffle(cfg.seed);
    }
    let train_loader = train_builder.build(data.train);

    // ── Validation data loader (InnerBackend, no autodiff) ────────────────────
    let val_loader = data.valid.map(|valid| {
        let batcher = ImageBatcher::<B::InnerBackend>::new(device.clone(), transform.clone());
        let mut builder = DataLoaderBuilder::new(batcher).batch_size(cfg.valid_batch_size);
        if cfg.valid_workers > 0 {
            builder = builder.num_workers(cfg.valid_workers);
        }
        if cfg.valid_shuffle {
            builder = builder.shuffle(cfg.seed);
        }
        builder.build(valid)
    });

    if start_epoch > cfg.epochs {
        tracing::warn!("Checkpoint is already at epoch {} of {}", start_epoch - 1, cfg.epochs);
    }

    // ── Epoch loop ────────────────────────────────────────────────────────────
    for epoch in start_epoch..=cfg.epochs {
        println!("--------------- Training --------------------");

        let mut loss_sum = 0.0f64;
        let mut batches  = 0usize;
        let mut first    = true;

        for batch in train_loader.iter() {
            if first && cfg.verbose {
                let labels: Vec<i64> = batch.labels.clone().into_data().iter::<i64>().collect();
                tracing::info!("labels: {:?}", labels);
                tracing::info!("images: {:?}", batch.paths);
                first = false;
            }

            let (loss, _) = model.forward_loss(batch.images, batch.labels);
            loss_sum += loss.clone().into_scalar().elem::<f64>();
            batches  += 1;

            // Backward pass + Adam update
            let grads = loss.backward();
            let grads = GradientsParams::from_grads(grads, &model);
            model = optim.step(cfg.lr, model, grads);
        }

        let avg_loss = if batches > 0 {
            loss_sum / batches as f64
        } else {
            tracing::warn!("Training loader produced no batches");
            f64::NAN
        };
        println!("epoch: {}/{}, avg_loss: {:.6}", epoch, cfg.epochs, avg_loss);

        let mut row = EpochMetrics::new(epoch, avg_loss);

        // ── Validation phase ──────────────────────────────────────────────────
        if let Some(loader) = &val_loader {
            if cfg.valid_every > 0 && epoch % cfg.valid_every == 0 {
                println!("--------------- validation --------------------");
                let report = evaluate(&model.valid(), loader.as_ref(), cfg.class_num, cfg.verbose);
                println!(
                    "\nValidation loss: {:.6}, Validation accuracy: {:.4}",
                    report.loss,
                    report.accuracy()
                );
                row = row.with_validation(report.loss, report.accuracy());
            }
        }

        ckpt.save_model(&model, epoch)?;
        metrics.log(&row)?;
        tracing::info!("Checkpoint saved for epoch {}", epoch);
    }

    // ── Test phase ────────────────────────────────────────────────────────────
    let report = data.test.map(|test| {
        let batcher = ImageBatcher::<B::InnerBackend>::new(device.clone(), transform.clone());
        let loader  = DataLoaderBuilder::new(batcher).batch_size(1).build(test);
        evaluate(&model.valid(), loader.as_ref(), classes.len(), cfg.verbose)
    });

    tracing::info!("Training complete!");
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::sample::ImageSample;
    use image::{Rgb, RgbImage};

    #[test]
    fn test_shape_check_reports_logits_dims() {
        let device = Default::default();
        let model: DenseNet<CpuBackend> = crate::ml::model::DenseNetConfig::new(17)
            .with_initial_channels(4)
            .with_growth_rate(2)
            .init(&device);
        assert_eq!(shape_check(&model, 32, &device), [1, 17]);
    }

    fn flower_samples(dir: &std::path::Path, count: usize) -> Vec<ImageSample> {
        (0..count)
            .map(|i| {
                let path  = dir.join(format!("{i}.png"));
                let shade = (i * 60) as u8;
                RgbImage::from_pixel(16, 16, Rgb([shade, 255 - shade, 0])).save(&path).unwrap();
                ImageSample::new(path, i % 2)
            })
            .collect()
    }

    fn tiny_run(dir: &std::path::Path, epochs: usize) -> TrainConfig {
        TrainConfig {
            class_num:        2,
            checkpoint_dir:   dir.join("ckpt").display().to_string(),
            img_size:         32,
            batch_size:       2,
            train_workers:    0,
            valid_workers:    0,
            epochs,
            valid_every:      2,
            initial_channels: 4,
            growth_rate:      2,
            block_sizes:      vec![1, 1],
            cpu:              true,
            ..TrainConfig::default()
        }
    }

    fn two_classes() -> ClassNames {
        ClassNames::parse("Daffodil\nTulip\n", 2).unwrap()
    }

    #[test]
    fn test_short_run_on_cpu_writes_checkpoints_and_metrics() {
        let dir     = tempfile::tempdir().unwrap();
        let samples = flower_samples(dir.path(), 4);
        let cfg     = tiny_run(dir.path(), 2);
        let data = TrainingData {
            train: ImageDataset::new(samples.clone()),
            valid: Some(ImageDataset::new(samples.clone())),
            test:  Some(ImageDataset::new(samples)),
        };

        let ckpt    = CheckpointManager::new(&cfg.checkpoint_dir).unwrap();
        let metrics = MetricsLogger::new(ckpt.dir(), false).unwrap();
        let report  = run_training(&cfg, &two_classes(), data, &ckpt, &metrics).unwrap().unwrap();

        assert_eq!(report.samples, 4);
        assert_eq!(ckpt.latest_epoch().unwrap(), Some(2));

        let rows = metrics.read_all().unwrap();
        assert_eq!(rows.len(), 2);
        assert!(rows[0].train_loss.is_finite());
        assert!(rows[0].val_accuracy.is_none());
        assert!(rows[1].val_accuracy.is_some());
    }

    #[test]
    fn test_empty_training_set_logs_nan() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = tiny_run(dir.path(), 1);
        let data = TrainingData {
            train: ImageDataset::new(Vec::new()),
            valid: None,
            test:  None,
        };

        let ckpt    = CheckpointManager::new(&cfg.checkpoint_dir).unwrap();
        let metrics = MetricsLogger::new(ckpt.dir(), false).unwrap();
        let report  = run_training(&cfg, &two_classes(), data, &ckpt, &metrics).unwrap();

        assert!(report.is_none());
        let rows = metrics.read_all().unwrap();
        assert_eq!(rows.len(), 1);
        assert!(rows[0].train_loss.is_nan());
    }

    #[test]
    fn test_resume_continues_after_latest_epoch() {
        let dir     = tempfile::tempdir().unwrap();
        let samples = flower_samples(dir.path(), 4);
        let train_only = |samples: &Vec<ImageSample>| TrainingData {
            train: ImageDataset::new(samples.clone()),
            valid: None,
            test:  None,
        };

        let first   = tiny_run(dir.path(), 1);
        let ckpt    = CheckpointManager::new(&first.checkpoint_dir).unwrap();
        let metrics = MetricsLogger::new(ckpt.dir(), false).unwrap();
        run_training(&first, &two_classes(), train_only(&samples), &ckpt, &metrics).unwrap();
        assert_eq!(ckpt.latest_epoch().unwrap(), Some(1));

        let resumed = TrainConfig { resume: true, ..tiny_run(dir.path(), 3) };
        let metrics = MetricsLogger::new(ckpt.dir(), true).unwrap();
        run_training(&resumed, &two_classes(), train_only(&samples), &ckpt, &metrics).unwrap();

        assert_eq!(ckpt.latest_epoch().unwrap(), Some(3));
        let epochs: Vec<usize> = metrics.read_all().unwrap().iter().map(|m| m.epoch).collect();
        assert_eq!(epochs, vec![1, 2, 3]);
    }
}
