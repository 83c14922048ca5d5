// ============================================================
// Layer 1: CLI Commands and Arguments
// ============================================================
// Defines the subcommands `train`, `test`, `predict` and
// `inspect` and all their configurable flags.
//
// Reference: Rust Book §12 (Building a CLI Program)

use clap::{Args, Subcommand};
use std::path::PathBuf;

use crate::application::train_use_case::TrainConfig;
use crate::ml::model::DenseNetConfig;

/// Smallest image side the default four-block network accepts
const MIN_IMG_SIZE: usize = 32;

fn parse_img_size(s: &str) -> Result<usize, String> {
    let size: usize = s.parse().map_err(|e| format!("{e}"))?;
    if size < MIN_IMG_SIZE {
        return Err(format!("must be at least {MIN_IMG_SIZE}"));
    }
    Ok(size)
}

fn parse_fraction(s: &str) -> Result<f64, String> {
    let v: f64 = s.parse().map_err(|e| format!("{e}"))?;
    if !(v > 0.0 && v <= 1.0) {
        return Err("must be in (0, 1]".to_string());
    }
    Ok(v)
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Train DenseNet on the flower folders, then validate and test
    Train(TrainArgs),

    /// Evaluate the latest checkpoint on the test folder
    Test(TestArgs),

    /// Classify a single image with the latest checkpoint
    Predict(PredictArgs),

    /// Print channel progression, parameter count and output shape
    Inspect(InspectArgs),
}

/// Arguments shared by every command that builds a network
#[derive(Args, Debug, Clone)]
pub struct TopologyArgs {
    /// Number of flower classes
    #[arg(long, default_value_t = 17)]
    pub class_num: usize,

    /// Channels produced by the 7x7 stem convolution
    #[arg(long, default_value_t = 64)]
    pub initial_channels: usize,

    /// Channels each conv block adds
    #[arg(long, default_value_t = 32)]
    pub growth_rate: usize,

    /// Conv blocks per dense block, comma separated
    #[arg(long, value_delimiter = ',', default_value = "4,4,4,4")]
    pub block_sizes: Vec<usize>,
}

impl TopologyArgs {
    pub fn model_config(&self) -> DenseNetConfig {
        DenseNetConfig::new(self.class_num)
            .with_initial_channels(self.initial_channels)
            .with_growth_rate(self.growth_rate)
            .with_block_sizes(self.block_sizes.clone())
    }
}

#[derive(Args, Debug)]
pub struct TrainArgs {
    /// One flower name per line, in label order
    #[arg(long, default_value = "data/17_flowers_name.txt")]
    pub class_names: String,

    #[arg(long, default_value = "data/17_flowers/train")]
    pub train_dir: String,

    /// Missing folder: a seeded share of the training images is held out
    #[arg(long, default_value = "data/17_flowers/valid")]
    pub valid_dir: String,

    #[arg(long, default_value = "data/17_flowers/test")]
    pub test_dir: String,

    /// Where weights, config, metrics and the loss curve go
    #[arg(long, default_value = "checkpoints")]
    pub checkpoint_dir: String,

    #[command(flatten)]
    pub topology: TopologyArgs,

    /// Images are resized to SIZE x SIZE
    #[arg(long, default_value_t = 224, value_parser = parse_img_size)]
    pub img_size: usize,

    #[arg(long, default_value_t = 32)]
    pub batch_size: usize,

    #[arg(long, default_value_t = 1)]
    pub valid_batch_size: usize,

    /// Data-loader threads for training (0 = main thread)
    #[arg(long, default_value_t = 2)]
    pub train_workers: usize,

    #[arg(long, default_value_t = 2)]
    pub valid_workers: usize,

    /// Keep the training order fixed
    #[arg(long)]
    pub no_shuffle: bool,

    #[arg(long, default_value_t = 20)]
    pub epochs: usize,

    #[arg(long, default_value_t = 1e-4)]
    pub lr: f64,

    #[arg(long, default_value_t = 0.5)]
    pub beta1: f32,

    #[arg(long, default_value_t = 0.999)]
    pub beta2: f32,

    /// Skip validation entirely
    #[arg(long)]
    pub no_valid: bool,

    /// Validate after every N epochs
    #[arg(long, default_value_t = 5)]
    pub valid_every: usize,

    /// Share of training images kept for training when no validation
    /// folder exists; the rest is held out for validation
    #[arg(long, default_value_t = 0.8, value_parser = parse_fraction)]
    pub train_fraction: f64,

    /// Skip the final test pass
    #[arg(long)]
    pub no_test: bool,

    /// Log the labels of the first batch of every pass
    #[arg(long)]
    pub verbose: bool,

    #[arg(long, default_value_t = 42)]
    pub seed: u64,

    /// Continue from the latest checkpoint
    #[arg(long)]
    pub resume: bool,

    /// Use the CPU backend instead of the GPU
    #[arg(long)]
    pub cpu: bool,

    /// TrueType font for the loss-curve labels
    #[arg(long)]
    pub plot_font: Option<String>,
}

impl From<TrainArgs> for TrainConfig {
    fn from(a: TrainArgs) -> Self {
        TrainConfig {
            class_names_path: a.class_names,
            class_num:        a.topology.class_num,
            train_dir:        a.train_dir,
            valid_dir:        a.valid_dir,
            test_dir:         a.test_dir,
            checkpoint_dir:   a.checkpoint_dir,
            img_size:         a.img_size,
            batch_size:       a.batch_size,
            valid_batch_size: a.valid_batch_size,
            train_workers:    a.train_workers,
            valid_workers:    a.valid_workers,
            train_shuffle:    !a.no_shuffle,
            valid_shuffle:    !a.no_shuffle,
            epochs:           a.epochs,
            lr:               a.lr,
            beta1:            a.beta1,
            beta2:            a.beta2,
            valid:            !a.no_valid,
            valid_every:      a.valid_every,
            train_fraction:   a.train_fraction,
            test:             !a.no_test,
            verbose:          a.verbose,
            seed:             a.seed,
            initial_channels: a.topology.initial_channels,
            growth_rate:      a.topology.growth_rate,
            block_sizes:      a.topology.block_sizes,
            resume:           a.resume,
            cpu:              a.cpu,
            plot_font:        a.plot_font,
        }
    }
}

#[derive(Args, Debug)]
pub struct TestArgs {
    #[arg(long, default_value = "checkpoints")]
    pub checkpoint_dir: String,

    /// Defaults to the test folder used during training
    #[arg(long)]
    pub test_dir: Option<String>,

    #[arg(long)]
    pub verbose: bool,

    #[arg(long)]
    pub cpu: bool,
}

#[derive(Args, Debug)]
pub struct PredictArgs {
    /// Image file to classify
    #[arg(long)]
    pub image: PathBuf,

    #[arg(long, default_value = "checkpoints")]
    pub checkpoint_dir: String,

    /// How many ranked classes to print
    #[arg(long, default_value_t = 1)]
    pub top_k: usize,

    #[arg(long)]
    pub cpu: bool,
}

#[derive(Args, Debug)]
pub struct InspectArgs {
    #[command(flatten)]
    pub topology: TopologyArgs,

    #[arg(long, default_value_t = 224, value_parser = parse_img_size)]
    pub img_size: usize,
}
