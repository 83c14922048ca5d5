// ============================================================
// Layer 1: CLI / Presentation Layer
// ============================================================
// Entry point for all user interaction. Parses arguments with
// clap, delegates to Layer 2 and prints the results.
//
// Commands:
//   1. `train`   - train, validate, test and plot the loss curve
//   2. `test`    - evaluate the latest checkpoint
//   3. `predict` - classify one image
//   4. `inspect` - summarise a network without data
//
// Reference: Rust Book §7 (Modules), §12 (CLI programs)

pub mod commands;

use anyhow::Result;
use clap::Parser;
use commands::{Commands, InspectArgs, PredictArgs, TestArgs, TrainArgs};

#[derive(Parser, Debug)]
#[command(
    name = "densenet-flowers",
    version = "0.1.0",
    about = "Train a DenseNet on the 17-category flower dataset, then test and predict."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Route to the matching use case; nothing is computed here.
    pub fn run(self) -> Result<()> {
        match self.command {
            Commands::Train(args)   => run_train(args),
            Commands::Test(args)    => run_test(args),
            Commands::Predict(args) => run_predict(args),
            Commands::Inspect(args) => run_inspect(args),
        }
    }
}

fn run_train(args: TrainArgs) -> Result<()> {
    use crate::application::train_use_case::TrainUseCase;

    tracing::info!("Starting training on images in: {}", args.train_dir);

    let (classes, report) = TrainUseCase::new(args.into()).execute()?;
    if let Some(report) = report {
        println!("{}", report.render(&classes));
    }

    println!("Training complete. Checkpoints saved.");
    Ok(())
}

fn run_test(args: TestArgs) -> Result<()> {
    use crate::application::test_use_case::TestUseCase;

    let use_case = TestUseCase::new(args.checkpoint_dir, args.test_dir, args.cpu, args.verbose);
    let (classes, report) = use_case.execute()?;

    println!("{}", report.render(&classes));
    Ok(())
}

fn run_predict(args: PredictArgs) -> Result<()> {
    use crate::application::predict_use_case::PredictUseCase;

    let ranked = PredictUseCase::new(args.checkpoint_dir, args.cpu).predict(&args.image, args.top_k)?;

    println!("\nImage: {}", args.image.display());
    for guess in ranked {
        println!("  {:<16} {:.4}", guess.name, guess.probability);
    }
    Ok(())
}

fn run_inspect(args: InspectArgs) -> Result<()> {
    use crate::application::inspect_use_case::InspectUseCase;

    let summary = InspectUseCase::new(args.topology.model_config(), args.img_size).execute()?;

    println!("Feature channels: {:?}", summary.feature_channels);
    println!("Parameters:       {}", summary.num_params);
    println!(
        "Output shape:     {:?} for a [1, 3, {}, {}] input",
        summary.output_shape, args.img_size, args.img_size
    );
    Ok(())
}
