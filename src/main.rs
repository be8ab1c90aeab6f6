use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use tracing::warn;
use tracing_subscriber::EnvFilter;

use motion_lstm::data::preprocessing::load_recording;
use motion_lstm::{
    create_median_filtered_dataset, input_fn, run_epochs, Config, DataSplit, Estimator,
    ModelMetadata, Sequences,
};

/// Train and run an LSTM classifier on motion recordings.
#[derive(Parser, Debug)]
#[command(name = "motion-lstm", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Preprocess the recordings and train for the configured number of epochs.
    Train(TrainArgs),
    /// Evaluate the latest checkpoint on the held-out split.
    Evaluate(DataArgs),
    /// Classify a single recording with the latest checkpoint.
    Predict(PredictArgs),
}

#[derive(Args, Debug)]
struct DataArgs {
    /// Index CSV with Subject,Datafile,Label columns.
    #[arg(long)]
    data: PathBuf,
    /// Directory for checkpoints and evaluation logs.
    #[arg(long)]
    model_dir: PathBuf,
    /// Optional TOML file overriding the default hyperparameters.
    #[arg(long)]
    config: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct TrainArgs {
    #[command(flatten)]
    data: DataArgs,
    #[arg(long)]
    epochs: Option<usize>,
    #[arg(long)]
    batch_size: Option<usize>,
    #[arg(long)]
    seed: Option<u64>,
}

#[derive(Args, Debug)]
struct PredictArgs {
    #[arg(long)]
    model_dir: PathBuf,
    /// Headerless CSV of one recording (rows = time, columns = channels).
    #[arg(long)]
    recording: PathBuf,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("motion_lstm=info")),
        )
        .init();

    match Cli::parse().command {
        Command::Train(args) => train(args),
        Command::Evaluate(args) => evaluate(args),
        Command::Predict(args) => predict(args),
    }
}

fn load_config(path: Option<&Path>) -> Result<Config> {
    Config::load(path).with_context(|| match path {
        Some(p) => format!("loading config {}", p.display()),
        None => "building default config".to_string(),
    })
}

fn train(args: TrainArgs) -> Result<()> {
    let mut config = load_config(args.data.config.as_deref())?;
    if let Some(epochs) = args.epochs {
        config.num_epochs = epochs;
    }
    if let Some(batch_size) = args.batch_size {
        config.batch_size = batch_size;
    }
    if let Some(seed) = args.seed {
        config.seed = seed;
    }
    config.validate()?;

    println!("Generating Data");
    let ((train, test), labels) = create_median_filtered_dataset(
        &args.data.data,
        config.data.time_steps,
        config.data.test_fraction,
        config.seed,
    )
    .with_context(|| format!("preprocessing {}", args.data.data.display()))?;

    if labels.len() > config.output_dim {
        bail!(
            "dataset has {} classes but output_dim is {}",
            labels.len(),
            config.output_dim
        );
    }

    let metadata = ModelMetadata {
        description: Some(format!("trained on {}", args.data.data.display())),
        time_steps: config.data.time_steps,
        labels,
        split: Some(DataSplit { seed: config.seed, test_fraction: config.data.test_fraction }),
    };
    let mut estimator =
        Estimator::new(&args.data.model_dir, &config, train.features.channels(), metadata)?;

    run_epochs(&mut estimator, &train, &test, &config, |stats| {
        println!(
            "\nValidation set accuracy after epoch {}: {:.3}\n",
            stats.epoch, stats.val_accuracy
        );
    })?;
    Ok(())
}

fn evaluate(args: DataArgs) -> Result<()> {
    let config = load_config(args.config.as_deref())?;
    let mut estimator = Estimator::restore(&args.model_dir)?;

    let fallback = DataSplit { seed: config.seed, test_fraction: config.data.test_fraction };
    if estimator.metadata().split.is_none() {
        warn!(seed = fallback.seed, "checkpoint does not record its split, using the config");
    }
    let split = estimator.metadata().data_split(fallback);
    let ((_, test), _) = create_median_filtered_dataset(
        &args.data,
        estimator.metadata().time_steps,
        split.test_fraction,
        split.seed,
    )
    .with_context(|| format!("preprocessing {}", args.data.display()))?;

    let result = estimator.evaluate(input_fn(&test.features, &test.labels, &config), "validation")?;
    println!(
        "Validation set accuracy at step {}: {:.3} (loss {:.4})",
        result.global_step, result.accuracy, result.loss
    );
    Ok(())
}

fn predict(args: PredictArgs) -> Result<()> {
    let mut estimator = Estimator::restore(&args.model_dir)?;
    let block = load_recording(&args.recording, estimator.metadata().time_steps)
        .with_context(|| format!("reading {}", args.recording.display()))?;
    let features = Sequences::from_samples(&[block])?;

    let predictions = estimator.predict(&features)?;
    let Some(prediction) = predictions.first() else {
        bail!("model returned no prediction");
    };
    let label = estimator
        .metadata()
        .label_name(prediction.class_id)
        .map(str::to_string)
        .unwrap_or_else(|| format!("class {}", prediction.class_id));
    println!(
        "{}: {} (p = {:.3})",
        args.recording.display(),
        label,
        prediction.probabilities[prediction.class_id]
    );
    Ok(())
}
