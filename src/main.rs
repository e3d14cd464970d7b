use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing::info;

use pine_forest::{
    Dictionary, FoldScore, ForestConfig, InputMode, MaxFeatures, Model, SequenceConfig, TokenUnit,
    encode_prediction, join_tokens,
};
use pine_io::{ExportWriter, TrainingFileReader};

#[derive(Parser)]
#[command(name = "pine")]
#[command(about = "Random forest training, cross-validation and majority-vote prediction")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// RNG seed for reproducibility
    #[arg(long, default_value_t = 42, global = true)]
    seed: u64,

    /// Enable verbose (debug-level) logging
    #[arg(long, global = true)]
    verbose: bool,

    /// Suppress all output except errors
    #[arg(long, global = true)]
    quiet: bool,

    /// Number of threads for fold training and batch prediction (defaults to all cores)
    #[arg(long, global = true)]
    threads: Option<usize>,
}

#[derive(Subcommand)]
enum Command {
    /// Cross-validate a forest on a training file and save the model
    Train {
        /// Path to the training file
        #[arg(long)]
        data: PathBuf,

        /// Where to write the binary model
        #[arg(long)]
        save: PathBuf,

        /// Number of trees grown per fold
        #[arg(long, default_value_t = 1)]
        trees: usize,

        /// Number of cross-validation folds
        #[arg(long, default_value_t = 5)]
        folds: usize,

        /// Maximum tree depth
        #[arg(long, default_value_t = 10)]
        max_depth: usize,

        /// Candidate features per split: "sqrt", "all", or a count
        #[arg(long, default_value = "sqrt")]
        max_features: String,

        /// Fraction of the training rows drawn into each bootstrap sample
        #[arg(long, default_value_t = 2.0 / 3.0)]
        bootstrap_fraction: f64,

        /// Treat the training file as a token sequence instead of CSV rows
        #[arg(long, default_value_t = false)]
        sequence: bool,

        /// Number of preceding tokens encoded into each sequence row
        #[arg(long, default_value_t = 1)]
        sequence_length: usize,

        /// Split sequences on whitespace instead of per character
        #[arg(long, default_value_t = false)]
        words: bool,

        /// Tree-building workers per fold (defaults to cores / folds)
        #[arg(long)]
        workers: Option<usize>,
    },

    /// Predict with a saved model
    Predict {
        /// Path to the binary model
        #[arg(long)]
        model: PathBuf,

        /// One CSV row of features, or seed text for a sequence model
        #[arg(long)]
        input: String,
    },

    /// Write the readable JSON export of a saved model
    Export {
        /// Path to the binary model
        #[arg(long)]
        model: PathBuf,

        /// Export path (defaults to the model path with a .json extension)
        #[arg(long)]
        output: Option<PathBuf>,
    },
}

// --- JSON stdout output structs ---

#[derive(Serialize)]
struct TrainOutput<'a> {
    model: String,
    n_rows: usize,
    n_features: usize,
    labels: &'a [String],
    n_trees: usize,
    max_features: usize,
    fold_scores: &'a [FoldScore],
    cv_mean_accuracy: f64,
    cv_std_accuracy: f64,
}

fn parse_max_features(s: &str) -> Result<MaxFeatures> {
    match s {
        "sqrt" => Ok(MaxFeatures::Sqrt),
        "all" => Ok(MaxFeatures::All),
        other => other
            .parse::<usize>()
            .map(MaxFeatures::Fixed)
            .with_context(|| format!("unknown max features: {other} (expected sqrt, all, or a count)")),
    }
}

fn build_mode(sequence: bool, sequence_length: usize, words: bool) -> Result<InputMode> {
    if !sequence {
        return Ok(InputMode::Tabular);
    }
    let unit = if words { TokenUnit::Word } else { TokenUnit::Char };
    let config = SequenceConfig::new(sequence_length, unit).context("invalid sequence settings")?;
    Ok(InputMode::Sequence(config))
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = match (cli.verbose, cli.quiet) {
        (true, _) => "debug",
        (_, true) => "error",
        _ => "info",
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    if let Some(threads) = cli.threads {
        rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .build_global()
            .context("failed to configure thread pool")?;
        info!(threads, "thread pool configured");
    }

    match cli.command {
        Command::Train {
            data,
            save,
            trees,
            folds,
            max_depth,
            max_features,
            bootstrap_fraction,
            sequence,
            sequence_length,
            words,
            workers,
        } => {
            let mode = build_mode(sequence, sequence_length, words)?;

            // 1. Read and encode the training file
            let mut dictionary = Dictionary::new();
            let dataset = TrainingFileReader::new(&data)
                .read(mode, &mut dictionary)
                .context("failed to read training data")?;

            // 2. Cross-validate
            let config = ForestConfig::new(trees)?
                .with_n_folds(folds)
                .with_max_depth(max_depth)
                .with_max_features(parse_max_features(&max_features)?)
                .with_bootstrap_fraction(bootstrap_fraction)
                .with_seed(cli.seed)
                .with_workers(workers)
                .with_mode(mode);
            let report = config.fit(&dataset).context("training failed")?;
            info!(
                mean_accuracy = report.mean_accuracy(),
                n_trees = report.forest().n_trees(),
                "cross-validation complete"
            );

            // 3. Persist
            let model = report.to_model(&dataset);
            model
                .save(&save)
                .with_context(|| format!("failed to save model to {}", save.display()))?;

            let output = TrainOutput {
                model: save.display().to_string(),
                n_rows: dataset.len(),
                n_features: dataset.schema().n_features(),
                labels: model.dictionary.labels(),
                n_trees: model.forest.n_trees(),
                max_features: report.metadata().max_features_resolved,
                fold_scores: report.fold_scores(),
                cv_mean_accuracy: report.mean_accuracy(),
                cv_std_accuracy: report.std_accuracy(),
            };
            println!("{}", serde_json::to_string_pretty(&output)?);
        }

        Command::Predict { model, input } => {
            let loaded = Model::load(&model)
                .with_context(|| format!("failed to load model from {}", model.display()))?;
            info!(n_trees = loaded.forest.n_trees(), "model loaded");

            let rows = encode_prediction(&input, loaded.mode, &loaded.dictionary, loaded.schema)
                .context("failed to encode prediction input")?;
            let classes = loaded
                .forest
                .predict_batch(&rows)
                .context("prediction failed")?;
            let labels = classes
                .into_iter()
                .map(|class| loaded.dictionary.resolve(class))
                .collect::<Result<Vec<_>, _>>()
                .context("model predicted an unknown class")?;

            match loaded.mode {
                InputMode::Tabular => println!("{}", labels.join(",")),
                InputMode::Sequence(config) => println!("{}", join_tokens(&labels, config.unit)),
            }
        }

        Command::Export { model, output } => {
            let loaded = Model::load(&model)
                .with_context(|| format!("failed to load model from {}", model.display()))?;
            let writer = match output {
                Some(path) => ExportWriter::new(&path),
                None => ExportWriter::beside(&model),
            };
            let written = writer.write(&loaded).context("failed to write export")?;
            println!("{}", written.display());
        }
    }

    Ok(())
}
