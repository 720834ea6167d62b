//! SexaQ CLI

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};

use sq_analysis::{Dataset, ReweightConfig, ReweightPipeline, SelectionPolicy, TrainingConfig};

#[derive(Parser)]
#[command(name = "sexaq")]
#[command(about = "SexaQ - K0s data/simulation reweighting and BDT training plans")]
#[command(version)]
struct Cli {
    /// Log verbosity level (trace, debug, info, warn, error)
    #[arg(long, global = true, default_value = "warn")]
    log_level: tracing::Level,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Reweight the Subject dataset towards the Reference and compare K0s observables
    Reweight {
        /// Run configuration (YAML)
        #[arg(short, long)]
        config: PathBuf,

        /// Reference dataset (JSON). Overrides `inputs.reference`.
        #[arg(long)]
        reference: Option<PathBuf>,

        /// Subject dataset (JSON). Overrides `inputs.subject`.
        #[arg(long)]
        subject: Option<PathBuf>,

        /// Candidate selection policy. Overrides `selection.policy`.
        #[arg(long)]
        selection: Option<SelectionPolicy>,

        /// Output artifact (pretty JSON). Defaults to stdout.
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Omit timestamps so identical inputs give identical output.
        #[arg(long)]
        deterministic: bool,
    },

    /// Render a BDT training configuration into trainer options
    BdtPlan {
        /// Training configuration (YAML)
        #[arg(short, long)]
        config: PathBuf,

        /// Also partition this many rows into train/test indices
        #[arg(long)]
        rows: Option<usize>,

        /// Seed of the random train/test partition
        #[arg(long, default_value = "42")]
        split_seed: u64,

        /// Output file (pretty JSON). Defaults to stdout.
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Print version
    Version,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt().with_max_level(cli.log_level).with_target(false).init();

    match cli.command {
        Commands::Reweight { config, reference, subject, selection, output, deterministic } => {
            cmd_reweight(&config, reference, subject, selection, output.as_ref(), deterministic)
        }
        Commands::BdtPlan { config, rows, split_seed, output } => {
            cmd_bdt_plan(&config, rows, split_seed, output.as_ref())
        }
        Commands::Version => {
            println!("sexaq {}", sq_core::VERSION);
            Ok(())
        }
    }
}

/// Command-line path, else configured path resolved against the config directory.
fn input_path(
    cli: Option<PathBuf>,
    configured: Option<&PathBuf>,
    config_path: &Path,
    what: &str,
) -> Result<PathBuf> {
    if let Some(p) = cli {
        return Ok(p);
    }
    let p = configured.with_context(|| {
        format!("no {what} dataset: pass --{what} or set `inputs.{what}` in the config")
    })?;
    if p.is_absolute() {
        return Ok(p.clone());
    }
    let base = config_path.parent().unwrap_or_else(|| Path::new("."));
    Ok(base.join(p))
}

fn cmd_reweight(
    config_path: &Path,
    reference: Option<PathBuf>,
    subject: Option<PathBuf>,
    selection: Option<SelectionPolicy>,
    output: Option<&PathBuf>,
    deterministic: bool,
) -> Result<()> {
    let config = ReweightConfig::from_path(config_path)
        .with_context(|| format!("failed to load config {}", config_path.display()))?;
    let reference =
        input_path(reference, config.inputs.reference.as_ref(), config_path, "reference")?;
    let subject = input_path(subject, config.inputs.subject.as_ref(), config_path, "subject")?;

    let pipeline = ReweightPipeline::new(config, selection)
        .context("invalid reweighting configuration")?
        .deterministic(deterministic);

    tracing::info!(path = %reference.display(), "loading reference dataset");
    let reference_data = Dataset::from_path(&reference)
        .with_context(|| format!("failed to load dataset {}", reference.display()))?;
    tracing::info!(path = %subject.display(), "loading subject dataset");
    let subject_data = Dataset::from_path(&subject)
        .with_context(|| format!("failed to load dataset {}", subject.display()))?;

    let artifact = pipeline.run(&reference_data, &subject_data).context("reweighting failed")?;
    for e in &artifact.errors {
        tracing::warn!(histogram = %e.histogram, "{}", e.message);
    }

    match output {
        Some(path) => artifact
            .write_json(path)
            .with_context(|| format!("failed to write {}", path.display())),
        None => write_json(None, serde_json::to_value(&artifact)?),
    }
}

fn cmd_bdt_plan(
    config_path: &Path,
    rows: Option<usize>,
    split_seed: u64,
    output: Option<&PathBuf>,
) -> Result<()> {
    let config = TrainingConfig::from_path(config_path)
        .with_context(|| format!("failed to load training config {}", config_path.display()))?;
    let plan = config.plan();
    tracing::info!(variables = plan.variables.len(), dataset = %plan.dataset_dir, "training plan");

    let split = rows.map(|n| config.split_rows(n, split_seed));
    let output_json = serde_json::json!({
        "plan": plan,
        "split_seed": rows.map(|_| split_seed),
        "split": split,
    });
    write_json(output, output_json)
}

fn write_json(output: Option<&PathBuf>, value: serde_json::Value) -> Result<()> {
    if let Some(path) = output {
        std::fs::write(path, serde_json::to_string_pretty(&value)?)
            .with_context(|| format!("failed to write {}", path.display()))?;
    } else {
        println!("{}", serde_json::to_string_pretty(&value)?);
    }
    Ok(())
}
