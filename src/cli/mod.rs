//! Credit score harness CLI
//!
//! Command-line entry points for running trainer batches, scoring files with
//! saved models and inspecting datasets.

use clap::{Parser, Subcommand, ValueEnum};
use colored::*;
use std::collections::BTreeSet;
use std::path::PathBuf;
use std::time::Instant;

use crate::config::{EvaluationMode, HarnessConfig};
use crate::data::{Dataset, Delimiter};
use crate::evaluation::Metric;
use crate::export::score_file;
use crate::reporting::Reporter;
use crate::trainers::{run_batch, EvaluationOutcome, TrainerKind};

// ─── Styling helpers ───────────────────────────────────────────────────────────

const RULE_WIDTH: usize = 56;

fn dim(s: &str) -> ColoredString   { s.truecolor(100, 100, 100) }
fn accent(s: &str) -> ColoredString { s.truecolor(120, 170, 255) }
fn muted(s: &str) -> ColoredString  { s.truecolor(140, 140, 140) }
fn ok(s: &str) -> ColoredString     { s.truecolor(100, 210, 120) }

fn kv(key: &str, val: &str) -> String {
    format!("  {:<16} {}", muted(key), val.white())
}

fn step_ok(msg: &str) {
    println!("  {} {}", ok("✓"), msg);
}

fn step_run(msg: &str) {
    println!("  {} {}", accent("●"), msg);
}

fn step_done(msg: &str, elapsed: f64) {
    println!("  {} {} {}", ok("✓"), msg, dim(&format!("{:.2}s", elapsed)));
}

fn section(title: &str) {
    println!();
    println!("  {}", title.white().bold());
    println!("  {}", dim(&"─".repeat(RULE_WIDTH)));
}

// ─── Arguments ─────────────────────────────────────────────────────────────────

#[derive(Parser)]
#[command(name = "credit-score")]
#[command(author, version, about = "Bankruptcy prediction harness over financial-ratio CSVs")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

/// Evaluation mode as typed on the command line
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ModeArg {
    Holdout,
    Cv,
    Validation,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Train, evaluate and report a batch of trainers
    Run {
        /// Training CSV
        #[arg(short, long)]
        data: PathBuf,

        /// Trainer names, comma separated; all trainers when omitted
        #[arg(short, long, value_delimiter = ',')]
        trainers: Vec<String>,

        /// Field separator: ',' or ';'
        #[arg(long, default_value = ",")]
        delimiter: Delimiter,

        /// Evaluation mode
        #[arg(short, long, value_enum)]
        mode: Option<ModeArg>,

        /// Fold count for cross-validation
        #[arg(long)]
        folds: Option<usize>,

        /// Test share for the holdout split
        #[arg(long)]
        test_fraction: Option<f64>,

        /// Validation CSV; implies validation mode
        #[arg(long)]
        validation: Option<PathBuf>,

        /// Save each fitted model under {base}/MLModels
        #[arg(long)]
        persist: bool,

        /// Skip permutation feature importance
        #[arg(long)]
        no_importance: bool,

        /// Repetitions per feature for permutation importance
        #[arg(long)]
        permutations: Option<usize>,

        #[arg(long)]
        seed: Option<u64>,

        /// Base directory for models and logs
        #[arg(long)]
        base_path: Option<PathBuf>,

        /// JSON config file; flags override its values
        #[arg(short, long)]
        config: Option<PathBuf>,
    },

    /// Score a CSV with a saved model
    Predict {
        /// Model artifact
        #[arg(short, long)]
        model: PathBuf,

        /// CSV to score
        #[arg(short, long)]
        data: PathBuf,

        #[arg(long, default_value = ",")]
        delimiter: Delimiter,

        /// Rows to score; 0 scores the whole file
        #[arg(short, long, default_value = "10")]
        limit: usize,
    },

    /// List available trainers
    Trainers,

    /// Show dataset statistics
    Info {
        #[arg(short, long)]
        data: PathBuf,

        #[arg(long, default_value = ",")]
        delimiter: Delimiter,

        /// JSON config naming the columns
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
}

// ─── Run ───────────────────────────────────────────────────────────────────────

/// Options of the `run` subcommand
pub struct RunArgs {
    pub data: PathBuf,
    pub trainers: Vec<String>,
    pub delimiter: Delimiter,
    pub mode: Option<ModeArg>,
    pub folds: Option<usize>,
    pub test_fraction: Option<f64>,
    pub validation: Option<PathBuf>,
    pub persist: bool,
    pub no_importance: bool,
    pub permutations: Option<usize>,
    pub seed: Option<u64>,
    pub base_path: Option<PathBuf>,
    pub config: Option<PathBuf>,
}

impl RunArgs {
    /// Start from the config file (or defaults) and apply the flags given
    pub fn build_config(&self) -> anyhow::Result<HarnessConfig> {
        let mut config = match &self.config {
            Some(path) => HarnessConfig::from_json_file(path)?,
            None => HarnessConfig::default(),
        };

        if let Some(seed) = self.seed {
            config = config.with_seed(seed);
        }
        if let Some(base) = &self.base_path {
            config = config.with_base_path(base.clone());
        }
        if let Some(count) = self.permutations {
            config = config.with_permutation_count(count);
        }
        if self.persist {
            config = config.with_persistence(true);
        }
        if self.no_importance {
            config = config.with_importance(false);
        }

        let mode = self.mode.or(if self.validation.is_some() {
            Some(ModeArg::Validation)
        } else if self.folds.is_some() {
            Some(ModeArg::Cv)
        } else if self.test_fraction.is_some() {
            Some(ModeArg::Holdout)
        } else {
            None
        });
        if let Some(mode) = mode {
            let evaluation = match mode {
                ModeArg::Holdout => EvaluationMode::Holdout {
                    test_fraction: self.test_fraction.unwrap_or(0.2),
                },
                ModeArg::Cv => EvaluationMode::CrossValidation {
                    folds: self.folds.unwrap_or(10),
                },
                ModeArg::Validation => EvaluationMode::Validation,
            };
            config = config.with_evaluation(evaluation);
        }

        if self.validation.is_some() && config.evaluation != EvaluationMode::Validation {
            anyhow::bail!(
                "--validation is only used by validation mode, but the mode is {}",
                describe_mode(&config.evaluation)
            );
        }

        config.validate()?;
        Ok(config)
    }

    /// Resolve trainer names; an empty list means every trainer
    pub fn trainer_kinds(&self) -> anyhow::Result<Vec<TrainerKind>> {
        if self.trainers.is_empty() {
            return Ok(TrainerKind::ALL.to_vec());
        }
        let kinds = self
            .trainers
            .iter()
            .map(|name| name.trim().parse::<TrainerKind>())
            .collect::<Result<Vec<_>, _>>()?;
        Ok(kinds)
    }
}

pub fn cmd_run(args: RunArgs) -> anyhow::Result<()> {
    let config = args.build_config()?;
    let kinds = args.trainer_kinds()?;
    let schema = config.schema()?;

    section("Credit Score Harness");
    println!("{}", kv("Data", &args.data.display().to_string()));
    println!("{}", kv("Evaluation", &describe_mode(&config.evaluation)));
    println!("{}", kv("Seed", &config.seed.to_string()));
    let names: Vec<&str> = kinds.iter().map(|k| k.name()).collect();
    println!("{}", kv("Trainers", &names.join(", ")));
    println!();

    let start = Instant::now();
    step_run("Loading data...");
    let data = Dataset::load(&args.data, args.delimiter, &schema)?;
    let (positives, negatives) = data.label_counts();
    step_done(
        &format!("{} rows ({} bankrupt, {} healthy)", data.len(), positives, negatives),
        start.elapsed().as_secs_f64(),
    );

    let validation = match &args.validation {
        Some(path) => {
            let set = Dataset::load(path, args.delimiter, &schema)?;
            step_ok(&format!("Validation set: {} rows", set.len()));
            Some(set)
        }
        None => None,
    };

    let mut reporter = Reporter::from_config(&config)?;
    let start = Instant::now();
    let outcomes = run_batch(&kinds, &data, validation.as_ref(), &config, &mut reporter)?;

    section("Summary");
    for outcome in &outcomes {
        let headline = match &outcome.evaluation {
            EvaluationOutcome::Single { report, .. } => {
                format!("accuracy {:.3}  auc {:.3}", report.binary().accuracy, report.binary().auc)
            }
            EvaluationOutcome::CrossValidation { summary, .. } => {
                let mean = |m| summary.get(m).map_or(f64::NAN, |s| s.mean);
                format!(
                    "accuracy {:.3}  auc {:.3}  ({} folds)",
                    mean(Metric::Accuracy),
                    mean(Metric::Auc),
                    summary.folds
                )
            }
        };
        println!("  {:<28} {}", outcome.kind.name().white(), headline);
        if let Some(path) = &outcome.model_path {
            println!("  {:<28} {}", "", dim(&path.display().to_string()));
        }
    }
    println!();
    step_done("Batch complete", start.elapsed().as_secs_f64());
    println!("{}", kv("Log", &config.log_file_path().display().to_string()));
    println!();
    Ok(())
}

fn describe_mode(mode: &EvaluationMode) -> String {
    match mode {
        EvaluationMode::Holdout { test_fraction } => format!("holdout ({:.0}% test)", test_fraction * 100.0),
        EvaluationMode::CrossValidation { folds } => format!("{}-fold cross-validation", folds),
        EvaluationMode::Validation => "separate validation file".to_string(),
    }
}

// ─── Predict ───────────────────────────────────────────────────────────────────

pub fn cmd_predict(model: &PathBuf, data: &PathBuf, delimiter: Delimiter, limit: usize) -> anyhow::Result<()> {
    section("Predict");
    let start = Instant::now();
    step_run(&format!("Scoring {} with {}", data.display(), model.display()));

    let sample = score_file(model, data, delimiter, limit)?;
    step_done(
        &format!("{} rows scored by {}", sample.rows.len(), sample.trainer),
        start.elapsed().as_secs_f64(),
    );
    println!();

    let mut reporter = Reporter::new(None)?;
    reporter.report_predictions(&sample)?;

    let correct = sample
        .rows
        .iter()
        .filter(|(obs, pred)| obs.label == pred.predicted_label)
        .count();
    println!();
    println!("{}", kv("Agreement", &format!("{}/{}", correct, sample.rows.len())));
    println!();
    Ok(())
}

// ─── Trainers ──────────────────────────────────────────────────────────────────

pub fn cmd_trainers() -> anyhow::Result<()> {
    section("Trainers");
    println!(
        "  {:<28} {:<12} {}",
        muted("Name"),
        muted("Calibrated"),
        muted("Importance ranked by")
    );
    for kind in TrainerKind::ALL {
        let calibrated = if kind.calibrated() { ok("yes") } else { dim("no") };
        println!(
            "  {:<28} {:<12} {}",
            kind.name(),
            calibrated,
            kind.importance_metric()
        );
    }
    println!();
    Ok(())
}

// ─── Info ──────────────────────────────────────────────────────────────────────

pub fn cmd_info(data_path: &PathBuf, delimiter: Delimiter, config: Option<&PathBuf>) -> anyhow::Result<()> {
    let config = match config {
        Some(path) => HarnessConfig::from_json_file(path)?,
        None => HarnessConfig::default(),
    };
    let schema = config.schema()?;
    let data = Dataset::load(data_path, delimiter, &schema)?;

    section("Data Info");
    let (positives, negatives) = data.label_counts();
    println!("{}", kv("File", &data_path.display().to_string()));
    println!("{}", kv("Rows", &data.len().to_string()));
    println!("{}", kv("Bankrupt", &format!("{} ({:.1}%)", positives, share(positives, data.len()))));
    println!("{}", kv("Healthy", &format!("{} ({:.1}%)", negatives, share(negatives, data.len()))));
    println!();

    println!("  {:<16} {:>8} {:>12} {:>12}", muted("Column"), muted("Missing"), muted("Min"), muted("Max"));
    println!("  {}", dim(&"─".repeat(RULE_WIDTH)));
    for (j, name) in schema.numeric_names().iter().enumerate() {
        let values: Vec<f64> = data.observations().iter().map(|o| o.ratios[j]).collect();
        let missing = values.iter().filter(|v| v.is_nan()).count();
        let present = values.iter().copied().filter(|v| !v.is_nan());
        let min = present.clone().fold(f64::INFINITY, f64::min);
        let max = present.fold(f64::NEG_INFINITY, f64::max);
        println!("  {:<16} {:>8} {:>12.4} {:>12.4}", name, missing, min, max);
    }

    let codes: BTreeSet<&str> = data.observations().iter().map(|o| o.cnae.as_str()).collect();
    println!();
    println!("{}", kv(schema.categorical_name(), &format!("{} distinct codes", codes.len())));
    println!();
    Ok(())
}

fn share(count: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        count as f64 * 100.0 / total as f64
    }
}
