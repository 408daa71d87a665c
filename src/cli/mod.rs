//! Kolosal Pipeline CLI Module
//!
//! Command-line interface for training, evaluation and prediction.

pub mod tasks;

use clap::{Parser, Subcommand};
use colored::*;
use std::path::{Path, PathBuf};
use std::time::Instant;

use crate::data::Row;
use crate::error::KolosalError;
use crate::inference::{Prediction, PredictionRecord};
use crate::lifecycle;
use crate::pipeline::{PipelineConfig, TrainedModel};

// ─── Styling helpers ───────────────────────────────────────────────────────────

fn dim(s: &str) -> ColoredString {
    s.truecolor(100, 100, 100)
}

fn accent(s: &str) -> ColoredString {
    s.truecolor(120, 170, 255)
}

fn muted(s: &str) -> ColoredString {
    s.truecolor(140, 140, 140)
}

fn ok(s: &str) -> ColoredString {
    s.truecolor(100, 210, 120)
}

fn step_run(msg: &str) {
    print!("  {} {}... ", accent("›"), msg);
}

fn step_done(detail: &str) {
    println!("{} {}", ok("done"), dim(detail));
}

fn section(title: &str) {
    println!();
    println!("  {}", title.white().bold());
    println!("  {}", dim(&"─".repeat(56)));
}

fn print_block(text: &str) {
    for line in text.lines() {
        println!("  {}", line);
    }
}

fn print_prediction(record: &PredictionRecord) {
    let text = match record.output {
        Prediction::Binary {
            label,
            probability,
            score,
        } => format!(
            "{} {}  {} {:.4}  {} {:.4}",
            muted("label"),
            label.to_string().white().bold(),
            muted("probability"),
            probability,
            muted("score"),
            score
        ),
        Prediction::Regression { value, .. } => {
            format!("{} {}", muted("value"), format!("{:.4}", value).white().bold())
        }
    };
    println!("  {}", text);
}

#[derive(Parser)]
#[command(name = "kolosal-pipeline")]
#[command(author = "KolosalAI")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Train, evaluate and serve boosted-tree pipelines")]
#[command(long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Fit a pipeline described by a JSON config and save the model
    Train {
        /// Pipeline config (schema, format, transforms, trainer)
        #[arg(short, long)]
        config: PathBuf,

        /// Training data
        #[arg(short, long)]
        data: PathBuf,

        /// Output model artifact
        #[arg(short, long)]
        model: PathBuf,

        /// Held-out data to evaluate after training
        #[arg(short, long)]
        test: Option<PathBuf>,
    },

    /// Evaluate a saved model on held-out data
    Evaluate {
        /// Model artifact
        #[arg(short, long)]
        model: PathBuf,

        /// Test data, laid out like the training data
        #[arg(short, long)]
        data: PathBuf,
    },

    /// Score one record with a saved model
    Predict {
        /// Model artifact
        #[arg(short, long)]
        model: PathBuf,

        /// A full data line, or only the model's input columns in schema order
        #[arg(short, long)]
        record: String,
    },

    /// List built-in tasks
    Tasks,

    /// Run a built-in task end to end: train, evaluate, save, reload, predict
    Run {
        /// Task name (see `tasks`)
        task: String,

        /// Training data
        #[arg(long)]
        train: PathBuf,

        /// Test data
        #[arg(long)]
        test: PathBuf,

        /// Model artifact to write
        #[arg(short, long)]
        model: PathBuf,
    },
}

pub fn cmd_train(
    config_path: &Path,
    data_path: &Path,
    model_path: &Path,
    test_path: Option<&Path>,
) -> anyhow::Result<()> {
    section("Train");
    let config = PipelineConfig::load(config_path)?;
    let model = train_and_report(&config, data_path)?;

    if let Some(test_path) = test_path {
        evaluate_and_report(&model, test_path)?;
    }
    save_and_report(&model, model_path)?;
    Ok(())
}

pub fn cmd_evaluate(model_path: &Path, data_path: &Path) -> anyhow::Result<()> {
    section("Evaluate");
    let model = lifecycle::load(model_path)?;
    evaluate_and_report(&model, data_path)
}

pub fn cmd_predict(model_path: &Path, record: &str) -> anyhow::Result<()> {
    section("Predict");
    let model = lifecycle::load(model_path)?;
    let row = parse_record(&model, record)?;
    print_prediction(&lifecycle::predict_one(&model, &row)?);
    Ok(())
}

pub fn cmd_tasks() {
    section("Tasks");
    for task in tasks::TASKS {
        println!("  {:<12} {}", task.name.white().bold(), muted(task.description));
    }
    println!();
}

pub fn cmd_run(task_name: &str, train_path: &Path, test_path: &Path, model_path: &Path) -> anyhow::Result<()> {
    let task = tasks::find(task_name).ok_or_else(|| {
        anyhow::anyhow!(
            "unknown task '{}' (available: {})",
            task_name,
            tasks::TASKS.iter().map(|t| t.name).collect::<Vec<_>>().join(", ")
        )
    })?;
    section(&format!("Run {}", task.name));

    let config = (task.config)()?;
    let model = train_and_report(&config, train_path)?;
    evaluate_and_report(&model, test_path)?;
    save_and_report(&model, model_path)?;

    step_run("Reloading model");
    let reloaded = lifecycle::load(model_path)?;
    step_done(&format!("{:?}", reloaded.state()));

    let samples = (task.samples)();
    let before = lifecycle::predict_batch(&model, &samples)?;
    let after = lifecycle::predict_batch(&reloaded, &samples)?;
    if before != after {
        anyhow::bail!("reloaded model disagrees with the trained model");
    }

    section("Predictions");
    for record in &after {
        let mut inputs: Vec<String> = record
            .input
            .iter()
            .map(|(k, v)| format!("{}={:?}", k, v))
            .collect();
        inputs.sort();
        println!("  {}", dim(&inputs.join(", ")));
        print_prediction(record);
    }
    println!();
    Ok(())
}

fn train_and_report(config: &PipelineConfig, data_path: &Path) -> anyhow::Result<TrainedModel> {
    step_run(&format!("Training on {}", data_path.display()));
    let start = Instant::now();
    let model = lifecycle::train(data_path, config)?;
    step_done(&format!(
        "{} features, {} trees in {:?}",
        model.num_features(),
        model.predictor().ensemble().num_trees(),
        start.elapsed()
    ));
    Ok(model)
}

fn evaluate_and_report(model: &TrainedModel, data_path: &Path) -> anyhow::Result<()> {
    step_run(&format!("Evaluating on {}", data_path.display()));
    let start = Instant::now();
    let metrics = lifecycle::evaluate(model, data_path)?;
    step_done(&format!("{:?}", start.elapsed()));
    println!();
    print_block(&metrics.to_string());
    Ok(())
}

fn save_and_report(model: &TrainedModel, model_path: &Path) -> anyhow::Result<()> {
    step_run(&format!("Saving to {}", model_path.display()));
    lifecycle::save(model, model_path)?;
    step_done("");
    Ok(())
}

/// Parse a command-line record against the model's schema. A line carrying every
/// schema field is read by ordinal; a shorter line supplies just the feature inputs,
/// in schema order.
pub fn parse_record(model: &TrainedModel, line: &str) -> crate::error::Result<Row> {
    let schema = model.schema();
    let fields = model.format().split_line(line)?;

    if fields.len() >= schema.required_fields() {
        return schema.parse_fields(&fields, 0);
    }

    let inputs: Vec<_> = schema
        .columns()
        .iter()
        .filter(|c| model.feature_inputs().contains(&c.name))
        .collect();
    if fields.len() != inputs.len() {
        return Err(KolosalError::SchemaMismatch(format!(
            "record has {} fields; expected {} (full line) or {} ({})",
            fields.len(),
            schema.required_fields(),
            inputs.len(),
            inputs
                .iter()
                .map(|c| c.name.as_str())
                .collect::<Vec<_>>()
                .join(", ")
        )));
    }

    let mut row = Row::new();
    for (column, raw) in inputs.iter().zip(&fields) {
        row.insert(column.name.clone(), column.parse_cell(raw, 0)?);
    }
    Ok(row)
}
