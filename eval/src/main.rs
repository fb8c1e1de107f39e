// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2024 Hyperpolymath

//! Scorer CLI for misogyny identification submissions
//!
//! Usage:
//!   ami-eval --task a --submission-path team.zip --gold-path-raw test_raw.tsv
//!   ami-eval --task b --submission-path team.zip --gold-path-raw test_raw.tsv \
//!       --gold-path-synt test_synt.tsv --identityterms-path identity_terms.txt

use ami_eval::datasets::Task;
use ami_eval::pipeline::{EvaluationConfig, EvaluationPipeline};
use ami_eval::report::format_score;
use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "ami-eval")]
#[command(about = "Score misogyny identification submissions")]
#[command(version)]
struct Args {
    /// Submission ZIP archive
    #[arg(long, alias = "submission_path")]
    submission_path: PathBuf,

    /// Gold annotations of the raw test set
    #[arg(long, alias = "gold_path_raw")]
    gold_path_raw: PathBuf,

    /// Gold annotations of the synthetic test set (subtask B)
    #[arg(long, alias = "gold_path_synt")]
    gold_path_synt: Option<PathBuf>,

    /// Identity terms, one per line (subtask B)
    #[arg(long, alias = "identityterms_path")]
    identityterms_path: Option<PathBuf>,

    /// Score report destination
    #[arg(long, alias = "output_path", default_value = "result.tsv")]
    output_path: PathBuf,

    /// Subtask to score (a or b)
    #[arg(long)]
    task: String,

    /// Write per-run metric details as JSON
    #[arg(long, alias = "details_path")]
    details_path: Option<PathBuf>,

    /// Match identity terms literally instead of as regular expressions
    #[arg(long)]
    escape_terms: bool,
}

fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    let task: Task = args.task.parse()?;

    tracing::info!("Submission: {}", args.submission_path.display());
    tracing::info!("Task: {}", task);

    let config = EvaluationConfig {
        task,
        submission_path: args.submission_path,
        gold_path_raw: args.gold_path_raw,
        gold_path_synt: args.gold_path_synt,
        identityterms_path: args.identityterms_path,
        output_path: args.output_path,
        details_path: args.details_path,
        escape_terms: args.escape_terms,
    };

    let pipeline = EvaluationPipeline::new(config);
    let results = pipeline
        .run()
        .with_context(|| format!("Evaluation of {} failed", pipeline.config().submission_path.display()))?;

    // Print summary to console
    println!("\n{}", "=".repeat(40));
    println!("SUBTASK {} SCORES", task.marker().to_uppercase());
    println!("{}", "=".repeat(40));
    for run in &results.runs {
        println!("{:<10} {:>12}", run.run.as_str(), format_score(run.result.score()));
    }
    println!("{:-<40}", "");
    println!("Report saved to: {}", pipeline.config().output_path.display());
    if let Some(details) = &pipeline.config().details_path {
        println!("Details saved to: {}", details.display());
    }

    Ok(())
}
