// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2024 Hyperpolymath

//! Submission evaluation pipeline
//!
//! Orchestrates, for every run in canonical order:
//! - Consistency checks against gold
//! - Id-based merge with gold
//! - Subtask A macro-F1, or subtask B subgroup tagging, bias metrics and overall AUC
//! - Incremental score report writing
//!
//! The first failing run aborts the whole evaluation and no report is left behind.

use crate::bias::compute_bias_metrics_for_model;
use crate::consistency::check_submission_consistency;
use crate::datasets::{load_identity_terms, DataKind, GoldDataset, Level, Task};
use crate::error::{EvalError, Result};
use crate::merge::merge_on_id;
use crate::report::{format_score, ReportWriter, ScoreReport};
use crate::scoring::{score_task_a, score_task_b, RunScore, TaskAScore, TaskBScore};
use crate::submission::{archive_digest, read_submission, RunName, RunSubmission, Submission};
use crate::subgroups::SubgroupAnnotator;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Configuration for one evaluation invocation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvaluationConfig {
    pub task: Task,
    /// Submission ZIP archive
    pub submission_path: PathBuf,
    pub gold_path_raw: PathBuf,
    /// Required for subtask B
    pub gold_path_synt: Option<PathBuf>,
    /// Required for subtask B
    pub identityterms_path: Option<PathBuf>,
    pub output_path: PathBuf,
    /// Optional JSON document with per-run metric details
    pub details_path: Option<PathBuf>,
    /// Match identity terms literally instead of as regex fragments
    pub escape_terms: bool,
}

impl Default for EvaluationConfig {
    fn default() -> Self {
        Self {
            task: Task::A,
            submission_path: PathBuf::new(),
            gold_path_raw: PathBuf::new(),
            gold_path_synt: None,
            identityterms_path: None,
            output_path: PathBuf::from("result.tsv"),
            details_path: None,
            escape_terms: false,
        }
    }
}

/// Gold annotations shared by every run of an evaluation
#[derive(Debug, Clone)]
pub struct GoldData {
    pub raw: GoldDataset,
    pub synt: Option<GoldDataset>,
    pub identity_terms: Vec<String>,
}

impl GoldData {
    /// Load the gold files the configured task needs
    pub fn load(config: &EvaluationConfig) -> Result<Self> {
        let raw = GoldDataset::load(&config.gold_path_raw, DataKind::Raw)?;
        if config.task == Task::A {
            return Ok(Self {
                raw,
                synt: None,
                identity_terms: Vec::new(),
            });
        }

        let synt_path = non_empty(config.gold_path_synt.as_deref()).ok_or(EvalError::MissingInput("gold synt data"))?;
        let terms_path = non_empty(config.identityterms_path.as_deref()).ok_or(EvalError::MissingInput("identity terms data"))?;

        Ok(Self {
            raw,
            synt: Some(GoldDataset::load(synt_path, DataKind::Synt)?),
            identity_terms: load_identity_terms(terms_path)?,
        })
    }
}

fn non_empty(path: Option<&Path>) -> Option<&Path> {
    path.filter(|p| !p.as_os_str().is_empty())
}

/// Score of one run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunResult {
    pub run: RunName,
    pub result: RunScore,
}

/// Complete evaluation results
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvaluationResults {
    pub config: EvaluationConfig,
    pub submission_sha256: Option<String>,
    pub runs: Vec<RunResult>,
    pub timestamp: DateTime<Utc>,
    pub version: String,
}

impl EvaluationResults {
    pub fn report(&self) -> ScoreReport {
        let mut report = ScoreReport::new(self.config.task);
        for run in &self.runs {
            report.push(run.run, run.result.score());
        }
        report
    }
}

/// Main evaluation pipeline
pub struct EvaluationPipeline {
    config: EvaluationConfig,
}

impl EvaluationPipeline {
    pub fn new(config: EvaluationConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &EvaluationConfig {
        &self.config
    }

    /// Read all inputs, score every run and write the report (and details, if configured)
    pub fn run(&self) -> Result<EvaluationResults> {
        let submission = read_submission(&self.config.submission_path, self.config.task)?;
        let gold = GoldData::load(&self.config)?;

        let mut results = self.evaluate(&submission, &gold)?;
        results.submission_sha256 = Some(archive_digest(&self.config.submission_path)?);

        if let Some(details_path) = &self.config.details_path {
            Self::save_results(&results, details_path)?;
        }

        Ok(results)
    }

    /// Score already loaded runs against gold, writing the report to the configured output path
    pub fn evaluate(&self, submission: &Submission, gold: &GoldData) -> Result<EvaluationResults> {
        let task = self.config.task;
        tracing::info!("Starting evaluation Subtask {}", task.marker().to_uppercase());

        let annotator = match task {
            Task::A => None,
            Task::B => Some(SubgroupAnnotator::new(&gold.identity_terms, self.config.escape_terms)?),
        };

        let mut writer = ReportWriter::create(&self.config.output_path, task)?;
        let mut runs = Vec::new();

        for (run, run_submission) in submission.runs() {
            tracing::info!("{} {}", "*".repeat(20), run);

            let result = match &annotator {
                None => RunScore::A(Self::evaluate_task_a_run(run_submission, gold).map_err(|e| e.in_run(run))?),
                Some(annotator) => RunScore::B(
                    Self::evaluate_task_b_run(run, run_submission, gold, annotator).map_err(|e| e.in_run(run))?,
                ),
            };

            writer.write_score(run, result.score())?;
            runs.push(RunResult { run, result });
        }

        let output = writer.finish()?;
        tracing::info!(
            "Evaluation for Subtask {} completed and saved at: {}",
            task.marker().to_uppercase(),
            output.display()
        );

        Ok(EvaluationResults {
            config: self.config.clone(),
            submission_sha256: None,
            runs,
            timestamp: Utc::now(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        })
    }

    /// Subtask A: consistency, merge, macro-F1 of both levels
    pub fn evaluate_task_a_run(submission: &RunSubmission, gold: &GoldData) -> Result<TaskAScore> {
        check_submission_consistency(&gold.raw, &submission.raw, &Level::ALL, DataKind::Raw)?;

        let joined = merge_on_id(&gold.raw, &submission.raw, DataKind::Raw)?;
        let score = score_task_a(&joined)?;

        for level in &score.levels {
            tracing::info!("taskA_fscore_{}: {}", level.level, format_score(level.report.macro_f1));
            tracing::debug!("{} classification report:\n{}", level.level, level.report.format());
        }

        Ok(score)
    }

    /// Subtask B: bias metrics on synthetic data, overall AUC on raw data
    pub fn evaluate_task_b_run(
        run: RunName,
        submission: &RunSubmission,
        gold: &GoldData,
        annotator: &SubgroupAnnotator,
    ) -> Result<TaskBScore> {
        let synthetic = submission
            .synthetic
            .as_ref()
            .ok_or(EvalError::MissingSyntheticData { run })?;
        let gold_synt = gold.synt.as_ref().ok_or(EvalError::MissingInput("gold synt data"))?;

        check_submission_consistency(gold_synt, synthetic, &[Level::Misogynous], DataKind::Synt)?;
        check_submission_consistency(&gold.raw, &submission.raw, &[Level::Misogynous], DataKind::Raw)?;

        let synt_joined = merge_on_id(gold_synt, synthetic, DataKind::Synt)?;
        let tags = annotator.annotate(synt_joined.texts());
        let bias_metrics = compute_bias_metrics_for_model(
            &synt_joined,
            &tags,
            &Level::Misogynous.pred_column(),
            Level::Misogynous.column(),
        );

        let raw_joined = merge_on_id(&gold.raw, &submission.raw, DataKind::Raw)?;
        let score = score_task_b(&raw_joined, bias_metrics);

        tracing::info!(
            "overall_auc: {}, bias_score: {}",
            format_score(score.overall_auc),
            format_score(score.bias_score)
        );
        tracing::info!("taskB_biasmetric: {}", format_score(score.score));

        Ok(score)
    }

    /// Save results to JSON file
    pub fn save_results(results: &EvaluationResults, output_path: &Path) -> Result<()> {
        if let Some(parent) = output_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(results)?;
        std::fs::write(output_path, json)?;
        tracing::info!("Results saved to {}", output_path.display());
        Ok(())
    }
}
