// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2024 Hyperpolymath

//! Scorer for automatic misogyny identification submissions
//!
//! This crate provides:
//! - Submission archive reading (up to three runs, raw and synthetic predictions)
//! - Consistency checks and id-based merging against gold annotations
//! - Subtask A scoring (macro-F1 over misogyny and aggressiveness)
//! - Subtask B scoring (overall AUC combined with subgroup, BPSN and BNSP AUC)
//! - Score report and JSON details output

pub mod auc;
pub mod bias;
pub mod consistency;
pub mod datasets;
pub mod error;
pub mod merge;
pub mod metrics;
pub mod pipeline;
pub mod report;
pub mod scoring;
pub mod subgroups;
pub mod submission;

pub use bias::{BiasMetricKind, BiasMetricRow, BiasMetrics};
pub use datasets::{DataKind, GoldDataset, Level, PredictionDataset, Task};
pub use error::{EvalError, Result};
pub use metrics::{ClassificationReport, ConfusionMatrix};
pub use pipeline::{EvaluationConfig, EvaluationPipeline, EvaluationResults, GoldData};
pub use report::ScoreReport;
pub use scoring::{RunScore, TaskAScore, TaskBScore};
pub use submission::{RunName, RunSubmission, Submission};
