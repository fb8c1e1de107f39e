// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2024 Hyperpolymath

//! Final per-run scores
//!
//! - Subtask A: mean of the macro-F1 of the misogynous and aggressiveness levels
//! - Subtask B: mean of the overall AUC and the bias score, where the bias score
//!   is the flat mean of every subgroup's three bias AUC values

use crate::auc::roc_auc_labels;
use crate::bias::BiasMetrics;
use crate::datasets::{DataKind, Level};
use crate::error::{EvalError, Result};
use crate::merge::JoinedDataset;
use crate::metrics::{mean, ClassificationReport};
use crate::report::nan_as_null;
use serde::{Deserialize, Serialize};

/// Metrics of one Task A level
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LevelScore {
    pub level: Level,
    pub report: ClassificationReport,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskAScore {
    pub levels: Vec<LevelScore>,
    pub score: f64,
}

impl TaskAScore {
    pub fn f1(&self, level: Level) -> Option<f64> {
        self.levels.iter().find(|l| l.level == level).map(|l| l.report.macro_f1)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskBScore {
    #[serde(with = "nan_as_null")]
    pub overall_auc: f64,
    #[serde(with = "nan_as_null")]
    pub bias_score: f64,
    #[serde(with = "nan_as_null")]
    pub score: f64,
    pub bias_metrics: BiasMetrics,
}

/// Score of one run for either task
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "task", rename_all = "lowercase")]
pub enum RunScore {
    A(TaskAScore),
    B(TaskBScore),
}

impl RunScore {
    pub fn score(&self) -> f64 {
        match self {
            RunScore::A(a) => a.score,
            RunScore::B(b) => b.score,
        }
    }
}

/// Macro-F1 of both levels on the merged raw data
pub fn score_task_a(joined: &JoinedDataset) -> Result<TaskAScore> {
    let levels = Level::ALL
        .iter()
        .map(|&level| {
            let truth = level_column(joined, level.column())?;
            let predicted = level_column(joined, &level.pred_column())?;
            Ok(LevelScore {
                level,
                report: ClassificationReport::from_predictions(&predicted, &truth),
            })
        })
        .collect::<Result<Vec<_>>>()?;

    let score = mean(levels.iter().map(|l| l.report.macro_f1));
    Ok(TaskAScore { levels, score })
}

fn level_column(joined: &JoinedDataset, column: &str) -> Result<Vec<i64>> {
    joined.column(column).ok_or_else(|| EvalError::InvalidLabelValue {
        kind: DataKind::Raw,
        column: column.to_string(),
        value: "<missing>".to_string(),
    })
}

/// AUC of the predicted column against gold misogyny over the whole merged raw data
pub fn calculate_overall_auc(joined: &JoinedDataset, model: &str) -> f64 {
    let labels: Vec<i64> = joined.rows().iter().map(|row| row.gold.misogynous).collect();
    let predictions: Vec<i64> = joined
        .rows()
        .iter()
        .map(|row| row.value(model).unwrap_or_default())
        .collect();
    roc_auc_labels(&labels, &predictions)
}

/// Flat mean of all subgroup × metric values; NaN if any is NaN or there are none
pub fn bias_score(bias: &BiasMetrics) -> f64 {
    mean(bias.flat_values())
}

pub fn final_metric(bias_score: f64, overall_auc: f64) -> f64 {
    mean([overall_auc, bias_score])
}

/// Combine the raw overall AUC with the synthetic-data bias metrics
pub fn score_task_b(raw_joined: &JoinedDataset, bias_metrics: BiasMetrics) -> TaskBScore {
    let overall_auc = calculate_overall_auc(raw_joined, &bias_metrics.model);
    let bias_score = bias_score(&bias_metrics);
    TaskBScore {
        overall_auc,
        bias_score,
        score: final_metric(bias_score, overall_auc),
        bias_metrics,
    }
}
