// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2024 Hyperpolymath

//! Unintended-bias metrics per identity-term subgroup
//!
//! For every subgroup three AUC variants are computed:
//! - subgroup AUC: rows inside the subgroup only
//! - BPSN (background positive, subgroup negative): low values mean the model
//!   over-predicts the positive class for the subgroup
//! - BNSP (background negative, subgroup positive): low values mean the model
//!   under-predicts the positive class for the subgroup
//!
//! Single-class selections give `NaN` (see [`crate::auc::roc_auc`]).

use crate::auc::roc_auc_labels;
use crate::merge::{JoinedDataset, JoinedRow};
use crate::report::nan_as_null;
use crate::subgroups::{SubgroupTag, SubgroupTags};
use serde::{Deserialize, Serialize};
use std::fmt;

const POSITIVE_LABEL: i64 = 1;

/// The three bias AUC variants
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BiasMetricKind {
    SubgroupAuc,
    BpsnAuc,
    BnspAuc,
}

impl BiasMetricKind {
    pub const ALL: [BiasMetricKind; 3] = [
        BiasMetricKind::SubgroupAuc,
        BiasMetricKind::BpsnAuc,
        BiasMetricKind::BnspAuc,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            BiasMetricKind::SubgroupAuc => "subgroup_auc",
            BiasMetricKind::BpsnAuc => "bpsn_auc",
            BiasMetricKind::BnspAuc => "bnsp_auc",
        }
    }

    /// Column name of this metric for a scored column, e.g. `misogynous_pred_bpsn_auc`
    pub fn column_name(&self, model: &str) -> String {
        format!("{}_{}", model, self.as_str())
    }
}

impl fmt::Display for BiasMetricKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Bias metrics of one subgroup
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BiasMetricRow {
    pub subgroup: String,
    pub subset_size: usize,
    #[serde(with = "nan_as_null")]
    pub subgroup_auc: f64,
    #[serde(with = "nan_as_null")]
    pub bpsn_auc: f64,
    #[serde(with = "nan_as_null")]
    pub bnsp_auc: f64,
}

impl BiasMetricRow {
    pub fn get(&self, kind: BiasMetricKind) -> f64 {
        match kind {
            BiasMetricKind::SubgroupAuc => self.subgroup_auc,
            BiasMetricKind::BpsnAuc => self.bpsn_auc,
            BiasMetricKind::BnspAuc => self.bnsp_auc,
        }
    }

    /// The three metric values in [`BiasMetricKind::ALL`] order
    pub fn values(&self) -> [f64; 3] {
        BiasMetricKind::ALL.map(|kind| self.get(kind))
    }
}

/// Bias metrics of every subgroup, in term order
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BiasMetrics {
    /// Scored column the metrics were computed for
    pub model: String,
    pub rows: Vec<BiasMetricRow>,
}

impl BiasMetrics {
    /// All subgroup × metric values as one flat sequence
    pub fn flat_values(&self) -> impl Iterator<Item = f64> + '_ {
        self.rows.iter().flat_map(|row| row.values())
    }
}

/// Compute the bias metrics of `model` against `label_col` for every subgroup.
///
/// Both columns must be present on every joined row; a row missing either one
/// is left out of every selection.
pub fn compute_bias_metrics_for_model(
    dataset: &JoinedDataset,
    tags: &SubgroupTags,
    model: &str,
    label_col: &str,
) -> BiasMetrics {
    let scored: Vec<(&JoinedRow, i64, i64)> = dataset
        .rows()
        .iter()
        .filter_map(|row| Some((row, row.value(label_col)?, row.value(model)?)))
        .collect();

    let rows = tags
        .iter()
        .map(|tag| compute_bias_metrics_for_subgroup(&scored, tag))
        .collect();

    BiasMetrics {
        model: model.to_string(),
        rows,
    }
}

fn compute_bias_metrics_for_subgroup(scored: &[(&JoinedRow, i64, i64)], tag: &SubgroupTag) -> BiasMetricRow {
    let row = BiasMetricRow {
        subgroup: tag.term.clone(),
        subset_size: scored.iter().filter(|(row, _, _)| tag.contains(row.id())).count(),
        subgroup_auc: auc_where(scored, tag, |in_subgroup, _| in_subgroup),
        bpsn_auc: auc_where(scored, tag, |in_subgroup, positive| in_subgroup != positive),
        bnsp_auc: auc_where(scored, tag, |in_subgroup, positive| in_subgroup == positive),
    };

    tracing::debug!(
        "subgroup {:?}: size={} subgroup_auc={} bpsn_auc={} bnsp_auc={}",
        row.subgroup,
        row.subset_size,
        row.subgroup_auc,
        row.bpsn_auc,
        row.bnsp_auc
    );
    row
}

/// AUC over the rows whose (subgroup membership, positive label) pair passes `select`
fn auc_where(scored: &[(&JoinedRow, i64, i64)], tag: &SubgroupTag, select: impl Fn(bool, bool) -> bool) -> f64 {
    let (labels, predictions): (Vec<i64>, Vec<i64>) = scored
        .iter()
        .filter(|(row, label, _)| select(tag.contains(row.id()), *label == POSITIVE_LABEL))
        .map(|(_, label, prediction)| (*label, *prediction))
        .unzip();
    roc_auc_labels(&labels, &predictions)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::datasets::{GoldRecord, PredictionRecord};
    use crate::subgroups::SubgroupAnnotator;

    fn joined(rows: &[(&str, i64, i64)]) -> JoinedDataset {
        JoinedDataset::from_rows(
            rows.iter()
                .enumerate()
                .map(|(i, &(text, label, prediction))| JoinedRow {
                    gold: GoldRecord {
                        id: format!("s{}", i),
                        text: text.to_string(),
                        misogynous: label,
                        aggressiveness: None,
                    },
                    predicted: PredictionRecord {
                        id: format!("s{}", i),
                        misogynous: prediction,
                        aggressiveness: None,
                    },
                })
                .collect(),
        )
    }

    fn tags(dataset: &JoinedDataset, terms: &[&str]) -> SubgroupTags {
        let terms: Vec<String> = terms.iter().map(|s| s.to_string()).collect();
        SubgroupAnnotator::new(&terms, false).unwrap().annotate(dataset.texts())
    }

    #[test]
    fn test_perfect_predictions() {
        let dataset = joined(&[
            ("women are stupid", 1, 1),
            ("women are smart", 0, 0),
            ("girls are stupid", 1, 1),
            ("girls are smart", 0, 0),
        ]);
        let metrics = compute_bias_metrics_for_model(&dataset, &tags(&dataset, &["women", "girls"]), "misogynous_pred", "misogynous");

        assert_eq!(metrics.rows.len(), 2);
        for row in &metrics.rows {
            assert_eq!(row.subset_size, 2);
            assert_eq!(row.values(), [1.0, 1.0, 1.0]);
        }
    }

    #[test]
    fn test_cross_aucs_detect_subgroup_bias() {
        // every "women" text is flagged, whatever its label
        let dataset = joined(&[
            ("women are stupid", 1, 1),
            ("women are smart", 0, 1),
            ("men are stupid", 1, 1),
            ("men are smart", 0, 0),
        ]);
        let metrics = compute_bias_metrics_for_model(&dataset, &tags(&dataset, &["women"]), "misogynous_pred", "misogynous");
        let row = &metrics.rows[0];

        assert_eq!(row.subgroup_auc, 0.5);
        // subgroup negative (pred 1) vs background positive (pred 1)
        assert_eq!(row.bpsn_auc, 0.5);
        // subgroup positive (pred 1) vs background negative (pred 0)
        assert_eq!(row.bnsp_auc, 1.0);
    }

    #[test]
    fn test_single_class_subgroup_is_nan() {
        let dataset = joined(&[
            ("women are stupid", 1, 1),
            ("men are smart", 0, 0),
            ("men are stupid", 1, 0),
        ]);
        let metrics = compute_bias_metrics_for_model(&dataset, &tags(&dataset, &["women", "children"]), "misogynous_pred", "misogynous");

        assert_eq!(metrics.rows[0].subset_size, 1);
        assert!(metrics.rows[0].subgroup_auc.is_nan());
        // no subgroup negatives, only background positives
        assert!(metrics.rows[0].bpsn_auc.is_nan());
        assert_eq!(metrics.rows[0].bnsp_auc, 1.0);

        // empty subgroup
        assert_eq!(metrics.rows[1].subset_size, 0);
        assert!(metrics.rows[1].subgroup_auc.is_nan());
    }

    #[test]
    fn test_rows_follow_term_order() {
        let dataset = joined(&[("b a", 1, 1), ("c", 0, 0)]);
        let metrics = compute_bias_metrics_for_model(&dataset, &tags(&dataset, &["c", "a", "b"]), "misogynous_pred", "misogynous");
        let order: Vec<&str> = metrics.rows.iter().map(|r| r.subgroup.as_str()).collect();
        assert_eq!(order, vec!["c", "a", "b"]);
    }

    #[test]
    fn test_metric_column_names() {
        assert_eq!(BiasMetricKind::BpsnAuc.column_name("misogynous_pred"), "misogynous_pred_bpsn_auc");
    }

    #[test]
    fn test_nan_serializes_as_null() {
        let row = BiasMetricRow {
            subgroup: "donna".to_string(),
            subset_size: 0,
            subgroup_auc: f64::NAN,
            bpsn_auc: 0.5,
            bnsp_auc: 1.0,
        };
        let json = serde_json::to_value(&row).unwrap();
        assert!(json["subgroup_auc"].is_null());
        assert_eq!(json["bpsn_auc"], 0.5);
    }
}
