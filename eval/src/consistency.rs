// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2024 Hyperpolymath

//! Submission/gold consistency checks run before any merge

use crate::datasets::{DataKind, GoldDataset, Level, PredictionDataset};
use crate::error::{EvalError, Result};

/// Check that `predicted` has as many rows as `gold` and only uses label
/// values observed in the matching gold column.
pub fn check_submission_consistency(
    gold: &GoldDataset,
    predicted: &PredictionDataset,
    levels: &[Level],
    kind: DataKind,
) -> Result<()> {
    if gold.len() != predicted.len() {
        return Err(EvalError::LengthMismatch {
            kind,
            gold: gold.len(),
            predicted: predicted.len(),
        });
    }

    for &level in levels {
        let observed = gold.observed_values(level);
        for record in predicted.records() {
            match record.label(level) {
                Some(value) if observed.contains(&value) => {}
                Some(value) => {
                    return Err(EvalError::InvalidLabelValue {
                        kind,
                        column: level.column().to_string(),
                        value: value.to_string(),
                    });
                }
                None => {
                    return Err(EvalError::InvalidLabelValue {
                        kind,
                        column: level.column().to_string(),
                        value: "<missing>".to_string(),
                    });
                }
            }
        }
    }

    tracing::debug!("{} predictions consistent with gold ({} rows)", kind, gold.len());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::datasets::{GoldRecord, PredictionRecord};

    fn gold(labels: &[i64]) -> GoldDataset {
        GoldDataset::from_records(
            labels
                .iter()
                .enumerate()
                .map(|(i, &l)| GoldRecord {
                    id: i.to_string(),
                    text: String::new(),
                    misogynous: l,
                    aggressiveness: Some(0),
                })
                .collect(),
        )
    }

    fn preds(labels: &[i64]) -> PredictionDataset {
        PredictionDataset::from_records(
            labels
                .iter()
                .enumerate()
                .map(|(i, &l)| PredictionRecord {
                    id: i.to_string(),
                    misogynous: l,
                    aggressiveness: None,
                })
                .collect(),
        )
    }

    #[test]
    fn test_consistent_submission() {
        assert!(check_submission_consistency(&gold(&[0, 1, 1]), &preds(&[1, 1, 0]), &[Level::Misogynous], DataKind::Raw).is_ok());
    }

    #[test]
    fn test_length_mismatch() {
        let err = check_submission_consistency(&gold(&[0, 1]), &preds(&[0]), &[Level::Misogynous], DataKind::Raw).unwrap_err();
        assert!(matches!(err, EvalError::LengthMismatch { gold: 2, predicted: 1, .. }));
    }

    #[test]
    fn test_value_outside_binary_set() {
        let err = check_submission_consistency(&gold(&[0, 1]), &preds(&[0, 2]), &[Level::Misogynous], DataKind::Synt).unwrap_err();
        match err {
            EvalError::InvalidLabelValue { kind, column, value } => {
                assert_eq!(kind, DataKind::Synt);
                assert_eq!(column, "misogynous");
                assert_eq!(value, "2");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_value_must_be_observed_in_gold() {
        // 1 is a valid binary label but gold only ever uses 0
        let err = check_submission_consistency(&gold(&[0, 0]), &preds(&[0, 1]), &[Level::Misogynous], DataKind::Raw).unwrap_err();
        assert!(matches!(err, EvalError::InvalidLabelValue { .. }));
    }

    #[test]
    fn test_missing_level_column() {
        let err = check_submission_consistency(&gold(&[0]), &preds(&[0]), &[Level::Aggressiveness], DataKind::Raw).unwrap_err();
        assert!(matches!(err, EvalError::InvalidLabelValue { ref value, .. } if value == "<missing>"));
    }
}
