// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2024 Hyperpolymath

//! Id-based join of gold and predicted rows

use crate::datasets::{DataKind, GoldDataset, GoldRecord, Level, PredictionDataset, PredictionRecord, PRED_SUFFIX};
use crate::error::{EvalError, Result};
use std::collections::HashMap;

/// A gold row paired with the prediction sharing its id
#[derive(Debug, Clone, PartialEq)]
pub struct JoinedRow {
    pub gold: GoldRecord,
    pub predicted: PredictionRecord,
}

impl JoinedRow {
    pub fn id(&self) -> &str {
        &self.gold.id
    }

    pub fn text(&self) -> &str {
        &self.gold.text
    }

    /// Value of a column by name; prediction-origin columns carry the `_pred` suffix
    pub fn value(&self, column: &str) -> Option<i64> {
        let (name, from_prediction) = match column.strip_suffix(PRED_SUFFIX) {
            Some(base) => (base, true),
            None => (column, false),
        };
        let level = Level::ALL.into_iter().find(|l| l.column() == name)?;
        if from_prediction {
            self.predicted.label(level)
        } else {
            self.gold.label(level)
        }
    }
}

/// Result of joining predictions onto gold, in gold row order
#[derive(Debug, Clone, Default)]
pub struct JoinedDataset {
    rows: Vec<JoinedRow>,
}

impl JoinedDataset {
    pub fn from_rows(rows: Vec<JoinedRow>) -> Self {
        Self { rows }
    }

    pub fn rows(&self) -> &[JoinedRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Whole column by name, `None` if the name is unknown or any row lacks the value
    pub fn column(&self, name: &str) -> Option<Vec<i64>> {
        self.rows.iter().map(|row| row.value(name)).collect()
    }

    /// `(id, text)` pairs for subgroup tagging
    pub fn texts(&self) -> impl Iterator<Item = (&str, &str)> + Clone {
        self.rows.iter().map(|row| (row.id(), row.text()))
    }
}

/// Inner join on id without the length check
pub fn inner_join(gold: &GoldDataset, predicted: &PredictionDataset) -> JoinedDataset {
    let mut by_id: HashMap<&str, Vec<&PredictionRecord>> = HashMap::new();
    for record in predicted.records() {
        by_id.entry(record.id.as_str()).or_default().push(record);
    }

    let rows = gold
        .records()
        .iter()
        .flat_map(|gold_record| {
            by_id
                .get(gold_record.id.as_str())
                .into_iter()
                .flatten()
                .map(move |&prediction| JoinedRow {
                    gold: gold_record.clone(),
                    predicted: prediction.clone(),
                })
        })
        .collect();

    JoinedDataset { rows }
}

/// A join must keep exactly one row per gold row.
///
/// Rows come out in gold order, so a duplicated prediction id that happens to
/// replace a missing one still shows up as an id sequence differing from gold.
pub fn check_merge_length(joined: &JoinedDataset, gold: &GoldDataset, kind: DataKind) -> Result<()> {
    let aligned = joined.len() == gold.len()
        && joined
            .rows()
            .iter()
            .zip(gold.records())
            .all(|(row, gold_record)| row.id() == gold_record.id);
    if !aligned {
        return Err(EvalError::MergeLengthMismatch {
            kind,
            gold: gold.len(),
            merged: joined.len(),
        });
    }
    Ok(())
}

/// Join predictions onto gold by id and verify no row was lost or duplicated
pub fn merge_on_id(gold: &GoldDataset, predicted: &PredictionDataset, kind: DataKind) -> Result<JoinedDataset> {
    let joined = inner_join(gold, predicted);
    check_merge_length(&joined, gold, kind)?;
    tracing::debug!("Merged {} {} rows", joined.len(), kind);
    Ok(joined)
}
