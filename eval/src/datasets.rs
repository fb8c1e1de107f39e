// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2024 Hyperpolymath

//! Gold and prediction datasets for the misogyny identification task
//!
//! All inputs are tab-separated:
//! - gold raw: header + `id, text, misogynous, aggressiveness`
//! - gold synthetic: header + `id, text, misogynous`
//! - predictions: no header, `id` followed by one integer column per scored level

use crate::error::{EvalError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use std::str::FromStr;

/// Evaluation subtask
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Task {
    /// Misogyny and aggressiveness identification, scored by macro-F1
    A,
    /// Misogyny identification with unintended-bias measurement
    B,
}

impl Task {
    /// Lower-case task letter as it appears in submission file names (`.a.`, `.b.`)
    pub fn marker(&self) -> &'static str {
        match self {
            Task::A => "a",
            Task::B => "b",
        }
    }

    /// Levels carried by a raw prediction file for this task
    pub fn raw_levels(&self) -> &'static [Level] {
        match self {
            Task::A => &[Level::Misogynous, Level::Aggressiveness],
            Task::B => &[Level::Misogynous],
        }
    }

    /// Header line of the score report
    pub fn report_header(&self) -> &'static str {
        match self {
            Task::A => "run_subtaskA\tscore",
            Task::B => "run_subtaskB\tscore",
        }
    }
}

impl FromStr for Task {
    type Err = EvalError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "a" => Ok(Task::A),
            "b" => Ok(Task::B),
            _ => Err(EvalError::TaskArgument(s.to_string())),
        }
    }
}

impl fmt::Display for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.marker())
    }
}

/// A binary label column
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    Misogynous,
    Aggressiveness,
}

impl Level {
    pub const ALL: [Level; 2] = [Level::Misogynous, Level::Aggressiveness];

    /// Gold column name
    pub fn column(&self) -> &'static str {
        match self {
            Level::Misogynous => "misogynous",
            Level::Aggressiveness => "aggressiveness",
        }
    }

    /// Column name of the predicted value after a merge
    pub fn pred_column(&self) -> String {
        format!("{}{}", self.column(), PRED_SUFFIX)
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.column())
    }
}

/// Suffix given to prediction-origin columns on a merge
pub const PRED_SUFFIX: &str = "_pred";

/// Which gold/prediction pair a check refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataKind {
    Raw,
    Synt,
}

impl fmt::Display for DataKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataKind::Raw => f.write_str("raw"),
            DataKind::Synt => f.write_str("synt"),
        }
    }
}

/// One annotated gold row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GoldRecord {
    pub id: String,
    pub text: String,
    pub misogynous: i64,
    /// Only present in the raw gold variant
    pub aggressiveness: Option<i64>,
}

impl GoldRecord {
    pub fn label(&self, level: Level) -> Option<i64> {
        match level {
            Level::Misogynous => Some(self.misogynous),
            Level::Aggressiveness => self.aggressiveness,
        }
    }
}

/// One submitted prediction row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionRecord {
    pub id: String,
    pub misogynous: i64,
    /// Only present in Task A raw submissions
    pub aggressiveness: Option<i64>,
}

impl PredictionRecord {
    pub fn label(&self, level: Level) -> Option<i64> {
        match level {
            Level::Misogynous => Some(self.misogynous),
            Level::Aggressiveness => self.aggressiveness,
        }
    }
}

/// Gold annotations, immutable once loaded
#[derive(Debug, Clone, Default)]
pub struct GoldDataset {
    records: Vec<GoldRecord>,
}

impl GoldDataset {
    pub fn from_records(records: Vec<GoldRecord>) -> Self {
        Self { records }
    }

    /// Load a gold TSV file (header line present)
    pub fn load(path: &Path, kind: DataKind) -> Result<Self> {
        let file = File::open(path)?;
        let dataset = Self::from_reader(file, &path.display().to_string(), kind)?;
        tracing::info!("Loaded {} gold data: {} rows from {}", kind, dataset.len(), path.display());
        Ok(dataset)
    }

    /// Parse gold rows; raw gold carries an aggressiveness column, synthetic gold does not
    pub fn from_reader<R: Read>(reader: R, source_name: &str, kind: DataKind) -> Result<Self> {
        let expected = match kind {
            DataKind::Raw => 4,
            DataKind::Synt => 3,
        };
        let mut reader = tsv_reader(true).from_reader(reader);
        let mut records = Vec::new();

        for result in reader.records() {
            let record = result.map_err(|e| csv_error(source_name, e))?;
            let line = record_line(&record);

            if record.len() < expected {
                return Err(EvalError::parse(
                    source_name,
                    line,
                    format!("expected {} columns, found {}", expected, record.len()),
                ));
            }

            let aggressiveness = match kind {
                DataKind::Raw => Some(parse_label(&record[3], source_name, line)?),
                DataKind::Synt => None,
            };

            records.push(GoldRecord {
                id: record[0].to_string(),
                text: record[1].to_string(),
                misogynous: parse_label(&record[2], source_name, line)?,
                aggressiveness,
            });
        }

        Ok(Self { records })
    }

    pub fn records(&self) -> &[GoldRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Distinct values present in a gold label column
    pub fn observed_values(&self, level: Level) -> BTreeSet<i64> {
        self.records.iter().filter_map(|r| r.label(level)).collect()
    }
}

/// Predictions of one submitted run file, immutable once loaded
#[derive(Debug, Clone, Default)]
pub struct PredictionDataset {
    records: Vec<PredictionRecord>,
}

impl PredictionDataset {
    pub fn from_records(records: Vec<PredictionRecord>) -> Self {
        Self { records }
    }

    /// Parse a headerless prediction file with an id column followed by `levels`
    pub fn from_reader<R: Read>(reader: R, source_name: &str, levels: &[Level]) -> Result<Self> {
        let expected = levels.len() + 1;
        let mut reader = tsv_reader(false).from_reader(reader);
        let mut records = Vec::new();

        for result in reader.records() {
            let record = result.map_err(|e| csv_error(source_name, e))?;
            let line = record_line(&record);

            if record.len() != expected {
                return Err(EvalError::parse(
                    source_name,
                    line,
                    format!("expected {} columns, found {}", expected, record.len()),
                ));
            }

            let mut prediction = PredictionRecord {
                id: record[0].to_string(),
                misogynous: 0,
                aggressiveness: None,
            };
            for (offset, level) in levels.iter().enumerate() {
                let value = parse_label(&record[offset + 1], source_name, line)?;
                match level {
                    Level::Misogynous => prediction.misogynous = value,
                    Level::Aggressiveness => prediction.aggressiveness = Some(value),
                }
            }
            records.push(prediction);
        }

        Ok(Self { records })
    }

    pub fn records(&self) -> &[PredictionRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Read the identity-terms list, one term per line
pub fn load_identity_terms(path: &Path) -> Result<Vec<String>> {
    let content = std::fs::read_to_string(path)?;
    let terms = parse_identity_terms(&content);
    tracing::info!("Loaded {} identity terms from {}", terms.len(), path.display());
    Ok(terms)
}

pub fn parse_identity_terms(content: &str) -> Vec<String> {
    content.lines().map(str::to_string).collect()
}

fn tsv_reader(has_headers: bool) -> csv::ReaderBuilder {
    let mut builder = csv::ReaderBuilder::new();
    builder.delimiter(b'\t').has_headers(has_headers).flexible(true);
    builder
}

fn record_line(record: &csv::StringRecord) -> usize {
    record.position().map(|p| p.line() as usize).unwrap_or(0)
}

fn csv_error(source_name: &str, err: csv::Error) -> EvalError {
    let line = err.position().map(|p| p.line() as usize).unwrap_or(0);
    EvalError::parse(source_name, line, err.to_string())
}

fn parse_label(field: &str, source_name: &str, line: usize) -> Result<i64> {
    field
        .trim()
        .parse::<i64>()
        .map_err(|_| EvalError::parse(source_name, line, format!("invalid integer label {:?}", field)))
}

#[cfg(test)]
mod tests {
    use super::*;

    const GOLD_RAW: &str = "id\ttext\tmisogynous\taggressiveness\n\
        1\tYou are ugly!!\t1\t1\n\
        2\tnice day\t0\t0\n";

    #[test]
    fn test_task_parsing() {
        assert_eq!("a".parse::<Task>().unwrap(), Task::A);
        assert_eq!("B".parse::<Task>().unwrap(), Task::B);
        assert!(matches!("c".parse::<Task>(), Err(EvalError::TaskArgument(_))));
    }

    #[test]
    fn test_load_gold_raw() {
        let gold = GoldDataset::from_reader(GOLD_RAW.as_bytes(), "gold.tsv", DataKind::Raw).unwrap();

        assert_eq!(gold.len(), 2);
        assert_eq!(gold.records()[0].text, "You are ugly!!");
        assert_eq!(gold.records()[0].aggressiveness, Some(1));
        assert_eq!(gold.observed_values(Level::Misogynous), BTreeSet::from([0, 1]));
    }

    #[test]
    fn test_load_gold_synt_has_no_aggressiveness() {
        let content = "id\ttext\tmisogynous\ns1\twomen are smart\t0\n";
        let gold = GoldDataset::from_reader(content.as_bytes(), "synt.tsv", DataKind::Synt).unwrap();

        assert_eq!(gold.records()[0].aggressiveness, None);
        assert!(gold.observed_values(Level::Aggressiveness).is_empty());
    }

    #[test]
    fn test_load_predictions_task_a() {
        let content = "1\t1\t0\n2\t0\t0\n";
        let preds = PredictionDataset::from_reader(content.as_bytes(), "run1", Task::A.raw_levels()).unwrap();

        assert_eq!(preds.len(), 2);
        assert_eq!(preds.records()[0].aggressiveness, Some(0));
    }

    #[test]
    fn test_prediction_column_count_mismatch() {
        let content = "1\t1\n";
        let err = PredictionDataset::from_reader(content.as_bytes(), "run1", Task::A.raw_levels()).unwrap_err();
        assert!(matches!(err, EvalError::Parse { line: 1, .. }));
    }

    #[test]
    fn test_prediction_non_integer_label() {
        let content = "1\tyes\n";
        let err = PredictionDataset::from_reader(content.as_bytes(), "run1", Task::B.raw_levels()).unwrap_err();
        assert!(err.to_string().contains("invalid integer label"));
    }

    #[test]
    fn test_identity_terms_lines() {
        let terms = parse_identity_terms("donna\r\nfemmina\nragazza\n");
        assert_eq!(terms, vec!["donna", "femmina", "ragazza"]);
    }
}
