// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2024 Hyperpolymath

//! Error types for submission scoring
//!
//! Every failure is fatal for the current invocation. Degenerate AUC values are
//! not errors; they travel through the metrics as `f64::NAN`.

use crate::datasets::DataKind;
use crate::submission::{FileRole, RunName};
use thiserror::Error;

/// Crate-wide result alias
pub type Result<T> = std::result::Result<T, EvalError>;

#[derive(Debug, Error)]
pub enum EvalError {
    /// Submission is not a ZIP archive
    #[error("submission is not a ZIP archive: {0}")]
    Format(String),

    #[error("task should be either \"a\" or \"b\", got {0:?}")]
    TaskArgument(String),

    #[error("expected exactly one {role} prediction file for {run}, found {found} (check file names)")]
    RunFileCount {
        run: RunName,
        role: FileRole,
        found: usize,
    },

    #[error("malformed content in {source_name} at line {line}: {message}")]
    Parse {
        source_name: String,
        line: usize,
        message: String,
    },

    #[error("prediction and gold {kind} data have different number of lines (gold={gold}, predicted={predicted})")]
    LengthMismatch {
        kind: DataKind,
        gold: usize,
        predicted: usize,
    },

    #[error("wrong value {value} in {column} prediction column of {kind} data")]
    InvalidLabelValue {
        kind: DataKind,
        column: String,
        value: String,
    },

    #[error("prediction and gold {kind} data have different number of lines or different IDs (gold={gold}, merged={merged})")]
    MergeLengthMismatch {
        kind: DataKind,
        gold: usize,
        merged: usize,
    },

    #[error("missing synthetic prediction data for {run}")]
    MissingSyntheticData { run: RunName },

    /// A path required by the selected task was not supplied
    #[error("missing path for {0}")]
    MissingInput(&'static str),

    #[error("identity term {term:?} does not form a valid word-boundary pattern: {message}")]
    InvalidTermPattern { term: String, message: String },

    /// Failure while scoring a specific run
    #[error("{run}: {source}")]
    Run {
        run: RunName,
        #[source]
        source: Box<EvalError>,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("ZIP error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

impl EvalError {
    pub fn parse(source_name: impl Into<String>, line: usize, message: impl Into<String>) -> Self {
        Self::Parse {
            source_name: source_name.into(),
            line,
            message: message.into(),
        }
    }

    /// Attach the run being scored
    pub fn in_run(self, run: RunName) -> Self {
        Self::Run {
            run,
            source: Box::new(self),
        }
    }

    /// Innermost error, skipping run context
    pub fn root(&self) -> &EvalError {
        match self {
            Self::Run { source, .. } => source.root(),
            other => other,
        }
    }
}
