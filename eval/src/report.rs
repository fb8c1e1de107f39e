// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2024 Hyperpolymath

//! Score report: `run_subtaskX<TAB>score` followed by one line per run
//!
//! [`ReportWriter`] stages the report in a temporary file beside the
//! destination. The file only replaces the destination in [`ReportWriter::finish`];
//! dropping the writer on an error path closes and removes it.

use crate::datasets::Task;
use crate::error::Result;
use crate::submission::RunName;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// Scores of all evaluated runs, in canonical run order
#[derive(Debug, Clone, PartialEq)]
pub struct ScoreReport {
    pub task: Task,
    entries: Vec<(RunName, f64)>,
}

impl ScoreReport {
    pub fn new(task: Task) -> Self {
        Self {
            task,
            entries: Vec::new(),
        }
    }

    pub fn push(&mut self, run: RunName, score: f64) {
        self.entries.push((run, score));
    }

    pub fn entries(&self) -> &[(RunName, f64)] {
        &self.entries
    }

    pub fn score(&self, run: RunName) -> Option<f64> {
        self.entries.iter().find(|(r, _)| *r == run).map(|(_, s)| *s)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Render the full report as written to disk
    pub fn to_tsv(&self) -> String {
        let mut out = format!("{}\n", self.task.report_header());
        for (run, score) in &self.entries {
            out.push_str(&format!("{}\t{}\n", run, format_score(*score)));
        }
        out
    }
}

/// Shortest round-trip float text, integral values keep a `.0`: `1.0`, `0.75`, `nan`
pub fn format_score(score: f64) -> String {
    if score.is_nan() {
        "nan".to_string()
    } else if score.is_infinite() {
        let sign = if score > 0.0 { "" } else { "-" };
        format!("{}inf", sign)
    } else if score.fract() == 0.0 {
        format!("{:.1}", score)
    } else {
        format!("{}", score)
    }
}

/// Incremental report writer backed by a temporary file
pub struct ReportWriter {
    destination: PathBuf,
    writer: BufWriter<NamedTempFile>,
}

impl ReportWriter {
    /// Stage a new report for `destination` and write its header
    pub fn create(destination: &Path, task: Task) -> Result<Self> {
        let dir = match destination.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        let file = NamedTempFile::new_in(dir)?;
        let mut writer = BufWriter::new(file);
        writeln!(writer, "{}", task.report_header())?;

        Ok(Self {
            destination: destination.to_path_buf(),
            writer,
        })
    }

    pub fn write_score(&mut self, run: RunName, score: f64) -> Result<()> {
        writeln!(self.writer, "{}\t{}", run, format_score(score))?;
        Ok(())
    }

    /// Flush and move the staged report into place
    pub fn finish(self) -> Result<PathBuf> {
        let file = self.writer.into_inner().map_err(|e| e.into_error())?;
        file.as_file().sync_all()?;
        file.persist(&self.destination).map_err(|e| e.error)?;
        Ok(self.destination)
    }
}

/// Serialize `NaN` as JSON `null` and back
pub(crate) mod nan_as_null {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
        if value.is_nan() {
            serializer.serialize_none()
        } else {
            serializer.serialize_f64(*value)
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
        Ok(Option::<f64>::deserialize(deserializer)?.unwrap_or(f64::NAN))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_format_score() {
        assert_eq!(format_score(1.0), "1.0");
        assert_eq!(format_score(0.0), "0.0");
        assert_eq!(format_score(0.75), "0.75");
        assert_eq!(format_score(5.0 / 6.0), "0.8333333333333334");
        assert_eq!(format_score(f64::NAN), "nan");
    }

    #[test]
    fn test_report_tsv() {
        let mut report = ScoreReport::new(Task::B);
        report.push(RunName::Run1, 1.0);
        report.push(RunName::Run3, f64::NAN);

        assert_eq!(report.to_tsv(), "run_subtaskB\tscore\nrun1\t1.0\nrun3\tnan\n");
        assert_eq!(report.score(RunName::Run1), Some(1.0));
        assert_eq!(report.score(RunName::Run2), None);
    }

    #[test]
    fn test_writer_persists_on_finish() {
        let dir = tempfile::tempdir().unwrap();
        let destination = dir.path().join("result.tsv");

        let mut writer = ReportWriter::create(&destination, Task::A).unwrap();
        writer.write_score(RunName::Run1, 0.5).unwrap();
        assert!(!destination.exists());

        writer.finish().unwrap();
        let content = std::fs::read_to_string(&destination).unwrap();
        assert_eq!(content, "run_subtaskA\tscore\nrun1\t0.5\n");
    }

    #[test]
    fn test_writer_dropped_leaves_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let destination = dir.path().join("result.tsv");

        {
            let mut writer = ReportWriter::create(&destination, Task::A).unwrap();
            writer.write_score(RunName::Run1, 0.5).unwrap();
        }

        assert!(!destination.exists());
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }
}
