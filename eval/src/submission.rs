// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2024 Hyperpolymath

//! Submission archive reader
//!
//! A submission is a ZIP archive holding up to three runs. Entry names carry
//! the run token (`run1`..`run3`), the task marker (`.a.` / `.b.`) and the
//! file role (`.r.` raw, `.s.` synthetic). Entries under `__MACOSX` are ignored.

use crate::datasets::{Level, PredictionDataset, Task};
use crate::error::{EvalError, Result};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::fmt;
use std::fs::File;
use std::io::Read;
use std::path::Path;

const PLATFORM_METADATA_DIR: &str = "__MACOSX";

/// Run slot of a submission, ordered run1 < run2 < run3
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunName {
    Run1,
    Run2,
    Run3,
}

impl RunName {
    pub const ALL: [RunName; 3] = [RunName::Run1, RunName::Run2, RunName::Run3];

    pub fn as_str(&self) -> &'static str {
        match self {
            RunName::Run1 => "run1",
            RunName::Run2 => "run2",
            RunName::Run3 => "run3",
        }
    }
}

impl fmt::Display for RunName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Role of a prediction file within a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileRole {
    Raw,
    Synthetic,
}

impl FileRole {
    fn marker(&self) -> &'static str {
        match self {
            FileRole::Raw => ".r.",
            FileRole::Synthetic => ".s.",
        }
    }
}

impl fmt::Display for FileRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FileRole::Raw => f.write_str("raw"),
            FileRole::Synthetic => f.write_str("synthetic"),
        }
    }
}

/// Prediction sets of one run
#[derive(Debug, Clone, Default)]
pub struct RunSubmission {
    pub raw: PredictionDataset,
    /// Required for Task B only
    pub synthetic: Option<PredictionDataset>,
}

/// Runs found in a submission, iterated in canonical order
#[derive(Debug, Clone, Default)]
pub struct Submission {
    runs: BTreeMap<RunName, RunSubmission>,
}

impl Submission {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, run: RunName, submission: RunSubmission) {
        self.runs.insert(run, submission);
    }

    pub fn get(&self, run: RunName) -> Option<&RunSubmission> {
        self.runs.get(&run)
    }

    pub fn runs(&self) -> impl Iterator<Item = (RunName, &RunSubmission)> {
        self.runs.iter().map(|(run, submission)| (*run, submission))
    }

    pub fn len(&self) -> usize {
        self.runs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.runs.is_empty()
    }
}

/// Archive entries chosen for one run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunFiles {
    pub run: RunName,
    pub raw: String,
    pub synthetic: Option<String>,
}

/// Pick the raw (and for Task B synthetic) entry of every run present in `names`
pub fn select_run_files(names: &[String], task: Task) -> Result<Vec<RunFiles>> {
    let task_marker = format!(".{}.", task.marker());
    let candidates: Vec<&String> = names
        .iter()
        .filter(|name| !name.ends_with('/'))
        .filter(|name| name.contains("run"))
        .filter(|name| name.to_lowercase().contains(&task_marker))
        .filter(|name| !name.contains(PLATFORM_METADATA_DIR))
        .collect();

    let mut selected = Vec::new();

    for run in RunName::ALL {
        let run_entries: Vec<&String> = candidates
            .iter()
            .copied()
            .filter(|name| name.contains(run.as_str()))
            .collect();
        if run_entries.is_empty() {
            continue;
        }

        let raw = single_entry(&run_entries, run, FileRole::Raw)?;
        let synthetic = match task {
            Task::A => None,
            Task::B => Some(single_entry(&run_entries, run, FileRole::Synthetic)?),
        };

        tracing::debug!("{}: raw={} synthetic={:?}", run, raw, synthetic);
        selected.push(RunFiles { run, raw, synthetic });
    }

    Ok(selected)
}

fn single_entry(entries: &[&String], run: RunName, role: FileRole) -> Result<String> {
    let matching: Vec<&String> = entries
        .iter()
        .copied()
        .filter(|name| name.to_lowercase().contains(role.marker()))
        .collect();

    match matching.as_slice() {
        [only] => Ok((*only).clone()),
        _ => Err(EvalError::RunFileCount {
            run,
            role,
            found: matching.len(),
        }),
    }
}

/// Open a submission archive and parse every selected run file
pub fn read_submission(path: &Path, task: Task) -> Result<Submission> {
    let is_zip = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("zip"));
    if !is_zip {
        return Err(EvalError::Format(path.display().to_string()));
    }

    let file = File::open(path)?;
    let mut archive = zip::ZipArchive::new(file)
        .map_err(|e| EvalError::Format(format!("{}: {}", path.display(), e)))?;

    let names: Vec<String> = archive.file_names().map(str::to_string).collect();
    let run_files = select_run_files(&names, task)?;

    let mut submission = Submission::new();
    for files in run_files {
        let raw = read_entry(&mut archive, &files.raw, task.raw_levels())?;
        let synthetic = match &files.synthetic {
            Some(name) => Some(read_entry(&mut archive, name, &[Level::Misogynous])?),
            None => None,
        };

        tracing::info!(
            "{}: {} raw predictions{}",
            files.run,
            raw.len(),
            synthetic
                .as_ref()
                .map(|s| format!(", {} synthetic predictions", s.len()))
                .unwrap_or_default()
        );
        submission.insert(files.run, RunSubmission { raw, synthetic });
    }

    if submission.is_empty() {
        tracing::warn!("No run files for task {} found in {}", task, path.display());
    }

    Ok(submission)
}

fn read_entry(
    archive: &mut zip::ZipArchive<File>,
    name: &str,
    levels: &[Level],
) -> Result<PredictionDataset> {
    let entry = archive.by_name(name)?;
    PredictionDataset::from_reader(entry, name, levels)
}

/// SHA-256 of the submission archive, hex encoded
pub fn archive_digest(path: &Path) -> Result<String> {
    let mut file = File::open(path)?;
    let mut hasher = Sha256::new();
    let mut buffer = [0u8; 8192];

    loop {
        let bytes_read = file.read(&mut buffer)?;
        if bytes_read == 0 {
            break;
        }
        hasher.update(&buffer[..bytes_read]);
    }

    Ok(hex::encode(hasher.finalize()))
}
