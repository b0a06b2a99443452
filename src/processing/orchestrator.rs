//! Process orchestrator: discover raw files and clean each one.

use crate::errors::ProcessError;
use crate::processing::cleaner::{Cleaner, ProcessReport};
use crate::summary::BatchSummary;
use crate::utils::{resolve_input_path, wildcard_regex};
use futures::stream::{self, StreamExt};
use regex::Regex;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info, instrument, warn};

pub type ProcessSummary = BatchSummary<ProcessReport, ProcessError>;

/// Which raw files a process run covers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileSelection {
    /// One explicit path; looked up in the raw directory when it does not exist as given.
    SingleFile(PathBuf),
    /// Every file in the raw directory matching the configured pattern.
    AllFiles,
}

pub struct ProcessOrchestrator {
    cleaner: Cleaner,
    raw_dir: PathBuf,
    file_pattern: Regex,
}

impl ProcessOrchestrator {
    pub fn new(cleaner: Cleaner, raw_dir: PathBuf, file_pattern: &str) -> Result<Self, regex::Error> {
        Ok(Self {
            cleaner,
            raw_dir,
            file_pattern: wildcard_regex(file_pattern)?,
        })
    }

    /// Clean every selected file, one at a time.
    ///
    /// A failing file is recorded and the batch moves on.
    ///
    /// # Arguments
    ///
    /// * `selection` - One explicit file, or every matching file in the raw directory
    /// * `verbose` - Log each file's step counts at `info` instead of `debug`
    ///
    /// # Returns
    ///
    /// One outcome per file keyed by path. An unreadable raw directory is
    /// recorded as a single `LOAD` failure under the directory's path.
    #[instrument(level = "info", skip(self))]
    pub async fn run(&self, selection: &FileSelection, verbose: bool) -> ProcessSummary {
        let mut summary = ProcessSummary::default();

        let files = match selection {
            FileSelection::SingleFile(path) => vec![resolve_input_path(path, &self.raw_dir)],
            FileSelection::AllFiles => match self.discover().await {
                Ok(files) => files,
                Err(e) => {
                    summary.record(self.raw_dir.display().to_string(), Err(e));
                    return summary;
                }
            },
        };

        if files.is_empty() {
            warn!(raw_dir = %self.raw_dir.display(), "No raw files found");
            return summary;
        }
        info!(count = files.len(), "Found raw files to process");

        let results: Vec<(String, Result<ProcessReport, ProcessError>)> = stream::iter(files)
            .then(|path| async move {
                let outcome = self.cleaner.process(&path).await;
                if let Ok(report) = &outcome {
                    log_report(report, verbose);
                }
                (path.display().to_string(), outcome)
            })
            .collect()
            .await;

        for (key, outcome) in results {
            summary.record(key, outcome);
        }
        summary
    }

    /// Files in the raw directory whose name matches the pattern, sorted by name.
    ///
    /// Outputs of an earlier run (`*-processed.*`) are skipped.
    pub async fn discover(&self) -> Result<Vec<PathBuf>, ProcessError> {
        let mut entries = fs::read_dir(&self.raw_dir)
            .await
            .map_err(|e| ProcessError::load(&self.raw_dir, e))?;

        let mut files = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| ProcessError::load(&self.raw_dir, e))?
        {
            let path = entry.path();
            if !is_candidate(&path, &self.file_pattern) {
                continue;
            }
            if entry.file_type().await.map(|t| t.is_file()).unwrap_or(false) {
                files.push(path);
            }
        }
        files.sort();
        debug!(count = files.len(), "Discovered raw files");
        Ok(files)
    }
}

fn is_candidate(path: &Path, pattern: &Regex) -> bool {
    let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
        return false;
    };
    let processed = path
        .file_stem()
        .and_then(|s| s.to_str())
        .is_some_and(|s| s.ends_with("-processed"));
    pattern.is_match(name) && !processed
}

fn log_report(report: &ProcessReport, verbose: bool) {
    if verbose {
        info!(
            input = %report.input.display(),
            rows_loaded = report.rows_loaded,
            dropped_incomplete = report.dropped_incomplete,
            dropped_missing_required = report.dropped_missing_required,
            dropped_malformed_score = report.dropped_malformed_score,
            dropped_uncoercible = report.dropped_uncoercible,
            rows_written = report.rows_written,
            "File report"
        );
    } else {
        debug!(input = %report.input.display(), rows_written = report.rows_written, "File report");
    }
}
