//! Failure log and batch tallies.

use std::collections::HashSet;
use std::fmt;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tokio::fs::File;
use tokio::io::AsyncWriteExt;

use multitalk_models::{JobOutcome, JobStatus};

use crate::error::WorkerResult;

/// Append-only failure log, one line per failed clip.
///
/// Lines are flushed as they are written so an interrupted run still
/// leaves a usable log for `--retry-failed`.
#[derive(Debug)]
pub struct FailureLog {
    path: PathBuf,
    file: File,
    lines: usize,
}

impl FailureLog {
    /// Create (or truncate) the log at `path`.
    pub async fn create(path: impl AsRef<Path>) -> WorkerResult<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let file = File::create(&path).await?;
        Ok(Self {
            path,
            file,
            lines: 0,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Number of lines written so far.
    pub fn len(&self) -> usize {
        self.lines
    }

    pub fn is_empty(&self) -> bool {
        self.lines == 0
    }

    /// Write the outcome if it is a failure. Returns whether a line was written.
    pub async fn record(&mut self, outcome: &JobOutcome) -> WorkerResult<bool> {
        let Some(line) = outcome.failure_line() else {
            return Ok(false);
        };
        self.file.write_all(line.as_bytes()).await?;
        self.file.write_all(b"\n").await?;
        self.file.flush().await?;
        self.lines += 1;
        Ok(true)
    }

    /// Source ids listed in an existing log. A missing log yields an empty set.
    pub async fn read_failed_ids(path: impl AsRef<Path>) -> WorkerResult<HashSet<String>> {
        let contents = match tokio::fs::read_to_string(path.as_ref()).await {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(HashSet::new()),
            Err(e) => return Err(e.into()),
        };
        Ok(contents
            .lines()
            .filter_map(parse_failure_line)
            .map(str::to_string)
            .collect())
    }
}

/// Source id of a failure log line, `<source_id>, ERROR (<stage>): <reason>`.
pub fn parse_failure_line(line: &str) -> Option<&str> {
    let (source_id, rest) = line.split_once(',')?;
    let source_id = source_id.trim();
    if source_id.is_empty() || !rest.trim_start().starts_with("ERROR") {
        return None;
    }
    Some(source_id)
}

/// Tally of one batch.
#[derive(Debug, Clone, Default, Serialize)]
pub struct BatchSummary {
    pub total: usize,
    pub done: usize,
    pub skipped: usize,
    pub downloaded: usize,
    pub retrieval_failed: usize,
    pub processing_failed: usize,
}

impl BatchSummary {
    pub fn record(&mut self, outcome: &JobOutcome) {
        self.total += 1;
        match outcome.status {
            JobStatus::Done => self.done += 1,
            JobStatus::Skipped => self.skipped += 1,
            JobStatus::Downloaded => self.downloaded += 1,
            JobStatus::RetrievalFailed { .. } => self.retrieval_failed += 1,
            JobStatus::ProcessingFailed { .. } => self.processing_failed += 1,
        }
    }

    pub fn failures(&self) -> usize {
        self.retrieval_failed + self.processing_failed
    }

    /// Fold another partition's tally into this one.
    pub fn merge(&mut self, other: &BatchSummary) {
        self.total += other.total;
        self.done += other.done;
        self.skipped += other.skipped;
        self.downloaded += other.downloaded;
        self.retrieval_failed += other.retrieval_failed;
        self.processing_failed += other.processing_failed;
    }
}

impl fmt::Display for BatchSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} clips: {} done, {} downloaded, {} skipped, {} failures ({} retrieval, {} processing)",
            self.total,
            self.done,
            self.downloaded,
            self.skipped,
            self.failures(),
            self.retrieval_failed,
            self.processing_failed
        )
    }
}
