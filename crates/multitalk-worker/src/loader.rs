//! Clip descriptor loading from annotation files.
//!
//! Records are converted lazily, in file order. In lenient mode a bad
//! record is logged and skipped; in strict mode it ends the load.

use std::io::Read;
use std::path::Path;

use serde_json::{Map, Value};
use tracing::warn;

use multitalk_models::{AnnotationError, AnnotationRecord, AnnotationResult, ClipDescriptor};

use crate::error::WorkerResult;

/// How malformed records are handled.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LoadMode {
    /// Skip and report malformed records
    #[default]
    Lenient,
    /// Stop at the first malformed record
    Strict,
}

/// A record dropped by a lenient load.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedRecord {
    pub key: String,
    pub reason: String,
}

/// Parsed annotation document, still unvalidated.
#[derive(Debug, Clone, Default)]
pub struct AnnotationSet {
    records: Map<String, Value>,
}

impl AnnotationSet {
    /// Parse an annotation document.
    pub fn parse_str(json: &str) -> AnnotationResult<Self> {
        let value: Value = serde_json::from_str(json)
            .map_err(|e| AnnotationError::InvalidDocument(e.to_string()))?;
        Self::from_value(value)
    }

    pub fn from_reader<R: Read>(reader: R) -> AnnotationResult<Self> {
        let value: Value = serde_json::from_reader(reader)
            .map_err(|e| AnnotationError::InvalidDocument(e.to_string()))?;
        Self::from_value(value)
    }

    pub async fn from_path(path: impl AsRef<Path>) -> WorkerResult<Self> {
        let bytes = tokio::fs::read(path.as_ref()).await?;
        Ok(Self::from_reader(bytes.as_slice())?)
    }

    fn from_value(value: Value) -> AnnotationResult<Self> {
        match value {
            Value::Object(records) => Ok(Self { records }),
            other => Err(AnnotationError::InvalidDocument(format!(
                "expected a JSON object of records, found {}",
                json_kind(&other)
            ))),
        }
    }

    /// Number of records, valid or not.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Lazily convert records into clip descriptors.
    pub fn descriptors(self, mode: LoadMode) -> Descriptors {
        Descriptors {
            records: self.records.into_iter(),
            mode,
            skipped: Vec::new(),
            finished: false,
        }
    }
}

/// Iterator over the descriptors of an [`AnnotationSet`].
pub struct Descriptors {
    records: serde_json::map::IntoIter,
    mode: LoadMode,
    skipped: Vec<SkippedRecord>,
    finished: bool,
}

impl Descriptors {
    /// Records skipped so far.
    pub fn skipped(&self) -> &[SkippedRecord] {
        &self.skipped
    }

    /// Drain the iterator.
    ///
    /// In strict mode the first malformed record is returned as the error.
    pub fn collect_report(mut self) -> AnnotationResult<LoadReport> {
        let mut descriptors = Vec::new();
        for item in self.by_ref() {
            descriptors.push(item?);
        }
        Ok(LoadReport {
            descriptors,
            skipped: self.skipped,
        })
    }
}

impl Iterator for Descriptors {
    type Item = AnnotationResult<ClipDescriptor>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }

        for (key, value) in self.records.by_ref() {
            let result =
                AnnotationRecord::from_value(&key, value).and_then(|r| r.into_descriptor(&key));
            match result {
                Ok(descriptor) => return Some(Ok(descriptor)),
                Err(e) => match self.mode {
                    LoadMode::Strict => {
                        self.finished = true;
                        return Some(Err(e));
                    }
                    LoadMode::Lenient => {
                        warn!(key = %key, "Skipping malformed annotation: {}", e);
                        let reason = match e {
                            AnnotationError::Malformed { reason, .. } => reason,
                            other => other.to_string(),
                        };
                        self.skipped.push(SkippedRecord { key, reason });
                    }
                },
            }
        }

        self.finished = true;
        None
    }
}

/// Result of a fully drained load.
#[derive(Debug, Clone, Default)]
pub struct LoadReport {
    pub descriptors: Vec<ClipDescriptor>,
    pub skipped: Vec<SkippedRecord>,
}

impl LoadReport {
    pub fn skipped_count(&self) -> usize {
        self.skipped.len()
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
