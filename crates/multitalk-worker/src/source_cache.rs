//! Shared raw video cache with per-source single-flight retrieval.
//!
//! Many clips are cut from the same source video. The registry holds one
//! async mutex per `source_id`: the first job to need a source fetches it
//! while holding the lock, later jobs wait and then observe the result.
//! Failed retrievals are remembered so a bad source is fetched (and
//! logged) once per run.

use std::collections::HashMap;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use tracing::{debug, warn};

use multitalk_media::is_nonempty_file;
use multitalk_models::raw_file_name;

/// What `ensure` found or did for a source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceResolution {
    /// The raw file was already present; nothing was fetched.
    AlreadyCached,
    /// This call fetched the raw file.
    Fetched,
    /// Retrieval failed, now or earlier in the run.
    Failed { reason: String },
}

#[derive(Debug, Clone)]
enum SourceState {
    Ready,
    Failed(String),
}

type Slot = Arc<tokio::sync::Mutex<Option<SourceState>>>;

/// Registry over `<root>/raw_video`.
#[derive(Debug)]
pub struct SourceCache {
    raw_dir: PathBuf,
    slots: Mutex<HashMap<String, Slot>>,
    fetches: AtomicUsize,
}

impl SourceCache {
    pub fn new(raw_dir: impl Into<PathBuf>) -> Self {
        Self {
            raw_dir: raw_dir.into(),
            slots: Mutex::new(HashMap::new()),
            fetches: AtomicUsize::new(0),
        }
    }

    pub fn raw_dir(&self) -> &Path {
        &self.raw_dir
    }

    /// Cache path of the raw video for `source_id`.
    pub fn path_for(&self, source_id: &str) -> PathBuf {
        self.raw_dir.join(raw_file_name(source_id))
    }

    /// Number of fetch sequences started through this cache.
    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }

    fn slot(&self, source_id: &str) -> Slot {
        let mut slots = self.slots.lock().unwrap_or_else(|e| e.into_inner());
        slots
            .entry(source_id.to_string())
            .or_insert_with(|| Arc::new(tokio::sync::Mutex::new(None)))
            .clone()
    }

    /// Make sure the raw video for `source_id` is on disk.
    ///
    /// `fetch` receives the destination path and runs at most once per
    /// source for the lifetime of the cache. A fetch that reports success
    /// but leaves no non-empty file counts as a failure.
    pub async fn ensure<F, Fut>(&self, source_id: &str, fetch: F) -> SourceResolution
    where
        F: FnOnce(PathBuf) -> Fut,
        Fut: Future<Output = Result<(), String>>,
    {
        let slot = self.slot(source_id);
        let mut state = slot.lock().await;

        match state.as_ref() {
            Some(SourceState::Ready) => return SourceResolution::AlreadyCached,
            Some(SourceState::Failed(reason)) => {
                debug!(source_id = source_id, "Source already failed this run");
                return SourceResolution::Failed {
                    reason: reason.clone(),
                };
            }
            None => {}
        }

        let path = self.path_for(source_id);
        if is_nonempty_file(&path).await {
            *state = Some(SourceState::Ready);
            return SourceResolution::AlreadyCached;
        }

        if let Err(e) = tokio::fs::create_dir_all(&self.raw_dir).await {
            let reason = format!("cannot create {}: {}", self.raw_dir.display(), e);
            *state = Some(SourceState::Failed(reason.clone()));
            return SourceResolution::Failed { reason };
        }

        self.fetches.fetch_add(1, Ordering::SeqCst);
        let result = fetch(path.clone()).await;

        let outcome = match result {
            Ok(()) if is_nonempty_file(&path).await => Ok(()),
            Ok(()) => Err("retrieval finished without producing a file".to_string()),
            Err(reason) => Err(reason),
        };

        match outcome {
            Ok(()) => {
                *state = Some(SourceState::Ready);
                SourceResolution::Fetched
            }
            Err(reason) => {
                warn!(source_id = source_id, "Source retrieval failed: {}", reason);
                *state = Some(SourceState::Failed(reason.clone()));
                SourceResolution::Failed { reason }
            }
        }
    }
}
