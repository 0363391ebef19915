//! Job runner: fans clip descriptors out to a bounded worker pool.
//!
//! Each descriptor goes through retrieval (shared per source), frame
//! probing, crop geometry and the clip transform. Every failure becomes a
//! [`JobOutcome`]; nothing a single clip does can stop the batch.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::{mpsc, Semaphore};
use tracing::{debug, warn, Instrument};

use multitalk_media::{normalize, partial_path, MediaError, OutputFormat};
use multitalk_models::{ClipDescriptor, FailureStage, JobOutcome, JobStatus};

use crate::collaborators::{Collaborators, TransformRequest};
use crate::config::PipelineConfig;
use crate::logging::ClipLogger;
use crate::metrics;
use crate::retry::{retry_async, RetryConfig, RetryResult};
use crate::source_cache::{SourceCache, SourceResolution};

/// Which stages run for each descriptor.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RunMode {
    /// Retrieve, probe, crop and transform
    #[default]
    Full,
    /// Retrieve only
    DownloadOnly,
}

/// Per-run settings of the job runner.
#[derive(Debug, Clone)]
pub struct RunnerSettings {
    pub concurrency: usize,
    pub expand_ratio: f64,
    pub retry: RetryConfig,
    pub output_format: OutputFormat,
    /// Directory receiving `<output_name>` files
    pub output_dir: PathBuf,
    pub transform_timeout: Duration,
    /// Wall-clock limit for one retrieval attempt
    pub retrieval_timeout: Duration,
    pub mode: RunMode,
}

impl RunnerSettings {
    pub fn from_config(config: &PipelineConfig, output_dir: impl Into<PathBuf>, mode: RunMode) -> Self {
        Self {
            concurrency: config.concurrency.max(1),
            expand_ratio: config.expand_ratio,
            retry: RetryConfig::new("fetch_source")
                .with_attempts(config.retrieval_attempts)
                .with_base_delay(config.retry_base_delay),
            output_format: OutputFormat::default(),
            output_dir: output_dir.into(),
            transform_timeout: config.transform_timeout,
            retrieval_timeout: config.download_timeout,
            mode,
        }
    }
}

/// Bounded-concurrency clip runner.
#[derive(Debug)]
pub struct JobRunner {
    collaborators: Collaborators,
    cache: Arc<SourceCache>,
    settings: RunnerSettings,
    semaphore: Arc<Semaphore>,
}

impl JobRunner {
    pub fn new(collaborators: Collaborators, cache: Arc<SourceCache>, settings: RunnerSettings) -> Self {
        let permits = settings.concurrency.max(1);
        Self {
            collaborators,
            cache,
            settings,
            semaphore: Arc::new(Semaphore::new(permits)),
        }
    }

    pub fn settings(&self) -> &RunnerSettings {
        &self.settings
    }

    pub fn cache(&self) -> &Arc<SourceCache> {
        &self.cache
    }

    /// Start processing `descriptors`.
    ///
    /// Outcomes arrive in completion order. Descriptors are pulled from the
    /// iterator only as worker slots free up. The channel closes once every
    /// descriptor has produced exactly one outcome.
    pub fn run<I>(self: &Arc<Self>, descriptors: I) -> mpsc::Receiver<JobOutcome>
    where
        I: IntoIterator<Item = ClipDescriptor>,
        I::IntoIter: Send + 'static,
    {
        let (tx, rx) = mpsc::channel(self.settings.concurrency.max(1) * 2);
        let runner = Arc::clone(self);
        let descriptors = descriptors.into_iter();

        tokio::spawn(async move {
            if runner.settings.mode == RunMode::Full {
                if let Err(e) = tokio::fs::create_dir_all(&runner.settings.output_dir).await {
                    warn!(
                        "Failed to create output directory {}: {}",
                        runner.settings.output_dir.display(),
                        e
                    );
                }
            }

            for descriptor in descriptors {
                let permit = match Arc::clone(&runner.semaphore).acquire_owned().await {
                    Ok(permit) => permit,
                    Err(_) => break,
                };
                let runner = Arc::clone(&runner);
                let tx = tx.clone();

                tokio::spawn(async move {
                    let source_id = descriptor.source_id.clone();
                    let output_name = descriptor.output_name.clone();

                    let job = {
                        let runner = Arc::clone(&runner);
                        tokio::spawn(async move { runner.process(descriptor).await })
                    };
                    let outcome = match job.await {
                        Ok(outcome) => outcome,
                        Err(e) => {
                            warn!(source_id = %source_id, "Clip task aborted: {}", e);
                            JobOutcome::new(
                                source_id,
                                output_name,
                                JobStatus::ProcessingFailed {
                                    stage: FailureStage::Transform,
                                    reason: "task panicked".to_string(),
                                },
                            )
                        }
                    };

                    metrics::record_outcome(&outcome.status);
                    drop(permit);
                    if tx.send(outcome).await.is_err() {
                        debug!("Outcome receiver dropped");
                    }
                });
            }
        });

        rx
    }

    /// Run the batch and collect every outcome.
    pub async fn run_to_completion<I>(self: &Arc<Self>, descriptors: I) -> Vec<JobOutcome>
    where
        I: IntoIterator<Item = ClipDescriptor>,
        I::IntoIter: Send + 'static,
    {
        let mut rx = self.run(descriptors);
        let mut outcomes = Vec::new();
        while let Some(outcome) = rx.recv().await {
            outcomes.push(outcome);
        }
        outcomes
    }

    /// Take one descriptor to its terminal status.
    pub async fn process(&self, descriptor: ClipDescriptor) -> JobOutcome {
        let logger = ClipLogger::for_descriptor(&descriptor);
        let span = logger.create_span();

        async move {
            let status = self.process_inner(&descriptor, &logger).await;
            match &status {
                JobStatus::RetrievalFailed { reason } | JobStatus::ProcessingFailed { reason, .. } => {
                    logger.log_error(reason)
                }
                other => logger.log_completion(other.as_str()),
            }
            JobOutcome::new(descriptor.source_id, descriptor.output_name, status)
        }
        .instrument(span)
        .await
    }

    async fn process_inner(&self, descriptor: &ClipDescriptor, logger: &ClipLogger) -> JobStatus {
        logger.log_start("resolving source video");

        let resolution = self.ensure_source(&descriptor.source_id).await;
        let fetched = match resolution {
            SourceResolution::Failed { reason } => return JobStatus::RetrievalFailed { reason },
            SourceResolution::Fetched => true,
            SourceResolution::AlreadyCached => false,
        };

        if self.settings.mode == RunMode::DownloadOnly {
            return if fetched {
                JobStatus::Downloaded
            } else {
                JobStatus::Skipped
            };
        }

        let input = self.cache.path_for(&descriptor.source_id);

        let (width, height) = match self.collaborators.prober.frame_dimensions(&input).await {
            Ok(dims) => dims,
            Err(e) => {
                return JobStatus::ProcessingFailed {
                    stage: FailureStage::Probe,
                    reason: e.detail(),
                }
            }
        };

        let crop = match normalize(&descriptor.bbox, width, height, self.settings.expand_ratio) {
            Ok(crop) => crop,
            Err(e) => {
                return JobStatus::ProcessingFailed {
                    stage: FailureStage::Geometry,
                    reason: e.to_string(),
                }
            }
        };
        logger.log_progress(&format!(
            "frame {}x{}, {}",
            width,
            height,
            crop.ffmpeg_crop_filter()
        ));

        let request = TransformRequest {
            input,
            output: self.settings.output_dir.join(&descriptor.output_name),
            crop,
            time_range: descriptor.time_range,
            target: self.settings.output_format.clone(),
        };

        let started = Instant::now();
        let timeout = self.settings.transform_timeout;
        let result = tokio::time::timeout(
            timeout,
            self.collaborators.transformer.transform(&request),
        )
        .await;
        metrics::record_transform_duration(started.elapsed().as_secs_f64());

        match result {
            Ok(Ok(())) => JobStatus::Done,
            Ok(Err(e)) => JobStatus::ProcessingFailed {
                stage: FailureStage::Transform,
                reason: e.detail(),
            },
            Err(_) => {
                // The dropped transform never reached its own cleanup.
                let partial = partial_path(&request.output);
                if tokio::fs::remove_file(&partial).await.is_ok() {
                    debug!("Removed partial output {}", partial.display());
                }
                JobStatus::ProcessingFailed {
                    stage: FailureStage::Transform,
                    reason: MediaError::Timeout(timeout.as_secs()).to_string(),
                }
            }
        }
    }

    /// Retrieve the source through the shared cache, with retries.
    async fn ensure_source(&self, source_id: &str) -> SourceResolution {
        let retriever = Arc::clone(&self.collaborators.retriever);
        let retry = &self.settings.retry;
        let limit = self.settings.retrieval_timeout;

        let resolution = self
            .cache
            .ensure(source_id, |path| async move {
                let attempt = || async {
                    match tokio::time::timeout(limit, retriever.fetch(source_id, &path)).await {
                        Ok(result) => result,
                        Err(_) => Err(MediaError::Timeout(limit.as_secs())),
                    }
                };
                match retry_async(retry, attempt).await {
                    RetryResult::Success(()) => Ok(()),
                    RetryResult::Failed { error, attempts } => {
                        Err(format!("{} (after {} attempts)", error.detail(), attempts))
                    }
                }
            })
            .await;

        match &resolution {
            SourceResolution::Fetched => metrics::record_retrieval("fetched"),
            SourceResolution::Failed { .. } => metrics::record_retrieval("failed"),
            SourceResolution::AlreadyCached => {}
        }
        resolution
    }
}
