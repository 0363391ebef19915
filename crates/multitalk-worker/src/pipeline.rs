//! One language partition, from annotation file to failure log.

use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;

use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::{info, warn};

use multitalk_models::ClipDescriptor;

use crate::collaborators::Collaborators;
use crate::config::PipelineConfig;
use crate::error::WorkerResult;
use crate::loader::{AnnotationSet, LoadMode};
use crate::report::{BatchSummary, FailureLog};
use crate::runner::{JobRunner, RunMode, RunnerSettings};
use crate::source_cache::SourceCache;

/// Seed of the reproducible test subset.
pub const TEST_SUBSET_SEED: u64 = 0;

/// How a partition selects and processes its descriptors.
#[derive(Debug, Clone, Default)]
pub struct PartitionOptions {
    pub mode: RunMode,
    /// Process only a seeded random sample of this many descriptors
    pub sample: Option<usize>,
    /// Process only sources listed in the existing failure log
    pub retry_failed: bool,
}

/// Reproducible random subset of `count` descriptors.
///
/// Returns everything when `count` is not smaller than the input.
pub fn sample_descriptors(
    descriptors: Vec<ClipDescriptor>,
    count: usize,
    seed: u64,
) -> Vec<ClipDescriptor> {
    if count >= descriptors.len() {
        return descriptors;
    }
    let mut rng = StdRng::seed_from_u64(seed);
    let picked = rand::seq::index::sample(&mut rng, descriptors.len(), count);

    let mut slots: Vec<Option<ClipDescriptor>> = descriptors.into_iter().map(Some).collect();
    picked
        .into_iter()
        .filter_map(|i| slots.get_mut(i).and_then(Option::take))
        .collect()
}

/// Keep descriptors whose source appears in `failed_ids`.
pub fn retain_failed(
    descriptors: Vec<ClipDescriptor>,
    failed_ids: &HashSet<String>,
) -> Vec<ClipDescriptor> {
    descriptors
        .into_iter()
        .filter(|d| failed_ids.contains(&d.source_id))
        .collect()
}

/// First descriptor of every distinct source, in input order.
pub fn distinct_sources(descriptors: Vec<ClipDescriptor>) -> Vec<ClipDescriptor> {
    let mut seen = HashSet::new();
    descriptors
        .into_iter()
        .filter(|d| seen.insert(d.source_id.clone()))
        .collect()
}

/// Process the annotation file of one language.
///
/// Clips go to `config.output_dir(language)`, failures to
/// `config.failure_log_path(language)`.
pub async fn run_partition(
    config: &PipelineConfig,
    collaborators: &Collaborators,
    cache: &Arc<SourceCache>,
    annotation_path: &Path,
    language: &str,
    options: &PartitionOptions,
) -> WorkerResult<BatchSummary> {
    let set = AnnotationSet::from_path(annotation_path).await?;
    let records = set.len();
    let report = set.descriptors(LoadMode::Lenient).collect_report()?;
    if report.skipped_count() > 0 {
        warn!(
            language = language,
            "Skipped {} of {} malformed annotation records",
            report.skipped_count(),
            records
        );
    }
    let mut descriptors = report.descriptors;

    if let Some(count) = options.sample {
        descriptors = sample_descriptors(descriptors, count, TEST_SUBSET_SEED);
        info!(language = language, "Selected {} test clips", descriptors.len());
    }

    let failure_path = config.failure_log_path(language);
    if options.retry_failed {
        let failed_ids = FailureLog::read_failed_ids(&failure_path).await?;
        descriptors = retain_failed(descriptors, &failed_ids);
        info!(
            language = language,
            "Retrying {} clips from {} failed sources",
            descriptors.len(),
            failed_ids.len()
        );
    }

    if options.mode == RunMode::DownloadOnly {
        descriptors = distinct_sources(descriptors);
    }

    let total = descriptors.len();
    let output_dir = config.output_dir(language);
    info!(
        language = language,
        clips = total,
        output = %output_dir.display(),
        raw = %cache.raw_dir().display(),
        "Processing partition"
    );

    let mut failure_log = FailureLog::create(&failure_path).await?;
    let settings = RunnerSettings::from_config(config, output_dir, options.mode);
    let runner = Arc::new(JobRunner::new(collaborators.clone(), Arc::clone(cache), settings));

    let mut summary = BatchSummary::default();
    let mut rx = runner.run(descriptors);
    while let Some(outcome) = rx.recv().await {
        summary.record(&outcome);
        failure_log.record(&outcome).await?;
        info!("[{}/{}] {}", summary.total, total, outcome);
    }

    info!(language = language, "{}", summary);
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use multitalk_models::{NormalizedBox, TimeRange};

    fn descriptor(source_id: &str, n: usize) -> ClipDescriptor {
        ClipDescriptor {
            source_id: source_id.to_string(),
            output_name: format!("{}_{:02}.mp4", source_id, n),
            time_range: TimeRange::new(0.0, 1.0),
            bbox: NormalizedBox::new(0.1, 0.5, 0.1, 0.5),
            language: None,
        }
    }

    fn batch() -> Vec<ClipDescriptor> {
        vec![
            descriptor("aaa", 1),
            descriptor("bbb", 1),
            descriptor("aaa", 2),
            descriptor("ccc", 1),
            descriptor("bbb", 2),
        ]
    }

    #[test]
    fn test_sample_is_reproducible() {
        let first = sample_descriptors(batch(), 3, TEST_SUBSET_SEED);
        let second = sample_descriptors(batch(), 3, TEST_SUBSET_SEED);
        assert_eq!(first.len(), 3);
        assert_eq!(first, second);

        let unique: HashSet<_> = first.iter().map(|d| d.output_name.clone()).collect();
        assert_eq!(unique.len(), 3);
    }

    #[test]
    fn test_sample_larger_than_input() {
        assert_eq!(sample_descriptors(batch(), 10, 0).len(), 5);
    }

    #[test]
    fn test_distinct_sources() {
        let ids: Vec<_> = distinct_sources(batch())
            .into_iter()
            .map(|d| d.output_name)
            .collect();
        assert_eq!(ids, vec!["aaa_01.mp4", "bbb_01.mp4", "ccc_01.mp4"]);
    }

    #[test]
    fn test_retain_failed() {
        let failed: HashSet<String> = ["bbb".to_string()].into_iter().collect();
        let kept = retain_failed(batch(), &failed);
        assert_eq!(kept.len(), 2);
        assert!(kept.iter().all(|d| d.source_id == "bbb"));
    }
}
