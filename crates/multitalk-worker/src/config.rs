//! Pipeline configuration.

use std::path::{Path, PathBuf};
use std::time::Duration;

use multitalk_media::{DEFAULT_EXPAND_RATIO, DEFAULT_YOUTUBE_BASE_URL};

use crate::error::{WorkerError, WorkerResult};

/// Where the published annotation files live.
pub const DEFAULT_ANNOTATION_BASE_URL: &str =
    "https://github.com/postech-ami/MultiTalk/raw/refs/heads/main/MultiTalk_dataset/annotations/";

/// Pipeline configuration.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Root of the on-disk layout
    pub root: PathBuf,
    /// Directory under `root` holding rendered clips
    pub dataset_dir: String,
    /// Maximum clips in flight
    pub concurrency: usize,
    /// Margin added around each face box (normalized units)
    pub expand_ratio: f64,
    /// Total retrieval attempts per source video
    pub retrieval_attempts: u32,
    /// Base delay for retrieval backoff
    pub retry_base_delay: Duration,
    /// Wall-clock limit for one FFmpeg run
    pub transform_timeout: Duration,
    /// Wall-clock limit for one retrieval attempt
    pub download_timeout: Duration,
    /// Prefix for `<language>.json` annotation downloads
    pub annotation_base_url: String,
    /// Prefix joined with a source id to form the video URL
    pub youtube_base_url: String,
    /// Optional yt-dlp cookies file
    pub cookies: Option<PathBuf>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("./"),
            dataset_dir: "multitalk_dataset".to_string(),
            concurrency: 8,
            expand_ratio: DEFAULT_EXPAND_RATIO,
            retrieval_attempts: 3,
            retry_base_delay: Duration::from_secs(2),
            transform_timeout: Duration::from_secs(600), // 10 minutes
            download_timeout: Duration::from_secs(1800),
            annotation_base_url: DEFAULT_ANNOTATION_BASE_URL.to_string(),
            youtube_base_url: DEFAULT_YOUTUBE_BASE_URL.to_string(),
            cookies: None,
        }
    }
}

impl PipelineConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            root: std::env::var("MULTITALK_ROOT")
                .map(PathBuf::from)
                .unwrap_or(defaults.root),
            dataset_dir: std::env::var("MULTITALK_DATASET_DIR").unwrap_or(defaults.dataset_dir),
            concurrency: env_parse("MULTITALK_CONCURRENCY").unwrap_or(defaults.concurrency),
            expand_ratio: env_parse("MULTITALK_EXPAND_RATIO").unwrap_or(defaults.expand_ratio),
            retrieval_attempts: env_parse("MULTITALK_RETRIEVAL_ATTEMPTS")
                .unwrap_or(defaults.retrieval_attempts),
            retry_base_delay: env_parse("MULTITALK_RETRY_BASE_DELAY_MS")
                .map(Duration::from_millis)
                .unwrap_or(defaults.retry_base_delay),
            transform_timeout: env_parse("MULTITALK_TRANSFORM_TIMEOUT_SECS")
                .map(Duration::from_secs)
                .unwrap_or(defaults.transform_timeout),
            download_timeout: env_parse("MULTITALK_DOWNLOAD_TIMEOUT_SECS")
                .map(Duration::from_secs)
                .unwrap_or(defaults.download_timeout),
            annotation_base_url: std::env::var("MULTITALK_ANNOTATION_BASE_URL")
                .unwrap_or(defaults.annotation_base_url),
            youtube_base_url: std::env::var("MULTITALK_YOUTUBE_BASE_URL")
                .unwrap_or(defaults.youtube_base_url),
            cookies: std::env::var("MULTITALK_COOKIES").ok().map(PathBuf::from),
        }
    }

    /// Reject settings the pipeline cannot run with.
    pub fn validate(&self) -> WorkerResult<()> {
        if self.concurrency == 0 {
            return Err(WorkerError::config("concurrency must be at least 1"));
        }
        if self.retrieval_attempts == 0 {
            return Err(WorkerError::config("retrieval attempts must be at least 1"));
        }
        if !self.expand_ratio.is_finite() || !(0.0..0.5).contains(&self.expand_ratio) {
            return Err(WorkerError::config(format!(
                "expand ratio must be in [0, 0.5), got {}",
                self.expand_ratio
            )));
        }
        if self.transform_timeout.is_zero() {
            return Err(WorkerError::config("transform timeout must be positive"));
        }
        if self.download_timeout.is_zero() {
            return Err(WorkerError::config("download timeout must be positive"));
        }
        if self.dataset_dir.trim().is_empty() {
            return Err(WorkerError::config("dataset directory name is empty"));
        }
        Ok(())
    }

    /// Shared raw video cache, `<root>/raw_video`.
    pub fn raw_video_dir(&self) -> PathBuf {
        self.root.join("raw_video")
    }

    /// Rendered clips for one language, `<root>/<dataset>/<language>`.
    pub fn output_dir(&self, language: &str) -> PathBuf {
        self.root.join(&self.dataset_dir).join(language)
    }

    pub fn annotation_dir(&self) -> PathBuf {
        self.root.join("annotation")
    }

    /// Failure log for one language, `<root>/bad_files_<language>.txt`.
    pub fn failure_log_path(&self, language: &str) -> PathBuf {
        self.root.join(format!("bad_files_{}.txt", language))
    }

    /// Same configuration rooted somewhere else.
    pub fn with_root(mut self, root: impl AsRef<Path>) -> Self {
        self.root = root.as_ref().to_path_buf();
        self
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|s| s.trim().parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        let config = PipelineConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.retrieval_attempts, 3);
        assert!((config.expand_ratio - 0.02).abs() < f64::EPSILON);
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let config = PipelineConfig {
            concurrency: 0,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(WorkerError::Config(_))));

        let config = PipelineConfig {
            expand_ratio: -0.1,
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = PipelineConfig {
            expand_ratio: f64::NAN,
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = PipelineConfig {
            transform_timeout: Duration::ZERO,
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = PipelineConfig {
            download_timeout: Duration::ZERO,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_layout() {
        let config = PipelineConfig::default().with_root("/data");
        assert_eq!(config.raw_video_dir(), PathBuf::from("/data/raw_video"));
        assert_eq!(
            config.output_dir("english"),
            PathBuf::from("/data/multitalk_dataset/english")
        );
        assert_eq!(
            config.failure_log_path("english"),
            PathBuf::from("/data/bad_files_english.txt")
        );
        assert_eq!(config.annotation_dir(), PathBuf::from("/data/annotation"));
    }
}
