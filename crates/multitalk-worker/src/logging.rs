//! Structured logging utilities.
//!
//! Every clip is logged with its source id and output name so the lines
//! of one clip can be picked out of an interleaved concurrent run.

use tracing::{error, info, Span};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use multitalk_models::ClipDescriptor;

/// Install the global subscriber.
///
/// Plain colored output by default, JSON lines with `LOG_FORMAT=json`.
/// `RUST_LOG` directives are honored on top of `multitalk=info`.
pub fn init_tracing() {
    let use_json = std::env::var("LOG_FORMAT")
        .map(|v| v.to_lowercase() == "json")
        .unwrap_or(false);

    let mut env_filter = EnvFilter::from_default_env();
    if let Ok(directive) = "multitalk=info".parse() {
        env_filter = env_filter.add_directive(directive);
    }

    if use_json {
        tracing_subscriber::registry()
            .with(fmt::layer().json())
            .with(env_filter)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(
                fmt::layer()
                    .with_ansi(true)
                    .with_target(true)
                    .with_thread_ids(false)
                    .with_file(false)
                    .with_line_number(false),
            )
            .with(env_filter)
            .init();
    }
}

/// Clip logger with consistent contextual fields.
#[derive(Debug, Clone)]
pub struct ClipLogger {
    source_id: String,
    output_name: String,
}

impl ClipLogger {
    pub fn new(source_id: &str, output_name: &str) -> Self {
        Self {
            source_id: source_id.to_string(),
            output_name: output_name.to_string(),
        }
    }

    pub fn for_descriptor(descriptor: &ClipDescriptor) -> Self {
        Self::new(&descriptor.source_id, &descriptor.output_name)
    }

    pub fn log_start(&self, message: &str) {
        info!(
            source_id = %self.source_id,
            output_name = %self.output_name,
            "Clip started: {}", message
        );
    }

    pub fn log_progress(&self, message: &str) {
        info!(
            source_id = %self.source_id,
            output_name = %self.output_name,
            "Clip progress: {}", message
        );
    }

    pub fn log_error(&self, message: &str) {
        error!(
            source_id = %self.source_id,
            output_name = %self.output_name,
            "Clip error: {}", message
        );
    }

    pub fn log_completion(&self, message: &str) {
        info!(
            source_id = %self.source_id,
            output_name = %self.output_name,
            "Clip completed: {}", message
        );
    }

    pub fn source_id(&self) -> &str {
        &self.source_id
    }

    pub fn output_name(&self) -> &str {
        &self.output_name
    }

    /// Span carrying the clip fields, for instrumenting the whole job.
    pub fn create_span(&self) -> Span {
        tracing::info_span!(
            "clip",
            source_id = %self.source_id,
            output_name = %self.output_name
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use multitalk_models::{NormalizedBox, TimeRange};

    #[test]
    fn test_clip_logger_creation() {
        let descriptor = ClipDescriptor {
            source_id: "abc123".to_string(),
            output_name: "abc123_0001.mp4".to_string(),
            time_range: TimeRange::new(0.0, 1.0),
            bbox: NormalizedBox::new(0.1, 0.5, 0.1, 0.5),
            language: None,
        };
        let logger = ClipLogger::for_descriptor(&descriptor);

        assert_eq!(logger.source_id(), "abc123");
        assert_eq!(logger.output_name(), "abc123_0001.mp4");
    }

    #[test]
    fn test_logging_methods_do_not_panic() {
        let logger = ClipLogger::new("abc123", "clip.mp4");
        logger.log_start("test");
        logger.log_progress("test");
        logger.log_error("test");
        logger.log_completion("test");
        let _span = logger.create_span();
    }
}
