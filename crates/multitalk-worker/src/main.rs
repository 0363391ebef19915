//! MultiTalk dataset preparation binary.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing::{error, info};

use multitalk_media::{check_ffmpeg, check_ffprobe, check_ytdlp};
use multitalk_models::is_valid_language;
use multitalk_worker::{
    ensure_annotation, init_tracing, run_partition, BatchSummary, Collaborators,
    PartitionOptions, PipelineConfig, RunMode, SourceCache,
};

/// Download and preprocess MultiTalk dataset clips.
#[derive(Debug, Parser)]
#[command(name = "multitalk-prep", version, about)]
struct Cli {
    /// Languages to process
    #[arg(long, num_args = 1.., default_values_t = vec!["english".to_string()])]
    languages: Vec<String>,

    /// Root folder for annotations, raw videos and the dataset
    #[arg(long)]
    root: Option<PathBuf>,

    /// Maximum clips processed at once
    #[arg(long)]
    concurrency: Option<usize>,

    /// Margin added around each face box
    #[arg(long)]
    expand_ratio: Option<f64>,

    /// Only download source videos
    #[arg(long)]
    download_only: bool,

    /// Process a small reproducible sample under `<root>/test_set`
    #[arg(long, alias = "test_only")]
    test_only: bool,

    /// Sample size for --test-only
    #[arg(long, alias = "num_test", default_value_t = 5)]
    num_test: usize,

    /// Only reprocess sources listed in the failure log
    #[arg(long)]
    retry_failed: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    let cli = Cli::parse();

    let mut config = PipelineConfig::from_env();
    if let Some(root) = &cli.root {
        config.root = root.clone();
    }
    if let Some(concurrency) = cli.concurrency {
        config.concurrency = concurrency;
    }
    if let Some(ratio) = cli.expand_ratio {
        config.expand_ratio = ratio;
    }
    config.validate()?;

    check_ytdlp().context("yt-dlp is required")?;
    if !cli.download_only {
        check_ffmpeg().context("ffmpeg is required")?;
        check_ffprobe().context("ffprobe is required")?;
    }

    let annotation_dir = config.annotation_dir();
    if cli.test_only {
        let root = config.root.join("test_set");
        config = config.with_root(root);
    }

    info!("Starting multitalk-prep");
    info!("Pipeline config: {:?}", config);

    let options = PartitionOptions {
        mode: if cli.download_only {
            RunMode::DownloadOnly
        } else {
            RunMode::Full
        },
        sample: cli.test_only.then_some(cli.num_test),
        retry_failed: cli.retry_failed,
    };

    let collaborators = Collaborators::from_config(&config);
    let cache = Arc::new(SourceCache::new(config.raw_video_dir()));
    let client = reqwest::Client::new();

    let mut total = BatchSummary::default();
    for language in &cli.languages {
        if !is_valid_language(language) {
            error!("Invalid language: {}", language);
            continue;
        }
        info!("Processing {}...", language);

        let annotation_path = match ensure_annotation(
            &client,
            &config.annotation_base_url,
            language,
            &annotation_dir,
        )
        .await
        {
            Ok(path) => path,
            Err(e) => {
                error!(language = %language, "Failed to fetch annotations: {}", e);
                continue;
            }
        };

        match run_partition(
            &config,
            &collaborators,
            &cache,
            &annotation_path,
            language,
            &options,
        )
        .await
        {
            Ok(summary) => {
                println!("{}: {}", language, summary);
                if summary.failures() > 0 {
                    println!(
                        "{}: failures written to {}",
                        language,
                        config.failure_log_path(language).display()
                    );
                }
                total.merge(&summary);
            }
            Err(e) if e.is_fatal() => return Err(e.into()),
            Err(e) => error!(language = %language, "Partition failed: {}", e),
        }
    }

    println!("Total: {}", total);
    info!("multitalk-prep finished ({} source fetches)", cache.fetch_count());
    Ok(())
}
