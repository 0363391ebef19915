//! Source video download using yt-dlp.
//!
//! Downloads go to a `.part` sibling first and are moved under the cache
//! name only after yt-dlp exits successfully.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tracing::{debug, info, warn};

use crate::command::check_ytdlp;
use crate::error::{MediaError, MediaResult};
use crate::fs_utils::{is_nonempty_file, move_file, partial_path};

/// Default watch URL prefix; the source id is appended.
pub const DEFAULT_YOUTUBE_BASE_URL: &str = "https://www.youtube.com/watch?v=";

/// H.264 video plus AAC audio, so clips can be cut without surprises.
pub const DEFAULT_FORMAT: &str = "bestvideo[ext=mp4][vcodec^=avc1]+bestaudio[ext=m4a][acodec^=mp4a]";

/// Options passed to yt-dlp.
#[derive(Debug, Clone)]
pub struct DownloadOptions {
    /// Prefix joined with the source id to form the video URL
    pub base_url: String,
    /// yt-dlp format selector
    pub format: String,
    /// yt-dlp internal retries for fragment/network errors
    pub tool_retries: u32,
    /// Netscape cookies file for authenticated requests
    pub cookies: Option<PathBuf>,
    /// Wall-clock limit for one yt-dlp run
    pub timeout: Option<Duration>,
}

impl Default for DownloadOptions {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_YOUTUBE_BASE_URL.to_string(),
            format: DEFAULT_FORMAT.to_string(),
            tool_retries: 3,
            cookies: None,
            timeout: None,
        }
    }
}

/// Build the URL for a source id.
pub fn youtube_url(base_url: &str, source_id: &str) -> String {
    format!("{}{}", base_url, source_id)
}

/// Download the video for `source_id` to `output_path`.
///
/// Does nothing if `output_path` already holds a non-empty file.
pub async fn download_video(
    source_id: &str,
    output_path: impl AsRef<Path>,
    options: &DownloadOptions,
) -> MediaResult<()> {
    let output_path = output_path.as_ref();

    if is_nonempty_file(output_path).await {
        info!("Using existing video file: {}", output_path.display());
        return Ok(());
    }

    check_ytdlp()?;

    if let Some(parent) = output_path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }

    let partial = partial_path(output_path);
    if partial.exists() {
        debug!("Removing stale partial download {}", partial.display());
        tokio::fs::remove_file(&partial).await?;
    }

    let url = youtube_url(&options.base_url, source_id);
    info!(
        source_id = source_id,
        output = %output_path.display(),
        "Downloading source video"
    );

    let args = build_args(&url, &partial, options);
    let mut cmd = Command::new("yt-dlp");
    cmd.args(&args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);
    let child = cmd.output();

    let output = match options.timeout {
        Some(timeout) => match tokio::time::timeout(timeout, child).await {
            Ok(result) => result?,
            Err(_) => {
                warn!(
                    source_id = source_id,
                    "yt-dlp timed out after {} seconds, killing process",
                    timeout.as_secs()
                );
                let _ = tokio::fs::remove_file(&partial).await;
                return Err(MediaError::Timeout(timeout.as_secs()));
            }
        },
        None => child.await?,
    };

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        debug!("yt-dlp stderr: {}", stderr);

        let error_msg = stderr
            .lines()
            .rev()
            .find(|l| !l.trim().is_empty())
            .unwrap_or("Unknown error");

        if is_rate_limited(&stderr) {
            warn!(source_id = source_id, "YouTube rate limit detected");
        }

        let _ = tokio::fs::remove_file(&partial).await;
        return Err(MediaError::download_failed(format!(
            "yt-dlp failed: {}",
            error_msg
        )));
    }

    if !is_nonempty_file(&partial).await {
        return Err(MediaError::download_failed("Output file not created"));
    }

    move_file(&partial, output_path).await?;

    let file_size = output_path.metadata()?.len();
    info!(
        source_id = source_id,
        output = %output_path.display(),
        size_mb = file_size as f64 / (1024.0 * 1024.0),
        "Downloaded video successfully"
    );

    Ok(())
}

/// yt-dlp arguments for one download.
pub fn build_args(url: &str, output: &Path, options: &DownloadOptions) -> Vec<String> {
    let mut args = vec![
        "--quiet".to_string(),
        "--no-warnings".to_string(),
        "--no-playlist".to_string(),
        "--retries".to_string(),
        options.tool_retries.to_string(),
        "-f".to_string(),
        options.format.clone(),
        "--merge-output-format".to_string(),
        "mp4".to_string(),
        "-o".to_string(),
        output.to_string_lossy().to_string(),
    ];

    if let Some(cookies) = &options.cookies {
        args.push("--cookies".to_string());
        args.push(cookies.to_string_lossy().to_string());
    }

    args.push(url.to_string());
    args
}

fn is_rate_limited(stderr: &str) -> bool {
    stderr.contains("429")
        || stderr.contains("Too Many Requests")
        || stderr.contains("rate limit")
        || stderr.contains("Sign in to confirm")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_youtube_url() {
        assert_eq!(
            youtube_url(DEFAULT_YOUTUBE_BASE_URL, "abc123def45"),
            "https://www.youtube.com/watch?v=abc123def45"
        );
    }

    #[test]
    fn test_build_args() {
        let options = DownloadOptions {
            cookies: Some(PathBuf::from("/tmp/cookies.txt")),
            ..Default::default()
        };
        let args = build_args(
            "https://www.youtube.com/watch?v=abc",
            Path::new("/data/raw_video/abc.part.mp4"),
            &options,
        );

        let o = args.iter().position(|a| a == "-o").unwrap();
        assert_eq!(args[o + 1], "/data/raw_video/abc.part.mp4");
        assert!(args.windows(2).any(|w| w[0] == "--retries" && w[1] == "3"));
        assert!(args.windows(2).any(|w| w[0] == "--cookies" && w[1] == "/tmp/cookies.txt"));
        assert_eq!(
            args.last().map(String::as_str),
            Some("https://www.youtube.com/watch?v=abc")
        );
    }

    #[test]
    fn test_rate_limit_detection() {
        assert!(is_rate_limited("ERROR: HTTP Error 429: Too Many Requests"));
        assert!(!is_rate_limited("ERROR: Video unavailable"));
    }

    #[tokio::test]
    async fn test_existing_file_is_not_downloaded_again() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("abc.mp4");
        tokio::fs::write(&path, b"cached").await.unwrap();

        // Succeeds without touching yt-dlp.
        download_video("abc", &path, &DownloadOptions::default())
            .await
            .unwrap();
        assert_eq!(tokio::fs::read(&path).await.unwrap(), b"cached");
    }
}
