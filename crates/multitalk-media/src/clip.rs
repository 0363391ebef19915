//! Clip rendering: trim, crop to the face square, rescale, resample.

use std::path::Path;
use tracing::info;

use multitalk_models::{CropRectangle, TimeRange};

use crate::command::{FfmpegCommand, FfmpegRunner};
use crate::error::{MediaError, MediaResult};
use crate::fs_utils::{move_file, partial_path};

/// Target format of every dataset clip.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputFormat {
    pub width: u32,
    pub height: u32,
    pub fps: u32,
    pub video_codec: String,
    pub audio_codec: String,
    pub crf: u8,
}

impl Default for OutputFormat {
    fn default() -> Self {
        Self {
            width: 512,
            height: 512,
            fps: 25,
            video_codec: "libx264".to_string(),
            audio_codec: "aac".to_string(),
            crf: 18,
        }
    }
}

impl OutputFormat {
    /// `-vf` chain: crop to the face square, then scale to the target size.
    pub fn filter_for(&self, crop: &CropRectangle) -> String {
        format!(
            "{},scale={}:{}",
            crop.ffmpeg_crop_filter(),
            self.width,
            self.height
        )
    }
}

/// Build the FFmpeg command for one clip.
pub fn build_clip_command(
    input: &Path,
    output: &Path,
    crop: &CropRectangle,
    time_range: &TimeRange,
    format: &OutputFormat,
) -> FfmpegCommand {
    FfmpegCommand::new(input, output)
        .seek(time_range.start_secs)
        .duration(time_range.duration())
        .video_filter(format.filter_for(crop))
        .frame_rate(format.fps)
        .video_codec(&format.video_codec)
        .crf(format.crf)
        .audio_codec(&format.audio_codec)
}

/// Render one clip from `input` into `output`.
///
/// FFmpeg writes to a `.part` sibling which is moved into place on
/// success, so an interrupted run never leaves a truncated clip behind.
pub async fn render_clip(
    input: impl AsRef<Path>,
    output: impl AsRef<Path>,
    crop: &CropRectangle,
    time_range: &TimeRange,
    format: &OutputFormat,
    runner: &FfmpegRunner,
) -> MediaResult<()> {
    let input = input.as_ref();
    let output = output.as_ref();

    if !input.exists() {
        return Err(MediaError::FileNotFound(input.to_path_buf()));
    }
    if let Some(parent) = output.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }

    info!(
        "Rendering clip: {} -> {} ({:.2}s-{:.2}s, {})",
        input.display(),
        output.display(),
        time_range.start_secs,
        time_range.end_secs,
        crop.ffmpeg_crop_filter()
    );

    let partial = partial_path(output);
    let cmd = build_clip_command(input, &partial, crop, time_range, format);

    if let Err(e) = runner.run(&cmd).await {
        let _ = tokio::fs::remove_file(&partial).await;
        return Err(e);
    }

    move_file(&partial, output).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clip_command_args() {
        let crop = CropRectangle::new(304, 496, 304, 496);
        let range = TimeRange::new(12.5, 17.0);
        let cmd = build_clip_command(
            Path::new("raw_video/abc.mp4"),
            Path::new("out/clip.part.mp4"),
            &crop,
            &range,
            &OutputFormat::default(),
        );
        let args = cmd.build_args();

        assert!(args.windows(2).any(|w| w[0] == "-ss" && w[1] == "12.500"));
        assert!(args.windows(2).any(|w| w[0] == "-t" && w[1] == "4.500"));
        assert!(args
            .windows(2)
            .any(|w| w[0] == "-vf" && w[1] == "crop=w=192:h=192:x=304:y=304,scale=512:512"));
        assert!(args.windows(2).any(|w| w[0] == "-r" && w[1] == "25"));
        assert_eq!(args.last().map(String::as_str), Some("out/clip.part.mp4"));
    }

    #[tokio::test]
    async fn test_render_missing_input() {
        let dir = tempfile::TempDir::new().unwrap();
        let err = render_clip(
            dir.path().join("missing.mp4"),
            dir.path().join("out.mp4"),
            &CropRectangle::new(0, 10, 0, 10),
            &TimeRange::new(0.0, 1.0),
            &OutputFormat::default(),
            &FfmpegRunner::new(),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, MediaError::FileNotFound(_)));
    }
}
