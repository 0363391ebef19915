//! Annotation file download.

use std::path::{Path, PathBuf};

use reqwest::Client;
use tracing::info;

use multitalk_media::{is_nonempty_file, move_file, partial_path};

use crate::error::{WorkerError, WorkerResult};

/// URL of the annotation file for `language`.
pub fn annotation_url(base_url: &str, language: &str) -> String {
    if base_url.ends_with('/') {
        format!("{}{}.json", base_url, language)
    } else {
        format!("{}/{}.json", base_url, language)
    }
}

/// Local path of the annotation file for `language`.
pub fn annotation_path(dir: impl AsRef<Path>, language: &str) -> PathBuf {
    dir.as_ref().join(format!("{}.json", language))
}

/// Make sure `<dir>/<language>.json` exists, downloading it if needed.
pub async fn ensure_annotation(
    client: &Client,
    base_url: &str,
    language: &str,
    dir: impl AsRef<Path>,
) -> WorkerResult<PathBuf> {
    let path = annotation_path(&dir, language);
    if is_nonempty_file(&path).await {
        return Ok(path);
    }

    tokio::fs::create_dir_all(dir.as_ref()).await?;

    let url = annotation_url(base_url, language);
    info!(language = language, url = %url, "Downloading annotation file");

    let response = client.get(&url).send().await?;
    if !response.status().is_success() {
        let status = response.status();
        return Err(WorkerError::annotation_fetch(format!(
            "{} returned {}",
            url, status
        )));
    }
    let body = response.bytes().await?;
    if body.is_empty() {
        return Err(WorkerError::annotation_fetch(format!("{} returned an empty body", url)));
    }

    let partial = partial_path(&path);
    tokio::fs::write(&partial, &body).await?;
    move_file(&partial, &path).await?;

    info!(
        language = language,
        bytes = body.len(),
        "Saved annotation file to {}",
        path.display()
    );
    Ok(path)
}
