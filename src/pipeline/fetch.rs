//! Extraction-engine boundary.
//!
//! The engine (yt-dlp) is consumed as a black box: URL in, at most one local
//! file out. It runs as a child process, so a long download never occupies a
//! runtime worker, and its JSON manifest is validated into typed form right
//! here at the boundary instead of being probed ad hoc downstream.

use async_trait::async_trait;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use thiserror::Error;
use tokio::process::Command;
use tracing::{debug, warn};

use super::format::FormatSpec;

/// Wall-clock bound on one extraction run. A stalled upstream source would
/// otherwise hold its task forever; on expiry the child process is killed.
pub const DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(1800);

/// Failure classes of one fetch. Each maps to its own user-facing message.
#[derive(Debug, Error)]
pub enum FetchError {
    /// The engine could not extract or download: network trouble, removed or
    /// gated content, or the size ceiling was exceeded at the source.
    #[error("extraction failed: {0}")]
    Download(String),
    /// The engine reported success but the file it named does not exist or
    /// is empty. Internal inconsistency, not a download problem.
    #[error("downloaded file not found")]
    FileMissing,
    /// Anything else: spawn failures, malformed manifest.
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

/// The extraction engine as the pipeline sees it.
#[async_trait]
pub trait Extractor: Send + Sync {
    /// Download at most one media item for `url` into `workspace` and return
    /// the path of the produced file. The file is guaranteed to exist and be
    /// non-empty on success.
    async fn fetch(
        &self,
        url: &str,
        spec: &FormatSpec,
        workspace: &Path,
    ) -> Result<PathBuf, FetchError>;
}

/// Subset of the engine's JSON manifest the pipeline relies on. The engine
/// prints one object per downloaded item; fields it may omit are optional
/// here rather than probed later.
#[derive(Debug, Default, Deserialize)]
struct Manifest {
    #[serde(default)]
    requested_downloads: Vec<RequestedDownload>,
    /// Engine's predicted output name, present even when
    /// `requested_downloads` is not.
    #[serde(rename = "_filename")]
    filename: Option<PathBuf>,
    /// Set on playlist-style results; single media entries carry none.
    #[serde(rename = "_type")]
    kind: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RequestedDownload {
    filepath: Option<PathBuf>,
}

impl Manifest {
    fn is_single_media(&self) -> bool {
        matches!(self.kind.as_deref(), None | Some("video"))
    }
}

/// First manifest line that describes a single media entry. Collection
/// results print one line per entry; everything past the first is ignored —
/// one media item per request, never a playlist.
fn first_media_manifest(stdout: &str) -> Option<Manifest> {
    stdout
        .lines()
        .filter_map(|line| serde_json::from_str::<Manifest>(line).ok())
        .find(Manifest::is_single_media)
}

/// Prefer the engine's download record, fall back to its predicted filename,
/// then require the result to be an existing non-empty file.
fn resolve_output_file(manifest: &Manifest) -> Result<PathBuf, FetchError> {
    let path = manifest
        .requested_downloads
        .first()
        .and_then(|d| d.filepath.clone())
        .or_else(|| manifest.filename.clone())
        .ok_or(FetchError::FileMissing)?;

    let meta = std::fs::metadata(&path).map_err(|_| FetchError::FileMissing)?;
    if !meta.is_file() || meta.len() == 0 {
        return Err(FetchError::FileMissing);
    }
    Ok(path)
}

/// `yt-dlp` child-process implementation of [`Extractor`].
#[derive(Debug, Clone, Copy, Default)]
pub struct YtDlp;

#[async_trait]
impl Extractor for YtDlp {
    async fn fetch(
        &self,
        url: &str,
        spec: &FormatSpec,
        workspace: &Path,
    ) -> Result<PathBuf, FetchError> {
        let output_template = workspace.join("media.%(ext)s");

        let mut cmd = Command::new("yt-dlp");
        cmd.arg("--no-playlist")
            .arg("--no-warnings")
            .arg("--quiet")
            .arg("--print-json")
            .arg("--max-filesize")
            .arg(spec.max_size_bytes.to_string())
            .arg("-f")
            .arg(&spec.selector)
            .arg("-o")
            .arg(&output_template);
        if let Some(container) = spec.merge_container {
            cmd.arg("--merge-output-format").arg(container);
        }
        if let Some(ref cookies) = spec.cookies_file {
            cmd.arg("--cookies").arg(cookies);
        }
        cmd.arg(url).stdin(Stdio::null()).kill_on_drop(true);

        debug!(%url, selector = %spec.selector, "invoking yt-dlp");

        let output = match tokio::time::timeout(DOWNLOAD_TIMEOUT, cmd.output()).await {
            Ok(result) => result.map_err(|e| {
                anyhow::Error::new(e).context("failed to launch the extraction engine")
            })?,
            Err(_) => {
                warn!(%url, "extraction timed out, child killed");
                return Err(FetchError::Download(format!(
                    "timed out after {}s",
                    DOWNLOAD_TIMEOUT.as_secs()
                )));
            }
        };

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(FetchError::Download(stderr.trim().to_string()));
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        let manifest = first_media_manifest(&stdout).unwrap_or_default();
        resolve_output_file(&manifest)
    }
}
