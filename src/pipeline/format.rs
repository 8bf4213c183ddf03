//! Format-selection policy.
//!
//! Derives the extraction engine's format selector from the requested
//! quality tier and whether a muxing tool is present on the host. Without
//! ffmpeg the engine cannot merge separate video and audio streams into one
//! container, so the policy degrades to already-combined single-file formats.

use crate::prefs::QualityTier;
use std::path::PathBuf;

/// Per-request download parameters handed to the extraction engine.
/// Recomputed for every request; never cached.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormatSpec {
    /// Format selector expression
    pub selector: String,
    /// Container to merge separate streams into, when merging is possible
    pub merge_container: Option<&'static str>,
    /// Downloads larger than this are rejected at the source
    pub max_size_bytes: u64,
    /// Cookie jar for gated content
    pub cookies_file: Option<PathBuf>,
}

/// Derive the format selection for one request.
#[must_use]
pub fn build_format_spec(
    tier: QualityTier,
    can_mux: bool,
    max_size_bytes: u64,
    cookies_file: Option<PathBuf>,
) -> FormatSpec {
    let selector = match (can_mux, tier.height()) {
        (true, None) => "bv*+ba/best".to_string(),
        (true, Some(h)) => format!("bv*[height<={h}]+ba/b[height<={h}]/best[height<={h}]"),
        (false, None) => "best".to_string(),
        (false, Some(h)) => format!("best[height<={h}]/best"),
    };
    FormatSpec {
        selector,
        merge_container: can_mux.then_some("mp4"),
        max_size_bytes,
        cookies_file,
    }
}

/// Probe for the muxing tool. Done once at process start; the result is
/// carried for the lifetime of the service.
#[must_use]
pub fn muxing_available() -> bool {
    command_on_path("ffmpeg")
}

fn command_on_path(binary: &str) -> bool {
    std::env::var_os("PATH").is_some_and(|paths| {
        std::env::split_paths(&paths).any(|dir| dir.join(binary).is_file())
    })
}
