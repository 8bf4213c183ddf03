//! File extension → delivery-kind mapping.

use std::path::Path;

/// Which Telegram upload primitive a fetched file should go through.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    /// Photo upload
    Image,
    /// Streamable video upload
    Video,
    /// Generic document upload
    Document,
}

const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "webp", "bmp"];
const VIDEO_EXTENSIONS: &[&str] = &["mp4", "mov", "m4v", "webm", "mkv", "avi", "gif"];

/// Classify a file by its lower-cased extension. Anything unrecognized
/// ships as a document.
#[must_use]
pub fn media_kind(path: &Path) -> MediaKind {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);
    match ext.as_deref() {
        Some(e) if IMAGE_EXTENSIONS.contains(&e) => MediaKind::Image,
        Some(e) if VIDEO_EXTENSIONS.contains(&e) => MediaKind::Video,
        _ => MediaKind::Document,
    }
}
