//! End-to-end pipeline checks against a stub extraction engine: extraction,
//! validation, fetch, classification, and the inline answer surface. No
//! network involved.

use async_trait::async_trait;
use std::path::{Path, PathBuf};

use tgmedia_bot::bot::handlers::build_inline_results;
use tgmedia_bot::pipeline::classify::{media_kind, MediaKind};
use tgmedia_bot::pipeline::extract::extract_url;
use tgmedia_bot::pipeline::fetch::{Extractor, FetchError};
use tgmedia_bot::pipeline::format::{build_format_spec, FormatSpec};
use tgmedia_bot::pipeline::validate::is_supported_source;
use tgmedia_bot::prefs::QualityTier;
use teloxide::types::InlineQueryResult;

/// Engine stub that "downloads" by writing a fixed file into the workspace.
struct StubEngine {
    file_name: &'static str,
}

#[async_trait]
impl Extractor for StubEngine {
    async fn fetch(
        &self,
        _url: &str,
        _spec: &FormatSpec,
        workspace: &Path,
    ) -> Result<PathBuf, FetchError> {
        let path = workspace.join(self.file_name);
        std::fs::write(&path, b"media bytes").map_err(|e| FetchError::Internal(e.into()))?;
        Ok(path)
    }
}

/// Engine stub that always fails the way an unreachable source does.
struct FailingEngine;

#[async_trait]
impl Extractor for FailingEngine {
    async fn fetch(
        &self,
        url: &str,
        _spec: &FormatSpec,
        _workspace: &Path,
    ) -> Result<PathBuf, FetchError> {
        Err(FetchError::Download(format!("unable to download {url}")))
    }
}

fn spec() -> FormatSpec {
    build_format_spec(QualityTier::Best, true, 49 * 1024 * 1024, None)
}

#[tokio::test]
async fn test_direct_flow_from_text_to_classified_video() {
    // Message text with punctuation around the link
    let text = "check this (https://youtu.be/abc123).";
    let url = extract_url(text).expect("url expected");
    assert_eq!(url, "https://youtu.be/abc123");
    assert!(is_supported_source(url));

    let engine = StubEngine {
        file_name: "media.mp4",
    };
    let workspace = tempfile::tempdir().expect("workspace");
    let file = engine
        .fetch(url, &spec(), workspace.path())
        .await
        .expect("stub fetch");

    assert!(file.is_file());
    assert_eq!(media_kind(&file), MediaKind::Video);
}

#[tokio::test]
async fn test_image_and_unknown_extensions_classify() {
    let workspace = tempfile::tempdir().expect("workspace");

    let engine = StubEngine {
        file_name: "media.png",
    };
    let file = engine
        .fetch("https://instagram.com/p/x", &spec(), workspace.path())
        .await
        .expect("stub fetch");
    assert_eq!(media_kind(&file), MediaKind::Image);

    let engine = StubEngine {
        file_name: "media.xyz",
    };
    let file = engine
        .fetch("https://instagram.com/p/x", &spec(), workspace.path())
        .await
        .expect("stub fetch");
    assert_eq!(media_kind(&file), MediaKind::Document);
}

#[tokio::test]
async fn test_identical_requests_use_independent_workspaces() {
    let engine = StubEngine {
        file_name: "media.mp4",
    };
    let url = "https://youtu.be/same";

    let first_ws = tempfile::tempdir().expect("workspace");
    let second_ws = tempfile::tempdir().expect("workspace");
    let first = engine
        .fetch(url, &spec(), first_ws.path())
        .await
        .expect("first run");
    let second = engine
        .fetch(url, &spec(), second_ws.path())
        .await
        .expect("second run");

    // Same URL, two runs, no shared state
    assert_ne!(first, second);
    assert!(first.is_file());
    assert!(second.is_file());

    // Dropping a workspace removes its file without touching the other
    drop(first_ws);
    assert!(!first.exists());
    assert!(second.exists());
}

#[tokio::test]
async fn test_download_failure_is_recoverable_classification() {
    let workspace = tempfile::tempdir().expect("workspace");
    let err = FailingEngine
        .fetch("https://youtu.be/gone", &spec(), workspace.path())
        .await
        .expect_err("stub must fail");
    assert!(matches!(err, FetchError::Download(_)));
}

fn single_article(query: &str) -> teloxide::types::InlineQueryResultArticle {
    let mut results = build_inline_results(query);
    assert_eq!(results.len(), 1, "inline answers carry exactly one entry");
    match results.remove(0) {
        InlineQueryResult::Article(article) => article,
        other => panic!("expected an article, got {other:?}"),
    }
}

#[test]
fn test_inline_answer_for_unsupported_site() {
    let article = single_article("https://vimeo.com/123");
    assert_eq!(article.title, "Сайт не поддерживается");
    assert!(article.reply_markup.is_none());
}

#[test]
fn test_inline_answer_for_supported_site_has_placeholder() {
    let article = single_article("https://www.tiktok.com/@user/video/42");
    assert_eq!(article.title, "Скачать медиа");
    assert!(article.reply_markup.is_some());
}
