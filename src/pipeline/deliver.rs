//! Delivery coordination.
//!
//! Two variants of the same state machine share the fetch and classify
//! stages. Direct mode uploads straight into the requesting chat. Inline
//! mode first relays the file through the cache chat: the inline-edit
//! primitive can only attach file references Telegram already holds, never
//! raw bytes, so the relay upload exists solely to mint such a reference.
//!
//! Either way the user-visible message always reaches a terminal state —
//! final media or a failure text — and the request's private workspace is
//! removed on every exit path.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use teloxide::prelude::*;
use teloxide::types::{
    ChatId, InputFile, InputMedia, InputMediaDocument, InputMediaPhoto, InputMediaVideo, MessageId,
};
use tempfile::TempDir;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{error, info};

use super::classify::{media_kind, MediaKind};
use super::fetch::{Extractor, FetchError};
use super::format::build_format_spec;
use crate::config::Settings;
use crate::prefs::UserPrefs;
use crate::utils;

/// Status shown while a request is running.
pub const MSG_FETCHING: &str = "Скачиваю...";
/// Extraction or download failed.
pub const MSG_DOWNLOAD_FAILED: &str = "Не удалось скачать видео.";
/// Telegram rejected an upload or edit.
pub const MSG_TELEGRAM_FAILED: &str = "Ошибка Telegram, попробуйте еще раз.";
/// The engine claimed success but produced no file.
pub const MSG_FILE_MISSING: &str = "Файл не найден после загрузки.";

/// Telegram's caption length ceiling.
const CAPTION_LIMIT: usize = 1024;

/// One link request. Created when the event arrives, consumed entirely by a
/// single pipeline run, never persisted.
#[derive(Debug, Clone)]
pub struct Request {
    /// Validated source link
    pub url: String,
    /// Frozen copy of the issuer's preferences, taken at dispatch time. A
    /// settings change mid-download must not alter this request's outcome.
    pub prefs: UserPrefs,
    /// Where the result must land
    pub target: DeliveryTarget,
}

/// The two delivery variants.
#[derive(Debug, Clone)]
pub enum DeliveryTarget {
    /// Reply into the chat the link came from
    Direct {
        /// Requesting chat
        chat: ChatId,
    },
    /// Edit the placeholder minted for a chosen inline result
    Inline {
        /// Transport-issued editable-message handle
        handle: String,
    },
}

/// Lifecycle of one chosen inline result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobState {
    /// Handle received, pipeline running
    Registered,
    /// Placeholder carries the final media
    Resolved,
    /// Placeholder carries a failure message
    Failed,
}

/// Tracks every chosen inline result from registration to its terminal
/// state, keyed by the transport-issued message handle.
#[derive(Debug, Default)]
pub struct InlineJobs {
    inner: Mutex<HashMap<String, JobState>>,
}

impl InlineJobs {
    /// Empty tracker.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    async fn register(&self, handle: &str) {
        self.inner
            .lock()
            .await
            .insert(handle.to_string(), JobState::Registered);
    }

    async fn settle(&self, handle: &str, state: JobState) {
        self.inner.lock().await.insert(handle.to_string(), state);
    }

    /// Current state of a job, if the handle is known.
    pub async fn state(&self, handle: &str) -> Option<JobState> {
        self.inner.lock().await.get(handle).copied()
    }
}

/// Anything that can end a delivery run short of success.
#[derive(Debug, Error)]
enum DeliverError {
    #[error(transparent)]
    Fetch(#[from] FetchError),
    #[error("telegram request failed: {0}")]
    Telegram(#[from] teloxide::RequestError),
    /// The relay upload went through but the sent message carried no file
    /// reference to reuse.
    #[error("uploaded message carried no file reference")]
    MissingFileId,
}

fn failure_text(err: &DeliverError) -> &'static str {
    match err {
        DeliverError::Fetch(FetchError::FileMissing) => MSG_FILE_MISSING,
        DeliverError::Fetch(_) => MSG_DOWNLOAD_FAILED,
        DeliverError::Telegram(_) | DeliverError::MissingFileId => MSG_TELEGRAM_FAILED,
    }
}

fn log_failure(err: &DeliverError, url: &str) {
    match err {
        DeliverError::Fetch(FetchError::Download(reason)) => {
            error!(%url, %reason, "download failed");
        }
        DeliverError::Fetch(FetchError::FileMissing) => {
            error!(%url, "file missing after download");
        }
        DeliverError::Fetch(FetchError::Internal(e)) => {
            error!(%url, error = %e, "unexpected extraction failure");
        }
        DeliverError::Telegram(e) => error!(%url, error = %e, "telegram request failed"),
        DeliverError::MissingFileId => error!(%url, "relay upload returned no file id"),
    }
}

/// Upload primitive for a classified file under the user's preferences.
/// `send_as_file` downgrades playable video to a plain document; photos are
/// unaffected by it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum UploadKind {
    Photo,
    Video,
    Document,
}

fn upload_kind(kind: MediaKind, send_as_file: bool) -> UploadKind {
    match kind {
        MediaKind::Image => UploadKind::Photo,
        MediaKind::Video if !send_as_file => UploadKind::Video,
        MediaKind::Video | MediaKind::Document => UploadKind::Document,
    }
}

/// `Source: <url>` caption, attached only to videos and only when the user
/// asked for it. Truncated to Telegram's caption limit.
fn caption_for(kind: MediaKind, req: &Request) -> Option<String> {
    (kind == MediaKind::Video && req.prefs.add_link)
        .then(|| utils::truncate_str(format!("Source: {}", req.url), CAPTION_LIMIT))
}

/// Wrap an input file (raw upload or minted file id) into the edit payload
/// matching its upload primitive.
fn assemble_media(upload: UploadKind, input: InputFile, caption: Option<String>) -> InputMedia {
    match upload {
        UploadKind::Photo => {
            let mut media = InputMediaPhoto::new(input);
            if let Some(c) = caption {
                media = media.caption(c);
            }
            InputMedia::Photo(media)
        }
        UploadKind::Video => {
            let mut media = InputMediaVideo::new(input).supports_streaming(true);
            if let Some(c) = caption {
                media = media.caption(c);
            }
            InputMedia::Video(media)
        }
        UploadKind::Document => {
            let mut media = InputMediaDocument::new(input);
            media.disable_content_type_detection = Some(true);
            if let Some(c) = caption {
                media = media.caption(c);
            }
            InputMedia::Document(media)
        }
    }
}

/// Runs the fetch-classify-deliver state machine for each request.
pub struct Coordinator {
    extractor: Arc<dyn Extractor>,
    settings: Arc<Settings>,
    can_mux: bool,
    jobs: InlineJobs,
}

impl Coordinator {
    /// Build a coordinator around an extraction engine. `can_mux` is the
    /// startup probe result for the muxing tool.
    #[must_use]
    pub fn new(extractor: Arc<dyn Extractor>, settings: Arc<Settings>, can_mux: bool) -> Self {
        Self {
            extractor,
            settings,
            can_mux,
            jobs: InlineJobs::new(),
        }
    }

    /// Inline job states, exposed for inspection.
    #[must_use]
    pub fn jobs(&self) -> &InlineJobs {
        &self.jobs
    }

    /// Run one request to its terminal state. Infallible from the caller's
    /// view: failures are reported into the chat, not returned.
    pub async fn deliver(&self, bot: &Bot, req: Request) {
        match req.target.clone() {
            DeliveryTarget::Direct { chat } => self.deliver_direct(bot, chat, &req).await,
            DeliveryTarget::Inline { handle } => self.deliver_inline(bot, &handle, &req).await,
        }
    }

    /// Fetch into a fresh private workspace. The returned guard owns the
    /// workspace; dropping it removes the directory and the file inside.
    async fn fetch(&self, req: &Request) -> Result<(TempDir, PathBuf, MediaKind), FetchError> {
        let workspace = TempDir::with_prefix("tgmedia_")
            .map_err(|e| anyhow::Error::new(e).context("failed to create workspace"))?;
        let spec = build_format_spec(
            req.prefs.quality,
            self.can_mux,
            self.settings.max_file_size_bytes(),
            self.settings.cookies_file.clone().map(PathBuf::from),
        );
        let file = self
            .extractor
            .fetch(&req.url, &spec, workspace.path())
            .await?;
        let kind = media_kind(&file);
        info!(url = %req.url, file = %file.display(), ?kind, "media fetched");
        Ok((workspace, file, kind))
    }

    /// Direct-chat delivery: status notice → fetch → upload → replace the
    /// notice with the media.
    async fn deliver_direct(&self, bot: &Bot, chat: ChatId, req: &Request) {
        let status = match bot.send_message(chat, MSG_FETCHING).await {
            Ok(message) => message,
            Err(e) => {
                error!(url = %req.url, error = %e, "failed to send status message");
                return;
            }
        };
        if let Err(err) = self.run_direct(bot, chat, status.id, req).await {
            log_failure(&err, &req.url);
            if let Err(e) = bot
                .edit_message_text(chat, status.id, failure_text(&err))
                .await
            {
                error!(url = %req.url, error = %e, "failed to report failure to chat");
            }
        }
    }

    async fn run_direct(
        &self,
        bot: &Bot,
        chat: ChatId,
        status: MessageId,
        req: &Request,
    ) -> Result<(), DeliverError> {
        let (_workspace, file, kind) = self.fetch(req).await?;
        let upload = upload_kind(kind, req.prefs.send_as_file);
        let media = assemble_media(upload, InputFile::file(file), caption_for(kind, req));
        bot.edit_message_media(chat, status, media).await?;
        Ok(())
    }

    /// Inline delivery: edit the placeholder → fetch → relay upload to the
    /// cache chat → attach the minted file reference to the placeholder.
    async fn deliver_inline(&self, bot: &Bot, handle: &str, req: &Request) {
        self.jobs.register(handle).await;
        match self.run_inline(bot, handle, req).await {
            Ok(()) => self.jobs.settle(handle, JobState::Resolved).await,
            Err(err) => {
                self.jobs.settle(handle, JobState::Failed).await;
                log_failure(&err, &req.url);
                if let Err(e) = bot
                    .edit_message_text_inline(handle, failure_text(&err))
                    .await
                {
                    error!(url = %req.url, error = %e, "failed to report failure to inline message");
                }
            }
        }
    }

    async fn run_inline(&self, bot: &Bot, handle: &str, req: &Request) -> Result<(), DeliverError> {
        bot.edit_message_text_inline(handle, MSG_FETCHING).await?;
        let (_workspace, file, kind) = self.fetch(req).await?;
        let upload = upload_kind(kind, req.prefs.send_as_file);
        let reference = self.upload_to_relay(bot, &file, upload).await?;
        let media = assemble_media(upload, reference, caption_for(kind, req));
        bot.edit_message_media_inline(handle, media).await?;
        Ok(())
    }

    /// Upload the file once into the cache chat and return the minted
    /// server-side file reference. The end user never sees this chat.
    async fn upload_to_relay(
        &self,
        bot: &Bot,
        file: &Path,
        upload: UploadKind,
    ) -> Result<InputFile, DeliverError> {
        let relay = ChatId(self.settings.cache_chat_id);
        let file_id = match upload {
            UploadKind::Photo => {
                let sent = utils::retry_telegram_operation(|| async {
                    bot.send_photo(relay, InputFile::file(file.to_path_buf()))
                        .await
                })
                .await?;
                sent.photo()
                    .and_then(<[_]>::last)
                    .map(|photo| photo.file.id.clone())
            }
            UploadKind::Video => {
                let sent = utils::retry_telegram_operation(|| async {
                    bot.send_video(relay, InputFile::file(file.to_path_buf()))
                        .supports_streaming(true)
                        .await
                })
                .await?;
                sent.video().map(|video| video.file.id.clone())
            }
            UploadKind::Document => {
                let sent = utils::retry_telegram_operation(|| async {
                    bot.send_document(relay, InputFile::file(file.to_path_buf()))
                        .disable_content_type_detection(true)
                        .await
                })
                .await?;
                sent.document().map(|doc| doc.file.id.clone())
            }
        };
        let file_id = file_id.ok_or(DeliverError::MissingFileId)?;
        Ok(InputFile::file_id(file_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prefs::QualityTier;
    use teloxide::types::FileId;

    fn request(url: &str, prefs: UserPrefs) -> Request {
        Request {
            url: url.to_string(),
            prefs,
            target: DeliveryTarget::Direct { chat: ChatId(1) },
        }
    }

    fn prefs() -> UserPrefs {
        UserPrefs {
            quality: QualityTier::Best,
            add_link: true,
            send_as_file: false,
        }
    }

    #[test]
    fn test_upload_kind_follows_preferences() {
        assert_eq!(upload_kind(MediaKind::Image, false), UploadKind::Photo);
        assert_eq!(upload_kind(MediaKind::Image, true), UploadKind::Photo);
        assert_eq!(upload_kind(MediaKind::Video, false), UploadKind::Video);
        assert_eq!(upload_kind(MediaKind::Video, true), UploadKind::Document);
        assert_eq!(
            upload_kind(MediaKind::Document, false),
            UploadKind::Document
        );
    }

    #[test]
    fn test_caption_only_for_videos_with_add_link() {
        let req = request("https://youtu.be/abc", prefs());
        assert_eq!(
            caption_for(MediaKind::Video, &req).as_deref(),
            Some("Source: https://youtu.be/abc")
        );
        assert_eq!(caption_for(MediaKind::Image, &req), None);
        assert_eq!(caption_for(MediaKind::Document, &req), None);

        let mut no_link = prefs();
        no_link.add_link = false;
        let req = request("https://youtu.be/abc", no_link);
        assert_eq!(caption_for(MediaKind::Video, &req), None);
    }

    #[test]
    fn test_caption_truncated_to_limit() {
        let long_url = format!("https://youtu.be/{}", "a".repeat(2000));
        let req = request(&long_url, prefs());
        let caption = caption_for(MediaKind::Video, &req).expect("caption expected");
        assert_eq!(caption.chars().count(), CAPTION_LIMIT);
    }

    #[test]
    fn test_failure_text_mapping() {
        assert_eq!(
            failure_text(&DeliverError::Fetch(FetchError::Download("x".into()))),
            MSG_DOWNLOAD_FAILED
        );
        assert_eq!(
            failure_text(&DeliverError::Fetch(FetchError::FileMissing)),
            MSG_FILE_MISSING
        );
        assert_eq!(
            failure_text(&DeliverError::MissingFileId),
            MSG_TELEGRAM_FAILED
        );
    }

    #[test]
    fn test_assemble_media_variants() {
        let input = || InputFile::file_id(FileId("file-id".to_string()));
        assert!(matches!(
            assemble_media(UploadKind::Photo, input(), None),
            InputMedia::Photo(_)
        ));
        assert!(matches!(
            assemble_media(UploadKind::Video, input(), Some("Source: x".into())),
            InputMedia::Video(_)
        ));
        assert!(matches!(
            assemble_media(UploadKind::Document, input(), None),
            InputMedia::Document(_)
        ));
    }

    #[tokio::test]
    async fn test_inline_jobs_state_machine() {
        let jobs = InlineJobs::new();
        assert_eq!(jobs.state("m1").await, None);

        jobs.register("m1").await;
        assert_eq!(jobs.state("m1").await, Some(JobState::Registered));

        jobs.settle("m1", JobState::Resolved).await;
        assert_eq!(jobs.state("m1").await, Some(JobState::Resolved));

        jobs.register("m2").await;
        jobs.settle("m2", JobState::Failed).await;
        assert_eq!(jobs.state("m2").await, Some(JobState::Failed));
        // Settling one job never disturbs another
        assert_eq!(jobs.state("m1").await, Some(JobState::Resolved));
    }
}
