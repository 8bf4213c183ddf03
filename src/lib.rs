#![deny(missing_docs)]
//! Telegram media-fetch bot
//!
//! Accepts links from a short list of supported platforms (Instagram, TikTok,
//! YouTube) in direct messages or inline queries, downloads the referenced
//! media via the extraction engine, and delivers it back into the chat.
//! Inline delivery relays the file through a cache chat first, because an
//! inline message can only be edited to reference a file Telegram already
//! knows about.

/// Telegram bot wiring: handlers and the settings UI
pub mod bot;
/// Configuration management
pub mod config;
/// The fetch-and-deliver pipeline
pub mod pipeline;
/// Per-user delivery preferences
pub mod prefs;
/// Background job submission
pub mod runner;
pub mod utils;
