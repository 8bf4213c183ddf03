//! Configuration and settings management
//!
//! Loads settings from environment variables (a `.env` file is read by `main`
//! before this runs) and validates the startup-critical values. A missing or
//! malformed token / cache chat id is fatal: the process must not start
//! polling without them.

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

/// Initial backoff for Telegram API retries, milliseconds
pub const TELEGRAM_API_INITIAL_BACKOFF_MS: u64 = 500;
/// Backoff ceiling for Telegram API retries, milliseconds
pub const TELEGRAM_API_MAX_BACKOFF_MS: u64 = 4000;
/// Attempts per Telegram API upload before giving up
pub const TELEGRAM_API_MAX_RETRIES: usize = 3;

/// Raw values as they come out of the environment, before validation.
/// `CACHE_CHAT_ID` and `MAX_FILE_SIZE_MB` arrive as strings and are parsed
/// explicitly so the error names the offending variable.
#[derive(Debug, Deserialize)]
struct RawSettings {
    bot_token: Option<String>,
    cache_chat_id: Option<String>,
    max_file_size_mb: Option<String>,
    cookies_file: Option<String>,
}

/// Validated application settings
#[derive(Debug, Clone)]
pub struct Settings {
    /// Telegram Bot API token
    pub bot_token: String,
    /// Chat the bot relays uploads through to mint reusable file ids for
    /// inline delivery. Channel-style ids are negative.
    pub cache_chat_id: i64,
    /// Per-download size ceiling, megabytes
    pub max_file_size_mb: u64,
    /// Netscape cookie jar for age- or login-gated sources
    pub cookies_file: Option<String>,
}

const DEFAULT_MAX_FILE_SIZE_MB: u64 = 49;

impl Settings {
    /// Load and validate settings from the environment.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` when loading fails or when a required value
    /// is missing or malformed.
    pub fn new() -> Result<Self, ConfigError> {
        let s = Config::builder()
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name("config/local").required(false))
            // Environment::default() auto-converts UPPER_SNAKE_CASE to
            // snake_case; ignore_empty treats empty env vars as unset
            .add_source(Environment::default().ignore_empty(true))
            .build()?;

        let raw: RawSettings = s.try_deserialize()?;

        let bot_token = raw
            .bot_token
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .ok_or_else(|| ConfigError::Message("BOT_TOKEN is required".into()))?;

        let cache_chat_id = raw
            .cache_chat_id
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .ok_or_else(|| {
                ConfigError::Message("CACHE_CHAT_ID is required (example: -1001234567890)".into())
            })?
            .parse::<i64>()
            .map_err(|_| {
                ConfigError::Message(
                    "CACHE_CHAT_ID must be an integer (example: -1001234567890)".into(),
                )
            })?;

        let max_file_size_mb = match raw.max_file_size_mb {
            Some(v) => v.trim().parse::<u64>().map_err(|_| {
                ConfigError::Message("MAX_FILE_SIZE_MB must be a positive integer".into())
            })?,
            None => DEFAULT_MAX_FILE_SIZE_MB,
        };

        Ok(Self {
            bot_token,
            cache_chat_id,
            max_file_size_mb,
            cookies_file: raw.cookies_file.filter(|c| !c.trim().is_empty()),
        })
    }

    /// Size ceiling handed to the extraction engine, in bytes.
    #[must_use]
    pub const fn max_file_size_bytes(&self) -> u64 {
        self.max_file_size_mb * 1024 * 1024
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;

    // One test fn: the scenarios share env vars and must not race each other.
    #[test]
    fn test_settings_validation() {
        env::remove_var("BOT_TOKEN");
        env::remove_var("CACHE_CHAT_ID");
        env::remove_var("MAX_FILE_SIZE_MB");
        env::remove_var("COOKIES_FILE");

        // Missing token is fatal
        let err = Settings::new().err().map(|e| e.to_string());
        assert!(err.is_some_and(|e| e.contains("BOT_TOKEN")));

        // Missing cache chat id is fatal
        env::set_var("BOT_TOKEN", "123:abc");
        let err = Settings::new().err().map(|e| e.to_string());
        assert!(err.is_some_and(|e| e.contains("CACHE_CHAT_ID")));

        // Non-integer cache chat id is fatal
        env::set_var("CACHE_CHAT_ID", "not-a-number");
        let err = Settings::new().err().map(|e| e.to_string());
        assert!(err.is_some_and(|e| e.contains("must be an integer")));

        // Valid minimal configuration, defaults applied
        env::set_var("CACHE_CHAT_ID", "-1001234567890");
        let settings = Settings::new().expect("settings should load");
        assert_eq!(settings.bot_token, "123:abc");
        assert_eq!(settings.cache_chat_id, -1_001_234_567_890);
        assert_eq!(settings.max_file_size_mb, 49);
        assert_eq!(settings.max_file_size_bytes(), 49 * 1024 * 1024);
        assert_eq!(settings.cookies_file, None);

        // Explicit size ceiling
        env::set_var("MAX_FILE_SIZE_MB", "100");
        let settings = Settings::new().expect("settings should load");
        assert_eq!(settings.max_file_size_mb, 100);

        env::remove_var("BOT_TOKEN");
        env::remove_var("CACHE_CHAT_ID");
        env::remove_var("MAX_FILE_SIZE_MB");
    }
}
