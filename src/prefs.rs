//! Per-user delivery preferences.
//!
//! The store is owned by the running service instance and passed by reference
//! into every handler that needs it; there is no global state. Entries are
//! created lazily with defaults on first access and live for the lifetime of
//! the process.

use std::collections::HashMap;
use teloxide::types::UserId;
use tokio::sync::Mutex;

/// Requested video quality tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum QualityTier {
    /// Best available streams
    #[default]
    Best,
    /// Capped at 720p
    P720,
    /// Capped at 480p
    P480,
}

impl QualityTier {
    /// Height constraint for the capped tiers.
    #[must_use]
    pub const fn height(self) -> Option<u32> {
        match self {
            Self::Best => None,
            Self::P720 => Some(720),
            Self::P480 => Some(480),
        }
    }

    /// Label shown in the settings UI.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Best => "Лучшее",
            Self::P720 => "720p",
            Self::P480 => "480p",
        }
    }
}

/// One user's delivery preferences.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UserPrefs {
    /// Requested quality tier
    pub quality: QualityTier,
    /// Append a `Source: <url>` caption to delivered videos
    pub add_link: bool,
    /// Deliver videos as plain documents instead of playable video
    pub send_as_file: bool,
}

impl Default for UserPrefs {
    fn default() -> Self {
        Self {
            quality: QualityTier::Best,
            add_link: true,
            send_as_file: false,
        }
    }
}

/// Process-lifetime mapping of user id to preferences.
///
/// Readers take a copied snapshot, so a settings change made while a download
/// is running never alters the outcome of that in-flight request.
#[derive(Debug, Default)]
pub struct PrefStore {
    inner: Mutex<HashMap<UserId, UserPrefs>>,
}

impl PrefStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of the user's preferences, inserting defaults on first access.
    pub async fn snapshot(&self, user: UserId) -> UserPrefs {
        *self
            .inner
            .lock()
            .await
            .entry(user)
            .or_insert_with(UserPrefs::default)
    }

    /// Mutate the user's preferences through `apply` and return the updated
    /// copy. Missing entries are created with defaults first.
    pub async fn update<F>(&self, user: UserId, apply: F) -> UserPrefs
    where
        F: FnOnce(&mut UserPrefs),
    {
        let mut map = self.inner.lock().await;
        let prefs = map.entry(user).or_insert_with(UserPrefs::default);
        apply(prefs);
        *prefs
    }
}
