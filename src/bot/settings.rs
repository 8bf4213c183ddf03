//! Settings UI.
//!
//! Renders the current preferences as text plus an inline keyboard of
//! toggles, and translates button callback data back into preference
//! mutations. The active choice in each row carries a ✅ prefix.

use teloxide::types::{InlineKeyboardButton, InlineKeyboardMarkup};

use crate::prefs::{QualityTier, UserPrefs};

/// One parsed settings-button press.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettingsAction {
    /// Select a quality tier
    Quality(QualityTier),
    /// Toggle the source-link caption
    AddLink(bool),
    /// Toggle document delivery for videos
    SendAsFile(bool),
}

/// Parse callback data like `qbest`, `q720`, `link1`, `file0`.
#[must_use]
pub fn parse_action(data: &str) -> Option<SettingsAction> {
    if let Some(rest) = data.strip_prefix("link") {
        return match rest {
            "1" => Some(SettingsAction::AddLink(true)),
            "0" => Some(SettingsAction::AddLink(false)),
            _ => None,
        };
    }
    if let Some(rest) = data.strip_prefix("file") {
        return match rest {
            "1" => Some(SettingsAction::SendAsFile(true)),
            "0" => Some(SettingsAction::SendAsFile(false)),
            _ => None,
        };
    }
    if let Some(rest) = data.strip_prefix('q') {
        return match rest {
            "best" => Some(SettingsAction::Quality(QualityTier::Best)),
            "720" => Some(SettingsAction::Quality(QualityTier::P720)),
            "480" => Some(SettingsAction::Quality(QualityTier::P480)),
            _ => None,
        };
    }
    None
}

/// Apply a parsed action. Returns true when the stored value actually
/// changed, so the caller can skip a no-op message edit.
pub fn apply_action(prefs: &mut UserPrefs, action: SettingsAction) -> bool {
    let before = *prefs;
    match action {
        SettingsAction::Quality(q) => prefs.quality = q,
        SettingsAction::AddLink(v) => prefs.add_link = v,
        SettingsAction::SendAsFile(v) => prefs.send_as_file = v,
    }
    *prefs != before
}

/// Human-readable summary of the current settings.
#[must_use]
pub fn settings_text(prefs: &UserPrefs) -> String {
    format!(
        "Текущие настройки:\n\
         Качество видео: {}\n\
         Ссылка в подписи: {}\n\
         Отправка видео: {}",
        prefs.quality.label(),
        if prefs.add_link { "вкл" } else { "выкл" },
        if prefs.send_as_file {
            "файлом"
        } else {
            "как видео"
        },
    )
}

fn marked(label: &str, active: bool) -> String {
    if active {
        format!("✅ {label}")
    } else {
        label.to_string()
    }
}

/// The three toggle rows: quality, caption link, video-vs-file.
#[must_use]
pub fn settings_keyboard(prefs: &UserPrefs) -> InlineKeyboardMarkup {
    let quality = prefs.quality;
    InlineKeyboardMarkup::new([
        vec![
            InlineKeyboardButton::callback(
                marked("Лучшее", quality == QualityTier::Best),
                "qbest",
            ),
            InlineKeyboardButton::callback(marked("720p", quality == QualityTier::P720), "q720"),
            InlineKeyboardButton::callback(marked("480p", quality == QualityTier::P480), "q480"),
        ],
        vec![
            InlineKeyboardButton::callback(marked("Ссылка: вкл", prefs.add_link), "link1"),
            InlineKeyboardButton::callback(marked("Ссылка: выкл", !prefs.add_link), "link0"),
        ],
        vec![
            InlineKeyboardButton::callback(marked("Отправка: видео", !prefs.send_as_file), "file0"),
            InlineKeyboardButton::callback(marked("Отправка: файл", prefs.send_as_file), "file1"),
        ],
    ])
}
