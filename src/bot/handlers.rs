//! Update handlers: commands, link messages, the inline flow, and settings
//! callbacks.
//!
//! Validation-only paths answer synchronously. Anything that downloads is
//! handed to the job runner so the dispatcher never waits on a fetch.

use anyhow::Result;
use std::sync::Arc;
use teloxide::prelude::*;
use teloxide::types::{
    CallbackQuery, ChosenInlineResult, InlineKeyboardButton, InlineKeyboardMarkup, InlineQuery,
    InlineQueryResult, InlineQueryResultArticle, InputMessageContent, InputMessageContentText,
};
use teloxide::utils::command::BotCommands;
use uuid::Uuid;

use super::settings;
use crate::pipeline::deliver::{Coordinator, DeliveryTarget, Request, MSG_FETCHING};
use crate::pipeline::extract::extract_url;
use crate::pipeline::validate::is_supported_source;
use crate::prefs::PrefStore;
use crate::runner::JobRunner;

/// Callback data of the placeholder button. Pressing it does nothing; the
/// button exists only because Telegram issues an editable-message handle
/// exclusively for inline results that carry a reply markup.
pub const CALLBACK_NOOP: &str = "noop";

const MSG_GREETING: &str = "Привет! Отправь мне ссылку на видео и я его скачаю";
const MSG_SEND_A_LINK: &str = "Отправьте ссылку из Instagram, TikTok или YouTube.";
const MSG_UNSUPPORTED: &str = "Поддерживаются только Instagram, TikTok и YouTube.";

/// Supported bot commands
#[derive(BotCommands, Clone)]
#[command(rename_rule = "lowercase", description = "Поддерживаемые команды:")]
pub enum Command {
    /// Greeting
    #[command(description = "Начать работу.")]
    Start,
    /// Delivery preferences
    #[command(description = "Настройки загрузки.")]
    Settings,
}

/// `/start`
///
/// # Errors
///
/// Returns an error if the greeting cannot be sent.
pub async fn start(bot: &Bot, msg: &Message) -> Result<()> {
    bot.send_message(msg.chat.id, MSG_GREETING).await?;
    Ok(())
}

/// `/settings`: current values plus the toggle keyboard. Private chats only.
///
/// # Errors
///
/// Returns an error if the settings message cannot be sent.
pub async fn settings_cmd(bot: &Bot, msg: &Message, prefs: &PrefStore) -> Result<()> {
    if !msg.chat.is_private() {
        return Ok(());
    }
    let Some(user) = msg.from.as_ref() else {
        return Ok(());
    };
    let current = prefs.snapshot(user.id).await;
    bot.send_message(msg.chat.id, settings::settings_text(&current))
        .reply_markup(settings::settings_keyboard(&current))
        .await?;
    Ok(())
}

/// Free text in a private chat: extract and validate the link, then hand it
/// to a background pipeline run with a frozen preference snapshot.
///
/// # Errors
///
/// Returns an error if a validation reply cannot be sent.
pub async fn handle_text(
    bot: &Bot,
    msg: &Message,
    prefs: &PrefStore,
    runner: JobRunner,
    coordinator: Arc<Coordinator>,
) -> Result<()> {
    if !msg.chat.is_private() {
        return Ok(());
    }
    let Some(text) = msg.text() else {
        return Ok(());
    };
    if text.starts_with('/') {
        return Ok(());
    }
    let Some(user) = msg.from.as_ref() else {
        return Ok(());
    };

    let Some(url) = extract_url(text) else {
        bot.send_message(msg.chat.id, MSG_SEND_A_LINK).await?;
        return Ok(());
    };
    if !is_supported_source(url) {
        bot.send_message(msg.chat.id, MSG_UNSUPPORTED).await?;
        return Ok(());
    }

    let request = Request {
        url: url.to_string(),
        prefs: prefs.snapshot(user.id).await,
        target: DeliveryTarget::Direct { chat: msg.chat.id },
    };
    let bot = bot.clone();
    runner.submit(async move { coordinator.deliver(&bot, request).await });
    Ok(())
}

fn placeholder_markup() -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new([[InlineKeyboardButton::callback("...", CALLBACK_NOOP)]])
}

fn article(
    title: &str,
    description: &str,
    message_text: &str,
    markup: Option<InlineKeyboardMarkup>,
) -> InlineQueryResult {
    let content = InputMessageContent::Text(InputMessageContentText::new(message_text.to_string()));
    let mut result =
        InlineQueryResultArticle::new(Uuid::new_v4().simple().to_string(), title, content);
    result.description = Some(description.to_string());
    result.reply_markup = markup;
    InlineQueryResult::Article(result)
}

/// Build the suggestion list for a typed inline query: exactly one entry,
/// either a corrective hint or the downloadable placeholder.
#[must_use]
pub fn build_inline_results(query: &str) -> Vec<InlineQueryResult> {
    let result = match extract_url(query) {
        None => article(
            "Ссылка не найдена",
            "Вставьте URL",
            "Пример: @bot https://youtu.be/...",
            None,
        ),
        Some(url) if !is_supported_source(url) => article(
            "Сайт не поддерживается",
            "Только Instagram/TikTok/YouTube",
            "Эта ссылка не поддерживается.",
            None,
        ),
        Some(url) => article("Скачать медиа", url, MSG_FETCHING, Some(placeholder_markup())),
    };
    vec![result]
}

/// Answer an inline query.
///
/// # Errors
///
/// Returns an error if the answer call fails.
pub async fn handle_inline_query(bot: &Bot, query: &InlineQuery) -> Result<()> {
    let mut answer = bot.answer_inline_query(query.id.clone(), build_inline_results(&query.query));
    answer.is_personal = Some(true);
    answer.cache_time = Some(0);
    answer.await?;
    Ok(())
}

/// The user picked the inline suggestion: Telegram now hands over the
/// editable-message handle, so the pipeline can run in the background and
/// settle the placeholder later.
///
/// # Errors
///
/// Currently infallible; kept fallible for symmetry with the other handlers.
pub async fn handle_chosen(
    chosen: &ChosenInlineResult,
    bot: &Bot,
    prefs: &PrefStore,
    runner: JobRunner,
    coordinator: Arc<Coordinator>,
) -> Result<()> {
    let Some(url) = extract_url(&chosen.query) else {
        return Ok(());
    };
    let Some(handle) = chosen.inline_message_id.clone() else {
        return Ok(());
    };

    let request = Request {
        url: url.to_string(),
        prefs: prefs.snapshot(chosen.from.id).await,
        target: DeliveryTarget::Inline { handle },
    };
    let bot = bot.clone();
    runner.submit(async move { coordinator.deliver(&bot, request).await });
    Ok(())
}

/// Settings toggles and the placeholder no-op button.
///
/// # Errors
///
/// Returns an error if answering the callback or editing the settings
/// message fails.
pub async fn handle_callback(bot: &Bot, query: &CallbackQuery, prefs: &PrefStore) -> Result<()> {
    let data = query.data.as_deref().unwrap_or_default();

    if data == CALLBACK_NOOP {
        bot.answer_callback_query(query.id.clone()).await?;
        return Ok(());
    }

    let Some(action) = settings::parse_action(data) else {
        bot.answer_callback_query(query.id.clone())
            .text("Некорректная команда")
            .show_alert(true)
            .await?;
        return Ok(());
    };

    let mut changed = false;
    let updated = prefs
        .update(query.from.id, |p| changed = settings::apply_action(p, action))
        .await;

    if changed {
        if let Some(message) = query.message.as_ref().and_then(|m| m.regular_message()) {
            bot.edit_message_text(
                message.chat.id,
                message.id,
                settings::settings_text(&updated),
            )
            .reply_markup(settings::settings_keyboard(&updated))
            .await?;
        }
    }
    bot.answer_callback_query(query.id.clone())
        .text(if changed {
            "Настройки сохранены"
        } else {
            "Уже выбрано"
        })
        .await?;
    Ok(())
}
