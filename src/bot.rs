use std::sync::Arc;

use anyhow::Result;
use teloxide::prelude::*;
use teloxide::types::{
    CallbackQuery, InlineKeyboardButton, InlineKeyboardMarkup, MaybeInaccessibleMessage,
    MessageEntity,
};
use tracing::{info, warn};

use crate::config::Config;
use crate::fanout::{Broadcaster, OutboundContent};
use crate::messages;
use crate::pending::{PendingContent, PendingItem, PendingStore};
use crate::template::Template;
use crate::translate::TranslateClient;

const CALLBACK_CONFIRM: &str = "post:yes";
const CALLBACK_CANCEL: &str = "post:no";

/// Shared application state
pub struct AppState {
    config: Config,
    pub store: Arc<PendingStore>,
    translator: TranslateClient,
    template: Template,
    broadcaster: Broadcaster,
}

impl AppState {
    pub fn new(config: Config, bot: Bot) -> Result<Self> {
        let translator = TranslateClient::new(config.translation.clone())?;
        let template = Template::new(&config.template)?;
        let broadcaster = Broadcaster::new(bot, &config.telegram.channel_ids);
        let store = Arc::new(PendingStore::new(config.pending.ttl_secs));
        Ok(Self {
            config,
            store,
            translator,
            template,
            broadcaster,
        })
    }

    /// An empty allowed list means the bot is open to everyone.
    fn is_allowed(&self, user_id: u64) -> bool {
        self.config.telegram.allowed_user_ids.is_empty()
            || self.config.telegram.allowed_user_ids.contains(&user_id)
    }
}

/// What a plain-text reply means while a submission is pending.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ReplyIntent {
    Confirm,
    Decline,
    Edit,
}

fn classify_reply(text: &str) -> ReplyIntent {
    match text.trim().to_lowercase().as_str() {
        "yes" | "y" | "ok" | "👍" | "✅" => ReplyIntent::Confirm,
        "no" | "n" | "cancel" | "❌" => ReplyIntent::Decline,
        _ => ReplyIntent::Edit,
    }
}

fn confirm_keyboard() -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(vec![vec![
        InlineKeyboardButton::callback(messages::CONFIRM_BUTTON_YES, CALLBACK_CONFIRM),
        InlineKeyboardButton::callback(messages::CONFIRM_BUTTON_NO, CALLBACK_CANCEL),
    ]])
}

/// Start the Telegram bot
pub async fn run(bot: Bot, state: Arc<AppState>) -> Result<()> {
    info!("Starting Telegram dispatcher...");

    let handler = dptree::entry()
        .branch(Update::filter_message().endpoint(handle_message))
        .branch(Update::filter_callback_query().endpoint(handle_callback));

    Dispatcher::builder(bot, handler)
        .dependencies(dptree::deps![state])
        .default_handler(|upd| async move {
            warn!("Unhandled update: {:?}", upd.id);
        })
        .error_handler(LoggingErrorHandler::with_custom_text("relaypost"))
        .build()
        .dispatch()
        .await;

    Ok(())
}

async fn handle_message(bot: Bot, msg: Message, state: Arc<AppState>) -> ResponseResult<()> {
    let user_id = match msg.from.as_ref() {
        Some(user) => user.id.0,
        None => return Ok(()),
    };

    if !state.is_allowed(user_id) {
        warn!("Rejected message from unauthorized user {}", user_id);
        bot.send_message(msg.chat.id, messages::NOT_AUTHORIZED).await?;
        return Ok(());
    }

    if let Some(text) = msg.text() {
        match text {
            "/start" | "/help" => {
                bot.send_message(msg.chat.id, messages::GREETING).await?;
                return Ok(());
            }
            "/cancel" => return cancel_pending(&bot, &state, user_id, msg.chat.id).await,
            _ if text.starts_with('/') => return Ok(()),
            _ => {}
        }

        // A recognized yes/no always resolves against the pending slot (a late
        // "yes" after expiry is told nothing is waiting); any other text edits
        // the pending item if there is one, otherwise it is a new submission.
        match classify_reply(text) {
            ReplyIntent::Confirm => {
                return confirm_pending(&bot, &state, user_id, msg.chat.id).await
            }
            ReplyIntent::Decline => {
                return cancel_pending(&bot, &state, user_id, msg.chat.id).await
            }
            ReplyIntent::Edit => {
                if state.store.get(user_id).await.is_some() {
                    return edit_pending(&bot, &state, user_id, &msg).await;
                }
            }
        }
    }

    stage_new_content(&bot, &state, user_id, &msg).await
}

async fn handle_callback(bot: Bot, q: CallbackQuery, state: Arc<AppState>) -> ResponseResult<()> {
    bot.answer_callback_query(q.id.clone()).await?;

    let user_id = q.from.id.0;
    // Reply into the chat that carried the keyboard when it is still
    // accessible, otherwise fall back to the user's private chat.
    let chat_id = match &q.message {
        Some(MaybeInaccessibleMessage::Regular(msg)) => msg.chat.id,
        _ => ChatId::from(q.from.id),
    };

    if !state.is_allowed(user_id) {
        warn!("Rejected callback from unauthorized user {}", user_id);
        bot.send_message(chat_id, messages::NOT_AUTHORIZED).await?;
        return Ok(());
    }

    match q.data.as_deref() {
        Some(CALLBACK_CONFIRM) => confirm_pending(&bot, &state, user_id, chat_id).await,
        Some(CALLBACK_CANCEL) => cancel_pending(&bot, &state, user_id, chat_id).await,
        _ => Ok(()),
    }
}

/// Store a fresh submission (overwriting any previous one) and ask for
/// confirmation.
async fn stage_new_content(
    bot: &Bot,
    state: &Arc<AppState>,
    user_id: u64,
    msg: &Message,
) -> ResponseResult<()> {
    let (content, raw_text, raw_entities) = if let Some(text) = msg.text() {
        (
            PendingContent::Text,
            text,
            msg.entities().map(<[MessageEntity]>::to_vec).unwrap_or_default(),
        )
    } else if let Some(photo) = msg.photo().and_then(|sizes| sizes.last()) {
        (
            PendingContent::Photo {
                file_id: photo.file.id.clone(),
            },
            msg.caption().unwrap_or(""),
            msg.caption_entities()
                .map(<[MessageEntity]>::to_vec)
                .unwrap_or_default(),
        )
    } else if let Some(video) = msg.video() {
        (
            PendingContent::Video {
                file_id: video.file.id.clone(),
            },
            msg.caption().unwrap_or(""),
            msg.caption_entities()
                .map(<[MessageEntity]>::to_vec)
                .unwrap_or_default(),
        )
    } else {
        bot.send_message(msg.chat.id, messages::UNSUPPORTED).await?;
        return Ok(());
    };

    let translated = state.translator.translate_or_original(raw_text).await;
    // Spans only survive a passthrough; against a changed buffer the original
    // offsets mean nothing.
    let entities = if translated == raw_text {
        raw_entities
    } else {
        Vec::new()
    };

    let item = PendingItem::new(content, translated.clone(), entities);
    info!("Staged {} submission from user {}", item.content.kind(), user_id);
    state.store.put(user_id, item).await;

    bot.send_message(
        msg.chat.id,
        messages::confirm_prompt(&translated, state.config.telegram.channel_ids.len()),
    )
    .reply_markup(confirm_keyboard())
    .await?;

    Ok(())
}

/// Replace the stored display text with (the translation of) the new text,
/// keeping the original media and the pending state.
async fn edit_pending(
    bot: &Bot,
    state: &Arc<AppState>,
    user_id: u64,
    msg: &Message,
) -> ResponseResult<()> {
    let text = msg.text().unwrap_or("");

    let Some(previous) = state.store.get(user_id).await else {
        // The sweep got there first.
        bot.send_message(msg.chat.id, messages::NOTHING_PENDING).await?;
        return Ok(());
    };

    let translated = state.translator.translate_or_original(text).await;
    let entities = if translated == text {
        msg.entities().map(<[MessageEntity]>::to_vec).unwrap_or_default()
    } else {
        Vec::new()
    };

    state
        .store
        .put(
            user_id,
            PendingItem::new(previous.content, translated, entities),
        )
        .await;

    bot.send_message(msg.chat.id, messages::EDIT_ACK)
        .reply_markup(confirm_keyboard())
        .await?;

    Ok(())
}

/// Claim the pending item and fan it out to every configured channel.
async fn confirm_pending(
    bot: &Bot,
    state: &Arc<AppState>,
    user_id: u64,
    chat_id: ChatId,
) -> ResponseResult<()> {
    let Some(item) = state.store.take(user_id).await else {
        bot.send_message(chat_id, messages::NOTHING_PENDING).await?;
        return Ok(());
    };

    info!(
        "User {} confirmed a {} submission, fanning out",
        user_id,
        item.content.kind()
    );

    let content = OutboundContent::build(&item, &state.template);
    let report = state.broadcaster.send_to_all(&content).await;

    let reply = if report.all_delivered() {
        messages::posted_all(report.delivered)
    } else {
        messages::posted_partial(report.delivered, report.failed)
    };
    bot.send_message(chat_id, reply).await?;

    Ok(())
}

async fn cancel_pending(
    bot: &Bot,
    state: &Arc<AppState>,
    user_id: u64,
    chat_id: ChatId,
) -> ResponseResult<()> {
    let reply = if state.store.take(user_id).await.is_some() {
        messages::CANCELLED
    } else {
        messages::NOTHING_PENDING
    };
    bot.send_message(chat_id, reply).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn yes_variants_confirm() {
        for reply in ["yes", "YES", " y ", "ok", "👍", "✅"] {
            assert_eq!(classify_reply(reply), ReplyIntent::Confirm, "{reply:?}");
        }
    }

    #[test]
    fn no_variants_decline() {
        for reply in ["no", "No", "n", "cancel", "❌"] {
            assert_eq!(classify_reply(reply), ReplyIntent::Decline, "{reply:?}");
        }
    }

    #[test]
    fn anything_else_is_an_edit() {
        for reply in ["yes please", "new caption", "нет", ""] {
            assert_eq!(classify_reply(reply), ReplyIntent::Edit, "{reply:?}");
        }
    }

    #[test]
    fn keyboard_has_one_yes_no_row() {
        let keyboard = confirm_keyboard();
        assert_eq!(keyboard.inline_keyboard.len(), 1);
        assert_eq!(keyboard.inline_keyboard[0].len(), 2);
    }
}
