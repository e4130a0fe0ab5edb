//! Telegram update handlers.
//!
//! Converts teloxide messages into `raidbot-core` updates and hands them to
//! the transport-agnostic `LinkBot`.

use std::sync::Arc;

use teloxide::{
    prelude::*,
    types::{Chat, Message},
};

use raidbot_core::{
    dispatch::LinkBot,
    domain::{ChatId, ChatKind, MessageId, UserId},
    messaging::types::{Command, IncomingUpdate, Origin, TextMessage},
};

pub async fn handle_message(msg: Message, app: Arc<LinkBot>) -> ResponseResult<()> {
    match to_update(&msg) {
        Some(update) => app.handle(update).await,
        None => tracing::debug!(chat_id = msg.chat.id.0, "ignoring message without text"),
    }
    Ok(())
}

fn chat_kind(chat: &Chat) -> ChatKind {
    if chat.is_private() {
        ChatKind::Private
    } else if chat.is_supergroup() {
        ChatKind::Supergroup
    } else if chat.is_group() {
        ChatKind::Group
    } else {
        ChatKind::Channel
    }
}

/// Build a core update from a Telegram message; `None` for non-text messages
/// and messages without a sender.
pub fn to_update(msg: &Message) -> Option<IncomingUpdate> {
    let text = msg.text()?;
    let user = msg.from()?;

    let origin = Origin {
        chat_id: ChatId(msg.chat.id.0),
        chat_kind: chat_kind(&msg.chat),
        message_id: MessageId(msg.id.0),
        user_id: UserId(user.id.0 as i64),
        username: user.username.clone(),
    };

    // A bare "/" or "/ ..." is not a command; links in it still count.
    if let Some(cmd) = Command::parse(origin.clone(), text) {
        return Some(IncomingUpdate::Command(cmd));
    }

    Some(IncomingUpdate::Text(TextMessage {
        origin,
        text: text.to_string(),
    }))
}
