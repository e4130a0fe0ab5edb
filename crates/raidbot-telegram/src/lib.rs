//! Telegram adapter (teloxide).
//!
//! This crate implements the `raidbot-core` ports over the Telegram Bot API.

use async_trait::async_trait;

use teloxide::{
    prelude::*,
    types::{ChatMemberKind, ChatPermissions, ParseMode},
};

use tokio::time::sleep;

pub mod handlers;
pub mod router;

use raidbot_core::{
    config::TELEGRAM_MESSAGE_LIMIT,
    domain::{ChatId, MessageId, MessageRef},
    errors::Error,
    messaging::{
        port::{MessagingPort, PermissionPort},
        types::{MessagingCapabilities, SendOptions, TextFormat},
    },
    Result,
};

fn tg_chat(chat_id: ChatId) -> teloxide::types::ChatId {
    teloxide::types::ChatId(chat_id.0)
}

fn map_err(e: teloxide::RequestError) -> Error {
    Error::External(format!("telegram error: {e}"))
}

#[derive(Clone)]
pub struct TelegramMessenger {
    bot: Bot,
}

impl TelegramMessenger {
    pub fn new(bot: Bot) -> Self {
        Self { bot }
    }

    async fn with_retry<T, Fut>(&self, mut op: impl FnMut() -> Fut) -> Result<T>
    where
        Fut: std::future::IntoFuture<Output = std::result::Result<T, teloxide::RequestError>>,
        Fut::IntoFuture: Send,
    {
        const MAX_RETRIES: usize = 1;
        let mut attempts = 0usize;
        loop {
            match op().await {
                Ok(v) => return Ok(v),
                Err(e) => match e {
                    teloxide::RequestError::RetryAfter(d) if attempts < MAX_RETRIES => {
                        attempts += 1;
                        tracing::warn!("telegram flood control, retrying in {d:?}");
                        sleep(d).await;
                        continue;
                    }
                    other => return Err(map_err(other)),
                },
            }
        }
    }
}

#[async_trait]
impl MessagingPort for TelegramMessenger {
    fn capabilities(&self) -> MessagingCapabilities {
        MessagingCapabilities {
            max_message_len: TELEGRAM_MESSAGE_LIMIT,
        }
    }

    async fn send_text(
        &self,
        chat_id: ChatId,
        text: &str,
        opts: SendOptions,
    ) -> Result<MessageRef> {
        let msg = self
            .with_retry(|| {
                let mut req = self
                    .bot
                    .send_message(tg_chat(chat_id), text.to_string())
                    .disable_web_page_preview(opts.disable_preview);
                if opts.format == TextFormat::Html {
                    req = req.parse_mode(ParseMode::Html);
                }
                if let Some(reply_to) = opts.reply_to {
                    req = req.reply_to_message_id(teloxide::types::MessageId(reply_to.0));
                }
                req
            })
            .await?;

        Ok(MessageRef {
            chat_id,
            message_id: MessageId(msg.id.0),
        })
    }
}

/// Checks the bot's own membership before it acts in a group.
#[derive(Clone)]
pub struct TelegramPermissions {
    bot: Bot,
    bot_user_id: teloxide::types::UserId,
}

/// Reduced view of a chat member status, enough to decide on permissions.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum MemberStatus {
    Administrator,
    Member,
    Restricted,
    Gone,
}

impl From<&ChatMemberKind> for MemberStatus {
    fn from(kind: &ChatMemberKind) -> Self {
        match kind {
            ChatMemberKind::Owner(_) | ChatMemberKind::Administrator(_) => {
                MemberStatus::Administrator
            }
            ChatMemberKind::Member => MemberStatus::Member,
            ChatMemberKind::Restricted(_) => MemberStatus::Restricted,
            ChatMemberKind::Left | ChatMemberKind::Banned(_) => MemberStatus::Gone,
        }
    }
}

impl TelegramPermissions {
    pub fn new(bot: Bot, bot_user_id: teloxide::types::UserId) -> Self {
        Self { bot, bot_user_id }
    }

    async fn check(&self, chat_id: ChatId) -> std::result::Result<bool, teloxide::RequestError> {
        let member = self
            .bot
            .get_chat_member(tg_chat(chat_id), self.bot_user_id)
            .await?;
        let status = MemberStatus::from(&member.kind);
        tracing::debug!(chat_id = chat_id.0, ?status, "bot membership");

        match status {
            MemberStatus::Administrator => Ok(true),
            MemberStatus::Member => {
                // Regular members depend on the chat's default permissions.
                let chat = self.bot.get_chat(tg_chat(chat_id)).await?;
                Ok(member_can_send(chat.permissions()))
            }
            MemberStatus::Restricted | MemberStatus::Gone => Ok(false),
        }
    }
}

fn member_can_send(permissions: Option<ChatPermissions>) -> bool {
    match permissions {
        Some(p) => p.contains(ChatPermissions::SEND_MESSAGES),
        None => {
            tracing::warn!("no permissions object found for chat");
            false
        }
    }
}

#[async_trait]
impl PermissionPort for TelegramPermissions {
    async fn has_required_permissions(&self, chat_id: ChatId) -> bool {
        match self.check(chat_id).await {
            Ok(ok) => ok,
            Err(e) => {
                tracing::error!(chat_id = chat_id.0, "failed to check permissions: {e}");
                false
            }
        }
    }
}
