use async_trait::async_trait;

use crate::{
    domain::{ChatId, MessageRef},
    messaging::types::{MessagingCapabilities, SendOptions},
    Result,
};

/// Cross-messenger port.
///
/// Telegram is the only implementation; the dispatch layer talks to this trait
/// so it can be driven by fakes in tests.
#[async_trait]
pub trait MessagingPort: Send + Sync {
    fn capabilities(&self) -> MessagingCapabilities;

    async fn send_text(&self, chat_id: ChatId, text: &str, opts: SendOptions)
        -> Result<MessageRef>;
}

/// Answers whether the bot may operate in a chat.
///
/// Consulted before acting in group-like chats; the store itself never checks
/// permissions.
#[async_trait]
pub trait PermissionPort: Send + Sync {
    async fn has_required_permissions(&self, chat_id: ChatId) -> bool;
}
