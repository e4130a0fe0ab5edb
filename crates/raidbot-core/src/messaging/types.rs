use crate::domain::{ChatId, ChatKind, MessageId, UserId};

/// Cross-messenger incoming update model.
///
/// Telegram-specific fields live in the Telegram adapter. Non-text messages
/// never become updates.
#[derive(Clone, Debug)]
pub enum IncomingUpdate {
    Command(Command),
    Text(TextMessage),
}

/// Who sent an update and where.
#[derive(Clone, Debug)]
pub struct Origin {
    pub chat_id: ChatId,
    pub chat_kind: ChatKind,
    pub message_id: MessageId,
    pub user_id: UserId,
    pub username: Option<String>,
}

impl Origin {
    /// Name links are credited to: the username, else the numeric user id.
    pub fn display_name(&self) -> String {
        match self.username.as_deref().map(str::trim) {
            Some(name) if !name.is_empty() => name.to_string(),
            _ => self.user_id.0.to_string(),
        }
    }
}

#[derive(Clone, Debug)]
pub struct Command {
    pub origin: Origin,
    /// Lowercased, without the leading `/` or any `@botname` suffix.
    pub name: String,
    /// The `@botname` the command was addressed to, if any.
    pub target: Option<String>,
}

impl Command {
    /// Parse `/cmd@botname arg1 ...`. Returns `None` for non-command text.
    pub fn parse(origin: Origin, text: &str) -> Option<Self> {
        let text = text.trim();
        if !text.starts_with('/') {
            return None;
        }

        let first = text.split(char::is_whitespace).next().unwrap_or("");
        let (name, target) = match first.trim_start_matches('/').split_once('@') {
            Some((name, target)) => (name, Some(target.to_string())),
            None => (first.trim_start_matches('/'), None),
        };
        if name.is_empty() {
            return None;
        }

        Some(Self {
            origin,
            name: name.to_lowercase(),
            target,
        })
    }

    /// Whether this command is meant for the bot named `bot_username`.
    ///
    /// Commands without a `@botname` suffix are addressed to every bot.
    pub fn is_addressed_to(&self, bot_username: Option<&str>) -> bool {
        match (&self.target, bot_username) {
            (None, _) => true,
            (Some(target), Some(me)) => target.eq_ignore_ascii_case(me),
            (Some(_), None) => false,
        }
    }
}

#[derive(Clone, Debug)]
pub struct TextMessage {
    pub origin: Origin,
    pub text: String,
}

/// How the messenger should interpret outbound text.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TextFormat {
    Plain,
    Html,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SendOptions {
    pub format: TextFormat,
    pub reply_to: Option<MessageId>,
    pub disable_preview: bool,
}

impl SendOptions {
    pub fn plain() -> Self {
        Self {
            format: TextFormat::Plain,
            reply_to: None,
            disable_preview: true,
        }
    }

    pub fn html() -> Self {
        Self {
            format: TextFormat::Html,
            ..Self::plain()
        }
    }

    pub fn replying_to(mut self, message_id: MessageId) -> Self {
        self.reply_to = Some(message_id);
        self
    }
}

/// Capabilities / feature flags of a messenger implementation.
#[derive(Clone, Copy, Debug)]
pub struct MessagingCapabilities {
    pub max_message_len: usize,
}
