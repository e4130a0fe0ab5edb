//! Transport-agnostic update handling: `/start`, `/summary` and link collection.
//!
//! `LinkBot::handle` never returns an error. Port failures are logged, and
//! failed commands get a best-effort apology.

use std::sync::Arc;

use crate::{
    audit::{AuditEvent, AuditLogger},
    config::Config,
    domain::ChatId,
    extractor::extract_links,
    formatting::{
        escape_html, format_link_added, format_private_start, format_summary, split_chunks,
        COMMAND_FAILED, MAX_SUMMARY_CHUNK, PERMISSIONS_MISSING_START, PERMISSIONS_MISSING_SUMMARY,
        START_MESSAGE, SUMMARY_NO_LINKS, SUMMARY_SEND_FAILED,
    },
    messaging::{
        port::{MessagingPort, PermissionPort},
        types::{Command, IncomingUpdate, Origin, SendOptions, TextMessage},
    },
    store::{AddOutcome, LinkStore},
    Result,
};

pub struct LinkBot {
    store: Arc<LinkStore>,
    messenger: Arc<dyn MessagingPort>,
    permissions: Arc<dyn PermissionPort>,
    audit: Option<AuditLogger>,
    bot_username: Option<String>,
    chunk_limit: usize,
}

impl LinkBot {
    pub fn new(
        store: Arc<LinkStore>,
        messenger: Arc<dyn MessagingPort>,
        permissions: Arc<dyn PermissionPort>,
    ) -> Self {
        Self {
            store,
            messenger,
            permissions,
            audit: None,
            bot_username: None,
            chunk_limit: MAX_SUMMARY_CHUNK,
        }
    }

    /// Apply the config's chunk limit and audit settings.
    pub fn with_config(mut self, cfg: &Config) -> Self {
        self.chunk_limit = cfg.telegram_safe_limit;
        self.audit = cfg
            .audit_log_path
            .as_ref()
            .map(|path| AuditLogger::new(path.clone(), cfg.audit_log_json));
        self
    }

    pub fn with_bot_username(mut self, username: impl Into<String>) -> Self {
        self.bot_username = Some(username.into());
        self
    }

    pub fn store(&self) -> &Arc<LinkStore> {
        &self.store
    }

    fn summary_chunk_limit(&self) -> usize {
        self.chunk_limit
            .min(self.messenger.capabilities().max_message_len)
            .max(1)
    }

    pub async fn handle(&self, update: IncomingUpdate) {
        match update {
            IncomingUpdate::Command(cmd) => self.handle_command(cmd).await,
            IncomingUpdate::Text(msg) => self.handle_text(msg).await,
        }
    }

    async fn handle_command(&self, cmd: Command) {
        let origin = &cmd.origin;
        tracing::info!(
            chat_id = origin.chat_id.0,
            chat_kind = ?origin.chat_kind,
            command = %cmd.name,
            "command received"
        );
        if !cmd.is_addressed_to(self.bot_username.as_deref()) {
            tracing::debug!(command = %cmd.name, "command addressed to another bot");
            return;
        }

        let result = match cmd.name.as_str() {
            "start" | "help" => self.handle_start(origin).await,
            "summary" => self.handle_summary(origin).await,
            other => {
                tracing::debug!(command = other, "ignoring unknown command");
                return;
            }
        };
        self.audit(AuditEvent::command(
            origin.chat_id,
            origin.user_id,
            &origin.display_name(),
            &cmd.name,
        ));

        if let Err(e) = result {
            tracing::error!(
                chat_id = origin.chat_id.0,
                command = %cmd.name,
                "command failed: {e}"
            );
            let apology = if cmd.name == "summary" {
                SUMMARY_SEND_FAILED
            } else {
                COMMAND_FAILED
            };
            self.reply_best_effort(origin, apology).await;
        }
    }

    async fn handle_start(&self, origin: &Origin) -> Result<()> {
        if !origin.chat_kind.is_group_like() {
            let text = match &self.bot_username {
                Some(username) => format_private_start(username),
                None => escape_html(START_MESSAGE),
            };
            self.messenger
                .send_text(origin.chat_id, &text, SendOptions::html())
                .await?;
            return Ok(());
        }

        if !self.permitted(origin.chat_id).await {
            self.messenger
                .send_text(
                    origin.chat_id,
                    PERMISSIONS_MISSING_START,
                    SendOptions::plain().replying_to(origin.message_id),
                )
                .await?;
            return Ok(());
        }

        self.messenger
            .send_text(origin.chat_id, START_MESSAGE, SendOptions::plain())
            .await?;
        Ok(())
    }

    async fn handle_summary(&self, origin: &Origin) -> Result<()> {
        if origin.chat_kind.is_group_like() && !self.permitted(origin.chat_id).await {
            self.messenger
                .send_text(
                    origin.chat_id,
                    PERMISSIONS_MISSING_SUMMARY,
                    SendOptions::plain().replying_to(origin.message_id),
                )
                .await?;
            return Ok(());
        }

        let records = self.store.get_links(origin.chat_id);
        tracing::info!(chat_id = origin.chat_id.0, links = records.len(), "building summary");
        if records.is_empty() {
            self.messenger
                .send_text(origin.chat_id, SUMMARY_NO_LINKS, SendOptions::plain())
                .await?;
            return Ok(());
        }

        let summary = format_summary(&records);
        let chunks = split_chunks(&summary, self.summary_chunk_limit());
        if chunks.len() > 1 {
            tracing::info!(chunks = chunks.len(), "splitting long summary");
        }
        for chunk in chunks {
            // Plain text: a straight slice may cut through markup.
            self.messenger
                .send_text(origin.chat_id, &chunk, SendOptions::plain())
                .await?;
        }
        Ok(())
    }

    async fn handle_text(&self, msg: TextMessage) {
        let origin = &msg.origin;
        let text = msg.text.trim();
        if text.is_empty() {
            return;
        }

        if origin.chat_kind.is_group_like() && !self.permitted(origin.chat_id).await {
            tracing::warn!(chat_id = origin.chat_id.0, "missing permissions; ignoring message");
            return;
        }

        let links = extract_links(text);
        if links.is_empty() {
            tracing::debug!(chat_id = origin.chat_id.0, "no Twitter/X links in message");
            return;
        }
        tracing::info!(chat_id = origin.chat_id.0, found = links.len(), "links found in message");

        let contributor = origin.display_name();
        for link in links {
            match self.store.add_link(origin.chat_id, &link, &contributor) {
                AddOutcome::Added => {
                    self.audit(AuditEvent::link_collected(
                        origin.chat_id,
                        origin.user_id,
                        &contributor,
                        &link,
                    ));
                    let confirmation = format_link_added(&contributor);
                    if let Err(e) = self
                        .messenger
                        .send_text(
                            origin.chat_id,
                            &confirmation,
                            SendOptions::html().replying_to(origin.message_id),
                        )
                        .await
                    {
                        tracing::error!(
                            chat_id = origin.chat_id.0,
                            "failed to send confirmation: {e}"
                        );
                    }
                }
                AddOutcome::Duplicate => {
                    tracing::debug!(chat_id = origin.chat_id.0, %link, "link not added (duplicate)");
                }
                AddOutcome::Rejected(reason) => {
                    tracing::warn!(chat_id = origin.chat_id.0, %link, ?reason, "link rejected");
                }
            }
        }
        tracing::info!(
            chat_id = origin.chat_id.0,
            total = self.store.link_count(origin.chat_id),
            "links stored for chat"
        );
    }

    async fn permitted(&self, chat_id: ChatId) -> bool {
        let ok = self.permissions.has_required_permissions(chat_id).await;
        if !ok {
            tracing::warn!(chat_id = chat_id.0, "bot lacks permissions");
        }
        ok
    }

    async fn reply_best_effort(&self, origin: &Origin, text: &str) {
        if let Err(e) = self
            .messenger
            .send_text(
                origin.chat_id,
                text,
                SendOptions::plain().replying_to(origin.message_id),
            )
            .await
        {
            tracing::error!(chat_id = origin.chat_id.0, "failed to send error message: {e}");
        }
    }

    fn audit(&self, event: AuditEvent) {
        let Some(audit) = &self.audit else {
            return;
        };
        if let Err(e) = audit.write(event) {
            tracing::warn!(path = %audit.path().display(), "audit write failed: {e}");
        }
    }
}
