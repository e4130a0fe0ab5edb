//! Append-only audit trail of collected links.

use std::{
    fs::OpenOptions,
    io::Write,
    path::{Path, PathBuf},
};

use chrono::Utc;
use serde::Serialize;

use crate::{
    domain::{ChatId, UserId},
    Result,
};

const AUDIT_MAX_TEXT: usize = 500;

#[derive(Clone, Debug, Serialize)]
pub struct AuditEvent {
    pub timestamp: String,
    pub event: String,
    pub chat_id: i64,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contributor: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub command: Option<String>,
}

impl AuditEvent {
    pub fn link_collected(chat_id: ChatId, user_id: UserId, contributor: &str, link: &str) -> Self {
        Self {
            timestamp: Utc::now().to_rfc3339(),
            event: "link_collected".to_string(),
            chat_id: chat_id.0,
            user_id: Some(user_id.0),
            contributor: Some(contributor.to_string()),
            link: Some(link.to_string()),
            command: None,
        }
    }

    pub fn command(chat_id: ChatId, user_id: UserId, contributor: &str, command: &str) -> Self {
        Self {
            timestamp: Utc::now().to_rfc3339(),
            event: "command".to_string(),
            chat_id: chat_id.0,
            user_id: Some(user_id.0),
            contributor: Some(contributor.to_string()),
            link: None,
            command: Some(command.to_string()),
        }
    }
}

#[derive(Clone, Debug)]
pub struct AuditLogger {
    path: PathBuf,
    json: bool,
}

impl AuditLogger {
    pub fn new(path: impl Into<PathBuf>, json: bool) -> Self {
        Self {
            path: path.into(),
            json,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn write(&self, mut event: AuditEvent) -> Result<()> {
        if let Some(s) = &event.link {
            event.link = Some(truncate_text(s, AUDIT_MAX_TEXT));
        }
        if let Some(s) = &event.contributor {
            event.contributor = Some(truncate_text(s, AUDIT_MAX_TEXT));
        }

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;

        if self.json {
            writeln!(file, "{}", serde_json::to_string(&event)?)?;
        } else {
            writeln!(file, "{}", event.plain_line())?;
        }
        Ok(())
    }
}

impl AuditEvent {
    /// One `key=value` line; absent fields are left out.
    fn plain_line(&self) -> String {
        let mut line = format!("{} {} chat={}", self.timestamp, self.event, self.chat_id);
        if let Some(id) = self.user_id {
            line.push_str(&format!(" user={id}"));
        }
        let optional = [
            ("contributor", &self.contributor),
            ("link", &self.link),
            ("command", &self.command),
        ];
        for (key, value) in optional {
            if let Some(v) = value {
                line.push_str(&format!(" {key}={v:?}"));
            }
        }
        line
    }
}

pub fn truncate_text(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        return s.to_string();
    }
    let mut out = s.chars().take(max_len).collect::<String>();
    out.push_str("...");
    out
}
