//! Per-chat link ledgers.
//!
//! Each chat gets its own append-only, deduplicated list of accepted links.
//! The outer map is only write-locked to create a missing ledger; the
//! duplicate check and the append for one chat run under that chat's mutex, so
//! different chats never serialize behind each other.

use std::{collections::HashMap, sync::Arc};

use chrono::{Local, NaiveDateTime};
use parking_lot::{Mutex, RwLock};

use crate::{domain::ChatId, extractor::normalize_link};

/// One accepted link in one chat.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LinkRecord {
    pub link: String,
    pub contributor: String,
    pub observed_at: NaiveDateTime,
}

/// Why `add_link` refused its input.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Rejection {
    EmptyLink,
    EmptyContributor,
}

/// Result of `LinkStore::add_link`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AddOutcome {
    Added,
    /// Already in this chat's ledger. Not an error.
    Duplicate,
    Rejected(Rejection),
}

impl AddOutcome {
    pub fn is_added(self) -> bool {
        matches!(self, AddOutcome::Added)
    }
}

#[derive(Debug, Default)]
struct Ledger {
    records: Vec<LinkRecord>,
}

impl Ledger {
    // Linear scan; fine for the hundreds of links a chat collects.
    fn contains(&self, link: &str) -> bool {
        self.records.iter().any(|r| r.link == link)
    }

    fn append(&mut self, link: String, contributor: String, observed_at: NaiveDateTime) {
        // Keep timestamps non-decreasing even if the wall clock steps back.
        let observed_at = match self.records.last() {
            Some(last) if last.observed_at > observed_at => last.observed_at,
            _ => observed_at,
        };
        self.records.push(LinkRecord {
            link,
            contributor,
            observed_at,
        });
    }
}

/// In-memory owner of every chat's ledger. Share it as `Arc<LinkStore>`.
#[derive(Debug, Default)]
pub struct LinkStore {
    ledgers: RwLock<HashMap<ChatId, Arc<Mutex<Ledger>>>>,
}

impl LinkStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn ledger(&self, chat_id: ChatId) -> Option<Arc<Mutex<Ledger>>> {
        self.ledgers.read().get(&chat_id).cloned()
    }

    fn ledger_or_create(&self, chat_id: ChatId) -> Arc<Mutex<Ledger>> {
        if let Some(ledger) = self.ledger(chat_id) {
            return ledger;
        }
        let mut map = self.ledgers.write();
        map.entry(chat_id)
            .or_insert_with(|| {
                tracing::info!(chat_id = chat_id.0, "created link ledger");
                Arc::new(Mutex::new(Ledger::default()))
            })
            .clone()
    }

    /// Record `link` for `chat_id`, stamped with the current local time.
    pub fn add_link(&self, chat_id: ChatId, link: &str, contributor: &str) -> AddOutcome {
        self.add_link_at(chat_id, link, contributor, Local::now().naive_local())
    }

    pub fn add_link_at(
        &self,
        chat_id: ChatId,
        link: &str,
        contributor: &str,
        observed_at: NaiveDateTime,
    ) -> AddOutcome {
        let link = normalize_link(link);
        if link.is_empty() {
            tracing::debug!(chat_id = chat_id.0, "rejected empty link");
            return AddOutcome::Rejected(Rejection::EmptyLink);
        }
        if contributor.trim().is_empty() {
            tracing::debug!(chat_id = chat_id.0, %link, "rejected link without contributor");
            return AddOutcome::Rejected(Rejection::EmptyContributor);
        }

        let ledger = self.ledger_or_create(chat_id);
        let mut guard = ledger.lock();
        if guard.contains(&link) {
            tracing::debug!(chat_id = chat_id.0, %link, "link already collected");
            return AddOutcome::Duplicate;
        }

        guard.append(link.clone(), contributor.to_string(), observed_at);
        tracing::info!(
            chat_id = chat_id.0,
            %link,
            contributor,
            total = guard.records.len(),
            "link collected"
        );
        AddOutcome::Added
    }

    /// Snapshot of the chat's records in insertion order.
    pub fn get_links(&self, chat_id: ChatId) -> Vec<LinkRecord> {
        let Some(ledger) = self.ledger(chat_id) else {
            return Vec::new();
        };
        let records = ledger.lock().records.clone();
        records
    }

    /// Empty an existing ledger in place. Returns `false` if the chat has none.
    pub fn clear_links(&self, chat_id: ChatId) -> bool {
        let Some(ledger) = self.ledger(chat_id) else {
            return false;
        };
        ledger.lock().records.clear();
        tracing::info!(chat_id = chat_id.0, "cleared link ledger");
        true
    }

    pub fn link_count(&self, chat_id: ChatId) -> usize {
        let Some(ledger) = self.ledger(chat_id) else {
            return 0;
        };
        let count = ledger.lock().records.len();
        count
    }

    pub fn chat_count(&self) -> usize {
        self.ledgers.read().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at(h: u32, m: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 5, 1)
            .unwrap()
            .and_hms_opt(h, m, 0)
            .unwrap()
    }

    #[test]
    fn second_add_of_same_link_is_duplicate() {
        let store = LinkStore::new();
        let chat = ChatId(-100);

        assert_eq!(
            store.add_link(chat, "https://x.com/a/status/1", "alice"),
            AddOutcome::Added
        );
        assert_eq!(
            store.add_link(chat, "https://x.com/a/status/1", "bob"),
            AddOutcome::Duplicate
        );
        assert_eq!(store.get_links(chat).len(), 1);
    }

    #[test]
    fn dedup_uses_normalized_link() {
        let store = LinkStore::new();
        let chat = ChatId(1);

        assert!(store.add_link(chat, " https://x.com/a?s=20 ", "alice").is_added());
        assert!(!store.add_link(chat, "https://x.com/a", "alice").is_added());

        let links = store.get_links(chat);
        assert_eq!(links.len(), 1);
        assert_eq!(links[0].link, "https://x.com/a");
    }

    #[test]
    fn dedup_is_case_sensitive() {
        let store = LinkStore::new();
        let chat = ChatId(1);
        assert!(store.add_link(chat, "https://x.com/Alice", "u").is_added());
        assert!(store.add_link(chat, "https://x.com/alice", "u").is_added());
        assert_eq!(store.link_count(chat), 2);
    }

    #[test]
    fn chats_are_independent() {
        let store = LinkStore::new();
        assert!(store.add_link(ChatId(1), "https://x.com/a", "alice").is_added());
        assert!(store.add_link(ChatId(2), "https://x.com/a", "alice").is_added());
        assert_eq!(store.link_count(ChatId(1)), 1);
        assert_eq!(store.link_count(ChatId(2)), 1);
        assert_eq!(store.chat_count(), 2);
    }

    #[test]
    fn rejects_empty_inputs_without_creating_ledger() {
        let store = LinkStore::new();
        let chat = ChatId(7);

        assert_eq!(
            store.add_link(chat, "   ", "alice"),
            AddOutcome::Rejected(Rejection::EmptyLink)
        );
        assert_eq!(
            store.add_link(chat, "?q=1", "alice"),
            AddOutcome::Rejected(Rejection::EmptyLink)
        );
        assert_eq!(
            store.add_link(chat, "https://x.com/a", " "),
            AddOutcome::Rejected(Rejection::EmptyContributor)
        );
        assert_eq!(store.chat_count(), 0);
        assert!(!store.clear_links(chat));
    }

    #[test]
    fn unknown_chat_has_no_links() {
        let store = LinkStore::new();
        assert!(store.get_links(ChatId(42)).is_empty());
        assert_eq!(store.link_count(ChatId(42)), 0);
    }

    #[test]
    fn preserves_insertion_order() {
        let store = LinkStore::new();
        let chat = ChatId(1);
        store.add_link_at(chat, "https://x.com/1", "alice", at(10, 0));
        store.add_link_at(chat, "https://x.com/2", "bob", at(10, 1));
        store.add_link_at(chat, "https://x.com/3", "alice", at(10, 2));

        let links: Vec<String> = store.get_links(chat).into_iter().map(|r| r.link).collect();
        assert_eq!(
            links,
            vec!["https://x.com/1", "https://x.com/2", "https://x.com/3"]
        );
    }

    #[test]
    fn timestamps_never_go_backwards() {
        let store = LinkStore::new();
        let chat = ChatId(1);
        store.add_link_at(chat, "https://x.com/1", "alice", at(12, 0));
        store.add_link_at(chat, "https://x.com/2", "alice", at(11, 0));

        let records = store.get_links(chat);
        assert_eq!(records[0].observed_at, at(12, 0));
        assert_eq!(records[1].observed_at, at(12, 0));
    }

    #[test]
    fn clear_empties_but_keeps_ledger() {
        let store = LinkStore::new();
        let chat = ChatId(1);
        assert!(!store.clear_links(chat));

        store.add_link(chat, "https://x.com/a", "alice");
        assert!(store.clear_links(chat));
        assert!(store.get_links(chat).is_empty());
        assert_eq!(store.chat_count(), 1);

        // Cleared ledgers accept previously seen links again.
        assert!(store.add_link(chat, "https://x.com/a", "alice").is_added());
        assert!(store.clear_links(chat));
    }

    #[test]
    fn concurrent_adds_of_same_link_insert_once() {
        let store = LinkStore::new();
        let chat = ChatId(1);

        let added = std::thread::scope(|s| {
            let handles: Vec<_> = (0..16)
                .map(|i| {
                    let store = &store;
                    s.spawn(move || {
                        store
                            .add_link(chat, "https://x.com/race/status/1", &format!("user{i}"))
                            .is_added()
                    })
                })
                .collect();
            handles
                .into_iter()
                .map(|h| h.join().unwrap())
                .filter(|added| *added)
                .count()
        });

        assert_eq!(added, 1);
        assert_eq!(store.link_count(chat), 1);
    }

    #[test]
    fn concurrent_adds_across_chats() {
        let store = LinkStore::new();
        std::thread::scope(|s| {
            for c in 0..8i64 {
                let store = &store;
                s.spawn(move || {
                    for n in 0..50 {
                        store.add_link(ChatId(c), &format!("https://x.com/u/status/{n}"), "u");
                    }
                });
            }
        });
        assert_eq!(store.chat_count(), 8);
        for c in 0..8i64 {
            assert_eq!(store.link_count(ChatId(c)), 50);
        }
    }
}
