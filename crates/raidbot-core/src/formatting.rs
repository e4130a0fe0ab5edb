//! Outbound text: the link digest, confirmations and fixed bot messages.

use std::{collections::HashMap, fmt::Write};

use crate::{errors::Error, store::LinkRecord, Result};

/// Largest summary chunk sent as one message (Telegram caps at 4096).
pub const MAX_SUMMARY_CHUNK: usize = 4000;

pub const START_MESSAGE: &str = "👋 Hello! I'm a Twitter/X Raid Bot.

I'll help track Twitter/X links shared in this chat and create summaries.

Commands:
/start - Show this message
/summary - Generate a summary of shared links

Just add me to a group and I'll start collecting Twitter/X links automatically! 🚀";

pub const SUMMARY_NO_LINKS: &str = "No Twitter/X links have been shared in this chat yet! 🤔";

pub const SUMMARY_HEADER: &str = "📊 Twitter/X Links Summary:";

pub const SUMMARY_FOOTER: &str = "Use these links to engage and support! 🚀";

pub const SUMMARY_ERROR: &str =
    "Sorry, there was an error formatting the summary. Please try again.";

pub const SUMMARY_SEND_FAILED: &str = "Sorry, I encountered an error while generating the summary. \
Please try again or contact the bot administrator if the problem persists.";

pub const PERMISSIONS_MISSING_START: &str = "I don't have the necessary permissions to operate in this chat.
Please make me an admin or ensure I have permission to:
- Send messages
- Read messages
Then try the command again.";

pub const PERMISSIONS_MISSING_SUMMARY: &str = "I don't have the necessary permissions to operate in this chat. \
Please make sure I have permission to send messages.";

pub const COMMAND_FAILED: &str = "Sorry, something went wrong. \
Please make sure I have the necessary permissions and try again.";

const UNKNOWN_CONTRIBUTOR: &str = "Unknown User";

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M";

/// Escape HTML special characters for Telegram HTML parse mode.
pub fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

/// Render a chat's records as a digest grouped by contributor.
///
/// Contributors appear in the order of their first link; each contributor's
/// links keep input order. Records that cannot be rendered are skipped.
pub fn format_summary(records: &[LinkRecord]) -> String {
    if records.is_empty() {
        return SUMMARY_NO_LINKS.to_string();
    }

    match render_summary(records) {
        Ok(summary) => {
            tracing::debug!(
                records = records.len(),
                len = summary.chars().count(),
                "formatted summary"
            );
            summary
        }
        Err(e) => {
            tracing::error!("failed to format summary: {e}");
            SUMMARY_ERROR.to_string()
        }
    }
}

fn render_summary(records: &[LinkRecord]) -> Result<String> {
    let groups = group_by_contributor(records);

    let mut out = String::new();
    writeln!(out, "{SUMMARY_HEADER}")?;
    writeln!(out)?;

    for (contributor, links) in groups {
        let mut block = String::new();
        for record in links {
            let mut entry = String::new();
            match render_entry(&mut entry, record) {
                Ok(()) => block.push_str(&entry),
                Err(e) => tracing::warn!("skipping link entry: {e}"),
            }
        }
        if block.is_empty() {
            tracing::debug!(contributor, "no renderable links for contributor");
            continue;
        }
        writeln!(out, "👤 {}:", escape_html(contributor))?;
        out.push_str(&block);
    }

    out.push_str(SUMMARY_FOOTER);
    Ok(out)
}

fn group_by_contributor(records: &[LinkRecord]) -> Vec<(&str, Vec<&LinkRecord>)> {
    let mut groups: Vec<(&str, Vec<&LinkRecord>)> = Vec::new();
    let mut index: HashMap<&str, usize> = HashMap::new();

    for record in records {
        let contributor = record.contributor.as_str();
        match index.get(contributor) {
            Some(&i) => groups[i].1.push(record),
            None => {
                index.insert(contributor, groups.len());
                groups.push((contributor, vec![record]));
            }
        }
    }
    groups
}

fn render_entry(out: &mut String, record: &LinkRecord) -> Result<()> {
    if record.link.trim().is_empty() {
        return Err(Error::Format(format!(
            "record from {:?} has an empty link",
            record.contributor
        )));
    }
    if record.contributor.trim().is_empty() {
        return Err(Error::Format(format!(
            "record {:?} has no contributor",
            record.link
        )));
    }

    let time_str = record.observed_at.format(TIMESTAMP_FORMAT);
    writeln!(out, "🔗 {}", record.link)?;
    writeln!(out, "📅 Shared on: {time_str}")?;
    writeln!(out)?;
    Ok(())
}

/// Confirmation sent when a new link is collected.
pub fn format_link_added(contributor: &str) -> String {
    let name = if contributor.trim().is_empty() {
        tracing::warn!("empty contributor passed to format_link_added");
        UNKNOWN_CONTRIBUTOR
    } else {
        contributor
    };
    format!(
        "✅ Twitter/X link from {} has been collected!",
        escape_html(name)
    )
}

/// Private-chat welcome: the start message plus a deep link for adding the bot to a group.
pub fn format_private_start(bot_username: &str) -> String {
    let invite = format!("https://t.me/{bot_username}?startgroup=true");
    format!(
        "{}\n\n<a href=\"{}\">Add me to your group!</a>",
        escape_html(START_MESSAGE),
        escape_html(&invite)
    )
}

/// Split `text` into chunks of at most `max_chars` characters.
///
/// This is a straight slice: blocks may be cut in the middle. Joining the
/// chunks gives back `text` exactly.
pub fn split_chunks(text: &str, max_chars: usize) -> Vec<String> {
    let max_chars = max_chars.max(1);
    let mut out = Vec::new();
    let mut chunk = String::new();
    let mut count = 0usize;

    for c in text.chars() {
        if count == max_chars {
            out.push(std::mem::take(&mut chunk));
            count = 0;
        }
        chunk.push(c);
        count += 1;
    }
    if !chunk.is_empty() {
        out.push(chunk);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, NaiveDateTime};

    fn at(h: u32, m: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, 9)
            .unwrap()
            .and_hms_opt(h, m, 30)
            .unwrap()
    }

    fn rec(link: &str, contributor: &str, observed_at: NaiveDateTime) -> LinkRecord {
        LinkRecord {
            link: link.to_string(),
            contributor: contributor.to_string(),
            observed_at,
        }
    }

    #[test]
    fn escapes_html() {
        let s = r#"<a href="x&y">"#;
        assert_eq!(escape_html(s), "&lt;a href=&quot;x&amp;y&quot;&gt;");
    }

    #[test]
    fn empty_summary_is_sentinel() {
        assert_eq!(format_summary(&[]), SUMMARY_NO_LINKS);
    }

    #[test]
    fn groups_by_first_appearance() {
        let records = vec![
            rec("https://x.com/L1", "alice", at(9, 1)),
            rec("https://x.com/L2", "bob", at(9, 2)),
            rec("https://x.com/L3", "alice", at(9, 3)),
        ];
        let s = format_summary(&records);

        let alice = s.find("👤 alice:").unwrap();
        let bob = s.find("👤 bob:").unwrap();
        assert!(alice < bob);

        let l1 = s.find("https://x.com/L1").unwrap();
        let l3 = s.find("https://x.com/L3").unwrap();
        assert!(alice < l1 && l1 < l3 && l3 < bob);
    }

    #[test]
    fn contributors_are_not_sorted() {
        let records = vec![
            rec("https://x.com/1", "zed", at(8, 0)),
            rec("https://x.com/2", "adam", at(8, 1)),
        ];
        let s = format_summary(&records);
        assert!(s.find("👤 zed:").unwrap() < s.find("👤 adam:").unwrap());
    }

    #[test]
    fn exact_layout() {
        let records = vec![rec("https://x.com/a/status/1", "alice", at(14, 5))];
        let expected = "📊 Twitter/X Links Summary:\n\n\
👤 alice:\n\
🔗 https://x.com/a/status/1\n\
📅 Shared on: 2024-03-09 14:05\n\n\
Use these links to engage and support! 🚀";
        assert_eq!(format_summary(&records), expected);
    }

    #[test]
    fn escapes_contributor_names() {
        let records = vec![rec("https://x.com/a", "<b>&co", at(1, 0))];
        let s = format_summary(&records);
        assert!(s.contains("👤 &lt;b&gt;&amp;co:"));
        assert!(!s.contains("<b>"));
    }

    #[test]
    fn skips_malformed_records() {
        let records = vec![
            rec("", "alice", at(1, 0)),
            rec("https://x.com/ok", "alice", at(1, 1)),
            rec("https://x.com/anon", "  ", at(1, 2)),
        ];
        let s = format_summary(&records);
        assert!(s.contains("https://x.com/ok"));
        assert!(!s.contains("https://x.com/anon"));
        assert!(!s.contains("👤   :"));
        assert_eq!(s.matches("👤 alice:").count(), 1);
        assert!(s.ends_with(SUMMARY_FOOTER));
    }

    #[test]
    fn link_added_message() {
        assert_eq!(
            format_link_added("a<b"),
            "✅ Twitter/X link from a&lt;b has been collected!"
        );
        assert_eq!(
            format_link_added(""),
            "✅ Twitter/X link from Unknown User has been collected!"
        );
    }

    #[test]
    fn private_start_has_invite_link() {
        let s = format_private_start("raid_bot");
        assert!(s.starts_with("👋 Hello!"));
        assert!(s.contains(r#"<a href="https://t.me/raid_bot?startgroup=true">"#));
    }

    #[test]
    fn split_chunks_reconstructs_input() {
        let text = "abcdefghij".repeat(25); // 250 chars
        let chunks = split_chunks(&text, 100);
        assert_eq!(chunks.len(), 3);
        assert!(chunks.iter().all(|c| c.chars().count() <= 100));
        assert_eq!(chunks.concat(), text);
    }

    #[test]
    fn split_chunks_exact_multiple_and_short() {
        assert_eq!(split_chunks(&"x".repeat(200), 100).len(), 2);
        assert_eq!(split_chunks("short", 100), vec!["short".to_string()]);
        assert!(split_chunks("", 100).is_empty());
    }

    #[test]
    fn split_chunks_counts_characters_not_bytes() {
        let text = "🚀".repeat(5);
        let chunks = split_chunks(&text, 2);
        assert_eq!(chunks, vec!["🚀🚀", "🚀🚀", "🚀"]);
    }

    #[test]
    fn long_summary_splits_into_ceil_chunks() {
        let records: Vec<LinkRecord> = (0..200)
            .map(|i| {
                rec(
                    &format!("https://x.com/user{i}/status/{i}"),
                    &format!("user{}", i % 7),
                    at(10, 0),
                )
            })
            .collect();
        let summary = format_summary(&records);
        let len = summary.chars().count();
        assert!(len > MAX_SUMMARY_CHUNK);

        let chunks = split_chunks(&summary, MAX_SUMMARY_CHUNK);
        assert_eq!(chunks.len(), len.div_ceil(MAX_SUMMARY_CHUNK));
        assert!(chunks
            .iter()
            .all(|c| c.chars().count() <= MAX_SUMMARY_CHUNK));
        assert_eq!(chunks.concat(), summary);
    }
}
