//! Twitter/X link extraction and normalization.

use std::sync::OnceLock;

use regex::Regex;

/// Hosts a collected link must point at.
pub const ACCEPTED_HOSTS: [&str; 2] = ["twitter.com", "x.com"];

/// Scheme + optional `www.` + host + first path segment + rest up to whitespace.
const LINK_PATTERN: &str = r"(?i)https?://(?:www\.)?(?:twitter\.com|x\.com)/[^/\s]+(?:/\S*)?";

fn link_regex() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    RE.get_or_init(|| match Regex::new(LINK_PATTERN) {
        Ok(re) => Some(re),
        Err(e) => {
            tracing::error!("link pattern failed to compile: {e}");
            None
        }
    })
    .as_ref()
}

/// Trim whitespace and drop the query string (everything from the first `?`).
pub fn normalize_link(raw: &str) -> String {
    let trimmed = raw.trim();
    let without_query = match trimmed.find('?') {
        Some(idx) => &trimmed[..idx],
        None => trimmed,
    };
    without_query.trim_end().to_string()
}

/// Whether `link` still names one of the accepted hosts.
pub fn has_accepted_host(link: &str) -> bool {
    let lower = link.to_ascii_lowercase();
    ACCEPTED_HOSTS.iter().any(|host| lower.contains(host))
}

/// Extract normalized Twitter/X links from free text.
///
/// Links come back in text order. Repeats are kept; deduplication is the
/// store's job.
pub fn extract_links(text: &str) -> Vec<String> {
    let Some(re) = link_regex() else {
        return Vec::new();
    };

    let mut out = Vec::new();
    for m in re.find_iter(text) {
        let cleaned = normalize_link(m.as_str());
        if !has_accepted_host(&cleaned) {
            tracing::debug!("dropping candidate without accepted host: {cleaned}");
            continue;
        }
        out.push(cleaned);
    }
    out
}
