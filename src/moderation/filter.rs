//! Text normalization and the banned-word filter.

use std::collections::HashSet;
use std::path::Path;

use tracing::{info, warn};

/// Reduce raw text to its canonical comparison form: lowercase, then keep
/// only ASCII letters. Deterministic and idempotent.
#[must_use]
pub fn normalize(text: &str) -> String {
    text.to_lowercase()
        .chars()
        .filter(|c| c.is_ascii_lowercase())
        .collect()
}

/// Immutable set of normalized banned tokens, loaded once at startup.
///
/// Matching is substring containment over normalized text, not word
/// matching, so punctuation or spacing cannot hide a banned token.
#[derive(Debug, Clone, Default)]
pub struct BadWordFilter {
    tokens: HashSet<String>,
}

impl BadWordFilter {
    /// Build a filter from raw tokens; each is normalized and empties are
    /// discarded.
    pub fn from_tokens<I, S>(tokens: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let tokens = tokens
            .into_iter()
            .map(|t| normalize(t.as_ref()))
            .filter(|t| !t.is_empty())
            .collect();
        Self { tokens }
    }

    /// Load the banned token list from a line-delimited file.
    ///
    /// A missing list is not an error: moderation degrades to spam checks
    /// only.
    pub async fn load(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        match tokio::fs::read_to_string(path).await {
            Ok(content) => {
                let filter = Self::from_tokens(content.lines());
                info!("Loaded {} banned tokens from {}", filter.len(), path.display());
                filter
            }
            Err(_) => {
                warn!("No banned word list at {}, bad-word filter disabled", path.display());
                Self::default()
            }
        }
    }

    /// Check already-normalized text for a banned token. Reports the first
    /// discovered match; set iteration order does not affect the verdict.
    #[must_use]
    pub fn find_match<'a>(&'a self, normalized: &str) -> Option<&'a str> {
        self.tokens
            .iter()
            .find(|token| normalized.contains(token.as_str()))
            .map(String::as_str)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_strips_everything_but_letters() {
        assert_eq!(normalize("Hello, World!"), "helloworld");
        assert_eq!(normalize("123 !!"), "");
        assert_eq!(normalize("S.P.A.M"), "spam");
        assert_eq!(normalize(""), "");
    }

    #[test]
    fn test_normalize_is_idempotent() {
        for input in ["Th1s is SP@M!!", "ÜBER cool", "already normal", "🙂 hi"] {
            let once = normalize(input);
            assert_eq!(normalize(&once), once);
        }
    }

    #[test]
    fn test_normalize_drops_non_ascii_letters() {
        // Lowercasing maps Ü to ü, which is then stripped as non-ASCII
        assert_eq!(normalize("Über"), "ber");
    }

    #[test]
    fn test_substring_match_after_normalization() {
        let filter = BadWordFilter::from_tokens(["spam"]);

        // Digit substitution survives normalization unmatched: "SP@M"
        // normalizes to "spm", which does not contain "spam"
        assert_eq!(filter.find_match(&normalize("th1s is SP@M!!")), None);

        // Punctuation-hidden token is exposed by normalization
        assert_eq!(filter.find_match(&normalize("buy S.P.A.M now")), Some("spam"));
        assert_eq!(filter.find_match(&normalize("SPAMMY message")), Some("spam"));
        assert_eq!(filter.find_match(&normalize("perfectly fine")), None);
    }

    #[test]
    fn test_empty_lines_discarded_at_load() {
        let filter = BadWordFilter::from_tokens(["spam", "", "  ", "123", "Scam!"]);
        // "" and whitespace/digit-only lines normalize to empty and drop out
        assert_eq!(filter.len(), 2);
        assert_eq!(filter.find_match("bigscamhere"), Some("scam"));
        // No token ever matches on the empty string
        assert_eq!(filter.find_match(""), None);
    }
}
