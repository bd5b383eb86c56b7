//! Keyword module - bounded search term sets

use serde::{Deserialize, Serialize};

/// Ordered, deduplicated set of literature search terms
///
/// Terms are stored lowercase and compared case-insensitively. The set never
/// holds more than [`KeywordSet::MAX_KEYWORDS`] entries; pushes past the cap
/// are ignored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct KeywordSet(Vec<String>);

impl KeywordSet {
    /// Hard cap on the number of search terms
    pub const MAX_KEYWORDS: usize = 4;

    /// Create an empty set
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a set from candidates in priority order
    ///
    /// Candidates are trimmed, lowercased and deduplicated before the cap is
    /// applied, so a duplicate never costs a slot.
    pub fn from_candidates<I, S>(candidates: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut set = Self::new();
        for candidate in candidates {
            if set.is_full() {
                break;
            }
            set.push(candidate.as_ref());
        }
        set
    }

    /// Add a term; returns `true` if it was kept
    pub fn push(&mut self, term: &str) -> bool {
        let normalized = term.trim().to_lowercase();
        if normalized.is_empty() || self.is_full() || self.contains(&normalized) {
            return false;
        }
        self.0.push(normalized);
        true
    }

    /// Check membership (case-insensitive)
    pub fn contains(&self, term: &str) -> bool {
        let needle = term.trim().to_lowercase();
        self.0.iter().any(|t| *t == needle)
    }

    /// Whether the cap has been reached
    pub fn is_full(&self) -> bool {
        self.0.len() >= Self::MAX_KEYWORDS
    }

    /// Number of terms
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the set is empty
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate over terms in priority order
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    /// Borrow the terms as a slice
    pub fn as_slice(&self) -> &[String] {
        &self.0
    }

    /// Consume the set into its terms
    pub fn into_vec(self) -> Vec<String> {
        self.0
    }
}

impl<'a> IntoIterator for &'a KeywordSet {
    type Item = &'a String;
    type IntoIter = std::slice::Iter<'a, String>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}
