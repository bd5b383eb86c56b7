//! Article module - literature records returned by retrieval

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// A literature record from the external search service
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Article {
    /// Service identifier (PubMed PMID)
    pub id: String,

    /// Article title
    pub title: String,

    /// Journal name, when the service reports one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub journal: Option<String>,

    /// Publication year, when the service reports one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub year: Option<String>,
}

impl Article {
    /// Create an article with only the required fields
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            journal: None,
            year: None,
        }
    }

    /// Public landing page for the article
    pub fn url(&self) -> String {
        format!("https://pubmed.ncbi.nlm.nih.gov/{}/", self.id)
    }

    /// One-line citation used inside prompts
    pub fn citation(&self) -> String {
        match (&self.journal, &self.year) {
            (Some(journal), Some(year)) => format!("{} ({}, {})", self.title, journal, year),
            (Some(journal), None) => format!("{} ({})", self.title, journal),
            (None, Some(year)) => format!("{} ({})", self.title, year),
            (None, None) => self.title.clone(),
        }
    }
}

/// Insertion-ordered article collection, unique by id and capped
///
/// Accumulates results across several keyword searches. The first occurrence
/// of an id wins; once [`ArticleSet::MAX_ARTICLES`] entries are held further
/// inserts are rejected.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ArticleSet {
    articles: Vec<Article>,
    #[serde(skip)]
    seen: HashSet<String>,
}

impl ArticleSet {
    /// Hard cap on the number of articles returned to callers
    pub const MAX_ARTICLES: usize = 5;

    /// Create an empty set
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert an article; returns `true` if it was kept
    pub fn insert(&mut self, article: Article) -> bool {
        if self.is_full() || self.seen.contains(&article.id) {
            return false;
        }
        self.seen.insert(article.id.clone());
        self.articles.push(article);
        true
    }

    /// Insert many articles, returning how many were kept
    pub fn extend<I: IntoIterator<Item = Article>>(&mut self, articles: I) -> usize {
        let mut kept = 0;
        for article in articles {
            if self.insert(article) {
                kept += 1;
            }
        }
        kept
    }

    /// Whether the cap has been reached
    pub fn is_full(&self) -> bool {
        self.articles.len() >= Self::MAX_ARTICLES
    }

    /// Whether an id is already present
    pub fn contains_id(&self, id: &str) -> bool {
        self.seen.contains(id)
    }

    /// Number of articles
    pub fn len(&self) -> usize {
        self.articles.len()
    }

    /// Whether the set is empty
    pub fn is_empty(&self) -> bool {
        self.articles.is_empty()
    }

    /// Articles in insertion order
    pub fn as_slice(&self) -> &[Article] {
        &self.articles
    }

    /// Consume into the ordered article list
    pub fn into_vec(self) -> Vec<Article> {
        self.articles
    }
}
