//! Canned literature source for tests

use crate::{LiteratureError, LiteratureSource};
use async_trait::async_trait;
use medveil_domain::Article;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Literature source with fixed per-term results
///
/// Unknown terms return no articles. Clones share the call counter.
#[derive(Debug, Clone, Default)]
pub struct MockLiteratureSource {
    results: HashMap<String, Vec<Article>>,
    failing: HashSet<String>,
    calls: Arc<AtomicUsize>,
}

impl MockLiteratureSource {
    /// Create an empty mock
    pub fn new() -> Self {
        Self::default()
    }

    /// Return `articles` when `term` is searched
    pub fn with_results(mut self, term: impl Into<String>, articles: Vec<Article>) -> Self {
        self.results.insert(term.into(), articles);
        self
    }

    /// Fail when `term` is searched
    pub fn with_failure(mut self, term: impl Into<String>) -> Self {
        self.failing.insert(term.into());
        self
    }

    /// Number of searches issued so far
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LiteratureSource for MockLiteratureSource {
    async fn search(&self, term: &str) -> Result<Vec<Article>, LiteratureError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.failing.contains(term) {
            return Err(LiteratureError::Status {
                status: 500,
                body: "mock failure".to_string(),
            });
        }
        Ok(self.results.get(term).cloned().unwrap_or_default())
    }
}
