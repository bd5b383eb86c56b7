//! MedVeil Literature Retrieval
//!
//! Searches a biomedical literature service for each extracted keyword and
//! accumulates the results into a deduplicated, capped [`ArticleSet`].
//!
//! # Sources
//!
//! - `PubMedClient`: NCBI E-utilities (`esearch` then `esummary`)
//! - `MockLiteratureSource`: canned per-term results for tests
//!
//! A failed search for one keyword is logged and skipped; the remaining
//! keywords still contribute. Nothing is retried.

#![warn(missing_docs)]

pub mod config;
mod error;
pub mod mock;
pub mod pubmed;

use async_trait::async_trait;
use medveil_domain::{Article, ArticleSet, KeywordSet};
use tracing::{debug, warn};

pub use config::LiteratureConfig;
pub use error::LiteratureError;
pub use mock::MockLiteratureSource;
pub use pubmed::PubMedClient;

/// A searchable literature service
#[async_trait]
pub trait LiteratureSource: Send + Sync {
    /// Search one term
    async fn search(&self, term: &str) -> Result<Vec<Article>, LiteratureError>;

    /// Search every keyword in order and merge the results
    ///
    /// Stops early once the set is full. An empty keyword set issues no
    /// searches.
    async fn search_all(&self, keywords: &KeywordSet) -> ArticleSet {
        let mut articles = ArticleSet::new();

        for (index, term) in keywords.iter().enumerate() {
            if articles.is_full() {
                break;
            }
            match self.search(term).await {
                Ok(found) => {
                    let added = articles.extend(found);
                    debug!(keyword_index = index, added, "Literature search complete");
                }
                Err(e) => {
                    warn!(keyword_index = index, error = %e, "Literature search failed; skipping keyword");
                }
            }
        }

        articles
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn articles(prefix: &str, n: usize) -> Vec<Article> {
        (0..n)
            .map(|i| Article::new(format!("{}{}", prefix, i), format!("Title {}{}", prefix, i)))
            .collect()
    }

    #[tokio::test]
    async fn test_empty_keywords_make_no_calls() {
        let source = MockLiteratureSource::new().with_results("anemia", articles("a", 3));
        let set = source.search_all(&KeywordSet::new()).await;
        assert!(set.is_empty());
        assert_eq!(source.call_count(), 0);
    }

    #[tokio::test]
    async fn test_failed_keyword_is_skipped() {
        let source = MockLiteratureSource::new()
            .with_results("anemia", articles("a", 2))
            .with_failure("fatigue")
            .with_results("b12", articles("b", 2));
        let keywords = KeywordSet::from_candidates(["anemia", "fatigue", "b12"]);

        let set = source.search_all(&keywords).await;
        assert_eq!(set.len(), 4);
        assert_eq!(source.call_count(), 3);
    }

    #[tokio::test]
    async fn test_results_deduplicated_and_capped() {
        let shared = Article::new("42", "Shared article");
        let source = MockLiteratureSource::new()
            .with_results("anemia", vec![shared.clone(), Article::new("1", "One")])
            .with_results("fatigue", vec![shared, Article::new("2", "Two")])
            .with_results("b12", articles("b", 3))
            .with_results("folate", articles("f", 3));
        let keywords = KeywordSet::from_candidates(["anemia", "fatigue", "b12", "folate"]);

        let set = source.search_all(&keywords).await;
        assert_eq!(set.len(), ArticleSet::MAX_ARTICLES);
        let ids: Vec<&str> = set.as_slice().iter().map(|a| a.id.as_str()).collect();
        assert_eq!(ids, ["42", "1", "2", "b0", "b1"]);
        // Full after the third keyword, so the fourth is never searched.
        assert_eq!(source.call_count(), 3);
    }
}
