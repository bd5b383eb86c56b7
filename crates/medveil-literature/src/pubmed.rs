//! PubMed search via NCBI E-utilities
//!
//! Each search is two calls: `esearch.fcgi` returns matching PMIDs, then
//! `esummary.fcgi` returns titles, journals and publication dates for them.

use crate::config::LiteratureConfig;
use crate::{LiteratureError, LiteratureSource};
use async_trait::async_trait;
use medveil_domain::Article;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;

/// E-utilities client for PubMed
pub struct PubMedClient {
    config: LiteratureConfig,
    client: reqwest::Client,
}

#[derive(Deserialize)]
struct SearchResponse {
    esearchresult: SearchResult,
}

#[derive(Deserialize)]
struct SearchResult {
    #[serde(default)]
    idlist: Vec<String>,
}

#[derive(Deserialize)]
struct SummaryResponse {
    result: HashMap<String, Value>,
}

#[derive(Deserialize)]
struct SummaryRecord {
    #[serde(default)]
    title: String,
    #[serde(default)]
    fulljournalname: Option<String>,
    #[serde(default)]
    source: Option<String>,
    #[serde(default)]
    pubdate: Option<String>,
}

impl PubMedClient {
    /// Create a client from configuration
    pub fn new(config: LiteratureConfig) -> Result<Self, LiteratureError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| LiteratureError::Communication(format!("Failed to build client: {}", e)))?;
        Ok(Self { config, client })
    }

    fn common_params(&self) -> Vec<(&'static str, String)> {
        let mut params = vec![
            ("db", "pubmed".to_string()),
            ("retmode", "json".to_string()),
        ];
        if let Some(key) = self.config.api_key.as_deref().filter(|k| !k.is_empty()) {
            params.push(("api_key", key.to_string()));
        }
        if let Some(tool) = self.config.tool.as_deref().filter(|t| !t.is_empty()) {
            params.push(("tool", tool.to_string()));
        }
        if let Some(email) = self.config.email.as_deref().filter(|e| !e.is_empty()) {
            params.push(("email", email.to_string()));
        }
        params
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        params: &[(&'static str, String)],
    ) -> Result<T, LiteratureError> {
        let url = format!("{}/{}", self.config.base_url.trim_end_matches('/'), endpoint);
        let response = self
            .client
            .get(url)
            .query(params)
            .send()
            .await
            .map_err(|e| LiteratureError::Communication(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(LiteratureError::Status {
                status: status.as_u16(),
                body,
            });
        }

        response
            .json::<T>()
            .await
            .map_err(|e| LiteratureError::InvalidResponse(e.to_string()))
    }

    async fn search_ids(&self, term: &str) -> Result<Vec<String>, LiteratureError> {
        let mut params = self.common_params();
        params.push(("term", term.to_string()));
        params.push(("retmax", self.config.per_keyword.to_string()));

        let response: SearchResponse = self.get_json("esearch.fcgi", &params).await?;
        Ok(response
            .esearchresult
            .idlist
            .into_iter()
            .take(self.config.per_keyword)
            .collect())
    }

    async fn summaries(&self, ids: &[String]) -> Result<Vec<Article>, LiteratureError> {
        let mut params = self.common_params();
        params.push(("id", ids.join(",")));

        let response: SummaryResponse = self.get_json("esummary.fcgi", &params).await?;

        // Keep esearch relevance order; records missing from the summary are dropped.
        let articles = ids
            .iter()
            .filter_map(|id| {
                let record = response.result.get(id)?;
                let record: SummaryRecord = serde_json::from_value(record.clone()).ok()?;
                Some(to_article(id, record))
            })
            .filter(|article| !article.title.is_empty())
            .collect();
        Ok(articles)
    }
}

fn to_article(id: &str, record: SummaryRecord) -> Article {
    let journal = record
        .fulljournalname
        .filter(|j| !j.is_empty())
        .or(record.source.filter(|s| !s.is_empty()));
    let year = record.pubdate.and_then(|date| {
        let year: String = date.chars().take(4).collect();
        (year.len() == 4 && year.chars().all(|c| c.is_ascii_digit())).then_some(year)
    });

    Article {
        id: id.to_string(),
        title: record.title.trim().to_string(),
        journal,
        year,
    }
}

#[async_trait]
impl LiteratureSource for PubMedClient {
    async fn search(&self, term: &str) -> Result<Vec<Article>, LiteratureError> {
        let ids = self.search_ids(term).await?;
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        self.summaries(&ids).await
    }
}
