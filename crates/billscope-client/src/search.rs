//! Context search client for a Tavily-style `POST /search` endpoint.

use async_trait::async_trait;
use billscope_ai::{ContextSearch, SearchError};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{ClientError, server_error};

pub const DEFAULT_MAX_RESULTS: u32 = 5;

/// Search client returning the `content` snippet of each hit.
pub struct SearchClient {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
    max_results: u32,
}

#[derive(Serialize)]
struct SearchRequest<'a> {
    query: &'a str,
    max_results: u32,
}

/// Accepts either `{"results": [{"content": ...}]}` or a bare string array.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum SearchResponse {
    Results { results: Vec<SearchHit> },
    Snippets(Vec<String>),
}

/// Providers name the snippet field differently; some send several.
#[derive(Debug, Deserialize)]
struct SearchHit {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    snippet: Option<String>,
    #[serde(default)]
    text: Option<String>,
}

impl SearchHit {
    /// First non-blank of `content`, `snippet`, `text`.
    fn into_snippet(self) -> Option<String> {
        [self.content, self.snippet, self.text]
            .into_iter()
            .flatten()
            .find(|s| !s.trim().is_empty())
    }
}

impl SearchResponse {
    fn into_snippets(self) -> Vec<String> {
        let raw: Vec<String> = match self {
            Self::Results { results } => results.into_iter().filter_map(SearchHit::into_snippet).collect(),
            Self::Snippets(snippets) => snippets,
        };
        raw.into_iter()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect()
    }
}

impl SearchClient {
    /// Create a search client. `base_url` should have no trailing slash.
    pub fn new(base_url: String, api_key: Option<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            max_results: DEFAULT_MAX_RESULTS,
        }
    }

    pub fn with_max_results(mut self, max_results: u32) -> Self {
        self.max_results = max_results;
        self
    }

    async fn fetch(&self, query: &str) -> Result<Vec<String>, ClientError> {
        let url = format!("{}/search", self.base_url);
        let body = SearchRequest {
            query,
            max_results: self.max_results,
        };

        info!(url = %url, query = %query, "searching for context");
        let mut req = self.client.post(&url).json(&body);
        if let Some(key) = &self.api_key {
            req = req.bearer_auth(key);
        }
        let resp = req.send().await?;
        if !resp.status().is_success() {
            return Err(server_error(resp).await);
        }

        let text = resp.text().await?;
        let parsed: SearchResponse = serde_json::from_str(&text)?;
        let snippets = parsed.into_snippets();
        info!(count = snippets.len(), "search complete");
        Ok(snippets)
    }
}

#[async_trait]
impl ContextSearch for SearchClient {
    async fn search(&self, query: &str) -> Result<Vec<String>, SearchError> {
        Ok(self.fetch(query).await?)
    }
}
