//! Boundary to the external context search service.

use async_trait::async_trait;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SearchError {
    #[error("search request failed: {0}")]
    Transport(String),
    #[error("search returned {status}: {body}")]
    Server { status: u16, body: String },
    #[error("malformed search payload: {0}")]
    Malformed(String),
}

/// Free-text search returning short snippets. No ordering is implied.
#[async_trait]
pub trait ContextSearch: Send + Sync {
    async fn search(&self, query: &str) -> Result<Vec<String>, SearchError>;
}
