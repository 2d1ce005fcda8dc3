//! Boundary to the external generative text-analysis service.

use async_trait::async_trait;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum OracleError {
    #[error("oracle request failed: {0}")]
    Transport(String),
    #[error("oracle returned {status}: {body}")]
    Server { status: u16, body: String },
    #[error("oracle response had no text content")]
    EmptyResponse,
}

/// A single structured-completion request.
#[derive(Debug, Clone)]
pub struct GenerateRequest {
    pub system_prompt: Option<String>,
    pub user_prompt: String,
    pub max_tokens: u32,
    pub temperature: f32,
}

/// Raw completion text plus usage accounting.
#[derive(Debug, Clone)]
pub struct GenerateResponse {
    pub text: String,
    pub tokens_used: u32,
}

/// A generative completion endpoint.
///
/// Implementations make exactly one attempt per call; retry policy belongs
/// to the caller.
#[async_trait]
pub trait Oracle: Send + Sync {
    /// Name used in logs.
    fn name(&self) -> &str;

    async fn generate(&self, request: GenerateRequest) -> Result<GenerateResponse, OracleError>;
}
