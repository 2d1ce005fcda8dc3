//! Primary analysis path: one oracle call under a strict output contract.

use std::sync::Arc;
use std::time::Duration;

use billscope_core::{Chunk, ImpactFinding, ReaderProfile};
use thiserror::Error;
use tracing::{info, warn};

use crate::oracle::{GenerateRequest, Oracle, OracleError};
use crate::parse::{ParseError, parse_findings};
use crate::prompt::{SYSTEM_PROMPT, build_user_prompt};

/// The oracle path produced nothing usable; the caller should fall back.
#[derive(Error, Debug)]
pub enum AnalysisUnavailable {
    #[error("no oracle configured")]
    NotConfigured,
    #[error(transparent)]
    Transport(#[from] OracleError),
    #[error("oracle timed out after {0:?}")]
    Timeout(Duration),
    #[error("oracle response was not a findings array: {0}")]
    Malformed(#[from] ParseError),
    #[error("oracle returned no conformant findings ({dropped} dropped)")]
    Empty { dropped: usize },
}

#[derive(Debug, Clone)]
pub struct InvokerConfig {
    pub max_tokens: u32,
    pub temperature: f32,
    /// Upper bound on the rendered user prompt, in characters.
    pub max_prompt_chars: usize,
    pub timeout: Duration,
}

impl Default for InvokerConfig {
    fn default() -> Self {
        Self {
            max_tokens: 4096,
            temperature: 0.2,
            max_prompt_chars: 120_000,
            timeout: Duration::from_secs(60),
        }
    }
}

/// Sends chunks, profile, and context to an [`Oracle`] and validates the reply.
pub struct AnalysisInvoker {
    oracle: Arc<dyn Oracle>,
    config: InvokerConfig,
}

impl AnalysisInvoker {
    pub fn new(oracle: Arc<dyn Oracle>, config: InvokerConfig) -> Self {
        Self { oracle, config }
    }

    pub fn config(&self) -> &InvokerConfig {
        &self.config
    }

    /// Run one analysis request.
    ///
    /// Returns unranked, uncited findings. Any transport error, timeout,
    /// unparseable payload, or payload with zero conformant elements is
    /// reported as [`AnalysisUnavailable`]. No retries are attempted.
    pub async fn invoke(
        &self,
        title: &str,
        chunks: &[Chunk],
        profile: &ReaderProfile,
        context: &[String],
    ) -> Result<Vec<ImpactFinding>, AnalysisUnavailable> {
        let prompt = build_user_prompt(title, chunks, profile, context, self.config.max_prompt_chars);
        if prompt.chunks_included < chunks.len() {
            warn!(
                included = prompt.chunks_included,
                total = chunks.len(),
                "prompt budget exceeded, trailing chunks omitted"
            );
        }

        let request = GenerateRequest {
            system_prompt: Some(SYSTEM_PROMPT.to_string()),
            user_prompt: prompt.text,
            max_tokens: self.config.max_tokens,
            temperature: self.config.temperature,
        };

        info!(oracle = self.oracle.name(), chunks = prompt.chunks_included, "invoking oracle");
        let response = tokio::time::timeout(self.config.timeout, self.oracle.generate(request))
            .await
            .map_err(|_| AnalysisUnavailable::Timeout(self.config.timeout))??;

        let parsed = parse_findings(&response.text)?;
        if parsed.findings.is_empty() {
            return Err(AnalysisUnavailable::Empty {
                dropped: parsed.dropped,
            });
        }

        info!(
            count = parsed.findings.len(),
            dropped = parsed.dropped,
            tokens = response.tokens_used,
            "oracle analysis accepted"
        );
        Ok(parsed.findings)
    }
}
