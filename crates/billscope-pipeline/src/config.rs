use std::time::Duration;

use billscope_ai::InvokerConfig;
use billscope_core::DEFAULT_MAX_FINDINGS;

/// Per-run limits and timeouts.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Upper bound on the oracle call, after which the run falls back.
    pub oracle_timeout: Duration,
    /// Upper bound on the context search, after which context is empty.
    pub search_timeout: Duration,
    /// Findings returned to the caller after ranking.
    pub max_findings: usize,
    pub max_context_snippets: usize,
    pub max_snippet_chars: usize,
    pub max_tokens: u32,
    pub temperature: f32,
    pub max_prompt_chars: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        let invoker = InvokerConfig::default();
        Self {
            oracle_timeout: invoker.timeout,
            search_timeout: Duration::from_secs(10),
            max_findings: DEFAULT_MAX_FINDINGS,
            max_context_snippets: 5,
            max_snippet_chars: 600,
            max_tokens: invoker.max_tokens,
            temperature: invoker.temperature,
            max_prompt_chars: invoker.max_prompt_chars,
        }
    }
}

impl PipelineConfig {
    pub(crate) fn invoker_config(&self) -> InvokerConfig {
        InvokerConfig {
            max_tokens: self.max_tokens,
            temperature: self.temperature,
            max_prompt_chars: self.max_prompt_chars,
            timeout: self.oracle_timeout,
        }
    }
}
