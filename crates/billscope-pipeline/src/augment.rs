//! Optional context snippets from an external search service.
//!
//! Context only sharpens the oracle prompt. Every failure path (no search
//! configured, error, timeout, malformed payload) yields an empty set.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use billscope_ai::ContextSearch;
use tracing::{info, warn};

/// Search query for a bill title; empty when the title is blank.
pub fn topic_for(title: &str) -> String {
    let title = title.trim();
    if title.is_empty() {
        String::new()
    } else {
        format!("{title} legislation news analysis")
    }
}

pub struct ContextAugmenter {
    search: Option<Arc<dyn ContextSearch>>,
    timeout: Duration,
    max_snippets: usize,
    max_snippet_chars: usize,
}

impl ContextAugmenter {
    pub fn new(
        search: Option<Arc<dyn ContextSearch>>,
        timeout: Duration,
        max_snippets: usize,
        max_snippet_chars: usize,
    ) -> Self {
        Self {
            search,
            timeout,
            max_snippets,
            max_snippet_chars,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.search.is_some()
    }

    /// Fetch up to `max_snippets` distinct, trimmed snippets for the title.
    /// One attempt; never fails.
    pub async fn augment(&self, title: &str) -> Vec<String> {
        let Some(search) = &self.search else {
            return Vec::new();
        };
        let topic = topic_for(title);
        if topic.is_empty() {
            return Vec::new();
        }

        let raw = match tokio::time::timeout(self.timeout, search.search(&topic)).await {
            Ok(Ok(snippets)) => snippets,
            Ok(Err(e)) => {
                warn!(error = %e, "context search failed, continuing without context");
                return Vec::new();
            }
            Err(_) => {
                warn!(timeout = ?self.timeout, "context search timed out, continuing without context");
                return Vec::new();
            }
        };

        let mut seen = HashSet::new();
        let snippets: Vec<String> = raw
            .into_iter()
            .map(|s| clip(s.trim(), self.max_snippet_chars))
            .filter(|s| !s.is_empty() && seen.insert(s.clone()))
            .take(self.max_snippets)
            .collect();

        info!(count = snippets.len(), topic = %topic, "context snippets gathered");
        snippets
    }
}

fn clip(s: &str, max: usize) -> String {
    s.chars().take(max).collect()
}
