//! HTTP clients for Billscope's external collaborators.

mod anthropic;
mod error;
mod search;

pub use anthropic::{AnthropicOracle, DEFAULT_ANTHROPIC_URL, DEFAULT_MODEL};
pub use error::ClientError;
pub use search::{DEFAULT_MAX_RESULTS, SearchClient};
