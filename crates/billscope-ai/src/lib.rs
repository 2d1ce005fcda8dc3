//! Analysis layer: the generative oracle path and the deterministic heuristic fallback.

pub mod heuristic;
pub mod invoker;
pub mod oracle;
pub mod parse;
pub mod policy;
pub mod prompt;
pub mod search;

pub use heuristic::HeuristicEngine;
pub use invoker::{AnalysisInvoker, AnalysisUnavailable, InvokerConfig};
pub use oracle::{GenerateRequest, GenerateResponse, Oracle, OracleError};
pub use policy::{CategoryRule, Gate, HeuristicPolicy};
pub use search::{ContextSearch, SearchError};
