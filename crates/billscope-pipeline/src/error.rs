use thiserror::Error;

/// Terminal failures of a run. Oracle and search failures never appear here;
/// they degrade to the fallback analyzer and empty context respectively.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PipelineError {
    #[error("document text is empty")]
    EmptyDocument,
    #[error("document produced no chunks")]
    NoChunks,
    #[error("run cancelled")]
    Cancelled,
    #[error("analysis failed: {0}")]
    Failed(String),
}
