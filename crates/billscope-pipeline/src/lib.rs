//! Orchestrates a single analysis run: chunk → augment → analyze (oracle or
//! fallback) → cite → rank, reporting each stage through a status callback.

mod augment;
mod config;
mod error;
mod pipeline;
mod status;

pub use augment::{ContextAugmenter, topic_for};
pub use config::PipelineConfig;
pub use error::PipelineError;
pub use pipeline::{AnalysisReport, AnalysisSource, ImpactPipeline, RunState};
pub use status::{PipelineStatus, Stage, StatusReporter};
pub use tokio_util::sync::CancellationToken;
