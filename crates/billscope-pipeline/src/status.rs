//! Progress events for a run.

use std::fmt;

use serde::Serialize;
use tracing::{debug, info, warn};

/// Stage boundary a status event announces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Initialize,
    Chunk,
    AugmentContext,
    InvokeAnalysis,
    Fallback,
    ResolveCitations,
    Complete,
    Failed,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Initialize => "initialize",
            Self::Chunk => "chunk",
            Self::AugmentContext => "augment-context",
            Self::InvokeAnalysis => "invoke-analysis",
            Self::Fallback => "fallback",
            Self::ResolveCitations => "resolve-citations",
            Self::Complete => "complete",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

/// One progress event. `step` strictly increases within a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PipelineStatus {
    pub step: u32,
    pub stage: Stage,
    pub message: String,
    pub is_complete: bool,
    pub error: Option<String>,
}

/// Delivers [`PipelineStatus`] events to a caller-supplied callback.
///
/// Numbers steps from 1 and goes silent after the first terminal event
/// (success or failure).
pub struct StatusReporter<F: FnMut(PipelineStatus)> {
    callback: F,
    step: u32,
    closed: bool,
}

impl<F: FnMut(PipelineStatus)> StatusReporter<F> {
    pub fn new(callback: F) -> Self {
        Self {
            callback,
            step: 0,
            closed: false,
        }
    }

    /// Announce a stage transition.
    pub fn stage(&mut self, stage: Stage, message: impl Into<String>) {
        self.emit(stage, message.into(), false, None);
    }

    /// Announce successful completion. Terminal.
    pub fn complete(&mut self, message: impl Into<String>) {
        self.emit(Stage::Complete, message.into(), true, None);
    }

    /// Announce an unrecoverable failure. Terminal.
    pub fn fail(&mut self, error: impl Into<String>) {
        let error = error.into();
        self.emit(Stage::Failed, format!("Analysis failed: {error}"), true, Some(error));
    }

    /// Whether a terminal event has been delivered.
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    pub fn last_step(&self) -> u32 {
        self.step
    }

    fn emit(&mut self, stage: Stage, message: String, is_complete: bool, error: Option<String>) {
        if self.closed {
            debug!(stage = %stage, "status after terminal event suppressed");
            return;
        }
        self.step += 1;
        match &error {
            Some(err) => warn!(step = self.step, stage = %stage, error = %err, "pipeline status"),
            None => info!(step = self.step, stage = %stage, message = %message, "pipeline status"),
        }
        self.closed = is_complete;
        (self.callback)(PipelineStatus {
            step: self.step,
            stage,
            message,
            is_complete,
            error,
        });
    }
}
