//! The analysis run state machine.
//!
//! ```text
//! Init → Chunked → Augmented → Analyzed → Cited → Ranked → Done
//!   └──────────┴──────────┴──────────┴────────┴───────→ Failed
//! ```
//!
//! `Analyzed` is reached through the oracle or, when it is unavailable,
//! through the heuristic engine. Each edge is taken at most once; there is no
//! retry loop. Cancellation is honoured before augmenting, before analysis,
//! and before citation. Analysis itself always runs to completion once begun.

use std::sync::Arc;

use billscope_ai::{
    AnalysisInvoker, AnalysisUnavailable, ContextSearch, HeuristicEngine, HeuristicPolicy, Oracle,
};
use billscope_core::{
    Document, ImpactFinding, ReaderProfile, chunk_document, rank_findings, resolve_citations,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::augment::ContextAugmenter;
use crate::config::PipelineConfig;
use crate::error::PipelineError;
use crate::status::{PipelineStatus, Stage, StatusReporter};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Init,
    Chunked,
    Augmented,
    Analyzed,
    Cited,
    Ranked,
    Done,
    Failed,
}

impl RunState {
    /// The only successor on the success path.
    fn successor(self) -> Option<RunState> {
        match self {
            Self::Init => Some(Self::Chunked),
            Self::Chunked => Some(Self::Augmented),
            Self::Augmented => Some(Self::Analyzed),
            Self::Analyzed => Some(Self::Cited),
            Self::Cited => Some(Self::Ranked),
            Self::Ranked => Some(Self::Done),
            Self::Done | Self::Failed => None,
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Done | Self::Failed)
    }
}

/// Which analysis path produced the findings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisSource {
    Oracle,
    Heuristic,
}

/// Result of a successful run.
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisReport {
    /// Ranked, cited findings. Never empty.
    pub findings: Vec<ImpactFinding>,
    pub source: AnalysisSource,
    pub chunk_count: usize,
    pub context_snippets: usize,
    pub completed_at: DateTime<Utc>,
}

/// One run's mutable bookkeeping: current state plus the status channel.
struct Run<F: FnMut(PipelineStatus)> {
    state: RunState,
    reporter: StatusReporter<F>,
}

impl<F: FnMut(PipelineStatus)> Run<F> {
    fn advance(&mut self, next: RunState) {
        debug_assert_eq!(self.state.successor(), Some(next), "invalid run transition");
        debug!(from = ?self.state, to = ?next, "run transition");
        self.state = next;
    }

    /// Move to `Failed`, emit the terminal event, and hand back the error.
    fn fail(&mut self, error: PipelineError) -> PipelineError {
        debug!(from = ?self.state, "run failed");
        self.state = RunState::Failed;
        self.reporter.fail(error.to_string());
        error
    }

    fn checkpoint(&mut self, cancel: &CancellationToken) -> Result<(), PipelineError> {
        if cancel.is_cancelled() {
            info!(state = ?self.state, "cancellation requested");
            return Err(self.fail(PipelineError::Cancelled));
        }
        Ok(())
    }
}

/// Personalised impact analysis for one (document, profile) pair per run.
///
/// Holds no per-run state, so one pipeline can serve concurrent runs.
pub struct ImpactPipeline {
    invoker: Option<AnalysisInvoker>,
    augmenter: ContextAugmenter,
    engine: HeuristicEngine,
    config: PipelineConfig,
}

impl Default for ImpactPipeline {
    fn default() -> Self {
        Self::new(PipelineConfig::default())
    }
}

impl ImpactPipeline {
    /// A pipeline with no oracle and no search: heuristic analysis only.
    pub fn new(config: PipelineConfig) -> Self {
        let augmenter = ContextAugmenter::new(
            None,
            config.search_timeout,
            config.max_context_snippets,
            config.max_snippet_chars,
        );
        Self {
            invoker: None,
            augmenter,
            engine: HeuristicEngine::default(),
            config,
        }
    }

    pub fn with_oracle(mut self, oracle: Arc<dyn Oracle>) -> Self {
        self.invoker = Some(AnalysisInvoker::new(oracle, self.config.invoker_config()));
        self
    }

    pub fn with_search(mut self, search: Arc<dyn ContextSearch>) -> Self {
        self.augmenter = ContextAugmenter::new(
            Some(search),
            self.config.search_timeout,
            self.config.max_context_snippets,
            self.config.max_snippet_chars,
        );
        self
    }

    pub fn with_policy(mut self, policy: HeuristicPolicy) -> Self {
        self.engine = HeuristicEngine::new(policy);
        self
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Analyze `document` for `profile`.
    ///
    /// `on_status` is called synchronously at each stage boundary with a
    /// strictly increasing step, and exactly once with `is_complete = true`.
    /// On success the report always holds at least one finding.
    pub async fn run<F>(
        &self,
        document: &Document,
        profile: &ReaderProfile,
        on_status: F,
        cancel: &CancellationToken,
    ) -> Result<AnalysisReport, PipelineError>
    where
        F: FnMut(PipelineStatus),
    {
        let mut run = Run {
            state: RunState::Init,
            reporter: StatusReporter::new(on_status),
        };

        run.reporter
            .stage(Stage::Initialize, format!("Preparing analysis of \"{}\"", document.title));
        if document.is_blank() {
            return Err(run.fail(PipelineError::EmptyDocument));
        }

        run.reporter.stage(Stage::Chunk, "Splitting the bill into sections");
        let chunks = chunk_document(document);
        if chunks.is_empty() {
            return Err(run.fail(PipelineError::NoChunks));
        }
        info!(chunks = chunks.len(), title = %document.title, "document chunked");
        run.advance(RunState::Chunked);

        run.checkpoint(cancel)?;
        run.reporter.stage(Stage::AugmentContext, "Gathering recent context");
        let context = self.augmenter.augment(&document.title).await;
        run.advance(RunState::Augmented);

        run.checkpoint(cancel)?;
        let (findings, source) = match &self.invoker {
            Some(invoker) => {
                run.reporter
                    .stage(Stage::InvokeAnalysis, "Analyzing how the bill affects you");
                match invoker.invoke(&document.title, &chunks, profile, &context).await {
                    Ok(findings) => (findings, AnalysisSource::Oracle),
                    Err(e) => {
                        warn!(error = %e, "oracle unavailable, falling back to heuristic analysis");
                        run.reporter.stage(
                            Stage::Fallback,
                            format!("Analysis service unavailable ({e}); using rule-based analysis"),
                        );
                        (self.engine.analyze(&chunks, profile), AnalysisSource::Heuristic)
                    }
                }
            }
            None => {
                let reason = AnalysisUnavailable::NotConfigured;
                run.reporter.stage(
                    Stage::Fallback,
                    format!("{reason}; using rule-based analysis"),
                );
                (self.engine.analyze(&chunks, profile), AnalysisSource::Heuristic)
            }
        };
        if findings.is_empty() {
            return Err(run.fail(PipelineError::Failed("analysis produced no findings".into())));
        }
        run.advance(RunState::Analyzed);

        run.checkpoint(cancel)?;
        run.reporter
            .stage(Stage::ResolveCitations, "Linking findings to the bill text");
        let cited = resolve_citations(findings, &chunks);
        run.advance(RunState::Cited);

        let ranked = rank_findings(cited, self.config.max_findings.max(1));
        run.advance(RunState::Ranked);

        let uncited = ranked.iter().filter(|f| f.citation.is_none()).count();
        info!(
            count = ranked.len(),
            uncited,
            source = ?source,
            "analysis complete"
        );
        run.reporter.complete(format!(
            "Found {} way{} this bill may affect you",
            ranked.len(),
            if ranked.len() == 1 { "" } else { "s" }
        ));
        run.advance(RunState::Done);

        Ok(AnalysisReport {
            findings: ranked,
            source,
            chunk_count: chunks.len(),
            context_snippets: context.len(),
            completed_at: Utc::now(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use billscope_ai::{GenerateRequest, GenerateResponse, OracleError, SearchError};
    use billscope_core::{ImpactDirection, Severity};
    use std::sync::Mutex;
    use std::time::Duration;

    const SCENARIO_A: &str = "SEC. 1. Tax credit for small business. SEC. 2. Medicare drug price cap.";
    const SCENARIO_C_REPLY: &str = r#"[{"category":"Healthcare","impact":"positive","severity":"high","title":"X","description":"Y","details":[],"source_chunk_id":"p-1"},{"category":"Bad"}]"#;

    enum Behaviour {
        Reply(&'static str),
        Fail,
        Hang,
        CancelThenReply(CancellationToken, &'static str),
    }

    struct FakeOracle {
        behaviour: Behaviour,
        prompts: Mutex<Vec<String>>,
    }

    impl FakeOracle {
        fn new(behaviour: Behaviour) -> Arc<Self> {
            Arc::new(Self {
                behaviour,
                prompts: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl Oracle for FakeOracle {
        fn name(&self) -> &str {
            "fake"
        }

        async fn generate(&self, request: GenerateRequest) -> Result<GenerateResponse, OracleError> {
            self.prompts.lock().unwrap().push(request.user_prompt);
            let text = match &self.behaviour {
                Behaviour::Reply(text) => *text,
                Behaviour::Fail => return Err(OracleError::Transport("connection refused".into())),
                Behaviour::Hang => {
                    tokio::time::sleep(Duration::from_secs(5)).await;
                    "[]"
                }
                Behaviour::CancelThenReply(token, text) => {
                    token.cancel();
                    *text
                }
            };
            Ok(GenerateResponse {
                text: text.to_string(),
                tokens_used: 10,
            })
        }
    }

    struct FailingSearch;

    #[async_trait]
    impl ContextSearch for FailingSearch {
        async fn search(&self, _query: &str) -> Result<Vec<String>, SearchError> {
            Err(SearchError::Transport("dns failure".into()))
        }
    }

    struct StaticSearch(Vec<String>);

    #[async_trait]
    impl ContextSearch for StaticSearch {
        async fn search(&self, _query: &str) -> Result<Vec<String>, SearchError> {
            Ok(self.0.clone())
        }
    }

    fn llc_owner() -> ReaderProfile {
        ReaderProfile {
            business_type: Some("llc".into()),
            ..Default::default()
        }
    }

    async fn run_collect(
        pipeline: &ImpactPipeline,
        document: &Document,
        profile: &ReaderProfile,
        cancel: &CancellationToken,
    ) -> (Result<AnalysisReport, PipelineError>, Vec<PipelineStatus>) {
        let mut events = Vec::new();
        let result = pipeline
            .run(document, profile, |s| events.push(s), cancel)
            .await;
        (result, events)
    }

    fn stages(events: &[PipelineStatus]) -> Vec<Stage> {
        events.iter().map(|e| e.stage).collect()
    }

    fn assert_well_formed(events: &[PipelineStatus]) {
        for pair in events.windows(2) {
            assert!(pair[0].step < pair[1].step, "steps must strictly increase");
        }
        let terminal: Vec<_> = events.iter().filter(|e| e.is_complete).collect();
        assert_eq!(terminal.len(), 1, "exactly one terminal event");
        assert!(events.last().unwrap().is_complete, "terminal event is last");
    }

    #[tokio::test]
    async fn oracle_unavailable_falls_back_to_heuristics() {
        let pipeline = ImpactPipeline::default().with_oracle(FakeOracle::new(Behaviour::Fail));
        let document = Document::new("Small Business Relief Act", SCENARIO_A);

        let (result, events) =
            run_collect(&pipeline, &document, &llc_owner(), &CancellationToken::new()).await;
        let report = result.unwrap();

        assert_eq!(report.source, AnalysisSource::Heuristic);
        assert!(!report.findings.is_empty());
        for category in ["Business", "Taxation"] {
            let finding = report
                .findings
                .iter()
                .find(|f| f.category == category)
                .unwrap_or_else(|| panic!("missing {category}"));
            let citation = finding.citation.as_ref().expect("cited");
            let text = citation.text.to_lowercase();
            assert!(text.contains("tax") || text.contains("business"));
            assert_eq!(citation.section_label, "Section 1");
        }

        assert_eq!(
            stages(&events),
            vec![
                Stage::Initialize,
                Stage::Chunk,
                Stage::AugmentContext,
                Stage::InvokeAnalysis,
                Stage::Fallback,
                Stage::ResolveCitations,
                Stage::Complete,
            ]
        );
        assert_well_formed(&events);
    }

    #[tokio::test]
    async fn empty_document_fails_after_initialize() {
        let pipeline = ImpactPipeline::default().with_oracle(FakeOracle::new(Behaviour::Fail));
        let document = Document::new("Blank Act", "");

        let (result, events) =
            run_collect(&pipeline, &document, &ReaderProfile::default(), &CancellationToken::new())
                .await;

        assert_eq!(result.unwrap_err(), PipelineError::EmptyDocument);
        assert_eq!(stages(&events), vec![Stage::Initialize, Stage::Failed]);
        assert_eq!(events[1].error.as_deref(), Some("document text is empty"));
        assert_well_formed(&events);
    }

    #[tokio::test]
    async fn whitespace_document_is_empty() {
        let pipeline = ImpactPipeline::default();
        let document = Document::new("Blank Act", " \n\n\t ");
        let (result, _) =
            run_collect(&pipeline, &document, &ReaderProfile::default(), &CancellationToken::new())
                .await;
        assert_eq!(result.unwrap_err(), PipelineError::EmptyDocument);
    }

    #[tokio::test]
    async fn partially_malformed_oracle_reply_keeps_valid_element() {
        let pipeline =
            ImpactPipeline::default().with_oracle(FakeOracle::new(Behaviour::Reply(SCENARIO_C_REPLY)));
        let document = Document::new("Drug Pricing Act", "SEC. 1. Medicare drug price cap.\n\nSEC. 2. Effective date.");

        let (result, events) =
            run_collect(&pipeline, &document, &ReaderProfile::default(), &CancellationToken::new())
                .await;
        let report = result.unwrap();

        assert_eq!(report.source, AnalysisSource::Oracle);
        assert_eq!(report.findings.len(), 1);
        let finding = &report.findings[0];
        assert_eq!(finding.category, "Healthcare");
        assert_eq!(finding.impact, ImpactDirection::Positive);
        assert_eq!(finding.severity, Severity::High);
        let citation = finding.citation.as_ref().expect("cited");
        assert_eq!(citation.text, "SEC. 1. Medicare drug price cap.");
        assert!(!stages(&events).contains(&Stage::Fallback));
        assert_well_formed(&events);
    }

    #[tokio::test]
    async fn dangling_citation_is_left_unset() {
        let reply = r#"[{"category":"Taxation","impact":"negative","severity":"low","title":"T","description":"D","source_chunk_id":"p-77"}]"#;
        let pipeline = ImpactPipeline::default().with_oracle(FakeOracle::new(Behaviour::Reply(reply)));
        let document = Document::new("Act", "SEC. 1. Text.");
        let (result, _) =
            run_collect(&pipeline, &document, &ReaderProfile::default(), &CancellationToken::new())
                .await;
        let report = result.unwrap();
        assert_eq!(report.findings.len(), 1);
        assert!(report.findings[0].citation.is_none());
    }

    #[tokio::test]
    async fn oracle_timeout_falls_back() {
        let config = PipelineConfig {
            oracle_timeout: Duration::from_millis(20),
            ..Default::default()
        };
        let pipeline = ImpactPipeline::new(config).with_oracle(FakeOracle::new(Behaviour::Hang));
        let document = Document::new("Act", SCENARIO_A);
        let (result, events) =
            run_collect(&pipeline, &document, &llc_owner(), &CancellationToken::new()).await;
        assert_eq!(result.unwrap().source, AnalysisSource::Heuristic);
        assert!(stages(&events).contains(&Stage::Fallback));
    }

    #[tokio::test]
    async fn no_oracle_goes_straight_to_fallback() {
        let pipeline = ImpactPipeline::default();
        let document = Document::new("Post Office Naming Act", "Designates the facility as a post office.");
        let (result, events) =
            run_collect(&pipeline, &document, &ReaderProfile::default(), &CancellationToken::new())
                .await;
        let report = result.unwrap();
        assert_eq!(report.findings.len(), 1);
        assert_eq!(report.findings[0].title, "Limited Direct Impact");
        assert!(report.findings[0].citation.is_some());
        assert!(!stages(&events).contains(&Stage::InvokeAnalysis));
        assert!(stages(&events).contains(&Stage::Fallback));
        assert_well_formed(&events);
    }

    #[tokio::test]
    async fn search_failure_is_silent() {
        let reply = r#"[{"category":"General","impact":"neutral","severity":"low","title":"T","description":"D"}]"#;
        let oracle = FakeOracle::new(Behaviour::Reply(reply));
        let pipeline = ImpactPipeline::default()
            .with_oracle(oracle.clone())
            .with_search(Arc::new(FailingSearch));
        let document = Document::new("Act", SCENARIO_A);
        let (result, events) =
            run_collect(&pipeline, &document, &ReaderProfile::default(), &CancellationToken::new())
                .await;
        let report = result.unwrap();
        assert_eq!(report.context_snippets, 0);
        assert_eq!(report.source, AnalysisSource::Oracle);
        assert!(events.iter().all(|e| e.error.is_none()));
        assert!(oracle.prompts.lock().unwrap()[0].contains("Recent commentary:\nnone"));
    }

    #[tokio::test]
    async fn context_reaches_oracle_prompt() {
        let reply = r#"[{"category":"General","impact":"neutral","severity":"low","title":"T","description":"D"}]"#;
        let oracle = FakeOracle::new(Behaviour::Reply(reply));
        let pipeline = ImpactPipeline::default()
            .with_oracle(oracle.clone())
            .with_search(Arc::new(StaticSearch(vec!["Committee advanced the bill.".into()])));
        let document = Document::new("Act", SCENARIO_A);
        let (result, _) =
            run_collect(&pipeline, &document, &ReaderProfile::default(), &CancellationToken::new())
                .await;
        assert_eq!(result.unwrap().context_snippets, 1);
        assert!(oracle.prompts.lock().unwrap()[0].contains("- Committee advanced the bill."));
    }

    #[tokio::test]
    async fn cancelled_before_start_stops_after_chunking() {
        let pipeline = ImpactPipeline::default();
        let cancel = CancellationToken::new();
        cancel.cancel();
        let document = Document::new("Act", SCENARIO_A);

        let (result, events) =
            run_collect(&pipeline, &document, &ReaderProfile::default(), &cancel).await;

        assert_eq!(result.unwrap_err(), PipelineError::Cancelled);
        assert_eq!(stages(&events), vec![Stage::Initialize, Stage::Chunk, Stage::Failed]);
        assert_eq!(events[2].error.as_deref(), Some("run cancelled"));
        assert_well_formed(&events);
    }

    #[tokio::test]
    async fn cancellation_during_analysis_honoured_after_it_finishes() {
        let cancel = CancellationToken::new();
        let reply = r#"[{"category":"General","impact":"neutral","severity":"low","title":"T","description":"D"}]"#;
        let oracle = FakeOracle::new(Behaviour::CancelThenReply(cancel.clone(), reply));
        let pipeline = ImpactPipeline::default().with_oracle(oracle.clone());
        let document = Document::new("Act", SCENARIO_A);

        let (result, events) =
            run_collect(&pipeline, &document, &ReaderProfile::default(), &cancel).await;

        assert_eq!(result.unwrap_err(), PipelineError::Cancelled);
        assert_eq!(oracle.prompts.lock().unwrap().len(), 1);
        assert_eq!(
            stages(&events),
            vec![
                Stage::Initialize,
                Stage::Chunk,
                Stage::AugmentContext,
                Stage::InvokeAnalysis,
                Stage::Failed,
            ]
        );
    }

    #[tokio::test]
    async fn findings_ranked_and_capped() {
        let reply = r#"[
            {"category":"A","impact":"neutral","severity":"low","title":"l1","description":"d"},
            {"category":"B","impact":"neutral","severity":"high","title":"h1","description":"d"},
            {"category":"C","impact":"neutral","severity":"medium","title":"m1","description":"d"},
            {"category":"D","impact":"neutral","severity":"high","title":"h2","description":"d"}
        ]"#;
        let config = PipelineConfig {
            max_findings: 3,
            ..Default::default()
        };
        let pipeline = ImpactPipeline::new(config).with_oracle(FakeOracle::new(Behaviour::Reply(reply)));
        let document = Document::new("Act", SCENARIO_A);
        let (result, _) =
            run_collect(&pipeline, &document, &ReaderProfile::default(), &CancellationToken::new())
                .await;
        let titles: Vec<String> = result.unwrap().findings.into_iter().map(|f| f.title).collect();
        assert_eq!(titles, vec!["h1", "h2", "m1"]);
    }

    #[tokio::test]
    async fn concurrent_runs_are_independent() {
        let pipeline = Arc::new(ImpactPipeline::default());
        let a = Document::new("A", SCENARIO_A);
        let b = Document::new("B", "Designates a post office.");
        let cancel = CancellationToken::new();
        let profile = llc_owner();

        let (ra, rb) = tokio::join!(
            pipeline.run(&a, &profile, |_| {}, &cancel),
            pipeline.run(&b, &profile, |_| {}, &cancel),
        );
        assert!(ra.unwrap().findings.iter().any(|f| f.category == "Business"));
        assert_eq!(rb.unwrap().findings[0].title, "Limited Direct Impact");
    }

    #[test]
    fn run_state_successors() {
        let mut state = RunState::Init;
        let mut path = vec![state];
        while let Some(next) = state.successor() {
            state = next;
            path.push(state);
        }
        assert_eq!(path.len(), 7);
        assert!(state.is_terminal());
        assert!(RunState::Failed.is_terminal());
        assert!(RunState::Failed.successor().is_none());
    }
}
