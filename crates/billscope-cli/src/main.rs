mod display;
mod input;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use billscope_ai::HeuristicPolicy;
use billscope_client::{AnthropicOracle, DEFAULT_ANTHROPIC_URL, DEFAULT_MODEL, SearchClient};
use billscope_pipeline::{CancellationToken, ImpactPipeline, PipelineConfig};
use clap::{Args, Parser, Subcommand};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "billscope", version)]
#[command(about = "Explain how a bill affects you personally")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Analyze a bill against a reader profile
    Analyze(AnalyzeArgs),
    /// Print the built-in heuristic policy as JSON
    Policy,
}

#[derive(Args)]
struct AnalyzeArgs {
    /// Bill title (defaults to the document file name)
    #[arg(long)]
    title: Option<String>,

    /// Plain-text bill
    #[arg(long)]
    document: PathBuf,

    /// Reader profile as JSON
    #[arg(long)]
    profile: PathBuf,

    /// Print the report as JSON on stdout
    #[arg(long)]
    json: bool,

    /// Skip the oracle and context search; rule-based analysis only
    #[arg(long)]
    offline: bool,

    /// Heuristic policy JSON (defaults to the built-in table)
    #[arg(long)]
    policy: Option<PathBuf>,

    #[arg(long)]
    max_findings: Option<usize>,

    #[arg(long)]
    oracle_timeout_secs: Option<u64>,

    #[arg(long)]
    search_timeout_secs: Option<u64>,

    #[arg(long)]
    max_context_snippets: Option<usize>,

    #[arg(long)]
    max_snippet_chars: Option<usize>,

    #[arg(long)]
    max_tokens: Option<u32>,

    #[arg(long)]
    temperature: Option<f32>,

    #[arg(long)]
    max_prompt_chars: Option<usize>,

    #[arg(long, env = "BILLSCOPE_ORACLE_URL", default_value = DEFAULT_ANTHROPIC_URL)]
    oracle_url: String,

    #[arg(long, env = "ANTHROPIC_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    #[arg(long, env = "BILLSCOPE_MODEL", default_value = DEFAULT_MODEL)]
    model: String,

    #[arg(long, env = "BILLSCOPE_SEARCH_URL")]
    search_url: Option<String>,

    #[arg(long, env = "BILLSCOPE_SEARCH_KEY", hide_env_values = true)]
    search_key: Option<String>,
}

impl AnalyzeArgs {
    fn pipeline_config(&self) -> anyhow::Result<PipelineConfig> {
        let mut config = PipelineConfig::default();
        if let Some(n) = self.max_findings {
            anyhow::ensure!(n >= 1, "--max-findings must be at least 1");
            config.max_findings = n;
        }
        if let Some(secs) = self.oracle_timeout_secs {
            config.oracle_timeout = Duration::from_secs(secs);
        }
        if let Some(secs) = self.search_timeout_secs {
            config.search_timeout = Duration::from_secs(secs);
        }
        if let Some(n) = self.max_context_snippets {
            config.max_context_snippets = n;
        }
        if let Some(n) = self.max_snippet_chars {
            config.max_snippet_chars = n;
        }
        if let Some(n) = self.max_tokens {
            config.max_tokens = n;
        }
        if let Some(t) = self.temperature {
            anyhow::ensure!((0.0..=1.0).contains(&t), "--temperature must be within 0..=1");
            config.temperature = t;
        }
        if let Some(n) = self.max_prompt_chars {
            config.max_prompt_chars = n;
        }
        Ok(config)
    }

    fn build_pipeline(&self) -> anyhow::Result<ImpactPipeline> {
        let config = self.pipeline_config()?;
        let max_results = u32::try_from(config.max_context_snippets).unwrap_or(u32::MAX);
        let mut pipeline = ImpactPipeline::new(config);

        if let Some(path) = &self.policy {
            pipeline = pipeline.with_policy(HeuristicPolicy::load(path)?);
        }
        if self.offline {
            info!("offline mode, using rule-based analysis");
            return Ok(pipeline);
        }

        match &self.api_key {
            Some(key) => {
                let oracle =
                    AnthropicOracle::new(self.oracle_url.clone(), key.clone(), self.model.clone());
                pipeline = pipeline.with_oracle(Arc::new(oracle));
            }
            None => warn!("ANTHROPIC_API_KEY not set, using rule-based analysis"),
        }
        if let Some(url) = &self.search_url {
            let search =
                SearchClient::new(url.clone(), self.search_key.clone()).with_max_results(max_results);
            pipeline = pipeline.with_search(Arc::new(search));
        }
        Ok(pipeline)
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .init();

    let cli = Cli::parse();
    match cli.command {
        Command::Analyze(args) => analyze(args).await,
        Command::Policy => {
            println!("{}", HeuristicPolicy::default().to_json()?);
            Ok(())
        }
    }
}

async fn analyze(args: AnalyzeArgs) -> anyhow::Result<()> {
    let document = input::load_document(&args.document, args.title.as_deref())?;
    let profile = input::load_profile(&args.profile)?;
    let pipeline = args.build_pipeline()?;
    info!(
        "billscope v{} analyzing \"{}\"",
        env!("CARGO_PKG_VERSION"),
        document.title
    );

    let cancel = CancellationToken::new();
    let interrupt = {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("interrupt received, cancelling");
                cancel.cancel();
            }
        })
    };

    let result = pipeline
        .run(
            &document,
            &profile,
            |status| eprintln!("{}", display::render_status(&status)),
            &cancel,
        )
        .await;
    interrupt.abort();

    let report = result.context("analysis did not complete")?;
    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print!("{}", display::render_report(&document.title, &report));
    }
    Ok(())
}
