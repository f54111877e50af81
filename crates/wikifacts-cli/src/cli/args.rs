use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use wikifacts_core::config::ProviderKind;
use wikifacts_core::engine::ContextSource;
use wikifacts_core::prompt::JudgeMode;
use wikifacts_core::retrieval::{Pooling, Splitter};

#[derive(Parser)]
#[command(
    name = "wikifacts",
    version,
    about = "Evaluate how accurately LLMs judge short factual statements"
)]
pub struct Cli {
    /// Log output format (filter with RUST_LOG)
    #[arg(long, value_enum, default_value_t = LogFormat::Text, global = true)]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub cmd: Command,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum LogFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
pub enum Command {
    /// Judge every unresolved fact and write the results file
    Run(RunArgs),
    /// Recompute metrics from an existing checkpoint without model calls
    Summarize(SummarizeArgs),
    /// Check configuration and datasets without model calls
    Validate(ValidateArgs),
}

#[derive(Args, Debug, Clone)]
pub struct DataArgs {
    /// Config file; wikifacts.yaml is used when present
    #[arg(long, env = "WIKIFACTS_CONFIG")]
    pub config: Option<PathBuf>,

    /// Facts (queries) as JSON lines
    #[arg(long)]
    pub facts: PathBuf,

    /// Corpus articles as JSON lines; required for linked and relevant modes
    #[arg(long)]
    pub corpus: Option<PathBuf>,
}

/// Flags that override the config file and environment.
#[derive(Args, Debug, Clone, Default)]
pub struct ConfigOverrides {
    /// Judgment mode: fact|linked|relevant
    #[arg(long)]
    pub mode: Option<JudgeMode>,

    /// Model provider: openai|fake
    #[arg(long)]
    pub provider: Option<ProviderKind>,

    #[arg(long)]
    pub model: Option<String>,

    /// OpenAI-compatible base URL
    #[arg(long)]
    pub api_url: Option<String>,

    #[arg(long)]
    pub threads: Option<usize>,

    #[arg(long)]
    pub max_attempts: Option<u32>,

    /// Remove the "don't know" option from prompts
    #[arg(long)]
    pub no_idk: bool,

    /// Prepend the two illustrative exchanges
    #[arg(long)]
    pub few_shots: bool,

    /// Localize prompts into this language code
    #[arg(long)]
    pub language: Option<String>,

    /// Rank article fragments and keep the top-k as context
    #[arg(long)]
    pub retrieval: bool,

    #[arg(long)]
    pub top_k: Option<usize>,

    /// Fragment splitter: sentence|paragraph
    #[arg(long)]
    pub splitter: Option<Splitter>,

    /// Embedding pooling: mean|cls
    #[arg(long)]
    pub pooling: Option<Pooling>,

    /// Article text used as context: abstract|full
    #[arg(long)]
    pub context_source: Option<ContextSource>,

    #[arg(long)]
    pub checkpoint: Option<PathBuf>,

    #[arg(long)]
    pub output_log: Option<PathBuf>,

    #[arg(long)]
    pub failure_log: Option<PathBuf>,

    #[arg(long)]
    pub results: Option<PathBuf>,

    /// Completions between checkpoint writes
    #[arg(long)]
    pub flush_every: Option<usize>,
}

#[derive(Args, Debug, Clone)]
pub struct RunArgs {
    #[command(flatten)]
    pub data: DataArgs,

    #[command(flatten)]
    pub overrides: ConfigOverrides,

    /// Block all outbound network calls
    #[arg(long)]
    pub deny_network: bool,

    /// Suppress progress lines
    #[arg(long)]
    pub quiet: bool,
}

#[derive(Args, Debug, Clone)]
pub struct SummarizeArgs {
    #[arg(long, env = "WIKIFACTS_CONFIG")]
    pub config: Option<PathBuf>,

    #[arg(long)]
    pub facts: PathBuf,

    /// Defaults to run.checkpoint from the config
    #[arg(long)]
    pub checkpoint: Option<PathBuf>,

    /// Also write the results file here
    #[arg(long)]
    pub results: Option<PathBuf>,
}

#[derive(Args, Debug, Clone)]
pub struct ValidateArgs {
    #[command(flatten)]
    pub data: DataArgs,

    #[command(flatten)]
    pub overrides: ConfigOverrides,
}
