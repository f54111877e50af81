//! Evaluation configuration.
//!
//! Precedence, lowest first: built-in defaults, the YAML file, environment
//! variables ([`EvalConfig::apply_env`]), then CLI flags applied by the
//! caller. [`EvalConfig::validate`] holds the only fatal startup checks.

use crate::engine::{ContextSource, OrchestratorConfig};
use crate::errors::ConfigError;
use crate::judge::JudgeConfig;
use crate::model::DecodingParams;
use crate::prompt::{JudgeMode, PromptPolicy};
use crate::retrieval::{Pooling, RetrieverConfig, Splitter};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_CONFIG_FILE: &str = "wikifacts.yaml";
pub const DEFAULT_API_URL: &str = "https://api.openai.com/v1";

#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct EvalConfig {
    pub model: ModelConfig,
    pub prompt: PromptConfig,
    pub retrieval: RetrievalConfig,
    pub run: RunConfig,
}

#[derive(Clone, Copy, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    #[default]
    Openai,
    Fake,
}

impl std::str::FromStr for ProviderKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "openai" => Ok(Self::Openai),
            "fake" => Ok(Self::Fake),
            other => Err(format!("unknown provider '{other}' (expected openai|fake)")),
        }
    }
}

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct ModelConfig {
    pub provider: ProviderKind,
    pub name: String,
    pub api_url: Option<String>,
    /// Prefer `WIKIFACTS_API_KEY`; never written back out.
    #[serde(skip_serializing)]
    pub api_key: Option<String>,
    pub temperature: f64,
    pub top_p: f64,
    pub max_tokens: Option<u32>,
    pub timeout_secs: u64,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            provider: ProviderKind::Openai,
            name: "gpt-4o-mini".to_string(),
            api_url: Some(DEFAULT_API_URL.to_string()),
            api_key: None,
            temperature: 0.0,
            top_p: 0.9,
            max_tokens: None,
            timeout_secs: 360,
        }
    }
}

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct PromptConfig {
    pub mode: JudgeMode,
    pub allow_idk: bool,
    pub few_shots: bool,
    /// Target language for prompt localization; `None` or `en` keeps English.
    pub language: Option<String>,
}

impl Default for PromptConfig {
    fn default() -> Self {
        Self {
            mode: JudgeMode::Fact,
            allow_idk: true,
            few_shots: false,
            language: None,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum EncoderKind {
    #[default]
    Hashing,
    Http,
}

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct RetrievalConfig {
    pub enabled: bool,
    pub top_k: usize,
    pub splitter: Splitter,
    pub pooling: Pooling,
    pub batch_size: usize,
    pub context_source: ContextSource,
    pub encoder: EncoderKind,
    pub encoder_url: Option<String>,
    pub max_len: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            top_k: 5,
            splitter: Splitter::Paragraph,
            pooling: Pooling::Mean,
            batch_size: 16,
            context_source: ContextSource::Full,
            encoder: EncoderKind::Hashing,
            encoder_url: None,
            max_len: 512,
        }
    }
}

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct RunConfig {
    pub threads: usize,
    pub max_attempts: u32,
    pub retry_backoff_ms: u64,
    pub flush_every: usize,
    pub checkpoint: PathBuf,
    pub output_log: PathBuf,
    pub failure_log: PathBuf,
    pub results: PathBuf,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            threads: 4,
            max_attempts: 3,
            retry_backoff_ms: 1000,
            flush_every: 1,
            checkpoint: PathBuf::from(".wikifacts/checkpoint.json"),
            output_log: PathBuf::from(".wikifacts/output.jsonl"),
            failure_log: PathBuf::from(".wikifacts/failures.jsonl"),
            results: PathBuf::from(".wikifacts/results.json"),
        }
    }
}

impl EvalConfig {
    /// Parse a YAML config file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| {
            if source.kind() == std::io::ErrorKind::NotFound {
                ConfigError::NotFound {
                    path: path.to_path_buf(),
                }
            } else {
                ConfigError::Read {
                    path: path.to_path_buf(),
                    source,
                }
            }
        })?;
        Self::from_yaml(path, &text)
    }

    /// Like [`EvalConfig::load`], but a missing file yields the defaults.
    pub fn load_or_default(path: &Path) -> Result<Self, ConfigError> {
        match Self::load(path) {
            Err(ConfigError::NotFound { .. }) => Ok(Self::default()),
            other => other,
        }
    }

    fn from_yaml(path: &Path, text: &str) -> Result<Self, ConfigError> {
        if text.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(text).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }

    /// Apply `WIKIFACTS_*` overrides from the process environment.
    pub fn apply_env(&mut self) -> Result<(), ConfigError> {
        self.apply_vars(|key| std::env::var(key).ok())
    }

    fn apply_vars(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<(), ConfigError> {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(url) = var("WIKIFACTS_API_URL") {
            self.model.api_url = Some(url);
        }
        if let Some(key) = var("WIKIFACTS_API_KEY").or_else(|| var("OPENAI_API_KEY")) {
            self.model.api_key = Some(key);
        }
        if let Some(name) = var("WIKIFACTS_MODEL") {
            self.model.name = name;
        }
        if let Some(threads) = var("WIKIFACTS_THREADS") {
            self.run.threads = parse_var("WIKIFACTS_THREADS", &threads)?;
        }
        if let Some(attempts) = var("WIKIFACTS_MAX_ATTEMPTS") {
            self.run.max_attempts = parse_var("WIKIFACTS_MAX_ATTEMPTS", &attempts)?;
        }
        Ok(())
    }

    /// Fatal configuration checks, first failure wins.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.model.name.trim().is_empty() {
            return Err(ConfigError::invalid("model.name", "must not be empty"));
        }
        if self.model.provider == ProviderKind::Openai
            && self
                .model
                .api_url
                .as_deref()
                .map_or(true, |u| u.trim().is_empty())
        {
            return Err(ConfigError::invalid(
                "model.api_url",
                "required for the openai provider",
            ));
        }
        if self.run.max_attempts == 0 {
            return Err(ConfigError::invalid("run.max_attempts", "must be at least 1"));
        }
        if self.run.threads == 0 {
            return Err(ConfigError::invalid("run.threads", "must be at least 1"));
        }
        if self.run.flush_every == 0 {
            return Err(ConfigError::invalid("run.flush_every", "must be at least 1"));
        }
        if self.retrieval.enabled {
            if self.prompt.mode == JudgeMode::Fact {
                return Err(ConfigError::invalid(
                    "retrieval.enabled",
                    "retrieval needs a context mode (linked or relevant)",
                ));
            }
            if self.retrieval.top_k == 0 {
                return Err(ConfigError::invalid("retrieval.top_k", "must be at least 1"));
            }
            if self.retrieval.batch_size == 0 {
                return Err(ConfigError::invalid(
                    "retrieval.batch_size",
                    "must be at least 1",
                ));
            }
            if self.retrieval.encoder == EncoderKind::Http && self.retrieval.encoder_url.is_none()
            {
                return Err(ConfigError::invalid(
                    "retrieval.encoder_url",
                    "required for the http encoder",
                ));
            }
        }
        Ok(())
    }

    pub fn decoding(&self) -> DecodingParams {
        DecodingParams {
            temperature: self.model.temperature,
            top_p: self.model.top_p,
            max_tokens: self.model.max_tokens,
        }
    }

    pub fn judge_config(&self) -> JudgeConfig {
        JudgeConfig {
            policy: PromptPolicy {
                mode: self.prompt.mode,
                allow_idk: self.prompt.allow_idk,
                use_few_shots: self.prompt.few_shots,
                translate_to: self
                    .prompt
                    .language
                    .clone()
                    .filter(|l| !l.trim().is_empty() && !l.eq_ignore_ascii_case("en")),
            },
            max_attempts: self.run.max_attempts,
            retry_backoff: Duration::from_millis(self.run.retry_backoff_ms),
            call_timeout: Duration::from_secs(self.model.timeout_secs),
            decoding: self.decoding(),
        }
    }

    pub fn retriever_config(&self) -> RetrieverConfig {
        RetrieverConfig {
            splitter: self.retrieval.splitter,
            pooling: self.retrieval.pooling,
            batch_size: self.retrieval.batch_size,
        }
    }

    pub fn orchestrator_config(&self) -> OrchestratorConfig {
        OrchestratorConfig {
            checkpoint_path: self.run.checkpoint.clone(),
            output_log: self.run.output_log.clone(),
            failure_log: self.run.failure_log.clone(),
            threads: self.run.threads,
            flush_every: self.run.flush_every,
        }
    }
}

fn parse_var<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::invalid(key, format!("cannot parse '{value}'")))
}
