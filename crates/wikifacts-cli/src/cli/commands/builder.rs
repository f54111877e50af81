//! Config resolution and pipeline wiring shared by the subcommands.

use crate::cli::args::{ConfigOverrides, DataArgs};
use anyhow::Context;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use wikifacts_core::config::{EncoderKind, ProviderKind, DEFAULT_API_URL, DEFAULT_CONFIG_FILE};
use wikifacts_core::dataset::{self, Corpus};
use wikifacts_core::engine::{ContextResolver, GroundedJudge};
use wikifacts_core::errors::{ConfigError, DatasetError};
use wikifacts_core::model::Fact;
use wikifacts_core::providers::encoder::hashing::HashingEncoder;
use wikifacts_core::providers::encoder::http::HttpTokenEncoder;
use wikifacts_core::providers::encoder::TokenEncoder;
use wikifacts_core::providers::llm::fake::FakeChatModel;
use wikifacts_core::providers::llm::openai::OpenAiChatModel;
use wikifacts_core::providers::llm::ChatModel;
use wikifacts_core::{EvalConfig, FragmentRetriever, JudgmentClient};

/// Explicit paths must exist; the implicit default file is optional.
pub(crate) fn load_config(path: Option<&Path>) -> Result<EvalConfig, ConfigError> {
    let mut cfg = match path {
        Some(p) => EvalConfig::load(p)?,
        None => EvalConfig::load_or_default(Path::new(DEFAULT_CONFIG_FILE))?,
    };
    cfg.apply_env()?;
    Ok(cfg)
}

pub(crate) fn apply_overrides(cfg: &mut EvalConfig, o: &ConfigOverrides) {
    if let Some(mode) = o.mode {
        cfg.prompt.mode = mode;
    }
    if let Some(provider) = o.provider {
        cfg.model.provider = provider;
    }
    if let Some(model) = &o.model {
        cfg.model.name = model.clone();
    }
    if let Some(url) = &o.api_url {
        cfg.model.api_url = Some(url.clone());
    }
    if let Some(threads) = o.threads {
        cfg.run.threads = threads;
    }
    if let Some(attempts) = o.max_attempts {
        cfg.run.max_attempts = attempts;
    }
    if o.no_idk {
        cfg.prompt.allow_idk = false;
    }
    if o.few_shots {
        cfg.prompt.few_shots = true;
    }
    if let Some(lang) = &o.language {
        cfg.prompt.language = Some(lang.clone());
    }
    if o.retrieval {
        cfg.retrieval.enabled = true;
    }
    if let Some(k) = o.top_k {
        cfg.retrieval.top_k = k;
    }
    if let Some(splitter) = o.splitter {
        cfg.retrieval.splitter = splitter;
    }
    if let Some(pooling) = o.pooling {
        cfg.retrieval.pooling = pooling;
    }
    if let Some(source) = o.context_source {
        cfg.retrieval.context_source = source;
    }
    set_path(&mut cfg.run.checkpoint, &o.checkpoint);
    set_path(&mut cfg.run.output_log, &o.output_log);
    set_path(&mut cfg.run.failure_log, &o.failure_log);
    set_path(&mut cfg.run.results, &o.results);
    if let Some(n) = o.flush_every {
        cfg.run.flush_every = n;
    }
}

fn set_path(target: &mut PathBuf, value: &Option<PathBuf>) {
    if let Some(v) = value {
        *target = v.clone();
    }
}

/// Resolved, validated config plus loaded datasets.
pub(crate) struct Workspace {
    pub(crate) config: EvalConfig,
    pub(crate) facts: Vec<Fact>,
    pub(crate) corpus: Corpus,
}

pub(crate) fn prepare(data: &DataArgs, overrides: &ConfigOverrides) -> anyhow::Result<Workspace> {
    let mut config = load_config(data.config.as_deref())?;
    apply_overrides(&mut config, overrides);
    config.validate()?;

    let facts = dataset::load_facts(&data.facts)?;
    let corpus = match &data.corpus {
        Some(path) => dataset::load_corpus(path)?,
        None if config.prompt.mode.uses_context() => {
            return Err(ConfigError::invalid(
                "corpus",
                format!("--corpus is required in {} mode", config.prompt.mode),
            )
            .into());
        }
        None => Corpus::default(),
    };
    report_missing_articles(&facts, &corpus, &config);
    Ok(Workspace {
        config,
        facts,
        corpus,
    })
}

fn report_missing_articles(facts: &[Fact], corpus: &Corpus, cfg: &EvalConfig) {
    if !cfg.prompt.mode.uses_context() {
        return;
    }
    let missing = facts
        .iter()
        .flat_map(|f| f.linked_article_ids.iter().chain(&f.relevant_article_ids))
        .filter(|id| corpus.get(id).is_none())
        .count();
    if missing > 0 {
        tracing::warn!(missing, "article references not found in corpus");
    }
}

pub(crate) fn build_chat_model(cfg: &EvalConfig) -> anyhow::Result<Arc<dyn ChatModel>> {
    Ok(match cfg.model.provider {
        ProviderKind::Fake => Arc::new(FakeChatModel::new(cfg.model.name.clone())),
        ProviderKind::Openai => {
            if cfg.model.api_key.is_none() {
                tracing::warn!("no API key set (WIKIFACTS_API_KEY or OPENAI_API_KEY); sending unauthenticated requests");
            }
            Arc::new(
                OpenAiChatModel::new(
                    cfg.model.name.clone(),
                    cfg.model.api_url.as_deref().unwrap_or(DEFAULT_API_URL),
                    cfg.model.api_key.clone(),
                    Duration::from_secs(cfg.model.timeout_secs),
                )
                .context("building chat client")?,
            )
        }
    })
}

fn build_encoder(cfg: &EvalConfig) -> anyhow::Result<Arc<dyn TokenEncoder>> {
    Ok(match cfg.retrieval.encoder {
        EncoderKind::Hashing => Arc::new(HashingEncoder::new(4096, cfg.retrieval.max_len)),
        EncoderKind::Http => {
            let url = cfg
                .retrieval
                .encoder_url
                .as_deref()
                .ok_or_else(|| ConfigError::invalid("retrieval.encoder_url", "missing"))?;
            Arc::new(
                HttpTokenEncoder::new(
                    url,
                    cfg.retrieval.max_len,
                    Duration::from_secs(cfg.model.timeout_secs),
                )
                .context("building encoder client")?,
            )
        }
    })
}

pub(crate) fn build_judge(cfg: &EvalConfig, corpus: Corpus) -> anyhow::Result<GroundedJudge> {
    let model = build_chat_model(cfg)?;
    let client = JudgmentClient::new(model, cfg.judge_config());

    let mut resolver = ContextResolver::new(
        Arc::new(corpus),
        cfg.prompt.mode,
        cfg.retrieval.context_source,
    );
    if cfg.retrieval.enabled {
        let retriever = FragmentRetriever::new(build_encoder(cfg)?, cfg.retriever_config());
        resolver = resolver.with_retriever(Arc::new(retriever), cfg.retrieval.top_k);
    }
    Ok(GroundedJudge::new(client, resolver))
}

/// Config and dataset failures map to the config exit code.
pub(crate) fn is_config_error(err: &anyhow::Error) -> bool {
    err.downcast_ref::<ConfigError>().is_some() || err.downcast_ref::<DatasetError>().is_some()
}
