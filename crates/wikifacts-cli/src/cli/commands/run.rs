use super::builder;
use crate::cli::args::RunArgs;
use crate::exit_codes;
use anyhow::Context;
use std::sync::Arc;
use wikifacts_core::providers::network::NetworkPolicyGuard;
use wikifacts_core::report::console::{default_progress_sink, format_run_summary};
use wikifacts_core::{Checkpoint, Orchestrator};
use wikifacts_metrics::{summarize, write_results};

pub async fn run(args: RunArgs) -> anyhow::Result<i32> {
    let ws = match builder::prepare(&args.data, &args.overrides) {
        Ok(ws) => ws,
        Err(e) if builder::is_config_error(&e) => {
            eprintln!("config error: {e}");
            return Ok(exit_codes::CONFIG_ERROR);
        }
        Err(e) => return Err(e),
    };
    let _network_guard = args
        .deny_network
        .then(|| NetworkPolicyGuard::deny("--deny-network"));

    let cfg = ws.config;
    let facts = ws.facts;
    let judge = builder::build_judge(&cfg, ws.corpus)?;

    let progress = if args.quiet {
        None
    } else {
        let checkpoint = Checkpoint::load(&cfg.run.checkpoint)
            .await
            .context("loading checkpoint")?;
        default_progress_sink(Orchestrator::remaining(&facts, &checkpoint).len())
    };

    tracing::info!(
        provider = ?cfg.model.provider,
        model = %cfg.model.name,
        mode = %cfg.prompt.mode,
        retrieval = cfg.retrieval.enabled,
        facts = facts.len(),
        "run configured"
    );
    let report = Orchestrator::new(Arc::new(judge), cfg.orchestrator_config())
        .with_progress(progress)
        .run(&facts)
        .await?;
    eprintln!("{}", format_run_summary(&report));

    let checkpoint = Checkpoint::load(&cfg.run.checkpoint)
        .await
        .context("reloading checkpoint")?;
    let summary =
        summarize(&facts, &checkpoint).with_run_info(cfg.model.name.clone(), cfg.prompt.mode.as_str());
    write_results(&summary, &cfg.run.results)
        .with_context(|| format!("writing {}", cfg.run.results.display()))?;
    tracing::info!(
        path = %cfg.run.results.display(),
        accuracy = summary.accuracy,
        recall = summary.recall,
        "results written"
    );

    Ok(if report.is_complete() {
        exit_codes::SUCCESS
    } else {
        exit_codes::RUN_INCOMPLETE
    })
}
