use super::builder;
use crate::cli::args::SummarizeArgs;
use crate::exit_codes;
use anyhow::Context;
use std::collections::HashSet;
use wikifacts_core::dataset;
use wikifacts_core::Checkpoint;
use wikifacts_metrics::{summarize, write_results};

pub fn run(args: SummarizeArgs) -> anyhow::Result<i32> {
    let cfg = match builder::load_config(args.config.as_deref()) {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("config error: {e}");
            return Ok(exit_codes::CONFIG_ERROR);
        }
    };
    let facts = match dataset::load_facts(&args.facts) {
        Ok(facts) => facts,
        Err(e) => {
            eprintln!("dataset error: {e}");
            return Ok(exit_codes::CONFIG_ERROR);
        }
    };

    let checkpoint_path = args.checkpoint.unwrap_or(cfg.run.checkpoint);
    let checkpoint = Checkpoint::load_blocking(&checkpoint_path).context("loading checkpoint")?;
    let known: HashSet<&str> = facts.iter().map(|f| f.id.as_str()).collect();
    let unknown = checkpoint
        .iter()
        .filter(|(id, _)| !known.contains(id))
        .count();
    if unknown > 0 {
        tracing::warn!(
            unknown,
            path = %checkpoint_path.display(),
            "checkpoint entries without a matching fact are ignored"
        );
    }
    let summary =
        summarize(&facts, &checkpoint).with_run_info(cfg.model.name.clone(), cfg.prompt.mode.as_str());

    println!("{}", serde_json::to_string_pretty(&summary)?);
    if let Some(out) = &args.results {
        write_results(&summary, out).with_context(|| format!("writing {}", out.display()))?;
    }
    Ok(exit_codes::SUCCESS)
}
