use super::builder;
use crate::cli::args::ValidateArgs;
use crate::exit_codes;

pub fn run(args: ValidateArgs) -> anyhow::Result<i32> {
    let ws = match builder::prepare(&args.data, &args.overrides) {
        Ok(ws) => ws,
        Err(e) if builder::is_config_error(&e) => {
            eprintln!("config error: {e}");
            return Ok(exit_codes::CONFIG_ERROR);
        }
        Err(e) => return Err(e),
    };

    let cfg = &ws.config;
    println!(
        "ok: {} facts, {} articles, mode={}, provider={:?}, model={}, retrieval={}",
        ws.facts.len(),
        ws.corpus.len(),
        cfg.prompt.mode,
        cfg.model.provider,
        cfg.model.name,
        if cfg.retrieval.enabled {
            format!(
                "{} top_k={} pooling={}",
                cfg.retrieval.splitter, cfg.retrieval.top_k, cfg.retrieval.pooling
            )
        } else {
            "off".to_string()
        }
    );
    Ok(exit_codes::SUCCESS)
}
