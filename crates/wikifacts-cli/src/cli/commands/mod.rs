use super::args::{Cli, Command};

pub(crate) mod builder;
pub mod run;
pub mod summarize;
pub mod validate;

pub async fn dispatch(cli: Cli) -> anyhow::Result<i32> {
    match cli.cmd {
        Command::Run(args) => run::run(args).await,
        Command::Summarize(args) => summarize::run(args),
        Command::Validate(args) => validate::run(args),
    }
}
