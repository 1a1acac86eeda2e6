use anyhow::Context;
use clap::Parser;
use jobmatch_cli::{CliArgs, JobmatchCli, exit_code};
use std::process::ExitCode;

async fn try_main(args: CliArgs) -> anyhow::Result<()> {
    let app = JobmatchCli::from_args("jobmatch", &args).context("failed to load configuration")?;
    app.run(args).await?;
    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = CliArgs::parse();
    match try_main(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("Error: {err:#}");
            let code = err
                .downcast_ref::<jobmatch_core::Error>()
                .map_or(1, exit_code);
            ExitCode::from(code)
        }
    }
}
