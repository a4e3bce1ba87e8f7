use anyhow::Result;
use clap::Parser;
use colored::Colorize;

use stagerun_cli::cli::Cli;
use stagerun_cli::error::CliError;
use stagerun_cli::output::OutputWriter;
use stagerun_cli::{logging, runner};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let code = match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("{} {:#}", "error:".red().bold(), e);
            e.downcast_ref::<CliError>().map_or(1, CliError::exit_code)
        }
    };
    std::process::exit(code);
}

async fn run(cli: Cli) -> Result<i32> {
    let config = runner::load_config(&cli).await?;
    logging::init_tracing(&config.general)?;

    tracing::info!(
        files = cli.test_files.len(),
        validate_only = cli.validate_only,
        "stagerun starting"
    );

    let sink = runner::open_report_sink(&config.report)?;
    let runner = runner::Runner::new(config, sink)?.validate_only(cli.validate_only);
    let summary = runner.run_all(&cli.test_files).await;

    OutputWriter::new(cli.output).render(&summary)?;
    Ok(summary.exit_code())
}
