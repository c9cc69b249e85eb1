// ABOUTME: Entry point for the shipout CLI application.
// ABOUTME: Parses arguments, initializes tracing, and maps outcomes to exit codes.

use clap::Parser;
use shipout::cli::Cli;
use shipout::config::RunConfig;
use shipout::error::Result;
use shipout::output::{Output, OutputMode};
use shipout::run;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Initialize tracing subscriber based on verbose flag
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("warn")
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    let mode = if cli.json {
        OutputMode::Json
    } else if cli.quiet {
        OutputMode::Quiet
    } else {
        OutputMode::Normal
    };
    let mut output = Output::new(mode);
    output.start_timer();

    match dispatch(cli, &output).await {
        Ok(code) => std::process::exit(code),
        Err(e) => {
            output.error(&e.to_string());
            std::process::exit(e.exit_code());
        }
    }
}

async fn dispatch(cli: Cli, output: &Output) -> Result<i32> {
    if cli.list_remotes {
        run::list_remotes(output).await?;
        return Ok(0);
    }
    if cli.list_branches {
        run::list_branches(output).await?;
        return Ok(0);
    }

    let config = RunConfig::from_cli(&cli);
    let outcome = run::orchestrate(&config, output).await?;

    if outcome.is_ready() {
        output.success("Deployment completed successfully");
        Ok(0)
    } else {
        output.error(&format!("Deployment ended with state: {outcome}"));
        Ok(1)
    }
}
