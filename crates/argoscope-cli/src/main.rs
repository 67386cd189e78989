//! Argoscope command-line entry point.
//!
//! Binary name: `argoscope`
//!
//! Parses CLI arguments, sets up tracing, loads configuration, then
//! dispatches to the command handler.

mod cli;

use std::process::ExitCode;

use clap::Parser;
use clap_complete::generate;

use argoscope_infra::config::load_config;
use argoscope_observe::tracing_setup::{init_tracing, shutdown_tracing};

use cli::{Cli, Commands};

fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();

    // Shell completions need nothing else
    if let Commands::Completions { shell } = &cli.command {
        let mut cmd = <Cli as clap::CommandFactory>::command();
        generate(*shell, &mut cmd, "argoscope", &mut std::io::stdout());
        return Ok(ExitCode::SUCCESS);
    }

    init_tracing(cli::verbosity_filter(cli.quiet, cli.verbose), cli.otel)
        .map_err(|e| anyhow::anyhow!("Failed to initialize tracing: {e}"))?;

    let result = run(&cli);
    shutdown_tracing();
    result
}

fn run(cli: &Cli) -> anyhow::Result<ExitCode> {
    let config = load_config(cli.config.as_deref());
    let options = cli.display_options(config.display);
    tracing::debug!(?options, "display options");

    match &cli.command {
        Commands::Render { output, inputs, format } => {
            cli::render::handle_render(output, inputs, *format, &config, &options, cli.json, cli.quiet)?;
        }

        Commands::Check { inputs } => {
            if cli::check::handle_check(inputs, &config, cli.json, cli.quiet)? {
                return Ok(ExitCode::FAILURE);
            }
        }

        Commands::Inspect { inputs } => {
            cli::inspect::handle_inspect(inputs, &config, &options, cli.json, cli.quiet)?;
        }

        Commands::Completions { .. } => {}
    }

    Ok(ExitCode::SUCCESS)
}
