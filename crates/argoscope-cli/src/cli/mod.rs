//! CLI command definitions for the `argoscope` binary.
//!
//! Uses clap derive macros for argument parsing. Every command takes one or
//! more workflow files or directories as input.

pub mod check;
pub mod inspect;
pub mod render;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use clap_complete::Shell;

use argoscope_core::workflow::assembler::AssembledGraph;
use argoscope_core::workflow::definition::DefinitionLoader;
use argoscope_types::config::{ArgoscopeConfig, DisplayOptions};

/// Visualize Argo workflow templates as a linked DAG diagram.
#[derive(Parser)]
#[command(name = "argoscope", version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Output machine-readable JSON instead of styled text.
    #[arg(long, global = true)]
    pub json: bool,

    /// Suppress all output except errors.
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Detailed output (-v for verbose, -vv for debug/trace).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Configuration file (default: <config dir>/argoscope/config.toml).
    #[arg(long, global = true, env = "ARGOSCOPE_CONFIG")]
    pub config: Option<PathBuf>,

    /// Export tracing spans through OpenTelemetry to stdout.
    #[arg(long, global = true)]
    pub otel: bool,

    /// Do not draw artifact nodes and artifact links.
    #[arg(long, global = true)]
    pub no_artifacts: bool,

    /// Draw every template, including plain leaf templates.
    #[arg(long, global = true)]
    pub all_templates: bool,

    /// Draw templates referenced by more than one task.
    #[arg(long, global = true)]
    pub shared_templates: bool,

    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Display options from the config file with command-line overrides applied.
    pub fn display_options(&self, base: DisplayOptions) -> DisplayOptions {
        DisplayOptions {
            show_artifacts: base.show_artifacts && !self.no_artifacts,
            show_all_templates: base.show_all_templates || self.all_templates,
            show_shared_templates: base.show_shared_templates || self.shared_templates,
        }
    }
}

#[derive(Subcommand)]
pub enum Commands {
    /// Render workflow templates to an HTML page or Mermaid text.
    Render {
        /// Output file, or `-` for stdout.
        output: PathBuf,

        /// Workflow files or directories to load.
        #[arg(required = true)]
        inputs: Vec<PathBuf>,

        /// Output format.
        #[arg(long, value_enum, default_value_t = OutputFormat::Html)]
        format: OutputFormat,
    },

    /// Load and link workflow templates, then report problems.
    Check {
        /// Workflow files or directories to load.
        #[arg(required = true)]
        inputs: Vec<PathBuf>,
    },

    /// List every template with its tasks, fan-in and visibility.
    Inspect {
        /// Workflow files or directories to load.
        #[arg(required = true)]
        inputs: Vec<PathBuf>,
    },

    /// Generate shell completions.
    Completions {
        /// Shell to generate completions for.
        shell: Shell,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Standalone HTML page that renders the diagram in a browser.
    Html,
    /// Raw Mermaid flowchart definition.
    Mermaid,
}

/// Tracing filter for the requested verbosity. `RUST_LOG` still wins.
pub fn verbosity_filter(quiet: bool, verbose: u8) -> &'static str {
    match verbose {
        0 if quiet => "error",
        0 => "warn",
        1 => "info,argoscope=debug",
        _ => "trace",
    }
}

/// Load and assemble all inputs.
pub fn load_graph(inputs: &[PathBuf], config: &ArgoscopeConfig) -> Result<AssembledGraph> {
    let loader = DefinitionLoader::new(config.loader.clone());
    argoscope_infra::filesystem::load_graph(inputs, &loader).context("Failed to load workflow inputs")
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_verbosity_filter() {
        assert_eq!(verbosity_filter(true, 0), "error");
        assert_eq!(verbosity_filter(false, 0), "warn");
        assert_eq!(verbosity_filter(false, 1), "info,argoscope=debug");
        assert_eq!(verbosity_filter(true, 2), "trace");
    }

    #[test]
    fn test_render_arguments() {
        let cli = Cli::parse_from(["argoscope", "render", "out.html", "a.yaml", "flows/", "--format", "mermaid"]);
        match cli.command {
            Commands::Render { output, inputs, format } => {
                assert_eq!(output, PathBuf::from("out.html"));
                assert_eq!(inputs, vec![PathBuf::from("a.yaml"), PathBuf::from("flows/")]);
                assert_eq!(format, OutputFormat::Mermaid);
            }
            _ => panic!("expected render"),
        }
    }

    #[test]
    fn test_render_requires_an_input() {
        assert!(Cli::try_parse_from(["argoscope", "render", "out.html"]).is_err());
    }

    #[test]
    fn test_display_overrides() {
        let cli = Cli::parse_from(["argoscope", "check", "a.yaml", "--no-artifacts", "--shared-templates"]);
        let options = cli.display_options(DisplayOptions::default());
        assert!(!options.show_artifacts);
        assert!(options.show_shared_templates);
        assert!(!options.show_all_templates);

        let plain = Cli::parse_from(["argoscope", "check", "a.yaml"]);
        let from_file = DisplayOptions {
            show_all_templates: true,
            ..DisplayOptions::default()
        };
        assert_eq!(plain.display_options(from_file), from_file);
    }
}
