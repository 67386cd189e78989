//! `argoscope render`: write the diagram to a file or stdout.

use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use console::style;

use argoscope_render::{DiagramRenderer, HtmlRenderer, MermaidRenderer};
use argoscope_types::config::{ArgoscopeConfig, DisplayOptions};

use super::OutputFormat;
use super::check::print_diagnostics;

fn is_stdout(output: &Path) -> bool {
    output.as_os_str() == "-"
}

/// Handle `render`.
pub fn handle_render(
    output: &Path,
    inputs: &[PathBuf],
    format: OutputFormat,
    config: &ArgoscopeConfig,
    options: &DisplayOptions,
    json: bool,
    quiet: bool,
) -> Result<()> {
    let graph = super::load_graph(inputs, config)?;

    let renderer: Box<dyn DiagramRenderer> = match format {
        OutputFormat::Html => Box::new(HtmlRenderer::new(config.html.clone())),
        OutputFormat::Mermaid => Box::new(MermaidRenderer),
    };
    let rendered = renderer.render(&graph, options);

    if is_stdout(output) {
        let mut stdout = std::io::stdout().lock();
        stdout
            .write_all(rendered.as_bytes())
            .and_then(|_| stdout.write_all(b"\n"))
            .context("Failed to write diagram to stdout")?;
    } else {
        argoscope_infra::filesystem::write_output(output, &rendered)
            .with_context(|| format!("Failed to write {}", output.display()))?;
    }

    if !quiet {
        print_diagnostics(graph.diagnostics());
    }

    // Nothing but the diagram goes to stdout when it is the output.
    if quiet || is_stdout(output) {
        return Ok(());
    }

    if json {
        let out = serde_json::json!({
            "output": output.display().to_string(),
            "format": format!("{format:?}").to_lowercase(),
            "workflows": graph.workflows().len(),
            "nodes": graph.node_count(),
            "visible_nodes": graph.visible_nodes(options).count(),
            "tasks": graph.task_count(),
            "diagnostics": graph.diagnostics().len(),
        });
        println!("{}", serde_json::to_string_pretty(&out)?);
    } else {
        println!();
        println!(
            "  {} Rendered {} workflows to '{}'",
            style("*").green().bold(),
            graph.workflows().len(),
            style(output.display()).cyan()
        );
        println!(
            "  Templates: {} ({} drawn)",
            graph.node_count(),
            graph.visible_nodes(options).count()
        );
        println!("  Tasks: {}", graph.task_count());
        if !graph.diagnostics().is_empty() {
            println!(
                "  Problems: {} (run {} for details)",
                graph.diagnostics().len(),
                style("argoscope check").cyan()
            );
        }
        println!();
    }

    Ok(())
}
