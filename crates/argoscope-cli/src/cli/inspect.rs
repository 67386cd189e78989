//! `argoscope inspect`: per-template summary of the assembled graph.

use std::path::PathBuf;

use anyhow::Result;
use comfy_table::{Cell, Color, ContentArrangement, Table, presets};
use console::style;
use serde::Serialize;

use argoscope_core::workflow::assembler::AssembledGraph;
use argoscope_types::config::{ArgoscopeConfig, DisplayOptions};

use super::check::print_diagnostics;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NodeSummary {
    pub id: String,
    pub workflow: String,
    pub entrypoint: bool,
    pub tasks: usize,
    pub incoming: usize,
    pub visible: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub script: Option<String>,
}

/// One summary per node, ordered by id.
pub fn summarize(graph: &AssembledGraph, options: &DisplayOptions) -> Vec<NodeSummary> {
    graph
        .nodes()
        .map(|node| NodeSummary {
            id: node.id.clone(),
            workflow: node.workflow.clone(),
            entrypoint: node.is_entrypoint,
            tasks: node.tasks.len(),
            incoming: node.incoming_count,
            visible: node.is_visible(options),
            image: node.image.clone(),
            script: node.script.clone(),
        })
        .collect()
}

fn yes_no(value: bool) -> Cell {
    if value {
        Cell::new("yes").fg(Color::Green)
    } else {
        Cell::new("no").fg(Color::DarkGrey)
    }
}

/// Handle `inspect`.
pub fn handle_inspect(
    inputs: &[PathBuf],
    config: &ArgoscopeConfig,
    options: &DisplayOptions,
    json: bool,
    quiet: bool,
) -> Result<()> {
    let graph = super::load_graph(inputs, config)?;
    let summaries = summarize(&graph, options);

    if json {
        println!("{}", serde_json::to_string_pretty(&summaries)?);
        return Ok(());
    }

    if !quiet {
        print_diagnostics(graph.diagnostics());
    }

    if summaries.is_empty() {
        println!();
        println!("  No templates found.");
        println!();
        return Ok(());
    }

    println!();
    println!(
        "  {} templates in {} workflows",
        style(summaries.len()).cyan(),
        style(graph.workflows().len()).cyan()
    );
    println!();

    let mut table = Table::new();
    table.load_preset(presets::UTF8_FULL_CONDENSED);
    table.set_content_arrangement(ContentArrangement::Dynamic);

    table.set_header(vec![
        Cell::new("Template").fg(Color::White),
        Cell::new("Entry").fg(Color::White),
        Cell::new("Tasks").fg(Color::White),
        Cell::new("Incoming").fg(Color::White),
        Cell::new("Drawn").fg(Color::White),
        Cell::new("Image").fg(Color::White),
    ]);

    for summary in &summaries {
        let image = summary
            .image
            .as_deref()
            .or(summary.script.as_deref())
            .unwrap_or("-");
        table.add_row(vec![
            Cell::new(&summary.id).fg(Color::Cyan),
            yes_no(summary.entrypoint),
            Cell::new(summary.tasks),
            Cell::new(summary.incoming),
            yes_no(summary.visible),
            Cell::new(image).fg(Color::DarkGrey),
        ]);
    }

    println!("{table}");
    println!();

    Ok(())
}
