//! `argoscope check`: report loader and linking problems.

use std::path::PathBuf;

use anyhow::Result;
use comfy_table::{Cell, Color, ContentArrangement, Table, presets};
use console::style;

use argoscope_types::config::ArgoscopeConfig;
use argoscope_types::diagnostic::{Diagnostic, Diagnostics, Severity};

fn severity_color(severity: Severity) -> Color {
    match severity {
        Severity::Error => Color::Red,
        Severity::Warning => Color::Yellow,
    }
}

fn location(diagnostic: &Diagnostic) -> String {
    diagnostic.scope().unwrap_or("-").to_string()
}

fn source(diagnostic: &Diagnostic) -> String {
    match (&diagnostic.source_name, diagnostic.document) {
        (Some(name), Some(document)) => format!("{name}#{document}"),
        (Some(name), None) => name.clone(),
        (None, _) => "-".to_string(),
    }
}

/// Print diagnostics to stderr, one line each.
pub fn print_diagnostics(diagnostics: &Diagnostics) {
    for diagnostic in diagnostics.iter() {
        let tag = match diagnostic.severity {
            Severity::Error => style(diagnostic.severity.to_string()).red().bold(),
            Severity::Warning => style(diagnostic.severity.to_string()).yellow().bold(),
        };
        let rest = diagnostic.to_string();
        let rest = rest.strip_prefix(&diagnostic.severity.to_string()).unwrap_or(&rest);
        eprintln!("{tag}{rest}");
    }
}

/// Build the diagnostics table.
pub fn diagnostics_table(diagnostics: &Diagnostics) -> Table {
    let mut table = Table::new();
    table.load_preset(presets::UTF8_FULL_CONDENSED);
    table.set_content_arrangement(ContentArrangement::Dynamic);

    table.set_header(vec![
        Cell::new("Severity").fg(Color::White),
        Cell::new("Kind").fg(Color::White),
        Cell::new("Source").fg(Color::White),
        Cell::new("Location").fg(Color::White),
        Cell::new("Message").fg(Color::White),
    ]);

    for diagnostic in diagnostics.iter() {
        table.add_row(vec![
            Cell::new(diagnostic.severity).fg(severity_color(diagnostic.severity)),
            Cell::new(diagnostic.kind),
            Cell::new(source(diagnostic)).fg(Color::DarkGrey),
            Cell::new(location(diagnostic)).fg(Color::Cyan),
            Cell::new(&diagnostic.message),
        ]);
    }
    table
}

/// Handle `check`. Returns whether any error-severity diagnostic was found.
pub fn handle_check(inputs: &[PathBuf], config: &ArgoscopeConfig, json: bool, quiet: bool) -> Result<bool> {
    let graph = super::load_graph(inputs, config)?;
    let diagnostics = graph.diagnostics();
    let errors = diagnostics.error_count();

    if quiet {
        return Ok(errors > 0);
    }

    if json {
        let out = serde_json::json!({
            "workflows": graph.workflows().len(),
            "nodes": graph.node_count(),
            "tasks": graph.task_count(),
            "errors": errors,
            "warnings": diagnostics.len() - errors,
            "diagnostics": diagnostics,
        });
        println!("{}", serde_json::to_string_pretty(&out)?);
        return Ok(errors > 0);
    }

    println!();
    if diagnostics.is_empty() {
        println!(
            "  {} {} workflows, {} templates, {} tasks: no problems found",
            style("✓").green().bold(),
            graph.workflows().len(),
            graph.node_count(),
            graph.task_count()
        );
    } else {
        println!(
            "  {} workflows, {} templates, {} tasks: {} errors, {} warnings",
            graph.workflows().len(),
            graph.node_count(),
            graph.task_count(),
            style(errors).red().bold(),
            style(diagnostics.len() - errors).yellow()
        );
        println!();
        println!("{}", diagnostics_table(diagnostics));
    }
    println!();

    Ok(errors > 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use argoscope_types::diagnostic::DiagnosticKind;
    use tempfile::TempDir;

    #[test]
    fn test_location_prefers_task() {
        let diag = Diagnostic::new(DiagnosticKind::DanglingReference, "missing")
            .with_workflow("wf")
            .with_task("wf__main__a");
        assert_eq!(location(&diag), "wf__main__a");

        let node = Diagnostic::new(DiagnosticKind::TaskParse, "bad task")
            .with_workflow("wf")
            .with_node("wf__main");
        assert_eq!(location(&node), "wf__main");

        let workflow_only = Diagnostic::new(DiagnosticKind::DuplicateWorkflow, "dup").with_workflow("wf");
        assert_eq!(location(&workflow_only), "wf");

        let bare = Diagnostic::new(DiagnosticKind::EmptyDocument, "empty");
        assert_eq!(location(&bare), "-");
    }

    #[test]
    fn test_table_has_row_per_diagnostic() {
        let mut diags = Diagnostics::new();
        diags.push(
            Diagnostic::new(DiagnosticKind::DocumentParse, "bad")
                .with_source("a.yaml")
                .with_document(2),
        );
        diags.push(Diagnostic::new(DiagnosticKind::EmptyDocument, "empty"));
        let table = diagnostics_table(&diags);
        assert_eq!(table.row_iter().count(), 2);
        let rendered = table.to_string();
        assert!(rendered.contains("document-parse"));
        assert!(rendered.contains("a.yaml#2"));
    }

    #[test]
    fn test_check_reports_errors() {
        let tmp = TempDir::new().unwrap();
        std::fs::write(
            tmp.path().join("wf.yaml"),
            r#"
metadata: { name: wf }
spec:
  templates:
    - name: main
      dag:
        tasks:
          - name: a
            depends: "b &&"
"#,
        )
        .unwrap();

        let has_errors = handle_check(&[tmp.path().to_path_buf()], &ArgoscopeConfig::default(), true, true).unwrap();
        assert!(has_errors);
    }

    #[test]
    fn test_check_warnings_only_passes() {
        let tmp = TempDir::new().unwrap();
        std::fs::write(
            tmp.path().join("wf.yaml"),
            r#"
metadata: { name: wf }
spec:
  templates:
    - name: main
      dag:
        tasks:
          - name: a
            templateRef: { name: elsewhere, template: t }
"#,
        )
        .unwrap();

        let has_errors = handle_check(&[tmp.path().to_path_buf()], &ArgoscopeConfig::default(), true, true).unwrap();
        assert!(!has_errors);
    }
}
