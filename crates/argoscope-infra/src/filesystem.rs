//! Workflow source discovery and loading.
//!
//! Inputs are files or directories. Directories are scanned recursively for
//! `.yaml` / `.yml` files; explicitly named files are taken as they are.
//! The resulting list is sorted and deduplicated so the same inputs always
//! load in the same order.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use argoscope_core::workflow::assembler::{AssembledGraph, GraphBuilder};
use argoscope_core::workflow::definition::DefinitionLoader;
use argoscope_types::diagnostic::{Diagnostic, DiagnosticKind};
use thiserror::Error;

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum InfraError {
    #[error("I/O error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("input not found: {}", .0.display())]
    Discovery(PathBuf),
}

impl InfraError {
    fn io(path: &Path, source: std::io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

// ---------------------------------------------------------------------------
// Discovery
// ---------------------------------------------------------------------------

fn is_workflow_file(path: &Path) -> bool {
    path.extension()
        .is_some_and(|ext| ext == "yaml" || ext == "yml")
}

/// Expand input paths into the sorted list of workflow files to load.
pub fn discover_inputs(inputs: &[PathBuf]) -> Result<Vec<PathBuf>, InfraError> {
    let mut files = BTreeSet::new();
    for input in inputs {
        if input.is_dir() {
            discover_recursive(input, &mut files)?;
        } else if input.is_file() {
            files.insert(input.clone());
        } else {
            return Err(InfraError::Discovery(input.clone()));
        }
    }
    tracing::debug!(inputs = inputs.len(), files = files.len(), "discovered workflow files");
    Ok(files.into_iter().collect())
}

fn discover_recursive(dir: &Path, files: &mut BTreeSet<PathBuf>) -> Result<(), InfraError> {
    let entries = std::fs::read_dir(dir).map_err(|e| InfraError::io(dir, e))?;
    for entry in entries {
        let entry = entry.map_err(|e| InfraError::io(dir, e))?;
        let path = entry.path();
        if path.is_dir() {
            discover_recursive(&path, files)?;
        } else if is_workflow_file(&path) {
            files.insert(path);
        }
    }
    Ok(())
}

/// Read one workflow source.
pub fn read_source(path: &Path) -> Result<String, InfraError> {
    std::fs::read_to_string(path).map_err(|e| InfraError::io(path, e))
}

// ---------------------------------------------------------------------------
// Loading
// ---------------------------------------------------------------------------

/// Discover, read and load every input, then assemble the graph.
///
/// Only a missing input fails the call. A file that cannot be read is
/// reported as a `DocumentParse` diagnostic and skipped.
pub fn load_graph(inputs: &[PathBuf], loader: &DefinitionLoader) -> Result<AssembledGraph, InfraError> {
    let files = discover_inputs(inputs)?;
    let mut builder = GraphBuilder::new();

    for path in &files {
        let source_name = path.display().to_string();
        match read_source(path) {
            Ok(yaml) => {
                builder.add_source(loader, &source_name, &yaml);
            }
            Err(err) => {
                tracing::warn!(?path, error = %err, "skipping unreadable workflow file");
                builder.report(
                    Diagnostic::new(DiagnosticKind::DocumentParse, err.to_string()).with_source(source_name),
                );
            }
        }
    }

    Ok(builder.assemble())
}

/// Write rendered output to a file.
pub fn write_output(path: &Path, contents: &str) -> Result<(), InfraError> {
    std::fs::write(path, contents).map_err(|e| InfraError::io(path, e))?;
    tracing::info!(?path, bytes = contents.len(), "wrote output");
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
