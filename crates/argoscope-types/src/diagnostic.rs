//! Structured diagnostics reported while loading and assembling.
//!
//! Nothing in the loader is fatal: malformed documents, expressions and
//! references are recovered at the smallest enclosing unit and surfaced here.

use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Error,
    Warning,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Error => write!(f, "error"),
            Self::Warning => write!(f, "warning"),
        }
    }
}

/// What went wrong.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiagnosticKind {
    /// A document could not be parsed; it was skipped.
    DocumentParse,
    /// A document was empty or null; it was skipped.
    EmptyDocument,
    /// A DAG task entry did not match the task schema; the task was skipped.
    TaskParse,
    /// A `depends` expression was malformed; its dependencies were skipped.
    DependencyExpression,
    /// An artifact argument had no usable reference; it was left unresolved.
    UnknownArtifactReference,
    /// A task references a template that was never loaded.
    DanglingReference,
    /// A workflow name was loaded twice; the later document wins.
    DuplicateWorkflow,
}

impl DiagnosticKind {
    pub fn severity(self) -> Severity {
        match self {
            Self::DocumentParse
            | Self::TaskParse
            | Self::DependencyExpression
            | Self::UnknownArtifactReference => Severity::Error,
            Self::EmptyDocument | Self::DanglingReference | Self::DuplicateWorkflow => {
                Severity::Warning
            }
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::DocumentParse => "document-parse",
            Self::EmptyDocument => "empty-document",
            Self::TaskParse => "task-parse",
            Self::DependencyExpression => "dependency-expression",
            Self::UnknownArtifactReference => "unknown-artifact-reference",
            Self::DanglingReference => "dangling-reference",
            Self::DuplicateWorkflow => "duplicate-workflow",
        }
    }
}

impl fmt::Display for DiagnosticKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    pub severity: Severity,
    pub message: String,
    /// Input the diagnostic came from (file path, `<stdin>`, ...).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_name: Option<String>,
    /// 1-based position of the document within its source.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub document: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workflow: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task_id: Option<String>,
}

impl Diagnostic {
    pub fn new(kind: DiagnosticKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            severity: kind.severity(),
            message: message.into(),
            source_name: None,
            document: None,
            workflow: None,
            node_id: None,
            task_id: None,
        }
    }

    pub fn with_source(mut self, source_name: impl Into<String>) -> Self {
        self.source_name = Some(source_name.into());
        self
    }

    pub fn with_document(mut self, document: usize) -> Self {
        self.document = Some(document);
        self
    }

    pub fn with_workflow(mut self, workflow: impl Into<String>) -> Self {
        self.workflow = Some(workflow.into());
        self
    }

    pub fn with_node(mut self, node_id: impl Into<String>) -> Self {
        self.node_id = Some(node_id.into());
        self
    }

    pub fn with_task(mut self, task_id: impl Into<String>) -> Self {
        self.task_id = Some(task_id.into());
        self
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }

    /// The narrowest model element the diagnostic is about: task, then
    /// node, then workflow.
    pub fn scope(&self) -> Option<&str> {
        self.task_id
            .as_deref()
            .or(self.node_id.as_deref())
            .or(self.workflow.as_deref())
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}[{}]", self.severity, self.kind)?;
        if let Some(source) = &self.source_name {
            write!(f, " {source}")?;
            if let Some(document) = self.document {
                write!(f, "#{document}")?;
            }
        }
        if let Some(scope) = self.scope() {
            write!(f, " ({scope})")?;
        }
        write!(f, ": {}", self.message)
    }
}

/// Diagnostics in the order they were reported.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Diagnostics(Vec<Diagnostic>);

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, diagnostic: Diagnostic) {
        self.0.push(diagnostic);
    }

    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.0.iter()
    }

    pub fn of_kind(&self, kind: DiagnosticKind) -> impl Iterator<Item = &Diagnostic> {
        self.0.iter().filter(move |d| d.kind == kind)
    }

    pub fn has_errors(&self) -> bool {
        self.0.iter().any(Diagnostic::is_error)
    }

    pub fn error_count(&self) -> usize {
        self.0.iter().filter(|d| d.is_error()).count()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl IntoIterator for Diagnostics {
    type Item = Diagnostic;
    type IntoIter = std::vec::IntoIter<Diagnostic>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}
