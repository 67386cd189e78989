//! Workflow document parsing and model building.
//!
//! Parses YAML sources (one or more `---`-separated documents each) into
//! `WorkflowDocument`s and turns each document into a `Workflow` with its
//! `Node`s and `Task`s. Cross-workflow linking happens later in
//! [`super::assembler`].
//!
//! Nothing here fails a whole source. A bad document is skipped, a bad task
//! field is dropped, and each problem is reported as a [`Diagnostic`].

use serde::Deserialize;
use serde_yaml_ng::Value;
use thiserror::Error;

use argoscope_types::config::LoaderConfig;
use argoscope_types::diagnostic::{Diagnostic, DiagnosticKind, Diagnostics};
use argoscope_types::document::{DependsSpec, ParameterSpec, TaskSpec, TemplateSpec, WorkflowDocument};
use argoscope_types::workflow::{
    ArtifactRef, ArtifactSource, Node, Parameters, Task, Workflow, artifact_id, node_id, task_id,
};

use super::artifact::resolve_argument;
use super::depends::parse_depends;
use super::push_unique;

/// Marker that makes a parameter value a runtime template instead of a literal.
const INTERPOLATION_MARKER: &str = "{{";

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

/// Errors that cause a single document to be skipped.
///
/// `document` is the 1-based position of the document within its source.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LoadError {
    #[error("document {document} of '{source_name}' could not be parsed: {message}")]
    DocumentParse {
        source_name: String,
        document: usize,
        message: String,
    },

    #[error("document {document} of '{source_name}' is empty")]
    EmptyDocument { source_name: String, document: usize },
}

impl LoadError {
    pub fn kind(&self) -> DiagnosticKind {
        match self {
            Self::DocumentParse { .. } => DiagnosticKind::DocumentParse,
            Self::EmptyDocument { .. } => DiagnosticKind::EmptyDocument,
        }
    }

    pub fn to_diagnostic(&self) -> Diagnostic {
        let (source_name, document) = match self {
            Self::DocumentParse {
                source_name, document, ..
            }
            | Self::EmptyDocument { source_name, document } => (source_name, *document),
        };
        Diagnostic::new(self.kind(), self.to_string())
            .with_source(source_name.clone())
            .with_document(document)
    }
}

// ---------------------------------------------------------------------------
// Parsing
// ---------------------------------------------------------------------------

/// Parse every document in a YAML source.
///
/// Schema errors affect only their own document. A YAML syntax error ends
/// the stream, since nothing after it can be located reliably. A source with
/// no documents at all yields a single `EmptyDocument`.
pub fn parse_documents(source_name: &str, yaml: &str) -> Vec<Result<WorkflowDocument, LoadError>> {
    let parse_error = |document: usize, message: String| LoadError::DocumentParse {
        source_name: source_name.to_string(),
        document,
        message,
    };

    let mut results = Vec::new();
    for (index, deserializer) in serde_yaml_ng::Deserializer::from_str(yaml).enumerate() {
        let document = index + 1;
        let value = match Value::deserialize(deserializer) {
            Ok(value) => value,
            Err(e) => {
                results.push(Err(parse_error(document, e.to_string())));
                break;
            }
        };

        if value.is_null() {
            results.push(Err(LoadError::EmptyDocument {
                source_name: source_name.to_string(),
                document,
            }));
            continue;
        }

        results.push(
            serde_yaml_ng::from_value::<WorkflowDocument>(value)
                .map_err(|e| parse_error(document, e.to_string())),
        );
    }

    if results.is_empty() {
        results.push(Err(LoadError::EmptyDocument {
            source_name: source_name.to_string(),
            document: 1,
        }));
    }
    results
}

// ---------------------------------------------------------------------------
// Loader
// ---------------------------------------------------------------------------

/// Builds `Workflow` models from parsed documents.
#[derive(Debug, Clone, Default)]
pub struct DefinitionLoader {
    config: LoaderConfig,
}

impl DefinitionLoader {
    pub fn new(config: LoaderConfig) -> Self {
        Self { config }
    }

    /// Parse and load every document in a YAML source.
    ///
    /// Skipped documents and task-level problems are appended to
    /// `diagnostics`, tagged with `source_name` and the document position.
    pub fn load_str(&self, source_name: &str, yaml: &str, diagnostics: &mut Diagnostics) -> Vec<Workflow> {
        let mut workflows = Vec::new();

        for (index, result) in parse_documents(source_name, yaml).into_iter().enumerate() {
            match result {
                Ok(document) => {
                    let (workflow, problems) = self.load_document(&document);
                    for problem in problems {
                        diagnostics.push(problem.with_source(source_name).with_document(index + 1));
                    }
                    workflows.push(workflow);
                }
                Err(e) => {
                    tracing::warn!(source = source_name, error = %e, "skipping workflow document");
                    diagnostics.push(e.to_diagnostic());
                }
            }
        }

        tracing::debug!(source = source_name, workflows = workflows.len(), "loaded source");
        workflows
    }

    /// Build the model of one document.
    ///
    /// `incoming_count` is left at zero on every node.
    pub fn load_document(&self, document: &WorkflowDocument) -> (Workflow, Diagnostics) {
        let name = &document.metadata.name;
        let entrypoint = document.spec.entrypoint.as_deref();
        let mut diagnostics = Diagnostics::new();

        let nodes = document
            .spec
            .templates
            .iter()
            .map(|template| self.build_node(name, entrypoint, template, &mut diagnostics))
            .collect();

        let workflow = Workflow {
            id: name.clone(),
            name: name.clone(),
            entrypoint: document.spec.entrypoint.clone(),
            nodes,
        };

        tracing::info!(
            workflow = %workflow.name,
            templates = workflow.nodes.len(),
            problems = diagnostics.len(),
            "loaded workflow"
        );
        (workflow, diagnostics)
    }

    /// Short label for a container image.
    ///
    /// `registry.example.com/team/ai-workflow-trainer:1.4` becomes `trainer`:
    /// the last path segment, without tag or digest, without the first
    /// configured prefix it starts with. Blank images have no label.
    pub fn image_label(&self, image: &str) -> Option<String> {
        let last = image.trim().rsplit('/').next().unwrap_or_default();
        let base = last.split([':', '@']).next().unwrap_or_default();
        let label = self
            .config
            .image_prefixes
            .iter()
            .find_map(|prefix| base.strip_prefix(prefix.as_str()))
            .unwrap_or(base);

        (!label.is_empty()).then(|| label.to_string())
    }

    fn build_node(
        &self,
        workflow_name: &str,
        entrypoint: Option<&str>,
        template: &TemplateSpec,
        diagnostics: &mut Diagnostics,
    ) -> Node {
        let id = node_id(workflow_name, &template.name);

        let (image, script) = match &template.container {
            Some(container) => (
                container.image.as_deref().and_then(|i| self.image_label(i)),
                None,
            ),
            None => (
                None,
                template
                    .script
                    .as_ref()
                    .and_then(|s| s.image.clone())
                    .filter(|i| !i.trim().is_empty()),
            ),
        };

        let mut tasks = Vec::new();
        for (position, entry) in template.dag_tasks().iter().enumerate() {
            match TaskSpec::from_entry(entry) {
                Ok(spec) => tasks.push(build_task(workflow_name, &id, &spec, diagnostics)),
                Err(e) => {
                    let name = TaskSpec::entry_name(entry);
                    tracing::warn!(node = %id, task = ?name, error = %e, "skipping malformed task");
                    let label = name.map_or_else(|| format!("#{}", position + 1), |n| format!("'{n}'"));
                    let mut diagnostic = Diagnostic::new(
                        DiagnosticKind::TaskParse,
                        format!("task {label} of template '{}' could not be parsed: {e}", template.name),
                    )
                    .with_workflow(workflow_name)
                    .with_node(id.clone());
                    if let Some(name) = name {
                        diagnostic = diagnostic.with_task(task_id(&id, name));
                    }
                    diagnostics.push(diagnostic);
                }
            }
        }
        tasks.sort_by(|a, b| a.name.cmp(&b.name));

        tracing::debug!(node = %id, tasks = tasks.len(), "built node");

        Node {
            name: template.name.clone(),
            workflow: workflow_name.to_string(),
            image,
            script,
            tasks,
            incoming_count: 0,
            input_params: literal_parameters(&template.inputs.parameters),
            output_params: literal_parameters(&template.outputs.parameters),
            input_artifacts: template.inputs.artifacts.iter().map(|a| a.name.clone()).collect(),
            output_artifacts: template.outputs.artifacts.iter().map(|a| a.name.clone()).collect(),
            is_entrypoint: entrypoint == Some(template.name.as_str()),
            id,
        }
    }
}

/// Parameters whose value is a literal known at load time.
fn literal_parameters(specs: &[ParameterSpec]) -> Parameters {
    let mut params = Parameters::new();
    for spec in specs {
        if let Some(value) = spec.scalar_value()
            && !value.contains(INTERPOLATION_MARKER)
        {
            params.insert(spec.name.clone(), value);
        }
    }
    params
}

fn build_task(workflow_name: &str, owner_id: &str, spec: &TaskSpec, diagnostics: &mut Diagnostics) -> Task {
    let id = task_id(owner_id, &spec.name);
    let report = |kind: DiagnosticKind, message: String| {
        Diagnostic::new(kind, message)
            .with_workflow(workflow_name)
            .with_node(owner_id)
            .with_task(id.clone())
    };

    let mut dependencies = Vec::new();
    for name in &spec.dependencies {
        push_unique(&mut dependencies, task_id(owner_id, name));
    }
    match &spec.depends {
        Some(DependsSpec::Expression(expression)) => match parse_depends(expression) {
            Ok(names) => {
                for name in names {
                    push_unique(&mut dependencies, task_id(owner_id, &name));
                }
            }
            Err(e) => {
                tracing::warn!(task = %id, expression = %expression, error = %e, "ignoring malformed depends");
                diagnostics.push(report(
                    DiagnosticKind::DependencyExpression,
                    format!("depends '{expression}': {e}"),
                ));
            }
        },
        Some(DependsSpec::Names(names)) => {
            for name in names {
                push_unique(&mut dependencies, task_id(owner_id, name));
            }
        }
        None => {}
    }

    let ref_node = match (&spec.template_ref, &spec.template) {
        (Some(template_ref), _) => Some(node_id(&template_ref.name, &template_ref.template)),
        (None, Some(template)) => Some(node_id(workflow_name, template)),
        (None, None) => None,
    };

    let mut input_artifacts = Vec::new();
    let mut unresolved_artifacts = Vec::new();
    for argument in &spec.arguments.artifacts {
        match resolve_argument(argument) {
            Ok(refs) => input_artifacts.extend(refs.into_iter().map(|r| qualify(owner_id, r))),
            Err(e) => {
                tracing::warn!(task = %id, artifact = %argument.name, error = %e, "unresolved artifact");
                diagnostics.push(report(DiagnosticKind::UnknownArtifactReference, e.to_string()));
                unresolved_artifacts.push(argument.name.clone());
            }
        }
    }

    Task {
        name: spec.name.clone(),
        dependencies,
        when: spec.when.clone(),
        ref_node,
        input_params: literal_parameters(&spec.arguments.parameters),
        input_artifacts,
        unresolved_artifacts,
        id,
    }
}

/// Scope node inputs and literals to the owning node. Task outputs are
/// already composite and stay as they are.
fn qualify(owner_id: &str, artifact: ArtifactRef) -> ArtifactRef {
    match artifact.source {
        ArtifactSource::TaskOutput => artifact,
        ArtifactSource::NodeInput | ArtifactSource::Literal => ArtifactRef {
            id: artifact_id(owner_id, &artifact.id),
            source: artifact.source,
        },
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    const PIPELINE: &str = r#"
metadata:
  name: pipeline
spec:
  entrypoint: main
  templates:
    - name: main
      inputs:
        parameters:
          - name: version
            value: v1
          - name: run-id
            value: "{{workflow.parameters.run}}"
          - name: unset
        artifacts:
          - name: dataset
      dag:
        tasks:
          - name: train
            template: trainer
            dependencies: [prepare]
            depends: "prepare.Succeeded && (lint.Failed || prepare)"
            when: "{{inputs.parameters.version}} != ''"
            arguments:
              parameters:
                - name: epochs
                  value: 10
                - name: seed
                  value: "{{workflow.parameters.seed}}"
              artifacts:
                - name: data
                  from: "{{inputs.artifacts.dataset}}"
                - name: checkpoint
                  from: "{{tasks.prepare.outputs.artifacts.ckpt}}"
          - name: prepare
            templateRef:
              name: shared
              template: preprocess
          - name: lint
            template: linter
    - name: trainer
      container:
        image: registry.example.com/ml/ai-workflow-trainer:2.1
      outputs:
        artifacts:
          - name: model
    - name: linter
      script:
        image: python:3.12
"#;

    fn load(yaml: &str) -> (Vec<Workflow>, Diagnostics) {
        let mut diagnostics = Diagnostics::new();
        let workflows = DefinitionLoader::default().load_str("test.yaml", yaml, &mut diagnostics);
        (workflows, diagnostics)
    }

    fn single(yaml: &str) -> Workflow {
        let (mut workflows, diagnostics) = load(yaml);
        assert!(diagnostics.is_empty(), "unexpected diagnostics: {diagnostics:?}");
        assert_eq!(workflows.len(), 1);
        workflows.remove(0)
    }

    // -----------------------------------------------------------------------
    // Nodes
    // -----------------------------------------------------------------------

    #[test]
    fn test_node_ids_and_entrypoint() {
        let wf = single(PIPELINE);
        assert_eq!(wf.name, "pipeline");
        let ids: Vec<&str> = wf.nodes.iter().map(|n| n.id.as_str()).collect();
        assert_eq!(ids, vec!["pipeline__main", "pipeline__trainer", "pipeline__linter"]);
        assert!(wf.node("main").unwrap().is_entrypoint);
        assert!(!wf.node("trainer").unwrap().is_entrypoint);
        assert!(wf.nodes.iter().all(|n| n.incoming_count == 0));
    }

    #[test]
    fn test_image_label_and_script_marker() {
        let wf = single(PIPELINE);
        let trainer = wf.node("trainer").unwrap();
        assert_eq!(trainer.image.as_deref(), Some("trainer"));
        assert!(trainer.script.is_none());

        let linter = wf.node("linter").unwrap();
        assert!(linter.image.is_none());
        assert_eq!(linter.script.as_deref(), Some("python:3.12"));
    }

    #[test]
    fn test_image_label_variants() {
        let loader = DefinitionLoader::default();
        assert_eq!(loader.image_label("ai-workflow-fetch").as_deref(), Some("fetch"));
        assert_eq!(loader.image_label("docker.io/library/alpine:3.19").as_deref(), Some("alpine"));
        assert_eq!(loader.image_label("ghcr.io/acme/tool@sha256:abc").as_deref(), Some("tool"));
        assert_eq!(loader.image_label(""), None);

        let custom = DefinitionLoader::new(LoaderConfig {
            image_prefixes: vec!["acme-".to_string()],
        });
        assert_eq!(custom.image_label("acme-builder:1").as_deref(), Some("builder"));
        assert_eq!(custom.image_label("ai-workflow-x").as_deref(), Some("ai-workflow-x"));
    }

    #[test]
    fn test_only_literal_parameters_kept() {
        let wf = single(PIPELINE);
        let main = wf.node("main").unwrap();
        assert_eq!(main.input_params.get("version"), Some("v1"));
        assert_eq!(main.input_params.get("run-id"), None);
        assert_eq!(main.input_params.get("unset"), None);
        assert_eq!(main.input_params.len(), 1);

        let train = main.task("train").unwrap();
        assert_eq!(train.input_params.get("epochs"), Some("10"));
        assert_eq!(train.input_params.get("seed"), None);
    }

    #[test]
    fn test_declared_artifacts_kept_verbatim() {
        let wf = single(PIPELINE);
        assert_eq!(wf.node("main").unwrap().input_artifacts, vec!["dataset"]);
        assert_eq!(wf.node("trainer").unwrap().output_artifacts, vec!["model"]);
    }

    // -----------------------------------------------------------------------
    // Tasks
    // -----------------------------------------------------------------------

    #[test]
    fn test_tasks_sorted_by_name() {
        let wf = single(PIPELINE);
        let names: Vec<&str> = wf.node("main").unwrap().tasks.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["lint", "prepare", "train"]);
    }

    #[test]
    fn test_dependencies_union_qualified_and_deduplicated() {
        let wf = single(PIPELINE);
        let train = wf.node("main").unwrap().task("train").unwrap();
        assert_eq!(train.id, "pipeline__main__train");
        assert_eq!(
            train.dependencies,
            vec!["pipeline__main__prepare", "pipeline__main__lint"]
        );
        assert_eq!(train.when.as_deref(), Some("{{inputs.parameters.version}} != ''"));
    }

    #[test]
    fn test_ref_node_resolution() {
        let wf = single(PIPELINE);
        let main = wf.node("main").unwrap();
        assert_eq!(main.task("train").unwrap().ref_node.as_deref(), Some("pipeline__trainer"));
        assert_eq!(main.task("prepare").unwrap().ref_node.as_deref(), Some("shared__preprocess"));
    }

    #[test]
    fn test_input_artifacts_qualified_except_task_outputs() {
        let wf = single(PIPELINE);
        let train = wf.node("main").unwrap().task("train").unwrap();
        let ids: Vec<&str> = train.input_artifacts.iter().map(|a| a.id.as_str()).collect();
        assert_eq!(ids, vec!["pipeline__main__dataset", "prepare__ckpt"]);
        assert_eq!(train.input_artifacts[1].source, ArtifactSource::TaskOutput);
    }

    #[test]
    fn test_task_without_template_has_no_ref() {
        let yaml = r#"
metadata: { name: wf }
spec:
  templates:
    - name: main
      dag:
        tasks:
          - name: orphan
"#;
        let wf = single(yaml);
        assert!(wf.node("main").unwrap().task("orphan").unwrap().ref_node.is_none());
    }

    #[test]
    fn test_depends_list_and_empty_string() {
        let yaml = r#"
metadata: { name: wf }
spec:
  templates:
    - name: main
      dag:
        tasks:
          - name: a
            depends: [b, c]
          - name: d
            depends: ""
"#;
        let wf = single(yaml);
        let main = wf.node("main").unwrap();
        assert_eq!(main.task("a").unwrap().dependencies, vec!["wf__main__b", "wf__main__c"]);
        assert!(main.task("d").unwrap().dependencies.is_empty());
    }

    // -----------------------------------------------------------------------
    // Recovery
    // -----------------------------------------------------------------------

    #[test]
    fn test_malformed_depends_keeps_explicit_list() {
        let yaml = r#"
metadata: { name: wf }
spec:
  templates:
    - name: main
      dag:
        tasks:
          - name: a
            dependencies: [b]
            depends: "c &&"
          - name: b
"#;
        let (workflows, diagnostics) = load(yaml);
        let a = workflows[0].node("main").unwrap().task("a").unwrap();
        assert_eq!(a.dependencies, vec!["wf__main__b"]);

        assert_eq!(diagnostics.len(), 1);
        let diag = diagnostics.iter().next().unwrap();
        assert_eq!(diag.kind, DiagnosticKind::DependencyExpression);
        assert_eq!(diag.task_id.as_deref(), Some("wf__main__a"));
        assert_eq!(diag.node_id.as_deref(), Some("wf__main"));
        assert_eq!(diag.source_name.as_deref(), Some("test.yaml"));
        assert_eq!(diag.document, Some(1));
    }

    #[test]
    fn test_malformed_task_skipped_siblings_kept() {
        let yaml = r#"
metadata: { name: wf }
spec:
  entrypoint: main
  templates:
    - name: main
      dag:
        tasks:
          - name: bad
            depends: 5
          - name: good
            template: step
          - name: listed
            dependencies: "good"
          - depends: "good"
          - name: nameless-artifact
            arguments:
              artifacts:
                - from: "{{inputs.artifacts.x}}"
    - name: step
"#;
        let (workflows, diagnostics) = load(yaml);
        assert_eq!(workflows.len(), 1);
        let main = workflows[0].node("main").unwrap();
        assert!(main.is_entrypoint);
        let names: Vec<&str> = main.tasks.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["good"]);
        assert_eq!(main.task("good").unwrap().ref_node.as_deref(), Some("wf__step"));
        assert!(workflows[0].node("step").is_some());

        let problems: Vec<&Diagnostic> = diagnostics.of_kind(DiagnosticKind::TaskParse).collect();
        assert_eq!(problems.len(), 4);
        assert_eq!(diagnostics.len(), 4);
        assert!(problems.iter().all(|d| d.node_id.as_deref() == Some("wf__main")));
        assert!(problems.iter().all(|d| d.is_error()));
        assert_eq!(problems[0].task_id.as_deref(), Some("wf__main__bad"));
        assert_eq!(problems[1].task_id.as_deref(), Some("wf__main__listed"));
        assert!(problems[2].task_id.is_none());
        assert!(problems[2].message.contains("task #4"));
        assert_eq!(problems[3].task_id.as_deref(), Some("wf__main__nameless-artifact"));
    }

    #[test]
    fn test_unresolvable_artifact_is_reported_and_skipped() {
        let yaml = r#"
metadata: { name: wf }
spec:
  templates:
    - name: main
      dag:
        tasks:
          - name: a
            arguments:
              artifacts:
                - name: missing
                - name: odd
                  fromExpression: "inputs.artifacts.x"
                - name: ok
                  from: "{{inputs.artifacts.y}}"
"#;
        let (workflows, diagnostics) = load(yaml);
        let a = workflows[0].node("main").unwrap().task("a").unwrap();
        assert_eq!(a.unresolved_artifacts, vec!["missing", "odd"]);
        assert_eq!(a.input_artifacts.len(), 1);
        assert_eq!(a.input_artifacts[0].id, "wf__main__y");
        assert_eq!(diagnostics.of_kind(DiagnosticKind::UnknownArtifactReference).count(), 2);
    }

    #[test]
    fn test_bad_document_skipped_others_loaded() {
        let yaml = r#"
metadata: { name: first }
spec: { templates: [] }
---
metadata: { name: broken }
spec:
  templates: "not a list"
---
metadata: { name: third }
spec: { templates: [] }
"#;
        let (workflows, diagnostics) = load(yaml);
        let names: Vec<&str> = workflows.iter().map(|w| w.name.as_str()).collect();
        assert_eq!(names, vec!["first", "third"]);
        assert_eq!(diagnostics.len(), 1);
        let diag = diagnostics.iter().next().unwrap();
        assert_eq!(diag.kind, DiagnosticKind::DocumentParse);
        assert_eq!(diag.document, Some(2));
        assert!(diag.message.contains("document 2"));
    }

    #[test]
    fn test_empty_source_reported() {
        let (workflows, diagnostics) = load("");
        assert!(workflows.is_empty());
        assert_eq!(diagnostics.of_kind(DiagnosticKind::EmptyDocument).count(), 1);
        assert!(!diagnostics.has_errors());
    }

    #[test]
    fn test_syntax_error_reported() {
        let results = parse_documents("bad.yaml", "metadata: [unclosed\n");
        assert_eq!(results.len(), 1);
        assert!(matches!(results[0], Err(LoadError::DocumentParse { document: 1, .. })));
    }

    #[test]
    fn test_loading_is_deterministic() {
        assert_eq!(load(PIPELINE), load(PIPELINE));
    }
}
