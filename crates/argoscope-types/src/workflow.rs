//! Graph model for workflow templates.
//!
//! A `Workflow` owns its `Node`s (one per template), and a `Node` owns the
//! `Task`s of its DAG. All identifiers are derived from workflow, template
//! and task names joined with [`ID_SEPARATOR`], so loading the same input
//! twice yields the same identifiers.
//!
//! The model is built once by the loader, refined once by the assembler
//! (fan-in only) and read by renderers afterwards.

use serde::{Deserialize, Serialize};

use crate::config::DisplayOptions;

/// Separator used when composing node, task and artifact identifiers.
pub const ID_SEPARATOR: &str = "__";

/// Identifier of a template: `workflow__template`.
pub fn node_id(workflow_name: &str, template_name: &str) -> String {
    format!("{workflow_name}{ID_SEPARATOR}{template_name}")
}

/// Identifier of a DAG task within a node: `node__task`.
pub fn task_id(node_id: &str, task_name: &str) -> String {
    format!("{node_id}{ID_SEPARATOR}{task_name}")
}

/// Identifier of an artifact owned by a node or task: `owner__artifact`.
pub fn artifact_id(owner_id: &str, artifact_name: &str) -> String {
    format!("{owner_id}{ID_SEPARATOR}{artifact_name}")
}

// ---------------------------------------------------------------------------
// Parameters
// ---------------------------------------------------------------------------

/// A literal parameter value, known at load time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Parameter {
    pub name: String,
    pub value: String,
}

/// Literal parameters in declaration order.
///
/// Re-inserting an existing name replaces its value but keeps its first
/// position.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Parameters(Vec<Parameter>);

impl Parameters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        match self.0.iter_mut().find(|p| p.name == name) {
            Some(existing) => existing.value = value,
            None => self.0.push(Parameter { name, value }),
        }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|p| p.name == name)
            .map(|p| p.value.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = &Parameter> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Artifacts
// ---------------------------------------------------------------------------

/// Where a resolved input artifact comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactSource {
    /// `inputs.artifacts.NAME` of the enclosing template.
    NodeInput,
    /// `tasks.TASK.outputs.artifacts.ART` of a sibling task.
    TaskOutput,
    /// Anything else, taken verbatim.
    Literal,
}

/// A resolved input artifact of a task.
///
/// `id` is `nodeId__NAME` for node inputs and literals, and the composite
/// `TASK__ART` for task outputs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactRef {
    pub id: String,
    pub source: ArtifactSource,
}

impl ArtifactRef {
    /// Identifier of the diagram element this artifact flows from, given the
    /// id of the node that owns the consuming task.
    ///
    /// Task outputs are drawn per producing task (`nodeId__TASK__ART`), so the
    /// composite id is qualified here.
    pub fn link_source(&self, owner_node_id: &str) -> String {
        match self.source {
            ArtifactSource::TaskOutput => artifact_id(owner_node_id, &self.id),
            ArtifactSource::NodeInput | ArtifactSource::Literal => self.id.clone(),
        }
    }
}

// ---------------------------------------------------------------------------
// Task
// ---------------------------------------------------------------------------

/// One entry of a template's DAG.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    /// `nodeId__taskName`.
    pub id: String,
    pub name: String,
    /// Qualified task ids this task waits for, deduplicated, first-seen order.
    pub dependencies: Vec<String>,
    /// Raw `when` condition, never evaluated.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub when: Option<String>,
    /// Node id of the template this task invokes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ref_node: Option<String>,
    pub input_params: Parameters,
    pub input_artifacts: Vec<ArtifactRef>,
    /// Names of artifact arguments whose reference could not be resolved.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub unresolved_artifacts: Vec<String>,
}

// ---------------------------------------------------------------------------
// Node
// ---------------------------------------------------------------------------

/// A workflow template.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Node {
    /// `workflowName__templateName`, globally unique.
    pub id: String,
    pub name: String,
    /// Name of the owning workflow.
    pub workflow: String,
    /// Short container image label (registry, tag and known prefix removed).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    /// Script image, set for script templates.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub script: Option<String>,
    /// DAG tasks, sorted by name.
    pub tasks: Vec<Task>,
    /// Number of tasks across all loaded workflows referencing this node.
    /// Zero until the graph has been assembled.
    pub incoming_count: usize,
    pub input_params: Parameters,
    pub output_params: Parameters,
    pub input_artifacts: Vec<String>,
    pub output_artifacts: Vec<String>,
    pub is_entrypoint: bool,
}

impl Node {
    /// Whether a renderer should draw this node.
    ///
    /// Entrypoints and nodes with their own DAG are always visible; other
    /// templates only when the options force them.
    pub fn is_visible(&self, options: &DisplayOptions) -> bool {
        if self.is_entrypoint || !self.tasks.is_empty() {
            return true;
        }
        if options.show_all_templates {
            return true;
        }
        options.show_shared_templates && self.incoming_count > 1
    }

    pub fn task(&self, name: &str) -> Option<&Task> {
        self.tasks.iter().find(|t| t.name == name)
    }
}

// ---------------------------------------------------------------------------
// Workflow
// ---------------------------------------------------------------------------

/// A loaded workflow document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Workflow {
    pub id: String,
    pub name: String,
    /// Template name declared as `spec.entrypoint`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entrypoint: Option<String>,
    /// Templates in document order.
    pub nodes: Vec<Node>,
}

impl Workflow {
    pub fn node(&self, template_name: &str) -> Option<&Node> {
        self.nodes.iter().find(|n| n.name == template_name)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn bare_node(id: &str) -> Node {
        Node {
            id: id.to_string(),
            name: id.to_string(),
            workflow: "wf".to_string(),
            image: None,
            script: None,
            tasks: vec![],
            incoming_count: 0,
            input_params: Parameters::new(),
            output_params: Parameters::new(),
            input_artifacts: vec![],
            output_artifacts: vec![],
            is_entrypoint: false,
        }
    }

    fn bare_task(name: &str) -> Task {
        Task {
            id: task_id("wf__main", name),
            name: name.to_string(),
            dependencies: vec![],
            when: None,
            ref_node: None,
            input_params: Parameters::new(),
            input_artifacts: vec![],
            unresolved_artifacts: vec![],
        }
    }

    #[test]
    fn test_identifier_composition() {
        assert_eq!(node_id("build", "compile"), "build__compile");
        assert_eq!(task_id("build__compile", "fetch"), "build__compile__fetch");
        assert_eq!(artifact_id("build__compile", "src"), "build__compile__src");
    }

    #[test]
    fn test_parameters_keep_first_position_on_reinsert() {
        let mut params = Parameters::new();
        params.insert("a", "1");
        params.insert("b", "2");
        params.insert("a", "3");

        let names: Vec<&str> = params.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["a", "b"]);
        assert_eq!(params.get("a"), Some("3"));
        assert_eq!(params.len(), 2);
    }

    #[test]
    fn test_parameters_serialize_as_list() {
        let mut params = Parameters::new();
        params.insert("version", "v1");
        let json = serde_json::to_value(&params).unwrap();
        assert_eq!(json, serde_json::json!([{ "name": "version", "value": "v1" }]));
    }

    #[test]
    fn test_link_source_qualifies_task_outputs_only() {
        let output = ArtifactRef {
            id: "build__image".to_string(),
            source: ArtifactSource::TaskOutput,
        };
        let input = ArtifactRef {
            id: "wf__main__src".to_string(),
            source: ArtifactSource::NodeInput,
        };
        assert_eq!(output.link_source("wf__main"), "wf__main__build__image");
        assert_eq!(input.link_source("wf__main"), "wf__main__src");
    }

    // -----------------------------------------------------------------------
    // Visibility
    // -----------------------------------------------------------------------

    #[test]
    fn test_plain_template_hidden_by_default() {
        let node = bare_node("wf__leaf");
        assert!(!node.is_visible(&DisplayOptions::default()));
    }

    #[test]
    fn test_entrypoint_and_dag_nodes_visible() {
        let mut entry = bare_node("wf__entry");
        entry.is_entrypoint = true;
        assert!(entry.is_visible(&DisplayOptions::default()));

        let mut dag = bare_node("wf__dag");
        dag.tasks.push(bare_task("step"));
        assert!(dag.is_visible(&DisplayOptions::default()));
    }

    #[test]
    fn test_shared_templates_need_fan_in_above_one() {
        let options = DisplayOptions {
            show_shared_templates: true,
            ..DisplayOptions::default()
        };
        let mut node = bare_node("wf__leaf");
        node.incoming_count = 1;
        assert!(!node.is_visible(&options));
        node.incoming_count = 2;
        assert!(node.is_visible(&options));
    }

    #[test]
    fn test_show_all_templates_forces_visibility() {
        let options = DisplayOptions {
            show_all_templates: true,
            ..DisplayOptions::default()
        };
        assert!(bare_node("wf__leaf").is_visible(&options));
    }
}
