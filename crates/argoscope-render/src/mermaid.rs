//! Mermaid flowchart output.
//!
//! Layout:
//!
//! - one `subgraph` per workflow, laid out left to right;
//! - visible nodes as hexagons (name, image or script, literal inputs);
//! - tasks as boxes (name, `when`, the image of a hidden referenced node,
//!   literal arguments);
//! - artifacts as gold rounded boxes when `show_artifacts` is set.
//!
//! Links come after all shapes and are styled in three groups: task flow,
//! task-to-template references and artifact flow.

use argoscope_core::workflow::assembler::AssembledGraph;
use argoscope_types::config::DisplayOptions;
use argoscope_types::workflow::{Node, Parameters, Task, Workflow, artifact_id};

use crate::DiagramRenderer;

const FLOW_STYLE: &str = "stroke:#888,stroke-width:2px;";
const REFERENCE_STYLE: &str = "stroke:#888,stroke-width:2px;";
const ARTIFACT_STYLE: &str = "stroke:#fa0,stroke-width:2px;";

#[derive(Debug, Clone, Copy, Default)]
pub struct MermaidRenderer;

impl DiagramRenderer for MermaidRenderer {
    fn render(&self, graph: &AssembledGraph, options: &DisplayOptions) -> String {
        render_mermaid(graph, options)
    }
}

/// Render the graph as a Mermaid `graph LR` definition.
pub fn render_mermaid(graph: &AssembledGraph, options: &DisplayOptions) -> String {
    let mut diagram = Diagram::new(graph, options);
    for workflow in graph.workflows() {
        diagram.shapes(workflow);
    }
    for workflow in graph.workflows() {
        diagram.links(workflow);
    }
    let output = diagram.finish();
    tracing::debug!(bytes = output.len(), "rendered mermaid diagram");
    output
}

// ---------------------------------------------------------------------------
// Identifiers and labels
// ---------------------------------------------------------------------------

/// Make an identifier safe to use as a Mermaid node id.
fn mermaid_id(id: &str) -> String {
    id.chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' || c == '-' { c } else { '_' })
        .collect()
}

/// Replace characters Mermaid would read as shape syntax with entity codes.
fn escape_label(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '"' => out.push_str("#quot;"),
            '<' => out.push_str("#60;"),
            '>' => out.push_str("#62;"),
            '(' => out.push_str("#40;"),
            ')' => out.push_str("#41;"),
            '[' => out.push_str("#91;"),
            ']' => out.push_str("#93;"),
            '{' => out.push_str("#123;"),
            '}' => out.push_str("#125;"),
            _ => out.push(c),
        }
    }
    out
}

fn title(name: &str) -> String {
    format!("<span style=\"font-size:20px\">{}</span>", escape_label(name))
}

fn parameter_block(params: &Parameters, color: &str) -> String {
    let mut block = format!("<pre style=\"color:{color};margin-top:8px\">");
    for param in params.iter() {
        block.push_str(&format!("{}={}<br>", escape_label(&param.name), escape_label(&param.value)));
    }
    block.push_str("</pre>");
    block
}

fn node_label(node: &Node) -> String {
    let mut label = title(&node.name);
    if let Some(image) = &node.image {
        label.push_str(&format!("\\n<span style=\"color:green\">image: {}</span>", escape_label(image)));
    }
    if let Some(script) = &node.script {
        label.push_str(&format!("\\n<span style=\"color:green\">script: {}</span>", escape_label(script)));
    }
    if !node.input_params.is_empty() {
        label.push_str(&parameter_block(&node.input_params, "darkgray"));
    }
    label
}

fn task_label(task: &Task, hidden_target: Option<&Node>) -> String {
    let mut label = title(&task.name);
    if let Some(when) = &task.when {
        let when = when.replace("{{", "").replace("}}", "");
        label.push_str(&format!("<pre style=\"color:red\">when: {}</pre>", escape_label(&when)));
    }
    if let Some(target) = hidden_target {
        if let Some(image) = &target.image {
            label.push_str(&format!("<pre style=\"color:green\">image: {}</pre>", escape_label(image)));
        }
        if let Some(script) = &target.script {
            label.push_str(&format!("<pre style=\"color:green\">script: {}</pre>", escape_label(script)));
        }
    }
    if !task.input_params.is_empty() {
        label.push_str(&parameter_block(&task.input_params, "dimgray"));
    }
    label
}

// ---------------------------------------------------------------------------
// Diagram builder
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy)]
enum LinkGroup {
    Flow,
    Reference,
    Artifact,
}

struct Diagram<'g> {
    graph: &'g AssembledGraph,
    options: &'g DisplayOptions,
    shapes: Vec<String>,
    links: Vec<String>,
    flow: Vec<usize>,
    reference: Vec<usize>,
    artifact: Vec<usize>,
}

impl<'g> Diagram<'g> {
    fn new(graph: &'g AssembledGraph, options: &'g DisplayOptions) -> Self {
        Self {
            graph,
            options,
            shapes: Vec::new(),
            links: Vec::new(),
            flow: Vec::new(),
            reference: Vec::new(),
            artifact: Vec::new(),
        }
    }

    fn visible(&self, node: &Node) -> bool {
        node.is_visible(self.options)
    }

    fn shape(&mut self, line: String) {
        self.shapes.push(format!("    {line}"));
    }

    fn artifact_shape(&mut self, id: &str, name: &str) {
        let id = mermaid_id(id);
        self.shape(format!("{id}(<b>{}</b>)", title(name)));
        self.shape(format!("style {id} fill:gold,stroke:#222;"));
    }

    fn link(&mut self, group: LinkGroup, from: &str, arrow: &str, to: &str) {
        let index = self.links.len();
        match group {
            LinkGroup::Flow => self.flow.push(index),
            LinkGroup::Reference => self.reference.push(index),
            LinkGroup::Artifact => self.artifact.push(index),
        }
        self.links
            .push(format!("{} {arrow} {}", mermaid_id(from), mermaid_id(to)));
    }

    fn shapes(&mut self, workflow: &Workflow) {
        let graph = self.graph;
        let group = mermaid_id(&workflow.name);
        self.shapes.push(format!("subgraph {group}"));
        self.shape("direction LR".to_string());
        self.shape(format!("style {group} fill:#fafaff;"));

        for node in &workflow.nodes {
            let id = mermaid_id(&node.id);
            if self.visible(node) {
                self.shape(format!("{id}{{{{{}}}}}", node_label(node)));
                self.shape(format!("style {id} fill:lightgray,stroke:#aaa;"));
                if self.options.show_artifacts {
                    for name in &node.input_artifacts {
                        self.artifact_shape(&artifact_id(&node.id, name), name);
                    }
                }
            }

            for task in &node.tasks {
                let target = graph.referenced_node(task);
                let hidden_target = target.filter(|t| !self.visible(t));
                let task_id = mermaid_id(&task.id);
                self.shape(format!("{task_id}[{}]", task_label(task, hidden_target)));
                self.shape(format!("style {task_id} fill:white;"));

                if self.options.show_artifacts
                    && let Some(target) = target
                {
                    for name in &target.output_artifacts {
                        self.artifact_shape(&artifact_id(&task.id, name), name);
                    }
                }
            }
        }

        self.shapes.push("end".to_string());
    }

    fn links(&mut self, workflow: &Workflow) {
        let graph = self.graph;
        let show_artifacts = self.options.show_artifacts;

        for node in &workflow.nodes {
            if self.visible(node) && show_artifacts {
                for name in &node.input_artifacts {
                    self.link(LinkGroup::Artifact, &artifact_id(&node.id, name), "---", &node.id);
                }
            }

            for task in node.tasks.iter().filter(|t| t.dependencies.is_empty()) {
                self.link(LinkGroup::Flow, &node.id, "-->", &task.id);
            }

            for task in &node.tasks {
                for dependency in &task.dependencies {
                    self.link(LinkGroup::Flow, dependency, "-->", &task.id);
                }

                let target = graph.referenced_node(task);
                if let Some(target) = target.filter(|t| self.visible(t)) {
                    self.link(LinkGroup::Reference, &task.id, "-.->", &target.id);
                }

                if show_artifacts {
                    if let Some(target) = target {
                        for name in &target.output_artifacts {
                            self.link(LinkGroup::Artifact, &task.id, "-.->", &artifact_id(&task.id, name));
                        }
                    }
                    for artifact in &task.input_artifacts {
                        self.link(LinkGroup::Artifact, &artifact.link_source(&node.id), "-.->", &task.id);
                    }
                }
            }
        }
    }

    fn finish(self) -> String {
        let mut out = Vec::with_capacity(self.shapes.len() + self.links.len() + 4);
        out.push("graph LR;".to_string());
        out.extend(self.shapes);
        out.extend(self.links);
        for (indices, style) in [
            (&self.flow, FLOW_STYLE),
            (&self.reference, REFERENCE_STYLE),
            (&self.artifact, ARTIFACT_STYLE),
        ] {
            if !indices.is_empty() {
                let joined: Vec<String> = indices.iter().map(usize::to_string).collect();
                out.push(format!("linkStyle {} {style}", joined.join(",")));
            }
        }
        out.join("\n")
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
