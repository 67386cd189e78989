//! Two-phase graph assembly.
//!
//! Phase 1 ([`GraphBuilder`]) collects workflows from any number of sources.
//! Phase 2 ([`GraphBuilder::assemble`]) runs once every source is in: it
//! indexes all nodes by id, counts for each node how many tasks reference it
//! and reports references to nodes that were never loaded. The result,
//! [`AssembledGraph`], is read-only.
//!
//! Fan-in depends only on the set of loaded workflows, never on the order
//! they were added in.

use std::collections::{BTreeMap, HashMap};

use argoscope_types::config::DisplayOptions;
use argoscope_types::diagnostic::{Diagnostic, DiagnosticKind, Diagnostics};
use argoscope_types::workflow::{Node, Task, Workflow};

use super::definition::DefinitionLoader;

// ---------------------------------------------------------------------------
// Phase 1
// ---------------------------------------------------------------------------

/// Collects workflows before assembly.
#[derive(Debug, Default)]
pub struct GraphBuilder {
    workflows: Vec<Workflow>,
    diagnostics: Diagnostics,
}

impl GraphBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add one workflow.
    ///
    /// A workflow whose name is already present replaces the earlier one in
    /// place, and a `DuplicateWorkflow` warning is recorded.
    pub fn add_workflow(&mut self, workflow: Workflow) {
        match self.workflows.iter_mut().find(|w| w.name == workflow.name) {
            Some(existing) => {
                tracing::warn!(workflow = %workflow.name, "duplicate workflow name, later definition wins");
                self.diagnostics.push(
                    Diagnostic::new(
                        DiagnosticKind::DuplicateWorkflow,
                        format!("workflow '{}' defined more than once; keeping the last definition", workflow.name),
                    )
                    .with_workflow(workflow.name.clone()),
                );
                *existing = workflow;
            }
            None => self.workflows.push(workflow),
        }
    }

    /// Load every document of a YAML source and add the resulting workflows.
    ///
    /// Returns the number of workflows loaded from the source.
    pub fn add_source(&mut self, loader: &DefinitionLoader, source_name: &str, yaml: &str) -> usize {
        let workflows = loader.load_str(source_name, yaml, &mut self.diagnostics);
        let count = workflows.len();
        for workflow in workflows {
            self.add_workflow(workflow);
        }
        count
    }

    /// Record a problem found outside the loader (e.g. an unreadable file).
    pub fn report(&mut self, diagnostic: Diagnostic) {
        self.diagnostics.push(diagnostic);
    }

    /// Run phase 2 and freeze the graph.
    pub fn assemble(self) -> AssembledGraph {
        let Self {
            mut workflows,
            mut diagnostics,
        } = self;

        let mut index = BTreeMap::new();
        for (w, workflow) in workflows.iter().enumerate() {
            for (n, node) in workflow.nodes.iter().enumerate() {
                if index.insert(node.id.clone(), NodeLocation { workflow: w, node: n }).is_some() {
                    tracing::warn!(node = %node.id, "template defined twice in one workflow, last one wins");
                }
            }
        }

        let mut fan_in: HashMap<String, usize> = HashMap::new();
        for workflow in &workflows {
            for node in &workflow.nodes {
                for task in &node.tasks {
                    let Some(target) = &task.ref_node else { continue };
                    if index.contains_key(target) {
                        *fan_in.entry(target.clone()).or_default() += 1;
                    } else {
                        tracing::debug!(task = %task.id, target = %target, "dangling template reference");
                        diagnostics.push(
                            Diagnostic::new(
                                DiagnosticKind::DanglingReference,
                                format!("template '{target}' is not defined in any loaded workflow"),
                            )
                            .with_workflow(workflow.name.clone())
                            .with_node(node.id.clone())
                            .with_task(task.id.clone()),
                        );
                    }
                }
            }
        }

        // Shadowed duplicates stay at zero; only indexed nodes own a count.
        for node in workflows.iter_mut().flat_map(|w| w.nodes.iter_mut()) {
            node.incoming_count = 0;
        }
        for (id, location) in &index {
            if let Some(node) = workflows
                .get_mut(location.workflow)
                .and_then(|w| w.nodes.get_mut(location.node))
            {
                node.incoming_count = fan_in.get(id).copied().unwrap_or(0);
            }
        }

        tracing::info!(
            workflows = workflows.len(),
            nodes = index.len(),
            diagnostics = diagnostics.len(),
            "assembled workflow graph"
        );

        AssembledGraph {
            workflows,
            index,
            diagnostics,
        }
    }
}

// ---------------------------------------------------------------------------
// Phase 2 result
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct NodeLocation {
    workflow: usize,
    node: usize,
}

/// A fully linked graph. Fan-in counts are final.
#[derive(Debug, Clone)]
pub struct AssembledGraph {
    workflows: Vec<Workflow>,
    index: BTreeMap<String, NodeLocation>,
    diagnostics: Diagnostics,
}

impl AssembledGraph {
    /// Workflows in the order they were first added.
    pub fn workflows(&self) -> &[Workflow] {
        &self.workflows
    }

    pub fn node(&self, id: &str) -> Option<&Node> {
        let location = self.index.get(id)?;
        self.workflows
            .get(location.workflow)
            .and_then(|w| w.nodes.get(location.node))
    }

    /// Every indexed node, ordered by id.
    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.index.keys().filter_map(|id| self.node(id))
    }

    /// The node a task invokes, if it was loaded.
    pub fn referenced_node(&self, task: &Task) -> Option<&Node> {
        task.ref_node.as_deref().and_then(|id| self.node(id))
    }

    /// Indexed nodes the renderer should draw. The nodes borrow from the
    /// graph only, not from `options`.
    pub fn visible_nodes<'a, 'o>(
        &'a self,
        options: &'o DisplayOptions,
    ) -> impl Iterator<Item = &'a Node> + use<'a, 'o> {
        self.nodes().filter(move |n| n.is_visible(options))
    }

    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }

    pub fn node_count(&self) -> usize {
        self.index.len()
    }

    pub fn task_count(&self) -> usize {
        self.nodes().map(|n| n.tasks.len()).sum()
    }

    pub fn into_parts(self) -> (Vec<Workflow>, Diagnostics) {
        (self.workflows, self.diagnostics)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
