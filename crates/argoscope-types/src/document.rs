//! Schema of a workflow template document.
//!
//! Only the fields the loader needs are modelled. Everything else in the
//! document is ignored, and every optional section defaults to empty (an
//! explicit YAML `null` included), so the loader works with field presence
//! instead of chained lookups.
//!
//! ```yaml
//! metadata:
//!   name: build
//! spec:
//!   entrypoint: main
//!   templates:
//!     - name: main
//!       dag:
//!         tasks:
//!           - name: compile
//!             template: compile
//!             depends: "fetch.Succeeded"
//! ```

use serde::{Deserialize, Deserializer, Serialize};
use serde_yaml_ng::Value;

/// Treat an explicit `null` the same as a missing field.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// One parsed workflow document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowDocument {
    pub metadata: DocumentMetadata,
    pub spec: DocumentSpec,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentMetadata {
    pub name: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DocumentSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entrypoint: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub templates: Vec<TemplateSpec>,
}

// ---------------------------------------------------------------------------
// Templates
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TemplateSpec {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub container: Option<ImageSpec>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub script: Option<ImageSpec>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub inputs: IoSpec,
    #[serde(default, deserialize_with = "null_as_default")]
    pub outputs: IoSpec,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dag: Option<DagSpec>,
}

impl TemplateSpec {
    /// Raw DAG task entries, empty for non-DAG templates.
    ///
    /// Entries are decoded one at a time with [`TaskSpec::from_entry`] so a
    /// malformed task does not take its document down with it.
    pub fn dag_tasks(&self) -> &[Value] {
        self.dag.as_ref().map(|d| d.tasks.as_slice()).unwrap_or_default()
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ImageSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
}

/// `inputs` / `outputs` of a template.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IoSpec {
    #[serde(default, deserialize_with = "null_as_default")]
    pub parameters: Vec<ParameterSpec>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub artifacts: Vec<ArtifactSpec>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParameterSpec {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
}

impl ParameterSpec {
    /// The value as text when it is a scalar (string, number or bool).
    ///
    /// Null, sequences and mappings yield `None`.
    pub fn scalar_value(&self) -> Option<String> {
        match self.value.as_ref()? {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            Value::Bool(b) => Some(b.to_string()),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArtifactSpec {
    pub name: String,
}

// ---------------------------------------------------------------------------
// DAG tasks
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DagSpec {
    #[serde(default, deserialize_with = "null_as_default")]
    pub tasks: Vec<Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskSpec {
    pub name: String,
    /// Explicit list form of dependencies.
    #[serde(default, deserialize_with = "null_as_default")]
    pub dependencies: Vec<String>,
    /// Boolean expression form of dependencies.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub depends: Option<DependsSpec>,
    /// Cross-workflow template reference.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub template_ref: Option<TemplateRefSpec>,
    /// Same-workflow template name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub template: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub arguments: ArgumentsSpec,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub when: Option<String>,
}

impl TaskSpec {
    /// Decode one raw `dag.tasks` entry.
    pub fn from_entry(entry: &Value) -> Result<Self, serde_yaml_ng::Error> {
        serde_yaml_ng::from_value(entry.clone())
    }

    /// The `name` of a raw entry, when it has a string one.
    pub fn entry_name(entry: &Value) -> Option<&str> {
        entry.get("name").and_then(Value::as_str)
    }
}

/// `depends` is normally a boolean expression, but a plain list of task
/// names is accepted too.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DependsSpec {
    Expression(String),
    Names(Vec<String>),
}

/// `templateRef`: template `template` of workflow `name`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TemplateRefSpec {
    pub name: String,
    pub template: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ArgumentsSpec {
    #[serde(default, deserialize_with = "null_as_default")]
    pub parameters: Vec<ParameterSpec>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub artifacts: Vec<ArtifactArgumentSpec>,
}

/// An artifact passed to a task, by direct (`from`) or conditional
/// (`fromExpression`) reference.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArtifactArgumentSpec {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from_expression: Option<String>,
}
