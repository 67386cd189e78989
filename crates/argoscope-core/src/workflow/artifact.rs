//! Resolution of artifact argument references.
//!
//! An artifact argument names its source either directly (`from`) or as a
//! ternary (`fromExpression: "cond ? a : b"`). Both forms are resolved
//! statically: the condition is never evaluated, both branches contribute.
//!
//! Recognised reference shapes, optionally wrapped in `{{ }}`:
//!
//! | Reference                                 | Resolves to        |
//! |-------------------------------------------|--------------------|
//! | `inputs.artifacts.NAME` (or `input.`)     | `NAME`, node input |
//! | `tasks.TASK.outputs.artifacts.ART`        | `TASK__ART`        |
//! | anything else                             | the text itself    |

use std::sync::LazyLock;

use regex::Regex;
use thiserror::Error;

use argoscope_types::document::ArtifactArgumentSpec;
use argoscope_types::workflow::{ArtifactRef, ArtifactSource, artifact_id};

use super::push_unique;

static NODE_INPUT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\binputs?\.artifacts\.([\w-]+)").expect("valid regex"));

static TASK_OUTPUT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\btasks\.([\w-]+)\.outputs\.artifacts\.([\w-]+)").expect("valid regex")
});

static TERNARY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)^(.*)\?(.*):(.*)$").expect("valid regex"));

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ArtifactRefError {
    #[error("artifact '{artifact}' has neither 'from' nor 'fromExpression'")]
    MissingReference { artifact: String },

    #[error("artifact '{artifact}' has an unrecognised fromExpression '{expression}' (expected 'cond ? a : b')")]
    UnrecognisedConditional { artifact: String, expression: String },
}

/// Remove one pair of surrounding `{{ }}` markers and trim.
fn strip_markers(reference: &str) -> &str {
    let trimmed = reference.trim();
    trimmed
        .strip_prefix("{{")
        .and_then(|s| s.strip_suffix("}}"))
        .map(str::trim)
        .unwrap_or(trimmed)
}

/// Resolve a direct reference.
///
/// Returns every node input and task output the reference mentions, node
/// inputs first. When it mentions neither, the whole (unwrapped) text is
/// returned as a single literal.
pub fn resolve_reference(reference: &str) -> Vec<ArtifactRef> {
    let text = strip_markers(reference);
    let mut refs = Vec::new();

    for caps in NODE_INPUT.captures_iter(text) {
        push_unique(
            &mut refs,
            ArtifactRef {
                id: caps[1].to_string(),
                source: ArtifactSource::NodeInput,
            },
        );
    }
    for caps in TASK_OUTPUT.captures_iter(text) {
        push_unique(
            &mut refs,
            ArtifactRef {
                id: artifact_id(&caps[1], &caps[2]),
                source: ArtifactSource::TaskOutput,
            },
        );
    }

    if refs.is_empty() {
        refs.push(ArtifactRef {
            id: text.to_string(),
            source: ArtifactSource::Literal,
        });
    }
    refs
}

/// Resolve a `cond ? a : b` expression to the union of both branches.
///
/// Returns `None` when the expression is not ternary-shaped.
pub fn resolve_conditional(expression: &str) -> Option<Vec<ArtifactRef>> {
    let text = strip_markers(expression);
    let caps = TERNARY.captures(text)?;

    let mut refs = resolve_reference(&caps[2]);
    for artifact in resolve_reference(&caps[3]) {
        push_unique(&mut refs, artifact);
    }
    Some(refs)
}

/// Resolve an artifact argument of a task.
///
/// `from` takes precedence over `fromExpression`; blank values count as
/// absent.
pub fn resolve_argument(argument: &ArtifactArgumentSpec) -> Result<Vec<ArtifactRef>, ArtifactRefError> {
    let non_blank = |value: &Option<String>| {
        value
            .as_deref()
            .filter(|v| !v.trim().is_empty())
            .map(str::to_string)
    };

    if let Some(from) = non_blank(&argument.from) {
        return Ok(resolve_reference(&from));
    }

    match non_blank(&argument.from_expression) {
        Some(expression) => {
            resolve_conditional(&expression).ok_or_else(|| ArtifactRefError::UnrecognisedConditional {
                artifact: argument.name.clone(),
                expression,
            })
        }
        None => Err(ArtifactRefError::MissingReference {
            artifact: argument.name.clone(),
        }),
    }
}
