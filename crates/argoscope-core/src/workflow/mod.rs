//! Workflow graph construction.
//!
//! - `depends` -- tokenizer and parser for `depends` expressions
//! - `artifact` -- resolution of artifact argument references
//! - `definition` -- document parsing and per-document model building
//! - `assembler` -- cross-workflow linking and fan-in counting

pub mod artifact;
pub mod assembler;
pub mod definition;
pub mod depends;

/// Append `item` unless an equal element is already present.
pub(crate) fn push_unique<T: PartialEq>(items: &mut Vec<T>, item: T) {
    if !items.contains(&item) {
        items.push(item);
    }
}
