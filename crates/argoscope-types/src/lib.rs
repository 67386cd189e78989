//! Shared types for Argoscope.
//!
//! This crate contains the graph model produced by the loader (`Workflow`,
//! `Node`, `Task`), the loosely-typed document schema it is built from, the
//! display/loader configuration, and structured diagnostics.
//!
//! Zero infrastructure dependencies -- only serde and serde_yaml_ng.

pub mod config;
pub mod diagnostic;
pub mod document;
pub mod workflow;
