//! Loading and assembly logic for Argoscope.
//!
//! Turns workflow template documents into the graph model defined in
//! `argoscope-types`. Pure in-memory work: reading files and writing output
//! belong to `argoscope-infra` and the CLI.

pub mod workflow;
