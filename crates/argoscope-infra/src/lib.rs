//! Infrastructure layer for Argoscope.
//!
//! Everything that touches the filesystem: finding and reading workflow
//! sources, feeding them through the loader into an assembled graph, and
//! reading `config.toml`.

pub mod config;
pub mod filesystem;
