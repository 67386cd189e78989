//! Diagram rendering for Argoscope.
//!
//! Renderers only read an [`AssembledGraph`]; what they draw is decided by
//! the [`DisplayOptions`] passed into each call.

pub mod html;
pub mod mermaid;

use argoscope_core::workflow::assembler::AssembledGraph;
use argoscope_types::config::DisplayOptions;

pub use html::HtmlRenderer;
pub use mermaid::MermaidRenderer;

/// Turns an assembled graph into a textual diagram.
pub trait DiagramRenderer {
    fn render(&self, graph: &AssembledGraph, options: &DisplayOptions) -> String;
}
