//! Standalone HTML page around a Mermaid diagram.

use argoscope_core::workflow::assembler::AssembledGraph;
use argoscope_types::config::{DisplayOptions, HtmlConfig};

use crate::DiagramRenderer;
use crate::mermaid::render_mermaid;

/// Renders the Mermaid diagram wrapped in an HTML page.
#[derive(Debug, Clone, Default)]
pub struct HtmlRenderer {
    config: HtmlConfig,
}

impl HtmlRenderer {
    pub fn new(config: HtmlConfig) -> Self {
        Self { config }
    }
}

impl DiagramRenderer for HtmlRenderer {
    fn render(&self, graph: &AssembledGraph, options: &DisplayOptions) -> String {
        wrap_html(&render_mermaid(graph, options), &self.config)
    }
}

/// Embed Mermaid text in a page that loads the Mermaid runtime.
///
/// The page reloads itself every `refresh_secs` seconds unless that is 0.
pub fn wrap_html(mermaid: &str, config: &HtmlConfig) -> String {
    let mut page = String::with_capacity(mermaid.len() + 256);
    page.push_str("<html><head>");
    if config.refresh_secs > 0 {
        page.push_str(&format!("<meta http-equiv='refresh' content='{}'/>", config.refresh_secs));
    }
    page.push_str("<style>pre {margin:0}</style>");
    page.push_str(&format!("<script src=\"{}\"></script>", config.mermaid_url));
    page.push_str("</head><body><div class=\"mermaid\">");
    page.push_str(mermaid);
    page.push_str("</div></body></html>");
    page
}
