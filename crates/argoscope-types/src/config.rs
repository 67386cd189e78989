//! Configuration types for Argoscope.
//!
//! `ArgoscopeConfig` represents the optional `config.toml`. Every field has a
//! default, so an empty file (or no file) is a valid configuration.

use serde::{Deserialize, Serialize};

/// Default container image prefix stripped from image labels.
pub const DEFAULT_IMAGE_PREFIX: &str = "ai-workflow-";

/// Default Mermaid script embedded in generated pages.
pub const DEFAULT_MERMAID_URL: &str = "https://cdn.jsdelivr.net/npm/mermaid@10/dist/mermaid.min.js";

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArgoscopeConfig {
    #[serde(default)]
    pub display: DisplayOptions,

    #[serde(default)]
    pub loader: LoaderConfig,

    #[serde(default)]
    pub html: HtmlConfig,
}

/// Which parts of the graph a renderer draws.
///
/// Passed explicitly into every render call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisplayOptions {
    /// Emit artifact nodes and artifact edges.
    #[serde(default = "default_true")]
    pub show_artifacts: bool,
    /// Draw every template, even ones without a DAG.
    #[serde(default)]
    pub show_all_templates: bool,
    /// Draw templates referenced by more than one task.
    #[serde(default)]
    pub show_shared_templates: bool,
}

fn default_true() -> bool {
    true
}

impl Default for DisplayOptions {
    fn default() -> Self {
        Self {
            show_artifacts: true,
            show_all_templates: false,
            show_shared_templates: false,
        }
    }
}

/// Knobs for the definition loader.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoaderConfig {
    /// Prefixes removed from the last segment of a container image.
    #[serde(default = "default_image_prefixes")]
    pub image_prefixes: Vec<String>,
}

fn default_image_prefixes() -> Vec<String> {
    vec![DEFAULT_IMAGE_PREFIX.to_string()]
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            image_prefixes: default_image_prefixes(),
        }
    }
}

/// HTML page wrapper settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HtmlConfig {
    /// Seconds between automatic page reloads; 0 disables reloading.
    #[serde(default = "default_refresh_secs")]
    pub refresh_secs: u32,
    /// Script URL for the Mermaid runtime.
    #[serde(default = "default_mermaid_url")]
    pub mermaid_url: String,
}

fn default_refresh_secs() -> u32 {
    100
}

fn default_mermaid_url() -> String {
    DEFAULT_MERMAID_URL.to_string()
}

impl Default for HtmlConfig {
    fn default() -> Self {
        Self {
            refresh_secs: default_refresh_secs(),
            mermaid_url: default_mermaid_url(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_values() {
        let config = ArgoscopeConfig::default();
        assert!(config.display.show_artifacts);
        assert!(!config.display.show_all_templates);
        assert!(!config.display.show_shared_templates);
        assert_eq!(config.loader.image_prefixes, vec!["ai-workflow-"]);
        assert_eq!(config.html.refresh_secs, 100);
        assert_eq!(config.html.mermaid_url, DEFAULT_MERMAID_URL);
    }

    #[test]
    fn test_deserialize_empty_uses_defaults() {
        let config: ArgoscopeConfig = toml::from_str("").unwrap();
        assert_eq!(config, ArgoscopeConfig::default());
    }

    #[test]
    fn test_deserialize_partial_sections() {
        let toml_str = r#"
[display]
show_shared_templates = true

[loader]
image_prefixes = ["acme-", "tools-"]

[html]
refresh_secs = 0
"#;
        let config: ArgoscopeConfig = toml::from_str(toml_str).unwrap();
        assert!(config.display.show_artifacts, "unset field keeps its default");
        assert!(config.display.show_shared_templates);
        assert_eq!(config.loader.image_prefixes, vec!["acme-", "tools-"]);
        assert_eq!(config.html.refresh_secs, 0);
        assert_eq!(config.html.mermaid_url, DEFAULT_MERMAID_URL);
    }

    #[test]
    fn test_deserialize_rejects_wrong_types() {
        let result = toml::from_str::<ArgoscopeConfig>("[display]\nshow_artifacts = \"yes\"\n");
        assert!(result.is_err());
    }
}
