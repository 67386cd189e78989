//! Configuration loader for Argoscope.
//!
//! Reads `config.toml` from an explicit path or from
//! `<config_dir>/argoscope/config.toml` and deserializes it into
//! [`ArgoscopeConfig`]. Falls back to defaults when the file is missing or
//! malformed.

use std::path::{Path, PathBuf};

use argoscope_types::config::ArgoscopeConfig;

/// Default location of the configuration file, if the platform has a
/// configuration directory.
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("argoscope").join("config.toml"))
}

/// Load configuration.
///
/// - `explicit` is the path given on the command line; when `None` the
///   default location is used.
/// - A missing file returns [`ArgoscopeConfig::default()`]. That is only
///   worth a warning when the path was given explicitly.
/// - An unreadable or unparseable file logs a warning and returns the default.
pub fn load_config(explicit: Option<&Path>) -> ArgoscopeConfig {
    let Some(config_path) = explicit.map(Path::to_path_buf).or_else(default_config_path) else {
        tracing::debug!("no configuration directory on this platform, using defaults");
        return ArgoscopeConfig::default();
    };

    let content = match std::fs::read_to_string(&config_path) {
        Ok(content) => content,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            if explicit.is_some() {
                tracing::warn!("Config file {} does not exist, using defaults", config_path.display());
            } else {
                tracing::debug!("No config.toml found at {}, using defaults", config_path.display());
            }
            return ArgoscopeConfig::default();
        }
        Err(err) => {
            tracing::warn!("Failed to read {}: {err}, using defaults", config_path.display());
            return ArgoscopeConfig::default();
        }
    };

    match toml::from_str::<ArgoscopeConfig>(&content) {
        Ok(config) => {
            tracing::debug!("Loaded configuration from {}", config_path.display());
            config
        }
        Err(err) => {
            tracing::warn!("Failed to parse {}: {err}, using defaults", config_path.display());
            ArgoscopeConfig::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_load_config_missing_file_returns_default() {
        let tmp = TempDir::new().unwrap();
        let config = load_config(Some(&tmp.path().join("config.toml")));
        assert_eq!(config, ArgoscopeConfig::default());
    }

    #[test]
    fn test_load_config_valid_toml_returns_parsed() {
        let tmp = TempDir::new().unwrap();
        let config_path = tmp.path().join("config.toml");
        std::fs::write(
            &config_path,
            r#"
[display]
show_artifacts = false
show_all_templates = true

[loader]
image_prefixes = ["acme-"]

[html]
refresh_secs = 30
"#,
        )
        .unwrap();

        let config = load_config(Some(&config_path));
        assert!(!config.display.show_artifacts);
        assert!(config.display.show_all_templates);
        assert_eq!(config.loader.image_prefixes, vec!["acme-"]);
        assert_eq!(config.html.refresh_secs, 30);
    }

    #[test]
    fn test_load_config_invalid_toml_returns_default() {
        let tmp = TempDir::new().unwrap();
        let config_path = tmp.path().join("config.toml");
        std::fs::write(&config_path, "this is not { valid toml !!!").unwrap();

        let config = load_config(Some(&config_path));
        assert_eq!(config, ArgoscopeConfig::default());
    }

    #[test]
    fn test_load_config_directory_path_returns_default() {
        let tmp = TempDir::new().unwrap();
        let config = load_config(Some(tmp.path()));
        assert_eq!(config, ArgoscopeConfig::default());
    }

    #[test]
    fn test_default_config_path_ends_with_app_dir() {
        if let Some(path) = default_config_path() {
            assert!(path.ends_with("argoscope/config.toml"));
        }
    }
}
