//! Configuration management
//!
//! Supports loading configuration from:
//! - Default values
//! - Config file (poll-schema.toml)
//! - Environment variables (POLL_SCHEMA__*)
//!
//! ## Example config file (poll-schema.toml):
//! ```toml
//! [store]
//! on_delete = "restrict"
//!
//! [lint]
//! deny_warnings = true
//!
//! [export]
//! output_format = "compact"
//! ```

use config_crate::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};

/// Main configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub store: StoreConfig,

    #[serde(default)]
    pub lint: LintConfig,

    #[serde(default)]
    pub export: ExportConfig,
}

/// What happens to links when a referenced item is deleted
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeletePolicy {
    /// Drop the links; related items stay with the relationship emptied
    #[default]
    Nullify,
    /// Refuse to delete an item another item references through a to-one field
    Restrict,
}

/// Item store configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StoreConfig {
    #[serde(default)]
    pub on_delete: DeletePolicy,
}

/// Lint configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LintConfig {
    /// Treat lint warnings as failures
    #[serde(default)]
    pub deny_warnings: bool,
}

/// Export configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExportConfig {
    #[serde(default)]
    pub output_format: OutputFormat,
}

/// Output format for JSON
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Pretty,
    Compact,
}

impl OutputFormat {
    pub fn render(&self, value: &serde_json::Value) -> serde_json::Result<String> {
        match self {
            OutputFormat::Pretty => serde_json::to_string_pretty(value),
            OutputFormat::Compact => serde_json::to_string(value),
        }
    }
}

impl AppConfig {
    /// Load configuration from default locations
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(None)
    }

    /// Load configuration, adding a required file on top of the defaults
    pub fn load_from(config_path: Option<&str>) -> Result<Self, ConfigError> {
        let mut builder = Config::builder();

        for location in ["poll-schema.toml", ".poll-schema.toml", "config/poll-schema.toml"] {
            builder = builder.add_source(File::with_name(location).required(false));
        }

        if let Some(dirs) = directories::ProjectDirs::from("dev", "polls", "poll-schema") {
            let xdg_config = dirs.config_dir().join("poll-schema.toml");
            if xdg_config.exists() {
                builder = builder.add_source(File::from(xdg_config).required(false));
            }
        }

        if let Some(path) = config_path {
            builder = builder.add_source(File::with_name(path).required(true));
        }

        builder = builder.add_source(
            Environment::with_prefix("POLL_SCHEMA")
                .separator("__")
                .try_parsing(true),
        );

        builder.build()?.try_deserialize()
    }

    /// Save configuration to a file
    pub fn save(&self, path: &str) -> std::io::Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        std::fs::write(path, content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.store.on_delete, DeletePolicy::Nullify);
        assert!(!config.lint.deny_warnings);
        assert_eq!(config.export.output_format, OutputFormat::Pretty);
    }

    #[test]
    fn test_serialize_config() {
        let toml_str = toml::to_string_pretty(&AppConfig::default()).unwrap();
        assert!(toml_str.contains("[store]"));
        assert!(toml_str.contains("on_delete = \"nullify\""));
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("custom.toml");
        std::fs::write(
            &path,
            "[store]\non_delete = \"restrict\"\n\n[export]\noutput_format = \"compact\"\n",
        )
        .unwrap();

        let config = AppConfig::load_from(Some(path.to_str().unwrap())).unwrap();
        assert_eq!(config.store.on_delete, DeletePolicy::Restrict);
        assert_eq!(config.export.output_format, OutputFormat::Compact);
    }

    #[test]
    fn test_save_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("saved.toml");
        let mut config = AppConfig::default();
        config.lint.deny_warnings = true;
        config.save(path.to_str().unwrap()).unwrap();

        let loaded = AppConfig::load_from(Some(path.to_str().unwrap())).unwrap();
        assert!(loaded.lint.deny_warnings);
    }

    #[test]
    fn test_compact_render() {
        let value = serde_json::json!({"a": 1});
        assert_eq!(OutputFormat::Compact.render(&value).unwrap(), "{\"a\":1}");
    }
}
