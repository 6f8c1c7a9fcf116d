//! Configuration management for the renderer
//!
//! Supports loading configuration from:
//! - Default values
//! - Config file (render.toml)
//! - Environment variables (RENDER__*)
//!
//! ## Example config file (render.toml):
//! ```toml
//! [render]
//! live = false
//! concurrent = true
//! faux_array_limit = 5
//!
//! [definitions]
//! directory = "./schemas"
//! extension = "json"
//! skip_prefixes = ["drafts/"]
//!
//! [http]
//! timeout_secs = 30
//! user_agent = "render-graph"
//! ```

use config_crate::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::definition::FsDefinitionFiles;
use crate::transport::DEFAULT_TIMEOUT_SECS;

/// Main renderer configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RenderConfig {
    /// Rendering mode settings
    #[serde(default)]
    pub render: RenderSettings,

    /// Definition loading settings
    #[serde(default)]
    pub definitions: DefinitionsConfig,

    /// HTTP transport settings
    #[serde(default)]
    pub http: HttpConfig,
}

/// Rendering mode
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenderSettings {
    /// Fetch data from endpoints instead of synthesizing it
    #[serde(default = "default_true")]
    pub live: bool,

    /// Render sibling graphs concurrently
    #[serde(default = "default_true")]
    pub concurrent: bool,

    /// Upper length for synthesized arrays without `maxItems`
    #[serde(default = "default_faux_array_limit")]
    pub faux_array_limit: usize,
}

/// Where definitions are loaded from
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DefinitionsConfig {
    /// Directory of definition files, loaded at startup when set
    #[serde(default)]
    pub directory: Option<PathBuf>,

    /// Definition file extension
    #[serde(default = "default_extension")]
    pub extension: String,

    /// Relative path prefixes to skip while scanning
    #[serde(default = "default_skip_prefixes")]
    pub skip_prefixes: Vec<String>,
}

/// HTTP transport
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    #[serde(default)]
    pub user_agent: Option<String>,
}

// Default value functions
fn default_true() -> bool {
    true
}

fn default_faux_array_limit() -> usize {
    5
}

fn default_extension() -> String {
    FsDefinitionFiles::default().extension
}

fn default_skip_prefixes() -> Vec<String> {
    FsDefinitionFiles::default().skip_prefixes
}

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

impl Default for RenderSettings {
    fn default() -> Self {
        Self {
            live: true,
            concurrent: true,
            faux_array_limit: default_faux_array_limit(),
        }
    }
}

impl Default for DefinitionsConfig {
    fn default() -> Self {
        Self {
            directory: None,
            extension: default_extension(),
            skip_prefixes: default_skip_prefixes(),
        }
    }
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
            user_agent: None,
        }
    }
}

impl RenderConfig {
    /// Load configuration from default locations
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(None)
    }

    /// Load configuration, layering a specific file over the default locations
    pub fn load_from(config_path: Option<&str>) -> Result<Self, ConfigError> {
        let mut builder = Config::builder();

        let config_locations = ["render.toml", ".render.toml", "config/render.toml"];
        for location in config_locations {
            builder = builder.add_source(File::with_name(location).required(false));
        }

        if let Some(config_dir) = directories::ProjectDirs::from("dev", "render-graph", "render") {
            let xdg_config = config_dir.config_dir().join("render.toml");
            if xdg_config.exists() {
                builder = builder.add_source(File::from(xdg_config).required(false));
            }
        }

        if let Some(path) = config_path {
            builder = builder.add_source(File::with_name(path).required(true));
        }

        // RENDER__RENDER__LIVE=false, RENDER__HTTP__TIMEOUT_SECS=5, ...
        builder = builder.add_source(
            Environment::with_prefix("RENDER")
                .prefix_separator("__")
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

    /// File collaborator for the configured definition directory
    pub fn definition_files(&self) -> FsDefinitionFiles {
        FsDefinitionFiles {
            extension: self.definitions.extension.clone(),
            skip_prefixes: self.definitions.skip_prefixes.clone(),
        }
    }

    /// Definition directory, resolved against the working directory
    pub fn definitions_directory(&self) -> Option<PathBuf> {
        self.definitions.directory.as_ref().map(|p| {
            if p.is_absolute() {
                p.clone()
            } else {
                std::env::current_dir().unwrap_or_default().join(p)
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = RenderConfig::default();
        assert!(config.render.live);
        assert!(config.render.concurrent);
        assert_eq!(config.render.faux_array_limit, 5);
        assert_eq!(config.definitions.extension, "json");
        assert_eq!(config.http.timeout_secs, DEFAULT_TIMEOUT_SECS);
    }

    #[test]
    fn test_serialize_config() {
        let config = RenderConfig::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        assert!(toml_str.contains("[render]"));
        assert!(toml_str.contains("[definitions]"));
        assert!(toml_str.contains("[http]"));
    }

    #[test]
    fn test_load_explicit_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("custom.toml");
        std::fs::write(
            &path,
            "[render]\nlive = false\nfaux_array_limit = 2\n\n[definitions]\ndirectory = \"schemas\"\n",
        )
        .unwrap();

        let config = RenderConfig::load_from(Some(path.to_str().unwrap())).unwrap();
        assert!(!config.render.live);
        assert!(config.render.concurrent);
        assert_eq!(config.render.faux_array_limit, 2);
        assert_eq!(config.definitions.directory, Some(PathBuf::from("schemas")));
    }

    #[test]
    fn test_save_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("saved.toml");
        let mut config = RenderConfig::default();
        config.http.user_agent = Some("tester".to_string());
        config.save(path.to_str().unwrap()).unwrap();

        let loaded = RenderConfig::load_from(Some(path.to_str().unwrap())).unwrap();
        assert_eq!(loaded.http.user_agent.as_deref(), Some("tester"));
    }
}
