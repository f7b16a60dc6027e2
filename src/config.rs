//! Configuration management for schema-flow
//!
//! Supports loading configuration from:
//! - Default values
//! - Config file (schema-flow.toml)
//! - Environment variables (SCHEMA_FLOW__*)
//!
//! ## Example config file (schema-flow.toml):
//! ```toml
//! [compile]
//! max_depth = 64
//!
//! [loader]
//! schema_path = "./schemas"
//! fallback_example = "shop"
//!
//! [layout]
//! enabled = true
//! direction = "TB"
//! rank_separation = 200.0
//! node_separation = 300.0
//!
//! [output]
//! format = "pretty"
//! ```

use config_crate::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::graph::builder::{CompileOptions, DEFAULT_MAX_DEPTH};
use crate::graph::layout::{Direction, LayeredLayout};
use crate::loader::DEFAULT_EXAMPLE;

/// Config file names searched in the working directory
pub const CONFIG_LOCATIONS: [&str; 3] = ["schema-flow.toml", ".schema-flow.toml", "config/schema-flow.toml"];

/// Main configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FlowConfig {
    #[serde(default)]
    pub compile: CompileConfig,

    #[serde(default)]
    pub loader: LoaderConfig,

    #[serde(default)]
    pub layout: LayoutConfig,

    #[serde(default)]
    pub output: OutputConfig,
}

/// Compiler limits
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompileConfig {
    /// Maximum schema nesting depth before compilation is rejected
    #[serde(default = "default_max_depth")]
    pub max_depth: usize,
}

/// Where schemas come from
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoaderConfig {
    /// Schema document or directory used when none is given on the command line
    #[serde(default)]
    pub schema_path: Option<PathBuf>,

    /// Bundled example used when loading fails
    #[serde(default = "default_fallback_example")]
    pub fallback_example: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayoutConfig {
    /// Attach positions to compiled output
    #[serde(default = "default_true")]
    pub enabled: bool,

    #[serde(default)]
    pub direction: Direction,

    #[serde(default = "default_rank_separation")]
    pub rank_separation: f64,

    #[serde(default = "default_node_separation")]
    pub node_separation: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OutputConfig {
    #[serde(default)]
    pub format: OutputFormat,
}

/// Output format for JSON
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Pretty,
    Compact,
}

// Default value functions
fn default_max_depth() -> usize {
    DEFAULT_MAX_DEPTH
}

fn default_fallback_example() -> String {
    DEFAULT_EXAMPLE.to_string()
}

fn default_true() -> bool {
    true
}

fn default_rank_separation() -> f64 {
    LayeredLayout::default().rank_separation
}

fn default_node_separation() -> f64 {
    LayeredLayout::default().node_separation
}

impl Default for CompileConfig {
    fn default() -> Self {
        Self {
            max_depth: default_max_depth(),
        }
    }
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            schema_path: None,
            fallback_example: default_fallback_example(),
        }
    }
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            direction: Direction::default(),
            rank_separation: default_rank_separation(),
            node_separation: default_node_separation(),
        }
    }
}

impl FlowConfig {
    /// Load configuration from default locations
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(None)
    }

    /// Load configuration, layering an explicit file over the default locations
    pub fn load_from(config_path: Option<&str>) -> Result<Self, ConfigError> {
        let mut builder = Config::builder();

        for location in CONFIG_LOCATIONS {
            builder = builder.add_source(File::with_name(location).required(false));
        }

        // Load from XDG config directory
        if let Some(xdg_config) = Self::user_config_path() {
            if xdg_config.exists() {
                builder = builder.add_source(File::from(xdg_config).required(false));
            }
        }

        if let Some(path) = config_path {
            builder = builder.add_source(File::with_name(path).required(true));
        }

        // Load from environment variables (SCHEMA_FLOW__*)
        builder = builder.add_source(
            Environment::with_prefix("SCHEMA_FLOW")
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        );

        let config = builder.build()?;
        config.try_deserialize()
    }

    /// Per-user config file location
    pub fn user_config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("dev", "schema-flow", "schema-flow")
            .map(|dirs| dirs.config_dir().join("schema-flow.toml"))
    }

    /// Save configuration to a file
    pub fn save(&self, path: &Path) -> std::io::Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, content)
    }

    pub fn compile_options(&self) -> CompileOptions {
        CompileOptions {
            max_depth: self.compile.max_depth,
        }
    }

    pub fn layered_layout(&self) -> LayeredLayout {
        LayeredLayout {
            direction: self.layout.direction,
            rank_separation: self.layout.rank_separation,
            node_separation: self.layout.node_separation,
        }
    }

    /// Problems that deserialize fine but make the config unusable
    pub fn problems(&self) -> Vec<String> {
        let mut problems = Vec::new();
        if self.compile.max_depth == 0 {
            problems.push("compile.max_depth must be at least 1".to_string());
        }
        if !crate::loader::bundled_names().contains(&self.loader.fallback_example.as_str()) {
            problems.push(format!(
                "loader.fallback_example '{}' is not a bundled example",
                self.loader.fallback_example
            ));
        }
        if let Some(path) = &self.loader.schema_path {
            if !path.exists() {
                problems.push(format!("loader.schema_path {} does not exist", path.display()));
            }
        }
        if self.layout.rank_separation <= 0.0 || self.layout.node_separation <= 0.0 {
            problems.push("layout separations must be positive".to_string());
        }
        problems
    }
}
