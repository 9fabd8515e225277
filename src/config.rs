use serde::{Deserialize, Serialize};
use sqlparser::dialect::Dialect;
use std::path::PathBuf;

use crate::error::{LineageError, Result};
use crate::graph::LayoutConfig;
use crate::sql_engine::dialect_by_name;

/// File looked up in the current directory when no config path is given
pub const DEFAULT_CONFIG_FILE: &str = "lineage.yaml";

/// Settings for one rebuild: which SQL dialect to parse and how to lay out
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineageConfig {
    /// sqlparser dialect name (duckdb, postgres, bigquery, ...)
    #[serde(default = "default_dialect")]
    pub dialect: String,

    /// Node box sizes, gaps and sweep budget
    #[serde(default)]
    pub layout: LayoutConfig,
}

fn default_dialect() -> String {
    "duckdb".to_string()
}

impl Default for LineageConfig {
    fn default() -> Self {
        Self {
            dialect: default_dialect(),
            layout: LayoutConfig::default(),
        }
    }
}

impl LineageConfig {
    pub fn validate(&self) -> Result<()> {
        dialect_by_name(&self.dialect)?;
        self.layout.validate()
    }

    pub fn sql_dialect(&self) -> Result<Box<dyn Dialect>> {
        dialect_by_name(&self.dialect)
    }
}

/// Parse and validate a YAML configuration document
pub fn parse_config(yaml: &str) -> Result<LineageConfig> {
    let config: LineageConfig =
        serde_yaml::from_str(yaml).map_err(|e| LineageError::Config(e.to_string()))?;
    config.validate()?;
    Ok(config)
}

/// Reads the configuration file from the specified path or looks for
/// lineage.yaml in the current directory.
///
/// An explicit path must exist. Without one, a missing lineage.yaml means
/// defaults.
pub fn read_config(config_path: Option<PathBuf>) -> Result<LineageConfig> {
    let (config_path, explicit) = match config_path {
        Some(path) => (path, true),
        None => {
            let current_dir = std::env::current_dir().map_err(|source| LineageError::Io {
                path: PathBuf::from("."),
                source,
            })?;
            (current_dir.join(DEFAULT_CONFIG_FILE), false)
        }
    };

    if !config_path.exists() {
        if explicit {
            return Err(LineageError::Config(format!(
                "configuration file not found at: {}",
                config_path.display()
            )));
        }
        return Ok(LineageConfig::default());
    }

    let config_str = std::fs::read_to_string(&config_path).map_err(|source| LineageError::Io {
        path: config_path.clone(),
        source,
    })?;
    parse_config(&config_str)
}
