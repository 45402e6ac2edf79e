//! Runtime options, loadable from TOML:
//!
//! ```toml
//! debug = true
//! strict_columns = false
//! ```

use serde::{Deserialize, Serialize};

use crate::error::{QuarryError, Result};

#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
#[serde(default)]
pub struct Config {
    /// Log every statement at info level instead of debug
    pub debug: bool,
    /// Fail materialization when a result column matches no declared field
    pub strict_columns: bool,
}

impl Config {
    /// Parse configuration from a TOML string
    pub fn from_toml_str(s: &str) -> Result<Self> {
        toml::from_str(s).map_err(|e| QuarryError::Config(e.to_string()))
    }

    /// Load configuration from a TOML file
    pub fn from_file(path: &std::path::Path) -> Result<Self> {
        let contents =
            std::fs::read_to_string(path).map_err(|e| QuarryError::Config(e.to_string()))?;
        Self::from_toml_str(&contents)
    }
}
