//! Session configuration

use std::path::Path;

use dse_css::ParserOptions;
use serde::{Deserialize, Serialize};

use crate::EngineError;

/// Session configuration options
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Selector labels the parser treats as scopes
    pub parser: ParserOptions,

    /// Keep at most this many changes in the undo log
    pub history_limit: Option<usize>,

    /// Reject replacement values that would break block structure
    pub validate_values: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            parser: ParserOptions::default(),
            history_limit: None,
            validate_values: true,
        }
    }
}

impl Config {
    /// Parse a JSON config. Missing fields take their defaults.
    pub fn from_json_str(json: &str) -> Result<Self, EngineError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Read a JSON config file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, EngineError> {
        let text = std::fs::read_to_string(path.as_ref())?;
        let config = Self::from_json_str(&text)?;
        tracing::debug!("Loaded config from {}", path.as_ref().display());
        Ok(config)
    }
}
