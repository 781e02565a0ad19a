//! Container configuration
//!
//! Flexible configuration for DI containers:
//! - sensible defaults for programmatic use
//! - TOML file loading with validation on load
//!
//! The configuration only covers the container itself (name, resolution
//! depth limit, resolution tracing); registrations are always code.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::errors::DiError;

/// Configuration of a root DI container
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DiConfig {
    /// Container name, used in diagnostics and error messages
    pub name: String,
    /// Limit for recursive resolution depth (guards factory cycles)
    pub max_resolution_depth: usize,
    /// Emit a debug log line for every successful resolution
    pub trace_resolutions: bool,
}

impl Default for DiConfig {
    fn default() -> Self {
        Self {
            name: "root".to_string(),
            max_resolution_depth: 64,
            trace_resolutions: false,
        }
    }
}

impl DiConfig {
    /// Validate the configuration
    pub fn validate(&self) -> Result<(), DiError> {
        if self.name.is_empty() {
            return Err(DiError::configuration("container name must not be empty"));
        }
        if self.max_resolution_depth == 0 {
            return Err(DiError::configuration(
                "max_resolution_depth must be at least 1",
            ));
        }
        Ok(())
    }

    /// Load and validate a configuration from a TOML file
    pub fn from_toml_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path)
            .with_context(|| format!("Failed to read configuration file {}", path.display()))?;
        let config: Self = toml::from_str(&raw)
            .with_context(|| format!("Failed to parse configuration file {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }
}
