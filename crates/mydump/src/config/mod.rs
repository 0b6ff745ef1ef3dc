//! Option loading and validation.

mod types;
mod validation;

pub use types::*;

use std::path::Path;

use crate::error::{DumpError, Result};

impl DumpOptions {
    /// Load options from a settings file.
    ///
    /// `.json` files are parsed as JSON; `.yaml`/`.yml` (and anything else)
    /// as YAML.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            DumpError::Config(format!("Failed to read settings file {:?}: {}", path, e))
        })?;

        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.to_lowercase());

        match extension.as_deref() {
            Some("json") => Self::from_json(&content),
            _ => Self::from_yaml(&content),
        }
    }

    /// Parse options from a JSON string.
    pub fn from_json(json: &str) -> Result<Self> {
        let options: DumpOptions = serde_json::from_str(json)
            .map_err(|e| DumpError::Config(format!("Failed to parse JSON settings: {}", e)))?;
        options.validate()?;
        Ok(options)
    }

    /// Parse options from a YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let options: DumpOptions = serde_yaml::from_str(yaml)
            .map_err(|e| DumpError::Config(format!("Failed to parse YAML settings: {}", e)))?;
        options.validate()?;
        Ok(options)
    }

    /// Validate the option record.
    pub fn validate(&self) -> Result<()> {
        validation::validate(self)
    }
}
