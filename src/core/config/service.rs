use std::fs;
use std::path::Path;

use super::validation::validate;
use super::Settings;
use crate::core::errors::RagError;

/// Loads and validates the settings tree.
///
/// Defaults are always the starting point; a TOML file, when present,
/// overlays individual fields (every field is optional thanks to
/// `#[serde(default)]`).
#[derive(Clone, Default)]
pub struct ConfigService;

impl ConfigService {
    pub fn new() -> Self {
        Self
    }

    /// Validated defaults, no file involved.
    pub fn defaults(&self) -> Result<Settings, RagError> {
        let settings = Settings::default();
        validate(&settings)?;
        Ok(settings)
    }

    /// Load settings from a TOML file, overlaying the defaults.
    ///
    /// A missing file is not an error; malformed TOML or invalid values are.
    pub fn load(&self, path: &Path) -> Result<Settings, RagError> {
        if !path.exists() {
            tracing::info!("No settings file at {}, using defaults", path.display());
            return self.defaults();
        }

        let raw = fs::read_to_string(path)?;
        let settings: Settings = toml::from_str(&raw)
            .map_err(|e| RagError::Configuration(format!("failed to parse {}: {}", path.display(), e)))?;
        validate(&settings)?;

        tracing::info!("Loaded settings from {}", path.display());
        Ok(settings)
    }
}
