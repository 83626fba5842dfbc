//! Submodel configuration files.
//!
//! A configuration selects the implementation of each submodel role and sets
//! per-role options. It is written in TOML:
//!
//! ```toml
//! [submodels]
//! "aircraft.submodel.aerodynamics.wing.cd0" = "aircraft.submodel.aerodynamics.wing.cd0.hoerner"
//! # An empty id deactivates the role
//! "aircraft.submodel.aerodynamics.fuselage.cl_beta" = ""
//!
//! [options."aircraft.submodel.aerodynamics.wing.cd0"]
//! thickness_location = 0.35
//! ```
//!
//! Apply it with [`SubmodelRegistry::apply_config`](crate::SubmodelRegistry::apply_config).

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::Options;
use crate::registry::Selection;

/// Errors raised while reading or writing configuration files.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to parse configuration: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("Failed to serialize configuration: {0}")]
    Serialize(#[from] toml::ser::Error),
}

/// Submodel selections and per-role options.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RegistryConfig {
    /// Role key to implementation id; `""` deactivates the role
    pub submodels: BTreeMap<String, String>,
    /// Options applied to the implementation resolved for each role
    pub options: BTreeMap<String, Options>,
}

impl RegistryConfig {
    /// Parses a configuration from TOML text.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    /// Loads a configuration file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|source| ConfigError::Io { path: path.to_path_buf(), source })?;
        let config = Self::from_toml_str(&content)?;
        info!(
            path = %path.display(),
            submodels = config.submodels.len(),
            "Loaded submodel configuration"
        );
        Ok(config)
    }

    /// Writes the configuration as TOML.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let path = path.as_ref();
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content).map_err(|source| ConfigError::Io { path: path.to_path_buf(), source })
    }

    /// Selection configured for a role.
    pub fn selection(&self, role: &str) -> Option<Selection> {
        self.submodels.get(role).map(|id| {
            if id.is_empty() { Selection::Deactivated } else { Selection::Implementation(id.clone()) }
        })
    }

    /// Sets the implementation of a role.
    pub fn set_submodel(&mut self, role: &str, id: &str) -> &mut Self {
        self.submodels.insert(role.to_string(), id.to_string());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_selections_and_options() {
        let config = RegistryConfig::from_toml_str(
            r#"
            [submodels]
            "wing.cd0" = "wing.cd0.hoerner"
            "fuselage.cl_beta" = ""

            [options."wing.cd0"]
            thickness_location = 0.35
            "#,
        )
        .unwrap();

        assert_eq!(config.selection("wing.cd0"), Some(Selection::Implementation("wing.cd0.hoerner".to_string())));
        assert_eq!(config.selection("fuselage.cl_beta"), Some(Selection::Deactivated));
        assert_eq!(config.selection("missing"), None);
        assert_eq!(config.options["wing.cd0"].get_float("thickness_location", 0.0).unwrap(), 0.35);
    }

    #[test]
    fn test_empty_document_is_default() {
        assert_eq!(RegistryConfig::from_toml_str("").unwrap(), RegistryConfig::default());
    }

    #[test]
    fn test_unknown_section_rejected() {
        let result = RegistryConfig::from_toml_str("[engine]\nx = 1");
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("submodels.toml");

        let mut config = RegistryConfig::default();
        config.set_submodel("wing.cd0", "wing.cd0.legacy");
        config.options.insert("wing.cd0".to_string(), Options::new().with("thickness_location", 0.3));
        config.save(&path).unwrap();

        assert_eq!(RegistryConfig::load(&path).unwrap(), config);
    }

    #[test]
    fn test_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let result = RegistryConfig::load(dir.path().join("absent.toml"));
        assert!(matches!(result, Err(ConfigError::Io { .. })));
    }
}
