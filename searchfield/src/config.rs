//! Host configuration that extends the base `Config` from core.
//!
//! This configuration includes:
//! - All field options from `searchfield_core::Config` (flattened via serde)
//! - The catalog file to load
//! - The log filter used when `RUST_LOG` is not set
//!
//! # Example
//!
//! ```toml
//! catalog = "data/catalog.json"
//! log_filter = "searchfield_core=debug"
//! page_size = 5
//!
//! [types.Place]
//! color = "#2e7d32"
//! icon = "map-pin"
//! ```

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use anyhow::Context;

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SearchFieldConfig {
    /// Base field options (completion, history, encoding, type styles)
    #[serde(flatten)]
    pub base: searchfield_core::Config,

    /// Entity catalog JSON; relative paths resolve against the config file
    pub catalog: Option<PathBuf>,

    /// tracing filter directive, e.g. "warn" or "searchfield_core=debug"
    pub log_filter: String,
}

impl Default for SearchFieldConfig {
    fn default() -> Self {
        Self {
            base: searchfield_core::Config::default(),
            catalog: None,
            log_filter: "warn".to_string(),
        }
    }
}

impl SearchFieldConfig {
    /// Load from a TOML file, resolving `catalog` against its directory.
    pub fn load_toml<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        let mut config = Self::from_toml_str(&content)
            .with_context(|| format!("parsing config {}", path.display()))?;

        if let (Some(catalog), Some(dir)) = (config.catalog.as_mut(), path.parent()) {
            if catalog.is_relative() {
                *catalog = dir.join(&*catalog);
            }
        }
        Ok(config)
    }

    pub fn from_toml_str(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    pub fn to_toml_string(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }

    /// Convert into the base config used by `SearchField::new()`
    pub fn into_base(self) -> searchfield_core::Config {
        self.base
    }

    pub fn base(&self) -> &searchfield_core::Config {
        &self.base
    }

    pub fn base_mut(&mut self) -> &mut searchfield_core::Config {
        &mut self.base
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flattened_fields() {
        let config = SearchFieldConfig::from_toml_str(
            r#"
            catalog = "places.json"
            page_size = 4
            keywords = ["NEAR"]
            "#,
        )
        .unwrap();

        assert_eq!(config.catalog.as_deref(), Some(Path::new("places.json")));
        assert_eq!(config.log_filter, "warn");
        assert_eq!(config.base.page_size, 4);
        assert_eq!(config.base.keywords, vec!["NEAR".to_string()]);
        assert!(config.base.recognize_literals);
    }

    #[test]
    fn test_catalog_resolved_against_config_dir() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("field.toml");
        std::fs::write(&path, "catalog = \"catalog.json\"\n").unwrap();

        let config = SearchFieldConfig::load_toml(&path).unwrap();
        assert_eq!(config.catalog, Some(dir.path().join("catalog.json")));
    }

    #[test]
    fn test_round_trip() {
        let mut config = SearchFieldConfig::default();
        config.log_filter = "debug".into();
        config.base_mut().max_history = 5;
        let text = config.to_toml_string().unwrap();
        let back = SearchFieldConfig::from_toml_str(&text).unwrap();
        assert_eq!(back.log_filter, "debug");
        assert_eq!(back.base().max_history, 5);
    }
}
