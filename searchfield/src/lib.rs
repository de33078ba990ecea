//! searchfield crate root
//!
//! Host-facing layer over `searchfield-core`: layered configuration,
//! catalog loading and factories for a ready-to-use `SearchField`.
//!
//! Public API exported here:
//! - `SearchFieldConfig` from `config`
//! - `create_search_field` / `create_search_field_with_text`
//! - `load_config`, `load_catalog`
//! - the core field types, re-exported

pub mod config;
pub mod logging;

use std::path::Path;

pub use config::SearchFieldConfig;
pub use searchfield_core::{
    Candidate, Config, Entity, EntityCatalog, FieldMode, FieldView, KeyEvent, KeyResult,
    QueryEncoding, RegionView, SearchField, SearchQuery, Span, Token, TokenId, TokenStore,
    UndoRedoState,
};

/// Load a config file, or the defaults when `path` is `None`.
pub fn load_config(path: Option<&Path>) -> anyhow::Result<SearchFieldConfig> {
    match path {
        Some(path) => SearchFieldConfig::load_toml(path),
        None => Ok(SearchFieldConfig::default()),
    }
}

/// The configured catalog, or an empty one when none is configured.
pub fn load_catalog(config: &SearchFieldConfig) -> anyhow::Result<EntityCatalog> {
    match &config.catalog {
        Some(path) => EntityCatalog::load_json(path),
        None => {
            tracing::warn!("no catalog configured; completion will be empty");
            Ok(EntityCatalog::default())
        }
    }
}

/// Build an empty field from a host config.
pub fn create_search_field(config: SearchFieldConfig) -> anyhow::Result<SearchField> {
    let catalog = load_catalog(&config)?;
    tracing::info!(entities = catalog.len(), "search field ready");
    Ok(SearchField::new(catalog, config.into_base()))
}

/// Build a field preloaded with `text`, importing any literal markers.
pub fn create_search_field_with_text(
    config: SearchFieldConfig,
    text: &str,
) -> anyhow::Result<SearchField> {
    let catalog = load_catalog(&config)?;
    Ok(SearchField::with_text(catalog, config.into_base(), text))
}
