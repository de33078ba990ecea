//! Entities and the read-only catalog they come from.
//!
//! The catalog file is a JSON array in the shape the data pipeline emits:
//!
//! ```json
//! [{"id": "Q1", "type": "Place", "_label": "Rome", "alternative_labels": ["Roma"]}]
//! ```

use ahash::AHashMap;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;

/// An external domain object a token can refer to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Entity {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(rename = "_label", alias = "label")]
    pub label: String,
    #[serde(rename = "alternative_labels", alias = "alternatives", default)]
    pub alternatives: Vec<String>,
}

impl Entity {
    pub fn new(id: impl Into<String>, kind: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            kind: kind.into(),
            label: label.into(),
            alternatives: Vec::new(),
        }
    }

    /// Adds alternatives, skipping ones already present.
    pub fn with_alternatives<I, S>(mut self, alternatives: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for alt in alternatives {
            let alt = alt.into();
            if !self.alternatives.contains(&alt) {
                self.alternatives.push(alt);
            }
        }
        self
    }

    /// Label followed by every alternative.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.label.as_str()).chain(self.alternatives.iter().map(String::as_str))
    }
}

/// Catalog record as found on disk. Fields the pipeline may leave null are
/// optional here and validated in [`EntityCatalog::from_json_str`].
#[derive(Debug, Deserialize)]
struct RawEntity {
    id: Option<String>,
    #[serde(rename = "type")]
    kind: Option<String>,
    #[serde(rename = "_label", alias = "label", default)]
    label: Option<String>,
    #[serde(rename = "alternative_labels", alias = "alternatives", default)]
    alternatives: Option<Vec<String>>,
}

/// Immutable, shared list of entities, in file order.
#[derive(Debug, Clone, Default)]
pub struct EntityCatalog {
    entities: Arc<[Arc<Entity>]>,
    by_id: Arc<AHashMap<String, usize>>,
}

impl EntityCatalog {
    pub fn new(entities: Vec<Entity>) -> Self {
        let entities: Vec<Arc<Entity>> = entities.into_iter().map(Arc::new).collect();
        let mut by_id = AHashMap::with_capacity(entities.len());
        for (index, entity) in entities.iter().enumerate() {
            by_id.entry(entity.id.clone()).or_insert(index);
        }
        Self {
            entities: entities.into(),
            by_id: Arc::new(by_id),
        }
    }

    /// Parse a catalog from its JSON text.
    ///
    /// Records without an id or with an empty label are skipped; duplicate
    /// alternatives are collapsed.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let raw: Vec<RawEntity> =
            serde_json::from_str(json).context("catalog is not a JSON array of entities")?;
        let total = raw.len();

        let entities: Vec<Entity> = raw
            .into_iter()
            .enumerate()
            .filter_map(|(index, record)| {
                let label = record.label.unwrap_or_default();
                let Some(id) = record.id.filter(|id| !id.is_empty()) else {
                    tracing::warn!(index, "skipping catalog entry without id");
                    return None;
                };
                if label.trim().is_empty() {
                    tracing::warn!(%id, "skipping catalog entry with empty label");
                    return None;
                }
                Some(
                    Entity::new(id, record.kind.unwrap_or_default(), label)
                        .with_alternatives(record.alternatives.unwrap_or_default()),
                )
            })
            .collect();

        tracing::debug!(total, kept = entities.len(), "loaded entity catalog");
        Ok(Self::new(entities))
    }

    pub fn load_json<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading catalog {}", path.display()))?;
        Self::from_json_str(&content).with_context(|| format!("parsing catalog {}", path.display()))
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Arc<Entity>> {
        self.entities.get(index)
    }

    pub fn by_id(&self, id: &str) -> Option<&Arc<Entity>> {
        self.by_id.get(id).and_then(|&index| self.entities.get(index))
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<Entity>> {
        self.entities.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_pipeline_shape() {
        let json = r#"[
            {"id": "Q1", "type": "Place", "_label": "Rome", "alternative_labels": ["Roma", "Roma"]},
            {"id": "Q2", "type": "Group", "_label": "", "alternative_labels": []},
            {"id": null, "type": "Place", "_label": "Nowhere", "alternative_labels": []},
            {"id": "Q3", "type": "Place", "label": "Paris", "alternatives": ["City of Light"]}
        ]"#;
        let catalog = EntityCatalog::from_json_str(json).unwrap();

        assert_eq!(catalog.len(), 2);
        let rome = catalog.by_id("Q1").unwrap();
        assert_eq!(rome.kind, "Place");
        assert_eq!(rome.alternatives, vec!["Roma".to_string()]);
        assert_eq!(catalog.by_id("Q3").unwrap().label, "Paris");
        assert!(catalog.by_id("Q2").is_none());
    }

    #[test]
    fn test_rejects_non_array() {
        assert!(EntityCatalog::from_json_str(r#"{"id": "Q1"}"#).is_err());
    }

    #[test]
    fn test_load_json_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("places.json");
        std::fs::write(
            &path,
            r#"[{"id": "Q1", "type": "Place", "_label": "Rome", "alternative_labels": []}]"#,
        )
        .unwrap();

        let catalog = EntityCatalog::load_json(&path).unwrap();
        assert_eq!(catalog.get(0).unwrap().id, "Q1");
        assert!(EntityCatalog::load_json(dir.path().join("missing.json")).is_err());
    }

    #[test]
    fn test_names_order() {
        let paris = Entity::new("Q3", "Place", "Paris").with_alternatives(["City of Light"]);
        let names: Vec<&str> = paris.names().collect();
        assert_eq!(names, vec!["Paris", "City of Light"]);
    }
}
