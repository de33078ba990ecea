//! Entity type → presentation lookup.
//!
//! Rendering-only: nothing in the token store depends on it. The projector
//! receives a registry value at construction rather than reading a global.

use ahash::AHashMap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Colour and icon used to render regions of one entity type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeStyle {
    pub color: String,
    pub icon: String,
}

impl TypeStyle {
    pub fn new(color: impl Into<String>, icon: impl Into<String>) -> Self {
        Self {
            color: color.into(),
            icon: icon.into(),
        }
    }
}

impl Default for TypeStyle {
    fn default() -> Self {
        Self::new("#5f6368", "tag")
    }
}

/// Built-in styles for the catalog types the data pipeline produces.
pub fn default_type_styles() -> BTreeMap<String, TypeStyle> {
    BTreeMap::from([
        ("Place".to_string(), TypeStyle::new("#2e7d32", "map-pin")),
        ("Group".to_string(), TypeStyle::new("#6a1b9a", "landmark")),
    ])
}

#[derive(Debug, Clone, Default)]
pub struct TypeRegistry {
    styles: AHashMap<String, TypeStyle>,
    fallback: TypeStyle,
}

impl TypeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_styles<I>(styles: I) -> Self
    where
        I: IntoIterator<Item = (String, TypeStyle)>,
    {
        Self {
            styles: styles.into_iter().collect(),
            fallback: TypeStyle::default(),
        }
    }

    pub fn with_fallback(mut self, fallback: TypeStyle) -> Self {
        self.fallback = fallback;
        self
    }

    pub fn insert(&mut self, kind: impl Into<String>, style: TypeStyle) {
        self.styles.insert(kind.into(), style);
    }

    /// Style for `kind`, or the fallback when the type is unknown.
    pub fn style(&self, kind: &str) -> &TypeStyle {
        self.styles.get(kind).unwrap_or(&self.fallback)
    }

    pub fn contains(&self, kind: &str) -> bool {
        self.styles.contains_key(kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_and_unknown_types() {
        let registry = TypeRegistry::from_styles(default_type_styles());
        assert_eq!(registry.style("Place").icon, "map-pin");
        assert!(!registry.contains("Person"));
        assert_eq!(registry.style("Person"), &TypeStyle::default());
    }

    #[test]
    fn test_custom_fallback() {
        let mut registry = TypeRegistry::new().with_fallback(TypeStyle::new("#000", "dot"));
        registry.insert("Person", TypeStyle::new("#1565c0", "user"));
        assert_eq!(registry.style("Person").icon, "user");
        assert_eq!(registry.style("Thing").icon, "dot");
    }
}
