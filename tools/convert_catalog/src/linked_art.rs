//! Linked Art JSON(-LD) records to catalog entities.
//!
//! Names live under `is_appellative_subject_of`: each status is classified
//! by an AAT term and ascribes one appellation. Places and polities differ
//! in shape (single object vs array, plain string vs `@value` literal), so
//! every accessor here accepts both.

use serde_json::Value;
use searchfield_core::utils::normalize;
use searchfield_core::Entity;

pub const PREFERRED_TERM: &str = "http://vocab.getty.edu/aat/300404670";
pub const ALTERNATE_TERM: &str = "http://vocab.getty.edu/aat/300264273";
/// Polity-only: alternate names recorded as `|`-separated lists.
pub const VARIANT_LIST_TERM: &str = "http://vocab.getty.edu/aat/300417226";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordKind {
    Place,
    Polity,
}

/// One value, or the items of an array.
fn one_or_many(value: &Value) -> Vec<&Value> {
    match value {
        Value::Array(items) => items.iter().collect(),
        Value::Null => Vec::new(),
        other => vec![other],
    }
}

/// First classification id: a bare string, or the `id` of an object.
fn classification(status: &Value) -> Option<&str> {
    let first = one_or_many(status.get("classified_as")?).into_iter().next()?;
    match first {
        Value::String(id) => Some(id),
        other => other.get("id")?.as_str(),
    }
}

/// Content of the first ascribed appellation, plain or `@value` literal.
fn appellation(status: &Value) -> Option<&str> {
    let first = one_or_many(status.get("ascribes_appellation")?).into_iter().next()?;
    match first.get("content")? {
        Value::String(content) => Some(content),
        literal => literal.get("@value")?.as_str(),
    }
}

/// The entity a record describes, or `None` when it has no appellations.
pub fn entity_from_record(record: &Value, kind: RecordKind) -> Option<Entity> {
    let statuses = record.get("is_appellative_subject_of")?;
    if statuses.is_null() {
        return None;
    }

    let mut preferred = String::new();
    let mut alternatives = Vec::new();
    for status in one_or_many(statuses) {
        let (Some(term), Some(value)) = (classification(status), appellation(status)) else {
            tracing::debug!("skipping appellation without classification or content");
            continue;
        };

        match (term, kind) {
            (PREFERRED_TERM, _) => preferred = normalize(value),
            (ALTERNATE_TERM, RecordKind::Place) => alternatives.push(normalize(value)),
            (ALTERNATE_TERM | VARIANT_LIST_TERM, RecordKind::Polity) => {
                alternatives.extend(value.split('|').map(normalize).filter(|v| !v.is_empty()));
            }
            _ => {}
        }
    }

    let id = record.get("id").and_then(Value::as_str).unwrap_or_default();
    let kind = record.get("type").and_then(Value::as_str).unwrap_or_default();
    Some(Entity::new(id, kind, preferred).with_alternatives(alternatives))
}

/// A place file holds one record, possibly wrapped in `@graph`.
pub fn place_record(document: &Value) -> &Value {
    match document.get("@graph").and_then(Value::as_array) {
        Some(graph) if !graph.is_empty() => &graph[0],
        _ => document,
    }
}

/// A polity file lists every record in `@graph`.
pub fn polity_records(document: &Value) -> Vec<&Value> {
    document
        .get("@graph")
        .map(one_or_many)
        .unwrap_or_default()
}
