//! Completion source: catalog entities matching the word under the caret.
//!
//! Matching is a case-insensitive substring test against the label and
//! every alternative, in catalog order, with no ranking and no cap. The
//! catalog is assumed small enough for a linear scan; repeated fragments
//! are served from an LRU cache.

use lru::LruCache;
use ropey::Rope;
use std::cell::{Cell, RefCell};
use std::num::NonZeroUsize;
use std::sync::Arc;

use crate::entity::{Entity, EntityCatalog};
use crate::token::Span;
use crate::transaction::{Origin, Transaction};
use crate::utils::fold_case;

/// Characters that make up a completable word.
pub fn is_word_char(ch: char) -> bool {
    ch.is_alphanumeric() || ch == '_'
}

/// A completion option.
#[derive(Debug, Clone, PartialEq)]
pub enum Candidate {
    /// Inserts text only.
    Plain { label: String },
    /// Inserts the entity's label and registers a token over it.
    Entity(Arc<Entity>),
}

impl Candidate {
    pub fn label(&self) -> &str {
        match self {
            Candidate::Plain { label } => label,
            Candidate::Entity(entity) => &entity.label,
        }
    }

    /// Builds the transaction that replaces `fragment` with this candidate.
    ///
    /// For an entity the token span is exactly the inserted label, so text
    /// and token land in one step.
    pub fn apply(&self, doc_len: usize, fragment: Span) -> Transaction {
        let label = self.label();
        let end = fragment.from + label.chars().count();
        let tx = Transaction::replace(doc_len, fragment.range(), label)
            .with_cursor(end)
            .with_origin(Origin::Completion);

        match self {
            Candidate::Plain { .. } => tx,
            Candidate::Entity(entity) => tx.register(Span::new(fragment.from, end), Arc::clone(entity)),
        }
    }
}

/// The word fragment a completion request is about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletionContext {
    /// Span of the fragment; ends at the caret.
    pub fragment: Span,
    pub text: String,
    /// Requested explicitly (Ctrl-Space) rather than by typing.
    pub explicit: bool,
}

impl CompletionContext {
    /// Collects the word chars ending at `cursor`, never reaching back
    /// before `floor` (the end of the nearest token before the caret).
    pub fn at(doc: &Rope, cursor: usize, explicit: bool, floor: usize) -> Self {
        let cursor = cursor.min(doc.len_chars());
        let mut from = cursor;
        let mut chars = doc.chars_at(cursor);
        while from > floor {
            match chars.prev() {
                Some(ch) if is_word_char(ch) => from -= 1,
                _ => break,
            }
        }

        Self {
            fragment: Span::new(from, cursor),
            text: doc.slice(from..cursor).to_string(),
            explicit,
        }
    }

    pub fn new(fragment: Span, text: impl Into<String>, explicit: bool) -> Self {
        Self {
            fragment,
            text: text.into(),
            explicit,
        }
    }
}

pub struct CompletionSource {
    catalog: EntityCatalog,
    /// Folded label and alternatives per catalog entry.
    keys: Vec<Vec<String>>,
    keywords: Vec<String>,
    cache: RefCell<LruCache<String, Arc<[usize]>>>,
    cache_hits: Cell<usize>,
    cache_misses: Cell<usize>,
}

impl CompletionSource {
    pub fn new(catalog: EntityCatalog, keywords: Vec<String>, cache_size: usize) -> Self {
        let keys = catalog
            .iter()
            .map(|entity| entity.names().map(fold_case).collect())
            .collect();
        let capacity = NonZeroUsize::new(cache_size).unwrap_or(NonZeroUsize::MIN);

        Self {
            catalog,
            keys,
            keywords,
            cache: RefCell::new(LruCache::new(capacity)),
            cache_hits: Cell::new(0),
            cache_misses: Cell::new(0),
        }
    }

    pub fn catalog(&self) -> &EntityCatalog {
        &self.catalog
    }

    /// Candidates for `ctx`: matching entities in catalog order, then
    /// matching keywords. An empty fragment yields nothing unless the
    /// request is explicit, in which case everything matches.
    pub fn query(&self, ctx: &CompletionContext) -> Vec<Candidate> {
        if ctx.text.is_empty() && !ctx.explicit {
            return Vec::new();
        }

        let needle = fold_case(&ctx.text);
        let mut candidates: Vec<Candidate> = self
            .matching_entities(&needle)
            .iter()
            .filter_map(|&index| self.catalog.get(index))
            .map(|entity| Candidate::Entity(Arc::clone(entity)))
            .collect();

        candidates.extend(
            self.keywords
                .iter()
                .filter(|keyword| fold_case(keyword).contains(&needle))
                .map(|keyword| Candidate::Plain {
                    label: keyword.clone(),
                }),
        );

        tracing::trace!(fragment = %ctx.text, explicit = ctx.explicit, count = candidates.len(), "completion query");
        candidates
    }

    /// Catalog indices whose names contain the folded `needle`.
    fn matching_entities(&self, needle: &str) -> Arc<[usize]> {
        if let Some(cached) = self.cache.borrow_mut().get(needle) {
            self.cache_hits.set(self.cache_hits.get() + 1);
            return Arc::clone(cached);
        }
        self.cache_misses.set(self.cache_misses.get() + 1);

        let matches: Arc<[usize]> = self
            .keys
            .iter()
            .enumerate()
            .filter(|(_, names)| names.iter().any(|name| name.contains(needle)))
            .map(|(index, _)| index)
            .collect();

        self.cache
            .borrow_mut()
            .put(needle.to_string(), Arc::clone(&matches));
        matches
    }

    /// (hits, misses) of the fragment cache.
    pub fn cache_stats(&self) -> (usize, usize) {
        (self.cache_hits.get(), self.cache_misses.get())
    }

    pub fn clear_cache(&self) {
        self.cache.borrow_mut().clear();
        self.cache_hits.set(0);
        self.cache_misses.set(0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn source() -> CompletionSource {
        let catalog = EntityCatalog::new(vec![
            Entity::new("Q90", "Place", "Paris").with_alternatives(["City of Light"]),
            Entity::new("Q84", "Place", "London"),
        ]);
        CompletionSource::new(catalog, Vec::new(), 16)
    }

    fn labels(candidates: &[Candidate]) -> Vec<&str> {
        candidates.iter().map(Candidate::label).collect()
    }

    fn typed(text: &str) -> CompletionContext {
        CompletionContext::new(Span::new(0, text.chars().count()), text, false)
    }

    #[test]
    fn test_filter_by_alternative() {
        assert_eq!(labels(&source().query(&typed("light"))), vec!["Paris"]);
    }

    #[test]
    fn test_filter_by_label_prefix() {
        assert_eq!(labels(&source().query(&typed("lon"))), vec!["London"]);
    }

    #[test]
    fn test_empty_fragment() {
        let source = source();
        assert!(source.query(&typed("")).is_empty());

        let explicit = CompletionContext::new(Span::new(0, 0), "", true);
        assert_eq!(labels(&source.query(&explicit)), vec!["Paris", "London"]);
    }

    #[test]
    fn test_case_insensitive_and_catalog_order() {
        assert_eq!(labels(&source().query(&typed("ON"))), vec!["London"]);
        assert_eq!(labels(&source().query(&typed("o"))), vec!["Paris", "London"]);
    }

    #[test]
    fn test_empty_catalog() {
        let source = CompletionSource::new(EntityCatalog::default(), Vec::new(), 4);
        assert!(source.query(&typed("ro")).is_empty());
        assert!(source
            .query(&CompletionContext::new(Span::new(0, 0), "", true))
            .is_empty());
    }

    #[test]
    fn test_keywords_follow_entities() {
        let catalog = EntityCatalog::new(vec![Entity::new("Q1", "Place", "Normandy")]);
        let source = CompletionSource::new(catalog, vec!["AND".into(), "NOT".into()], 4);
        let candidates = source.query(&typed("no"));
        assert_eq!(labels(&candidates), vec!["Normandy", "NOT"]);
        assert!(matches!(candidates[1], Candidate::Plain { .. }));
    }

    #[test]
    fn test_cache_hits() {
        let source = source();
        source.query(&typed("lon"));
        source.query(&typed("LON"));
        assert_eq!(source.cache_stats(), (1, 1));
        source.clear_cache();
        assert_eq!(source.cache_stats(), (0, 0));
    }

    #[test]
    fn test_context_stops_at_floor_and_non_word() {
        let doc = Rope::from("near Romex ro");
        let ctx = CompletionContext::at(&doc, 13, false, 0);
        assert_eq!(ctx.text, "ro");
        assert_eq!(ctx.fragment, Span::new(11, 13));

        let ctx = CompletionContext::at(&doc, 10, false, 9);
        assert_eq!(ctx.text, "x");
        assert_eq!(ctx.fragment, Span::new(9, 10));

        let ctx = CompletionContext::at(&doc, 11, true, 0);
        assert_eq!(ctx.text, "");
    }

    #[test]
    fn test_entity_candidate_transaction() {
        let rome = Arc::new(Entity::new("Q1", "Place", "Rome"));
        let tx = Candidate::Entity(rome).apply(2, Span::new(0, 2));
        assert_eq!(tx.changes().len_after(), 4);
        assert_eq!(tx.cursor(), Some(4));
        let reg = tx.registrations().next().unwrap();
        assert_eq!(reg.span, Span::new(0, 4));
        assert_eq!(reg.entity.id, "Q1");

        let plain = Candidate::Plain { label: "AND".into() }.apply(2, Span::new(0, 2));
        assert_eq!(plain.registrations().count(), 0);
    }
}
