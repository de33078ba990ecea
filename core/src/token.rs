//! Token store: the authoritative set of live entity spans.
//!
//! A [`TokenStore`] is an immutable snapshot. [`TokenStore::apply`] derives
//! the next snapshot from a transaction and never touches the previous one,
//! so renderers holding an older snapshot always see a consistent view.

use std::fmt;
use std::ops::Range;
use std::sync::Arc;

use crate::entity::Entity;
use crate::remap::remap;
use crate::transaction::{Bias, ChangeSet, Effect, Registration, Transaction};

/// Half-open char range `[from, to)` of the buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Span {
    pub from: usize,
    pub to: usize,
}

impl Span {
    pub fn new(from: usize, to: usize) -> Self {
        Self { from, to }
    }

    pub fn len(&self) -> usize {
        self.to.saturating_sub(self.from)
    }

    /// Collapsed spans (`from >= to`) cover no text.
    pub fn is_empty(&self) -> bool {
        self.from >= self.to
    }

    pub fn overlaps(&self, other: &Span) -> bool {
        self.from < other.to && other.from < self.to
    }

    /// True when `pos` lies strictly between the edges.
    pub fn contains_inside(&self, pos: usize) -> bool {
        self.from < pos && pos < self.to
    }

    pub fn range(&self) -> Range<usize> {
        self.from..self.to
    }

    /// Maps the span through a changeset. The start moves past text
    /// inserted at it, the end stays before, so edits at an edge never
    /// grow the span.
    pub fn map(&self, changes: &ChangeSet) -> Span {
        Span {
            from: changes.map_pos(self.from, Bias::Right),
            to: changes.map_pos(self.to, Bias::Left),
        }
    }
}

impl From<Range<usize>> for Span {
    fn from(range: Range<usize>) -> Self {
        Span::new(range.start, range.end)
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..{}", self.from, self.to)
    }
}

/// Identity of a token across snapshots. Survives remapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TokenId(pub u64);

impl fmt::Display for TokenId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub id: TokenId,
    pub span: Span,
    pub entity: Arc<Entity>,
}

/// Resolves a token's current span. Handed to rendered regions so they
/// never hold on to a span from an older snapshot.
pub trait PositionLookup {
    fn span_of(&self, id: TokenId) -> Option<Span>;
}

/// Ordered, non-overlapping tokens.
#[derive(Debug, Clone, Default)]
pub struct TokenStore {
    tokens: Arc<[Token]>,
    next_id: u64,
}

impl TokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Derives the store that follows `tx`.
    ///
    /// Text changes remap every span and drop collapsed ones; effects are
    /// then applied in order. A registration overlapping existing tokens
    /// replaces them. One that is empty or runs past the end of the
    /// document is skipped.
    pub fn apply(&self, tx: &Transaction) -> TokenStore {
        if tx.is_noop() {
            return self.clone();
        }

        let mut tokens = if tx.changes_text() {
            remap(&self.tokens, tx.changes())
        } else {
            self.tokens.to_vec()
        };
        let mut next_id = self.next_id;
        let doc_len = tx.changes().len_after();

        for effect in tx.effects() {
            match effect {
                Effect::Restore(snapshot) => {
                    tokens = snapshot.tokens.to_vec();
                    next_id = next_id.max(snapshot.next_id);
                }
                Effect::Register(reg) => {
                    if insert_registration(&mut tokens, reg, doc_len, TokenId(next_id)) {
                        next_id += 1;
                    }
                }
            }
        }

        TokenStore {
            tokens: tokens.into(),
            next_id,
        }
    }

    pub fn tokens(&self) -> &[Token] {
        &self.tokens
    }

    pub fn iter(&self) -> impl Iterator<Item = &Token> {
        self.tokens.iter()
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    pub fn get(&self, id: TokenId) -> Option<&Token> {
        self.tokens.iter().find(|t| t.id == id)
    }

    /// The token whose span strictly contains `pos`.
    pub fn token_at(&self, pos: usize) -> Option<&Token> {
        let index = self.tokens.partition_point(|t| t.span.to <= pos);
        self.tokens
            .get(index)
            .filter(|t| t.span.contains_inside(pos))
    }

    /// Checks bounds and ordering against a document of `doc_len` chars.
    pub fn is_consistent(&self, doc_len: usize) -> bool {
        self.tokens
            .iter()
            .all(|t| t.span.from < t.span.to && t.span.to <= doc_len)
            && self
                .tokens
                .windows(2)
                .all(|pair| pair[0].span.to <= pair[1].span.from)
    }
}

impl PartialEq for TokenStore {
    fn eq(&self, other: &Self) -> bool {
        self.tokens == other.tokens
    }
}

impl PositionLookup for TokenStore {
    fn span_of(&self, id: TokenId) -> Option<Span> {
        self.get(id).map(|t| t.span)
    }
}

fn insert_registration(
    tokens: &mut Vec<Token>,
    reg: &Registration,
    doc_len: usize,
    id: TokenId,
) -> bool {
    if reg.span.is_empty() || reg.span.to > doc_len {
        tracing::warn!(
            span = %reg.span,
            doc_len,
            entity = %reg.entity.id,
            "rejecting token registration outside the document"
        );
        return false;
    }

    let before = tokens.len();
    tokens.retain(|t| !t.span.overlaps(&reg.span));
    if tokens.len() != before {
        tracing::debug!(
            replaced = before - tokens.len(),
            span = %reg.span,
            "registration replaced overlapping tokens"
        );
    }

    let at = tokens.partition_point(|t| t.span.from < reg.span.from);
    tokens.insert(
        at,
        Token {
            id,
            span: reg.span,
            entity: Arc::clone(&reg.entity),
        },
    );
    tracing::debug!(%id, span = %reg.span, entity = %reg.entity.id, "registered token");
    true
}
