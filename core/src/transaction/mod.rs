//! Transactions: one indivisible edit of the buffer.
//!
//! A [`Transaction`] pairs a [`ChangeSet`] (the text change) with the token
//! effects that must land in the same step. Completion uses this to insert
//! a label and register its token together; history uses it to carry the
//! token snapshot an undo must restore.

mod changeset;
mod types;

#[cfg(test)]
mod tests;

use std::ops::Range;
use std::sync::Arc;

pub use changeset::ChangeSet;
pub use types::{Bias, Change, Insertion, Operation};

use crate::entity::Entity;
use crate::token::{Span, TokenStore};

/// Where a transaction came from. Used for history policy and logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    /// Typing, deleting and other direct edits.
    Input,
    /// Accepting a completion candidate.
    Completion,
    /// Activating a region's remove affordance.
    Remove,
    /// Importing externally supplied text.
    Import,
    /// Rewriting literal markers found in freshly edited text.
    Recognize,
    Undo,
    Redo,
}

impl Origin {
    /// Whether a transaction of this origin is pushed onto the undo stack.
    pub fn is_recorded(self) -> bool {
        !matches!(self, Origin::Undo | Origin::Redo)
    }
}

/// Instruction to create a token over `span` (post-change coordinates).
#[derive(Debug, Clone, PartialEq)]
pub struct Registration {
    pub span: Span,
    pub entity: Arc<Entity>,
}

/// Token-store side effects carried by a transaction, applied in order
/// after the text change has been mapped.
#[derive(Debug, Clone)]
pub enum Effect {
    Register(Registration),
    /// Replace the whole store with a snapshot. Only history emits this.
    Restore(TokenStore),
}

#[derive(Debug, Clone)]
pub struct Transaction {
    changes: ChangeSet,
    effects: Vec<Effect>,
    cursor: Option<usize>,
    origin: Origin,
}

impl Transaction {
    /// A transaction that changes nothing on a document of `doc_len` chars.
    pub fn identity(doc_len: usize) -> Self {
        Self::from_changeset(ChangeSet::identity(doc_len))
    }

    pub fn from_changeset(changes: ChangeSet) -> Self {
        Self {
            changes,
            effects: Vec::new(),
            cursor: None,
            origin: Origin::Input,
        }
    }

    /// Builds a transaction from replacements against a document of
    /// `doc_len` chars.
    pub fn change<I>(doc_len: usize, changes: I) -> Self
    where
        I: IntoIterator<Item = Change>,
    {
        Self::from_changeset(ChangeSet::from_changes(doc_len, changes))
    }

    pub fn insert(doc_len: usize, pos: usize, text: impl Into<String>) -> Self {
        Self::change(doc_len, [Change::insert(pos, text)])
    }

    pub fn delete(doc_len: usize, range: Range<usize>) -> Self {
        Self::change(doc_len, [Change::delete(range)])
    }

    pub fn replace(doc_len: usize, range: Range<usize>, text: impl Into<String>) -> Self {
        Self::change(doc_len, [Change::new(range, text)])
    }

    pub fn with_origin(mut self, origin: Origin) -> Self {
        self.origin = origin;
        self
    }

    /// Sets the caret position after the transaction (post-change coordinates).
    pub fn with_cursor(mut self, cursor: usize) -> Self {
        self.cursor = Some(cursor);
        self
    }

    pub fn with_effect(mut self, effect: Effect) -> Self {
        self.effects.push(effect);
        self
    }

    /// Adds a token registration over `span` (post-change coordinates).
    pub fn register(self, span: Span, entity: Arc<Entity>) -> Self {
        self.with_effect(Effect::Register(Registration { span, entity }))
    }

    pub fn changes(&self) -> &ChangeSet {
        &self.changes
    }

    pub fn effects(&self) -> &[Effect] {
        &self.effects
    }

    pub fn cursor(&self) -> Option<usize> {
        self.cursor
    }

    pub fn origin(&self) -> Origin {
        self.origin
    }

    pub fn registrations(&self) -> impl Iterator<Item = &Registration> {
        self.effects.iter().filter_map(|effect| match effect {
            Effect::Register(reg) => Some(reg),
            Effect::Restore(_) => None,
        })
    }

    pub fn changes_text(&self) -> bool {
        !self.changes.is_identity()
    }

    /// True when the transaction has neither a text change nor effects.
    pub fn is_noop(&self) -> bool {
        !self.changes_text() && self.effects.is_empty()
    }

    /// Folds `next`, which applies to the document this transaction
    /// produces, into a single transaction.
    ///
    /// Effects of `self` have their spans mapped through `next`; effects of
    /// `next` are kept as they are. The caret of `next` wins when set.
    pub fn compose(self, next: Transaction) -> Transaction {
        let mapping = next.changes.clone();
        let mut effects: Vec<Effect> = self
            .effects
            .into_iter()
            .map(|effect| match effect {
                Effect::Register(reg) => Effect::Register(Registration {
                    span: reg.span.map(&mapping),
                    entity: reg.entity,
                }),
                restore => restore,
            })
            .collect();
        effects.extend(next.effects);

        let cursor = next
            .cursor
            .or_else(|| self.cursor.map(|c| mapping.map_pos(c, Bias::Right)));

        Transaction {
            changes: self.changes.compose(next.changes),
            effects,
            cursor,
            origin: self.origin,
        }
    }
}
