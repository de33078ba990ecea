//! Atomic range projector.
//!
//! Derives caret-opaque regions and their rendering payload from a token
//! store snapshot. The result is rebuilt after every transaction and never
//! patched in place.

use std::sync::Arc;

use crate::completion::Candidate;
use crate::entity::Entity;
use crate::registry::TypeRegistry;
use crate::token::{PositionLookup, Span, TokenId, TokenStore};
use crate::transaction::{Bias, Origin, Transaction};
use crate::view::CandidateView;

/// The "x" on a rendered region.
///
/// Holds only the token id; the current span is looked up when activated,
/// since text may have moved since the region was drawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RemoveAffordance {
    pub token: TokenId,
}

impl RemoveAffordance {
    pub fn new(token: TokenId) -> Self {
        Self { token }
    }

    /// The transaction deleting exactly the token's current span, or
    /// `None` when the token no longer exists.
    pub fn activate(&self, lookup: &impl PositionLookup, doc_len: usize) -> Option<Transaction> {
        let span = lookup.span_of(self.token)?;
        if span.is_empty() || span.to > doc_len {
            return None;
        }

        Some(
            Transaction::delete(doc_len, span.range())
                .with_cursor(span.from)
                .with_origin(Origin::Remove),
        )
    }
}

/// What a region shows.
#[derive(Debug, Clone, PartialEq)]
pub struct RegionPayload {
    pub entity: Arc<Entity>,
    pub label: String,
    pub icon: String,
    pub color: String,
    pub remove: RemoveAffordance,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AtomicRange {
    pub span: Span,
    pub payload: RegionPayload,
}

impl AtomicRange {
    pub fn token(&self) -> TokenId {
        self.payload.remove.token
    }
}

/// Regions of one snapshot, ordered and non-overlapping.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AtomicRanges {
    ranges: Vec<AtomicRange>,
}

impl AtomicRanges {
    pub fn iter(&self) -> impl Iterator<Item = &AtomicRange> {
        self.ranges.iter()
    }

    pub fn as_slice(&self) -> &[AtomicRange] {
        &self.ranges
    }

    pub fn len(&self) -> usize {
        self.ranges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }

    pub fn get(&self, token: TokenId) -> Option<&AtomicRange> {
        self.ranges.iter().find(|r| r.token() == token)
    }

    /// The region strictly containing `pos`.
    pub fn region_at(&self, pos: usize) -> Option<&AtomicRange> {
        let index = self.ranges.partition_point(|r| r.span.to <= pos);
        self.ranges
            .get(index)
            .filter(|r| r.span.contains_inside(pos))
    }

    pub fn region_ending_at(&self, pos: usize) -> Option<&AtomicRange> {
        self.ranges.iter().find(|r| r.span.to == pos)
    }

    pub fn region_starting_at(&self, pos: usize) -> Option<&AtomicRange> {
        self.ranges.iter().find(|r| r.span.from == pos)
    }

    /// Moves `pos` out of any region it falls inside, toward the start for
    /// `Bias::Left` and toward the end for `Bias::Right`.
    pub fn snap(&self, pos: usize, bias: Bias) -> usize {
        match self.region_at(pos) {
            Some(region) => match bias {
                Bias::Left => region.span.from,
                Bias::Right => region.span.to,
            },
            None => pos,
        }
    }

    /// Caret position one step left of `pos`, jumping over a region.
    pub fn left_of(&self, pos: usize) -> usize {
        match self.region_ending_at(pos) {
            Some(region) => region.span.from,
            None => self.snap(pos.saturating_sub(1), Bias::Left),
        }
    }

    /// Caret position one step right of `pos`, jumping over a region.
    pub fn right_of(&self, pos: usize, doc_len: usize) -> usize {
        match self.region_starting_at(pos) {
            Some(region) => region.span.to,
            None => self.snap((pos + 1).min(doc_len), Bias::Right),
        }
    }

    /// What Backspace at `pos` removes: the whole region ending there, or
    /// the previous char.
    pub fn backspace_range(&self, pos: usize) -> Option<Span> {
        if let Some(region) = self.region_ending_at(pos) {
            return Some(region.span);
        }
        (pos > 0).then(|| Span::new(pos - 1, pos))
    }

    /// What Delete at `pos` removes: the whole region starting there, or
    /// the next char.
    pub fn delete_range(&self, pos: usize, doc_len: usize) -> Option<Span> {
        if let Some(region) = self.region_starting_at(pos) {
            return Some(region.span);
        }
        (pos < doc_len).then(|| Span::new(pos, pos + 1))
    }

    /// End of the last region at or before `cursor`; 0 when there is none.
    /// Completion fragments never reach back past it.
    pub fn floor(&self, cursor: usize) -> usize {
        let index = self.ranges.partition_point(|r| r.span.to <= cursor);
        index
            .checked_sub(1)
            .and_then(|i| self.ranges.get(i))
            .map_or(0, |r| r.span.to)
    }
}

/// Builds regions from token snapshots using an explicit type registry.
#[derive(Debug, Clone, Default)]
pub struct Projector {
    registry: TypeRegistry,
}

impl Projector {
    pub fn new(registry: TypeRegistry) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &TypeRegistry {
        &self.registry
    }

    pub fn project(&self, store: &TokenStore) -> AtomicRanges {
        let ranges = store
            .iter()
            .map(|token| {
                let style = self.registry.style(&token.entity.kind);
                AtomicRange {
                    span: token.span,
                    payload: RegionPayload {
                        entity: Arc::clone(&token.entity),
                        label: token.entity.label.clone(),
                        icon: style.icon.clone(),
                        color: style.color.clone(),
                        remove: RemoveAffordance::new(token.id),
                    },
                }
            })
            .collect();

        AtomicRanges { ranges }
    }

    /// Popup row for a candidate.
    pub fn render_candidate(&self, candidate: &Candidate) -> CandidateView {
        match candidate {
            Candidate::Plain { label } => CandidateView {
                label: label.clone(),
                kind: None,
                entity_id: None,
                icon: None,
                color: None,
                selected: false,
            },
            Candidate::Entity(entity) => {
                let style = self.registry.style(&entity.kind);
                CandidateView {
                    label: entity.label.clone(),
                    kind: Some(entity.kind.clone()),
                    entity_id: Some(entity.id.clone()),
                    icon: Some(style.icon.clone()),
                    color: Some(style.color.clone()),
                    selected: false,
                }
            }
        }
    }
}
