//! Plain-data snapshot of the field for the host.
//!
//! After every key or dispatch the field refreshes a [`FieldView`]; the host
//! reads its public fields to redraw. No callbacks or borrowing involved.

use crate::projector::{AtomicRange, RemoveAffordance};
use crate::token::{Span, TokenId};

/// A rendered atomic region.
#[derive(Debug, Clone, PartialEq)]
pub struct RegionView {
    pub id: TokenId,
    pub span: Span,
    pub label: String,
    pub kind: String,
    pub entity_id: String,
    pub icon: String,
    pub color: String,
    pub remove: RemoveAffordance,
}

impl From<&AtomicRange> for RegionView {
    fn from(range: &AtomicRange) -> Self {
        let payload = &range.payload;
        Self {
            id: payload.remove.token,
            span: range.span,
            label: payload.label.clone(),
            kind: payload.entity.kind.clone(),
            entity_id: payload.entity.id.clone(),
            icon: payload.icon.clone(),
            color: payload.color.clone(),
            remove: payload.remove,
        }
    }
}

/// A row of the completion popup. Entity rows carry type and style.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CandidateView {
    pub label: String,
    pub kind: Option<String>,
    pub entity_id: Option<String>,
    pub icon: Option<String>,
    pub color: Option<String>,
    pub selected: bool,
}

#[derive(Debug, Clone, Default)]
pub struct FieldView {
    /// Whole buffer text
    pub text: String,

    /// Caret position (chars)
    pub cursor: usize,

    /// Atomic regions, ordered by position
    pub regions: Vec<RegionView>,

    /// Popup rows of the current page
    pub completions: Vec<CandidateView>,

    /// Highlighted row within `completions`
    pub completion_cursor: usize,

    pub completion_open: bool,

    /// Page indicator such as "2/3" when the popup has several pages
    pub auxiliary_text: String,

    pub can_undo: bool,
    pub can_redo: bool,
}

impl FieldView {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn region_at(&self, pos: usize) -> Option<&RegionView> {
        self.regions
            .iter()
            .find(|r| r.span.from <= pos && pos < r.span.to)
    }

    pub fn has_completions(&self) -> bool {
        self.completion_open && !self.completions.is_empty()
    }
}
