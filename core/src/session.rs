//! Field session: state shared across key events.
//!
//! Holds the buffer, the live token snapshot, the regions projected from it
//! and the popup. Editors read and adjust it; all text changes still go
//! through [`crate::SearchField::dispatch`].

use crate::buffer::Buffer;
use crate::popup::CompletionPopup;
use crate::projector::{AtomicRanges, Projector};
use crate::token::TokenStore;
use crate::view::FieldView;

/// Which editor receives keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FieldMode {
    #[default]
    Editing,
    /// Popup open; navigation keys go to the popup.
    Completing,
}

#[derive(Debug, Clone, Default)]
pub struct FieldSession {
    buffer: Buffer,
    tokens: TokenStore,
    ranges: AtomicRanges,
    popup: CompletionPopup,
    mode: FieldMode,
}

impl FieldSession {
    pub fn new(max_history: usize, page_size: usize) -> Self {
        Self {
            buffer: Buffer::new(max_history),
            tokens: TokenStore::new(),
            ranges: AtomicRanges::default(),
            popup: CompletionPopup::new(page_size),
            mode: FieldMode::Editing,
        }
    }

    pub fn buffer(&self) -> &Buffer {
        &self.buffer
    }

    pub fn buffer_mut(&mut self) -> &mut Buffer {
        &mut self.buffer
    }

    pub fn tokens(&self) -> &TokenStore {
        &self.tokens
    }

    pub fn ranges(&self) -> &AtomicRanges {
        &self.ranges
    }

    /// Installs a new token snapshot and re-projects its regions.
    pub fn set_tokens(&mut self, tokens: TokenStore, projector: &Projector) {
        self.ranges = projector.project(&tokens);
        self.tokens = tokens;
    }

    pub fn popup(&self) -> &CompletionPopup {
        &self.popup
    }

    pub fn popup_mut(&mut self) -> &mut CompletionPopup {
        &mut self.popup
    }

    pub fn mode(&self) -> FieldMode {
        self.mode
    }

    pub fn set_mode(&mut self, mode: FieldMode) {
        self.mode = mode;
    }

    pub fn close_popup(&mut self) {
        self.popup.close();
        self.mode = FieldMode::Editing;
    }

    /// Writes the session state into `view` for the host.
    pub fn sync_to_view(&self, view: &mut FieldView, projector: &Projector) {
        view.text = self.buffer.text();
        view.cursor = self.buffer.cursor();
        view.regions = self.ranges.iter().map(Into::into).collect();

        view.completions.clear();
        view.auxiliary_text.clear();
        view.completion_open = self.popup.is_open();
        view.completion_cursor = self.popup.page_cursor();

        if self.popup.is_open() {
            let cursor = self.popup.page_cursor();
            view.completions = self
                .popup
                .current_page_candidates()
                .iter()
                .enumerate()
                .map(|(i, candidate)| {
                    let mut row = projector.render_candidate(candidate);
                    row.selected = i == cursor;
                    row
                })
                .collect();

            if self.popup.num_pages() > 1 {
                view.auxiliary_text =
                    format!("{}/{}", self.popup.current_page() + 1, self.popup.num_pages());
            }
        }
    }
}
