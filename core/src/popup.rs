//! Completion popup state: the open query, its candidates and the
//! highlighted row, paged for display.

use std::ops::Range;

use crate::completion::Candidate;
use crate::token::Span;

#[derive(Debug, Clone)]
pub struct CompletionPopup {
    /// Fragment the candidates were computed for.
    fragment: Span,

    /// Opened with Ctrl-Space rather than by typing
    explicit: bool,

    candidates: Vec<Candidate>,

    /// Number of candidates per page
    page_size: usize,

    /// Global index of the highlighted candidate
    selected: usize,

    open: bool,
}

impl CompletionPopup {
    pub fn new(page_size: usize) -> Self {
        Self {
            fragment: Span::default(),
            explicit: false,
            candidates: Vec::new(),
            page_size: page_size.max(1),
            selected: 0,
            open: false,
        }
    }

    /// Shows `candidates` for `fragment`, highlighting the first one.
    /// An empty list closes the popup instead.
    pub fn open(&mut self, fragment: Span, explicit: bool, candidates: Vec<Candidate>) {
        if candidates.is_empty() {
            self.close();
            return;
        }
        self.fragment = fragment;
        self.explicit = explicit;
        self.candidates = candidates;
        self.selected = 0;
        self.open = true;
    }

    pub fn close(&mut self) {
        self.candidates.clear();
        self.selected = 0;
        self.explicit = false;
        self.open = false;
    }

    pub fn is_open(&self) -> bool {
        self.open
    }

    pub fn fragment(&self) -> Span {
        self.fragment
    }

    pub fn is_explicit(&self) -> bool {
        self.explicit
    }

    pub fn candidates(&self) -> &[Candidate] {
        &self.candidates
    }

    pub fn len(&self) -> usize {
        self.candidates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    pub fn set_page_size(&mut self, page_size: usize) {
        self.page_size = page_size.max(1);
    }

    pub fn num_pages(&self) -> usize {
        self.candidates.len().div_ceil(self.page_size)
    }

    pub fn current_page(&self) -> usize {
        self.selected / self.page_size
    }

    /// Highlighted row within the current page.
    pub fn page_cursor(&self) -> usize {
        self.selected % self.page_size
    }

    pub fn selected_index(&self) -> Option<usize> {
        (self.selected < self.candidates.len()).then_some(self.selected)
    }

    pub fn selected_candidate(&self) -> Option<&Candidate> {
        self.candidates.get(self.selected)
    }

    fn current_page_range(&self) -> Range<usize> {
        let start = self.current_page() * self.page_size;
        let end = (start + self.page_size).min(self.candidates.len());
        start.min(end)..end
    }

    pub fn current_page_candidates(&self) -> &[Candidate] {
        &self.candidates[self.current_page_range()]
    }

    /// Moves the highlight down, crossing into the next page.
    /// Returns true if it moved.
    pub fn select_next(&mut self) -> bool {
        if self.selected + 1 < self.candidates.len() {
            self.selected += 1;
            true
        } else {
            false
        }
    }

    pub fn select_prev(&mut self) -> bool {
        if self.selected > 0 {
            self.selected -= 1;
            true
        } else {
            false
        }
    }

    /// Previous page, keeping the row when possible.
    pub fn page_up(&mut self) -> bool {
        if self.current_page() == 0 {
            return false;
        }
        self.selected -= self.page_size;
        true
    }

    /// Next page, clamping the row to the last candidate.
    pub fn page_down(&mut self) -> bool {
        let pages = self.num_pages();
        if pages == 0 || self.current_page() + 1 >= pages {
            return false;
        }
        self.selected = (self.selected + self.page_size).min(self.candidates.len() - 1);
        true
    }

    /// Highlights row `index` of the current page.
    pub fn select_on_page(&mut self, index: usize) -> Option<&Candidate> {
        let range = self.current_page_range();
        if index < range.len() {
            self.selected = range.start + index;
            self.selected_candidate()
        } else {
            None
        }
    }
}

impl Default for CompletionPopup {
    fn default() -> Self {
        Self::new(8)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plain(labels: &[&str]) -> Vec<Candidate> {
        labels
            .iter()
            .map(|l| Candidate::Plain { label: l.to_string() })
            .collect()
    }

    #[test]
    fn test_open_and_close() {
        let mut popup = CompletionPopup::new(2);
        popup.open(Span::new(0, 2), false, plain(&["a", "b", "c"]));
        assert!(popup.is_open());
        assert_eq!(popup.num_pages(), 2);
        assert_eq!(popup.selected_candidate().map(Candidate::label), Some("a"));

        popup.open(Span::new(0, 3), false, Vec::new());
        assert!(!popup.is_open());
        assert!(popup.selected_candidate().is_none());
    }

    #[test]
    fn test_navigation_crosses_pages() {
        let mut popup = CompletionPopup::new(2);
        popup.open(Span::new(0, 1), true, plain(&["a", "b", "c"]));
        assert!(popup.select_next());
        assert!(popup.select_next());
        assert_eq!(popup.current_page(), 1);
        assert_eq!(popup.page_cursor(), 0);
        assert_eq!(popup.current_page_candidates().len(), 1);
        assert!(!popup.select_next());
        assert!(popup.select_prev());
        assert_eq!(popup.current_page(), 0);
    }

    #[test]
    fn test_paging() {
        let mut popup = CompletionPopup::new(2);
        popup.open(Span::new(0, 1), true, plain(&["a", "b", "c"]));
        popup.select_next();
        assert!(popup.page_down());
        assert_eq!(popup.selected_index(), Some(2));
        assert!(!popup.page_down());
        assert!(popup.page_up());
        assert_eq!(popup.selected_index(), Some(0));
        assert!(!popup.page_up());
    }

    #[test]
    fn test_select_on_page() {
        let mut popup = CompletionPopup::new(2);
        popup.open(Span::new(0, 1), true, plain(&["a", "b", "c"]));
        popup.page_down();
        assert!(popup.select_on_page(1).is_none());
        assert_eq!(popup.select_on_page(0).map(Candidate::label), Some("c"));
    }
}
