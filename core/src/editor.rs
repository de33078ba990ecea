//! Editor trait and the two key handlers of the field.
//!
//! `TextEditor` handles plain editing with atomic regions; `CompletionEditor`
//! handles the popup while it is open and passes everything else down.
//! Editors never apply text changes themselves: they return the
//! transaction and let [`crate::SearchField`] dispatch it.

use crate::field::KeyEvent;
use crate::session::{FieldMode, FieldSession};
use crate::transaction::{Bias, Origin, Transaction};

/// Result of processing a key event in an editor.
#[derive(Debug, Clone)]
pub enum EditorResult {
    /// Key was handled, session state updated (caret, popup)
    Handled,

    /// Apply this edit
    Dispatch(Transaction),

    /// Apply this accepted completion and close the popup
    Commit(Transaction),

    /// Submit the query
    Search,

    Undo,
    Redo,

    /// Query completions for the word under the caret
    OpenCompletion { explicit: bool },

    /// Request to switch to a different mode
    ModeSwitch(FieldMode),

    /// Key not handled by this editor, pass to parent
    PassThrough,
}

impl EditorResult {
    pub fn is_pass_through(&self) -> bool {
        matches!(self, EditorResult::PassThrough)
    }
}

pub trait Editor {
    /// Process a key event against the session.
    fn process_key(&mut self, key: &KeyEvent, session: &mut FieldSession) -> EditorResult;

    /// Name for logging.
    fn name(&self) -> &'static str;

    /// Whether this editor wants `key` at all.
    fn can_handle(&self, _key: &KeyEvent) -> bool {
        true
    }
}

// ============================================================================
// TextEditor - free text with atomic regions
// ============================================================================

#[derive(Debug, Clone, Copy, Default)]
pub struct TextEditor;

impl TextEditor {
    pub fn new() -> Self {
        Self
    }

    fn insert(&self, text: &str, session: &FieldSession) -> EditorResult {
        let buffer = session.buffer();
        let cursor = buffer.cursor();
        let tx = Transaction::insert(buffer.len(), cursor, text)
            .with_cursor(cursor + text.chars().count())
            .with_origin(Origin::Input);
        EditorResult::Dispatch(tx)
    }

    fn handle_backspace(&self, session: &FieldSession) -> EditorResult {
        let buffer = session.buffer();
        match session.ranges().backspace_range(buffer.cursor()) {
            Some(span) => EditorResult::Dispatch(
                Transaction::delete(buffer.len(), span.range())
                    .with_cursor(span.from)
                    .with_origin(Origin::Input),
            ),
            None => EditorResult::PassThrough,
        }
    }

    fn handle_delete(&self, session: &FieldSession) -> EditorResult {
        let buffer = session.buffer();
        match session.ranges().delete_range(buffer.cursor(), buffer.len()) {
            Some(span) => EditorResult::Dispatch(
                Transaction::delete(buffer.len(), span.range())
                    .with_cursor(span.from)
                    .with_origin(Origin::Input),
            ),
            None => EditorResult::PassThrough,
        }
    }

    /// Moves the caret and closes the popup.
    fn move_to(&self, pos: usize, session: &mut FieldSession) -> EditorResult {
        session.close_popup();
        session.buffer_mut().set_cursor(pos);
        EditorResult::Handled
    }
}

impl Editor for TextEditor {
    fn process_key(&mut self, key: &KeyEvent, session: &mut FieldSession) -> EditorResult {
        let cursor = session.buffer().cursor();
        let len = session.buffer().len();

        match key {
            KeyEvent::Char(ch) if !ch.is_control() => self.insert(ch.encode_utf8(&mut [0; 4]), session),
            KeyEvent::ModEnter => self.insert("\n", session),
            KeyEvent::Backspace => self.handle_backspace(session),
            KeyEvent::Delete => self.handle_delete(session),
            KeyEvent::Left => {
                let pos = session.ranges().left_of(cursor);
                self.move_to(pos, session)
            }
            KeyEvent::Right => {
                let pos = session.ranges().right_of(cursor, len);
                self.move_to(pos, session)
            }
            KeyEvent::Home => {
                let pos = session.ranges().snap(session.buffer().line_start(), Bias::Left);
                self.move_to(pos, session)
            }
            KeyEvent::End => {
                let pos = session.ranges().snap(session.buffer().line_end(), Bias::Right);
                self.move_to(pos, session)
            }
            KeyEvent::Enter => EditorResult::Search,
            KeyEvent::Ctrl(' ') => EditorResult::OpenCompletion { explicit: true },
            KeyEvent::Ctrl('z') => EditorResult::Undo,
            KeyEvent::Ctrl('y') | KeyEvent::Ctrl('Z') => EditorResult::Redo,
            _ => EditorResult::PassThrough,
        }
    }

    fn name(&self) -> &'static str {
        "TextEditor"
    }
}

// ============================================================================
// CompletionEditor - popup navigation and acceptance
// ============================================================================

#[derive(Debug, Clone, Copy, Default)]
pub struct CompletionEditor;

impl CompletionEditor {
    pub fn new() -> Self {
        Self
    }

    fn accept(&self, session: &mut FieldSession) -> EditorResult {
        let popup = session.popup();
        let Some(candidate) = popup.selected_candidate() else {
            return EditorResult::ModeSwitch(FieldMode::Editing);
        };
        let tx = candidate.apply(session.buffer().len(), popup.fragment());
        tracing::debug!(label = candidate.label(), "accepting completion");
        EditorResult::Commit(tx)
    }
}

impl Editor for CompletionEditor {
    fn process_key(&mut self, key: &KeyEvent, session: &mut FieldSession) -> EditorResult {
        if !session.popup().is_open() {
            return EditorResult::PassThrough;
        }

        let popup = session.popup_mut();
        match key {
            KeyEvent::Up => {
                popup.select_prev();
                EditorResult::Handled
            }
            KeyEvent::Down => {
                popup.select_next();
                EditorResult::Handled
            }
            KeyEvent::PageUp => {
                popup.page_up();
                EditorResult::Handled
            }
            KeyEvent::PageDown => {
                popup.page_down();
                EditorResult::Handled
            }
            KeyEvent::Enter | KeyEvent::Tab => self.accept(session),
            KeyEvent::Escape => EditorResult::ModeSwitch(FieldMode::Editing),
            _ => EditorResult::PassThrough,
        }
    }

    fn name(&self) -> &'static str {
        "CompletionEditor"
    }

    fn can_handle(&self, key: &KeyEvent) -> bool {
        matches!(
            key,
            KeyEvent::Up
                | KeyEvent::Down
                | KeyEvent::PageUp
                | KeyEvent::PageDown
                | KeyEvent::Enter
                | KeyEvent::Tab
                | KeyEvent::Escape
        )
    }
}
