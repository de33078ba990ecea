//! Text buffer: a rope, the caret and the undo history.

use ropey::Rope;

use crate::history::{Direction, History, Revision};
use crate::token::TokenStore;
use crate::transaction::{Bias, Effect, Origin, Transaction};

#[derive(Debug, Clone)]
pub struct Buffer {
    doc: Rope,
    cursor: usize,
    history: History,
}

impl Buffer {
    pub fn new(max_history: usize) -> Self {
        Self {
            doc: Rope::new(),
            cursor: 0,
            history: History::new(max_history),
        }
    }

    pub fn doc(&self) -> &Rope {
        &self.doc
    }

    pub fn text(&self) -> String {
        self.doc.to_string()
    }

    /// Length in chars.
    pub fn len(&self) -> usize {
        self.doc.len_chars()
    }

    pub fn is_empty(&self) -> bool {
        self.doc.len_chars() == 0
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn set_cursor(&mut self, cursor: usize) {
        self.cursor = cursor.min(self.len());
    }

    /// Start of the line holding the caret.
    pub fn line_start(&self) -> usize {
        let line = self.doc.char_to_line(self.cursor);
        self.doc.line_to_char(line)
    }

    /// End of the line holding the caret, before its line break.
    pub fn line_end(&self) -> usize {
        let line = self.doc.char_to_line(self.cursor);
        let start = self.doc.line_to_char(line);
        let content = self.doc.line(line);
        let mut len = content.len_chars();
        if len > 0 && content.char(len - 1) == '\n' {
            len -= 1;
            if len > 0 && content.char(len - 1) == '\r' {
                len -= 1;
            }
        }
        start + len
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    pub fn history_mut(&mut self) -> &mut History {
        &mut self.history
    }

    pub fn history_depth(&self, direction: Direction) -> usize {
        self.history.depth(direction)
    }

    /// Applies `tx` to the text and moves the caret.
    ///
    /// Recorded origins push a revision pairing the forward change with its
    /// inverse; each side restores the token snapshot and caret of the
    /// state it leads to, so undo reproduces `tokens_before` exactly.
    pub fn commit(&mut self, tx: &Transaction, tokens_before: &TokenStore, tokens_after: &TokenStore) {
        let cursor_before = self.cursor;
        let inverse = tx
            .changes_text()
            .then(|| tx.changes().invert(&self.doc));

        tx.changes().apply(&mut self.doc);
        let cursor = tx
            .cursor()
            .unwrap_or_else(|| tx.changes().map_pos(cursor_before, Bias::Right));
        self.set_cursor(cursor);

        if tx.is_noop() || !tx.origin().is_recorded() {
            return;
        }

        let forward = Transaction::from_changeset(tx.changes().clone())
            .with_effect(Effect::Restore(tokens_after.clone()))
            .with_cursor(self.cursor)
            .with_origin(Origin::Redo);
        let inverse = match inverse {
            Some(changes) => Transaction::from_changeset(changes),
            None => Transaction::identity(self.len()),
        }
        .with_effect(Effect::Restore(tokens_before.clone()))
        .with_cursor(cursor_before)
        .with_origin(Origin::Undo);

        tracing::debug!(origin = ?tx.origin(), depth = self.history.depth(Direction::Undo) + 1, "recording revision");
        self.history.record(Revision { forward, inverse });
    }
}

impl Default for Buffer {
    fn default() -> Self {
        Self::new(100)
    }
}
