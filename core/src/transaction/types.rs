use std::ops::Range;

/// One replacement of the char range `[start, end)` with `text`.
///
/// An empty `text` is a pure deletion, an empty range a pure insertion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Change {
    pub start: usize,
    pub end: usize,
    pub text: String,
}

impl Change {
    pub fn new(range: Range<usize>, text: impl Into<String>) -> Self {
        Self {
            start: range.start,
            end: range.end,
            text: text.into(),
        }
    }

    pub fn insert(pos: usize, text: impl Into<String>) -> Self {
        Self::new(pos..pos, text)
    }

    pub fn delete(range: Range<usize>) -> Self {
        Self::new(range, String::new())
    }
}

/// How a position sitting exactly on an insertion point is mapped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bias {
    /// Stay before text inserted at the position.
    Left,
    /// Move past text inserted at the position.
    Right,
}

/// Inserted text with its char length cached.
///
/// `char_len` always equals `text.chars().count()`; construct through
/// [`Insertion::new`] to keep that true.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Insertion {
    text: String,
    char_len: usize,
}

impl Insertion {
    #[inline]
    pub fn new(text: String) -> Self {
        let char_len = text.chars().count();
        Self { text, char_len }
    }

    #[inline]
    pub fn text(&self) -> &str {
        &self.text
    }

    #[inline]
    pub fn char_len(&self) -> usize {
        self.char_len
    }

    pub(super) fn push(&mut self, other: &Insertion) {
        self.text.push_str(&other.text);
        self.char_len += other.char_len;
    }

    /// Splits after `n` chars, returning `(prefix, suffix)`.
    pub(super) fn split_at(self, n: usize) -> (Insertion, Insertion) {
        debug_assert!(n <= self.char_len);
        let byte = self
            .text
            .char_indices()
            .nth(n)
            .map(|(b, _)| b)
            .unwrap_or(self.text.len());
        let (head, tail) = self.text.split_at(byte);
        (
            Insertion {
                text: head.to_string(),
                char_len: n,
            },
            Insertion {
                text: tail.to_string(),
                char_len: self.char_len - n,
            },
        )
    }
}

/// A single step of a [`ChangeSet`](super::ChangeSet).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operation {
    /// Keep the next N chars of the source.
    Retain(usize),
    /// Drop the next N chars of the source.
    Delete(usize),
    /// Insert text at the current position.
    Insert(Insertion),
}

impl Operation {
    /// Length consumed from the source (retain/delete) or produced (insert).
    pub(super) fn span_len(&self) -> usize {
        match self {
            Operation::Retain(n) | Operation::Delete(n) => *n,
            Operation::Insert(ins) => ins.char_len(),
        }
    }
}
