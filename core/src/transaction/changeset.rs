use std::ops::Range;

use ropey::Rope;

use super::types::{Bias, Change, Insertion, Operation};

/// A sequence of retain/delete/insert operations describing one edit of a
/// document of `len` chars that produces a document of `len_after` chars.
///
/// Insertions are kept ahead of deletions at the same position, so a
/// replacement always reads `Insert, Delete`.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ChangeSet {
    changes: Vec<Operation>,
    len: usize,
    len_after: usize,
}

impl ChangeSet {
    /// A changeset that keeps a document of `len` chars untouched.
    pub fn identity(len: usize) -> Self {
        let mut cs = Self::default();
        cs.retain(len);
        cs
    }

    /// Builds a changeset from replacements against a document of
    /// `doc_len` chars.
    ///
    /// Changes are sorted by start; ranges are clamped to the document and
    /// a change starting inside the previous one is clipped to its end.
    pub fn from_changes<I>(doc_len: usize, changes: I) -> Self
    where
        I: IntoIterator<Item = Change>,
    {
        let mut changes: Vec<Change> = changes.into_iter().collect();
        changes.sort_by_key(|c| (c.start, c.end));

        let mut cs = Self::default();
        let mut pos = 0;
        for change in changes {
            let start = change.start.clamp(pos, doc_len);
            let end = change.end.clamp(start, doc_len);
            cs.retain(start - pos);
            cs.insert(change.text);
            cs.delete(end - start);
            pos = end;
        }
        cs.retain(doc_len - pos);
        cs
    }

    /// Length of the document this changeset applies to.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Length of the document after applying.
    pub fn len_after(&self) -> usize {
        self.len_after
    }

    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    /// True when applying leaves the document unchanged.
    pub fn is_identity(&self) -> bool {
        self.changes
            .iter()
            .all(|op| matches!(op, Operation::Retain(_)))
    }

    pub fn operations(&self) -> &[Operation] {
        &self.changes
    }

    pub(crate) fn retain(&mut self, n: usize) {
        if n == 0 {
            return;
        }

        self.len += n;
        self.len_after += n;

        if let Some(Operation::Retain(count)) = self.changes.last_mut() {
            *count += n;
        } else {
            self.changes.push(Operation::Retain(n));
        }
    }

    pub(crate) fn delete(&mut self, n: usize) {
        if n == 0 {
            return;
        }

        self.len += n;

        if let Some(Operation::Delete(count)) = self.changes.last_mut() {
            *count += n;
        } else {
            self.changes.push(Operation::Delete(n));
        }
    }

    pub(crate) fn insert(&mut self, text: String) {
        if text.is_empty() {
            return;
        }
        self.push_insertion(Insertion::new(text));
    }

    fn push_insertion(&mut self, ins: Insertion) {
        if ins.char_len() == 0 {
            return;
        }

        self.len_after += ins.char_len();

        match self.changes.as_mut_slice() {
            [.., Operation::Insert(prev)] | [.., Operation::Insert(prev), Operation::Delete(_)] => {
                prev.push(&ins);
            }
            [.., last @ Operation::Delete(_)] => {
                let del = std::mem::replace(last, Operation::Insert(ins));
                self.changes.push(del);
            }
            _ => self.changes.push(Operation::Insert(ins)),
        }
    }

    /// Applies the changes to `doc` in place.
    pub fn apply(&self, doc: &mut Rope) {
        debug_assert_eq!(doc.len_chars(), self.len);

        let mut pos = 0;
        for op in &self.changes {
            match op {
                Operation::Retain(n) => pos += n,
                Operation::Delete(n) => doc.remove(pos..pos + n),
                Operation::Insert(ins) => {
                    doc.insert(pos, ins.text());
                    pos += ins.char_len();
                }
            }
        }
    }

    /// Builds the changeset that undoes `self`. `doc` is the document as it
    /// was before `self` applied.
    pub fn invert(&self, doc: &Rope) -> ChangeSet {
        let mut inverse = ChangeSet::default();

        let mut pos = 0;
        for op in &self.changes {
            match op {
                Operation::Retain(n) => {
                    inverse.retain(*n);
                    pos += n;
                }
                Operation::Delete(n) => {
                    inverse.insert(doc.slice(pos..pos + n).to_string());
                    pos += n;
                }
                Operation::Insert(ins) => inverse.delete(ins.char_len()),
            }
        }

        inverse
    }

    /// Maps a position of the old document into the new one.
    ///
    /// Positions inside a replaced range land before the replacement text
    /// with [`Bias::Left`] and after it with [`Bias::Right`]; the same holds
    /// for positions sitting exactly on an insertion point.
    pub fn map_pos(&self, pos: usize, bias: Bias) -> usize {
        let mut old_pos = 0;
        let mut new_pos = 0;

        let mut ops = self.changes.iter().peekable();
        while let Some(op) = ops.next() {
            if old_pos > pos {
                break;
            }

            match op {
                Operation::Retain(n) => {
                    if old_pos + n > pos {
                        return new_pos + (pos - old_pos);
                    }
                    old_pos += n;
                    new_pos += n;
                }
                Operation::Delete(n) => {
                    if old_pos + n > pos {
                        return new_pos;
                    }
                    old_pos += n;
                }
                Operation::Insert(ins) => {
                    let replaced = match ops.peek() {
                        Some(Operation::Delete(n)) => *n,
                        _ => 0,
                    };
                    let inside = pos > old_pos && pos < old_pos + replaced;
                    if bias == Bias::Left && inside {
                        return new_pos;
                    }
                    if !(bias == Bias::Left && old_pos == pos) {
                        new_pos += ins.char_len();
                    }
                }
            }
        }

        new_pos + (pos - old_pos)
    }

    /// Regions of the new document touched by this changeset: inserted
    /// text, and empty ranges where text was only deleted. Adjacent
    /// regions are merged.
    pub fn changed_ranges(&self) -> Vec<Range<usize>> {
        let mut ranges: Vec<Range<usize>> = Vec::new();
        let mut new_pos = 0;

        for op in &self.changes {
            let range = match op {
                Operation::Retain(n) => {
                    new_pos += n;
                    continue;
                }
                Operation::Delete(_) => new_pos..new_pos,
                Operation::Insert(ins) => {
                    let start = new_pos;
                    new_pos += ins.char_len();
                    start..new_pos
                }
            };
            match ranges.last_mut() {
                Some(last) if last.end >= range.start => last.end = last.end.max(range.end),
                _ => ranges.push(range),
            }
        }

        ranges
    }

    /// Composes `self` with `other`, which must apply to the document
    /// `self` produces. The result is equivalent to applying both in turn.
    pub fn compose(self, other: ChangeSet) -> ChangeSet {
        debug_assert_eq!(self.len_after, other.len);

        let mut result = ChangeSet::default();
        let mut a_ops = self.changes.into_iter();
        let mut b_ops = other.changes.into_iter();
        let mut a = a_ops.next();
        let mut b = b_ops.next();

        loop {
            match (a.take(), b.take()) {
                (None, None) => break,
                (Some(Operation::Delete(n)), head_b) => {
                    result.delete(n);
                    a = a_ops.next();
                    b = head_b;
                }
                (head_a, Some(Operation::Insert(ins))) => {
                    result.push_insertion(ins);
                    a = head_a;
                    b = b_ops.next();
                }
                (None, Some(_)) | (Some(_), None) => {
                    debug_assert!(false, "composed changesets have mismatched lengths");
                    break;
                }
                (Some(Operation::Retain(n)), Some(Operation::Retain(m))) => {
                    let k = n.min(m);
                    result.retain(k);
                    a = rest(Operation::Retain(n - k), &mut a_ops);
                    b = rest(Operation::Retain(m - k), &mut b_ops);
                }
                (Some(Operation::Retain(n)), Some(Operation::Delete(m))) => {
                    let k = n.min(m);
                    result.delete(k);
                    a = rest(Operation::Retain(n - k), &mut a_ops);
                    b = rest(Operation::Delete(m - k), &mut b_ops);
                }
                (Some(Operation::Insert(ins)), Some(Operation::Retain(m))) => {
                    let k = ins.char_len().min(m);
                    let (head, tail) = ins.split_at(k);
                    result.push_insertion(head);
                    a = rest(Operation::Insert(tail), &mut a_ops);
                    b = rest(Operation::Retain(m - k), &mut b_ops);
                }
                (Some(Operation::Insert(ins)), Some(Operation::Delete(m))) => {
                    let k = ins.char_len().min(m);
                    let (_, tail) = ins.split_at(k);
                    a = rest(Operation::Insert(tail), &mut a_ops);
                    b = rest(Operation::Delete(m - k), &mut b_ops);
                }
            }
        }

        result
    }
}

/// Returns `op` if it still has length left, otherwise the next operation.
fn rest(op: Operation, ops: &mut impl Iterator<Item = Operation>) -> Option<Operation> {
    if op.span_len() > 0 {
        Some(op)
    } else {
        ops.next()
    }
}
