//! Literal entity markers embedded in plain text.
//!
//! A marker is `{{id|type|label}}` on a single line, each field non-empty,
//! with `\`, `|`, `{` and `}` escaped by a backslash. The same format is
//! what [`encode_marker`] writes into search payloads.
//!
//! Recognition never creates a second source of truth: every marker found
//! is rewritten into its label plus a token registration, and the token
//! store takes it from there.

use once_cell::sync::Lazy;
use regex::Regex;
use ropey::Rope;
use std::ops::Range;
use std::sync::Arc;

use crate::entity::{Entity, EntityCatalog};
use crate::token::{Span, TokenStore};
use crate::transaction::{Change, ChangeSet, Origin, Registration, Transaction};

static MARKER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\{\{((?:[^\\|{}\n]|\\.)+)\|((?:[^\\|{}\n]|\\.)+)\|((?:[^\\|{}\n]|\\.)+)\}\}")
        .expect("marker pattern is valid")
});

/// A marker found in text. `span` is in chars, relative to the scanned text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LiteralMatch {
    pub span: Span,
    pub id: String,
    pub kind: String,
    pub label: String,
}

fn escape_field(field: &str, out: &mut String) {
    for ch in field.chars() {
        if matches!(ch, '\\' | '|' | '{' | '}') {
            out.push('\\');
        }
        out.push(ch);
    }
}

fn unescape_field(field: &str) -> String {
    let mut out = String::with_capacity(field.len());
    let mut chars = field.chars();
    while let Some(ch) = chars.next() {
        if ch == '\\' {
            if let Some(next) = chars.next() {
                out.push(next);
            }
        } else {
            out.push(ch);
        }
    }
    out
}

/// Serialises an entity reference as a literal marker.
pub fn encode_marker(entity: &Entity) -> String {
    encode_fields(&entity.id, &entity.kind, &entity.label)
}

/// Marker for an id/type pair shown with `label`.
pub fn encode_fields(id: &str, kind: &str, label: &str) -> String {
    let mut out = String::with_capacity(id.len() + kind.len() + label.len() + 6);
    out.push_str("{{");
    escape_field(id, &mut out);
    out.push('|');
    escape_field(kind, &mut out);
    out.push('|');
    escape_field(label, &mut out);
    out.push_str("}}");
    out
}

/// Finds every well-formed marker in `text`. Malformed ones are ignored.
pub fn find_markers(text: &str) -> Vec<LiteralMatch> {
    let mut matches = Vec::new();
    let mut char_pos = 0;
    let mut byte_pos = 0;

    for caps in MARKER.captures_iter(text) {
        let Some(whole) = caps.get(0) else { continue };
        char_pos += text[byte_pos..whole.start()].chars().count();
        let from = char_pos;
        char_pos += whole.as_str().chars().count();
        byte_pos = whole.end();

        matches.push(LiteralMatch {
            span: Span::new(from, char_pos),
            id: unescape_field(&caps[1]),
            kind: unescape_field(&caps[2]),
            label: unescape_field(&caps[3]),
        });
    }

    matches
}

/// Text with its markers replaced by labels, plus the registrations for
/// the resulting tokens (relative to the start of `text`).
#[derive(Debug, Clone, Default)]
pub struct Imported {
    pub text: String,
    pub registrations: Vec<Registration>,
}

impl Imported {
    /// A transaction inserting the imported text at `at` in a document of
    /// `doc_len` chars, registering its tokens in the same step.
    pub fn into_transaction(self, doc_len: usize, at: usize) -> Transaction {
        let inserted = self.text.chars().count();
        let tx = Transaction::insert(doc_len, at, self.text)
            .with_cursor(at + inserted)
            .with_origin(Origin::Import);
        self.registrations.into_iter().fold(tx, |tx, reg| {
            tx.register(Span::new(reg.span.from + at, reg.span.to + at), reg.entity)
        })
    }
}

/// Resolves markers against the catalog and rewrites them into tokens.
#[derive(Debug, Clone, Default)]
pub struct Recognizer {
    catalog: EntityCatalog,
}

impl Recognizer {
    pub fn new(catalog: EntityCatalog) -> Self {
        Self { catalog }
    }

    /// The catalog entity with the marker's id, or one built from the
    /// marker itself when the catalog does not know it.
    pub fn resolve(&self, found: &LiteralMatch) -> Arc<Entity> {
        match self.catalog.by_id(&found.id) {
            Some(entity) => Arc::clone(entity),
            None => Arc::new(Entity::new(
                found.id.clone(),
                found.kind.clone(),
                found.label.clone(),
            )),
        }
    }

    /// One-time import of externally supplied text.
    pub fn import(&self, text: &str) -> Imported {
        let mut imported = Imported {
            text: String::with_capacity(text.len()),
            registrations: Vec::new(),
        };
        let mut out_chars = 0;
        let mut rest = text.chars();
        let mut consumed = 0;

        for found in find_markers(text) {
            let plain: String = rest.by_ref().take(found.span.from - consumed).collect();
            out_chars += plain.chars().count();
            imported.text.push_str(&plain);
            rest.by_ref().take(found.span.len()).for_each(drop);
            consumed = found.span.to;

            let entity = self.resolve(&found);
            let label_len = entity.label.chars().count();
            imported.text.push_str(&entity.label);
            imported.registrations.push(Registration {
                span: Span::new(out_chars, out_chars + label_len),
                entity,
            });
            out_chars += label_len;
        }
        imported.text.extend(rest);

        imported
    }

    /// Scans only the lines touched by `changes` in `doc` (the document
    /// after the change) and returns a transaction rewriting any complete
    /// marker there into label + token.
    ///
    /// Markers overlapping tokens in `tokens` are left alone.
    pub fn recognize(&self, doc: &Rope, changes: &ChangeSet, tokens: &TokenStore) -> Option<Transaction> {
        let changed = changes.changed_ranges();
        if changed.is_empty() {
            return None;
        }

        let mut found: Vec<LiteralMatch> = Vec::new();
        for window in line_windows(doc, &changed) {
            let text = doc.slice(window.clone()).to_string();
            for mut m in find_markers(&text) {
                m.span = Span::new(m.span.from + window.start, m.span.to + window.start);
                let touched = changed
                    .iter()
                    .any(|r| m.span.from <= r.end && r.start <= m.span.to);
                let covered = tokens.iter().any(|t| t.span.overlaps(&m.span));
                if touched && !covered {
                    found.push(m);
                }
            }
        }
        if found.is_empty() {
            return None;
        }

        let doc_len = doc.len_chars();
        let mut replacements = Vec::with_capacity(found.len());
        let mut registrations = Vec::with_capacity(found.len());
        let mut removed = 0usize;
        let mut added = 0usize;
        for m in &found {
            let entity = self.resolve(m);
            let label_len = entity.label.chars().count();
            let from = m.span.from + added - removed;
            registrations.push((Span::new(from, from + label_len), Arc::clone(&entity)));
            replacements.push(Change::new(m.span.range(), entity.label.clone()));
            removed += m.span.len();
            added += label_len;
        }

        tracing::debug!(count = found.len(), "recognized literal markers");
        let tx = Transaction::change(doc_len, replacements).with_origin(Origin::Recognize);
        Some(
            registrations
                .into_iter()
                .fold(tx, |tx, (span, entity)| tx.register(span, entity)),
        )
    }
}

/// Whole-line windows around each changed range, merged when they touch.
fn line_windows(doc: &Rope, changed: &[Range<usize>]) -> Vec<Range<usize>> {
    let len = doc.len_chars();
    let mut windows: Vec<Range<usize>> = Vec::new();

    for range in changed {
        let start_line = doc.char_to_line(range.start.min(len));
        let end_line = doc.char_to_line(range.end.min(len));
        let start = doc.line_to_char(start_line);
        let end = if end_line + 1 < doc.len_lines() {
            doc.line_to_char(end_line + 1)
        } else {
            len
        };

        match windows.last_mut() {
            Some(last) if last.end >= start => last.end = last.end.max(end),
            _ => windows.push(start..end),
        }
    }

    windows
}
