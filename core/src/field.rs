//! Search field: the key-driven coordinator.
//!
//! `SearchField` owns the session and the editors and runs every change
//! through one path: recognise markers, derive the next token snapshot,
//! commit text and history, re-project regions, refresh undo/redo
//! availability, then sync the [`FieldView`]. Each step finishes before
//! the next dispatch can start.

use std::fmt;
use std::sync::Arc;

use crate::completion::{is_word_char, Candidate, CompletionContext, CompletionSource};
use crate::editor::{CompletionEditor, Editor, EditorResult, TextEditor};
use crate::entity::{Entity, EntityCatalog};
use crate::history::{UndoRedoCoordinator, UndoRedoState};
use crate::projector::{AtomicRanges, Projector, RemoveAffordance};
use crate::recognizer::{encode_fields, Recognizer};
use crate::session::{FieldMode, FieldSession};
use crate::token::{TokenId, TokenStore};
use crate::transaction::{Bias, Origin, Transaction};
use crate::view::FieldView;
use crate::{Config, QueryEncoding};

/// Key event types the field can process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyEvent {
    /// Character input
    Char(char),
    Backspace,
    Delete,
    Left,
    Right,
    Home,
    End,
    /// Popup highlight up
    Up,
    /// Popup highlight down
    Down,
    PageUp,
    PageDown,
    /// Submit the query, or accept the highlighted completion
    Enter,
    /// Mod-Enter: insert a line break
    ModEnter,
    /// Accept the highlighted completion
    Tab,
    /// Close the popup
    Escape,
    /// Ctrl + character (Ctrl-Space completion, Ctrl-z undo, Ctrl-y redo)
    Ctrl(char),
}

/// Result of processing a key event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyResult {
    /// Key was handled by the field
    Handled,
    /// Key was not handled (pass through to the host)
    NotHandled,
}

/// Structured form of a submitted query.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchQuery {
    /// Visible text, labels only
    pub text: String,
    /// Text with every token written as a `{{id|type|label}}` marker
    pub encoded: String,
    /// Referenced entities in text order
    pub entities: Vec<Arc<Entity>>,
}

impl SearchQuery {
    pub fn payload(&self, encoding: QueryEncoding) -> &str {
        match encoding {
            QueryEncoding::Markers => &self.encoded,
            QueryEncoding::Labels => &self.text,
        }
    }
}

pub type SearchObserver = Box<dyn FnMut(&str)>;

pub struct SearchField {
    config: Config,
    source: CompletionSource,
    recognizer: Recognizer,
    projector: Projector,

    text_editor: TextEditor,
    completion_editor: CompletionEditor,

    session: FieldSession,
    coordinator: UndoRedoCoordinator,
    view: FieldView,

    on_search: Option<SearchObserver>,
}

impl SearchField {
    pub fn new(catalog: EntityCatalog, config: Config) -> Self {
        let source = CompletionSource::new(
            catalog.clone(),
            config.keywords.clone(),
            config.max_cache_size,
        );
        let mut field = Self {
            source,
            recognizer: Recognizer::new(catalog),
            projector: Projector::new(config.type_registry()),
            text_editor: TextEditor::new(),
            completion_editor: CompletionEditor::new(),
            session: FieldSession::new(config.max_history, config.page_size),
            coordinator: UndoRedoCoordinator::new(),
            view: FieldView::new(),
            on_search: None,
            config,
        };
        field.sync_view();
        field
    }

    /// A field preloaded with `text`. Literal markers in it become tokens;
    /// the import itself is not undoable.
    pub fn with_text(catalog: EntityCatalog, config: Config, text: &str) -> Self {
        let mut field = Self::new(catalog, config);
        let tx = field
            .recognizer
            .import(text)
            .into_transaction(field.session.buffer().len(), 0);
        field.dispatch(tx);
        field.session.buffer_mut().history_mut().clear();
        field.coordinator.refresh(field.session.buffer().history());
        field.sync_view();
        field
    }

    /// Registers the callback fired with the query payload on search.
    pub fn on_search(&mut self, observer: impl FnMut(&str) + 'static) {
        self.on_search = Some(Box::new(observer));
    }

    /// Registers the callback fired with undo/redo availability after every
    /// transaction.
    pub fn on_update(&mut self, observer: impl FnMut(UndoRedoState) + 'static) {
        self.coordinator.set_observer(observer);
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn catalog(&self) -> &EntityCatalog {
        self.source.catalog()
    }

    pub fn completion_source(&self) -> &CompletionSource {
        &self.source
    }

    pub fn view(&self) -> &FieldView {
        &self.view
    }

    pub fn session(&self) -> &FieldSession {
        &self.session
    }

    pub fn text(&self) -> String {
        self.session.buffer().text()
    }

    pub fn cursor(&self) -> usize {
        self.session.buffer().cursor()
    }

    pub fn tokens(&self) -> &TokenStore {
        self.session.tokens()
    }

    pub fn ranges(&self) -> &AtomicRanges {
        self.session.ranges()
    }

    pub fn can_undo(&self) -> bool {
        self.coordinator.state().can_undo
    }

    pub fn can_redo(&self) -> bool {
        self.coordinator.state().can_redo
    }

    /// Candidates of the open popup.
    pub fn completions(&self) -> &[Candidate] {
        self.session.popup().candidates()
    }

    /// Process a key event and update the view.
    ///
    /// Returns `KeyResult::NotHandled` when the host should handle the key.
    pub fn process_key(&mut self, key: KeyEvent) -> KeyResult {
        let result = match self.session.mode() {
            FieldMode::Completing if self.completion_editor.can_handle(&key) => {
                let result = self.completion_editor.process_key(&key, &mut self.session);
                if result.is_pass_through() {
                    self.text_editor.process_key(&key, &mut self.session)
                } else {
                    result
                }
            }
            FieldMode::Completing | FieldMode::Editing => {
                self.text_editor.process_key(&key, &mut self.session)
            }
        };

        let handled = self.handle_result(key, result);
        self.sync_view();
        handled
    }

    fn handle_result(&mut self, key: KeyEvent, result: EditorResult) -> KeyResult {
        match result {
            EditorResult::Handled => {}
            EditorResult::Dispatch(tx) => {
                let popup_open = self.session.popup().is_open();
                self.dispatch(tx);

                let typed_word = matches!(key, KeyEvent::Char(ch) if is_word_char(ch));
                let editing_word = matches!(
                    key,
                    KeyEvent::Char(_) | KeyEvent::Backspace | KeyEvent::Delete
                );
                // Only Ctrl-Space is explicit; a re-query while typing is not.
                if popup_open && editing_word {
                    self.complete(false);
                } else if typed_word && self.config.activate_on_typing {
                    self.complete(false);
                }
            }
            EditorResult::Commit(tx) => self.dispatch(tx),
            EditorResult::Search => {
                self.search();
            }
            EditorResult::Undo => {
                self.undo();
            }
            EditorResult::Redo => {
                self.redo();
            }
            EditorResult::OpenCompletion { explicit } => {
                self.complete(explicit);
            }
            EditorResult::ModeSwitch(FieldMode::Editing) => {
                self.session.close_popup();
            }
            EditorResult::ModeSwitch(mode) => self.session.set_mode(mode),
            EditorResult::PassThrough => return KeyResult::NotHandled,
        }
        KeyResult::Handled
    }

    /// Applies one transaction through the whole pipeline.
    ///
    /// Literal markers typed or pasted into the changed lines are rewritten
    /// into tokens within the same transaction, so they undo together.
    pub fn dispatch(&mut self, tx: Transaction) {
        if tx.is_noop() {
            return;
        }

        let tx = self.recognize(tx);
        let before = self.session.tokens().clone();
        let after = before.apply(&tx);
        tracing::debug!(
            origin = ?tx.origin(),
            changed = tx.changes_text(),
            effects = tx.effects().len(),
            tokens = after.len(),
            "dispatch"
        );

        self.session.buffer_mut().commit(&tx, &before, &after);
        self.session.set_tokens(after, &self.projector);
        let cursor = self
            .session
            .ranges()
            .snap(self.session.buffer().cursor(), Bias::Right);
        self.session.buffer_mut().set_cursor(cursor);
        self.session.close_popup();

        self.coordinator.refresh(self.session.buffer().history());
        self.sync_view();
    }

    fn recognize(&self, tx: Transaction) -> Transaction {
        let scan = self.config.recognize_literals
            && tx.changes_text()
            && matches!(tx.origin(), Origin::Input | Origin::Completion);
        if !scan {
            return tx;
        }

        let mut doc = self.session.buffer().doc().clone();
        tx.changes().apply(&mut doc);
        let tokens = self.session.tokens().apply(&tx);
        match self.recognizer.recognize(&doc, tx.changes(), &tokens) {
            Some(rewrite) => tx.compose(rewrite),
            None => tx,
        }
    }

    /// Inserts `text` at the caret as one edit.
    pub fn paste(&mut self, text: &str) {
        if text.is_empty() {
            return;
        }
        let buffer = self.session.buffer();
        let cursor = buffer.cursor();
        let tx = Transaction::insert(buffer.len(), cursor, text)
            .with_cursor(cursor + text.chars().count())
            .with_origin(Origin::Input);
        self.dispatch(tx);
    }

    /// Places the caret, snapping out of any region to its nearer edge.
    pub fn set_cursor(&mut self, pos: usize) {
        let pos = pos.min(self.session.buffer().len());
        let pos = match self.session.ranges().region_at(pos) {
            Some(region) if pos - region.span.from < region.span.to - pos => region.span.from,
            Some(region) => region.span.to,
            None => pos,
        };
        self.session.buffer_mut().set_cursor(pos);
        self.session.close_popup();
        self.sync_view();
    }

    /// Removes the region of token `id`. Returns false when it is gone.
    pub fn remove_region(&mut self, id: TokenId) -> bool {
        self.activate_remove(&RemoveAffordance::new(id))
    }

    pub fn activate_remove(&mut self, remove: &RemoveAffordance) -> bool {
        let doc_len = self.session.buffer().len();
        match remove.activate(self.session.tokens(), doc_len) {
            Some(tx) => {
                self.dispatch(tx);
                true
            }
            None => {
                tracing::debug!(token = %remove.token, "remove affordance for a token that no longer exists");
                false
            }
        }
    }

    /// Queries completions for the word before the caret and opens the
    /// popup when there are any. Returns the number of candidates.
    pub fn complete(&mut self, explicit: bool) -> usize {
        let buffer = self.session.buffer();
        let cursor = buffer.cursor();
        let floor = self.session.ranges().floor(cursor);
        let ctx = CompletionContext::at(buffer.doc(), cursor, explicit, floor);
        let candidates = self.source.query(&ctx);
        let count = candidates.len();

        self.session.popup_mut().open(ctx.fragment, explicit, candidates);
        let mode = if self.session.popup().is_open() {
            FieldMode::Completing
        } else {
            FieldMode::Editing
        };
        self.session.set_mode(mode);
        self.sync_view();
        count
    }

    /// Accepts candidate `index` of the open popup.
    pub fn accept_completion(&mut self, index: usize) -> bool {
        let popup = self.session.popup();
        let Some(candidate) = popup.candidates().get(index) else {
            return false;
        };
        let tx = candidate.apply(self.session.buffer().len(), popup.fragment());
        self.dispatch(tx);
        true
    }

    pub fn undo(&mut self) -> bool {
        let Some(tx) = self.session.buffer_mut().history_mut().undo() else {
            return false;
        };
        tracing::debug!("undo");
        self.dispatch(tx);
        true
    }

    pub fn redo(&mut self) -> bool {
        let Some(tx) = self.session.buffer_mut().history_mut().redo() else {
            return false;
        };
        tracing::debug!("redo");
        self.dispatch(tx);
        true
    }

    /// The current query in both encodings.
    pub fn search_query(&self) -> SearchQuery {
        let doc = self.session.buffer().doc();
        let mut encoded = String::with_capacity(doc.len_bytes());
        let mut entities = Vec::with_capacity(self.tokens().len());
        let mut pos = 0;

        for token in self.tokens().iter() {
            encoded.extend(doc.slice(pos..token.span.from).chunks());
            let label = doc.slice(token.span.range()).to_string();
            encoded.push_str(&encode_fields(&token.entity.id, &token.entity.kind, &label));
            entities.push(Arc::clone(&token.entity));
            pos = token.span.to;
        }
        encoded.extend(doc.slice(pos..).chunks());

        SearchQuery {
            text: doc.to_string(),
            encoded,
            entities,
        }
    }

    /// Submits the query: fires the search callback with the payload in the
    /// configured encoding and returns it.
    pub fn search(&mut self) -> String {
        let query = self.search_query();
        let payload = query.payload(self.config.query_encoding).to_string();
        tracing::debug!(entities = query.entities.len(), "search");
        if let Some(observer) = self.on_search.as_mut() {
            observer(&payload);
        }
        payload
    }

    fn sync_view(&mut self) {
        self.session.sync_to_view(&mut self.view, &self.projector);
        let state = self.coordinator.state();
        self.view.can_undo = state.can_undo;
        self.view.can_redo = state.can_redo;
    }
}

impl fmt::Debug for SearchField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SearchField")
            .field("text", &self.text())
            .field("cursor", &self.cursor())
            .field("tokens", &self.tokens().len())
            .field("mode", &self.session.mode())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recognizer::find_markers;
    use crate::token::Span;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn catalog() -> EntityCatalog {
        EntityCatalog::new(vec![
            Entity::new("Q1", "Place", "Rome").with_alternatives(["Roma"]),
            Entity::new("Q2", "Place", "Paris").with_alternatives(["City of Light"]),
            Entity::new("Q3", "Group", "Romans"),
        ])
    }

    fn field() -> SearchField {
        SearchField::new(catalog(), Config::default())
    }

    fn type_str(field: &mut SearchField, text: &str) {
        for ch in text.chars() {
            field.process_key(KeyEvent::Char(ch));
        }
    }

    #[test]
    fn test_typing_opens_popup() {
        let mut field = field();
        type_str(&mut field, "ro");
        assert_eq!(field.text(), "ro");
        assert_eq!(field.session().mode(), FieldMode::Completing);
        let labels: Vec<_> = field.completions().iter().map(Candidate::label).collect();
        assert_eq!(labels, vec!["Rome", "Romans"]);
        assert!(field.view().completion_open);
        assert!(field.view().completions[0].selected);
    }

    #[test]
    fn test_accept_with_enter_registers_token() {
        let mut field = field();
        type_str(&mut field, "ro");
        assert_eq!(field.process_key(KeyEvent::Enter), KeyResult::Handled);

        assert_eq!(field.text(), "Rome");
        assert_eq!(field.cursor(), 4);
        assert_eq!(field.tokens().len(), 1);
        assert_eq!(field.tokens().tokens()[0].span, Span::new(0, 4));
        assert_eq!(field.session().mode(), FieldMode::Editing);
        assert_eq!(field.view().regions[0].icon, "map-pin");
    }

    #[test]
    fn test_enter_without_popup_searches() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let mut field = field();
        let sink = Rc::clone(&seen);
        field.on_search(move |query| sink.borrow_mut().push(query.to_string()));

        type_str(&mut field, "ro");
        field.process_key(KeyEvent::Enter);
        field.process_key(KeyEvent::Char(' '));
        field.process_key(KeyEvent::Enter);

        assert_eq!(seen.borrow().as_slice(), ["{{Q1|Place|Rome}} "]);
        let found = find_markers(&seen.borrow()[0]);
        assert_eq!(found[0].id, "Q1");
    }

    #[test]
    fn test_labels_encoding() {
        let config = Config {
            query_encoding: QueryEncoding::Labels,
            ..Config::default()
        };
        let mut field = SearchField::with_text(catalog(), config, "near {{Q1|Place|Rome}}");
        assert_eq!(field.search(), "near Rome");
        assert_eq!(field.search_query().entities[0].id, "Q1");
    }

    #[test]
    fn test_typing_after_explicit_completion_is_implicit() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let mut field = field();
        let sink = Rc::clone(&seen);
        field.on_search(move |query| sink.borrow_mut().push(query.to_string()));

        field.process_key(KeyEvent::Ctrl(' '));
        assert!(field.session().popup().is_explicit());
        type_str(&mut field, "r");
        assert!(field.session().popup().is_open());
        assert!(!field.session().popup().is_explicit());

        field.process_key(KeyEvent::Char(' '));
        assert!(!field.view().completion_open);
        assert_eq!(field.session().mode(), FieldMode::Editing);

        field.process_key(KeyEvent::Enter);
        assert_eq!(field.text(), "r ");
        assert!(field.tokens().is_empty());
        assert_eq!(seen.borrow().as_slice(), ["r "]);
    }

    #[test]
    fn test_backspace_to_empty_fragment_closes_popup() {
        let mut field = field();
        field.process_key(KeyEvent::Ctrl(' '));
        type_str(&mut field, "r");
        field.process_key(KeyEvent::Backspace);
        assert_eq!(field.text(), "");
        assert!(!field.view().completion_open);
    }

    #[test]
    fn test_escape_closes_popup() {
        let mut field = field();
        type_str(&mut field, "ro");
        field.process_key(KeyEvent::Escape);
        assert!(!field.view().completion_open);
        field.process_key(KeyEvent::Enter);
        assert_eq!(field.text(), "ro");
    }

    #[test]
    fn test_non_word_char_closes_popup() {
        let mut field = field();
        type_str(&mut field, "ro ");
        assert!(!field.session().popup().is_open());
        assert_eq!(field.session().mode(), FieldMode::Editing);
    }

    #[test]
    fn test_explicit_completion_on_empty_fragment() {
        let mut field = field();
        field.process_key(KeyEvent::Ctrl(' '));
        assert_eq!(field.completions().len(), 6);
        field.process_key(KeyEvent::Down);
        field.process_key(KeyEvent::Tab);
        assert_eq!(field.text(), "Paris");
    }

    #[test]
    fn test_typing_after_region_does_not_join() {
        let mut field = field();
        type_str(&mut field, "ro");
        field.process_key(KeyEvent::Enter);
        type_str(&mut field, "x");
        assert_eq!(field.text(), "Romex");
        assert_eq!(field.tokens().tokens()[0].span, Span::new(0, 4));
        assert!(!field.session().popup().is_open());
    }

    #[test]
    fn test_backspace_removes_region_and_undo_restores() {
        let mut field = field();
        type_str(&mut field, "ro");
        field.process_key(KeyEvent::Enter);
        let id = field.tokens().tokens()[0].id;

        field.process_key(KeyEvent::Backspace);
        assert_eq!(field.text(), "");
        assert!(field.tokens().is_empty());

        field.process_key(KeyEvent::Ctrl('z'));
        assert_eq!(field.text(), "Rome");
        assert_eq!(field.tokens().tokens()[0].id, id);
        assert_eq!(field.cursor(), 4);

        field.process_key(KeyEvent::Ctrl('y'));
        assert_eq!(field.text(), "");
        assert!(field.tokens().is_empty());
    }

    #[test]
    fn test_remove_region_and_update_callback() {
        let states = Rc::new(RefCell::new(Vec::new()));
        let mut field = SearchField::with_text(catalog(), Config::default(), "a {{Q2|Place|Paris}} b");
        let sink = Rc::clone(&states);
        field.on_update(move |state| sink.borrow_mut().push(state));
        assert!(!field.can_undo());

        let remove = field.view().regions[0].remove;
        assert!(field.activate_remove(&remove));
        assert_eq!(field.text(), "a  b");
        assert!(field.tokens().is_empty());
        assert!(field.can_undo());
        assert_eq!(states.borrow().last().map(|s| s.can_undo), Some(true));
        assert!(!field.activate_remove(&remove));
    }

    #[test]
    fn test_pasted_marker_is_recognized() {
        let mut field = field();
        field.paste("x {{Q3|Group|Romans}}");
        assert_eq!(field.text(), "x Romans");
        assert_eq!(field.tokens().tokens()[0].span, Span::new(2, 8));
        assert_eq!(field.cursor(), 8);

        field.undo();
        assert_eq!(field.text(), "");
        assert!(field.tokens().is_empty());
    }

    #[test]
    fn test_recognition_can_be_disabled() {
        let config = Config {
            recognize_literals: false,
            ..Config::default()
        };
        let mut field = SearchField::new(catalog(), config);
        field.paste("{{Q1|Place|Rome}}");
        assert!(field.tokens().is_empty());
        assert_eq!(field.text(), "{{Q1|Place|Rome}}");
    }

    #[test]
    fn test_set_cursor_snaps_to_nearer_edge() {
        let mut field = SearchField::with_text(catalog(), Config::default(), "{{Q3|Group|Romans}}");
        field.set_cursor(1);
        assert_eq!(field.cursor(), 0);
        field.set_cursor(4);
        assert_eq!(field.cursor(), 6);
    }

    #[test]
    fn test_fragment_stops_at_region() {
        let mut field = SearchField::with_text(catalog(), Config::default(), "{{Q1|Place|Rome}}");
        assert_eq!(field.complete(false), 0);
        assert_eq!(field.complete(true), 6);
    }

    #[test]
    fn test_mod_enter_inserts_newline() {
        let mut field = field();
        type_str(&mut field, "a");
        field.process_key(KeyEvent::ModEnter);
        assert_eq!(field.text(), "a\n");
    }

    #[test]
    fn test_unhandled_keys() {
        let mut field = field();
        assert_eq!(field.process_key(KeyEvent::Backspace), KeyResult::NotHandled);
        assert_eq!(field.process_key(KeyEvent::Tab), KeyResult::NotHandled);
        assert_eq!(field.process_key(KeyEvent::Ctrl('q')), KeyResult::NotHandled);
    }
}
