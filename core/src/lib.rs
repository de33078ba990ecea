//! searchfield-core
//!
//! Entity tokens for free-text query fields: substrings promoted to atomic
//! references to catalog entities, kept consistent with the text across
//! edits, completion, removal and undo/redo.
//!
//! Public API:
//! - `Transaction` / `ChangeSet` - one indivisible edit plus its token effects
//! - `TokenStore` - immutable snapshot of live token spans
//! - `Projector` / `AtomicRanges` - caret-opaque regions and their payload
//! - `CompletionSource` - catalog filtering for the word under the caret
//! - `Recognizer` - literal `{{id|type|label}}` markers
//! - `History` / `UndoRedoCoordinator` - undo stack and availability
//! - `SearchField` - the key-driven coordinator tying everything together
//! - `Config` - configuration and feature flags
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub mod transaction;
pub use transaction::{Bias, Change, ChangeSet, Effect, Origin, Registration, Transaction};

pub mod entity;
pub use entity::{Entity, EntityCatalog};

pub mod registry;
pub use registry::{default_type_styles, TypeRegistry, TypeStyle};

pub mod token;
pub use token::{PositionLookup, Span, Token, TokenId, TokenStore};

pub mod remap;
pub use remap::remap;

pub mod projector;
pub use projector::{AtomicRange, AtomicRanges, Projector, RegionPayload, RemoveAffordance};

pub mod recognizer;
pub use recognizer::{encode_fields, encode_marker, find_markers, Imported, LiteralMatch, Recognizer};

pub mod completion;
pub use completion::{is_word_char, Candidate, CompletionContext, CompletionSource};

pub mod popup;
pub use popup::CompletionPopup;

pub mod buffer;
pub use buffer::Buffer;

pub mod history;
pub use history::{Direction, History, Revision, UndoRedoCoordinator, UndoRedoState};

pub mod view;
pub use view::{CandidateView, FieldView, RegionView};

pub mod session;
pub use session::{FieldMode, FieldSession};

pub mod editor;
pub use editor::{CompletionEditor, Editor, EditorResult, TextEditor};

pub mod field;
pub use field::{KeyEvent, KeyResult, SearchField, SearchQuery};

/// How `SearchField::search` serialises tokens into the query string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum QueryEncoding {
    /// Each token becomes a `{{id|type|label}}` marker.
    #[default]
    Markers,
    /// The visible text only.
    Labels,
}

/// Configuration for the search field core.
///
/// Every field has a default, so a TOML file only needs the keys it changes.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    /// Open the completion popup while typing a word (not only on Ctrl-Space)
    pub activate_on_typing: bool,

    /// Number of candidates per popup page
    pub page_size: usize,

    /// Maximum number of entries in the fragment -> matches cache
    pub max_cache_size: usize,

    /// Maximum number of undo steps kept; older ones are dropped
    pub max_history: usize,

    /// Rewrite literal markers typed or pasted into the field into tokens
    pub recognize_literals: bool,

    /// Payload format handed to the search callback
    pub query_encoding: QueryEncoding,

    /// Plain (non-entity) completions offered after entity candidates
    pub keywords: Vec<String>,

    /// Rendering style per entity type
    pub types: BTreeMap<String, TypeStyle>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            activate_on_typing: true,
            page_size: 8,
            max_cache_size: 256,
            max_history: 100,
            recognize_literals: true,
            query_encoding: QueryEncoding::Markers,
            keywords: vec!["AND".to_string(), "OR".to_string(), "NOT".to_string()],
            types: default_type_styles(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load_toml<P: AsRef<std::path::Path>>(path: P) -> anyhow::Result<Self> {
        use anyhow::Context;
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        let config: Config =
            toml::from_str(&content).with_context(|| format!("parsing config {}", path.display()))?;
        Ok(config)
    }

    /// Save configuration to a TOML file.
    pub fn save_toml<P: AsRef<std::path::Path>>(&self, path: P) -> anyhow::Result<()> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Load configuration from TOML string.
    pub fn from_toml_str(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    /// Serialize configuration to TOML string.
    pub fn to_toml_string(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }

    /// Registry built from the configured type styles.
    pub fn type_registry(&self) -> TypeRegistry {
        TypeRegistry::from_styles(self.types.clone())
    }
}

/// Utility helpers.
pub mod utils {
    use unicode_normalization::UnicodeNormalization;

    /// Normalize input strings (NFC) and trim whitespace.
    pub fn normalize(s: &str) -> String {
        s.nfc().collect::<String>().trim().to_string()
    }

    /// Case-folded NFC form used for substring matching.
    pub fn fold_case(s: &str) -> String {
        s.nfc().collect::<String>().to_lowercase()
    }
}
