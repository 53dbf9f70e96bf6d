//! Design-system editing session
//!
//! Ties the text source, the structural parser and the patch engine together:
//! every snapshot change is re-parsed synchronously, edits are addressed by
//! token name or selector, and undo/redo follow stack discipline.

mod config;
mod document;
mod session;

pub use config::Config;
pub use document::{Document, SubscriptionId, TextDiff};
pub use session::Session;

pub use dse_css::{Layer, ParsedModel, ParserOptions, Selection};
pub use dse_patch::{Change, ChangeId, ChangeKind, ChangeTarget, PatchError};

/// Engine version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Session error
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("token `{0}` not found")]
    TokenNotFound(String),

    #[error("token `{name}` not found in scope `{scope}`")]
    TokenNotInScope { scope: String, name: String },

    #[error("rule `{0}` not found")]
    RuleNotFound(String),

    #[error("rule `{selector}` has no `{property}` declaration")]
    PropertyNotFound { selector: String, property: String },

    #[error("Patch error: {0}")]
    Patch(#[from] PatchError),

    #[error("Config error: {0}")]
    Config(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
