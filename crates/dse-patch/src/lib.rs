//! Positional CSS patch engine
//!
//! Turns a token or property edit into an exact byte-range substitution on
//! the current snapshot and keeps a linear change log for undo/redo. Nothing
//! outside the target value range is ever rewritten.
//!
//! Offsets are absolute, so undo and redo are exact inverses only under
//! stack discipline: undo the most recent change on the text it produced.
//! Both re-check the text at the recorded range and refuse to splice when it
//! no longer holds the expected value.

mod change;
mod engine;
mod splice;

use std::ops::Range;

pub use change::{Change, ChangeId, ChangeKind, ChangeTarget};
pub use engine::{PatchEngine, PatchOutcome, Undone};
pub use splice::{TextPatch, apply_patches, splice};

/// Patch failure. Always caller misuse or a stale model, never malformed CSS.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PatchError {
    #[error("line {line} is beyond the end of the text")]
    LineOutOfRange { line: usize },

    #[error("cannot find a declaration of `{name}` on line {line}")]
    DeclarationNotFound { name: String, line: usize },

    #[error("`{name}` on line {line} is at {found:?}, expected {expected:?}: the model is stale")]
    StaleOffsets {
        name: String,
        line: usize,
        expected: Range<usize>,
        found: Range<usize>,
    },

    #[error("text at offset {start} no longer holds `{expected}`")]
    Diverged { start: usize, expected: String },

    #[error("range {start}..{end} is outside the text or splits a character")]
    InvalidRange { start: usize, end: usize },

    #[error("patches overlap at offset {0}")]
    Overlap(usize),

    #[error("value `{0}` is empty or contains `{{`, `}}`, `;`, `/*` or a line break")]
    InvalidValue(String),
}
