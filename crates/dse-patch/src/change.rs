//! Change records

use std::fmt;
use std::ops::Range;

use serde::{Deserialize, Serialize};

/// Session-local change id, increasing in commit order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChangeId(pub u64);

impl fmt::Display for ChangeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "change-{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeKind {
    Token,
    Property,
}

/// What an edit touched
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ChangeTarget {
    Token { token_name: String },
    Property { selector: String, property_name: String },
}

/// One committed edit. Never mutated once created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Change {
    pub id: ChangeId,
    #[serde(flatten)]
    pub target: ChangeTarget,
    pub old_value: String,
    pub new_value: String,
    /// Milliseconds since the Unix epoch
    pub timestamp_ms: u64,
    /// Range the new value occupies in the text the edit produced
    #[serde(default)]
    pub applied_range: Option<Range<usize>>,
}

impl Change {
    pub fn kind(&self) -> ChangeKind {
        match self.target {
            ChangeTarget::Token { .. } => ChangeKind::Token,
            ChangeTarget::Property { .. } => ChangeKind::Property,
        }
    }

    /// Token name, or `selector property`
    pub fn label(&self) -> String {
        match &self.target {
            ChangeTarget::Token { token_name } => token_name.clone(),
            ChangeTarget::Property {
                selector,
                property_name,
            } => format!("{selector} {property_name}"),
        }
    }
}

pub(crate) fn current_time_ms() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}
