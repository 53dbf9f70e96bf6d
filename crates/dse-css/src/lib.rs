//! Design-system CSS model
//!
//! Structural parsing of a stylesheet into design tokens, rules and
//! properties with exact byte offsets, plus cascade resolution for a set of
//! element classes.

mod parser;
mod model;
pub mod cascade;

use serde::{Deserialize, Serialize};

pub use parser::{
    CssParser, DeclarationSpan, Piece, PieceEnd, declarations, line_declarations, line_pieces,
    mask_comments,
};
pub use model::{LayerIndex, ParsedModel, ScopeBucket};
pub use cascade::{
    Breadcrumb, PropertyOverride, Selection, Specificity, breadcrumb, create_selection,
    match_rules, property_override, rules_for_property, selector_matches, specificity, top_rule,
};

/// Parse a stylesheet with the default options. Never fails.
pub fn parse(css: &str) -> ParsedModel {
    CssParser::new().parse(css)
}

/// Cascade layer, set by the most recent `@layer` directive
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Layer {
    Theme,
    Base,
    Components,
    Utilities,
    #[default]
    Other,
}

impl Layer {
    pub const ALL: [Layer; 5] = [
        Layer::Theme,
        Layer::Base,
        Layer::Components,
        Layer::Utilities,
        Layer::Other,
    ];

    /// Layer named by an `@layer` directive. `other` is never named explicitly.
    pub fn from_directive(name: &str) -> Option<Self> {
        match name {
            "theme" => Some(Layer::Theme),
            "base" => Some(Layer::Base),
            "components" => Some(Layer::Components),
            "utilities" => Some(Layer::Utilities),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Layer::Theme => "theme",
            Layer::Base => "base",
            Layer::Components => "components",
            Layer::Utilities => "utilities",
            Layer::Other => "other",
        }
    }
}

impl std::fmt::Display for Layer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Design token: a custom property declared outside any rule body
///
/// `start_char..end_char` is the byte range of the trimmed value in the
/// snapshot the token was parsed from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Token {
    pub name: String,
    pub value: String,
    pub scope: String,
    pub layer: Layer,
    pub start_line: usize,
    pub end_line: usize,
    pub start_char: usize,
    pub end_char: usize,
}

/// Declaration inside a rule body. The range covers the trimmed value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Property {
    pub name: String,
    pub value: String,
    pub start_line: usize,
    pub end_line: usize,
    pub start_char: usize,
    pub end_char: usize,
}

/// Selector block with its properties in declaration order
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Rule {
    pub selector: String,
    pub layer: Layer,
    pub scope: String,
    pub properties: Vec<Property>,
    pub start_line: usize,
    pub end_line: usize,
    pub start_char: usize,
    pub end_char: usize,
    pub is_nested: bool,
}

impl Rule {
    /// First property with exactly this name
    pub fn property(&self, name: &str) -> Option<&Property> {
        self.properties.iter().find(|p| p.name == name)
    }

    /// Whether the rule declares `name` (ASCII case-insensitive)
    pub fn declares(&self, name: &str) -> bool {
        self.properties
            .iter()
            .any(|p| p.name.eq_ignore_ascii_case(name))
    }
}

/// Parser options
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParserOptions {
    /// Selector and scope label of the root scope
    pub root_selector: String,
    /// Selectors that switch to a dark-mode scope (each is its own label)
    pub dark_selectors: Vec<String>,
    /// Scope label used for anything under a media query
    pub media_marker: String,
}

impl Default for ParserOptions {
    fn default() -> Self {
        Self {
            root_selector: ":root".to_string(),
            dark_selectors: vec![".dark".to_string()],
            media_marker: "@media".to_string(),
        }
    }
}

impl ParserOptions {
    /// Blocks with these selectors hold tokens rather than rule bodies
    pub fn is_scope_selector(&self, selector: &str) -> bool {
        selector == self.root_selector || self.dark_selectors.iter().any(|s| s == selector)
    }
}

/// Internal scanner fault. [`CssParser::parse`] never returns it.
#[derive(Debug, thiserror::Error)]
pub enum CssError {
    #[error("comment masking changed text length from {expected} to {actual}")]
    MaskLength { expected: usize, actual: usize },

    #[error("rule `{selector}` closes at {end} before it starts at {start}")]
    InvalidRange {
        selector: String,
        start: usize,
        end: usize,
    },
}
