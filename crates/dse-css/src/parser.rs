//! Structural CSS scanner
//!
//! A single forward, line-oriented pass over the comment-masked text. It is
//! deliberately lenient: it tracks only the most recent `@layer` and scope
//! context, one open rule and one level of nesting. Offsets it records are
//! byte offsets into the snapshot and are reproducible by the patch engine
//! through [`line_declarations`].

use crate::{CssError, Layer, ParsedModel, ParserOptions, Property, Rule, Token};

/// CSS parser
#[derive(Debug, Clone)]
pub struct CssParser {
    options: ParserOptions,
}

impl CssParser {
    pub fn new() -> Self {
        Self::with_options(ParserOptions::default())
    }

    pub fn with_options(options: ParserOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &ParserOptions {
        &self.options
    }

    /// Parse a stylesheet.
    ///
    /// Never fails: an internal fault is logged and a minimal valid model
    /// (no tokens, no rules, root scope only) is returned instead.
    pub fn parse(&self, css: &str) -> ParsedModel {
        match self.try_parse(css) {
            Ok(model) => {
                tracing::debug!(
                    "Parsed {} tokens, {} rules, {} properties",
                    model.tokens.len(),
                    model.rules.len(),
                    model.property_count()
                );
                model
            }
            Err(err) => {
                tracing::warn!("CSS scan failed, using empty model: {}", err);
                ParsedModel::empty(css, &self.options)
            }
        }
    }

    /// Parse, surfacing internal scanner faults
    pub fn try_parse(&self, css: &str) -> Result<ParsedModel, CssError> {
        let masked = mask_comments(css);
        if masked.len() != css.len() {
            return Err(CssError::MaskLength {
                expected: css.len(),
                actual: masked.len(),
            });
        }

        let mut scanner = Scanner::new(&self.options);
        let mut line_start = 0;
        for (line_no, line) in masked.split('\n').enumerate() {
            scanner.scan_line(line, line_no, line_start)?;
            line_start += line.len() + 1;
        }

        Ok(scanner.finish(css))
    }
}

impl Default for CssParser {
    fn default() -> Self {
        Self::new()
    }
}

/// Blank out `/* ... */` comments, keeping byte length and newlines.
///
/// An unterminated comment runs to the end of the text.
pub fn mask_comments(css: &str) -> String {
    let mut out = String::with_capacity(css.len());
    let mut rest = css;

    while let Some(open) = rest.find("/*") {
        out.push_str(&rest[..open]);
        let comment = &rest[open..];
        let len = match comment[2..].find("*/") {
            Some(close) => close + 4,
            None => comment.len(),
        };
        for ch in comment[..len].chars() {
            if ch == '\n' {
                out.push('\n');
            } else {
                out.extend(std::iter::repeat_n(' ', ch.len_utf8()));
            }
        }
        rest = &comment[len..];
    }

    out.push_str(rest);
    out
}

/// What ends a line piece
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PieceEnd {
    Open,
    Close,
    Eol,
}

/// Part of a line between block delimiters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Piece<'a> {
    pub text: &'a str,
    /// Byte offset of `text` within the line
    pub offset: usize,
    pub end: PieceEnd,
}

/// Split a line at `{` and `}`.
pub fn line_pieces(line: &str) -> Vec<Piece<'_>> {
    let mut pieces = Vec::new();
    let mut start = 0;

    for (i, byte) in line.bytes().enumerate() {
        let end = match byte {
            b'{' => PieceEnd::Open,
            b'}' => PieceEnd::Close,
            _ => continue,
        };
        pieces.push(Piece {
            text: &line[start..i],
            offset: start,
            end,
        });
        start = i + 1;
    }

    pieces.push(Piece {
        text: &line[start..],
        offset: start,
        end: PieceEnd::Eol,
    });
    pieces
}

/// One `name: value` found in declaration text, with global offsets
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeclarationSpan<'a> {
    pub name: &'a str,
    pub value: &'a str,
    pub name_start: usize,
    pub value_start: usize,
}

impl DeclarationSpan<'_> {
    pub fn value_end(&self) -> usize {
        self.value_start + self.value.len()
    }

    pub fn is_custom(&self) -> bool {
        self.name.starts_with("--")
    }
}

/// Declarations in `text`, split at `;`. `base` is the global offset of `text`.
///
/// Pieces without a valid property name or with an empty value are skipped.
pub fn declarations(text: &str, base: usize) -> Vec<DeclarationSpan<'_>> {
    let mut out = Vec::new();
    let mut part_start = 0;

    for part in text.split(';') {
        let offset = base + part_start;
        part_start += part.len() + 1;

        let Some(colon) = part.find(':') else {
            continue;
        };
        let raw_name = &part[..colon];
        let name = raw_name.trim();
        if !is_property_name(name) {
            continue;
        }
        let raw_value = &part[colon + 1..];
        let value = raw_value.trim();
        if value.is_empty() {
            continue;
        }

        out.push(DeclarationSpan {
            name,
            value,
            name_start: offset + leading_ws(raw_name),
            value_start: offset + colon + 1 + leading_ws(raw_value),
        });
    }

    out
}

/// Declarations on one line, skipping block heads. `line_start` is the
/// global offset of the line.
pub fn line_declarations(line: &str, line_start: usize) -> Vec<DeclarationSpan<'_>> {
    line_pieces(line)
        .into_iter()
        .filter(|piece| piece.end != PieceEnd::Open)
        .flat_map(|piece| declarations(piece.text, line_start + piece.offset))
        .collect()
}

fn leading_ws(s: &str) -> usize {
    s.len() - s.trim_start().len()
}

fn is_property_name(name: &str) -> bool {
    if let Some(custom) = name.strip_prefix("--") {
        return !custom.is_empty()
            && custom
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    }
    name.chars().any(|c| c.is_ascii_alphabetic())
        && name.chars().all(|c| c.is_ascii_alphabetic() || c == '-')
}

/// Layer named by an `@layer <name>` directive anywhere on the line
fn layer_directive(line: &str) -> Option<Layer> {
    let at = line.find("@layer")?;
    let after = &line[at + "@layer".len()..];
    let rest = after.trim_start();
    if rest.len() == after.len() {
        return None;
    }
    let name = rest
        .split(|c: char| !(c.is_ascii_alphanumeric() || c == '-' || c == '_'))
        .next()?;
    Layer::from_directive(name)
}

/// At-rules whose body holds ordinary rules
fn is_group_at_rule(head: &str) -> bool {
    let name: String = head
        .trim_start_matches('@')
        .chars()
        .take_while(|c| c.is_ascii_alphanumeric() || *c == '-')
        .collect::<String>()
        .to_ascii_lowercase();
    matches!(
        name.as_str(),
        "media" | "supports" | "layer" | "container" | "scope" | "document" | "-moz-document"
    )
}

struct OpenBlock {
    rule: Rule,
    /// Root or dark-mode block: custom properties inside are tokens
    scope_block: bool,
}

struct Scanner<'o> {
    options: &'o ParserOptions,
    layer: Layer,
    scope: String,
    open: Option<OpenBlock>,
    nested: Option<OpenBlock>,
    /// Blocks ignored with their declarations (deep nesting, empty heads)
    skipped_depth: usize,
    /// Non-group at-rule bodies (`@font-face`, `@keyframes`, ...)
    opaque_depth: usize,
    /// Open `@media`-like blocks
    group_depth: usize,
    tokens: Vec<Token>,
    rules: Vec<Rule>,
}

impl<'o> Scanner<'o> {
    fn new(options: &'o ParserOptions) -> Self {
        Self {
            options,
            layer: Layer::Other,
            scope: options.root_selector.clone(),
            open: None,
            nested: None,
            skipped_depth: 0,
            opaque_depth: 0,
            group_depth: 0,
            tokens: Vec::new(),
            rules: Vec::new(),
        }
    }

    fn scan_line(&mut self, line: &str, line_no: usize, line_start: usize) -> Result<(), CssError> {
        if line.trim().is_empty() {
            return Ok(());
        }

        if self.opaque_depth == 0 {
            if let Some(layer) = layer_directive(line) {
                self.layer = layer;
            }
        }

        for piece in line_pieces(line) {
            let offset = line_start + piece.offset;
            match piece.end {
                PieceEnd::Open => self.open_block(piece.text, line_no, offset),
                PieceEnd::Close => {
                    self.declare(piece.text, line_no, offset);
                    self.close_block(line_no, offset + piece.text.len() + 1)?;
                }
                PieceEnd::Eol => self.declare(piece.text, line_no, offset),
            }
        }

        Ok(())
    }

    fn open_block(&mut self, raw_head: &str, line_no: usize, offset: usize) {
        if self.opaque_depth > 0 {
            self.opaque_depth += 1;
            return;
        }
        if self.skipped_depth > 0 || self.nested.is_some() {
            self.skipped_depth += 1;
            return;
        }

        let head = raw_head.trim();
        let start = offset + leading_ws(raw_head);
        self.update_scope(head);

        if self.open.is_some() {
            if head.is_empty() || head.starts_with('@') {
                self.skipped_depth += 1;
            } else {
                self.nested = Some(OpenBlock {
                    rule: self.start_rule(head, line_no, start, true),
                    scope_block: false,
                });
            }
            return;
        }

        if head.starts_with('@') {
            if is_group_at_rule(head) {
                self.group_depth += 1;
            } else {
                self.opaque_depth += 1;
            }
            return;
        }

        if head.is_empty() {
            self.skipped_depth += 1;
            return;
        }

        self.open = Some(OpenBlock {
            rule: self.start_rule(head, line_no, start, false),
            scope_block: self.options.is_scope_selector(head),
        });
    }

    fn close_block(&mut self, line_no: usize, end: usize) -> Result<(), CssError> {
        if self.opaque_depth > 0 {
            self.opaque_depth -= 1;
        } else if self.skipped_depth > 0 {
            self.skipped_depth -= 1;
        } else if let Some(block) = self.nested.take() {
            self.emit(block, line_no, end)?;
        } else if let Some(block) = self.open.take() {
            self.emit(block, line_no, end)?;
        } else if self.group_depth > 0 {
            self.group_depth -= 1;
        }
        Ok(())
    }

    fn emit(&mut self, block: OpenBlock, line_no: usize, end: usize) -> Result<(), CssError> {
        let mut rule = block.rule;
        if end < rule.start_char {
            return Err(CssError::InvalidRange {
                selector: rule.selector,
                start: rule.start_char,
                end,
            });
        }
        rule.end_line = line_no;
        rule.end_char = end;

        // A scope block only becomes a rule when it carries ordinary declarations.
        if block.scope_block && rule.properties.is_empty() {
            return Ok(());
        }
        self.rules.push(rule);
        Ok(())
    }

    fn declare(&mut self, text: &str, line_no: usize, offset: usize) {
        if self.opaque_depth > 0 || self.skipped_depth > 0 || !text.contains(':') {
            return;
        }

        for decl in declarations(text, offset) {
            let target = match (self.nested.as_mut(), self.open.as_mut()) {
                (Some(nested), _) => Some(nested),
                (None, Some(open)) if open.scope_block && decl.is_custom() => None,
                (None, Some(open)) => Some(open),
                (None, None) if decl.is_custom() => None,
                (None, None) => continue,
            };

            match target {
                Some(block) => block.rule.properties.push(Property {
                    name: decl.name.to_string(),
                    value: decl.value.to_string(),
                    start_line: line_no,
                    end_line: line_no,
                    start_char: decl.value_start,
                    end_char: decl.value_end(),
                }),
                None => self.tokens.push(Token {
                    name: decl.name.to_string(),
                    value: decl.value.to_string(),
                    scope: self.scope.clone(),
                    layer: self.layer,
                    start_line: line_no,
                    end_line: line_no,
                    start_char: decl.value_start,
                    end_char: decl.value_end(),
                }),
            }
        }
    }

    fn start_rule(&self, selector: &str, line_no: usize, start: usize, is_nested: bool) -> Rule {
        Rule {
            selector: selector.to_string(),
            layer: self.layer,
            scope: self.scope.clone(),
            properties: Vec::new(),
            start_line: line_no,
            end_line: line_no,
            start_char: start,
            end_char: start + selector.len(),
            is_nested,
        }
    }

    fn update_scope(&mut self, head: &str) {
        let options = self.options;
        if crate::cascade::mentions(head, &options.root_selector) {
            self.scope = options.root_selector.clone();
        } else if let Some(dark) = options
            .dark_selectors
            .iter()
            .find(|dark| crate::cascade::mentions(head, dark))
        {
            self.scope = dark.clone();
        } else if head.contains(&options.media_marker) {
            self.scope = options.media_marker.clone();
        }
    }

    fn finish(self, css: &str) -> ParsedModel {
        if let Some(block) = self.nested.as_ref().or(self.open.as_ref()) {
            tracing::debug!("Dropping unterminated rule `{}`", block.rule.selector);
        }
        ParsedModel::assemble(css, self.tokens, self.rules, self.options)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_token_and_rule_example() {
        let css = ":root { --gap: 4px; }\n.card { padding: var(--gap); }";
        let model = CssParser::new().parse(css);

        assert_eq!(model.tokens.len(), 1);
        let token = &model.tokens[0];
        assert_eq!(token.name, "--gap");
        assert_eq!(token.value, "4px");
        assert_eq!(token.scope, ":root");
        assert_eq!(token.layer, Layer::Other);
        assert_eq!(&css[token.start_char..token.end_char], "4px");

        assert_eq!(model.rules.len(), 1);
        let rule = &model.rules[0];
        assert_eq!(rule.selector, ".card");
        assert_eq!(rule.properties.len(), 1);
        assert_eq!(rule.properties[0].name, "padding");
        assert_eq!(rule.properties[0].value, "var(--gap)");
        assert_eq!(rule.start_line, 1);
        assert_eq!(&css[rule.start_char..rule.end_char], ".card { padding: var(--gap); }");
    }

    #[test]
    fn test_multiline_root_block_yields_tokens() {
        let css = "@layer theme;\n:root {\n  --primary: #3b82f6;\n  --radius: 8px;\n}\n";
        let model = CssParser::new().parse(css);

        assert_eq!(model.tokens.len(), 2);
        assert!(model.rules.is_empty());
        for token in &model.tokens {
            assert_eq!(token.layer, Layer::Theme);
            assert_eq!(token.scope, ":root");
            assert_eq!(&css[token.start_char..token.end_char], token.value);
        }
        assert_eq!(model.tokens[1].start_line, 3);
    }

    #[test]
    fn test_root_block_with_ordinary_declarations() {
        let css = ":root {\n  --fg: #111;\n  color-scheme: light;\n}";
        let model = CssParser::new().parse(css);

        assert_eq!(model.tokens.len(), 1);
        assert_eq!(model.rules.len(), 1);
        assert_eq!(model.rules[0].selector, ":root");
        assert_eq!(model.rules[0].properties[0].name, "color-scheme");
    }

    #[test]
    fn test_custom_property_inside_rule_is_property() {
        let css = ".btn {\n  --btn-bg: red;\n  background: var(--btn-bg);\n}";
        let model = CssParser::new().parse(css);

        assert!(model.tokens.is_empty());
        let names: Vec<_> = model.rules[0].properties.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["--btn-bg", "background"]);
    }

    #[test]
    fn test_multiple_tokens_on_one_line() {
        let css = ":root { --a: 1px; --b: 2px; --c: 3px }";
        let model = CssParser::new().parse(css);

        let values: Vec<_> = model.tokens.iter().map(|t| t.value.as_str()).collect();
        assert_eq!(values, vec!["1px", "2px", "3px"]);
        for token in &model.tokens {
            assert_eq!(&css[token.start_char..token.end_char], token.value);
        }
    }

    #[test]
    fn test_comments_are_masked_in_place() {
        let css = "/* --ghost: 1px; */\n:root {\n  --gap: /* inline */ 4px;\n}\n/* .x {\n  color: red;\n} */";
        let masked = mask_comments(css);
        assert_eq!(masked.len(), css.len());
        assert_eq!(masked.matches('\n').count(), css.matches('\n').count());

        let model = CssParser::new().parse(css);
        assert_eq!(model.tokens.len(), 1);
        assert_eq!(model.tokens[0].value, "4px");
        assert_eq!(&css[model.tokens[0].start_char..model.tokens[0].end_char], "4px");
        assert!(model.rules.is_empty());
    }

    #[test]
    fn test_unterminated_comment_runs_to_end() {
        let masked = mask_comments("a { color: red; } /* b { color: blue; }");
        assert_eq!(masked.trim_end(), "a { color: red; }");
    }

    #[test]
    fn test_multibyte_offsets() {
        let css = ".héllo {\n  content: \"ü\";\n  color: red;\n}";
        let model = CssParser::new().parse(css);
        let color = model.rules[0].property("color").unwrap();
        assert_eq!(&css[color.start_char..color.end_char], "red");
    }

    #[test]
    fn test_layer_is_sticky_and_scope_follows_heads() {
        let css = "@layer components {\n  .dark .card {\n    color: white;\n  }\n  .card {\n    color: black;\n  }\n}\n:root {\n  --x: 1;\n}";
        let model = CssParser::new().parse(css);

        assert_eq!(model.rules.len(), 2);
        assert_eq!(model.rules[0].scope, ".dark");
        assert_eq!(model.rules[0].layer, Layer::Components);
        // Scope is sticky until another head names a scope.
        assert_eq!(model.rules[1].scope, ".dark");
        assert_eq!(model.tokens[0].scope, ":root");
        assert_eq!(model.tokens[0].layer, Layer::Components);
    }

    #[test]
    fn test_media_block_is_transparent() {
        let css = "@media (max-width: 600px) {\n  .card {\n    padding: 2px;\n  }\n}\n";
        let model = CssParser::new().parse(css);

        assert_eq!(model.rules.len(), 1);
        assert_eq!(model.rules[0].selector, ".card");
        assert_eq!(model.rules[0].scope, "@media");
        assert!(!model.rules[0].is_nested);
    }

    #[test]
    fn test_token_inside_media_block() {
        let css = "@media (min-width: 600px) {\n  --gap: 8px;\n}\n";
        let model = CssParser::new().parse(css);

        assert!(model.rules.is_empty());
        assert_eq!(model.tokens.len(), 1);
        let token = &model.tokens[0];
        assert_eq!(token.name, "--gap");
        assert_eq!(token.scope, "@media");
        assert_eq!(&css[token.start_char..token.end_char], "8px");
        assert_eq!(model.tokens_in_scope("@media").count(), 1);
    }

    #[test]
    fn test_top_level_custom_property_is_token() {
        let css = ".a {\n  color: red;\n}\n--x: 1px; --y: 2px;\n";
        let model = CssParser::new().parse(css);

        assert_eq!(model.rules.len(), 1);
        let names: Vec<_> = model.tokens.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["--x", "--y"]);
        assert!(model.tokens.iter().all(|t| t.scope == ":root" && t.layer == Layer::Other));
        assert_eq!(model.tokens[1].start_line, 3);
        assert_eq!(&css[model.tokens[1].start_char..model.tokens[1].end_char], "2px");
    }

    #[test]
    fn test_opaque_at_rules_are_skipped() {
        let css = "@font-face {\n  font-family: Inter;\n}\n@keyframes spin {\n  from {\n    transform: rotate(0);\n  }\n}\n.a {\n  color: red;\n}";
        let model = CssParser::new().parse(css);

        assert_eq!(model.rules.len(), 1);
        assert_eq!(model.rules[0].selector, ".a");
    }

    #[test]
    fn test_one_level_nesting() {
        let css = ".btn {\n  color: red;\n  &:hover {\n    color: blue;\n  }\n  margin: 0;\n}";
        let model = CssParser::new().parse(css);

        assert_eq!(model.rules.len(), 2);
        let nested = &model.rules[0];
        assert!(nested.is_nested);
        assert_eq!(nested.selector, "&:hover");
        assert_eq!(nested.properties.len(), 1);

        let outer = &model.rules[1];
        assert!(!outer.is_nested);
        let names: Vec<_> = outer.properties.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["color", "margin"]);
        assert_eq!(outer.end_line, 6);
    }

    #[test]
    fn test_rule_without_selector_is_discarded() {
        let model = CssParser::new().parse("{\n  color: red;\n}\n.a { color: blue; }");
        assert_eq!(model.rules.len(), 1);
        assert_eq!(model.rules[0].selector, ".a");
    }

    #[test]
    fn test_unterminated_rule_is_dropped() {
        let model = CssParser::new().parse(".a {\n  color: red;\n");
        assert!(model.rules.is_empty());
    }

    #[test]
    fn test_declaration_without_semicolon() {
        let spans = declarations(" color: red ", 10);
        assert_eq!(spans.len(), 1);
        assert_eq!(spans[0].value, "red");
        assert_eq!(spans[0].name_start, 11);
        assert_eq!(spans[0].value_start, 18);
    }

    #[test]
    fn test_line_declarations_skip_heads() {
        let line = "a:hover { color: red; }";
        let spans = line_declarations(line, 0);
        assert_eq!(spans.len(), 1);
        assert_eq!(spans[0].name, "color");
    }

    #[test]
    fn test_layer_directive() {
        assert_eq!(layer_directive("@layer theme;"), Some(Layer::Theme));
        assert_eq!(layer_directive("  @layer utilities {"), Some(Layer::Utilities));
        assert_eq!(layer_directive("@layer vendor;"), None);
        assert_eq!(layer_directive("@layertheme"), None);
    }

    #[test]
    fn test_custom_dark_selector() {
        let options = ParserOptions {
            dark_selectors: vec!["[data-theme=\"dark\"]".to_string()],
            ..ParserOptions::default()
        };
        let css = "[data-theme=\"dark\"] {\n  --bg: #000;\n}";
        let model = CssParser::with_options(options).parse(css);
        assert_eq!(model.tokens[0].scope, "[data-theme=\"dark\"]");
        assert!(model.scope("[data-theme=\"dark\"]").is_some());
    }

    #[test]
    fn test_reparse_is_deterministic() {
        let css = "@layer base;\n:root {\n  --a: 1px;\n}\n.x {\n  margin: var(--a);\n}";
        let first = CssParser::new().parse(css);
        let second = CssParser::new().parse(css);
        assert_eq!(first, second);
    }
}
