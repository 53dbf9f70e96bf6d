//! Parsed model of one snapshot

use std::collections::BTreeMap;

use serde::Serialize;

use crate::{Layer, ParserOptions, Rule, Token};

/// Rule indices bucketed by layer. Every rule sits in exactly one bucket.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LayerIndex {
    pub theme: Vec<usize>,
    pub base: Vec<usize>,
    pub components: Vec<usize>,
    pub utilities: Vec<usize>,
    pub other: Vec<usize>,
}

impl LayerIndex {
    pub fn bucket(&self, layer: Layer) -> &[usize] {
        match layer {
            Layer::Theme => &self.theme,
            Layer::Base => &self.base,
            Layer::Components => &self.components,
            Layer::Utilities => &self.utilities,
            Layer::Other => &self.other,
        }
    }

    fn bucket_mut(&mut self, layer: Layer) -> &mut Vec<usize> {
        match layer {
            Layer::Theme => &mut self.theme,
            Layer::Base => &mut self.base,
            Layer::Components => &mut self.components,
            Layer::Utilities => &mut self.utilities,
            Layer::Other => &mut self.other,
        }
    }

    pub(crate) fn build(rules: &[Rule]) -> Self {
        let mut index = Self::default();
        for (i, rule) in rules.iter().enumerate() {
            index.bucket_mut(rule.layer).push(i);
        }
        index
    }
}

/// Token and rule indices declared under one scope label
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ScopeBucket {
    pub tokens: Vec<usize>,
    pub rules: Vec<usize>,
}

/// Parse result for one snapshot
///
/// Offsets inside are only valid against `current_text`. The model is
/// replaced, never updated, when the text changes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ParsedModel {
    pub original_text: String,
    pub current_text: String,
    pub tokens: Vec<Token>,
    pub rules: Vec<Rule>,
    pub layers: LayerIndex,
    pub scopes: BTreeMap<String, ScopeBucket>,
}

impl ParsedModel {
    /// Minimal valid model: no tokens or rules, only the root scope.
    pub fn empty(text: &str, options: &ParserOptions) -> Self {
        let mut scopes = BTreeMap::new();
        scopes.insert(options.root_selector.clone(), ScopeBucket::default());
        Self {
            original_text: text.to_string(),
            current_text: text.to_string(),
            tokens: Vec::new(),
            rules: Vec::new(),
            layers: LayerIndex::default(),
            scopes,
        }
    }

    pub(crate) fn assemble(
        text: &str,
        tokens: Vec<Token>,
        rules: Vec<Rule>,
        options: &ParserOptions,
    ) -> Self {
        let mut scopes: BTreeMap<String, ScopeBucket> = BTreeMap::new();
        scopes.insert(options.root_selector.clone(), ScopeBucket::default());
        for dark in &options.dark_selectors {
            scopes.entry(dark.clone()).or_default();
        }
        for (i, token) in tokens.iter().enumerate() {
            scopes.entry(token.scope.clone()).or_default().tokens.push(i);
        }
        for (i, rule) in rules.iter().enumerate() {
            scopes.entry(rule.scope.clone()).or_default().rules.push(i);
        }

        Self {
            original_text: text.to_string(),
            current_text: text.to_string(),
            layers: LayerIndex::build(&rules),
            tokens,
            rules,
            scopes,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty() && self.rules.is_empty()
    }

    /// First token with this name, in any scope
    pub fn token(&self, name: &str) -> Option<&Token> {
        self.tokens.iter().find(|t| t.name == name)
    }

    pub fn token_in_scope(&self, scope: &str, name: &str) -> Option<&Token> {
        self.tokens_in_scope(scope).find(|t| t.name == name)
    }

    /// First rule with exactly this selector
    pub fn rule(&self, selector: &str) -> Option<&Rule> {
        self.rules.iter().find(|r| r.selector == selector)
    }

    pub fn rules_in_layer(&self, layer: Layer) -> impl Iterator<Item = &Rule> + '_ {
        self.layers.bucket(layer).iter().map(|&i| &self.rules[i])
    }

    pub fn scope(&self, label: &str) -> Option<&ScopeBucket> {
        self.scopes.get(label)
    }

    pub fn scope_labels(&self) -> impl Iterator<Item = &str> + '_ {
        self.scopes.keys().map(String::as_str)
    }

    pub fn tokens_in_scope<'a>(&'a self, label: &str) -> impl Iterator<Item = &'a Token> + use<'a> {
        let indices = self.scopes.get(label).map(|b| b.tokens.as_slice()).unwrap_or(&[]);
        indices.iter().map(|&i| &self.tokens[i])
    }

    pub fn rules_in_scope<'a>(&'a self, label: &str) -> impl Iterator<Item = &'a Rule> + use<'a> {
        let indices = self.scopes.get(label).map(|b| b.rules.as_slice()).unwrap_or(&[]);
        indices.iter().map(|&i| &self.rules[i])
    }

    /// Tokens whose name, value or scope contains `query`
    pub fn find_tokens(&self, query: &str) -> Vec<&Token> {
        self.tokens
            .iter()
            .filter(|t| t.name.contains(query) || t.value.contains(query) || t.scope.contains(query))
            .collect()
    }

    /// Rules whose selector contains `query`
    pub fn find_rules(&self, query: &str) -> Vec<&Rule> {
        self.rules
            .iter()
            .filter(|r| r.selector.contains(query))
            .collect()
    }

    pub fn property_count(&self) -> usize {
        self.rules.iter().map(|r| r.properties.len()).sum()
    }
}
