//! Cascade resolution
//!
//! Textual approximation of the cascade for an inspected element:
//! 1. Match rules whose selector mentions one of the element's classes
//! 2. Order them by a simplified specificity score (stable, ascending)
//! 3. Answer "which rule wins" per property
//!
//! Combinators are not evaluated structurally; only the presence of class
//! tokens in the selector text counts.

use serde::Serialize;

use crate::{Layer, ParsedModel, Rule};

/// Simplified specificity score, higher wins
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct Specificity(pub u32);

/// `100·#ids + 10·(classes + attributes + pseudo-classes) + ASCII letters`
///
/// The letter term counts every letter in the selector, so long names weigh
/// more than the official algorithm would allow.
pub fn specificity(selector: &str) -> Specificity {
    let mut score = 0;
    for c in selector.chars() {
        score += match c {
            '#' => 100,
            '.' | '[' | ':' => 10,
            c if c.is_ascii_alphabetic() => 1,
            _ => 0,
        };
    }
    Specificity(score)
}

fn is_combinator(c: char) -> bool {
    c.is_whitespace() || matches!(c, ',' | '>' | '/' | '+' | '~')
}

fn is_ident_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '-' || c == '_'
}

/// Whether `haystack` contains `needle` not followed by an identifier character
pub(crate) fn mentions(haystack: &str, needle: &str) -> bool {
    if needle.is_empty() {
        return false;
    }
    haystack.match_indices(needle).any(|(i, _)| {
        haystack[i + needle.len()..]
            .chars()
            .next()
            .is_none_or(|c| !is_ident_char(c))
    })
}

/// Whether `selector` mentions `.class` for any of `classes`
pub fn selector_matches<S: AsRef<str>>(selector: &str, classes: &[S]) -> bool {
    classes.iter().any(|class| {
        let class = class.as_ref();
        if class.is_empty() {
            return false;
        }
        let needle = format!(".{class}");
        selector.split(is_combinator).any(|part| part.trim() == needle) || mentions(selector, &needle)
    })
}

/// Rules matching `classes`, ordered from lowest to highest precedence
pub fn match_rules<'a, S: AsRef<str>>(model: &'a ParsedModel, classes: &[S]) -> Vec<&'a Rule> {
    let mut matched: Vec<&Rule> = model
        .rules
        .iter()
        .filter(|rule| selector_matches(&rule.selector, classes))
        .collect();

    // Stable: equal scores keep encounter order.
    matched.sort_by_key(|rule| specificity(&rule.selector));
    matched
}

/// Highest-precedence rule declaring `property` in an ascending rule list
pub fn top_rule<'a>(rules: &[&'a Rule], property: &str) -> Option<&'a Rule> {
    rules.iter().rev().find(|rule| rule.declares(property)).copied()
}

/// Rules declaring `property`, in list order
pub fn rules_for_property<'a>(rules: &[&'a Rule], property: &str) -> Vec<&'a Rule> {
    rules
        .iter()
        .filter(|rule| rule.declares(property))
        .copied()
        .collect()
}

/// Which rule wins a property and which ones lose to it
#[derive(Debug, Clone, Serialize)]
pub struct PropertyOverride<'a> {
    pub top_rule: Option<&'a Rule>,
    pub is_overridden: bool,
    pub overriding_rules: Vec<&'a Rule>,
}

pub fn property_override<'a>(rules: &[&'a Rule], property: &str) -> PropertyOverride<'a> {
    let declaring = rules_for_property(rules, property);
    let top = top_rule(rules, property);

    PropertyOverride {
        top_rule: top,
        is_overridden: declaring.len() > 1,
        overriding_rules: declaring
            .into_iter()
            .filter(|rule| !top.is_some_and(|t| std::ptr::eq(*rule, t)))
            .collect(),
    }
}

/// Layer → scope → selector path of a rule
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Breadcrumb<'a> {
    pub layer: Layer,
    pub scope: &'a str,
    pub selector: &'a str,
}

pub fn breadcrumb(rule: &Rule) -> Breadcrumb<'_> {
    Breadcrumb {
        layer: rule.layer,
        scope: &rule.scope,
        selector: &rule.selector,
    }
}

/// Resolved element selection: its classes and matched rules in cascade order
#[derive(Debug, Clone, Serialize)]
pub struct Selection<'a> {
    pub classes: Vec<String>,
    pub matched_rules: Vec<&'a Rule>,
}

impl<'a> Selection<'a> {
    /// First class of the element
    pub fn primary_class(&self) -> Option<&str> {
        self.classes.first().map(String::as_str)
    }

    pub fn top_rule(&self, property: &str) -> Option<&'a Rule> {
        top_rule(&self.matched_rules, property)
    }

    pub fn property_override(&self, property: &str) -> PropertyOverride<'a> {
        property_override(&self.matched_rules, property)
    }
}

/// Resolve an element's classes. `None` when the element has no classes.
pub fn create_selection<'a, S: AsRef<str>>(model: &'a ParsedModel, classes: &[S]) -> Option<Selection<'a>> {
    let mut unique: Vec<String> = Vec::with_capacity(classes.len());
    for class in classes {
        let class = class.as_ref().trim();
        if !class.is_empty() && !unique.iter().any(|c| c == class) {
            unique.push(class.to_string());
        }
    }
    if unique.is_empty() {
        return None;
    }

    let matched_rules = match_rules(model, &unique);
    tracing::debug!("Selection {:?} matched {} rules", unique, matched_rules.len());
    Some(Selection {
        classes: unique,
        matched_rules,
    })
}
