//! Patch engine and change log

use std::ops::Range;

use dse_css::{Property, Rule, Token, line_declarations, mask_comments};

use crate::change::current_time_ms;
use crate::{Change, ChangeId, ChangeTarget, PatchError, splice};

/// Result of a committed edit
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatchOutcome {
    pub text: String,
    pub change: Change,
}

/// Result of an undo: the restored text and the change to keep for redo
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Undone {
    pub text: String,
    pub change: Change,
}

/// Applies edits to caller-provided snapshots and records them.
///
/// Holds no text of its own, only the append-only change log. The caller
/// keeps the stack of undone changes and hands them back to [`redo`].
///
/// [`redo`]: PatchEngine::redo
#[derive(Debug)]
pub struct PatchEngine {
    changes: Vec<Change>,
    next_id: u64,
    validate_values: bool,
}

impl Default for PatchEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl PatchEngine {
    pub fn new() -> Self {
        Self {
            changes: Vec::new(),
            next_id: 1,
            validate_values: true,
        }
    }

    /// Reject replacement values that would change block structure
    pub fn with_value_validation(mut self, enabled: bool) -> Self {
        self.validate_values = enabled;
        self
    }

    /// Replace the value of `token` in `text`.
    ///
    /// `text` must be the snapshot `token` was parsed from.
    pub fn edit_token(
        &mut self,
        text: &str,
        token: &Token,
        new_value: &str,
        old_value: &str,
    ) -> Result<PatchOutcome, PatchError> {
        self.check_value(new_value)?;
        let range = locate_value(text, token.start_line, &token.name, token.start_char..token.end_char)?;
        let target = ChangeTarget::Token {
            token_name: token.name.clone(),
        };
        self.commit(text, range, target, new_value, old_value)
    }

    /// Replace the value of `property` of `rule` in `text`.
    pub fn edit_property(
        &mut self,
        text: &str,
        rule: &Rule,
        property: &Property,
        new_value: &str,
        old_value: &str,
    ) -> Result<PatchOutcome, PatchError> {
        self.check_value(new_value)?;
        let range = locate_value(
            text,
            property.start_line,
            &property.name,
            property.start_char..property.end_char,
        )?;
        let target = ChangeTarget::Property {
            selector: rule.selector.clone(),
            property_name: property.name.clone(),
        };
        self.commit(text, range, target, new_value, old_value)
    }

    /// Revert the most recent change.
    ///
    /// `Ok(None)` when there is nothing to undo, or when the popped change
    /// carries no range (it is dropped and the text left alone).
    pub fn undo(&mut self, text: &str) -> Result<Option<Undone>, PatchError> {
        let Some(change) = self.changes.pop() else {
            return Ok(None);
        };
        let Some(range) = change.applied_range.clone() else {
            tracing::debug!("Dropping {} without a range", change.id);
            return Ok(None);
        };

        let current = range.start..range.start + change.new_value.len();
        if text.get(current.clone()) != Some(change.new_value.as_str()) {
            let err = PatchError::Diverged {
                start: range.start,
                expected: change.new_value.clone(),
            };
            self.changes.push(change);
            return Err(err);
        }

        let text = splice(text, current, &change.old_value)?;
        tracing::debug!("Undid {} ({})", change.id, change.label());
        Ok(Some(Undone { text, change }))
    }

    /// Re-apply a change previously returned by [`undo`](Self::undo).
    ///
    /// `Ok(None)` when the change carries no range.
    pub fn redo(&mut self, text: &str, change: &Change) -> Result<Option<String>, PatchError> {
        let Some(range) = change.applied_range.clone() else {
            return Ok(None);
        };

        let current = range.start..range.start + change.old_value.len();
        if text.get(current.clone()) != Some(change.old_value.as_str()) {
            return Err(PatchError::Diverged {
                start: range.start,
                expected: change.old_value.clone(),
            });
        }

        let text = splice(text, current, &change.new_value)?;
        tracing::debug!("Redid {} ({})", change.id, change.label());
        self.changes.push(change.clone());
        Ok(Some(text))
    }

    /// Committed changes, oldest first
    pub fn changes(&self) -> &[Change] {
        &self.changes
    }

    pub fn last_change(&self) -> Option<&Change> {
        self.changes.last()
    }

    pub fn can_undo(&self) -> bool {
        !self.changes.is_empty()
    }

    /// Drop the oldest changes beyond `limit`
    pub fn trim_history(&mut self, limit: usize) {
        if self.changes.len() > limit {
            let excess = self.changes.len() - limit;
            self.changes.drain(..excess);
        }
    }

    /// Forget all changes. Ids keep increasing.
    pub fn reset(&mut self) {
        self.changes.clear();
    }

    fn check_value(&self, value: &str) -> Result<(), PatchError> {
        if self.validate_values
            && (value.trim().is_empty()
                || value.contains(['{', '}', ';', '\n', '\r'])
                || value.contains("/*"))
        {
            return Err(PatchError::InvalidValue(value.to_string()));
        }
        Ok(())
    }

    fn commit(
        &mut self,
        text: &str,
        range: Range<usize>,
        target: ChangeTarget,
        new_value: &str,
        old_value: &str,
    ) -> Result<PatchOutcome, PatchError> {
        let start = range.start;
        let patched = splice(text, range, new_value)?;

        let change = Change {
            id: ChangeId(self.next_id),
            target,
            old_value: old_value.to_string(),
            new_value: new_value.to_string(),
            timestamp_ms: current_time_ms(),
            applied_range: Some(start..start + new_value.len()),
        };
        self.next_id += 1;
        tracing::debug!("Applied {} ({}) at {}", change.id, change.label(), start);

        self.changes.push(change.clone());
        Ok(PatchOutcome {
            text: patched,
            change,
        })
    }
}

/// Find the value range of `name` on `line` of `text` and check it against
/// the range recorded at parse time.
fn locate_value(
    text: &str,
    line: usize,
    name: &str,
    expected: Range<usize>,
) -> Result<Range<usize>, PatchError> {
    let masked = mask_comments(text);
    let (line_start, line_text) = nth_line(&masked, line).ok_or(PatchError::LineOutOfRange { line })?;

    let candidates: Vec<Range<usize>> = line_declarations(line_text, line_start)
        .into_iter()
        .filter(|decl| decl.name == name)
        .map(|decl| decl.value_start..decl.value_end())
        .collect();

    if candidates.contains(&expected) {
        return Ok(expected);
    }
    match candidates.into_iter().next() {
        Some(found) => Err(PatchError::StaleOffsets {
            name: name.to_string(),
            line,
            expected,
            found,
        }),
        None => Err(PatchError::DeclarationNotFound {
            name: name.to_string(),
            line,
        }),
    }
}

/// Byte offset and text of the zero-based line `n`
fn nth_line(text: &str, n: usize) -> Option<(usize, &str)> {
    let mut start = 0;
    for (i, line) in text.split('\n').enumerate() {
        if i == n {
            return Some((start, line));
        }
        start += line.len() + 1;
    }
    None
}
