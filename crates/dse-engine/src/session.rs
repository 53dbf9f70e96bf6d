//! Session - Main entry point

use dse_css::{CssParser, ParsedModel, Selection, create_selection};
use dse_patch::{Change, PatchEngine, PatchOutcome};

use crate::{Config, Document, EngineError, SubscriptionId, TextDiff};

/// One editable stylesheet.
///
/// The session is the only writer of its document, so the model always
/// describes the current text and undo/redo run in stack order.
#[derive(Debug)]
pub struct Session {
    config: Config,
    parser: CssParser,
    document: Document,
    model: ParsedModel,
    patches: PatchEngine,
    undone: Vec<Change>,
}

impl Default for Session {
    fn default() -> Self {
        Self::new(Config::default())
    }
}

impl Session {
    /// Create an empty session with the given configuration
    pub fn new(config: Config) -> Self {
        let parser = CssParser::with_options(config.parser.clone());
        let model = parser.parse("");
        let patches = PatchEngine::new().with_value_validation(config.validate_values);
        Self {
            config,
            parser,
            document: Document::default(),
            model,
            patches,
            undone: Vec::new(),
        }
    }

    /// Load a stylesheet, discarding history
    pub fn load(&mut self, css: &str) {
        self.document.load(css);
        self.patches.reset();
        self.undone.clear();
        self.reparse();
        tracing::info!(
            "Loaded {} bytes: {} tokens, {} rules",
            css.len(),
            self.model.tokens.len(),
            self.model.rules.len()
        );
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Current text
    pub fn text(&self) -> &str {
        self.document.current()
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    /// Model of the current text
    pub fn model(&self) -> &ParsedModel {
        &self.model
    }

    /// Applied changes, oldest first
    pub fn changes(&self) -> &[Change] {
        self.patches.changes()
    }

    /// Undone changes, most recent last
    pub fn undone(&self) -> &[Change] {
        &self.undone
    }

    /// Set the first token named `name`
    pub fn edit_token(&mut self, name: &str, value: &str) -> Result<Change, EngineError> {
        let token = self
            .model
            .token(name)
            .ok_or_else(|| EngineError::TokenNotFound(name.to_string()))?;
        let outcome = self
            .patches
            .edit_token(self.document.current(), token, value, &token.value)?;
        Ok(self.commit(outcome))
    }

    /// Set token `name` declared in `scope`
    pub fn edit_token_in(&mut self, scope: &str, name: &str, value: &str) -> Result<Change, EngineError> {
        let token = self
            .model
            .token_in_scope(scope, name)
            .ok_or_else(|| EngineError::TokenNotInScope {
                scope: scope.to_string(),
                name: name.to_string(),
            })?;
        let outcome = self
            .patches
            .edit_token(self.document.current(), token, value, &token.value)?;
        Ok(self.commit(outcome))
    }

    /// Set `property` in the first rule with exactly `selector`
    pub fn edit_property(&mut self, selector: &str, property: &str, value: &str) -> Result<Change, EngineError> {
        let rule = self
            .model
            .rule(selector)
            .ok_or_else(|| EngineError::RuleNotFound(selector.to_string()))?;
        let prop = rule
            .property(property)
            .ok_or_else(|| EngineError::PropertyNotFound {
                selector: selector.to_string(),
                property: property.to_string(),
            })?;
        let outcome = self
            .patches
            .edit_property(self.document.current(), rule, prop, value, &prop.value)?;
        Ok(self.commit(outcome))
    }

    /// Revert the last change. Returns false if there was nothing to revert.
    pub fn undo(&mut self) -> Result<bool, EngineError> {
        let Some(undone) = self.patches.undo(self.document.current())? else {
            return Ok(false);
        };
        tracing::info!("Undo {}: {}", undone.change.id, undone.change.label());
        self.document.set_current(undone.text);
        self.undone.push(undone.change);
        self.reparse();
        Ok(true)
    }

    /// Re-apply the last undone change. Returns false if there was none.
    pub fn redo(&mut self) -> Result<bool, EngineError> {
        let Some(change) = self.undone.pop() else {
            return Ok(false);
        };
        match self.patches.redo(self.document.current(), &change) {
            Ok(Some(text)) => {
                tracing::info!("Redo {}: {}", change.id, change.label());
                self.document.set_current(text);
                self.reparse();
                Ok(true)
            }
            Ok(None) => Ok(false),
            Err(err) => {
                self.undone.push(change);
                Err(err.into())
            }
        }
    }

    pub fn can_undo(&self) -> bool {
        self.patches.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        !self.undone.is_empty()
    }

    /// Restore the loaded text and clear history
    pub fn reset(&mut self) {
        self.document.reset();
        self.patches.reset();
        self.undone.clear();
        self.reparse();
        tracing::info!("Session reset");
    }

    pub fn has_changes(&self) -> bool {
        self.document.has_changes()
    }

    pub fn diff(&self) -> TextDiff {
        self.document.diff()
    }

    /// Rules matching an element with these classes
    pub fn select<S: AsRef<str>>(&self, classes: &[S]) -> Option<Selection<'_>> {
        create_selection(&self.model, classes)
    }

    /// Register a callback run with the new text on every change
    pub fn subscribe(&mut self, listener: impl FnMut(&str) + 'static) -> SubscriptionId {
        self.document.subscribe(listener)
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.document.unsubscribe(id)
    }

    fn commit(&mut self, outcome: PatchOutcome) -> Change {
        tracing::info!(
            "{}: {} {} → {}",
            outcome.change.id,
            outcome.change.label(),
            outcome.change.old_value,
            outcome.change.new_value
        );
        self.document.set_current(outcome.text);
        self.undone.clear();
        if let Some(limit) = self.config.history_limit {
            self.patches.trim_history(limit);
        }
        self.reparse();
        outcome.change
    }

    fn reparse(&mut self) {
        self.model = self.parser.parse(self.document.current());
    }
}
