//! Document - original and current CSS text

use std::fmt;

use serde::Serialize;

use crate::EngineError;

/// Handle returned by [`Document::subscribe`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Listener = Box<dyn FnMut(&str)>;

/// Line-by-line difference between the original and current text
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TextDiff {
    pub added: Vec<String>,
    pub removed: Vec<String>,
    /// `old → new` per changed line
    pub modified: Vec<String>,
}

impl TextDiff {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty() && self.modified.is_empty()
    }
}

/// Holds the loaded stylesheet and every edit applied since.
///
/// Each snapshot replacement notifies all live listeners with the new text.
#[derive(Default)]
pub struct Document {
    original: String,
    current: String,
    listeners: Vec<(SubscriptionId, Listener)>,
    next_listener: u64,
}

impl fmt::Debug for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Document")
            .field("original_len", &self.original.len())
            .field("current_len", &self.current.len())
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

impl Document {
    /// Create a document whose original and current text are `css`
    pub fn new(css: &str) -> Self {
        Self {
            original: css.to_string(),
            current: css.to_string(),
            ..Default::default()
        }
    }

    /// Replace both snapshots
    pub fn load(&mut self, css: &str) {
        self.original = css.to_string();
        self.current = css.to_string();
        self.notify();
    }

    pub fn original(&self) -> &str {
        &self.original
    }

    pub fn current(&self) -> &str {
        &self.current
    }

    /// Replace the current snapshot
    pub fn set_current(&mut self, css: String) {
        self.current = css;
        self.notify();
    }

    /// Replace `start..end` of the current text with `text`
    pub fn apply_patch(&mut self, start: usize, end: usize, text: &str) -> Result<(), EngineError> {
        let patched = dse_patch::splice(&self.current, start..end, text)?;
        self.set_current(patched);
        Ok(())
    }

    /// Discard every edit
    pub fn reset(&mut self) {
        self.current = self.original.clone();
        self.notify();
    }

    pub fn has_changes(&self) -> bool {
        self.current != self.original
    }

    /// Compare the snapshots line by line, position against position.
    ///
    /// A line missing or blank on one side counts as added or removed.
    pub fn diff(&self) -> TextDiff {
        let original: Vec<&str> = self.original.split('\n').collect();
        let current: Vec<&str> = self.current.split('\n').collect();
        let mut diff = TextDiff::default();

        for i in 0..original.len().max(current.len()) {
            let old = original.get(i).copied().unwrap_or_default();
            let new = current.get(i).copied().unwrap_or_default();
            if old == new {
                continue;
            }
            if old.is_empty() {
                diff.added.push(new.to_string());
            } else if new.is_empty() {
                diff.removed.push(old.to_string());
            } else {
                diff.modified.push(format!("{old} → {new}"));
            }
        }
        diff
    }

    /// Register a callback run with the new text on every change
    pub fn subscribe(&mut self, listener: impl FnMut(&str) + 'static) -> SubscriptionId {
        let id = SubscriptionId(self.next_listener);
        self.next_listener += 1;
        self.listeners.push((id, Box::new(listener)));
        id
    }

    /// Remove a listener. Returns false if it was already gone.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(listener_id, _)| *listener_id != id);
        self.listeners.len() != before
    }

    fn notify(&mut self) {
        for (_, listener) in &mut self.listeners {
            listener(&self.current);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[test]
    fn test_patch_and_reset() {
        let mut doc = Document::new("a { color: red; }");
        assert!(!doc.has_changes());

        doc.apply_patch(11, 14, "blue").unwrap();
        assert_eq!(doc.current(), "a { color: blue; }");
        assert_eq!(doc.original(), "a { color: red; }");
        assert!(doc.has_changes());

        doc.reset();
        assert_eq!(doc.current(), "a { color: red; }");
        assert!(!doc.has_changes());
    }

    #[test]
    fn test_patch_out_of_range() {
        let mut doc = Document::new("abc");
        assert!(matches!(doc.apply_patch(2, 10, "x"), Err(EngineError::Patch(_))));
        assert_eq!(doc.current(), "abc");
    }

    #[test]
    fn test_listeners() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let mut doc = Document::new("");

        let sink = Rc::clone(&seen);
        let id = doc.subscribe(move |text| sink.borrow_mut().push(text.to_string()));

        doc.load("a");
        doc.set_current("b".to_string());
        assert!(doc.unsubscribe(id));
        assert!(!doc.unsubscribe(id));
        doc.reset();

        assert_eq!(*seen.borrow(), vec!["a".to_string(), "b".to_string()]);
    }

    #[test]
    fn test_diff() {
        let mut doc = Document::new("a {\n  color: red;\n}\n");
        doc.set_current("a {\n  color: blue;\n}\n.b {}".to_string());

        let diff = doc.diff();
        assert_eq!(diff.modified, vec!["  color: red; →   color: blue;".to_string()]);
        assert_eq!(diff.added, vec![".b {}".to_string()]);
        assert!(diff.removed.is_empty());

        doc.reset();
        assert!(doc.diff().is_empty());
    }
}
