//! End-to-end editing sessions

use std::cell::RefCell;
use std::rc::Rc;

use dse_engine::{ChangeKind, Config, EngineError, Layer, PatchError, Session};

const CSS: &str = r#"@layer theme;
:root {
  --primary: #3b82f6;
  --radius: 8px;
}
.dark {
  --primary: #60a5fa;
}

@layer components;
.btn {
  border-radius: var(--radius);
  background-color: var(--primary);
}
.btn.primary { color: white; }
.card {
  padding: 16px;
}
"#;

fn session() -> Session {
    let mut session = Session::default();
    session.load(CSS);
    session
}

#[test]
fn test_dark_token_edit_leaves_root_alone() {
    let mut s = session();
    s.edit_token_in(".dark", "--primary", "#93c5fd").unwrap();

    assert_eq!(s.model().token_in_scope(":root", "--primary").unwrap().value, "#3b82f6");
    assert_eq!(s.model().token_in_scope(".dark", "--primary").unwrap().value, "#93c5fd");
    assert_eq!(s.diff().modified, vec!["  --primary: #60a5fa; →   --primary: #93c5fd;".to_string()]);
}

#[test]
fn test_mixed_edits_undo_to_original() {
    let mut s = session();
    s.edit_token("--radius", "12px").unwrap();
    s.edit_property(".btn.primary", "color", "black").unwrap();
    s.edit_property(".card", "padding", "1rem 2rem").unwrap();

    let kinds: Vec<_> = s.changes().iter().map(|c| c.kind()).collect();
    assert_eq!(kinds, vec![ChangeKind::Token, ChangeKind::Property, ChangeKind::Property]);

    while s.undo().unwrap() {}
    assert_eq!(s.text(), CSS);
    assert!(!s.has_changes());
    assert_eq!(s.undone().len(), 3);

    while s.redo().unwrap() {}
    assert!(s.text().contains("--radius: 12px;"));
    assert!(s.text().contains(".btn.primary { color: black; }"));
    assert!(s.text().contains("padding: 1rem 2rem;"));
}

#[test]
fn test_edits_keep_layers_and_scopes() {
    let mut s = session();
    let before = s.model().clone();
    s.edit_property(".btn", "border-radius", "calc(var(--radius) * 2)").unwrap();

    let after = s.model();
    assert_eq!(after.rules.len(), before.rules.len());
    assert_eq!(after.layers, before.layers);
    assert_eq!(after.scopes, before.scopes);
    assert_eq!(after.rules_in_layer(Layer::Components).count(), 3);
}

#[test]
fn test_selection_follows_edits() {
    let mut s = session();
    s.edit_property(".btn.primary", "color", "black").unwrap();

    let selection = s.select(&["btn", "primary"]).unwrap();
    let top = selection.top_rule("color").unwrap();
    assert_eq!(top.selector, ".btn.primary");
    assert_eq!(top.property("color").unwrap().value, "black");
    assert!(s.select::<&str>(&[]).is_none());
}

#[test]
fn test_listeners_see_every_snapshot() {
    let mut s = session();
    let seen = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&seen);
    let id = s.subscribe(move |text| sink.borrow_mut().push(text.len()));

    s.edit_token("--radius", "10px").unwrap();
    s.undo().unwrap();
    s.reset();
    assert!(s.unsubscribe(id));
    s.edit_token("--radius", "10px").unwrap();

    assert_eq!(*seen.borrow(), vec![CSS.len() + 1, CSS.len(), CSS.len()]);
}

#[test]
fn test_reset_clears_history() {
    let mut s = session();
    s.edit_token("--radius", "0").unwrap();
    s.reset();

    assert_eq!(s.text(), CSS);
    assert!(s.changes().is_empty());
    assert!(!s.can_undo());
    assert!(!s.can_redo());
}

#[test]
fn test_config_drives_scopes_and_validation() {
    let config = Config::from_json_str(
        r#"{ "validate_values": false, "parser": { "dark_selectors": ["[data-theme=dark]"] } }"#,
    )
    .unwrap();
    let mut s = Session::new(config);
    s.load(":root { --bg: white; }\n[data-theme=dark] { --bg: black; }");

    assert_eq!(s.model().tokens_in_scope("[data-theme=dark]").count(), 1);
    s.edit_token_in("[data-theme=dark]", "--bg", "#000; --fg: white").unwrap();
    assert!(s.text().contains("--bg: #000; --fg: white;"));

    let mut strict = session();
    let err = strict.edit_token("--radius", "").unwrap_err();
    assert!(matches!(err, EngineError::Patch(PatchError::InvalidValue(_))));
}

#[test]
fn test_comment_opener_in_value_is_rejected() {
    let css = ":root {\n  --gap: 4px;\n  --radius: 8px;\n}\n.card {\n  padding: var(--gap);\n}";
    let mut s = Session::default();
    s.load(css);

    let err = s.edit_token("--gap", "4px /* tweak").unwrap_err();
    assert!(matches!(err, EngineError::Patch(PatchError::InvalidValue(_))));
    assert_eq!(s.text(), css);
    assert_eq!(s.model().tokens.len(), 2);
    assert_eq!(s.model().rules.len(), 1);

    s.edit_token("--radius", "2px").unwrap();
    assert!(s.text().contains("--radius: 2px;"));
}
