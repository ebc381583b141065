use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

// ── Actions ──────────────────────────────────────────────────────────

/// Every named global command. Pane-local movement (cursor, scrolling)
/// is handled by the pane components themselves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    NextPane,
    PrevPane,
    FocusLeft,
    FocusRight,
    AuthMenu,
    Shortcuts,
    Quit,
}

impl Action {
    /// Fixed display order for the help line and the shortcuts overlay.
    pub const ORDERED: &[Self] = &[
        Self::NextPane,
        Self::PrevPane,
        Self::FocusLeft,
        Self::FocusRight,
        Self::AuthMenu,
        Self::Shortcuts,
        Self::Quit,
    ];

    /// Short description used in the footer help line.
    pub fn description(self) -> &'static str {
        match self {
            Self::NextPane => "next pane",
            Self::PrevPane => "prev pane",
            Self::FocusLeft => "focus left",
            Self::FocusRight => "focus right",
            Self::AuthMenu => "auth menu",
            Self::Shortcuts => "shortcuts",
            Self::Quit => "quit",
        }
    }

    /// Longer title used in the shortcuts overlay.
    fn title(self) -> &'static str {
        match self {
            Self::NextPane => "Next pane",
            Self::PrevPane => "Prev pane",
            Self::FocusLeft => "Focus left",
            Self::FocusRight => "Focus right",
            Self::AuthMenu => "Auth menu",
            Self::Shortcuts => "Show shortcuts",
            Self::Quit => "Quit",
        }
    }
}

// ── Keybinding ───────────────────────────────────────────────────────

/// A single physical key → action mapping.
#[derive(Debug, Clone)]
pub struct KeyBinding {
    pub code: KeyCode,
    pub modifiers: KeyModifiers,
    pub action: Action,
    /// Key name in `modifier+key` form (e.g. `"ctrl+h"`), normalised by
    /// [`format_key_label`] for display.
    pub key: &'static str,
}

/// One row of the footer help line or the shortcuts overlay.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HelpEntry {
    pub label: String,
    pub description: String,
}

// ── KeyMap ────────────────────────────────────────────────────────────

/// Immutable registry of the global key bindings, built once at startup.
#[derive(Debug, Clone)]
pub struct KeyMap {
    pub bindings: Vec<KeyBinding>,
}

impl KeyMap {
    pub fn default_keymap() -> Self {
        Self {
            bindings: default_bindings(),
        }
    }

    pub fn lookup(&self, key: &KeyEvent) -> Option<Action> {
        let (code, modifiers) = normalize(key.code, key.modifiers);
        self.bindings
            .iter()
            .find(|kb| kb.code == code && kb.modifiers == modifiers)
            .map(|kb| kb.action)
    }

    pub fn matches(&self, key: &KeyEvent, action: Action) -> bool {
        self.lookup(key) == Some(action)
    }

    /// Key names bound to `action`, in table order.
    pub fn keys_for(&self, action: Action) -> Vec<&'static str> {
        self.bindings
            .iter()
            .filter(|kb| kb.action == action)
            .map(|kb| kb.key)
            .collect()
    }

    /// Display label for `action`: its first key, normalised.
    pub fn label(&self, action: Action) -> String {
        format_key_label(&self.keys_for(action))
    }

    /// Entries for the footer: one per command.
    pub fn short_help(&self) -> Vec<HelpEntry> {
        Action::ORDERED
            .iter()
            .map(|&a| HelpEntry {
                label: self.label(a),
                description: a.description().to_string(),
            })
            .collect()
    }

    /// The footer help line as plain text.
    pub fn short_help_line(&self) -> String {
        self.short_help()
            .iter()
            .map(|e| format!("{} {}", e.label, e.description))
            .collect::<Vec<_>>()
            .join(" • ")
    }

    /// Items for the shortcuts overlay. Built fresh on every open.
    pub fn shortcut_items(&self) -> Vec<HelpEntry> {
        let mut items: Vec<HelpEntry> = Action::ORDERED
            .iter()
            .map(|&a| HelpEntry {
                label: self.label(a),
                description: format!("{} [Global]", a.title()),
            })
            .collect();

        let pane_local: &[(&str, &str)] = &[
            ("0", "Focus main pane [Global]"),
            ("1-9", "Select module [Global]"),
            ("↑/↓", "Move selection [Resources]"),
            ("PgUp/PgDn", "Page [Resources]"),
            ("Home/End", "Top/Bottom [Resources]"),
            ("↑/↓", "Scroll [Incidents]"),
            ("PgUp/PgDn", "Page [Incidents]"),
        ];
        items.extend(pane_local.iter().map(|(label, description)| HelpEntry {
            label: (*label).to_string(),
            description: (*description).to_string(),
        }));
        items
    }
}

/// Terminals disagree on whether shifted characters carry SHIFT; bindings are
/// declared without it.
fn normalize(code: KeyCode, modifiers: KeyModifiers) -> (KeyCode, KeyModifiers) {
    match code {
        KeyCode::Char(_) | KeyCode::BackTab => (code, modifiers.difference(KeyModifiers::SHIFT)),
        _ => (code, modifiers),
    }
}

/// Render the first key name as a short label.
///
/// `shift+tab` → `S-tab`, `ctrl+x` → `C-x`, `shift+x` → `X`, arrows → glyphs.
/// Anything else is shown as written.
pub fn format_key_label(keys: &[&str]) -> String {
    let Some(&first) = keys.first() else {
        return String::new();
    };
    if first == "shift+tab" {
        return "S-tab".to_string();
    }
    if let Some(c) = single_char(first.strip_prefix("ctrl+")) {
        return format!("C-{c}");
    }
    if let Some(c) = single_char(first.strip_prefix("shift+")) {
        return c.to_uppercase().to_string();
    }
    match first {
        "left" => "←".to_string(),
        "right" => "→".to_string(),
        "up" => "↑".to_string(),
        "down" => "↓".to_string(),
        other => other.to_string(),
    }
}

fn single_char(s: Option<&str>) -> Option<char> {
    let mut chars = s?.chars();
    let c = chars.next()?;
    chars.next().is_none().then_some(c)
}

// ── Default bindings ─────────────────────────────────────────────────

#[allow(clippy::enum_glob_use)]
fn default_bindings() -> Vec<KeyBinding> {
    use Action::*;

    let bind = |code, modifiers, action, key| KeyBinding {
        code,
        modifiers,
        action,
        key,
    };

    vec![
        // Tab confirms the sidebar selection before it can reach NextPane.
        bind(KeyCode::Char('n'), KeyModifiers::CONTROL, NextPane, "ctrl+n"),
        bind(KeyCode::Tab, KeyModifiers::NONE, NextPane, "tab"),
        bind(KeyCode::BackTab, KeyModifiers::NONE, PrevPane, "shift+tab"),
        bind(KeyCode::Char('h'), KeyModifiers::CONTROL, FocusLeft, "ctrl+h"),
        bind(KeyCode::Left, KeyModifiers::NONE, FocusLeft, "left"),
        bind(KeyCode::Char('l'), KeyModifiers::CONTROL, FocusRight, "ctrl+l"),
        bind(KeyCode::Right, KeyModifiers::NONE, FocusRight, "right"),
        bind(KeyCode::Char('a'), KeyModifiers::NONE, AuthMenu, "a"),
        bind(KeyCode::Char('?'), KeyModifiers::NONE, Shortcuts, "?"),
        bind(KeyCode::Char('q'), KeyModifiers::NONE, Quit, "q"),
        bind(KeyCode::Char('c'), KeyModifiers::CONTROL, Quit, "ctrl+c"),
    ]
}

// ── Tests ────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn key(code: KeyCode, modifiers: KeyModifiers) -> KeyEvent {
        KeyEvent::new(code, modifiers)
    }

    #[test]
    fn lookup_quit_keys() {
        let km = KeyMap::default_keymap();
        assert_eq!(
            km.lookup(&key(KeyCode::Char('q'), KeyModifiers::NONE)),
            Some(Action::Quit)
        );
        assert_eq!(
            km.lookup(&key(KeyCode::Char('c'), KeyModifiers::CONTROL)),
            Some(Action::Quit)
        );
    }

    #[test]
    fn lookup_ignores_shift_on_characters() {
        let km = KeyMap::default_keymap();
        assert_eq!(
            km.lookup(&key(KeyCode::Char('?'), KeyModifiers::SHIFT)),
            Some(Action::Shortcuts)
        );
        assert_eq!(
            km.lookup(&key(KeyCode::BackTab, KeyModifiers::SHIFT)),
            Some(Action::PrevPane)
        );
    }

    #[test]
    fn next_pane_has_a_chord_binding() {
        let km = KeyMap::default_keymap();
        assert_eq!(
            km.lookup(&key(KeyCode::Char('n'), KeyModifiers::CONTROL)),
            Some(Action::NextPane)
        );
        assert_eq!(km.keys_for(Action::NextPane), ["ctrl+n", "tab"]);
    }

    #[test]
    fn lookup_unknown_key() {
        let km = KeyMap::default_keymap();
        assert_eq!(km.lookup(&key(KeyCode::Char('x'), KeyModifiers::NONE)), None);
        assert_eq!(
            km.lookup(&key(KeyCode::Char('h'), KeyModifiers::NONE)),
            None
        );
    }

    #[test]
    fn label_normalisation() {
        assert_eq!(format_key_label(&["shift+tab"]), "S-tab");
        assert_eq!(format_key_label(&["ctrl+h", "left"]), "C-h");
        assert_eq!(format_key_label(&["shift+j"]), "J");
        assert_eq!(format_key_label(&["?"]), "?");
        assert_eq!(format_key_label(&["left"]), "←");
        assert_eq!(format_key_label(&["right"]), "→");
        assert_eq!(format_key_label(&["up"]), "↑");
        assert_eq!(format_key_label(&["down"]), "↓");
        assert_eq!(format_key_label(&["ctrl+page_up"]), "ctrl+page_up");
        assert_eq!(format_key_label(&[]), "");
    }

    #[test]
    fn every_action_has_a_binding() {
        let km = KeyMap::default_keymap();
        for &a in Action::ORDERED {
            assert!(!km.keys_for(a).is_empty(), "no key for {a:?}");
        }
    }

    #[test]
    fn short_help_uses_first_key() {
        let km = KeyMap::default_keymap();
        let labels: Vec<String> = km.short_help().into_iter().map(|e| e.label).collect();
        assert_eq!(labels, ["C-n", "S-tab", "C-h", "C-l", "a", "?", "q"]);
        assert!(km.short_help_line().starts_with("C-n next pane • S-tab prev pane"));
    }

    #[test]
    fn shortcut_items_start_with_globals() {
        let km = KeyMap::default_keymap();
        let items = km.shortcut_items();
        assert_eq!(items[0].description, "Next pane [Global]");
        assert!(items.iter().any(|i| i.description.ends_with("[Incidents]")));
        assert!(items.len() > Action::ORDERED.len());
    }
}
