use crossterm::event::{KeyCode, KeyEvent, KeyModifiers, MouseEvent};

use super::keymap::KeyMap;
use super::pane::SelectList;

/// What a row of the auth menu does when confirmed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthAction {
    AzureCli,
    DeviceCode,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MenuItem<A> {
    pub title: String,
    pub description: String,
    pub action: A,
}

/// A modal selectable list, optionally narrowed by a type-to-filter query.
#[derive(Debug, Clone)]
pub struct Menu<A> {
    pub title: &'static str,
    items: Vec<MenuItem<A>>,
    filter: Option<String>,
    cursor: SelectList,
}

impl<A: Copy> Menu<A> {
    pub fn new(title: &'static str, items: Vec<MenuItem<A>>) -> Self {
        let mut cursor = SelectList::new(items.len());
        cursor.focus();
        Self {
            title,
            items,
            filter: None,
            cursor,
        }
    }

    /// Printable keys edit a filter query instead of moving the cursor.
    pub fn filterable(mut self) -> Self {
        self.filter = Some(String::new());
        self
    }

    pub fn filter(&self) -> Option<&str> {
        self.filter.as_deref()
    }

    pub fn visible(&self) -> Vec<&MenuItem<A>> {
        let query = self.filter.as_deref().unwrap_or("").to_lowercase();
        self.items
            .iter()
            .filter(|item| query.is_empty() || matches_query(item, &query))
            .collect()
    }

    pub fn selected(&self) -> Option<&MenuItem<A>> {
        let index = self.cursor.selected()?;
        self.visible().get(index).copied()
    }

    pub fn cursor(&self) -> &SelectList {
        &self.cursor
    }

    pub fn set_page(&mut self, rows: usize) {
        self.cursor.set_page(rows);
    }

    /// Returns `true` when the key changed the cursor or the query.
    pub fn handle_key(&mut self, key: &KeyEvent) -> bool {
        if let Some(query) = &mut self.filter {
            let plain = !key.modifiers.intersects(KeyModifiers::CONTROL | KeyModifiers::ALT);
            let edited = match key.code {
                KeyCode::Char(c) if plain => {
                    query.push(c);
                    true
                }
                KeyCode::Backspace => query.pop().is_some(),
                _ => false,
            };
            if edited {
                let len = self.visible().len();
                self.cursor.reset(len);
                return true;
            }
            if matches!(key.code, KeyCode::Char(_)) {
                return false;
            }
        }
        self.cursor.handle_key(key)
    }

    pub fn handle_mouse(&mut self, event: &MouseEvent) -> bool {
        self.cursor.handle_mouse(event)
    }
}

fn matches_query<A>(item: &MenuItem<A>, query: &str) -> bool {
    format!("{} {}", item.title, item.description)
        .to_lowercase()
        .contains(query)
}

/// At most one overlay is open; opening one replaces the other.
#[derive(Debug, Clone, Default)]
pub enum Overlay {
    #[default]
    None,
    AuthMenu(Menu<AuthAction>),
    Shortcuts(Menu<()>),
}

impl Overlay {
    pub fn auth_menu() -> Self {
        let item = |title: &str, description: &str, action| MenuItem {
            title: title.to_string(),
            description: description.to_string(),
            action,
        };
        Self::AuthMenu(Menu::new(
            "Authentication",
            vec![
                item(
                    "Sign in (Azure CLI)",
                    "Run az login and refresh status",
                    AuthAction::AzureCli,
                ),
                item(
                    "Sign in (Device Code)",
                    "Interactive device code flow",
                    AuthAction::DeviceCode,
                ),
            ],
        ))
    }

    /// Items come from the keymap at the moment of opening.
    pub fn shortcuts(keymap: &KeyMap) -> Self {
        let items = keymap
            .shortcut_items()
            .into_iter()
            .map(|entry| MenuItem {
                title: entry.label,
                description: entry.description,
                action: (),
            })
            .collect();
        Self::Shortcuts(
            Menu::new("Shortcuts (type to filter, enter/esc/? to close)", items).filterable(),
        )
    }

    pub fn is_open(&self) -> bool {
        !matches!(self, Self::None)
    }

    pub fn is_auth_menu(&self) -> bool {
        matches!(self, Self::AuthMenu(_))
    }

    pub fn is_shortcuts(&self) -> bool {
        matches!(self, Self::Shortcuts(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn press(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    #[test]
    fn auth_menu_starts_on_first_item() {
        let Overlay::AuthMenu(menu) = Overlay::auth_menu() else {
            panic!("expected auth menu");
        };
        assert_eq!(menu.selected().unwrap().action, AuthAction::AzureCli);
        assert!(menu.filter().is_none());
    }

    #[test]
    fn unfiltered_menu_moves_with_j() {
        let Overlay::AuthMenu(mut menu) = Overlay::auth_menu() else {
            panic!("expected auth menu");
        };
        assert!(menu.handle_key(&press(KeyCode::Char('j'))));
        assert_eq!(menu.selected().unwrap().action, AuthAction::DeviceCode);
    }

    #[test]
    fn typing_filters_shortcuts() {
        let km = KeyMap::default_keymap();
        let Overlay::Shortcuts(mut menu) = Overlay::shortcuts(&km) else {
            panic!("expected shortcuts");
        };
        let all = menu.visible().len();
        for c in "quit".chars() {
            assert!(menu.handle_key(&press(KeyCode::Char(c))));
        }
        assert_eq!(menu.filter(), Some("quit"));
        let visible = menu.visible();
        assert_eq!(visible.len(), 1);
        assert_eq!(visible[0].title, "q");

        for _ in 0..4 {
            menu.handle_key(&press(KeyCode::Backspace));
        }
        assert_eq!(menu.visible().len(), all);
        assert!(!menu.handle_key(&press(KeyCode::Backspace)));
    }

    #[test]
    fn filter_resets_cursor_and_arrows_still_move() {
        let km = KeyMap::default_keymap();
        let Overlay::Shortcuts(mut menu) = Overlay::shortcuts(&km) else {
            panic!("expected shortcuts");
        };
        assert!(menu.handle_key(&press(KeyCode::Down)));
        assert_eq!(menu.cursor().selected(), Some(1));
        menu.handle_key(&press(KeyCode::Char('p')));
        assert_eq!(menu.cursor().selected(), Some(0));
    }

    #[test]
    fn filter_with_no_matches_has_no_selection() {
        let km = KeyMap::default_keymap();
        let Overlay::Shortcuts(mut menu) = Overlay::shortcuts(&km) else {
            panic!("expected shortcuts");
        };
        for c in "zzz".chars() {
            menu.handle_key(&press(KeyCode::Char(c)));
        }
        assert!(menu.selected().is_none());
    }
}
