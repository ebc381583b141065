use std::time::Duration;

use anyhow::Result;
use crossterm::event::{
    KeyCode, KeyEvent, KeyModifiers, MouseButton, MouseEvent, MouseEventKind,
};
use ratatui::DefaultTerminal;

use crate::auth::azure_cli::{self, LoginMode};
use crate::auth::{AuthError, AuthMethod, AuthPreference, IdentitySummary};

use super::event::{AppEvent, EventQueue};
use super::keymap::{Action, KeyMap};
use super::layout::{self, PaneLayout};
use super::module::{self, Module};
use super::overlay::{AuthAction, Overlay};
use super::pane::{Pane, PaneState};
use super::theme::Theme;
use super::ui;

pub const SIDEBAR: usize = 0;
pub const MAIN: usize = 1;

/// Work the event loop performs on behalf of a state transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    None,
    /// Run `authenticate` on a background thread.
    Authenticate(AuthPreference),
    /// Suspend the UI and run an interactive `az login`.
    Login,
}

pub struct App<'a> {
    pub keymap: &'a KeyMap,
    pub theme: &'a Theme,
    pub should_quit: bool,

    pub panes: Vec<Pane>,
    pub focused: usize,
    pub width: u16,
    pub height: u16,
    pub layout: PaneLayout,
    pub overlay: Overlay,

    pub modules: &'static [Module],
    pub active_module: Module,

    pub status: String,
    pub identity: Option<IdentitySummary>,
    pub signed_in: bool,
    preference: AuthPreference,
}

impl<'a> App<'a> {
    pub fn new(keymap: &'a KeyMap, theme: &'a Theme, preference: AuthPreference) -> Self {
        let modules = Module::ALL;
        let active_module = modules[0];
        let panes = vec![
            Pane::new("Sidebar", module::sidebar_state(modules)),
            Pane::new(active_module.title(), active_module.main_state()),
        ];

        let mut app = Self {
            keymap,
            theme,
            should_quit: false,
            panes,
            focused: SIDEBAR,
            width: 0,
            height: 0,
            layout: layout::compute(0, 0, 1),
            overlay: Overlay::None,
            modules,
            active_module,
            status: String::new(),
            identity: None,
            signed_in: false,
            preference,
        };
        app.set_focus(SIDEBAR);
        app.resize(80, 24);
        app
    }

    pub fn run(&mut self, terminal: &mut DefaultTerminal) -> Result<()> {
        let tick_rate = Duration::from_millis(250);
        let queue = EventQueue::new();

        let size = terminal.size()?;
        self.resize(size.width, size.height);
        let effect = self.start();
        self.dispatch(effect, terminal, &queue)?;

        loop {
            terminal.draw(|frame| ui::draw(frame, self))?;

            let effect = self.handle_event(queue.next(tick_rate)?);
            self.dispatch(effect, terminal, &queue)?;

            if self.should_quit {
                return Ok(());
            }
        }
    }

    fn dispatch(
        &mut self,
        effect: Effect,
        terminal: &mut DefaultTerminal,
        queue: &EventQueue,
    ) -> Result<()> {
        match effect {
            Effect::None => {}
            Effect::Authenticate(preference) => {
                super::spawn_authentication(preference, queue.sender());
            }
            Effect::Login => {
                let outcome =
                    super::suspended(terminal, || azure_cli::login(LoginMode::Interactive))?;
                let _ = queue.sender().send(AppEvent::Login(outcome));
            }
        }
        Ok(())
    }

    /// Kick off the startup authentication.
    pub fn start(&mut self) -> Effect {
        self.begin_auth(self.preference.clone(), "Authenticating…")
    }

    fn begin_auth(&mut self, preference: AuthPreference, status: &str) -> Effect {
        tracing::info!(method = preference.method.as_str(), "starting authentication");
        self.status = status.to_string();
        self.identity = None;
        self.signed_in = false;
        Effect::Authenticate(preference)
    }

    pub fn handle_event(&mut self, event: AppEvent) -> Effect {
        match event {
            AppEvent::Key(key) => self.handle_key(key),
            AppEvent::Mouse(mouse) => {
                self.handle_mouse(&mouse);
                Effect::None
            }
            AppEvent::Resize(width, height) => {
                self.resize(width, height);
                Effect::None
            }
            AppEvent::Auth(result) => {
                self.on_auth_result(result);
                Effect::None
            }
            AppEvent::Login(result) => self.on_login_result(result),
            AppEvent::DeviceCodePrompt(prompt) => {
                self.status = prompt.message;
                Effect::None
            }
            AppEvent::Tick => Effect::None,
        }
    }

    // ── Keyboard routing ──────────────────────────────────────────────

    pub fn handle_key(&mut self, key: KeyEvent) -> Effect {
        // Overlay toggles win over everything, including an open overlay.
        if self.keymap.matches(&key, Action::AuthMenu) {
            self.overlay = if self.overlay.is_auth_menu() {
                Overlay::None
            } else {
                Overlay::auth_menu()
            };
            self.size_overlay();
            return Effect::None;
        }
        if self.keymap.matches(&key, Action::Shortcuts) {
            self.overlay = if self.overlay.is_shortcuts() {
                Overlay::None
            } else {
                Overlay::shortcuts(self.keymap)
            };
            self.size_overlay();
            return Effect::None;
        }

        if let Some(digit) = plain_digit(&key) {
            if digit == 0 {
                self.set_focus(MAIN);
                return Effect::None;
            }
            if self.activate_module(digit - 1) {
                return Effect::None;
            }
        }

        match &mut self.overlay {
            Overlay::AuthMenu(menu) => {
                match key.code {
                    KeyCode::Enter => {
                        let action = menu.selected().map(|item| item.action);
                        self.overlay = Overlay::None;
                        if let Some(action) = action {
                            return self.run_auth_action(action);
                        }
                    }
                    KeyCode::Esc => self.overlay = Overlay::None,
                    _ => {
                        menu.handle_key(&key);
                    }
                }
                return Effect::None;
            }
            Overlay::Shortcuts(menu) => {
                match key.code {
                    KeyCode::Enter | KeyCode::Esc => self.overlay = Overlay::None,
                    _ => {
                        menu.handle_key(&key);
                    }
                }
                return Effect::None;
            }
            Overlay::None => {}
        }

        let moved = self.panes[SIDEBAR].handle_key(&key);
        if matches!(key.code, KeyCode::Enter | KeyCode::Tab) && !has_chord(&key) {
            let index = self.sidebar_selection();
            self.activate_module(index);
            return Effect::None;
        }
        if moved {
            return Effect::None;
        }

        if let Some(action) = self.keymap.lookup(&key) {
            let last = self.panes.len() - 1;
            match action {
                Action::NextPane => self.set_focus((self.focused + 1) % self.panes.len()),
                Action::PrevPane => {
                    self.set_focus((self.focused + self.panes.len() - 1) % self.panes.len());
                }
                Action::FocusLeft => self.set_focus(0),
                Action::FocusRight => self.set_focus(last),
                Action::Quit => self.should_quit = true,
                Action::AuthMenu | Action::Shortcuts => {}
            }
            return Effect::None;
        }

        self.panes[self.focused].handle_key(&key);
        Effect::None
    }

    fn run_auth_action(&mut self, action: AuthAction) -> Effect {
        match action {
            AuthAction::AzureCli => {
                self.status = "Starting az login…".to_string();
                Effect::Login
            }
            AuthAction::DeviceCode => {
                let preference = self.preference.with_method(AuthMethod::DeviceCode);
                self.begin_auth(preference, "Starting device code auth…")
            }
        }
    }

    // ── Mouse ─────────────────────────────────────────────────────────

    pub fn handle_mouse(&mut self, event: &MouseEvent) {
        if event.kind == MouseEventKind::Down(MouseButton::Left)
            && let Some(index) = self
                .panes
                .iter()
                .position(|p| layout::contains(p.rect, event.column, event.row))
        {
            self.set_focus(index);
        }
        self.panes[self.focused].handle_mouse(event);
    }

    // ── Focus and modules ─────────────────────────────────────────────

    /// Focus pane `index`, blurring every other list.
    pub fn set_focus(&mut self, index: usize) {
        if index >= self.panes.len() {
            return;
        }
        for pane in &mut self.panes {
            pane.set_focused(false);
        }
        self.panes[index].set_focused(true);
        self.focused = index;
    }

    fn sidebar_selection(&self) -> usize {
        self.panes[SIDEBAR]
            .table()
            .and_then(|t| t.cursor.selected())
            .unwrap_or(0)
    }

    /// Select sidebar entry `index` and show its module in the main pane.
    /// Out-of-range indices are ignored.
    pub fn activate_module(&mut self, index: usize) -> bool {
        let Some(&module) = self.modules.get(index) else {
            return false;
        };
        if let Some(table) = self.panes[SIDEBAR].table_mut() {
            table.cursor.select(index);
        }
        if module != self.active_module {
            tracing::debug!(module = module.name(), "switching module");
            self.active_module = module;
            let main = &mut self.panes[MAIN];
            main.title = module.title().to_string();
            main.replace_state(module.main_state(), self.layout.content_height);
        }
        true
    }

    // ── Layout ────────────────────────────────────────────────────────

    pub fn resize(&mut self, width: u16, height: u16) {
        self.width = width;
        self.height = height;
        let help_width = layout::help_width(layout::inner_width(width));
        let help_height = ui::measure_wrapped_height(&self.keymap.short_help_line(), help_width);
        self.layout = layout::compute(width, height, help_height);

        for (pane, rect) in self.panes.iter_mut().zip(self.layout.panes()) {
            pane.rect = rect;
            pane.set_content_height(self.layout.content_height);
        }
        self.size_overlay();
    }

    fn size_overlay(&mut self) {
        let rows = usize::from(ui::overlay_list_rows(self.height));
        match &mut self.overlay {
            Overlay::AuthMenu(menu) => menu.set_page(rows),
            Overlay::Shortcuts(menu) => menu.set_page(rows),
            Overlay::None => {}
        }
    }

    // ── Background results ────────────────────────────────────────────

    fn on_auth_result(&mut self, result: Result<IdentitySummary, AuthError>) {
        match result {
            Ok(identity) => {
                tracing::info!(
                    principal = %identity.principal_name,
                    tenant = %identity.tenant_id,
                    source = %identity.source,
                    "signed in"
                );
                self.status = format!(
                    "Logged in as {} (tenant {})",
                    identity.principal_name, identity.tenant_id
                );
                self.identity = Some(identity);
                self.signed_in = true;
            }
            Err(e) => {
                tracing::warn!("authentication failed: {e}");
                self.status = format!("Auth error: {e}");
                self.identity = None;
                self.signed_in = false;
            }
        }
    }

    fn on_login_result(&mut self, result: Result<(), AuthError>) -> Effect {
        match result {
            Ok(()) => self.begin_auth(self.preference.clone(), "az login complete; refreshing…"),
            Err(e) => {
                let reason = match e {
                    AuthError::LoginFailed(reason) => reason,
                    other => other.to_string(),
                };
                tracing::warn!("manual az login failed: {reason}");
                self.status = format!("az login failed: {reason}");
                self.signed_in = false;
                Effect::None
            }
        }
    }

    pub fn main_state(&self) -> &PaneState {
        &self.panes[MAIN].state
    }
}

fn has_chord(key: &KeyEvent) -> bool {
    key.modifiers
        .intersects(KeyModifiers::CONTROL | KeyModifiers::ALT)
}

fn plain_digit(key: &KeyEvent) -> Option<usize> {
    if has_chord(key) {
        return None;
    }
    match key.code {
        KeyCode::Char(c) => c.to_digit(10).map(|d| d as usize),
        _ => None,
    }
}
