pub mod app;
pub mod event;
pub mod keymap;
pub mod layout;
pub mod module;
pub mod overlay;
pub mod pane;
pub mod theme;
pub mod ui;

use std::io::stdout;
use std::sync::Arc;
use std::sync::mpsc::Sender;
use std::thread;

use anyhow::Result;
use crossterm::event::{DisableMouseCapture, EnableMouseCapture};
use crossterm::execute;
use crossterm::terminal::{EnterAlternateScreen, enable_raw_mode};
use ratatui::DefaultTerminal;

use crate::auth::azure_cli::LoginMode;
use crate::auth::device_code::{DeviceCodeMessage, PromptFn};
use crate::auth::{self, AuthContext, AuthPreference, AzureBackends};
use crate::config::Config;

use event::AppEvent;

pub fn run(config: &Config) -> Result<()> {
    let keymap = keymap::KeyMap::default_keymap();
    let theme = config.theme.build();

    let mut terminal = ratatui::init();
    execute!(stdout(), EnableMouseCapture)?;
    let mut app = app::App::new(&keymap, &theme, config.auth_preference());
    let result = app.run(&mut terminal);
    let _ = execute!(stdout(), DisableMouseCapture);
    ratatui::restore();
    result
}

/// Resolve credentials off the UI thread. The outcome, and any device-code
/// prompt on the way, arrive as events.
pub(crate) fn spawn_authentication(preference: AuthPreference, tx: Sender<AppEvent>) {
    let prompt_tx = tx.clone();
    let prompt: PromptFn = Arc::new(move |msg: &DeviceCodeMessage| {
        let _ = prompt_tx.send(AppEvent::DeviceCodePrompt(msg.clone()));
    });
    thread::spawn(move || {
        let backends = AzureBackends::new(LoginMode::Quiet, prompt);
        let outcome = auth::authenticate(&preference, &backends, &AuthContext::default());
        if let Err(e) = &outcome {
            tracing::warn!("authentication failed: {e}");
        }
        let _ = tx.send(AppEvent::Auth(outcome));
    });
}

/// Hand the terminal to a child process for the duration of `f`.
pub(crate) fn suspended<T>(terminal: &mut DefaultTerminal, f: impl FnOnce() -> T) -> Result<T> {
    let _ = execute!(stdout(), DisableMouseCapture);
    ratatui::restore();

    let out = f();

    enable_raw_mode()?;
    execute!(stdout(), EnterAlternateScreen, EnableMouseCapture)?;
    terminal.clear()?;
    Ok(out)
}
