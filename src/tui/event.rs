use std::sync::mpsc::{self, Receiver, Sender};
use std::time::Duration;

use anyhow::Result;
use crossterm::event::{self, Event, KeyEvent, KeyEventKind, MouseEvent};

use crate::auth::device_code::DeviceCodeMessage;
use crate::auth::{AuthError, IdentitySummary};

/// Everything the event loop reacts to, one at a time.
#[derive(Debug)]
pub enum AppEvent {
    Key(KeyEvent),
    Mouse(MouseEvent),
    Resize(u16, u16),
    /// Outcome of a background `authenticate` call.
    Auth(Result<IdentitySummary, AuthError>),
    /// Outcome of a manual `az login` from the auth menu.
    Login(Result<(), AuthError>),
    DeviceCodePrompt(DeviceCodeMessage),
    Tick,
}

/// The loop's single inbound queue. Background work holds a [`Sender`];
/// terminal input is polled only when the queue is empty.
pub struct EventQueue {
    tx: Sender<AppEvent>,
    rx: Receiver<AppEvent>,
}

impl EventQueue {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::channel();
        Self { tx, rx }
    }

    pub fn sender(&self) -> Sender<AppEvent> {
        self.tx.clone()
    }

    pub fn next(&self, tick_rate: Duration) -> Result<AppEvent> {
        if let Ok(ev) = self.rx.try_recv() {
            return Ok(ev);
        }
        poll(tick_rate)
    }
}

impl Default for EventQueue {
    fn default() -> Self {
        Self::new()
    }
}

pub fn poll(tick_rate: Duration) -> Result<AppEvent> {
    if event::poll(tick_rate)? {
        return Ok(match event::read()? {
            Event::Key(key) if key.kind == KeyEventKind::Press => AppEvent::Key(key),
            Event::Mouse(mouse) => AppEvent::Mouse(mouse),
            Event::Resize(width, height) => AppEvent::Resize(width, height),
            _ => AppEvent::Tick,
        });
    }
    Ok(AppEvent::Tick)
}
