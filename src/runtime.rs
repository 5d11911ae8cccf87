use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::time::{Duration, Instant};

use crossterm::event::{self, Event as CtEvent, KeyCode, KeyEvent, KeyEventKind, KeyEventState};
use log::debug;

use crate::keys::{KeyLocation, RawKeyEvent};

/// Unified event type consumed by the app runner
#[derive(Clone, Debug)]
pub enum GameEvent {
    Key(KeyEvent),
    Resize,
    /// Redraw heartbeat, produced when no event arrives within the tick interval
    Tick,
    /// Countdown tick from the tick stream with this generation
    Countdown(u64),
}

/// Source of terminal events (keyboard, resize, countdown)
pub trait GameEventSource: Send + 'static {
    /// Block for up to `timeout` waiting for an event.
    /// Returns Ok(event) if an event arrives before the timeout, or Err(Timeout) if it expires.
    fn recv_timeout(&self, timeout: Duration) -> Result<GameEvent, RecvTimeoutError>;
}

/// Production event source using crossterm
pub struct CrosstermEventSource {
    tx: Sender<GameEvent>,
    rx: Receiver<GameEvent>,
}

impl CrosstermEventSource {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::channel();
        let input_tx = tx.clone();

        std::thread::spawn(move || loop {
            let forwarded = match event::read() {
                // key releases show up once keyboard enhancement is on
                Ok(CtEvent::Key(key)) if key.kind == KeyEventKind::Release => continue,
                Ok(CtEvent::Key(key)) => input_tx.send(GameEvent::Key(key)),
                Ok(CtEvent::Resize(_, _)) => input_tx.send(GameEvent::Resize),
                Ok(_) => continue,
                Err(err) => {
                    debug!("terminal input closed: {err}");
                    break;
                }
            };
            if forwarded.is_err() {
                break;
            }
        });

        Self { tx, rx }
    }

    /// Handle for other producers, such as the countdown thread
    pub fn sender(&self) -> Sender<GameEvent> {
        self.tx.clone()
    }
}

impl Default for CrosstermEventSource {
    fn default() -> Self {
        Self::new()
    }
}

impl GameEventSource for CrosstermEventSource {
    fn recv_timeout(&self, timeout: Duration) -> Result<GameEvent, RecvTimeoutError> {
        self.rx.recv_timeout(timeout)
    }
}

/// Configurable ticker interface
pub trait Ticker: Send + Sync + 'static {
    fn interval(&self) -> Duration;
}

/// Fixed interval ticker
#[derive(Clone, Copy, Debug)]
pub struct FixedTicker {
    interval: Duration,
}

impl FixedTicker {
    pub fn new(interval: Duration) -> Self {
        Self { interval }
    }
}

impl Ticker for FixedTicker {
    fn interval(&self) -> Duration {
        self.interval
    }
}

/// Test event source for unit tests
pub struct TestEventSource {
    rx: Receiver<GameEvent>,
}

impl TestEventSource {
    pub fn new(rx: Receiver<GameEvent>) -> Self {
        Self { rx }
    }
}

impl GameEventSource for TestEventSource {
    fn recv_timeout(&self, timeout: Duration) -> Result<GameEvent, RecvTimeoutError> {
        self.rx.recv_timeout(timeout)
    }
}

/// Runner that advances the application one event/tick at a time
pub struct Runner<E: GameEventSource, T: Ticker> {
    event_source: E,
    ticker: T,
}

impl<E: GameEventSource, T: Ticker> Runner<E, T> {
    pub fn new(event_source: E, ticker: T) -> Self {
        Self {
            event_source,
            ticker,
        }
    }

    pub fn event_source(&self) -> &E {
        &self.event_source
    }

    /// Blocks up to tick interval and returns the next event, or Tick on timeout
    pub fn step(&self) -> GameEvent {
        match self.event_source.recv_timeout(self.ticker.interval()) {
            Ok(ev) => ev,
            Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => GameEvent::Tick,
        }
    }
}

/// Translate a crossterm key into the host-neutral press descriptor.
///
/// Keypad keys only carry `KeyEventState::KEYPAD` on terminals that speak the
/// keyboard enhancement protocol; elsewhere the keypad looks like the main block.
pub fn to_raw_key(key: &KeyEvent, now: Instant) -> Option<RawKeyEvent> {
    let keypad = key.state.contains(KeyEventState::KEYPAD);
    let (name, code) = match key.code {
        KeyCode::Char(c) if keypad && c.is_ascii_digit() => (c.to_string(), format!("Numpad{c}")),
        KeyCode::Char(c) => (c.to_string(), c.to_string()),
        KeyCode::Backspace => ("Backspace".to_string(), "Backspace".to_string()),
        KeyCode::Delete => ("Delete".to_string(), "Delete".to_string()),
        _ => return None,
    };

    let location = if keypad {
        KeyLocation::Numpad
    } else {
        KeyLocation::Standard
    };
    let raw = RawKeyEvent::new(name, location, now).with_code(code);
    Some(if key.kind == KeyEventKind::Repeat {
        raw.repeated()
    } else {
        raw
    })
}
