use std::sync::mpsc;
use std::time::{Duration, Instant};

use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyEventState, KeyModifiers};
use numtype::{
    player::PlayerSlot,
    runtime::{to_raw_key, FixedTicker, GameEvent, Runner, TestEventSource},
    sentences::FixedSentences,
    session::{SessionConfig, SessionState, TypingSession},
    ticker::ManualTickScheduler,
};

fn keypad(c: char) -> GameEvent {
    GameEvent::Key(KeyEvent::new_with_kind_and_state(
        KeyCode::Char(c),
        KeyModifiers::NONE,
        KeyEventKind::Press,
        KeyEventState::KEYPAD,
    ))
}

fn session(prompt: &str, duration: u32) -> (TypingSession, ManualTickScheduler) {
    let ticks = ManualTickScheduler::new();
    let session = TypingSession::new(
        SessionConfig::default().with_duration(duration),
        Box::new(FixedSentences(prompt.to_string())),
        Box::new(ticks.clone()),
    );
    (session, ticks)
}

/// Drive the session from the runner until the channel goes quiet
fn pump(runner: &Runner<TestEventSource, FixedTicker>, session: &mut TypingSession, steps: u32) {
    for _ in 0..steps {
        match runner.step() {
            GameEvent::Key(key) => {
                if let Some(raw) = to_raw_key(&key, Instant::now()) {
                    session.handle_key(&raw);
                }
            }
            GameEvent::Countdown(generation) => {
                session.on_tick(generation, Instant::now());
            }
            GameEvent::Tick | GameEvent::Resize => {}
        }
    }
}

// Headless flow using the internal runtime without a TTY: keypad presses
// become text, countdown events run the clock out.
#[test]
fn headless_keypad_session_runs_to_completion() {
    let (mut session, ticks) = session("tu", 3);
    let (tx, rx) = mpsc::channel();
    let runner = Runner::new(
        TestEventSource::new(rx),
        FixedTicker::new(Duration::from_millis(5)),
    );

    tx.send(keypad('2')).unwrap();
    tx.send(keypad('0')).unwrap();
    tx.send(GameEvent::Key(KeyEvent::new(KeyCode::Backspace, KeyModifiers::NONE)))
        .unwrap();
    tx.send(keypad('3')).unwrap();
    tx.send(GameEvent::Key(KeyEvent::new(KeyCode::Backspace, KeyModifiers::NONE)))
        .unwrap();
    pump(&runner, &mut session, 6);

    assert_eq!(session.state(), SessionState::Active);
    assert_eq!(session.text(PlayerSlot::One), Some("t"));

    let generation = session.tick_generation().unwrap();
    assert_eq!(ticks.live_count(), 1);
    for _ in 0..3 {
        tx.send(GameEvent::Countdown(generation)).unwrap();
    }
    pump(&runner, &mut session, 4);

    assert_eq!(session.state(), SessionState::Completed);
    assert_eq!(session.time_remaining(), 0);
    assert_eq!(ticks.live_count(), 0);

    let snapshot = session.snapshot(Instant::now());
    assert_eq!(snapshot.players[0].accuracy, 100);
}

#[test]
fn headless_cycle_replaces_character() {
    let (mut session, _) = session("v", 60);
    let (tx, rx) = mpsc::channel();
    let runner = Runner::new(
        TestEventSource::new(rx),
        FixedTicker::new(Duration::from_millis(5)),
    );

    for _ in 0..3 {
        tx.send(keypad('2')).unwrap();
    }
    pump(&runner, &mut session, 4);

    assert_eq!(session.text(PlayerSlot::One), Some("v"));
    let snapshot = session.snapshot(Instant::now());
    assert_eq!(snapshot.players[0].accuracy, 100);
    assert!(!snapshot.low_time);
}

#[test]
fn headless_mode_switch_uppercases_following_letters() {
    let (mut session, _) = session("Hi", 60);
    let (tx, rx) = mpsc::channel();
    let runner = Runner::new(
        TestEventSource::new(rx),
        FixedTicker::new(Duration::from_millis(5)),
    );

    tx.send(keypad('+')).unwrap();
    tx.send(keypad('4')).unwrap();
    tx.send(keypad('4')).unwrap();
    pump(&runner, &mut session, 4);

    assert_eq!(session.text(PlayerSlot::One), Some("H"));
}

#[test]
fn headless_stale_countdown_after_restart_is_ignored() {
    let (mut session, _) = session("t", 60);
    let (tx, rx) = mpsc::channel();
    let runner = Runner::new(
        TestEventSource::new(rx),
        FixedTicker::new(Duration::from_millis(5)),
    );

    tx.send(keypad('2')).unwrap();
    pump(&runner, &mut session, 1);
    let old = session.tick_generation().unwrap();

    session.restart();
    tx.send(keypad('2')).unwrap();
    tx.send(GameEvent::Countdown(old)).unwrap();
    pump(&runner, &mut session, 3);

    assert_eq!(session.state(), SessionState::Active);
    assert_eq!(session.time_remaining(), 60);
    assert_eq!(session.text(PlayerSlot::One), Some("t"));
}
