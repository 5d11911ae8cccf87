//! Timed typing test: lifecycle, per-player decoders and read-only snapshots.

use crate::device::{DeviceRouter, HostProbe, PlatformProbe};
use crate::keymap::KeyboardConfig;
use crate::keys::RawKeyEvent;
use crate::multitap::{CaseMode, DecoderState};
use crate::player::{PlayerSlot, Verdict};
use crate::scoring::Score;
use crate::sentences::SentenceSource;
use crate::ticker::{TickScheduler, TickToken};
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

pub const DEFAULT_DURATION_SECS: u32 = 60;
pub const TICK_PERIOD: Duration = Duration::from_secs(1);
/// At or below this many seconds the countdown is flagged as running low
pub const LOW_TIME_SECS: u32 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, strum_macros::Display)]
pub enum SessionState {
    #[default]
    Idle,
    Active,
    Completed,
}

/// How a two-player match decides whose decoder gets an event
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Default,
    Serialize,
    Deserialize,
    clap::ValueEnum,
    strum_macros::Display,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum Routing {
    /// Pin each physical keyboard to a player by fingerprint
    #[default]
    Device,
    /// Every player whose key set claims the key receives it
    KeySet,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SessionConfig {
    pub duration_secs: u32,
    pub player_one: KeyboardConfig,
    pub player_two: Option<KeyboardConfig>,
    pub routing: Routing,
}

impl SessionConfig {
    pub fn single(keyboard: KeyboardConfig) -> Self {
        Self {
            duration_secs: DEFAULT_DURATION_SECS,
            player_one: keyboard,
            player_two: None,
            routing: Routing::default(),
        }
    }

    pub fn head_to_head(one: KeyboardConfig, two: KeyboardConfig, routing: Routing) -> Self {
        Self {
            duration_secs: DEFAULT_DURATION_SECS,
            player_one: one,
            player_two: Some(two),
            routing,
        }
    }

    pub fn with_duration(mut self, duration_secs: u32) -> Self {
        self.duration_secs = duration_secs;
        self
    }

    pub fn is_two_player(&self) -> bool {
        self.player_two.is_some()
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self::single(KeyboardConfig::player_one())
    }
}

#[derive(Debug, Clone)]
struct PlayerState {
    keyboard: KeyboardConfig,
    decoder: DecoderState,
    final_score: Option<Score>,
}

impl PlayerState {
    fn new(keyboard: KeyboardConfig) -> Self {
        Self {
            keyboard,
            decoder: DecoderState::new(),
            final_score: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PlayerSnapshot {
    pub slot: PlayerSlot,
    pub text: String,
    pub case_mode: CaseMode,
    pub accuracy: u32,
    pub wpm: u32,
}

/// Everything a front-end needs to draw one frame
#[derive(Debug, Clone, PartialEq)]
pub struct SessionSnapshot {
    pub state: SessionState,
    pub target: String,
    pub time_remaining: u32,
    pub low_time: bool,
    pub players: Vec<PlayerSnapshot>,
    /// Device assignment status, present when routing by device in a two-player match
    pub assignment: Option<Vec<(PlayerSlot, Option<String>)>>,
    /// Present once a two-player match has completed
    pub verdict: Option<Verdict>,
}

impl SessionSnapshot {
    pub fn player(&self, slot: PlayerSlot) -> Option<&PlayerSnapshot> {
        self.players.iter().find(|p| p.slot == slot)
    }
}

pub struct TypingSession {
    duration_secs: u32,
    routing: Routing,
    players: Vec<PlayerState>,
    router: Option<DeviceRouter>,
    sentences: Box<dyn SentenceSource>,
    scheduler: Box<dyn TickScheduler>,
    tick: Option<TickToken>,
    state: SessionState,
    target: String,
    time_remaining: u32,
    started_at: Option<Instant>,
    keep_target: bool,
}

impl std::fmt::Debug for TypingSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TypingSession")
            .field("state", &self.state)
            .field("target", &self.target)
            .field("time_remaining", &self.time_remaining)
            .field("players", &self.players)
            .field("router", &self.router)
            .field("tick", &self.tick)
            .finish()
    }
}

impl TypingSession {
    /// A fresh session in `Idle` with its first target already chosen, so it
    /// can be shown before anyone types.
    pub fn new(
        config: SessionConfig,
        mut sentences: Box<dyn SentenceSource>,
        scheduler: Box<dyn TickScheduler>,
    ) -> Self {
        let two_player = config.is_two_player();
        let router = (two_player && config.routing == Routing::Device)
            .then(|| DeviceRouter::new(Box::new(HostProbe)));

        let mut players = vec![PlayerState::new(config.player_one)];
        players.extend(config.player_two.map(PlayerState::new));

        let target = sentences.next_sentence();
        info!(
            "session ready: {} player(s), {}s, routing {}",
            players.len(),
            config.duration_secs,
            config.routing
        );

        Self {
            duration_secs: config.duration_secs,
            routing: config.routing,
            players,
            router,
            sentences,
            scheduler,
            tick: None,
            state: SessionState::Idle,
            target,
            time_remaining: config.duration_secs,
            started_at: None,
            keep_target: true,
        }
    }

    /// Replace the capability probe used for device fingerprinting
    pub fn with_probe(mut self, probe: Box<dyn PlatformProbe>) -> Self {
        if self.router.is_some() {
            self.router = Some(DeviceRouter::new(probe));
        }
        self
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn target(&self) -> &str {
        &self.target
    }

    pub fn time_remaining(&self) -> u32 {
        self.time_remaining
    }

    pub fn started_at(&self) -> Option<Instant> {
        self.started_at
    }

    pub fn is_two_player(&self) -> bool {
        self.players.len() > 1
    }

    pub fn routing(&self) -> Routing {
        self.routing
    }

    pub fn router(&self) -> Option<&DeviceRouter> {
        self.router.as_ref()
    }

    pub fn text(&self, slot: PlayerSlot) -> Option<&str> {
        self.players.get(slot.index()).map(|p| p.decoder.text())
    }

    /// Generation of the live tick stream, if the countdown is running
    pub fn tick_generation(&self) -> Option<u64> {
        self.tick.as_ref().map(TickToken::generation)
    }

    /// Feed one raw key press. Returns the players it was delivered to.
    pub fn handle_key(&mut self, event: &RawKeyEvent) -> Vec<PlayerSlot> {
        if self.state == SessionState::Completed {
            debug!("key {:?} ignored, session completed", event.key);
            return Vec::new();
        }

        let key = event.canonical_key();
        let slots = self.route(event, &key);
        if slots.is_empty() {
            return slots;
        }

        let starts = self.state == SessionState::Idle
            && slots
                .iter()
                .any(|slot| self.players[slot.index()].keyboard.is_character_key(&key));
        if starts {
            self.start(event.timestamp);
        }

        for slot in &slots {
            let player = &mut self.players[slot.index()];
            let outcome = player.decoder.decode(&key, event.timestamp, &player.keyboard);
            debug!("{slot}: {key:?} -> {outcome:?}");
        }
        slots
    }

    fn route(&mut self, event: &RawKeyEvent, key: &str) -> Vec<PlayerSlot> {
        if !self.is_two_player() {
            return vec![PlayerSlot::One];
        }

        if let Some(router) = self.router.as_mut() {
            return router.observe(event).into_iter().collect();
        }

        let slots: Vec<PlayerSlot> = self
            .players
            .iter()
            .enumerate()
            .filter(|(_, player)| player.keyboard.handles(key))
            .filter_map(|(index, _)| PlayerSlot::from_index(index))
            .collect();
        if slots.is_empty() {
            debug!("key {key:?} claimed by no player");
        }
        slots
    }

    fn start(&mut self, now: Instant) {
        if self.keep_target {
            self.keep_target = false;
        } else {
            self.target = self.sentences.next_sentence();
        }
        self.time_remaining = self.duration_secs;
        self.started_at = Some(now);
        self.cancel_tick();
        self.tick = Some(self.scheduler.start_ticking(TICK_PERIOD));
        self.state = SessionState::Active;
        info!("session started, target {:?}", self.target);
    }

    /// One countdown tick. Ticks from any stream but the live one are ignored.
    /// Returns whether the tick was applied.
    pub fn on_tick(&mut self, generation: u64, now: Instant) -> bool {
        let live = self.state == SessionState::Active
            && self
                .tick
                .as_ref()
                .is_some_and(|token| token.generation() == generation && !token.is_cancelled());
        if !live {
            debug!("stale tick {generation} dropped");
            return false;
        }

        self.time_remaining = self.time_remaining.saturating_sub(1);
        if self.time_remaining == 0 {
            self.complete(now);
        }
        true
    }

    /// External end signal. No effect unless the session is `Active`.
    pub fn end(&mut self, now: Instant) {
        if self.state == SessionState::Active {
            self.complete(now);
        }
    }

    fn complete(&mut self, now: Instant) {
        self.cancel_tick();
        for player in &mut self.players {
            player.final_score = Some(Score::compute(
                player.decoder.text(),
                &self.target,
                self.started_at,
                now,
            ));
        }
        self.state = SessionState::Completed;
        info!("session completed with {}s left", self.time_remaining);
    }

    /// Back to `Idle` with fresh decoders, a fresh target and no device
    /// assignment. The clock starts again on the next character press.
    pub fn restart(&mut self) {
        self.cancel_tick();
        for player in &mut self.players {
            player.decoder.reset();
            player.final_score = None;
        }
        if let Some(router) = self.router.as_mut() {
            router.reset();
        }
        self.target = self.sentences.next_sentence();
        self.keep_target = true;
        self.time_remaining = self.duration_secs;
        self.started_at = None;
        self.state = SessionState::Idle;
        info!("session restarted");
    }

    fn cancel_tick(&mut self) {
        if let Some(token) = self.tick.take() {
            token.cancel();
        }
    }

    /// Score of one player: frozen once completed, live otherwise
    pub fn score(&self, slot: PlayerSlot, now: Instant) -> Option<Score> {
        let player = self.players.get(slot.index())?;
        Some(player.final_score.unwrap_or_else(|| {
            Score::compute(player.decoder.text(), &self.target, self.started_at, now)
        }))
    }

    pub fn verdict(&self) -> Option<Verdict> {
        match (self.state, self.players.as_slice()) {
            (SessionState::Completed, [one, two]) => {
                Some(Verdict::decide(&one.final_score?, &two.final_score?))
            }
            _ => None,
        }
    }

    pub fn snapshot(&self, now: Instant) -> SessionSnapshot {
        let players = self
            .players
            .iter()
            .enumerate()
            .filter_map(|(index, player)| {
                let slot = PlayerSlot::from_index(index)?;
                let score = self.score(slot, now)?;
                Some(PlayerSnapshot {
                    slot,
                    text: player.decoder.text().to_string(),
                    case_mode: player.decoder.case_mode(),
                    accuracy: score.accuracy,
                    wpm: score.wpm,
                })
            })
            .collect();

        SessionSnapshot {
            state: self.state,
            target: self.target.clone(),
            time_remaining: self.time_remaining,
            low_time: self.state == SessionState::Active && self.time_remaining <= LOW_TIME_SECS,
            players,
            assignment: self.router.as_ref().map(|r| r.assignment().status()),
            verdict: self.verdict(),
        }
    }
}

impl Drop for TypingSession {
    fn drop(&mut self) {
        self.cancel_tick();
    }
}
