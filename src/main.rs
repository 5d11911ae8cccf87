pub mod ui;

use anyhow::Context;
use clap::{error::ErrorKind, CommandFactory, Parser};
use crossterm::{
    event::{
        KeyCode, KeyEvent, KeyEventKind, KeyModifiers, KeyboardEnhancementFlags,
        PopKeyboardEnhancementFlags, PushKeyboardEnhancementFlags,
    },
    execute,
    terminal::{
        disable_raw_mode, enable_raw_mode, supports_keyboard_enhancement, EnterAlternateScreen,
        LeaveAlternateScreen,
    },
    tty::IsTty,
};
use log::{debug, info, warn};
use numtype::{
    config::{Config, ConfigStore, FileConfigStore},
    runtime::{
        to_raw_key, CrosstermEventSource, FixedTicker, GameEvent, GameEventSource, Runner, Ticker,
    },
    sentences::{FixedSentences, RandomSentences, SentenceSource},
    session::{Routing, TypingSession},
    ticker::{ThreadTickScheduler, TickScheduler},
};
use ratatui::{
    backend::{Backend, CrosstermBackend},
    Terminal,
};
use std::{
    fs::OpenOptions,
    io::{self, stdin},
    path::{Path, PathBuf},
    time::{Duration, Instant},
};

const TICK_RATE_MS: u64 = 100;

/// multitap phone-keypad typing game for the terminal
#[derive(Parser, Debug, Clone)]
#[clap(
    version,
    about,
    long_about = "Type the sentence the way you would on an old phone: press a key repeatedly to cycle through its letters. Play alone on the numeric keypad or head-to-head, one player on the keypad and one on the letter block."
)]
pub struct Cli {
    /// number of players (1 or 2)
    #[clap(short = 'n', long, default_value_t = 1, value_parser = clap::value_parser!(u8).range(1..=2))]
    players: u8,

    /// number of seconds to run test
    #[clap(short = 's', long, value_parser = clap::value_parser!(u32).range(1..))]
    number_of_secs: Option<u32>,

    /// custom prompt to use
    #[clap(short = 'p', long)]
    prompt: Option<String>,

    /// how key presses are split between two players
    #[clap(short = 'r', long, value_enum)]
    routing: Option<Routing>,

    /// config file to use instead of the default location
    #[clap(short = 'c', long)]
    config: Option<PathBuf>,

    /// write logs to this file, filtered by RUST_LOG; without it nothing is logged
    #[clap(long)]
    log_file: Option<PathBuf>,
}

impl Cli {
    /// Stored config with command line overrides applied
    fn resolve_config(&self) -> anyhow::Result<Config> {
        let mut config = match &self.config {
            Some(path) => FileConfigStore::with_path(path)
                .try_load()
                .with_context(|| format!("loading config from {}", path.display()))?
                .unwrap_or_default(),
            None => load_or_seed_default_config(),
        };

        if let Some(secs) = self.number_of_secs {
            config.duration_secs = secs;
        }
        if let Some(routing) = self.routing {
            config.routing = Some(routing);
        }
        config.validate()?;
        Ok(config)
    }

    fn sentence_source(&self, config: &Config) -> Box<dyn SentenceSource> {
        match (&self.prompt, &config.sentences) {
            (Some(prompt), _) => Box::new(FixedSentences(prompt.clone())),
            (None, Some(list)) => Box::new(RandomSentences::from_list(list.clone())),
            (None, None) => Box::new(RandomSentences::embedded()),
        }
    }

    fn two_player(&self) -> bool {
        self.players == 2
    }
}

/// Defaults are written out on first run so there is a file to edit
fn load_or_seed_default_config() -> Config {
    let store = FileConfigStore::new();
    if let Ok(None) = store.try_load() {
        let config = Config::default();
        match store.save(&config) {
            Ok(()) => debug!("wrote default config to {}", store.path().display()),
            Err(err) => warn!("could not write default config: {err}"),
        }
        return config;
    }
    store.load()
}

/// Logger writing to `log_file`. None without a file: stderr belongs to the
/// terminal UI, so RUST_LOG alone must not draw over the screen.
fn file_logger(log_file: Option<&Path>) -> anyhow::Result<Option<env_logger::Builder>> {
    let Some(path) = log_file else {
        return Ok(None);
    };

    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("opening log file {}", path.display()))?;

    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"));
    builder.target(env_logger::Target::Pipe(Box::new(file)));
    Ok(Some(builder))
}

fn init_logging(log_file: Option<&Path>) -> anyhow::Result<()> {
    if let Some(mut builder) = file_logger(log_file)? {
        builder.try_init()?;
    }
    Ok(())
}

#[derive(Debug)]
pub struct App {
    pub session: TypingSession,
}

impl App {
    pub fn new(cli: &Cli, config: &Config, scheduler: Box<dyn TickScheduler>) -> Self {
        Self {
            session: TypingSession::new(
                config.session_config(cli.two_player()),
                cli.sentence_source(config),
                scheduler,
            ),
        }
    }

    /// Apply one terminal key event. Returns how the loop should continue.
    pub fn on_key(&mut self, key: KeyEvent, now: Instant) -> Option<ExitType> {
        if key.kind == KeyEventKind::Release {
            return None;
        }

        match key.code {
            KeyCode::Esc => return Some(ExitType::Quit),
            KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                return Some(ExitType::Quit)
            }
            KeyCode::Tab | KeyCode::Enter => return Some(ExitType::Restart),
            _ => {}
        }

        if let Some(raw) = to_raw_key(&key, now) {
            self.session.handle_key(&raw);
        }
        None
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitType {
    Restart,
    Quit,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.log_file.as_deref())?;

    if !stdin().is_tty() {
        let mut cmd = Cli::command();
        cmd.error(ErrorKind::Io, "stdin must be a tty").exit();
    }

    let mut config = cli.resolve_config()?;

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let enhanced = supports_keyboard_enhancement().unwrap_or(false);
    if enhanced {
        execute!(
            stdout,
            PushKeyboardEnhancementFlags(
                KeyboardEnhancementFlags::DISAMBIGUATE_ESCAPE_CODES
                    | KeyboardEnhancementFlags::REPORT_EVENT_TYPES
            )
        )?;
    }
    info!("terminal ready, keyboard enhancement {enhanced}");
    if cli.two_player() {
        let routing = config.settle_routing(enhanced);
        info!("two-player routing: {routing}");
    }

    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let events = CrosstermEventSource::new();
    let countdown = events.sender();
    let scheduler = ThreadTickScheduler::new(move |generation| {
        countdown.send(GameEvent::Countdown(generation)).is_ok()
    });
    let runner = Runner::new(events, FixedTicker::new(Duration::from_millis(TICK_RATE_MS)));

    let mut app = App::new(&cli, &config, Box::new(scheduler));
    let result = start_tui(&mut terminal, &mut app, &runner);

    if enhanced {
        execute!(terminal.backend_mut(), PopKeyboardEnhancementFlags)?;
    }
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    result
}

fn start_tui<B: Backend, E: GameEventSource, T: Ticker>(
    terminal: &mut Terminal<B>,
    app: &mut App,
    runner: &Runner<E, T>,
) -> anyhow::Result<()> {
    loop {
        terminal.draw(|f| f.render_widget(&*app, f.area()))?;

        match runner.step() {
            GameEvent::Tick | GameEvent::Resize => {}
            GameEvent::Countdown(generation) => {
                app.session.on_tick(generation, Instant::now());
            }
            GameEvent::Key(key) => match app.on_key(key, Instant::now()) {
                Some(ExitType::Quit) => break,
                Some(ExitType::Restart) => app.session.restart(),
                None => {}
            },
        }
    }

    Ok(())
}
