// Library surface for headless/integration tests and reuse.
// Keep this lean to avoid coupling to bin-only types in main.rs.
pub mod app_dirs;
pub mod config;
pub mod device;
pub mod keymap;
pub mod keys;
pub mod multitap;
pub mod player;
pub mod runtime;
pub mod scoring;
pub mod sentences;
pub mod session;
pub mod ticker;

pub use keys::{normalize, KeyLocation, RawKeyEvent};
pub use session::{SessionConfig, SessionSnapshot, SessionState, TypingSession};
