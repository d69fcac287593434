//! Blockfall - a falling-block puzzle engine with a look-ahead automated player
//!
//! The [`game::Engine`] owns the board and is the only thing that mutates it.
//! Everything else works from snapshots: the terminal renderer, the mirror
//! protocol, and the automated player, which searches every placement of the
//! current and next piece on a bounded pool of blocking tasks.

pub mod autoplay;
pub mod board;
pub mod error;
pub mod evaluator;
pub mod game;
pub mod input;
pub mod piece;
pub mod protocol;
pub mod randomizer;
pub mod scheduler;
pub mod score;
pub mod search;
pub mod settings;
pub mod tetromino;
pub mod ui;

pub use error::{ConfigError, ProtocolError, SearchError};
pub use game::{Command, Engine, EngineConfig, EngineListener, EngineSnapshot, GameState};
pub use search::Placement;
