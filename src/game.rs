//! Core game state and logic
//!
//! The [`Engine`] is the only writer of the board. Every command runs under a
//! single mutex; renderers, mirrors and the automated player read through
//! [`Engine::snapshot`], which copies the state under that same lock.
//! Listener callbacks are collected while the lock is held and dispatched
//! after it is released, so a listener may call straight back into the engine.

use crate::board::{Grid, DEFAULT_HEIGHT, DEFAULT_WIDTH};
use crate::error::{ConfigError, ProtocolError};
use crate::piece::{Piece, PieceDescriptor};
use crate::randomizer::{Randomizer, RandomizerMode};
use crate::score::Score;
use crate::tetromino::PieceKind;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};
use tokio::sync::watch;
use tracing::{debug, info};

/// Game state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GameState {
    Playing,
    Paused,
    GameOver,
}

/// Commands the engine accepts from input handling, the actuator and mirrors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Command {
    MoveLeft,
    MoveRight,
    SoftDrop,
    Rotate,
    HardDrop,
    Pause,
    Resume,
    Reset,
}

/// Outbound engine notifications. Calls never happen while the engine lock
/// is held and fire at most once per logical transition.
pub trait EngineListener: Send + Sync {
    /// Something observable changed (board, pieces, score or state)
    fn on_game_state_change(&self, _engine: &Engine) {}

    /// A spawn failed; `last_score` is the score before the reset
    fn on_game_over(&self, _engine: &Engine, _last_score: u64) {}

    /// A new active piece appeared
    fn on_new_block(&self, _engine: &Engine) {}
}

/// Board construction options
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineConfig {
    pub width: usize,
    pub height: usize,
    pub randomizer: RandomizerMode,
    /// Fixed seed for reproducible piece sequences
    pub seed: Option<u64>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            width: DEFAULT_WIDTH,
            height: DEFAULT_HEIGHT,
            randomizer: RandomizerMode::Uniform,
            seed: None,
        }
    }
}

/// Complete copy of the engine state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineSnapshot {
    pub grid: Grid,
    pub active: Option<PieceDescriptor>,
    pub next: PieceKind,
    pub state: GameState,
    pub score: Score,
    pub last_score: u64,
    pub last_lines: u32,
}

impl EngineSnapshot {
    /// Check that the grid matches its dimensions and that its active cells
    /// are exactly those of `active`
    pub fn validate(&self) -> Result<(), ProtocolError> {
        let grid = &self.grid;
        if !grid.is_consistent() {
            return Err(ProtocolError::Dimensions {
                width: grid.width(),
                height: grid.height(),
                cells: grid.cell_count(),
            });
        }
        let active = self.active.map(Piece::from);
        if !grid.active_matches(active.as_ref()) {
            return Err(ProtocolError::ActiveMismatch);
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy)]
enum Event {
    Changed,
    NewBlock,
    GameOver(u64),
}

/// State guarded by the engine lock
struct Core {
    grid: Grid,
    active: Option<Piece>,
    next: PieceKind,
    state: GameState,
    score: Score,
    last_score: u64,
    last_lines: u32,
    /// Spawns since construction, never reset
    spawns: u64,
    randomizer: Randomizer,
}

/// The game engine
pub struct Engine {
    core: Mutex<Core>,
    listeners: RwLock<Vec<Arc<dyn EngineListener>>>,
    state_tx: watch::Sender<GameState>,
    spawn_tx: watch::Sender<u64>,
}

impl Engine {
    /// Create a paused engine with an empty board
    pub fn new(config: EngineConfig) -> Result<Self, ConfigError> {
        let grid = Grid::new(config.width, config.height)?;
        let mut randomizer = match config.seed {
            Some(seed) => Randomizer::with_seed(config.randomizer, seed),
            None => Randomizer::new(config.randomizer),
        };
        let next = randomizer.next();
        let (state_tx, _) = watch::channel(GameState::Paused);
        let (spawn_tx, _) = watch::channel(0);

        Ok(Self {
            core: Mutex::new(Core {
                grid,
                active: None,
                next,
                state: GameState::Paused,
                score: Score::new(),
                last_score: 0,
                last_lines: 0,
                spawns: 0,
                randomizer,
            }),
            listeners: RwLock::new(Vec::new()),
            state_tx,
            spawn_tx,
        })
    }

    /// Default-sized engine with a fixed piece sequence
    pub fn with_seed(seed: u64) -> Self {
        let config = EngineConfig {
            seed: Some(seed),
            ..EngineConfig::default()
        };
        // Default dimensions always satisfy the minimum board size
        match Self::new(config) {
            Ok(engine) => engine,
            Err(e) => unreachable!("default board rejected: {e}"),
        }
    }

    pub fn add_listener(&self, listener: Arc<dyn EngineListener>) {
        self.listeners
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(listener);
    }

    /// Watch the game state; wakes on every transition
    pub fn subscribe_state(&self) -> watch::Receiver<GameState> {
        self.state_tx.subscribe()
    }

    /// Watch the spawn counter; wakes on every new piece
    pub fn subscribe_spawns(&self) -> watch::Receiver<u64> {
        self.spawn_tx.subscribe()
    }

    fn lock(&self) -> MutexGuard<'_, Core> {
        self.core.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Run a mutation under the lock, then notify listeners outside it
    fn mutate(&self, f: impl FnOnce(&mut Core, &mut Vec<Event>) -> bool) -> bool {
        let mut events = Vec::new();
        let changed = {
            let mut core = self.lock();
            let (state, spawns) = (core.state, core.spawns);
            let changed = f(&mut core, &mut events);
            if core.state != state {
                self.state_tx.send_replace(core.state);
            }
            if core.spawns != spawns {
                self.spawn_tx.send_replace(core.spawns);
            }
            changed
        };
        if changed {
            events.push(Event::Changed);
        }
        self.dispatch(&events);
        changed
    }

    fn dispatch(&self, events: &[Event]) {
        if events.is_empty() {
            return;
        }
        let listeners = self
            .listeners
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        for event in events {
            for listener in &listeners {
                match *event {
                    Event::Changed => listener.on_game_state_change(self),
                    Event::NewBlock => listener.on_new_block(self),
                    Event::GameOver(last) => listener.on_game_over(self, last),
                }
            }
        }
    }

    /// Apply a command, returning whether it changed anything
    pub fn apply(&self, command: Command) -> bool {
        match command {
            Command::MoveLeft => self.move_left(),
            Command::MoveRight => self.move_right(),
            Command::SoftDrop => self.soft_drop(),
            Command::Rotate => self.rotate(),
            Command::HardDrop => self.hard_drop(),
            Command::Pause => self.pause(),
            Command::Resume => self.resume(),
            Command::Reset => self.reset(),
        }
    }

    pub fn move_left(&self) -> bool {
        self.mutate(|core, _| core.try_move(|p| p.shifted(-1, 0)))
    }

    pub fn move_right(&self) -> bool {
        self.mutate(|core, _| core.try_move(|p| p.shifted(1, 0)))
    }

    /// Rotate in place; reverted when the new shape collides
    pub fn rotate(&self) -> bool {
        self.mutate(|core, _| core.try_move(Piece::rotated))
    }

    /// One gravity step. Spawns when no piece is active, lands the piece when
    /// it cannot move further down.
    pub fn soft_drop(&self) -> bool {
        self.mutate(|core, events| {
            if core.state != GameState::Playing {
                return false;
            }
            match core.active {
                None => core.spawn(events),
                Some(piece) => {
                    if !core.try_move(|p| p.shifted(0, 1)) {
                        debug!(kind = ?piece.kind, x = piece.x, y = piece.y, "piece landed");
                        core.land();
                    }
                }
            }
            true
        })
    }

    /// Drop the active piece as far as it goes and land it in one step
    pub fn hard_drop(&self) -> bool {
        self.mutate(|core, _| {
            if core.state != GameState::Playing || core.active.is_none() {
                return false;
            }
            while core.try_move(|p| p.shifted(0, 1)) {}
            core.land();
            true
        })
    }

    /// Enter `Paused`. Repeated calls are no-ops.
    pub fn pause(&self) -> bool {
        self.mutate(|core, _| {
            if core.state != GameState::Playing {
                return false;
            }
            core.state = GameState::Paused;
            true
        })
    }

    /// Leave `Paused` or `GameOver`. No-op while already playing.
    pub fn resume(&self) -> bool {
        self.mutate(|core, _| {
            if core.state == GameState::Playing {
                return false;
            }
            core.state = GameState::Playing;
            true
        })
    }

    pub fn start(&self) -> bool {
        self.resume()
    }

    pub fn toggle_pause(&self) -> bool {
        match self.state() {
            GameState::Playing => self.pause(),
            _ => self.resume(),
        }
    }

    /// Clear the board and zero the score. No piece is spawned.
    pub fn reset(&self) -> bool {
        self.mutate(|core, _| {
            if core.state != GameState::Playing {
                return false;
            }
            let changed =
                !core.grid.is_empty() || core.score != Score::default() || core.active.is_some();
            core.reset_board();
            changed
        })
    }

    pub fn state(&self) -> GameState {
        self.lock().state
    }

    pub fn score(&self) -> Score {
        self.lock().score
    }

    pub fn active(&self) -> Option<PieceDescriptor> {
        self.lock().active.map(|p| p.descriptor())
    }

    pub fn next_kind(&self) -> PieceKind {
        self.lock().next
    }

    /// Score and lines recorded at the last game over
    pub fn last_result(&self) -> (u64, u32) {
        let core = self.lock();
        (core.last_score, core.last_lines)
    }

    /// Copy of the complete state, taken under the engine lock
    pub fn snapshot(&self) -> EngineSnapshot {
        let core = self.lock();
        EngineSnapshot {
            grid: core.grid.clone(),
            active: core.active.map(|p| p.descriptor()),
            next: core.next,
            state: core.state,
            score: core.score,
            last_score: core.last_score,
            last_lines: core.last_lines,
        }
    }

    /// Replace the whole state with `snapshot`. Rejected snapshots leave the
    /// engine untouched.
    pub fn restore(&self, snapshot: EngineSnapshot) -> Result<(), ProtocolError> {
        snapshot.validate()?;
        self.mutate(|core, _| {
            core.grid = snapshot.grid;
            core.active = snapshot.active.map(Piece::from);
            core.next = snapshot.next;
            core.state = snapshot.state;
            core.score = snapshot.score;
            core.last_score = snapshot.last_score;
            core.last_lines = snapshot.last_lines;
            true
        });
        Ok(())
    }
}

impl PartialEq for Engine {
    fn eq(&self, other: &Self) -> bool {
        self.snapshot() == other.snapshot()
    }
}

impl Core {
    /// Try a transformed copy of the active piece; keep the old one on failure
    fn try_move(&mut self, transform: impl FnOnce(&Piece) -> Piece) -> bool {
        if self.state != GameState::Playing {
            return false;
        }
        let Some(piece) = &self.active else {
            return false;
        };
        let candidate = transform(piece);
        if self.grid.place(&candidate) {
            self.active = Some(candidate);
            true
        } else {
            false
        }
    }

    /// Fix the active piece into the board and clear completed rows
    fn land(&mut self) {
        self.active = None;
        let cleared = match self.grid.land() {
            Some(rows) => self.grid.clear_full_rows(rows),
            None => 0,
        };
        if cleared > 0 {
            self.score.add_clear(cleared);
            debug!(cleared, lines = self.score.lines, points = self.score.points, "rows cleared");
        }
    }

    /// Promote the next piece to active and draw a new next piece
    fn spawn(&mut self, events: &mut Vec<Event>) {
        let kind = self.next;
        self.next = self.randomizer.next();
        let piece = Piece::spawn(kind, self.grid.width());

        if !self.grid.place(&piece) {
            self.game_over(events);
            return;
        }
        self.active = Some(piece);
        self.score.add_spawn();
        self.spawns += 1;
        debug!(?kind, next = ?self.next, blocks = self.score.blocks_dropped, "spawned");
        events.push(Event::NewBlock);
    }

    fn game_over(&mut self, events: &mut Vec<Event>) {
        self.last_score = self.score.points;
        self.last_lines = self.score.lines;
        self.state = GameState::GameOver;
        info!(score = self.last_score, lines = self.last_lines, "game over");
        events.push(Event::GameOver(self.last_score));
        self.reset_board();
    }

    fn reset_board(&mut self) {
        self.grid.clear();
        self.score.reset();
        self.active = None;
    }
}
