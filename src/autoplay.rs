//! Automated player
//!
//! Runs as a task on the tokio runtime next to the UI thread. For each new
//! piece it asks the [`Scheduler`] for a placement and then steers the piece
//! there through the same engine commands a human would use.

use crate::game::{Command, Engine, GameState};
use crate::scheduler::{default_workers, Scheduler};
use crate::search::Placement;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// Automated player tuning
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AutoPlayConfig {
    pub workers: usize,
    /// Pause between commands so the moves are visible
    pub actuation_delay: Duration,
    /// Consecutive no-effect commands before the piece is hard dropped
    pub max_stalls: u32,
}

impl Default for AutoPlayConfig {
    fn default() -> Self {
        Self {
            workers: default_workers(),
            actuation_delay: Duration::ZERO,
            max_stalls: 3,
        }
    }
}

/// How an actuation ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Actuation {
    /// Steered to the target and hard dropped
    Placed,
    /// Gave up after repeated no-ops and hard dropped where it was
    Forced,
    /// The player was stopped
    Cancelled,
    /// The piece landed or was replaced before the target was reached
    Stale,
}

/// Steers the active piece to a chosen placement
pub struct Actuator<'a> {
    engine: &'a Engine,
    spawns: watch::Receiver<u64>,
    running: &'a AtomicBool,
    config: AutoPlayConfig,
}

impl<'a> Actuator<'a> {
    pub fn new(engine: &'a Engine, running: &'a AtomicBool, config: AutoPlayConfig) -> Self {
        Self {
            engine,
            spawns: engine.subscribe_spawns(),
            running,
            config,
        }
    }

    /// Rotate first, then shift, then hard drop. Every command is validated
    /// by the engine; the piece is only steered while it is the one that was
    /// active at spawn `spawn_id`.
    pub async fn actuate(&self, target: Placement, spawn_id: u64) -> Actuation {
        let mut stalls = 0;
        loop {
            if !self.running.load(Ordering::SeqCst) {
                return Actuation::Cancelled;
            }
            if *self.spawns.borrow() != spawn_id {
                return Actuation::Stale;
            }
            let Some(piece) = self.engine.active() else {
                return Actuation::Stale;
            };

            let command = if piece.rotation != target.rotation {
                Command::Rotate
            } else if piece.x > target.column {
                Command::MoveLeft
            } else if piece.x < target.column {
                Command::MoveRight
            } else {
                Command::HardDrop
            };

            if self.engine.apply(command) {
                if command == Command::HardDrop {
                    return Actuation::Placed;
                }
                stalls = 0;
            } else {
                stalls += 1;
                if stalls >= self.config.max_stalls {
                    warn!(
                        "Piece stuck at x={} rotation={} (target column {}), hard dropping",
                        piece.x, piece.rotation, target.column
                    );
                    self.engine.hard_drop();
                    return Actuation::Forced;
                }
            }

            if !self.config.actuation_delay.is_zero() {
                tokio::time::sleep(self.config.actuation_delay).await;
            }
        }
    }
}

/// Handle to a running automated player
pub struct AutoPlayer {
    running: Arc<AtomicBool>,
    task: JoinHandle<()>,
}

impl AutoPlayer {
    /// Start playing `engine` on the given runtime
    pub fn spawn(
        engine: Arc<Engine>,
        scheduler: Arc<Scheduler>,
        config: AutoPlayConfig,
        handle: &Handle,
    ) -> Self {
        let running = Arc::new(AtomicBool::new(true));
        let task = handle.spawn(play(engine, scheduler, config, running.clone()));
        Self { running, task }
    }

    /// Stop issuing commands. A decision in flight is dropped at its next step.
    pub fn stop(&self) {
        if self.running.swap(false, Ordering::SeqCst) {
            info!("Automated player stopping");
        }
    }

    /// False once stopped, either by `stop` or after a failed decision
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst) && !self.task.is_finished()
    }
}

impl Drop for AutoPlayer {
    fn drop(&mut self) {
        self.stop();
    }
}

async fn play(
    engine: Arc<Engine>,
    scheduler: Arc<Scheduler>,
    config: AutoPlayConfig,
    running: Arc<AtomicBool>,
) {
    info!("Automated player started with {} workers", scheduler.workers());
    let mut states = engine.subscribe_state();
    let mut spawns = engine.subscribe_spawns();
    let actuator = Actuator::new(&engine, &running, config);

    while running.load(Ordering::SeqCst) {
        // Sleep through pauses and game over
        let closed = states.wait_for(|s| *s == GameState::Playing).await.is_err();
        if closed || !running.load(Ordering::SeqCst) {
            break;
        }

        let spawn_id = *spawns.borrow_and_update();
        let snapshot = engine.snapshot();
        let Some(active) = snapshot.active.filter(|_| snapshot.state == GameState::Playing) else {
            // Nothing to steer until the next piece or a state change
            tokio::select! {
                changed = spawns.changed() => if changed.is_err() { break },
                changed = states.changed() => if changed.is_err() { break },
            }
            continue;
        };

        let placement = match scheduler
            .compute_best_placement(&snapshot.grid, active.kind, snapshot.next)
            .await
        {
            Ok(placement) => placement,
            Err(e) => {
                error!("Search failed, stopping automated player: {}", e);
                running.store(false, Ordering::SeqCst);
                engine.pause();
                break;
            }
        };

        let outcome = actuator.actuate(placement, spawn_id).await;
        debug!(
            "{:?} to rotation {} column {}: {:?}",
            active.kind, placement.rotation, placement.column, outcome
        );
        if outcome == Actuation::Forced && engine.active().is_some() {
            // Hard drop had no effect (paused mid-move); wait for a change
            // instead of searching the same piece again straight away
            tokio::select! {
                changed = spawns.changed() => if changed.is_err() { break },
                changed = states.changed() => if changed.is_err() { break },
            }
        }
    }
    info!("Automated player stopped");
}
