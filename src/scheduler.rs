//! Fan-out/fan-in placement search
//!
//! One decision enumerates the current and next piece placements in two
//! blocking tasks, scores every (current, next) pair on the blocking pool and
//! reduces once every pair has reported. The pool is bounded by a semaphore
//! so a large board cannot flood the runtime's blocking threads.

use crate::board::Grid;
use crate::error::SearchError;
use crate::evaluator::Scorer;
use crate::search::{enumerate_placements, score_pair, Placement, WorkBoard};
use crate::tetromino::PieceKind;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Semaphore;
use tokio::task::{spawn_blocking, JoinSet};
use tracing::debug;

/// Default number of concurrently running scoring tasks
pub fn default_workers() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(4)
}

pub struct Scheduler {
    scorer: Arc<dyn Scorer>,
    workers: usize,
}

impl Scheduler {
    pub fn new(scorer: Arc<dyn Scorer>, workers: usize) -> Self {
        Self {
            scorer,
            workers: workers.max(1),
        }
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Best placement for `current` given that `next` follows it.
    ///
    /// The active piece on `grid` is ignored; only settled cells count.
    pub async fn compute_best_placement(
        &self,
        grid: &Grid,
        current: PieceKind,
        next: PieceKind,
    ) -> Result<Placement, SearchError> {
        let started = Instant::now();
        let board = Arc::new(WorkBoard::from_grid(grid));
        let width = board.width();

        let (currents, nexts) = tokio::try_join!(
            spawn_blocking(move || enumerate_placements(current, width)),
            spawn_blocking(move || enumerate_placements(next, width)),
        )?;
        if currents.is_empty() || nexts.is_empty() {
            return Err(SearchError::NoPlacements);
        }
        let nexts = Arc::new(nexts);
        let expected = currents.len() * nexts.len();

        let permits = Arc::new(Semaphore::new(self.workers));
        let mut tasks = JoinSet::new();
        for (i, &first) in currents.iter().enumerate() {
            for j in 0..nexts.len() {
                let permit = permits.clone().acquire_owned().await?;
                let board = board.clone();
                let nexts = nexts.clone();
                let scorer = self.scorer.clone();
                tasks.spawn_blocking(move || {
                    let _permit = permit;
                    let score = score_pair(&board, first, nexts[j], scorer.as_ref());
                    (i * nexts.len() + j, score)
                });
            }
        }

        // Drain every task before deciding, keeping the first failure
        let mut scores = Vec::with_capacity(expected);
        let mut failure = None;
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((index, score)) if score.is_nan() => {
                    let placement = currents[index / nexts.len()];
                    failure.get_or_insert(SearchError::InvalidScore {
                        rotation: placement.rotation,
                        column: placement.column,
                        score,
                    });
                }
                Ok(scored) => scores.push(scored),
                Err(e) => {
                    failure.get_or_insert(SearchError::TaskFailed(e));
                }
            }
        }
        if let Some(e) = failure {
            return Err(e);
        }
        if scores.len() != expected {
            return Err(SearchError::MissingResults {
                expected,
                received: scores.len(),
            });
        }

        let (index, score) = reduce_best(scores).ok_or(SearchError::NoPlacements)?;
        let best = currents[index / nexts.len()];
        debug!(
            pairs = expected,
            elapsed_ms = started.elapsed().as_millis() as u64,
            rotation = best.rotation,
            column = best.column,
            score,
            "search finished"
        );
        Ok(best)
    }
}

/// Highest score wins; equal scores go to the lowest index. The result is
/// the same whatever order the scores arrive in.
pub fn reduce_best(scores: impl IntoIterator<Item = (usize, f64)>) -> Option<(usize, f64)> {
    scores.into_iter().fold(None, |best, (index, score)| match best {
        Some((best_index, best_score))
            if best_score > score || (best_score == score && best_index < index) =>
        {
            Some((best_index, best_score))
        }
        _ => Some((index, score)),
    })
}
