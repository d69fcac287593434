//! Error types
//!
//! Invalid moves and unreachable placements are ordinary outcomes (a `false`
//! return or a sentinel score) and never show up here.

use thiserror::Error;

/// Failures of one placement decision
#[derive(Error, Debug)]
pub enum SearchError {
    /// A scoring or enumeration task panicked or was cancelled
    #[error("search task failed: {0}")]
    TaskFailed(#[from] tokio::task::JoinError),

    /// The worker pool was shut down while tasks were queued
    #[error("worker pool closed")]
    PoolClosed(#[from] tokio::sync::AcquireError),

    /// A scorer produced a value that cannot be ordered
    #[error("scorer returned {score} for rotation {rotation}, column {column}")]
    InvalidScore {
        rotation: usize,
        column: i32,
        score: f64,
    },

    /// Fewer results came back than tasks were submitted
    #[error("expected {expected} scoring results, received {received}")]
    MissingResults { expected: usize, received: usize },

    /// No legal placement exists for the piece on this board width
    #[error("no placements to evaluate")]
    NoPlacements,
}

/// Mirror protocol decode failures
#[derive(Error, Debug)]
pub enum ProtocolError {
    #[error("malformed message: {0}")]
    Json(#[from] serde_json::Error),

    #[error("board snapshot is {width}x{height} but carries {cells} cells")]
    Dimensions {
        width: usize,
        height: usize,
        cells: usize,
    },

    #[error("board snapshot's active cells do not match its active piece")]
    ActiveMismatch,
}

/// Settings and board construction failures
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("could not determine config directory")]
    NoConfigDir,

    #[error("failed to access settings: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to serialize settings: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("board must be at least 4x4, got {width}x{height}")]
    BoardSize { width: usize, height: usize },
}
