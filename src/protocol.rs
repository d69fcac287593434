//! Mirror wire protocol
//!
//! Messages are single lines of JSON so any line-oriented transport can carry
//! them. A [`MirrorOutbox`] registered on one engine produces the stream;
//! [`apply`] replays it onto another.
//!
//! 1. On every new piece: a full `Board` snapshot
//! 2. Between pieces: optional `Move` deltas
//! 3. On game over: the final result

use crate::error::ProtocolError;
use crate::game::{Command, Engine, EngineListener, EngineSnapshot, GameState};
use crate::score::Score;
use serde::{Deserialize, Serialize};
use std::sync::mpsc;
use tracing::{debug, warn};

/// Messages sent from a mirrored engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum WireMessage {
    /// Complete engine state
    Board(EngineSnapshot),
    /// A single command applied to the source engine
    Move(Command),
    /// The source topped out
    GameOver { last_score: u64, last_lines: u32 },
}

/// Encode a message as one line, newline included
pub fn encode(message: &WireMessage) -> Result<String, ProtocolError> {
    let mut line = serde_json::to_string(message)?;
    line.push('\n');
    Ok(line)
}

/// Decode one line. Surrounding whitespace is ignored.
pub fn decode(line: &str) -> Result<WireMessage, ProtocolError> {
    let message: WireMessage = serde_json::from_str(line.trim())?;
    if let WireMessage::Board(snapshot) = &message {
        snapshot.validate()?;
    }
    Ok(message)
}

/// Replay a message onto a mirror engine. Returns whether the engine changed.
pub fn apply(engine: &Engine, message: WireMessage) -> Result<bool, ProtocolError> {
    match message {
        WireMessage::Board(snapshot) => {
            engine.restore(snapshot)?;
            Ok(true)
        }
        WireMessage::Move(command) => Ok(engine.apply(command)),
        WireMessage::GameOver {
            last_score,
            last_lines,
        } => {
            let mut snapshot = engine.snapshot();
            snapshot.grid.clear();
            snapshot.active = None;
            snapshot.state = GameState::GameOver;
            snapshot.score = Score::default();
            snapshot.last_score = last_score;
            snapshot.last_lines = last_lines;
            engine.restore(snapshot)?;
            Ok(true)
        }
    }
}

/// Engine listener that streams encoded messages into a channel
pub struct MirrorOutbox {
    tx: mpsc::Sender<String>,
}

impl MirrorOutbox {
    pub fn new(tx: mpsc::Sender<String>) -> Self {
        Self { tx }
    }

    /// Outbox plus the receiving end of its channel
    pub fn channel() -> (Self, mpsc::Receiver<String>) {
        let (tx, rx) = mpsc::channel();
        (Self::new(tx), rx)
    }

    fn send(&self, message: &WireMessage) {
        match encode(message) {
            Ok(line) => {
                if self.tx.send(line).is_err() {
                    debug!("Mirror receiver gone, dropping message");
                }
            }
            Err(e) => warn!("Failed to encode mirror message: {}", e),
        }
    }
}

impl EngineListener for MirrorOutbox {
    fn on_new_block(&self, engine: &Engine) {
        self.send(&WireMessage::Board(engine.snapshot()));
    }

    fn on_game_over(&self, engine: &Engine, last_score: u64) {
        let (_, last_lines) = engine.last_result();
        self.send(&WireMessage::GameOver {
            last_score,
            last_lines,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::Cell;
    use crate::game::EngineConfig;
    use crate::tetromino::PieceKind;
    use std::sync::Arc;

    fn engine(seed: u64) -> Engine {
        Engine::new(EngineConfig {
            width: 8,
            height: 12,
            seed: Some(seed),
            ..EngineConfig::default()
        })
        .unwrap()
    }

    #[test]
    fn test_encode_is_one_line() {
        let line = encode(&WireMessage::Move(Command::Rotate)).unwrap();
        assert!(line.ends_with('\n'));
        assert_eq!(line.matches('\n').count(), 1);
        assert_eq!(decode(&line).unwrap(), WireMessage::Move(Command::Rotate));
    }

    #[test]
    fn test_decode_rejects_garbage() {
        assert!(matches!(decode("{not json"), Err(ProtocolError::Json(_))));
        assert!(matches!(
            decode(r#"{"Move":"Teleport"}"#),
            Err(ProtocolError::Json(_))
        ));
    }

    #[test]
    fn test_decode_rejects_short_grid() {
        let source = engine(1);
        let line = encode(&WireMessage::Board(source.snapshot())).unwrap();
        let mut value: serde_json::Value = serde_json::from_str(&line).unwrap();
        value["Board"]["grid"]["cells"]
            .as_array_mut()
            .unwrap()
            .truncate(5);
        let err = decode(&value.to_string()).unwrap_err();
        assert!(matches!(
            err,
            ProtocolError::Dimensions {
                width: 8,
                height: 12,
                cells: 5
            }
        ));
    }

    #[test]
    fn test_decode_rejects_oversized_dimensions() {
        let source = engine(1);
        let line = encode(&WireMessage::Board(source.snapshot())).unwrap();
        let mut value: serde_json::Value = serde_json::from_str(&line).unwrap();
        value["Board"]["grid"]["width"] = serde_json::json!(usize::MAX / 2);
        let err = decode(&value.to_string()).unwrap_err();
        assert!(matches!(
            err,
            ProtocolError::Dimensions {
                height: 12,
                cells: 96,
                ..
            }
        ));
    }

    #[test]
    fn test_board_with_extra_active_cell_is_refused() {
        let source = engine(4);
        let mirror = engine(4);
        source.start();
        source.soft_drop();
        apply(&mirror, WireMessage::Board(source.snapshot())).unwrap();
        let before = mirror.snapshot();

        let mut snapshot = source.snapshot();
        snapshot.grid.set(0, 11, Cell::active(PieceKind::Z));
        let line = encode(&WireMessage::Board(snapshot.clone())).unwrap();
        assert!(matches!(decode(&line), Err(ProtocolError::ActiveMismatch)));
        assert!(matches!(
            apply(&mirror, WireMessage::Board(snapshot)),
            Err(ProtocolError::ActiveMismatch)
        ));
        assert_eq!(mirror.snapshot(), before);
        assert_eq!(mirror.snapshot().grid.active_kinds().len(), 1);
    }

    #[test]
    fn test_outbox_mirrors_every_piece() {
        let source = engine(3);
        let mirror = engine(99);
        let (outbox, rx) = MirrorOutbox::channel();
        source.add_listener(Arc::new(outbox));

        source.start();
        source.soft_drop();
        source.hard_drop();
        source.soft_drop();

        let lines: Vec<String> = rx.try_iter().collect();
        assert_eq!(lines.len(), 2);
        for line in lines {
            apply(&mirror, decode(&line).unwrap()).unwrap();
        }
        assert!(mirror == source);
    }

    #[test]
    fn test_moves_replay_in_lockstep() {
        let source = engine(5);
        let mirror = engine(6);
        source.start();
        source.soft_drop();
        apply(&mirror, WireMessage::Board(source.snapshot())).unwrap();

        for command in [Command::Rotate, Command::MoveLeft, Command::SoftDrop] {
            let changed = source.apply(command);
            let line = encode(&WireMessage::Move(command)).unwrap();
            assert_eq!(apply(&mirror, decode(&line).unwrap()).unwrap(), changed);
        }
        assert_eq!(mirror.snapshot(), source.snapshot());
    }

    #[test]
    fn test_game_over_message() {
        let mirror = engine(2);
        mirror.start();
        mirror.soft_drop();
        let message = WireMessage::GameOver {
            last_score: 512,
            last_lines: 9,
        };
        apply(&mirror, decode(&encode(&message).unwrap()).unwrap()).unwrap();
        assert_eq!(mirror.state(), GameState::GameOver);
        assert_eq!(mirror.last_result(), (512, 9));
        assert!(mirror.active().is_none());
        assert!(mirror.snapshot().grid.is_empty());
    }
}
