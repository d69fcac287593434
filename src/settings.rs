//! Settings persistence using TOML
//!
//! Stores settings in ~/.config/blockfall/settings.toml (or platform equivalent)

use crate::autoplay::AutoPlayConfig;
use crate::board::{DEFAULT_HEIGHT, DEFAULT_WIDTH};
use crate::error::ConfigError;
use crate::evaluator::Weights;
use crate::game::EngineConfig;
use crate::randomizer::RandomizerMode;
use crate::scheduler::default_workers;
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

/// Maximum number of kept high scores
pub const HIGH_SCORE_LIMIT: usize = 10;

/// Game settings
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Keybindings
    pub keys: KeyBindings,
    /// Board size, gravity and piece generation
    pub board: BoardSettings,
    /// Automated player
    pub ai: AiSettings,
    /// Visual settings
    pub visual: VisualSettings,
    pub high_scores: Vec<ScoreEntry>,
}

/// Key bindings (stored as strings for easy editing)
/// Each action can have one or more keys bound to it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KeyBindings {
    #[serde(deserialize_with = "deserialize_keys", serialize_with = "serialize_keys")]
    pub move_left: Vec<String>,
    #[serde(deserialize_with = "deserialize_keys", serialize_with = "serialize_keys")]
    pub move_right: Vec<String>,
    #[serde(deserialize_with = "deserialize_keys", serialize_with = "serialize_keys")]
    pub soft_drop: Vec<String>,
    #[serde(deserialize_with = "deserialize_keys", serialize_with = "serialize_keys")]
    pub hard_drop: Vec<String>,
    #[serde(deserialize_with = "deserialize_keys", serialize_with = "serialize_keys")]
    pub rotate: Vec<String>,
    #[serde(deserialize_with = "deserialize_keys", serialize_with = "serialize_keys")]
    pub pause: Vec<String>,
    #[serde(deserialize_with = "deserialize_keys", serialize_with = "serialize_keys")]
    pub reset: Vec<String>,
    #[serde(deserialize_with = "deserialize_keys", serialize_with = "serialize_keys")]
    pub toggle_ai: Vec<String>,
    #[serde(deserialize_with = "deserialize_keys", serialize_with = "serialize_keys")]
    pub quit: Vec<String>,
}

/// Deserialize keys as either a single string or array of strings
fn deserialize_keys<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    use serde::de::{self, Visitor};

    struct KeysVisitor;

    impl<'de> Visitor<'de> for KeysVisitor {
        type Value = Vec<String>;

        fn expecting(&self, formatter: &mut std::fmt::Formatter) -> std::fmt::Result {
            formatter.write_str("a string or array of strings")
        }

        fn visit_str<E>(self, v: &str) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            Ok(vec![v.to_string()])
        }

        fn visit_seq<A>(self, mut seq: A) -> Result<Self::Value, A::Error>
        where
            A: de::SeqAccess<'de>,
        {
            let mut keys = Vec::new();
            while let Some(key) = seq.next_element::<String>()? {
                keys.push(key);
            }
            Ok(keys)
        }
    }

    deserializer.deserialize_any(KeysVisitor)
}

/// Serialize keys: single key as string, multiple as array
fn serialize_keys<S>(keys: &Vec<String>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    use serde::ser::SerializeSeq;

    if keys.len() == 1 {
        serializer.serialize_str(&keys[0])
    } else {
        let mut seq = serializer.serialize_seq(Some(keys.len()))?;
        for key in keys {
            seq.serialize_element(key)?;
        }
        seq.end()
    }
}

/// Board settings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BoardSettings {
    pub width: usize,
    pub height: usize,
    /// Milliseconds between gravity steps
    pub gravity_ms: u64,
    pub randomizer: RandomizerMode,
    /// Fixed piece sequence; random when absent
    pub seed: Option<u64>,
}

/// Automated player settings
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AiSettings {
    /// Start with the automated player in control
    pub enabled_on_start: bool,
    /// Concurrent scoring tasks, 0 for one per core
    pub workers: usize,
    pub actuation_delay_ms: u64,
    pub max_stalls: u32,
    pub weights: Weights,
}

/// Visual settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct VisualSettings {
    /// Block style: "solid", "bracket", "round"
    pub block_style: String,
}

/// A single high score entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreEntry {
    pub score: u64,
    pub lines: u32,
    /// Played by the automated player
    #[serde(default)]
    pub automated: bool,
}

impl Default for KeyBindings {
    fn default() -> Self {
        Self {
            move_left: vec!["Left".to_string(), "a".to_string()],
            move_right: vec!["Right".to_string(), "d".to_string()],
            soft_drop: vec!["Down".to_string(), "s".to_string()],
            hard_drop: vec!["Space".to_string()],
            rotate: vec!["Up".to_string(), "w".to_string()],
            pause: vec!["p".to_string(), "Esc".to_string()],
            reset: vec!["r".to_string()],
            toggle_ai: vec!["i".to_string()],
            quit: vec!["q".to_string()],
        }
    }
}

impl Default for BoardSettings {
    fn default() -> Self {
        Self {
            width: DEFAULT_WIDTH,
            height: DEFAULT_HEIGHT,
            gravity_ms: 500,
            randomizer: RandomizerMode::Uniform,
            seed: None,
        }
    }
}

impl Default for AiSettings {
    fn default() -> Self {
        Self {
            enabled_on_start: false,
            workers: 0,
            actuation_delay_ms: 40,
            max_stalls: 3,
            weights: Weights::default(),
        }
    }
}

impl Default for VisualSettings {
    fn default() -> Self {
        Self {
            block_style: "solid".to_string(),
        }
    }
}

impl Settings {
    /// Get the config directory path
    fn config_dir() -> Option<PathBuf> {
        ProjectDirs::from("com", "blockfall", "blockfall")
            .map(|dirs| dirs.config_dir().to_path_buf())
    }

    /// Get the settings file path
    pub fn settings_path() -> Option<PathBuf> {
        Self::config_dir().map(|dir| dir.join("settings.toml"))
    }

    /// Load settings from file, or create default
    pub fn load() -> Self {
        let Some(path) = Self::settings_path() else {
            return Self::default();
        };

        match fs::read_to_string(&path) {
            Ok(contents) => Self::parse(&contents),
            Err(_) => Self::default(),
        }
    }

    /// Parse settings text; anything unreadable falls back to defaults
    pub fn parse(contents: &str) -> Self {
        toml::from_str(contents).unwrap_or_default()
    }

    /// Save settings to file
    pub fn save(&self) -> Result<(), ConfigError> {
        let dir = Self::config_dir().ok_or(ConfigError::NoConfigDir)?;
        fs::create_dir_all(&dir)?;
        fs::write(dir.join("settings.toml"), self.to_toml()?)?;
        Ok(())
    }

    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Engine options for a new game
    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig {
            width: self.board.width,
            height: self.board.height,
            randomizer: self.board.randomizer,
            seed: self.board.seed,
        }
    }

    pub fn gravity(&self) -> Duration {
        Duration::from_millis(self.board.gravity_ms.max(1))
    }

    pub fn autoplay_config(&self) -> AutoPlayConfig {
        AutoPlayConfig {
            workers: match self.ai.workers {
                0 => default_workers(),
                n => n,
            },
            actuation_delay: Duration::from_millis(self.ai.actuation_delay_ms),
            max_stalls: self.ai.max_stalls.max(1),
        }
    }

    /// Record a finished game, keeping the best `HIGH_SCORE_LIMIT`.
    /// Returns whether the entry made the table.
    pub fn add_score(&mut self, score: u64, lines: u32, automated: bool) -> bool {
        if score == 0 {
            return false;
        }
        let entry = ScoreEntry {
            score,
            lines,
            automated,
        };
        self.high_scores.push(entry.clone());
        self.high_scores.sort_by(|a, b| b.score.cmp(&a.score));
        self.high_scores.truncate(HIGH_SCORE_LIMIT);
        self.high_scores.contains(&entry)
    }

    /// Get the best recorded score
    pub fn best_score(&self) -> Option<u64> {
        self.high_scores.first().map(|e| e.score)
    }
}

impl VisualSettings {
    /// Get the block characters based on style
    pub fn block_chars(&self) -> (&'static str, &'static str) {
        match self.block_style.as_str() {
            "bracket" => ("[]", " ."),
            "round" => ("()", " ."),
            _ => ("██", "░░"), // "solid" or default
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_round_trip() {
        let settings = Settings::default();
        let text = settings.to_toml().unwrap();
        assert_eq!(Settings::parse(&text), settings);
    }

    #[test]
    fn test_single_key_or_list() {
        let settings = Settings::parse(
            r#"
            [keys]
            rotate = "x"
            quit = ["q", "Esc"]
            "#,
        );
        assert_eq!(settings.keys.rotate, vec!["x"]);
        assert_eq!(settings.keys.quit, vec!["q", "Esc"]);
        // Untouched bindings keep their defaults
        assert_eq!(settings.keys.hard_drop, vec!["Space"]);
    }

    #[test]
    fn test_partial_sections() {
        let settings = Settings::parse(
            r#"
            [board]
            width = 12
            randomizer = "bag"

            [ai]
            workers = 3
            [ai.weights]
            holes = -4.0
            "#,
        );
        assert_eq!(settings.board.width, 12);
        assert_eq!(settings.board.height, DEFAULT_HEIGHT);
        assert_eq!(settings.board.randomizer, RandomizerMode::Bag);
        assert_eq!(settings.autoplay_config().workers, 3);
        assert_eq!(settings.ai.weights.holes, -4.0);
        assert_eq!(settings.ai.weights.wall, Weights::default().wall);
    }

    #[test]
    fn test_invalid_file_falls_back() {
        assert_eq!(Settings::parse("[board\nwidth = "), Settings::default());
    }

    #[test]
    fn test_high_score_table() {
        let mut settings = Settings::default();
        for score in 1..=12 {
            settings.add_score(score * 100, score as u32, false);
        }
        assert_eq!(settings.high_scores.len(), HIGH_SCORE_LIMIT);
        assert_eq!(settings.best_score(), Some(1200));
        assert!(!settings.add_score(50, 0, true));
        assert!(settings.add_score(5000, 40, true));
        assert_eq!(settings.best_score(), Some(5000));
        assert!(!settings.add_score(0, 0, false));
    }

    #[test]
    fn test_engine_config_from_board() {
        let mut settings = Settings::default();
        settings.board.seed = Some(42);
        let config = settings.engine_config();
        assert_eq!(config.width, DEFAULT_WIDTH);
        assert_eq!(config.seed, Some(42));
        assert_eq!(settings.gravity(), Duration::from_millis(500));
    }
}
