//! Keyboard input mapping
//!
//! Terminal key events are matched against the configured bindings and
//! turned into [`Action`]s. Holding a key relies on the terminal's own
//! auto-repeat.

use crate::game::Command;
use crate::settings::Settings;
use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};

/// What a key press asks for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Forwarded to the engine as is
    Engine(Command),
    TogglePause,
    ToggleAi,
    Quit,
}

/// Key bindings configuration - supports multiple keys per action
#[derive(Debug, Clone)]
pub struct KeyBindings {
    bindings: Vec<(Vec<KeyCode>, Action)>,
}

impl KeyBindings {
    /// Parse a key string into KeyCode
    fn parse_key(s: &str) -> Option<KeyCode> {
        let code = match s.to_lowercase().as_str() {
            "left" => KeyCode::Left,
            "right" => KeyCode::Right,
            "up" => KeyCode::Up,
            "down" => KeyCode::Down,
            "space" => KeyCode::Char(' '),
            "enter" => KeyCode::Enter,
            "tab" => KeyCode::Tab,
            "backspace" => KeyCode::Backspace,
            "esc" | "escape" => KeyCode::Esc,
            s => {
                let mut chars = s.chars();
                match (chars.next(), chars.next()) {
                    (Some(c), None) => KeyCode::Char(c),
                    _ => return None,
                }
            }
        };
        Some(code)
    }

    /// Parse a list of key strings, skipping unknown names
    fn parse_keys(keys: &[String]) -> Vec<KeyCode> {
        keys.iter().filter_map(|s| Self::parse_key(s)).collect()
    }

    /// Create keybindings from settings
    pub fn from_settings(settings: &Settings) -> Self {
        let keys = &settings.keys;
        let bindings = vec![
            (&keys.move_left, Action::Engine(Command::MoveLeft)),
            (&keys.move_right, Action::Engine(Command::MoveRight)),
            (&keys.soft_drop, Action::Engine(Command::SoftDrop)),
            (&keys.hard_drop, Action::Engine(Command::HardDrop)),
            (&keys.rotate, Action::Engine(Command::Rotate)),
            (&keys.pause, Action::TogglePause),
            (&keys.reset, Action::Engine(Command::Reset)),
            (&keys.toggle_ai, Action::ToggleAi),
            (&keys.quit, Action::Quit),
        ]
        .into_iter()
        .map(|(names, action)| (Self::parse_keys(names), action))
        .collect();
        Self { bindings }
    }

    /// Map a key event to an action. Releases are ignored.
    pub fn action_for(&self, key: KeyEvent) -> Option<Action> {
        if key.kind == KeyEventKind::Release {
            return None;
        }
        // Ctrl+C always quits
        if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
            return Some(Action::Quit);
        }
        let code = normalize_key(key.code);
        self.bindings
            .iter()
            .find(|(codes, _)| codes.contains(&code))
            .map(|&(_, action)| action)
    }
}

impl Default for KeyBindings {
    fn default() -> Self {
        Self::from_settings(&Settings::default())
    }
}

/// Normalize key codes for consistent handling
fn normalize_key(code: KeyCode) -> KeyCode {
    match code {
        KeyCode::Char(c) => KeyCode::Char(c.to_ascii_lowercase()),
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn press(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    #[test]
    fn test_default_bindings() {
        let keys = KeyBindings::default();
        assert_eq!(
            keys.action_for(press(KeyCode::Left)),
            Some(Action::Engine(Command::MoveLeft))
        );
        assert_eq!(
            keys.action_for(press(KeyCode::Char(' '))),
            Some(Action::Engine(Command::HardDrop))
        );
        assert_eq!(keys.action_for(press(KeyCode::Esc)), Some(Action::TogglePause));
        assert_eq!(keys.action_for(press(KeyCode::Char('i'))), Some(Action::ToggleAi));
        assert_eq!(keys.action_for(press(KeyCode::F(5))), None);
    }

    #[test]
    fn test_uppercase_matches() {
        let keys = KeyBindings::default();
        assert_eq!(
            keys.action_for(press(KeyCode::Char('R'))),
            Some(Action::Engine(Command::Reset))
        );
    }

    #[test]
    fn test_ctrl_c_quits() {
        let keys = KeyBindings::default();
        let event = KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL);
        assert_eq!(keys.action_for(event), Some(Action::Quit));
    }

    #[test]
    fn test_custom_binding_and_unknown_names() {
        let mut settings = Settings::default();
        settings.keys.rotate = vec!["x".to_string(), "nonsense".to_string()];
        let keys = KeyBindings::from_settings(&settings);
        assert_eq!(
            keys.action_for(press(KeyCode::Char('x'))),
            Some(Action::Engine(Command::Rotate))
        );
        assert_eq!(keys.action_for(press(KeyCode::Up)), None);
    }

    #[test]
    fn test_release_ignored() {
        let keys = KeyBindings::default();
        let mut event = press(KeyCode::Left);
        event.kind = KeyEventKind::Release;
        assert_eq!(keys.action_for(event), None);
    }
}
