//! Keybinding system for remappable controls
//!
//! Bindings are persisted inside `settings.ron` by key name (e.g. `"KeyW"`).

use bevy::prelude::*;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::HashMap;

/// All actions that can be bound to keys
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GameAction {
    // Movement
    MoveUp,
    MoveDown,
    MoveLeft,
    MoveRight,
    Run,
    Jump,

    // Combat
    Attack,

    // Session
    ToggleSound,
    Restart,

    // Camera
    CameraZoomIn,
    CameraZoomOut,
}

impl GameAction {
    pub fn description(&self) -> &'static str {
        match self {
            GameAction::MoveUp => "Move Forward",
            GameAction::MoveDown => "Move Back",
            GameAction::MoveLeft => "Move Left",
            GameAction::MoveRight => "Move Right",
            GameAction::Run => "Run",
            GameAction::Jump => "Jump",
            GameAction::Attack => "Attack",
            GameAction::ToggleSound => "Toggle Sound",
            GameAction::Restart => "Restart Round",
            GameAction::CameraZoomIn => "Camera Zoom In",
            GameAction::CameraZoomOut => "Camera Zoom Out",
        }
    }

    pub fn category(&self) -> &'static str {
        match self {
            GameAction::MoveUp
            | GameAction::MoveDown
            | GameAction::MoveLeft
            | GameAction::MoveRight
            | GameAction::Run
            | GameAction::Jump => "Movement",
            GameAction::Attack => "Combat",
            GameAction::ToggleSound | GameAction::Restart => "Session",
            GameAction::CameraZoomIn | GameAction::CameraZoomOut => "Camera",
        }
    }

    pub fn all() -> Vec<GameAction> {
        vec![
            GameAction::MoveUp,
            GameAction::MoveDown,
            GameAction::MoveLeft,
            GameAction::MoveRight,
            GameAction::Run,
            GameAction::Jump,
            GameAction::Attack,
            GameAction::ToggleSound,
            GameAction::Restart,
            GameAction::CameraZoomIn,
            GameAction::CameraZoomOut,
        ]
    }
}

/// Keys that can be bound, with their persisted name and display label
const NAMED_KEYS: &[(&str, &str, KeyCode)] = &[
    ("Escape", "ESC", KeyCode::Escape),
    ("Enter", "ENTER", KeyCode::Enter),
    ("Space", "SPACE", KeyCode::Space),
    ("Tab", "TAB", KeyCode::Tab),
    ("ShiftLeft", "SHIFT", KeyCode::ShiftLeft),
    ("ShiftRight", "RSHIFT", KeyCode::ShiftRight),
    ("ControlLeft", "CTRL", KeyCode::ControlLeft),
    ("KeyA", "A", KeyCode::KeyA),
    ("KeyD", "D", KeyCode::KeyD),
    ("KeyE", "E", KeyCode::KeyE),
    ("KeyF", "F", KeyCode::KeyF),
    ("KeyJ", "J", KeyCode::KeyJ),
    ("KeyK", "K", KeyCode::KeyK),
    ("KeyM", "M", KeyCode::KeyM),
    ("KeyQ", "Q", KeyCode::KeyQ),
    ("KeyR", "R", KeyCode::KeyR),
    ("KeyS", "S", KeyCode::KeyS),
    ("KeyW", "W", KeyCode::KeyW),
    ("Minus", "-", KeyCode::Minus),
    ("Equal", "=", KeyCode::Equal),
    ("NumpadAdd", "NUM+", KeyCode::NumpadAdd),
    ("NumpadSubtract", "NUM-", KeyCode::NumpadSubtract),
    ("ArrowUp", "↑", KeyCode::ArrowUp),
    ("ArrowDown", "↓", KeyCode::ArrowDown),
    ("ArrowLeft", "←", KeyCode::ArrowLeft),
    ("ArrowRight", "→", KeyCode::ArrowRight),
];

fn key_from_name(name: &str) -> Option<KeyCode> {
    NAMED_KEYS
        .iter()
        .find(|(persisted, _, _)| *persisted == name)
        .map(|(_, _, key)| *key)
}

fn key_to_name(key: KeyCode) -> Option<&'static str> {
    NAMED_KEYS
        .iter()
        .find(|(_, _, candidate)| *candidate == key)
        .map(|(persisted, _, _)| *persisted)
}

/// A key stored by name; unknown names are rejected on load
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoundKey(pub KeyCode);

impl Serialize for BoundKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match key_to_name(self.0) {
            Some(name) => serializer.serialize_str(name),
            None => serializer.serialize_str(&format!("{:?}", self.0)),
        }
    }
}

impl<'de> Deserialize<'de> for BoundKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let name = String::deserialize(deserializer)?;
        key_from_name(&name)
            .map(BoundKey)
            .ok_or_else(|| serde::de::Error::custom(format!("unknown key '{}'", name)))
    }
}

/// Key binding with primary and optional secondary key
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct KeyBinding {
    pub primary: BoundKey,
    #[serde(default)]
    pub secondary: Option<BoundKey>,
}

impl KeyBinding {
    pub fn new(primary: KeyCode) -> Self {
        Self {
            primary: BoundKey(primary),
            secondary: None,
        }
    }

    pub fn with_secondary(primary: KeyCode, secondary: KeyCode) -> Self {
        Self {
            primary: BoundKey(primary),
            secondary: Some(BoundKey(secondary)),
        }
    }

    pub fn matches(&self, key: KeyCode) -> bool {
        self.keys().any(|bound| bound == key)
    }

    fn keys(&self) -> impl Iterator<Item = KeyCode> + '_ {
        std::iter::once(self.primary.0).chain(self.secondary.map(|key| key.0))
    }
}

/// Complete keybindings configuration
#[derive(Debug, Clone, Resource, Serialize, Deserialize)]
pub struct Keybindings {
    bindings: HashMap<GameAction, KeyBinding>,
}

impl Default for Keybindings {
    fn default() -> Self {
        Self::create_defaults()
    }
}

impl Keybindings {
    pub fn create_defaults() -> Self {
        let bindings = HashMap::from([
            (
                GameAction::MoveUp,
                KeyBinding::with_secondary(KeyCode::KeyW, KeyCode::ArrowUp),
            ),
            (
                GameAction::MoveDown,
                KeyBinding::with_secondary(KeyCode::KeyS, KeyCode::ArrowDown),
            ),
            (
                GameAction::MoveLeft,
                KeyBinding::with_secondary(KeyCode::KeyA, KeyCode::ArrowLeft),
            ),
            (
                GameAction::MoveRight,
                KeyBinding::with_secondary(KeyCode::KeyD, KeyCode::ArrowRight),
            ),
            (GameAction::Run, KeyBinding::new(KeyCode::ShiftLeft)),
            (GameAction::Jump, KeyBinding::new(KeyCode::Space)),
            (
                GameAction::Attack,
                KeyBinding::with_secondary(KeyCode::KeyF, KeyCode::KeyJ),
            ),
            (GameAction::ToggleSound, KeyBinding::new(KeyCode::KeyM)),
            (GameAction::Restart, KeyBinding::new(KeyCode::KeyR)),
            (
                GameAction::CameraZoomIn,
                KeyBinding::with_secondary(KeyCode::Equal, KeyCode::NumpadAdd),
            ),
            (
                GameAction::CameraZoomOut,
                KeyBinding::with_secondary(KeyCode::Minus, KeyCode::NumpadSubtract),
            ),
        ]);

        Self { bindings }
    }

    pub fn get(&self, action: GameAction) -> Option<&KeyBinding> {
        self.bindings.get(&action)
    }

    pub fn set(&mut self, action: GameAction, binding: KeyBinding) {
        self.bindings.insert(action, binding);
    }

    pub fn reset_to_defaults(&mut self) {
        *self = Self::create_defaults();
    }

    /// Check if an action is currently held
    pub fn action_pressed(&self, action: GameAction, keyboard: &ButtonInput<KeyCode>) -> bool {
        self.get(action)
            .is_some_and(|binding| binding.keys().any(|key| keyboard.pressed(key)))
    }

    /// Check if an action was pressed this frame
    pub fn action_just_pressed(&self, action: GameAction, keyboard: &ButtonInput<KeyCode>) -> bool {
        self.get(action)
            .is_some_and(|binding| binding.keys().any(|key| keyboard.just_pressed(key)))
    }

    /// Action already using `key`, if any (for conflict detection)
    pub fn is_key_bound(&self, key: KeyCode, exclude_action: Option<GameAction>) -> Option<GameAction> {
        self.bindings
            .iter()
            .find(|(action, binding)| Some(**action) != exclude_action && binding.matches(key))
            .map(|(action, _)| *action)
    }

    /// Human-readable label for a key
    pub fn key_name(key: KeyCode) -> &'static str {
        NAMED_KEYS
            .iter()
            .find(|(_, _, candidate)| *candidate == key)
            .map_or("???", |(_, label, _)| *label)
    }

    pub fn binding_display(&self, action: GameAction) -> String {
        match self.get(action) {
            Some(KeyBinding {
                primary,
                secondary: Some(secondary),
            }) => format!("{} / {}", Self::key_name(primary.0), Self::key_name(secondary.0)),
            Some(binding) => Self::key_name(binding.primary.0).to_string(),
            None => "Unbound".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_action_has_a_default_binding() {
        let bindings = Keybindings::default();
        for action in GameAction::all() {
            assert!(bindings.get(action).is_some(), "{:?} unbound", action);
        }
    }

    #[test]
    fn test_bindings_survive_ron() {
        let bindings = Keybindings::default();
        let text = ron::to_string(&bindings).unwrap();
        let parsed: Keybindings = ron::from_str(&text).unwrap();
        assert_eq!(
            parsed.get(GameAction::Attack),
            bindings.get(GameAction::Attack)
        );
    }

    #[test]
    fn test_unknown_key_name_is_rejected() {
        let parsed: Result<KeyBinding, _> = ron::from_str("(primary: \"KeyNope\")");
        assert!(parsed.is_err());
    }

    #[test]
    fn test_conflict_detection() {
        let bindings = Keybindings::default();
        assert_eq!(
            bindings.is_key_bound(KeyCode::KeyW, None),
            Some(GameAction::MoveUp)
        );
        assert_eq!(bindings.is_key_bound(KeyCode::KeyW, Some(GameAction::MoveUp)), None);
        assert_eq!(bindings.binding_display(GameAction::Run), "SHIFT");
    }
}
