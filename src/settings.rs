//! Game settings and configuration
//!
//! User preferences and combat tuning, persisted as RON next to the executable.

use bevy::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::character::{AttackTiming, DeathSequence, Strike};
use crate::combat::ledger::{EnemyKind, PlayerLedger, REDUCED_INPUT_DAMAGE_SCALE};
use crate::keybindings::Keybindings;

/// How the player drives the character
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum InputProfile {
    /// Keyboard and mouse
    #[default]
    Desktop,
    /// Touch joystick; incoming damage is softened
    ReducedInput,
}

impl InputProfile {
    pub fn damage_scale(&self) -> f32 {
        match self {
            InputProfile::Desktop => 1.0,
            InputProfile::ReducedInput => REDUCED_INPUT_DAMAGE_SCALE,
        }
    }

    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "Desktop" => Some(InputProfile::Desktop),
            "ReducedInput" => Some(InputProfile::ReducedInput),
            _ => None,
        }
    }
}

/// Per-character combat tuning
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct FighterTuning {
    pub damage: f32,
    pub reach: f32,
    /// Walk speed in units per second
    pub move_speed: f32,
    pub first_attack_delay_ms: u64,
    pub next_attack_delay_ms: u64,
}

impl FighterTuning {
    pub fn strike(&self) -> Strike {
        Strike {
            damage: self.damage,
            reach: self.reach,
        }
    }

    pub fn attack_timing(&self) -> AttackTiming {
        AttackTiming {
            first_attack_delay: Duration::from_millis(self.first_attack_delay_ms),
            next_attack_delay: Duration::from_millis(self.next_attack_delay_ms),
        }
    }

    pub fn player() -> Self {
        Self {
            damage: 34.0,
            reach: 2.2,
            move_speed: 5.0,
            first_attack_delay_ms: 500,
            next_attack_delay_ms: 700,
        }
    }

    pub fn enemy(kind: EnemyKind) -> Self {
        let (damage, reach, move_speed) = match kind {
            EnemyKind::Skeleton => (10.0, 1.8, 2.0),
            EnemyKind::Zombie => (12.0, 1.6, 1.2),
            EnemyKind::Spider => (8.0, 1.5, 3.0),
            EnemyKind::Slime => (6.0, 1.4, 1.6),
        };
        Self {
            damage,
            reach,
            move_speed,
            first_attack_delay_ms: 500,
            next_attack_delay_ms: 1500,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct DeathTuning {
    pub grace_ms: u64,
    pub sink_ms: u64,
    pub sink_depth: f32,
}

impl Default for DeathTuning {
    fn default() -> Self {
        Self {
            grace_ms: 1000,
            sink_ms: 4000,
            sink_depth: 10.0,
        }
    }
}

impl DeathTuning {
    pub fn sequence(&self) -> DeathSequence {
        DeathSequence {
            grace: Duration::from_millis(self.grace_ms),
            sink_duration: Duration::from_millis(self.sink_ms),
            sink_depth: self.sink_depth,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CombatTuning {
    pub player: FighterTuning,
    /// Overrides for individual enemy kinds; missing kinds use built-in values
    #[serde(default)]
    pub enemies: HashMap<EnemyKind, FighterTuning>,
    #[serde(default)]
    pub death: DeathTuning,
}

impl Default for CombatTuning {
    fn default() -> Self {
        Self {
            player: FighterTuning::player(),
            enemies: HashMap::new(),
            death: DeathTuning::default(),
        }
    }
}

impl CombatTuning {
    pub fn enemy(&self, kind: EnemyKind) -> FighterTuning {
        self.enemies
            .get(&kind)
            .copied()
            .unwrap_or_else(|| FighterTuning::enemy(kind))
    }
}

/// User-configurable game settings
#[derive(Resource, Clone, Debug, Serialize, Deserialize)]
pub struct GameSettings {
    #[serde(default)]
    pub input_profile: InputProfile,
    #[serde(default = "default_true")]
    pub sounds_enabled: bool,
    #[serde(default)]
    pub keybindings: Keybindings,
    #[serde(default)]
    pub combat: CombatTuning,
}

fn default_true() -> bool {
    true
}

impl Default for GameSettings {
    fn default() -> Self {
        Self {
            input_profile: InputProfile::Desktop,
            sounds_enabled: true,
            keybindings: Keybindings::default(),
            combat: CombatTuning::default(),
        }
    }
}

impl GameSettings {
    fn settings_path() -> PathBuf {
        PathBuf::from("settings.ron")
    }

    /// Load settings from `settings.ron`, or defaults if it is missing or broken
    pub fn load() -> Self {
        Self::load_from(&Self::settings_path())
    }

    pub fn load_from(path: &Path) -> Self {
        if !path.exists() {
            info!("No settings file found, using defaults");
            return Self::default();
        }
        match fs::read_to_string(path) {
            Ok(contents) => match ron::from_str(&contents) {
                Ok(settings) => {
                    info!("Loaded settings from {:?}", path);
                    settings
                }
                Err(e) => {
                    warn!("Failed to parse settings file: {}", e);
                    Self::default()
                }
            },
            Err(e) => {
                warn!("Failed to read settings file: {}", e);
                Self::default()
            }
        }
    }

    pub fn save(&self) -> Result<(), Box<dyn std::error::Error>> {
        self.save_to(&Self::settings_path())
    }

    pub fn save_to(&self, path: &Path) -> Result<(), Box<dyn std::error::Error>> {
        let contents = ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default())?;
        fs::write(path, contents)?;
        info!("Saved settings to {:?}", path);
        Ok(())
    }
}

/// Persists settings changes and keeps derived resources in sync
pub struct SettingsPlugin;

impl Plugin for SettingsPlugin {
    fn build(&self, app: &mut App) {
        app.add_systems(Update, (save_settings_on_change, sync_keybindings, sync_damage_scale));
    }
}

fn save_settings_on_change(settings: Res<GameSettings>) {
    if settings.is_changed() && !settings.is_added() {
        if let Err(e) = settings.save() {
            error!("Failed to save settings: {}", e);
        }
    }
}

/// Keep the Keybindings resource in sync with GameSettings
fn sync_keybindings(settings: Res<GameSettings>, mut keybindings: ResMut<Keybindings>) {
    if settings.is_changed() && !settings.is_added() {
        *keybindings = settings.keybindings.clone();
        info!("Synced keybindings from settings");
    }
}

/// Apply an input profile switch to the player's incoming damage
fn sync_damage_scale(settings: Res<GameSettings>, mut ledger: ResMut<PlayerLedger>) {
    if settings.is_changed() && !settings.is_added() {
        let scale = settings.input_profile.damage_scale();
        if ledger.damage_scale() != scale {
            ledger.set_damage_scale(scale);
            info!("Input profile {:?}, damage scale {}", settings.input_profile, scale);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reduced_input_scales_damage() {
        assert_eq!(InputProfile::Desktop.damage_scale(), 1.0);
        assert_eq!(
            InputProfile::ReducedInput.damage_scale(),
            REDUCED_INPUT_DAMAGE_SCALE
        );
    }

    #[test]
    fn test_partial_settings_fill_defaults() {
        let settings: GameSettings = ron::from_str("(input_profile: ReducedInput)").unwrap();
        assert_eq!(settings.input_profile, InputProfile::ReducedInput);
        assert!(settings.sounds_enabled);
        assert_eq!(settings.combat.player, FighterTuning::player());
    }

    #[test]
    fn test_enemy_override_wins() {
        let mut tuning = CombatTuning::default();
        let mut slow = FighterTuning::enemy(EnemyKind::Spider);
        slow.move_speed = 0.5;
        tuning.enemies.insert(EnemyKind::Spider, slow);
        assert_eq!(tuning.enemy(EnemyKind::Spider).move_speed, 0.5);
        assert_eq!(tuning.enemy(EnemyKind::Zombie), FighterTuning::enemy(EnemyKind::Zombie));
    }

    #[test]
    fn test_missing_file_gives_defaults() {
        let settings = GameSettings::load_from(Path::new("does/not/exist/settings.ron"));
        assert_eq!(settings.input_profile, InputProfile::Desktop);
    }
}
