//! Grimbrawl - Halloween graveyard brawler
//!
//! A player character fights waves of skeletons, zombies, spiders and slimes.
//! This library holds the character action state machines, the health ledgers
//! and the systems coordinating them, for both the windowed game and headless
//! simulation.

use bevy::prelude::*;

pub mod arena;
pub mod audio;
pub mod camera;
pub mod character;
pub mod cli;
pub mod combat;
pub mod headless;
pub mod input;
pub mod keybindings;
pub mod session;
pub mod settings;

// Re-export commonly used types
pub use character::{ActionName, CharacterActions, Phase};
pub use combat::ledger::{EnemyId, EnemyKind, EnemyLedger, PlayerLedger};
pub use combat::log::{CombatLog, CombatLogEventType};
pub use headless::HeadlessRoundConfig;

use audio::ActionAudioPlugin;
use character::CharacterPlugin;
use combat::components::spawn_player;
use combat::CombatPlugin;
use session::{AssetGate, GameRng, GameSession};
use settings::GameSettings;

/// Core gameplay shared by windowed and headless runs
pub struct GamePlugin {
    pub settings: GameSettings,
}

impl Plugin for GamePlugin {
    fn build(&self, app: &mut App) {
        app.insert_resource(self.settings.clone())
            .insert_resource(self.settings.keybindings.clone())
            .insert_resource(PlayerLedger::new(self.settings.input_profile.damage_scale()))
            .insert_resource(GameSession {
                sounds_enabled: self.settings.sounds_enabled,
                ..default()
            })
            .init_resource::<AssetGate>()
            .init_resource::<GameRng>()
            .add_plugins((CombatPlugin, CharacterPlugin, ActionAudioPlugin))
            .add_systems(Startup, spawn_player_character);
    }
}

fn spawn_player_character(
    mut commands: Commands,
    settings: Res<GameSettings>,
    mut ledger: ResMut<PlayerLedger>,
) {
    ledger.reset(Vec3::ZERO);
    if let Err(e) = spawn_player(&mut commands, &settings.combat, Vec3::ZERO) {
        error!("Failed to spawn player: {}", e);
    }
}
