//! Combat system
//!
//! - Health ledgers for the player and live enemies
//! - Typed lifecycle events per topic
//! - Coordination between action state machines and ledgers
//! - Wave progression and combat logging

use bevy::prelude::*;

pub mod components;
pub mod driver;
pub mod events;
pub mod ledger;
pub mod log;
pub mod rounds;
pub mod systems;

use driver::*;
use events::*;
use rounds::*;
use systems::*;

use crate::input::PlayerIntent;
use crate::session::{gameplay_active, RoundState};

/// Per-frame ordering of gameplay work
#[derive(SystemSet, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CombatPhase {
    /// Input, autopilot and scripted drivers issue requests
    Intent,
    /// Action timers advance
    Timers,
    /// Transforms are copied into the ledgers
    Sync,
    /// Action outputs become ledger mutations
    Resolve,
    /// Ledger events reach state machines and the log
    React,
    /// Clip commands, sink offsets and sounds reach the engine
    Present,
}

/// Plugin for the combat system
pub struct CombatPlugin;

impl Plugin for CombatPlugin {
    fn build(&self, app: &mut App) {
        app
            // Combat events
            .add_event::<PlayerEvent>()
            .add_event::<EnemyEvent>()
            .add_event::<RestartRound>()
            // Resources
            .init_resource::<log::CombatLog>()
            .init_resource::<ledger::EnemyLedger>()
            .init_resource::<ledger::PlayerLedger>()
            .init_resource::<PlayerIntent>()
            .init_resource::<RoundState>()
            .init_resource::<WaveRoster>()
            .configure_sets(
                Update,
                (
                    CombatPhase::Intent,
                    CombatPhase::Timers,
                    CombatPhase::Sync,
                    CombatPhase::Resolve,
                    CombatPhase::React,
                    CombatPhase::Present,
                )
                    .chain(),
            )
            // Systems
            .add_systems(
                Update,
                (
                    (advance_waves, drive_player, drive_enemies)
                        .chain()
                        .in_set(CombatPhase::Intent),
                    sync_ledger_positions.in_set(CombatPhase::Sync),
                    (resolve_player_actions, resolve_enemy_actions)
                        .chain()
                        .in_set(CombatPhase::Resolve),
                    (react_to_player_events, react_to_enemy_events, record_combat_log)
                        .chain()
                        .in_set(CombatPhase::React),
                )
                    .run_if(gameplay_active),
            )
            .add_systems(Update, restart_round.before(CombatPhase::Intent));
    }
}
