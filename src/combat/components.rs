//! Combat components and spawning
//!
//! Player and enemies share the same bundle shape: an action state machine,
//! a clip trace, a voice and the strike they deliver.

use bevy::prelude::*;
use thiserror::Error;

use crate::audio::{enemy_sounds, player_sounds, ActionAudio};
use crate::character::{enemy_clips, player_clips, CharacterActions, ClipSetError, ClipTrace, GroundHeight, Strike};
use crate::settings::{CombatTuning, FighterTuning};

use super::ledger::{EnemyId, EnemyKind, EnemyLedger, LedgerError};

/// Marker for the player character
#[derive(Component, Debug, Default)]
pub struct Player;

#[derive(Component, Debug, Clone)]
pub struct Enemy {
    pub id: EnemyId,
    pub kind: EnemyKind,
}

/// Marker for enemies whose attack holds the player in place
#[derive(Component, Debug, Default)]
pub struct Grabs;

/// The strike this character delivers when a swing starts
#[derive(Component, Debug, Clone, Copy)]
pub struct StrikeProfile(pub Strike);

/// Walk speed in units per second
#[derive(Component, Debug, Clone, Copy)]
pub struct MoveSpeed(pub f32);

#[derive(Debug, Error)]
pub enum SpawnError {
    #[error(transparent)]
    Clips(#[from] ClipSetError),
    #[error(transparent)]
    Ledger(#[from] LedgerError),
}

fn character_bundle(
    actions: CharacterActions,
    tuning: &FighterTuning,
    voice: ActionAudio,
    position: Vec3,
) -> impl Bundle {
    (
        actions,
        ClipTrace::default(),
        voice,
        StrikeProfile(tuning.strike()),
        MoveSpeed(tuning.move_speed),
        GroundHeight(position.y),
        Transform::from_translation(position),
    )
}

/// Spawn the player and start its idle loop
pub fn spawn_player(
    commands: &mut Commands,
    tuning: &CombatTuning,
    position: Vec3,
) -> Result<Entity, SpawnError> {
    let mut actions = CharacterActions::new(
        player_clips()?,
        tuning.player.attack_timing(),
        tuning.death.sequence(),
    );
    actions.idle();

    let entity = commands
        .spawn((
            Player,
            Name::new("Player"),
            character_bundle(actions, &tuning.player, player_sounds(), position),
        ))
        .id();
    info!("Spawned player at {:?}", position);
    Ok(entity)
}

/// Register an enemy in the ledger and spawn its entity.
///
/// A duplicate id leaves both the ledger and the world untouched.
pub fn spawn_enemy(
    commands: &mut Commands,
    ledger: &mut EnemyLedger,
    tuning: &CombatTuning,
    id: EnemyId,
    kind: EnemyKind,
    position: Vec3,
) -> Result<Entity, SpawnError> {
    let fighter = tuning.enemy(kind);
    let mut actions = CharacterActions::new(
        enemy_clips(kind)?,
        fighter.attack_timing(),
        tuning.death.sequence(),
    );
    ledger.register_enemy(id.clone(), position, kind)?;
    actions.idle();

    let mut entity = commands.spawn((
        Enemy {
            id: id.clone(),
            kind,
        },
        Name::new(id.to_string()),
        character_bundle(actions, &fighter, enemy_sounds(kind), position),
    ));
    if kind.grabs() {
        entity.insert(Grabs);
    }
    info!("Spawned {} '{}' at {:?}", kind, id, position);
    Ok(entity.id())
}
