//! Wave progression and round restart

use bevy::prelude::*;
use std::f32::consts::TAU;

use crate::character::{CharacterActions, ClipTrace};
use crate::session::{GameRng, RoundOutcome, RoundState};
use crate::settings::GameSettings;

use super::components::{spawn_enemy, Enemy, Player};
use super::ledger::{EnemyId, EnemyKind, EnemyLedger, PlayerLedger};
use super::log::{CombatLog, CombatLogEventType};

/// Enemy waves for a round, fought in order
#[derive(Resource, Debug, Clone)]
pub struct WaveRoster {
    pub waves: Vec<Vec<EnemyKind>>,
    /// Distance from the player at which a wave appears
    pub spawn_radius: f32,
}

impl Default for WaveRoster {
    fn default() -> Self {
        use EnemyKind::*;
        Self {
            waves: vec![
                vec![Skeleton, Skeleton],
                vec![Zombie, Skeleton, Slime],
                vec![Spider, Zombie, Zombie],
                vec![Skeleton, Zombie, Spider, Slime],
            ],
            spawn_radius: 9.0,
        }
    }
}

/// Request to start the round over
#[derive(Event, Debug, Clone, Copy, Default)]
pub struct RestartRound;

/// Spawn the next wave once the previous one is gone, or declare victory
#[allow(clippy::too_many_arguments)]
pub fn advance_waves(
    mut commands: Commands,
    roster: Res<WaveRoster>,
    settings: Res<GameSettings>,
    mut round: ResMut<RoundState>,
    mut enemy_ledger: ResMut<EnemyLedger>,
    player_ledger: Res<PlayerLedger>,
    enemies: Query<(), With<Enemy>>,
    mut rng: ResMut<GameRng>,
    mut combat_log: ResMut<CombatLog>,
) {
    if round.is_over() || player_ledger.is_dead() || !enemies.is_empty() || !enemy_ledger.is_empty() {
        return;
    }

    if round.wave > 0 && round.waves_cleared < round.wave {
        round.waves_cleared = round.wave;
        combat_log.log(
            CombatLogEventType::RoundEvent,
            format!("Wave {} cleared", round.wave),
        );
    }

    let Some(wave) = roster.waves.get(round.wave as usize) else {
        info!("All {} waves cleared", roster.waves.len());
        round.outcome = Some(RoundOutcome::Victory);
        combat_log.log(CombatLogEventType::RoundEvent, "Victory".to_string());
        return;
    };

    round.wave += 1;
    let center = player_ledger.position();
    for (index, kind) in wave.iter().enumerate() {
        let angle = TAU * index as f32 / wave.len() as f32 + rng.random_range(-0.3, 0.3);
        let radius = roster.spawn_radius + rng.random_range(0.0, 2.0);
        let position = Vec3::new(center.x + angle.cos() * radius, 0.0, center.z + angle.sin() * radius);
        let id = EnemyId::new(format!(
            "{}-{}-{}",
            kind.name().to_lowercase(),
            round.wave,
            index + 1
        ));
        if let Err(e) = spawn_enemy(&mut commands, &mut enemy_ledger, &settings.combat, id, *kind, position) {
            warn!("Failed to spawn {}: {}", kind, e);
        }
    }
    combat_log.log(
        CombatLogEventType::RoundEvent,
        format!("Wave {} begins ({} enemies)", round.wave, wave.len()),
    );
}

/// Clear the field and revive the player in place of a fresh spawn
#[allow(clippy::too_many_arguments)]
pub fn restart_round(
    mut commands: Commands,
    mut requests: EventReader<RestartRound>,
    mut round: ResMut<RoundState>,
    mut player_ledger: ResMut<PlayerLedger>,
    mut enemy_ledger: ResMut<EnemyLedger>,
    mut combat_log: ResMut<CombatLog>,
    mut player: Query<(&mut CharacterActions, &mut ClipTrace, &mut Transform), With<Player>>,
    enemies: Query<Entity, With<Enemy>>,
) {
    if requests.read().count() == 0 {
        return;
    }

    for entity in enemies.iter() {
        commands.entity(entity).despawn_recursive();
    }
    enemy_ledger.clear();
    player_ledger.reset(Vec3::ZERO);

    if let Ok((mut actions, mut trace, mut transform)) = player.get_single_mut() {
        actions.reset_actions();
        *trace = ClipTrace::default();
        actions.idle();
        *transform = Transform::default();
    }

    *round = RoundState::default();
    combat_log.clear();
    combat_log.log(CombatLogEventType::RoundEvent, "Round restarted".to_string());
    info!("Round restarted");
}
