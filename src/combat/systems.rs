//! Combat coordination systems
//!
//! Routes state machine outputs to ledger mutations and ledger events back to
//! state machines. All of it runs inside the chained [`CombatPhase`] sets, so
//! a fatal hit and the victim's `die()` land in the same frame.
//!
//! [`CombatPhase`]: super::CombatPhase

use bevy::prelude::*;

use crate::audio::AudioCue;
use crate::character::{ActionName, ActionOutput, CharacterActions};
use crate::session::{RoundOutcome, RoundState};

use super::components::{Enemy, Grabs, Player, StrikeProfile};
use super::events::{EnemyEvent, PlayerEvent};
use super::ledger::{within_reach, EnemyLedger, PlayerLedger};
use super::log::{CombatLog, CombatLogEventType};

/// Copy live characters' positions into their ledgers
pub fn sync_ledger_positions(
    mut player_ledger: ResMut<PlayerLedger>,
    mut enemy_ledger: ResMut<EnemyLedger>,
    player: Query<&Transform, With<Player>>,
    enemies: Query<(&Enemy, &Transform)>,
) {
    if let Ok(transform) = player.get_single() {
        if !player_ledger.is_dead() {
            player_ledger.update_position(transform.translation);
        }
    }
    for (enemy, transform) in enemies.iter() {
        if enemy_ledger.is_alive(&enemy.id) {
            enemy_ledger.update_enemy_position(&enemy.id, transform.translation);
        }
    }
}

/// Drain the player's action outputs
pub fn resolve_player_actions(
    mut player: Query<(Entity, &mut CharacterActions), With<Player>>,
    mut player_ledger: ResMut<PlayerLedger>,
    mut enemy_ledger: ResMut<EnemyLedger>,
    mut player_events: EventWriter<PlayerEvent>,
    mut enemy_events: EventWriter<EnemyEvent>,
    mut cues: EventWriter<AudioCue>,
    mut round: ResMut<RoundState>,
) {
    for (entity, mut actions) in player.iter_mut() {
        for output in actions.take_outputs() {
            match output {
                ActionOutput::AttackStarted => {
                    cues.send(AudioCue {
                        entity,
                        action: ActionName::Attack,
                    });
                }
                ActionOutput::Impact(strike) => {
                    if player_ledger.is_dead() {
                        debug!("Dropping impact from dead player");
                        continue;
                    }
                    player_ledger.attack(&mut player_events);
                    let origin = player_ledger.position();
                    for id in enemy_ledger.within_reach(origin, strike.reach) {
                        enemy_ledger.damage(&id, strike.damage, &mut enemy_events);
                    }
                }
                ActionOutput::AttackFinished | ActionOutput::SinkStarted => {}
                ActionOutput::DeathComplete => {
                    if !round.is_over() {
                        info!("Player death sequence complete");
                        round.outcome = Some(RoundOutcome::Defeat);
                    }
                }
            }
        }
    }
}

/// Drain every enemy's action outputs
#[allow(clippy::too_many_arguments)]
pub fn resolve_enemy_actions(
    mut commands: Commands,
    mut enemies: Query<(Entity, &Enemy, &StrikeProfile, &mut CharacterActions, Has<Grabs>)>,
    mut player_ledger: ResMut<PlayerLedger>,
    mut enemy_ledger: ResMut<EnemyLedger>,
    mut player_events: EventWriter<PlayerEvent>,
    mut cues: EventWriter<AudioCue>,
    mut combat_log: ResMut<CombatLog>,
) {
    for (entity, enemy, profile, mut actions, grabs) in enemies.iter_mut() {
        for output in actions.take_outputs() {
            match output {
                ActionOutput::AttackStarted => {
                    cues.send(AudioCue {
                        entity,
                        action: ActionName::Attack,
                    });
                    let holds = grabs
                        && !player_ledger.is_dead()
                        && enemy_ledger.get(&enemy.id).is_some_and(|record| {
                            !record.is_dead
                                && within_reach(record.position, player_ledger.position(), profile.0.reach)
                        });
                    if holds {
                        player_ledger.freeze(enemy.id.clone());
                        combat_log.log(
                            CombatLogEventType::Hold,
                            format!("{} grabs the player", enemy.id),
                        );
                    }
                }
                ActionOutput::Impact(strike) => {
                    let Some(record) = enemy_ledger.get(&enemy.id).filter(|record| !record.is_dead) else {
                        debug!("Dropping impact from dead enemy {}", enemy.id);
                        continue;
                    };
                    if within_reach(record.position, player_ledger.position(), strike.reach) {
                        player_ledger.damage(strike.damage, &mut player_events);
                    }
                }
                ActionOutput::AttackFinished => release_hold(&mut player_ledger, &mut combat_log, enemy),
                ActionOutput::SinkStarted => {}
                ActionOutput::DeathComplete => {
                    release_hold(&mut player_ledger, &mut combat_log, enemy);
                    enemy_ledger.remove_enemy(&enemy.id);
                    commands.entity(entity).despawn_recursive();
                    debug!("Despawned {}", enemy.id);
                }
            }
        }
    }
}

fn release_hold(player_ledger: &mut PlayerLedger, combat_log: &mut CombatLog, enemy: &Enemy) {
    if player_ledger.frozen_by().any(|id| *id == enemy.id) {
        player_ledger.unfreeze(&enemy.id);
        combat_log.log(
            CombatLogEventType::Hold,
            format!("{} releases the player", enemy.id),
        );
    }
}

/// Push player ledger events into the player's state machine
pub fn react_to_player_events(
    mut events: EventReader<PlayerEvent>,
    mut player: Query<(Entity, &mut CharacterActions), With<Player>>,
    mut cues: EventWriter<AudioCue>,
) {
    let Ok((entity, mut actions)) = player.get_single_mut() else {
        events.clear();
        return;
    };
    for event in events.read() {
        let action = match event {
            PlayerEvent::DamageReceived => {
                actions.receive_hit();
                ActionName::HitReact
            }
            PlayerEvent::Died => {
                info!("Player died");
                actions.die();
                ActionName::Die
            }
            PlayerEvent::Attacked => continue,
        };
        cues.send(AudioCue { entity, action });
    }
}

/// Push enemy ledger events into the matching enemy's state machine
pub fn react_to_enemy_events(
    mut events: EventReader<EnemyEvent>,
    mut enemies: Query<(Entity, &Enemy, &mut CharacterActions)>,
    mut player_ledger: ResMut<PlayerLedger>,
    mut cues: EventWriter<AudioCue>,
    mut round: ResMut<RoundState>,
) {
    for event in events.read() {
        if let EnemyEvent::Died { id } = event {
            // A dead enemy's swing never finishes, so its hold is released here.
            player_ledger.unfreeze(id);
            round.enemies_defeated += 1;
        }

        let Some((entity, enemy, mut actions)) = enemies
            .iter_mut()
            .find(|(_, enemy, _)| enemy.id == *event.id())
        else {
            debug!("No entity for enemy {}", event.id());
            continue;
        };

        let action = match event {
            EnemyEvent::DamageReceived { .. } => {
                actions.receive_hit();
                ActionName::HitReact
            }
            EnemyEvent::Died { .. } => {
                info!("{} '{}' destroyed", enemy.kind, enemy.id);
                actions.die();
                ActionName::Die
            }
        };
        cues.send(AudioCue { entity, action });
    }
}

/// Record events to the combat log
pub fn record_combat_log(
    mut combat_log: ResMut<CombatLog>,
    time: Res<Time>,
    mut player_events: EventReader<PlayerEvent>,
    mut enemy_events: EventReader<EnemyEvent>,
    player_ledger: Res<PlayerLedger>,
    enemy_ledger: Res<EnemyLedger>,
) {
    combat_log.round_time += time.delta_secs();

    for event in player_events.read() {
        match event {
            PlayerEvent::DamageReceived => combat_log.log(
                CombatLogEventType::Damage,
                format!("Player is hit ({:.0} health left)", player_ledger.health()),
            ),
            PlayerEvent::Died => {
                combat_log.log(CombatLogEventType::Death, "Player has fallen".to_string())
            }
            PlayerEvent::Attacked => {
                combat_log.log(CombatLogEventType::Attack, "Player swings".to_string())
            }
        }
    }

    for event in enemy_events.read() {
        match event {
            EnemyEvent::DamageReceived { id } => {
                let health = enemy_ledger.get(id).map_or(0.0, |record| record.health);
                combat_log.log(
                    CombatLogEventType::Damage,
                    format!("{} is hit ({:.0} health left)", id, health),
                );
            }
            EnemyEvent::Died { id } => {
                combat_log.log(CombatLogEventType::Death, format!("{} has been destroyed", id))
            }
        }
    }
}
