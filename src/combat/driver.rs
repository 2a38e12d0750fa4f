//! Character controllers
//!
//! Turn intent into state machine requests and movement. The enemy driver is
//! a scripted stand-in for AI: close the distance, then swing.

use bevy::prelude::*;

use crate::character::CharacterActions;
use crate::input::PlayerIntent;

use super::components::{Enemy, MoveSpeed, Player, StrikeProfile};
use super::ledger::PlayerLedger;

/// Run speed relative to walking
pub const RUN_MULTIPLIER: f32 = 1.8;

/// Enemies stop closing in at this fraction of their reach
pub const ENGAGE_FRACTION: f32 = 0.8;

fn face(transform: &mut Transform, direction: Vec3) {
    if direction.length_squared() > f32::EPSILON {
        transform.look_to(direction, Vec3::Y);
    }
}

pub fn drive_player(
    time: Res<Time>,
    intent: Res<PlayerIntent>,
    ledger: Res<PlayerLedger>,
    mut player: Query<(&mut CharacterActions, &mut Transform, &StrikeProfile, &MoveSpeed), With<Player>>,
) {
    let Ok((mut actions, mut transform, strike, speed)) = player.get_single_mut() else {
        return;
    };
    if actions.is_dead() {
        return;
    }

    if intent.should_walk() && !ledger.is_frozen() {
        actions.walk();
        if actions.is_walking() {
            let direction = intent.movement.direction();
            let pace = if intent.movement.run { RUN_MULTIPLIER } else { 1.0 };
            transform.translation += direction * speed.0 * pace * time.delta_secs();
            face(&mut transform, direction);
        }
    } else if actions.is_walking() {
        actions.stop_walk();
        actions.idle();
    }

    if intent.should_attack() {
        actions.attack(Some(strike.0));
    }
}

pub fn drive_enemies(
    time: Res<Time>,
    player_ledger: Res<PlayerLedger>,
    mut enemies: Query<(&mut CharacterActions, &mut Transform, &StrikeProfile, &MoveSpeed), With<Enemy>>,
) {
    let target = player_ledger.position();
    for (mut actions, mut transform, strike, speed) in enemies.iter_mut() {
        if actions.is_dead() {
            continue;
        }
        if player_ledger.is_dead() {
            if actions.is_walking() {
                actions.stop_walk();
                actions.idle();
            }
            continue;
        }

        let mut offset = target - transform.translation;
        offset.y = 0.0;
        let distance = offset.length();
        let direction = offset.normalize_or_zero();
        let engage = strike.0.reach * ENGAGE_FRACTION;

        if distance <= engage {
            face(&mut transform, direction);
            // While still walking this defers the swing until the feet plant.
            actions.attack(Some(strike.0));
            continue;
        }

        if actions.is_attacking() {
            continue;
        }
        actions.walk();
        if actions.is_walking() {
            let step = (speed.0 * time.delta_secs()).min(distance - engage);
            transform.translation += direction * step;
            face(&mut transform, direction);
        }
    }
}
