//! Character animation and action control
//!
//! - [`clips`]: action to clip mapping, clip commands and their trace
//! - [`animation`]: realises clip commands on a model's `AnimationPlayer`
//! - [`machine`]: the per-entity action state machine
//! - [`timing`]: blend constants, sink tween and throttling

use bevy::prelude::*;
use std::collections::HashMap;

pub mod animation;
pub mod clips;
pub mod machine;
pub mod timing;

pub use clips::{ActionClips, ActionName, ClipCommand, ClipSetError, ClipSpec, ClipTrace, LoopMode};
pub use machine::{ActionOutput, AttackTiming, CharacterActions, DeathSequence, Phase, Strike};

use animation::{AnimationLink, CharacterAnimations};
use crate::combat::ledger::EnemyKind;
use crate::combat::CombatPhase;
use crate::session::gameplay_active;

/// Resting height of a character; the death sink is applied relative to it
#[derive(Component, Debug, Clone, Copy, Default)]
pub struct GroundHeight(pub f32);

/// Plugin for ticking action timers and presenting their results
pub struct CharacterPlugin;

impl Plugin for CharacterPlugin {
    fn build(&self, app: &mut App) {
        app.add_systems(
            Update,
            (
                tick_character_actions.in_set(CombatPhase::Timers),
                (apply_clip_commands, apply_sink_offset).in_set(CombatPhase::Present),
            )
                .run_if(gameplay_active),
        );
    }
}

fn tick_character_actions(time: Res<Time>, mut characters: Query<&mut CharacterActions>) {
    let delta = time.delta();
    for mut actions in characters.iter_mut() {
        actions.tick(delta);
    }
}

/// Drain queued clip commands into the trace and, once linked, the model's player
fn apply_clip_commands(
    mut characters: Query<(
        &mut CharacterActions,
        Option<&mut ClipTrace>,
        Option<(&AnimationLink, &mut CharacterAnimations)>,
    )>,
    mut players: Query<(&mut AnimationPlayer, &mut AnimationTransitions)>,
) {
    for (mut actions, trace, animated) in characters.iter_mut() {
        let commands = actions.take_clip_commands();
        if let Some(mut trace) = trace {
            for command in &commands {
                trace.record(*command);
            }
        }
        let Some((link, mut animations)) = animated else {
            continue;
        };
        let Ok((mut player, mut transitions)) = players.get_mut(link.0) else {
            continue;
        };
        animations.apply(&commands, &mut player, &mut transitions);
        animations.release_finished(&mut player, &transitions);
    }
}

fn apply_sink_offset(mut characters: Query<(&CharacterActions, &GroundHeight, &mut Transform)>) {
    for (actions, ground, mut transform) in characters.iter_mut() {
        if actions.is_dead() {
            transform.translation.y = ground.0 + actions.sink_offset();
        }
    }
}

fn clip_map(prefix: &str, durations: [(ActionName, &str, u64); 5]) -> HashMap<ActionName, ClipSpec> {
    durations
        .into_iter()
        .filter(|(_, _, millis)| *millis > 0)
        .map(|(action, suffix, millis)| {
            (action, ClipSpec::from_millis(format!("{}{}", prefix, suffix), millis))
        })
        .collect()
}

/// Clip table of the player model
pub fn player_clips() -> Result<ActionClips, ClipSetError> {
    ActionClips::from_map(clip_map(
        "Knight_",
        [
            (ActionName::Idle, "Idle", 2000),
            (ActionName::Walk, "Walking_A", 1070),
            (ActionName::Attack, "1H_Melee_Attack_Chop", 1070),
            (ActionName::Die, "Death_A", 1500),
            (ActionName::HitReact, "Hit_A", 670),
        ],
    ))
}

/// Clip table of an enemy model. Slimes have no hit-react clip.
pub fn enemy_clips(kind: EnemyKind) -> Result<ActionClips, ClipSetError> {
    let table = match kind {
        EnemyKind::Skeleton => [
            (ActionName::Idle, "Idle", 2000),
            (ActionName::Walk, "Walking_D_Skeletons", 1330),
            (ActionName::Attack, "1H_Melee_Attack_Slice_Diagonal", 1130),
            (ActionName::Die, "Death_C_Skeletons", 1670),
            (ActionName::HitReact, "Hit_B", 670),
        ],
        EnemyKind::Zombie => [
            (ActionName::Idle, "Idle", 2330),
            (ActionName::Walk, "Walk", 1670),
            (ActionName::Attack, "Attack_Grab", 1500),
            (ActionName::Die, "Death", 2000),
            (ActionName::HitReact, "HitReact", 800),
        ],
        EnemyKind::Spider => [
            (ActionName::Idle, "Idle", 1000),
            (ActionName::Walk, "Walk", 670),
            (ActionName::Attack, "Attack_Bite", 900),
            (ActionName::Die, "Death", 1200),
            (ActionName::HitReact, "Hit", 500),
        ],
        EnemyKind::Slime => [
            (ActionName::Idle, "Idle", 1330),
            (ActionName::Walk, "Hop", 1000),
            (ActionName::Attack, "Splat", 1000),
            (ActionName::Die, "Melt", 1330),
            (ActionName::HitReact, "", 0),
        ],
    };
    ActionClips::from_map(clip_map(&format!("{}_", kind.name()), table))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_model_has_a_complete_clip_table() {
        assert!(player_clips().is_ok_and(|clips| clips.has_hit_react()));
        for kind in EnemyKind::all() {
            let clips = enemy_clips(kind);
            assert!(clips.is_ok(), "{} clips incomplete", kind);
        }
    }

    #[test]
    fn test_slime_has_no_hit_react() {
        let clips = enemy_clips(EnemyKind::Slime).unwrap();
        assert!(!clips.has_hit_react());
        assert_eq!(clips.get(ActionName::Walk).map(|c| c.name.as_str()), Some("Slime_Hop"));
    }
}
