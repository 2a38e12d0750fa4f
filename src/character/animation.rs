//! Bridge from clip commands to Bevy's animation player
//!
//! A character whose glTF model has loaded gets a [`CharacterAnimations`]
//! graph built from the model's named clips, then an [`AnimationLink`] to the
//! scene entity carrying the [`AnimationPlayer`]. From then on the Present
//! phase realises every [`ClipCommand`] on that player:
//!
//! - a play followed by a matching cross-fade goes through
//!   [`AnimationTransitions`], fading out the previous main clip
//! - a bare play (hit react, death pose) starts on top of the main clip
//! - once clips that are not clamped are stopped when they finish

use bevy::animation::RepeatAnimation;
use bevy::gltf::Gltf;
use bevy::prelude::*;
use std::collections::{HashMap, HashSet};
use std::time::Duration;

use super::clips::{ActionName, ClipCommand, LoopMode};
use super::machine::{CharacterActions, Phase};

/// glTF model whose named animations supply a character's clips
#[derive(Component, Debug, Clone)]
pub struct CharacterModel(pub Handle<Gltf>);

/// Animation graph of one character, keyed by action
#[derive(Component, Debug, Clone, Default)]
pub struct CharacterAnimations {
    pub graph: Handle<AnimationGraph>,
    nodes: HashMap<ActionName, AnimationNodeIndex>,
    /// Nodes that hold their last frame when finished
    clamped: HashSet<AnimationNodeIndex>,
}

impl CharacterAnimations {
    pub fn new(graph: Handle<AnimationGraph>, nodes: HashMap<ActionName, AnimationNodeIndex>) -> Self {
        Self {
            graph,
            nodes,
            clamped: HashSet::new(),
        }
    }

    pub fn node(&self, action: ActionName) -> Option<AnimationNodeIndex> {
        self.nodes.get(&action).copied()
    }

    /// Realise `commands`, in order, on the linked player
    pub fn apply(
        &mut self,
        commands: &[ClipCommand],
        player: &mut AnimationPlayer,
        transitions: &mut AnimationTransitions,
    ) {
        for (index, command) in commands.iter().enumerate() {
            match *command {
                ClipCommand::Play {
                    action,
                    looping,
                    clamp_when_finished,
                } => {
                    let Some(node) = self.node(action) else {
                        continue;
                    };
                    let blend = commands[index + 1..].iter().find_map(|next| match *next {
                        ClipCommand::CrossFade { to, blend, .. } if to == action => Some(blend),
                        _ => None,
                    });
                    let active = match blend {
                        Some(blend) => transitions.play(player, node, blend),
                        None => player.start(node),
                    };
                    match looping {
                        LoopMode::Repeat => active.repeat(),
                        LoopMode::Once => active.set_repeat(RepeatAnimation::Never),
                    };
                    if clamp_when_finished {
                        self.clamped.insert(node);
                    } else {
                        self.clamped.remove(&node);
                    }
                }
                ClipCommand::Stop(action) => {
                    if let Some(node) = self.node(action) {
                        player.stop(node);
                        self.clamped.remove(&node);
                    }
                }
                // Realised together with its play
                ClipCommand::CrossFade { .. } => {}
            }
        }
    }

    /// Stop finished overlays; the main clip and clamped poses stay
    pub fn release_finished(&self, player: &mut AnimationPlayer, transitions: &AnimationTransitions) {
        let main = transitions.get_main_animation();
        let finished: Vec<AnimationNodeIndex> = player
            .playing_animations()
            .filter(|(node, active)| {
                active.is_finished() && Some(**node) != main && !self.clamped.contains(*node)
            })
            .map(|(node, _)| *node)
            .collect();
        for node in finished {
            player.stop(node);
        }
    }

    /// Start the loop matching `phase`, for players linked after the
    /// character's own commands were already drained
    pub fn resume(&mut self, phase: Phase, player: &mut AnimationPlayer, transitions: &mut AnimationTransitions) {
        let command = match phase {
            Phase::Idle | Phase::ReceivingHit => ClipCommand::play(ActionName::Idle, LoopMode::Repeat),
            Phase::Walking => ClipCommand::play(ActionName::Walk, LoopMode::Repeat),
            Phase::Attacking => ClipCommand::play(ActionName::Attack, LoopMode::Once),
            Phase::Dead => ClipCommand::Play {
                action: ActionName::Die,
                looping: LoopMode::Once,
                clamp_when_finished: true,
            },
        };
        let ClipCommand::Play { action, .. } = command else {
            return;
        };
        let fade = ClipCommand::CrossFade {
            from: action,
            to: action,
            blend: Duration::ZERO,
        };
        self.apply(&[command, fade], player, transitions);
    }
}

/// The entity holding a character's `AnimationPlayer`
#[derive(Component, Debug, Clone, Copy)]
pub struct AnimationLink(pub Entity);

/// Builds animation graphs for loaded models and links their players
pub struct ModelAnimationPlugin;

impl Plugin for ModelAnimationPlugin {
    fn build(&self, app: &mut App) {
        app.add_systems(Update, (build_animation_graphs, link_animation_players).chain());
    }
}

fn build_animation_graphs(
    mut commands: Commands,
    gltfs: Res<Assets<Gltf>>,
    mut graphs: ResMut<Assets<AnimationGraph>>,
    characters: Query<(Entity, &CharacterModel, &CharacterActions), Without<CharacterAnimations>>,
) {
    for (entity, model, actions) in characters.iter() {
        let Some(gltf) = gltfs.get(&model.0) else {
            continue;
        };

        let mut graph = AnimationGraph::new();
        let mut nodes = HashMap::new();
        for action in ActionName::all() {
            let Some(clip) = actions.clips().get(action) else {
                continue;
            };
            match gltf.named_animations.get(clip.name.as_str()) {
                Some(handle) => {
                    nodes.insert(action, graph.add_clip(handle.clone(), 1.0, graph.root));
                }
                None => warn!("Model has no animation named '{}'", clip.name),
            }
        }

        commands
            .entity(entity)
            .insert(CharacterAnimations::new(graphs.add(graph), nodes));
    }
}

fn find_animation_player(
    root: Entity,
    children: &Query<&Children>,
    players: &Query<&mut AnimationPlayer>,
) -> Option<Entity> {
    let mut queue = vec![root];
    while let Some(entity) = queue.pop() {
        if players.contains(entity) {
            return Some(entity);
        }
        if let Ok(kids) = children.get(entity) {
            queue.extend(kids.iter());
        }
    }
    None
}

/// Attach the graph to the model's player once its scene has spawned
fn link_animation_players(
    mut commands: Commands,
    mut characters: Query<(Entity, &CharacterActions, &mut CharacterAnimations), Without<AnimationLink>>,
    children: Query<&Children>,
    mut players: Query<&mut AnimationPlayer>,
) {
    for (entity, actions, mut animations) in characters.iter_mut() {
        let Some(player_entity) = find_animation_player(entity, &children, &players) else {
            continue;
        };
        let Ok(mut player) = players.get_mut(player_entity) else {
            continue;
        };

        let mut transitions = AnimationTransitions::new();
        animations.resume(actions.phase(), &mut player, &mut transitions);
        commands.entity(player_entity).insert((
            AnimationGraphHandle(animations.graph.clone()),
            transitions,
        ));
        commands.entity(entity).insert(AnimationLink(player_entity));
        debug!("Linked animation player for {:?}", entity);
    }
}
