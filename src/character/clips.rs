//! Animation clip mapping and playback commands
//!
//! A character never touches clip data directly. It is handed an [`ActionClips`]
//! table at spawn time and expresses everything it wants from the animation
//! mixer as [`ClipCommand`]s, which the engine bridge drains every frame.

use bevy::prelude::*;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::collections::HashMap;
use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Logical actions a character can animate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ActionName {
    Idle,
    Walk,
    Attack,
    Die,
    HitReact,
}

impl ActionName {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActionName::Idle => "idle",
            ActionName::Walk => "walk",
            ActionName::Attack => "attack",
            ActionName::Die => "die",
            ActionName::HitReact => "hitReact",
        }
    }

    pub fn all() -> [ActionName; 5] {
        [
            ActionName::Idle,
            ActionName::Walk,
            ActionName::Attack,
            ActionName::Die,
            ActionName::HitReact,
        ]
    }

    /// Actions every character must provide a clip for
    pub fn required() -> [ActionName; 4] {
        [
            ActionName::Idle,
            ActionName::Walk,
            ActionName::Attack,
            ActionName::Die,
        ]
    }
}

impl fmt::Display for ActionName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A playable clip as exposed by the animation provider
#[derive(Debug, Clone, PartialEq)]
pub struct ClipSpec {
    /// Clip name inside the model file (e.g. "Skeleton_Attack")
    pub name: String,
    /// Natural duration at the clip's time scale
    pub duration: Duration,
}

impl ClipSpec {
    pub fn new(name: impl Into<String>, duration: Duration) -> Self {
        Self {
            name: name.into(),
            duration,
        }
    }

    pub fn from_millis(name: impl Into<String>, millis: u64) -> Self {
        Self::new(name, Duration::from_millis(millis))
    }
}

/// Configuration errors raised while assembling a clip table
#[derive(Debug, Error, PartialEq)]
pub enum ClipSetError {
    #[error("no clip mapped for required action '{0}'")]
    Missing(ActionName),
    #[error("clip '{name}' for action '{action}' has zero duration")]
    ZeroDuration { action: ActionName, name: String },
}

/// Complete mapping from logical action to clip for one character.
///
/// Construction validates completeness; once built, lookups cannot fail.
#[derive(Debug, Clone, PartialEq)]
pub struct ActionClips {
    idle: ClipSpec,
    walk: ClipSpec,
    attack: ClipSpec,
    die: ClipSpec,
    hit_react: Option<ClipSpec>,
}

impl ActionClips {
    /// Build a clip table from a provider mapping.
    ///
    /// `HitReact` is optional; every other action is required.
    pub fn from_map(mut clips: HashMap<ActionName, ClipSpec>) -> Result<Self, ClipSetError> {
        for action in ActionName::required() {
            match clips.get(&action) {
                None => return Err(ClipSetError::Missing(action)),
                Some(clip) if clip.duration.is_zero() && action == ActionName::Attack => {
                    return Err(ClipSetError::ZeroDuration {
                        action,
                        name: clip.name.clone(),
                    });
                }
                Some(_) => {}
            }
        }

        let mut take = |action| clips.remove(&action).ok_or(ClipSetError::Missing(action));
        Ok(Self {
            idle: take(ActionName::Idle)?,
            walk: take(ActionName::Walk)?,
            attack: take(ActionName::Attack)?,
            die: take(ActionName::Die)?,
            hit_react: clips.remove(&ActionName::HitReact),
        })
    }

    pub fn get(&self, action: ActionName) -> Option<&ClipSpec> {
        match action {
            ActionName::Idle => Some(&self.idle),
            ActionName::Walk => Some(&self.walk),
            ActionName::Attack => Some(&self.attack),
            ActionName::Die => Some(&self.die),
            ActionName::HitReact => self.hit_react.as_ref(),
        }
    }

    pub fn duration(&self, action: ActionName) -> Duration {
        self.get(action).map_or(Duration::ZERO, |clip| clip.duration)
    }

    pub fn has_hit_react(&self) -> bool {
        self.hit_react.is_some()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopMode {
    Once,
    Repeat,
}

/// A single instruction for the animation mixer
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ClipCommand {
    /// Reset the clip to its first frame and start it
    Play {
        action: ActionName,
        looping: LoopMode,
        /// Hold the last frame instead of ending the clip
        clamp_when_finished: bool,
    },
    Stop(ActionName),
    /// Blend `to` in while `from` fades out
    CrossFade {
        from: ActionName,
        to: ActionName,
        blend: Duration,
    },
}

impl ClipCommand {
    pub fn play(action: ActionName, looping: LoopMode) -> Self {
        ClipCommand::Play {
            action,
            looping,
            clamp_when_finished: false,
        }
    }
}

/// Record of the clip commands applied to a character.
///
/// Kept on every character; models driven by an `AnimationPlayer` are
/// animated from the same commands by the animation bridge.
#[derive(Component, Debug, Default)]
pub struct ClipTrace {
    active: SmallVec<[ActionName; 4]>,
    /// Number of commands applied over the trace's lifetime
    pub applied: usize,
}

impl ClipTrace {
    pub fn record(&mut self, command: ClipCommand) {
        self.applied += 1;
        match command {
            ClipCommand::Play { action, .. } => {
                if !self.active.contains(&action) {
                    self.active.push(action);
                }
            }
            ClipCommand::Stop(action) => self.active.retain(|active| *active != action),
            ClipCommand::CrossFade { .. } => {}
        }
    }

    /// Whether `action` was started and not stopped since
    pub fn is_active(&self, action: ActionName) -> bool {
        self.active.contains(&action)
    }

    pub fn active(&self) -> impl Iterator<Item = ActionName> + '_ {
        self.active.iter().copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn full_map() -> HashMap<ActionName, ClipSpec> {
        HashMap::from([
            (ActionName::Idle, ClipSpec::from_millis("Idle", 2000)),
            (ActionName::Walk, ClipSpec::from_millis("Walk", 1000)),
            (ActionName::Attack, ClipSpec::from_millis("Attack", 1200)),
            (ActionName::Die, ClipSpec::from_millis("Death", 1500)),
        ])
    }

    #[test]
    fn test_missing_required_clip_is_rejected() {
        let mut map = full_map();
        map.remove(&ActionName::Die);
        assert_eq!(
            ActionClips::from_map(map),
            Err(ClipSetError::Missing(ActionName::Die))
        );
    }

    #[test]
    fn test_hit_react_is_optional() {
        let clips = ActionClips::from_map(full_map()).unwrap();
        assert!(!clips.has_hit_react());
        assert_eq!(clips.duration(ActionName::Attack), Duration::from_millis(1200));
    }

    #[test]
    fn test_zero_length_attack_is_rejected() {
        let mut map = full_map();
        map.insert(ActionName::Attack, ClipSpec::from_millis("Attack", 0));
        assert!(matches!(
            ActionClips::from_map(map),
            Err(ClipSetError::ZeroDuration { .. })
        ));
    }

    #[test]
    fn test_trace_follows_play_and_stop() {
        let mut trace = ClipTrace::default();
        trace.record(ClipCommand::play(ActionName::Idle, LoopMode::Repeat));
        trace.record(ClipCommand::play(ActionName::Walk, LoopMode::Repeat));
        trace.record(ClipCommand::CrossFade {
            from: ActionName::Idle,
            to: ActionName::Walk,
            blend: Duration::from_millis(500),
        });
        trace.record(ClipCommand::Stop(ActionName::Idle));

        assert_eq!(trace.active().collect::<Vec<_>>(), vec![ActionName::Walk]);
        assert_eq!(trace.applied, 4);
    }

    #[test]
    fn test_replaying_a_clip_is_not_duplicated() {
        let mut trace = ClipTrace::default();
        trace.record(ClipCommand::play(ActionName::Attack, LoopMode::Once));
        trace.record(ClipCommand::play(ActionName::Attack, LoopMode::Once));
        trace.record(ClipCommand::Stop(ActionName::Attack));
        assert!(!trace.is_active(ActionName::Attack));
    }
}
