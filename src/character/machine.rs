//! Character action state machine
//!
//! One [`CharacterActions`] component drives every animated entity (player and
//! enemies alike). It owns the authoritative [`Phase`], the clip commands that
//! realise it, and every timing window an action opens. Timing windows are
//! plain `Option<Timer>` slots: cancelling a window means dropping its timer,
//! so a transition can never leave a stale callback behind.
//!
//! Side effects that other systems care about (a swing connecting, the swing
//! ending, the corpse finishing its sink) are queued as [`ActionOutput`]s and
//! drained by the combat coordination systems.

use bevy::prelude::*;
use std::time::Duration;

use super::clips::{ActionClips, ActionName, ClipCommand, LoopMode};
use super::timing::{SinkTween, ATTACK_BLEND, IDLE_BLEND, WALK_BLEND};

/// Delay between a walking character's attack request and the actual swing
pub const DEFAULT_FIRST_ATTACK_DELAY: Duration = Duration::from_millis(500);

/// Attack cooldown: how long the attack window stays open after a swing starts
pub const DEFAULT_NEXT_ATTACK_DELAY: Duration = Duration::from_millis(1000);

/// Pause on the death pose before the corpse starts sinking
pub const DEATH_GRACE: Duration = Duration::from_millis(1000);

/// The single authoritative behaviour state of a character
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Phase {
    #[default]
    Idle,
    Walking,
    Attacking,
    /// Hit-react playing over an otherwise idle character
    ReceivingHit,
    /// Terminal
    Dead,
}

/// Damage carried by a swing, delivered when the swing starts
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Strike {
    pub damage: f32,
    /// Maximum distance from the attacker at which the strike lands
    pub reach: f32,
}

/// Side effects queued by the state machine for the coordination layer
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ActionOutput {
    /// A swing actually started (deferred swings report when they fire)
    AttackStarted,
    /// The swing's impact, emitted synchronously with `AttackStarted`
    Impact(Strike),
    /// The attack clip ran to completion
    AttackFinished,
    /// Grace delay elapsed; the corpse started sinking
    SinkStarted,
    /// Sink finished; the entity can be removed from the world
    DeathComplete,
}

/// Attack delays for one character
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AttackTiming {
    pub first_attack_delay: Duration,
    pub next_attack_delay: Duration,
}

impl Default for AttackTiming {
    fn default() -> Self {
        Self {
            first_attack_delay: DEFAULT_FIRST_ATTACK_DELAY,
            next_attack_delay: DEFAULT_NEXT_ATTACK_DELAY,
        }
    }
}

/// Tunables for the death sink
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DeathSequence {
    pub grace: Duration,
    pub sink_duration: Duration,
    pub sink_depth: f32,
}

impl Default for DeathSequence {
    fn default() -> Self {
        Self {
            grace: DEATH_GRACE,
            sink_duration: Duration::from_secs(4),
            sink_depth: 10.0,
        }
    }
}

#[derive(Component, Debug)]
pub struct CharacterActions {
    clips: ActionClips,
    timing: AttackTiming,
    death: DeathSequence,
    phase: Phase,
    /// Strike held by a deferred first attack until it fires
    pending_strike: Option<Strike>,
    first_attack: Option<Timer>,
    attack_finish: Option<Timer>,
    cooldown: Option<Timer>,
    hit_react: Option<Timer>,
    death_grace: Option<Timer>,
    sink: Option<SinkTween>,
    clip_commands: Vec<ClipCommand>,
    outputs: Vec<ActionOutput>,
}

impl CharacterActions {
    pub fn new(clips: ActionClips, timing: AttackTiming, death: DeathSequence) -> Self {
        Self {
            clips,
            timing,
            death,
            phase: Phase::Idle,
            pending_strike: None,
            first_attack: None,
            attack_finish: None,
            cooldown: None,
            hit_react: None,
            death_grace: None,
            sink: None,
            clip_commands: Vec::new(),
            outputs: Vec::new(),
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn clips(&self) -> &ActionClips {
        &self.clips
    }

    pub fn is_dead(&self) -> bool {
        self.phase == Phase::Dead
    }

    pub fn is_walking(&self) -> bool {
        self.phase == Phase::Walking
    }

    /// Whether the attack window is open (a deferred swing or the cooldown)
    pub fn is_attacking(&self) -> bool {
        self.first_attack.is_some() || self.cooldown.is_some()
    }

    /// Whether an attack requested while walking is waiting to swing
    pub fn is_swing_pending(&self) -> bool {
        self.first_attack.is_some()
    }

    pub fn is_receiving_hit(&self) -> bool {
        self.hit_react.is_some()
    }

    /// Vertical offset of the death sink (zero until sinking starts)
    pub fn sink_offset(&self) -> f32 {
        self.sink.as_ref().map_or(0.0, SinkTween::offset)
    }

    pub fn death_complete(&self) -> bool {
        self.sink.as_ref().is_some_and(SinkTween::is_complete)
    }

    pub fn walk(&mut self) {
        // Feet stay planted until a deferred swing has started.
        if self.is_swing_pending() || !matches!(self.phase, Phase::Idle | Phase::ReceivingHit) {
            return;
        }
        self.hit_react = None;

        self.clip_commands
            .push(ClipCommand::play(ActionName::Walk, LoopMode::Repeat));
        self.clip_commands.push(ClipCommand::CrossFade {
            from: ActionName::Idle,
            to: ActionName::Walk,
            blend: WALK_BLEND,
        });
        self.phase = Phase::Walking;
    }

    /// Stop the walk loop. The character is left idle without an idle clip;
    /// call [`idle`](Self::idle) to re-establish it.
    pub fn stop_walk(&mut self) {
        if self.phase != Phase::Walking {
            return;
        }
        self.clip_commands.push(ClipCommand::Stop(ActionName::Walk));
        self.phase = Phase::Idle;
    }

    pub fn idle(&mut self) {
        match self.phase {
            Phase::Dead => return,
            Phase::Walking => self.clip_commands.push(ClipCommand::Stop(ActionName::Walk)),
            Phase::Attacking => self.attack_finish = None,
            Phase::Idle | Phase::ReceivingHit => {}
        }
        self.hit_react = None;

        self.clip_commands
            .push(ClipCommand::play(ActionName::Idle, LoopMode::Repeat));
        self.clip_commands.push(ClipCommand::CrossFade {
            from: ActionName::Attack,
            to: ActionName::Idle,
            blend: IDLE_BLEND,
        });
        self.phase = Phase::Idle;
    }

    pub fn stop_idle(&mut self) {
        self.clip_commands.push(ClipCommand::Stop(ActionName::Idle));
    }

    /// Request an attack. `strike` is delivered as [`ActionOutput::Impact`]
    /// the moment the swing starts.
    pub fn attack(&mut self, strike: Option<Strike>) {
        if self.is_dead() || self.is_attacking() {
            return;
        }

        if self.phase == Phase::Walking {
            self.stop_walk();
            self.idle();
            self.pending_strike = strike;
            self.first_attack = Some(Timer::new(
                self.timing.first_attack_delay,
                TimerMode::Once,
            ));
            return;
        }

        self.start_swing(strike);
    }

    fn start_swing(&mut self, strike: Option<Strike>) {
        let from = if self.phase == Phase::Walking {
            ActionName::Walk
        } else {
            ActionName::Idle
        };

        self.cooldown = None;
        self.attack_finish = None;
        self.hit_react = None;

        self.clip_commands
            .push(ClipCommand::play(ActionName::Attack, LoopMode::Once));
        self.clip_commands.push(ClipCommand::CrossFade {
            from,
            to: ActionName::Attack,
            blend: ATTACK_BLEND,
        });
        self.phase = Phase::Attacking;

        self.outputs.push(ActionOutput::AttackStarted);
        if let Some(strike) = strike {
            self.outputs.push(ActionOutput::Impact(strike));
        }

        self.attack_finish = Some(Timer::new(
            self.clips.duration(ActionName::Attack),
            TimerMode::Once,
        ));
        self.cooldown = Some(Timer::new(self.timing.next_attack_delay, TimerMode::Once));
    }

    /// Stop the attack clip. Timers are left as they are.
    pub fn stop_attack(&mut self) {
        self.clip_commands.push(ClipCommand::Stop(ActionName::Attack));
    }

    pub fn receive_hit(&mut self) {
        if self.is_dead() {
            return;
        }
        let Some(clip) = self.clips.get(ActionName::HitReact) else {
            return;
        };
        let duration = clip.duration;

        self.clip_commands
            .push(ClipCommand::play(ActionName::HitReact, LoopMode::Once));
        if self.phase == Phase::Idle {
            self.phase = Phase::ReceivingHit;
        }
        self.hit_react = Some(Timer::new(duration, TimerMode::Once));
    }

    pub fn die(&mut self) {
        if self.is_dead() {
            return;
        }

        self.first_attack = None;
        self.attack_finish = None;
        self.cooldown = None;
        self.hit_react = None;
        self.pending_strike = None;

        self.clip_commands.push(ClipCommand::Play {
            action: ActionName::Die,
            looping: LoopMode::Once,
            clamp_when_finished: true,
        });
        self.phase = Phase::Dead;

        self.stop_idle();
        self.clip_commands.push(ClipCommand::Stop(ActionName::Walk));
        self.stop_attack();

        self.death_grace = Some(Timer::new(self.death.grace, TimerMode::Once));
    }

    /// Return to a fresh idle state for reuse. Plays nothing and drops any
    /// queued commands or outputs.
    pub fn reset_actions(&mut self) {
        self.phase = Phase::Idle;
        self.pending_strike = None;
        self.first_attack = None;
        self.attack_finish = None;
        self.cooldown = None;
        self.hit_react = None;
        self.death_grace = None;
        self.sink = None;
        self.clip_commands.clear();
        self.outputs.clear();
    }

    /// Advance every open timing window by `delta`.
    ///
    /// All timers are stepped before any of them fires, so a window opened by
    /// a firing timer starts counting from the next tick.
    pub fn tick(&mut self, delta: Duration) {
        let deferred_due = advance(&mut self.first_attack, delta);
        let _cooldown_due = advance(&mut self.cooldown, delta);
        let finish_due = advance(&mut self.attack_finish, delta);
        let hit_due = advance(&mut self.hit_react, delta);
        let grace_due = advance(&mut self.death_grace, delta);
        let sink_done = self.sink.as_mut().is_some_and(|sink| sink.advance(delta));

        if finish_due {
            self.outputs.push(ActionOutput::AttackFinished);
            self.idle();
        }

        if hit_due && self.phase == Phase::ReceivingHit {
            self.phase = Phase::Idle;
        }

        if deferred_due && !self.is_dead() {
            let strike = self.pending_strike.take();
            self.start_swing(strike);
        }

        if grace_due {
            self.sink = Some(SinkTween::new(
                self.death.sink_duration,
                self.death.sink_depth,
            ));
            self.outputs.push(ActionOutput::SinkStarted);
        }

        if sink_done {
            self.clip_commands.push(ClipCommand::Stop(ActionName::Die));
            self.outputs.push(ActionOutput::DeathComplete);
        }
    }

    pub fn take_clip_commands(&mut self) -> Vec<ClipCommand> {
        std::mem::take(&mut self.clip_commands)
    }

    pub fn take_outputs(&mut self) -> Vec<ActionOutput> {
        std::mem::take(&mut self.outputs)
    }
}

/// Step an optional timer, clearing the slot when it fires
fn advance(slot: &mut Option<Timer>, delta: Duration) -> bool {
    let Some(timer) = slot.as_mut() else {
        return false;
    };
    timer.tick(delta);
    if timer.finished() {
        *slot = None;
        return true;
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::character::clips::ClipSpec;
    use std::collections::HashMap;

    fn ms(millis: u64) -> Duration {
        Duration::from_millis(millis)
    }

    fn clips(with_hit_react: bool) -> ActionClips {
        let mut map = HashMap::from([
            (ActionName::Idle, ClipSpec::from_millis("Idle", 2000)),
            (ActionName::Walk, ClipSpec::from_millis("Walk", 1000)),
            (ActionName::Attack, ClipSpec::from_millis("Attack", 1200)),
            (ActionName::Die, ClipSpec::from_millis("Death", 1500)),
        ]);
        if with_hit_react {
            map.insert(ActionName::HitReact, ClipSpec::from_millis("HitReact", 400));
        }
        ActionClips::from_map(map).unwrap()
    }

    fn machine() -> CharacterActions {
        CharacterActions::new(
            clips(true),
            AttackTiming {
                first_attack_delay: ms(500),
                next_attack_delay: ms(800),
            },
            DeathSequence {
                grace: ms(1000),
                sink_duration: ms(2000),
                sink_depth: 10.0,
            },
        )
    }

    const STRIKE: Strike = Strike {
        damage: 25.0,
        reach: 2.0,
    };

    #[test]
    fn test_walk_only_from_idle() {
        let mut actions = machine();
        actions.walk();
        assert_eq!(actions.phase(), Phase::Walking);

        let commands = actions.take_clip_commands();
        assert!(commands.contains(&ClipCommand::CrossFade {
            from: ActionName::Idle,
            to: ActionName::Walk,
            blend: WALK_BLEND,
        }));

        actions.walk();
        assert!(actions.take_clip_commands().is_empty());
    }

    #[test]
    fn test_stop_walk_leaves_idle_without_clip() {
        let mut actions = machine();
        actions.walk();
        actions.take_clip_commands();
        actions.stop_walk();
        assert_eq!(actions.phase(), Phase::Idle);
        assert_eq!(
            actions.take_clip_commands(),
            vec![ClipCommand::Stop(ActionName::Walk)]
        );
    }

    #[test]
    fn test_attack_emits_impact_synchronously() {
        let mut actions = machine();
        actions.attack(Some(STRIKE));
        assert_eq!(actions.phase(), Phase::Attacking);
        assert!(actions.is_attacking());
        assert_eq!(
            actions.take_outputs(),
            vec![ActionOutput::AttackStarted, ActionOutput::Impact(STRIKE)]
        );
    }

    #[test]
    fn test_attack_without_strike_still_swings() {
        let mut actions = machine();
        actions.attack(None);
        assert_eq!(actions.take_outputs(), vec![ActionOutput::AttackStarted]);
    }

    #[test]
    fn test_attack_is_noop_while_window_open() {
        let mut actions = machine();
        actions.attack(Some(STRIKE));
        actions.take_outputs();
        actions.tick(ms(400));
        actions.attack(Some(STRIKE));
        assert!(actions.take_outputs().is_empty());
    }

    #[test]
    fn test_cooldown_and_finish_fire_independently() {
        let mut actions = machine();
        actions.attack(None);
        actions.take_outputs();

        actions.tick(ms(799));
        assert!(actions.is_attacking());
        actions.tick(ms(1));
        assert!(!actions.is_attacking());
        assert_eq!(actions.phase(), Phase::Attacking);
        assert!(actions.take_outputs().is_empty());

        actions.tick(ms(400));
        assert_eq!(actions.take_outputs(), vec![ActionOutput::AttackFinished]);
        assert_eq!(actions.phase(), Phase::Idle);
    }

    #[test]
    fn test_new_swing_after_cooldown_cancels_previous_finish() {
        let mut actions = machine();
        actions.attack(None);
        actions.tick(ms(900));
        actions.attack(None);
        actions.take_outputs();

        // First swing would have finished at 1200ms
        actions.tick(ms(400));
        assert!(actions.take_outputs().is_empty());
        assert_eq!(actions.phase(), Phase::Attacking);

        actions.tick(ms(800));
        assert_eq!(actions.take_outputs(), vec![ActionOutput::AttackFinished]);
    }

    #[test]
    fn test_attack_while_walking_is_deferred() {
        let mut actions = machine();
        actions.walk();
        actions.take_clip_commands();

        actions.attack(Some(STRIKE));
        assert_eq!(actions.phase(), Phase::Idle);
        assert!(actions.is_attacking());
        assert!(actions.take_outputs().is_empty());
        let commands = actions.take_clip_commands();
        assert!(commands.contains(&ClipCommand::Stop(ActionName::Walk)));
        assert!(commands.contains(&ClipCommand::play(ActionName::Idle, LoopMode::Repeat)));

        actions.tick(ms(499));
        assert!(actions.take_outputs().is_empty());

        actions.tick(ms(1));
        assert_eq!(actions.phase(), Phase::Attacking);
        assert_eq!(
            actions.take_outputs(),
            vec![ActionOutput::AttackStarted, ActionOutput::Impact(STRIKE)]
        );
    }

    #[test]
    fn test_walk_waits_for_deferred_swing() {
        let mut actions = machine();
        actions.walk();
        actions.attack(Some(STRIKE));
        actions.take_clip_commands();

        actions.walk();
        assert!(actions.is_swing_pending());
        assert_eq!(actions.phase(), Phase::Idle);
        assert!(actions.take_clip_commands().is_empty());

        actions.tick(ms(500));
        assert_eq!(
            actions.take_outputs(),
            vec![ActionOutput::AttackStarted, ActionOutput::Impact(STRIKE)]
        );
        assert!(!actions.is_swing_pending());
    }

    #[test]
    fn test_die_cancels_attack_windows() {
        let mut actions = machine();
        actions.attack(Some(STRIKE));
        actions.take_outputs();
        actions.die();
        assert!(!actions.is_attacking());

        actions.tick(ms(900));
        let outputs = actions.take_outputs();
        assert!(!outputs.contains(&ActionOutput::AttackFinished));
        assert!(!actions.is_attacking());
        assert_eq!(actions.phase(), Phase::Dead);
    }

    #[test]
    fn test_death_sequence_order() {
        let mut actions = machine();
        actions.die();
        let commands = actions.take_clip_commands();
        assert_eq!(
            commands[0],
            ClipCommand::Play {
                action: ActionName::Die,
                looping: LoopMode::Once,
                clamp_when_finished: true,
            }
        );
        assert_eq!(actions.sink_offset(), 0.0);

        actions.tick(ms(999));
        assert!(actions.take_outputs().is_empty());
        assert_eq!(actions.sink_offset(), 0.0);

        actions.tick(ms(1));
        assert_eq!(actions.take_outputs(), vec![ActionOutput::SinkStarted]);

        actions.tick(ms(1000));
        assert!(actions.take_outputs().is_empty());
        assert!(actions.sink_offset() < 0.0);

        actions.tick(ms(1000));
        assert_eq!(actions.take_outputs(), vec![ActionOutput::DeathComplete]);
        assert!(actions.death_complete());
        assert!((actions.sink_offset() + 10.0).abs() < 1e-4);

        actions.tick(ms(1000));
        assert!(actions.take_outputs().is_empty());
    }

    #[test]
    fn test_dead_absorbs_every_request() {
        let mut actions = machine();
        actions.die();
        actions.take_clip_commands();

        actions.walk();
        actions.idle();
        actions.attack(Some(STRIKE));
        actions.receive_hit();
        actions.die();

        assert_eq!(actions.phase(), Phase::Dead);
        assert!(actions.take_clip_commands().is_empty());
        assert!(actions.take_outputs().is_empty());
    }

    #[test]
    fn test_receive_hit_overlays_idle_only() {
        let mut actions = machine();
        actions.receive_hit();
        assert_eq!(actions.phase(), Phase::ReceivingHit);
        actions.tick(ms(400));
        assert_eq!(actions.phase(), Phase::Idle);

        actions.attack(None);
        actions.receive_hit();
        assert_eq!(actions.phase(), Phase::Attacking);
        assert!(actions.is_receiving_hit());
    }

    #[test]
    fn test_receive_hit_without_clip_is_noop() {
        let mut actions =
            CharacterActions::new(clips(false), AttackTiming::default(), DeathSequence::default());
        actions.receive_hit();
        assert!(actions.take_clip_commands().is_empty());
        assert_eq!(actions.phase(), Phase::Idle);
    }

    #[test]
    fn test_reset_actions_revives_without_playing() {
        let mut actions = machine();
        actions.die();
        actions.reset_actions();
        assert_eq!(actions.phase(), Phase::Idle);
        assert!(actions.take_clip_commands().is_empty());
        assert_eq!(actions.sink_offset(), 0.0);

        actions.walk();
        assert_eq!(actions.phase(), Phase::Walking);
    }
}
