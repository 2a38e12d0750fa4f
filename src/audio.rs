//! Action sound feedback
//!
//! Characters carry an [`ActionAudio`] component describing which sounds go
//! with which actions. Gameplay systems send [`AudioCue`] events; this module
//! picks a random matching sound, rate limits it and hands it to the active
//! [`SoundBackend`]. Headless runs keep the logging backend; windowed runs add
//! [`SpeakerPlugin`], which voices sounds through `bevy_audio`.

use bevy::prelude::*;
use smallvec::{smallvec, SmallVec};
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::time::Duration;

use crate::character::timing::Throttle;
use crate::character::ActionName;
use crate::combat::ledger::EnemyKind;
use crate::combat::CombatPhase;
use crate::session::{gameplay_active, GameRng, GameSession};

/// Minimum gap between two sounds from the same character
pub const SOUND_COOLDOWN: Duration = Duration::from_millis(300);

const ZOMBIE_SOUND_COOLDOWN: Duration = Duration::from_millis(900);

/// Request to voice `action` for `entity`
#[derive(Event, Debug, Clone, Copy, PartialEq)]
pub struct AudioCue {
    pub entity: Entity,
    pub action: ActionName,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SoundId(pub String);

impl From<&str> for SoundId {
    fn from(name: &str) -> Self {
        Self(name.to_string())
    }
}

impl fmt::Display for SoundId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

type Sounds = SmallVec<[SoundId; 4]>;

/// The sounds a character can make
#[derive(Debug, Clone)]
pub enum SoundSet {
    /// One pool used for every action
    Simple(Sounds),
    /// A pool per action; actions without a pool stay silent
    PerAction(HashMap<ActionName, Sounds>),
}

impl SoundSet {
    pub fn candidates(&self, action: ActionName) -> &[SoundId] {
        match self {
            SoundSet::Simple(sounds) => sounds.as_slice(),
            SoundSet::PerAction(pools) => pools
                .get(&action)
                .map_or(&[][..], |sounds| sounds.as_slice()),
        }
    }

    pub fn all(&self) -> Vec<&SoundId> {
        match self {
            SoundSet::Simple(sounds) => sounds.iter().collect(),
            SoundSet::PerAction(pools) => pools.values().flatten().collect(),
        }
    }
}

/// Output device for sounds
pub trait SoundBackend: Send + Sync + 'static {
    fn play(&mut self, sound: &SoundId);
    fn stop(&mut self, sound: &SoundId);
    fn is_playing(&self, sound: &SoundId) -> bool;

    /// Requests the engine still has to carry out
    fn drain_requests(&mut self) -> Vec<SoundRequest> {
        Vec::new()
    }

    /// Sounds the engine reports as still audible
    fn sync_playing(&mut self, _playing: &HashSet<SoundId>) {}
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SoundRequest {
    Play(SoundId),
    Stop(SoundId),
}

/// Backend that only logs; used headless and as the default
#[derive(Debug, Default)]
pub struct TraceSoundBackend {
    pub played: Vec<SoundId>,
    pub stopped: Vec<SoundId>,
}

impl SoundBackend for TraceSoundBackend {
    fn play(&mut self, sound: &SoundId) {
        debug!("Sound: {}", sound.0);
        self.played.push(sound.clone());
    }

    fn stop(&mut self, sound: &SoundId) {
        self.stopped.push(sound.clone());
    }

    fn is_playing(&self, _sound: &SoundId) -> bool {
        false
    }
}

/// Backend that queues requests for [`SpeakerPlugin`] to voice
#[derive(Debug, Default)]
pub struct QueuedSoundBackend {
    queued: Vec<SoundRequest>,
    live: HashSet<SoundId>,
}

impl SoundBackend for QueuedSoundBackend {
    fn play(&mut self, sound: &SoundId) {
        self.live.insert(sound.clone());
        self.queued.push(SoundRequest::Play(sound.clone()));
    }

    fn stop(&mut self, sound: &SoundId) {
        if self.live.remove(sound) {
            self.queued.push(SoundRequest::Stop(sound.clone()));
        }
    }

    fn is_playing(&self, sound: &SoundId) -> bool {
        self.live.contains(sound)
    }

    fn drain_requests(&mut self) -> Vec<SoundRequest> {
        std::mem::take(&mut self.queued)
    }

    fn sync_playing(&mut self, playing: &HashSet<SoundId>) {
        // Sounds queued this frame have no emitter yet
        let pending: HashSet<&SoundId> = self
            .queued
            .iter()
            .filter_map(|request| match request {
                SoundRequest::Play(sound) => Some(sound),
                SoundRequest::Stop(_) => None,
            })
            .collect();
        self.live
            .retain(|sound| playing.contains(sound) || pending.contains(sound));
    }
}

#[derive(Resource)]
pub struct SoundOutput(pub Box<dyn SoundBackend>);

impl Default for SoundOutput {
    fn default() -> Self {
        Self(Box::new(TraceSoundBackend::default()))
    }
}

#[derive(Component, Debug, Clone)]
pub struct ActionAudio {
    sounds: SoundSet,
    throttle: Throttle,
}

impl ActionAudio {
    pub fn new(sounds: SoundSet) -> Self {
        Self {
            sounds,
            throttle: Throttle::new(SOUND_COOLDOWN),
        }
    }

    pub fn with_cooldown(mut self, cooldown: Duration) -> Self {
        self.throttle.set_cooldown(cooldown);
        self
    }

    /// Play a random sound for `action` unless throttled, silent or already playing
    pub fn play_random(
        &mut self,
        action: ActionName,
        now: Duration,
        rng: &mut GameRng,
        backend: &mut dyn SoundBackend,
    ) -> Option<SoundId> {
        let sound = rng.pick(self.sounds.candidates(action))?.clone();
        if backend.is_playing(&sound) || !self.throttle.try_fire(now) {
            return None;
        }
        backend.play(&sound);
        Some(sound)
    }

    pub fn stop_all(&self, backend: &mut dyn SoundBackend) {
        for sound in self.sounds.all() {
            backend.stop(sound);
        }
    }
}

pub fn player_sounds() -> ActionAudio {
    ActionAudio::new(SoundSet::PerAction(HashMap::from([
        (
            ActionName::Attack,
            smallvec!["sword_swing_1".into(), "sword_swing_2".into(), "sword_swing_3".into()],
        ),
        (
            ActionName::HitReact,
            smallvec!["player_grunt_1".into(), "player_grunt_2".into()],
        ),
        (ActionName::Die, smallvec!["player_death".into()]),
    ])))
}

pub fn enemy_sounds(kind: EnemyKind) -> ActionAudio {
    let sounds: Sounds = match kind {
        EnemyKind::Skeleton => smallvec!["bones_rattle_1".into(), "bones_rattle_2".into()],
        EnemyKind::Zombie => smallvec!["zombie_groan_1".into(), "zombie_groan_2".into(), "zombie_groan_3".into()],
        EnemyKind::Spider => smallvec!["spider_hiss".into()],
        EnemyKind::Slime => smallvec!["slime_squelch_1".into(), "slime_squelch_2".into()],
    };
    let audio = ActionAudio::new(SoundSet::Simple(sounds));
    match kind {
        // Long groans overlap at the default rate
        EnemyKind::Zombie => audio.with_cooldown(ZOMBIE_SOUND_COOLDOWN),
        _ => audio,
    }
}

pub struct ActionAudioPlugin;

impl Plugin for ActionAudioPlugin {
    fn build(&self, app: &mut App) {
        app.add_event::<AudioCue>()
            .init_resource::<SoundOutput>()
            .add_systems(
                Update,
                (
                    play_audio_cues.in_set(CombatPhase::Present),
                    silence_when_muted,
                )
                    .run_if(gameplay_active),
            );
    }
}

/// Voices sounds through `bevy_audio`, one despawning emitter per sound
pub struct SpeakerPlugin;

impl Plugin for SpeakerPlugin {
    fn build(&self, app: &mut App) {
        app.insert_resource(SoundOutput(Box::new(QueuedSoundBackend::default())))
            .add_systems(
                Update,
                (
                    sync_speaker_state.before(play_audio_cues),
                    flush_sound_requests
                        .after(play_audio_cues)
                        .after(silence_when_muted),
                ),
            );
    }
}

/// A playing sound spawned by [`SpeakerPlugin`]
#[derive(Component, Debug, Clone)]
pub struct SoundEmitter(pub SoundId);

pub fn sound_path(sound: &SoundId) -> String {
    format!("sounds/{}.ogg", sound)
}

fn sync_speaker_state(mut output: ResMut<SoundOutput>, emitters: Query<&SoundEmitter>) {
    let playing: HashSet<SoundId> = emitters.iter().map(|emitter| emitter.0.clone()).collect();
    output.0.sync_playing(&playing);
}

fn flush_sound_requests(
    mut commands: Commands,
    asset_server: Res<AssetServer>,
    mut output: ResMut<SoundOutput>,
    emitters: Query<(Entity, &SoundEmitter)>,
) {
    for request in output.0.drain_requests() {
        match request {
            SoundRequest::Play(sound) => {
                commands.spawn((
                    AudioPlayer::new(asset_server.load::<AudioSource>(sound_path(&sound))),
                    PlaybackSettings::DESPAWN,
                    SoundEmitter(sound),
                ));
            }
            SoundRequest::Stop(sound) => {
                for (entity, emitter) in emitters.iter() {
                    if emitter.0 == sound {
                        commands.entity(entity).despawn();
                    }
                }
            }
        }
    }
}

fn play_audio_cues(
    time: Res<Time>,
    session: Res<GameSession>,
    mut rng: ResMut<GameRng>,
    mut output: ResMut<SoundOutput>,
    mut cues: EventReader<AudioCue>,
    mut voices: Query<&mut ActionAudio>,
) {
    if !session.sounds_enabled {
        cues.clear();
        return;
    }
    let now = time.elapsed();
    for cue in cues.read() {
        if let Ok(mut audio) = voices.get_mut(cue.entity) {
            audio.play_random(cue.action, now, &mut rng, output.0.as_mut());
        }
    }
}

fn silence_when_muted(
    session: Res<GameSession>,
    mut output: ResMut<SoundOutput>,
    voices: Query<&ActionAudio>,
) {
    if session.is_changed() && !session.sounds_enabled {
        for audio in voices.iter() {
            audio.stop_all(output.0.as_mut());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_per_action_set_is_silent_without_pool() {
        let audio = player_sounds();
        assert!(audio.sounds.candidates(ActionName::Walk).is_empty());
        assert_eq!(audio.sounds.candidates(ActionName::Attack).len(), 3);
    }

    #[test]
    fn test_play_random_is_throttled() {
        let mut audio = enemy_sounds(EnemyKind::Skeleton);
        let mut rng = GameRng::from_seed(1);
        let mut backend = TraceSoundBackend::default();

        let ms = Duration::from_millis;
        assert!(audio.play_random(ActionName::Attack, ms(0), &mut rng, &mut backend).is_some());
        assert!(audio.play_random(ActionName::Die, ms(100), &mut rng, &mut backend).is_none());
        assert!(audio.play_random(ActionName::Die, ms(300), &mut rng, &mut backend).is_some());
        assert_eq!(backend.played.len(), 2);
    }

    #[test]
    fn test_zombie_groans_are_spaced_out() {
        let mut audio = enemy_sounds(EnemyKind::Zombie);
        let mut rng = GameRng::from_seed(3);
        let mut backend = TraceSoundBackend::default();

        let ms = Duration::from_millis;
        assert!(audio.play_random(ActionName::Attack, ms(0), &mut rng, &mut backend).is_some());
        assert!(audio.play_random(ActionName::HitReact, ms(600), &mut rng, &mut backend).is_none());
        assert!(audio.play_random(ActionName::HitReact, ms(900), &mut rng, &mut backend).is_some());
    }

    #[test]
    fn test_queued_backend_hands_requests_over_once() {
        let mut backend = QueuedSoundBackend::default();
        let groan = SoundId::from("zombie_groan_1");

        backend.play(&groan);
        assert!(backend.is_playing(&groan));
        assert_eq!(backend.drain_requests(), vec![SoundRequest::Play(groan.clone())]);
        assert!(backend.drain_requests().is_empty());

        backend.stop(&groan);
        assert!(!backend.is_playing(&groan));
        assert_eq!(backend.drain_requests(), vec![SoundRequest::Stop(groan)]);
    }

    #[test]
    fn test_finished_emitters_free_the_sound() {
        let mut backend = QueuedSoundBackend::default();
        let hiss = SoundId::from("spider_hiss");
        backend.play(&hiss);

        // Not spawned yet: the request is still queued
        backend.sync_playing(&HashSet::new());
        assert!(backend.is_playing(&hiss));

        backend.drain_requests();
        backend.sync_playing(&HashSet::from([hiss.clone()]));
        assert!(backend.is_playing(&hiss));
        backend.sync_playing(&HashSet::new());
        assert!(!backend.is_playing(&hiss));

        // Stopping a sound that already ended queues nothing
        backend.stop(&hiss);
        assert!(backend.drain_requests().is_empty());
    }

    #[test]
    fn test_busy_sound_is_not_restarted() {
        let mut audio = enemy_sounds(EnemyKind::Spider);
        let mut rng = GameRng::from_seed(9);
        let mut backend = QueuedSoundBackend::default();

        let ms = Duration::from_millis;
        assert!(audio.play_random(ActionName::Attack, ms(0), &mut rng, &mut backend).is_some());
        assert!(audio.play_random(ActionName::Attack, ms(400), &mut rng, &mut backend).is_none());
        assert_eq!(backend.drain_requests().len(), 1);
    }

    #[test]
    fn test_sound_files_live_under_sounds() {
        assert_eq!(sound_path(&SoundId::from("player_death")), "sounds/player_death.ogg");
    }

    #[test]
    fn test_stop_all_covers_every_pool() {
        let audio = player_sounds();
        let mut backend = TraceSoundBackend::default();
        audio.stop_all(&mut backend);
        assert_eq!(backend.stopped.len(), 6);
    }
}
