//! Session-wide state
//!
//! Context resources constructed once at startup and passed to systems
//! explicitly: the play/sound switches, asset loading progress, round
//! progress and the seedable RNG.

use bevy::prelude::*;
use rand::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum GameMode {
    #[default]
    Production,
    Development,
}

#[derive(Resource, Debug, Clone)]
pub struct GameSession {
    pub playing: bool,
    pub sounds_enabled: bool,
    pub mode: GameMode,
}

impl Default for GameSession {
    fn default() -> Self {
        Self {
            playing: true,
            sounds_enabled: true,
            mode: GameMode::Production,
        }
    }
}

impl GameSession {
    /// Flip the sound switch and return the new value
    pub fn toggle_sounds(&mut self) -> bool {
        self.sounds_enabled = !self.sounds_enabled;
        self.sounds_enabled
    }
}

/// Loading progress reported by the asset provider
#[derive(Resource, Debug, Clone, Default)]
pub struct AssetGate {
    loaded: usize,
    total: usize,
}

impl AssetGate {
    pub fn new(total: usize) -> Self {
        Self { loaded: 0, total }
    }

    /// Gate with nothing left to load
    pub fn ready() -> Self {
        Self::default()
    }

    pub fn report_loaded(&mut self, count: usize) {
        self.loaded = (self.loaded + count).min(self.total);
    }

    /// Whole-number loading percentage
    pub fn percent(&self) -> u8 {
        if self.total == 0 {
            return 100;
        }
        ((self.loaded * 100) / self.total) as u8
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded >= self.total
    }
}

/// Run condition for every gameplay system
pub fn gameplay_active(session: Res<GameSession>, gate: Res<AssetGate>) -> bool {
    session.playing && gate.is_loaded()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RoundOutcome {
    /// Every wave cleared
    Victory,
    /// The player's death sequence completed
    Defeat,
}

/// Wave progress for the current round
#[derive(Resource, Debug, Clone, Default)]
pub struct RoundState {
    /// Number of waves spawned so far
    pub wave: u32,
    /// Waves fully cleared
    pub waves_cleared: u32,
    pub enemies_defeated: u32,
    pub outcome: Option<RoundOutcome>,
}

impl RoundState {
    pub fn is_over(&self) -> bool {
        self.outcome.is_some()
    }
}

/// Seedable random number generator shared by gameplay systems
#[derive(Resource)]
pub struct GameRng {
    rng: StdRng,
    /// The seed used to initialize this RNG (if deterministic)
    pub seed: Option<u64>,
}

impl GameRng {
    pub fn from_seed(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            seed: Some(seed),
        }
    }

    pub fn from_entropy() -> Self {
        Self {
            rng: StdRng::from_entropy(),
            seed: None,
        }
    }

    pub fn random_range(&mut self, min: f32, max: f32) -> f32 {
        if max <= min {
            return min;
        }
        self.rng.gen_range(min..max)
    }

    /// Uniformly chosen element, `None` for an empty slice
    pub fn pick<'a, T>(&mut self, items: &'a [T]) -> Option<&'a T> {
        items.choose(&mut self.rng)
    }
}

impl Default for GameRng {
    fn default() -> Self {
        Self::from_entropy()
    }
}
