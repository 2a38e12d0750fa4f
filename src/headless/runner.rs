//! Headless round execution
//!
//! Runs a round without any graphical output. The player is steered by an
//! autopilot that walks to the nearest enemy and swings once in reach; time
//! advances in fixed 60 Hz steps so a seeded round always plays out the same.

use bevy::prelude::*;
use bevy::time::TimeUpdateStrategy;
use serde::Serialize;
use std::time::Duration;

use crate::combat::driver::drive_player;
use crate::combat::ledger::{planar_distance, EnemyLedger, PlayerLedger};
use crate::combat::log::{CombatLog, CombatLogEventType, RoundMetadata};
use crate::combat::rounds::WaveRoster;
use crate::combat::CombatPhase;
use crate::input::{MovementIntent, PlayerIntent};
use crate::session::{GameRng, RoundOutcome, RoundState};
use crate::settings::GameSettings;
use crate::GamePlugin;

use super::config::HeadlessRoundConfig;

/// Fixed simulation step
pub const FRAME: Duration = Duration::from_nanos(16_666_667);

/// Result of a completed headless round
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RoundResult {
    /// `None` when the round hit its time limit
    pub outcome: Option<RoundOutcome>,
    /// Simulated seconds until the round ended
    pub duration: f32,
    pub waves_cleared: u32,
    pub enemies_defeated: u32,
    pub final_player_health: f32,
    pub random_seed: Option<u64>,
}

impl RoundResult {
    pub fn outcome_label(&self) -> &'static str {
        match self.outcome {
            Some(RoundOutcome::Victory) => "Victory",
            Some(RoundOutcome::Defeat) => "Defeat",
            None => "Timeout",
        }
    }
}

/// Resource to track headless round state
#[derive(Resource, Debug)]
pub struct HeadlessRoundState {
    pub max_duration: f32,
    pub elapsed_time: f32,
    pub round_complete: bool,
    pub random_seed: Option<u64>,
    pub result: Option<RoundResult>,
}

/// Plugin for headless round execution
pub struct HeadlessPlugin {
    pub config: HeadlessRoundConfig,
}

impl Plugin for HeadlessPlugin {
    fn build(&self, app: &mut App) {
        let waves = match self.config.enemy_waves() {
            Ok(waves) => waves,
            Err(e) => {
                error!("Invalid round configuration: {}", e);
                Vec::new()
            }
        };
        let game_rng = match self.config.random_seed {
            Some(seed) => {
                info!("Using deterministic RNG with seed: {}", seed);
                GameRng::from_seed(seed)
            }
            None => GameRng::from_entropy(),
        };

        app.insert_resource(WaveRoster {
            waves,
            ..default()
        })
        .insert_resource(game_rng)
        .insert_resource(HeadlessRoundState {
            max_duration: self.config.max_duration_secs,
            elapsed_time: 0.0,
            round_complete: false,
            random_seed: self.config.random_seed,
            result: None,
        })
        .add_systems(
            Update,
            autopilot_player
                .in_set(CombatPhase::Intent)
                .before(drive_player),
        )
        .add_systems(
            Update,
            (headless_track_time, headless_check_round_end)
                .chain()
                .after(CombatPhase::Present),
        );
    }
}

/// Walk toward the nearest enemy, swing once it is in reach
fn autopilot_player(
    player_ledger: Res<PlayerLedger>,
    enemy_ledger: Res<EnemyLedger>,
    settings: Res<GameSettings>,
    mut intent: ResMut<PlayerIntent>,
) {
    *intent = PlayerIntent::default();
    if player_ledger.is_dead() {
        return;
    }
    let origin = player_ledger.position();
    let Some(target) = enemy_ledger.nearest(origin) else {
        return;
    };

    let reach = settings.combat.player.reach;
    if planar_distance(origin, target.position) > reach * 0.8 {
        let heading = target.position - origin;
        intent.movement = MovementIntent {
            using_joystick: true,
            joystick: Vec3::new(heading.x, 0.0, heading.z),
            ..default()
        };
    } else {
        intent.attack = true;
    }
}

fn headless_track_time(time: Res<Time>, mut state: ResMut<HeadlessRoundState>) {
    if !state.round_complete {
        state.elapsed_time += time.delta_secs();
    }
}

fn headless_check_round_end(
    round: Res<RoundState>,
    player_ledger: Res<PlayerLedger>,
    mut combat_log: ResMut<CombatLog>,
    mut state: ResMut<HeadlessRoundState>,
) {
    if state.round_complete {
        return;
    }

    let timed_out = state.elapsed_time >= state.max_duration;
    if !round.is_over() && !timed_out {
        return;
    }

    if round.is_over() {
        info!("Round ended: {:?}", round.outcome);
    } else {
        info!("Round timed out after {:.1}s", state.elapsed_time);
        combat_log.log(CombatLogEventType::RoundEvent, "Time limit reached".to_string());
    }

    state.result = Some(RoundResult {
        outcome: round.outcome,
        duration: state.elapsed_time,
        waves_cleared: round.waves_cleared,
        enemies_defeated: round.enemies_defeated,
        final_player_health: player_ledger.health(),
        random_seed: state.random_seed,
    });
    state.round_complete = true;
}

fn build_round_app(config: &HeadlessRoundConfig) -> Result<App, String> {
    config.validate()?;
    let profile = config.input_profile()?;
    let settings = GameSettings {
        input_profile: profile,
        sounds_enabled: false,
        ..default()
    };

    let mut app = App::new();
    app.add_plugins(MinimalPlugins)
        .add_plugins(TransformPlugin)
        .add_plugins(HierarchyPlugin)
        .insert_resource(TimeUpdateStrategy::ManualDuration(FRAME))
        .add_plugins(GamePlugin { settings })
        .add_plugins(HeadlessPlugin {
            config: config.clone(),
        });
    app.finish();
    app.cleanup();
    Ok(app)
}

/// Step the round until it ends. The frame budget covers the time limit
/// plus slack for the final frame to be observed.
fn run_to_completion(config: &HeadlessRoundConfig) -> Result<App, String> {
    let mut app = build_round_app(config)?;
    let max_frames = (config.max_duration_secs / FRAME.as_secs_f32()).ceil() as u64 + 120;

    for _ in 0..max_frames {
        app.update();
        let done = app
            .world()
            .get_resource::<HeadlessRoundState>()
            .is_some_and(|state| state.round_complete);
        if done {
            return Ok(app);
        }
    }
    Err(format!("Round did not finish within {} frames", max_frames))
}

fn round_result(app: &App) -> Result<RoundResult, String> {
    app.world()
        .get_resource::<HeadlessRoundState>()
        .and_then(|state| state.result.clone())
        .ok_or_else(|| "Round finished without a result".to_string())
}

/// Simulate a round deterministically and return its result
pub fn simulate_round(config: &HeadlessRoundConfig) -> Result<RoundResult, String> {
    let app = run_to_completion(config)?;
    round_result(&app)
}

/// Like [`simulate_round`], also handing back the round's combat log
pub fn simulate_round_with_log(config: &HeadlessRoundConfig) -> Result<(RoundResult, CombatLog), String> {
    let mut app = run_to_completion(config)?;
    let result = round_result(&app)?;
    let combat_log = app
        .world_mut()
        .remove_resource::<CombatLog>()
        .ok_or_else(|| "Combat log missing".to_string())?;
    Ok((result, combat_log))
}

/// Run a round from the command line, print a summary and save the log
pub fn run_headless_round(config: HeadlessRoundConfig) -> Result<RoundResult, String> {
    println!("Starting headless round simulation...");
    for (index, wave) in config.waves.iter().enumerate() {
        println!("  Wave {}: {:?}", index + 1, wave);
    }
    println!("  Input profile: {}", config.input_profile);
    println!("  Max duration: {:.0}s", config.max_duration_secs);

    let app = run_to_completion(&config)?;
    let result = round_result(&app)?;

    println!(
        "Round complete: {} after {:.1}s ({} waves cleared, {} enemies defeated, player health {:.0})",
        result.outcome_label(),
        result.duration,
        result.waves_cleared,
        result.enemies_defeated,
        result.final_player_health
    );

    let metadata = RoundMetadata {
        outcome: result.outcome_label().to_string(),
        waves_cleared: result.waves_cleared,
        final_player_health: result.final_player_health,
        random_seed: result.random_seed,
    };
    if let Some(combat_log) = app.world().get_resource::<CombatLog>() {
        match combat_log.save_to_file(&metadata, config.output_path.as_deref()) {
            Ok(path) => println!("Log saved to: {}", path),
            Err(e) => eprintln!("Failed to save combat log: {}", e),
        }
    }

    Ok(result)
}
