//! Integration tests for combat coordination inside a running app
//!
//! These tests verify that:
//! - An attack pressed while walking lands exactly once
//! - Impacts from dead attackers are dropped
//! - Grabs freeze the player and every hold is released
//! - Ledger deaths reach the state machine in the same frame
//! - Finished death sequences despawn enemies or end the round in defeat

use bevy::ecs::world::Mut;
use bevy::prelude::*;
use bevy::time::TimeUpdateStrategy;

use grimbrawl::combat::components::{spawn_enemy, Player};
use grimbrawl::combat::events::{EnemyEvent, PlayerEvent};
use grimbrawl::combat::ledger::{EnemyId, EnemyKind, EnemyLedger, PlayerLedger, MAX_HEALTH};
use grimbrawl::combat::log::{CombatLog, CombatLogEventType};
use grimbrawl::combat::rounds::WaveRoster;
use grimbrawl::headless::runner::FRAME;
use grimbrawl::input::{MovementIntent, PlayerIntent};
use grimbrawl::session::{GameRng, RoundOutcome, RoundState};
use grimbrawl::settings::GameSettings;
use grimbrawl::{CharacterActions, GamePlugin};

/// Game app with no scripted waves; tests place their own enemies
fn coordination_app() -> App {
    let settings = GameSettings {
        sounds_enabled: false,
        ..default()
    };

    let mut app = App::new();
    app.add_plugins(MinimalPlugins)
        .add_plugins(TransformPlugin)
        .add_plugins(HierarchyPlugin)
        .insert_resource(TimeUpdateStrategy::ManualDuration(FRAME))
        .add_plugins(GamePlugin { settings })
        .insert_resource(WaveRoster {
            waves: Vec::new(),
            ..default()
        })
        .insert_resource(GameRng::from_seed(7));
    app.finish();
    app.cleanup();
    app
}

fn spawn(app: &mut App, id: &str, kind: EnemyKind, position: Vec3) -> Entity {
    let tuning = app.world().resource::<GameSettings>().combat.clone();
    let world = app.world_mut();
    let entity = world
        .resource_scope(|world, mut ledger: Mut<EnemyLedger>| {
            let mut commands = world.commands();
            spawn_enemy(&mut commands, &mut ledger, &tuning, EnemyId::from(id), kind, position)
        })
        .expect("enemy spawns");
    world.flush();
    entity
}

fn exists(app: &App, entity: Entity) -> bool {
    app.world().entities().contains(entity)
}

fn step(app: &mut App, frames: usize) {
    for _ in 0..frames {
        app.update();
    }
}

fn player_position(app: &mut App) -> Vec3 {
    let world = app.world_mut();
    let mut query = world.query_filtered::<&Transform, With<Player>>();
    query.single(world).translation
}

fn player_actions(app: &mut App) -> &CharacterActions {
    let world = app.world_mut();
    let mut query = world.query_filtered::<&CharacterActions, With<Player>>();
    query.single(world)
}

fn set_intent(app: &mut App, movement: MovementIntent, attack: bool) {
    let mut intent = app.world_mut().resource_mut::<PlayerIntent>();
    intent.movement = movement;
    intent.attack = attack;
}

fn hold_up() -> MovementIntent {
    MovementIntent {
        up: true,
        ..default()
    }
}

fn count_logged(app: &App, event_type: CombatLogEventType, needle: &str) -> usize {
    app.world()
        .resource::<CombatLog>()
        .filter_by_type(event_type)
        .iter()
        .filter(|entry| entry.message.contains(needle))
        .count()
}

fn player_ledger(app: &App) -> &PlayerLedger {
    app.world().resource::<PlayerLedger>()
}

fn kill_enemy(app: &mut App, id: &str) {
    let id = EnemyId::from(id);
    app.world_mut()
        .resource_scope(|world, mut ledger: Mut<EnemyLedger>| {
            let mut events = world.resource_mut::<Events<EnemyEvent>>();
            ledger.damage(&id, 2.0 * MAX_HEALTH, &mut *events);
        });
}

fn kill_player(app: &mut App) {
    app.world_mut()
        .resource_scope(|world, mut ledger: Mut<PlayerLedger>| {
            let mut events = world.resource_mut::<Events<PlayerEvent>>();
            ledger.damage(2.0 * MAX_HEALTH, &mut *events);
        });
}

// ============================================================================
// Player input
// ============================================================================

#[test]
fn test_attack_while_walking_lands_once() {
    let mut app = coordination_app();
    set_intent(&mut app, hold_up(), false);
    step(&mut app, 9);

    // One frame of attack input with movement still held
    set_intent(&mut app, hold_up(), true);
    step(&mut app, 1);
    set_intent(&mut app, hold_up(), false);
    step(&mut app, 1);
    let planted = player_position(&mut app);
    assert!(planted.z < 0.0, "player walked before the attack");
    assert!(player_actions(&mut app).is_swing_pending());

    // Feet stay planted until the deferred swing starts
    step(&mut app, 24);
    assert_eq!(player_position(&mut app), planted);

    step(&mut app, 165);
    assert_eq!(count_logged(&app, CombatLogEventType::Attack, "Player swings"), 1);
    // Walking resumes once the swing is over
    assert!(player_position(&mut app).z < planted.z);
}

#[test]
fn test_player_swing_hits_enemy_in_reach() {
    let mut app = coordination_app();
    spawn(&mut app, "skeleton-1", EnemyKind::Skeleton, Vec3::new(2.0, 0.0, 0.0));
    step(&mut app, 1);

    set_intent(&mut app, MovementIntent::default(), true);
    step(&mut app, 1);

    let health = app
        .world()
        .resource::<EnemyLedger>()
        .get(&EnemyId::from("skeleton-1"))
        .map(|record| record.health);
    assert_eq!(health, Some(MAX_HEALTH - 34.0));
}

#[test]
fn test_dead_player_impact_is_dropped() {
    let mut app = coordination_app();
    spawn(&mut app, "skeleton-1", EnemyKind::Skeleton, Vec3::new(2.0, 0.0, 0.0));
    step(&mut app, 1);

    // Ledger death without the event, so the state machine still swings
    app.world_mut()
        .resource_mut::<PlayerLedger>()
        .damage(2.0 * MAX_HEALTH, &mut Vec::<PlayerEvent>::new());
    set_intent(&mut app, MovementIntent::default(), true);
    step(&mut app, 1);

    let health = app
        .world()
        .resource::<EnemyLedger>()
        .get(&EnemyId::from("skeleton-1"))
        .map(|record| record.health);
    assert_eq!(health, Some(MAX_HEALTH));
    assert_eq!(count_logged(&app, CombatLogEventType::Attack, "Player swings"), 0);
}

// ============================================================================
// Enemy impacts
// ============================================================================

#[test]
fn test_adjacent_skeleton_hits_the_player() {
    let mut app = coordination_app();
    spawn(&mut app, "skeleton-1", EnemyKind::Skeleton, Vec3::new(1.0, 0.0, 0.0));
    step(&mut app, 1);

    assert_eq!(player_ledger(&app).health(), MAX_HEALTH - 10.0);
}

#[test]
fn test_dead_enemy_impact_is_dropped() {
    let mut app = coordination_app();
    spawn(&mut app, "skeleton-1", EnemyKind::Skeleton, Vec3::new(1.0, 0.0, 0.0));
    app.world_mut()
        .resource_mut::<EnemyLedger>()
        .damage(&EnemyId::from("skeleton-1"), 2.0 * MAX_HEALTH, &mut Vec::<EnemyEvent>::new());

    // Long enough for two swings
    step(&mut app, 120);

    assert_eq!(player_ledger(&app).health(), MAX_HEALTH);
    assert_eq!(count_logged(&app, CombatLogEventType::Damage, "Player is hit"), 0);
}

// ============================================================================
// Grabs
// ============================================================================

#[test]
fn test_zombie_grab_freezes_until_swing_finishes() {
    let mut app = coordination_app();
    spawn(&mut app, "zombie-1", EnemyKind::Zombie, Vec3::new(1.0, 0.0, 0.0));
    step(&mut app, 1);

    assert!(player_ledger(&app).is_frozen());
    assert_eq!(count_logged(&app, CombatLogEventType::Hold, "zombie-1 grabs"), 1);

    // Held movement goes nowhere while frozen
    set_intent(&mut app, hold_up(), false);
    step(&mut app, 80);
    assert!(player_ledger(&app).is_frozen());
    assert_eq!(player_position(&mut app), Vec3::ZERO);

    // The 1.5s grab swing ends around frame 90
    let mut released_at = None;
    for frame in 82..=100 {
        app.update();
        if count_logged(&app, CombatLogEventType::Hold, "zombie-1 releases") > 0 {
            released_at = Some(frame);
            break;
        }
    }
    assert!(
        released_at.is_some_and(|frame| (85..=95).contains(&frame)),
        "hold released at {:?}",
        released_at
    );
}

#[test]
fn test_grabber_death_releases_hold_in_same_frame() {
    let mut app = coordination_app();
    let zombie = spawn(&mut app, "zombie-1", EnemyKind::Zombie, Vec3::new(1.0, 0.0, 0.0));
    step(&mut app, 1);
    assert!(player_ledger(&app).is_frozen());

    kill_enemy(&mut app, "zombie-1");
    step(&mut app, 1);

    assert!(!player_ledger(&app).is_frozen());
    let world = app.world();
    assert!(world
        .get::<CharacterActions>(zombie)
        .is_some_and(CharacterActions::is_dead));
    assert_eq!(world.resource::<RoundState>().enemies_defeated, 1);
    assert_eq!(count_logged(&app, CombatLogEventType::Death, "zombie-1 has been destroyed"), 1);
}

#[test]
fn test_death_complete_releases_leftover_hold() {
    let mut app = coordination_app();
    let zombie = spawn(&mut app, "zombie-1", EnemyKind::Zombie, Vec3::new(1.0, 0.0, 0.0));
    step(&mut app, 1);

    // Dies without a ledger event, so only the finished sequence can let go
    if let Some(mut actions) = app.world_mut().get_mut::<CharacterActions>(zombie) {
        actions.die();
    }
    step(&mut app, 200);
    assert!(player_ledger(&app).is_frozen());

    step(&mut app, 120);
    assert!(!player_ledger(&app).is_frozen());
    assert_eq!(count_logged(&app, CombatLogEventType::Hold, "zombie-1 releases"), 1);
    assert!(!exists(&app, zombie));
}

// ============================================================================
// Death sequences
// ============================================================================

#[test]
fn test_enemy_death_sequence_despawns_and_wins() {
    let mut app = coordination_app();
    let slime = spawn(&mut app, "slime-1", EnemyKind::Slime, Vec3::new(6.0, 0.0, 0.0));
    step(&mut app, 1);

    kill_enemy(&mut app, "slime-1");
    step(&mut app, 1);
    assert!(exists(&app, slime));

    step(&mut app, 280);
    assert!(exists(&app, slime));
    assert_eq!(app.world().resource::<RoundState>().outcome, None);

    step(&mut app, 40);
    assert!(!exists(&app, slime));
    assert!(app.world().resource::<EnemyLedger>().is_empty());
    assert_eq!(
        app.world().resource::<RoundState>().outcome,
        Some(RoundOutcome::Victory)
    );
}

#[test]
fn test_player_death_sequence_ends_in_defeat() {
    let mut app = coordination_app();
    spawn(&mut app, "skeleton-1", EnemyKind::Skeleton, Vec3::new(8.0, 0.0, 0.0));
    step(&mut app, 1);

    kill_player(&mut app);
    step(&mut app, 1);
    assert!(player_actions(&mut app).is_dead());
    assert_eq!(count_logged(&app, CombatLogEventType::Death, "Player has fallen"), 1);

    step(&mut app, 280);
    assert_eq!(app.world().resource::<RoundState>().outcome, None);

    step(&mut app, 40);
    assert_eq!(
        app.world().resource::<RoundState>().outcome,
        Some(RoundOutcome::Defeat)
    );
}
