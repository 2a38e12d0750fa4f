//! Windowed graveyard scene
//!
//! Lighting, ground and character models, plus the keyboard hooks that only
//! make sense with a window. Gameplay waits on the [`AssetGate`] until every
//! model has loaded or failed; a failed model falls back to a placeholder mesh.

use bevy::asset::LoadState;
use bevy::gltf::Gltf;
use bevy::prelude::*;

use crate::character::animation::CharacterModel;
use crate::combat::components::{Enemy, Player};
use crate::combat::driver::drive_player;
use crate::combat::ledger::EnemyKind;
use crate::combat::rounds::RestartRound;
use crate::combat::CombatPhase;
use crate::input::read_keyboard_intent;
use crate::keybindings::{GameAction, Keybindings};
use crate::session::{AssetGate, GameRng, GameSession, RoundState};
use crate::settings::GameSettings;

pub struct ArenaPlugin;

impl Plugin for ArenaPlugin {
    fn build(&self, app: &mut App) {
        app.add_systems(Startup, (setup_graveyard, load_models))
            .add_systems(
                Update,
                (
                    read_keyboard_intent
                        .in_set(CombatPhase::Intent)
                        .before(drive_player),
                    session_keys,
                    (track_model_loading, dress_new_characters).chain(),
                ),
            );
    }
}

fn setup_graveyard(
    mut commands: Commands,
    mut meshes: ResMut<Assets<Mesh>>,
    mut materials: ResMut<Assets<StandardMaterial>>,
    mut rng: ResMut<GameRng>,
) {
    // Cold moonlight
    commands.spawn((
        DirectionalLight {
            illuminance: 6000.0,
            color: Color::srgb(0.7, 0.75, 1.0),
            shadows_enabled: true,
            ..default()
        },
        Transform::from_xyz(-6.0, 12.0, 4.0).looking_at(Vec3::ZERO, Vec3::Y),
    ));

    commands.insert_resource(AmbientLight {
        color: Color::srgb(0.35, 0.25, 0.45),
        brightness: 200.0,
    });

    let floor_size = 60.0;
    commands.spawn((
        Mesh3d(meshes.add(Plane3d::default().mesh().size(floor_size, floor_size))),
        MeshMaterial3d(materials.add(StandardMaterial {
            base_color: Color::srgb(0.12, 0.16, 0.1),
            perceptual_roughness: 1.0,
            ..default()
        })),
    ));

    let stone = materials.add(StandardMaterial {
        base_color: Color::srgb(0.4, 0.4, 0.42),
        perceptual_roughness: 0.8,
        ..default()
    });
    let tombstone = meshes.add(Cuboid::new(0.9, 1.3, 0.25));
    for _ in 0..24 {
        let x = rng.random_range(-floor_size / 2.0 + 2.0, floor_size / 2.0 - 2.0);
        let z = rng.random_range(-floor_size / 2.0 + 2.0, floor_size / 2.0 - 2.0);
        if Vec2::new(x, z).length() < 4.0 {
            continue;
        }
        commands.spawn((
            Mesh3d(tombstone.clone()),
            MeshMaterial3d(stone.clone()),
            Transform::from_xyz(x, 0.65, z)
                .with_rotation(Quat::from_rotation_y(rng.random_range(-0.4, 0.4))),
        ));
    }
}

fn kind_color(kind: EnemyKind) -> Color {
    match kind {
        EnemyKind::Skeleton => Color::srgb(0.9, 0.88, 0.8),
        EnemyKind::Zombie => Color::srgb(0.35, 0.55, 0.3),
        EnemyKind::Spider => Color::srgb(0.15, 0.1, 0.15),
        EnemyKind::Slime => Color::srgb(0.3, 0.85, 0.4),
    }
}

/// Character models, loaded once at startup
#[derive(Resource, Debug, Default)]
pub struct ModelLibrary {
    player: Handle<Gltf>,
    enemies: Vec<(EnemyKind, Handle<Gltf>)>,
}

impl ModelLibrary {
    fn enemy(&self, kind: EnemyKind) -> Option<&Handle<Gltf>> {
        self.enemies
            .iter()
            .find(|(candidate, _)| *candidate == kind)
            .map(|(_, handle)| handle)
    }

    fn handles(&self) -> impl Iterator<Item = &Handle<Gltf>> {
        std::iter::once(&self.player).chain(self.enemies.iter().map(|(_, handle)| handle))
    }
}

fn load_models(mut commands: Commands, asset_server: Res<AssetServer>) {
    let library = ModelLibrary {
        player: asset_server.load("models/Knight.glb"),
        enemies: EnemyKind::all()
            .into_iter()
            .map(|kind| (kind, asset_server.load(format!("models/{}.glb", kind.name()))))
            .collect(),
    };
    commands.insert_resource(AssetGate::new(library.handles().count()));
    commands.insert_resource(library);
}

/// Count models that finished loading, successfully or not
fn track_model_loading(
    asset_server: Res<AssetServer>,
    library: Option<Res<ModelLibrary>>,
    mut gate: ResMut<AssetGate>,
) {
    let Some(library) = library else {
        return;
    };
    if gate.is_loaded() {
        return;
    }

    let total = library.handles().count();
    let done = library
        .handles()
        .filter(|handle| {
            asset_server.is_loaded_with_dependencies(*handle)
                || matches!(asset_server.get_load_state(*handle), Some(LoadState::Failed(_)))
        })
        .count();

    let mut progress = AssetGate::new(total);
    progress.report_loaded(done);
    if progress.percent() != gate.percent() {
        info!("Loading models: {}%", progress.percent());
    }
    *gate = progress;
}

/// Marker for characters that already have a visible body
#[derive(Component)]
struct Dressed;

fn model_scene(gltfs: &Assets<Gltf>, handle: &Handle<Gltf>) -> Option<Handle<Scene>> {
    let gltf = gltfs.get(handle)?;
    gltf.default_scene.clone().or_else(|| gltf.scenes.first().cloned())
}

/// Give freshly spawned characters their model, or a placeholder mesh when
/// the model failed to load
#[allow(clippy::too_many_arguments)]
fn dress_new_characters(
    mut commands: Commands,
    gate: Res<AssetGate>,
    library: Option<Res<ModelLibrary>>,
    gltfs: Res<Assets<Gltf>>,
    mut meshes: ResMut<Assets<Mesh>>,
    mut materials: ResMut<Assets<StandardMaterial>>,
    players: Query<Entity, (With<Player>, Without<Dressed>)>,
    enemies: Query<(Entity, &Enemy), Without<Dressed>>,
) {
    if !gate.is_loaded() {
        return;
    }

    for entity in players.iter() {
        let model = library.as_ref().map(|library| library.player.clone());
        let scene = model.as_ref().and_then(|handle| model_scene(&gltfs, handle));
        let mut character = commands.entity(entity);
        character.insert((Dressed, Visibility::default()));
        match (model, scene) {
            (Some(model), Some(scene)) => {
                character
                    .insert(CharacterModel(model))
                    .with_children(|parent| {
                        parent.spawn(SceneRoot(scene));
                    });
            }
            _ => {
                character.with_children(|parent| {
                    parent.spawn((
                        Mesh3d(meshes.add(Capsule3d::new(0.4, 1.0))),
                        MeshMaterial3d(materials.add(Color::srgb(0.75, 0.6, 0.25))),
                        Transform::from_xyz(0.0, 0.9, 0.0),
                    ));
                });
            }
        }
    }

    for (entity, enemy) in enemies.iter() {
        let model = library
            .as_ref()
            .and_then(|library| library.enemy(enemy.kind).cloned());
        let scene = model.as_ref().and_then(|handle| model_scene(&gltfs, handle));
        let mut character = commands.entity(entity);
        character.insert((Dressed, Visibility::default()));
        if let (Some(model), Some(scene)) = (model, scene) {
            character
                .insert(CharacterModel(model))
                .with_children(|parent| {
                    parent.spawn(SceneRoot(scene));
                });
            continue;
        }

        let mesh = match enemy.kind {
            EnemyKind::Spider => meshes.add(Sphere::new(0.5)),
            EnemyKind::Slime => meshes.add(Sphere::new(0.6)),
            EnemyKind::Skeleton | EnemyKind::Zombie => meshes.add(Capsule3d::new(0.35, 1.0)),
        };
        character.with_children(|parent| {
            parent.spawn((
                Mesh3d(mesh),
                MeshMaterial3d(materials.add(kind_color(enemy.kind))),
                Transform::from_xyz(0.0, 0.8, 0.0),
            ));
        });
    }
}

fn session_keys(
    keyboard: Res<ButtonInput<KeyCode>>,
    keybindings: Res<Keybindings>,
    round: Res<RoundState>,
    mut session: ResMut<GameSession>,
    mut settings: ResMut<GameSettings>,
    mut restart: EventWriter<RestartRound>,
) {
    if keybindings.action_just_pressed(GameAction::ToggleSound, &keyboard) {
        let enabled = session.toggle_sounds();
        settings.sounds_enabled = enabled;
        info!("Sound {}", if enabled { "on" } else { "off" });
    }
    if round.is_over() && keybindings.action_just_pressed(GameAction::Restart, &keyboard) {
        restart.send(RestartRound);
    }
}
