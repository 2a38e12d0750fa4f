//! Camera system
//!
//! A third-person camera trailing the player:
//! - Smoothly follows the player's position
//! - Zoom in/out via keybindings
//! - Holds still once the player is gone

use bevy::prelude::*;

use crate::combat::components::Player;
use crate::keybindings::{GameAction, Keybindings};

/// Plugin for camera management
pub struct CameraPlugin;

impl Plugin for CameraPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<CameraSettings>()
            .add_systems(Startup, spawn_camera)
            .add_systems(Update, (camera_zoom, follow_player).chain());
    }
}

#[derive(Resource)]
pub struct CameraSettings {
    /// Current distance from the player
    pub zoom: f32,
    pub zoom_min: f32,
    pub zoom_max: f32,
    /// Camera movement smoothing factor
    pub smoothing: f32,
    /// Direction from the player to the camera
    pub offset_direction: Vec3,
}

impl Default for CameraSettings {
    fn default() -> Self {
        Self {
            zoom: 14.0,
            zoom_min: 6.0,
            zoom_max: 30.0,
            smoothing: 5.0,
            offset_direction: Vec3::new(0.0, 0.8, 1.0).normalize(),
        }
    }
}

impl CameraSettings {
    pub fn desired_position(&self, target: Vec3) -> Vec3 {
        target + self.offset_direction * self.zoom
    }
}

/// Marker component for the main 3D game camera
#[derive(Component)]
pub struct MainCamera;

fn spawn_camera(mut commands: Commands, settings: Res<CameraSettings>) {
    commands.spawn((
        Camera3d::default(),
        Transform::from_translation(settings.desired_position(Vec3::ZERO)).looking_at(Vec3::ZERO, Vec3::Y),
        MainCamera,
    ));
}

fn camera_zoom(
    mut settings: ResMut<CameraSettings>,
    keybindings: Res<Keybindings>,
    keyboard: Res<ButtonInput<KeyCode>>,
    time: Res<Time>,
) {
    let zoom_speed = 10.0 * time.delta_secs();
    if keybindings.action_pressed(GameAction::CameraZoomIn, &keyboard) {
        settings.zoom -= zoom_speed;
    }
    if keybindings.action_pressed(GameAction::CameraZoomOut, &keyboard) {
        settings.zoom += zoom_speed;
    }
    settings.zoom = settings.zoom.clamp(settings.zoom_min, settings.zoom_max);
}

fn follow_player(
    settings: Res<CameraSettings>,
    time: Res<Time>,
    player: Query<&Transform, (With<Player>, Without<MainCamera>)>,
    mut camera: Query<&mut Transform, With<MainCamera>>,
) {
    let (Ok(target), Ok(mut camera_transform)) = (player.get_single(), camera.get_single_mut()) else {
        return;
    };
    let focus = target.translation;
    let desired = settings.desired_position(focus);
    let blend = (settings.smoothing * time.delta_secs()).min(1.0);
    camera_transform.translation = camera_transform.translation.lerp(desired, blend);
    camera_transform.look_at(focus, Vec3::Y);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_camera_sits_above_and_behind() {
        let settings = CameraSettings::default();
        let position = settings.desired_position(Vec3::new(2.0, 0.0, 2.0));
        assert!(position.y > 0.0);
        assert!(position.z > 2.0);
        assert!(((position - Vec3::new(2.0, 0.0, 2.0)).length() - settings.zoom).abs() < 1e-4);
    }
}
