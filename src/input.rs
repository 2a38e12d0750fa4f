//! Player intent
//!
//! Raw devices are reduced to a [`PlayerIntent`] once per frame. The
//! character controller only consumes the derived `should_walk` and
//! `should_attack` signals, so keyboard play, touch play and the headless
//! autopilot all drive the player the same way.

use bevy::prelude::*;

use crate::keybindings::{GameAction, Keybindings};

/// Directional state from keyboard or virtual joystick
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct MovementIntent {
    pub up: bool,
    pub left: bool,
    pub right: bool,
    pub down: bool,
    pub jump: bool,
    pub run: bool,
    pub using_joystick: bool,
    /// Joystick deflection on the ground plane (x, 0, z)
    pub joystick: Vec3,
}

impl MovementIntent {
    pub fn should_walk(&self) -> bool {
        if self.using_joystick {
            return self.joystick.length_squared() > f32::EPSILON;
        }
        self.up || self.down || self.left || self.right
    }

    /// Normalized ground-plane direction, zero when standing still
    pub fn direction(&self) -> Vec3 {
        let raw = if self.using_joystick {
            Vec3::new(self.joystick.x, 0.0, self.joystick.z)
        } else {
            let x = (self.right as i8 - self.left as i8) as f32;
            let z = (self.down as i8 - self.up as i8) as f32;
            Vec3::new(x, 0.0, z)
        };
        raw.normalize_or_zero()
    }
}

#[derive(Resource, Debug, Clone, Default)]
pub struct PlayerIntent {
    pub movement: MovementIntent,
    /// Attack requested this frame
    pub attack: bool,
}

impl PlayerIntent {
    pub fn should_walk(&self) -> bool {
        self.movement.should_walk()
    }

    pub fn should_attack(&self) -> bool {
        self.attack
    }
}

/// Keyboard reader for windowed play
pub fn read_keyboard_intent(
    keyboard: Res<ButtonInput<KeyCode>>,
    keybindings: Res<Keybindings>,
    mut intent: ResMut<PlayerIntent>,
) {
    let held = |action| keybindings.action_pressed(action, &keyboard);
    intent.movement = MovementIntent {
        up: held(GameAction::MoveUp),
        left: held(GameAction::MoveLeft),
        right: held(GameAction::MoveRight),
        down: held(GameAction::MoveDown),
        jump: held(GameAction::Jump),
        run: held(GameAction::Run),
        using_joystick: false,
        joystick: Vec3::ZERO,
    };
    intent.attack = keybindings.action_just_pressed(GameAction::Attack, &keyboard);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_opposite_keys_cancel() {
        let intent = MovementIntent {
            left: true,
            right: true,
            ..default()
        };
        assert!(intent.should_walk());
        assert_eq!(intent.direction(), Vec3::ZERO);
    }

    #[test]
    fn test_joystick_overrides_keys() {
        let intent = MovementIntent {
            up: true,
            using_joystick: true,
            joystick: Vec3::new(0.0, 0.0, 0.0),
            ..default()
        };
        assert!(!intent.should_walk());

        let pushed = MovementIntent {
            using_joystick: true,
            joystick: Vec3::new(3.0, 0.0, 4.0),
            ..default()
        };
        assert!((pushed.direction() - Vec3::new(0.6, 0.0, 0.8)).length() < 1e-5);
    }
}
