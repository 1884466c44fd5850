use bevy::prelude::*;

use crate::config::ControllerKeys;

pub struct InputPlugin;

impl Plugin for InputPlugin {
    fn build(&self, app: &mut App) {
        use bevy::input::{gamepad, keyboard};

        app.add_systems(
            PreUpdate,
            (keyboard_input, gamepad_input)
                .chain()
                .after(keyboard::keyboard_input_system)
                .after(gamepad::gamepad_event_processing_system),
        );
    }
}

/// Input state read by the locomotion step.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct InputSnapshot {
    pub move_axis: Vec2,
    pub sprint: bool,
    pub jump_requested: bool,
}

/// Last-write-wins buffer between input callbacks and the fixed step.
///
/// Move axis and sprint are overwritten on every event. A jump press is sticky
/// until the next physics step consumes it; extra presses in between collapse
/// into one.
#[derive(Component, Clone, Debug, Default)]
pub struct LocomotionInput {
    snapshot: InputSnapshot,
}

impl LocomotionInput {
    pub fn set_move_axis(&mut self, axis: Vec2) {
        self.snapshot.move_axis = axis.clamp_length_max(1.0);
    }

    pub fn release_move_axis(&mut self) {
        self.snapshot.move_axis = Vec2::ZERO;
    }

    pub fn press_sprint(&mut self) {
        self.snapshot.sprint = true;
    }

    pub fn release_sprint(&mut self) {
        self.snapshot.sprint = false;
    }

    pub fn press_jump(&mut self) {
        self.snapshot.jump_requested = true;
    }

    pub fn current_snapshot(&self) -> InputSnapshot {
        self.snapshot
    }

    pub(crate) fn clear_jump(&mut self) {
        self.snapshot.jump_requested = false;
    }
}

/// Feeds keyboard state into every character's [`LocomotionInput`].
fn keyboard_input(
    key_input: Res<ButtonInput<KeyCode>>,
    mut query: Query<(&ControllerKeys, &mut LocomotionInput)>,
) {
    for (keys, mut input) in &mut query {
        let axis = Vec2::new(
            get_axis(&key_input, keys.key_right, keys.key_left),
            get_axis(&key_input, keys.key_forward, keys.key_back),
        );
        let any_move_key = [keys.key_forward, keys.key_back, keys.key_left, keys.key_right];

        // Opposing keys held together cancel to a released axis.
        if axis != Vec2::ZERO {
            input.set_move_axis(axis);
        } else if key_input.any_pressed(any_move_key) || key_input.any_just_released(any_move_key)
        {
            input.release_move_axis();
        }

        if key_input.just_pressed(keys.key_sprint) {
            input.press_sprint();
        } else if key_input.just_released(keys.key_sprint) {
            input.release_sprint();
        }

        if key_input.just_pressed(keys.key_jump) {
            input.press_jump();
        }
    }
}

// Stick values inside this radius are treated as released.
const STICK_DEADZONE: f32 = 0.1;

/// Feeds the first gamepad's left stick, left stick click (sprint) and south
/// button (jump).
fn gamepad_input(
    gamepads: Query<&Gamepad>,
    mut stick_held: Local<bool>,
    mut query: Query<&mut LocomotionInput>,
) {
    let Some(gamepad) = gamepads.iter().next() else {
        return;
    };

    let stick = gamepad.left_stick();
    let outside_deadzone = stick.length_squared() > STICK_DEADZONE * STICK_DEADZONE;
    for mut input in &mut query {
        if outside_deadzone {
            input.set_move_axis(stick);
        } else if *stick_held {
            input.release_move_axis();
        }

        if gamepad.just_pressed(GamepadButton::LeftThumb) {
            input.press_sprint();
        } else if gamepad.just_released(GamepadButton::LeftThumb) {
            input.release_sprint();
        }
        if gamepad.just_pressed(GamepadButton::South) {
            input.press_jump();
        }
    }
    *stick_held = outside_deadzone;
}

fn get_pressed(key_input: &ButtonInput<KeyCode>, key: KeyCode) -> f32 {
    if key_input.pressed(key) { 1.0 } else { 0.0 }
}

fn get_axis(key_input: &ButtonInput<KeyCode>, key_pos: KeyCode, key_neg: KeyCode) -> f32 {
    get_pressed(key_input, key_pos) - get_pressed(key_input, key_neg)
}
