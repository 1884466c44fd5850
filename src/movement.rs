use bevy::prelude::*;

use crate::body::CharacterBody;
use crate::config::ControllerConfig;
use crate::input_plugin::InputSnapshot;
use crate::orientation::OrientationBasis;
use crate::sensor::PhysicsQueries;

// Below this squared length a direction is treated as zero instead of normalized.
const DIRECTION_EPSILON: f32 = 1e-6;

/// Camera-relative movement direction on the horizontal plane, unnormalized.
pub fn desired_direction(basis: &OrientationBasis, move_axis: Vec2) -> Vec3 {
    basis.forward() * move_axis.y + basis.right() * move_axis.x
}

/// Redirects a horizontal `direction` along a surface with `normal`.
///
/// The normal is flattened first so the result stays horizontal. Returns
/// `direction` unchanged for floor-like normals and `None` when the motion is
/// straight into the surface.
pub fn slide_along(direction: Vec3, normal: Vec3) -> Option<Vec3> {
    let Some(wall_normal) = Vec3::new(normal.x, 0.0, normal.z).try_normalize() else {
        return Some(direction);
    };

    let slide = direction - wall_normal * direction.dot(wall_normal);
    if slide.length_squared() < DIRECTION_EPSILON {
        return None;
    }
    Some(slide.normalize())
}

/// Horizontal velocity for grounded movement, or zero when the input is
/// released or the path is fully blocked.
pub fn grounded_velocity(
    world: &impl PhysicsQueries,
    config: &ControllerConfig,
    basis: &OrientationBasis,
    input: &InputSnapshot,
    position: Vec3,
) -> Vec3 {
    let direction = desired_direction(basis, input.move_axis);
    if direction.length_squared() <= config.move_threshold {
        return Vec3::ZERO;
    }
    let Ok(heading) = Dir3::new(direction) else {
        return Vec3::ZERO;
    };

    let movement = match world.raycast(
        position + Vec3::Y * config.wall_probe_height,
        heading,
        config.wall_probe_distance,
        config.ground_mask,
    ) {
        Some(hit) => slide_along(*heading, hit.normal),
        None => Some(*heading),
    };

    movement.map_or(Vec3::ZERO, |m| m * config.speed(input.sprint))
}

/// Applies grounded movement: sets horizontal velocity, keeps vertical.
///
/// Also turns the body toward the movement direction at `turn_rate * dt` per
/// step.
pub fn apply_grounded_movement(
    world: &impl PhysicsQueries,
    config: &ControllerConfig,
    basis: &OrientationBasis,
    input: &InputSnapshot,
    body: &mut impl CharacterBody,
    dt: f32,
) {
    let planar = grounded_velocity(world, config, basis, input, body.position());
    let vertical = body.velocity().y;
    body.set_velocity(Vec3::new(planar.x, vertical, planar.z));

    if let Some(facing) = planar.try_normalize() {
        let target = Transform::IDENTITY.looking_to(facing, Vec3::Y).rotation;
        let t = (dt * config.turn_rate).clamp(0.0, 1.0);
        body.set_rotation(body.rotation().slerp(target, t));
    }
}

/// Climb velocity on the wall plane: up/down from the forward axis, sideways
/// from the strafe axis.
pub fn climb_velocity(config: &ControllerConfig, basis: &OrientationBasis, move_axis: Vec2) -> Vec3 {
    (basis.up() * move_axis.y + basis.right() * move_axis.x) * config.climb_speed
}
