use avian3d::prelude::*;
use bevy::prelude::*;

/// Fixed physics cadence the locomotion step runs at.
pub static PHYSICS_HZ: f64 = 64.0;

/// Physics layers used for ground, wall and climb filtering.
///
/// Walls are tagged [`GameLayer::Ground`] too: the same mask drives both the
/// grounded check and the wall-slide probe.
#[derive(PhysicsLayer, Clone, Copy, Debug, Default)]
pub enum GameLayer {
    #[default]
    Default,
    Ground,
    Climbable,
    Player,
}

/// Tunables for a third person character.
///
/// Set once at spawn. Controller systems only ever read it.
#[derive(Component, Clone, Debug)]
pub struct ControllerConfig {
    pub walk_speed: f32,
    pub sprint_speed: f32,
    /// Upward impulse applied on a grounded jump.
    pub jump_force: f32,
    pub climb_speed: f32,

    pub ground_mask: LayerMask,
    pub climbable_mask: LayerMask,

    pub ground_check_radius: f32,
    pub ground_check_height: f32,
    /// Height of the ground capsule center above the character's position.
    pub ground_check_offset: f32,
    pub climb_check_radius: f32,

    /// Length of the ray swept along the movement direction for wall sliding.
    pub wall_probe_distance: f32,
    /// Height of the wall probe origin above the character's position.
    pub wall_probe_height: f32,
    /// Facing slerp factor per second.
    pub turn_rate: f32,
    /// Squared length below which the move input counts as released.
    pub move_threshold: f32,
    /// Gravity scale restored when leaving climb mode.
    pub gravity_scale: f32,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            walk_speed: 3.0,
            sprint_speed: 6.0,
            jump_force: 5.0,
            climb_speed: 2.0,

            ground_mask: GameLayer::Ground.into(),
            climbable_mask: GameLayer::Climbable.into(),

            ground_check_radius: 0.3,
            ground_check_height: 1.0,
            ground_check_offset: 0.5,
            climb_check_radius: 0.5,

            wall_probe_distance: 0.6,
            wall_probe_height: 0.0,
            turn_rate: 10.0,
            move_threshold: 0.01,
            gravity_scale: 1.0,
        }
    }
}

impl ControllerConfig {
    pub fn with_speeds(mut self, walk_speed: f32, sprint_speed: f32) -> Self {
        self.walk_speed = walk_speed;
        self.sprint_speed = sprint_speed;
        self
    }

    pub fn with_jump_force(mut self, jump_force: f32) -> Self {
        self.jump_force = jump_force;
        self
    }

    pub fn with_climb_speed(mut self, climb_speed: f32) -> Self {
        self.climb_speed = climb_speed;
        self
    }

    pub fn with_masks(
        mut self,
        ground_mask: impl Into<LayerMask>,
        climbable_mask: impl Into<LayerMask>,
    ) -> Self {
        self.ground_mask = ground_mask.into();
        self.climbable_mask = climbable_mask.into();
        self
    }

    pub fn with_wall_probe_height(mut self, wall_probe_height: f32) -> Self {
        self.wall_probe_height = wall_probe_height;
        self
    }

    pub fn speed(&self, sprint: bool) -> f32 {
        if sprint {
            self.sprint_speed
        } else {
            self.walk_speed
        }
    }

    /// World-space segment endpoints (top, bottom) of the ground capsule.
    pub fn ground_capsule(&self, position: Vec3) -> (Vec3, Vec3) {
        let center = position + Vec3::Y * self.ground_check_offset;
        let half_segment = (self.ground_check_height * 0.5 - self.ground_check_radius).max(0.0);
        (
            center + Vec3::Y * half_segment,
            center - Vec3::Y * half_segment,
        )
    }
}

/// Key bindings read by the keyboard sampler.
#[derive(Component, Clone, Debug)]
pub struct ControllerKeys {
    pub key_forward: KeyCode,
    pub key_back: KeyCode,
    pub key_left: KeyCode,
    pub key_right: KeyCode,
    pub key_sprint: KeyCode,
    pub key_jump: KeyCode,
}

impl Default for ControllerKeys {
    fn default() -> Self {
        Self {
            key_forward: KeyCode::KeyW,
            key_back: KeyCode::KeyS,
            key_left: KeyCode::KeyA,
            key_right: KeyCode::KeyD,
            key_sprint: KeyCode::ShiftLeft,
            key_jump: KeyCode::Space,
        }
    }
}
