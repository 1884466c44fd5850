use avian3d::prelude::*;
use bevy::prelude::*;

/// Velocity-driven rigid body the controller steers.
///
/// The controller never writes position; the physics integrator owns it.
pub trait CharacterBody {
    fn position(&self) -> Vec3;
    fn rotation(&self) -> Quat;
    fn set_rotation(&mut self, rotation: Quat);
    fn velocity(&self) -> Vec3;
    fn set_velocity(&mut self, velocity: Vec3);
    fn add_impulse(&mut self, impulse: Vec3);
    fn set_gravity_enabled(&mut self, enabled: bool);
}

/// [`CharacterBody`] over the avian components of one character.
pub struct AvianBody<'a> {
    pub transform: &'a mut Transform,
    pub velocity: &'a mut LinearVelocity,
    pub impulse: &'a mut ExternalImpulse,
    pub gravity: &'a mut GravityScale,
    /// Scale written back when gravity is re-enabled.
    pub gravity_scale: f32,
}

impl CharacterBody for AvianBody<'_> {
    fn position(&self) -> Vec3 {
        self.transform.translation
    }

    fn rotation(&self) -> Quat {
        self.transform.rotation
    }

    fn set_rotation(&mut self, rotation: Quat) {
        self.transform.rotation = rotation;
    }

    fn velocity(&self) -> Vec3 {
        self.velocity.0
    }

    fn set_velocity(&mut self, velocity: Vec3) {
        self.velocity.0 = velocity;
    }

    fn add_impulse(&mut self, impulse: Vec3) {
        self.impulse.apply_impulse(impulse);
    }

    fn set_gravity_enabled(&mut self, enabled: bool) {
        self.gravity.0 = if enabled { self.gravity_scale } else { 0.0 };
    }
}

#[cfg(test)]
pub(crate) mod fake {
    use super::*;

    /// Body that integrates nothing and records what the controller did.
    #[derive(Clone, Debug)]
    pub struct FakeBody {
        pub position: Vec3,
        pub rotation: Quat,
        pub velocity: Vec3,
        pub impulses: Vec<Vec3>,
        pub gravity_enabled: bool,
    }

    impl Default for FakeBody {
        fn default() -> Self {
            Self {
                position: Vec3::ZERO,
                rotation: Quat::IDENTITY,
                velocity: Vec3::ZERO,
                impulses: Vec::new(),
                gravity_enabled: true,
            }
        }
    }

    impl FakeBody {
        pub fn at(position: Vec3) -> Self {
            Self {
                position,
                ..default()
            }
        }

        pub fn total_impulse(&self) -> Vec3 {
            self.impulses.iter().copied().sum()
        }
    }

    impl CharacterBody for FakeBody {
        fn position(&self) -> Vec3 {
            self.position
        }

        fn rotation(&self) -> Quat {
            self.rotation
        }

        fn set_rotation(&mut self, rotation: Quat) {
            self.rotation = rotation;
        }

        fn velocity(&self) -> Vec3 {
            self.velocity
        }

        fn set_velocity(&mut self, velocity: Vec3) {
            self.velocity = velocity;
        }

        fn add_impulse(&mut self, impulse: Vec3) {
            self.impulses.push(impulse);
        }

        fn set_gravity_enabled(&mut self, enabled: bool) {
            self.gravity_enabled = enabled;
        }
    }
}
