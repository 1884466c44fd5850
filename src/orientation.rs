use bevy::prelude::*;

/// Keeps every [`OrientationBasis`] facing along the [`ControllerCamera`].
///
/// The basis is read after transform propagation, so camera rigs moved
/// anywhere in `Update` (parented or not) are seen in the same frame.
pub struct OrientationPlugin;

impl Plugin for OrientationPlugin {
    fn build(&self, app: &mut App) {
        app.add_systems(
            PostUpdate,
            update_orientation.after(TransformSystem::TransformPropagate),
        );
    }
}

/// Marker for the camera whose facing drives the movement plane.
#[derive(Component, Default)]
pub struct ControllerCamera;

// Projected camera forward shorter than this keeps the previous basis.
const FLATTEN_EPSILON: f32 = 1e-4;

/// Movement-plane basis of a character, derived from the camera each frame.
///
/// `forward` is always unit length with a zero vertical component.
#[derive(Component, Clone, Copy, Debug, PartialEq)]
pub struct OrientationBasis {
    forward: Vec3,
}

impl Default for OrientationBasis {
    fn default() -> Self {
        Self {
            forward: Vec3::NEG_Z,
        }
    }
}

impl OrientationBasis {
    pub fn forward(&self) -> Vec3 {
        self.forward
    }

    /// Horizontal perpendicular to the right of `forward`.
    pub fn right(&self) -> Vec3 {
        self.forward.cross(Vec3::Y)
    }

    pub fn up(&self) -> Vec3 {
        Vec3::Y
    }

    /// Flattens `camera_forward` onto the horizontal plane and adopts it.
    ///
    /// Returns `false` and keeps the current basis when the camera looks
    /// (nearly) straight up or down.
    pub fn update_orientation(&mut self, camera_forward: Vec3) -> bool {
        let flat = Vec3::new(camera_forward.x, 0.0, camera_forward.z);
        if !flat.is_finite() || flat.length_squared() < FLATTEN_EPSILON * FLATTEN_EPSILON {
            return false;
        }
        self.forward = flat.normalize();
        true
    }
}

/// Copies the controller camera's facing into every character's basis.
///
/// Runs once per frame after propagation; the next physics step picks the
/// basis up.
pub fn update_orientation(
    camera: Query<&GlobalTransform, With<ControllerCamera>>,
    mut query: Query<&mut OrientationBasis>,
) {
    let Ok(camera_transform) = camera.single() else {
        return;
    };
    let camera_forward = camera_transform.forward().as_vec3();

    for mut basis in &mut query {
        if !basis.update_orientation(camera_forward) {
            trace!("camera forward {camera_forward} is vertical, keeping basis");
        }
    }
}
