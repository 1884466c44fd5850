use avian3d::prelude::*;
use bevy::prelude::*;

use crate::body::{AvianBody, CharacterBody};
use crate::config::{ControllerConfig, ControllerKeys, GameLayer, PHYSICS_HZ};
use crate::input_plugin::{InputPlugin, LocomotionInput};
use crate::movement::{apply_grounded_movement, climb_velocity};
use crate::orientation::{OrientationBasis, OrientationPlugin};
use crate::sensor::{PhysicsQueries, SpatialQueries, can_climb, is_grounded, layers_match};

/// Drives third person characters.
///
/// Input is sampled in `PreUpdate`, the movement basis follows the
/// [`ControllerCamera`](crate::ControllerCamera) once transforms have
/// propagated in `PostUpdate`, and locomotion runs in `FixedUpdate`:
///
/// ```
/// # use bevy::prelude::*;
/// # use third_person::*;
/// struct MyPlugin;
/// impl Plugin for MyPlugin {
///     fn build(&self, app: &mut App) {
///         app.add_systems(FixedUpdate, my_system.after(ControllerSet::Step));
///     }
/// }
///
/// fn my_system() { }
/// ```
pub struct ThirdPersonControllerPlugin;

#[derive(SystemSet, Debug, Clone, PartialEq, Eq, Hash)]
pub enum ControllerSet {
    /// Climb exits driven by trigger volumes.
    TriggerExit,
    /// The per-step locomotion state machine.
    Step,
}

impl Plugin for ThirdPersonControllerPlugin {
    fn build(&self, app: &mut App) {
        app.add_plugins((InputPlugin, OrientationPlugin))
            .init_resource::<ControllerDebug>()
            .insert_resource(Time::<Fixed>::from_hz(PHYSICS_HZ))
            .configure_sets(
                FixedUpdate,
                (ControllerSet::TriggerExit, ControllerSet::Step).chain(),
            )
            .add_systems(Update, draw_probe_gizmos)
            .add_systems(
                FixedUpdate,
                (
                    exit_climb_on_trigger_exit.in_set(ControllerSet::TriggerExit),
                    locomotion_step.in_set(ControllerSet::Step),
                ),
            );
        info!("third person controller running at {PHYSICS_HZ} Hz");
    }
}

/// Current locomotion mode of a character.
#[derive(Component, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum LocomotionMode {
    #[default]
    Grounded,
    Climbing,
}

/// What a single locomotion step did, for callers and tests.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StepOutcome {
    Moved,
    Jumped,
    StartedClimbing,
    Climbed,
}

// ██╗      ██████╗  ██████╗ ██╗ ██████╗
// ██║     ██╔═══██╗██╔════╝ ██║██╔════╝
// ██║     ██║   ██║██║  ███╗██║██║
// ██║     ██║   ██║██║   ██║██║██║
// ███████╗╚██████╔╝╚██████╔╝██║╚██████╗
// ╚══════╝ ╚═════╝  ╚═════╝ ╚═╝ ╚═════╝

/// One fixed step of the locomotion state machine.
///
/// The mode is read once on entry. The jump request is consumed whatever
/// branch runs.
pub fn step(
    mode: &mut LocomotionMode,
    input: &mut LocomotionInput,
    basis: &OrientationBasis,
    config: &ControllerConfig,
    world: &impl PhysicsQueries,
    body: &mut impl CharacterBody,
    dt: f32,
) -> StepOutcome {
    let snapshot = input.current_snapshot();

    let outcome = match *mode {
        LocomotionMode::Climbing => {
            body.set_velocity(climb_velocity(config, basis, snapshot.move_axis));
            StepOutcome::Climbed
        }
        LocomotionMode::Grounded => {
            apply_grounded_movement(world, config, basis, &snapshot, body, dt);

            if !snapshot.jump_requested {
                StepOutcome::Moved
            } else if is_grounded(world, config, body.position()) {
                body.add_impulse(Vec3::Y * config.jump_force);
                debug!("jump impulse {}", config.jump_force);
                StepOutcome::Jumped
            } else if can_climb(world, config, body.position()) {
                *mode = LocomotionMode::Climbing;
                body.set_gravity_enabled(false);
                debug!("entered climb at {}", body.position());
                StepOutcome::StartedClimbing
            } else {
                StepOutcome::Moved
            }
        }
    };

    input.clear_jump();
    outcome
}

/// Leaves climb mode after the character stops touching a climbable trigger.
///
/// Runs regardless of the current mode.
pub fn exit_climb(mode: &mut LocomotionMode, body: &mut impl CharacterBody) {
    if *mode == LocomotionMode::Climbing {
        debug!("left climbable surface at {}", body.position());
    }
    *mode = LocomotionMode::Grounded;
    body.set_gravity_enabled(true);
}

pub fn locomotion_step(
    time: Res<Time>,
    spatial_query: SpatialQuery,
    mut query: Query<(
        Entity,
        &ControllerConfig,
        &OrientationBasis,
        &mut LocomotionInput,
        &mut LocomotionMode,
        &mut Transform,
        &mut LinearVelocity,
        &mut ExternalImpulse,
        &mut GravityScale,
    )>,
) {
    let dt = time.delta_secs();

    for (
        entity,
        config,
        basis,
        mut input,
        mut mode,
        mut transform,
        mut velocity,
        mut impulse,
        mut gravity,
    ) in query.iter_mut()
    {
        let world = SpatialQueries::new(&spatial_query, entity);
        let mut body = AvianBody {
            transform: &mut *transform,
            velocity: &mut *velocity,
            impulse: &mut *impulse,
            gravity: &mut *gravity,
            gravity_scale: config.gravity_scale,
        };
        step(&mut mode, &mut input, basis, config, &world, &mut body, dt);
    }
}

pub fn exit_climb_on_trigger_exit(
    mut collision_events: EventReader<CollisionEnded>,
    layers: Query<&CollisionLayers>,
    mut characters: Query<(
        &ControllerConfig,
        &mut LocomotionMode,
        &mut Transform,
        &mut LinearVelocity,
        &mut ExternalImpulse,
        &mut GravityScale,
    )>,
) {
    for CollisionEnded(a, b) in collision_events.read() {
        for (character, other) in [(*a, *b), (*b, *a)] {
            let Ok((config, mut mode, mut transform, mut velocity, mut impulse, mut gravity)) =
                characters.get_mut(character)
            else {
                continue;
            };
            let Ok(other_layers) = layers.get(other) else {
                continue;
            };
            if !layers_match(other_layers.memberships, config.climbable_mask) {
                continue;
            }

            let mut body = AvianBody {
                transform: &mut *transform,
                velocity: &mut *velocity,
                impulse: &mut *impulse,
                gravity: &mut *gravity,
                gravity_scale: config.gravity_scale,
            };
            exit_climb(&mut mode, &mut body);
        }
    }
}

// The origin sits this far below the collider so the ground capsule reaches
// into the floor while the body rests on it.
const GROUND_SKIN: f32 = 0.05;

/// Components for a dynamic third person character whose position sits at
/// its feet.
#[derive(Bundle)]
pub struct CharacterControllerBundle {
    rigid_body: RigidBody,
    collider: Collider,
    layers: CollisionLayers,
    collision_events: CollisionEventsEnabled,
    locked_axes: LockedAxes,
    velocity: LinearVelocity,
    impulse: ExternalImpulse,
    gravity: GravityScale,
    config: ControllerConfig,
    keys: ControllerKeys,
    input: LocomotionInput,
    basis: OrientationBasis,
    mode: LocomotionMode,
}

impl CharacterControllerBundle {
    /// Capsule body of `radius` and total `height` standing on the entity
    /// origin.
    pub fn new(radius: f32, height: f32) -> Self {
        let segment = (height - 2.0 * radius).max(0.0);
        let collider = Collider::compound(vec![(
            Vec3::Y * (height * 0.5 + GROUND_SKIN),
            Quat::IDENTITY,
            Collider::capsule(radius, segment),
        )]);

        Self {
            rigid_body: RigidBody::Dynamic,
            collider,
            layers: CollisionLayers::new(GameLayer::Player, LayerMask::ALL),
            collision_events: CollisionEventsEnabled,
            locked_axes: LockedAxes::ROTATION_LOCKED,
            velocity: LinearVelocity::ZERO,
            impulse: ExternalImpulse::default(),
            gravity: GravityScale(1.0),
            config: ControllerConfig::default(),
            keys: ControllerKeys::default(),
            input: LocomotionInput::default(),
            basis: OrientationBasis::default(),
            mode: LocomotionMode::Grounded,
        }
    }

    pub fn with_config(mut self, config: ControllerConfig) -> Self {
        self.gravity = GravityScale(config.gravity_scale);
        self.config = config;
        self
    }

    pub fn with_keys(mut self, keys: ControllerKeys) -> Self {
        self.keys = keys;
        self
    }
}

/// Toggles the probe gizmos drawn by [`draw_probe_gizmos`].
#[derive(Resource, Default)]
pub struct ControllerDebug {
    pub draw_probes: bool,
}

/// Draws the ground capsule end spheres and the climb sphere.
pub fn draw_probe_gizmos(
    debug: Res<ControllerDebug>,
    mut gizmos: Gizmos,
    query: Query<(&Transform, &ControllerConfig, &LocomotionMode)>,
) {
    if !debug.draw_probes {
        return;
    }

    for (transform, config, mode) in &query {
        let (top, bottom) = config.ground_capsule(transform.translation);
        let ground_color = Color::srgb(1.0, 0.0, 0.0);
        gizmos.sphere(Isometry3d::from_translation(top), config.ground_check_radius, ground_color);
        gizmos.sphere(
            Isometry3d::from_translation(bottom),
            config.ground_check_radius,
            ground_color,
        );

        let climb_color = match mode {
            LocomotionMode::Grounded => Color::srgb(0.2, 0.6, 1.0),
            LocomotionMode::Climbing => Color::srgb(0.2, 1.0, 0.4),
        };
        gizmos.sphere(
            Isometry3d::from_translation(transform.translation),
            config.climb_check_radius,
            climb_color,
        );
    }
}


#[cfg(test)]
mod physics_tests {
    use std::f32::consts::FRAC_PI_4;
    use std::time::Duration;

    use bevy::ecs::system::RunSystemOnce;
    use bevy::time::TimeUpdateStrategy;

    use super::*;
    use crate::input_plugin::InputSnapshot;
    use crate::movement::grounded_velocity;

    // Headless app running avian and the locomotion systems, one fixed step
    // per update.
    fn physics_app() -> App {
        let mut app = App::new();
        app.add_plugins((
            MinimalPlugins,
            TransformPlugin,
            PhysicsPlugins::default()
                .build()
                .disable::<ColliderHierarchyPlugin>(),
            bevy::asset::AssetPlugin::default(),
            bevy::scene::ScenePlugin,
        ))
        .init_resource::<Assets<Mesh>>()
        .insert_resource(Time::<Fixed>::from_hz(PHYSICS_HZ))
        .insert_resource(TimeUpdateStrategy::ManualDuration(Duration::from_secs_f64(
            1.0 / PHYSICS_HZ,
        )))
        .configure_sets(
            FixedUpdate,
            (ControllerSet::TriggerExit, ControllerSet::Step).chain(),
        )
        .add_systems(
            FixedUpdate,
            (
                exit_climb_on_trigger_exit.in_set(ControllerSet::TriggerExit),
                locomotion_step.in_set(ControllerSet::Step),
            ),
        );
        app.finish();
        app.cleanup();
        app
    }

    fn run(app: &mut App, updates: usize) {
        for _ in 0..updates {
            app.update();
        }
    }

    // Top face at y = 0.
    fn spawn_floor(app: &mut App) {
        app.world_mut().spawn((
            RigidBody::Static,
            Collider::cuboid(40.0, 1.0, 40.0),
            CollisionLayers::new(GameLayer::Ground, LayerMask::ALL),
            Transform::from_xyz(0.0, -0.5, 0.0),
        ));
    }

    // Ground-layer wall turned 45 degrees, its near face crossing the -Z axis
    // `distance` ahead of the origin. It reaches slightly below the floor.
    fn spawn_slanted_wall(app: &mut App, distance: f32) -> Vec3 {
        let rotation = Quat::from_rotation_y(FRAC_PI_4);
        let normal = rotation * Vec3::Z;
        let half_thickness = 0.1;
        let center_z = -(distance + half_thickness / normal.z);
        app.world_mut().spawn((
            RigidBody::Static,
            Collider::cuboid(20.0, 2.0, half_thickness * 2.0),
            CollisionLayers::new(GameLayer::Ground, LayerMask::ALL),
            Transform::from_xyz(0.0, 0.9, center_z).with_rotation(rotation),
        ));
        normal
    }

    fn spawn_character(app: &mut App, position: Vec3) -> Entity {
        app.world_mut()
            .spawn((
                CharacterControllerBundle::new(0.4, 1.8),
                Friction::ZERO.with_combine_rule(CoefficientCombine::Min),
                Restitution::ZERO.with_combine_rule(CoefficientCombine::Min),
                Transform::from_translation(position),
            ))
            .id()
    }

    fn input_mut(app: &mut App, character: Entity) -> Mut<'_, LocomotionInput> {
        app.world_mut()
            .get_mut::<LocomotionInput>(character)
            .expect("character has input")
    }

    fn translation(app: &App, character: Entity) -> Vec3 {
        app.world()
            .get::<Transform>(character)
            .map(|t| t.translation)
            .expect("character has a transform")
    }

    fn velocity(app: &App, character: Entity) -> Vec3 {
        app.world()
            .get::<LinearVelocity>(character)
            .map(|v| v.0)
            .expect("character has a velocity")
    }

    fn mode_and_gravity(app: &App, character: Entity) -> (LocomotionMode, f32) {
        (
            app.world()
                .get::<LocomotionMode>(character)
                .copied()
                .expect("character has a mode"),
            app.world()
                .get::<GravityScale>(character)
                .map(|g| g.0)
                .expect("character has a gravity scale"),
        )
    }

    #[test]
    fn spatial_queries_find_wall_past_floor_at_rest_height() {
        let mut app = physics_app();
        spawn_floor(&mut app);
        let normal = spawn_slanted_wall(&mut app, 0.46);
        run(&mut app, 4);

        let velocity = app
            .world_mut()
            .run_system_once(|spatial_query: SpatialQuery| {
                let world = SpatialQueries::new(&spatial_query, Entity::PLACEHOLDER);
                let input = InputSnapshot {
                    move_axis: Vec2::Y,
                    ..default()
                };
                // The resting bundle's origin sits just inside the floor.
                grounded_velocity(
                    &world,
                    &ControllerConfig::default(),
                    &OrientationBasis::default(),
                    &input,
                    Vec3::new(0.0, -0.05, 0.0),
                )
            })
            .expect("query system runs");

        assert!((velocity.length() - 3.0).abs() < 1e-3, "{velocity}");
        assert!(velocity.dot(normal).abs() < 1e-3, "{velocity}");
        assert!(velocity.x > 0.0, "{velocity}");
    }

    #[test]
    fn resting_character_jumps_off_floor() {
        let mut app = physics_app();
        spawn_floor(&mut app);
        let character = spawn_character(&mut app, Vec3::ZERO);
        run(&mut app, 64);

        let rest = translation(&app, character);
        assert!(rest.y.abs() < 0.1, "settled at {rest}");

        input_mut(&mut app, character).press_jump();
        let mut peak = rest.y;
        for _ in 0..20 {
            app.update();
            peak = peak.max(translation(&app, character).y);
        }

        assert!(peak > rest.y + 0.5, "peak {peak} from rest {}", rest.y);
        assert!(!input_mut(&mut app, character).current_snapshot().jump_requested);
        assert_eq!(mode_and_gravity(&app, character), (LocomotionMode::Grounded, 1.0));
    }

    #[test]
    fn walking_into_slanted_wall_slides_at_full_speed() {
        let mut app = physics_app();
        spawn_floor(&mut app);
        let normal = spawn_slanted_wall(&mut app, 1.5);
        let character = spawn_character(&mut app, Vec3::ZERO);
        run(&mut app, 8);

        input_mut(&mut app, character).set_move_axis(Vec2::Y);
        run(&mut app, 64);

        let start = translation(&app, character);
        run(&mut app, 32);
        let end = translation(&app, character);
        let planar = Vec3::new(velocity(&app, character).x, 0.0, velocity(&app, character).z);

        let walk_speed = ControllerConfig::default().walk_speed;
        assert!((planar.length() - walk_speed).abs() < 0.25, "{planar}");
        assert!(planar.dot(normal).abs() < 0.3, "{planar}");
        // Half a second along the wall at full speed.
        let along_wall = (end - start).with_y(0.0).length();
        assert!(along_wall > walk_speed * 0.5 * 0.85, "moved {along_wall}");
        assert!(end.x > start.x, "slid toward +X");
    }

    #[test]
    fn climb_trigger_volume_enters_and_exits() {
        let mut app = physics_app();
        spawn_floor(&mut app);
        // Climbable sensor spanning x in [-1, 1], z in [-1.2, -0.3], y in [0, 3].
        app.world_mut().spawn((
            RigidBody::Static,
            Sensor,
            Collider::cuboid(2.0, 3.0, 0.9),
            CollisionLayers::new(GameLayer::Climbable, LayerMask::ALL),
            Transform::from_xyz(0.0, 1.5, -0.75),
        ));
        let character = spawn_character(&mut app, Vec3::new(0.0, 1.2, 0.0));
        run(&mut app, 4);

        input_mut(&mut app, character).press_jump();
        run(&mut app, 2);
        assert_eq!(mode_and_gravity(&app, character), (LocomotionMode::Climbing, 0.0));

        // Hold still on the wall, then climb sideways out of the volume.
        let held = translation(&app, character);
        run(&mut app, 16);
        assert!((translation(&app, character).y - held.y).abs() < 0.05);

        input_mut(&mut app, character).set_move_axis(Vec2::X);
        let mut exit_x = None;
        for _ in 0..120 {
            app.update();
            if mode_and_gravity(&app, character).0 == LocomotionMode::Grounded {
                exit_x = Some(translation(&app, character).x);
                break;
            }
        }

        let exit_x = exit_x.expect("left climb mode");
        assert!(exit_x > 1.0, "exited at x = {exit_x}");
        assert_eq!(mode_and_gravity(&app, character).1, 1.0);

        let before_fall = translation(&app, character).y;
        run(&mut app, 16);
        assert!(translation(&app, character).y < before_fall - 0.1);
    }
}
