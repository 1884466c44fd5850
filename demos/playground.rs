//! A third person character on a dynamic rigid body.
//!
//! This showcases the following:
//!
//! - Camera-relative walking and sprinting (WASD / left stick, Shift / stick click)
//! - Jumping (Space / south button)
//! - Sliding along walls instead of stopping dead
//! - Climbing a tagged wall: jump at it while airborne, leave the volume to drop off
//!
//! Press F1 to toggle the probe gizmos. Click to capture the mouse, Escape to release it.

use std::f32::consts::{FRAC_PI_2, TAU};

use avian3d::prelude::*;
use bevy::{input::mouse::MouseMotion, math::Vec3Swizzles, prelude::*, window::CursorGrabMode};

use third_person::*;

fn main() {
    App::new()
        .add_plugins((
            DefaultPlugins,
            PhysicsPlugins::default(),
            ThirdPersonControllerPlugin,
            FrameDiagnosticsPlugin::default(),
        ))
        .add_systems(Startup, setup)
        .add_systems(
            Update,
            (
                manage_cursor,
                toggle_gizmos,
                orbit_camera,
                display_text,
            ),
        )
        .run();
}

#[derive(Component)]
struct Orbit {
    target: Entity,
    yaw: f32,
    pitch: f32,
    distance: f32,
    sensitivity: f32,
}

#[derive(Component)]
struct StatusText;

fn setup(
    mut commands: Commands,
    mut meshes: ResMut<Assets<Mesh>>,
    mut materials: ResMut<Assets<StandardMaterial>>,
) {
    commands.spawn((
        DirectionalLight {
            illuminance: light_consts::lux::FULL_DAYLIGHT,
            shadows_enabled: true,
            ..default()
        },
        Transform::from_xyz(4.0, 7.0, 5.0).looking_at(Vec3::ZERO, Vec3::Y),
    ));

    let player = commands
        .spawn((
            CharacterControllerBundle::new(0.4, 1.8),
            Friction::ZERO.with_combine_rule(CoefficientCombine::Min),
            Restitution::ZERO.with_combine_rule(CoefficientCombine::Min),
            Transform::from_xyz(0.0, 0.5, 0.0),
            Visibility::default(),
        ))
        .with_children(|parent| {
            // The body's origin sits at its feet
            parent.spawn((
                Mesh3d(meshes.add(Capsule3d::new(0.4, 1.0))),
                MeshMaterial3d(materials.add(Color::srgb(0.9, 0.4, 0.2))),
                Transform::from_xyz(0.0, 0.95, 0.0),
            ));
        })
        .id();

    commands.spawn((
        Camera3d::default(),
        ControllerCamera,
        Orbit {
            target: player,
            yaw: 0.0,
            pitch: -0.3,
            distance: 6.0,
            sensitivity: 0.002,
        },
        Transform::from_xyz(0.0, 3.0, 6.0).looking_at(Vec3::ZERO, Vec3::Y),
    ));

    let ground = CollisionLayers::new(GameLayer::Ground, LayerMask::ALL);

    // floor
    commands.spawn((
        RigidBody::Static,
        Collider::cuboid(100.0, 1.0, 100.0),
        ground,
        Mesh3d(meshes.add(Cuboid::new(100.0, 1.0, 100.0))),
        MeshMaterial3d(materials.add(Color::srgb(0.8, 0.7, 0.6))),
        Transform::from_xyz(0.0, -0.5, 0.0),
    ));

    // A slanted wall to slide along
    commands.spawn((
        RigidBody::Static,
        Collider::cuboid(8.0, 2.0, 0.5),
        ground,
        Mesh3d(meshes.add(Cuboid::new(8.0, 2.0, 0.5))),
        MeshMaterial3d(materials.add(Color::srgb(0.5, 0.5, 0.55))),
        Transform::from_xyz(-4.0, 1.0, -6.0).with_rotation(Quat::from_rotation_y(TAU / 10.0)),
    ));

    // A tower whose front face is climbable
    commands.spawn((
        RigidBody::Static,
        Collider::cuboid(3.0, 8.0, 3.0),
        CollisionLayers::new(GameLayer::Default, LayerMask::ALL),
        Mesh3d(meshes.add(Cuboid::new(3.0, 8.0, 3.0))),
        MeshMaterial3d(materials.add(Color::srgb(0.35, 0.45, 0.35))),
        Transform::from_xyz(6.0, 4.0, -6.0),
    ));
    commands.spawn((
        Sensor,
        Collider::cuboid(3.0, 8.5, 0.8),
        CollisionLayers::new(GameLayer::Climbable, LayerMask::ALL),
        Transform::from_xyz(6.0, 4.25, -4.3),
    ));

    commands.spawn((
        PointLight {
            intensity: 2_000_000.0,
            range: 50.0,
            shadows_enabled: true,
            ..default()
        },
        Transform::from_xyz(0.0, 15.0, 0.0),
    ));

    commands.spawn((
        Text::default(),
        StatusText,
        Node {
            position_type: PositionType::Absolute,
            bottom: Val::Px(12.0),
            left: Val::Px(12.0),
            ..default()
        },
    ));
}

fn orbit_camera(
    mut mouse_events: EventReader<MouseMotion>,
    windows: Query<&Window>,
    targets: Query<&Transform, Without<Orbit>>,
    mut cameras: Query<(&mut Orbit, &mut Transform)>,
) {
    let captured = windows
        .iter()
        .any(|window| window.cursor_options.grab_mode == CursorGrabMode::Locked);
    let mut delta = Vec2::ZERO;
    for event in mouse_events.read() {
        delta += event.delta;
    }

    for (mut orbit, mut transform) in &mut cameras {
        if captured {
            orbit.yaw -= delta.x * orbit.sensitivity;
            orbit.pitch = (orbit.pitch - delta.y * orbit.sensitivity)
                .clamp(-FRAC_PI_2 + 0.05, FRAC_PI_2 - 0.05);
        }
        let Ok(target) = targets.get(orbit.target) else {
            continue;
        };

        let rotation = Quat::from_euler(EulerRot::YXZ, orbit.yaw, orbit.pitch, 0.0);
        let focus = target.translation + Vec3::Y * 1.2;
        transform.translation = focus - rotation * Vec3::NEG_Z * orbit.distance;
        transform.look_at(focus, Vec3::Y);
    }
}

fn manage_cursor(
    btn: Res<ButtonInput<MouseButton>>,
    key: Res<ButtonInput<KeyCode>>,
    mut window_query: Query<&mut Window>,
) {
    for mut window in &mut window_query {
        if btn.just_pressed(MouseButton::Left) {
            window.cursor_options.grab_mode = CursorGrabMode::Locked;
            window.cursor_options.visible = false;
        }
        if key.just_pressed(KeyCode::Escape) {
            window.cursor_options.grab_mode = CursorGrabMode::None;
            window.cursor_options.visible = true;
        }
    }
}

fn toggle_gizmos(key: Res<ButtonInput<KeyCode>>, mut debug: ResMut<ControllerDebug>) {
    if key.just_pressed(KeyCode::F1) {
        debug.draw_probes = !debug.draw_probes;
    }
}

fn display_text(
    controller_query: Query<(&Transform, &LinearVelocity, &LocomotionMode)>,
    mut text_query: Query<&mut Text, With<StatusText>>,
) {
    for (transform, velocity, mode) in &controller_query {
        for mut text in &mut text_query {
            text.0 = format!(
                "mode: {:?}\nvel: {:.2}, {:.2}, {:.2}\npos: {:.2}, {:.2}, {:.2}\nspd: {:.2}",
                mode,
                velocity.0.x,
                velocity.0.y,
                velocity.0.z,
                transform.translation.x,
                transform.translation.y,
                transform.translation.z,
                velocity.0.xz().length()
            );
        }
    }
}
