use avian3d::prelude::*;
use bevy::{
    diagnostic::{EntityCountDiagnosticsPlugin, FrameTimeDiagnosticsPlugin},
    prelude::*,
};
use bevy_framepace::{FramepacePlugin, FramepaceSettings, Limiter};
use iyes_perf_ui::prelude::*;

/// Frame pacing plus on-screen frame and physics diagnostics for a host app.
pub struct FrameDiagnosticsPlugin {
    /// Frame rate cap. `None` paces to the display refresh rate.
    pub frame_limit: Option<f64>,
}

impl Default for FrameDiagnosticsPlugin {
    fn default() -> Self {
        Self {
            frame_limit: Some(144.0),
        }
    }
}

impl Plugin for FrameDiagnosticsPlugin {
    fn build(&self, app: &mut App) {
        let limiter = match self.frame_limit {
            Some(fps) => Limiter::from_framerate(fps),
            None => Limiter::Auto,
        };

        app.add_plugins((
            FramepacePlugin,
            FrameTimeDiagnosticsPlugin::default(),
            EntityCountDiagnosticsPlugin,
            PerfUiPlugin,
            PhysicsDiagnosticsPlugin,
            PhysicsDiagnosticsUiPlugin,
        ))
        .insert_resource(FramepaceSettings { limiter })
        .add_systems(Startup, spawn_perf_ui);
    }
}

fn spawn_perf_ui(mut commands: Commands) {
    commands.spawn(PerfUiDefaultEntries::default());
}
