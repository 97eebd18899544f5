use bevy::math::Vec2;
use bevy::prelude::*;
use mpm_engine::{
    Dim2, FrameSettings, MaterialType, MpmError, MpmPlugin, MpmSolver, SimulationStatus,
    SolverConfig,
};

fn app(config: SolverConfig) -> App {
    let mut app = App::new();
    app.add_plugins(MpmPlugin::<Dim2>::new(config, 1.0 / 120.0));
    app
}

#[test]
fn plugin_steps_once_per_update() {
    let mut app = app(SolverConfig::new([32, 32]));
    app.world_mut()
        .resource_mut::<MpmSolver<Dim2>>()
        .add_particle(Vec2::new(0.5, 0.5), Vec2::ZERO, MaterialType::Water)
        .unwrap();

    app.update();
    app.update();

    let status = app.world().resource::<SimulationStatus>();
    assert_eq!(status.frames, 2);
    assert!(status.last_error.is_none());
    assert_eq!(status.last_stats.map(|s| s.particle_count), Some(1));
    let solver = app.world().resource::<MpmSolver<Dim2>>();
    assert!(solver.particles()[0].velocity.y < 0.0);
}

#[test]
fn paused_simulation_does_not_advance() {
    let mut app = app(SolverConfig::new([32, 32]));
    app.world_mut().resource_mut::<FrameSettings>().paused = true;
    app.update();
    assert_eq!(app.world().resource::<SimulationStatus>().frames, 0);
}

#[test]
fn invalid_config_is_reported() {
    let mut app = app(SolverConfig::new([32, 32]).with_max_particles(0));
    assert!(app.world().get_resource::<MpmSolver<Dim2>>().is_none());
    app.update();
    let status = app.world().resource::<SimulationStatus>();
    assert_eq!(status.frames, 0);
    assert!(matches!(status.last_error, Some(MpmError::Configuration(_))));
}
