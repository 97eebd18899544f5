//! Headless scene: a snow block and a sand block dropped onto an inclined
//! plane, stepped through the Bevy plugin. Prints one line per frame.

use bevy::log::LogPlugin;
use bevy::math::Vec2;
use bevy::prelude::*;
use mpm_engine::{
    Dim2, MaterialType, MpmPlugin, MpmSolver, SimulationStatus, SolverConfig, SurfaceKind,
};

const FRAMES: usize = 120;

fn setup(solver: &mut MpmSolver<Dim2>) -> mpm_engine::Result<()> {
    let snow = solver.add_cube(
        Vec2::new(0.15, 0.55),
        Vec2::new(0.2, 0.2),
        MaterialType::Snow,
        None,
        Vec2::new(0.5, 0.0),
        0xEEEEFF,
    )?;
    let sand = solver.add_cube(
        Vec2::new(0.6, 0.6),
        Vec2::new(0.15, 0.25),
        MaterialType::Sand,
        None,
        Vec2::ZERO,
        0xD2B48C,
    )?;
    solver.add_surface_collider(
        Vec2::new(0.5, 0.2),
        Vec2::new(0.3, 1.0),
        SurfaceKind::Slip,
        0.3,
    )?;
    info!("seeded {snow} snow and {sand} sand particles");
    Ok(())
}

fn main() {
    let config = SolverConfig::new([128, 128]).with_seed(7);
    let mut app = App::new();
    app.add_plugins(LogPlugin::default())
        .add_plugins(MpmPlugin::<Dim2>::new(config, 1.0 / 60.0));

    let Some(mut solver) = app.world_mut().get_resource_mut::<MpmSolver<Dim2>>() else {
        error!("solver was not created");
        return;
    };
    if let Err(err) = setup(&mut solver) {
        error!("scene setup failed: {err}");
        return;
    }

    for frame in 0..FRAMES {
        app.update();
        let status = app.world().resource::<SimulationStatus>();
        if let Some(err) = &status.last_error {
            error!("frame {frame}: {err}");
            break;
        }
        if let Some(stats) = &status.last_stats {
            println!(
                "frame {:3}: {} particles, {} substeps, {} leaves",
                frame, stats.particle_count, stats.substeps, stats.active_blocks
            );
        }
    }
}
