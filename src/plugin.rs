use std::marker::PhantomData;

use bevy::log::error;
use bevy::prelude::*;

use crate::config::SolverConfig;
use crate::core::{MpmSolver, StepStats};
use crate::error::MpmError;
use crate::math::{Dimension, Real};

/// Inserts an [`MpmSolver`] resource and advances it by a fixed `frame_dt`
/// every `Update`.
pub struct MpmPlugin<D: Dimension> {
    pub config: SolverConfig,
    pub frame_dt: Real,
    _dimension: PhantomData<D>,
}

impl<D: Dimension> MpmPlugin<D> {
    pub fn new(config: SolverConfig, frame_dt: Real) -> Self {
        Self {
            config,
            frame_dt,
            _dimension: PhantomData,
        }
    }
}

#[derive(Resource, Clone, Copy, Debug)]
pub struct FrameSettings {
    pub frame_dt: Real,
    pub paused: bool,
}

/// Outcome of the most recent frame.
#[derive(Resource, Clone, Debug, Default)]
pub struct SimulationStatus {
    pub frames: u64,
    pub last_stats: Option<StepStats>,
    pub last_error: Option<MpmError>,
}

impl<D: Dimension> Plugin for MpmPlugin<D> {
    fn build(&self, app: &mut App) {
        let mut status = SimulationStatus::default();
        match MpmSolver::<D>::new(self.config.clone()) {
            Ok(solver) => {
                app.insert_resource(solver);
            }
            Err(err) => {
                error!("failed to create MPM solver: {err}");
                status.last_error = Some(err);
            }
        }
        app.insert_resource(FrameSettings {
            frame_dt: self.frame_dt,
            paused: false,
        })
        .insert_resource(status)
        .add_systems(Update, step_simulation::<D>);
    }
}

pub fn step_simulation<D: Dimension>(
    solver: Option<ResMut<MpmSolver<D>>>,
    settings: Res<FrameSettings>,
    mut status: ResMut<SimulationStatus>,
) {
    let Some(mut solver) = solver else {
        return;
    };
    if settings.paused {
        return;
    }
    match solver.step(settings.frame_dt) {
        Ok(stats) => {
            status.frames += 1;
            status.last_stats = Some(stats);
            status.last_error = None;
        }
        Err(err) => {
            error!("MPM frame failed: {err}");
            status.last_error = Some(err);
        }
    }
}
