/// Simple custom benchmarking without criterion
/// Avoids Windows MSVC linker issues with rayon/criterion
use std::time::Instant;

use bevy::math::Vec2;
use mpm_engine::bukkit::BukkitSystem;
use mpm_engine::core::{ParticleSet, inv_d};
use mpm_engine::geometry::SpGrid;
use mpm_engine::solver::{compute_affine_terms, particle_to_grid};
use mpm_engine::{Dim2, MaterialType, MpmSolver, Particle, SolverConfig};

const RESOLUTION: u32 = 256;

fn time_it<F: FnMut()>(name: &str, iterations: usize, mut f: F) {
    // Warmup
    for _ in 0..5 {
        f();
    }

    let start = Instant::now();
    for _ in 0..iterations {
        f();
    }
    let elapsed = start.elapsed();

    let avg_ms = elapsed.as_secs_f64() * 1000.0 / iterations as f64;
    println!("{}: {:.3}ms avg ({} iterations)", name, avg_ms, iterations);
}

/// Square patch of water two particles per cell wide, moving down and right.
fn create_test_particles(config: &SolverConfig, count: usize) -> ParticleSet<Dim2> {
    let dx = config.dx();
    let side = (count as f32).sqrt().ceil() as usize;
    let mut set = ParticleSet::new(count);
    for i in 0..count {
        let position = Vec2::new(
            0.2 + (i % side) as f32 * 0.5 * dx,
            0.2 + (i / side) as f32 * 0.5 * dx,
        );
        let particle = Particle::new(
            position,
            MaterialType::Water,
            config.particle_mass(),
            config.particle_volume(),
        )
        .with_velocity(Vec2::new(1.0, -2.0));
        if set.push(particle).is_err() {
            break;
        }
    }
    set
}

fn main() {
    println!("\n=== MPM Benchmarks ===\n");
    let config = SolverConfig::new([RESOLUTION, RESOLUTION]);
    let inv_dx = config.inv_dx();

    println!("--- Particle Bucketing ---");
    for &count in &[1000, 5000, 10000, 20000] {
        let mut set = create_test_particles(&config, count);
        let mut grid = SpGrid::<Dim2>::new();
        let mut bukkits = BukkitSystem::new();

        time_it(&format!("rebuild_bukkits (n={})", count), 20, || {
            grid.deactivate_all();
            set.rebuild_transfer_cache(inv_dx);
            let (particles, cache) = set.particles_and_cache();
            if let Err(err) = bukkits.rebuild(&mut grid, particles, cache) {
                eprintln!("bucketing failed: {err}");
            }
        });
    }

    println!("\n--- Transfers ---");
    for &count in &[1000, 5000, 10000, 20000] {
        let mut set = create_test_particles(&config, count);
        let mut grid = SpGrid::<Dim2>::new();
        let mut bukkits = BukkitSystem::new();
        let solver = match MpmSolver::<Dim2>::new(config.clone()) {
            Ok(solver) => solver,
            Err(err) => {
                eprintln!("solver setup failed: {err}");
                return;
            }
        };
        let dt = config.max_dt();

        time_it(&format!("constitutive+p2g (n={})", count), 20, || {
            grid.deactivate_all();
            set.rebuild_transfer_cache(inv_dx);
            {
                let (particles, cache) = set.particles_and_cache();
                if let Err(err) = bukkits.rebuild(&mut grid, particles, cache) {
                    eprintln!("bucketing failed: {err}");
                    return;
                }
            }
            {
                let (particles, affine) = set.particles_mut_and_affine();
                compute_affine_terms(
                    particles,
                    affine,
                    bukkits.batches(),
                    solver.materials(),
                    dt,
                    inv_d(config.dx()),
                );
            }
            let (particles, cache) = set.particles_and_cache();
            particle_to_grid(&mut grid, particles, cache, set.affine_terms(), config.dx());
        });
    }

    println!("\n--- Full Frames ---");
    for &count in &[1000, 5000, 10000] {
        let mut solver = match MpmSolver::<Dim2>::new(config.clone()) {
            Ok(solver) => solver,
            Err(err) => {
                eprintln!("solver setup failed: {err}");
                return;
            }
        };
        let set = create_test_particles(&config, count);
        for particle in set.iter() {
            if solver
                .add_particle(particle.position, particle.velocity, particle.material_type)
                .is_err()
            {
                break;
            }
        }

        time_it(&format!("step 1/240s (n={})", count), 10, || {
            if let Err(err) = solver.step(1.0 / 240.0) {
                eprintln!("frame failed: {err}");
            }
        });
    }

    println!("\n=== Benchmark Complete ===\n");
}
