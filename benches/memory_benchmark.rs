use std::alloc::{GlobalAlloc, Layout, System};
use std::sync::atomic::{AtomicUsize, Ordering};

use bevy::math::Vec2;
use bevy::prelude::*;
use mpm_engine::{Dim2, MaterialType, MpmPlugin, MpmSolver, SimulationStatus, SolverConfig};

// Memory tracking allocator
struct TrackingAllocator;

static ALLOCATED: AtomicUsize = AtomicUsize::new(0);

unsafe impl GlobalAlloc for TrackingAllocator {
    unsafe fn alloc(&self, layout: Layout) -> *mut u8 {
        let ret = unsafe { System.alloc(layout) };
        if !ret.is_null() {
            ALLOCATED.fetch_add(layout.size(), Ordering::SeqCst);
        }
        ret
    }

    unsafe fn dealloc(&self, ptr: *mut u8, layout: Layout) {
        unsafe { System.dealloc(ptr, layout) };
        ALLOCATED.fetch_sub(layout.size(), Ordering::SeqCst);
    }
}

#[global_allocator]
static GLOBAL: TrackingAllocator = TrackingAllocator;

fn get_memory_usage() -> usize {
    ALLOCATED.load(Ordering::SeqCst)
}

const RESOLUTION: u32 = 128;

fn main() {
    let initial_baseline = get_memory_usage();
    println!("Baseline memory: {} KB", initial_baseline / 1024);

    let mut app = App::new();
    app.add_plugins(MpmPlugin::<Dim2>::new(
        SolverConfig::new([RESOLUTION, RESOLUTION]),
        1.0 / 60.0,
    ));

    // Same block of water as the demo scene.
    let Some(mut solver) = app.world_mut().get_resource_mut::<MpmSolver<Dim2>>() else {
        eprintln!("solver was not created");
        return;
    };
    match solver.add_cube(
        Vec2::new(0.3, 0.4),
        Vec2::new(0.2, 0.4),
        MaterialType::Water,
        None,
        Vec2::ZERO,
        0x3366FF,
    ) {
        Ok(count) => println!("Seeded {} particles", count),
        Err(err) => {
            eprintln!("seeding failed: {err}");
            return;
        }
    }
    println!("Initial memory usage: {} KB", get_memory_usage() / 1024);

    for _ in 0..10 {
        app.update();
    }

    let active_memory = get_memory_usage();
    let status = app.world().resource::<SimulationStatus>();
    println!("Memory after {} frames: {} KB", status.frames, active_memory / 1024);
    if let Some(stats) = &status.last_stats {
        let total_cells = (RESOLUTION * RESOLUTION) as usize;
        println!(
            "Active leaf blocks: {} ({} cells of {})",
            stats.active_blocks,
            stats.active_blocks * 16 * 16,
            total_cells
        );
        println!(
            "Estimated dense grid memory: {} KB",
            (total_cells * 12) / 1024
        );
    }
    if let Some(err) = &status.last_error {
        eprintln!("last frame failed: {err}");
    }
}
