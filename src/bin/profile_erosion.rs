//! Profiling tool to identify performance bottlenecks

use std::time::{Duration, Instant};

use geodesic_erosion::erosion::{PackedTerrain, DEFAULT_MAX_WORKERS};
use geodesic_erosion::{ExecutionStrategy, NoiseConfig, SimulationConfig, Terrain, Topology};

fn percent(part: Duration, total: Duration) -> f64 {
    100.0 * part.as_secs_f64() / total.as_secs_f64().max(f64::EPSILON)
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let topology = Topology::Icosahedron;
    let depth = 6;
    let droplets = 20_000;
    let seed = 1337u64;
    let config = SimulationConfig::default();

    println!("=== Performance Profiling ===");
    println!("Topology: {} depth {}, {} droplets", topology, depth, droplets);
    println!();

    // Profile mesh and region graph construction
    let start = Instant::now();
    let mut terrain = Terrain::build(topology, depth);
    let build_time = start.elapsed();
    println!("Mesh + regions: {:?} ({} regions)", build_time, terrain.region_count());

    // Profile noise seeding
    let noise = NoiseConfig::default();
    let start = Instant::now();
    terrain.seed_elevation(&noise)?;
    let noise_time = start.elapsed();
    println!("Elevation seeding: {:?}", noise_time);
    let seeded = terrain.regions().elevations();

    // Profile weight tables (normally filled lazily during the first batch)
    let start = Instant::now();
    terrain.graph().warm_weights();
    let weight_time = start.elapsed();
    println!("Erosion weights (radius {}): {:?}", config.erosion_radius, weight_time);

    // Profile packing
    let start = Instant::now();
    let packed = PackedTerrain::pack(terrain.regions())?;
    let pack_time = start.elapsed();
    println!("Packing: {:?} ({} bytes)", pack_time, packed.as_bytes().len());

    println!("\nErosion strategies:");
    let strategies = [
        ExecutionStrategy::Sequential,
        ExecutionStrategy::Parallel { max_workers: DEFAULT_MAX_WORKERS },
        ExecutionStrategy::Packed,
    ];
    let mut erosion_times = Vec::new();
    for strategy in strategies {
        terrain.regions().set_elevations(&seeded);
        let start = Instant::now();
        let stats = terrain.simulate_erosion(droplets, &config, seed, strategy)?;
        let elapsed = start.elapsed();
        println!("  {:<24} {:>10.2?}  steps {:>8}  eroded {:.3}  deposited {:.3}",
                 strategy.to_string(), elapsed, stats.steps_taken, stats.total_eroded, stats.total_deposited);
        erosion_times.push(elapsed);
    }

    // Summary uses the parallel run, the default strategy
    let erosion_time = erosion_times[1];
    let total = build_time + noise_time + weight_time + erosion_time;
    println!("\n=== Summary ===");
    println!("Mesh + regions:   {:>8.2}% ({:?})", percent(build_time, total), build_time);
    println!("Noise:            {:>8.2}% ({:?})", percent(noise_time, total), noise_time);
    println!("Weights:          {:>8.2}% ({:?})", percent(weight_time, total), weight_time);
    println!("Erosion:          {:>8.2}% ({:?})", percent(erosion_time, total), erosion_time);
    println!("─────────────────────────────────");
    println!("TOTAL:            {:>8}  {:?}", "100%", total);

    Ok(())
}
