//! Hydraulic erosion scheduler.
//!
//! Runs a batch of independent droplets over a shared [`ErosionSurface`].
//! Droplet `i` picks its start region from an RNG seeded with `seed + i`,
//! so the start positions do not depend on which worker runs the droplet.
//!
//! Parallelization: droplets are spread over a bounded rayon pool. Every
//! elevation change is an atomic add on a single region, so concurrent
//! droplets may read slightly stale neighbourhoods but never torn values.
//! Results are not bit-identical across thread counts.

use crate::erosion::droplet::{DropletOutcome, WaterDroplet};
use crate::erosion::params::SimulationConfig;
use crate::erosion::surface::ErosionSurface;
use crate::erosion::ErosionStats;
use crate::error::Result;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;

/// Start region of droplet `index` in a batch seeded with `seed`.
pub fn start_region(seed: u64, index: usize, region_count: usize) -> usize {
    let mut rng = ChaCha8Rng::seed_from_u64(seed.wrapping_add(index as u64));
    rng.gen_range(0..region_count)
}

fn run_droplet<S: ErosionSurface + ?Sized>(
    surface: &S,
    index: usize,
    config: &SimulationConfig,
    seed: u64,
) -> DropletOutcome {
    let start = start_region(seed, index, surface.region_count());
    WaterDroplet::new(surface, start, index, seed).simulate(surface, config)
}

/// Run `droplets` droplets one after another on the calling thread.
pub fn simulate_sequential<S: ErosionSurface + ?Sized>(
    surface: &S,
    droplets: usize,
    config: &SimulationConfig,
    seed: u64,
) -> ErosionStats {
    let mut stats = ErosionStats::default();
    if surface.region_count() == 0 {
        return stats;
    }
    for i in 0..droplets {
        stats.record(&run_droplet(surface, i, config, seed));
    }
    stats
}

/// Run `droplets` droplets on a pool of at most `max_workers` threads.
///
/// Each droplet runs its whole lifetime on one worker.
pub fn simulate_parallel<S: ErosionSurface + ?Sized>(
    surface: &S,
    droplets: usize,
    config: &SimulationConfig,
    seed: u64,
    max_workers: usize,
) -> Result<ErosionStats> {
    if surface.region_count() == 0 {
        return Ok(ErosionStats::default());
    }

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(max_workers.max(1))
        .thread_name(|i| format!("droplet-worker-{}", i))
        .build()?;

    let stats = pool.install(|| {
        (0..droplets)
            .into_par_iter()
            .map(|i| run_droplet(surface, i, config, seed))
            .fold(ErosionStats::default, |mut stats, outcome| {
                stats.record(&outcome);
                stats
            })
            .reduce(ErosionStats::default, ErosionStats::merge)
    });

    Ok(stats)
}
