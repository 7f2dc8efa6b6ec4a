//! Droplet-based hydraulic erosion over a region graph
//!
//! - **graph**: region arena plus cached Gaussian erosion weights
//! - **droplet**: the water droplet agent and its per-step rules
//! - **hydraulic**: sequential and thread-pool schedulers
//! - **packed**: flat record layout for batch backends

pub mod droplet;
pub mod graph;
pub mod hydraulic;
pub mod packed;
pub mod params;
pub mod surface;

pub use droplet::{DropletOutcome, DropletState, WaterDroplet};
pub use graph::ErosionGraph;
pub use packed::{PackedTerrain, RegionRecord};
pub use params::{ErosionPreset, SimulationConfig, DEFAULT_MAX_WORKERS};
pub use surface::ErosionSurface;

use crate::error::Result;
use serde::{Deserialize, Serialize};

/// How a batch of droplets is scheduled.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum ExecutionStrategy {
    /// One droplet after another on the calling thread
    Sequential,
    /// Droplets spread over a bounded worker pool
    Parallel { max_workers: usize },
    /// Flat records, single-region erosion, one batch on a pool of
    /// [`DEFAULT_MAX_WORKERS`] threads
    Packed,
}

impl Default for ExecutionStrategy {
    fn default() -> Self {
        ExecutionStrategy::Parallel { max_workers: DEFAULT_MAX_WORKERS }
    }
}

impl std::fmt::Display for ExecutionStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExecutionStrategy::Sequential => write!(f, "sequential"),
            ExecutionStrategy::Parallel { max_workers } => write!(f, "parallel ({} workers)", max_workers),
            ExecutionStrategy::Packed => write!(f, "packed"),
        }
    }
}

/// Statistics from erosion simulation
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ErosionStats {
    /// Droplets simulated
    pub droplets: usize,
    /// Total number of droplet steps taken
    pub steps_taken: u64,
    /// Total material eroded (in height units)
    pub total_eroded: f64,
    /// Total material deposited
    pub total_deposited: f64,
    /// Largest single erosion event
    pub max_erosion: f32,
    /// Largest single deposition event
    pub max_deposition: f32,
    /// Droplets stopped by a non-finite velocity
    pub invalid_droplets: usize,
    /// Droplets that fell below the minimum volume
    pub evaporated_droplets: usize,
}

impl ErosionStats {
    pub fn record(&mut self, outcome: &DropletOutcome) {
        self.droplets += 1;
        self.steps_taken += outcome.steps as u64;
        self.total_eroded += outcome.eroded;
        self.total_deposited += outcome.deposited;
        self.max_erosion = self.max_erosion.max(outcome.max_erosion);
        self.max_deposition = self.max_deposition.max(outcome.max_deposition);
        if outcome.died_invalid {
            self.invalid_droplets += 1;
        }
        if outcome.evaporated {
            self.evaporated_droplets += 1;
        }
    }

    pub fn merge(mut a: Self, b: Self) -> Self {
        a.droplets += b.droplets;
        a.steps_taken += b.steps_taken;
        a.total_eroded += b.total_eroded;
        a.total_deposited += b.total_deposited;
        a.max_erosion = a.max_erosion.max(b.max_erosion);
        a.max_deposition = a.max_deposition.max(b.max_deposition);
        a.invalid_droplets += b.invalid_droplets;
        a.evaporated_droplets += b.evaporated_droplets;
        a
    }

    /// Net change in total elevation (deposited minus eroded).
    pub fn net_change(&self) -> f64 {
        self.total_deposited - self.total_eroded
    }

    pub fn print_summary(&self) {
        println!("Erosion summary:");
        println!("  Droplets: {} ({} steps)", self.droplets, self.steps_taken);
        println!("  Eroded: {:.4}  Deposited: {:.4}  Net: {:+.4}",
                 self.total_eroded, self.total_deposited, self.net_change());
        println!("  Max erosion: {:.5}  Max deposition: {:.5}", self.max_erosion, self.max_deposition);
        if self.invalid_droplets > 0 {
            println!("  WARNING: {} droplets stopped on non-finite velocity", self.invalid_droplets);
        }
        if self.evaporated_droplets > 0 {
            println!("  Evaporated early: {}", self.evaporated_droplets);
        }
    }
}

/// Run `droplets` droplets over `graph` with the chosen strategy.
///
/// The packed strategy runs on a copy of the elevations and writes the
/// result back into the graph when the batch completes.
pub fn simulate_erosion(
    graph: &ErosionGraph,
    droplets: usize,
    config: &SimulationConfig,
    seed: u64,
    strategy: ExecutionStrategy,
) -> Result<ErosionStats> {
    match strategy {
        ExecutionStrategy::Sequential => Ok(hydraulic::simulate_sequential(graph, droplets, config, seed)),
        ExecutionStrategy::Parallel { max_workers } => {
            hydraulic::simulate_parallel(graph, droplets, config, seed, max_workers)
        }
        ExecutionStrategy::Packed => {
            let packed = PackedTerrain::pack(graph.regions())?;
            let starts = packed.random_starts(droplets, seed);
            let (elevations, stats) = packed.simulate(&starts, config, seed, DEFAULT_MAX_WORKERS)?;
            graph.regions().set_elevations(&elevations);
            Ok(stats)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::elevation::seed_elevation;
    use crate::fractal::NoiseConfig;
    use crate::mesh::{Mesh, Topology};
    use crate::region::RegionGraph;

    fn noisy(topology: Topology, depth: u32, radius: usize) -> ErosionGraph {
        let regions = RegionGraph::from_mesh(topology, &Mesh::build(topology, depth));
        seed_elevation(&regions, &NoiseConfig::default()).unwrap();
        ErosionGraph::new(regions, radius)
    }

    #[test]
    fn test_merge_sums_and_maxes() {
        let a = ErosionStats {
            droplets: 2,
            steps_taken: 10,
            total_eroded: 1.0,
            max_erosion: 0.5,
            invalid_droplets: 1,
            ..Default::default()
        };
        let b = ErosionStats {
            droplets: 3,
            steps_taken: 5,
            total_deposited: 2.0,
            max_erosion: 0.2,
            max_deposition: 0.7,
            evaporated_droplets: 2,
            ..Default::default()
        };
        let m = ErosionStats::merge(a, b);
        assert_eq!(m.droplets, 5);
        assert_eq!(m.steps_taken, 15);
        assert_eq!(m.max_erosion, 0.5);
        assert_eq!(m.max_deposition, 0.7);
        assert_eq!(m.invalid_droplets, 1);
        assert_eq!(m.evaporated_droplets, 2);
        assert!((m.net_change() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_strategy_serde() {
        let json = serde_json::to_string(&ExecutionStrategy::Parallel { max_workers: 4 }).unwrap();
        assert_eq!(json, r#"{"kind":"parallel","max_workers":4}"#);
        let back: ExecutionStrategy = serde_json::from_str(r#"{"kind":"packed"}"#).unwrap();
        assert_eq!(back, ExecutionStrategy::Packed);
    }

    #[test]
    fn test_every_strategy_erodes() {
        let strategies = [
            ExecutionStrategy::Sequential,
            ExecutionStrategy::Parallel { max_workers: 3 },
            ExecutionStrategy::Packed,
        ];
        for strategy in strategies {
            let graph = noisy(Topology::Icosahedron, 3, 1);
            let before = graph.regions().elevations();
            let stats = simulate_erosion(&graph, 150, &SimulationConfig::default(), 5, strategy).unwrap();
            assert_eq!(stats.droplets, 150, "{}", strategy);
            assert!(stats.total_eroded > 0.0, "{}", strategy);
            assert_ne!(before, graph.regions().elevations(), "{}", strategy);
        }
    }

    #[test]
    fn test_packed_writes_back_mass_balance() {
        let graph = noisy(Topology::Hex, 4, 0);
        let before: f64 = graph.regions().elevations().iter().map(|&h| h as f64).sum();
        let stats = simulate_erosion(&graph, 200, &SimulationConfig::default(), 2, ExecutionStrategy::Packed).unwrap();
        let after: f64 = graph.regions().elevations().iter().map(|&h| h as f64).sum();
        assert!(((after - before) - stats.net_change()).abs() < 1e-2);
    }
}
