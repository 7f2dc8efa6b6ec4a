//! Flat region records for batch/accelerator execution.
//!
//! The region graph is serialized into fixed-size POD records (position,
//! elevation, up to six neighbour indices padded with the region's own
//! index) plus an array of pre-drawn start regions. This is the layout a
//! compute backend uploads as-is.
//!
//! [`PackedTerrain::simulate`] runs the batch on the CPU over exactly that
//! layout, reusing the droplet step through [`ErosionSurface`]. Erosion is
//! applied to the current region only instead of being spread over the
//! Gaussian neighbourhood.

use bytemuck::{Pod, Zeroable};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;

use crate::erosion::droplet::WaterDroplet;
use crate::erosion::params::SimulationConfig;
use crate::erosion::surface::ErosionSurface;
use crate::erosion::ErosionStats;
use crate::error::{Result, TerrainError};
use crate::math::Vec3;
use crate::mesh::Topology;
use crate::region::{AtomicF32, RegionGraph};

/// Neighbour slots per record
pub const MAX_NEIGHBORS: usize = 6;

/// One region as seen by a batch backend
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, Pod, Zeroable)]
pub struct RegionRecord {
    pub position: [f32; 3],
    pub elevation: f32,
    pub num_adjacent: u32,
    pub adjacent: [u32; MAX_NEIGHBORS],
}

/// A region graph flattened into [`RegionRecord`]s.
pub struct PackedTerrain {
    topology: Topology,
    records: Vec<RegionRecord>,
}

impl PackedTerrain {
    pub fn pack(regions: &RegionGraph) -> Result<Self> {
        let records = regions
            .regions()
            .iter()
            .enumerate()
            .map(|(i, region)| {
                let adjacent_regions = region.adjacent_regions();
                if adjacent_regions.len() > MAX_NEIGHBORS {
                    return Err(TerrainError::UnsupportedDegree {
                        region: i,
                        degree: adjacent_regions.len(),
                    });
                }
                let mut adjacent = [i as u32; MAX_NEIGHBORS];
                adjacent[..adjacent_regions.len()].copy_from_slice(adjacent_regions);
                let c = region.center();
                Ok(RegionRecord {
                    position: [c.x, c.y, c.z],
                    elevation: region.elevation(),
                    num_adjacent: adjacent_regions.len() as u32,
                    adjacent,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            topology: regions.topology(),
            records,
        })
    }

    pub fn records(&self) -> &[RegionRecord] {
        &self.records
    }

    /// Raw bytes of the record buffer, ready for upload.
    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.records)
    }

    /// Start regions for a whole batch, drawn up front from one generator.
    pub fn random_starts(&self, count: usize, seed: u64) -> Vec<u32> {
        if self.records.is_empty() {
            return Vec::new();
        }
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        (0..count)
            .map(|_| rng.gen_range(0..self.records.len() as u32))
            .collect()
    }

    /// Run one droplet per entry of `starts` on at most `max_workers`
    /// threads and return the new elevations.
    pub fn simulate(
        &self,
        starts: &[u32],
        config: &SimulationConfig,
        seed: u64,
        max_workers: usize,
    ) -> Result<(Vec<f32>, ErosionStats)> {
        let surface = PackedSurface::new(self);

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(max_workers.max(1))
            .thread_name(|i| format!("packed-worker-{}", i))
            .build()?;

        let stats = pool.install(|| {
            starts
                .par_iter()
                .enumerate()
                .map(|(i, &start)| WaterDroplet::new(&surface, start as usize, i, seed).simulate(&surface, config))
                .fold(ErosionStats::default, |mut stats, outcome| {
                    stats.record(&outcome);
                    stats
                })
                .reduce(ErosionStats::default, ErosionStats::merge)
        });

        let elevations = surface.elevations.iter().map(AtomicF32::load).collect();
        Ok((elevations, stats))
    }
}

/// Mutable view over the packed records used while a batch runs.
struct PackedSurface<'a> {
    packed: &'a PackedTerrain,
    elevations: Vec<AtomicF32>,
    self_weights: Vec<(u32, f32)>,
}

impl<'a> PackedSurface<'a> {
    fn new(packed: &'a PackedTerrain) -> Self {
        Self {
            packed,
            elevations: packed.records.iter().map(|r| AtomicF32::new(r.elevation)).collect(),
            self_weights: (0..packed.records.len() as u32).map(|i| (i, 1.0)).collect(),
        }
    }
}

impl ErosionSurface for PackedSurface<'_> {
    fn region_count(&self) -> usize {
        self.packed.records.len()
    }

    fn center(&self, region: usize) -> Vec3 {
        let [x, y, z] = self.packed.records[region].position;
        Vec3::new(x, y, z)
    }

    fn normal(&self, region: usize) -> Vec3 {
        self.packed.topology.surface_normal(self.center(region))
    }

    fn neighbors(&self, region: usize) -> &[u32] {
        let record = &self.packed.records[region];
        &record.adjacent[..record.num_adjacent as usize]
    }

    fn elevation(&self, region: usize) -> f32 {
        self.elevations[region].load()
    }

    fn add_elevation(&self, region: usize, delta: f32) {
        self.elevations[region].fetch_add(delta);
    }

    fn erosion_weights(&self, region: usize) -> &[(u32, f32)] {
        std::slice::from_ref(&self.self_weights[region])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::elevation::seed_elevation;
    use crate::erosion::graph::ErosionGraph;
    use crate::erosion::params::DEFAULT_MAX_WORKERS;
    use crate::fractal::NoiseConfig;
    use crate::math::Vec3;
    use crate::mesh::{Mesh, Triangle};

    fn seeded(topology: Topology, depth: u32) -> RegionGraph {
        let regions = RegionGraph::from_mesh(topology, &Mesh::build(topology, depth));
        seed_elevation(&regions, &NoiseConfig::default()).unwrap();
        regions
    }

    #[test]
    fn test_record_layout() {
        assert_eq!(std::mem::size_of::<RegionRecord>(), 44);
        let packed = PackedTerrain::pack(&seeded(Topology::Hex, 2)).unwrap();
        assert_eq!(packed.as_bytes().len(), packed.records().len() * 44);
    }

    #[test]
    fn test_padding_uses_own_index() {
        let regions = seeded(Topology::Hex, 1);
        let packed = PackedTerrain::pack(&regions).unwrap();
        for (i, record) in packed.records().iter().enumerate() {
            let n = record.num_adjacent as usize;
            assert_eq!(&record.adjacent[..n], regions.region(i).adjacent_regions());
            assert!(record.adjacent[n..].iter().all(|&a| a == i as u32));
            assert_eq!(record.elevation, regions.region(i).elevation());
        }
    }

    #[test]
    fn test_high_degree_rejected() {
        // seven triangles fanned around the origin
        let center = Vec3::ZERO;
        let rim: Vec<Vec3> = (0..7)
            .map(|k| {
                let a = k as f32 * std::f32::consts::TAU / 7.0;
                Vec3::new(a.cos(), a.sin(), 0.0)
            })
            .collect();
        let tris: Vec<Triangle> = (0..7)
            .map(|k| Triangle::new(center, rim[k], rim[(k + 1) % 7]).unwrap())
            .collect();
        let regions = RegionGraph::from_triangles(Topology::Hex, &tris, 1e-6);
        assert!(matches!(
            PackedTerrain::pack(&regions),
            Err(TerrainError::UnsupportedDegree { degree: 7, .. })
        ));
    }

    #[test]
    fn test_random_starts_reproducible() {
        let packed = PackedTerrain::pack(&seeded(Topology::Icosahedron, 2)).unwrap();
        let a = packed.random_starts(100, 0);
        assert_eq!(a, packed.random_starts(100, 0));
        assert!(a.iter().all(|&s| (s as usize) < packed.records().len()));
    }

    #[test]
    fn test_packed_matches_graph_with_single_region_erosion() {
        let regions = seeded(Topology::Icosahedron, 3);
        let packed = PackedTerrain::pack(&regions).unwrap();
        let graph = ErosionGraph::new(regions, 0);
        let config = SimulationConfig::default();

        let (elevations, stats) = packed.simulate(&[123], &config, 4, 2).unwrap();
        WaterDroplet::new(&graph, 123, 0, 4).simulate(&graph, &config);

        assert_eq!(stats.droplets, 1);
        assert_eq!(elevations, graph.regions().elevations());
    }

    #[test]
    fn test_packed_batch_erodes() {
        let regions = seeded(Topology::Hex, 4);
        let before = regions.elevations();
        let packed = PackedTerrain::pack(&regions).unwrap();
        let starts = packed.random_starts(300, 8);
        let (after, stats) = packed.simulate(&starts, &SimulationConfig::default(), 8, 4).unwrap();
        assert_eq!(stats.droplets, 300);
        assert!(stats.total_eroded > 0.0);
        assert_ne!(before, after);
        // the packed batch works on its own copy
        assert_eq!(before, regions.elevations());
    }

    #[test]
    fn test_single_worker_matches_many() {
        let packed = PackedTerrain::pack(&seeded(Topology::Icosahedron, 3)).unwrap();
        let config = SimulationConfig::default();
        let starts = packed.random_starts(1, 3);
        let (one, _) = packed.simulate(&starts, &config, 3, 1).unwrap();
        let (many, _) = packed.simulate(&starts, &config, 3, DEFAULT_MAX_WORKERS).unwrap();
        assert_eq!(one, many);

        let (zero, stats) = packed.simulate(&starts, &config, 3, 0).unwrap();
        assert_eq!(stats.droplets, 1);
        assert_eq!(zero, one);
    }
}
