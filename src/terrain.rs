//! Terrain facade: mesh, region graph and erosion behind one handle.

use crate::elevation;
use crate::erosion::{self, ErosionGraph, ErosionStats, ExecutionStrategy, SimulationConfig};
use crate::error::Result;
use crate::fractal::NoiseConfig;
use crate::math::Vec3;
use crate::mesh::{Mesh, Topology, Triangle};
use crate::region::RegionGraph;

pub struct Terrain {
    topology: Topology,
    depth: u32,
    mesh: Mesh,
    graph: ErosionGraph,
}

impl Terrain {
    /// Subdivide the seed shape `depth` times and build the region graph.
    /// Elevations start at zero until [`Terrain::seed_elevation`] runs.
    pub fn build(topology: Topology, depth: u32) -> Self {
        let mesh = Mesh::build(topology, depth);
        let regions = RegionGraph::from_mesh(topology, &mesh);
        let radius = SimulationConfig::default().erosion_radius;
        Self {
            topology,
            depth,
            mesh,
            graph: ErosionGraph::new(regions, radius),
        }
    }

    pub fn seed_elevation(&self, config: &NoiseConfig) -> Result<()> {
        elevation::seed_elevation(self.graph.regions(), config)
    }

    /// Run a batch of droplets. A changed `erosion_radius` drops the cached
    /// weight tables before the batch starts.
    pub fn simulate_erosion(
        &mut self,
        droplets: usize,
        config: &SimulationConfig,
        seed: u64,
        strategy: ExecutionStrategy,
    ) -> Result<ErosionStats> {
        self.graph.set_erosion_radius(config.erosion_radius);
        erosion::simulate_erosion(&self.graph, droplets, config, seed, strategy)
    }

    pub fn topology(&self) -> Topology {
        self.topology
    }

    pub fn depth(&self) -> u32 {
        self.depth
    }

    pub fn mesh(&self) -> &Mesh {
        &self.mesh
    }

    pub fn graph(&self) -> &ErosionGraph {
        &self.graph
    }

    pub fn regions(&self) -> &RegionGraph {
        self.graph.regions()
    }

    pub fn triangles(&self) -> Vec<Triangle> {
        self.mesh.triangles()
    }

    pub fn region_count(&self) -> usize {
        self.graph.len()
    }

    pub fn elevation(&self, region: usize) -> f32 {
        self.regions().region(region).elevation()
    }

    pub fn adjacent_regions(&self, region: usize) -> &[u32] {
        self.regions().region(region).adjacent_regions()
    }

    pub fn center(&self, region: usize) -> Vec3 {
        self.regions().region(region).center()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::erosion::{DropletState, WaterDroplet};
    use crate::error::TerrainError;

    #[test]
    fn test_build_counts() {
        let hex = Terrain::build(Topology::Hex, 2);
        assert_eq!(hex.triangles().len(), 96);
        assert_eq!(hex.region_count(), 61);

        let ico = Terrain::build(Topology::Icosahedron, 2);
        assert_eq!(ico.triangles().len(), 320);
        assert_eq!(ico.region_count(), 162);
    }

    #[test]
    fn test_accessors_agree_with_graph() {
        let terrain = Terrain::build(Topology::Icosahedron, 1);
        terrain.seed_elevation(&NoiseConfig::default()).unwrap();
        for i in 0..terrain.region_count() {
            assert!((terrain.center(i).length() - 1.0).abs() < 1e-5);
            for &n in terrain.adjacent_regions(i) {
                assert!(terrain.adjacent_regions(n as usize).contains(&(i as u32)));
            }
            let h = terrain.elevation(i);
            assert!((0.0..=1.0).contains(&h));
        }
    }

    #[test]
    fn test_bad_noise_config_fails_before_any_write() {
        let terrain = Terrain::build(Topology::Hex, 1);
        let config = NoiseConfig { octaves: 0, ..Default::default() };
        assert!(matches!(terrain.seed_elevation(&config), Err(TerrainError::InvalidOctaves(0))));
        assert!(terrain.regions().elevations().iter().all(|&h| h == 0.0));
    }

    #[test]
    fn test_flat_hex_single_droplet_scenario() {
        let mut terrain = Terrain::build(Topology::Hex, 2);
        assert_eq!(terrain.mesh().triangle_count(), 96);
        terrain.seed_elevation(&NoiseConfig::flat()).unwrap();
        assert!(terrain.regions().elevations().iter().all(|&h| h == 0.5));

        let config = SimulationConfig { erosion_radius: 0, ..Default::default() };
        let stats = terrain.simulate_erosion(1, &config, 11, ExecutionStrategy::Sequential).unwrap();
        assert_eq!(stats.droplets, 1);
        assert_eq!(terrain.graph().erosion_radius(), 0);
        for i in 0..terrain.region_count() {
            assert_eq!(terrain.graph().erosion_weights(i), &[(i as u32, 1.0)]);
        }

        // first step on level ground takes the flat branch
        let flat = Terrain::build(Topology::Hex, 2);
        flat.seed_elevation(&NoiseConfig::flat()).unwrap();
        let mut droplet = WaterDroplet::new(flat.graph(), 0, 0, 11);
        let initial = droplet.direction();
        let gradient = droplet.gradient(flat.graph(), &config);
        assert!(gradient.length() > 0.0);

        let mut droplet = WaterDroplet::new(flat.graph(), 0, 0, 11);
        droplet.step(flat.graph(), &config);
        assert_eq!(droplet.state(), DropletState::Alive);
        assert_ne!(droplet.direction(), initial);
        assert!((droplet.direction().length() - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_radius_change_between_runs() {
        let mut terrain = Terrain::build(Topology::Icosahedron, 2);
        terrain.seed_elevation(&NoiseConfig::default()).unwrap();
        let wide = SimulationConfig { erosion_radius: 2, ..Default::default() };
        terrain.simulate_erosion(10, &wide, 0, ExecutionStrategy::Sequential).unwrap();
        let wide_len = terrain.graph().erosion_weights(0).len();

        let narrow = SimulationConfig { erosion_radius: 1, ..Default::default() };
        terrain.simulate_erosion(10, &narrow, 0, ExecutionStrategy::Sequential).unwrap();
        assert_eq!(terrain.graph().erosion_radius(), 1);
        assert!(terrain.graph().erosion_weights(0).len() < wide_len);
    }
}
