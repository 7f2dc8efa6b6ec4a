//! Initial elevation field from fractal noise.

use crate::error::Result;
use crate::fractal::{FractalNoise, NoiseConfig};
use crate::region::RegionGraph;
use rayon::prelude::*;

/// Set every region's elevation to `(noise(center) + 1) / 2`.
///
/// The noise configuration is validated before any region is touched.
pub fn seed_elevation(regions: &RegionGraph, config: &NoiseConfig) -> Result<()> {
    let noise = FractalNoise::new(config)?;
    regions.regions().par_iter().for_each(|region| {
        region.set_elevation(FractalNoise::to_unit(noise.evaluate(region.center())));
    });
    Ok(())
}

/// Lowest and highest elevation in the graph.
pub fn elevation_range(regions: &RegionGraph) -> (f32, f32) {
    let mut min_h = f32::MAX;
    let mut max_h = f32::MIN;
    for region in regions.regions() {
        let h = region.elevation();
        if h < min_h { min_h = h; }
        if h > max_h { max_h = h; }
    }
    (min_h, max_h)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh::{Mesh, Topology};

    #[test]
    fn test_seeded_field_in_unit_range() {
        let graph = RegionGraph::from_mesh(Topology::Icosahedron, &Mesh::build(Topology::Icosahedron, 3));
        seed_elevation(&graph, &NoiseConfig::default()).unwrap();
        let (min_h, max_h) = elevation_range(&graph);
        assert!(min_h >= 0.0 && max_h <= 1.0);
        assert!(max_h > min_h);
    }

    #[test]
    fn test_invalid_config_leaves_field_untouched() {
        let graph = RegionGraph::from_mesh(Topology::Hex, &Mesh::build(Topology::Hex, 1));
        let bad = NoiseConfig { octaves: 0, ..Default::default() };
        assert!(seed_elevation(&graph, &bad).is_err());
        assert!(graph.elevations().iter().all(|&h| h == 0.0));
    }

    #[test]
    fn test_flat_noise_gives_half() {
        let graph = RegionGraph::from_mesh(Topology::Hex, &Mesh::build(Topology::Hex, 2));
        seed_elevation(&graph, &NoiseConfig::flat()).unwrap();
        assert!(graph.elevations().iter().all(|&h| h == 0.5));
    }
}
