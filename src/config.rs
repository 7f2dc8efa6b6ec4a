//! Run configuration stored as JSON.

use crate::erosion::{ExecutionStrategy, SimulationConfig};
use crate::error::Result;
use crate::fractal::NoiseConfig;
use crate::mesh::Topology;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TerrainConfig {
    pub topology: Topology,
    /// Subdivision passes applied to the seed shape
    pub depth: u32,
    pub noise: NoiseConfig,
    pub simulation: SimulationConfig,
    pub droplets: usize,
    pub seed: u64,
    pub strategy: ExecutionStrategy,
}

impl Default for TerrainConfig {
    fn default() -> Self {
        Self {
            topology: Topology::Icosahedron,
            depth: 5,
            noise: NoiseConfig::default(),
            simulation: SimulationConfig::default(),
            droplets: 50_000,
            seed: 0,
            strategy: ExecutionStrategy::default(),
        }
    }
}

impl TerrainConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let text = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&text)?)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        fs::write(path, serde_json::to_string_pretty(self)?)?;
        println!("Saved config: {}", path.display());
        Ok(())
    }
}
