//! Geodesic terrain generation and droplet erosion library
//!
//! Re-exports modules for use by binaries and tools.

pub mod config;
pub mod elevation;
pub mod erosion;
pub mod error;
pub mod export;
pub mod fractal;
pub mod math;
pub mod mesh;
pub mod region;
pub mod terrain;

pub use config::TerrainConfig;
pub use error::{Result, TerrainError};
pub use erosion::{ErosionPreset, ErosionStats, ExecutionStrategy, SimulationConfig};
pub use fractal::NoiseConfig;
pub use mesh::Topology;
pub use terrain::Terrain;
