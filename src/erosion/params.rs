//! Droplet simulation parameters and presets

use serde::{Deserialize, Serialize};

/// Default upper bound on concurrently running droplet workers
pub const DEFAULT_MAX_WORKERS: usize = 32;

/// Erosion intensity preset
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ErosionPreset {
    /// Droplets live for zero steps - raw terrain
    None,
    /// Short-lived droplets, subtle smoothing
    Gentle,
    /// Balanced erosion
    #[default]
    Normal,
    /// High capacity, low inertia - deep carved channels
    Carving,
}

impl ErosionPreset {
    pub fn all() -> &'static [Self] {
        &[Self::None, Self::Gentle, Self::Normal, Self::Carving]
    }

    pub fn description(&self) -> &'static str {
        match self {
            Self::None => "No erosion (raw terrain)",
            Self::Gentle => "Subtle smoothing",
            Self::Normal => "Balanced erosion",
            Self::Carving => "Deep carved channels",
        }
    }
}

impl std::fmt::Display for ErosionPreset {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::None => write!(f, "none"),
            Self::Gentle => write!(f, "gentle"),
            Self::Normal => write!(f, "normal"),
            Self::Carving => write!(f, "carving"),
        }
    }
}

/// Parameters shared by every droplet of a batch.
///
/// Built once before the batch starts and passed by reference to every
/// droplet; nothing mutates it while droplets run. Values outside the
/// documented ranges are accepted and simply give odd terrain.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Steps per droplet
    pub lifetime: usize,

    /// Weight of the previous heading against the downhill gradient (0.0-1.0)
    pub inertia: f32,

    /// Acceleration from height loss
    pub gravity: f32,

    /// Fraction of water lost per step (0.0-1.0)
    pub evaporation: f32,

    /// Sediment capacity multiplier
    pub capacity: f32,

    /// Fraction of spare capacity taken from the terrain per step (0.0-1.0)
    pub erosion_rate: f32,

    /// Fraction of excess sediment dropped per step (0.0-1.0)
    pub deposition_rate: f32,

    /// Floor on sediment capacity
    pub min_erosion: f32,

    /// Hop count of the Gaussian erosion neighbourhood
    pub erosion_radius: usize,

    /// Early termination policy: when set, a droplet whose volume drops
    /// below this value dumps its sediment and dies. `None` runs the full
    /// lifetime.
    pub min_volume: Option<f32>,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            lifetime: 50,
            inertia: 0.1,
            gravity: 4.0,
            evaporation: 0.05,
            capacity: 2.0,
            erosion_rate: 0.3,
            deposition_rate: 0.01,
            min_erosion: 0.01,
            erosion_radius: 2,
            min_volume: None,
        }
    }
}

impl SimulationConfig {
    /// Create parameters from a preset
    pub fn from_preset(preset: ErosionPreset) -> Self {
        match preset {
            ErosionPreset::None => Self {
                lifetime: 0,
                ..Default::default()
            },
            ErosionPreset::Gentle => Self {
                lifetime: 20,
                erosion_rate: 0.1,
                erosion_radius: 3,
                ..Default::default()
            },
            ErosionPreset::Normal => Self::default(),
            ErosionPreset::Carving => Self {
                inertia: 0.05,
                capacity: 8.0,
                min_volume: Some(0.001),
                ..Default::default()
            },
        }
    }

    /// Magnitude of the random heading substituted on featureless terrain.
    ///
    /// `inertia / (1 - inertia)` makes the random push comparable to the
    /// inertia term; inertia is clamped so the result stays finite and
    /// non-zero at the extremes.
    pub fn substitute_scale(&self) -> f32 {
        let inertia = self.inertia.clamp(0.01, 0.99);
        inertia / (1.0 - inertia)
    }
}
