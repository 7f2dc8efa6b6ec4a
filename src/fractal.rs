//! Multi-octave fractal noise used to seed terrain elevation.

use crate::error::{Result, TerrainError};
use crate::math::Vec3;
use noise::{NoiseFn, Perlin};
use serde::{Deserialize, Serialize};

/// Fractal noise settings.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NoiseConfig {
    /// Number of noise layers (must be at least 1)
    pub octaves: u32,
    /// Amplitude of the first octave
    pub amplitude: f32,
    /// Amplitude multiplier per octave
    pub persistence: f32,
    /// Frequency of the first octave
    pub frequency: f32,
    /// Frequency multiplier per octave
    pub lacunarity: f32,
    /// Decimal places kept by [`FractalNoise::evaluate_quantized`]
    pub precision: i32,
    /// Seed for the base Perlin primitive
    pub seed: u32,
}

impl Default for NoiseConfig {
    fn default() -> Self {
        Self {
            octaves: 8,
            amplitude: 0.5,
            persistence: 0.25,
            frequency: 1.0,
            lacunarity: 2.0,
            precision: 1,
            seed: 0,
        }
    }
}

impl NoiseConfig {
    /// A field that evaluates to zero everywhere (all elevations 0.5).
    pub fn flat() -> Self {
        Self {
            amplitude: 0.0,
            ..Default::default()
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.octaves == 0 {
            return Err(TerrainError::InvalidOctaves(self.octaves));
        }
        if self.precision < 0 {
            return Err(TerrainError::InvalidPrecision(self.precision));
        }
        Ok(())
    }
}

/// Weighted sum of Perlin octaves:
/// `sum_i amplitude_i * perlin(point * frequency_i)`.
pub struct FractalNoise {
    perlin: Perlin,
    amplitudes: Vec<f32>,
    frequencies: Vec<f32>,
    quantum: f32,
}

impl FractalNoise {
    pub fn new(config: &NoiseConfig) -> Result<Self> {
        config.validate()?;

        let octaves = config.octaves as usize;
        let mut amplitudes = Vec::with_capacity(octaves);
        let mut frequencies = Vec::with_capacity(octaves);
        let mut amplitude = config.amplitude;
        let mut frequency = config.frequency;
        for _ in 0..octaves {
            amplitudes.push(amplitude);
            frequencies.push(frequency);
            amplitude *= config.persistence;
            frequency *= config.lacunarity;
        }

        Ok(Self {
            perlin: Perlin::new(config.seed),
            amplitudes,
            frequencies,
            quantum: 10f32.powi(config.precision),
        })
    }

    /// Raw noise value, roughly in `[-1, 1]` for amplitude sums up to 1.
    pub fn evaluate(&self, point: Vec3) -> f32 {
        self.amplitudes
            .iter()
            .zip(&self.frequencies)
            .map(|(&amp, &freq)| {
                let p = point * freq;
                amp * self.perlin.get([p.x as f64, p.y as f64, p.z as f64]) as f32
            })
            .sum()
    }

    /// Same as [`evaluate`](Self::evaluate) with coordinates snapped to
    /// `precision` decimal places first.
    pub fn evaluate_quantized(&self, point: Vec3) -> f32 {
        let snap = |v: f32| (v * self.quantum).trunc() / self.quantum;
        self.evaluate(Vec3::new(snap(point.x), snap(point.y), snap(point.z)))
    }

    /// Map a raw noise value into `[0, 1]`.
    pub fn to_unit(value: f32) -> f32 {
        (value + 1.0) / 2.0
    }
}
