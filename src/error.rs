//! Error type shared by the terrain pipeline.
//!
//! Only configuration mistakes and file boundary failures surface here.
//! Numerical trouble inside the droplet simulation is handled locally by
//! killing the offending droplet.

/// Errors that can occur while configuring, building or exporting terrain.
#[derive(Debug)]
pub enum TerrainError {
    /// Fractal noise needs at least one octave
    InvalidOctaves(u32),
    /// Coordinate quantization precision must not be negative
    InvalidPrecision(i32),
    /// A region has more neighbors than the packed record can hold
    UnsupportedDegree { region: usize, degree: usize },
    /// The bounded worker pool could not be created
    ThreadPool(String),
    /// IO error (file not found, permissions, etc.)
    Io(std::io::Error),
    /// JSON (de)serialization error
    Serialization(serde_json::Error),
    /// PNG encoding error
    Image(image::ImageError),
}

impl std::fmt::Display for TerrainError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TerrainError::InvalidOctaves(n) => {
                write!(f, "Number of octaves must be greater than 0 (got {})", n)
            }
            TerrainError::InvalidPrecision(p) => {
                write!(f, "Precision must be greater than or equal to 0 (got {})", p)
            }
            TerrainError::UnsupportedDegree { region, degree } => write!(
                f,
                "Region {} has {} neighbors, packed records hold at most {}",
                region,
                degree,
                crate::erosion::packed::MAX_NEIGHBORS
            ),
            TerrainError::ThreadPool(e) => write!(f, "Worker pool error: {}", e),
            TerrainError::Io(e) => write!(f, "IO error: {}", e),
            TerrainError::Serialization(e) => write!(f, "Serialization error: {}", e),
            TerrainError::Image(e) => write!(f, "Image error: {}", e),
        }
    }
}

impl std::error::Error for TerrainError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            TerrainError::Io(e) => Some(e),
            TerrainError::Serialization(e) => Some(e),
            TerrainError::Image(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for TerrainError {
    fn from(e: std::io::Error) -> Self {
        TerrainError::Io(e)
    }
}

impl From<serde_json::Error> for TerrainError {
    fn from(e: serde_json::Error) -> Self {
        TerrainError::Serialization(e)
    }
}

impl From<image::ImageError> for TerrainError {
    fn from(e: image::ImageError) -> Self {
        TerrainError::Image(e)
    }
}

impl From<rayon::ThreadPoolBuildError> for TerrainError {
    fn from(e: rayon::ThreadPoolBuildError) -> Self {
        TerrainError::ThreadPool(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, TerrainError>;
