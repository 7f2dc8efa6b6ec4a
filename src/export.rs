use std::fs;
use std::path::Path;

use image::{ImageBuffer, Rgb, RgbImage};
use serde::{Deserialize, Serialize};

use crate::elevation::elevation_range;
use crate::error::Result;
use crate::math::Vec3;
use crate::mesh::Topology;
use crate::terrain::Terrain;

/// Fraction of the elevation range drawn as water.
pub const SEA_LEVEL: f32 = 0.4;

/// Everything a renderer needs to rebuild the terrain surface.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TerrainSnapshot {
    pub topology: Topology,
    pub depth: u32,
    pub centers: Vec<Vec3>,
    pub elevations: Vec<f32>,
    pub adjacency: Vec<Vec<u32>>,
    /// Faces as region index triples
    pub faces: Vec<[u32; 3]>,
}

impl TerrainSnapshot {
    pub fn capture(terrain: &Terrain) -> Self {
        let regions = terrain.regions().regions();
        Self {
            topology: terrain.topology(),
            depth: terrain.depth(),
            centers: regions.iter().map(|r| r.center()).collect(),
            elevations: terrain.regions().elevations(),
            adjacency: regions.iter().map(|r| r.adjacent_regions().to_vec()).collect(),
            faces: terrain.mesh().faces.clone(),
        }
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let text = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&text)?)
    }
}

/// Write the terrain as a JSON snapshot.
pub fn write_snapshot(terrain: &Terrain, path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    let snapshot = TerrainSnapshot::capture(terrain);
    fs::write(path, serde_json::to_string(&snapshot)?)?;
    println!("Saved snapshot: {} ({} regions)", path.display(), snapshot.centers.len());
    Ok(())
}

/// Rasterize the mesh seen from +Z onto a `size`×`size` image.
///
/// Elevations are interpolated across each face and colored relative to
/// the terrain's own min/max. Spheres only show the +Z hemisphere.
pub fn render_heightmap(terrain: &Terrain, size: u32) -> RgbImage {
    let mut img: RgbImage = ImageBuffer::from_pixel(size, size, Rgb([0, 0, 0]));
    if size == 0 {
        return img;
    }

    let (min_h, max_h) = elevation_range(terrain.regions());
    let span = (max_h - min_h).max(f32::EPSILON);
    let mesh = terrain.mesh();
    let spherical = terrain.topology().is_spherical();

    let to_pixel = |v: Vec3| -> (f32, f32) {
        (
            (v.x + 1.0) * 0.5 * size as f32,
            (1.0 - v.y) * 0.5 * size as f32,
        )
    };

    for &face in &mesh.faces {
        let verts = face.map(|i| mesh.vertices[i as usize]);
        if spherical && verts.iter().all(|v| v.z <= 0.0) {
            continue;
        }
        let heights = face.map(|i| (terrain.elevation(i as usize) - min_h) / span);
        let [p0, p1, p2] = verts.map(to_pixel);

        let area = edge(p0, p1, p2);
        if area.abs() < f32::EPSILON {
            continue;
        }

        let min_x = p0.0.min(p1.0).min(p2.0).floor().max(0.0) as u32;
        let max_x = (p0.0.max(p1.0).max(p2.0).ceil() as u32).min(size - 1);
        let min_y = p0.1.min(p1.1).min(p2.1).floor().max(0.0) as u32;
        let max_y = (p0.1.max(p1.1).max(p2.1).ceil() as u32).min(size - 1);

        for y in min_y..=max_y {
            for x in min_x..=max_x {
                let p = (x as f32 + 0.5, y as f32 + 0.5);
                let w0 = edge(p1, p2, p) / area;
                let w1 = edge(p2, p0, p) / area;
                let w2 = edge(p0, p1, p) / area;
                if w0 < 0.0 || w1 < 0.0 || w2 < 0.0 {
                    continue;
                }
                let depth = w0 * verts[0].z + w1 * verts[1].z + w2 * verts[2].z;
                if spherical && depth < 0.0 {
                    continue;
                }
                let h = w0 * heights[0] + w1 * heights[1] + w2 * heights[2];
                img.put_pixel(x, y, Rgb(terrain_color(h)));
            }
        }
    }

    img
}

/// Render and save as PNG.
pub fn export_heightmap(terrain: &Terrain, path: impl AsRef<Path>, size: u32) -> Result<()> {
    let path = path.as_ref();
    render_heightmap(terrain, size).save(path)?;
    println!("Saved heightmap: {}", path.display());
    Ok(())
}

fn edge(a: (f32, f32), b: (f32, f32), p: (f32, f32)) -> f32 {
    (b.0 - a.0) * (p.1 - a.1) - (b.1 - a.1) * (p.0 - a.0)
}

/// Hypsometric tint for a normalized elevation.
/// Water below [`SEA_LEVEL`], then green to brown to white.
fn terrain_color(t: f32) -> [u8; 3] {
    let t = t.clamp(0.0, 1.0);
    if t < SEA_LEVEL {
        let depth_ratio = t / SEA_LEVEL;
        return [20, 50, (100.0 + 155.0 * depth_ratio) as u8];
    }

    let elev_ratio = (t - SEA_LEVEL) / (1.0 - SEA_LEVEL);
    if elev_ratio < 0.3 {
        // Low: green
        [
            (50.0 + 100.0 * elev_ratio) as u8,
            (120.0 + 80.0 * elev_ratio) as u8,
            50,
        ]
    } else if elev_ratio < 0.7 {
        // Mid: brown
        let t = (elev_ratio - 0.3) / 0.4;
        [
            (80.0 + 80.0 * t) as u8,
            (150.0 - 50.0 * t) as u8,
            (50.0 + 30.0 * t) as u8,
        ]
    } else {
        // High: gray/white
        let t = (elev_ratio - 0.7) / 0.3;
        [
            (160.0 + 95.0 * t) as u8,
            (100.0 + 155.0 * t) as u8,
            (80.0 + 175.0 * t) as u8,
        ]
    }
}
