//! Region graph: the dual of the triangle mesh.
//!
//! One [`Region`] per distinct mesh vertex, stored in an arena and addressed
//! by index. Two regions are adjacent when they share a triangle.

use crate::math::Vec3;
use crate::mesh::{Mesh, Topology, Triangle};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};

/// An `f32` that can be updated from several threads without torn reads.
#[derive(Debug, Default)]
pub struct AtomicF32(AtomicU32);

impl AtomicF32 {
    pub fn new(value: f32) -> Self {
        Self(AtomicU32::new(value.to_bits()))
    }

    pub fn load(&self) -> f32 {
        f32::from_bits(self.0.load(Ordering::Relaxed))
    }

    pub fn store(&self, value: f32) {
        self.0.store(value.to_bits(), Ordering::Relaxed);
    }

    /// Atomically add `delta`, returning the previous value.
    pub fn fetch_add(&self, delta: f32) -> f32 {
        let prev = self
            .0
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |bits| {
                Some((f32::from_bits(bits) + delta).to_bits())
            })
            .unwrap_or_else(|bits| bits);
        f32::from_bits(prev)
    }
}

impl Clone for AtomicF32 {
    fn clone(&self) -> Self {
        Self::new(self.load())
    }
}

/// A node of the dual graph.
#[derive(Debug, Clone)]
pub struct Region {
    center: Vec3,
    /// Indices of the incident mesh faces
    triangles: Vec<u32>,
    adjacent: Vec<u32>,
    elevation: AtomicF32,
}

impl Region {
    pub fn center(&self) -> Vec3 {
        self.center
    }

    pub fn triangles(&self) -> &[u32] {
        &self.triangles
    }

    pub fn adjacent_regions(&self) -> &[u32] {
        &self.adjacent
    }

    pub fn degree(&self) -> usize {
        self.adjacent.len()
    }

    pub fn elevation(&self) -> f32 {
        self.elevation.load()
    }

    pub fn set_elevation(&self, value: f32) {
        self.elevation.store(value);
    }

    pub fn add_elevation(&self, delta: f32) {
        self.elevation.fetch_add(delta);
    }
}

/// Arena of regions with index-based adjacency.
#[derive(Debug, Clone)]
pub struct RegionGraph {
    topology: Topology,
    regions: Vec<Region>,
}

impl RegionGraph {
    /// Build from an indexed mesh: vertex `i` becomes region `i`.
    pub fn from_mesh(topology: Topology, mesh: &Mesh) -> Self {
        let vertex_faces = mesh.vertex_faces();
        let regions = vertex_faces
            .into_iter()
            .enumerate()
            .map(|(vi, faces)| {
                let mut adjacent: Vec<u32> = Vec::with_capacity(6);
                for &f in &faces {
                    for &v in &mesh.faces[f as usize] {
                        if v as usize != vi && !adjacent.contains(&v) {
                            adjacent.push(v);
                        }
                    }
                }
                Region {
                    center: mesh.vertices[vi],
                    triangles: faces,
                    adjacent,
                    elevation: AtomicF32::new(0.0),
                }
            })
            .collect();
        Self { topology, regions }
    }

    /// Build from a loose triangle soup. Vertices closer than `tolerance`
    /// are merged into one region through a spatial hash.
    pub fn from_triangles(topology: Topology, triangles: &[Triangle], tolerance: f32) -> Self {
        let mut index = SpatialIndex::new(tolerance);
        let mut vertices = Vec::new();
        let mut faces = Vec::with_capacity(triangles.len());
        for tri in triangles {
            let mut face = [0u32; 3];
            for (slot, &v) in face.iter_mut().zip(tri.vertices()) {
                *slot = index.find_or_insert(v, &mut vertices);
            }
            // near-duplicates can collapse a sliver triangle
            if face[0] != face[1] && face[0] != face[2] && face[1] != face[2] {
                faces.push(face);
            }
        }
        Self::from_mesh(topology, &Mesh { vertices, faces })
    }

    pub fn topology(&self) -> Topology {
        self.topology
    }

    pub fn len(&self) -> usize {
        self.regions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.regions.is_empty()
    }

    pub fn region(&self, index: usize) -> &Region {
        &self.regions[index]
    }

    pub fn regions(&self) -> &[Region] {
        &self.regions
    }

    pub fn elevations(&self) -> Vec<f32> {
        self.regions.iter().map(Region::elevation).collect()
    }

    /// Overwrite every elevation. `values` must have one entry per region.
    pub fn set_elevations(&self, values: &[f32]) {
        debug_assert_eq!(values.len(), self.regions.len());
        for (region, &value) in self.regions.iter().zip(values) {
            region.set_elevation(value);
        }
    }
}

/// Uniform grid hash used to merge vertices within a distance tolerance.
struct SpatialIndex {
    tolerance: f32,
    cell: f32,
    buckets: HashMap<(i64, i64, i64), Vec<u32>>,
}

impl SpatialIndex {
    fn new(tolerance: f32) -> Self {
        Self {
            tolerance,
            cell: tolerance.max(f32::EPSILON),
            buckets: HashMap::new(),
        }
    }

    fn key(&self, v: Vec3) -> (i64, i64, i64) {
        (
            (v.x / self.cell).floor() as i64,
            (v.y / self.cell).floor() as i64,
            (v.z / self.cell).floor() as i64,
        )
    }

    fn find_or_insert(&mut self, v: Vec3, vertices: &mut Vec<Vec3>) -> u32 {
        let (kx, ky, kz) = self.key(v);
        for dx in -1..=1 {
            for dy in -1..=1 {
                for dz in -1..=1 {
                    if let Some(bucket) = self.buckets.get(&(kx + dx, ky + dy, kz + dz)) {
                        if let Some(&found) = bucket
                            .iter()
                            .find(|&&i| vertices[i as usize].distance(v) <= self.tolerance)
                        {
                            return found;
                        }
                    }
                }
            }
        }
        vertices.push(v);
        let id = (vertices.len() - 1) as u32;
        self.buckets.entry((kx, ky, kz)).or_default().push(id);
        id
    }
}
