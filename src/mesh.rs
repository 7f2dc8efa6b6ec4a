//! Geometry builder: seed polyhedra and iterative triangle subdivision.
//!
//! Two seed shapes are supported:
//! - **Hex**: a flat hexagonal disc of six triangles around the origin
//! - **Icosahedron**: twenty faces, re-projected onto the unit sphere after
//!   subdivision to form a geodesic sphere
//!
//! Each subdivision pass splits every triangle `(a, b, c)` into
//! `(a, d, e)`, `(b, d, f)`, `(c, e, f)` and `(d, e, f)` where `d`, `e`, `f`
//! are the midpoints of `ab`, `ac` and `bc`. Midpoints are cached per edge so
//! neighbouring triangles always share the exact same vertex.

use crate::math::Vec3;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Shape of the seed polyhedron.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Topology {
    /// Flat hexagonal disc (patch-scale terrain)
    #[default]
    Hex,
    /// Geodesic sphere (planet-scale terrain)
    Icosahedron,
}

impl Topology {
    pub fn all() -> &'static [Self] {
        &[Self::Hex, Self::Icosahedron]
    }

    pub fn is_spherical(&self) -> bool {
        matches!(self, Self::Icosahedron)
    }

    /// Outward unit normal of the surface at `point`.
    pub fn surface_normal(&self, point: Vec3) -> Vec3 {
        match self {
            Self::Hex => Vec3::Z,
            Self::Icosahedron => point.try_normalized().unwrap_or(Vec3::Z),
        }
    }

    /// Number of triangles in the seed mesh.
    pub fn seed_triangle_count(&self) -> usize {
        match self {
            Self::Hex => 6,
            Self::Icosahedron => 20,
        }
    }

    /// Build the unsubdivided seed mesh.
    pub fn seed_mesh(&self) -> Mesh {
        match self {
            Self::Hex => hexagon(),
            Self::Icosahedron => icosahedron(),
        }
    }
}

impl std::fmt::Display for Topology {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Hex => write!(f, "hex"),
            Self::Icosahedron => write!(f, "icosahedron"),
        }
    }
}

/*  Hexagon layout
 *    F --- G
 *   / \ 5 / \
 *  / 4 \ / 6 \
 * E --- A --- B
 *  \ 3 / \ 1 /
 *   \ / 2 \ /
 *    D --- C
 */
fn hexagon() -> Mesh {
    let h = 3.0f32.sqrt() / 2.0;
    let vertices = vec![
        Vec3::new(0.0, 0.0, 0.0),
        Vec3::new(1.0, 0.0, 0.0),
        Vec3::new(0.5, -h, 0.0),
        Vec3::new(-0.5, -h, 0.0),
        Vec3::new(-1.0, 0.0, 0.0),
        Vec3::new(-0.5, h, 0.0),
        Vec3::new(0.5, h, 0.0),
    ];
    let faces = vec![[0, 1, 2], [0, 2, 3], [0, 3, 4], [0, 4, 5], [0, 5, 6], [0, 6, 1]];
    Mesh { vertices, faces }
}

fn icosahedron() -> Mesh {
    let phi = (1.0 + 5.0f32.sqrt()) * 0.5;
    let vertices = [
        Vec3::new(-1.0, phi, 0.0),
        Vec3::new(1.0, phi, 0.0),
        Vec3::new(-1.0, -phi, 0.0),
        Vec3::new(1.0, -phi, 0.0),
        Vec3::new(0.0, -1.0, phi),
        Vec3::new(0.0, 1.0, phi),
        Vec3::new(0.0, -1.0, -phi),
        Vec3::new(0.0, 1.0, -phi),
        Vec3::new(phi, 0.0, -1.0),
        Vec3::new(phi, 0.0, 1.0),
        Vec3::new(-phi, 0.0, -1.0),
        Vec3::new(-phi, 0.0, 1.0),
    ]
    .iter()
    .map(|v| v.normalized())
    .collect();
    let faces = vec![
        [0, 11, 5],
        [0, 5, 1],
        [0, 1, 7],
        [0, 7, 10],
        [0, 10, 11],
        [1, 5, 9],
        [5, 11, 4],
        [11, 10, 2],
        [10, 7, 6],
        [7, 1, 8],
        [3, 9, 4],
        [3, 4, 2],
        [3, 2, 6],
        [3, 6, 8],
        [3, 8, 9],
        [4, 9, 5],
        [2, 4, 11],
        [6, 2, 10],
        [8, 6, 7],
        [9, 8, 1],
    ];
    Mesh { vertices, faces }
}

/// An unordered set of three distinct vertices.
///
/// Vertices are stored in canonical (sorted) order so that equality and
/// hashing do not depend on the order the corners were given in.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Triangle {
    vertices: [Vec3; 3],
}

impl Triangle {
    /// Returns `None` unless the three points are distinct.
    pub fn new(a: Vec3, b: Vec3, c: Vec3) -> Option<Self> {
        if a == b || a == c || b == c {
            return None;
        }
        let mut vertices = [a, b, c];
        vertices.sort();
        Some(Self { vertices })
    }

    pub fn vertices(&self) -> &[Vec3; 3] {
        &self.vertices
    }

    pub fn contains(&self, v: Vec3) -> bool {
        self.vertices.contains(&v)
    }

    pub fn shared_vertices(&self, other: &Triangle) -> usize {
        self.vertices.iter().filter(|v| other.contains(**v)).count()
    }

    /// Two triangles are adjacent when they share an edge.
    pub fn is_adjacent(&self, other: &Triangle) -> bool {
        self.shared_vertices(other) == 2
    }

    /// Split into four triangles through the edge midpoints.
    pub fn subdivide(&self) -> [Triangle; 4] {
        let [a, b, c] = self.vertices;
        let d = a.midpoint(b);
        let e = a.midpoint(c);
        let f = b.midpoint(c);
        // midpoints of distinct points are distinct from each other and the corners
        [
            Self::from_distinct(a, d, e),
            Self::from_distinct(b, d, f),
            Self::from_distinct(c, e, f),
            Self::from_distinct(d, e, f),
        ]
    }

    /// Project every corner onto the unit sphere.
    pub fn normalized(&self) -> Triangle {
        let [a, b, c] = self.vertices;
        Self::from_distinct(a.normalized(), b.normalized(), c.normalized())
    }

    fn from_distinct(a: Vec3, b: Vec3, c: Vec3) -> Self {
        let mut vertices = [a, b, c];
        vertices.sort();
        Self { vertices }
    }
}

/// Indexed triangle mesh.
#[derive(Clone, Debug)]
pub struct Mesh {
    pub vertices: Vec<Vec3>,
    pub faces: Vec<[u32; 3]>,
}

impl Mesh {
    /// Build the seed shape for `topology` and subdivide it `depth` times.
    pub fn build(topology: Topology, depth: u32) -> Self {
        let mut mesh = topology.seed_mesh();
        for _ in 0..depth {
            mesh.subdivide();
        }
        if topology.is_spherical() {
            mesh.normalize_to_sphere();
        }
        mesh
    }

    /// One subdivision pass: every face becomes four.
    pub fn subdivide(&mut self) {
        let mut midpoints: HashMap<(u32, u32), u32> = HashMap::with_capacity(self.faces.len() * 3 / 2);
        let mut faces = Vec::with_capacity(self.faces.len() * 4);
        let vertices = &mut self.vertices;

        let mut midpoint = |i: u32, j: u32| -> u32 {
            let key = (i.min(j), i.max(j));
            *midpoints.entry(key).or_insert_with(|| {
                let m = vertices[i as usize].midpoint(vertices[j as usize]);
                vertices.push(m);
                (vertices.len() - 1) as u32
            })
        };

        for &[a, b, c] in &self.faces {
            let d = midpoint(a, b);
            let e = midpoint(a, c);
            let f = midpoint(b, c);
            faces.push([a, d, e]);
            faces.push([b, d, f]);
            faces.push([c, e, f]);
            faces.push([d, e, f]);
        }

        self.faces = faces;
    }

    pub fn normalize_to_sphere(&mut self) {
        for v in &mut self.vertices {
            *v = v.normalized();
        }
    }

    pub fn triangle_count(&self) -> usize {
        self.faces.len()
    }

    pub fn triangle(&self, face: usize) -> Triangle {
        let [a, b, c] = self.faces[face];
        Triangle::from_distinct(
            self.vertices[a as usize],
            self.vertices[b as usize],
            self.vertices[c as usize],
        )
    }

    pub fn triangles(&self) -> Vec<Triangle> {
        (0..self.faces.len()).map(|f| self.triangle(f)).collect()
    }

    /// For every vertex, the faces that use it.
    pub fn vertex_faces(&self) -> Vec<Vec<u32>> {
        let mut map = vec![Vec::new(); self.vertices.len()];
        for (fi, face) in self.faces.iter().enumerate() {
            for &v in face {
                map[v as usize].push(fi as u32);
            }
        }
        map
    }
}
