//! Neighbour-access abstraction shared by every erosion backend.
//!
//! The droplet step is written once against [`ErosionSurface`]. The
//! in-memory [`ErosionGraph`](super::graph::ErosionGraph) and the packed
//! record layout in [`packed`](super::packed) both implement it.

use crate::math::Vec3;

pub trait ErosionSurface: Sync {
    fn region_count(&self) -> usize;

    fn center(&self, region: usize) -> Vec3;

    /// Outward surface normal at the region; random headings are drawn in
    /// the plane perpendicular to it.
    fn normal(&self, region: usize) -> Vec3;

    fn neighbors(&self, region: usize) -> &[u32];

    fn elevation(&self, region: usize) -> f32;

    /// Atomically add `delta` to the region's elevation.
    fn add_elevation(&self, region: usize, delta: f32);

    /// Normalized weights used to spread an erosion event around `region`.
    fn erosion_weights(&self, region: usize) -> &[(u32, f32)];

    /// Unit vector from one region's centre towards another's.
    fn direction_to(&self, from: usize, to: usize) -> Vec3 {
        (self.center(to) - self.center(from)).normalized()
    }
}
