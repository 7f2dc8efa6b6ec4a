//! Erosion graph: the region arena plus lazily computed Gaussian weights.
//!
//! Erosion at a region is spread over every region within `radius` hops.
//! Each neighbour gets a weight from the normal density
//! `1 / (sqrt(2π)·σ) · exp(-d² / 2σ²)` with `σ = max_distance / 3`, and the
//! weights are normalized to sum to 1. A table is built on first access and
//! cached for the life of the graph (or until the radius changes).

use crate::erosion::surface::ErosionSurface;
use crate::math::Vec3;
use crate::region::RegionGraph;
use rayon::prelude::*;
use std::collections::HashSet;
use std::sync::OnceLock;

pub struct ErosionGraph {
    regions: RegionGraph,
    radius: usize,
    weights: Vec<OnceLock<Vec<(u32, f32)>>>,
}

impl ErosionGraph {
    pub fn new(regions: RegionGraph, radius: usize) -> Self {
        let weights = empty_tables(regions.len());
        Self { regions, radius, weights }
    }

    pub fn regions(&self) -> &RegionGraph {
        &self.regions
    }

    pub fn len(&self) -> usize {
        self.regions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.regions.is_empty()
    }

    pub fn erosion_radius(&self) -> usize {
        self.radius
    }

    /// Change the neighbourhood radius, dropping every cached table.
    pub fn set_erosion_radius(&mut self, radius: usize) {
        if radius != self.radius {
            self.radius = radius;
            self.weights = empty_tables(self.regions.len());
        }
    }

    /// Weight table for `region`, computed on first use.
    pub fn erosion_weights(&self, region: usize) -> &[(u32, f32)] {
        self.weights[region].get_or_init(|| self.compute_weights(region))
    }

    /// Fill every table up front, in parallel.
    pub fn warm_weights(&self) {
        (0..self.len()).into_par_iter().for_each(|i| {
            self.erosion_weights(i);
        });
    }

    /// Breadth-first search out to `radius` hops, `region` first.
    pub fn nodes_within_radius(&self, region: usize) -> Vec<u32> {
        let mut visited: HashSet<u32> = HashSet::from([region as u32]);
        let mut seen = vec![region as u32];
        let mut frontier = vec![region as u32];
        for _ in 0..self.radius {
            let mut next = Vec::new();
            for &node in &frontier {
                for &adj in self.regions.region(node as usize).adjacent_regions() {
                    if visited.insert(adj) {
                        seen.push(adj);
                        next.push(adj);
                    }
                }
            }
            if next.is_empty() {
                break;
            }
            frontier = next;
        }
        seen
    }

    fn compute_weights(&self, region: usize) -> Vec<(u32, f32)> {
        let nodes = self.nodes_within_radius(region);
        let center = self.regions.region(region).center();
        let distance = |n: u32| self.regions.region(n as usize).center().distance(center) as f64;

        let max_dist = nodes
            .iter()
            .filter(|&&n| n as usize != region)
            .map(|&n| distance(n))
            .fold(0.0f64, f64::max);
        if max_dist <= 0.0 {
            return vec![(region as u32, 1.0)];
        }

        let sigma = max_dist / 3.0;
        let raw: Vec<f64> = nodes.iter().map(|&n| gaussian(distance(n), sigma)).collect();
        let total: f64 = raw.iter().sum();
        nodes
            .into_iter()
            .zip(raw)
            .map(|(n, w)| (n, (w / total) as f32))
            .collect()
    }
}

fn empty_tables(count: usize) -> Vec<OnceLock<Vec<(u32, f32)>>> {
    (0..count).map(|_| OnceLock::new()).collect()
}

fn gaussian(distance: f64, sigma: f64) -> f64 {
    let norm = 1.0 / ((2.0 * std::f64::consts::PI).sqrt() * sigma);
    norm * (-(distance * distance) / (2.0 * sigma * sigma)).exp()
}

impl ErosionSurface for ErosionGraph {
    fn region_count(&self) -> usize {
        self.regions.len()
    }

    fn center(&self, region: usize) -> Vec3 {
        self.regions.region(region).center()
    }

    fn normal(&self, region: usize) -> Vec3 {
        self.regions.topology().surface_normal(self.center(region))
    }

    fn neighbors(&self, region: usize) -> &[u32] {
        self.regions.region(region).adjacent_regions()
    }

    fn elevation(&self, region: usize) -> f32 {
        self.regions.region(region).elevation()
    }

    fn add_elevation(&self, region: usize, delta: f32) {
        self.regions.region(region).add_elevation(delta);
    }

    fn erosion_weights(&self, region: usize) -> &[(u32, f32)] {
        ErosionGraph::erosion_weights(self, region)
    }
}
