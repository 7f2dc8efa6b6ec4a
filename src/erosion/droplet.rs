//! A single water droplet walking over an [`ErosionSurface`].
//!
//! Each step:
//! 1. Estimate the local gradient from the elevation differences to every
//!    neighbour (with random substitutes on flat ground)
//! 2. Blend it with the previous heading using inertia
//! 3. Move to the neighbour best aligned with the new heading
//! 4. Erode (spread over the Gaussian neighbourhood) or deposit (at the
//!    current region only) depending on sediment capacity
//! 5. Update velocity from the height change and evaporate water
//!
//! A droplet dies after `lifetime` steps, when its velocity becomes NaN, or
//! (optionally) when its volume evaporates below `min_volume`.

use crate::erosion::params::SimulationConfig;
use crate::erosion::surface::ErosionSurface;
use crate::math::Vec3;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DropletState {
    Alive,
    Dead,
}

/// What a droplet did over its lifetime.
#[derive(Clone, Debug, Default)]
pub struct DropletOutcome {
    pub steps: usize,
    pub eroded: f64,
    pub deposited: f64,
    /// Sediment still carried when the droplet died
    pub sediment: f32,
    pub max_erosion: f32,
    pub max_deposition: f32,
    /// Terminated early because velocity became NaN
    pub died_invalid: bool,
    /// Terminated early by the `min_volume` policy
    pub evaporated: bool,
}

pub struct WaterDroplet {
    position: usize,
    direction: Vec3,
    velocity: f32,
    volume: f32,
    sediment: f32,
    state: DropletState,
    rng: ChaCha8Rng,
    outcome: DropletOutcome,
}

/// Seed of the initial heading, derived from the batch seed and the start
/// region's coordinates only.
pub fn droplet_seed(seed: u64, center: Vec3) -> u64 {
    let xy = ((center.x.to_bits() as u64) << 32) | center.y.to_bits() as u64;
    let z = (center.z.to_bits() as u64).rotate_left(17);
    splitmix64(seed ^ xy ^ z)
}

/// Seed of the per-step stream (jitter and flat/cancel substitutes). Mixes
/// in the droplet's batch index so droplets sharing a start region diverge.
pub fn stream_seed(seed: u64, index: usize, center: Vec3) -> u64 {
    splitmix64(droplet_seed(seed, center) ^ splitmix64(index as u64).rotate_left(29))
}

fn splitmix64(mut x: u64) -> u64 {
    x = x.wrapping_add(0x9E37_79B9_7F4A_7C15);
    x = (x ^ (x >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    x = (x ^ (x >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    x ^ (x >> 31)
}

/// Random unit vector perpendicular to `normal`.
fn random_tangent(rng: &mut ChaCha8Rng, normal: Vec3) -> Vec3 {
    for _ in 0..16 {
        let v = Vec3::new(
            rng.gen_range(-1.0f32..1.0),
            rng.gen_range(-1.0f32..1.0),
            rng.gen_range(-1.0f32..1.0),
        )
        .reject(normal);
        if v.length() > 1e-3 {
            return v.normalized();
        }
    }
    // practically unreachable; any perpendicular will do
    let axis = if normal.x.abs() < 0.9 { Vec3::new(1.0, 0.0, 0.0) } else { Vec3::new(0.0, 1.0, 0.0) };
    normal.cross(axis).normalized()
}

impl WaterDroplet {
    /// Droplet number `index` of a batch, placed on region `start`.
    ///
    /// The initial heading depends only on `seed` and the start region;
    /// later random draws also depend on `index`.
    pub fn new<S: ErosionSurface + ?Sized>(surface: &S, start: usize, index: usize, seed: u64) -> Self {
        let center = surface.center(start);
        let mut heading = ChaCha8Rng::seed_from_u64(droplet_seed(seed, center));
        let direction = random_tangent(&mut heading, surface.normal(start));
        let rng = ChaCha8Rng::seed_from_u64(stream_seed(seed, index, center));
        Self {
            position: start,
            direction,
            velocity: 1.0,
            volume: 1.0,
            sediment: 0.0,
            state: DropletState::Alive,
            rng,
            outcome: DropletOutcome::default(),
        }
    }

    pub fn position(&self) -> usize {
        self.position
    }

    pub fn direction(&self) -> Vec3 {
        self.direction
    }

    pub fn velocity(&self) -> f32 {
        self.velocity
    }

    pub fn volume(&self) -> f32 {
        self.volume
    }

    pub fn sediment(&self) -> f32 {
        self.sediment
    }

    pub fn state(&self) -> DropletState {
        self.state
    }

    /// Run until dead and report what happened.
    pub fn simulate<S: ErosionSurface + ?Sized>(mut self, surface: &S, config: &SimulationConfig) -> DropletOutcome {
        for _ in 0..config.lifetime {
            if self.state == DropletState::Dead {
                break;
            }
            self.step(surface, config);
        }
        self.state = DropletState::Dead;
        self.outcome.sediment = self.sediment;
        self.outcome
    }

    /// Uphill gradient estimate at the current region.
    ///
    /// Never returns a zero vector on level ground: a random tangent
    /// direction is substituted instead. In a pit (every neighbour higher)
    /// the result is zero and the droplet coasts on inertia.
    pub fn gradient<S: ErosionSurface + ?Sized>(&mut self, surface: &S, config: &SimulationConfig) -> Vec3 {
        let here = self.position;
        let height = surface.elevation(here);
        let normal = surface.normal(here);

        let mut diffs: Vec<(Vec3, f32)> = Vec::with_capacity(6);
        let mut total = 0.0f32;
        let mut in_pit = true;
        for &n in surface.neighbors(here) {
            let diff = surface.elevation(n as usize) - height;
            diffs.push((surface.direction_to(here, n as usize), diff));
            total += diff.abs();
            if diff < 0.0 {
                in_pit = false;
            }
        }

        if total == 0.0 {
            return random_tangent(&mut self.rng, normal) * (0.5 * config.substitute_scale());
        }
        if in_pit {
            return Vec3::ZERO;
        }

        let mut gradient = Vec3::ZERO;
        for (dir, diff) in diffs {
            gradient += dir * (diff / total);
        }
        match gradient.try_normalized() {
            None => random_tangent(&mut self.rng, normal) * config.substitute_scale(),
            Some(g) => {
                if self.rng.gen_bool(0.5) {
                    let jitter = random_tangent(&mut self.rng, normal);
                    (g + jitter * 0.5).try_normalized().unwrap_or(g)
                } else {
                    g
                }
            }
        }
    }

    /// Neighbour whose direction best matches `heading`.
    fn next_region<S: ErosionSurface + ?Sized>(&self, surface: &S, heading: Vec3) -> Option<usize> {
        let mut best = None;
        let mut best_cos = f32::MIN;
        for &n in surface.neighbors(self.position) {
            let cos = surface.direction_to(self.position, n as usize).dot(heading);
            if cos > best_cos {
                best_cos = cos;
                best = Some(n as usize);
            }
        }
        best
    }

    /// Advance one step. Does nothing once the droplet is dead.
    pub fn step<S: ErosionSurface + ?Sized>(&mut self, surface: &S, config: &SimulationConfig) {
        if self.state == DropletState::Dead {
            return;
        }

        let gradient = self.gradient(surface, config);
        let new_direction = (self.direction * config.inertia - gradient * (1.0 - config.inertia))
            .try_normalized()
            .unwrap_or(self.direction);

        let Some(next) = self.next_region(surface, new_direction) else {
            // isolated region, nowhere to flow
            self.state = DropletState::Dead;
            return;
        };

        let height_diff = surface.elevation(next) - surface.elevation(self.position);
        self.hydraulic_action(surface, config, height_diff);

        let v2 = self.velocity * self.velocity - height_diff * config.gravity;
        let new_velocity = if v2 < 0.0 { 0.0 } else { v2.sqrt() };
        let new_volume = self.volume * (1.0 - config.evaporation);

        self.position = next;
        self.direction = new_direction;
        self.velocity = new_velocity;
        self.volume = new_volume;
        self.outcome.steps += 1;

        if self.velocity.is_nan() {
            self.state = DropletState::Dead;
            self.outcome.died_invalid = true;
        } else if config.min_volume.is_some_and(|min| self.volume < min) {
            let rest = self.sediment;
            if rest > 0.0 {
                self.deposit(surface, rest);
            }
            self.state = DropletState::Dead;
            self.outcome.evaporated = true;
        }
    }

    fn hydraulic_action<S: ErosionSurface + ?Sized>(&mut self, surface: &S, config: &SimulationConfig, height_diff: f32) {
        let capacity = (-height_diff * self.velocity * self.volume * config.capacity).max(config.min_erosion);

        if self.sediment > capacity || height_diff >= 0.0 {
            let amount = if height_diff > 0.0 {
                height_diff.min(self.sediment)
            } else {
                ((self.sediment - capacity) * config.deposition_rate).max(0.0)
            };
            if amount > 0.0 {
                self.deposit(surface, amount);
            }
        } else {
            let amount = ((capacity - self.sediment) * config.erosion_rate).min(-height_diff);
            for &(n, weight) in surface.erosion_weights(self.position) {
                surface.add_elevation(n as usize, -amount * weight);
            }
            self.sediment += amount;
            self.outcome.eroded += amount as f64;
            self.outcome.max_erosion = self.outcome.max_erosion.max(amount);
        }
    }

    fn deposit<S: ErosionSurface + ?Sized>(&mut self, surface: &S, amount: f32) {
        self.sediment -= amount;
        surface.add_elevation(self.position, amount);
        self.outcome.deposited += amount as f64;
        self.outcome.max_deposition = self.outcome.max_deposition.max(amount);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::elevation::seed_elevation;
    use crate::erosion::graph::ErosionGraph;
    use crate::fractal::NoiseConfig;
    use crate::mesh::{Mesh, Topology};
    use crate::region::RegionGraph;

    fn flat_hex(radius: usize) -> ErosionGraph {
        let regions = RegionGraph::from_mesh(Topology::Hex, &Mesh::build(Topology::Hex, 2));
        seed_elevation(&regions, &NoiseConfig::flat()).unwrap();
        ErosionGraph::new(regions, radius)
    }

    /// Hex disc sloping down towards +x.
    fn sloped_hex(depth: u32, radius: usize) -> ErosionGraph {
        let regions = RegionGraph::from_mesh(Topology::Hex, &Mesh::build(Topology::Hex, depth));
        for region in regions.regions() {
            let c = region.center();
            region.set_elevation(0.5 - 0.25 * c.x + 0.02 * (c.y * 7.0).sin());
        }
        ErosionGraph::new(regions, radius)
    }

    #[test]
    fn test_flat_terrain_escape() {
        let graph = flat_hex(0);
        let config = SimulationConfig { erosion_radius: 0, ..Default::default() };
        assert_eq!(graph.erosion_weights(0), &[(0, 1.0)]);

        let mut droplet = WaterDroplet::new(&graph, 0, 0, 7);
        let gradient = droplet.gradient(&graph, &config);
        assert!(gradient.length() > 0.0);
        assert_eq!(gradient.z, 0.0);

        let before = droplet.direction();
        droplet.step(&graph, &config);
        assert_ne!(droplet.direction(), before);
        assert!((droplet.direction().length() - 1.0).abs() < 1e-5);
        assert_eq!(droplet.state(), DropletState::Alive);
        // nothing to erode on level ground
        assert!(graph.regions().elevations().iter().all(|&h| h == 0.5));
    }

    #[test]
    fn test_flat_escape_with_zero_inertia() {
        let graph = flat_hex(0);
        let config = SimulationConfig { inertia: 0.0, ..Default::default() };
        let mut droplet = WaterDroplet::new(&graph, 0, 0, 1);
        assert!(droplet.gradient(&graph, &config).length() > 0.0);
        droplet.step(&graph, &config);
        assert!(droplet.direction().is_finite());
    }

    #[test]
    fn test_pit_gradient_is_zero() {
        let graph = flat_hex(0);
        graph.add_elevation(0, -0.25);
        let mut droplet = WaterDroplet::new(&graph, 0, 0, 3);
        assert_eq!(droplet.gradient(&graph, &SimulationConfig::default()), Vec3::ZERO);
    }

    #[test]
    fn test_cancelling_gradient_gets_full_substitute() {
        let graph = flat_hex(0);
        let config = SimulationConfig::default();
        // lower the two neighbours on the x axis so their pulls cancel
        let lowered: Vec<u32> = graph
            .neighbors(0)
            .iter()
            .copied()
            .filter(|&n| graph.center(n as usize).y == 0.0)
            .collect();
        assert_eq!(lowered.len(), 2);
        for &n in &lowered {
            graph.add_elevation(n as usize, -0.1);
        }

        for seed in 0..8 {
            let mut droplet = WaterDroplet::new(&graph, 0, 0, seed);
            let gradient = droplet.gradient(&graph, &config);
            assert!((gradient.length() - config.substitute_scale()).abs() < 1e-5, "{:?}", gradient);
            assert_eq!(gradient.z, 0.0);
        }
    }

    #[test]
    fn test_gradient_jitter_keeps_unit_length() {
        let graph = sloped_hex(3, 0);
        let config = SimulationConfig::default();

        let height = graph.elevation(0);
        let mut total = 0.0f32;
        let mut weighted = Vec3::ZERO;
        for &n in graph.neighbors(0) {
            let diff = graph.elevation(n as usize) - height;
            total += diff.abs();
            weighted += graph.direction_to(0, n as usize) * diff;
        }
        let plain = (weighted / total).normalized();

        let mut jittered = 0;
        for seed in 0..64 {
            let mut droplet = WaterDroplet::new(&graph, 0, 0, seed);
            let gradient = droplet.gradient(&graph, &config);
            assert!((gradient.length() - 1.0).abs() < 1e-5);
            if gradient.distance(plain) > 1e-4 {
                jittered += 1;
            }
        }
        assert!(jittered > 0 && jittered < 64, "jittered {} of 64", jittered);
    }

    #[test]
    fn test_batch_index_separates_shared_start() {
        let regions = RegionGraph::from_mesh(Topology::Hex, &Mesh::build(Topology::Hex, 3));
        seed_elevation(&regions, &NoiseConfig::flat()).unwrap();
        let graph = ErosionGraph::new(regions, 0);
        let config = SimulationConfig::default();

        let trace = |index: usize| {
            let mut droplet = WaterDroplet::new(&graph, 0, index, 42);
            let mut path = vec![(droplet.position(), droplet.direction())];
            for _ in 0..30 {
                droplet.step(&graph, &config);
                path.push((droplet.position(), droplet.direction()));
            }
            path
        };

        let first = trace(0);
        let second = trace(266);
        // same heading out of the start region, different draws afterwards
        assert_eq!(first[0], second[0]);
        assert_ne!(first, second);
        assert_eq!(first, trace(0));
    }

    #[test]
    fn test_initial_direction_is_tangent() {
        let regions = RegionGraph::from_mesh(Topology::Icosahedron, &Mesh::build(Topology::Icosahedron, 2));
        let graph = ErosionGraph::new(regions, 1);
        for start in [0usize, 5, 40, 100] {
            let droplet = WaterDroplet::new(&graph, start, 0, 11);
            let normal = graph.normal(start);
            assert!(droplet.direction().dot(normal).abs() < 1e-4);
            assert!((droplet.direction().length() - 1.0).abs() < 1e-5);
        }
    }

    #[test]
    fn test_mass_is_conserved_single_droplet() {
        let graph = sloped_hex(4, 2);
        let before = graph.regions().elevations();
        let outcome = WaterDroplet::new(&graph, 0, 0, 99).simulate(&graph, &SimulationConfig::default());
        let after = graph.regions().elevations();

        let delta: f64 = before.iter().zip(&after).map(|(&b, &a)| (a - b) as f64).sum();
        assert!(outcome.eroded > 0.0);
        assert!((delta + outcome.sediment as f64).abs() < 1e-4, "delta {} sediment {}", delta, outcome.sediment);
        assert!((outcome.eroded - outcome.deposited - outcome.sediment as f64).abs() < 1e-4);
    }

    #[test]
    fn test_single_droplet_is_deterministic() {
        let graph = sloped_hex(4, 2);
        let initial = graph.regions().elevations();
        let config = SimulationConfig::default();
        let start = 7;

        WaterDroplet::new(&graph, start, 0, 5).simulate(&graph, &config);
        let first = graph.regions().elevations();

        graph.regions().set_elevations(&initial);
        WaterDroplet::new(&graph, start, 0, 5).simulate(&graph, &config);
        let second = graph.regions().elevations();

        assert_eq!(first, second);
        assert_ne!(first, initial);
    }

    #[test]
    fn test_lifetime_bounds_steps() {
        let graph = sloped_hex(3, 1);
        let config = SimulationConfig { lifetime: 12, ..Default::default() };
        let outcome = WaterDroplet::new(&graph, 3, 0, 0).simulate(&graph, &config);
        assert_eq!(outcome.steps, 12);
        assert!(!outcome.died_invalid && !outcome.evaporated);
    }

    #[test]
    fn test_min_volume_policy_dumps_sediment() {
        let graph = sloped_hex(4, 1);
        let before = graph.regions().elevations();
        let config = SimulationConfig {
            evaporation: 0.5,
            min_volume: Some(0.01),
            ..Default::default()
        };
        let outcome = WaterDroplet::new(&graph, 0, 0, 2).simulate(&graph, &config);
        // 0.5^7 < 0.01 <= 0.5^6
        assert_eq!(outcome.steps, 7);
        assert!(outcome.evaporated);
        assert_eq!(outcome.sediment, 0.0);
        let delta: f64 = before
            .iter()
            .zip(graph.regions().elevations())
            .map(|(&b, a)| (a - b) as f64)
            .sum();
        assert!(delta.abs() < 1e-4);
    }

    #[test]
    fn test_nan_terrain_kills_droplet() {
        let graph = sloped_hex(2, 0);
        for region in graph.regions().regions() {
            region.set_elevation(f32::NAN);
        }
        let outcome = WaterDroplet::new(&graph, 0, 0, 0).simulate(&graph, &SimulationConfig::default());
        assert!(outcome.died_invalid);
        assert_eq!(outcome.steps, 1);
    }

    #[test]
    fn test_stream_seed_depends_on_index() {
        let c = Vec3::new(0.5, 0.25, 0.0);
        assert_ne!(stream_seed(1, 0, c), stream_seed(1, 1, c));
        assert_eq!(stream_seed(1, 3, c), stream_seed(1, 3, c));
        assert_ne!(stream_seed(1, 0, c), droplet_seed(1, c));
    }

    #[test]
    fn test_droplet_seed_depends_on_region() {
        let a = droplet_seed(1, Vec3::new(0.5, 0.25, 0.0));
        let b = droplet_seed(1, Vec3::new(0.25, 0.5, 0.0));
        assert_ne!(a, b);
        assert_eq!(a, droplet_seed(1, Vec3::new(0.5, 0.25, 0.0)));
        assert_ne!(a, droplet_seed(2, Vec3::new(0.5, 0.25, 0.0)));
    }
}
