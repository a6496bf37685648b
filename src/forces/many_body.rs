//! Many-body force with the Barnes-Hut approximation
//!
//! Every node is pushed away from (or pulled toward, for positive strength)
//! every other node. A quadtree built over the current positions lets distant
//! clusters act as a single body at their centroid, bringing the cost down to
//! O(n log n). With `theta = 0` no cell is ever approximated and the result is
//! the exact pairwise sum.

use glam::DVec2;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::attribute::Attribute;
use crate::error::{SimulationError, SimulationResult};
use crate::forces::check_parameter;
use crate::kinetics::Kinetics;
use crate::quadtree::QuadTree;
use crate::vector::{SpatialVector, jiggle_vector};

/// Default strength (negative = repulsion, matches d3-force)
pub const DEFAULT_STRENGTH: f64 = -30.0;

/// Default Barnes-Hut theta (0 = exact, larger = coarser)
pub const DEFAULT_THETA: f64 = 0.9;

/// Default minimum distance; closer pairs are treated as this far apart
pub const DEFAULT_DISTANCE_MIN: f64 = 1.0;

/// Mixes a node index into the per-tick jitter seed
const SEED_STRIDE: u64 = 0x9e37_79b9_7f4a_7c15;

/// Repulsion (or attraction) between all pairs of nodes
#[derive(Debug, Clone)]
pub struct ManyBodyForce {
    /// Signed strength; negative repels, positive attracts
    pub strength: f64,
    /// Barnes-Hut accuracy threshold
    pub theta: f64,
    /// Per-node mass
    pub mass: Attribute,
    /// Pairs closer than this are clamped to it
    pub distance_min: f64,
    /// Pairs farther than this are ignored
    pub distance_max: f64,
    masses: Vec<f64>,
}

impl Default for ManyBodyForce {
    fn default() -> Self {
        Self {
            strength: DEFAULT_STRENGTH,
            theta: DEFAULT_THETA,
            mass: Attribute::Constant(1.0),
            distance_min: DEFAULT_DISTANCE_MIN,
            distance_max: f64::INFINITY,
            masses: Vec::new(),
        }
    }
}

impl ManyBodyForce {
    pub fn new(strength: f64) -> Self {
        Self {
            strength,
            ..Default::default()
        }
    }

    pub fn with_theta(mut self, theta: f64) -> Self {
        self.theta = theta;
        self
    }

    pub fn with_mass(mut self, mass: impl Into<Attribute>) -> Self {
        self.mass = mass.into();
        self
    }

    pub fn with_distance_min(mut self, distance_min: f64) -> Self {
        self.distance_min = distance_min;
        self
    }

    pub fn with_distance_max(mut self, distance_max: f64) -> Self {
        self.distance_max = distance_max;
        self
    }

    pub(crate) fn bind<V: SpatialVector>(&mut self, kinetics: &Kinetics<V>) -> SimulationResult<()> {
        let (strength, theta) = (self.strength, self.theta);
        let (min, max) = (self.distance_min, self.distance_max);
        check_parameter("many-body", "strength", strength, strength.is_finite())?;
        check_parameter("many-body", "theta", theta, theta.is_finite() && theta >= 0.0)?;
        check_parameter("many-body", "distance_min", min, min.is_finite() && min >= 0.0)?;
        // distance_max may be infinite
        check_parameter("many-body", "distance_max", max, max >= min)?;

        self.mass.resolve_into(&mut self.masses, kinetics.len());
        if let Some((index, &value)) = self
            .masses
            .iter()
            .enumerate()
            .find(|(_, m)| !(m.is_finite() && **m > 0.0))
        {
            return Err(SimulationError::InvalidAttribute {
                force: "many-body",
                attribute: "mass",
                index,
                value,
            });
        }
        Ok(())
    }

    pub(crate) fn apply<V: SpatialVector>(&mut self, kinetics: &mut Kinetics<V>) {
        if kinetics.len() < 2 {
            return;
        }

        let points = kinetics.position.iter().map(|p| p.planar()).collect();
        let mut tree = QuadTree::new(points);
        tree.accumulate_mass(&self.masses);

        let kernel = Kernel {
            tree: &tree,
            masses: &self.masses,
            strength: self.strength * kinetics.alpha(),
            theta_squared: self.theta * self.theta,
            distance_min_squared: self.distance_min * self.distance_min,
            distance_max_squared: self.distance_max * self.distance_max,
            seed: kinetics.rng.random(),
        };

        for (velocity, delta) in kinetics.velocity.iter_mut().zip(kernel.deltas()) {
            *velocity += V::from_planar(delta);
        }
    }
}

/// Per-tick read-only view used to compute every node's velocity delta
struct Kernel<'a> {
    tree: &'a QuadTree,
    masses: &'a [f64],
    /// `strength * alpha`
    strength: f64,
    theta_squared: f64,
    distance_min_squared: f64,
    distance_max_squared: f64,
    seed: u64,
}

impl Kernel<'_> {
    #[cfg(not(feature = "parallel"))]
    fn deltas(&self) -> Vec<DVec2> {
        (0..self.tree.len()).map(|i| self.delta(i)).collect()
    }

    #[cfg(feature = "parallel")]
    fn deltas(&self) -> Vec<DVec2> {
        use rayon::prelude::*;
        (0..self.tree.len())
            .into_par_iter()
            .map(|i| self.delta(i))
            .collect()
    }

    /// Velocity delta of node `i`
    fn delta(&self, i: usize) -> DVec2 {
        let tree = self.tree;
        let position = tree.point(i);
        let mut jitter = Jitter::new(self.seed ^ (i as u64).wrapping_mul(SEED_STRIDE));
        let mut force = DVec2::ZERO;

        tree.visit(|cell| {
            if !cell.is_leaf() {
                let offset = cell.centroid - position;
                let distance_squared = offset.length_squared();
                if cell.size * cell.size < self.theta_squared * distance_squared {
                    force += self.pull(offset, cell.mass, &mut jitter);
                    return false;
                }
                return true;
            }

            for j in tree.bucket(cell) {
                if j != i {
                    force += self.pull(tree.point(j) - position, self.masses[j], &mut jitter);
                }
            }
            false
        });

        force / self.masses[i]
    }

    /// Contribution of a body of `mass` at `offset` from the node
    fn pull(&self, mut offset: DVec2, mass: f64, jitter: &mut Jitter) -> DVec2 {
        let mut distance_squared = offset.length_squared();
        if distance_squared >= self.distance_max_squared {
            return DVec2::ZERO;
        }
        if distance_squared == 0.0 {
            offset = jitter.sample();
            distance_squared = offset.length_squared();
        }
        if distance_squared < self.distance_min_squared {
            distance_squared = (self.distance_min_squared * distance_squared).sqrt();
        }
        offset * (self.strength * mass / distance_squared)
    }
}

/// Lazily seeded jitter source, one per node and tick
struct Jitter {
    seed: u64,
    rng: Option<StdRng>,
}

impl Jitter {
    fn new(seed: u64) -> Self {
        Self { seed, rng: None }
    }

    fn sample(&mut self) -> DVec2 {
        let seed = self.seed;
        let rng = self.rng.get_or_insert_with(|| StdRng::seed_from_u64(seed));
        jiggle_vector(rng)
    }
}
