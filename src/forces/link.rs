//! Spring force along edges
//!
//! Each edge pulls its endpoints toward a rest length. The correction is split
//! between the endpoints by degree so that hubs move less than leaves.

use std::fmt;
use std::sync::Arc;

use crate::error::{SimulationError, SimulationResult};
use crate::kinetics::{Edge, Kinetics};
use crate::link_lookup::LinkLookup;
use crate::vector::{Vector, jiggle_vector};

/// Default rest length
pub const DEFAULT_LENGTH: f64 = 30.0;

/// Default relaxation passes per tick
pub const DEFAULT_ITERATIONS: usize = 1;

/// Per-edge value computed from the edge and the graph's adjacency
pub type EdgeFn = Arc<dyn Fn(Edge, &LinkLookup) -> f64 + Send + Sync>;

/// How stiff each spring is
#[derive(Clone)]
pub enum LinkStiffness {
    /// Same stiffness on every edge
    Constant(f64),
    /// `f(edge) / min(degree(source), degree(target))`
    WeightedByDegree(EdgeFn),
}

impl LinkStiffness {
    /// Weighted by degree with a unit numerator
    pub fn weighted() -> Self {
        Self::weighted_by(|_, _| 1.0)
    }

    /// Weighted by degree with the numerator computed per edge
    pub fn weighted_by(f: impl Fn(Edge, &LinkLookup) -> f64 + Send + Sync + 'static) -> Self {
        Self::WeightedByDegree(Arc::new(f))
    }

    fn resolve(&self, edge: Edge, lookup: &LinkLookup) -> f64 {
        match self {
            Self::Constant(k) => *k,
            Self::WeightedByDegree(f) => {
                let degree = lookup.degree(edge.source).min(lookup.degree(edge.target));
                f(edge, lookup) / degree as f64
            }
        }
    }
}

impl Default for LinkStiffness {
    fn default() -> Self {
        Self::weighted()
    }
}

impl fmt::Debug for LinkStiffness {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Constant(k) => write!(f, "Constant({k:?})"),
            Self::WeightedByDegree(_) => f.write_str("WeightedByDegree(..)"),
        }
    }
}

/// Rest length of each spring
#[derive(Clone)]
pub enum LinkLength {
    Constant(f64),
    Varied(EdgeFn),
}

impl LinkLength {
    pub fn varied(f: impl Fn(Edge, &LinkLookup) -> f64 + Send + Sync + 'static) -> Self {
        Self::Varied(Arc::new(f))
    }

    fn resolve(&self, edge: Edge, lookup: &LinkLookup) -> f64 {
        match self {
            Self::Constant(length) => *length,
            Self::Varied(f) => f(edge, lookup),
        }
    }
}

impl Default for LinkLength {
    fn default() -> Self {
        Self::Constant(DEFAULT_LENGTH)
    }
}

impl fmt::Debug for LinkLength {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Constant(length) => write!(f, "Constant({length:?})"),
            Self::Varied(_) => f.write_str("Varied(..)"),
        }
    }
}

/// Spring force along every edge of the simulation
#[derive(Debug, Clone)]
pub struct LinkForce {
    pub stiffness: LinkStiffness,
    pub length: LinkLength,
    /// Relaxation passes per tick
    pub iterations: usize,
    lookup: LinkLookup,
    stiffnesses: Vec<f64>,
    lengths: Vec<f64>,
    biases: Vec<f64>,
}

impl Default for LinkForce {
    fn default() -> Self {
        Self {
            stiffness: LinkStiffness::default(),
            length: LinkLength::default(),
            iterations: DEFAULT_ITERATIONS,
            lookup: LinkLookup::new(0, &[]),
            stiffnesses: Vec::new(),
            lengths: Vec::new(),
            biases: Vec::new(),
        }
    }
}

impl LinkForce {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_stiffness(mut self, stiffness: LinkStiffness) -> Self {
        self.stiffness = stiffness;
        self
    }

    pub fn with_length(mut self, length: LinkLength) -> Self {
        self.length = length;
        self
    }

    pub fn with_iterations(mut self, iterations: usize) -> Self {
        self.iterations = iterations;
        self
    }

    /// Adjacency of the graph this force was last bound to
    pub fn lookup(&self) -> &LinkLookup {
        &self.lookup
    }

    pub(crate) fn bind<V: Vector>(&mut self, kinetics: &Kinetics<V>) -> SimulationResult<()> {
        let lookup = LinkLookup::new(kinetics.len(), &kinetics.links);
        let links = &kinetics.links;

        let stiffnesses: Vec<f64> = links
            .iter()
            .map(|&edge| self.stiffness.resolve(edge, &lookup))
            .collect();
        let lengths: Vec<f64> = links
            .iter()
            .map(|&edge| self.length.resolve(edge, &lookup))
            .collect();

        if let Some((index, &value)) = stiffnesses.iter().enumerate().find(|(_, k)| !k.is_finite()) {
            return Err(invalid("stiffness", index, value));
        }
        if let Some((index, &value)) = lengths
            .iter()
            .enumerate()
            .find(|(_, l)| !(l.is_finite() && **l >= 0.0))
        {
            return Err(invalid("length", index, value));
        }

        self.biases = links.iter().map(|&edge| lookup.bias(edge)).collect();
        self.stiffnesses = stiffnesses;
        self.lengths = lengths;
        self.lookup = lookup;
        Ok(())
    }

    pub(crate) fn apply<V: Vector>(&mut self, kinetics: &mut Kinetics<V>) {
        let alpha = kinetics.alpha();
        for _ in 0..self.iterations {
            for (i, edge) in kinetics.links.iter().enumerate() {
                let (s, t) = (edge.source, edge.target);
                let mut offset = (kinetics.position[t] + kinetics.velocity[t])
                    - (kinetics.position[s] + kinetics.velocity[s]);
                if offset.length_squared() == 0.0 {
                    offset = jiggle_vector(&mut kinetics.rng);
                }
                let distance = offset.length();
                let k = (distance - self.lengths[i]) / distance * alpha * self.stiffnesses[i];
                let correction = offset * k;
                let bias = self.biases[i];
                kinetics.velocity[t] -= correction * bias;
                kinetics.velocity[s] += correction * (1.0 - bias);
            }
        }
    }
}

fn invalid(attribute: &'static str, index: usize, value: f64) -> SimulationError {
    SimulationError::InvalidAttribute {
        force: "link",
        attribute,
        index,
        value,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kinetics::{AlphaSchedule, DEFAULT_JITTER_SEED, KineticState};
    use glam::DVec2;

    fn kinetics(points: &[DVec2], links: Vec<Edge>) -> Kinetics<DVec2> {
        Kinetics::from_states(
            points.iter().map(|p| KineticState::at(*p)),
            links,
            AlphaSchedule::default(),
            DEFAULT_JITTER_SEED,
        )
    }

    #[test]
    fn stretched_link_pulls_endpoints_together() {
        let mut k = kinetics(
            &[DVec2::new(-30.0, 0.0), DVec2::new(30.0, 0.0)],
            vec![Edge::new(0, 1)],
        );
        let mut force = LinkForce::new().with_stiffness(LinkStiffness::Constant(1.0));
        force.bind(&k).unwrap();
        force.apply(&mut k);

        // (60 - 30) / 60 * 60 = 30, split evenly
        assert_eq!(k.velocity[0], DVec2::new(15.0, 0.0));
        assert_eq!(k.velocity[1], DVec2::new(-15.0, 0.0));
    }

    #[test]
    fn compressed_link_pushes_endpoints_apart() {
        let mut k = kinetics(
            &[DVec2::new(-10.0, 0.0), DVec2::new(10.0, 0.0)],
            vec![Edge::new(0, 1)],
        );
        let mut force = LinkForce::new().with_stiffness(LinkStiffness::Constant(1.0));
        force.bind(&k).unwrap();
        force.apply(&mut k);

        assert_eq!(k.velocity[0], DVec2::new(-5.0, 0.0));
        assert_eq!(k.velocity[1], DVec2::new(5.0, 0.0));
    }

    #[test]
    fn hub_moves_less_than_leaves() {
        let mut k = kinetics(
            &[
                DVec2::ZERO,
                DVec2::new(100.0, 0.0),
                DVec2::new(0.0, 100.0),
                DVec2::new(-100.0, 0.0),
            ],
            vec![Edge::new(1, 0), Edge::new(2, 0), Edge::new(3, 0)],
        );
        let mut force = LinkForce::new().with_stiffness(LinkStiffness::Constant(1.0));
        force.bind(&k).unwrap();
        force.apply(&mut k);

        // The first leaf bears 3/4 of its 70-unit correction
        assert!((k.velocity[1] - DVec2::new(-52.5, 0.0)).length() < 1e-9);
        assert!(k.velocity[0].length() < k.velocity[1].length());
    }

    #[test]
    fn default_stiffness_is_weighted_by_degree() {
        let k = kinetics(
            &[DVec2::ZERO, DVec2::X, DVec2::Y],
            vec![Edge::new(0, 1), Edge::new(0, 2)],
        );
        let mut force = LinkForce::new();
        force.bind(&k).unwrap();
        assert_eq!(force.stiffnesses, vec![1.0, 1.0]);

        let mut custom = LinkForce::new()
            .with_stiffness(LinkStiffness::weighted_by(|_, _| 4.0));
        custom.bind(&k).unwrap();
        assert_eq!(custom.stiffnesses, vec![4.0, 4.0]);
    }

    #[test]
    fn varied_lengths_see_the_edge() {
        let k = kinetics(
            &[DVec2::ZERO, DVec2::X, DVec2::Y],
            vec![Edge::new(0, 1), Edge::new(1, 2)],
        );
        let mut force = LinkForce::new().with_length(LinkLength::varied(|edge, lookup| {
            10.0 * (edge.source + lookup.degree(edge.target)) as f64
        }));
        force.bind(&k).unwrap();
        assert_eq!(force.lengths, vec![20.0, 20.0]);
    }

    #[test]
    fn coincident_endpoints_are_jittered() {
        let mut k = kinetics(&[DVec2::ONE, DVec2::ONE], vec![Edge::new(0, 1)]);
        let mut force = LinkForce::new();
        force.bind(&k).unwrap();
        force.apply(&mut k);
        assert!(k.velocity.iter().all(|v| v.is_finite()));
        assert!(k.velocity[0].length() > 0.0);
    }

    #[test]
    fn negative_length_is_rejected() {
        let k = kinetics(&[DVec2::ZERO, DVec2::X], vec![Edge::new(0, 1)]);
        let mut force = LinkForce::new().with_length(LinkLength::Constant(-1.0));
        assert!(matches!(
            force.bind(&k),
            Err(SimulationError::InvalidAttribute {
                force: "link",
                attribute: "length",
                ..
            })
        ));
    }

    #[test]
    fn iterations_repeat_the_relaxation() {
        let points = [DVec2::new(-30.0, 0.0), DVec2::new(30.0, 0.0)];
        let mut once = kinetics(&points, vec![Edge::new(0, 1)]);
        let mut twice = once.clone();

        let mut force = LinkForce::new().with_stiffness(LinkStiffness::Constant(0.5));
        force.bind(&once).unwrap();
        force.apply(&mut once);

        let mut force = LinkForce::new()
            .with_stiffness(LinkStiffness::Constant(0.5))
            .with_iterations(2);
        force.bind(&twice).unwrap();
        force.apply(&mut twice);

        assert!(twice.velocity[0].x > once.velocity[0].x);
    }
}
