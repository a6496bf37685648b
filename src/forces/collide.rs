//! Collision force: keeps nodes from overlapping
//!
//! Nodes are treated as circles. Overlapping pairs are pushed apart along the
//! line between their predicted positions (`position + velocity`), with the
//! smaller circle moving more. A quadtree carrying the largest radius of each
//! cell prunes pairs that cannot touch.

use glam::DVec2;

use crate::attribute::Attribute;
use crate::error::{SimulationError, SimulationResult};
use crate::forces::check_parameter;
use crate::kinetics::Kinetics;
use crate::quadtree::QuadTree;
use crate::vector::{SpatialVector, jiggle_vector};

/// Default radius of every node
pub const DEFAULT_RADIUS: f64 = 3.0;

/// Default fraction of the overlap resolved per pass
pub const DEFAULT_STRENGTH: f64 = 0.5;

/// Collision resolution between overlapping circles
#[derive(Debug, Clone)]
pub struct CollideForce {
    /// Per-node radius
    pub radius: Attribute,
    /// Fraction of the overlap resolved per iteration, in `[0, 1]`
    pub strength: f64,
    /// Passes per tick
    pub iterations: usize,
    radii: Vec<f64>,
}

impl Default for CollideForce {
    fn default() -> Self {
        Self {
            radius: Attribute::Constant(DEFAULT_RADIUS),
            strength: DEFAULT_STRENGTH,
            iterations: 1,
            radii: Vec::new(),
        }
    }
}

impl CollideForce {
    pub fn new(radius: impl Into<Attribute>) -> Self {
        Self {
            radius: radius.into(),
            ..Default::default()
        }
    }

    pub fn with_strength(mut self, strength: f64) -> Self {
        self.strength = strength;
        self
    }

    pub fn with_iterations(mut self, iterations: usize) -> Self {
        self.iterations = iterations;
        self
    }

    pub(crate) fn bind<V: SpatialVector>(&mut self, kinetics: &Kinetics<V>) -> SimulationResult<()> {
        let strength = self.strength;
        check_parameter("collide", "strength", strength, (0.0..=1.0).contains(&strength))?;

        self.radius.resolve_into(&mut self.radii, kinetics.len());
        if let Some((index, &value)) = self
            .radii
            .iter()
            .enumerate()
            .find(|(_, r)| !(r.is_finite() && **r >= 0.0))
        {
            return Err(SimulationError::InvalidAttribute {
                force: "collide",
                attribute: "radius",
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
        for _ in 0..self.iterations {
            self.relax(kinetics);
        }
    }

    fn relax<V: SpatialVector>(&self, kinetics: &mut Kinetics<V>) {
        let predicted = kinetics
            .position
            .iter()
            .zip(&kinetics.velocity)
            .map(|(p, v)| (*p + *v).planar())
            .collect();
        let mut tree = QuadTree::new(predicted);
        tree.accumulate_radius(&self.radii);

        let radii = &self.radii;
        let strength = self.strength;
        let Kinetics {
            position,
            velocity,
            rng,
            ..
        } = kinetics;

        for i in 0..tree.len() {
            let ri = radii[i];
            let ri2 = ri * ri;
            let xi = tree.point(i);

            tree.visit(|cell| {
                let reach = ri + cell.radius;
                if !cell.is_leaf() {
                    let lo = cell.origin;
                    let hi = cell.max();
                    return !(lo.x > xi.x + reach
                        || hi.x < xi.x - reach
                        || lo.y > xi.y + reach
                        || hi.y < xi.y - reach);
                }

                for j in tree.bucket(cell).filter(|&j| j > i) {
                    let rj = radii[j];
                    let r = ri + rj;
                    let mut offset = xi - (position[j] + velocity[j]).planar();
                    let mut distance_squared = offset.length_squared();
                    if distance_squared >= r * r {
                        continue;
                    }
                    if distance_squared == 0.0 {
                        offset = jiggle_vector::<DVec2, _>(&mut *rng);
                        distance_squared = offset.length_squared();
                    }
                    let distance = distance_squared.sqrt();
                    let push = offset * ((r - distance) / distance * strength);
                    let rj2 = rj * rj;
                    let share = if ri2 + rj2 > 0.0 { rj2 / (ri2 + rj2) } else { 0.5 };
                    velocity[i] += V::from_planar(push * share);
                    velocity[j] -= V::from_planar(push * (1.0 - share));
                }
                false
            });
        }
    }
}
