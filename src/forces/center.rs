//! Centering force
//!
//! Translates the whole layout so its mean position drifts toward a target
//! point. Every node receives the same velocity delta, so relative positions
//! are untouched.

use crate::error::SimulationResult;
use crate::forces::{check_parameter, check_point};
use crate::kinetics::Kinetics;
use crate::vector::Vector;

/// Default fraction of the centroid offset corrected per tick
pub const DEFAULT_STRENGTH: f64 = 0.5;

/// Pulls the centroid of all nodes toward `center`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CenterForce<V> {
    pub center: V,
    pub strength: f64,
}

impl<V: Vector> Default for CenterForce<V> {
    fn default() -> Self {
        Self {
            center: V::ZERO,
            strength: DEFAULT_STRENGTH,
        }
    }
}

impl<V: Vector> CenterForce<V> {
    pub fn new(center: V) -> Self {
        Self {
            center,
            ..Default::default()
        }
    }

    pub fn with_strength(mut self, strength: f64) -> Self {
        self.strength = strength;
        self
    }

    pub(crate) fn bind(&self) -> SimulationResult<()> {
        check_point("center", "center", self.center)?;
        check_parameter("center", "strength", self.strength, self.strength.is_finite())
    }

    pub(crate) fn apply(&self, kinetics: &mut Kinetics<V>) {
        if kinetics.is_empty() {
            return;
        }
        let sum = kinetics
            .position
            .iter()
            .fold(V::ZERO, |acc, p| acc + *p);
        let mean = sum * (1.0 / kinetics.len() as f64);
        let shift = (self.center - mean) * self.strength;
        for velocity in &mut kinetics.velocity {
            *velocity += shift;
        }
    }
}
