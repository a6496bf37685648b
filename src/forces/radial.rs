//! Radial force: pulls nodes toward a circle around a center point

use crate::attribute::Attribute;
use crate::error::{SimulationError, SimulationResult};
use crate::forces::check_point;
use crate::kinetics::Kinetics;
use crate::vector::{Vector, jiggle_vector};

/// Default pull strength
pub const DEFAULT_STRENGTH: f64 = 1.0;

/// Default ring radius
pub const DEFAULT_RADIUS: f64 = 3.0;

#[derive(Debug, Clone)]
pub struct RadialForce<V> {
    pub center: V,
    /// Per-node target distance from `center`
    pub radius: Attribute,
    /// Per-node strength
    pub strength: Attribute,
    radii: Vec<f64>,
    strengths: Vec<f64>,
}

impl<V: Vector> Default for RadialForce<V> {
    fn default() -> Self {
        Self::new(V::ZERO, DEFAULT_RADIUS)
    }
}

impl<V: Vector> RadialForce<V> {
    pub fn new(center: V, radius: impl Into<Attribute>) -> Self {
        Self {
            center,
            radius: radius.into(),
            strength: Attribute::Constant(DEFAULT_STRENGTH),
            radii: Vec::new(),
            strengths: Vec::new(),
        }
    }

    pub fn with_strength(mut self, strength: impl Into<Attribute>) -> Self {
        self.strength = strength.into();
        self
    }

    pub(crate) fn bind(&mut self, kinetics: &Kinetics<V>) -> SimulationResult<()> {
        check_point("radial", "center", self.center)?;
        self.radius.resolve_into(&mut self.radii, kinetics.len());
        self.strength.resolve_into(&mut self.strengths, kinetics.len());
        if let Some((index, &value)) = self
            .radii
            .iter()
            .enumerate()
            .find(|(_, r)| !(r.is_finite() && **r >= 0.0))
        {
            return Err(invalid("radius", index, value));
        }
        if let Some((index, &value)) = self.strengths.iter().enumerate().find(|(_, s)| !s.is_finite()) {
            return Err(invalid("strength", index, value));
        }
        Ok(())
    }

    pub(crate) fn apply(&self, kinetics: &mut Kinetics<V>) {
        let alpha = kinetics.alpha();
        for i in 0..kinetics.len() {
            let mut offset = kinetics.position[i] - self.center;
            if offset.length_squared() == 0.0 {
                offset = jiggle_vector(&mut kinetics.rng);
            }
            let distance = offset.length();
            let k = (self.radii[i] - distance) * self.strengths[i] * alpha / distance;
            kinetics.velocity[i] += offset * k;
        }
    }
}

fn invalid(attribute: &'static str, index: usize, value: f64) -> SimulationError {
    SimulationError::InvalidAttribute {
        force: "radial",
        attribute,
        index,
        value,
    }
}
