//! Axis-aligned positioning force
//!
//! Pulls each node toward a target coordinate along one axis, like
//! `forceX`/`forceY` in d3-force.

use serde::{Deserialize, Serialize};

use crate::attribute::Attribute;
use crate::error::{SimulationError, SimulationResult};
use crate::kinetics::Kinetics;
use crate::vector::Vector;

/// Default pull strength
pub const DEFAULT_STRENGTH: f64 = 1.0;

/// Axis a [`PositionForce`] acts along
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    X,
    Y,
}

impl Direction {
    pub fn axis(self) -> usize {
        match self {
            Self::X => 0,
            Self::Y => 1,
        }
    }
}

#[derive(Debug, Clone)]
pub struct PositionForce {
    pub direction: Direction,
    /// Per-node target coordinate
    pub target: Attribute,
    /// Per-node strength
    pub strength: Attribute,
    targets: Vec<f64>,
    strengths: Vec<f64>,
}

impl PositionForce {
    pub fn new(direction: Direction, target: impl Into<Attribute>) -> Self {
        Self {
            direction,
            target: target.into(),
            strength: Attribute::Constant(DEFAULT_STRENGTH),
            targets: Vec::new(),
            strengths: Vec::new(),
        }
    }

    pub fn with_strength(mut self, strength: impl Into<Attribute>) -> Self {
        self.strength = strength.into();
        self
    }

    pub(crate) fn bind<V: Vector>(&mut self, kinetics: &Kinetics<V>) -> SimulationResult<()> {
        if self.direction.axis() >= V::DIM {
            return Err(SimulationError::InvalidAttribute {
                force: "position",
                attribute: "direction",
                index: 0,
                value: self.direction.axis() as f64,
            });
        }
        self.target.resolve_into(&mut self.targets, kinetics.len());
        self.strength.resolve_into(&mut self.strengths, kinetics.len());
        for (attribute, values) in [("target", &self.targets), ("strength", &self.strengths)] {
            if let Some((index, &value)) = values.iter().enumerate().find(|(_, v)| !v.is_finite()) {
                return Err(SimulationError::InvalidAttribute {
                    force: "position",
                    attribute,
                    index,
                    value,
                });
            }
        }
        Ok(())
    }

    pub(crate) fn apply<V: Vector>(&self, kinetics: &mut Kinetics<V>) {
        let axis = self.direction.axis();
        let alpha = kinetics.alpha();
        for (i, (position, velocity)) in kinetics
            .position
            .iter()
            .zip(kinetics.velocity.iter_mut())
            .enumerate()
        {
            let pull = (self.targets[i] - position.component(axis)) * self.strengths[i] * alpha;
            velocity.set_component(axis, velocity.component(axis) + pull);
        }
    }
}
