//! Forces and their composition
//!
//! A [`Force`] reads the current kinetics and adds velocity deltas in place.
//! The [`ForceField`] applies its forces in registration order, so each force
//! observes the deltas written by the ones before it within the same tick.
//!
//! Forces are bound once per construction or revive: per-node attributes are
//! resolved into dense arrays and validated there, never mid-tick.

pub mod center;
pub mod collide;
pub mod link;
pub mod many_body;
pub mod position;
pub mod radial;

pub use center::CenterForce;
pub use collide::CollideForce;
pub use link::{LinkForce, LinkLength, LinkStiffness};
pub use many_body::ManyBodyForce;
pub use position::{Direction, PositionForce};
pub use radial::RadialForce;

use crate::error::{SimulationError, SimulationResult};
use crate::kinetics::Kinetics;
use crate::vector::{SpatialVector, Vector};

/// One force of a [`ForceField`]
#[derive(Debug, Clone)]
pub enum Force<V> {
    Center(CenterForce<V>),
    ManyBody(ManyBodyForce),
    Link(LinkForce),
    Collide(CollideForce),
    Position(PositionForce),
    Radial(RadialForce<V>),
}

impl<V: SpatialVector> Force<V> {
    /// Short name used in logs and errors
    pub fn name(&self) -> &'static str {
        match self {
            Self::Center(_) => "center",
            Self::ManyBody(_) => "many-body",
            Self::Link(_) => "link",
            Self::Collide(_) => "collide",
            Self::Position(_) => "position",
            Self::Radial(_) => "radial",
        }
    }

    /// Resolve attributes against the current node and edge set
    pub fn bind(&mut self, kinetics: &Kinetics<V>) -> SimulationResult<()> {
        match self {
            Self::Center(force) => force.bind(),
            Self::ManyBody(force) => force.bind(kinetics),
            Self::Link(force) => force.bind(kinetics),
            Self::Collide(force) => force.bind(kinetics),
            Self::Position(force) => force.bind(kinetics),
            Self::Radial(force) => force.bind(kinetics),
        }
    }

    /// Add this force's velocity deltas to `kinetics`
    pub fn apply(&mut self, kinetics: &mut Kinetics<V>) {
        match self {
            Self::Center(force) => force.apply(kinetics),
            Self::ManyBody(force) => force.apply(kinetics),
            Self::Link(force) => force.apply(kinetics),
            Self::Collide(force) => force.apply(kinetics),
            Self::Position(force) => force.apply(kinetics),
            Self::Radial(force) => force.apply(kinetics),
        }
    }
}

impl<V> From<CenterForce<V>> for Force<V> {
    fn from(force: CenterForce<V>) -> Self {
        Self::Center(force)
    }
}

impl<V> From<ManyBodyForce> for Force<V> {
    fn from(force: ManyBodyForce) -> Self {
        Self::ManyBody(force)
    }
}

impl<V> From<LinkForce> for Force<V> {
    fn from(force: LinkForce) -> Self {
        Self::Link(force)
    }
}

impl<V> From<CollideForce> for Force<V> {
    fn from(force: CollideForce) -> Self {
        Self::Collide(force)
    }
}

impl<V> From<PositionForce> for Force<V> {
    fn from(force: PositionForce) -> Self {
        Self::Position(force)
    }
}

impl<V> From<RadialForce<V>> for Force<V> {
    fn from(force: RadialForce<V>) -> Self {
        Self::Radial(force)
    }
}

/// An ordered stack of forces
#[derive(Debug, Clone)]
pub struct ForceField<V> {
    forces: Vec<Force<V>>,
}

impl<V> Default for ForceField<V> {
    fn default() -> Self {
        Self { forces: Vec::new() }
    }
}

impl<V: SpatialVector> ForceField<V> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a force; it runs after every force already registered
    pub fn with(mut self, force: impl Into<Force<V>>) -> Self {
        self.push(force);
        self
    }

    pub fn push(&mut self, force: impl Into<Force<V>>) {
        self.forces.push(force.into());
    }

    pub fn forces(&self) -> &[Force<V>] {
        &self.forces
    }

    pub fn len(&self) -> usize {
        self.forces.len()
    }

    pub fn is_empty(&self) -> bool {
        self.forces.is_empty()
    }

    /// Bind every force, stopping at the first invalid one
    pub fn bind(&mut self, kinetics: &Kinetics<V>) -> SimulationResult<()> {
        for force in &mut self.forces {
            force.bind(kinetics)?;
        }
        Ok(())
    }

    /// Apply every force in registration order
    pub fn apply(&mut self, kinetics: &mut Kinetics<V>) {
        for force in &mut self.forces {
            force.apply(kinetics);
        }
    }
}

impl<V> From<Vec<Force<V>>> for ForceField<V> {
    fn from(forces: Vec<Force<V>>) -> Self {
        Self { forces }
    }
}

/// Reject a scalar setting unless `valid` holds
pub(crate) fn check_parameter(
    force: &'static str,
    parameter: &'static str,
    value: f64,
    valid: bool,
) -> SimulationResult<()> {
    if valid {
        Ok(())
    } else {
        Err(SimulationError::InvalidParameter {
            force,
            parameter,
            value,
        })
    }
}

/// Reject a point with a non-finite component
pub(crate) fn check_point<V: Vector>(
    force: &'static str,
    parameter: &'static str,
    point: V,
) -> SimulationResult<()> {
    for axis in 0..V::DIM {
        let value = point.component(axis);
        check_parameter(force, parameter, value, value.is_finite())?;
    }
    Ok(())
}
