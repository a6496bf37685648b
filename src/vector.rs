//! Vector abstraction for the simulation
//!
//! The kinetic state and the positional forces are written against [`Vector`]
//! only, so any dimensionality works for them. Forces that rely on a spatial
//! index (many-body, collide) additionally require [`SpatialVector`], which is
//! implemented for 2D vectors backed by the quadtree. A 3D layout would need an
//! octree before `DVec3` could implement it.

use std::fmt::Debug;
use std::ops::{Add, AddAssign, Mul, Sub, SubAssign};

use glam::{DVec2, DVec3};
use rand::Rng;

/// Magnitude of the random offset used to separate coincident points (matches d3-force)
pub const JIGGLE_SCALE: f64 = 1e-6;

/// A D-dimensional real vector.
pub trait Vector:
    Copy
    + Debug
    + PartialEq
    + Send
    + Sync
    + Add<Output = Self>
    + Sub<Output = Self>
    + Mul<f64, Output = Self>
    + AddAssign
    + SubAssign
{
    /// The zero vector
    const ZERO: Self;

    /// Number of components
    const DIM: usize;

    /// Squared Euclidean norm
    fn length_squared(self) -> f64;

    /// Euclidean norm
    fn length(self) -> f64 {
        self.length_squared().sqrt()
    }

    /// Read one component (0 = x, 1 = y, ...)
    fn component(self, axis: usize) -> f64;

    /// Overwrite one component
    fn set_component(&mut self, axis: usize, value: f64);

    /// True when no component is NaN or infinite
    fn is_finite(self) -> bool {
        (0..Self::DIM).all(|axis| self.component(axis).is_finite())
    }
}

/// A vector type the quadtree can partition.
pub trait SpatialVector: Vector {
    /// Project onto the plane the spatial index works in
    fn planar(self) -> DVec2;

    /// Lift a planar delta back into this vector type
    fn from_planar(planar: DVec2) -> Self;
}

impl Vector for DVec2 {
    const ZERO: Self = DVec2::ZERO;
    const DIM: usize = 2;

    fn length_squared(self) -> f64 {
        self.dot(self)
    }

    fn component(self, axis: usize) -> f64 {
        self[axis]
    }

    fn set_component(&mut self, axis: usize, value: f64) {
        self[axis] = value;
    }
}

impl SpatialVector for DVec2 {
    fn planar(self) -> DVec2 {
        self
    }

    fn from_planar(planar: DVec2) -> Self {
        planar
    }
}

impl Vector for DVec3 {
    const ZERO: Self = DVec3::ZERO;
    const DIM: usize = 3;

    fn length_squared(self) -> f64 {
        self.dot(self)
    }

    fn component(self, axis: usize) -> f64 {
        self[axis]
    }

    fn set_component(&mut self, axis: usize, value: f64) {
        self[axis] = value;
    }
}

/// A tiny random scalar in `[-JIGGLE_SCALE / 2, JIGGLE_SCALE / 2)`
pub(crate) fn jiggle<R: Rng + ?Sized>(rng: &mut R) -> f64 {
    (rng.random::<f64>() - 0.5) * JIGGLE_SCALE
}

/// A vector whose every component is jiggled
pub(crate) fn jiggle_vector<V: Vector, R: Rng + ?Sized>(rng: &mut R) -> V {
    let mut v = V::ZERO;
    for axis in 0..V::DIM {
        v.set_component(axis, jiggle(rng));
    }
    v
}
