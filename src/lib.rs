//! forcelayout - force-directed graph layout.
//!
//! Nodes are point masses moved by a composable stack of forces (many-body
//! repulsion, springs along edges, collision, centering and positional
//! constraints). A cooling schedule ("alpha") damps the system tick by tick
//! until it settles into a stable layout.
//!
//! ```
//! use forcelayout::{Edge, ForceField, LinkForce, ManyBodyForce, Simulation, SimulationConfig};
//! use glam::DVec2;
//!
//! let forces = ForceField::new()
//!     .with(ManyBodyForce::default())
//!     .with(LinkForce::new());
//! let mut simulation = Simulation::<DVec2>::new(
//!     3,
//!     vec![Edge::new(0, 1), Edge::new(1, 2)],
//!     forces,
//!     SimulationConfig::default(),
//! )
//! .unwrap();
//!
//! simulation.tick(100);
//! assert!(simulation.positions().iter().all(|p| p.is_finite()));
//! ```

pub mod attribute;
pub mod error;
pub mod forces;
pub mod kinetics;
pub mod layout;
pub mod link_lookup;
pub mod quadtree;
pub mod scenario;
pub mod simulation;
pub mod vector;

pub use attribute::Attribute;
pub use error::{SimulationError, SimulationResult};
pub use forces::{
    CenterForce, CollideForce, Direction, Force, ForceField, LinkForce, LinkLength, LinkStiffness,
    ManyBodyForce, PositionForce, RadialForce,
};
pub use kinetics::{AlphaSchedule, Edge, KineticState, Kinetics};
pub use layout::LayoutSnapshot;
pub use link_lookup::LinkLookup;
pub use quadtree::QuadTree;
pub use scenario::{Scenario, ScenarioError, ScenarioResult};
pub use simulation::{CancellationToken, Simulation, SimulationConfig, Ticks};
pub use vector::{SpatialVector, Vector};
