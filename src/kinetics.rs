//! Kinetic state of all nodes plus the alpha cooling schedule
//!
//! Positions, velocities and fixations are dense arrays indexed by node
//! index. The driver mutates them once per tick; resizing only happens when
//! the simulation is revived with a new node set.

use rand::SeedableRng;
use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};

use crate::error::{SimulationError, SimulationResult};
use crate::vector::Vector;

// =============================================================================
// Default Constants
// =============================================================================

/// Default initial alpha
pub const DEFAULT_ALPHA: f64 = 1.0;

/// Default minimum alpha; the simulation is stable once alpha drops below it
pub const DEFAULT_ALPHA_MIN: f64 = 1e-3;

/// Default alpha decay per tick
pub const DEFAULT_ALPHA_DECAY: f64 = 1e-2;

/// Default alpha target
pub const DEFAULT_ALPHA_TARGET: f64 = 0.0;

/// Default velocity decay (friction applied before integrating)
pub const DEFAULT_VELOCITY_DECAY: f64 = 0.6;

/// Default seed for the jitter source
pub const DEFAULT_JITTER_SEED: u64 = 0x6a69_6767_6c65;

/// Initial radius of the phyllotaxis placement (matches d3-force)
const PHYLLOTAXIS_RADIUS: f64 = 10.0;

/// An edge between two node indices. Direction is irrelevant to the forces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Edge {
    pub source: usize,
    pub target: usize,
}

impl Edge {
    pub fn new(source: usize, target: usize) -> Self {
        Self { source, target }
    }
}

impl From<(usize, usize)> for Edge {
    fn from((source, target): (usize, usize)) -> Self {
        Self::new(source, target)
    }
}

/// Check that every edge endpoint lies in `[0, node_count)`
pub(crate) fn validate_edges(edges: &[Edge], node_count: usize) -> SimulationResult<()> {
    for (i, edge) in edges.iter().enumerate() {
        for node in [edge.source, edge.target] {
            if node >= node_count {
                return Err(SimulationError::EdgeOutOfRange {
                    edge: i,
                    node,
                    node_count,
                });
            }
        }
    }
    Ok(())
}

/// State of a single node
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KineticState<V> {
    pub position: V,
    pub velocity: V,
    pub fixation: Option<V>,
}

impl<V: Vector> KineticState<V> {
    /// A free node at rest at `position`
    pub fn at(position: V) -> Self {
        Self {
            position,
            velocity: V::ZERO,
            fixation: None,
        }
    }

    /// A node pinned at `position`
    pub fn fixed_at(position: V) -> Self {
        Self {
            position,
            velocity: V::ZERO,
            fixation: Some(position),
        }
    }

    /// The d3-force default placement: node `index` on a phyllotaxis spiral
    /// in the plane of the first two axes
    pub fn phyllotaxis(index: usize) -> Self {
        let angle_step = std::f64::consts::PI * (3.0 - 5.0_f64.sqrt());
        let radius = PHYLLOTAXIS_RADIUS * (0.5 + index as f64).sqrt();
        let angle = index as f64 * angle_step;

        let mut position = V::ZERO;
        position.set_component(0, radius * angle.cos());
        if V::DIM > 1 {
            position.set_component(1, radius * angle.sin());
        }
        Self::at(position)
    }
}

impl<V: Vector> Default for KineticState<V> {
    fn default() -> Self {
        Self::at(V::ZERO)
    }
}

/// The alpha cooling schedule
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AlphaSchedule {
    /// Current alpha (simulation "temperature")
    pub alpha: f64,
    /// The simulation is stable once alpha is below this value
    pub alpha_min: f64,
    /// Fraction of the distance to `alpha_target` covered each tick
    pub alpha_decay: f64,
    /// Value alpha converges to
    pub alpha_target: f64,
    /// Velocity multiplier applied before integrating positions
    pub velocity_decay: f64,
}

impl Default for AlphaSchedule {
    fn default() -> Self {
        Self {
            alpha: DEFAULT_ALPHA,
            alpha_min: DEFAULT_ALPHA_MIN,
            alpha_decay: DEFAULT_ALPHA_DECAY,
            alpha_target: DEFAULT_ALPHA_TARGET,
            velocity_decay: DEFAULT_VELOCITY_DECAY,
        }
    }
}

impl AlphaSchedule {
    /// Reject schedules that would produce non-finite values or diverge
    pub fn validate(&self) -> SimulationResult<()> {
        let values = [
            ("alpha", self.alpha),
            ("alpha_min", self.alpha_min),
            ("alpha_decay", self.alpha_decay),
            ("alpha_target", self.alpha_target),
            ("velocity_decay", self.velocity_decay),
        ];
        if let Some((name, value)) = values.iter().find(|(_, v)| !v.is_finite()) {
            return Err(SimulationError::InvalidSchedule(format!(
                "{name} must be finite, got {value}"
            )));
        }
        if !(0.0..=1.0).contains(&self.alpha_decay) {
            return Err(SimulationError::InvalidSchedule(format!(
                "alpha_decay must be in [0, 1], got {}",
                self.alpha_decay
            )));
        }
        if !(0.0..=1.0).contains(&self.velocity_decay) {
            return Err(SimulationError::InvalidSchedule(format!(
                "velocity_decay must be in [0, 1], got {}",
                self.velocity_decay
            )));
        }
        Ok(())
    }

    /// Move alpha one step toward `alpha_target`
    pub fn advance(&mut self) {
        self.alpha += (self.alpha_target - self.alpha) * self.alpha_decay;
    }

    /// True once alpha has dropped below `alpha_min`
    pub fn is_stable(&self) -> bool {
        self.alpha < self.alpha_min
    }
}

/// Dense kinetic state of every node, the edge list and the alpha schedule
#[derive(Debug, Clone)]
pub struct Kinetics<V> {
    pub position: Vec<V>,
    pub velocity: Vec<V>,
    pub fixation: Vec<Option<V>>,
    pub links: Vec<Edge>,
    pub schedule: AlphaSchedule,
    /// Jitter source for degenerate geometry
    pub(crate) rng: StdRng,
}

impl<V: Vector> Kinetics<V> {
    /// Kinetics for `count` nodes at rest at the origin
    pub fn zeros(count: usize, links: Vec<Edge>, schedule: AlphaSchedule, seed: u64) -> Self {
        Self {
            position: vec![V::ZERO; count],
            velocity: vec![V::ZERO; count],
            fixation: vec![None; count],
            links,
            schedule,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Kinetics built from per-node states
    pub fn from_states(
        states: impl IntoIterator<Item = KineticState<V>>,
        links: Vec<Edge>,
        schedule: AlphaSchedule,
        seed: u64,
    ) -> Self {
        let mut kinetics = Self::zeros(0, links, schedule, seed);
        for state in states {
            kinetics.push(state);
        }
        kinetics
    }

    fn push(&mut self, state: KineticState<V>) {
        self.position.push(state.position);
        self.velocity.push(state.velocity);
        self.fixation.push(state.fixation);
    }

    /// Number of nodes
    pub fn len(&self) -> usize {
        self.position.len()
    }

    pub fn is_empty(&self) -> bool {
        self.position.is_empty()
    }

    /// Current alpha
    pub fn alpha(&self) -> f64 {
        self.schedule.alpha
    }

    /// Snapshot of one node's state
    pub fn state(&self, index: usize) -> KineticState<V> {
        KineticState {
            position: self.position[index],
            velocity: self.velocity[index],
            fixation: self.fixation[index],
        }
    }

    /// Advance the cooling schedule by one tick
    pub fn update_alpha(&mut self) {
        self.schedule.advance();
    }

    /// Integrate positions from velocities.
    ///
    /// Free nodes are damped by `velocity_decay` and then moved; fixed nodes
    /// are snapped to their fixation with zero velocity.
    pub fn update_positions(&mut self) {
        let decay = self.schedule.velocity_decay;
        for ((position, velocity), fixation) in self
            .position
            .iter_mut()
            .zip(self.velocity.iter_mut())
            .zip(self.fixation.iter())
        {
            match fixation {
                Some(fixed) => {
                    *velocity = V::ZERO;
                    *position = *fixed;
                }
                None => {
                    *velocity = *velocity * decay;
                    *position += *velocity;
                }
            }
        }
    }

    /// Build the kinetics of a revived node set.
    ///
    /// `mapping[new]` names the old index whose state carries over into slot
    /// `new`; `None` slots are filled by `emit(new)`. The alpha schedule and
    /// jitter source continue from `self`.
    pub(crate) fn remap(
        &self,
        mapping: &[Option<usize>],
        links: Vec<Edge>,
        mut emit: impl FnMut(usize) -> KineticState<V>,
    ) -> SimulationResult<Self> {
        let old_count = self.len();
        let mut claimed: Vec<Option<usize>> = vec![None; old_count];
        for (new_index, old) in mapping.iter().enumerate() {
            let Some(old_index) = *old else { continue };
            if old_index >= old_count {
                return Err(SimulationError::MappingOutOfRange {
                    new_index,
                    old_index,
                    old_count,
                });
            }
            if let Some(first) = claimed[old_index] {
                return Err(SimulationError::DuplicateMapping {
                    old_index,
                    first,
                    second: new_index,
                });
            }
            claimed[old_index] = Some(new_index);
        }
        validate_edges(&links, mapping.len())?;

        let states = mapping
            .iter()
            .enumerate()
            .map(|(new_index, old)| match *old {
                Some(old_index) => self.state(old_index),
                None => emit(new_index),
            })
            .collect::<Vec<_>>();

        let mut revived = Self::from_states(states, links, self.schedule, 0);
        revived.rng = self.rng.clone();
        Ok(revived)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::DVec2;

    fn two_nodes() -> Kinetics<DVec2> {
        Kinetics::from_states(
            [
                KineticState::at(DVec2::new(0.0, 0.0)),
                KineticState::at(DVec2::new(10.0, 0.0)),
            ],
            vec![Edge::new(0, 1)],
            AlphaSchedule::default(),
            DEFAULT_JITTER_SEED,
        )
    }

    #[test]
    fn default_schedule_matches_reference_values() {
        let schedule = AlphaSchedule::default();
        assert_eq!(schedule.alpha, 1.0);
        assert_eq!(schedule.alpha_min, 1e-3);
        assert_eq!(schedule.alpha_decay, 1e-2);
        assert_eq!(schedule.alpha_target, 0.0);
        assert_eq!(schedule.velocity_decay, 0.6);
        assert!(schedule.validate().is_ok());
    }

    #[test]
    fn alpha_moves_toward_target() {
        let mut schedule = AlphaSchedule {
            alpha: 1.0,
            alpha_target: 0.5,
            alpha_decay: 0.1,
            ..Default::default()
        };
        schedule.advance();
        assert!((schedule.alpha - 0.95).abs() < 1e-12);

        let mut rising = AlphaSchedule {
            alpha: 0.0,
            alpha_target: 1.0,
            alpha_decay: 0.5,
            ..Default::default()
        };
        rising.advance();
        assert_eq!(rising.alpha, 0.5);
    }

    #[test]
    fn invalid_schedules_are_rejected() {
        let bad_decay = AlphaSchedule {
            alpha_decay: 1.5,
            ..Default::default()
        };
        assert!(matches!(
            bad_decay.validate(),
            Err(SimulationError::InvalidSchedule(_))
        ));

        let nan_alpha = AlphaSchedule {
            alpha: f64::NAN,
            ..Default::default()
        };
        assert!(nan_alpha.validate().is_err());

        let bad_velocity = AlphaSchedule {
            velocity_decay: -0.1,
            ..Default::default()
        };
        assert!(bad_velocity.validate().is_err());
    }

    #[test]
    fn free_nodes_integrate_damped_velocity() {
        let mut kinetics = two_nodes();
        kinetics.velocity[0] = DVec2::new(10.0, -5.0);
        kinetics.update_positions();

        assert_eq!(kinetics.velocity[0], DVec2::new(6.0, -3.0));
        assert_eq!(kinetics.position[0], DVec2::new(6.0, -3.0));
        assert_eq!(kinetics.position[1], DVec2::new(10.0, 0.0));
    }

    #[test]
    fn fixed_nodes_snap_to_fixation() {
        let mut kinetics = two_nodes();
        kinetics.fixation[1] = Some(DVec2::new(3.0, 4.0));
        kinetics.velocity[1] = DVec2::new(100.0, 100.0);
        kinetics.update_positions();

        assert_eq!(kinetics.position[1], DVec2::new(3.0, 4.0));
        assert_eq!(kinetics.velocity[1], DVec2::ZERO);
    }

    #[test]
    fn phyllotaxis_places_distinct_points() {
        let points: Vec<DVec2> = (0..50)
            .map(|i| KineticState::<DVec2>::phyllotaxis(i).position)
            .collect();
        for i in 0..points.len() {
            for j in (i + 1)..points.len() {
                assert!(points[i].distance(points[j]) > 1.0);
            }
        }
        // First node sits at radius 10 * sqrt(0.5)
        assert!((points[0].length() - 10.0 * 0.5_f64.sqrt()).abs() < 1e-12);
    }

    #[test]
    fn edges_out_of_range_are_rejected() {
        let edges = vec![Edge::new(0, 1), Edge::new(1, 5)];
        assert_eq!(
            validate_edges(&edges, 3),
            Err(SimulationError::EdgeOutOfRange {
                edge: 1,
                node: 5,
                node_count: 3
            })
        );
        assert!(validate_edges(&edges, 6).is_ok());
    }

    #[test]
    fn remap_carries_state_and_emits_new_nodes() {
        let mut kinetics = two_nodes();
        kinetics.velocity[1] = DVec2::new(1.0, 2.0);
        kinetics.fixation[0] = Some(DVec2::new(0.0, 0.0));

        let revived = kinetics
            .remap(&[Some(1), None, Some(0)], vec![Edge::new(0, 2)], |i| {
                KineticState::at(DVec2::splat(i as f64))
            })
            .unwrap();

        assert_eq!(revived.len(), 3);
        assert_eq!(revived.state(0), kinetics.state(1));
        assert_eq!(revived.state(1), KineticState::at(DVec2::splat(1.0)));
        assert_eq!(revived.state(2), kinetics.state(0));
        assert_eq!(revived.links, vec![Edge::new(0, 2)]);
    }

    #[test]
    fn remap_rejects_bad_mappings() {
        let kinetics = two_nodes();
        let emit = |_: usize| KineticState::<DVec2>::default();

        assert_eq!(
            kinetics.remap(&[Some(2)], vec![], emit).unwrap_err(),
            SimulationError::MappingOutOfRange {
                new_index: 0,
                old_index: 2,
                old_count: 2
            }
        );
        assert_eq!(
            kinetics
                .remap(&[Some(0), Some(0)], vec![], emit)
                .unwrap_err(),
            SimulationError::DuplicateMapping {
                old_index: 0,
                first: 0,
                second: 1
            }
        );
        assert!(matches!(
            kinetics.remap(&[None], vec![Edge::new(0, 1)], emit),
            Err(SimulationError::EdgeOutOfRange { .. })
        ));
    }
}
