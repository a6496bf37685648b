//! Simulation driver
//!
//! Owns the kinetics and the force field and advances them tick by tick:
//! `update_alpha → apply forces → update_positions`. Every mutation takes
//! `&mut self`, so a tick can never race with an interactive edit.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tracing::{debug, trace, warn};

use crate::attribute::Attribute;
use crate::error::{SimulationError, SimulationResult};
use crate::forces::ForceField;
use crate::kinetics::{
    AlphaSchedule, DEFAULT_JITTER_SEED, Edge, KineticState, Kinetics, validate_edges,
};
use crate::quadtree::QuadTree;
use crate::vector::SpatialVector;

/// Alpha that [`Simulation::reheat`] raises the simulation to
pub const DEFAULT_REHEAT_ALPHA: f64 = 0.6;

/// Construction options besides the graph and the forces
#[derive(Debug, Clone)]
pub struct SimulationConfig<V> {
    pub schedule: AlphaSchedule,
    /// Seed of the jitter source used for coincident nodes
    pub seed: u64,
    /// Initial positions; phyllotaxis placement when absent
    pub position: Option<Vec<V>>,
    /// Initial velocities; zero when absent
    pub velocity: Option<Vec<V>>,
    /// Initial fixations; all free when absent
    pub fixation: Option<Vec<Option<V>>>,
}

impl<V> Default for SimulationConfig<V> {
    fn default() -> Self {
        Self {
            schedule: AlphaSchedule::default(),
            seed: DEFAULT_JITTER_SEED,
            position: None,
            velocity: None,
            fixation: None,
        }
    }
}

/// How long [`Simulation::run`] keeps ticking
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Ticks {
    /// Exactly this many ticks, unless already stable
    Iterations(usize),
    /// Until alpha drops below the threshold (`alpha_min` when `None`)
    UntilAlpha(Option<f64>),
}

/// Cooperative cancellation for [`Simulation::tick_until`]
///
/// Clones share the same flag, so one can be handed to another thread.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// A force-directed layout simulation
#[derive(Debug, Clone)]
pub struct Simulation<V> {
    kinetics: Kinetics<V>,
    force_field: ForceField<V>,
}

impl<V: SpatialVector> Simulation<V> {
    /// Build a simulation of `node_count` nodes.
    ///
    /// Fails if an edge endpoint or an initial state array does not match
    /// `node_count`, if the schedule is invalid, or if a force rejects its
    /// resolved attributes.
    pub fn new(
        node_count: usize,
        edges: Vec<Edge>,
        force_field: ForceField<V>,
        config: SimulationConfig<V>,
    ) -> SimulationResult<Self> {
        config.schedule.validate()?;
        validate_edges(&edges, node_count)?;
        check_length("position", node_count, config.position.as_ref())?;
        check_length("velocity", node_count, config.velocity.as_ref())?;
        check_length("fixation", node_count, config.fixation.as_ref())?;

        let states = (0..node_count).map(|i| {
            let mut state = match &config.position {
                Some(position) => KineticState::at(position[i]),
                None => KineticState::phyllotaxis(i),
            };
            if let Some(velocity) = &config.velocity {
                state.velocity = velocity[i];
            }
            if let Some(fixation) = &config.fixation {
                state.fixation = fixation[i];
            }
            state
        });
        let kinetics = Kinetics::from_states(states, edges, config.schedule, config.seed);

        let mut force_field = force_field;
        force_field.bind(&kinetics)?;

        debug!(
            nodes = kinetics.len(),
            edges = kinetics.links.len(),
            forces = force_field.len(),
            "Created simulation"
        );

        Ok(Self {
            kinetics,
            force_field,
        })
    }

    /// Advance `iterations` ticks. Does nothing once the simulation is stable.
    pub fn tick(&mut self, iterations: usize) {
        if self.is_stable() {
            return;
        }
        for _ in 0..iterations {
            self.step();
        }
    }

    /// Tick while alpha is at least `threshold` (`alpha_min` when `None`).
    ///
    /// The token is checked before every tick. Returns the number of ticks run.
    pub fn tick_until(&mut self, threshold: Option<f64>, cancel: &CancellationToken) -> usize {
        let threshold = threshold.unwrap_or(self.kinetics.schedule.alpha_min);
        let mut ticks = 0;
        while self.kinetics.alpha() >= threshold {
            if cancel.is_cancelled() {
                warn!(ticks, alpha = self.kinetics.alpha(), "Simulation cancelled");
                return ticks;
            }
            self.step();
            ticks += 1;
        }
        debug!(ticks, alpha = self.kinetics.alpha(), "Simulation converged");
        ticks
    }

    /// Run for the given duration and return the number of ticks run
    pub fn run(&mut self, ticks: Ticks, cancel: Option<&CancellationToken>) -> usize {
        match ticks {
            Ticks::Iterations(n) => {
                if self.is_stable() {
                    return 0;
                }
                self.tick(n);
                n
            }
            Ticks::UntilAlpha(threshold) => {
                let token = cancel.cloned().unwrap_or_default();
                self.tick_until(threshold, &token)
            }
        }
    }

    fn step(&mut self) {
        self.kinetics.update_alpha();
        self.force_field.apply(&mut self.kinetics);
        self.kinetics.update_positions();
        trace!(alpha = self.kinetics.alpha(), "Tick");
    }

    pub fn kinetics(&self) -> &Kinetics<V> {
        &self.kinetics
    }

    pub fn force_field(&self) -> &ForceField<V> {
        &self.force_field
    }

    pub fn node_count(&self) -> usize {
        self.kinetics.len()
    }

    pub fn edges(&self) -> &[Edge] {
        &self.kinetics.links
    }

    pub fn positions(&self) -> &[V] {
        &self.kinetics.position
    }

    pub fn velocities(&self) -> &[V] {
        &self.kinetics.velocity
    }

    pub fn fixations(&self) -> &[Option<V>] {
        &self.kinetics.fixation
    }

    pub fn schedule(&self) -> &AlphaSchedule {
        &self.kinetics.schedule
    }

    pub fn alpha(&self) -> f64 {
        self.kinetics.alpha()
    }

    pub fn set_alpha(&mut self, alpha: f64) -> SimulationResult<()> {
        if !alpha.is_finite() {
            return Err(SimulationError::InvalidSchedule(format!(
                "alpha must be finite, got {alpha}"
            )));
        }
        self.kinetics.schedule.alpha = alpha;
        Ok(())
    }

    /// Raise alpha to at least [`DEFAULT_REHEAT_ALPHA`]
    pub fn reheat(&mut self) {
        self.reheat_to(DEFAULT_REHEAT_ALPHA);
    }

    /// Raise alpha to at least `min_alpha`; never lowers it
    pub fn reheat_to(&mut self, min_alpha: f64) {
        let schedule = &mut self.kinetics.schedule;
        schedule.alpha = schedule.alpha.max(min_alpha);
    }

    pub fn is_stable(&self) -> bool {
        self.kinetics.schedule.is_stable()
    }

    /// Pin node `index` at `fixation`, or release it with `None`.
    ///
    /// The node moves to its fixation at the next integration step.
    pub fn set_fixation(&mut self, index: usize, fixation: Option<V>) -> SimulationResult<()> {
        let node_count = self.kinetics.len();
        let slot = self
            .kinetics
            .fixation
            .get_mut(index)
            .ok_or(SimulationError::NodeOutOfRange { index, node_count })?;
        *slot = fixation;
        Ok(())
    }

    /// The node nearest to `point` within `radius`, if any
    pub fn find_node(&self, point: V, radius: f64) -> Option<usize> {
        let points = self.kinetics.position.iter().map(|p| p.planar()).collect();
        QuadTree::new(points).find(point.planar(), radius)
    }

    /// The node whose own hit radius covers `point`, if any.
    ///
    /// Where hit areas overlap the highest index wins, since later nodes are
    /// drawn on top. Negative or NaN radii never match.
    pub fn find_node_with(&self, point: V, radius: impl Into<Attribute>) -> Option<usize> {
        let radii = radius.into().resolve(self.kinetics.len());
        let points = self.kinetics.position.iter().map(|p| p.planar()).collect();
        let mut tree = QuadTree::new(points);
        tree.accumulate_radius(&radii);
        tree.find_covering(point.planar(), &radii)
    }

    /// Warm-restart with a new node set, edge list and force field.
    ///
    /// `mapping[new]` names the old node whose position, velocity and
    /// fixation carry over into slot `new`; `None` slots are initialised by
    /// `emit(new)`. Old nodes not named by the mapping are dropped. Alpha is
    /// set to `alpha`; the rest of the schedule and the jitter source carry
    /// over. On error the simulation is left unchanged.
    pub fn revive(
        &mut self,
        mapping: &[Option<usize>],
        edges: Vec<Edge>,
        force_field: ForceField<V>,
        alpha: f64,
        emit: impl FnMut(usize) -> KineticState<V>,
    ) -> SimulationResult<()> {
        let mut kinetics = self.kinetics.remap(mapping, edges, emit)?;
        kinetics.schedule.alpha = alpha;
        kinetics.schedule.validate()?;

        let mut force_field = force_field;
        force_field.bind(&kinetics)?;

        debug!(
            old_nodes = self.kinetics.len(),
            nodes = kinetics.len(),
            carried = mapping.iter().filter(|m| m.is_some()).count(),
            edges = kinetics.links.len(),
            alpha,
            "Revived simulation"
        );

        self.kinetics = kinetics;
        self.force_field = force_field;
        Ok(())
    }

    /// [`Simulation::revive`] with new nodes at the origin, at rest and free
    pub fn revive_zeroed(
        &mut self,
        mapping: &[Option<usize>],
        edges: Vec<Edge>,
        force_field: ForceField<V>,
        alpha: f64,
    ) -> SimulationResult<()> {
        self.revive(mapping, edges, force_field, alpha, |_| KineticState::default())
    }
}

fn check_length<T>(field: &'static str, expected: usize, values: Option<&Vec<T>>) -> SimulationResult<()> {
    match values {
        Some(values) if values.len() != expected => Err(SimulationError::LengthMismatch {
            field,
            expected,
            actual: values.len(),
        }),
        _ => Ok(()),
    }
}
