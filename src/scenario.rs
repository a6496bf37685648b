//! Scenario files
//!
//! A scenario describes a graph, an alpha schedule and an ordered force
//! stack, and is loaded from YAML or JSON depending on the file extension.
//! Every field except the graph has a default matching the library defaults.

use std::fs;
use std::path::Path;

use glam::DVec2;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::attribute::Attribute;
use crate::error::SimulationError;
use crate::forces::{
    CenterForce, CollideForce, Direction, ForceField, LinkForce, LinkLength, LinkStiffness,
    ManyBodyForce, PositionForce, RadialForce, center, collide, link, many_body, position, radial,
};
use crate::kinetics::{AlphaSchedule, DEFAULT_JITTER_SEED, Edge};
use crate::simulation::{Simulation, SimulationConfig, Ticks};

/// Errors that can occur while loading, saving or building a scenario
#[derive(Error, Debug)]
pub enum ScenarioError {
    /// An I/O error occurred
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The file could not be parsed or serialized
    #[error("parse error: {0}")]
    Parse(String),

    /// The file extension is neither YAML nor JSON
    #[error("could not determine scenario format from path: {0}")]
    UnknownExtension(String),

    /// A per-node attribute list does not match the node count
    #[error("{force} force: {attribute} lists {actual} values for {expected} nodes")]
    AttributeLength {
        force: &'static str,
        attribute: &'static str,
        expected: usize,
        actual: usize,
    },

    /// The simulation rejected the scenario
    #[error(transparent)]
    Simulation(#[from] SimulationError),
}

/// Result type for scenario operations
pub type ScenarioResult<T> = Result<T, ScenarioError>;

/// Scenario file format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Yaml,
    Json,
}

impl Format {
    /// Pick the format from a path's extension
    pub fn from_path(path: &Path) -> ScenarioResult<Self> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or_default()
            .to_ascii_lowercase();
        match ext.as_str() {
            "yaml" | "yml" => Ok(Self::Yaml),
            "json" => Ok(Self::Json),
            _ => Err(ScenarioError::UnknownExtension(path.display().to_string())),
        }
    }
}

/// The node and edge set of a scenario
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum GraphSpec {
    /// An explicit node count and edge list
    Explicit {
        nodes: usize,
        #[serde(default)]
        edges: Vec<Edge>,
    },
    /// A `width` x `width` grid with edges between horizontal and vertical neighbours
    Lattice { width: usize },
    /// `segments` triangles-in-a-row closed into three concentric rings
    Ring { segments: usize },
}

impl GraphSpec {
    pub fn node_count(&self) -> usize {
        match self {
            Self::Explicit { nodes, .. } => *nodes,
            Self::Lattice { width } => width * width,
            Self::Ring { segments } => 3 * segments,
        }
    }

    pub fn edges(&self) -> Vec<Edge> {
        match self {
            Self::Explicit { edges, .. } => edges.clone(),
            Self::Lattice { width } => {
                let w = *width;
                let mut edges = Vec::with_capacity(2 * w * w.saturating_sub(1));
                for i in 0..w {
                    for j in 0..w {
                        if j + 1 != w {
                            edges.push(Edge::new(w * i + j, w * i + j + 1));
                        }
                        if i + 1 != w {
                            edges.push(Edge::new(w * i + j, w * (i + 1) + j));
                        }
                    }
                }
                edges
            }
            Self::Ring { segments } => {
                let n = *segments;
                let mut edges = Vec::with_capacity(5 * n);
                for i in 0..n {
                    let next = (i + 1) % n;
                    edges.push(Edge::new(3 * i, 3 * i + 1));
                    edges.push(Edge::new(3 * i + 1, 3 * i + 2));
                    for lane in 0..3 {
                        edges.push(Edge::new(3 * i + lane, 3 * next + lane));
                    }
                }
                edges
            }
        }
    }
}

/// Where nodes start when the scenario does not pin them
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InitialLayout {
    /// Every node at the origin; forces separate them with jitter
    Zero,
    /// d3-force's sunflower spiral
    #[default]
    Phyllotaxis,
}

/// A per-node scalar: one value for all nodes, or one value per node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttributeSpec {
    Constant(f64),
    PerNode(Vec<f64>),
}

impl AttributeSpec {
    fn resolve(
        &self,
        force: &'static str,
        attribute: &'static str,
        node_count: usize,
    ) -> ScenarioResult<Attribute> {
        match self {
            Self::Constant(value) => Ok(Attribute::Constant(*value)),
            Self::PerNode(values) if values.len() == node_count => {
                Ok(Attribute::per_node(values.clone(), 0.0))
            }
            Self::PerNode(values) => Err(ScenarioError::AttributeLength {
                force,
                attribute,
                expected: node_count,
                actual: values.len(),
            }),
        }
    }
}

impl From<f64> for AttributeSpec {
    fn from(value: f64) -> Self {
        Self::Constant(value)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CenterSpec {
    pub x: f64,
    pub y: f64,
    pub strength: f64,
}

impl Default for CenterSpec {
    fn default() -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            strength: center::DEFAULT_STRENGTH,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ManyBodySpec {
    pub strength: f64,
    pub theta: f64,
    pub mass: AttributeSpec,
    pub distance_min: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub distance_max: Option<f64>,
}

impl Default for ManyBodySpec {
    fn default() -> Self {
        Self {
            strength: many_body::DEFAULT_STRENGTH,
            theta: many_body::DEFAULT_THETA,
            mass: AttributeSpec::Constant(1.0),
            distance_min: many_body::DEFAULT_DISTANCE_MIN,
            distance_max: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LinkSpec {
    pub original_length: f64,
    /// Numerator of the stiffness; divided by the smaller endpoint degree
    /// when `weighted_by_degree` is set
    pub stiffness: f64,
    pub weighted_by_degree: bool,
    pub iterations_per_tick: usize,
}

impl Default for LinkSpec {
    fn default() -> Self {
        Self {
            original_length: link::DEFAULT_LENGTH,
            stiffness: 1.0,
            weighted_by_degree: true,
            iterations_per_tick: link::DEFAULT_ITERATIONS,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CollideSpec {
    pub strength: f64,
    pub radius: AttributeSpec,
    pub iterations_per_tick: usize,
}

impl Default for CollideSpec {
    fn default() -> Self {
        Self {
            strength: collide::DEFAULT_STRENGTH,
            radius: AttributeSpec::Constant(collide::DEFAULT_RADIUS),
            iterations_per_tick: 1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PositionSpec {
    pub direction: Direction,
    pub target: AttributeSpec,
    pub strength: AttributeSpec,
}

impl Default for PositionSpec {
    fn default() -> Self {
        Self {
            direction: Direction::X,
            target: AttributeSpec::Constant(0.0),
            strength: AttributeSpec::Constant(position::DEFAULT_STRENGTH),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RadialSpec {
    pub center: DVec2,
    pub radius: AttributeSpec,
    pub strength: AttributeSpec,
}

impl Default for RadialSpec {
    fn default() -> Self {
        Self {
            center: DVec2::ZERO,
            radius: AttributeSpec::Constant(radial::DEFAULT_RADIUS),
            strength: AttributeSpec::Constant(radial::DEFAULT_STRENGTH),
        }
    }
}

/// One entry of the scenario's force stack
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ForceSpec {
    Center(CenterSpec),
    ManyBody(ManyBodySpec),
    Link(LinkSpec),
    Collide(CollideSpec),
    Position(PositionSpec),
    Radial(RadialSpec),
}

impl ForceSpec {
    fn build(&self, node_count: usize, field: &mut ForceField<DVec2>) -> ScenarioResult<()> {
        match self {
            Self::Center(spec) => {
                field.push(CenterForce::new(DVec2::new(spec.x, spec.y)).with_strength(spec.strength));
            }
            Self::ManyBody(spec) => {
                let mut force = ManyBodyForce::new(spec.strength)
                    .with_theta(spec.theta)
                    .with_mass(spec.mass.resolve("many-body", "mass", node_count)?)
                    .with_distance_min(spec.distance_min);
                if let Some(distance_max) = spec.distance_max {
                    force = force.with_distance_max(distance_max);
                }
                field.push(force);
            }
            Self::Link(spec) => {
                let k = spec.stiffness;
                let stiffness = if spec.weighted_by_degree {
                    LinkStiffness::weighted_by(move |_, _| k)
                } else {
                    LinkStiffness::Constant(k)
                };
                field.push(
                    LinkForce::new()
                        .with_stiffness(stiffness)
                        .with_length(LinkLength::Constant(spec.original_length))
                        .with_iterations(spec.iterations_per_tick),
                );
            }
            Self::Collide(spec) => {
                field.push(
                    CollideForce::new(spec.radius.resolve("collide", "radius", node_count)?)
                        .with_strength(spec.strength)
                        .with_iterations(spec.iterations_per_tick),
                );
            }
            Self::Position(spec) => {
                field.push(
                    PositionForce::new(
                        spec.direction,
                        spec.target.resolve("position", "target", node_count)?,
                    )
                    .with_strength(spec.strength.resolve("position", "strength", node_count)?),
                );
            }
            Self::Radial(spec) => {
                field.push(
                    RadialForce::new(
                        spec.center,
                        spec.radius.resolve("radial", "radius", node_count)?,
                    )
                    .with_strength(spec.strength.resolve("radial", "strength", node_count)?),
                );
            }
        }
        Ok(())
    }
}

fn default_seed() -> u64 {
    DEFAULT_JITTER_SEED
}

/// A complete, serializable simulation setup
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scenario {
    pub graph: GraphSpec,
    #[serde(default)]
    pub schedule: AlphaSchedule,
    #[serde(default = "default_seed")]
    pub seed: u64,
    #[serde(default)]
    pub initial_layout: InitialLayout,
    /// Applied in order every tick
    #[serde(default)]
    pub forces: Vec<ForceSpec>,
    /// Tick count; run until stable when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ticks: Option<usize>,
}

impl Scenario {
    /// A scenario over `graph` with default schedule and no forces
    pub fn new(graph: GraphSpec) -> Self {
        Self {
            graph,
            schedule: AlphaSchedule::default(),
            seed: DEFAULT_JITTER_SEED,
            initial_layout: InitialLayout::default(),
            forces: Vec::new(),
            ticks: None,
        }
    }

    /// Square grid held together by short springs and weak repulsion
    pub fn lattice(width: usize) -> Self {
        let mut scenario = Self::new(GraphSpec::Lattice { width });
        scenario.forces = vec![
            ForceSpec::Link(LinkSpec {
                original_length: 0.8,
                ..Default::default()
            }),
            ForceSpec::ManyBody(ManyBodySpec {
                strength: -0.8,
                ..Default::default()
            }),
        ];
        scenario
    }

    /// Three concentric rings of `segments` nodes each
    pub fn ring(segments: usize) -> Self {
        let mut scenario = Self::new(GraphSpec::Ring { segments });
        scenario.forces = vec![
            ForceSpec::ManyBody(ManyBodySpec {
                strength: -15.0,
                ..Default::default()
            }),
            ForceSpec::Link(LinkSpec::default()),
            ForceSpec::Center(CenterSpec::default()),
        ];
        scenario
    }

    /// Load a scenario, choosing the parser from the file extension
    pub fn load(path: &Path) -> ScenarioResult<Self> {
        let format = Format::from_path(path)?;
        let content = fs::read_to_string(path)?;
        let scenario = match format {
            Format::Yaml => Self::from_yaml(&content)?,
            Format::Json => Self::from_json(&content)?,
        };
        debug!(path = %path.display(), nodes = scenario.graph.node_count(), "Loaded scenario");
        Ok(scenario)
    }

    /// Write the scenario, choosing the format from the file extension
    pub fn save(&self, path: &Path) -> ScenarioResult<()> {
        let content = match Format::from_path(path)? {
            Format::Yaml => self.to_yaml()?,
            Format::Json => self.to_json()?,
        };
        fs::write(path, content)?;
        Ok(())
    }

    pub fn from_yaml(content: &str) -> ScenarioResult<Self> {
        serde_yaml::from_str(content).map_err(|e| ScenarioError::Parse(e.to_string()))
    }

    pub fn from_json(content: &str) -> ScenarioResult<Self> {
        serde_json::from_str(content).map_err(|e| ScenarioError::Parse(e.to_string()))
    }

    pub fn to_yaml(&self) -> ScenarioResult<String> {
        serde_yaml::to_string(self).map_err(|e| ScenarioError::Parse(e.to_string()))
    }

    pub fn to_json(&self) -> ScenarioResult<String> {
        serde_json::to_string_pretty(self).map_err(|e| ScenarioError::Parse(e.to_string()))
    }

    /// How long the scenario asks to be run
    pub fn duration(&self) -> Ticks {
        match self.ticks {
            Some(n) => Ticks::Iterations(n),
            None => Ticks::UntilAlpha(None),
        }
    }

    /// Build the simulation this scenario describes
    pub fn build(&self) -> ScenarioResult<Simulation<DVec2>> {
        let node_count = self.graph.node_count();
        let mut field = ForceField::new();
        for spec in &self.forces {
            spec.build(node_count, &mut field)?;
        }

        let position = match self.initial_layout {
            InitialLayout::Zero => Some(vec![DVec2::ZERO; node_count]),
            InitialLayout::Phyllotaxis => None,
        };
        let config = SimulationConfig {
            schedule: self.schedule,
            seed: self.seed,
            position,
            ..Default::default()
        };
        Ok(Simulation::new(node_count, self.graph.edges(), field, config)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn format_follows_extension() {
        assert_eq!(Format::from_path(Path::new("a.yaml")).unwrap(), Format::Yaml);
        assert_eq!(Format::from_path(Path::new("a.YML")).unwrap(), Format::Yaml);
        assert_eq!(Format::from_path(Path::new("a.json")).unwrap(), Format::Json);
        assert!(matches!(
            Format::from_path(Path::new("a.toml")),
            Err(ScenarioError::UnknownExtension(_))
        ));
        assert!(Format::from_path(Path::new("scenario")).is_err());
    }

    #[test]
    fn lattice_has_grid_edges() {
        let graph = GraphSpec::Lattice { width: 4 };
        assert_eq!(graph.node_count(), 16);
        let edges = graph.edges();
        assert_eq!(edges.len(), 2 * 4 * 3);
        assert_eq!(edges[0], Edge::new(0, 1));
        assert_eq!(edges[1], Edge::new(0, 4));
        assert!(edges.iter().all(|e| e.source < 16 && e.target < 16));
    }

    #[test]
    fn ring_closes_every_lane() {
        let graph = GraphSpec::Ring { segments: 20 };
        assert_eq!(graph.node_count(), 60);
        let edges = graph.edges();
        assert_eq!(edges.len(), 100);
        assert!(edges.contains(&Edge::new(57, 0)));
        assert!(edges.contains(&Edge::new(59, 2)));
    }

    #[test]
    fn yaml_fills_in_defaults() {
        let scenario = Scenario::from_yaml(
            r#"
graph:
  kind: explicit
  nodes: 3
  edges:
    - { source: 0, target: 1 }
    - { source: 1, target: 2 }
schedule:
  alpha_decay: 0.05
forces:
  - type: many_body
    strength: -50
  - type: link
  - type: collide
    radius: [1, 2, 3]
  - type: position
    direction: y
    target: 10
ticks: 25
"#,
        )
        .unwrap();

        assert_eq!(scenario.graph.node_count(), 3);
        assert_eq!(scenario.schedule.alpha_decay, 0.05);
        assert_eq!(scenario.schedule.alpha_min, 1e-3);
        assert_eq!(scenario.seed, DEFAULT_JITTER_SEED);
        assert_eq!(scenario.initial_layout, InitialLayout::Phyllotaxis);
        assert_eq!(scenario.duration(), Ticks::Iterations(25));
        assert_eq!(
            scenario.forces[0],
            ForceSpec::ManyBody(ManyBodySpec {
                strength: -50.0,
                ..Default::default()
            })
        );
        assert_eq!(scenario.forces[1], ForceSpec::Link(LinkSpec::default()));
        assert_eq!(
            scenario.forces[2],
            ForceSpec::Collide(CollideSpec {
                radius: AttributeSpec::PerNode(vec![1.0, 2.0, 3.0]),
                ..Default::default()
            })
        );

        let sim = scenario.build().unwrap();
        assert_eq!(sim.node_count(), 3);
        assert_eq!(sim.force_field().len(), 4);
    }

    #[test]
    fn ring_scenario_serializes_as_json() {
        let json = Scenario::ring(20).to_json().unwrap();
        insta::assert_snapshot!(json, @r#"
        {
          "graph": {
            "kind": "ring",
            "segments": 20
          },
          "schedule": {
            "alpha": 1.0,
            "alpha_min": 0.001,
            "alpha_decay": 0.01,
            "alpha_target": 0.0,
            "velocity_decay": 0.6
          },
          "seed": 117000938941541,
          "initial_layout": "phyllotaxis",
          "forces": [
            {
              "type": "many_body",
              "strength": -15.0,
              "theta": 0.9,
              "mass": 1.0,
              "distance_min": 1.0
            },
            {
              "type": "link",
              "original_length": 30.0,
              "stiffness": 1.0,
              "weighted_by_degree": true,
              "iterations_per_tick": 1
            },
            {
              "type": "center",
              "x": 0.0,
              "y": 0.0,
              "strength": 0.5
            }
          ]
        }
        "#);
    }

    #[test]
    fn yaml_round_trip_preserves_the_scenario() {
        let scenario = Scenario::lattice(5);
        let parsed = Scenario::from_yaml(&scenario.to_yaml().unwrap()).unwrap();
        assert_eq!(parsed, scenario);
    }

    #[test]
    fn per_node_attribute_length_is_checked() {
        let mut scenario = Scenario::new(GraphSpec::Explicit {
            nodes: 3,
            edges: vec![],
        });
        scenario.forces.push(ForceSpec::Radial(RadialSpec {
            radius: AttributeSpec::PerNode(vec![1.0, 2.0]),
            ..Default::default()
        }));

        let err = scenario.build().unwrap_err();
        assert_eq!(
            err.to_string(),
            "radial force: radius lists 2 values for 3 nodes"
        );
    }

    #[test]
    fn simulation_errors_pass_through() {
        let scenario = Scenario::new(GraphSpec::Explicit {
            nodes: 2,
            edges: vec![Edge::new(0, 7)],
        });
        assert!(matches!(
            scenario.build(),
            Err(ScenarioError::Simulation(SimulationError::EdgeOutOfRange { .. }))
        ));
    }

    #[test]
    fn non_finite_force_settings_fail_to_build() {
        let scenario = Scenario::from_yaml(
            r#"
graph:
  kind: explicit
  nodes: 3
forces:
  - type: center
    x: .inf
"#,
        )
        .unwrap();
        assert!(matches!(
            scenario.build(),
            Err(ScenarioError::Simulation(SimulationError::InvalidParameter {
                force: "center",
                ..
            }))
        ));

        let scenario = Scenario::from_yaml(
            r#"
graph:
  kind: explicit
  nodes: 3
forces:
  - type: many_body
    strength: .nan
"#,
        )
        .unwrap();
        assert!(matches!(
            scenario.build(),
            Err(ScenarioError::Simulation(SimulationError::InvalidParameter {
                force: "many-body",
                parameter: "strength",
                ..
            }))
        ));
    }

    #[test]
    fn load_and_save_through_files() {
        let dir = tempfile::tempdir().unwrap();
        let yaml = dir.path().join("ring.yaml");
        let json = dir.path().join("ring.json");

        let scenario = Scenario::ring(4);
        scenario.save(&yaml).unwrap();
        scenario.save(&json).unwrap();

        assert_eq!(Scenario::load(&yaml).unwrap(), scenario);
        assert_eq!(Scenario::load(&json).unwrap(), scenario);
    }

    #[test]
    fn fixture_scenario_loads() {
        let scenario = Scenario::load(&PathBuf::from("tests/fixtures/two_nodes.yaml")).unwrap();
        assert_eq!(scenario.graph.node_count(), 2);
        assert!(scenario.build().is_ok());
    }
}
