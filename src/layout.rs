//! Layout snapshots
//!
//! The JSON document handed to a renderer: one `[x, y]` pair per node, in
//! node index order, plus the alpha at the time of the snapshot.

use std::fs;
use std::path::Path;

use glam::DVec2;
use serde::{Deserialize, Serialize};

use crate::scenario::{ScenarioError, ScenarioResult};
use crate::simulation::Simulation;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayoutSnapshot {
    pub alpha: f64,
    /// Ticks run to produce this layout
    pub ticks: usize,
    pub positions: Vec<DVec2>,
}

impl LayoutSnapshot {
    pub fn from_simulation(simulation: &Simulation<DVec2>, ticks: usize) -> Self {
        Self {
            alpha: simulation.alpha(),
            ticks,
            positions: simulation.positions().to_vec(),
        }
    }

    pub fn to_json(&self) -> ScenarioResult<String> {
        serde_json::to_string_pretty(self).map_err(|e| ScenarioError::Parse(e.to_string()))
    }

    /// Write the snapshot as pretty-printed JSON, creating parent directories
    pub fn write(&self, path: &Path) -> ScenarioResult<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, self.to_json()?)?;
        Ok(())
    }

    pub fn read(path: &Path) -> ScenarioResult<Self> {
        let content = fs::read_to_string(path)?;
        serde_json::from_str(&content).map_err(|e| ScenarioError::Parse(e.to_string()))
    }
}
