//! Simulation errors
//!
//! Malformed input is a caller bug and is rejected synchronously at the call
//! that supplied it. Degenerate geometry (coincident nodes, zero-length
//! links) is never an error; forces resolve it with jitter.

use thiserror::Error;

/// Errors reported by simulation construction and mutation entry points
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SimulationError {
    /// An edge endpoint is outside `[0, node_count)`
    #[error("edge {edge} references node {node}, but the simulation has {node_count} nodes")]
    EdgeOutOfRange {
        edge: usize,
        node: usize,
        node_count: usize,
    },

    /// A node index passed to an interactive call is out of range
    #[error("node index {index} out of range for {node_count} nodes")]
    NodeOutOfRange { index: usize, node_count: usize },

    /// An initial state array does not match the node count
    #[error("initial {field} array has {actual} entries, expected {expected}")]
    LengthMismatch {
        field: &'static str,
        expected: usize,
        actual: usize,
    },

    /// A revive mapping entry points past the old node set
    #[error("revive mapping entry {new_index} refers to old node {old_index}, but only {old_count} nodes exist")]
    MappingOutOfRange {
        new_index: usize,
        old_index: usize,
        old_count: usize,
    },

    /// A revive mapping carries one old node into two new slots
    #[error("revive mapping reuses old node {old_index} for new nodes {first} and {second}")]
    DuplicateMapping {
        old_index: usize,
        first: usize,
        second: usize,
    },

    /// The alpha schedule cannot converge or would produce non-finite values
    #[error("invalid alpha schedule: {0}")]
    InvalidSchedule(String),

    /// A resolved per-node attribute is outside its valid domain
    #[error("{force} force: invalid {attribute} {value} for node {index}")]
    InvalidAttribute {
        force: &'static str,
        attribute: &'static str,
        index: usize,
        value: f64,
    },

    /// A scalar force setting is outside its valid domain
    #[error("{force} force: invalid {parameter} {value}")]
    InvalidParameter {
        force: &'static str,
        parameter: &'static str,
        value: f64,
    },
}

/// Result type for simulation operations
pub type SimulationResult<T> = Result<T, SimulationError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_name_the_offending_values() {
        let err = SimulationError::EdgeOutOfRange {
            edge: 3,
            node: 12,
            node_count: 10,
        };
        assert_eq!(
            err.to_string(),
            "edge 3 references node 12, but the simulation has 10 nodes"
        );

        let err = SimulationError::DuplicateMapping {
            old_index: 1,
            first: 0,
            second: 4,
        };
        assert!(err.to_string().contains("old node 1"));

        let err = SimulationError::InvalidParameter {
            force: "many-body",
            parameter: "theta",
            value: -1.0,
        };
        assert_eq!(err.to_string(), "many-body force: invalid theta -1");
    }
}
