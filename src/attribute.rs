//! Per-node attribute descriptors
//!
//! Mass, radius, strength and target attributes are given either as one
//! constant or as a function of the node index. Forces resolve them into a
//! dense array when they are bound to a simulation, never mid-tick.

use std::fmt;
use std::sync::Arc;

/// A per-node scalar attribute
#[derive(Clone)]
pub enum Attribute {
    /// Same value for every node
    Constant(f64),
    /// Value computed from the node index
    Varied(Arc<dyn Fn(usize) -> f64 + Send + Sync>),
}

impl Attribute {
    /// Build a varied attribute from a closure over the node index
    pub fn varied(f: impl Fn(usize) -> f64 + Send + Sync + 'static) -> Self {
        Self::Varied(Arc::new(f))
    }

    /// Build a varied attribute from explicit per-node values.
    ///
    /// Nodes past the end of `values` fall back to `fallback`.
    pub fn per_node(values: Vec<f64>, fallback: f64) -> Self {
        Self::varied(move |index| values.get(index).copied().unwrap_or(fallback))
    }

    /// Value for a single node
    pub fn value(&self, index: usize) -> f64 {
        match self {
            Attribute::Constant(value) => *value,
            Attribute::Varied(f) => f(index),
        }
    }

    /// Resolve into a dense array of `count` values
    pub fn resolve(&self, count: usize) -> Vec<f64> {
        let mut values = Vec::with_capacity(count);
        self.resolve_into(&mut values, count);
        values
    }

    /// Resolve into an existing buffer, replacing its contents
    pub fn resolve_into(&self, values: &mut Vec<f64>, count: usize) {
        values.clear();
        match self {
            Attribute::Constant(value) => values.resize(count, *value),
            Attribute::Varied(f) => values.extend((0..count).map(|i| f(i))),
        }
    }
}

impl From<f64> for Attribute {
    fn from(value: f64) -> Self {
        Attribute::Constant(value)
    }
}

impl fmt::Debug for Attribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Attribute::Constant(value) => f.debug_tuple("Constant").field(value).finish(),
            Attribute::Varied(_) => f.write_str("Varied(..)"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constant_resolves_to_uniform_array() {
        let attr = Attribute::from(2.5);
        assert_eq!(attr.resolve(3), vec![2.5, 2.5, 2.5]);
    }

    #[test]
    fn varied_resolves_by_index() {
        let attr = Attribute::varied(|i| i as f64 * 10.0);
        assert_eq!(attr.resolve(4), vec![0.0, 10.0, 20.0, 30.0]);
        assert_eq!(attr.value(7), 70.0);
    }

    #[test]
    fn per_node_falls_back_past_the_end() {
        let attr = Attribute::per_node(vec![1.0, 2.0], 9.0);
        assert_eq!(attr.resolve(3), vec![1.0, 2.0, 9.0]);
    }

    #[test]
    fn resolve_into_replaces_buffer() {
        let mut buf = vec![1.0; 10];
        Attribute::Constant(0.5).resolve_into(&mut buf, 2);
        assert_eq!(buf, vec![0.5, 0.5]);
    }

    #[test]
    fn debug_hides_closures() {
        assert_eq!(format!("{:?}", Attribute::Constant(1.0)), "Constant(1.0)");
        assert_eq!(format!("{:?}", Attribute::varied(|_| 1.0)), "Varied(..)");
    }
}
