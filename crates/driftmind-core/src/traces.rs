//! Eligibility Traces
//!
//! One decaying per-node accumulator per active dimension, used to backproject credit
//! from rollouts onto the dimensions whose clusters those rollouts visited.

use serde::{Deserialize, Serialize};

use crate::dimensions::DimensionSystem;
use crate::rollout::Path;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct EligibilityTraces {
    pub traces: Vec<Vec<f32>>,
}

impl EligibilityTraces {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resize the trace list to match the current dimension count, and each trace
    /// vector to match the current node count. New traces/entries start at zero.
    pub fn resize(&mut self, dimension_count: usize, node_count: usize) {
        if self.traces.len() < dimension_count {
            self.traces.resize(dimension_count, vec![0.0; node_count]);
        }
        for trace in self.traces.iter_mut() {
            if trace.len() < node_count {
                trace.resize(node_count, 0.0);
            }
        }
    }

    /// Decay all traces by `rho` before accumulating a new cycle's credit.
    pub fn decay(&mut self, rho: f32) {
        for trace in self.traces.iter_mut() {
            for v in trace.iter_mut() {
                *v *= rho;
            }
        }
    }

    /// For each rollout path, add `probability * discount^position * alignment_k` to
    /// `trace_k[node]` for every node visited.
    pub fn backproject(&mut self, paths: &[Path], dimensions: &DimensionSystem, discount: f32) {
        for (dim_idx, dim) in dimensions.active.iter().enumerate() {
            let Some(trace) = self.traces.get_mut(dim_idx) else { continue };
            for path in paths {
                let alignment_k =
                    if path.nodes.iter().any(|n| dim.cluster.contains(n)) { 1.0 } else { 0.0 };
                if alignment_k == 0.0 {
                    continue;
                }
                for (p, &node) in path.nodes.iter().enumerate() {
                    if let Some(slot) = trace.get_mut(node) {
                        *slot += path.probability * discount.powi(p as i32) * alignment_k;
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rollout::Path;
    use std::collections::HashSet;

    fn dims_with_cluster(node: usize) -> DimensionSystem {
        let mut d = DimensionSystem::new();
        d.resize(4);
        d.active.push(crate::dimensions::Dimension {
            primary: node,
            cluster: HashSet::from([node]),
            variance_impact: 0.9,
            gamma: 0.5,
            stability: 0.5,
            age: 0,
            driver_field: vec![0.0; 4],
        });
        d
    }

    #[test]
    fn decay_shrinks_existing_credit() {
        let mut t = EligibilityTraces::new();
        t.resize(1, 4);
        t.traces[0][2] = 1.0;
        t.decay(0.9);
        assert!((t.traces[0][2] - 0.9).abs() < 1e-6);
    }

    #[test]
    fn backproject_only_credits_visited_cluster() {
        let dims = dims_with_cluster(1);
        let mut t = EligibilityTraces::new();
        t.resize(dims.active.len(), 4);
        let path = Path { nodes: vec![0, 1, 2], probability: 0.5, catastrophe: false, norm_violations: 0, info_gain: 0.0, energy_cost: 0.0, goal_proximity: 0.0 };
        t.backproject(&[path], &dims, 0.9);
        assert!(t.traces[0][1] > 0.0);
        assert!(t.traces[0][3] == 0.0);
    }
}
