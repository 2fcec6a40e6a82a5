//! Rollout Engine
//!
//! Branched probabilistic walks from each candidate action, used by
//! [`crate::fitness`] to score which action the reasoning loop should take. Branches
//! across all actions are independent given an immutable snapshot of the field and edge
//! set, so a host may batch-parallelize this phase; nothing here mutates shared state.

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::field::ContextField;
use crate::graph::Graph;

const CATASTROPHE_WORDS: &[&str] = &["danger", "fatal", "crash"];
const NORM_VIOLATION_WORDS: &[&str] = &["illegal", "unethical"];
const LOW_FREQUENCY_THRESHOLD: u32 = 5;

/// A candidate action: start rolling out from this node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Action {
    pub node: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RolloutParams {
    pub horizon: usize,
    pub branches: usize,
    pub temperature: f32,
    pub discount: f32,
}

impl Default for RolloutParams {
    fn default() -> Self {
        Self { horizon: 3, branches: 8, temperature: 0.5, discount: 0.9 }
    }
}

/// One sampled path from an action's starting node.
#[derive(Debug, Clone, Default)]
pub struct Path {
    pub nodes: Vec<usize>,
    pub probability: f32,
    pub catastrophe: bool,
    pub norm_violations: u32,
    pub info_gain: f32,
    pub energy_cost: f32,
    pub goal_proximity: f32,
}

/// Roll out `params.branches` independent paths of length <= `params.horizon` from
/// `action.node`, sampling outgoing edges with probability proportional to
/// `conductivity * (1 + max(0, C[target]))`.
pub fn rollout(graph: &Graph, field: &ContextField, action: Action, params: &RolloutParams, rng: &mut impl Rng) -> Vec<Path> {
    let mut paths = Vec::with_capacity(params.branches);
    for _ in 0..params.branches {
        paths.push(rollout_one(graph, field, action.node, params, rng));
    }
    paths
}

fn rollout_one(graph: &Graph, field: &ContextField, start: usize, params: &RolloutParams, rng: &mut impl Rng) -> Path {
    let mut path = Path { nodes: vec![start], probability: 1.0, ..Default::default() };
    let mut current = start;

    note_visit(graph, field, &mut path, current);

    for _ in 0..params.horizon {
        let outgoing = graph.outgoing(current);
        if outgoing.is_empty() {
            break;
        }
        let weights: Vec<f32> = outgoing
            .iter()
            .filter_map(|&e| graph.edge(e))
            .map(|e| {
                let target_c = field.c.get(e.target).copied().unwrap_or(0.0).max(0.0);
                (e.chem.conductivity * (1.0 + target_c)).max(1e-6)
            })
            .collect();
        let total: f32 = weights.iter().sum();
        if total <= 0.0 {
            break;
        }
        let mut pick = rng.gen_range(0.0..total);
        let mut chosen = None;
        for (i, &w) in weights.iter().enumerate() {
            if pick < w {
                chosen = Some((outgoing[i], w));
                break;
            }
            pick -= w;
        }
        let Some((edge_idx, weight)) = chosen else { break };
        let Some(edge) = graph.edge(edge_idx) else { break };
        let step_probability = weight / total;
        path.probability *= step_probability.clamp(0.0, 1.0);
        current = edge.target;
        path.nodes.push(current);
        note_visit(graph, field, &mut path, current);
        path.energy_cost += 0.05;
    }
    path
}

fn note_visit(graph: &Graph, field: &ContextField, path: &mut Path, node: usize) {
    if let Some(n) = graph.node(node) {
        let text = &n.text;
        if CATASTROPHE_WORDS.iter().any(|w| text.contains(w)) {
            path.catastrophe = true;
        }
        if NORM_VIOLATION_WORDS.iter().any(|w| text.contains(w)) {
            path.norm_violations += 1;
        }
        if n.frequency < LOW_FREQUENCY_THRESHOLD {
            path.info_gain += 0.1;
        }
        path.goal_proximity = path.goal_proximity.max(field.c.get(node).copied().unwrap_or(0.0));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::RelationTag;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn rollout_respects_horizon_and_branch_count() {
        let mut g = Graph::new();
        let a = g.insert_or_fetch_node("fire", 0);
        let b = g.insert_or_fetch_node("heat", 0);
        g.upsert_edge(a, b, RelationTag::Temporal, 0);
        let mut field = ContextField::new();
        field.resize(2);
        let params = RolloutParams::default();
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let paths = rollout(&g, &field, Action { node: a }, &params, &mut rng);
        assert_eq!(paths.len(), params.branches);
        for p in &paths {
            assert!(p.nodes.len() <= params.horizon + 1);
        }
    }

    #[test]
    fn dead_end_terminates_without_panic() {
        let mut g = Graph::new();
        let a = g.insert_or_fetch_node("alone", 0);
        let field = {
            let mut f = ContextField::new();
            f.resize(1);
            f
        };
        let params = RolloutParams::default();
        let mut rng = ChaCha8Rng::seed_from_u64(2);
        let paths = rollout(&g, &field, Action { node: a }, &params, &mut rng);
        assert_eq!(paths.len(), params.branches);
        assert_eq!(paths[0].nodes, vec![a]);
    }
}
