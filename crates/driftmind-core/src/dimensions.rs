//! Emergent Dimensional System
//!
//! Discovers which nodes, weighted as influence sources on the context field, improve
//! outcomes. Influence is *earned* — a node becomes a dimension only after its activity
//! correlates with above-baseline fitness for long enough, and it is retired the moment
//! it stops helping. Grounded on the original prototype's adaptive-window meta-learner,
//! generalized here into the multi-constant scheme below.

use std::collections::{HashMap, HashSet, VecDeque};

use serde::{Deserialize, Serialize};

const FITNESS_RING_CAPACITY: usize = 100;

/// One fitness observation, recorded after each reasoning call.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct FitnessRecord {
    pub coherence: f32,
    pub task: f32,
    pub consistency: f32,
    pub stability: f32,
    pub external: f32,
    pub overall: f32,
}

impl FitnessRecord {
    pub fn new(coherence: f32, task: f32, consistency: f32, stability: f32, external: f32) -> Self {
        let overall = 0.3 * coherence + 0.3 * task + 0.2 * consistency + 0.1 * stability + 0.1 * external;
        Self { coherence, task, consistency, stability, external, overall }
    }
}

/// An emergent dimension: a primary node, its cluster, and a learned influence weight.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Dimension {
    pub primary: usize,
    pub cluster: HashSet<usize>,
    pub variance_impact: f32,
    pub gamma: f32,
    pub stability: f32,
    pub age: u32,
    pub driver_field: Vec<f32>,
}

/// Meta-learned thresholds governing promotion, demotion, and learning rates.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DimensionParams {
    pub promotion_threshold: f32,
    pub demotion_threshold: f32,
    pub learning_rate: f32,
    pub decay_rate: f32,
    pub gamma_growth_rate: f32,
    pub gamma_max: f32,
}

impl Default for DimensionParams {
    fn default() -> Self {
        Self {
            promotion_threshold: 0.6,
            demotion_threshold: 0.1,
            learning_rate: 0.05,
            decay_rate: 0.95,
            gamma_growth_rate: 0.05,
            gamma_max: 2.0,
        }
    }
}

/// Owns the active dimension list, the node->dimension index, and the fitness ring.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct DimensionSystem {
    pub active: Vec<Dimension>,
    index: HashMap<usize, usize>,
    variance_impact: Vec<f32>,
    activity: Vec<f32>,
    pub history: VecDeque<FitnessRecord>,
    pub baseline: f32,
    pub params: DimensionParams,
}

impl DimensionSystem {
    pub fn new() -> Self {
        Self::default()
    }

    /// Extend internal per-node trackers to length `n`.
    pub fn resize(&mut self, n: usize) {
        if self.variance_impact.len() < n {
            self.variance_impact.resize(n, 0.0);
        }
        if self.activity.len() < n {
            self.activity.resize(n, 0.0);
        }
        for dim in self.active.iter_mut() {
            if dim.driver_field.len() < n {
                dim.driver_field.resize(n, 0.0);
            }
        }
    }

    /// `observe(C)`: activity_i <- C_i.
    pub fn observe(&mut self, c: &[f32]) {
        self.resize(c.len());
        self.activity[..c.len()].copy_from_slice(c);
    }

    /// Append a fitness record to the ring, recompute baseline, and update every
    /// node's variance-impact from the resulting fitness delta.
    pub fn evaluate_and_attribute(&mut self, record: FitnessRecord) {
        self.history.push_back(record);
        while self.history.len() > FITNESS_RING_CAPACITY {
            self.history.pop_front();
        }
        self.baseline = self.history.iter().map(|r| r.overall).sum::<f32>() / self.history.len() as f32;
        let fitness_delta = record.overall - self.baseline;

        for i in 0..self.variance_impact.len() {
            let activity = self.activity.get(i).copied().unwrap_or(0.0);
            let updated =
                self.params.decay_rate * (self.variance_impact[i] + self.params.learning_rate * fitness_delta * activity);
            self.variance_impact[i] = updated.clamp(-1.0, 2.0);
        }
    }

    /// Promote any node above the promotion threshold that isn't already a dimension.
    pub fn promote(&mut self) {
        let candidates: Vec<usize> = self
            .variance_impact
            .iter()
            .enumerate()
            .filter(|&(i, &vi)| vi > self.params.promotion_threshold && !self.index.contains_key(&i))
            .map(|(i, _)| i)
            .collect();

        for primary in candidates {
            let dim = Dimension {
                primary,
                cluster: HashSet::from([primary]),
                variance_impact: self.variance_impact[primary],
                gamma: 0.1,
                stability: 0.5,
                age: 0,
                driver_field: vec![0.0; self.variance_impact.len()],
            };
            self.index.insert(primary, self.active.len());
            self.active.push(dim);
            tracing::info!(node = primary, "dimension promoted");
        }
    }

    /// Refresh each dimension's variance-impact, grow gamma on continued success, and
    /// remove any dimension that has fallen to or below the demotion threshold.
    pub fn demote(&mut self) {
        for dim in self.active.iter_mut() {
            dim.age += 1;
            dim.variance_impact = self.variance_impact.get(dim.primary).copied().unwrap_or(0.0);
            if dim.variance_impact > 0.5 {
                dim.gamma = (dim.gamma + self.params.gamma_growth_rate).min(self.params.gamma_max);
            }
        }

        let survivors: Vec<Dimension> = self
            .active
            .drain(..)
            .filter(|dim| {
                let keep = dim.variance_impact > self.params.demotion_threshold;
                if !keep {
                    tracing::info!(node = dim.primary, "dimension demoted");
                }
                keep
            })
            .collect();
        self.active = survivors;
        self.rebuild_index();
    }

    /// Build each dimension's driver field: primary node at 1.0, plus half the edge
    /// weight to each outgoing neighbor, normalized by max absolute value.
    pub fn generate_fields(&mut self, graph: &crate::graph::Graph) -> (Vec<f32>, Vec<Vec<f32>>) {
        let n = self.variance_impact.len().max(graph.node_count());
        let mut gammas = Vec::with_capacity(self.active.len());
        let mut fields = Vec::with_capacity(self.active.len());

        for dim in self.active.iter_mut() {
            let mut field = vec![0.0f32; n];
            if dim.primary < n {
                field[dim.primary] = 1.0;
            }
            for &edge_idx in graph.outgoing(dim.primary) {
                if let Some(edge) = graph.edge(edge_idx) {
                    if edge.target < n {
                        field[edge.target] += 0.5 * edge.weight();
                    }
                }
            }
            let max_abs = field.iter().fold(0.0f32, |m, &x| m.max(x.abs()));
            if max_abs > f32::EPSILON {
                for x in field.iter_mut() {
                    *x /= max_abs;
                }
            }
            dim.driver_field = field.clone();
            gammas.push(dim.gamma);
            fields.push(field);
        }
        (gammas, fields)
    }

    /// Merge dimensions whose driver fields are near-duplicates (cosine similarity
    /// > 0.85): the weaker is folded into the stronger, clusters unioned, gamma maxed.
    pub fn compress(&mut self) {
        let n = self.active.len();
        if n < 2 {
            return;
        }
        let mut dead: HashSet<usize> = HashSet::new();
        for i in 0..n {
            if dead.contains(&i) {
                continue;
            }
            for j in (i + 1)..n {
                if dead.contains(&j) {
                    continue;
                }
                let sim = crate::embeddings::cosine(&self.active[i].driver_field, &self.active[j].driver_field);
                if sim > 0.85 {
                    let (stronger, weaker) = if self.active[i].gamma >= self.active[j].gamma { (i, j) } else { (j, i) };
                    let weaker_cluster = self.active[weaker].cluster.clone();
                    let weaker_gamma = self.active[weaker].gamma;
                    self.active[stronger].cluster.extend(weaker_cluster);
                    self.active[stronger].gamma = self.active[stronger].gamma.max(weaker_gamma);
                    dead.insert(weaker);
                }
            }
        }
        if dead.is_empty() {
            return;
        }
        let survivors: Vec<Dimension> =
            self.active.drain(..).enumerate().filter(|(i, _)| !dead.contains(i)).map(|(_, d)| d).collect();
        self.active = survivors;
        self.rebuild_index();
        tracing::debug!(removed = dead.len(), "dimensions compressed");
    }

    fn rebuild_index(&mut self) {
        self.index.clear();
        for (i, dim) in self.active.iter().enumerate() {
            self.index.insert(dim.primary, i);
        }
    }

    pub fn node_to_dimension(&self, node: usize) -> Option<usize> {
        self.index.get(&node).copied()
    }

    /// Meta-learning pass: run every 5 loop cycles once the fitness ring has >= 10
    /// entries. Nudges promotion_threshold, learning_rate, and gamma_growth_rate from
    /// the recent trend and variance of overall fitness.
    pub fn meta_learn(&mut self) {
        if self.history.len() < 10 {
            return;
        }
        let values: Vec<f32> = self.history.iter().map(|r| r.overall).collect();
        let half = values.len() / 2;
        let early_mean = mean(&values[..half]);
        let recent_mean = mean(&values[half..]);
        let improvement = recent_mean - early_mean;

        if improvement > 0.1 {
            self.params.promotion_threshold = (self.params.promotion_threshold * 1.02).min(0.8);
        } else if improvement < -0.1 {
            self.params.promotion_threshold = (self.params.promotion_threshold * 0.98).max(0.2);
        }

        let variance = variance(&values);
        if variance > 0.2 {
            self.params.learning_rate = (self.params.learning_rate * 0.99).max(0.001);
        } else if variance < 0.05 {
            self.params.learning_rate = (self.params.learning_rate * 1.01).min(0.1);
        }

        if !self.active.is_empty() {
            let avg_vi = self.active.iter().map(|d| d.variance_impact).sum::<f32>() / self.active.len() as f32;
            if avg_vi > 0.7 {
                self.params.gamma_growth_rate = (self.params.gamma_growth_rate * 1.05).min(0.2);
            } else if avg_vi < 0.3 {
                self.params.gamma_growth_rate = (self.params.gamma_growth_rate * 0.95).max(0.01);
            }
        }

        let weak_count = self.active.iter().filter(|d| d.variance_impact < 0.3).count();
        if self.active.len() > 5 && weak_count * 2 > self.active.len() {
            self.compress();
        }
    }
}

fn mean(xs: &[f32]) -> f32 {
    if xs.is_empty() {
        0.0
    } else {
        xs.iter().sum::<f32>() / xs.len() as f32
    }
}

fn variance(xs: &[f32]) -> f32 {
    if xs.is_empty() {
        return 0.0;
    }
    let m = mean(xs);
    mean(&xs.iter().map(|x| (x - m) * (x - m)).collect::<Vec<_>>())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{Graph, RelationTag};

    #[test]
    fn promote_then_demote_respects_thresholds() {
        let mut d = DimensionSystem::new();
        d.resize(3);
        for _ in 0..5 {
            d.observe(&[1.0, 0.0, 0.0]);
            d.evaluate_and_attribute(FitnessRecord::new(0.9, 0.9, 0.9, 0.9, 0.9));
        }
        d.promote();
        assert!(d.node_to_dimension(0).is_some());

        for dim in d.active.iter_mut() {
            dim.variance_impact = 0.0;
        }
        d.demote();
        assert!(d.active.is_empty());
        assert!(d.node_to_dimension(0).is_none());
    }

    #[test]
    fn compress_merges_near_duplicate_fields() {
        let mut g = Graph::new();
        let a = g.insert_or_fetch_node("a", 0);
        g.insert_or_fetch_node("b", 0);
        let mut d = DimensionSystem::new();
        d.resize(2);
        d.active.push(Dimension {
            primary: a,
            cluster: HashSet::from([a]),
            variance_impact: 0.9,
            gamma: 0.5,
            stability: 0.5,
            age: 0,
            driver_field: vec![1.0, 0.0],
        });
        d.active.push(Dimension {
            primary: a,
            cluster: HashSet::from([a]),
            variance_impact: 0.9,
            gamma: 0.2,
            stability: 0.5,
            age: 0,
            driver_field: vec![0.99, 0.01],
        });
        d.compress();
        assert_eq!(d.active.len(), 1);
        assert!((d.active[0].gamma - 0.5).abs() < 1e-6);
    }

    #[test]
    fn generate_fields_is_normalized() {
        let mut g = Graph::new();
        let a = g.insert_or_fetch_node("fire", 0);
        let b = g.insert_or_fetch_node("heat", 0);
        g.upsert_edge(a, b, RelationTag::Temporal, 0);
        let mut d = DimensionSystem::new();
        d.resize(2);
        d.active.push(Dimension {
            primary: a,
            cluster: HashSet::from([a]),
            variance_impact: 0.9,
            gamma: 0.5,
            stability: 0.5,
            age: 0,
            driver_field: vec![0.0, 0.0],
        });
        let (gammas, fields) = d.generate_fields(&g);
        assert_eq!(gammas.len(), 1);
        let max_abs = fields[0].iter().fold(0.0f32, |m, &x| m.max(x.abs()));
        assert!((max_abs - 1.0).abs() < 1e-6);
    }
}
