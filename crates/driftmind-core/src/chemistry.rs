//! Connection Chemistry
//!
//! A connection is not a label — it is a living bridge whose behavior (sequential,
//! associative, factual, exploratory) emerges from six continuous parameters. There is
//! no dispatch on [`crate::graph::RelationTag`] anywhere in this module; the tag is
//! metadata consulted only by the teaching interface and grammar repair.
//!
//! Grounded directly on the original `melvin` prototype's
//! `connection_chemistry.h` update law, generalized from its hand-tuned constants into
//! the meta-learned [`ChemistryConstants`] below.

use serde::{Deserialize, Serialize};

use crate::graph::Graph;

/// Per-edge continuous parameters plus metabolism bookkeeping.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chemistry {
    pub conductivity: f32,
    pub affinity: f32,
    pub plasticity_rate: f32,
    pub stability: f32,
    pub directional_bias: f32,
    pub energy_potential: f32,
    pub age: u32,
    pub activation_count: u32,
    pub cumulative_flow: f32,
    pub last_activity: f32,
    pub prediction_accuracy: f32,
    pub coherence_contribution: f32,
}

impl Default for Chemistry {
    fn default() -> Self {
        Self {
            conductivity: 0.5,
            affinity: 0.5,
            plasticity_rate: 0.01,
            stability: 0.5,
            directional_bias: 0.0,
            energy_potential: 0.0,
            age: 0,
            activation_count: 0,
            cumulative_flow: 0.0,
            last_activity: 0.0,
            prediction_accuracy: 0.5,
            coherence_contribution: 0.0,
        }
    }
}

/// Meta-learned chemistry constants. Several fields are nudged by
/// [`crate::dimensions::meta_learn`]; the rest are fixed per the reference.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChemistryConstants {
    pub stability_decay: f32,
    pub energy_damping: f32,
    pub affinity_growth: f32,
    pub conductivity_floor: f32,
    pub fusion_similarity: f32,
    pub fission_volatility: f32,
    pub age_decay_rate: f32,
    pub reinforcement_gain: f32,
}

impl Default for ChemistryConstants {
    fn default() -> Self {
        Self {
            stability_decay: 0.95,
            energy_damping: 0.1,
            affinity_growth: 0.01,
            conductivity_floor: 0.01,
            fusion_similarity: 0.95,
            fission_volatility: 0.8,
            age_decay_rate: 0.0001,
            reinforcement_gain: 0.05,
        }
    }
}

/// Apply one cycle of the chemistry update law to a single edge.
pub fn update_chemistry(
    chem: &mut Chemistry,
    a_a: f32,
    a_b: f32,
    delta_c_a: f32,
    delta_c_b: f32,
    fitness_signal: f32,
    consts: &ChemistryConstants,
) {
    chem.age += 1;

    let hebbian = a_a * a_b;
    let prediction_error = (delta_c_a * delta_c_b - chem.last_activity).abs();

    let conductivity_delta = chem.plasticity_rate * (hebbian - consts.stability_decay * chem.conductivity);
    chem.conductivity = (chem.conductivity + conductivity_delta).clamp(consts.conductivity_floor, 1.0);

    chem.plasticity_rate = if prediction_error > 0.5 {
        (chem.plasticity_rate * 1.05).min(0.1)
    } else {
        (chem.plasticity_rate * 0.99).max(0.001)
    };

    if fitness_signal > 0.0 {
        chem.stability = (chem.stability + consts.reinforcement_gain).min(1.0);
    } else {
        chem.stability = (chem.stability * consts.stability_decay).max(0.1);
    }

    let correlation = if a_a > 0.1 && a_b > 0.1 { 1.0 } else { 0.0 };
    chem.affinity = (chem.affinity + consts.affinity_growth * (correlation - chem.affinity)).clamp(0.0, 1.0);

    chem.energy_potential =
        (chem.energy_potential + prediction_error - consts.energy_damping * chem.energy_potential).clamp(-1.0, 1.0);

    let asymmetry = a_a - a_b;
    if asymmetry.abs() > 0.2 {
        chem.directional_bias = (chem.directional_bias + 0.01 * asymmetry).clamp(-1.0, 1.0);
    }

    chem.last_activity = hebbian;
    chem.activation_count += 1;
    chem.cumulative_flow += hebbian.abs();

    if chem.age > 1000 && (chem.activation_count as f32) < 0.01 * chem.age as f32 {
        chem.conductivity *= 1.0 - consts.age_decay_rate;
    }
}

fn should_prune(chem: &Chemistry, consts: &ChemistryConstants) -> bool {
    (chem.conductivity < consts.conductivity_floor && chem.age > 100)
        || (chem.age > 500 && chem.activation_count == 0)
}

/// Aggregate chemistry statistics returned by `stats()`.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct ChemistryStats {
    pub mean_conductivity: f32,
    pub mean_affinity: f32,
    pub mean_plasticity: f32,
    pub mean_stability: f32,
    pub directional_edges: usize,
    pub stable_edges: usize,
    pub plastic_edges: usize,
    /// Edges acting as hypothesis-like "leaps": high plasticity, low stability.
    /// Recovered from the original prototype's `leap_diagnostic.cpp`; a read-only
    /// report, not a behavioral branch.
    pub leap_edges: usize,
}

pub fn stats(graph: &Graph) -> ChemistryStats {
    let n = graph.edge_count();
    if n == 0 {
        return ChemistryStats::default();
    }
    let mut out = ChemistryStats::default();
    for (_, edge) in graph.iter_edges() {
        let c = &edge.chem;
        out.mean_conductivity += c.conductivity;
        out.mean_affinity += c.affinity;
        out.mean_plasticity += c.plasticity_rate;
        out.mean_stability += c.stability;
        if c.directional_bias.abs() > 0.1 {
            out.directional_edges += 1;
        }
        if c.stability > 0.7 {
            out.stable_edges += 1;
        }
        if c.plasticity_rate > 0.05 {
            out.plastic_edges += 1;
        }
        if c.plasticity_rate > 0.05 && c.stability < 0.3 {
            out.leap_edges += 1;
        }
    }
    let n = n as f32;
    out.mean_conductivity /= n;
    out.mean_affinity /= n;
    out.mean_plasticity /= n;
    out.mean_stability /= n;
    out
}

/// Prune edges whose chemistry has collapsed below the floor, or which have aged out
/// with no activity at all. Rebuilds adjacency afterward.
pub fn prune(graph: &mut Graph, consts: &ChemistryConstants) -> usize {
    let before = graph.edge_count();
    let keep: Vec<_> = graph
        .edges
        .iter()
        .cloned()
        .filter(|e| !should_prune(&e.chem, consts))
        .collect();
    let removed = before - keep.len();
    if removed > 0 {
        graph.edges = keep;
        graph.reindex();
        tracing::debug!(removed, "chemistry: pruned edges below conductivity floor");
    }
    removed
}

/// Fuse edges sharing `(source, destination, relation)` whose parameters are close.
///
/// The graph's `upsert_edge` already collapses same-triple edges at insertion time
/// so under normal operation there is at most
/// one edge per triple and this pass is a no-op confirming that invariant. It is kept
/// as a real merge (not deleted) so that a host which chooses the "allow transient
/// multi-edges" reading of the open question still converges correctly.
pub fn fuse(graph: &mut Graph, consts: &ChemistryConstants) -> usize {
    use std::collections::HashMap;
    let mut groups: HashMap<(usize, usize, crate::graph::RelationTag), Vec<usize>> = HashMap::new();
    for (idx, edge) in graph.iter_edges() {
        groups.entry((edge.source, edge.target, edge.relation)).or_default().push(idx);
    }

    let mut to_remove = Vec::new();
    let threshold = 5.0 * (1.0 - consts.fusion_similarity);

    for (_, mut idxs) in groups {
        while idxs.len() > 1 {
            let a = idxs[0];
            let mut fused_with = None;
            for &b in &idxs[1..] {
                let dist = param_l1_distance(&graph.edges[a].chem, &graph.edges[b].chem);
                if dist < threshold {
                    fused_with = Some(b);
                    break;
                }
            }
            match fused_with {
                Some(b) => {
                    let (lo, hi) = if a < b { (a, b) } else { (b, a) };
                    let (left, right) = graph.edges.split_at_mut(hi);
                    merge_into(&mut left[lo], &right[0]);
                    to_remove.push(hi);
                    idxs.retain(|&x| x != hi);
                }
                None => break,
            }
        }
    }

    if to_remove.is_empty() {
        return 0;
    }
    to_remove.sort_unstable();
    to_remove.dedup();
    let remove_set: std::collections::HashSet<_> = to_remove.iter().copied().collect();
    let kept: Vec<_> = graph
        .edges
        .iter()
        .enumerate()
        .filter(|(i, _)| !remove_set.contains(i))
        .map(|(_, e)| e.clone())
        .collect();
    let removed = graph.edge_count() - kept.len();
    graph.edges = kept;
    graph.reindex();
    tracing::debug!(removed, "chemistry: fused duplicate edges");
    removed
}

fn param_l1_distance(a: &Chemistry, b: &Chemistry) -> f32 {
    (a.conductivity - b.conductivity).abs()
        + (a.affinity - b.affinity).abs()
        + (a.plasticity_rate - b.plasticity_rate).abs()
        + (a.stability - b.stability).abs()
        + (a.directional_bias - b.directional_bias).abs()
        + (a.energy_potential - b.energy_potential).abs()
}

fn merge_into(keep: &mut crate::graph::Edge, other: &crate::graph::Edge) {
    let wa = keep.chem.activation_count.max(1) as f32;
    let wb = other.chem.activation_count.max(1) as f32;
    let total = wa + wb;
    macro_rules! weighted {
        ($field:ident) => {
            (keep.chem.$field * wa + other.chem.$field * wb) / total
        };
    }
    keep.chem.conductivity = weighted!(conductivity);
    keep.chem.affinity = weighted!(affinity);
    keep.chem.plasticity_rate = weighted!(plasticity_rate);
    keep.chem.stability = weighted!(stability);
    keep.chem.directional_bias = weighted!(directional_bias);
    keep.chem.energy_potential = weighted!(energy_potential);
    keep.chem.activation_count += other.chem.activation_count;
    keep.chem.cumulative_flow += other.chem.cumulative_flow;
    keep.chem.age = keep.chem.age.min(other.chem.age);
    keep.usage_count += other.usage_count;
    keep.core_weight = keep.core_weight.max(other.core_weight);
}

/// Split volatile, high-energy edges into a perturbed variant, modeling the birth of a
/// competing hypothesis alongside the established connection.
pub fn split(graph: &mut Graph, consts: &ChemistryConstants, rng: &mut impl rand::Rng) -> usize {
    let candidates: Vec<usize> = graph
        .iter_edges()
        .filter(|(_, e)| {
            e.chem.plasticity_rate > consts.fission_volatility
                && e.chem.energy_potential.abs() > 0.7
                && e.chem.activation_count > 50
        })
        .map(|(i, _)| i)
        .collect();

    for idx in &candidates {
        let mut variant = graph.edges[*idx].clone();
        perturb(&mut variant.chem, rng);
        variant.chem.age = 0;
        variant.chem.activation_count = 0;
        variant.usage_count = 1;
        graph.edges.push(variant);
    }
    if !candidates.is_empty() {
        graph.reindex();
        tracing::debug!(count = candidates.len(), "chemistry: split volatile edges");
    }
    candidates.len()
}

fn perturb(chem: &mut Chemistry, rng: &mut impl rand::Rng) {
    let mag = |range: f32| rng.gen_range(-0.1 * range..=0.1 * range);
    chem.conductivity = (chem.conductivity + mag(1.0)).clamp(0.0, 1.0);
    chem.affinity = (chem.affinity + mag(1.0)).clamp(0.0, 1.0);
    chem.plasticity_rate = (chem.plasticity_rate + mag(0.1)).clamp(0.001, 0.1);
    chem.stability = (chem.stability + mag(1.0)).clamp(0.1, 1.0);
    chem.directional_bias = (chem.directional_bias + mag(2.0)).clamp(-1.0, 1.0);
    chem.energy_potential = (chem.energy_potential + mag(2.0)).clamp(-1.0, 1.0);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::RelationTag;

    #[test]
    fn update_keeps_parameters_in_range() {
        let mut chem = Chemistry::default();
        let consts = ChemistryConstants::default();
        for _ in 0..200 {
            update_chemistry(&mut chem, 0.9, 0.8, 0.3, -0.2, 0.5, &consts);
            assert!(chem.conductivity >= consts.conductivity_floor && chem.conductivity <= 1.0);
            assert!(chem.directional_bias >= -1.0 && chem.directional_bias <= 1.0);
            assert!(chem.plasticity_rate >= 0.001 && chem.plasticity_rate <= 0.1);
            assert!(chem.stability >= 0.1 && chem.stability <= 1.0);
            assert!(chem.affinity >= 0.0 && chem.affinity <= 1.0);
            assert!(chem.energy_potential >= -1.0 && chem.energy_potential <= 1.0);
        }
    }

    #[test]
    fn prune_removes_floor_edges_only() {
        let mut g = Graph::new();
        let a = g.insert_or_fetch_node("a", 0);
        let b = g.insert_or_fetch_node("b", 0);
        let idx = g.upsert_edge(a, b, RelationTag::Temporal, 0);
        g.edge_mut(idx).unwrap().chem.conductivity = 0.0;
        g.edge_mut(idx).unwrap().chem.age = 200;
        let consts = ChemistryConstants::default();
        let removed = prune(&mut g, &consts);
        assert_eq!(removed, 1);
        assert_eq!(g.edge_count(), 0);
    }
}
