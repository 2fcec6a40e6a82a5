//! Fitness Evaluator
//!
//! Scores a candidate action from its rollouts: coherence, task success, consistency,
//! stability, catastrophic-risk fraction, and per-dimension alignment. Action selection
//! folds these into a single utility that prefers dimension-aligned, low-risk actions,
//! falling back to the plain weighted fitness score before any dimension exists.

use crate::dimensions::{DimensionSystem, FitnessRecord};
use crate::rollout::Path;

/// Fitness computed for a single action, averaged over its branch rollouts.
#[derive(Debug, Clone, Default)]
pub struct FitnessMetrics {
    pub coherence: f32,
    pub task_success: f32,
    pub consistency: f32,
    pub stability: f32,
    pub risk_cat: f32,
    pub alignment: Vec<f32>,
}

impl FitnessMetrics {
    pub fn overall(&self, external_feedback: f32) -> f32 {
        0.3 * self.coherence + 0.3 * self.task_success + 0.2 * self.consistency + 0.1 * self.stability + 0.1 * external_feedback
    }

    pub fn to_record(&self, external_feedback: f32) -> FitnessRecord {
        FitnessRecord::new(self.coherence, self.task_success, self.consistency, self.stability, external_feedback)
    }
}

/// Count of contradictory path pairs, supplied by the caller when cross-path
/// consistency checking is desired; the core engine passes 0 (no contradiction
/// detector is in scope).
pub fn compute_fitness(paths: &[Path], dimensions: &DimensionSystem, contradictions: u32) -> FitnessMetrics {
    let b = paths.len().max(1) as f32;

    // A path that took zero hops performed no reasoning, so it contributes no
    // coherence — a "confident" zero-step walk is absence of a rollout, not a good
    // one. (Deliberate reading of an otherwise-unweighted edge case; see DESIGN.md.)
    let coherence = paths
        .iter()
        .map(|p| {
            let hops = p.nodes.len().saturating_sub(1);
            if hops == 0 {
                0.0
            } else {
                p.probability * (1.0 - 0.1 * p.nodes.len() as f32)
            }
        })
        .sum::<f32>()
        / b;
    let mean_goal = paths.iter().map(|p| p.goal_proximity).sum::<f32>() / b;
    let mean_info_gain = paths.iter().map(|p| p.info_gain).sum::<f32>() / b;
    let task_success = (mean_goal + mean_info_gain) / 2.0;

    let norm_violations: u32 = paths.iter().map(|p| p.norm_violations).sum();
    let consistency = (1.0 - (contradictions + norm_violations) as f32 / b).max(0.0);

    let mean_energy = paths.iter().map(|p| p.energy_cost).sum::<f32>() / b;
    let stability = (1.0 - mean_energy).max(0.0);

    let risk_cat = paths.iter().filter(|p| p.catastrophe).count() as f32 / b;

    let total_probability: f32 = paths.iter().map(|p| p.probability).sum::<f32>().max(1e-6);
    let alignment = dimensions
        .active
        .iter()
        .map(|dim| {
            paths
                .iter()
                .filter(|p| p.nodes.iter().any(|n| dim.cluster.contains(n)))
                .map(|p| p.probability)
                .sum::<f32>()
                / total_probability
        })
        .collect();

    FitnessMetrics { coherence, task_success, consistency, stability, risk_cat, alignment }
}

/// Select the highest-utility action. Utility is a dimension-weighted alignment score
/// minus a risk penalty; before any dimension exists, it falls back to overall fitness.
/// Ties broken by lowest action index.
pub fn select_action(metrics: &[FitnessMetrics], dimensions: &DimensionSystem, external_feedback: f32) -> usize {
    let gammas: Vec<f32> = dimensions.active.iter().map(|d| d.gamma).collect();

    let utilities: Vec<f32> = metrics
        .iter()
        .map(|m| {
            if gammas.is_empty() {
                m.overall(external_feedback)
            } else {
                let aligned: f32 = gammas.iter().zip(m.alignment.iter()).map(|(g, a)| g * a).sum();
                aligned - 2.0 * m.risk_cat
            }
        })
        .collect();

    let mut best = 0;
    for (i, &u) in utilities.iter().enumerate() {
        if u > utilities[best] {
            best = i;
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;

    fn path(probability: f32, catastrophe: bool) -> Path {
        Path { nodes: vec![0, 1], probability, catastrophe, norm_violations: 0, info_gain: 0.2, energy_cost: 0.1, goal_proximity: 0.5 }
    }

    #[test]
    fn falls_back_to_overall_fitness_with_no_dimensions() {
        let dims = DimensionSystem::new();
        let metrics = vec![
            FitnessMetrics { coherence: 0.9, task_success: 0.9, consistency: 0.9, stability: 0.9, risk_cat: 0.0, alignment: vec![] },
            FitnessMetrics { coherence: 0.1, task_success: 0.1, consistency: 0.1, stability: 0.1, risk_cat: 0.0, alignment: vec![] },
        ];
        assert_eq!(select_action(&metrics, &dims, 0.0), 0);
    }

    #[test]
    fn high_risk_is_penalized() {
        let paths = vec![path(0.5, true), path(0.5, true)];
        let dims = DimensionSystem::new();
        let m = compute_fitness(&paths, &dims, 0);
        assert_eq!(m.risk_cat, 1.0);
    }

    #[test]
    fn ties_break_to_lowest_index() {
        let dims = DimensionSystem::new();
        let metrics = vec![
            FitnessMetrics { coherence: 0.5, task_success: 0.5, consistency: 0.5, stability: 0.5, risk_cat: 0.0, alignment: vec![] },
            FitnessMetrics { coherence: 0.5, task_success: 0.5, consistency: 0.5, stability: 0.5, risk_cat: 0.0, alignment: vec![] },
        ];
        assert_eq!(select_action(&metrics, &dims, 0.0), 0);
    }
}
