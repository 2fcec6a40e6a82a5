//! Reasoning Loop
//!
//! Orchestrates the field, chemistry, dimension, trace, rollout, fitness, and beam
//! subsystems into the `answer`/`learn` operations exposed to a host. One call is the
//! unit of mutation: no two calls may overlap on the same [`Engine`].

use std::collections::VecDeque;

use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};

use crate::beam::{self, BeamParams, Mode};
use crate::chemistry::{self, ChemistryConstants};
use crate::dimensions::DimensionSystem;
use crate::embeddings::{cosine, embed, EMBEDDING_DIMENSIONS};
use crate::error::{EngineError, Result};
use crate::field::ContextField;
use crate::fitness::{self, FitnessMetrics};
use crate::graph::{canonicalize, Graph, RelationTag};
use crate::rollout::{self, Action, RolloutParams};
use crate::traces::EligibilityTraces;

/// Hyperparameters tunable at runtime via [`Engine::set_evolution_param`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvolutionParams {
    pub alpha: f32,
    pub beta: f32,
    pub lambda: f32,
    pub tau: f32,
    pub eta: f32,
    pub solver_iters: usize,
    pub top_k: usize,
    pub maintenance_every: u32,
    pub rollout: RolloutParams,
    pub beam: BeamParams,
}

impl Default for EvolutionParams {
    fn default() -> Self {
        Self {
            alpha: 0.3,
            beta: 0.1,
            lambda: 0.2,
            tau: 0.5,
            eta: 0.3,
            solver_iters: 10,
            top_k: 5,
            maintenance_every: 10,
            rollout: RolloutParams::default(),
            beam: BeamParams::default(),
        }
    }
}

/// Read-only snapshot of the engine's size and health, returned by [`Engine::get_metrics`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Metrics {
    pub node_count: usize,
    pub edge_count: usize,
    pub active_dimensions: usize,
    pub promotion_threshold: f32,
    pub learning_rate: f32,
    pub baseline_fitness: f32,
    pub chemistry_stats: crate::chemistry::ChemistryStats,
    pub degraded: bool,
}

/// The owning container for graph, field, chemistry constants, dimensions, and traces.
/// No process-wide state: every engine instance (and every [`crate::snapshot::Snapshot`])
/// is self-contained.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Engine {
    pub(crate) graph: Graph,
    pub(crate) field: ContextField,
    pub(crate) chemistry_constants: ChemistryConstants,
    pub(crate) dimensions: DimensionSystem,
    pub(crate) traces: EligibilityTraces,
    pub(crate) params: EvolutionParams,
    cycle: u64,
    degraded: bool,
    clock: i64,
    #[serde(skip, default = "default_rng")]
    rng: StdRng,
}

fn default_rng() -> StdRng {
    StdRng::from_entropy()
}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}

impl Engine {
    pub fn new() -> Self {
        Self {
            graph: Graph::new(),
            field: ContextField::new(),
            chemistry_constants: ChemistryConstants::default(),
            dimensions: DimensionSystem::new(),
            traces: EligibilityTraces::new(),
            params: EvolutionParams::default(),
            cycle: 0,
            degraded: false,
            clock: 0,
            rng: StdRng::from_entropy(),
        }
    }

    /// Construct with a fixed RNG seed, for test reproducibility.
    pub fn with_seed(seed: u64) -> Self {
        let mut engine = Self::new();
        engine.rng = StdRng::seed_from_u64(seed);
        engine
    }

    /// Reset a degraded engine back to a fresh, empty state. The only recovery path
    /// after an invariant violation.
    pub fn reset(&mut self) {
        *self = Self::new();
    }

    pub fn is_degraded(&self) -> bool {
        self.degraded
    }

    fn tick_clock(&mut self) -> i64 {
        self.clock += 1;
        self.clock
    }

    /// Feed a teaching sentence: tokenize on whitespace/punctuation and upsert temporal
    /// edges between consecutive tokens, plus `isa` for "X is/are Y" and `consumes` for
    /// "X eat(s)/drink(s) Y".
    pub fn learn(&mut self, text: &str) {
        let now = self.tick_clock();
        let tokens = tokenize(text);
        if tokens.is_empty() {
            return;
        }
        let indices: Vec<usize> = tokens.iter().map(|t| self.graph.insert_or_fetch_node(t, now)).collect();

        for w in indices.windows(2) {
            self.graph.upsert_edge(w[0], w[1], RelationTag::Temporal, now);
        }

        for i in 0..tokens.len() {
            if i + 2 < tokens.len() && (tokens[i + 1] == "is" || tokens[i + 1] == "are") {
                self.graph.upsert_edge(indices[i], indices[i + 2], RelationTag::Isa, now);
            }
            if i + 2 < tokens.len() && is_consumption_verb(&tokens[i + 1]) {
                self.graph.upsert_edge(indices[i], indices[i + 2], RelationTag::Consumes, now);
            }
        }
        tracing::debug!(tokens = tokens.len(), "learn: ingested teaching sentence");
    }

    /// Answer a query: runs the full reasoning cycle and returns an emitted phrase.
    pub fn answer(&mut self, query: &str, mode: Mode) -> Result<String> {
        let n = self.graph.node_count();
        self.field.resize(n);
        self.dimensions.resize(n);

        if n == 0 {
            return Ok("I don't know yet.".to_string());
        }
        if self.field.len() != n || self.dimensions_len() != n {
            self.degraded = true;
            return Err(EngineError::Degraded("field/dimension length mismatch after resize".into()));
        }

        let now = self.tick_clock();
        let query_embedding = embed(query, EMBEDDING_DIMENSIONS);
        let query_lower = canonicalize(query);

        // Step 2: relevance vector A.
        let mut a = vec![0.0f32; n];
        for (i, node) in self.graph.nodes.iter().enumerate() {
            let mut score = cosine(&node.embedding, &query_embedding);
            if query_lower.contains(node.text.as_str()) {
                score += 0.5;
            }
            a[i] = score;
        }

        // Step 3: warm-start with a few small diffusion-inject-decay passes.
        for _ in 0..3 {
            self.field.inject(&a, self.params.alpha, 0.1);
            self.field.diffuse_chemistry(&self.graph, 0.1);
            self.field.decay(self.params.lambda, 0.1);
        }

        // Step 4: enumerate actions.
        let action_nodes = self.field.top_k(self.params.top_k);
        if action_nodes.is_empty() {
            return Ok("I don't know yet.".to_string());
        }
        let actions: Vec<Action> = action_nodes.iter().map(|&node| Action { node }).collect();

        // Step 5: rollouts per action (independent given a snapshot; run sequentially here).
        let rollouts: Vec<Vec<crate::rollout::Path>> = actions
            .iter()
            .map(|&action| rollout::rollout(&self.graph, &self.field, action, &self.params.rollout, &mut self.rng))
            .collect();

        // Step 6.
        self.dimensions.observe(&self.field.c);

        // Step 7.
        let metrics: Vec<FitnessMetrics> =
            rollouts.iter().map(|paths| fitness::compute_fitness(paths, &self.dimensions, 0)).collect();

        // Step 8.
        let best = fitness::select_action(&metrics, &self.dimensions, 0.0);
        let best_action = actions[best];
        let best_metrics = &metrics[best];

        // Step 9.
        self.dimensions.evaluate_and_attribute(best_metrics.to_record(0.0));

        // Step 10. Cycle is incremented here so steps 10 and 15 gate their "every Nth
        // cycle" maintenance off the same counter value and fire together, per §5.
        self.cycle += 1;
        self.dimensions.promote();
        self.dimensions.demote();
        if self.cycle % u64::from(self.params.maintenance_every) == 0 {
            self.dimensions.compress();
        }

        // Step 11.
        self.traces.resize(self.dimensions.active.len(), n);
        self.traces.decay(0.9);
        for paths in &rollouts {
            self.traces.backproject(paths, &self.dimensions, self.params.rollout.discount);
        }

        // Step 12.
        let before = self.field.c.clone();
        let r_snapshot = self.field.r.clone();
        let (gammas, driver_fields) = self.dimensions.generate_fields(&self.graph);
        self.field.solve_equilibrium(
            &self.graph,
            &a,
            &r_snapshot,
            &driver_fields,
            &gammas,
            self.params.alpha,
            self.params.beta,
            self.params.tau,
            self.params.lambda,
            self.params.eta,
            self.params.solver_iters,
        );

        // Step 13.
        let phrase = beam::emit(&self.graph, best_action.node, &query_embedding, mode, now, &self.params.beam);

        // Step 14.
        if let Some(r) = self.field.r.get_mut(best_action.node) {
            *r += 0.1;
        }

        // Step 15: metabolize chemistry, then periodic maintenance/meta-learning.
        let overall = best_metrics.overall(0.0);
        self.metabolize(&a, &before, overall);
        if self.cycle % u64::from(self.params.maintenance_every) == 0 {
            chemistry::prune(&mut self.graph, &self.chemistry_constants);
            chemistry::fuse(&mut self.graph, &self.chemistry_constants);
            chemistry::split(&mut self.graph, &self.chemistry_constants, &mut self.rng);
            self.dimensions.meta_learn();
        }

        Ok(phrase)
    }

    fn dimensions_len(&self) -> usize {
        self.field.len()
    }

    fn metabolize(&mut self, a: &[f32], before: &[f32], fitness_overall: f32) {
        let fitness_signal = fitness_overall - self.dimensions.baseline;
        let after = self.field.c.clone();
        let n = self.graph.node_count();
        let edge_count = self.graph.edge_count();
        for idx in 0..edge_count {
            let (src, dst) = {
                let e = &self.graph.edges[idx];
                (e.source, e.target)
            };
            if src >= n || dst >= n {
                continue;
            }
            let a_a = a.get(src).copied().unwrap_or(0.0);
            let a_b = a.get(dst).copied().unwrap_or(0.0);
            let delta_c_a = after[src] - before.get(src).copied().unwrap_or(0.0);
            let delta_c_b = after[dst] - before.get(dst).copied().unwrap_or(0.0);
            chemistry::update_chemistry(
                &mut self.graph.edges[idx].chem,
                a_a,
                a_b,
                delta_c_a,
                delta_c_b,
                fitness_signal,
                &self.chemistry_constants,
            );
        }
    }

    /// Read-only metrics snapshot.
    pub fn get_metrics(&self) -> Metrics {
        Metrics {
            node_count: self.graph.node_count(),
            edge_count: self.graph.edge_count(),
            active_dimensions: self.dimensions.active.len(),
            promotion_threshold: self.dimensions.params.promotion_threshold,
            learning_rate: self.dimensions.params.learning_rate,
            baseline_fitness: self.dimensions.baseline,
            chemistry_stats: chemistry::stats(&self.graph),
            degraded: self.degraded,
        }
    }

    /// Update one evolution parameter by name. Rejects out-of-range values, leaving the
    /// parameter unchanged.
    pub fn set_evolution_param(&mut self, name: &str, value: f32) -> Result<()> {
        let reject = |reason: &str| {
            Err(EngineError::InvalidParam { name: name.to_string(), reason: reason.to_string() })
        };
        match name {
            "alpha" => {
                if !(0.0..=2.0).contains(&value) {
                    return reject("alpha must be in [0, 2]");
                }
                self.params.alpha = value;
            }
            "beta" => {
                if !(0.0..=2.0).contains(&value) {
                    return reject("beta must be in [0, 2]");
                }
                self.params.beta = value;
            }
            "lambda" => {
                if !(0.0..=2.0).contains(&value) {
                    return reject("lambda must be in [0, 2]");
                }
                self.params.lambda = value;
            }
            "tau" => {
                if !(0.0..=2.0).contains(&value) {
                    return reject("tau must be in [0, 2]");
                }
                self.params.tau = value;
            }
            "rollout_horizon" => {
                if !(1.0..=20.0).contains(&value) {
                    return reject("rollout_horizon must be in [1, 20]");
                }
                self.params.rollout.horizon = value as usize;
            }
            "rollout_branches" => {
                if !(1.0..=64.0).contains(&value) {
                    return reject("rollout_branches must be in [1, 64]");
                }
                self.params.rollout.branches = value as usize;
            }
            _ => return reject("unknown parameter name"),
        }
        Ok(())
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn field_value(&self, key: u64) -> Option<f32> {
        let idx = self.graph.index_of_key(key)?;
        self.field.c.get(idx).copied()
    }

    pub fn has_node_text(&self, text: &str) -> Option<u64> {
        let canonical = canonicalize(text);
        let key = crate::graph::node_key(&canonical);
        self.graph.index_of_key(key).map(|_| key)
    }

    pub fn top_k_texts(&self, k: usize) -> Vec<String> {
        self.field.top_k(k).into_iter().filter_map(|i| self.graph.node_text(i).map(str::to_string)).collect()
    }

    pub fn recent_fitness(&self, n: usize) -> VecDeque<f32> {
        self.dimensions.history.iter().rev().take(n).map(|r| r.overall).collect()
    }
}

fn tokenize(text: &str) -> Vec<String> {
    text.split(|c: char| c.is_whitespace() || (c.is_ascii_punctuation() && c != '\''))
        .map(|s| s.trim().to_lowercase())
        .filter(|s| !s.is_empty())
        .collect()
}

fn is_consumption_verb(word: &str) -> bool {
    matches!(word, "eat" | "eats" | "drink" | "drinks")
}
