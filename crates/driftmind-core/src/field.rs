//! Context Field
//!
//! The dense vector of node potentials that represents "what is currently in mind".
//! Two forces relax it each cycle: chemistry-driven diffusion along edges, and driver
//! fields injected by active dimensions, balanced against a uniform decay. The
//! equilibrium solver trades iteration count for cheap re-solves every call — accuracy
//! is deliberately loose, trading accuracy for a cheap re-solve every cycle.

use serde::{Deserialize, Serialize};

use crate::graph::Graph;

/// Context field: potentials `c` plus the parallel reasoning-reinforcement vector `r`.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ContextField {
    pub c: Vec<f32>,
    pub r: Vec<f32>,
}

impl ContextField {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.c.len()
    }

    pub fn is_empty(&self) -> bool {
        self.c.is_empty()
    }

    /// Extend `c` and `r` to length `n`, zero-filling new entries. Never truncates.
    pub fn resize(&mut self, n: usize) {
        if self.c.len() < n {
            self.c.resize(n, 0.0);
        }
        if self.r.len() < n {
            self.r.resize(n, 0.0);
        }
    }

    /// `C <- C + eta * alpha * A`
    pub fn inject(&mut self, a: &[f32], alpha: f32, eta: f32) {
        for (c, &ai) in self.c.iter_mut().zip(a.iter()) {
            let delta = eta * alpha * ai;
            *c = clamp_finite(*c + delta);
        }
    }

    /// One pass of chemistry-driven diffusion, visiting every edge exactly once.
    pub fn diffuse_chemistry(&mut self, graph: &Graph, eta: f32) {
        let mut deltas = vec![0.0f32; self.c.len()];
        for (_, edge) in graph.iter_edges() {
            let a = edge.source;
            let b = edge.target;
            if a >= self.c.len() || b >= self.c.len() {
                continue; // missing-key: no-op for this edge
            }
            let gradient = self.c[a] - self.c[b];
            let base_flow = edge.chem.conductivity * edge.chem.affinity * gradient;
            let directional_factor = if gradient >= 0.0 {
                1.0 + edge.chem.directional_bias
            } else {
                1.0 - edge.chem.directional_bias
            };
            let inertia = 0.1 * edge.chem.energy_potential;
            let flow = base_flow * directional_factor + inertia;
            deltas[a] -= eta * flow;
            deltas[b] += eta * flow;
        }
        for (c, d) in self.c.iter_mut().zip(deltas) {
            *c = clamp_finite(*c + d);
        }
    }

    /// `C <- (1 - eta*lambda) * C`
    pub fn decay(&mut self, lambda: f32, eta: f32) {
        let factor = 1.0 - eta * lambda;
        for c in self.c.iter_mut() {
            *c = clamp_finite(*c * factor);
        }
    }

    /// Warm-started damped Jacobi solve of `(lambda*I + tau*L) C = alpha*A + beta*R + sum
    /// gamma_k * D_k`, fixed iteration count. Idempotent when inputs don't change.
    #[allow(clippy::too_many_arguments)]
    pub fn solve_equilibrium(
        &mut self,
        graph: &Graph,
        a: &[f32],
        r: &[f32],
        drivers: &[Vec<f32>],
        gammas: &[f32],
        alpha: f32,
        beta: f32,
        tau: f32,
        lambda: f32,
        eta: f32,
        iters: usize,
    ) {
        let n = self.c.len();
        if n == 0 {
            return;
        }

        let mut rhs = vec![0.0f32; n];
        for i in 0..n {
            rhs[i] += alpha * a.get(i).copied().unwrap_or(0.0);
            rhs[i] += beta * r.get(i).copied().unwrap_or(0.0);
        }
        for (driver, &gamma) in drivers.iter().zip(gammas) {
            for i in 0..n {
                rhs[i] += gamma * driver.get(i).copied().unwrap_or(0.0);
            }
        }

        // Precompute weighted degree and neighbor lists once per solve.
        let mut neighbors: Vec<Vec<(usize, f32)>> = vec![Vec::new(); n];
        let mut degree = vec![0.0f32; n];
        for (_, edge) in graph.iter_edges() {
            let (a_i, b_i) = (edge.source, edge.target);
            if a_i >= n || b_i >= n {
                continue;
            }
            let w = edge.weight();
            neighbors[a_i].push((b_i, w));
            neighbors[b_i].push((a_i, w));
            degree[a_i] += w;
            degree[b_i] += w;
        }

        for _ in 0..iters {
            let mut c_prime = self.c.clone();
            for i in 0..n {
                let mut laplacian_term = 0.0f32;
                for &(j, w) in &neighbors[i] {
                    laplacian_term += w * (self.c[i] - self.c[j]);
                }
                let denom = lambda + tau * degree[i];
                c_prime[i] = if denom.abs() > f32::EPSILON {
                    (rhs[i] - tau * laplacian_term) / denom
                } else {
                    self.c[i]
                };
            }
            for i in 0..n {
                self.c[i] = clamp_finite((1.0 - eta) * self.c[i] + eta * c_prime[i]);
            }
        }
    }

    /// Indices of the `k` largest potentials, descending; ties broken by lower index.
    pub fn top_k(&self, k: usize) -> Vec<usize> {
        let mut idx: Vec<usize> = (0..self.c.len()).collect();
        idx.sort_by(|&a, &b| {
            self.c[b]
                .partial_cmp(&self.c[a])
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(a.cmp(&b))
        });
        idx.truncate(k);
        idx
    }
}

fn clamp_finite(x: f32) -> f32 {
    if x.is_finite() {
        x
    } else {
        0.0
    }
}
