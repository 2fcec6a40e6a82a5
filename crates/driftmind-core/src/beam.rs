//! Beam Phrase Emitter
//!
//! Produces a short token sequence starting at the chosen action's node, by repeatedly
//! expanding the best-scoring hypotheses over outgoing edges. Scoring is multiplicative
//! over several bounded factors; none of them dispatch on relation tag —
//! the tag is consulted only by grammar repair, which decides copula agreement from
//! the node text, not the edge type.

use serde::{Deserialize, Serialize};

use crate::embeddings::cosine;
use crate::graph::Graph;

/// Reasoning mode. Selects a bounded `driver_bias` profile: which chemistry channel
/// the beam favors when walking the graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    Balanced,
    Exploration,
    Exploitation,
    Accuracy,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BeamParams {
    pub width: usize,
    pub expansion: usize,
    pub rep_window: usize,
    pub rep_gamma: f32,
    pub length_norm_beta: f32,
    pub stop_threshold: f32,
    pub max_tokens: usize,
    pub recency_tau_seconds: f32,
}

impl Default for BeamParams {
    fn default() -> Self {
        Self {
            width: 3,
            expansion: 4,
            rep_window: 6,
            rep_gamma: 0.8,
            length_norm_beta: 0.5,
            stop_threshold: 0.02,
            max_tokens: 24,
            recency_tau_seconds: 300.0,
        }
    }
}

#[derive(Debug, Clone)]
struct Hypothesis {
    tokens: Vec<usize>,
    log_score: f32,
}

fn laplace_freq(graph: &Graph, edge_idx: usize, alpha: f32) -> f32 {
    let Some(edge) = graph.edge(edge_idx) else { return 0.0 };
    let siblings = graph.outgoing(edge.source);
    let total_usage: f32 = siblings.iter().filter_map(|&e| graph.edge(e)).map(|e| e.usage_count as f32).sum();
    (edge.usage_count as f32 + alpha) / (total_usage + alpha * siblings.len().max(1) as f32)
}

fn recency(graph: &Graph, edge_idx: usize, now: i64, tau: f32) -> f32 {
    let Some(edge) = graph.edge(edge_idx) else { return 1.0 };
    let dt = (now - edge.last_used).max(0) as f32;
    (-dt / tau).exp()
}

fn repetition_penalty(recent_tokens: &[usize], candidate: usize, window: usize, gamma: f32) -> f32 {
    let tail = &recent_tokens[recent_tokens.len().saturating_sub(window)..];
    let count = tail.iter().filter(|&&t| t == candidate).count() as i32;
    gamma.powi(count)
}

fn length_norm(t: usize, beta: f32) -> f32 {
    1.0 / (5.0 + t as f32).powf(beta)
}

/// Bounded multiplicative modifier in [0.3, 1.3] derived from query/target semantic
/// closeness.
fn semantic_fit(graph: &Graph, target: usize, query_embedding: &[f32]) -> f32 {
    let Some(node) = graph.node(target) else { return 1.0 };
    let sim = cosine(&node.embedding, query_embedding);
    0.8 + 0.5 * sim.clamp(-1.0, 1.0)
}

/// Bounded multiplicative modifier in [0.3, 1.3]. A light proxy for syntactic fit:
/// favors edges whose relation commonly continues a sentence (temporal/isa/consumes)
/// over exact/generalization/leap when the phrase is still short.
fn syntax_fit(graph: &Graph, edge_idx: usize, phrase_len: usize) -> f32 {
    use crate::graph::RelationTag::*;
    let Some(edge) = graph.edge(edge_idx) else { return 1.0 };
    let base = match edge.relation {
        Temporal | Isa | Consumes => 1.1,
        Exact => 1.0,
        Generalization | Leap => 0.9,
    };
    if phrase_len < 2 {
        base
    } else {
        (base * 0.95_f32.powi(phrase_len as i32 - 2)).clamp(0.3, 1.3)
    }
}

/// Bounded multiplicative modifier in [0.3, 1.3]: mode-dependent preference between
/// durable (core_weight/stability) and exploratory (plasticity/energy) chemistry.
fn driver_bias(graph: &Graph, edge_idx: usize, mode: Mode) -> f32 {
    let Some(edge) = graph.edge(edge_idx) else { return 1.0 };
    let c = &edge.chem;
    let score = match mode {
        Mode::Balanced => 1.0,
        Mode::Exploitation | Mode::Accuracy => 0.7 + 0.6 * c.stability,
        Mode::Exploration => 0.7 + 0.6 * c.plasticity_rate * 10.0,
    };
    score.clamp(0.3, 1.3)
}

fn bigram_seen_twice(tokens: &[usize], a: usize, b: usize, window: usize) -> bool {
    let tail = &tokens[tokens.len().saturating_sub(window)..];
    let mut count = 0;
    for w in tail.windows(2) {
        if w[0] == a && w[1] == b {
            count += 1;
        }
    }
    count >= 2
}

fn repeated_trigram(tokens: &[usize]) -> bool {
    let n = tokens.len();
    n >= 6 && tokens[n - 3..] == tokens[n - 6..n - 3]
}

fn score_edge(graph: &Graph, hyp: &Hypothesis, edge_idx: usize, query_embedding: &[f32], mode: Mode, now: i64, params: &BeamParams) -> f32 {
    let edge = match graph.edge(edge_idx) {
        Some(e) => e,
        None => return 0.0,
    };
    let p_freq = laplace_freq(graph, edge_idx, 0.5);
    let syn = syntax_fit(graph, edge_idx, hyp.tokens.len());
    let sem = semantic_fit(graph, edge.target, query_embedding);
    let bias = driver_bias(graph, edge_idx, mode);
    let rec = recency(graph, edge_idx, now, params.recency_tau_seconds);
    let rep = repetition_penalty(&hyp.tokens, edge.target, params.rep_window, params.rep_gamma);
    let len_norm = length_norm(hyp.tokens.len(), params.length_norm_beta);
    p_freq * syn * sem * bias * rec * rep * len_norm
}

/// Emit a short token sequence starting at `start`, scored by the composite edge score.
pub fn emit(graph: &Graph, start: usize, query_embedding: &[f32], mode: Mode, now: i64, params: &BeamParams) -> String {
    let mut beam = vec![Hypothesis { tokens: vec![start], log_score: 0.0 }];

    for step in 0..params.max_tokens {
        let mut expansions: Vec<Hypothesis> = Vec::new();
        for hyp in &beam {
            if is_terminal(graph, hyp, params) {
                expansions.push(hyp.clone());
                continue;
            }
            let last = *hyp.tokens.last().unwrap();
            let mut scored: Vec<(usize, f32)> = graph
                .outgoing(last)
                .iter()
                .map(|&e| (e, score_edge(graph, hyp, e, query_embedding, mode, now, params)))
                .collect();
            scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
            scored.truncate(params.expansion);

            if scored.is_empty() {
                expansions.push(hyp.clone());
                continue;
            }

            for (edge_idx, score) in scored {
                let Some(edge) = graph.edge(edge_idx) else { continue };
                if bigram_seen_twice(&hyp.tokens, last, edge.target, 8) {
                    continue;
                }
                if score < params.stop_threshold {
                    continue;
                }
                let mut tokens = hyp.tokens.clone();
                tokens.push(edge.target);
                expansions.push(Hypothesis { tokens, log_score: hyp.log_score + score.max(1e-6).ln() });
            }
        }

        if expansions.is_empty() {
            break;
        }
        expansions.sort_by(|a, b| b.log_score.partial_cmp(&a.log_score).unwrap_or(std::cmp::Ordering::Equal));
        expansions.truncate(params.width);
        let converged = expansions.iter().all(|h| is_terminal(graph, h, params)) || step == params.max_tokens - 1;
        beam = expansions;
        if converged {
            break;
        }
    }

    let winner = beam
        .into_iter()
        .max_by(|a, b| a.log_score.partial_cmp(&b.log_score).unwrap_or(std::cmp::Ordering::Equal));

    match winner {
        Some(h) if h.tokens.len() > 1 => grammar_repair(graph, &h.tokens),
        _ => "I don't know yet.".to_string(),
    }
}

fn is_terminal(graph: &Graph, hyp: &Hypothesis, params: &BeamParams) -> bool {
    if hyp.tokens.len() >= params.max_tokens {
        return true;
    }
    if let Some(&last) = hyp.tokens.last() {
        if let Some(text) = graph.node_text(last) {
            if text.ends_with('.') || text.ends_with('?') || text.ends_with('!') {
                return true;
            }
        }
    }
    repeated_trigram(&hyp.tokens)
}

/// Capitalize the first token, collapse adjacent duplicate determiners, fix a simple
/// copula agreement, and append a terminal period if missing.
fn grammar_repair(graph: &Graph, tokens: &[usize]) -> String {
    let words: Vec<String> = tokens.iter().filter_map(|&n| graph.node_text(n)).map(|s| s.to_string()).collect();
    if words.is_empty() {
        return "I don't know yet.".to_string();
    }

    let mut out: Vec<String> = Vec::with_capacity(words.len());
    for w in words {
        if let Some(prev) = out.last() {
            if is_determiner(prev) && is_determiner(&w) && prev.eq_ignore_ascii_case(&w) {
                continue;
            }
        }
        out.push(w);
    }

    for i in 1..out.len() {
        if out[i - 1].eq_ignore_ascii_case("a") {
            out[i] = if out[i].ends_with('s') { "are".to_string() } else { "is".to_string() };
        }
    }

    if let Some(first) = out.first_mut() {
        *first = capitalize(first);
    }

    let mut phrase = out.join(" ");
    if !phrase.ends_with(['.', '?', '!']) {
        phrase.push('.');
    }
    phrase
}

fn is_determiner(w: &str) -> bool {
    matches!(w.to_lowercase().as_str(), "the" | "a" | "an")
}

fn capitalize(w: &str) -> String {
    let mut chars = w.chars();
    match chars.next() {
        Some(c) => c.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}
