//! End-to-end scenarios against the public `Engine` surface.

use std::collections::HashSet;

use driftmind_core::{Dimension, DimensionSystem, Engine, Graph, Mode, RelationTag};

#[test]
fn s1_learn_isa_then_answer_contains_target_and_top_k() {
    let mut e = Engine::with_seed(7);
    e.learn("cats are mammals");
    let reply = e.answer("what are cats?", Mode::Balanced).unwrap();
    assert!(reply.contains("mammals"));
    assert!(reply.ends_with('.'));
    let top = e.top_k_texts(5);
    assert!(top.iter().any(|t| t == "cats"));
}

#[test]
fn s2_learn_consumes_then_answer_contains_target() {
    let mut e = Engine::with_seed(7);
    e.learn("cats drink water");
    let reply = e.answer("what do cats drink?", Mode::Balanced).unwrap();
    assert!(reply.contains("water"));
}

#[test]
fn s3_chained_temporal_learning_activates_heat() {
    let mut e = Engine::with_seed(11);
    e.learn("fire produces heat");
    e.learn("heat causes warmth");
    e.learn("warmth feels good");

    let reply = e.answer("heat", Mode::Balanced).unwrap();
    assert!(reply.split_whitespace().count() >= 3);

    let heat_key = e.has_node_text("heat").expect("heat must exist after learn");
    let heat_c = e.field_value(heat_key).expect("heat must have a field value");
    assert!(heat_c > 0.0);
}

#[test]
fn s4_repeated_answering_stabilizes_baseline_and_grows_dimensions() {
    let mut e = Engine::with_seed(11);
    e.learn("fire produces heat");
    e.learn("heat causes warmth");
    e.learn("warmth feels good");

    for _ in 0..50 {
        let _ = e.answer("heat", Mode::Balanced);
    }

    let last20 = e.recent_fitness(20);
    let mean = last20.iter().sum::<f32>() / last20.len().max(1) as f32;
    let variance = last20.iter().map(|v| (v - mean).powi(2)).sum::<f32>() / last20.len().max(1) as f32;
    assert!(variance < 0.2, "fitness variance did not stabilize: {variance}");

    let metrics = e.get_metrics();
    assert!(metrics.active_dimensions >= 1);
}

#[test]
fn s5_repeated_upsert_collapses_to_one_edge_with_growing_usage() {
    let mut g = Graph::new();
    let a = g.insert_or_fetch_node("source", 0);
    let b = g.insert_or_fetch_node("sink", 0);

    let mut last_weight = 0.0f32;
    for i in 0..200 {
        let idx = g.upsert_edge(a, b, RelationTag::Temporal, i);
        let edge = g.edge(idx).unwrap();
        assert!(edge.weight() >= last_weight);
        last_weight = edge.weight();
    }

    assert_eq!(g.edge_count(), 1);
    assert_eq!(g.edge(0).unwrap().usage_count, 200);
}

#[test]
fn s6_compress_reduces_near_duplicate_dimensions_to_one() {
    let mut g = Graph::new();
    let primary = g.insert_or_fetch_node("center", 0);

    let mut dims = DimensionSystem::new();
    dims.resize(1);
    for i in 0..5 {
        dims.active.push(Dimension {
            primary,
            cluster: HashSet::from([primary]),
            variance_impact: 0.9,
            gamma: 0.1 * (i as f32 + 1.0),
            stability: 0.5,
            age: 0,
            // Pairwise cosine similarity > 0.9: near-identical unit-ish vectors.
            driver_field: vec![1.0, 0.01 * i as f32],
        });
    }

    dims.compress();
    assert_eq!(dims.active.len(), 1);
}
