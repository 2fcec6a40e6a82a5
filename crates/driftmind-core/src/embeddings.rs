//! Deterministic Hash-Seeded Embeddings
//!
//! The engine has no network or model-loading dependency: `embed()` derives a
//! unit-normalized vector purely from the text's bytes, seeded through the same
//! FNV-1a hash used for node identity (see [`crate::graph::fnv1a_64`]). This gives the
//! stability a reasoning engine needs (deterministic, stable across calls) without
//! pulling in an ONNX runtime for what is just one pluggable collaborator among several.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use crate::graph::{canonicalize, fnv1a_64};

/// Embedding dimensionality used throughout the engine (matches the reference's D=128).
pub const EMBEDDING_DIMENSIONS: usize = 128;

/// Deterministic, unit-normalized pseudo-random embedding for `text`.
pub fn embed(text: &str, dim: usize) -> Vec<f32> {
    let canonical = canonicalize(text);
    let seed = fnv1a_64(canonical.as_bytes());
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut v: Vec<f32> = (0..dim).map(|_| rng.gen_range(-1.0f32..=1.0f32)).collect();
    normalize(&mut v);
    v
}

/// Cosine similarity between two equal-length vectors. Returns 0.0 for a zero vector
/// rather than dividing by zero.
pub fn cosine(a: &[f32], b: &[f32]) -> f32 {
    let n = a.len().min(b.len());
    let mut dot = 0.0f32;
    let mut na = 0.0f32;
    let mut nb = 0.0f32;
    for i in 0..n {
        dot += a[i] * b[i];
        na += a[i] * a[i];
        nb += b[i] * b[i];
    }
    if na <= f32::EPSILON || nb <= f32::EPSILON {
        return 0.0;
    }
    (dot / (na.sqrt() * nb.sqrt())).clamp(-1.0, 1.0)
}

fn normalize(v: &mut [f32]) {
    let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > f32::EPSILON {
        for x in v.iter_mut() {
            *x /= norm;
        }
    }
}
