//! # Driftmind Core
//!
//! An emergent-dimensional reasoning engine over a directed, weighted, typed concept
//! multigraph. Each concept is a node; each relation between concepts is an edge
//! carrying a six-parameter "chemistry" (conductivity, affinity, plasticity rate,
//! stability, directional bias, energy potential) that evolves with use. A continuous
//! context field diffuses relevance across the graph each cycle; clusters of
//! consistently co-active, high-variance nodes are promoted into named "dimensions"
//! that bias future field solves and rollouts — the engine's model of its own emerging
//! structure, built and pruned without external supervision.
//!
//! ## Cycle
//!
//! One [`Engine::answer`] call is the unit of mutation: relevance injection, field
//! equilibrium, dimension attribution, eligibility-trace backprojection, rollout-scored
//! action selection, phrase emission, and chemistry metabolism all happen within that
//! single call. [`Engine::learn`] only ingests graph structure; it does
//! not touch the field or chemistry.
//!
//! ## Quick start
//!
//! ```
//! use driftmind_core::{Engine, Mode};
//!
//! let mut engine = Engine::with_seed(7);
//! engine.learn("cats are mammals");
//! let reply = engine.answer("what are cats?", Mode::Balanced).unwrap();
//! assert!(reply.contains("mammals"));
//! ```
//!
//! ## Modules
//!
//! - [`graph`] — the concept multigraph: nodes, typed edges, chemistry storage.
//! - [`embeddings`] — deterministic hash-seeded text embeddings.
//! - [`chemistry`] — per-edge chemistry update law, pruning, fusion, splitting.
//! - [`field`] — context field diffusion and damped-Jacobi equilibrium solve.
//! - [`dimensions`] — emergent dimension promotion, demotion, compression, meta-learning.
//! - [`rollout`] — weighted-random branch rollouts used to score candidate actions.
//! - [`fitness`] — per-action fitness scoring and action selection.
//! - [`traces`] — decaying eligibility traces backprojected from rollouts.
//! - [`beam`] — beam-search phrase emission with grammar repair.
//! - [`engine`] — the reasoning loop tying every subsystem together.
//! - [`snapshot`] — opaque, versioned export/import of engine state.
//! - [`error`] — the engine's error and result types.

pub mod beam;
pub mod chemistry;
pub mod dimensions;
pub mod embeddings;
pub mod engine;
pub mod error;
pub mod field;
pub mod fitness;
pub mod graph;
pub mod rollout;
pub mod snapshot;
pub mod traces;

pub use beam::{BeamParams, Mode};
pub use chemistry::{Chemistry, ChemistryConstants, ChemistryStats};
pub use dimensions::{Dimension, DimensionParams, DimensionSystem, FitnessRecord};
pub use embeddings::{cosine, embed, EMBEDDING_DIMENSIONS};
pub use engine::{Engine, EvolutionParams, Metrics};
pub use error::{EngineError, Result};
pub use field::ContextField;
pub use fitness::FitnessMetrics;
pub use graph::{Edge, Graph, Node, RelationTag};
pub use rollout::{Action, Path, RolloutParams};
pub use snapshot::Snapshot;
pub use traces::EligibilityTraces;

/// Crate version, as declared in `Cargo.toml`.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
