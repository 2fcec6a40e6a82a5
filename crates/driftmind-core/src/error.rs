//! Error Types
//!
//! The engine distinguishes recoverable conditions (missing node, empty rollout) from
//! fatal ones. Recoverable conditions never reach here — they are absorbed as no-ops
//! or the fallback answer string inside the reasoning loop. Only invariant violations
//! and rejected parameter updates surface as `Err`.

/// Engine error type
#[non_exhaustive]
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// A structural invariant was violated (e.g. vector length mismatch after resize).
    /// The engine marks itself degraded; only a full reset via [`crate::Engine::reset`]
    /// recovers it.
    #[error("invariant violation, engine degraded: {0}")]
    Degraded(String),

    /// `set_evolution_param` was called with a name or value outside its documented
    /// range. The parameter is left unchanged.
    #[error("invalid evolution parameter {name}: {reason}")]
    InvalidParam { name: String, reason: String },

    /// Snapshot export or import failed.
    #[error("snapshot error: {0}")]
    Snapshot(String),
}

/// Engine result type
pub type Result<T> = std::result::Result<T, EngineError>;
