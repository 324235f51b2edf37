//! Error types for taintgraph-engine
//!
//! Provides unified error handling across the crate.

use thiserror::Error;

/// Main error type for engine operations
#[derive(Debug, Error)]
pub enum EngineError {
    /// A control flow graph failed structural validation
    #[error("malformed control flow graph: {0}")]
    MalformedCfg(String),

    /// A scheduled method has no control flow graph and is not marked skip
    #[error("method `{method}` has no control flow graph")]
    MissingCfg { method: String },

    /// The intraprocedural fixpoint did not converge after every node was
    /// visited. Indicates a non-monotonic transfer function or a broken CFG.
    #[error("fixpoint failed to converge for method `{method}`")]
    FixpointDivergence { method: String },

    /// Two analyses were in flight for the same method at once
    #[error("scheduler invariant violated: {0}")]
    SchedulerInvariant(String),

    /// The worker pool could not be constructed
    #[error("failed to build worker pool: {0}")]
    WorkerPool(String),

    /// Model (de)serialization error
    #[error("serialization error: {0}")]
    Serialization(String),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl EngineError {
    /// Create a malformed-CFG error
    pub fn malformed_cfg(msg: impl Into<String>) -> Self {
        EngineError::MalformedCfg(msg.into())
    }

    /// Create a serialization error
    pub fn serialization(msg: impl Into<String>) -> Self {
        EngineError::Serialization(msg.into())
    }
}

/// Result type alias for engine operations
pub type Result<T> = std::result::Result<T, EngineError>;
