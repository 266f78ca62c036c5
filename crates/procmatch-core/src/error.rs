//! Error types for the analysis core.
//!
//! Most malformed-input conditions degrade locally (logged, partial result)
//! instead of surfacing here; see the relation-inference and projection
//! modules. Errors are reserved for API misuse a caller must handle.

use thiserror::Error;

use crate::tree::TreeId;

/// Errors of the analysis core.
#[derive(Debug, Error)]
pub enum AnalysisError {
    /// A comparator was requested for a tree whose process type has not
    /// been determined yet.
    #[error("process type has not been determined for tree {0}")]
    ProcessTypeMissing(TreeId),
}
