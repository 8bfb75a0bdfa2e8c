//! Error types for ctrlrisk computations.

use thiserror::Error;

/// Errors returned by the risk engines and the statistical toolkit.
///
/// "Insufficient data" and "no variance" are not errors: the statistical
/// functions report them through a status on their result instead.
///
/// This enum is marked `#[non_exhaustive]` to allow adding new error variants
/// in the future without breaking changes.
#[non_exhaustive]
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RiskError {
    /// Beta shape parameters must both be strictly positive and finite.
    #[error("invalid prior: alpha={alpha}, beta={beta} (both must be > 0)")]
    InvalidPrior { alpha: f64, beta: f64 },

    /// Paired inputs with unequal lengths.
    #[error("dimension mismatch: {left} vs {right}")]
    DimensionMismatch { left: usize, right: usize },

    /// The dependency graph could not be fully ordered.
    #[error("cycle detected among controls: {}", unresolved.join(", "))]
    CycleDetected { unresolved: Vec<String> },

    /// An edge or what-if request names a control absent from the node list.
    #[error("unknown control '{node_id}' referenced by {context}")]
    UnknownNodeReference { node_id: String, context: String },

    /// A probability-valued input outside [0, 1] or non-finite.
    #[error("invalid probability for {field}: {value}")]
    InvalidProbability { field: String, value: f64 },

    /// Configuration or input validation failure.
    #[error("validation error: {0}")]
    ValidationError(String),

    /// Numerical stability error (NaN/Inf produced by an otherwise valid input).
    #[error("numerical error: {0}")]
    Numerical(String),
}

impl RiskError {
    pub(crate) fn check_probability(field: &str, value: f64) -> Result<f64, RiskError> {
        if value.is_finite() && (0.0..=1.0).contains(&value) {
            Ok(value)
        } else {
            Err(RiskError::InvalidProbability {
                field: field.to_string(),
                value,
            })
        }
    }
}
