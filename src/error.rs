//! Error types for breakeven-vol.
//!
//! Validation failures are returned at the violating call and leave the
//! receiver untouched. Computational failures ([`HedgeError::NonConvergence`])
//! are turned into a sentinel by the solver's infallible entry point.

use thiserror::Error;

/// Convenience alias for results in this crate.
pub type Result<T> = std::result::Result<T, HedgeError>;

#[derive(Debug, Clone, PartialEq, Error)]
#[non_exhaustive]
pub enum HedgeError {
    /// Index or window bound violation.
    #[error("out of range: {message}")]
    OutOfRange { message: String },

    /// Exact date, strike or maturity lookup miss.
    #[error("not found: {message}")]
    NotFound { message: String },

    /// Non-positive strike or dividend yield, degenerate window, bad solver bracket.
    #[error("invalid parameter: {message}")]
    InvalidParameter { message: String },

    /// Bisection exceeded its iteration cap or could not progress.
    #[error("no convergence after {iterations} iterations: {message}")]
    NonConvergence {
        iterations: usize,
        message: String,
    },

    /// Input row count differs from the declared series size.
    #[error("size mismatch: expected {expected} rows, got {actual}")]
    SizeMismatch {
        expected: usize,
        actual: usize,
    },

    /// Text that cannot be read as a date.
    #[error("cannot parse {input:?}: {reason}")]
    Parse {
        input: String,
        reason: String,
    },
}

impl HedgeError {
    pub fn out_of_range(message: impl Into<String>) -> Self {
        Self::OutOfRange {
            message: message.into(),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound {
            message: message.into(),
        }
    }

    pub fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidParameter {
            message: message.into(),
        }
    }

    pub fn non_convergence(iterations: usize, message: impl Into<String>) -> Self {
        Self::NonConvergence {
            iterations,
            message: message.into(),
        }
    }

    /// Emits the error as a warning and hands it back, for `return Err(e.traced())`.
    pub fn traced(self) -> Self {
        tracing::warn!(error = %self, "rejected");
        self
    }
}
