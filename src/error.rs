use thiserror::Error;

/// Failures surfaced by the vorticity model.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SolverError {
    /// Rejected at initialization: grid, timestep or parameter values that
    /// cannot produce a valid run.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Fatal blow-up detected while stepping. The state that produced it is
    /// left untouched.
    #[error("numerical instability at step {step} (t = {time:.6}): {reason}")]
    NumericalInstability { step: u64, time: f64, reason: String },

    /// A field does not match the configured grid.
    #[error("field shape mismatch: expected {expected} values, found {found}")]
    TransformShape { expected: usize, found: usize },
}

pub type Result<T> = std::result::Result<T, SolverError>;

impl SolverError {
    pub(crate) fn config(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_instability_message_carries_context() {
        let err = SolverError::NumericalInstability {
            step: 12,
            time: 0.5,
            reason: "non-finite vorticity".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("step 12"), "got {msg}");
        assert!(msg.contains("0.500000"), "got {msg}");
        assert!(msg.contains("non-finite"), "got {msg}");
    }

    #[test]
    fn test_shape_message() {
        let err = SolverError::TransformShape { expected: 16, found: 15 };
        assert_eq!(err.to_string(), "field shape mismatch: expected 16 values, found 15");
    }
}
