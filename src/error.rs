use std::fmt;
use thiserror::Error;

/// Errors returned by the estimators and helpers in this crate.
#[derive(Debug, Error)]
pub enum SdrError {
    #[error("invalid shape for {what}: expected {expected}, found {found}")]
    InvalidShape {
        what: &'static str,
        expected: usize,
        found: usize,
    },

    #[error("degenerate response: every observation has y = {value}, nothing to slice")]
    DegenerateResponse { value: f64 },

    #[error("{estimator} has not been fitted yet")]
    NotFitted { estimator: &'static str },

    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("non-finite value in {what} at index {index}")]
    NonFiniteInput { what: &'static str, index: usize },

    #[error("numerical instability: {0}")]
    NumericalInstability(String),

    #[error("decomposition backend failed: {0}")]
    Backend(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, SdrError>;

/// Non-fatal conditions raised while fitting.
///
/// They are logged at `warn` level and kept on the fitted state so callers
/// can inspect them after the fact.
#[derive(Debug, Clone, PartialEq)]
pub enum Advisory {
    /// More slices were requested than there are observations.
    SlicesClamped { requested: usize, used: usize },
    /// More directions were requested than the data can support.
    DirectionsClamped { requested: usize, used: usize },
    /// The feature covariance was singular or close to it; `dropped`
    /// eigen-directions were discarded (or ridged) during whitening.
    RankDeficientCovariance {
        rank: usize,
        n_features: usize,
        dropped: usize,
    },
}

impl fmt::Display for Advisory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Advisory::SlicesClamped { requested, used } => write!(
                f,
                "n_slices={} exceeds the number of observations, using {}",
                requested, used
            ),
            Advisory::DirectionsClamped { requested, used } => write!(
                f,
                "n_directions={} exceeds what the data supports, using {}",
                requested, used
            ),
            Advisory::RankDeficientCovariance {
                rank,
                n_features,
                dropped,
            } => write!(
                f,
                "feature covariance has numerical rank {} of {} ({} eigen-directions regularized)",
                rank, n_features, dropped
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages_carry_context() {
        let err = SdrError::InvalidShape {
            what: "response length",
            expected: 10,
            found: 9,
        };
        assert_eq!(
            err.to_string(),
            "invalid shape for response length: expected 10, found 9"
        );

        let err = SdrError::NotFitted {
            estimator: "SlicedInverseRegression",
        };
        assert!(err.to_string().contains("SlicedInverseRegression"));
    }

    #[test]
    fn test_backend_error_conversion() {
        let err: SdrError = anyhow::anyhow!("svd did not converge").into();
        assert!(matches!(err, SdrError::Backend(_)));
        assert!(err.to_string().contains("svd did not converge"));
    }

    #[test]
    fn test_advisory_display() {
        let advisory = Advisory::SlicesClamped {
            requested: 20,
            used: 5,
        };
        assert_eq!(
            advisory.to_string(),
            "n_slices=20 exceeds the number of observations, using 5"
        );
    }
}
