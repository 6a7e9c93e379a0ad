use thiserror::Error;

/// Crate-wide result alias for training operations that may produce a [`GmmError`].
pub type GmmResult<T> = Result<T, GmmError>;

/// Errors raised while validating, initializing or training a mixture.
///
/// Numerical degeneracies (starved components, non-positive variances) are *not* errors; they are
/// absorbed per component and reported through [`Diagnostics`](crate::algorithms::Diagnostics).
#[derive(Debug, Clone, PartialEq, Error)]
pub enum GmmError {
    /// MAP adaptation was requested without a prior model.
    #[error("no prior model has been set, MAP adaptation requires one")]
    MissingPriorModel,
    /// The dataset contains no samples.
    #[error("the dataset contains no samples")]
    EmptyDataset,
    /// An M-step was requested from statistics which have not accumulated any samples.
    #[error("the sufficient statistics have not accumulated any samples")]
    EmptyStatistics,
    /// A sample does not have the dimension of the model.
    #[error("sample #{index} has dimension {found}, expected {expected}")]
    SampleDimension {
        /// Index of the offending sample.
        index: usize,
        /// Dimension of the model.
        expected: usize,
        /// Dimension of the sample.
        found: usize,
    },
    /// A sample contains a NaN or infinite entry.
    #[error("sample #{index} contains a non-finite value")]
    NonFiniteSample {
        /// Index of the offending sample.
        index: usize,
    },
    /// A parameter vector or matrix does not have the shape of the model.
    #[error("{parameter} has shape {found:?}, expected {expected:?}")]
    ParameterShape {
        /// Name of the parameter (`"weights"`, `"means"` or `"variances"`).
        parameter: &'static str,
        /// Expected `(rows, columns)`.
        expected: (usize, usize),
        /// Given `(rows, columns)`.
        found: (usize, usize),
    },
    /// The prior model does not have the same number of components and inputs as the model being
    /// trained.
    #[error("prior model has shape {found:?} (components, inputs), expected {expected:?}")]
    PriorShape {
        /// `(components, inputs)` of the model being trained.
        expected: (usize, usize),
        /// `(components, inputs)` of the prior model.
        found: (usize, usize),
    },
    /// The sufficient statistics were accumulated for a model of a different shape.
    #[error("statistics have shape {found:?} (components, inputs), expected {expected:?}")]
    StatisticsShape {
        /// `(components, inputs)` of the model.
        expected: (usize, usize),
        /// `(components, inputs)` of the statistics.
        found: (usize, usize),
    },
    /// The parameters of a mixture violate one of its invariants.
    #[error("invalid mixture parameters: {reason}")]
    InvalidParameters {
        /// Description of the violated invariant.
        reason: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        assert_eq!(
            GmmError::MissingPriorModel.to_string(),
            "no prior model has been set, MAP adaptation requires one"
        );
        assert_eq!(
            GmmError::SampleDimension {
                index: 3,
                expected: 2,
                found: 5
            }
            .to_string(),
            "sample #3 has dimension 5, expected 2"
        );
        assert_eq!(
            GmmError::PriorShape {
                expected: (4, 2),
                found: (8, 2)
            }
            .to_string(),
            "prior model has shape (8, 2) (components, inputs), expected (4, 2)"
        );
    }
}
