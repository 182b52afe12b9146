use std::error::Error;
use std::fmt;

/// Errors raised on the request path, between a decoded request body and a model's output.
#[derive(Debug, Clone, PartialEq)]
pub enum PredictError {
    UnknownModel(String),
    EmptyFeatures,
    FeatureCountMismatch { expected: usize, got: usize },
    RaggedRows { row: usize, expected: usize, got: usize },
    Model(String),
}

impl fmt::Display for PredictError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            PredictError::UnknownModel(name) => write!(f, "Unknown model: {}", name),
            PredictError::EmptyFeatures => write!(f, "Feature vector must not be empty"),
            PredictError::FeatureCountMismatch { expected, got } => write!(
                f,
                "Model expects {} features, got {}",
                expected, got
            ),
            PredictError::RaggedRows { row, expected, got } => write!(
                f,
                "Row {} has {} features, expected {}",
                row, got, expected
            ),
            PredictError::Model(msg) => write!(f, "Model failure: {}", msg),
        }
    }
}

impl Error for PredictError {}
