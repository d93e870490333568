// Copyright 2025 Cowboy AI, LLC.

//! Error types for prediction operations

use thiserror::Error;

/// Errors that can occur while building an index or predicting concepts
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PredictionError {
    /// Nearest-neighbor index requested over a concept space with no concepts
    #[error("Empty concept space: no concept to index")]
    EmptyConceptSpace,

    /// A vector does not have the dimension established for its space
    #[error("Dimension mismatch in {context}: expected {expected}, found {actual}")]
    DimensionMismatch {
        /// Where the mismatch was detected
        context: String,
        /// Dimension established for the space
        expected: usize,
        /// Dimension of the offending vector
        actual: usize,
    },

    /// Metric identifier outside the supported set
    #[error("Unsupported metric: {0}")]
    UnsupportedMetric(String),

    /// A vector that cannot participate in distance computations
    #[error("Invalid vector in {context}: {reason}")]
    InvalidVector {
        /// Owner of the vector (token, concept id, ...)
        context: String,
        /// What is wrong with it
        reason: String,
    },

    /// Failure reported by a projection model backend
    #[error("Projection error: {0}")]
    Projection(String),

    /// Malformed predictor configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    SerializationError(String),
}

/// Result type for prediction operations
pub type PredictionResult<T> = Result<T, PredictionError>;

impl From<serde_json::Error> for PredictionError {
    fn from(err: serde_json::Error) -> Self {
        PredictionError::SerializationError(err.to_string())
    }
}

impl PredictionError {
    /// Build a dimension mismatch error
    pub fn dimension_mismatch(context: impl Into<String>, expected: usize, actual: usize) -> Self {
        PredictionError::DimensionMismatch {
            context: context.into(),
            expected,
            actual,
        }
    }

    /// Check if this error should abort the whole batch
    pub fn is_configuration_error(&self) -> bool {
        matches!(
            self,
            PredictionError::EmptyConceptSpace
                | PredictionError::DimensionMismatch { .. }
                | PredictionError::UnsupportedMetric(_)
                | PredictionError::InvalidConfiguration(_)
        )
    }

    /// Check if this is a bad input shape (dimension or vector content)
    pub fn is_input_shape_error(&self) -> bool {
        matches!(
            self,
            PredictionError::DimensionMismatch { .. } | PredictionError::InvalidVector { .. }
        )
    }

    /// Check if the index had nothing to search
    pub fn is_empty_index(&self) -> bool {
        matches!(self, PredictionError::EmptyConceptSpace)
    }

    /// Check if the metric identifier was rejected
    pub fn is_unsupported_metric(&self) -> bool {
        matches!(self, PredictionError::UnsupportedMetric(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_messages() {
        assert_eq!(
            PredictionError::EmptyConceptSpace.to_string(),
            "Empty concept space: no concept to index"
        );

        let err = PredictionError::dimension_mismatch("index query", 3, 2);
        assert_eq!(
            err.to_string(),
            "Dimension mismatch in index query: expected 3, found 2"
        );

        let err = PredictionError::UnsupportedMetric("hamming".to_string());
        assert_eq!(err.to_string(), "Unsupported metric: hamming");

        let err = PredictionError::InvalidVector {
            context: "concept GO:0001".to_string(),
            reason: "component 2 is NaN".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Invalid vector in concept GO:0001: component 2 is NaN"
        );

        let err = PredictionError::Projection("singular matrix".to_string());
        assert_eq!(err.to_string(), "Projection error: singular matrix");
    }

    #[test]
    fn test_error_classification() {
        assert!(PredictionError::EmptyConceptSpace.is_configuration_error());
        assert!(PredictionError::EmptyConceptSpace.is_empty_index());
        assert!(!PredictionError::EmptyConceptSpace.is_input_shape_error());

        let mismatch = PredictionError::dimension_mismatch("token store", 4, 5);
        assert!(mismatch.is_configuration_error());
        assert!(mismatch.is_input_shape_error());
        assert!(!mismatch.is_unsupported_metric());

        let metric = PredictionError::UnsupportedMetric("foo".into());
        assert!(metric.is_configuration_error());
        assert!(metric.is_unsupported_metric());

        let projection = PredictionError::Projection("boom".into());
        assert!(!projection.is_configuration_error());
    }

    #[test]
    fn test_error_from_serde_json() {
        let json_err = serde_json::from_str::<serde_json::Value>("{invalid").unwrap_err();
        let err: PredictionError = json_err.into();
        assert!(matches!(err, PredictionError::SerializationError(_)));
    }
}
