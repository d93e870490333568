// Copyright 2025 Cowboy AI, LLC.

//! Projection Model capability
//!
//! The engine consumes an already fitted map from term space (D) into concept
//! space (D'). Models are shared across worker threads and must be safe to
//! call concurrently; backends that need exclusive access are wrapped in
//! [`SerializedProjection`].

use std::sync::Mutex;

use serde::{Deserialize, Serialize};

use crate::errors::{PredictionError, PredictionResult};
use crate::vectors::{dot, ensure_finite};

/// A fitted projection `vector(D) -> vector(D')`
pub trait ProjectionModel: Send + Sync {
    /// Dimension D of accepted vectors
    fn input_dimension(&self) -> usize;

    /// Dimension D' of produced vectors
    fn output_dimension(&self) -> usize;

    /// Project one term vector into concept space
    fn predict(&self, vector: &[f64]) -> PredictionResult<Vec<f64>>;
}

fn check_input(expected: usize, vector: &[f64]) -> PredictionResult<()> {
    if vector.len() != expected {
        return Err(PredictionError::dimension_mismatch(
            "projection input",
            expected,
            vector.len(),
        ));
    }
    Ok(())
}

/// Projection that returns its input unchanged (D = D')
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IdentityProjection {
    dimension: usize,
}

impl IdentityProjection {
    /// Identity over vectors of `dimension`
    pub fn new(dimension: usize) -> Self {
        Self { dimension }
    }
}

impl ProjectionModel for IdentityProjection {
    fn input_dimension(&self) -> usize {
        self.dimension
    }

    fn output_dimension(&self) -> usize {
        self.dimension
    }

    fn predict(&self, vector: &[f64]) -> PredictionResult<Vec<f64>> {
        check_input(self.dimension, vector)?;
        Ok(vector.to_vec())
    }
}

/// Affine map `y = W x + b` as produced by a least-squares regression fit.
///
/// `coefficients` holds one row of length D per output component, so the
/// matrix is D' x D.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "LinearProjectionParts")]
pub struct LinearProjection {
    coefficients: Vec<Vec<f64>>,
    intercept: Vec<f64>,
}

#[derive(Deserialize)]
struct LinearProjectionParts {
    coefficients: Vec<Vec<f64>>,
    #[serde(default)]
    intercept: Option<Vec<f64>>,
}

impl TryFrom<LinearProjectionParts> for LinearProjection {
    type Error = PredictionError;

    fn try_from(parts: LinearProjectionParts) -> Result<Self, Self::Error> {
        match parts.intercept {
            Some(intercept) => LinearProjection::new(parts.coefficients, intercept),
            None => LinearProjection::without_intercept(parts.coefficients),
        }
    }
}

impl LinearProjection {
    /// Validate and build from a D' x D matrix and a D' intercept
    pub fn new(coefficients: Vec<Vec<f64>>, intercept: Vec<f64>) -> PredictionResult<Self> {
        let input = coefficients.first().map(Vec::len).unwrap_or(0);
        if coefficients.is_empty() || input == 0 {
            return Err(PredictionError::InvalidConfiguration(
                "projection matrix must have at least one row and one column".to_string(),
            ));
        }
        for (i, row) in coefficients.iter().enumerate() {
            if row.len() != input {
                return Err(PredictionError::dimension_mismatch(
                    format!("projection matrix row {}", i),
                    input,
                    row.len(),
                ));
            }
            ensure_finite(&format!("projection matrix row {}", i), row)?;
        }
        if intercept.len() != coefficients.len() {
            return Err(PredictionError::dimension_mismatch(
                "projection intercept",
                coefficients.len(),
                intercept.len(),
            ));
        }
        ensure_finite("projection intercept", &intercept)?;
        Ok(Self {
            coefficients,
            intercept,
        })
    }

    /// Build with a zero intercept
    pub fn without_intercept(coefficients: Vec<Vec<f64>>) -> PredictionResult<Self> {
        let intercept = vec![0.0; coefficients.len()];
        Self::new(coefficients, intercept)
    }

    /// Parse from JSON `{"coefficients": [[..], ..], "intercept": [..]}`
    pub fn from_json_str(json: &str) -> PredictionResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Coefficient matrix, D' rows of length D
    pub fn coefficients(&self) -> &[Vec<f64>] {
        &self.coefficients
    }

    /// Intercept of length D'
    pub fn intercept(&self) -> &[f64] {
        &self.intercept
    }
}

impl ProjectionModel for LinearProjection {
    fn input_dimension(&self) -> usize {
        self.coefficients[0].len()
    }

    fn output_dimension(&self) -> usize {
        self.coefficients.len()
    }

    fn predict(&self, vector: &[f64]) -> PredictionResult<Vec<f64>> {
        check_input(self.input_dimension(), vector)?;
        Ok(self
            .coefficients
            .iter()
            .zip(&self.intercept)
            .map(|(row, b)| dot(row, vector) + b)
            .collect())
    }
}

/// A projection backend that needs exclusive access while predicting
pub trait ProjectionBackend: Send {
    /// Dimension D of accepted vectors
    fn input_dimension(&self) -> usize;

    /// Dimension D' of produced vectors
    fn output_dimension(&self) -> usize;

    /// Project one vector; may mutate internal scratch state
    fn predict_mut(&mut self, vector: &[f64]) -> PredictionResult<Vec<f64>>;
}

/// Serializes calls into a non-thread-safe backend behind a mutex.
///
/// Only the projection is locked; index queries made with its output run
/// unlocked.
#[derive(Debug)]
pub struct SerializedProjection<B> {
    input: usize,
    output: usize,
    backend: Mutex<B>,
}

impl<B: ProjectionBackend> SerializedProjection<B> {
    /// Wrap a backend
    pub fn new(backend: B) -> Self {
        Self {
            input: backend.input_dimension(),
            output: backend.output_dimension(),
            backend: Mutex::new(backend),
        }
    }

    /// Recover the backend
    pub fn into_inner(self) -> PredictionResult<B> {
        self.backend
            .into_inner()
            .map_err(|_| PredictionError::Projection("projection backend lock poisoned".to_string()))
    }
}

impl<B: ProjectionBackend> ProjectionModel for SerializedProjection<B> {
    fn input_dimension(&self) -> usize {
        self.input
    }

    fn output_dimension(&self) -> usize {
        self.output
    }

    fn predict(&self, vector: &[f64]) -> PredictionResult<Vec<f64>> {
        let mut backend = self
            .backend
            .lock()
            .map_err(|_| PredictionError::Projection("projection backend lock poisoned".to_string()))?;
        backend.predict_mut(vector)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity_returns_input_and_checks_dimension() {
        let model = IdentityProjection::new(2);
        assert_eq!(model.predict(&[1.0, 2.0]).unwrap(), vec![1.0, 2.0]);
        let err = model.predict(&[1.0]).unwrap_err();
        assert_eq!(err, PredictionError::dimension_mismatch("projection input", 2, 1));
    }

    #[test]
    fn linear_projection_applies_matrix_and_intercept() {
        // D = 2 -> D' = 3
        let model = LinearProjection::new(
            vec![vec![1.0, 0.0], vec![0.0, 2.0], vec![1.0, 1.0]],
            vec![0.0, 1.0, -1.0],
        )
        .unwrap();
        assert_eq!(model.input_dimension(), 2);
        assert_eq!(model.output_dimension(), 3);
        assert_eq!(model.predict(&[3.0, 4.0]).unwrap(), vec![3.0, 9.0, 6.0]);
    }

    #[test]
    fn linear_projection_rejects_ragged_or_mismatched_shapes() {
        let err = LinearProjection::without_intercept(vec![vec![1.0, 0.0], vec![1.0]]).unwrap_err();
        assert!(err.is_input_shape_error());

        let err = LinearProjection::new(vec![vec![1.0]], vec![0.0, 0.0]).unwrap_err();
        assert!(matches!(err, PredictionError::DimensionMismatch { .. }));

        assert!(LinearProjection::without_intercept(vec![]).is_err());
    }

    #[test]
    fn linear_projection_from_json() {
        let model = LinearProjection::from_json_str(r#"{"coefficients": [[2.0, 0.0], [0.0, 2.0]]}"#).unwrap();
        assert_eq!(model.intercept(), &[0.0, 0.0]);
        assert_eq!(model.predict(&[1.0, 1.0]).unwrap(), vec![2.0, 2.0]);

        let err = LinearProjection::from_json_str(r#"{"coefficients": [[1.0], [1.0, 2.0]]}"#).unwrap_err();
        assert!(matches!(err, PredictionError::SerializationError(_)));
    }

    struct CountingBackend {
        calls: usize,
    }

    impl ProjectionBackend for CountingBackend {
        fn input_dimension(&self) -> usize {
            1
        }

        fn output_dimension(&self) -> usize {
            1
        }

        fn predict_mut(&mut self, vector: &[f64]) -> PredictionResult<Vec<f64>> {
            self.calls += 1;
            Ok(vec![vector[0] * 10.0])
        }
    }

    #[test]
    fn serialized_projection_locks_backend() {
        let model = SerializedProjection::new(CountingBackend { calls: 0 });
        std::thread::scope(|s| {
            for i in 0..4 {
                let model = &model;
                s.spawn(move || {
                    assert_eq!(model.predict(&[i as f64]).unwrap(), vec![i as f64 * 10.0]);
                });
            }
        });
        assert_eq!(model.into_inner().unwrap().calls, 4);
    }
}
