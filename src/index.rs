// Copyright 2025 Cowboy AI, LLC.

//! Concept Nearest-Neighbor Index
//!
//! Exact search over a whole concept space. Rows follow the concept space's
//! insertion order, and on equal distances the earliest row wins, so a fixed
//! concept ordering always produces the same answer.

use std::cmp::Ordering;

use tracing::debug;

use crate::errors::{PredictionError, PredictionResult};
use crate::metric::{DistanceFunction, Metric};
use crate::vectors::ConceptSpace;

/// A concept found by the index
#[derive(Debug, Clone, PartialEq)]
pub struct Neighbor {
    /// Row of the concept in the index
    pub row: usize,
    /// Concept id
    pub concept_id: String,
    /// Raw distance under the internal metric
    pub distance: f64,
}

/// Immutable exact nearest-neighbor index over concept vectors
#[derive(Debug, Clone)]
pub struct ConceptIndex {
    metric: Metric,
    distance: DistanceFunction,
    dimension: usize,
    concept_ids: Vec<String>,
    /// Vectors as supplied, used for similarity
    original: Vec<Vec<f64>>,
    /// Vectors as searched (normalized for `cosine`)
    indexed: Vec<Vec<f64>>,
}

impl ConceptIndex {
    /// Build the index for a concept space under a metric
    pub fn build(space: &ConceptSpace, metric: Metric) -> PredictionResult<Self> {
        let dimension = match space.dimension() {
            Some(d) if !space.is_empty() => d,
            _ => return Err(PredictionError::EmptyConceptSpace),
        };

        let mut concept_ids = Vec::with_capacity(space.len());
        let mut original = Vec::with_capacity(space.len());
        for (id, vector) in space.iter() {
            concept_ids.push(id.to_string());
            original.push(vector.to_vec());
        }
        let indexed = metric.normalize(original.clone());
        let distance = metric.internal_metric();

        debug!(
            concepts = concept_ids.len(),
            dimension,
            metric = %metric,
            internal = %distance,
            "Built concept index"
        );

        Ok(Self {
            metric,
            distance,
            dimension,
            concept_ids,
            original,
            indexed,
        })
    }

    /// Closest concept to `vector`
    pub fn nearest(&self, vector: &[f64]) -> PredictionResult<Neighbor> {
        let mut found = self.k_nearest(vector, 1)?;
        // empty only when every distance was NaN; build() rejects empty spaces
        found.pop().ok_or_else(|| PredictionError::InvalidVector {
            context: "index query".to_string(),
            reason: "no finite distance to any concept".to_string(),
        })
    }

    /// Up to `k` closest concepts, ordered by distance then row
    pub fn k_nearest(&self, vector: &[f64], k: usize) -> PredictionResult<Vec<Neighbor>> {
        if vector.len() != self.dimension {
            return Err(PredictionError::dimension_mismatch(
                "index query",
                self.dimension,
                vector.len(),
            ));
        }

        // (distance, row), kept sorted; NaN distances never enter
        let mut best: Vec<(f64, usize)> = Vec::with_capacity(k + 1);
        for (row, candidate) in self.indexed.iter().enumerate() {
            let d = self.distance.distance(vector, candidate);
            if d.is_nan() {
                continue;
            }
            if best.len() == k && best.last().map_or(true, |(worst, _)| d >= *worst) {
                continue;
            }
            let at = best
                .iter()
                .position(|(bd, _)| d.partial_cmp(bd) == Some(Ordering::Less))
                .unwrap_or(best.len());
            best.insert(at, (d, row));
            best.truncate(k);
        }

        Ok(best
            .into_iter()
            .map(|(distance, row)| Neighbor {
                row,
                concept_id: self.concept_ids[row].clone(),
                distance,
            })
            .collect())
    }

    /// Original (unnormalized) vector of a row
    pub fn concept_vector(&self, row: usize) -> Option<&[f64]> {
        self.original.get(row).map(Vec::as_slice)
    }

    /// Concept id of a row
    pub fn concept_id(&self, row: usize) -> Option<&str> {
        self.concept_ids.get(row).map(String::as_str)
    }

    /// User-facing metric the index was built for
    pub fn metric(&self) -> Metric {
        self.metric
    }

    /// Dimension D' of the concept space
    pub fn dimension(&self) -> usize {
        self.dimension
    }

    /// Number of indexed concepts
    pub fn len(&self) -> usize {
        self.concept_ids.len()
    }

    /// Always false for a built index
    pub fn is_empty(&self) -> bool {
        self.concept_ids.is_empty()
    }
}
