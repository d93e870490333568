// Copyright 2025 Cowboy AI, LLC.

//! Token Vector Store and Concept Vector Space
//!
//! Both spaces are fully materialized by the caller before a run and are
//! read-only afterwards. Each enforces a uniform dimension: the first vector
//! inserted fixes it unless it was declared up front.

use std::collections::HashMap;

use indexmap::IndexMap;

use crate::errors::{PredictionError, PredictionResult};

/// Dot product of two equal-length slices
pub fn dot(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b.iter()).map(|(x, y)| x * y).sum()
}

/// Euclidean (L2) norm
pub fn l2_norm(v: &[f64]) -> f64 {
    v.iter().map(|x| x * x).sum::<f64>().sqrt()
}

/// Scale a vector to unit L2 norm. Zero vectors are returned unchanged.
pub fn l2_normalize(v: &[f64]) -> Vec<f64> {
    let norm = l2_norm(v);
    if norm == 0.0 {
        return v.to_vec();
    }
    v.iter().map(|x| x / norm).collect()
}

/// Reject vectors with NaN or infinite components
pub fn ensure_finite(context: &str, v: &[f64]) -> PredictionResult<()> {
    match v.iter().position(|x| !x.is_finite()) {
        Some(i) => Err(PredictionError::InvalidVector {
            context: context.to_string(),
            reason: format!("component {} is {}", i, v[i]),
        }),
        None => Ok(()),
    }
}

fn check_dimension(
    dimension: &mut Option<usize>,
    context: &str,
    vector: &[f64],
) -> PredictionResult<()> {
    if vector.is_empty() {
        return Err(PredictionError::InvalidVector {
            context: context.to_string(),
            reason: "vector has no components".to_string(),
        });
    }
    match *dimension {
        Some(d) if d != vector.len() => Err(PredictionError::dimension_mismatch(
            context,
            d,
            vector.len(),
        )),
        Some(_) => Ok(()),
        None => {
            *dimension = Some(vector.len());
            Ok(())
        }
    }
}

/// Read-only mapping from token string to its distributional vector
#[derive(Debug, Clone, Default)]
pub struct TokenVectorStore {
    vectors: HashMap<String, Vec<f64>>,
    dimension: Option<usize>,
}

impl TokenVectorStore {
    /// Create an empty store whose dimension is fixed by the first insert
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty store with a declared dimension
    pub fn with_dimension(dimension: usize) -> Self {
        Self {
            vectors: HashMap::new(),
            dimension: Some(dimension),
        }
    }

    /// Build a store from `(token, vector)` pairs
    pub fn from_entries<I, K>(entries: I) -> PredictionResult<Self>
    where
        I: IntoIterator<Item = (K, Vec<f64>)>,
        K: Into<String>,
    {
        let mut store = Self::new();
        for (token, vector) in entries {
            store.insert(token, vector)?;
        }
        Ok(store)
    }

    /// Insert or replace a token vector
    pub fn insert(&mut self, token: impl Into<String>, vector: Vec<f64>) -> PredictionResult<()> {
        let token = token.into();
        let context = format!("token '{}'", token);
        check_dimension(&mut self.dimension, &context, &vector)?;
        ensure_finite(&context, &vector)?;
        self.vectors.insert(token, vector);
        Ok(())
    }

    /// Vector for a token, if known
    pub fn get(&self, token: &str) -> Option<&[f64]> {
        self.vectors.get(token).map(Vec::as_slice)
    }

    /// Whether the token has a vector
    pub fn contains(&self, token: &str) -> bool {
        self.vectors.contains_key(token)
    }

    /// Number of tokens
    pub fn len(&self) -> usize {
        self.vectors.len()
    }

    /// Whether the store holds no tokens
    pub fn is_empty(&self) -> bool {
        self.vectors.is_empty()
    }

    /// Uniform dimension D, unknown until declared or first insert
    pub fn dimension(&self) -> Option<usize> {
        self.dimension
    }
}

/// Concept Vector Space: concept id to vector, in insertion order
#[derive(Debug, Clone, Default)]
pub struct ConceptSpace {
    vectors: IndexMap<String, Vec<f64>>,
    dimension: Option<usize>,
}

impl ConceptSpace {
    /// Create an empty concept space
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a space from `(concept id, vector)` pairs, keeping their order
    pub fn from_entries<I, K>(entries: I) -> PredictionResult<Self>
    where
        I: IntoIterator<Item = (K, Vec<f64>)>,
        K: Into<String>,
    {
        let mut space = Self::new();
        for (id, vector) in entries {
            space.insert(id, vector)?;
        }
        Ok(space)
    }

    /// Insert a concept. Re-inserting an id replaces its vector in place.
    pub fn insert(&mut self, concept_id: impl Into<String>, vector: Vec<f64>) -> PredictionResult<()> {
        let concept_id = concept_id.into();
        let context = format!("concept '{}'", concept_id);
        check_dimension(&mut self.dimension, &context, &vector)?;
        ensure_finite(&context, &vector)?;
        self.vectors.insert(concept_id, vector);
        Ok(())
    }

    /// Vector for a concept id
    pub fn get(&self, concept_id: &str) -> Option<&[f64]> {
        self.vectors.get(concept_id).map(Vec::as_slice)
    }

    /// Concepts in insertion order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[f64])> {
        self.vectors.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }

    /// Number of concepts
    pub fn len(&self) -> usize {
        self.vectors.len()
    }

    /// Whether the space holds no concepts
    pub fn is_empty(&self) -> bool {
        self.vectors.is_empty()
    }

    /// Uniform dimension D'
    pub fn dimension(&self) -> Option<usize> {
        self.dimension
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_produces_unit_vectors_and_keeps_zero() {
        let v = l2_normalize(&[3.0, 4.0]);
        assert!((v[0] - 0.6).abs() < 1e-12);
        assert!((v[1] - 0.8).abs() < 1e-12);
        assert!((l2_norm(&v) - 1.0).abs() < 1e-12);

        assert_eq!(l2_normalize(&[0.0, 0.0]), vec![0.0, 0.0]);
    }

    #[test]
    fn token_store_fixes_dimension_on_first_insert() {
        let mut store = TokenVectorStore::new();
        assert_eq!(store.dimension(), None);
        store.insert("a", vec![1.0, 0.0]).unwrap();
        assert_eq!(store.dimension(), Some(2));

        let err = store.insert("b", vec![1.0, 0.0, 0.0]).unwrap_err();
        assert_eq!(err, PredictionError::dimension_mismatch("token 'b'", 2, 3));
        assert!(!store.contains("b"));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn token_store_declared_dimension_is_enforced() {
        let mut store = TokenVectorStore::with_dimension(3);
        assert!(store.insert("a", vec![1.0, 2.0]).is_err());
        assert!(store.insert("a", vec![1.0, 2.0, 3.0]).is_ok());
    }

    #[test]
    fn non_finite_and_empty_vectors_are_rejected() {
        let mut store = TokenVectorStore::new();
        let err = store.insert("nan", vec![0.0, f64::NAN]).unwrap_err();
        assert!(matches!(err, PredictionError::InvalidVector { .. }));

        let err = store.insert("empty", vec![]).unwrap_err();
        assert!(err.is_input_shape_error());
    }

    #[test]
    fn concept_space_keeps_insertion_order_and_replaces_in_place() {
        let mut space = ConceptSpace::from_entries(vec![
            ("c2", vec![0.0, 1.0]),
            ("c1", vec![1.0, 0.0]),
            ("c3", vec![1.0, 1.0]),
        ])
        .unwrap();
        space.insert("c1", vec![2.0, 0.0]).unwrap();

        let ids: Vec<&str> = space.iter().map(|(id, _)| id).collect();
        assert_eq!(ids, vec!["c2", "c1", "c3"]);
        assert_eq!(space.get("c1"), Some(&[2.0, 0.0][..]));
        assert_eq!(space.dimension(), Some(2));
    }
}
