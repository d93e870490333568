// Copyright 2025 Cowboy AI, LLC.

//! # Concept Predictor
//!
//! Normalizes multi-token terms onto the concepts of a controlled ontology by
//! projecting distributional term vectors into a concept vector space and
//! picking the nearest concept.
//!
//! The crate provides the prediction engine only:
//! - **Term Vectorizer**: combines token vectors into one vector per term form
//! - **Metric Policy**: maps a user-facing metric onto the distance the index
//!   evaluates, optional concept normalization and the reported similarity
//! - **Concept Index**: exact nearest-neighbor search over the concept space
//! - **Projection Model**: the fitted `vector(D) -> vector(D')` capability
//! - **Predictor**: vectorize, project, search and assemble one record per term
//!
//! Loading embeddings, ontologies and fitted models, and writing predictions,
//! are the caller's concern.
//!
//! ## Example
//!
//! ```
//! use concept_predictor::{predict, ConceptSpace, IdentityProjection, TermDictionary, TokenVectorStore};
//!
//! let tokens = TokenVectorStore::from_entries(vec![("a", vec![1.0, 0.0]), ("b", vec![0.0, 1.0])]).unwrap();
//! let concepts = ConceptSpace::from_entries(vec![("c1", vec![1.0, 1.0]), ("c2", vec![-1.0, -1.0])]).unwrap();
//! let mut terms = TermDictionary::new();
//! terms.insert("t1".to_string(), vec!["a".to_string(), "b".to_string()]);
//!
//! let (records, unknown) = predict(&tokens, &terms, &concepts, &IdentityProjection::new(2), "cosine-brute", "___").unwrap();
//! assert_eq!(records[0].concept_id, "c1");
//! assert!(unknown.is_empty());
//! ```

#![warn(missing_docs)]

mod config;
mod errors;
mod index;
mod metric;
mod pipeline;
mod projection;
mod vectorizer;
mod vectors;

pub use config::PredictorConfig;
pub use errors::{PredictionError, PredictionResult};
pub use index::{ConceptIndex, Neighbor};
pub use metric::{cosine_distance, DistanceFunction, Metric, ZeroDistancePolicy};
pub use pipeline::{predict, BatchSummary, PredictionBatch, PredictionRecord, Predictor};
pub use projection::{
    IdentityProjection, LinearProjection, ProjectionBackend, ProjectionModel,
    SerializedProjection,
};
pub use vectorizer::{term_form, Combiner, TermDictionary, TermVectorizer, TermVectors, DEFAULT_DELIMITER};
pub use vectors::{dot, ensure_finite, l2_norm, l2_normalize, ConceptSpace, TokenVectorStore};
