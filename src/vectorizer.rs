// Copyright 2025 Cowboy AI, LLC.

//! Term Vectorizer
//!
//! Aggregates the token vectors of multi-token terms into one vector per
//! distinct term form. Tokens missing from the store are left out of the
//! aggregate and reported as unknown; a term never fails to vectorize.

use std::collections::BTreeSet;

use indexmap::IndexMap;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::errors::{PredictionError, PredictionResult};
use crate::vectors::TokenVectorStore;

/// Delimiter joining the tokens of a term form
pub const DEFAULT_DELIMITER: &str = "___";

/// Term id to ordered surface tokens, in input order
pub type TermDictionary = IndexMap<String, Vec<String>>;

/// Canonical form of a term: its tokens joined by the delimiter
pub fn term_form<S: AsRef<str>>(tokens: &[S], delimiter: &str) -> String {
    tokens
        .iter()
        .map(|t| t.as_ref())
        .collect::<Vec<&str>>()
        .join(delimiter)
}

/// How known token vectors are combined into a term vector
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum Combiner {
    /// Component-wise sum of the known token vectors
    #[default]
    Sum,
    /// Component-wise mean over the known token vectors
    Mean,
}

/// Output of the vectorizer
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TermVectors {
    /// One vector per distinct term form, in order of first appearance
    pub vectors: IndexMap<String, Vec<f64>>,
    /// Tokens absent from the store, each listed once
    pub unknown_tokens: BTreeSet<String>,
}

impl TermVectors {
    /// Vector for a term form
    pub fn get(&self, form: &str) -> Option<&[f64]> {
        self.vectors.get(form).map(Vec::as_slice)
    }
}

/// Combines token vectors into term vectors
#[derive(Debug, Clone)]
pub struct TermVectorizer {
    delimiter: String,
    combiner: Combiner,
}

impl Default for TermVectorizer {
    fn default() -> Self {
        Self::new(DEFAULT_DELIMITER, Combiner::default())
    }
}

impl TermVectorizer {
    /// Create a vectorizer with a delimiter and combiner
    pub fn new(delimiter: impl Into<String>, combiner: Combiner) -> Self {
        Self {
            delimiter: delimiter.into(),
            combiner,
        }
    }

    /// Delimiter used to build term forms
    pub fn delimiter(&self) -> &str {
        &self.delimiter
    }

    /// Combiner applied to every term
    pub fn combiner(&self) -> Combiner {
        self.combiner
    }

    /// Vectorize every term of the dictionary.
    ///
    /// Fails only when the store has no known dimension while the dictionary
    /// is non-empty, since even a degenerate zero vector needs a length. Use
    /// [`TermVectorizer::vectorize_with_dimension`] when D is known elsewhere.
    pub fn vectorize(
        &self,
        store: &TokenVectorStore,
        dictionary: &TermDictionary,
    ) -> PredictionResult<TermVectors> {
        self.vectorize_inner(store, dictionary, None)
    }

    /// Vectorize every term, using `fallback_dimension` as D when the store
    /// has none (an empty store), so every term still gets a zero vector.
    pub fn vectorize_with_dimension(
        &self,
        store: &TokenVectorStore,
        dictionary: &TermDictionary,
        fallback_dimension: usize,
    ) -> PredictionResult<TermVectors> {
        self.vectorize_inner(store, dictionary, Some(fallback_dimension))
    }

    fn vectorize_inner(
        &self,
        store: &TokenVectorStore,
        dictionary: &TermDictionary,
        fallback_dimension: Option<usize>,
    ) -> PredictionResult<TermVectors> {
        let mut out = TermVectors::default();
        if dictionary.is_empty() {
            return Ok(out);
        }
        let dimension = store.dimension().or(fallback_dimension).ok_or_else(|| {
            PredictionError::InvalidConfiguration(
                "token vector store has no dimension (empty store)".to_string(),
            )
        })?;

        for tokens in dictionary.values() {
            let form = term_form(tokens, &self.delimiter);
            if out.vectors.contains_key(&form) {
                continue;
            }
            let vector = self.combine(store, tokens, dimension, &mut out.unknown_tokens);
            out.vectors.insert(form, vector);
        }

        debug!(
            terms = dictionary.len(),
            forms = out.vectors.len(),
            unknown = out.unknown_tokens.len(),
            "Vectorized terms"
        );
        if !out.unknown_tokens.is_empty() {
            warn!(
                count = out.unknown_tokens.len(),
                "Tokens missing from the token vector store were excluded"
            );
        }
        Ok(out)
    }

    fn combine(
        &self,
        store: &TokenVectorStore,
        tokens: &[String],
        dimension: usize,
        unknown: &mut BTreeSet<String>,
    ) -> Vec<f64> {
        let mut acc = vec![0.0; dimension];
        let mut known = 0usize;
        for token in tokens {
            match store.get(token) {
                Some(v) => {
                    for (a, x) in acc.iter_mut().zip(v) {
                        *a += x;
                    }
                    known += 1;
                }
                None => {
                    unknown.insert(token.clone());
                }
            }
        }
        if self.combiner == Combiner::Mean && known > 0 {
            let n = known as f64;
            acc.iter_mut().for_each(|a| *a /= n);
        }
        acc
    }
}
