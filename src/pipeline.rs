// Copyright 2025 Cowboy AI, LLC.

//! Prediction Pipeline
//!
//! Vectorize terms, project each distinct term form into concept space, look
//! up the nearest concept and report one record per input term id. The
//! pipeline performs no I/O; loading inputs and writing records is left to
//! the caller.

use std::collections::{BTreeSet, HashMap};
use std::time::Instant;

use chrono::{DateTime, Utc};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::config::PredictorConfig;
use crate::errors::{PredictionError, PredictionResult};
use crate::index::ConceptIndex;
use crate::metric::{Metric, ZeroDistancePolicy};
use crate::projection::ProjectionModel;
use crate::vectorizer::{term_form, Combiner, TermDictionary, TermVectorizer};
use crate::vectors::{ensure_finite, ConceptSpace, TokenVectorStore};

/// Predicted concept for one term id
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionRecord {
    /// Term form the prediction was computed for
    pub term_form: String,
    /// Input term id
    pub term_id: String,
    /// Nearest concept id
    pub concept_id: String,
    /// Similarity under the metric's convention.
    ///
    /// Non-finite values (an exact match under `1/d`) serialize as the
    /// strings `"inf"`, `"-inf"` or `"NaN"` since JSON has no number for them.
    #[serde(with = "similarity_serde")]
    pub similarity: f64,
}

mod similarity_serde {
    use serde::{Deserialize, Deserializer, Serializer};

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Repr {
        Number(f64),
        Text(String),
    }

    pub fn serialize<S: Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
        if value.is_finite() {
            serializer.serialize_f64(*value)
        } else if value.is_nan() {
            serializer.serialize_str("NaN")
        } else if value.is_sign_positive() {
            serializer.serialize_str("inf")
        } else {
            serializer.serialize_str("-inf")
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
        match Repr::deserialize(deserializer)? {
            Repr::Number(value) => Ok(value),
            Repr::Text(text) => match text.as_str() {
                "inf" => Ok(f64::INFINITY),
                "-inf" => Ok(f64::NEG_INFINITY),
                "NaN" => Ok(f64::NAN),
                other => Err(serde::de::Error::custom(format!(
                    "invalid similarity '{}'",
                    other
                ))),
            },
        }
    }
}

/// Metadata about a prediction run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchSummary {
    /// Run identifier
    pub batch_id: Uuid,
    /// When the run started
    pub started_at: DateTime<Utc>,
    /// Wall time of the run in milliseconds
    pub duration_ms: u64,
    /// Number of input term ids
    pub terms: usize,
    /// Number of distinct term forms predicted
    pub distinct_forms: usize,
    /// Number of distinct unknown tokens
    pub unknown_tokens: usize,
    /// User-facing metric
    pub metric: Metric,
}

/// Result of a prediction run
#[derive(Debug, Clone)]
pub struct PredictionBatch {
    /// One record per input term id, in input order
    pub records: Vec<PredictionRecord>,
    /// Tokens missing from the token vector store
    pub unknown_tokens: BTreeSet<String>,
    /// Run metadata
    pub summary: BatchSummary,
}

/// Runs predictions for batches of terms under one configuration
#[derive(Debug, Clone)]
pub struct Predictor {
    config: PredictorConfig,
    metric: Metric,
    vectorizer: TermVectorizer,
}

impl Predictor {
    /// Create a predictor, validating its configuration
    pub fn new(config: PredictorConfig) -> PredictionResult<Self> {
        config.validate()?;
        let metric = config.parsed_metric()?;
        let vectorizer = TermVectorizer::new(config.delimiter.clone(), config.combiner);
        Ok(Self {
            config,
            metric,
            vectorizer,
        })
    }

    /// Configuration in use
    pub fn config(&self) -> &PredictorConfig {
        &self.config
    }

    /// Metric in use
    pub fn metric(&self) -> Metric {
        self.metric
    }

    /// Build the index for `space` and predict every term of `dictionary`
    pub fn run<M>(
        &self,
        store: &TokenVectorStore,
        dictionary: &TermDictionary,
        space: &ConceptSpace,
        model: &M,
    ) -> PredictionResult<PredictionBatch>
    where
        M: ProjectionModel + ?Sized,
    {
        let index = ConceptIndex::build(space, self.metric)?;
        self.run_with_index(store, dictionary, &index, model)
    }

    /// Predict every term of `dictionary` against a prebuilt index.
    ///
    /// The index must have been built for this predictor's metric.
    pub fn run_with_index<M>(
        &self,
        store: &TokenVectorStore,
        dictionary: &TermDictionary,
        index: &ConceptIndex,
        model: &M,
    ) -> PredictionResult<PredictionBatch>
    where
        M: ProjectionModel + ?Sized,
    {
        let started_at = Utc::now();
        let timer = Instant::now();
        let batch_id = Uuid::new_v4();

        if index.metric() != self.metric {
            return Err(PredictionError::InvalidConfiguration(format!(
                "index built for metric {} but predictor uses {}",
                index.metric(),
                self.metric
            )));
        }
        self.check_dimensions(store, index, model)?;

        info!(
            batch_id = %batch_id,
            terms = dictionary.len(),
            concepts = index.len(),
            metric = %self.metric,
            "Predicting concepts"
        );

        let term_vectors = self.vectorizer.vectorize_with_dimension(
            store,
            dictionary,
            store.dimension().unwrap_or(model.input_dimension()),
        )?;
        let forms: Vec<(&String, &Vec<f64>)> = term_vectors.vectors.iter().collect();
        let zero_policy = self.config.zero_distance;

        let predicted: Vec<(String, f64)> = if self.config.parallel {
            forms
                .par_iter()
                .map(|(_, vector)| predict_form(index, model, vector, zero_policy))
                .collect::<PredictionResult<_>>()?
        } else {
            forms
                .iter()
                .map(|(_, vector)| predict_form(index, model, vector, zero_policy))
                .collect::<PredictionResult<_>>()?
        };
        let by_form: HashMap<&str, (String, f64)> = forms
            .iter()
            .map(|(form, _)| form.as_str())
            .zip(predicted)
            .collect();

        let mut records = Vec::with_capacity(dictionary.len());
        for (term_id, tokens) in dictionary {
            let form = term_form(tokens, self.vectorizer.delimiter());
            let (concept_id, similarity) = by_form.get(form.as_str()).cloned().ok_or_else(|| {
                PredictionError::InvalidConfiguration(format!("term form '{}' was not vectorized", form))
            })?;
            records.push(PredictionRecord {
                term_form: form,
                term_id: term_id.clone(),
                concept_id,
                similarity,
            });
        }

        let summary = BatchSummary {
            batch_id,
            started_at,
            duration_ms: timer.elapsed().as_millis() as u64,
            terms: records.len(),
            distinct_forms: forms.len(),
            unknown_tokens: term_vectors.unknown_tokens.len(),
            metric: self.metric,
        };
        info!(
            batch_id = %batch_id,
            records = summary.terms,
            forms = summary.distinct_forms,
            unknown_tokens = summary.unknown_tokens,
            duration_ms = summary.duration_ms,
            "Prediction batch complete"
        );

        Ok(PredictionBatch {
            records,
            unknown_tokens: term_vectors.unknown_tokens,
            summary,
        })
    }

    fn check_dimensions<M>(
        &self,
        store: &TokenVectorStore,
        index: &ConceptIndex,
        model: &M,
    ) -> PredictionResult<()>
    where
        M: ProjectionModel + ?Sized,
    {
        if let Some(d) = store.dimension() {
            if model.input_dimension() != d {
                return Err(PredictionError::dimension_mismatch(
                    "projection input vs token vectors",
                    model.input_dimension(),
                    d,
                ));
            }
        }
        if model.output_dimension() != index.dimension() {
            return Err(PredictionError::dimension_mismatch(
                "projection output vs concept vectors",
                index.dimension(),
                model.output_dimension(),
            ));
        }
        Ok(())
    }
}

fn predict_form<M>(
    index: &ConceptIndex,
    model: &M,
    term_vector: &[f64],
    zero_policy: ZeroDistancePolicy,
) -> PredictionResult<(String, f64)>
where
    M: ProjectionModel + ?Sized,
{
    let projected = model.predict(term_vector)?;
    if projected.len() != index.dimension() {
        return Err(PredictionError::dimension_mismatch(
            "projection output",
            index.dimension(),
            projected.len(),
        ));
    }
    ensure_finite("projection output", &projected)?;

    let neighbor = index.nearest(&projected)?;
    let concept_vector = index.concept_vector(neighbor.row).ok_or_else(|| {
        PredictionError::InvalidConfiguration(format!("index row {} out of range", neighbor.row))
    })?;
    let similarity = index
        .metric()
        .similarity(neighbor.distance, &projected, concept_vector, zero_policy);
    Ok((neighbor.concept_id, similarity))
}

/// Predict the nearest concept of every term.
///
/// Uses the sum combiner, runs in parallel and reports `f64::INFINITY` for a
/// zero distance under `1 / d` metrics. Returns records in term-id order and
/// the set of tokens missing from `token_vectors`.
pub fn predict<M>(
    token_vectors: &TokenVectorStore,
    term_dictionary: &TermDictionary,
    concept_space: &ConceptSpace,
    projection_model: &M,
    metric: &str,
    delimiter: &str,
) -> PredictionResult<(Vec<PredictionRecord>, BTreeSet<String>)>
where
    M: ProjectionModel + ?Sized,
{
    let config = PredictorConfig::default()
        .with_metric(metric)
        .with_delimiter(delimiter)
        .with_combiner(Combiner::Sum);
    let batch = Predictor::new(config)?.run(token_vectors, term_dictionary, concept_space, projection_model)?;
    Ok((batch.records, batch.unknown_tokens))
}
