// Copyright 2025 Cowboy AI, LLC.

//! Predictor configuration

use schemars::{schema_for, JsonSchema};
use serde::{Deserialize, Serialize};

use crate::errors::{PredictionError, PredictionResult};
use crate::metric::{Metric, ZeroDistancePolicy};
use crate::vectorizer::{Combiner, DEFAULT_DELIMITER};

/// Configuration of a prediction run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct PredictorConfig {
    /// User-facing metric: `cosine`, `cosine-brute` or a backend distance name
    pub metric: String,

    /// Delimiter joining tokens into a term form
    pub delimiter: String,

    /// Token vector combiner
    pub combiner: Combiner,

    /// Fan out per-term-form predictions over the rayon pool
    pub parallel: bool,

    /// Similarity reported for a zero distance under `1 / d` metrics
    pub zero_distance: ZeroDistancePolicy,
}

impl Default for PredictorConfig {
    fn default() -> Self {
        Self {
            metric: "cosine".to_string(),
            delimiter: DEFAULT_DELIMITER.to_string(),
            combiner: Combiner::Sum,
            parallel: true,
            zero_distance: ZeroDistancePolicy::Infinite,
        }
    }
}

impl PredictorConfig {
    /// Parse a configuration from JSON; absent fields take their defaults
    pub fn from_json_str(json: &str) -> PredictionResult<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Use a different metric
    pub fn with_metric(mut self, metric: impl Into<String>) -> Self {
        self.metric = metric.into();
        self
    }

    /// Use a different term-form delimiter
    pub fn with_delimiter(mut self, delimiter: impl Into<String>) -> Self {
        self.delimiter = delimiter.into();
        self
    }

    /// Use a different combiner
    pub fn with_combiner(mut self, combiner: Combiner) -> Self {
        self.combiner = combiner;
        self
    }

    /// Enable or disable parallel prediction
    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Use a different zero-distance policy
    pub fn with_zero_distance(mut self, policy: ZeroDistancePolicy) -> Self {
        self.zero_distance = policy;
        self
    }

    /// Parsed metric
    pub fn parsed_metric(&self) -> PredictionResult<Metric> {
        self.metric.parse()
    }

    /// Check the configuration before a run
    pub fn validate(&self) -> PredictionResult<()> {
        if self.delimiter.is_empty() {
            return Err(PredictionError::InvalidConfiguration(
                "delimiter must not be empty".to_string(),
            ));
        }
        if let ZeroDistancePolicy::Saturate { max } = self.zero_distance {
            if max.is_nan() || max <= 0.0 {
                return Err(PredictionError::InvalidConfiguration(format!(
                    "zero distance ceiling must be positive, got {}",
                    max
                )));
            }
        }
        self.parsed_metric().map(|_| ())
    }

    /// JSON Schema of the configuration
    pub fn json_schema() -> PredictionResult<serde_json::Value> {
        Ok(serde_json::to_value(schema_for!(PredictorConfig))?)
    }
}
