// Copyright 2025 Cowboy AI, LLC.

//! Metric Policy
//!
//! A user-facing metric decides three things: the distance the index actually
//! evaluates, whether concept vectors are L2-normalized before indexing, and
//! how a raw index distance is turned back into a similarity score.
//!
//! | metric         | internal distance | normalized | similarity                   |
//! |----------------|-------------------|------------|------------------------------|
//! | `cosine`       | euclidean         | yes        | `1 - cosine(term, concept)`  |
//! | `cosine-brute` | cosine            | no         | `1 - d`                      |
//! | any other      | same              | no         | `1 / d`                      |

use std::fmt;
use std::str::FromStr;

use schemars::JsonSchema;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::errors::PredictionError;
use crate::vectors::{dot, l2_norm, l2_normalize};

/// Distance functions the index can evaluate exactly
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DistanceFunction {
    /// L2 distance
    Euclidean,
    /// Squared L2 distance (same ranking as euclidean)
    SquaredEuclidean,
    /// L1 distance
    Manhattan,
    /// L-infinity distance
    Chebyshev,
    /// `1 - cos(a, b)`
    Cosine,
    /// Lp distance, `p >= 1`
    Minkowski {
        /// Order of the norm
        p: f64,
    },
}

impl DistanceFunction {
    /// Distance between two equal-length vectors
    pub fn distance(&self, a: &[f64], b: &[f64]) -> f64 {
        let diffs = a.iter().zip(b.iter()).map(|(x, y)| (x - y).abs());
        match self {
            DistanceFunction::Euclidean => diffs.map(|d| d * d).sum::<f64>().sqrt(),
            DistanceFunction::SquaredEuclidean => diffs.map(|d| d * d).sum(),
            DistanceFunction::Manhattan => diffs.sum(),
            DistanceFunction::Chebyshev => diffs.fold(0.0, f64::max),
            DistanceFunction::Cosine => cosine_distance(a, b),
            DistanceFunction::Minkowski { p } => diffs.map(|d| d.powf(*p)).sum::<f64>().powf(1.0 / p),
        }
    }
}

impl fmt::Display for DistanceFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DistanceFunction::Euclidean => write!(f, "euclidean"),
            DistanceFunction::SquaredEuclidean => write!(f, "sqeuclidean"),
            DistanceFunction::Manhattan => write!(f, "manhattan"),
            DistanceFunction::Chebyshev => write!(f, "chebyshev"),
            DistanceFunction::Cosine => write!(f, "cosine"),
            DistanceFunction::Minkowski { p } => write!(f, "minkowski:{}", p),
        }
    }
}

impl FromStr for DistanceFunction {
    type Err = PredictionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.trim().to_ascii_lowercase();
        let function = match name.as_str() {
            "euclidean" | "l2" => DistanceFunction::Euclidean,
            "sqeuclidean" => DistanceFunction::SquaredEuclidean,
            "manhattan" | "cityblock" | "l1" => DistanceFunction::Manhattan,
            "chebyshev" | "infinity" => DistanceFunction::Chebyshev,
            "cosine" => DistanceFunction::Cosine,
            "minkowski" => DistanceFunction::Minkowski { p: 2.0 },
            other => {
                let p = other
                    .strip_prefix("minkowski:")
                    .and_then(|p| p.parse::<f64>().ok())
                    .filter(|p| p.is_finite() && *p >= 1.0)
                    .ok_or_else(|| PredictionError::UnsupportedMetric(s.to_string()))?;
                DistanceFunction::Minkowski { p }
            }
        };
        Ok(function)
    }
}

/// Cosine distance `1 - cos(a, b)`; a zero-norm operand gives 1.0
pub fn cosine_distance(a: &[f64], b: &[f64]) -> f64 {
    let denom = l2_norm(a) * l2_norm(b);
    if denom == 0.0 {
        return 1.0;
    }
    1.0 - dot(a, b) / denom
}

/// What `1 / d` reports when the raw distance is exactly zero
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "policy", rename_all = "snake_case")]
pub enum ZeroDistancePolicy {
    /// `f64::INFINITY`
    #[default]
    Infinite,
    /// A fixed ceiling, also applied to any `1 / d` above it
    Saturate {
        /// Largest similarity reported
        max: f64,
    },
}

/// User-facing metric
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub enum Metric {
    /// Cosine ranking via euclidean search over normalized concepts
    #[default]
    Cosine,
    /// Direct cosine distance search
    CosineBrute,
    /// Any backend distance, similarity reported as `1 / d`
    Backend(DistanceFunction),
}

impl Metric {
    /// Distance evaluated by the index for this metric
    pub fn internal_metric(&self) -> DistanceFunction {
        match self {
            Metric::Cosine => DistanceFunction::Euclidean,
            Metric::CosineBrute => DistanceFunction::Cosine,
            Metric::Backend(function) => *function,
        }
    }

    /// Whether concept vectors are L2-normalized before indexing
    pub fn requires_normalization(&self) -> bool {
        matches!(self, Metric::Cosine)
    }

    /// Prepare concept vectors for indexing
    pub fn normalize(&self, vectors: Vec<Vec<f64>>) -> Vec<Vec<f64>> {
        if self.requires_normalization() {
            vectors.iter().map(|v| l2_normalize(v)).collect()
        } else {
            vectors
        }
    }

    /// Similarity reported for a match.
    ///
    /// `term_vector` is the predicted vector as produced by the projection and
    /// `concept_vector` the concept's original, unnormalized vector.
    pub fn similarity(
        &self,
        raw_distance: f64,
        term_vector: &[f64],
        concept_vector: &[f64],
        zero_policy: ZeroDistancePolicy,
    ) -> f64 {
        match self {
            Metric::Cosine => 1.0 - cosine_distance(term_vector, concept_vector),
            Metric::CosineBrute => 1.0 - raw_distance,
            Metric::Backend(_) => match zero_policy {
                ZeroDistancePolicy::Infinite if raw_distance == 0.0 => f64::INFINITY,
                ZeroDistancePolicy::Infinite => 1.0 / raw_distance,
                ZeroDistancePolicy::Saturate { max } if raw_distance == 0.0 => max,
                ZeroDistancePolicy::Saturate { max } => (1.0 / raw_distance).min(max),
            },
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Metric::Cosine => write!(f, "cosine"),
            Metric::CosineBrute => write!(f, "cosine-brute"),
            Metric::Backend(function) => write!(f, "{}", function),
        }
    }
}

impl FromStr for Metric {
    type Err = PredictionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "cosine" => Ok(Metric::Cosine),
            "cosine-brute" => Ok(Metric::CosineBrute),
            _ => s.parse::<DistanceFunction>().map(Metric::Backend),
        }
    }
}

impl Serialize for Metric {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Metric {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let name = String::deserialize(deserializer)?;
        name.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn metric_names_round_trip_through_display() {
        for name in ["cosine", "cosine-brute", "euclidean", "manhattan", "chebyshev", "sqeuclidean"] {
            let metric: Metric = name.parse().unwrap();
            assert_eq!(metric.to_string(), name);
        }
        assert_eq!(
            "minkowski:3".parse::<Metric>().unwrap(),
            Metric::Backend(DistanceFunction::Minkowski { p: 3.0 })
        );
        let plain: Metric = "minkowski".parse().unwrap();
        assert_eq!(plain, Metric::Backend(DistanceFunction::Minkowski { p: 2.0 }));
        assert_eq!(plain.to_string().parse::<Metric>().unwrap(), plain);
        assert_eq!(
            "cityblock".parse::<Metric>().unwrap(),
            Metric::Backend(DistanceFunction::Manhattan)
        );
    }

    #[test]
    fn unknown_metric_is_rejected() {
        let err = "hamming".parse::<Metric>().unwrap_err();
        assert_eq!(err, PredictionError::UnsupportedMetric("hamming".into()));
        assert!("minkowski:0.5".parse::<Metric>().is_err());
        assert!("minkowski:abc".parse::<Metric>().is_err());
        assert!("minkowski:".parse::<Metric>().is_err());
        assert!("minkowskii".parse::<Metric>().is_err());
    }

    #[test]
    fn internal_metric_mapping() {
        assert_eq!(Metric::Cosine.internal_metric(), DistanceFunction::Euclidean);
        assert_eq!(Metric::CosineBrute.internal_metric(), DistanceFunction::Cosine);
        assert_eq!(
            Metric::Backend(DistanceFunction::Manhattan).internal_metric(),
            DistanceFunction::Manhattan
        );
    }

    #[test]
    fn only_cosine_normalizes() {
        let vectors = vec![vec![3.0, 4.0], vec![0.0, 2.0]];
        let normalized = Metric::Cosine.normalize(vectors.clone());
        assert!((normalized[0][0] - 0.6).abs() < 1e-12);
        assert_eq!(normalized[1], vec![0.0, 1.0]);

        assert_eq!(Metric::CosineBrute.normalize(vectors.clone()), vectors);
        assert_eq!(
            Metric::Backend(DistanceFunction::Euclidean).normalize(vectors.clone()),
            vectors
        );
    }

    #[test]
    fn distance_functions() {
        let a = [0.0, 0.0];
        let b = [3.0, 4.0];
        assert_eq!(DistanceFunction::Euclidean.distance(&a, &b), 5.0);
        assert_eq!(DistanceFunction::SquaredEuclidean.distance(&a, &b), 25.0);
        assert_eq!(DistanceFunction::Manhattan.distance(&a, &b), 7.0);
        assert_eq!(DistanceFunction::Chebyshev.distance(&a, &b), 4.0);
        assert!((DistanceFunction::Minkowski { p: 2.0 }.distance(&a, &b) - 5.0).abs() < 1e-12);
        assert!(DistanceFunction::Cosine.distance(&[1.0, 0.0], &[2.0, 0.0]).abs() < 1e-12);
        assert!((DistanceFunction::Cosine.distance(&[1.0, 0.0], &[0.0, 1.0]) - 1.0).abs() < 1e-12);
        assert_eq!(cosine_distance(&a, &b), 1.0);
    }

    #[test]
    fn cosine_similarity_ignores_raw_distance() {
        let sim = Metric::Cosine.similarity(123.0, &[1.0, 1.0], &[2.0, 2.0], ZeroDistancePolicy::Infinite);
        assert!((sim - 1.0).abs() < 1e-12);
    }

    #[test]
    fn cosine_brute_similarity_is_one_minus_distance() {
        let sim = Metric::CosineBrute.similarity(0.25, &[], &[], ZeroDistancePolicy::Infinite);
        assert_eq!(sim, 0.75);
    }

    #[test]
    fn backend_similarity_is_reciprocal_with_zero_policy() {
        let m = Metric::Backend(DistanceFunction::Euclidean);
        assert_eq!(m.similarity(4.0, &[], &[], ZeroDistancePolicy::Infinite), 0.25);
        assert_eq!(m.similarity(0.0, &[], &[], ZeroDistancePolicy::Infinite), f64::INFINITY);

        let saturate = ZeroDistancePolicy::Saturate { max: 1e6 };
        assert_eq!(m.similarity(0.0, &[], &[], saturate), 1e6);
        assert_eq!(m.similarity(1e-9, &[], &[], saturate), 1e6);
        assert_eq!(m.similarity(2.0, &[], &[], saturate), 0.5);
    }

    #[test]
    fn metric_serde_uses_names() {
        let json = serde_json::to_string(&Metric::CosineBrute).unwrap();
        assert_eq!(json, "\"cosine-brute\"");
        let m: Metric = serde_json::from_str("\"euclidean\"").unwrap();
        assert_eq!(m, Metric::Backend(DistanceFunction::Euclidean));
        assert!(serde_json::from_str::<Metric>("\"nope\"").is_err());
    }
}
