/*
 * Corater
 * Copyright (C) 2026 The corater developers
 *
 * This program is free software: you can redistribute it and/or modify
 * it under the terms of the GNU General Public License as published by
 * the Free Software Foundation, either version 3 of the License, or
 * (at your option) any later version.
 *
 * This program is distributed in the hope that it will be useful,
 * but WITHOUT ANY WARRANTY; without even the implied warranty of
 * MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 * GNU General Public License for more details.
 *
 * You should have received a copy of the GNU General Public License
 * along with this program. If not, see <http://www.gnu.org/licenses/>.
 */

//! The configuration surface of the engine. Host services describe what they
//! want declaratively (typically deserialized from their own config files)
//! and the builders below assemble the component graph.

use std::sync::Arc;

use serde_derive::{Deserialize, Serialize};

use crate::error::Result;
use crate::factorization::{AlsWrFactorizer, RatingSgdFactorizer, SvdPlusPlusFactorizer};
use crate::model::SharedModel;
use crate::neighborhood::{NearestNUserNeighborhood, ThresholdUserNeighborhood};
use crate::recommender::{
    Aggregation, ItemBasedRecommender, PreferredItemsNeighborhoodStrategy,
    SamplingCandidateItemsStrategy, SvdRecommender, UserBasedRecommender,
};
use crate::similarity::{SimilarityMeasure, VectorSimilarity, Weighting};

/// Hyper-parameters of the ALS-WR trainers.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AlsConfig {
    pub num_features: usize,
    /// Ridge-regression regularization strength.
    pub lambda: f64,
    pub num_iterations: usize,
    /// Train against implicit-feedback confidences instead of explicit
    /// ratings.
    pub implicit: bool,
    /// Confidence scaling for implicit feedback: `confidence = 1 + alpha * r`.
    pub alpha: f64,
    /// Worker threads for the per-row solves; 0 means one per core.
    pub num_threads: usize,
    /// Seed for the noise initialization, for reproducible training runs.
    pub seed: Option<u64>,
}

impl Default for AlsConfig {
    fn default() -> Self {
        AlsConfig {
            num_features: 10,
            lambda: 0.065,
            num_iterations: 10,
            implicit: false,
            alpha: 40.0,
            num_threads: 0,
            seed: None,
        }
    }
}

/// Hyper-parameters of the SGD trainers (plain and SVD++).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SgdConfig {
    pub num_features: usize,
    pub learning_rate: f64,
    /// L2 regularization applied per example.
    pub regularization: f64,
    /// Magnitude of the random noise initializing the latent features.
    pub noise: f64,
    pub num_iterations: usize,
    /// Multiplicative learning-rate decay per epoch.
    pub decay: f64,
    pub seed: Option<u64>,
}

impl Default for SgdConfig {
    fn default() -> Self {
        SgdConfig {
            num_features: 10,
            learning_rate: 0.01,
            regularization: 0.1,
            noise: 0.01,
            num_iterations: 20,
            decay: 1.0,
            seed: None,
        }
    }
}

/// Which users count as a neighborhood.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NeighborhoodPolicy {
    NearestN {
        n: usize,
        #[serde(default)]
        min_similarity: Option<f64>,
    },
    Threshold {
        threshold: f64,
    },
}

/// Everything a host configures about a neighborhood recommender.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RecommenderConfig {
    pub similarity: SimilarityMeasure,
    pub weighting: Weighting,
    pub neighborhood: NeighborhoodPolicy,
    /// Fraction of the user population neighborhoods consider.
    pub sampling_rate: f64,
    /// When set, item-based candidates are sampled with this factor instead
    /// of walking the full one-hop neighborhood.
    pub candidate_sampling_factor: Option<usize>,
}

impl Default for RecommenderConfig {
    fn default() -> Self {
        RecommenderConfig {
            similarity: SimilarityMeasure::PearsonCorrelation,
            weighting: Weighting::Unweighted,
            neighborhood: NeighborhoodPolicy::NearestN { n: 10, min_similarity: None },
            sampling_rate: 1.0,
            candidate_sampling_factor: None,
        }
    }
}

fn aggregation_for(model: &SharedModel) -> Aggregation {
    if model.read().unwrap().has_preference_values() {
        Aggregation::WeightedAverage
    } else {
        Aggregation::SimilaritySum
    }
}

/// Assembles a user-based recommender from a config. Boolean-feedback models
/// automatically estimate with similarity sums.
pub fn user_based_recommender(
    model: SharedModel,
    config: &RecommenderConfig,
) -> Result<UserBasedRecommender> {
    let similarity =
        Arc::new(VectorSimilarity::with_weighting(config.similarity, config.weighting));
    let aggregation = aggregation_for(&model);

    match config.neighborhood {
        NeighborhoodPolicy::NearestN { n, min_similarity } => {
            let mut neighborhood = NearestNUserNeighborhood::new(n, *similarity)?;
            if let Some(min_similarity) = min_similarity {
                neighborhood = neighborhood.with_min_similarity(min_similarity);
            }
            let neighborhood = neighborhood.with_sampling_rate(config.sampling_rate)?;
            Ok(UserBasedRecommender::with_aggregation(
                model,
                Arc::new(neighborhood),
                similarity,
                aggregation,
            ))
        }
        NeighborhoodPolicy::Threshold { threshold } => {
            let neighborhood = ThresholdUserNeighborhood::new(threshold, *similarity)?
                .with_sampling_rate(config.sampling_rate)?;
            Ok(UserBasedRecommender::with_aggregation(
                model,
                Arc::new(neighborhood),
                similarity,
                aggregation,
            ))
        }
    }
}

/// Assembles an item-based recommender from a config.
pub fn item_based_recommender(
    model: SharedModel,
    config: &RecommenderConfig,
) -> Result<ItemBasedRecommender> {
    let similarity =
        Arc::new(VectorSimilarity::with_weighting(config.similarity, config.weighting));
    let aggregation = aggregation_for(&model);

    match config.candidate_sampling_factor {
        Some(factor) => Ok(ItemBasedRecommender::with_strategy(
            model,
            similarity,
            Arc::new(SamplingCandidateItemsStrategy::new(factor)?),
            aggregation,
        )),
        None => Ok(ItemBasedRecommender::with_strategy(
            model,
            similarity,
            Arc::new(PreferredItemsNeighborhoodStrategy),
            aggregation,
        )),
    }
}

/// Which trainer backs a factorization recommender.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FactorizerConfig {
    Als(AlsConfig),
    Sgd(SgdConfig),
    SvdPlusPlus(SgdConfig),
}

/// Assembles a factorization-backed recommender from a config. Training runs
/// during assembly; a model too small to factorize is reported here.
pub fn svd_recommender(model: SharedModel, config: &FactorizerConfig) -> Result<SvdRecommender> {
    match config {
        FactorizerConfig::Als(als) => {
            SvdRecommender::new(model, Arc::new(AlsWrFactorizer::new(als.clone())?))
        }
        FactorizerConfig::Sgd(sgd) => {
            SvdRecommender::new(model, Arc::new(RatingSgdFactorizer::new(sgd.clone())?))
        }
        FactorizerConfig::SvdPlusPlus(sgd) => {
            SvdRecommender::new(model, Arc::new(SvdPlusPlusFactorizer::new(sgd.clone())?))
        }
    }
}

#[cfg(test)]
mod tests {

    use super::*;
    use crate::model;
    use crate::model::test_fixtures::scenario_model;
    use crate::recommender::Recommender;

    #[test]
    fn configs_round_trip_through_json() {
        let config = RecommenderConfig {
            similarity: SimilarityMeasure::LogLikelihood,
            weighting: Weighting::Weighted,
            neighborhood: NeighborhoodPolicy::Threshold { threshold: 0.7 },
            sampling_rate: 0.5,
            candidate_sampling_factor: Some(4),
        };
        let json = serde_json::to_string(&config).unwrap();
        let parsed: RecommenderConfig = serde_json::from_str(&json).unwrap();
        assert!(matches!(parsed.similarity, SimilarityMeasure::LogLikelihood));
        assert!(matches!(parsed.neighborhood, NeighborhoodPolicy::Threshold { .. }));
        assert_eq!(parsed.candidate_sampling_factor, Some(4));
    }

    #[test]
    fn partial_json_falls_back_to_defaults() {
        let config: RecommenderConfig =
            serde_json::from_str(r#"{"similarity": "euclidean_distance"}"#).unwrap();
        assert!(matches!(config.similarity, SimilarityMeasure::EuclideanDistance));
        assert!(matches!(config.weighting, Weighting::Unweighted));
        assert!((config.sampling_rate - 1.0).abs() < f64::EPSILON);

        let als: AlsConfig = serde_json::from_str(r#"{"num_features": 3}"#).unwrap();
        assert_eq!(als.num_features, 3);
        assert!((als.lambda - 0.065).abs() < f64::EPSILON);
    }

    #[test]
    fn builds_working_recommenders() {
        let config = RecommenderConfig {
            neighborhood: NeighborhoodPolicy::NearestN { n: 1, min_similarity: None },
            ..RecommenderConfig::default()
        };
        let recommender =
            user_based_recommender(model::shared(scenario_model()), &config).unwrap();
        // Nearest neighbor of user 1 is user 2, who shares every item; no
        // new candidates means no recommendations, but the path works.
        assert!(recommender.recommend(1, 5).unwrap().is_empty());

        let item_config = RecommenderConfig::default();
        let recommender =
            item_based_recommender(model::shared(scenario_model()), &item_config).unwrap();
        assert!(recommender.estimate_preference(1, 100).is_ok());
    }

    #[test]
    fn builds_a_factorization_recommender() {
        let config = FactorizerConfig::Als(AlsConfig {
            num_features: 2,
            num_iterations: 3,
            num_threads: 1,
            seed: Some(1),
            ..AlsConfig::default()
        });
        let recommender = svd_recommender(model::shared(scenario_model()), &config).unwrap();
        assert!(recommender.estimate_preference(1, 100).is_ok());

        let json = serde_json::to_string(&config).unwrap();
        let parsed: FactorizerConfig = serde_json::from_str(&json).unwrap();
        assert!(matches!(parsed, FactorizerConfig::Als(_)));
    }

    #[test]
    fn invalid_configs_are_rejected() {
        let config = RecommenderConfig {
            neighborhood: NeighborhoodPolicy::NearestN { n: 0, min_similarity: None },
            ..RecommenderConfig::default()
        };
        assert!(user_based_recommender(model::shared(scenario_model()), &config).is_err());

        let config = RecommenderConfig {
            sampling_rate: 0.0,
            ..RecommenderConfig::default()
        };
        assert!(user_based_recommender(model::shared(scenario_model()), &config).is_err());
    }
}
