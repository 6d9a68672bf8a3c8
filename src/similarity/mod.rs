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

//! Pairwise user/user and item/item similarity.
//!
//! All metrics answer with a plain `f64` where NaN means "no sufficient
//! co-occurrence to judge", including lookups of ids the model has never
//! seen. Correlation-style metrics stream over the co-rated entries of two
//! preference arrays; set-overlap metrics compare who-rated-what id sets.

mod caching;
mod correlation;
mod llr;
mod overlap;
mod spearman;

pub use self::caching::CachingSimilarity;
pub use self::llr::log_likelihood_ratio;

use serde_derive::{Deserialize, Serialize};

use crate::model::DataModel;
use crate::refresh::{Refreshable, RefreshedComponents};
use crate::types::{ItemId, UserId};

/// The similarity metrics the engine knows. One enum instead of a type per
/// metric; the shared accumulation below dispatches on it through small
/// per-metric finalizers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SimilarityMeasure {
    PearsonCorrelation,
    EuclideanDistance,
    UncenteredCosine,
    SpearmanRank,
    TanimotoCoefficient,
    LogLikelihood,
    CityBlock,
}

/// Whether a correlation metric scales its result by the amount of co-rating
/// support behind it. The set-overlap metrics and Spearman ignore this.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Weighting {
    Unweighted,
    Weighted,
}

/// The seam recommenders and neighborhoods program against, so a caching
/// decorator can stand in for the raw computation.
pub trait UserSimilarity: Send + Sync {
    fn user_similarity(&self, model: &DataModel, user_a: UserId, user_b: UserId) -> f64;
}

pub trait ItemSimilarity: Send + Sync {
    fn item_similarity(&self, model: &DataModel, item_a: ItemId, item_b: ItemId) -> f64;
}

/// Computes similarities straight from the data model.
#[derive(Debug, Clone, Copy)]
pub struct VectorSimilarity {
    measure: SimilarityMeasure,
    weighting: Weighting,
}

impl VectorSimilarity {
    pub fn new(measure: SimilarityMeasure) -> Self {
        VectorSimilarity { measure, weighting: Weighting::Unweighted }
    }

    pub fn with_weighting(measure: SimilarityMeasure, weighting: Weighting) -> Self {
        VectorSimilarity { measure, weighting }
    }

    pub fn measure(&self) -> SimilarityMeasure {
        self.measure
    }

    fn correlation_of(
        &self,
        xs: &crate::model::PreferenceArray,
        ys: &crate::model::PreferenceArray,
        population: usize,
    ) -> f64 {
        let (result, n) = match self.measure {
            SimilarityMeasure::PearsonCorrelation => {
                correlation::streaming_similarity(xs, ys, correlation::finalize_pearson)
            }
            SimilarityMeasure::EuclideanDistance => {
                correlation::streaming_similarity(xs, ys, correlation::finalize_euclidean)
            }
            SimilarityMeasure::UncenteredCosine => {
                correlation::streaming_similarity(xs, ys, correlation::finalize_uncentered_cosine)
            }
            SimilarityMeasure::SpearmanRank => spearman::similarity(xs, ys),
            _ => unreachable!("not a correlation metric"),
        };

        match (self.weighting, self.measure) {
            (Weighting::Weighted, SimilarityMeasure::SpearmanRank) => result,
            (Weighting::Weighted, _) => weight_by_support(result, n, population),
            (Weighting::Unweighted, _) => result,
        }
    }

    fn is_overlap_measure(&self) -> bool {
        matches!(
            self.measure,
            SimilarityMeasure::TanimotoCoefficient
                | SimilarityMeasure::LogLikelihood
                | SimilarityMeasure::CityBlock
        )
    }

    fn overlap_of(&self, xs: &crate::ids::IdSet, ys: &crate::ids::IdSet, population: usize) -> f64 {
        match self.measure {
            SimilarityMeasure::TanimotoCoefficient => overlap::tanimoto(xs, ys),
            SimilarityMeasure::CityBlock => overlap::city_block(xs, ys),
            SimilarityMeasure::LogLikelihood => overlap::log_likelihood(xs, ys, population),
            _ => unreachable!("not an overlap metric"),
        }
    }
}

impl UserSimilarity for VectorSimilarity {
    fn user_similarity(&self, model: &DataModel, user_a: UserId, user_b: UserId) -> f64 {
        if self.is_overlap_measure() {
            let xs = match model.item_ids_from_user(user_a) {
                Ok(set) => set,
                Err(_) => return f64::NAN,
            };
            let ys = match model.item_ids_from_user(user_b) {
                Ok(set) => set,
                Err(_) => return f64::NAN,
            };
            return self.overlap_of(&xs, &ys, model.num_items());
        }

        let xs = match model.preferences_from_user(user_a) {
            Ok(array) => array,
            Err(_) => return f64::NAN,
        };
        let ys = match model.preferences_from_user(user_b) {
            Ok(array) => array,
            Err(_) => return f64::NAN,
        };
        self.correlation_of(xs, ys, model.num_items())
    }
}

impl ItemSimilarity for VectorSimilarity {
    fn item_similarity(&self, model: &DataModel, item_a: ItemId, item_b: ItemId) -> f64 {
        if self.is_overlap_measure() {
            let xs = match model.user_ids_for_item(item_a) {
                Ok(set) => set,
                Err(_) => return f64::NAN,
            };
            let ys = match model.user_ids_for_item(item_b) {
                Ok(set) => set,
                Err(_) => return f64::NAN,
            };
            return self.overlap_of(&xs, &ys, model.num_users());
        }

        let xs = match model.preferences_for_item(item_a) {
            Ok(array) => array,
            Err(_) => return f64::NAN,
        };
        let ys = match model.preferences_for_item(item_b) {
            Ok(array) => array,
            Err(_) => return f64::NAN,
        };
        self.correlation_of(xs, ys, model.num_users())
    }
}

impl Refreshable for VectorSimilarity {
    /// Stateless; nothing to rebuild.
    fn refresh(&self, _already_refreshed: &mut RefreshedComponents) {}
}

/// Pushes a similarity toward ±1 proportionally to how much of the
/// population the two parties co-rated: plentiful evidence firms the score
/// up, sparse evidence leaves it as computed.
fn weight_by_support(result: f64, count: usize, population: usize) -> f64 {
    if result.is_nan() {
        return result;
    }
    let scale = 1.0 - count as f64 / (population as f64 + 1.0);
    let weighted = if result < 0.0 {
        -1.0 + scale * (1.0 + result)
    } else {
        1.0 - scale * (1.0 - result)
    };
    weighted.max(-1.0).min(1.0)
}
