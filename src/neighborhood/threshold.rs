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

use crate::error::{CfError, Result};
use crate::model::DataModel;
use crate::neighborhood::{self, UserNeighborhood};
use crate::refresh::{Refreshable, RefreshedComponents};
use crate::sampling;
use crate::similarity::UserSimilarity;
use crate::types::UserId;

/// Every other user whose similarity reaches a fixed cutoff. Unbounded in
/// size; neighbors are returned in ascending id order.
pub struct ThresholdUserNeighborhood<S> {
    threshold: f64,
    sampling_rate: f64,
    similarity: S,
}

impl<S> ThresholdUserNeighborhood<S> {
    pub fn new(threshold: f64, similarity: S) -> Result<Self> {
        if threshold.is_nan() {
            return Err(CfError::InvalidArgument("NaN similarity threshold".into()));
        }
        Ok(ThresholdUserNeighborhood { threshold, sampling_rate: 1.0, similarity })
    }

    pub fn with_sampling_rate(mut self, sampling_rate: f64) -> Result<Self> {
        sampling::check_rate(sampling_rate)?;
        self.sampling_rate = sampling_rate;
        Ok(self)
    }
}

impl<S> UserNeighborhood for ThresholdUserNeighborhood<S>
where
    S: UserSimilarity,
{
    fn user_neighborhood(&self, model: &DataModel, user_id: UserId) -> Result<Vec<UserId>> {
        model.preferences_from_user(user_id)?;
        let candidates = neighborhood::candidate_user_ids(model, user_id, self.sampling_rate)?;
        let mut neighbors = Vec::new();
        for other in candidates {
            let similarity = self.similarity.user_similarity(model, user_id, other);
            // NaN fails the comparison and is excluded with it.
            if similarity >= self.threshold {
                neighbors.push(other);
            }
        }
        Ok(neighbors)
    }
}

impl<S> Refreshable for ThresholdUserNeighborhood<S>
where
    S: Send + Sync + Refreshable,
{
    fn refresh(&self, already_refreshed: &mut RefreshedComponents) {
        self.similarity.refresh(already_refreshed);
    }
}

#[cfg(test)]
mod tests {

    use super::*;
    use crate::model::test_fixtures::scenario_model;
    use crate::similarity::{SimilarityMeasure, VectorSimilarity};

    fn pearson() -> VectorSimilarity {
        VectorSimilarity::new(SimilarityMeasure::PearsonCorrelation)
    }

    #[test]
    fn cutoff_separates_agreeing_from_disagreeing() {
        let model = scenario_model();

        let strict = ThresholdUserNeighborhood::new(0.5, pearson()).unwrap();
        assert_eq!(strict.user_neighborhood(&model, 1).unwrap(), vec![2]);

        let permissive = ThresholdUserNeighborhood::new(-2.0, pearson()).unwrap();
        assert_eq!(permissive.user_neighborhood(&model, 1).unwrap(), vec![2, 3]);
    }

    #[test]
    fn unknown_similarity_never_qualifies() {
        // User 4 shares no items with anyone, so every pairwise similarity
        // involving them is NaN.
        let mut model = scenario_model();
        model.set_preference(4, 500, 1.0).unwrap();

        let neighborhood = ThresholdUserNeighborhood::new(-10.0, pearson()).unwrap();
        let neighbors = neighborhood.user_neighborhood(&model, 1).unwrap();
        assert!(!neighbors.contains(&4));
    }

    #[test]
    fn nan_threshold_is_invalid() {
        assert!(ThresholdUserNeighborhood::new(f64::NAN, pearson()).is_err());
    }
}
