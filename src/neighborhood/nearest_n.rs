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
use crate::topk;
use crate::types::UserId;

/// The N most similar users, most similar first, optionally dropping
/// candidates below a minimum similarity before selection.
pub struct NearestNUserNeighborhood<S> {
    n: usize,
    min_similarity: Option<f64>,
    sampling_rate: f64,
    similarity: S,
}

impl<S> NearestNUserNeighborhood<S> {
    pub fn new(n: usize, similarity: S) -> Result<Self> {
        if n < 1 {
            return Err(CfError::InvalidArgument(
                "a neighborhood needs room for at least one neighbor".into(),
            ));
        }
        Ok(NearestNUserNeighborhood { n, min_similarity: None, sampling_rate: 1.0, similarity })
    }

    pub fn with_min_similarity(mut self, min_similarity: f64) -> Self {
        self.min_similarity = Some(min_similarity);
        self
    }

    pub fn with_sampling_rate(mut self, sampling_rate: f64) -> Result<Self> {
        sampling::check_rate(sampling_rate)?;
        self.sampling_rate = sampling_rate;
        Ok(self)
    }
}

impl<S> UserNeighborhood for NearestNUserNeighborhood<S>
where
    S: UserSimilarity,
{
    fn user_neighborhood(&self, model: &DataModel, user_id: UserId) -> Result<Vec<UserId>> {
        // The target user must exist; similarities involving unknown ids are
        // NaN and would silently produce an empty neighborhood.
        model.preferences_from_user(user_id)?;
        let candidates = neighborhood::candidate_user_ids(model, user_id, self.sampling_rate)?;
        let min_similarity = self.min_similarity;

        let top = topk::top_users(self.n, candidates, |other| {
            let similarity = self.similarity.user_similarity(model, user_id, other);
            match min_similarity {
                // A NaN score fails the cut here and would be skipped by the
                // selector anyway.
                Some(cutoff) if !(similarity >= cutoff) => Ok(f64::NAN),
                _ => Ok(similarity),
            }
        })?;

        Ok(top.into_iter().map(|scored| scored.id).collect())
    }
}

impl<S> Refreshable for NearestNUserNeighborhood<S>
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
    fn nearest_one_picks_the_agreeing_user() {
        let model = scenario_model();
        let neighborhood = NearestNUserNeighborhood::new(1, pearson()).unwrap();
        assert_eq!(neighborhood.user_neighborhood(&model, 1).unwrap(), vec![2]);
    }

    #[test]
    fn neighbors_come_most_similar_first() {
        let model = scenario_model();
        let neighborhood = NearestNUserNeighborhood::new(2, pearson()).unwrap();
        assert_eq!(neighborhood.user_neighborhood(&model, 1).unwrap(), vec![2, 3]);
    }

    #[test]
    fn min_similarity_drops_weak_neighbors() {
        let model = scenario_model();
        let neighborhood =
            NearestNUserNeighborhood::new(2, pearson()).unwrap().with_min_similarity(0.0);
        // User 3 correlates negatively with user 1 and falls below the cut.
        assert_eq!(neighborhood.user_neighborhood(&model, 1).unwrap(), vec![2]);
    }

    #[test]
    fn the_target_user_is_never_a_neighbor() {
        let model = scenario_model();
        let neighborhood = NearestNUserNeighborhood::new(3, pearson()).unwrap();
        let neighbors = neighborhood.user_neighborhood(&model, 1).unwrap();
        assert!(!neighbors.contains(&1));
    }

    #[test]
    fn invalid_parameters() {
        assert!(NearestNUserNeighborhood::new(0, pearson()).is_err());
        assert!(NearestNUserNeighborhood::new(1, pearson())
            .unwrap()
            .with_sampling_rate(0.0)
            .is_err());
    }

    #[test]
    fn sampling_returns_a_subset_of_real_neighbors() {
        let model = scenario_model();
        let neighborhood = NearestNUserNeighborhood::new(2, pearson())
            .unwrap()
            .with_sampling_rate(0.5)
            .unwrap();
        let neighbors = neighborhood.user_neighborhood(&model, 1).unwrap();
        assert!(neighbors.len() <= 2);
        assert!(neighbors.iter().all(|id| [2, 3].contains(id)));
    }
}
