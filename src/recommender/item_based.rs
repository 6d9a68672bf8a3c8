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

use std::sync::Arc;

use tracing::debug;

use crate::error::{CfError, Result};
use crate::model::{DataModel, SharedModel};
use crate::recommender::{
    self, Aggregation, CandidateItemsStrategy, PreferredItemsNeighborhoodStrategy, Recommender,
};
use crate::refresh::{Refreshable, RefreshHelper, RefreshedComponents};
use crate::similarity::ItemSimilarity;
use crate::topk::{self, Rescorer};
use crate::types::{ItemId, RecommendedItem, UserId};

/// Recommends items similar to what the user already rated.
///
/// Estimates lean on item-item similarity between the target item and the
/// user's own ratings, so they stay meaningful even for users with very few
/// neighbors. Item-item relations also shift more slowly than user behavior,
/// which is what makes the caching similarity decorator worthwhile here.
pub struct ItemBasedRecommender {
    model: SharedModel,
    similarity: Arc<dyn ItemSimilarity>,
    candidates: Arc<dyn CandidateItemsStrategy>,
    aggregation: Aggregation,
    refresh_helper: RefreshHelper,
}

impl ItemBasedRecommender {
    pub fn new<S>(model: SharedModel, similarity: Arc<S>) -> Self
    where
        S: ItemSimilarity + Refreshable + 'static,
    {
        Self::with_strategy(
            model,
            similarity,
            Arc::new(PreferredItemsNeighborhoodStrategy),
            Aggregation::WeightedAverage,
        )
    }

    pub fn with_strategy<S, C>(
        model: SharedModel,
        similarity: Arc<S>,
        candidates: Arc<C>,
        aggregation: Aggregation,
    ) -> Self
    where
        S: ItemSimilarity + Refreshable + 'static,
        C: CandidateItemsStrategy + 'static,
    {
        let refresh_helper =
            RefreshHelper::new(vec![Arc::clone(&similarity) as Arc<dyn Refreshable>]);
        ItemBasedRecommender {
            model,
            similarity,
            candidates,
            aggregation,
            refresh_helper,
        }
    }

    pub fn add_refresh_dependency(&mut self, dependency: Arc<dyn Refreshable>) {
        self.refresh_helper.add_dependency(dependency);
    }

    /// The items most similar to all of `item_ids`, scored by their average
    /// similarity. Pairs the model cannot judge are skipped; an item with no
    /// judged pair at all is dropped.
    pub fn most_similar_items(
        &self,
        item_ids: &[ItemId],
        how_many: usize,
    ) -> Result<Vec<RecommendedItem>> {
        let model = self.model.read().unwrap();
        for &item_id in item_ids {
            model.preferences_for_item(item_id)?;
        }

        let candidates = model
            .item_ids()
            .iter()
            .copied()
            .filter(|candidate| !item_ids.contains(candidate));
        let top = topk::top_items(how_many, candidates, None, |candidate| {
            let mut total = 0.0_f64;
            let mut count = 0_usize;
            for &item_id in item_ids {
                let similarity = self.similarity.item_similarity(&model, item_id, candidate);
                if !similarity.is_nan() {
                    total += similarity;
                    count += 1;
                }
            }
            if count == 0 {
                Ok(f64::NAN)
            } else {
                Ok(total / count as f64)
            }
        })?;
        Ok(to_recommendations(top))
    }

    /// Explains a recommendation: the user's own rated items ranked by their
    /// similarity to `item_id`.
    pub fn recommended_because(
        &self,
        user_id: UserId,
        item_id: ItemId,
        how_many: usize,
    ) -> Result<Vec<RecommendedItem>> {
        let model = self.model.read().unwrap();
        model.preferences_for_item(item_id)?;
        let rated = model.preferences_from_user(user_id)?;

        let own_items: Vec<i64> = (0..rated.len())
            .map(|index| rated.other_id(index))
            .filter(|&own| own != item_id)
            .collect();
        let top = topk::top_items(how_many, own_items, None, |own| {
            Ok(self.similarity.item_similarity(&model, item_id, own))
        })?;
        Ok(to_recommendations(top))
    }

    fn estimate(&self, model: &DataModel, user_id: UserId, item_id: ItemId) -> Result<f32> {
        let rated = model.preferences_from_user(user_id)?;
        let mut weighted_total = 0.0_f64;
        let mut similarity_total = 0.0_f64;
        let mut count = 0_usize;

        for index in 0..rated.len() {
            let own_item = rated.other_id(index);
            if own_item == item_id {
                continue;
            }
            let similarity = self.similarity.item_similarity(model, item_id, own_item);
            if similarity.is_nan() {
                continue;
            }
            match self.aggregation {
                Aggregation::WeightedAverage => {
                    weighted_total += similarity * f64::from(rated.value(index));
                    similarity_total += similarity;
                }
                Aggregation::SimilaritySum => {
                    weighted_total += similarity;
                }
            }
            count += 1;
        }

        let estimate = match self.aggregation {
            Aggregation::WeightedAverage => {
                if count == 0 || similarity_total == 0.0 {
                    return Ok(f32::NAN);
                }
                (weighted_total / similarity_total) as f32
            }
            Aggregation::SimilaritySum => {
                if count == 0 {
                    return Ok(f32::NAN);
                }
                weighted_total as f32
            }
        };
        Ok(recommender::cap_estimate(model, estimate))
    }
}

fn to_recommendations(top: Vec<crate::topk::ScoredId>) -> Vec<RecommendedItem> {
    top.into_iter()
        .map(|scored| RecommendedItem { item_id: scored.id, value: scored.score as f32 })
        .collect()
}

impl Recommender for ItemBasedRecommender {
    fn recommend_with(
        &self,
        user_id: UserId,
        how_many: usize,
        rescorer: Option<&dyn Rescorer>,
    ) -> Result<Vec<RecommendedItem>> {
        let model = self.model.read().unwrap();
        let candidates = self.candidates.candidate_items(&model, user_id)?;
        debug!("scoring {} candidates for user {}", candidates.len(), user_id);

        let top = topk::top_items(how_many, candidates.iter(), rescorer, |item_id| {
            self.estimate(&model, user_id, item_id).map(f64::from)
        })?;
        Ok(to_recommendations(top))
    }

    fn estimate_preference(&self, user_id: UserId, item_id: ItemId) -> Result<f32> {
        let model = self.model.read().unwrap();
        if let Some(actual) = model.preference_value(user_id, item_id)? {
            return Ok(actual);
        }
        if !model.contains_item(item_id) {
            return Err(CfError::NoSuchItem(item_id));
        }
        self.estimate(&model, user_id, item_id)
    }

    fn set_preference(&self, user_id: UserId, item_id: ItemId, value: f32) -> Result<()> {
        recommender::set_model_preference(&self.model, user_id, item_id, value)
    }

    fn remove_preference(&self, user_id: UserId, item_id: ItemId) -> Result<()> {
        recommender::remove_model_preference(&self.model, user_id, item_id)
    }
}

impl Refreshable for ItemBasedRecommender {
    fn refresh(&self, already_refreshed: &mut RefreshedComponents) {
        self.refresh_helper.refresh(already_refreshed, || {});
    }
}

#[cfg(test)]
mod tests {

    use super::*;
    use crate::model;
    use crate::model::DataModel;
    use crate::similarity::{SimilarityMeasure, VectorSimilarity};

    fn dense_model() -> DataModel {
        // Items 10 and 11 are rated alike by everyone, item 12 inversely.
        DataModel::from_preferences(vec![
            (1, 10, 5.0),
            (1, 11, 4.5),
            (1, 12, 1.0),
            (2, 10, 4.0),
            (2, 11, 4.0),
            (2, 12, 2.0),
            (3, 10, 1.0),
            (3, 11, 1.5),
            (3, 12, 5.0),
            (4, 10, 4.8),
            (4, 12, 1.2),
        ])
        .unwrap()
    }

    fn recommender_over(model: DataModel) -> ItemBasedRecommender {
        let similarity =
            Arc::new(VectorSimilarity::new(SimilarityMeasure::UncenteredCosine));
        ItemBasedRecommender::new(model::shared(model), similarity)
    }

    #[test]
    fn recommends_items_similar_to_own_high_ratings() {
        let recommender = recommender_over(dense_model());
        // User 4 rated items 10 and 12; item 11 tracks item 10 closely.
        let recommendations = recommender.recommend(4, 1).unwrap();
        assert_eq!(recommendations.len(), 1);
        assert_eq!(recommendations[0].item_id, 11);
    }

    #[test]
    fn estimate_is_similarity_weighted() {
        let recommender = recommender_over(dense_model());
        let estimate = recommender.estimate_preference(4, 11).unwrap();
        // Dominated by the similar item 10 rated 4.8, pulled down a little
        // by the dissimilar item 12.
        assert!(estimate > 3.0 && estimate <= 5.0, "estimate {}", estimate);
    }

    #[test]
    fn estimate_returns_existing_preference_unchanged() {
        let recommender = recommender_over(dense_model());
        assert!((recommender.estimate_preference(1, 12).unwrap() - 1.0).abs() < f32::EPSILON);
    }

    #[test]
    fn unknown_ids_are_errors() {
        let recommender = recommender_over(dense_model());
        assert!(matches!(
            recommender.estimate_preference(99, 10),
            Err(CfError::NoSuchUser(99))
        ));
        assert!(matches!(
            recommender.estimate_preference(1, 999),
            Err(CfError::NoSuchItem(999))
        ));
    }

    #[test]
    fn most_similar_items_ranks_by_average_similarity() {
        let recommender = recommender_over(dense_model());
        let similar = recommender.most_similar_items(&[10], 2).unwrap();
        assert_eq!(similar.len(), 2);
        assert_eq!(similar[0].item_id, 11);
        assert!(similar[0].value >= similar[1].value);
    }

    #[test]
    fn recommended_because_surfaces_the_influential_items() {
        let recommender = recommender_over(dense_model());
        let because = recommender.recommended_because(4, 11, 2).unwrap();
        assert_eq!(because.len(), 2);
        // Item 10 explains a recommendation of item 11 better than item 12.
        assert_eq!(because[0].item_id, 10);
    }

    #[test]
    fn recommendation_is_idempotent_without_mutation() {
        let recommender = recommender_over(dense_model());
        assert_eq!(recommender.recommend(4, 3).unwrap(), recommender.recommend(4, 3).unwrap());
    }
}
