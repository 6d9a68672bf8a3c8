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
use crate::model::{self, DataModel, SharedModel};
use crate::neighborhood::UserNeighborhood;
use crate::recommender::{self, Aggregation, Recommender};
use crate::refresh::{Refreshable, RefreshHelper, RefreshedComponents};
use crate::similarity::UserSimilarity;
use crate::topk::{self, Rescorer};
use crate::types::{ItemId, RecommendedItem, UserId};

/// Recommends what a user's neighborhood liked that the user has not seen.
///
/// An estimate for an item is the neighborhood's ratings averaged with
/// similarity weights; estimates backed by fewer than two neighbors are
/// unreliable and come back as NaN. With `Aggregation::SimilaritySum` the
/// rating magnitudes are ignored and similarities themselves accumulate,
/// which is the sensible reading for boolean-feedback models.
pub struct UserBasedRecommender {
    model: SharedModel,
    neighborhood: Arc<dyn UserNeighborhood>,
    similarity: Arc<dyn UserSimilarity>,
    aggregation: Aggregation,
    refresh_helper: RefreshHelper,
}

impl UserBasedRecommender {
    pub fn new<N, S>(model: SharedModel, neighborhood: Arc<N>, similarity: Arc<S>) -> Self
    where
        N: UserNeighborhood + Refreshable + 'static,
        S: UserSimilarity + Refreshable + 'static,
    {
        Self::with_aggregation(model, neighborhood, similarity, Aggregation::WeightedAverage)
    }

    pub fn with_aggregation<N, S>(
        model: SharedModel,
        neighborhood: Arc<N>,
        similarity: Arc<S>,
        aggregation: Aggregation,
    ) -> Self
    where
        N: UserNeighborhood + Refreshable + 'static,
        S: UserSimilarity + Refreshable + 'static,
    {
        let refresh_helper = RefreshHelper::new(vec![
            Arc::clone(&neighborhood) as Arc<dyn Refreshable>,
            Arc::clone(&similarity) as Arc<dyn Refreshable>,
        ]);
        UserBasedRecommender {
            model,
            neighborhood,
            similarity,
            aggregation,
            refresh_helper,
        }
    }

    /// Registers an upstream component (typically the file-backed model) to
    /// refresh before this recommender.
    pub fn add_refresh_dependency(&mut self, dependency: Arc<dyn Refreshable>) {
        self.refresh_helper.add_dependency(dependency);
    }

    /// The users most similar to `user_id`, most similar first.
    pub fn most_similar_user_ids(&self, user_id: UserId, how_many: usize) -> Result<Vec<UserId>> {
        let model = self.model.read().unwrap();
        model.preferences_from_user(user_id)?;
        let others = model.user_ids().iter().copied().filter(|&other| other != user_id);
        let top = topk::top_users(how_many, others, |other| {
            Ok(self.similarity.user_similarity(&model, user_id, other))
        })?;
        Ok(top.into_iter().map(|scored| scored.id).collect())
    }

    fn estimate_among(
        &self,
        model: &DataModel,
        neighbors: &[UserId],
        user_id: UserId,
        item_id: ItemId,
    ) -> Result<f32> {
        let mut weighted_total = 0.0_f64;
        let mut similarity_total = 0.0_f64;
        let mut count = 0_usize;

        for &neighbor in neighbors {
            if neighbor == user_id {
                continue;
            }
            let value = match model.preference_value(neighbor, item_id) {
                Ok(value) => value,
                // A neighbor may have been removed since selection.
                Err(CfError::NoSuchUser(_)) => None,
                Err(other) => return Err(other),
            };
            let value = match value {
                Some(value) => value,
                None => continue,
            };
            let similarity = self.similarity.user_similarity(model, user_id, neighbor);
            if similarity.is_nan() {
                continue;
            }
            match self.aggregation {
                Aggregation::WeightedAverage => {
                    weighted_total += similarity * f64::from(value);
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
                if count < 2 || similarity_total == 0.0 {
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

impl Recommender for UserBasedRecommender {
    fn recommend_with(
        &self,
        user_id: UserId,
        how_many: usize,
        rescorer: Option<&dyn Rescorer>,
    ) -> Result<Vec<RecommendedItem>> {
        let model = self.model.read().unwrap();
        let rated = model.item_ids_from_user(user_id)?;
        let neighbors = self.neighborhood.user_neighborhood(&model, user_id)?;
        if neighbors.is_empty() {
            debug!("no neighborhood for user {}", user_id);
            return Ok(Vec::new());
        }

        let candidates = model::items_preferred_by_any(&model, &neighbors, Some(&rated))?;
        debug!(
            "scoring {} candidates from {} neighbors for user {}",
            candidates.len(),
            neighbors.len(),
            user_id,
        );

        let top = topk::top_items(how_many, candidates.iter(), rescorer, |item_id| {
            self.estimate_among(&model, &neighbors, user_id, item_id).map(f64::from)
        })?;
        Ok(top
            .into_iter()
            .map(|scored| RecommendedItem { item_id: scored.id, value: scored.score as f32 })
            .collect())
    }

    fn estimate_preference(&self, user_id: UserId, item_id: ItemId) -> Result<f32> {
        let model = self.model.read().unwrap();
        if let Some(actual) = model.preference_value(user_id, item_id)? {
            return Ok(actual);
        }
        if !model.contains_item(item_id) {
            return Err(CfError::NoSuchItem(item_id));
        }
        let neighbors = self.neighborhood.user_neighborhood(&model, user_id)?;
        self.estimate_among(&model, &neighbors, user_id, item_id)
    }

    fn set_preference(&self, user_id: UserId, item_id: ItemId, value: f32) -> Result<()> {
        recommender::set_model_preference(&self.model, user_id, item_id, value)
    }

    fn remove_preference(&self, user_id: UserId, item_id: ItemId) -> Result<()> {
        recommender::remove_model_preference(&self.model, user_id, item_id)
    }
}

impl Refreshable for UserBasedRecommender {
    fn refresh(&self, already_refreshed: &mut RefreshedComponents) {
        self.refresh_helper.refresh(already_refreshed, || {});
    }
}
