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

//! Recommenders compose the data model, a similarity, a neighborhood or
//! candidate strategy and the top-K selector into the two questions callers
//! actually ask: "which N items for this user" and "how much would they like
//! this one item".

mod caching;
mod candidates;
mod item_based;
mod svd;
mod user_based;

pub use self::caching::CachingRecommender;
pub use self::candidates::{
    AllUnknownItemsStrategy, CandidateItemsStrategy, PreferredItemsNeighborhoodStrategy,
    SamplingCandidateItemsStrategy,
};
pub use self::item_based::ItemBasedRecommender;
pub use self::svd::SvdRecommender;
pub use self::user_based::UserBasedRecommender;

use crate::error::{CfError, Result};
use crate::model::{DataModel, SharedModel};
use crate::refresh::Refreshable;
use crate::topk::Rescorer;
use crate::types::{ItemId, RecommendedItem, UserId};

/// The primary interface of the engine.
///
/// Estimates answer NaN ("no opinion") when the data cannot support a
/// number; lookups of ids the model has never seen are `NoSuchUser` /
/// `NoSuchItem` errors instead.
pub trait Recommender: Refreshable {
    fn recommend(&self, user_id: UserId, how_many: usize) -> Result<Vec<RecommendedItem>> {
        self.recommend_with(user_id, how_many, None)
    }

    /// Like `recommend`, with a caller-supplied rescorer filtering candidates
    /// and adjusting their scores.
    fn recommend_with(
        &self,
        user_id: UserId,
        how_many: usize,
        rescorer: Option<&dyn Rescorer>,
    ) -> Result<Vec<RecommendedItem>>;

    fn estimate_preference(&self, user_id: UserId, item_id: ItemId) -> Result<f32>;

    fn set_preference(&self, user_id: UserId, item_id: ItemId, value: f32) -> Result<()>;

    fn remove_preference(&self, user_id: UserId, item_id: ItemId) -> Result<()>;
}

/// How a recommender folds neighbor opinions into one estimate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Aggregation {
    /// Average of ratings weighted by similarity. The default for models
    /// carrying preference strengths.
    WeightedAverage,
    /// Sum of similarities alone, standing in for the absent strengths of
    /// boolean-feedback models.
    SimilaritySum,
}

/// Clamps an estimate into the model's observed value range, when that range
/// is known. Boolean models have no range and pass everything through.
pub(crate) fn cap_estimate(model: &DataModel, estimate: f32) -> f32 {
    let min = model.min_preference();
    let max = model.max_preference();
    if min.is_nan() || max.is_nan() || estimate.is_nan() {
        return estimate;
    }
    estimate.max(min).min(max)
}

pub(crate) fn set_model_preference(
    model: &SharedModel,
    user_id: UserId,
    item_id: ItemId,
    value: f32,
) -> Result<()> {
    if value.is_nan() {
        return Err(CfError::InvalidArgument(format!(
            "NaN preference value for user {} and item {}", user_id, item_id,
        )));
    }
    model.write().unwrap().set_preference(user_id, item_id, value)
}

pub(crate) fn remove_model_preference(
    model: &SharedModel,
    user_id: UserId,
    item_id: ItemId,
) -> Result<()> {
    model.write().unwrap().remove_preference(user_id, item_id)
}
