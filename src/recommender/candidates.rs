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

//! Enumeration of the items eligible for recommendation to a user. The
//! strategies trade recall for cost: everything unrated, everything within
//! one co-rating hop, or a sampled slice of that hop bounded by
//! `factor * log2(population)`.

use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::error::{CfError, Result};
use crate::ids::IdSet;
use crate::model::DataModel;
use crate::sampling;
use crate::types::UserId;

pub trait CandidateItemsStrategy: Send + Sync {
    /// The items worth scoring for `user_id`; never items they already
    /// rated.
    fn candidate_items(&self, model: &DataModel, user_id: UserId) -> Result<IdSet>;
}

/// Every item the user has not rated yet. Complete, and as expensive as the
/// item population.
pub struct AllUnknownItemsStrategy;

impl CandidateItemsStrategy for AllUnknownItemsStrategy {
    fn candidate_items(&self, model: &DataModel, user_id: UserId) -> Result<IdSet> {
        let rated = model.item_ids_from_user(user_id)?;
        let mut candidates = IdSet::with_capacity(model.num_items() - rated.len());
        for &item_id in model.item_ids() {
            if !rated.contains(item_id) {
                candidates.add(item_id)?;
            }
        }
        Ok(candidates)
    }
}

/// Everything preferred by users who co-rated any of the user's items. The
/// classic one-hop walk: my items, their raters, those raters' items.
pub struct PreferredItemsNeighborhoodStrategy;

impl CandidateItemsStrategy for PreferredItemsNeighborhoodStrategy {
    fn candidate_items(&self, model: &DataModel, user_id: UserId) -> Result<IdSet> {
        let rated = model.item_ids_from_user(user_id)?;
        let mut candidates = IdSet::new();
        for item_id in rated.iter() {
            let raters = model.preferences_for_item(item_id)?;
            for rater_index in 0..raters.len() {
                let other_user = raters.other_id(rater_index);
                if other_user == user_id {
                    continue;
                }
                let their_items = model.preferences_from_user(other_user)?;
                for item_index in 0..their_items.len() {
                    let candidate = their_items.other_id(item_index);
                    if !rated.contains(candidate) {
                        candidates.add(candidate)?;
                    }
                }
            }
        }
        Ok(candidates)
    }
}

/// The one-hop walk with every fan-out reservoir-sampled, keeping expected
/// work around `factor * log2(population)` per level no matter how prolific
/// the user or how popular the items.
pub struct SamplingCandidateItemsStrategy {
    factor: usize,
}

impl SamplingCandidateItemsStrategy {
    pub fn new(factor: usize) -> Result<Self> {
        if factor < 1 {
            return Err(CfError::InvalidArgument("sampling factor must be at least 1".into()));
        }
        Ok(SamplingCandidateItemsStrategy { factor })
    }
}

fn log2_bound(factor: usize, population: usize) -> usize {
    let log2 = (population.max(2) as f64).log2().ceil() as usize;
    (factor * log2).max(1)
}

impl CandidateItemsStrategy for SamplingCandidateItemsStrategy {
    fn candidate_items(&self, model: &DataModel, user_id: UserId) -> Result<IdSet> {
        let max_items = log2_bound(self.factor, model.num_items());
        let max_users_per_item = log2_bound(self.factor, model.num_users());

        let rated = model.item_ids_from_user(user_id)?;
        let mut rng = StdRng::from_entropy();
        let own_sample = sampling::reservoir_sample(rated.iter(), max_items, &mut rng);

        let mut candidates = IdSet::new();
        for item_id in own_sample {
            let raters = model.preferences_for_item(item_id)?;
            let rater_sample = sampling::reservoir_sample(
                (0..raters.len()).map(|index| raters.other_id(index)),
                max_users_per_item,
                &mut rng,
            );
            for other_user in rater_sample {
                if other_user == user_id {
                    continue;
                }
                let their_items = model.preferences_from_user(other_user)?;
                let item_sample = sampling::reservoir_sample(
                    (0..their_items.len()).map(|index| their_items.other_id(index)),
                    max_items,
                    &mut rng,
                );
                for candidate in item_sample {
                    if !rated.contains(candidate) {
                        candidates.add(candidate)?;
                    }
                }
            }
        }
        Ok(candidates)
    }
}

#[cfg(test)]
mod tests {

    use super::*;
    use crate::model::DataModel;

    fn model() -> DataModel {
        DataModel::from_preferences(vec![
            (1, 10, 1.0),
            (1, 11, 1.0),
            (2, 10, 1.0),
            (2, 12, 1.0),
            (3, 12, 1.0),
            (3, 13, 1.0),
            (4, 14, 1.0),
        ])
        .unwrap()
    }

    #[test]
    fn all_unknown_items() {
        let model = model();
        let candidates = AllUnknownItemsStrategy.candidate_items(&model, 1).unwrap();
        // Everything except the user's own items 10 and 11.
        assert_eq!(candidates.len(), 3);
        for item in [12, 13, 14] {
            assert!(candidates.contains(item));
        }
    }

    #[test]
    fn preferred_by_neighbors_stays_within_one_hop() {
        let model = model();
        let candidates =
            PreferredItemsNeighborhoodStrategy.candidate_items(&model, 1).unwrap();
        // User 2 co-rated item 10 and brings item 12; nobody co-rated item
        // 11, and items 13/14 are two hops away or unconnected.
        assert_eq!(candidates.len(), 1);
        assert!(candidates.contains(12));
    }

    #[test]
    fn sampling_never_proposes_rated_items() {
        let model = model();
        let strategy = SamplingCandidateItemsStrategy::new(3).unwrap();
        for _ in 0..10 {
            let candidates = strategy.candidate_items(&model, 1).unwrap();
            assert!(!candidates.contains(10));
            assert!(!candidates.contains(11));
        }
    }

    #[test]
    fn sampling_factor_must_be_positive() {
        assert!(SamplingCandidateItemsStrategy::new(0).is_err());
    }

    #[test]
    fn unknown_user_is_an_error() {
        let model = model();
        assert!(AllUnknownItemsStrategy.candidate_items(&model, 99).is_err());
        assert!(PreferredItemsNeighborhoodStrategy.candidate_items(&model, 99).is_err());
    }
}
