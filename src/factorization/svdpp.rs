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

//! SVD++: the biased SGD model extended with implicit feedback.
//!
//! Every item additionally carries a feedback vector `y`. A user's effective
//! vector is their own plus the sum of the `y` vectors of everything they
//! rated, normalized by `sqrt(|items(u)|)`, so the mere fact of having rated
//! an item informs predictions beyond the rating value. Training needs an
//! items-per-user index up front; the final factorization folds the feedback
//! into the user vectors so estimation stays a plain dot product.

use std::time::Instant;

use rand::seq::SliceRandom;
use tracing::debug;

use crate::config::SgdConfig;
use crate::error::{CfError, Result};
use crate::factorization::sgd::{
    check_config, initial_vectors, noise_vector, rng_for, training_pairs, FEATURE_OFFSET,
    ITEM_BIAS_SLOT, USER_BIAS_SLOT,
};
use crate::factorization::{dot, index_ids, Factorization, Factorizer};
use crate::ids::IdMap;
use crate::model::DataModel;

pub struct SvdPlusPlusFactorizer {
    config: SgdConfig,
}

impl SvdPlusPlusFactorizer {
    pub fn new(config: SgdConfig) -> Result<Self> {
        check_config(&config)?;
        Ok(SvdPlusPlusFactorizer { config })
    }
}

impl Factorizer for SvdPlusPlusFactorizer {
    fn factorize(&self, model: &DataModel) -> Result<Factorization> {
        let mut rng = rng_for(&self.config);
        let user_index = index_ids(model.user_ids())?;
        let item_index = index_ids(model.item_ids())?;
        let (mut user_features, mut item_features) =
            initial_vectors(model, &self.config, &mut rng)?;

        let vector_len = self.config.num_features + FEATURE_OFFSET;

        // Feedback vectors only live in the feature slots; zeroed bias slots
        // keep the fold from disturbing the bias bookkeeping.
        let mut y: Vec<Vec<f64>> = (0..model.num_items())
            .map(|_| {
                let mut vector = noise_vector(vector_len, self.config.noise, &mut rng);
                for slot in 0..FEATURE_OFFSET {
                    vector[slot] = 0.0;
                }
                vector
            })
            .collect();

        let items_by_user = items_by_user(model, &item_index)?;

        let mut pairs = training_pairs(model, &user_index, &item_index)?;
        pairs.shuffle(&mut rng);

        let regularization = self.config.regularization;
        let mut learning_rate = self.config.learning_rate;

        for epoch in 0..self.config.num_iterations {
            let started = Instant::now();
            for &(user_row, item_row, rating) in &pairs {
                let items_of_user = &items_by_user[user_row];
                let norm = 1.0 / (items_of_user.len() as f64).sqrt();

                let folded = fold_feedback(&user_features[user_row], items_of_user, &y, norm);
                let prediction = dot(&folded, &item_features[item_row]);
                if !prediction.is_finite() {
                    return Err(CfError::NumericDivergence(format!(
                        "SVD++ produced a non-finite prediction in epoch {}", epoch + 1,
                    )));
                }
                let err = rating - prediction;

                user_features[user_row][USER_BIAS_SLOT] += learning_rate
                    * (err - regularization * user_features[user_row][USER_BIAS_SLOT]);
                item_features[item_row][ITEM_BIAS_SLOT] += learning_rate
                    * (err - regularization * item_features[item_row][ITEM_BIAS_SLOT]);

                for feature in FEATURE_OFFSET..vector_len {
                    let user_feature = user_features[user_row][feature];
                    let item_feature = item_features[item_row][feature];

                    user_features[user_row][feature] +=
                        learning_rate * (err * item_feature - regularization * user_feature);
                    item_features[item_row][feature] +=
                        learning_rate * (err * folded[feature] - regularization * item_feature);

                    let feedback_step = err * norm * item_feature;
                    for &rated_row in items_of_user {
                        let y_feature = y[rated_row][feature];
                        y[rated_row][feature] +=
                            learning_rate * (feedback_step - regularization * y_feature);
                    }
                }
            }
            learning_rate *= self.config.decay;
            debug!(
                "SVD++ epoch {} of {} over {} examples finished in {}ms",
                epoch + 1,
                self.config.num_iterations,
                pairs.len(),
                started.elapsed().as_millis(),
            );
        }

        // Bake the feedback sums in, so the factorization estimates with a
        // plain dot product like every other trainer's.
        for (user_row, items_of_user) in items_by_user.iter().enumerate() {
            let norm = 1.0 / (items_of_user.len() as f64).sqrt();
            user_features[user_row] =
                fold_feedback(&user_features[user_row], items_of_user, &y, norm);
        }

        Ok(Factorization::new(user_index, item_index, user_features, item_features))
    }
}

fn fold_feedback(
    user_vector: &[f64],
    items_of_user: &[usize],
    y: &[Vec<f64>],
    norm: f64,
) -> Vec<f64> {
    let mut folded = user_vector.to_vec();
    for &rated_row in items_of_user {
        for (feature, folded_feature) in
            folded.iter_mut().enumerate().skip(FEATURE_OFFSET)
        {
            *folded_feature += norm * y[rated_row][feature];
        }
    }
    folded
}

/// Item rows rated by each user row, in user-row order.
fn items_by_user(model: &DataModel, item_index: &IdMap<usize>) -> Result<Vec<Vec<usize>>> {
    let mut index = Vec::with_capacity(model.num_users());
    for &user_id in model.user_ids() {
        let array = model.preferences_from_user(user_id)?;
        let mut rows = Vec::with_capacity(array.len());
        for position in 0..array.len() {
            let item_id = array.other_id(position);
            rows.push(*item_index.get(item_id).ok_or(CfError::NoSuchItem(item_id))?);
        }
        index.push(rows);
    }
    Ok(index)
}

#[cfg(test)]
mod tests {

    use super::*;
    use crate::model::DataModel;

    fn ratings() -> Vec<(i64, i64, f32)> {
        vec![
            (1, 10, 5.0),
            (1, 11, 4.0),
            (1, 12, 1.0),
            (2, 10, 4.5),
            (2, 11, 4.0),
            (2, 12, 1.5),
            (3, 10, 1.0),
            (3, 11, 2.0),
            (3, 12, 5.0),
        ]
    }

    fn config() -> SgdConfig {
        SgdConfig {
            num_features: 2,
            learning_rate: 0.02,
            regularization: 0.02,
            noise: 0.01,
            num_iterations: 500,
            decay: 1.0,
            seed: Some(42),
        }
    }

    #[test]
    fn fits_the_training_ratings() {
        let ratings = ratings();
        let model = DataModel::from_preferences(ratings.clone()).unwrap();
        let factorization =
            SvdPlusPlusFactorizer::new(config()).unwrap().factorize(&model).unwrap();

        for (user_id, item_id, rating) in ratings {
            let estimate = factorization.estimate(user_id, item_id).unwrap();
            assert!(
                (estimate - rating).abs() < 0.5,
                "user {} item {}: estimated {} for rating {}",
                user_id,
                item_id,
                estimate,
                rating,
            );
        }
    }

    #[test]
    fn same_seed_reproduces_the_same_factorization() {
        let model = DataModel::from_preferences(ratings()).unwrap();
        let first =
            SvdPlusPlusFactorizer::new(config()).unwrap().factorize(&model).unwrap();
        let second =
            SvdPlusPlusFactorizer::new(config()).unwrap().factorize(&model).unwrap();

        for &(user_id, item_id, _) in &ratings() {
            assert_eq!(
                first.estimate(user_id, item_id).unwrap(),
                second.estimate(user_id, item_id).unwrap(),
            );
        }
    }

    #[test]
    fn feedback_terms_differentiate_rating_sets() {
        // Users 1 and 4 rate item 10 identically, but user 4 rated nothing
        // else; the folded feedback should keep their estimates apart.
        let mut ratings = ratings();
        ratings.push((4, 10, 4.5));
        let model = DataModel::from_preferences(ratings).unwrap();
        let factorization =
            SvdPlusPlusFactorizer::new(config()).unwrap().factorize(&model).unwrap();

        let lone = factorization.estimate(4, 10).unwrap();
        assert!((lone - 4.5).abs() < 0.5, "estimated {} for rating 4.5", lone);
        assert_ne!(
            factorization.estimate(1, 12).unwrap(),
            factorization.estimate(4, 12).unwrap(),
        );
    }

    #[test]
    fn rejects_unusable_configs() {
        assert!(SvdPlusPlusFactorizer::new(SgdConfig {
            num_features: 0,
            ..SgdConfig::default()
        })
        .is_err());
        assert!(SvdPlusPlusFactorizer::new(SgdConfig {
            learning_rate: -1.0,
            ..SgdConfig::default()
        })
        .is_err());
    }
}
