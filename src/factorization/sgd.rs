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

//! Stochastic gradient descent over biased factor vectors.
//!
//! Every vector carries three slots ahead of the latent features: the global
//! average, the user bias and the item bias. The complementary side holds a
//! constant one in each foreign slot, so a plain dot product yields
//! `average + user bias + item bias + latent interaction`. Training walks a
//! shuffled flat list of (user, item) pairs once per epoch, updating biases
//! and features per example.

use std::time::Instant;

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use tracing::debug;

use crate::config::SgdConfig;
use crate::error::{CfError, Result};
use crate::factorization::{dot, index_ids, Factorization, Factorizer};
use crate::ids::IdMap;
use crate::model::DataModel;

pub(super) const GLOBAL_AVERAGE_SLOT: usize = 0;
pub(super) const USER_BIAS_SLOT: usize = 1;
pub(super) const ITEM_BIAS_SLOT: usize = 2;
pub(super) const FEATURE_OFFSET: usize = 3;

pub struct RatingSgdFactorizer {
    config: SgdConfig,
}

impl RatingSgdFactorizer {
    pub fn new(config: SgdConfig) -> Result<Self> {
        check_config(&config)?;
        Ok(RatingSgdFactorizer { config })
    }
}

impl Factorizer for RatingSgdFactorizer {
    fn factorize(&self, model: &DataModel) -> Result<Factorization> {
        let mut rng = rng_for(&self.config);
        let user_index = index_ids(model.user_ids())?;
        let item_index = index_ids(model.item_ids())?;
        let (mut user_features, mut item_features) =
            initial_vectors(model, &self.config, &mut rng)?;

        let mut pairs = training_pairs(model, &user_index, &item_index)?;
        pairs.shuffle(&mut rng);

        let vector_len = self.config.num_features + FEATURE_OFFSET;
        let regularization = self.config.regularization;
        let mut learning_rate = self.config.learning_rate;

        for epoch in 0..self.config.num_iterations {
            let started = Instant::now();
            for &(user_row, item_row, rating) in &pairs {
                let user_vector = &mut user_features[user_row];
                let item_vector = &mut item_features[item_row];

                let prediction = dot(user_vector, item_vector);
                if !prediction.is_finite() {
                    return Err(CfError::NumericDivergence(format!(
                        "SGD produced a non-finite prediction in epoch {}", epoch + 1,
                    )));
                }
                let err = rating - prediction;

                user_vector[USER_BIAS_SLOT] +=
                    learning_rate * (err - regularization * user_vector[USER_BIAS_SLOT]);
                item_vector[ITEM_BIAS_SLOT] +=
                    learning_rate * (err - regularization * item_vector[ITEM_BIAS_SLOT]);
                for feature in FEATURE_OFFSET..vector_len {
                    let user_feature = user_vector[feature];
                    let item_feature = item_vector[feature];
                    user_vector[feature] +=
                        learning_rate * (err * item_feature - regularization * user_feature);
                    item_vector[feature] +=
                        learning_rate * (err * user_feature - regularization * item_feature);
                }
            }
            learning_rate *= self.config.decay;
            debug!(
                "SGD epoch {} of {} over {} examples finished in {}ms",
                epoch + 1,
                self.config.num_iterations,
                pairs.len(),
                started.elapsed().as_millis(),
            );
        }

        Ok(Factorization::new(user_index, item_index, user_features, item_features))
    }
}

pub(super) fn check_config(config: &SgdConfig) -> Result<()> {
    if config.num_features < 1 {
        return Err(CfError::InvalidArgument("at least one feature is required".into()));
    }
    if config.num_iterations < 1 {
        return Err(CfError::InvalidArgument("at least one iteration is required".into()));
    }
    if !(config.learning_rate > 0.0 && config.learning_rate.is_finite()) {
        return Err(CfError::InvalidArgument(format!(
            "learning rate must be finite and positive, got {}", config.learning_rate,
        )));
    }
    if config.regularization < 0.0 || !config.regularization.is_finite() {
        return Err(CfError::InvalidArgument(format!(
            "regularization must be finite and non-negative, got {}", config.regularization,
        )));
    }
    if config.noise < 0.0 || !config.noise.is_finite() {
        return Err(CfError::InvalidArgument(format!(
            "noise must be finite and non-negative, got {}", config.noise,
        )));
    }
    if !(config.decay > 0.0 && config.decay <= 1.0) {
        return Err(CfError::InvalidArgument(format!(
            "decay must be in (0, 1], got {}", config.decay,
        )));
    }
    Ok(())
}

pub(super) fn rng_for(config: &SgdConfig) -> StdRng {
    match config.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    }
}

/// Bias-slot aware starting vectors: the global average seeds every user's
/// first slot, the foreign slots hold constant ones, and the latent features
/// start as small noise.
pub(super) fn initial_vectors(
    model: &DataModel,
    config: &SgdConfig,
    rng: &mut StdRng,
) -> Result<(Vec<Vec<f64>>, Vec<Vec<f64>>)> {
    if model.num_users() == 0 || model.num_items() == 0 {
        return Err(CfError::InvalidArgument(
            "cannot factorize a model without users or items".into(),
        ));
    }

    let vector_len = config.num_features + FEATURE_OFFSET;
    let average = global_average(model)?;

    let mut user_features = Vec::with_capacity(model.num_users());
    for _ in 0..model.num_users() {
        let mut vector = noise_vector(vector_len, config.noise, rng);
        vector[GLOBAL_AVERAGE_SLOT] = average;
        vector[USER_BIAS_SLOT] = 0.0;
        vector[ITEM_BIAS_SLOT] = 1.0;
        user_features.push(vector);
    }

    let mut item_features = Vec::with_capacity(model.num_items());
    for _ in 0..model.num_items() {
        let mut vector = noise_vector(vector_len, config.noise, rng);
        vector[GLOBAL_AVERAGE_SLOT] = 1.0;
        vector[USER_BIAS_SLOT] = 1.0;
        vector[ITEM_BIAS_SLOT] = 0.0;
        item_features.push(vector);
    }

    Ok((user_features, item_features))
}

pub(super) fn noise_vector(len: usize, noise: f64, rng: &mut StdRng) -> Vec<f64> {
    (0..len).map(|_| (rng.gen::<f64>() - 0.5) * noise).collect()
}

/// The flat (user row, item row, rating) triples the epochs iterate over.
pub(super) fn training_pairs(
    model: &DataModel,
    user_index: &IdMap<usize>,
    item_index: &IdMap<usize>,
) -> Result<Vec<(usize, usize, f64)>> {
    let mut pairs = Vec::with_capacity(model.num_preferences());
    for &user_id in model.user_ids() {
        let array = model.preferences_from_user(user_id)?;
        let user_row = *user_index.get(user_id).ok_or(CfError::NoSuchUser(user_id))?;
        for index in 0..array.len() {
            let item_id = array.other_id(index);
            let item_row = *item_index.get(item_id).ok_or(CfError::NoSuchItem(item_id))?;
            pairs.push((user_row, item_row, f64::from(array.value(index))));
        }
    }
    Ok(pairs)
}

fn global_average(model: &DataModel) -> Result<f64> {
    let mut total = 0.0_f64;
    let mut count = 0_usize;
    for &user_id in model.user_ids() {
        let array = model.preferences_from_user(user_id)?;
        for index in 0..array.len() {
            total += f64::from(array.value(index));
            count += 1;
        }
    }
    Ok(total / count as f64)
}
