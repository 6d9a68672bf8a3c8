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

//! Latent-factor models: dense per-user and per-item feature vectors learned
//! from the sparse preference matrix, usable as an alternative preference
//! estimator wherever a recommender needs one.

mod als;
pub mod persist;
mod qr;
mod sgd;
mod svdpp;

pub use self::als::AlsWrFactorizer;
pub use self::persist::FilePersistence;
pub use self::qr::QrDecomposition;
pub use self::sgd::RatingSgdFactorizer;
pub use self::svdpp::SvdPlusPlusFactorizer;

use crate::error::{CfError, Result};
use crate::ids::IdMap;
use crate::model::DataModel;
use crate::types::{ItemId, UserId};

/// A learned low-rank approximation of the preference matrix: one dense
/// feature vector per user and per item, plus the id-to-row translations.
/// Training runs produce a `Factorization` wholesale; it is replaced on
/// retraining, never patched.
pub struct Factorization {
    pub(crate) user_index: IdMap<usize>,
    pub(crate) item_index: IdMap<usize>,
    pub(crate) user_features: Vec<Vec<f64>>,
    pub(crate) item_features: Vec<Vec<f64>>,
}

impl Factorization {
    pub(crate) fn new(
        user_index: IdMap<usize>,
        item_index: IdMap<usize>,
        user_features: Vec<Vec<f64>>,
        item_features: Vec<Vec<f64>>,
    ) -> Self {
        Factorization { user_index, item_index, user_features, item_features }
    }

    pub fn num_features(&self) -> usize {
        self.user_features.first().map_or(0, Vec::len)
    }

    pub fn num_users(&self) -> usize {
        self.user_features.len()
    }

    pub fn num_items(&self) -> usize {
        self.item_features.len()
    }

    /// The model's guess for how much `user_id` would like `item_id`: the
    /// dot product of their feature vectors.
    pub fn estimate(&self, user_id: UserId, item_id: ItemId) -> Result<f32> {
        let user_row = self.user_index.get(user_id).ok_or(CfError::NoSuchUser(user_id))?;
        let item_row = self.item_index.get(item_id).ok_or(CfError::NoSuchItem(item_id))?;
        Ok(dot(&self.user_features[*user_row], &self.item_features[*item_row]) as f32)
    }

    pub fn user_vector(&self, user_id: UserId) -> Result<&[f64]> {
        let row = self.user_index.get(user_id).ok_or(CfError::NoSuchUser(user_id))?;
        Ok(&self.user_features[*row])
    }

    pub fn item_vector(&self, item_id: ItemId) -> Result<&[f64]> {
        let row = self.item_index.get(item_id).ok_or(CfError::NoSuchItem(item_id))?;
        Ok(&self.item_features[*row])
    }
}

/// Learns a `Factorization` from a data model. Failed runs return an error
/// and leave no partial result behind.
pub trait Factorizer: Send + Sync {
    fn factorize(&self, model: &DataModel) -> Result<Factorization>;
}

pub(crate) fn dot(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

/// Assigns matrix rows to ids on first sight; the ids arrive in ascending
/// order from the model, so row order is deterministic.
pub(crate) fn index_ids(ids: &[i64]) -> Result<IdMap<usize>> {
    let mut index = IdMap::with_capacity(ids.len());
    for (row, &id) in ids.iter().enumerate() {
        index.put(id, row)?;
    }
    Ok(index)
}

#[cfg(test)]
mod tests {

    use super::*;
    use crate::ids::IdMap;

    fn tiny_factorization() -> Factorization {
        let mut user_index = IdMap::new();
        user_index.put(1, 0).unwrap();
        user_index.put(2, 1).unwrap();
        let mut item_index = IdMap::new();
        item_index.put(10, 0).unwrap();

        Factorization::new(
            user_index,
            item_index,
            vec![vec![1.0, 2.0], vec![0.5, 0.0]],
            vec![vec![3.0, 1.0]],
        )
    }

    #[test]
    fn estimates_are_dot_products() {
        let factorization = tiny_factorization();
        assert!((factorization.estimate(1, 10).unwrap() - 5.0).abs() < 1e-6);
        assert!((factorization.estimate(2, 10).unwrap() - 1.5).abs() < 1e-6);
    }

    #[test]
    fn unknown_ids_are_errors() {
        let factorization = tiny_factorization();
        assert!(matches!(
            factorization.estimate(9, 10),
            Err(CfError::NoSuchUser(9))
        ));
        assert!(matches!(
            factorization.estimate(1, 99),
            Err(CfError::NoSuchItem(99))
        ));
    }

    #[test]
    fn index_rows_follow_id_order() {
        let index = index_ids(&[5, 7, 11]).unwrap();
        assert_eq!(index.get(5), Some(&0));
        assert_eq!(index.get(7), Some(&1));
        assert_eq!(index.get(11), Some(&2));
    }
}
