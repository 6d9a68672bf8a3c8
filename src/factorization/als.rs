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

//! Alternating least squares with weighted lambda regularization.
//!
//! Each iteration holds one factor matrix fixed and re-solves every row of
//! the other as an independent ridge regression. Rows share nothing, so the
//! solves fan out over a thread pool and join at the end of each half
//! iteration. The implicit-feedback variant regresses against confidences
//! `1 + alpha * r` instead of the ratings themselves.

use std::time::Instant;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use tracing::info;

use crate::config::AlsConfig;
use crate::error::{CfError, Result};
use crate::factorization::qr::QrDecomposition;
use crate::factorization::{index_ids, Factorization, Factorizer};
use crate::ids::IdMap;
use crate::model::DataModel;

pub struct AlsWrFactorizer {
    config: AlsConfig,
}

impl AlsWrFactorizer {
    pub fn new(config: AlsConfig) -> Result<Self> {
        if config.num_features < 1 {
            return Err(CfError::InvalidArgument("at least one feature is required".into()));
        }
        if config.num_iterations < 1 {
            return Err(CfError::InvalidArgument("at least one iteration is required".into()));
        }
        if config.lambda < 0.0 || !config.lambda.is_finite() {
            return Err(CfError::InvalidArgument(format!(
                "lambda must be finite and non-negative, got {}", config.lambda,
            )));
        }
        if config.implicit && (config.alpha <= 0.0 || !config.alpha.is_finite()) {
            return Err(CfError::InvalidArgument(format!(
                "alpha must be finite and positive, got {}", config.alpha,
            )));
        }
        Ok(AlsWrFactorizer { config })
    }

    /// Item vectors start at (average rating, small noise...), user vectors
    /// at zero; the first user half-iteration gives them real content.
    fn initial_item_features(&self, model: &DataModel, rng: &mut StdRng) -> Result<Vec<Vec<f64>>> {
        let num_features = self.config.num_features;
        let mut features = Vec::with_capacity(model.num_items());
        for &item_id in model.item_ids() {
            let array = model.preferences_for_item(item_id)?;
            let mut total = 0.0_f64;
            for index in 0..array.len() {
                total += f64::from(array.value(index));
            }
            let mut row = Vec::with_capacity(num_features);
            row.push(total / array.len() as f64);
            for _ in 1..num_features {
                row.push(rng.gen::<f64>() * 0.1);
            }
            features.push(row);
        }
        Ok(features)
    }

    /// Re-solves every row of one factor matrix against the fixed other
    /// matrix. The matrix is split into disjoint per-row slices before
    /// dispatch, one task per row; the join is the barrier between half
    /// iterations, and the first row error aborts the whole batch.
    #[allow(clippy::too_many_arguments)]
    fn solve_half(
        &self,
        pool: &rayon::ThreadPool,
        model: &DataModel,
        ids: &[i64],
        target: &mut [Vec<f64>],
        fixed: &[Vec<f64>],
        fixed_index: &IdMap<usize>,
        fixed_gram: Option<&[Vec<f64>]>,
        by_user: bool,
    ) -> Result<()> {
        pool.install(|| {
            target
                .par_iter_mut()
                .zip(ids.par_iter())
                .try_for_each(|(target_row, &id)| {
                    let array = if by_user {
                        model.preferences_from_user(id)?
                    } else {
                        model.preferences_for_item(id)?
                    };
                    let mut rows = Vec::with_capacity(array.len());
                    let mut values = Vec::with_capacity(array.len());
                    for index in 0..array.len() {
                        let other = array.other_id(index);
                        // Both projections come from the same preference
                        // set, so the other id always has a row.
                        let row = fixed_index
                            .get(other)
                            .ok_or_else(|| if by_user {
                                CfError::NoSuchItem(other)
                            } else {
                                CfError::NoSuchUser(other)
                            })?;
                        rows.push(fixed[*row].as_slice());
                        values.push(f64::from(array.value(index)));
                    }
                    *target_row = if self.config.implicit {
                        let gram = fixed_gram.unwrap_or(&[]);
                        solve_implicit(&rows, &values, gram, self.config.lambda, self.config.alpha)?
                    } else {
                        solve_explicit(&rows, &values, self.config.lambda)?
                    };
                    Ok(())
                })
        })
    }
}

impl Factorizer for AlsWrFactorizer {
    fn factorize(&self, model: &DataModel) -> Result<Factorization> {
        if model.num_users() == 0 || model.num_items() == 0 {
            return Err(CfError::InvalidArgument(
                "cannot factorize a model without users or items".into(),
            ));
        }

        let mut rng = match self.config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let num_threads = if self.config.num_threads == 0 {
            num_cpus::get()
        } else {
            self.config.num_threads
        };
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(num_threads)
            .build()
            .map_err(|error| {
                CfError::InvalidArgument(format!(
                    "cannot build a pool of {} solver threads: {}", num_threads, error,
                ))
            })?;

        let user_ids = model.user_ids();
        let item_ids = model.item_ids();
        let user_index = index_ids(user_ids)?;
        let item_index = index_ids(item_ids)?;

        let mut user_features = vec![vec![0.0; self.config.num_features]; user_ids.len()];
        let mut item_features = self.initial_item_features(model, &mut rng)?;

        info!(
            "ALS-WR over {} users, {} items, {} features on {} threads",
            user_ids.len(),
            item_ids.len(),
            self.config.num_features,
            num_threads,
        );

        for iteration in 0..self.config.num_iterations {
            let started = Instant::now();

            let item_gram = self.config.implicit.then(|| gram_matrix(&item_features));
            self.solve_half(
                &pool,
                model,
                user_ids,
                &mut user_features,
                &item_features,
                &item_index,
                item_gram.as_deref(),
                true,
            )?;

            let user_gram = self.config.implicit.then(|| gram_matrix(&user_features));
            self.solve_half(
                &pool,
                model,
                item_ids,
                &mut item_features,
                &user_features,
                &user_index,
                user_gram.as_deref(),
                false,
            )?;

            info!(
                "iteration {} of {} finished in {}ms",
                iteration + 1,
                self.config.num_iterations,
                started.elapsed().as_millis(),
            );
        }

        Ok(Factorization::new(user_index, item_index, user_features, item_features))
    }
}

/// Ridge regression for one row against its rated counterparts:
/// `(MᵗM + lambda * n * I) x = Mᵗ r`.
fn solve_explicit(m: &[&[f64]], r: &[f64], lambda: f64) -> Result<Vec<f64>> {
    let n = m.len();
    let num_features = m.first().map_or(0, |row| row.len());

    let mut a = vec![vec![0.0; num_features]; num_features];
    let mut b = vec![0.0; num_features];
    for (row, &value) in m.iter().zip(r) {
        for p in 0..num_features {
            b[p] += row[p] * value;
            for q in 0..num_features {
                a[p][q] += row[p] * row[q];
            }
        }
    }
    for (p, row) in a.iter_mut().enumerate() {
        row[p] += lambda * n as f64;
    }

    QrDecomposition::new(&a).solve(&b)
}

/// The implicit-feedback normal equations: every item contributes through the
/// precomputed gram matrix at base confidence, and the rated ones add their
/// `alpha * r` surplus. Solves `(YᵗY + Yᵗ(C - I)Y + lambda * I) x = Yᵗ C p`
/// with the binary preference p = 1 for every observed pair.
fn solve_implicit(
    rated: &[&[f64]],
    values: &[f64],
    gram: &[Vec<f64>],
    lambda: f64,
    alpha: f64,
) -> Result<Vec<f64>> {
    let num_features = gram.len();

    let mut a: Vec<Vec<f64>> = gram.to_vec();
    let mut b = vec![0.0; num_features];
    for (row, &value) in rated.iter().zip(values) {
        let confidence = 1.0 + alpha * value;
        for p in 0..num_features {
            b[p] += confidence * row[p];
            for q in 0..num_features {
                a[p][q] += (confidence - 1.0) * row[p] * row[q];
            }
        }
    }
    for (p, row) in a.iter_mut().enumerate() {
        row[p] += lambda;
    }

    QrDecomposition::new(&a).solve(&b)
}

/// `FᵗF` of a factor matrix, shared by every row solve of one implicit half
/// iteration.
fn gram_matrix(features: &[Vec<f64>]) -> Vec<Vec<f64>> {
    let num_features = features.first().map_or(0, Vec::len);
    let mut gram = vec![vec![0.0; num_features]; num_features];
    for row in features {
        for p in 0..num_features {
            for q in 0..num_features {
                gram[p][q] += row[p] * row[q];
            }
        }
    }
    gram
}

#[cfg(test)]
mod tests {

    use super::*;
    use crate::model::DataModel;

    fn dense_ratings() -> Vec<(i64, i64, f32)> {
        vec![
            (1, 10, 5.0),
            (1, 11, 1.0),
            (2, 10, 4.0),
            (2, 11, 2.0),
            (3, 10, 4.5),
            (3, 11, 1.5),
        ]
    }

    fn explicit_config() -> AlsConfig {
        AlsConfig {
            num_features: 2,
            lambda: 0.1,
            num_iterations: 5,
            num_threads: 2,
            seed: Some(42),
            ..AlsConfig::default()
        }
    }

    #[test]
    fn reconstructs_a_dense_low_rank_matrix() {
        let ratings = dense_ratings();
        let model = DataModel::from_preferences(ratings.clone()).unwrap();
        let factorizer = AlsWrFactorizer::new(explicit_config()).unwrap();

        let factorization = factorizer.factorize(&model).unwrap();

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
        let model = DataModel::from_preferences(dense_ratings()).unwrap();
        let first = AlsWrFactorizer::new(explicit_config())
            .unwrap()
            .factorize(&model)
            .unwrap();
        let second = AlsWrFactorizer::new(explicit_config())
            .unwrap()
            .factorize(&model)
            .unwrap();

        for &(user_id, item_id, _) in &dense_ratings() {
            assert_eq!(
                first.estimate(user_id, item_id).unwrap(),
                second.estimate(user_id, item_id).unwrap(),
            );
        }
    }

    #[test]
    fn implicit_feedback_separates_communities() {
        // Two disjoint communities; confidences should keep estimates high
        // within a community and near zero across.
        let model = DataModel::from_boolean_preferences(vec![
            (1, 10),
            (1, 11),
            (2, 10),
            (2, 11),
            (3, 20),
            (3, 21),
            (4, 20),
            (4, 21),
        ])
        .unwrap();
        let factorizer = AlsWrFactorizer::new(AlsConfig {
            num_features: 2,
            lambda: 0.1,
            num_iterations: 10,
            implicit: true,
            alpha: 40.0,
            num_threads: 1,
            seed: Some(7),
        })
        .unwrap();

        let factorization = factorizer.factorize(&model).unwrap();

        let within = factorization.estimate(1, 10).unwrap();
        let across = factorization.estimate(1, 20).unwrap();
        assert!(within > 0.5, "within-community estimate {}", within);
        assert!(across < 0.5, "cross-community estimate {}", across);
        assert!(within > across);
    }

    #[test]
    fn rejects_unusable_configs() {
        assert!(AlsWrFactorizer::new(AlsConfig {
            num_features: 0,
            ..AlsConfig::default()
        })
        .is_err());
        assert!(AlsWrFactorizer::new(AlsConfig {
            num_iterations: 0,
            ..AlsConfig::default()
        })
        .is_err());
        assert!(AlsWrFactorizer::new(AlsConfig {
            lambda: -1.0,
            ..AlsConfig::default()
        })
        .is_err());
    }

    #[test]
    fn refuses_an_empty_model() {
        let model = DataModel::from_preferences(Vec::<(i64, i64, f32)>::new()).unwrap();
        let factorizer = AlsWrFactorizer::new(explicit_config()).unwrap();
        assert!(matches!(
            factorizer.factorize(&model),
            Err(CfError::InvalidArgument(_))
        ));
    }

    #[test]
    fn explicit_solver_matches_a_known_system() {
        // Two orthogonal unit rows, no regularization: x must equal r.
        let rows: Vec<&[f64]> = vec![&[1.0, 0.0], &[0.0, 1.0]];
        let x = solve_explicit(&rows, &[3.0, 4.0], 0.0).unwrap();
        assert!((x[0] - 3.0).abs() < 1e-9);
        assert!((x[1] - 4.0).abs() < 1e-9);
    }
}
