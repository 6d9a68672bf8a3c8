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

//! Streaming accumulation shared by the correlation-style metrics.
//!
//! Both preference arrays rest sorted by their non-fixed id inside the data
//! model, so the co-rated pairs fall out of a single merge walk. One pass
//! gathers every running sum any of the metrics needs; a small finalizer per
//! metric turns the sums into a similarity.

use crate::model::PreferenceArray;

/// Running sums over the co-rated entries of two preference arrays.
#[derive(Debug, Default, Clone, Copy)]
pub(super) struct RunningSums {
    pub n: usize,
    pub sum_x: f64,
    pub sum_y: f64,
    pub sum_xy: f64,
    pub sum_x2: f64,
    pub sum_y2: f64,
    pub sum_xydiff2: f64,
}

impl RunningSums {
    /// The sums with both series shifted to mean zero, for the centered
    /// metrics.
    pub fn centered(&self) -> (f64, f64, f64) {
        let mean_x = self.sum_x / self.n as f64;
        let mean_y = self.sum_y / self.n as f64;
        let sum_xy = self.sum_xy - mean_y * self.sum_x;
        let sum_x2 = self.sum_x2 - mean_x * self.sum_x;
        let sum_y2 = self.sum_y2 - mean_y * self.sum_y;
        (sum_xy, sum_x2, sum_y2)
    }
}

pub(super) fn accumulate(xs: &PreferenceArray, ys: &PreferenceArray) -> RunningSums {
    let mut sums = RunningSums::default();
    let (mut i, mut j) = (0, 0);

    while i < xs.len() && j < ys.len() {
        match xs.other_id(i).cmp(&ys.other_id(j)) {
            std::cmp::Ordering::Less => i += 1,
            std::cmp::Ordering::Greater => j += 1,
            std::cmp::Ordering::Equal => {
                let x = f64::from(xs.value(i));
                let y = f64::from(ys.value(j));
                sums.n += 1;
                sums.sum_x += x;
                sums.sum_y += y;
                sums.sum_xy += x * y;
                sums.sum_x2 += x * x;
                sums.sum_y2 += y * y;
                sums.sum_xydiff2 += (x - y) * (x - y);
                i += 1;
                j += 1;
            }
        }
    }
    sums
}

/// Runs the shared accumulation and hands the sums to a per-metric
/// finalizer. No co-rated entries means no opinion.
pub(super) fn streaming_similarity(
    xs: &PreferenceArray,
    ys: &PreferenceArray,
    finalize: fn(&RunningSums) -> f64,
) -> (f64, usize) {
    let sums = accumulate(xs, ys);
    if sums.n == 0 {
        return (f64::NAN, 0);
    }
    (finalize(&sums), sums.n)
}

/// Pearson product-moment correlation over the centered sums.
pub(super) fn finalize_pearson(sums: &RunningSums) -> f64 {
    let (sum_xy, sum_x2, sum_y2) = sums.centered();
    ratio_of_products(sum_xy, sum_x2, sum_y2)
}

/// Cosine of the two raw preference vectors: the Pearson formula without
/// centering.
pub(super) fn finalize_uncentered_cosine(sums: &RunningSums) -> f64 {
    ratio_of_products(sums.sum_xy, sums.sum_x2, sums.sum_y2)
}

/// Euclidean-distance similarity `sqrt(n) / (1 + distance)`. The `sqrt(n)`
/// factor keeps pairs with many co-rated items from looking artificially far
/// apart; the result is capped at 1.
pub(super) fn finalize_euclidean(sums: &RunningSums) -> f64 {
    let similarity = (sums.n as f64).sqrt() / (1.0 + sums.sum_xydiff2.sqrt());
    similarity.min(1.0)
}

fn ratio_of_products(sum_xy: f64, sum_x2: f64, sum_y2: f64) -> f64 {
    let denominator = sum_x2.sqrt() * sum_y2.sqrt();
    if denominator == 0.0 {
        // A series with zero variance tells us nothing about covariation.
        return f64::NAN;
    }
    sum_xy / denominator
}

#[cfg(test)]
mod tests {

    use super::*;
    use crate::model::PreferenceArray;

    fn user_array(user: i64, prefs: &[(i64, f32)]) -> PreferenceArray {
        let mut array = PreferenceArray::for_user(user, prefs.len());
        for &(item, value) in prefs {
            array.push(item, value);
        }
        array.sort_by_item();
        array
    }

    #[test]
    fn accumulates_only_co_rated_entries() {
        let xs = user_array(1, &[(10, 1.0), (20, 2.0), (30, 3.0)]);
        let ys = user_array(2, &[(20, 4.0), (30, 5.0), (40, 6.0)]);

        let sums = accumulate(&xs, &ys);
        assert_eq!(sums.n, 2);
        assert!((sums.sum_x - 5.0).abs() < 1e-9);
        assert!((sums.sum_y - 9.0).abs() < 1e-9);
        assert!((sums.sum_xy - (2.0 * 4.0 + 3.0 * 5.0)).abs() < 1e-9);
        assert!((sums.sum_xydiff2 - (4.0 + 4.0)).abs() < 1e-9);
    }

    #[test]
    fn no_overlap_is_no_opinion() {
        let xs = user_array(1, &[(10, 1.0)]);
        let ys = user_array(2, &[(20, 1.0)]);
        let (similarity, n) = streaming_similarity(&xs, &ys, finalize_pearson);
        assert!(similarity.is_nan());
        assert_eq!(n, 0);
    }

    #[test]
    fn pearson_of_identical_series_is_one() {
        let xs = user_array(1, &[(10, 1.0), (20, 2.0), (30, 3.0)]);
        let ys = user_array(2, &[(10, 2.0), (20, 4.0), (30, 6.0)]);
        let (similarity, _) = streaming_similarity(&xs, &ys, finalize_pearson);
        assert!((similarity - 1.0).abs() < 1e-9);
    }

    #[test]
    fn pearson_is_nan_for_constant_series() {
        let xs = user_array(1, &[(10, 3.0), (20, 3.0)]);
        let ys = user_array(2, &[(10, 1.0), (20, 2.0)]);
        let (similarity, _) = streaming_similarity(&xs, &ys, finalize_pearson);
        assert!(similarity.is_nan());
    }

    #[test]
    fn euclidean_identical_series_hits_the_cap() {
        let xs = user_array(1, &[(10, 1.0), (20, 2.0), (30, 3.0)]);
        let (similarity, _) = streaming_similarity(&xs, &xs, finalize_euclidean);
        assert!((similarity - 1.0).abs() < 1e-9);
    }

    #[test]
    fn euclidean_decreases_with_distance() {
        let xs = user_array(1, &[(10, 1.0), (20, 1.0)]);
        let near = user_array(2, &[(10, 1.1), (20, 0.9)]);
        let far = user_array(3, &[(10, 3.0), (20, 3.0)]);

        let (near_sim, _) = streaming_similarity(&xs, &near, finalize_euclidean);
        let (far_sim, _) = streaming_similarity(&xs, &far, finalize_euclidean);
        assert!(near_sim > far_sim);
    }

    #[test]
    fn cosine_ignores_magnitude() {
        let xs = user_array(1, &[(10, 1.0), (20, 2.0)]);
        let ys = user_array(2, &[(10, 10.0), (20, 20.0)]);
        let (similarity, _) = streaming_similarity(&xs, &ys, finalize_uncentered_cosine);
        assert!((similarity - 1.0).abs() < 1e-9);
    }
}
