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

//! Set-overlap metrics. These ignore preference strengths entirely and
//! compare who-rated-what sets, which also makes them the natural choice for
//! boolean-feedback models.

use crate::ids::IdSet;
use crate::similarity::llr;

/// Tanimoto coefficient (Jaccard): intersection over union. Disjoint sets
/// give no opinion rather than zero, mirroring the correlation metrics.
pub(super) fn tanimoto(xs: &IdSet, ys: &IdSet) -> f64 {
    let intersection = xs.intersection_size(ys);
    if intersection == 0 {
        return f64::NAN;
    }
    let union = xs.len() + ys.len() - intersection;
    intersection as f64 / union as f64
}

/// City-block (Manhattan) similarity over binary vectors: with only 0/1
/// coordinates the distance reduces to the symmetric difference size.
pub(super) fn city_block(xs: &IdSet, ys: &IdSet) -> f64 {
    let intersection = xs.intersection_size(ys);
    let distance = xs.len() + ys.len() - 2 * intersection;
    1.0 / (1.0 + distance as f64)
}

/// Log-likelihood similarity: the G² statistic of the co-occurrence
/// contingency table, squashed into [0, 1) via `1 - 1/(1 + llr)`.
/// `population` is the size of the dimension the sets draw from (number of
/// items for user sets, number of users for item sets).
pub(super) fn log_likelihood(xs: &IdSet, ys: &IdSet, population: usize) -> f64 {
    let intersection = xs.intersection_size(ys);
    let k11 = intersection as u64;
    let k12 = (xs.len() - intersection) as u64;
    let k21 = (ys.len() - intersection) as u64;
    // The sets are drawn from the population, so the union never exceeds it.
    let k22 = (population + intersection - xs.len() - ys.len()) as u64;

    let ratio = llr::log_likelihood_ratio(k11, k12, k21, k22);
    1.0 - 1.0 / (1.0 + ratio)
}
