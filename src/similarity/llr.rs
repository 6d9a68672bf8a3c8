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

//! The loglikelihood-based G²-test over a 2x2 contingency table of
//! co-occurrence counts, in its entropy formulation.
//!
//! The following url gives some details on a reference implementation:
//!
//! https://github.com/apache/mahout/blob/08e02602e947ff945b9bd73ab5f0b45863df3e53/math/src/main/java/org/apache/mahout/math/stats/LogLikelihood.java

/// G² statistic for the table
///
/// ```text
///   k11 | k12
///   ----+----
///   k21 | k22
/// ```
///
/// where `k11` counts co-occurrences of the two events, `k12` and `k21`
/// occurrences of only one of them, and `k22` of neither.
pub fn log_likelihood_ratio(k11: u64, k12: u64, k21: u64, k22: u64) -> f64 {
    let row_entropy = entropy2(k11 + k12, k21 + k22);
    let column_entropy = entropy2(k11 + k21, k12 + k22);
    let matrix_entropy = entropy4(k11, k12, k21, k22);

    if row_entropy + column_entropy < matrix_entropy {
        0.0 // Round off error
    } else {
        2.0 * (row_entropy + column_entropy - matrix_entropy)
    }
}

#[inline(always)]
fn x_log_x(x: u64) -> f64 {
    if x == 0 {
        0.0
    } else {
        x as f64 * (x as f64).ln()
    }
}

#[inline(always)]
fn entropy2(a: u64, b: u64) -> f64 {
    x_log_x(a + b) - x_log_x(a) - x_log_x(b)
}

#[inline(always)]
fn entropy4(a: u64, b: u64, c: u64, d: u64) -> f64 {
    x_log_x(a + b + c + d) - x_log_x(a) - x_log_x(b) - x_log_x(c) - x_log_x(d)
}
