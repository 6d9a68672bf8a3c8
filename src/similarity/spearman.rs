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

//! Spearman rank correlation: replace each array's preference values by
//! their rank, then apply the Pearson formula to the ranks. Ties receive
//! distinct sequential ranks in sort order rather than averaged ranks.

use crate::model::{Dimension, PreferenceArray};
use crate::similarity::correlation;

pub(super) fn similarity(xs: &PreferenceArray, ys: &PreferenceArray) -> (f64, usize) {
    let ranked_xs = ranked(xs);
    let ranked_ys = ranked(ys);
    correlation::streaming_similarity(&ranked_xs, &ranked_ys, correlation::finalize_pearson)
}

/// A copy of the array with values replaced by 1-based ranks of the original
/// values, resting sorted by the non-fixed id again.
fn ranked(array: &PreferenceArray) -> PreferenceArray {
    let mut by_value = array.clone();
    by_value.sort_by_value();

    let mut ranked = match array.dimension() {
        Dimension::User => PreferenceArray::for_user(array.fixed_id(), array.len()),
        Dimension::Item => PreferenceArray::for_item(array.fixed_id(), array.len()),
    };
    for index in 0..by_value.len() {
        ranked.push(by_value.other_id(index), (index + 1) as f32);
    }
    ranked.sort_by_other_id();
    ranked
}

#[cfg(test)]
mod tests {

    use super::*;

    fn user_array(user: i64, prefs: &[(i64, f32)]) -> PreferenceArray {
        let mut array = PreferenceArray::for_user(user, prefs.len());
        for &(item, value) in prefs {
            array.push(item, value);
        }
        array.sort_by_item();
        array
    }

    #[test]
    fn ranking_is_order_preserving() {
        let array = user_array(1, &[(10, 0.7), (20, 0.1), (30, 0.4)]);
        let ranked = ranked(&array);

        assert_eq!(ranked.find(20).map(|i| ranked.value(i)), Some(1.0));
        assert_eq!(ranked.find(30).map(|i| ranked.value(i)), Some(2.0));
        assert_eq!(ranked.find(10).map(|i| ranked.value(i)), Some(3.0));
    }

    #[test]
    fn monotone_agreement_is_perfect_correlation() {
        // Different magnitudes, same ordering of items.
        let xs = user_array(1, &[(10, 0.1), (20, 0.5), (30, 0.9)]);
        let ys = user_array(2, &[(10, 2.0), (20, 30.0), (30, 31.0)]);
        let (similarity, n) = similarity_of(&xs, &ys);
        assert_eq!(n, 3);
        assert!((similarity - 1.0).abs() < 1e-9);
    }

    #[test]
    fn reversed_ordering_is_perfect_anticorrelation() {
        let xs = user_array(1, &[(10, 0.1), (20, 0.5), (30, 0.9)]);
        let ys = user_array(2, &[(10, 5.0), (20, 3.0), (30, 1.0)]);
        let (similarity, _) = similarity_of(&xs, &ys);
        assert!((similarity + 1.0).abs() < 1e-9);
    }

    fn similarity_of(xs: &PreferenceArray, ys: &PreferenceArray) -> (f64, usize) {
        similarity(xs, ys)
    }
}
