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

//! Bounded best-K selection over scored ids.
//!
//! A max-heap ordered worst-first keeps the K best candidates seen so far;
//! once full, the running minimum short-circuits everything that cannot make
//! the cut, and the heap root is replaced for everything that can. NaN
//! scores are "no opinion" and skipped silently.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use crate::error::{CfError, Result};

/// Adjusts or vetoes candidate scores on behalf of the caller after the
/// engine's own estimate.
pub trait Rescorer {
    /// A replacement score for the candidate; NaN withdraws it.
    fn rescore(&self, id: i64, original_score: f64) -> f64;

    /// Excludes the candidate before any estimation work is spent on it.
    fn is_filtered(&self, _id: i64) -> bool {
        false
    }
}

/// An id with the score that put it into the selection.
#[derive(PartialEq, Debug, Clone, Copy)]
pub struct ScoredId {
    pub id: i64,
    pub score: f64,
}

/// Ordering for our max-heap. Note that we must use a special implementation
/// here as there is no total order on floating point numbers: the heap root
/// is the WORST retained candidate, and equal scores break toward keeping the
/// smaller id so that selection is deterministic.
fn cmp_reverse(a: &ScoredId, b: &ScoredId) -> Ordering {
    match a.score.partial_cmp(&b.score) {
        Some(Ordering::Less) => Ordering::Greater,
        Some(Ordering::Greater) => Ordering::Less,
        Some(Ordering::Equal) => a.id.cmp(&b.id),
        None => Ordering::Equal,
    }
}

impl Eq for ScoredId {}

impl Ord for ScoredId {
    fn cmp(&self, other: &Self) -> Ordering {
        cmp_reverse(self, other)
    }
}

impl PartialOrd for ScoredId {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(cmp_reverse(self, other))
    }
}

/// Selects the up to `how_many` best-scoring candidate items, best first.
///
/// The estimator may answer NaN ("no opinion") to drop a candidate, and its
/// errors abort the selection. An optional rescorer filters candidates
/// before estimation and adjusts scores after it. Ties are broken toward
/// ascending id.
pub fn top_items<I, F>(
    how_many: usize,
    candidates: I,
    rescorer: Option<&dyn Rescorer>,
    mut estimator: F,
) -> Result<Vec<ScoredId>>
where
    I: IntoIterator<Item = i64>,
    F: FnMut(i64) -> Result<f64>,
{
    if how_many < 1 {
        return Err(CfError::InvalidArgument("at least one result must be requested".into()));
    }

    let mut heap: BinaryHeap<ScoredId> = BinaryHeap::with_capacity(how_many);
    let mut lowest_retained = f64::NEG_INFINITY;

    for id in candidates {
        if let Some(rescorer) = rescorer {
            if rescorer.is_filtered(id) {
                continue;
            }
        }
        let estimate = estimator(id)?;
        if estimate.is_nan() {
            continue;
        }
        let score = match rescorer {
            Some(rescorer) => rescorer.rescore(id, estimate),
            None => estimate,
        };
        if score.is_nan() {
            continue;
        }

        if heap.len() < how_many {
            heap.push(ScoredId { id, score });
            if heap.len() == how_many {
                lowest_retained = heap.peek().map(|worst| worst.score).unwrap_or(score);
            }
        } else {
            if score < lowest_retained {
                continue;
            }
            let candidate = ScoredId { id, score };
            if let Some(mut worst) = heap.peek_mut() {
                if candidate < *worst {
                    *worst = candidate;
                }
            }
            lowest_retained = heap.peek().map(|worst| worst.score).unwrap_or(lowest_retained);
        }
    }

    Ok(heap.into_sorted_vec())
}

/// Selects the up to `how_many` best-scoring users, best first. Identical
/// mechanics; neighborhoods have no rescoring seam.
pub fn top_users<I, F>(how_many: usize, candidates: I, scorer: F) -> Result<Vec<ScoredId>>
where
    I: IntoIterator<Item = i64>,
    F: FnMut(i64) -> Result<f64>,
{
    top_items(how_many, candidates, None, scorer)
}
