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

//! Single-pass sampling over id streams. Both samplers are stateful and not
//! restartable; create a fresh instance per scan.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::error::{CfError, Result};

/// Passes each id of the underlying iterator with probability `rate`, by
/// drawing geometrically distributed skip lengths instead of flipping a coin
/// per element.
pub struct SamplingIdIterator<I> {
    inner: I,
    rate: f64,
    rng: StdRng,
}

impl<I> SamplingIdIterator<I>
where
    I: Iterator<Item = i64>,
{
    pub fn new(inner: I, rate: f64) -> Result<Self> {
        Self::with_rng(inner, rate, StdRng::from_entropy())
    }

    /// Deterministic variant for reproducible scans.
    pub fn with_seed(inner: I, rate: f64, seed: u64) -> Result<Self> {
        Self::with_rng(inner, rate, StdRng::seed_from_u64(seed))
    }

    fn with_rng(inner: I, rate: f64, rng: StdRng) -> Result<Self> {
        check_rate(rate)?;
        Ok(SamplingIdIterator { inner, rate, rng })
    }
}

impl<I> Iterator for SamplingIdIterator<I>
where
    I: Iterator<Item = i64>,
{
    type Item = i64;

    fn next(&mut self) -> Option<i64> {
        if self.rate >= 1.0 {
            return self.inner.next();
        }
        // Number of rejected elements before the next accepted one, inverted
        // from a uniform draw. `1 - u` stays clear of ln(0).
        let u: f64 = self.rng.gen();
        let skip = ((1.0 - u).ln() / (1.0 - self.rate).ln()).floor() as usize;
        self.inner.nth(skip)
    }
}

pub fn check_rate(rate: f64) -> Result<()> {
    if !(rate > 0.0 && rate <= 1.0) {
        return Err(CfError::InvalidArgument(format!(
            "sampling rate must be in (0, 1], got {}", rate,
        )));
    }
    Ok(())
}

/// Uniform sample without replacement of up to `sample_size` ids, single
/// pass, using reservoir replacement.
pub fn reservoir_sample<I>(ids: I, sample_size: usize, rng: &mut StdRng) -> Vec<i64>
where
    I: IntoIterator<Item = i64>,
{
    if sample_size == 0 {
        return Vec::new();
    }
    let mut reservoir = Vec::with_capacity(sample_size);
    for (count, id) in ids.into_iter().enumerate() {
        if reservoir.len() < sample_size {
            reservoir.push(id);
        } else {
            let slot = rng.gen_range(0..=count);
            if slot < sample_size {
                reservoir[slot] = id;
            }
        }
    }
    reservoir
}
