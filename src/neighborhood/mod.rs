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

//! Selection of the users whose opinions inform recommendations for a target
//! user: either the N most similar users, or everyone above a similarity
//! cutoff. Both policies can scan a geometric sample of the population
//! instead of all of it to bound cost on large models.

mod caching;
mod nearest_n;
mod threshold;

pub use self::caching::CachingUserNeighborhood;
pub use self::nearest_n::NearestNUserNeighborhood;
pub use self::threshold::ThresholdUserNeighborhood;

use crate::error::Result;
use crate::model::DataModel;
use crate::sampling::SamplingIdIterator;
use crate::types::UserId;

/// Answers which other users are close enough to a target user to matter.
pub trait UserNeighborhood: Send + Sync {
    /// The neighbors of `user_id`, most similar first where the policy
    /// defines an order.
    fn user_neighborhood(&self, model: &DataModel, user_id: UserId) -> Result<Vec<UserId>>;
}

/// All other users, geometrically sampled when `sampling_rate < 1`. A fresh
/// sampling iterator per call; the samplers are single-pass.
pub(crate) fn candidate_user_ids<'a>(
    model: &'a DataModel,
    user_id: UserId,
    sampling_rate: f64,
) -> Result<Box<dyn Iterator<Item = i64> + 'a>> {
    let others = model.user_ids().iter().copied().filter(move |&other| other != user_id);
    if sampling_rate >= 1.0 {
        Ok(Box::new(others))
    } else {
        Ok(Box::new(SamplingIdIterator::new(others, sampling_rate)?))
    }
}
