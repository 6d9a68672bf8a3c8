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

use crate::cache::Cache;
use crate::error::Result;
use crate::model::DataModel;
use crate::neighborhood::UserNeighborhood;
use crate::refresh::{Refreshable, RefreshedComponents};
use crate::types::UserId;

/// Memoizes any neighborhood policy per user. Refreshing forgets everything
/// and forwards to the wrapped policy.
pub struct CachingUserNeighborhood<N> {
    delegate: N,
    cache: Cache<UserId, Vec<UserId>>,
}

impl<N> CachingUserNeighborhood<N> {
    pub fn new(delegate: N) -> Self {
        CachingUserNeighborhood { delegate, cache: Cache::new() }
    }
}

impl<N> UserNeighborhood for CachingUserNeighborhood<N>
where
    N: UserNeighborhood,
{
    fn user_neighborhood(&self, model: &DataModel, user_id: UserId) -> Result<Vec<UserId>> {
        self.cache.get(&user_id, || self.delegate.user_neighborhood(model, user_id))
    }
}

impl<N> Refreshable for CachingUserNeighborhood<N>
where
    N: Send + Sync + Refreshable,
{
    fn refresh(&self, already_refreshed: &mut RefreshedComponents) {
        self.cache.clear();
        self.delegate.refresh(already_refreshed);
    }
}
