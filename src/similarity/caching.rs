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
use crate::model::DataModel;
use crate::refresh::{Refreshable, RefreshedComponents};
use crate::similarity::{ItemSimilarity, UserSimilarity};
use crate::types::{ItemId, UserId};

/// Memoizes another similarity per id pair. All metrics are symmetric, so
/// the pair is stored under its ordered form and NaN ("no opinion") is a
/// cacheable result like any other. Refreshing drops everything, since the
/// underlying model may have changed.
pub struct CachingSimilarity<S> {
    delegate: S,
    user_cache: Cache<(UserId, UserId), f64>,
    item_cache: Cache<(ItemId, ItemId), f64>,
}

impl<S> CachingSimilarity<S> {
    pub fn new(delegate: S) -> Self {
        CachingSimilarity {
            delegate,
            user_cache: Cache::new(),
            item_cache: Cache::new(),
        }
    }
}

fn ordered(a: i64, b: i64) -> (i64, i64) {
    if a <= b {
        (a, b)
    } else {
        (b, a)
    }
}

impl<S> UserSimilarity for CachingSimilarity<S>
where
    S: UserSimilarity,
{
    fn user_similarity(&self, model: &DataModel, user_a: UserId, user_b: UserId) -> f64 {
        let key = ordered(user_a, user_b);
        self.user_cache
            .get(&key, || Ok(self.delegate.user_similarity(model, user_a, user_b)))
            .unwrap_or(f64::NAN)
    }
}

impl<S> ItemSimilarity for CachingSimilarity<S>
where
    S: ItemSimilarity,
{
    fn item_similarity(&self, model: &DataModel, item_a: ItemId, item_b: ItemId) -> f64 {
        let key = ordered(item_a, item_b);
        self.item_cache
            .get(&key, || Ok(self.delegate.item_similarity(model, item_a, item_b)))
            .unwrap_or(f64::NAN)
    }
}

impl<S> Refreshable for CachingSimilarity<S>
where
    S: Send + Sync,
{
    fn refresh(&self, _already_refreshed: &mut RefreshedComponents) {
        self.user_cache.clear();
        self.item_cache.clear();
    }
}
