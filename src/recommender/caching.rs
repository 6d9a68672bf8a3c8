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

use std::sync::{Arc, Mutex};

use crate::error::Result;
use crate::recommender::Recommender;
use crate::refresh::{Refreshable, RefreshHelper, RefreshedComponents};
use crate::topk::Rescorer;
use crate::types::{ItemId, RecommendedItem, UserId};

#[derive(Clone)]
struct CachedRecommendations {
    how_many: usize,
    items: Vec<RecommendedItem>,
}

/// Memoizes another recommender's answers.
///
/// Recommendation lists are cached per user and reused for any request of
/// the same or smaller size; estimates are cached per (user, item) pair,
/// NaN included. Writing or removing a preference invalidates exactly the
/// affected user. The recommendation cache is also tied to the caller's
/// rescorer: rescorers are compared by identity (as the original system
/// compared them by reference), so presenting a different rescorer flushes
/// the recommendation lists.
pub struct CachingRecommender {
    delegate: Arc<dyn Recommender>,
    recommendations: crate::cache::Cache<UserId, CachedRecommendations>,
    estimates: crate::cache::Cache<(UserId, ItemId), f32>,
    current_rescorer: Mutex<Option<usize>>,
    refresh_helper: RefreshHelper,
}

impl CachingRecommender {
    pub fn new<R>(delegate: Arc<R>) -> Self
    where
        R: Recommender + 'static,
    {
        let refresh_helper =
            RefreshHelper::new(vec![Arc::clone(&delegate) as Arc<dyn Refreshable>]);
        CachingRecommender {
            delegate,
            recommendations: crate::cache::Cache::new(),
            estimates: crate::cache::Cache::new(),
            current_rescorer: Mutex::new(None),
            refresh_helper,
        }
    }

    fn note_rescorer(&self, rescorer: Option<&dyn Rescorer>) {
        let tag = rescorer.map(|r| (r as *const dyn Rescorer).cast::<()>() as usize);
        let mut current = self.current_rescorer.lock().unwrap();
        if *current != tag {
            self.recommendations.clear();
            *current = tag;
        }
    }

    fn invalidate_user(&self, user_id: UserId) {
        self.recommendations.remove(&user_id);
        self.estimates.remove_matching(|key, _| key.0 == user_id);
    }
}

impl Recommender for CachingRecommender {
    fn recommend_with(
        &self,
        user_id: UserId,
        how_many: usize,
        rescorer: Option<&dyn Rescorer>,
    ) -> Result<Vec<RecommendedItem>> {
        self.note_rescorer(rescorer);

        if let Some(cached) = self.recommendations.get_if_present(&user_id) {
            if cached.how_many >= how_many {
                let mut items = cached.items;
                items.truncate(how_many);
                return Ok(items);
            }
            // The cached list is shorter than what is asked now; recompute.
            self.recommendations.remove(&user_id);
        }

        let items = self.delegate.recommend_with(user_id, how_many, rescorer)?;
        let to_cache = CachedRecommendations { how_many, items: items.clone() };
        self.recommendations.get(&user_id, || Ok(to_cache))?;
        Ok(items)
    }

    fn estimate_preference(&self, user_id: UserId, item_id: ItemId) -> Result<f32> {
        self.estimates.get(&(user_id, item_id), || {
            self.delegate.estimate_preference(user_id, item_id)
        })
    }

    fn set_preference(&self, user_id: UserId, item_id: ItemId, value: f32) -> Result<()> {
        self.delegate.set_preference(user_id, item_id, value)?;
        self.invalidate_user(user_id);
        Ok(())
    }

    fn remove_preference(&self, user_id: UserId, item_id: ItemId) -> Result<()> {
        self.delegate.remove_preference(user_id, item_id)?;
        self.invalidate_user(user_id);
        Ok(())
    }
}

impl Refreshable for CachingRecommender {
    fn refresh(&self, already_refreshed: &mut RefreshedComponents) {
        self.refresh_helper.refresh(already_refreshed, || {
            self.recommendations.clear();
            self.estimates.clear();
        });
    }
}
