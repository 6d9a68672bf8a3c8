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

//! The preference data model: one set of (user, item, value) observations
//! projected two ways, by user and by item. Both projections are kept
//! mutually consistent under incremental mutation, and every preference
//! array rests sorted by its non-fixed id so lookups can binary search and
//! similarity walks can merge-join.

mod array;
pub mod file;

pub use self::array::{Dimension, PreferenceArray};
pub use self::file::FileDataModel;

use std::sync::{Arc, RwLock};

use fnv::FnvHashMap;

use crate::error::{CfError, Result};
use crate::ids::{self, IdMap, IdSet};
use crate::types::{ItemId, UserId};

/// How components share a model: one writer at a time, any number of
/// concurrent readers, and refresh swaps the contents wholesale under the
/// write lock.
pub type SharedModel = Arc<RwLock<DataModel>>;

pub fn shared(model: DataModel) -> SharedModel {
    Arc::new(RwLock::new(model))
}

#[derive(Debug)]
pub struct DataModel {
    by_user: IdMap<PreferenceArray>,
    by_item: IdMap<PreferenceArray>,
    user_ids: Vec<UserId>,
    item_ids: Vec<ItemId>,
    has_values: bool,
    min_preference: f32,
    max_preference: f32,
    num_preferences: usize,
}

impl DataModel {
    /// Builds a model from a bulk load of (user, item, value) records.
    /// Duplicate pairs keep the last value seen.
    pub fn from_preferences<I>(preferences: I) -> Result<Self>
    where
        I: IntoIterator<Item = (UserId, ItemId, f32)>,
    {
        let mut per_user: FnvHashMap<i64, FnvHashMap<i64, f32>> = FnvHashMap::default();
        for (user_id, item_id, value) in preferences {
            ids::check_key(user_id)?;
            ids::check_key(item_id)?;
            if value.is_nan() {
                return Err(CfError::InvalidArgument(format!(
                    "NaN preference value for user {} and item {}", user_id, item_id,
                )));
            }
            per_user.entry(user_id).or_default().insert(item_id, value);
        }
        Self::build(per_user, true)
    }

    /// Bulk load variant for records carrying an optional timestamp. The
    /// model does not index time; timestamps are discarded.
    pub fn from_timestamped_preferences<I>(preferences: I) -> Result<Self>
    where
        I: IntoIterator<Item = (UserId, ItemId, f32, Option<i64>)>,
    {
        Self::from_preferences(
            preferences.into_iter().map(|(user_id, item_id, value, _)| (user_id, item_id, value)),
        )
    }

    /// Builds a boolean-feedback model: observations carry no strength, every
    /// preference reports value 1.0 and min/max are NaN.
    pub fn from_boolean_preferences<I>(preferences: I) -> Result<Self>
    where
        I: IntoIterator<Item = (UserId, ItemId)>,
    {
        let mut per_user: FnvHashMap<i64, FnvHashMap<i64, f32>> = FnvHashMap::default();
        for (user_id, item_id) in preferences {
            ids::check_key(user_id)?;
            ids::check_key(item_id)?;
            per_user.entry(user_id).or_default().insert(item_id, 1.0);
        }
        Self::build(per_user, false)
    }

    fn build(per_user: FnvHashMap<i64, FnvHashMap<i64, f32>>, has_values: bool) -> Result<Self> {
        let mut by_user = IdMap::with_capacity(per_user.len());
        let mut per_item_counts: FnvHashMap<i64, usize> = FnvHashMap::default();
        let mut min_preference = f32::NAN;
        let mut max_preference = f32::NAN;
        let mut num_preferences = 0;

        for (&user_id, items) in per_user.iter() {
            let mut array = if has_values {
                PreferenceArray::for_user(user_id, items.len())
            } else {
                PreferenceArray::boolean(Dimension::User, user_id, items.len())
            };
            for (&item_id, &value) in items.iter() {
                array.push(item_id, value);
                *per_item_counts.entry(item_id).or_insert(0) += 1;
                num_preferences += 1;
                if has_values {
                    min_preference = nan_min(min_preference, value);
                    max_preference = nan_max(max_preference, value);
                }
            }
            array.sort_by_item();
            by_user.put(user_id, array)?;
        }

        let mut by_item = IdMap::with_capacity(per_item_counts.len());
        for (&item_id, &count) in per_item_counts.iter() {
            let array = if has_values {
                PreferenceArray::for_item(item_id, count)
            } else {
                PreferenceArray::boolean(Dimension::Item, item_id, count)
            };
            by_item.put(item_id, array)?;
        }
        for (user_id, items) in per_user.into_iter() {
            for (item_id, value) in items.into_iter() {
                if let Some(array) = by_item.get_mut(item_id) {
                    array.push(user_id, value);
                }
            }
        }
        for item_id in by_item.keys_vec() {
            if let Some(array) = by_item.get_mut(item_id) {
                array.sort_by_user();
            }
        }

        let mut user_ids = by_user.keys_vec();
        user_ids.sort_unstable();
        let mut item_ids = by_item.keys_vec();
        item_ids.sort_unstable();

        Ok(DataModel {
            by_user,
            by_item,
            user_ids,
            item_ids,
            has_values,
            min_preference,
            max_preference,
            num_preferences,
        })
    }

    /// All user ids, ascending.
    pub fn user_ids(&self) -> &[UserId] {
        &self.user_ids
    }

    /// All item ids, ascending.
    pub fn item_ids(&self) -> &[ItemId] {
        &self.item_ids
    }

    pub fn num_users(&self) -> usize {
        self.user_ids.len()
    }

    pub fn num_items(&self) -> usize {
        self.item_ids.len()
    }

    pub fn num_preferences(&self) -> usize {
        self.num_preferences
    }

    pub fn contains_user(&self, user_id: UserId) -> bool {
        self.by_user.contains_key(user_id)
    }

    pub fn contains_item(&self, item_id: ItemId) -> bool {
        self.by_item.contains_key(item_id)
    }

    /// The user's preferences, sorted by item id.
    pub fn preferences_from_user(&self, user_id: UserId) -> Result<&PreferenceArray> {
        self.by_user.get(user_id).ok_or(CfError::NoSuchUser(user_id))
    }

    /// The item's preferences, sorted by user id.
    pub fn preferences_for_item(&self, item_id: ItemId) -> Result<&PreferenceArray> {
        self.by_item.get(item_id).ok_or(CfError::NoSuchItem(item_id))
    }

    pub fn item_ids_from_user(&self, user_id: UserId) -> Result<IdSet> {
        let array = self.preferences_from_user(user_id)?;
        let mut items = IdSet::with_capacity(array.len());
        for index in 0..array.len() {
            items.add(array.other_id(index))?;
        }
        Ok(items)
    }

    pub fn user_ids_for_item(&self, item_id: ItemId) -> Result<IdSet> {
        let array = self.preferences_for_item(item_id)?;
        let mut users = IdSet::with_capacity(array.len());
        for index in 0..array.len() {
            users.add(array.other_id(index))?;
        }
        Ok(users)
    }

    /// The value the user assigned to the item, or None if the pair is
    /// unobserved. An unknown user is an error.
    pub fn preference_value(&self, user_id: UserId, item_id: ItemId) -> Result<Option<f32>> {
        let array = self.preferences_from_user(user_id)?;
        Ok(array.find(item_id).map(|index| array.value(index)))
    }

    pub fn num_users_with_preference_for(&self, item_id: ItemId) -> Result<usize> {
        Ok(self.preferences_for_item(item_id)?.len())
    }

    /// Users who expressed a preference for both items, counted by merging
    /// the two sorted arrays.
    pub fn num_users_with_preference_for_both(
        &self,
        item_a: ItemId,
        item_b: ItemId,
    ) -> Result<usize> {
        let xs = self.preferences_for_item(item_a)?;
        let ys = self.preferences_for_item(item_b)?;
        let mut count = 0;
        let (mut i, mut j) = (0, 0);
        while i < xs.len() && j < ys.len() {
            match xs.other_id(i).cmp(&ys.other_id(j)) {
                std::cmp::Ordering::Less => i += 1,
                std::cmp::Ordering::Greater => j += 1,
                std::cmp::Ordering::Equal => {
                    count += 1;
                    i += 1;
                    j += 1;
                }
            }
        }
        Ok(count)
    }

    pub fn has_preference_values(&self) -> bool {
        self.has_values
    }

    /// Smallest preference value observed, NaN for boolean models.
    pub fn min_preference(&self) -> f32 {
        self.min_preference
    }

    /// Largest preference value observed, NaN for boolean models.
    pub fn max_preference(&self) -> f32 {
        self.max_preference
    }

    /// Inserts or updates a preference, keeping both projections consistent.
    /// A NaN value is invalid; boolean models accept only new observations
    /// with the implicit value 1.0.
    pub fn set_preference(&mut self, user_id: UserId, item_id: ItemId, value: f32) -> Result<()> {
        ids::check_key(user_id)?;
        ids::check_key(item_id)?;
        if value.is_nan() {
            return Err(CfError::InvalidArgument(format!(
                "NaN preference value for user {} and item {}", user_id, item_id,
            )));
        }
        if !self.has_values && (value - 1.0).abs() > f32::EPSILON {
            return Err(CfError::Unsupported(
                "boolean preference arrays have no mutable values",
            ));
        }

        let mut inserted = false;
        match self.by_user.get_mut(user_id) {
            Some(array) => match array.find(item_id) {
                Some(index) => array.set_value(index, value)?,
                None => {
                    array.insert_sorted(item_id, value);
                    inserted = true;
                }
            },
            None => {
                let mut array = if self.has_values {
                    PreferenceArray::for_user(user_id, 1)
                } else {
                    PreferenceArray::boolean(Dimension::User, user_id, 1)
                };
                array.push(item_id, value);
                self.by_user.put(user_id, array)?;
                sorted_insert(&mut self.user_ids, user_id);
                inserted = true;
            }
        }

        match self.by_item.get_mut(item_id) {
            Some(array) => match array.find(user_id) {
                Some(index) => array.set_value(index, value)?,
                None => {
                    array.insert_sorted(user_id, value);
                }
            },
            None => {
                let mut array = if self.has_values {
                    PreferenceArray::for_item(item_id, 1)
                } else {
                    PreferenceArray::boolean(Dimension::Item, item_id, 1)
                };
                array.push(user_id, value);
                self.by_item.put(item_id, array)?;
                sorted_insert(&mut self.item_ids, item_id);
            }
        }

        if inserted {
            self.num_preferences += 1;
        }
        if self.has_values {
            // The known range only ever widens; removals do not narrow it.
            self.min_preference = nan_min(self.min_preference, value);
            self.max_preference = nan_max(self.max_preference, value);
        }
        Ok(())
    }

    /// Removes a preference from both projections. Removing the last
    /// preference of a user (or for an item) drops the id entirely. An
    /// unobserved pair between known ids is a no-op.
    pub fn remove_preference(&mut self, user_id: UserId, item_id: ItemId) -> Result<()> {
        if !self.contains_user(user_id) {
            return Err(CfError::NoSuchUser(user_id));
        }
        if !self.contains_item(item_id) {
            return Err(CfError::NoSuchItem(item_id));
        }

        let mut removed = false;
        if let Some(array) = self.by_user.get_mut(user_id) {
            if let Some(index) = array.find(item_id) {
                array.remove_at(index);
                removed = true;
            }
            if array.is_empty() {
                self.by_user.remove(user_id);
                sorted_remove(&mut self.user_ids, user_id);
            }
        }
        if !removed {
            return Ok(());
        }

        if let Some(array) = self.by_item.get_mut(item_id) {
            if let Some(index) = array.find(user_id) {
                array.remove_at(index);
            }
            if array.is_empty() {
                self.by_item.remove(item_id);
                sorted_remove(&mut self.item_ids, item_id);
            }
        }
        self.num_preferences -= 1;
        Ok(())
    }
}

fn sorted_insert(ids: &mut Vec<i64>, id: i64) {
    if let Err(position) = ids.binary_search(&id) {
        ids.insert(position, id);
    }
}

fn sorted_remove(ids: &mut Vec<i64>, id: i64) {
    if let Ok(position) = ids.binary_search(&id) {
        ids.remove(position);
    }
}

fn nan_min(current: f32, value: f32) -> f32 {
    if current.is_nan() || value < current {
        value
    } else {
        current
    }
}

fn nan_max(current: f32, value: f32) -> f32 {
    if current.is_nan() || value > current {
        value
    } else {
        current
    }
}

/// Collects the distinct items preferred by any user in `user_ids`,
/// optionally skipping everything `except` already contains.
pub(crate) fn items_preferred_by_any(
    model: &DataModel,
    user_ids: &[UserId],
    except: Option<&IdSet>,
) -> Result<IdSet> {
    let mut items = IdSet::new();
    for &user_id in user_ids {
        let array = match model.preferences_from_user(user_id) {
            Ok(array) => array,
            // A neighbor can disappear between selection and use.
            Err(CfError::NoSuchUser(_)) => continue,
            Err(other) => return Err(other),
        };
        for index in 0..array.len() {
            let item_id = array.other_id(index);
            if except.map_or(true, |set| !set.contains(item_id)) {
                items.add(item_id)?;
            }
        }
    }
    Ok(items)
}
