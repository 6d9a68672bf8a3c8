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

use std::cmp::Ordering;

use crate::error::{CfError, Result};
use crate::types::Preference;

/// Which id all preferences in an array share.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dimension {
    User,
    Item,
}

/// An ordered run of preferences sharing one fixed dimension: all by the same
/// user, or all for the same item. Stored as parallel arrays instead of boxed
/// `Preference` values; a boolean-feedback array drops the value array
/// entirely and reports 1.0 for every entry.
///
/// Invariant: `other_ids` holds no duplicates, so the array length equals the
/// number of distinct (user, item) pairs it represents.
#[derive(Debug, Clone)]
pub struct PreferenceArray {
    dimension: Dimension,
    fixed_id: i64,
    other_ids: Vec<i64>,
    values: Option<Vec<f32>>,
}

impl PreferenceArray {
    /// An array of valued preferences by one user.
    pub fn for_user(user_id: i64, capacity: usize) -> Self {
        PreferenceArray {
            dimension: Dimension::User,
            fixed_id: user_id,
            other_ids: Vec::with_capacity(capacity),
            values: Some(Vec::with_capacity(capacity)),
        }
    }

    /// An array of valued preferences for one item.
    pub fn for_item(item_id: i64, capacity: usize) -> Self {
        PreferenceArray {
            dimension: Dimension::Item,
            fixed_id: item_id,
            other_ids: Vec::with_capacity(capacity),
            values: Some(Vec::with_capacity(capacity)),
        }
    }

    /// A boolean-feedback array: every preference has value 1.0 and value
    /// writes are rejected.
    pub fn boolean(dimension: Dimension, fixed_id: i64, capacity: usize) -> Self {
        PreferenceArray {
            dimension,
            fixed_id,
            other_ids: Vec::with_capacity(capacity),
            values: None,
        }
    }

    pub fn dimension(&self) -> Dimension {
        self.dimension
    }

    pub fn fixed_id(&self) -> i64 {
        self.fixed_id
    }

    pub fn len(&self) -> usize {
        self.other_ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.other_ids.is_empty()
    }

    pub fn has_values(&self) -> bool {
        self.values.is_some()
    }

    pub fn user_id(&self, index: usize) -> i64 {
        match self.dimension {
            Dimension::User => self.fixed_id,
            Dimension::Item => self.other_ids[index],
        }
    }

    pub fn item_id(&self, index: usize) -> i64 {
        match self.dimension {
            Dimension::User => self.other_ids[index],
            Dimension::Item => self.fixed_id,
        }
    }

    /// The non-fixed id at `index`.
    pub fn other_id(&self, index: usize) -> i64 {
        self.other_ids[index]
    }

    pub fn value(&self, index: usize) -> f32 {
        match &self.values {
            Some(values) => values[index],
            None => 1.0,
        }
    }

    /// Overwrites the value at `index`. Boolean arrays reject this.
    pub fn set_value(&mut self, index: usize, value: f32) -> Result<()> {
        match &mut self.values {
            Some(values) => {
                values[index] = value;
                Ok(())
            }
            None => Err(CfError::Unsupported(
                "boolean preference arrays have no mutable values",
            )),
        }
    }

    /// Appends a preference without keeping the array ordered. Used during
    /// bulk construction; callers re-sort afterwards.
    pub fn push(&mut self, other_id: i64, value: f32) {
        self.other_ids.push(other_id);
        if let Some(values) = &mut self.values {
            values.push(value);
        }
    }

    /// Index of the preference for `other_id`, assuming the array is sorted
    /// by the non-fixed id (the resting order inside a data model).
    pub fn find(&self, other_id: i64) -> Option<usize> {
        self.other_ids.binary_search(&other_id).ok()
    }

    /// Inserts a preference keeping the sorted-by-other-id order. Returns
    /// false if the pair already exists (the value is left untouched).
    pub fn insert_sorted(&mut self, other_id: i64, value: f32) -> bool {
        match self.other_ids.binary_search(&other_id) {
            Ok(_) => false,
            Err(position) => {
                self.other_ids.insert(position, other_id);
                if let Some(values) = &mut self.values {
                    values.insert(position, value);
                }
                true
            }
        }
    }

    pub fn remove_at(&mut self, index: usize) {
        self.other_ids.remove(index);
        if let Some(values) = &mut self.values {
            values.remove(index);
        }
    }

    /// Sorts in place by ascending user id. A no-op for arrays whose fixed
    /// dimension is the user.
    pub fn sort_by_user(&mut self) {
        if self.dimension == Dimension::Item {
            self.sort_by_other_id();
        }
    }

    /// Sorts in place by ascending item id. A no-op for arrays whose fixed
    /// dimension is the item.
    pub fn sort_by_item(&mut self) {
        if self.dimension == Dimension::User {
            self.sort_by_other_id();
        }
    }

    pub(crate) fn sort_by_other_id(&mut self) {
        self.sort_pairs(|a, b| a.0.cmp(&b.0));
    }

    pub fn sort_by_value(&mut self) {
        self.sort_pairs(|a, b| a.1.partial_cmp(&b.1).unwrap_or(Ordering::Equal));
    }

    pub fn sort_by_value_reversed(&mut self) {
        self.sort_pairs(|a, b| b.1.partial_cmp(&a.1).unwrap_or(Ordering::Equal));
    }

    fn sort_pairs<F>(&mut self, compare: F)
    where
        F: Fn(&(i64, f32), &(i64, f32)) -> Ordering,
    {
        match &mut self.values {
            Some(values) => {
                let mut pairs: Vec<(i64, f32)> =
                    self.other_ids.iter().copied().zip(values.iter().copied()).collect();
                pairs.sort_by(compare);
                for (index, (id, value)) in pairs.into_iter().enumerate() {
                    self.other_ids[index] = id;
                    values[index] = value;
                }
            }
            // All values are 1.0; only id sorts can change anything.
            None => self.other_ids.sort_unstable(),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = Preference> + '_ {
        (0..self.len()).map(move |index| {
            Preference::new(self.user_id(index), self.item_id(index), self.value(index))
        })
    }
}
