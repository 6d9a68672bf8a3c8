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

use crate::error::Result;
use crate::ids;
use crate::ids::{IdSet, NULL, REMOVED};

/// A map from 64 bit ids to values, using the same double-hashed
/// open-addressing table as `IdSet`. Values live in a parallel array aligned
/// with the key slots.
#[derive(Clone, Debug)]
pub struct IdMap<V> {
    keys: Vec<i64>,
    values: Vec<Option<V>>,
    num_entries: usize,
    num_slots_used: usize,
}

impl<V> IdMap<V> {
    pub fn new() -> Self {
        IdMap::with_capacity(ids::DEFAULT_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let table_size = ids::table_size_for(capacity.max(ids::DEFAULT_CAPACITY));
        let mut values = Vec::with_capacity(table_size);
        values.resize_with(table_size, || None);
        IdMap {
            keys: vec![NULL; table_size],
            values,
            num_entries: 0,
            num_slots_used: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.num_entries
    }

    pub fn is_empty(&self) -> bool {
        self.num_entries == 0
    }

    pub fn contains_key(&self, key: i64) -> bool {
        !ids::is_sentinel(key) && self.locate(key).0.is_some()
    }

    pub fn get(&self, key: i64) -> Option<&V> {
        if ids::is_sentinel(key) {
            return None;
        }
        self.locate(key).0.and_then(move |index| self.values[index].as_ref())
    }

    pub fn get_mut(&mut self, key: i64) -> Option<&mut V> {
        if ids::is_sentinel(key) {
            return None;
        }
        match self.locate(key).0 {
            Some(index) => self.values[index].as_mut(),
            None => None,
        }
    }

    /// Inserts or replaces the value for a key, returning the previous value
    /// if there was one. Sentinel keys are an invalid argument.
    pub fn put(&mut self, key: i64, value: V) -> Result<Option<V>> {
        ids::check_key(key)?;
        Ok(self.insert_valid(key, value))
    }

    pub fn remove(&mut self, key: i64) -> Option<V> {
        if ids::is_sentinel(key) {
            return None;
        }
        match self.locate(key).0 {
            Some(index) => {
                self.keys[index] = REMOVED;
                self.num_entries -= 1;
                self.values[index].take()
            }
            None => None,
        }
    }

    /// Keeps only entries whose key is in `keys`, preserving the values of
    /// the survivors. Returns whether the map changed.
    pub fn retain_all(&mut self, keys: &IdSet) -> bool {
        let mut changed = false;
        for index in 0..self.keys.len() {
            let key = self.keys[index];
            if !ids::is_sentinel(key) && !keys.contains(key) {
                self.keys[index] = REMOVED;
                self.values[index] = None;
                self.num_entries -= 1;
                changed = true;
            }
        }
        changed
    }

    /// Removes every entry whose key is in `keys`. Returns whether the map
    /// changed.
    pub fn remove_all(&mut self, keys: &IdSet) -> bool {
        let mut changed = false;
        for key in keys.iter() {
            changed |= self.remove(key).is_some();
        }
        changed
    }

    /// Iterates over (key, value) entries in table order.
    pub fn iter(&self) -> impl Iterator<Item = (i64, &V)> + '_ {
        self.keys
            .iter()
            .zip(self.values.iter())
            .filter(|(key, _)| !ids::is_sentinel(**key))
            .map(|(key, value)| match value {
                Some(v) => (*key, v),
                // A live key always has a value; the arms are split only to
                // keep the invariant visible.
                None => unreachable!("live key without value"),
            })
    }

    pub fn keys(&self) -> impl Iterator<Item = i64> + '_ {
        self.keys.iter().copied().filter(|&key| !ids::is_sentinel(key))
    }

    pub fn values(&self) -> impl Iterator<Item = &V> + '_ {
        self.iter().map(|(_, value)| value)
    }

    pub fn keys_vec(&self) -> Vec<i64> {
        self.keys().collect()
    }

    pub fn key_set(&self) -> IdSet {
        let mut set = IdSet::with_capacity(self.num_entries);
        for key in self.keys() {
            // Keys in the table already passed sentinel validation.
            let _ = set.add(key);
        }
        set
    }

    pub fn clear(&mut self) {
        for slot in self.keys.iter_mut() {
            *slot = NULL;
        }
        for value in self.values.iter_mut() {
            *value = None;
        }
        self.num_entries = 0;
        self.num_slots_used = 0;
    }

    fn locate(&self, key: i64) -> (Option<usize>, usize) {
        let table_size = self.keys.len();
        let hash = ids::hash_of(key);
        let jump = ids::jump_of(hash, table_size);
        let mut index = ids::slot_of(hash, table_size);
        let mut first_removed = None;

        for _ in 0..table_size {
            match self.keys[index] {
                NULL => return (None, first_removed.unwrap_or(index)),
                REMOVED => {
                    if first_removed.is_none() {
                        first_removed = Some(index);
                    }
                }
                k if k == key => return (Some(index), index),
                _ => {}
            }
            index = (index + jump) % table_size;
        }
        (None, first_removed.unwrap_or(index))
    }

    fn insert_valid(&mut self, key: i64, value: V) -> Option<V> {
        let (found, slot) = self.locate(key);
        if let Some(index) = found {
            return self.values[index].replace(value);
        }
        let was_empty = self.keys[slot] == NULL;
        self.keys[slot] = key;
        self.values[slot] = Some(value);
        self.num_entries += 1;
        if was_empty {
            self.num_slots_used += 1;
            if self.num_slots_used as f64 * ids::LOAD_FACTOR >= self.keys.len() as f64 {
                self.grow_or_reclaim();
            }
        }
        None
    }

    fn grow_or_reclaim(&mut self) {
        if self.num_entries as f64 * ids::LOAD_FACTOR >= self.num_slots_used as f64 {
            let new_size =
                ids::next_twin_prime((ids::LOAD_FACTOR * (self.keys.len() * 2) as f64) as usize);
            self.rehash(new_size);
        } else {
            self.rehash(self.keys.len());
        }
    }

    fn rehash(&mut self, new_size: usize) {
        let old_keys = std::mem::replace(&mut self.keys, vec![NULL; new_size]);
        let mut old_values = std::mem::take(&mut self.values);
        self.values.resize_with(new_size, || None);
        self.num_entries = 0;
        self.num_slots_used = 0;
        for (index, key) in old_keys.into_iter().enumerate() {
            if !ids::is_sentinel(key) {
                if let Some(value) = old_values[index].take() {
                    self.insert_valid(key, value);
                }
            }
        }
    }
}

impl<V> Default for IdMap<V> {
    fn default() -> Self {
        IdMap::new()
    }
}
