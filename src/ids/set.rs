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
use crate::ids::{NULL, REMOVED};

/// A set of 64 bit ids backed by a double-hashed open-addressing table.
///
/// Far less memory than `HashSet<i64>` and no per-key boxing; iteration order
/// is table order, i.e. arbitrary.
#[derive(Clone, Debug)]
pub struct IdSet {
    keys: Vec<i64>,
    num_entries: usize,
    num_slots_used: usize,
}

impl IdSet {
    pub fn new() -> Self {
        IdSet::with_capacity(ids::DEFAULT_CAPACITY)
    }

    /// A set sized to hold `capacity` ids before the first rehash.
    pub fn with_capacity(capacity: usize) -> Self {
        let table_size = ids::table_size_for(capacity.max(ids::DEFAULT_CAPACITY));
        IdSet {
            keys: vec![NULL; table_size],
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

    pub fn contains(&self, key: i64) -> bool {
        !ids::is_sentinel(key) && self.locate(key).0.is_some()
    }

    /// Adds a key. Returns whether the key was newly inserted. Inserting one
    /// of the reserved sentinel values is an invalid argument.
    pub fn add(&mut self, key: i64) -> Result<bool> {
        ids::check_key(key)?;
        Ok(self.insert_valid(key))
    }

    /// Removes a key, returning whether it was present. The slot is left as a
    /// tombstone until the next rehash.
    pub fn remove(&mut self, key: i64) -> bool {
        if ids::is_sentinel(key) {
            return false;
        }
        match self.locate(key).0 {
            Some(index) => {
                self.keys[index] = REMOVED;
                self.num_entries -= 1;
                true
            }
            None => false,
        }
    }

    /// Adds every key of `other`. Returns whether this set changed.
    pub fn add_all(&mut self, other: &IdSet) -> bool {
        let mut changed = false;
        for key in other.iter() {
            changed |= self.insert_valid(key);
        }
        changed
    }

    /// Removes every key of `other`. Returns whether this set changed.
    pub fn remove_all(&mut self, other: &IdSet) -> bool {
        let mut changed = false;
        for key in other.iter() {
            changed |= self.remove(key);
        }
        changed
    }

    /// Keeps only keys also present in `other`. Returns whether this set
    /// changed.
    pub fn retain_all(&mut self, other: &IdSet) -> bool {
        let mut changed = false;
        for index in 0..self.keys.len() {
            let key = self.keys[index];
            if !ids::is_sentinel(key) && !other.contains(key) {
                self.keys[index] = REMOVED;
                self.num_entries -= 1;
                changed = true;
            }
        }
        changed
    }

    /// Number of keys present in both sets, counted without materializing the
    /// intersection. Walks the smaller set.
    pub fn intersection_size(&self, other: &IdSet) -> usize {
        let (smaller, larger) = if self.num_entries <= other.num_entries {
            (self, other)
        } else {
            (other, self)
        };
        smaller.iter().filter(|&key| larger.contains(key)).count()
    }

    /// Iterates over the live keys in table order.
    pub fn iter(&self) -> impl Iterator<Item = i64> + '_ {
        self.keys.iter().copied().filter(|&key| !ids::is_sentinel(key))
    }

    pub fn to_vec(&self) -> Vec<i64> {
        self.iter().collect()
    }

    pub fn clear(&mut self) {
        for slot in self.keys.iter_mut() {
            *slot = NULL;
        }
        self.num_entries = 0;
        self.num_slots_used = 0;
    }

    /// Finds `key` in the table. Returns the index holding the key (if
    /// present) and the slot where it would be inserted: the first tombstone
    /// seen on the probe walk, or the terminating empty slot.
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
        // Growth keeps at least a third of the slots empty, so the walk above
        // terminates at a NULL slot in practice; a fully probed table still
        // passed at least one tombstone.
        (None, first_removed.unwrap_or(index))
    }

    fn insert_valid(&mut self, key: i64) -> bool {
        let (found, slot) = self.locate(key);
        if found.is_some() {
            return false;
        }
        let was_empty = self.keys[slot] == NULL;
        self.keys[slot] = key;
        self.num_entries += 1;
        if was_empty {
            self.num_slots_used += 1;
            if self.num_slots_used as f64 * ids::LOAD_FACTOR >= self.keys.len() as f64 {
                self.grow_or_reclaim();
            }
        }
        true
    }

    /// Live entries dominating the used slots means the table is genuinely
    /// full and must grow; otherwise tombstones are the problem and a same
    /// size rehash reclaims them.
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
        self.num_entries = 0;
        self.num_slots_used = 0;
        for key in old_keys {
            if !ids::is_sentinel(key) {
                self.insert_valid(key);
            }
        }
    }
}

impl Default for IdSet {
    fn default() -> Self {
        IdSet::new()
    }
}

impl PartialEq for IdSet {
    fn eq(&self, other: &Self) -> bool {
        self.num_entries == other.num_entries && self.iter().all(|key| other.contains(key))
    }
}

impl Eq for IdSet {}

#[cfg(test)]
mod tests {

    use super::*;

    #[test]
    fn add_remove_contains() {
        let mut set = IdSet::new();

        assert!(set.add(1).unwrap());
        assert!(!set.add(1).unwrap());
        assert!(set.add(2).unwrap());

        assert!(set.contains(1));
        assert!(set.contains(2));
        assert!(!set.contains(3));
        assert_eq!(set.len(), 2);

        assert!(set.remove(1));
        assert!(!set.remove(1));
        assert!(!set.contains(1));
        assert_eq!(set.len(), 1);

        // A removed key can come back.
        assert!(set.add(1).unwrap());
        assert!(set.contains(1));
    }

    #[test]
    fn sentinel_keys_are_invalid() {
        let mut set = IdSet::new();
        assert!(set.add(i64::MIN).is_err());
        assert!(set.add(i64::MAX).is_err());
        assert!(!set.contains(i64::MIN));
        assert!(!set.remove(i64::MAX));
    }

    #[test]
    fn survives_repeated_growth() {
        // Sized for two entries; inserting 100 distinct keys forces several
        // grow/rehash cycles.
        let mut set = IdSet::with_capacity(2);
        for key in 0..100 {
            assert!(set.add(key).unwrap());
        }
        assert_eq!(set.len(), 100);
        for key in 0..100 {
            assert!(set.contains(key));
        }
        assert!(!set.contains(100));
    }

    #[test]
    fn size_is_live_count_under_churn() {
        let mut set = IdSet::with_capacity(2);
        for key in 0..50 {
            set.add(key).unwrap();
        }
        for key in 0..50 {
            if key % 2 == 0 {
                set.remove(key);
            }
        }
        for key in 50..80 {
            set.add(key).unwrap();
        }
        assert_eq!(set.len(), 25 + 30);
        for key in 0..50 {
            assert_eq!(set.contains(key), key % 2 != 0);
        }
    }

    #[test]
    fn tombstones_are_reclaimed() {
        let mut set = IdSet::with_capacity(4);
        // Churn the same table hard enough that insertions would exhaust it
        // if tombstones were never reclaimed.
        for round in 0..100_i64 {
            set.add(round).unwrap();
            set.remove(round);
        }
        assert!(set.is_empty());
        set.add(7).unwrap();
        assert!(set.contains(7));
    }

    #[test]
    fn to_vec_round_trip() {
        let mut set = IdSet::new();
        for key in [3, 1, 4, 1, 5, 9, 2, 6] {
            set.add(key).unwrap();
        }

        let mut copy = IdSet::new();
        for key in set.to_vec() {
            copy.add(key).unwrap();
        }
        assert_eq!(set, copy);
    }

    #[test]
    fn set_algebra() {
        let mut a = IdSet::new();
        let mut b = IdSet::new();
        for key in 0..10 {
            a.add(key).unwrap();
        }
        for key in 5..15 {
            b.add(key).unwrap();
        }

        assert_eq!(a.intersection_size(&b), 5);
        assert_eq!(b.intersection_size(&a), 5);

        let mut union = a.clone();
        assert!(union.add_all(&b));
        assert_eq!(union.len(), 15);
        assert!(!union.add_all(&b));

        let mut intersection = a.clone();
        assert!(intersection.retain_all(&b));
        assert_eq!(intersection.len(), 5);
        for key in 5..10 {
            assert!(intersection.contains(key));
        }

        let mut difference = a.clone();
        assert!(difference.remove_all(&b));
        assert_eq!(difference.len(), 5);
        for key in 0..5 {
            assert!(difference.contains(key));
        }
    }

    #[test]
    fn negative_keys() {
        let mut set = IdSet::new();
        assert!(set.add(-42).unwrap());
        assert!(set.contains(-42));
        assert!(set.remove(-42));
    }
}
