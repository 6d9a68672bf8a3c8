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

use std::hash::Hash;
use std::sync::Mutex;

use fnv::FnvHashMap;

use crate::error::Result;

/// Memoizes the results of a pure retrieval function per key.
///
/// Reads and writes hold a mutex only for the map operation itself; the
/// retrieval of a missing value runs outside the lock, so a slow computation
/// for one key never blocks hits on other keys. Two callers racing on the
/// same missing key may both compute; the first insert wins, and since
/// retrieval is pure both see the same value.
pub struct Cache<K, V> {
    map: Mutex<FnvHashMap<K, V>>,
}

impl<K, V> Cache<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    pub fn new() -> Self {
        Cache { map: Mutex::new(FnvHashMap::default()) }
    }

    /// The cached value for `key`, computing and caching it via `retriever`
    /// on a miss.
    pub fn get<F>(&self, key: &K, retriever: F) -> Result<V>
    where
        F: FnOnce() -> Result<V>,
    {
        if let Some(value) = self.map.lock().unwrap().get(key) {
            return Ok(value.clone());
        }
        let value = retriever()?;
        let mut map = self.map.lock().unwrap();
        let stored = map.entry(key.clone()).or_insert(value);
        Ok(stored.clone())
    }

    /// The cached value for `key` if present; never computes.
    pub fn get_if_present(&self, key: &K) -> Option<V> {
        self.map.lock().unwrap().get(key).cloned()
    }

    pub fn remove(&self, key: &K) -> Option<V> {
        self.map.lock().unwrap().remove(key)
    }

    /// Drops every entry matching the predicate.
    pub fn remove_matching<P>(&self, predicate: P)
    where
        P: Fn(&K, &V) -> bool,
    {
        self.map.lock().unwrap().retain(|key, value| !predicate(key, value));
    }

    pub fn clear(&self) {
        self.map.lock().unwrap().clear();
    }

    pub fn len(&self) -> usize {
        self.map.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<K, V> Default for Cache<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    fn default() -> Self {
        Cache::new()
    }
}

#[cfg(test)]
mod tests {

    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use super::*;

    #[test]
    fn computes_once_per_key() {
        let cache: Cache<i64, i64> = Cache::new();
        let calls = AtomicUsize::new(0);

        let retrieve = |key: i64| {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok(key * 2)
        };

        assert_eq!(cache.get(&3, || retrieve(3)).unwrap(), 6);
        assert_eq!(cache.get(&3, || retrieve(3)).unwrap(), 6);
        assert_eq!(cache.get(&4, || retrieve(4)).unwrap(), 8);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn recomputes_after_remove() {
        let cache: Cache<i64, i64> = Cache::new();
        let calls = AtomicUsize::new(0);

        for _ in 0..2 {
            cache
                .get(&1, || {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok(10)
                })
                .unwrap();
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        cache.remove(&1);
        cache
            .get(&1, || {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(10)
            })
            .unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn failed_retrieval_is_not_cached() {
        let cache: Cache<i64, i64> = Cache::new();
        let result = cache.get(&1, || {
            Err(crate::error::CfError::InvalidArgument("boom".into()))
        });
        assert!(result.is_err());
        assert!(cache.get_if_present(&1).is_none());
        assert_eq!(cache.get(&1, || Ok(5)).unwrap(), 5);
    }

    #[test]
    fn remove_matching_by_key_or_value() {
        let cache: Cache<(i64, i64), f32> = Cache::new();
        cache.get(&(1, 10), || Ok(0.5)).unwrap();
        cache.get(&(1, 11), || Ok(0.6)).unwrap();
        cache.get(&(2, 10), || Ok(0.7)).unwrap();

        cache.remove_matching(|key, _| key.0 == 1);
        assert_eq!(cache.len(), 1);
        assert!(cache.get_if_present(&(2, 10)).is_some());

        cache.remove_matching(|_, value| *value > 0.6);
        assert!(cache.is_empty());
    }

    #[test]
    fn concurrent_gets_agree() {
        let cache: Arc<Cache<i64, i64>> = Arc::new(Cache::new());

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let cache = Arc::clone(&cache);
                std::thread::spawn(move || {
                    let mut sum = 0;
                    for key in 0..100_i64 {
                        sum += cache.get(&key, || Ok(key * key)).unwrap();
                    }
                    sum
                })
            })
            .collect();

        let expected: i64 = (0..100_i64).map(|k| k * k).sum();
        for handle in handles {
            assert_eq!(handle.join().unwrap(), expected);
        }
        assert_eq!(cache.len(), 100);
    }
}
