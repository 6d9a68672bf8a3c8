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

//! Specialized open-addressing hash containers for 64 bit ids.
//!
//! `IdSet` and `IdMap` store raw `i64` keys in a flat table probed with
//! double hashing. Two key values are reserved as out-of-band markers: `NULL`
//! for an empty slot and `REMOVED` for a tombstone left behind by `remove`.
//! The probe sequence and growth policy are kept as pure functions here so
//! they can be tested in isolation.

mod map;
mod set;

pub use self::map::IdMap;
pub use self::set::IdSet;

use crate::error::{CfError, Result};

/// Marks an empty slot. Not a legal key.
pub const NULL: i64 = i64::MIN;

/// Marks a slot whose key has been removed. Not a legal key.
pub const REMOVED: i64 = i64::MAX;

/// Occupancy ratio at which a table rehashes (grows or reclaims tombstones).
pub(crate) const LOAD_FACTOR: f64 = 1.5;

pub(crate) const DEFAULT_CAPACITY: usize = 2;

pub(crate) fn check_key(key: i64) -> Result<()> {
    if key == NULL || key == REMOVED {
        return Err(CfError::InvalidArgument(format!(
            "key {} is reserved as a table sentinel", key,
        )));
    }
    Ok(())
}

pub(crate) fn is_sentinel(key: i64) -> bool {
    key == NULL || key == REMOVED
}

/// Hash of a key, folded to 31 bits so that the modulo arithmetic below stays
/// in range for any table size.
pub fn hash_of(key: i64) -> u64 {
    let k = key as u64;
    (k ^ (k >> 32)) & 0x7FFF_FFFF
}

/// Initial probe slot for a hash.
pub fn slot_of(hash: u64, table_size: usize) -> usize {
    (hash % table_size as u64) as usize
}

/// Probe step for a hash. Never zero, and co-prime with any prime table size,
/// so the probe sequence visits every slot. This is double hashing, not
/// linear probing; two colliding keys follow different walks.
pub fn jump_of(hash: u64, table_size: usize) -> usize {
    (1 + hash % (table_size as u64 - 2)) as usize
}

/// Table size for a requested entry capacity.
pub(crate) fn table_size_for(capacity: usize) -> usize {
    next_twin_prime((LOAD_FACTOR * capacity as f64) as usize)
}

/// The smallest p >= n such that p and p - 2 are both prime. Prime table
/// sizes keep the double-hash probe sequence a full cycle; twin primes mean
/// `size - 2` (the jump modulus) is prime as well.
pub fn next_twin_prime(n: usize) -> usize {
    if n <= 5 {
        return 5;
    }
    let mut candidate = if n % 2 == 0 { n + 1 } else { n };
    loop {
        if is_prime(candidate as u64) && is_prime(candidate as u64 - 2) {
            return candidate;
        }
        candidate += 2;
    }
}

fn is_prime(n: u64) -> bool {
    if n < 2 {
        return false;
    }
    if n < 4 {
        return true;
    }
    if n % 2 == 0 || n % 3 == 0 {
        return false;
    }
    let mut divisor = 5;
    while divisor * divisor <= n {
        if n % divisor == 0 || n % (divisor + 2) == 0 {
            return false;
        }
        divisor += 6;
    }
    true
}

#[cfg(test)]
mod tests {

    use super::*;

    #[test]
    fn sentinels_are_rejected() {
        assert!(check_key(NULL).is_err());
        assert!(check_key(REMOVED).is_err());
        assert!(check_key(0).is_ok());
        assert!(check_key(-1).is_ok());
    }

    #[test]
    fn twin_primes() {
        assert_eq!(next_twin_prime(0), 5);
        assert_eq!(next_twin_prime(5), 5);
        assert_eq!(next_twin_prime(6), 7);
        assert_eq!(next_twin_prime(8), 13);
        assert_eq!(next_twin_prime(14), 19);
        assert_eq!(next_twin_prime(20), 31);
    }

    #[test]
    fn probe_stays_in_range() {
        let size = next_twin_prime(100);
        for key in -1000_i64..1000 {
            let hash = hash_of(key);
            assert!(slot_of(hash, size) < size);
            let jump = jump_of(hash, size);
            assert!(jump >= 1 && jump <= size - 2);
        }
    }

    #[test]
    fn probe_is_deterministic() {
        let hash = hash_of(42);
        assert_eq!(slot_of(hash, 31), slot_of(hash, 31));
        assert_eq!(jump_of(hash, 31), jump_of(hash, 31));
    }

    #[test]
    fn probe_visits_every_slot() {
        let size = 13;
        let hash = hash_of(7);
        let jump = jump_of(hash, size);
        let mut seen = vec![false; size];
        let mut slot = slot_of(hash, size);
        for _ in 0..size {
            seen[slot] = true;
            slot = (slot + jump) % size;
        }
        assert!(seen.into_iter().all(|visited| visited));
    }
}
