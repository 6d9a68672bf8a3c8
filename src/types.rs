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

use serde_derive::Serialize;

/// Identifier of a user. Callers map their own identifiers to 64 bit integers.
pub type UserId = i64;

/// Identifier of an item.
pub type ItemId = i64;

/// A single observed (user, item, strength) observation. The identity of a
/// preference is immutable, its value is not.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Preference {
    pub user_id: UserId,
    pub item_id: ItemId,
    pub value: f32,
}

impl Preference {
    pub fn new(user_id: UserId, item_id: ItemId, value: f32) -> Self {
        Preference { user_id, item_id, value }
    }
}

/// An item together with the strength estimated for it, as returned from
/// `Recommender::recommend`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RecommendedItem {
    pub item_id: ItemId,
    pub value: f32,
}
