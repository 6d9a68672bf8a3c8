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

//! An in-memory collaborative-filtering engine.
//!
//! Sparse (user, item, preference) observations go into a [`model::DataModel`];
//! on top of it sit pairwise [`similarity`] metrics, per-user
//! [`neighborhood`] selection and the [`recommender`] implementations that
//! answer "which N items for this user" and "how much would they like this
//! one". [`factorization`] learns latent-factor models (ALS-WR, SGD, SVD++)
//! as an alternative estimator, and [`cache`]/[`refresh`] provide the
//! memoization and dependency-ordered rebuild protocol tying the components
//! together. The crate is a library for embedding into a host service; it
//! has no network or CLI surface of its own.

pub mod cache;
pub mod config;
pub mod error;
pub mod factorization;
pub mod ids;
pub mod io;
pub mod model;
pub mod neighborhood;
pub mod recommender;
pub mod refresh;
pub mod sampling;
pub mod similarity;
pub mod topk;
pub mod types;

#[cfg(test)]
mod usage_tests;

pub use crate::error::{CfError, Result};
pub use crate::recommender::Recommender;
pub use crate::refresh::Refreshable;
pub use crate::types::{Preference, RecommendedItem};
