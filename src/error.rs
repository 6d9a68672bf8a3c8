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

use thiserror::Error;

use crate::types::{ItemId, UserId};

/// Errors surfaced by the engine. Estimation failure from insufficient data is
/// not an error, it is reported as NaN ("no opinion") and filtered during
/// top-K selection.
#[derive(Error, Debug)]
pub enum CfError {
    /// The user id is absent from the data model. Recoverable, callers
    /// typically skip the user or treat the lookup as "no estimate".
    #[error("no such user: {0}")]
    NoSuchUser(UserId),

    /// The item id is absent from the data model.
    #[error("no such item: {0}")]
    NoSuchItem(ItemId),

    /// A caller-supplied argument is unusable (k < 1, NaN preference value,
    /// malformed sampling rate, reserved sentinel key). Fatal at the call
    /// site, not retried.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// A solve or training run produced non-finite intermediate results.
    /// Aborts the run; previously committed state stays valid.
    #[error("numeric divergence: {0}")]
    NumericDivergence(String),

    /// The operation is not available on this representation, e.g. writing a
    /// value into a boolean preference array.
    #[error("unsupported operation: {0}")]
    Unsupported(&'static str),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed input: {0}")]
    Csv(#[from] csv::Error),
}

pub type Result<T> = std::result::Result<T, CfError>;
