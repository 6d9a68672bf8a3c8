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

use std::fs::File;
use std::io::prelude::*;
use std::io::stdout;
use std::path::Path;

use serde_derive::Serialize;
use serde_json::json;

use crate::error::{CfError, Result};
use crate::types::{ItemId, RecommendedItem, UserId};

/// One line of a preference input file.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PreferenceRecord {
    pub user_id: UserId,
    pub item_id: ItemId,
    /// Absent for boolean-feedback files that only record that an
    /// interaction happened.
    pub value: Option<f32>,
    /// Accepted for compatibility with timestamped exports and discarded by
    /// the in-memory model.
    pub timestamp: Option<i64>,
}

/// Opens a preference file. We expect NO headers, and a tab-separated
/// `user <tab> item [<tab> value [<tab> timestamp]]` tuple per line.
pub fn preference_reader<P: AsRef<Path>>(path: P) -> Result<csv::Reader<File>> {
    let reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .delimiter(b'\t')
        .flexible(true)
        .from_path(path)?;
    Ok(reader)
}

/// Streams the parsed records of a preference file.
pub fn preferences_from_csv<'a, R>(
    reader: &'a mut csv::Reader<R>,
) -> impl Iterator<Item = Result<PreferenceRecord>> + 'a
where
    R: std::io::Read,
{
    reader.records().map(|record| {
        let record = record?;
        let line = record.position().map(|position| position.line()).unwrap_or(0);
        if record.len() < 2 {
            return Err(CfError::InvalidArgument(format!(
                "line {}: expected at least a user and an item field", line,
            )));
        }
        let user_id = parse_field::<i64>(&record[0], "user id", line)?;
        let item_id = parse_field::<i64>(&record[1], "item id", line)?;
        let value = match record.get(2) {
            Some(field) if !field.is_empty() => Some(parse_field::<f32>(field, "value", line)?),
            _ => None,
        };
        let timestamp = match record.get(3) {
            Some(field) if !field.is_empty() => {
                Some(parse_field::<i64>(field, "timestamp", line)?)
            }
            _ => None,
        };
        Ok(PreferenceRecord { user_id, item_id, value, timestamp })
    })
}

fn parse_field<T: std::str::FromStr>(field: &str, what: &str, line: u64) -> Result<T> {
    field.parse::<T>().map_err(|_| {
        CfError::InvalidArgument(format!("line {}: malformed {} '{}'", line, what, field))
    })
}

/// Struct used for JSON serialization of recommendation batches. Field names
/// will be used in JSON.
#[derive(Serialize)]
struct Recommendations<'a> {
    for_user: UserId,
    recommended_items: &'a [RecommendedItem],
}

/// Outputs one JSON document per user. If an `output_path` is supplied, we
/// write to a file at the specified path, otherwise, we output to stdout.
pub fn write_recommendations(
    recommendations: &[(UserId, Vec<RecommendedItem>)],
    output_path: Option<&str>,
) -> Result<()> {
    let mut out: Box<dyn Write> = match output_path {
        Some(path) => Box::new(File::create(Path::new(path))?),
        None => Box::new(stdout()),
    };

    for (user_id, items) in recommendations {
        let as_json = json!(Recommendations {
            for_user: *user_id,
            recommended_items: items,
        });
        writeln!(out, "{}", as_json)?;
    }
    Ok(())
}
