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

//! Saving and restoring factorizations, so a host can resume serving after a
//! restart without retraining.
//!
//! The file layout is fixed: `i32 num_features, i32 num_users, i32
//! num_items`, then one `(i32 row, i64 user_id, f64[num_features])` record
//! per user, then the same shape per item. All integers and doubles are
//! big-endian.

use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::PathBuf;

use tracing::info;

use crate::error::{CfError, Result};
use crate::factorization::Factorization;
use crate::ids::IdMap;

/// Where a recommender parks its factorization between process lifetimes.
pub trait Persistence: Send + Sync {
    /// The stored factorization, or None if nothing has been stored yet.
    fn load(&self) -> Result<Option<Factorization>>;

    fn store(&self, factorization: &Factorization) -> Result<()>;
}

pub struct FilePersistence {
    path: PathBuf,
}

impl FilePersistence {
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        FilePersistence { path: path.into() }
    }
}

impl Persistence for FilePersistence {
    fn load(&self) -> Result<Option<Factorization>> {
        if !self.path.exists() {
            return Ok(None);
        }
        let mut reader = BufReader::new(File::open(&self.path)?);

        let num_features = read_count(&mut reader, "feature count")?;
        let num_users = read_count(&mut reader, "user count")?;
        let num_items = read_count(&mut reader, "item count")?;

        let (user_index, user_features) =
            read_records(&mut reader, num_users, num_features, "user")?;
        let (item_index, item_features) =
            read_records(&mut reader, num_items, num_features, "item")?;

        info!(
            "loaded a factorization of {} users and {} items with {} features from {}",
            num_users,
            num_items,
            num_features,
            self.path.display(),
        );
        Ok(Some(Factorization::new(user_index, item_index, user_features, item_features)))
    }

    fn store(&self, factorization: &Factorization) -> Result<()> {
        let mut writer = BufWriter::new(File::create(&self.path)?);

        write_i32(&mut writer, factorization.num_features() as i32)?;
        write_i32(&mut writer, factorization.num_users() as i32)?;
        write_i32(&mut writer, factorization.num_items() as i32)?;

        write_records(&mut writer, &factorization.user_index, &factorization.user_features)?;
        write_records(&mut writer, &factorization.item_index, &factorization.item_features)?;

        writer.flush()?;
        info!("stored the factorization to {}", self.path.display());
        Ok(())
    }
}

fn write_records<W: Write>(
    writer: &mut W,
    index: &IdMap<usize>,
    features: &[Vec<f64>],
) -> Result<()> {
    for (id, &row) in index.iter() {
        write_i32(writer, row as i32)?;
        writer.write_all(&id.to_be_bytes())?;
        for &feature in &features[row] {
            writer.write_all(&feature.to_be_bytes())?;
        }
    }
    Ok(())
}

fn read_records<R: Read>(
    reader: &mut R,
    num_rows: usize,
    num_features: usize,
    what: &str,
) -> Result<(IdMap<usize>, Vec<Vec<f64>>)> {
    let mut index = IdMap::with_capacity(num_rows);
    let mut features = vec![Vec::new(); num_rows];

    for _ in 0..num_rows {
        let row = read_i32(reader)?;
        if row < 0 || row as usize >= num_rows {
            return Err(CfError::InvalidArgument(format!(
                "corrupt factorization file: {} row {} out of range", what, row,
            )));
        }
        let id = read_i64(reader)?;
        let mut vector = Vec::with_capacity(num_features);
        for _ in 0..num_features {
            vector.push(read_f64(reader)?);
        }
        if index.put(id, row as usize)?.is_some() {
            return Err(CfError::InvalidArgument(format!(
                "corrupt factorization file: duplicate {} id {}", what, id,
            )));
        }
        features[row as usize] = vector;
    }
    Ok((index, features))
}

fn read_count<R: Read>(reader: &mut R, what: &str) -> Result<usize> {
    let count = read_i32(reader)?;
    if count < 0 {
        return Err(CfError::InvalidArgument(format!(
            "corrupt factorization file: negative {}", what,
        )));
    }
    Ok(count as usize)
}

fn write_i32<W: Write>(writer: &mut W, value: i32) -> Result<()> {
    writer.write_all(&value.to_be_bytes())?;
    Ok(())
}

fn read_i32<R: Read>(reader: &mut R) -> Result<i32> {
    let mut buffer = [0_u8; 4];
    reader.read_exact(&mut buffer)?;
    Ok(i32::from_be_bytes(buffer))
}

fn read_i64<R: Read>(reader: &mut R) -> Result<i64> {
    let mut buffer = [0_u8; 8];
    reader.read_exact(&mut buffer)?;
    Ok(i64::from_be_bytes(buffer))
}

fn read_f64<R: Read>(reader: &mut R) -> Result<f64> {
    let mut buffer = [0_u8; 8];
    reader.read_exact(&mut buffer)?;
    Ok(f64::from_be_bytes(buffer))
}

#[cfg(test)]
mod tests {

    use super::*;

    fn temp_path(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("corater-persist-{}-{}", std::process::id(), name))
    }

    fn sample_factorization() -> Factorization {
        let mut user_index = IdMap::new();
        user_index.put(1, 0).unwrap();
        user_index.put(5, 1).unwrap();
        let mut item_index = IdMap::new();
        item_index.put(10, 0).unwrap();
        item_index.put(20, 1).unwrap();
        item_index.put(30, 2).unwrap();

        Factorization::new(
            user_index,
            item_index,
            vec![vec![0.5, -1.25], vec![3.0, 0.0]],
            vec![vec![1.0, 2.0], vec![-0.5, 0.25], vec![0.0, 4.5]],
        )
    }

    #[test]
    fn round_trips_a_factorization() {
        let path = temp_path("roundtrip.bin");
        let persistence = FilePersistence::new(&path);
        let original = sample_factorization();

        persistence.store(&original).unwrap();
        let restored = persistence.load().unwrap().unwrap();

        assert_eq!(restored.num_features(), original.num_features());
        assert_eq!(restored.num_users(), original.num_users());
        assert_eq!(restored.num_items(), original.num_items());
        for &user_id in &[1, 5] {
            for &item_id in &[10, 20, 30] {
                assert_eq!(
                    restored.estimate(user_id, item_id).unwrap(),
                    original.estimate(user_id, item_id).unwrap(),
                );
            }
        }

        std::fs::remove_file(path).unwrap();
    }

    #[test]
    fn file_size_matches_the_layout() {
        let path = temp_path("layout.bin");
        FilePersistence::new(&path).store(&sample_factorization()).unwrap();

        // 3 header ints, then (4 + 8 + 2 * 8) bytes per record for 5 records.
        let expected = 3 * 4 + 5 * (4 + 8 + 2 * 8);
        assert_eq!(std::fs::metadata(&path).unwrap().len(), expected as u64);

        std::fs::remove_file(path).unwrap();
    }

    #[test]
    fn a_missing_file_is_not_an_error() {
        let persistence = FilePersistence::new(temp_path("does-not-exist.bin"));
        assert!(persistence.load().unwrap().is_none());
    }

    #[test]
    fn truncated_files_fail_to_load() {
        let path = temp_path("truncated.bin");
        FilePersistence::new(&path).store(&sample_factorization()).unwrap();
        let bytes = std::fs::read(&path).unwrap();
        std::fs::write(&path, &bytes[..bytes.len() / 2]).unwrap();

        assert!(FilePersistence::new(&path).load().is_err());

        std::fs::remove_file(path).unwrap();
    }
}
