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

use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::error::{CfError, Result};
use crate::io;
use crate::model::{self, DataModel, SharedModel};
use crate::refresh::{Refreshable, RefreshedComponents};

/// A data model loaded from a tab-separated preference file, the
/// authoritative source of its contents. Refreshing re-reads the file and
/// swaps the in-memory model wholesale; a failed reload keeps the previous
/// model and logs the problem.
///
/// Files where no line carries a value column produce a boolean-feedback
/// model; mixing valued and value-less lines is malformed input.
pub struct FileDataModel {
    path: PathBuf,
    model: SharedModel,
}

impl FileDataModel {
    pub fn open<P: Into<PathBuf>>(path: P) -> Result<Self> {
        let path = path.into();
        let model = Self::load(&path)?;
        Ok(FileDataModel { path, model: model::shared(model) })
    }

    /// The shared handle components hold on to. The handle stays valid across
    /// refreshes; only the contents behind it are swapped.
    pub fn model(&self) -> SharedModel {
        SharedModel::clone(&self.model)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(path: &Path) -> Result<DataModel> {
        let mut reader = io::preference_reader(path)?;
        let records: Vec<io::PreferenceRecord> =
            io::preferences_from_csv(&mut reader).collect::<Result<_>>()?;

        let num_valued = records.iter().filter(|record| record.value.is_some()).count();
        let model = if num_valued == records.len() {
            DataModel::from_preferences(
                records
                    .iter()
                    .map(|record| (record.user_id, record.item_id, record.value.unwrap_or(1.0))),
            )?
        } else if num_valued == 0 {
            DataModel::from_boolean_preferences(
                records.iter().map(|record| (record.user_id, record.item_id)),
            )?
        } else {
            return Err(CfError::InvalidArgument(format!(
                "{}: {} of {} lines carry a value, expected all or none",
                path.display(),
                num_valued,
                records.len(),
            )));
        };

        info!(
            "loaded {} preferences of {} users for {} items from {}",
            model.num_preferences(),
            model.num_users(),
            model.num_items(),
            path.display(),
        );
        Ok(model)
    }
}

impl Refreshable for FileDataModel {
    fn refresh(&self, _already_refreshed: &mut RefreshedComponents) {
        match Self::load(&self.path) {
            Ok(reloaded) => {
                *self.model.write().unwrap() = reloaded;
            }
            Err(error) => {
                warn!("keeping previous model, reload of {} failed: {}", self.path.display(), error);
            }
        }
    }
}

#[cfg(test)]
mod tests {

    use std::sync::Arc;

    use super::*;
    use crate::refresh;

    fn temp_file(name: &str, contents: &str) -> PathBuf {
        let path =
            std::env::temp_dir().join(format!("corater-fdm-{}-{}", std::process::id(), name));
        std::fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn loads_valued_files() {
        let path = temp_file("valued.tsv", "1\t100\t1.0\n1\t101\t0.2\n2\t100\t0.9\n");
        let file_model = FileDataModel::open(&path).unwrap();

        let model = file_model.model();
        let model = model.read().unwrap();
        assert_eq!(model.num_users(), 2);
        assert_eq!(model.num_items(), 2);
        assert!(model.has_preference_values());
        assert_eq!(model.preference_value(1, 101).unwrap(), Some(0.2));

        std::fs::remove_file(path).unwrap();
    }

    #[test]
    fn loads_boolean_files() {
        let path = temp_file("boolean.tsv", "1\t100\n1\t101\n2\t100\n");
        let file_model = FileDataModel::open(&path).unwrap();

        let model = file_model.model();
        let model = model.read().unwrap();
        assert!(!model.has_preference_values());
        assert_eq!(model.preference_value(2, 100).unwrap(), Some(1.0));

        std::fs::remove_file(path).unwrap();
    }

    #[test]
    fn mixed_files_are_rejected() {
        let path = temp_file("mixed.tsv", "1\t100\t1.0\n1\t101\n");
        assert!(matches!(
            FileDataModel::open(&path),
            Err(CfError::InvalidArgument(_))
        ));
        std::fs::remove_file(path).unwrap();
    }

    #[test]
    fn refresh_swaps_contents_behind_the_shared_handle() {
        let path = temp_file("refresh.tsv", "1\t100\t1.0\n");
        let file_model = Arc::new(FileDataModel::open(&path).unwrap());
        let handle = file_model.model();

        assert_eq!(handle.read().unwrap().num_preferences(), 1);

        std::fs::write(&path, "1\t100\t1.0\n2\t101\t0.5\n").unwrap();
        refresh::refresh_now(&file_model);

        assert_eq!(handle.read().unwrap().num_preferences(), 2);
        assert_eq!(handle.read().unwrap().preference_value(2, 101).unwrap(), Some(0.5));

        std::fs::remove_file(path).unwrap();
    }

    #[test]
    fn failed_reload_keeps_previous_model() {
        let path = temp_file("broken-reload.tsv", "1\t100\t1.0\n");
        let file_model = Arc::new(FileDataModel::open(&path).unwrap());

        std::fs::write(&path, "garbage\tnot-an-item\n").unwrap();
        refresh::refresh_now(&file_model);

        let handle = file_model.model();
        assert_eq!(handle.read().unwrap().num_preferences(), 1);

        std::fs::remove_file(path).unwrap();
    }
}
