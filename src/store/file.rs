use std::{
    fs::{self, OpenOptions},
    io::ErrorKind,
    path::{Path, PathBuf},
};

use facility_model::Oid;
use log::debug;

use super::{
    Cursor, Dataset, FieldSpec, GeometryType, RecordStore, Row, Schema, SpatialReference,
    StoreError, Table,
};

/// Workspaces are directories, datasets are `<name>.json` files inside them.
///
/// Every access takes `<name>.lock` with `create_new`, so a second writer
/// fails with [`StoreError::Locked`] instead of clobbering the file. The lock
/// is released when the [`Lock`] (or the [`Cursor`] holding it) is dropped.
#[derive(Clone, Copy, Debug, Default)]
pub struct FileStore;

pub struct Lock {
    path: PathBuf,
}

impl Drop for Lock {
    fn drop(&mut self) {
        if let Err(e) = fs::remove_file(&self.path) {
            debug!("failed to release {}: {e}", self.path.display());
        }
    }
}

fn file_path(dataset: &Dataset, extension: &str) -> PathBuf {
    dataset
        .workspace
        .join(format!("{}.{extension}", dataset.name))
}

fn access(dataset: &Dataset) -> impl FnOnce(std::io::Error) -> StoreError + '_ {
    move |source| StoreError::Access {
        dataset: dataset.clone(),
        source,
    }
}

impl FileStore {
    /// Reads a whole dataset, e.g. to stage it in a [`super::MemoryStore`].
    pub fn table(&self, dataset: &Dataset) -> Result<Table, StoreError> {
        let _lock = self.lock(dataset)?;
        self.load(dataset)
    }

    fn lock(&self, dataset: &Dataset) -> Result<Lock, StoreError> {
        let path = file_path(dataset, "lock");
        match OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(_) => Ok(Lock { path }),
            Err(e) if e.kind() == ErrorKind::AlreadyExists => Err(StoreError::Locked {
                dataset: dataset.clone(),
                lock: path,
            }),
            Err(e) if e.kind() == ErrorKind::NotFound => Err(StoreError::NotFound {
                dataset: dataset.clone(),
            }),
            Err(e) => Err(access(dataset)(e)),
        }
    }

    fn load(&self, dataset: &Dataset) -> Result<Table, StoreError> {
        let contents = match fs::read_to_string(file_path(dataset, "json")) {
            Ok(x) => x,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(StoreError::NotFound {
                    dataset: dataset.clone(),
                })
            }
            Err(e) => return Err(access(dataset)(e)),
        };

        serde_json::from_str(&contents).map_err(|source| StoreError::Corrupt {
            dataset: dataset.clone(),
            source,
        })
    }

    fn save(&self, dataset: &Dataset, table: &Table) -> Result<(), StoreError> {
        let mut json = serde_json::to_string_pretty(table).map_err(|source| {
            StoreError::Corrupt {
                dataset: dataset.clone(),
                source,
            }
        })?;
        json.push('\n');

        let tmp = file_path(dataset, "json.tmp");
        fs::write(&tmp, json).map_err(access(dataset))?;
        fs::rename(&tmp, file_path(dataset, "json")).map_err(access(dataset))
    }

    fn exists(&self, dataset: &Dataset) -> bool {
        file_path(dataset, "json").exists()
    }

    fn create(&self, dataset: Dataset, table: &Table) -> Result<Dataset, StoreError> {
        fs::create_dir_all(&dataset.workspace).map_err(access(&dataset))?;
        let _lock = self.lock(&dataset)?;
        if self.exists(&dataset) {
            return Err(StoreError::AlreadyExists { dataset });
        }
        self.save(&dataset, table)?;
        debug!("created {dataset} with {} rows", table.rows.len());
        Ok(dataset)
    }

    /// Loads, edits and saves a dataset while holding its lock.
    fn edit<T>(
        &self,
        dataset: &Dataset,
        f: impl FnOnce(&mut Table) -> Result<T, StoreError>,
    ) -> Result<T, StoreError> {
        if !self.exists(dataset) {
            return Err(StoreError::NotFound {
                dataset: dataset.clone(),
            });
        }
        let _lock = self.lock(dataset)?;
        let mut table = self.load(dataset)?;
        let output = f(&mut table)?;
        self.save(dataset, &table)?;
        Ok(output)
    }
}

impl RecordStore for FileStore {
    fn describe(&self, dataset: &Dataset) -> Result<Schema, StoreError> {
        Ok(self.load(dataset)?.schema)
    }

    fn search(&self, dataset: &Dataset, fields: &[&str]) -> Result<Cursor, StoreError> {
        if !self.exists(dataset) {
            return Err(StoreError::NotFound {
                dataset: dataset.clone(),
            });
        }
        let lock = self.lock(dataset)?;
        let rows = self.load(dataset)?.project(dataset, fields)?;
        Ok(Cursor::new(rows, Some(lock)))
    }

    fn update(&mut self, dataset: &Dataset, rows: Vec<Row>) -> Result<(), StoreError> {
        if rows.is_empty() {
            return Ok(());
        }
        self.edit(dataset, |table| table.update(dataset, rows))
    }

    fn insert(&mut self, dataset: &Dataset, rows: Vec<Row>) -> Result<Vec<Oid>, StoreError> {
        if rows.is_empty() {
            return Ok(Vec::new());
        }
        self.edit(dataset, |table| table.insert(dataset, rows))
    }

    fn create_feature_class(
        &mut self,
        workspace: &Path,
        name: &str,
        spatial_reference: SpatialReference,
        geometry_type: GeometryType,
        fields: &[FieldSpec],
    ) -> Result<Dataset, StoreError> {
        let table = Table::new(Schema {
            spatial_reference,
            geometry_type,
            fields: fields.to_vec(),
        });
        self.create(Dataset::new(workspace, name), &table)
    }

    fn copy(
        &mut self,
        dataset: &Dataset,
        workspace: &Path,
        name: &str,
    ) -> Result<Dataset, StoreError> {
        let table = self.table(dataset)?;
        self.create(Dataset::new(workspace, name), &table)
    }
}
