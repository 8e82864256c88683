use std::{collections::BTreeMap, path::Path};

use facility_model::Oid;

use super::{
    Cursor, Dataset, FieldSpec, GeometryType, RecordStore, Row, Schema, SpatialReference,
    StoreError, Table,
};

/// Keeps every dataset in memory. Used for dry runs and tests.
#[derive(Default)]
pub struct MemoryStore {
    tables: BTreeMap<Dataset, Table>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, dataset: Dataset, table: Table) {
        self.tables.insert(dataset, table);
    }

    pub fn table(&self, dataset: &Dataset) -> Option<&Table> {
        self.tables.get(dataset)
    }

    fn get(&self, dataset: &Dataset) -> Result<&Table, StoreError> {
        self.tables.get(dataset).ok_or_else(|| StoreError::NotFound {
            dataset: dataset.clone(),
        })
    }

    fn get_mut(&mut self, dataset: &Dataset) -> Result<&mut Table, StoreError> {
        self.tables
            .get_mut(dataset)
            .ok_or_else(|| StoreError::NotFound {
                dataset: dataset.clone(),
            })
    }

    fn create(&mut self, dataset: Dataset, table: Table) -> Result<Dataset, StoreError> {
        if self.tables.contains_key(&dataset) {
            return Err(StoreError::AlreadyExists { dataset });
        }
        self.tables.insert(dataset.clone(), table);
        Ok(dataset)
    }
}

impl RecordStore for MemoryStore {
    fn describe(&self, dataset: &Dataset) -> Result<Schema, StoreError> {
        Ok(self.get(dataset)?.schema.clone())
    }

    fn search(&self, dataset: &Dataset, fields: &[&str]) -> Result<Cursor, StoreError> {
        let rows = self.get(dataset)?.project(dataset, fields)?;
        Ok(Cursor::new(rows, None))
    }

    fn update(&mut self, dataset: &Dataset, rows: Vec<Row>) -> Result<(), StoreError> {
        self.get_mut(dataset)?.update(dataset, rows)
    }

    fn insert(&mut self, dataset: &Dataset, rows: Vec<Row>) -> Result<Vec<Oid>, StoreError> {
        self.get_mut(dataset)?.insert(dataset, rows)
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
        self.create(Dataset::new(workspace, name), table)
    }

    fn copy(
        &mut self,
        dataset: &Dataset,
        workspace: &Path,
        name: &str,
    ) -> Result<Dataset, StoreError> {
        let table = self.get(dataset)?.clone();
        self.create(Dataset::new(workspace, name), table)
    }
}
