use std::{
    collections::BTreeMap,
    fmt,
    path::{Path, PathBuf},
    vec,
};

use facility_model::Oid;
use geo::Geometry;
use serde::{Deserialize, Serialize};
use serde_json::Value;

mod error;
mod file;
mod memory;
mod table;

pub use error::StoreError;
pub use file::FileStore;
pub use memory::MemoryStore;
pub use table::Table;

#[cfg(test)]
pub use memory::fixtures;

/// A named dataset inside a workspace.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Dataset {
    pub workspace: PathBuf,
    pub name: String,
}

impl Dataset {
    pub fn new(workspace: impl Into<PathBuf>, name: impl Into<String>) -> Self {
        Self {
            workspace: workspace.into(),
            name: name.into(),
        }
    }

    pub fn path(&self) -> PathBuf {
        self.workspace.join(&self.name)
    }
}

impl fmt::Display for Dataset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.path().display())
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpatialReference {
    pub wkid: u32,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum GeometryType {
    Point,
    Polyline,
}

impl GeometryType {
    pub fn accepts(&self, shape: &Geometry) -> bool {
        match self {
            Self::Point => matches!(shape, Geometry::Point(_)),
            Self::Polyline => matches!(
                shape,
                Geometry::Line(_) | Geometry::LineString(_) | Geometry::MultiLineString(_)
            ),
        }
    }
}

impl fmt::Display for GeometryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Point => write!(f, "POINT"),
            Self::Polyline => write!(f, "POLYLINE"),
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum FieldType {
    Long,
    Text,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldSpec {
    pub name: String,
    #[serde(rename = "type")]
    pub field_type: FieldType,
}

impl FieldSpec {
    pub fn new(name: &str, field_type: FieldType) -> Self {
        Self {
            name: name.to_string(),
            field_type,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Schema {
    pub spatial_reference: SpatialReference,
    pub geometry_type: GeometryType,
    pub fields: Vec<FieldSpec>,
}

impl Schema {
    pub fn field(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|x| x.name == name)
    }

    pub fn field_names(&self) -> Vec<&str> {
        self.fields.iter().map(|x| x.name.as_str()).collect()
    }

    /// Fails on the first name that is not part of the schema.
    pub fn require(&self, dataset: &Dataset, names: &[&str]) -> Result<(), StoreError> {
        for name in names {
            if self.field(name).is_none() {
                return Err(StoreError::MissingField {
                    dataset: dataset.clone(),
                    field: name.to_string(),
                });
            }
        }
        Ok(())
    }
}

/// One row with its fields addressed by name. The oid is assigned by the
/// store and ignored on insert.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Row {
    pub oid: Oid,
    #[serde(default)]
    pub shape: Option<Geometry>,
    #[serde(default)]
    pub attributes: BTreeMap<String, Value>,
}

static NULL: Value = Value::Null;

impl Row {
    pub fn new(shape: Geometry) -> Self {
        Self {
            oid: 0,
            shape: Some(shape),
            attributes: BTreeMap::new(),
        }
    }

    pub fn with(mut self, field: &str, value: impl Into<Value>) -> Self {
        self.attributes.insert(field.to_string(), value.into());
        self
    }

    pub fn with_shape(mut self, shape: Geometry) -> Self {
        self.shape = Some(shape);
        self
    }

    /// Missing fields read as null.
    pub fn get(&self, field: &str) -> &Value {
        self.attributes.get(field).unwrap_or(&NULL)
    }
}

/// Rows returned by [`RecordStore::search`]. Holds whatever the store needs
/// to keep the dataset consistent until it is dropped.
pub struct Cursor {
    rows: vec::IntoIter<Row>,
    _lock: Option<file::Lock>,
}

impl Cursor {
    fn new(rows: Vec<Row>, lock: Option<file::Lock>) -> Self {
        Self {
            rows: rows.into_iter(),
            _lock: lock,
        }
    }
}

impl Iterator for Cursor {
    type Item = Row;

    fn next(&mut self) -> Option<Row> {
        self.rows.next()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.rows.size_hint()
    }
}

impl ExactSizeIterator for Cursor {}

pub trait RecordStore {
    fn describe(&self, dataset: &Dataset) -> Result<Schema, StoreError>;

    /// Rows projected to `fields`, in storage order. Every call starts over.
    fn search(&self, dataset: &Dataset, fields: &[&str]) -> Result<Cursor, StoreError>;

    /// Rewrites existing rows matched by oid. Only the attributes present on
    /// each row are touched.
    fn update(&mut self, dataset: &Dataset, rows: Vec<Row>) -> Result<(), StoreError>;

    /// Appends rows and returns the oids assigned to them, in order.
    fn insert(&mut self, dataset: &Dataset, rows: Vec<Row>) -> Result<Vec<Oid>, StoreError>;

    fn create_feature_class(
        &mut self,
        workspace: &Path,
        name: &str,
        spatial_reference: SpatialReference,
        geometry_type: GeometryType,
        fields: &[FieldSpec],
    ) -> Result<Dataset, StoreError>;

    /// Copies schema and rows (oids included) into a new dataset.
    fn copy(&mut self, dataset: &Dataset, workspace: &Path, name: &str)
        -> Result<Dataset, StoreError>;
}
