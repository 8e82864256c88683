use std::{io, path::PathBuf};

use facility_model::Oid;
use thiserror::Error;

use super::{Dataset, GeometryType};

/// Everything a record store can fail with. None of these are retried.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("{dataset} does not exist")]
    NotFound { dataset: Dataset },

    #[error("{dataset} already exists")]
    AlreadyExists { dataset: Dataset },

    /// A stale lock left by a killed run has to be removed by hand.
    #[error("{dataset} is locked by another writer, remove {} if no run is active", .lock.display())]
    Locked { dataset: Dataset, lock: PathBuf },

    #[error("failed to access {dataset}: {source}")]
    Access {
        dataset: Dataset,
        #[source]
        source: io::Error,
    },

    #[error("{dataset} is corrupt: {source}")]
    Corrupt {
        dataset: Dataset,
        #[source]
        source: serde_json::Error,
    },

    /// A required field is not part of the dataset schema.
    #[error("{dataset} has no field {field:?}")]
    MissingField { dataset: Dataset, field: String },

    #[error("{dataset} has no row {oid}")]
    UnknownRow { dataset: Dataset, oid: Oid },

    #[error("row {oid} of {dataset} has no usable geometry")]
    InvalidGeometry { dataset: Dataset, oid: Oid },

    #[error("{dataset} only holds {expected} geometries")]
    WrongGeometry {
        dataset: Dataset,
        expected: GeometryType,
    },
}
