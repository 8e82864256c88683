use facility_model::{FacilityRecord, Identifier};
use indicatif::ProgressIterator;
use serde_json::Value;

use crate::{
    config::Source,
    geometry,
    store::{RecordStore, Row, StoreError},
    utils::progress_bar,
};

/// Reads every row of `source` as a facility record, in storage order.
pub fn scan<S: RecordStore>(
    store: &S,
    source: &Source,
) -> Result<Vec<FacilityRecord>, StoreError> {
    let fields = [source.id_field.as_str(), source.name_field.as_str()];
    let cursor = store.search(&source.dataset(), &fields)?;
    let bar = progress_bar(cursor.len() as u64, "reading");
    let records: Result<Vec<_>, _> = cursor
        .progress_with(bar.clone())
        .map(|row| record(source, &row))
        .collect();
    bar.finish_and_clear();
    records
}

pub fn record(source: &Source, row: &Row) -> Result<FacilityRecord, StoreError> {
    let point = row
        .shape
        .as_ref()
        .and_then(geometry::centroid)
        .ok_or_else(|| StoreError::InvalidGeometry {
            dataset: source.dataset(),
            oid: row.oid,
        })?;

    Ok(FacilityRecord {
        oid: row.oid,
        identifier: Identifier::from_value(row.get(&source.id_field)),
        name: name(row.get(&source.name_field)),
        point,
    })
}

fn name(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(x) => Some(x.clone()),
        x => Some(x.to_string()),
    }
}
