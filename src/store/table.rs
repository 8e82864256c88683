use std::collections::BTreeMap;

use facility_model::Oid;
use serde::{Deserialize, Serialize};

use super::{Dataset, Row, Schema, StoreError};

/// Schema plus rows. This is also the on-disk layout of a [`super::FileStore`]
/// dataset.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Table {
    #[serde(flatten)]
    pub schema: Schema,
    pub next_oid: Oid,
    pub rows: Vec<Row>,
}

impl Table {
    pub fn new(schema: Schema) -> Self {
        Self {
            schema,
            next_oid: 1,
            rows: Vec::new(),
        }
    }

    pub fn project(&self, dataset: &Dataset, fields: &[&str]) -> Result<Vec<Row>, StoreError> {
        self.schema.require(dataset, fields)?;

        Ok(self
            .rows
            .iter()
            .map(|row| Row {
                oid: row.oid,
                shape: row.shape.clone(),
                attributes: fields
                    .iter()
                    .map(|x| (x.to_string(), row.get(x).clone()))
                    .collect(),
            })
            .collect())
    }

    pub fn update(&mut self, dataset: &Dataset, rows: Vec<Row>) -> Result<(), StoreError> {
        let index: BTreeMap<Oid, usize> = self
            .rows
            .iter()
            .enumerate()
            .map(|(i, x)| (x.oid, i))
            .collect();

        for row in rows {
            self.check(dataset, &row)?;
            let i = *index.get(&row.oid).ok_or_else(|| StoreError::UnknownRow {
                dataset: dataset.clone(),
                oid: row.oid,
            })?;

            let existing = &mut self.rows[i];
            existing.shape = row.shape;
            existing.attributes.extend(row.attributes);
        }

        Ok(())
    }

    pub fn insert(&mut self, dataset: &Dataset, rows: Vec<Row>) -> Result<Vec<Oid>, StoreError> {
        let mut oids = Vec::with_capacity(rows.len());
        for mut row in rows {
            self.check(dataset, &row)?;
            row.oid = self.next_oid;
            self.next_oid += 1;
            oids.push(row.oid);
            self.rows.push(row);
        }

        Ok(oids)
    }

    fn check(&self, dataset: &Dataset, row: &Row) -> Result<(), StoreError> {
        let names: Vec<&str> = row.attributes.keys().map(|x| x.as_str()).collect();
        self.schema.require(dataset, &names)?;

        if let Some(shape) = &row.shape {
            if !self.schema.geometry_type.accepts(shape) {
                return Err(StoreError::WrongGeometry {
                    dataset: dataset.clone(),
                    expected: self.schema.geometry_type,
                });
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use geo::{point, Geometry};
    use serde_json::json;

    use super::*;
    use crate::store::{FieldSpec, FieldType, GeometryType, SpatialReference};

    fn table() -> Table {
        Table::new(Schema {
            spatial_reference: SpatialReference { wkid: 26912 },
            geometry_type: GeometryType::Point,
            fields: vec![
                FieldSpec::new("BuildingId", FieldType::Text),
                FieldSpec::new("BUILDNAME", FieldType::Text),
            ],
        })
    }

    fn dataset() -> Dataset {
        Dataset::new("data", "facilities")
    }

    #[test]
    fn insert_assigns_oids() {
        let mut table = table();
        let row = Row::new(Geometry::Point(point!(x: 1.0, y: 2.0))).with("BuildingId", "A1");
        let oids = table
            .insert(&dataset(), vec![row.clone(), row.clone()])
            .unwrap();
        assert_eq!(oids, vec![1, 2]);
        assert_eq!(table.next_oid, 3);
    }

    #[test]
    fn update_merges_attributes() {
        let mut table = table();
        let row = Row::new(Geometry::Point(point!(x: 1.0, y: 2.0)))
            .with("BuildingId", "A1")
            .with("BUILDNAME", "City Hall");
        table.insert(&dataset(), vec![row]).unwrap();

        let mut moved = Row::new(Geometry::Point(point!(x: 5.0, y: 6.0)));
        moved.oid = 1;
        table.update(&dataset(), vec![moved]).unwrap();

        assert_eq!(
            table.rows[0].shape,
            Some(Geometry::Point(point!(x: 5.0, y: 6.0)))
        );
        assert_eq!(table.rows[0].get("BUILDNAME"), &json!("City Hall"));
    }

    #[test]
    fn update_unknown_row() {
        let mut table = table();
        let mut row = Row::new(Geometry::Point(point!(x: 1.0, y: 2.0)));
        row.oid = 9;
        assert!(matches!(
            table.update(&dataset(), vec![row]),
            Err(StoreError::UnknownRow { oid: 9, .. })
        ));
    }

    #[test]
    fn rejects_unknown_fields_and_shapes() {
        let mut table = table();
        let row = Row::new(Geometry::Point(point!(x: 1.0, y: 2.0))).with("Nope", 1);
        assert!(matches!(
            table.insert(&dataset(), vec![row]),
            Err(StoreError::MissingField { field, .. }) if field == "Nope"
        ));

        let line = geo::LineString::from(vec![(0.0, 0.0), (1.0, 1.0)]);
        assert!(matches!(
            table.insert(&dataset(), vec![Row::new(Geometry::LineString(line))]),
            Err(StoreError::WrongGeometry { .. })
        ));
    }

    #[test]
    fn project_keeps_requested_fields() {
        let mut table = table();
        let row = Row::new(Geometry::Point(point!(x: 1.0, y: 2.0)))
            .with("BuildingId", "A1")
            .with("BUILDNAME", "City Hall");
        table.insert(&dataset(), vec![row]).unwrap();

        let rows = table.project(&dataset(), &["BuildingId"]).unwrap();
        assert_eq!(rows[0].attributes.len(), 1);
        assert_eq!(rows[0].get("BuildingId"), &json!("A1"));
        assert!(table.project(&dataset(), &["AssetID"]).is_err());
    }
}
