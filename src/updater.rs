use std::{
    collections::{BTreeMap, VecDeque},
    path::Path,
};

use facility_model::{FacilityRecord, Identifier, Oid};
use geo::Geometry;
use itertools::Itertools;
use log::{info, warn};

use crate::{
    config::{RunTag, Source},
    facilities,
    store::{Dataset, RecordStore, Row, StoreError},
};

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Change {
    Moved,
    Inserted,
}

/// A baseline row touched by an update pass.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Affected {
    pub oid: Oid,
    pub identifier: Identifier,
    pub change: Change,
}

#[derive(Debug)]
pub struct UpdateReport {
    pub dataset: Dataset,
    /// In the order the rows were touched: moves first, then inserts.
    pub affected: Vec<Affected>,
    /// Candidate records dropped for having no identifier.
    pub skipped: usize,
    /// Surplus candidates whose identifier never matched a baseline row, so
    /// there was no row to clone for them.
    pub unplaced: Vec<FacilityRecord>,
}

impl UpdateReport {
    pub fn count(&self, change: Change) -> usize {
        self.affected.iter().filter(|x| x.change == change).count()
    }
}

/// Copies the baseline into `workspace` as `<name>_<run tag>` and returns a
/// source pointing at the copy.
pub fn snapshot<S: RecordStore>(
    store: &mut S,
    baseline: &Source,
    workspace: &Path,
    run_tag: &RunTag,
) -> Result<Source, StoreError> {
    let name = format!("{}_{run_tag}", baseline.name);
    let copy = store.copy(&baseline.dataset(), workspace, &name)?;
    info!("updating snapshot {copy}");

    Ok(Source {
        workspace: copy.workspace,
        name: copy.name,
        ..baseline.clone()
    })
}

/// Moves baseline rows onto the candidate positions sharing their identifier.
///
/// Candidates sharing an identifier are handed out in scan order, one per
/// baseline row. When candidates outnumber the baseline rows for an
/// identifier, the last matched row is cloned once per surplus candidate.
pub fn run<S: RecordStore>(
    store: &mut S,
    baseline: &Source,
    candidate: &Source,
) -> Result<UpdateReport, StoreError> {
    let mut queues: BTreeMap<Identifier, VecDeque<FacilityRecord>> = BTreeMap::new();
    let mut skipped = 0;
    for x in facilities::scan(&*store, candidate)? {
        match x.identifier.clone() {
            Some(id) => queues.entry(id).or_default().push_back(x),
            None => skipped += 1,
        }
    }

    let dataset = baseline.dataset();
    let schema = store.describe(&dataset)?;
    schema.require(&dataset, &[baseline.id_field.as_str()])?;

    // read everything before writing anything back
    let rows: Vec<Row> = store.search(&dataset, &schema.field_names())?.collect();

    let mut affected = Vec::new();
    let mut updates = Vec::new();
    let mut templates: BTreeMap<Identifier, Row> = BTreeMap::new();
    for row in rows {
        let Some(id) = Identifier::from_value(row.get(&baseline.id_field)) else {
            continue;
        };
        let Some(queue) = queues.get_mut(&id) else {
            continue;
        };
        let Some(next) = queue.pop_front() else {
            continue;
        };

        let row = row.with_shape(Geometry::Point(next.point));
        affected.push(Affected {
            oid: row.oid,
            identifier: id.clone(),
            change: Change::Moved,
        });
        if queue.is_empty() {
            queues.remove(&id);
        } else {
            templates.insert(id, row.clone());
        }
        updates.push(row);
    }
    store.update(&dataset, updates)?;

    let mut inserts = Vec::new();
    let mut inserted = Vec::new();
    let mut unplaced = Vec::new();
    for (id, queue) in queues {
        let Some(template) = templates.get(&id) else {
            warn!(
                "{id} has {} candidate(s) but no baseline row, not inserted: {}",
                queue.len(),
                queue.iter().map(|x| x.oid).join(", ")
            );
            unplaced.extend(queue);
            continue;
        };

        for x in queue {
            inserts.push(template.clone().with_shape(Geometry::Point(x.point)));
            inserted.push(id.clone());
        }
    }

    let oids = store.insert(&dataset, inserts)?;
    affected.extend(oids.into_iter().zip(inserted).map(|(oid, identifier)| Affected {
        oid,
        identifier,
        change: Change::Inserted,
    }));

    let report = UpdateReport {
        dataset,
        affected,
        skipped,
        unplaced,
    };
    info!(
        "{} moved, {} inserted in {}",
        report.count(Change::Moved),
        report.count(Change::Inserted),
        report.dataset
    );
    Ok(report)
}
