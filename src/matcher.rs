use std::collections::{BTreeMap, BTreeSet};

use facility_model::{Anomaly, FacilityRecord, Identifier, MatchLine, MatchType};
use geo::Geometry;
use log::{debug, info};

use crate::{
    config::{Config, RunTag},
    facilities, geometry,
    store::{Dataset, FieldSpec, FieldType, GeometryType, RecordStore, Row, StoreError},
};

pub const MATCH_LINES: &str = "matchLines";

pub fn match_line_fields() -> Vec<FieldSpec> {
    vec![
        FieldSpec::new("oldRecordId", FieldType::Long),
        FieldSpec::new("newRecordId", FieldType::Long),
        FieldSpec::new("oldIdentifier", FieldType::Text),
        FieldSpec::new("newIdentifier", FieldType::Text),
        FieldSpec::new("oldName", FieldType::Text),
        FieldSpec::new("newName", FieldType::Text),
        FieldSpec::new("nameEditDistance", FieldType::Long),
        FieldSpec::new("matchType", FieldType::Text),
    ]
}

#[derive(Debug)]
pub struct MatchReport {
    /// The match line dataset written by this run.
    pub dataset: Dataset,
    pub baseline_count: usize,
    pub candidate_count: usize,
    pub lines: Vec<MatchLine>,
    pub unmatched_baseline: Vec<FacilityRecord>,
    pub unmatched_candidate: Vec<FacilityRecord>,
    pub baseline_anomalies: Vec<Anomaly>,
    pub candidate_anomalies: Vec<Anomaly>,
}

impl MatchReport {
    pub fn matched(&self) -> usize {
        self.lines.len()
    }
}

/// Character edit distance between two names, absent if either is null.
pub fn name_distance(old: Option<&str>, new: Option<&str>) -> Option<usize> {
    Some(strsim::levenshtein(old?, new?))
}

/// Joins baseline and candidate on identifier and writes one line per match
/// to `matchLines_<run tag>` in the output workspace. Inputs are not modified.
///
/// Only the first candidate seen for an identifier takes part, and it pairs
/// with the first baseline record carrying that identifier.
pub fn run<S: RecordStore>(
    store: &mut S,
    config: &Config,
    run_tag: &RunTag,
) -> Result<MatchReport, StoreError> {
    let candidates = facilities::scan(&*store, &config.candidate)?;
    let candidate_count = candidates.len();

    let mut candidate_anomalies = Vec::new();
    let mut unmatched_candidate = Vec::new();
    let mut pool: BTreeMap<Identifier, FacilityRecord> = BTreeMap::new();
    for x in candidates {
        let Some(id) = x.identifier.clone() else {
            candidate_anomalies.push(Anomaly::MissingIdentifier { oid: x.oid });
            unmatched_candidate.push(x);
            continue;
        };

        // first seen wins, later duplicates never match
        if pool.contains_key(&id) {
            candidate_anomalies.push(Anomaly::DuplicateIdentifier {
                oid: x.oid,
                identifier: id,
            });
            unmatched_candidate.push(x);
        } else {
            pool.insert(id, x);
        }
    }

    let baseline = config.baseline.dataset();
    let schema = store.describe(&baseline)?;
    let output = store.create_feature_class(
        &config.output_workspace,
        &format!("{MATCH_LINES}_{run_tag}"),
        schema.spatial_reference,
        GeometryType::Polyline,
        &match_line_fields(),
    )?;

    let records = facilities::scan(&*store, &config.baseline)?;
    let baseline_count = records.len();

    let mut baseline_anomalies = Vec::new();
    let mut unmatched_baseline = Vec::new();
    let mut seen = BTreeSet::new();
    let mut lines = Vec::new();
    for old in records {
        let Some(id) = old.identifier.clone() else {
            baseline_anomalies.push(Anomaly::MissingIdentifier { oid: old.oid });
            unmatched_baseline.push(old);
            continue;
        };
        if !seen.insert(id.clone()) {
            baseline_anomalies.push(Anomaly::DuplicateIdentifier {
                oid: old.oid,
                identifier: id.clone(),
            });
        }

        // a candidate is consumed by its first match
        match pool.remove(&id) {
            Some(new) => lines.push(match_line(&old, &new, id)),
            None => unmatched_baseline.push(old),
        }
    }
    unmatched_candidate.extend(pool.into_values());

    let rows = lines.iter().map(line_row).collect();
    store.insert(&output, rows)?;

    info!("{} matched on identifier", lines.len());
    debug!(
        "{} baseline and {} candidate records left unmatched",
        unmatched_baseline.len(),
        unmatched_candidate.len()
    );

    Ok(MatchReport {
        dataset: output,
        baseline_count,
        candidate_count,
        lines,
        unmatched_baseline,
        unmatched_candidate,
        baseline_anomalies,
        candidate_anomalies,
    })
}

fn match_line(old: &FacilityRecord, new: &FacilityRecord, identifier: Identifier) -> MatchLine {
    MatchLine {
        old_oid: old.oid,
        new_oid: new.oid,
        new_identifier: new.identifier.clone().unwrap_or_else(|| identifier.clone()),
        old_identifier: identifier,
        old_name: old.name.clone(),
        new_name: new.name.clone(),
        name_edit_distance: name_distance(old.name.as_deref(), new.name.as_deref()),
        match_type: MatchType::Id,
        line: geometry::polyline(&[old.point, new.point]),
    }
}

fn line_row(x: &MatchLine) -> Row {
    Row::new(Geometry::LineString(x.line.clone()))
        .with("oldRecordId", x.old_oid)
        .with("newRecordId", x.new_oid)
        .with("oldIdentifier", x.old_identifier.as_str())
        .with("newIdentifier", x.new_identifier.as_str())
        .with("oldName", x.old_name.clone())
        .with("newName", x.new_name.clone())
        .with("nameEditDistance", x.name_edit_distance)
        .with("matchType", x.match_type.tag())
}

#[cfg(test)]
mod tests {
    use geo::point;
    use serde_json::{json, Value};

    use super::*;
    use crate::store::{fixtures, MemoryStore};

    fn config() -> Config {
        Config {
            baseline: fixtures::baseline(),
            candidate: fixtures::candidate(),
            output_workspace: "outputs".into(),
            snapshot_workspace: None,
        }
    }

    fn tag() -> RunTag {
        "20240101_120000".parse().unwrap()
    }

    fn run_with(
        baseline: &[(Value, Option<&str>, (f64, f64))],
        candidate: &[(Value, Option<&str>, (f64, f64))],
    ) -> (MemoryStore, MatchReport) {
        let mut store = fixtures::store(
            fixtures::table(&fixtures::baseline(), &[], baseline),
            fixtures::table(&fixtures::candidate(), &[], candidate),
        );
        let report = run(&mut store, &config(), &tag()).unwrap();
        (store, report)
    }

    #[test]
    fn name_distances() {
        assert_eq!(name_distance(Some("City Hall"), Some("City Hal")), Some(1));
        assert_eq!(name_distance(Some("City Hall"), Some("City Hall")), Some(0));
        assert_eq!(name_distance(None, None), None);
        assert_eq!(name_distance(Some("City Hall"), None), None);
    }

    #[test]
    fn unique_identifiers_match_once() {
        let (store, report) = run_with(
            &[
                (json!("A1"), Some("City Hall"), (0.0, 0.0)),
                (json!("B2"), Some("Library"), (10.0, 10.0)),
            ],
            &[
                (json!("B2"), None, (11.0, 11.0)),
                (json!("A1"), Some("City Hal"), (1.0, 1.0)),
            ],
        );

        assert_eq!(report.matched(), 2);
        assert!(report.unmatched_baseline.is_empty());
        assert!(report.unmatched_candidate.is_empty());

        let a1 = &report.lines[0];
        assert_eq!(a1.old_identifier, Identifier::from("A1"));
        assert_eq!((a1.old_oid, a1.new_oid), (1, 2));
        assert_eq!(a1.name_edit_distance, Some(1));
        assert_eq!(
            a1.line,
            geometry::polyline(&[point!(x: 0.0, y: 0.0), point!(x: 1.0, y: 1.0)])
        );
        assert_eq!(report.lines[1].name_edit_distance, None);

        assert_eq!(report.dataset, Dataset::new("outputs", "matchLines_20240101_120000"));
        let table = store.table(&report.dataset).unwrap();
        assert_eq!(table.schema.geometry_type, GeometryType::Polyline);
        assert_eq!(table.schema.spatial_reference.wkid, fixtures::WKID);
        assert_eq!(table.rows.len(), 2);
        assert_eq!(table.rows[0].get("matchType"), &json!("ID"));
        assert_eq!(table.rows[0].get("nameEditDistance"), &json!(1));
        assert_eq!(table.rows[1].get("nameEditDistance"), &Value::Null);
        assert_eq!(table.rows[1].get("newName"), &Value::Null);
    }

    #[test]
    fn missing_identifiers_never_match() {
        let (store, report) = run_with(
            &[
                (Value::Null, Some("Shed"), (0.0, 0.0)),
                (json!(""), Some("Garage"), (0.0, 0.0)),
            ],
            &[
                (Value::Null, Some("Shed"), (1.0, 1.0)),
                (json!(""), Some("Garage"), (1.0, 1.0)),
            ],
        );

        assert_eq!(report.matched(), 0);
        assert_eq!(report.unmatched_baseline.len(), 2);
        assert_eq!(report.unmatched_candidate.len(), 2);
        assert_eq!(report.candidate_anomalies.len(), 2);
        assert!(store.table(&report.dataset).unwrap().rows.is_empty());
    }

    #[test]
    fn first_candidate_matches_once() {
        let (store, report) = run_with(
            &[
                (json!("A1"), Some("North"), (0.0, 0.0)),
                (json!("A1"), Some("South"), (0.0, 5.0)),
                (json!("C3"), Some("Depot"), (9.0, 9.0)),
            ],
            &[
                (json!("A1"), Some("North"), (1.0, 0.0)),
                (json!("A1"), Some("South"), (1.0, 5.0)),
                (json!("A1"), Some("Annex"), (1.0, 7.0)),
                (json!("D4"), Some("Yard"), (4.0, 4.0)),
            ],
        );

        let pairs: Vec<_> = report.lines.iter().map(|x| (x.old_oid, x.new_oid)).collect();
        assert_eq!(pairs, vec![(1, 1)]);
        assert_eq!(store.table(&report.dataset).unwrap().rows.len(), 1);

        let unmatched: Vec<_> = report.unmatched_baseline.iter().map(|x| x.oid).collect();
        assert_eq!(unmatched, vec![2, 3]);
        let unmatched: Vec<_> = report.unmatched_candidate.iter().map(|x| x.oid).collect();
        assert_eq!(unmatched, vec![2, 3, 4]);
        assert_eq!(report.baseline_anomalies.len(), 1);
        assert_eq!(report.candidate_anomalies.len(), 2);
    }

    #[test]
    fn duplicate_pair_matches_first_only() {
        let (_, report) = run_with(
            &[
                (json!("A1"), Some("North"), (0.0, 0.0)),
                (json!("A1"), Some("South"), (0.0, 5.0)),
            ],
            &[
                (json!("A1"), Some("North"), (1.0, 0.0)),
                (json!("A1"), Some("South"), (1.0, 5.0)),
            ],
        );

        let pairs: Vec<_> = report.lines.iter().map(|x| (x.old_oid, x.new_oid)).collect();
        assert_eq!(pairs, vec![(1, 1)]);
        assert_eq!(report.unmatched_baseline.len(), 1);
        assert_eq!(report.unmatched_baseline[0].oid, 2);
        assert_eq!(report.unmatched_candidate.len(), 1);
        assert_eq!(report.unmatched_candidate[0].oid, 2);
    }

    #[test]
    fn numeric_identifiers_join_text() {
        let (_, report) = run_with(
            &[(json!(1042), Some("Courthouse"), (0.0, 0.0))],
            &[(json!("1042"), Some("Courthouse"), (0.0, 1.0))],
        );
        assert_eq!(report.matched(), 1);
        assert_eq!(report.lines[0].name_edit_distance, Some(0));
    }

    #[test]
    fn inputs_untouched() {
        let (store, _) = run_with(
            &[(json!("A1"), Some("City Hall"), (0.0, 0.0))],
            &[(json!("A1"), Some("City Hall"), (3.0, 3.0))],
        );
        assert_eq!(
            fixtures::point(&store, &fixtures::baseline(), 1),
            Some(point!(x: 0.0, y: 0.0))
        );
        assert_eq!(
            store
                .table(&fixtures::baseline().dataset())
                .unwrap()
                .rows
                .len(),
            1
        );
    }

    #[test]
    fn output_name_collision() {
        let mut store = fixtures::store(
            fixtures::table(&fixtures::baseline(), &[], &[]),
            fixtures::table(&fixtures::candidate(), &[], &[]),
        );
        run(&mut store, &config(), &tag()).unwrap();
        assert!(matches!(
            run(&mut store, &config(), &tag()),
            Err(StoreError::AlreadyExists { .. })
        ));
    }
}
