use std::{
    fmt::{self, Write},
    fs,
    path::Path,
};

use anyhow::{Context, Result};
use facility_model::{Anomaly, FacilityRecord};
use itertools::Itertools;

use crate::{
    matcher::MatchReport,
    updater::{Change, UpdateReport},
};

fn percent(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        return 0.0;
    }
    part as f64 / whole as f64 * 100.0
}

fn records(md: &mut String, title: &str, records: &[FacilityRecord]) -> fmt::Result {
    if records.is_empty() {
        return Ok(());
    }
    writeln!(md, "- {title}:")?;
    for x in records {
        let id = x.identifier.as_ref().map(|x| x.as_str()).unwrap_or("-");
        let name = x.name.as_deref().unwrap_or("-");
        writeln!(md, "  - row {} {id} {name:?}", x.oid)?;
    }
    Ok(())
}

fn anomalies(md: &mut String, title: &str, anomalies: &[Anomaly]) -> fmt::Result {
    if anomalies.is_empty() {
        return Ok(());
    }
    writeln!(md, "- {title}:")?;
    for x in anomalies {
        writeln!(md, "  - {x}")?;
    }
    Ok(())
}

pub fn match_summary(report: &MatchReport) -> Result<String, fmt::Error> {
    let mut todo = String::new();
    records(&mut todo, "didn't match with candidate", &report.unmatched_baseline)?;
    records(&mut todo, "didn't match with baseline", &report.unmatched_candidate)?;
    anomalies(&mut todo, "baseline anomalies", &report.baseline_anomalies)?;
    anomalies(&mut todo, "candidate anomalies", &report.candidate_anomalies)?;

    let renamed = report
        .lines
        .iter()
        .filter(|x| x.name_edit_distance.is_some_and(|d| d > 0))
        .count();

    let mut md = String::new();
    writeln!(md, "## Statistics\n")?;
    writeln!(
        md,
        "- {} baseline, {} candidate",
        report.baseline_count, report.candidate_count
    )?;
    writeln!(md, "- {} matched on identifier", report.matched())?;
    writeln!(md, "- {renamed} matched with a different name")?;
    writeln!(
        md,
        "- {:.01}% conflated",
        percent(report.matched(), report.baseline_count)
    )?;
    writeln!(md)?;
    if !todo.is_empty() {
        writeln!(md, "## Todo\n")?;
        writeln!(md, "{todo}")?;
    }
    Ok(md)
}

/// A dry run computed `report` against in-memory copies, so nothing was saved.
pub fn update_summary(report: &UpdateReport, dry_run: bool) -> Result<String, fmt::Error> {
    let mut todo = String::new();
    if report.skipped > 0 {
        writeln!(
            todo,
            "- {} candidate(s) without identifier were skipped",
            report.skipped
        )?;
    }
    records(&mut todo, "no baseline row to clone", &report.unplaced)?;

    let mut md = String::new();
    writeln!(md, "## Statistics\n")?;
    if dry_run {
        writeln!(md, "- dry run, nothing written to {}", report.dataset)?;
    } else {
        writeln!(md, "- updated {}", report.dataset)?;
    }
    writeln!(md, "- {} moved", report.count(Change::Moved))?;
    writeln!(md, "- {} inserted", report.count(Change::Inserted))?;
    writeln!(md)?;
    if !report.affected.is_empty() {
        writeln!(md, "## Affected\n")?;
        writeln!(
            md,
            "{}\n",
            report.affected.iter().map(|x| x.oid).join(", ")
        )?;
    }
    if !todo.is_empty() {
        writeln!(md, "## Todo\n")?;
        writeln!(md, "{todo}")?;
    }
    Ok(md)
}

pub fn write(path: &Path, md: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, md).with_context(|| format!("failed to write {}", path.display()))
}
