use std::fmt;

use geo::{LineString, Point};

mod id;

pub use id::{Identifier, Oid};

/// A facility row from either the baseline or the candidate dataset.
#[derive(Clone, Debug, PartialEq)]
pub struct FacilityRecord {
    pub oid: Oid,
    pub identifier: Option<Identifier>,
    pub name: Option<String>,
    pub point: Point,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum MatchType {
    Id,
}

impl MatchType {
    pub fn tag(&self) -> &'static str {
        match self {
            Self::Id => "ID",
        }
    }
}

impl fmt::Display for MatchType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.tag())
    }
}

/// Diagnostic line between a baseline record and the candidate it matched.
#[derive(Clone, Debug, PartialEq)]
pub struct MatchLine {
    pub old_oid: Oid,
    pub new_oid: Oid,
    pub old_identifier: Identifier,
    pub new_identifier: Identifier,
    pub old_name: Option<String>,
    pub new_name: Option<String>,
    pub name_edit_distance: Option<usize>,
    pub match_type: MatchType,
    pub line: LineString,
}

/// Data quality problems that are tracked, never raised.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Anomaly {
    MissingIdentifier { oid: Oid },
    DuplicateIdentifier { oid: Oid, identifier: Identifier },
}

impl fmt::Display for Anomaly {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingIdentifier { oid } => write!(f, "row {oid} has no identifier"),
            Self::DuplicateIdentifier { oid, identifier } => {
                write!(f, "row {oid} repeats identifier {identifier}")
            }
        }
    }
}
