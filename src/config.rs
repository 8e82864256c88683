use std::{
    fmt,
    fs::read_to_string,
    path::{Path, PathBuf},
    str::FromStr,
};

use anyhow::{bail, Context, Result};
use chrono::Local;
use serde::{Deserialize, Serialize};

use crate::store::Dataset;

/// Where a facility dataset lives and which fields hold its join key and name.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Source {
    pub workspace: PathBuf,
    pub name: String,
    pub id_field: String,
    pub name_field: String,
}

impl Source {
    pub fn dataset(&self) -> Dataset {
        Dataset::new(&self.workspace, &self.name)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    pub baseline: Source,
    pub candidate: Source,
    pub output_workspace: PathBuf,
    /// Update a run-tagged copy of the baseline placed here instead of the
    /// baseline itself.
    #[serde(default)]
    pub snapshot_workspace: Option<PathBuf>,
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        let contents = read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        serde_yaml::from_str(&contents)
            .with_context(|| format!("failed to parse config {}", path.display()))
    }
}

/// Namespaces the datasets written by one invocation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RunTag(String);

impl RunTag {
    pub fn now() -> Self {
        Self(Local::now().format("%Y%m%d_%H%M%S").to_string())
    }
}

impl FromStr for RunTag {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() || !s.chars().all(|x| x.is_ascii_alphanumeric() || x == '_' || x == '-') {
            bail!("Invalid run tag: {s:?}");
        }
        Ok(Self(s.to_string()))
    }
}

impl fmt::Display for RunTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
