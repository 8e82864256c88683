use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Row id assigned by a record store. Unique within one dataset only.
pub type Oid = u64;

/// Cross-dataset join key for a facility (`AssetID`, `BuildingId`, ...).
///
/// Numbers are kept as their decimal text so a numeric key in one dataset
/// joins a text key in the other.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Identifier(String);

impl Identifier {
    /// Reads an identifier out of a field value. Null and empty strings are
    /// "no identifier".
    pub fn from_value(value: &Value) -> Option<Self> {
        let raw = match value {
            Value::String(x) => x.clone(),
            Value::Number(x) => {
                if let Some(x) = x.as_i64() {
                    x.to_string()
                } else if let Some(x) = x.as_u64() {
                    x.to_string()
                } else {
                    match x.as_f64() {
                        // LONG fields sometimes come through as 1234.0
                        Some(f) if f.fract() == 0.0 && f.abs() < 1e15 => format!("{}", f as i64),
                        _ => x.to_string(),
                    }
                }
            }
            _ => return None,
        };

        if raw.is_empty() {
            return None;
        }
        Some(Self(raw))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for Identifier {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Debug for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}
