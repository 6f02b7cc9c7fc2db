//! Staging collection types: scraped documents waiting to be migrated.

use chrono::{DateTime, Utc};
use collegecms_shared::{CollegeCmsError, RawScrapedRecord, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Lifecycle of a staged document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StagedStatus {
    Draft,
    Migrated,
    Failed,
}

impl StagedStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Migrated => "migrated",
            Self::Failed => "failed",
        }
    }
}

impl std::fmt::Display for StagedStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for StagedStatus {
    type Err = CollegeCmsError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "draft" => Ok(Self::Draft),
            "migrated" => Ok(Self::Migrated),
            "failed" => Ok(Self::Failed),
            other => Err(CollegeCmsError::validation(format!(
                "unknown staged status '{other}'"
            ))),
        }
    }
}

/// One staged scraped document.
#[derive(Debug, Clone)]
pub struct StagedRecord {
    /// Opaque source-side key (UUID v7), unrelated to the canonical id.
    pub id: String,
    pub source_url: Option<String>,
    pub status: StagedStatus,
    pub document: RawScrapedRecord,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Set `value` at a dotted `path` inside `doc`, creating intermediate objects.
///
/// Numeric segments index into existing arrays. Fails when the path is empty
/// or runs through a scalar.
pub fn set_path(doc: &mut Value, path: &str, value: Value) -> Result<()> {
    let segments: Vec<&str> = path.split('.').collect();
    let Some((last, parents)) = segments
        .split_last()
        .filter(|_| segments.iter().all(|s| !s.is_empty()))
    else {
        return Err(CollegeCmsError::validation(format!(
            "invalid field path '{path}'"
        )));
    };
    let mut cursor = doc;
    for segment in parents {
        cursor = step_into(cursor, segment, path)?;
    }

    match cursor {
        Value::Object(map) => {
            map.insert((*last).to_string(), value);
            Ok(())
        }
        Value::Array(items) => {
            let slot = last
                .parse::<usize>()
                .ok()
                .and_then(|i| items.get_mut(i))
                .ok_or_else(|| {
                    CollegeCmsError::validation(format!(
                        "'{last}' is not a valid index in '{path}'"
                    ))
                })?;
            *slot = value;
            Ok(())
        }
        _ => Err(CollegeCmsError::validation(format!(
            "cannot set '{path}': parent is not an object"
        ))),
    }
}

fn step_into<'a>(cursor: &'a mut Value, segment: &str, path: &str) -> Result<&'a mut Value> {
    if cursor.is_null() {
        *cursor = Value::Object(Map::new());
    }
    match cursor {
        Value::Object(map) => Ok(map
            .entry(segment.to_string())
            .or_insert_with(|| Value::Object(Map::new()))),
        Value::Array(items) => segment
            .parse::<usize>()
            .ok()
            .and_then(|i| items.get_mut(i))
            .ok_or_else(|| {
                CollegeCmsError::validation(format!(
                    "'{segment}' is not a valid index in '{path}'"
                ))
            }),
        _ => Err(CollegeCmsError::validation(format!(
            "cannot set '{path}': '{segment}' runs through a scalar"
        ))),
    }
}
