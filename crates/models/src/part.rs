//! Part results: incremental snapshots appended to a counter's `parts` log.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::errors::ModelError;
use crate::json_text;

/// Layout of `created_at` inside part entries.
pub const PART_TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

const FIELD: &str = "parts";

/// Tallies reported for one sub-batch.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartTally {
    pub current: i32,
    pub total: i32,
    pub defects: i32,
    pub correct: i32,
}

/// One stored entry. Field order is the stored key order.
///
/// Keys this crate does not know are kept in `extra` and written back after
/// the known ones, so rewriting the log never drops them.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartEntry {
    pub current: i64,
    pub total: i64,
    pub defects: i64,
    pub correct: i64,
    pub created_at: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl PartEntry {
    pub fn stamped(tally: PartTally, at: NaiveDateTime) -> Self {
        Self {
            current: tally.current.into(),
            total: tally.total.into(),
            defects: tally.defects.into(),
            correct: tally.correct.into(),
            created_at: at.format(PART_TIMESTAMP_FORMAT).to_string(),
            extra: Map::new(),
        }
    }
}

pub fn decode_stored(stored: Option<&str>) -> Result<Vec<PartEntry>, ModelError> {
    match stored.map(str::trim) {
        None | Some("") => Ok(Vec::new()),
        Some(text) => serde_json::from_str::<Option<Vec<PartEntry>>>(text)
            .map(Option::unwrap_or_default)
            .map_err(|source| ModelError::CorruptJson { field: FIELD, source }),
    }
}

/// Append `entry` and restore newest-first order. The sort is stable, so
/// entries sharing a timestamp keep their insertion order.
pub fn append(parts: &mut Vec<PartEntry>, entry: PartEntry) {
    parts.push(entry);
    parts.sort_by(|a, b| b.created_at.cmp(&a.created_at));
}

pub fn encode(parts: &[PartEntry]) -> Result<String, ModelError> {
    json_text::to_text(parts).map_err(|source| ModelError::InvalidJson { field: FIELD, source })
}
