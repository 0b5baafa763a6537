//! Caller-supplied key/value metadata stored as a flat JSON object.

use serde_json::{Map, Value};

use crate::errors::ModelError;
use crate::json_text;

pub type CustomFields = Map<String, Value>;

const FIELD: &str = "custom_fields";

/// Parse caller input. Blank input and JSON `null` carry no fields.
pub fn parse_input(raw: &str) -> Result<CustomFields, ModelError> {
    if raw.trim().is_empty() {
        return Ok(CustomFields::new());
    }
    let value: Value =
        serde_json::from_str(raw).map_err(|source| ModelError::InvalidJson { field: FIELD, source })?;
    match value {
        Value::Object(fields) => Ok(fields),
        Value::Null => Ok(CustomFields::new()),
        _ => Err(ModelError::Validation("custom_fields must be a JSON object".into())),
    }
}

/// Decode the stored column; a missing or blank value is an empty object.
pub fn decode_stored(stored: Option<&str>) -> Result<CustomFields, ModelError> {
    match stored.map(str::trim) {
        None | Some("") => Ok(CustomFields::new()),
        Some(text) => serde_json::from_str::<Option<CustomFields>>(text)
            .map(Option::unwrap_or_default)
            .map_err(|source| ModelError::CorruptJson { field: FIELD, source }),
    }
}

/// Shallow merge: keys from `incoming` overwrite those in `existing`.
pub fn merge(mut existing: CustomFields, incoming: CustomFields) -> CustomFields {
    existing.extend(incoming);
    existing
}

pub fn encode(fields: &CustomFields) -> Result<String, ModelError> {
    json_text::to_text(fields).map_err(|source| ModelError::InvalidJson { field: FIELD, source })
}
