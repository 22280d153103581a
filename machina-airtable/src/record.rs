//! Wire types for the remote tabular store
//!
//! Records carry a dynamically-typed field map keyed by human-readable
//! names. Unknown keys are tolerated, never rejected. Extraction goes
//! through explicit helpers rather than direct indexing so missing or
//! mistyped fields fail predictably.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A row in the remote tabular store.
///
/// `fields` is optional on the wire: a record missing it entirely is
/// structurally unusable and must never reach the schema mapper, so every
/// consumer checks for its presence explicitly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExternalRecord {
    /// Opaque identifier, immutable, assigned by the remote store.
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fields: Option<Map<String, Value>>,
    /// Set by the remote store on creation; the external schema has no
    /// separate update timestamp.
    #[serde(
        rename = "createdTime",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub created_time: Option<DateTime<Utc>>,
}

/// One page of a list response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordPage {
    pub records: Vec<ExternalRecord>,
    /// Pagination token for the next page, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub offset: Option<String>,
}

/// Detect the single-record response shape.
///
/// The remote API is not consistent here: a record may arrive wrapped
/// under a `record` key or with its fields at the top level. Both shapes
/// are handled; anything else yields `None` so the caller can log and
/// degrade instead of crashing.
pub fn parse_single_record(body: &Value) -> Option<ExternalRecord> {
    let candidate = match body.get("record") {
        Some(wrapped) if wrapped.is_object() => wrapped,
        _ => body,
    };

    if !candidate.get("id").map(Value::is_string).unwrap_or(false) {
        return None;
    }

    serde_json::from_value(candidate.clone()).ok()
}

// ============================================================================
// FIELD EXTRACTION HELPERS
// ============================================================================

/// A string field, or `None` if absent or not a string.
pub fn str_field<'a>(fields: &'a Map<String, Value>, name: &str) -> Option<&'a str> {
    fields.get(name).and_then(Value::as_str)
}

/// A boolean field; absent or mistyped reads as `false`.
pub fn bool_field(fields: &Map<String, Value>, name: &str) -> bool {
    fields.get(name).and_then(Value::as_bool).unwrap_or(false)
}

// =============================================================================
// TESTS
// =============================================================================
