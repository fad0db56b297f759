//! Wire shapes exchanged with the remote datasource.
//!
//! All shapes serialize as camelCase JSON. Criteria on a request accept both
//! the flat `{field: value}` form and the advanced `{operator, ...}` tree;
//! normalization happens in the cache manager, against the schema.

use std::cmp::Ordering;
use std::ops::Range;

use serde::{Deserialize, Deserializer, Serialize};

use recordset_core::{Criteria, Record, TextMatchStyle};

/// Default page length when a request carries no explicit `endRow`.
pub const DEFAULT_PAGE_SIZE: usize = 75;

/// One fetch against the remote datasource.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FetchRequest {
    #[serde(default)]
    pub criteria: Criteria,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_row: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_row: Option<usize>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sort_by: Vec<SortSpecifier>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text_match_style: Option<TextMatchStyle>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operation_id: Option<String>,
}

impl FetchRequest {
    /// The `[start, end)` row range this request asks for, with missing
    /// bounds defaulted to the first page.
    #[must_use]
    pub fn row_range(&self) -> Range<usize> {
        let start = self.start_row.unwrap_or(0);
        let end = self.end_row.unwrap_or(start + DEFAULT_PAGE_SIZE).max(start);
        start..end
    }
}

/// The datasource's answer to one [`FetchRequest`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FetchResponse {
    /// `0` is success; anything else is surfaced as a fetch error and never
    /// touches the cache.
    pub status: i32,
    #[serde(default)]
    pub data: Vec<Record>,
    pub start_row: usize,
    pub end_row: usize,
    /// Absent when the server did not compute the true dataset size
    /// (progressive loading).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_rows: Option<usize>,
}

impl FetchResponse {
    pub const STATUS_OK: i32 = 0;

    /// Successful response carrying `data` for rows starting at `start_row`.
    #[must_use]
    pub fn ok(start_row: usize, data: Vec<Record>, total_rows: Option<usize>) -> Self {
        let end_row = start_row + data.len();
        Self {
            status: Self::STATUS_OK,
            data,
            start_row,
            end_row,
            total_rows,
        }
    }
}

/// Kind of change pushed from elsewhere in the application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SyncOperation {
    Add,
    Update,
    Remove,
}

/// A data change to fold into the cache without refetching.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheSyncEvent {
    pub operation_type: SyncOperation,
    /// A single record or an array of records on the wire.
    #[serde(deserialize_with = "one_or_many")]
    pub data: Vec<Record>,
}

impl CacheSyncEvent {
    #[must_use]
    pub fn new(operation_type: SyncOperation, data: Vec<Record>) -> Self {
        Self {
            operation_type,
            data,
        }
    }
}

fn one_or_many<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<Record>, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum OneOrMany {
        Many(Vec<Record>),
        One(Record),
    }
    Ok(match OneOrMany::deserialize(deserializer)? {
        OneOrMany::Many(records) => records,
        OneOrMany::One(record) => vec![record],
    })
}

/// Sort direction for one field.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

/// One element of a multi-field sort.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SortSpecifier {
    pub field: String,
    #[serde(default)]
    pub direction: SortDirection,
}

impl SortSpecifier {
    #[must_use]
    pub fn asc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: SortDirection::Asc,
        }
    }

    #[must_use]
    pub fn desc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: SortDirection::Desc,
        }
    }
}

/// Orders two records under a multi-field sort. Incomparable or missing
/// values sort as equal, preserving existing relative order.
#[must_use]
pub fn compare_records(sort_by: &[SortSpecifier], a: &Record, b: &Record) -> Ordering {
    use recordset_core::FieldValue;
    for spec in sort_by {
        let left = a.get(&spec.field).unwrap_or(&FieldValue::Null);
        let right = b.get(&spec.field).unwrap_or(&FieldValue::Null);
        let ord = left.partial_cmp_value(right, true).unwrap_or(Ordering::Equal);
        let ord = match spec.direction {
            SortDirection::Asc => ord,
            SortDirection::Desc => ord.reverse(),
        };
        if ord != Ordering::Equal {
            return ord;
        }
    }
    Ordering::Equal
}

#[cfg(test)]
mod tests {
    use super::*;
    use recordset_core::FieldValue;
    use serde_json::json;

    // ---- Requests ----

    #[test]
    fn request_accepts_simple_and_advanced_criteria() {
        let simple: FetchRequest = serde_json::from_value(json!({
            "criteria": {"name": "alice"},
            "startRow": 0,
            "endRow": 75
        }))
        .unwrap();
        assert!(matches!(simple.criteria, Criteria::Simple(_)));

        let advanced: FetchRequest = serde_json::from_value(json!({
            "criteria": {"operator": "and", "criteria": [
                {"fieldName": "name", "operator": "iContains", "value": "al"}
            ]},
            "sortBy": [{"field": "name", "direction": "desc"}],
            "textMatchStyle": "substring"
        }))
        .unwrap();
        assert!(matches!(advanced.criteria, Criteria::Advanced(_)));
        assert_eq!(advanced.sort_by[0].direction, SortDirection::Desc);
        assert_eq!(advanced.text_match_style, Some(TextMatchStyle::Substring));
    }

    #[test]
    fn row_range_defaults_to_first_page() {
        let request = FetchRequest::default();
        assert_eq!(request.row_range(), 0..DEFAULT_PAGE_SIZE);
        let paged = FetchRequest {
            start_row: Some(150),
            end_row: Some(225),
            ..FetchRequest::default()
        };
        assert_eq!(paged.row_range(), 150..225);
    }

    // ---- Responses ----

    #[test]
    fn response_total_rows_may_be_absent() {
        let response: FetchResponse = serde_json::from_value(json!({
            "status": 0,
            "data": [{"id": 1}],
            "startRow": 0,
            "endRow": 1
        }))
        .unwrap();
        assert_eq!(response.total_rows, None);
        assert_eq!(response.data.len(), 1);
    }

    // ---- Sync events ----

    #[test]
    fn sync_event_accepts_single_or_array_data() {
        let single: CacheSyncEvent = serde_json::from_value(json!({
            "operationType": "update",
            "data": {"id": 1, "name": "Alice"}
        }))
        .unwrap();
        assert_eq!(single.operation_type, SyncOperation::Update);
        assert_eq!(single.data.len(), 1);

        let many: CacheSyncEvent = serde_json::from_value(json!({
            "operationType": "remove",
            "data": [{"id": 1}, {"id": 2}]
        }))
        .unwrap();
        assert_eq!(many.data.len(), 2);
    }

    // ---- Sorting ----

    #[test]
    fn compare_records_honors_direction_and_tiebreaks() {
        let a = Record::from_pairs([("name", FieldValue::from("alice")), ("age", FieldValue::Int(30))]);
        let b = Record::from_pairs([("name", FieldValue::from("alice")), ("age", FieldValue::Int(25))]);
        let by_name_then_age = [SortSpecifier::asc("name"), SortSpecifier::asc("age")];
        assert_eq!(compare_records(&by_name_then_age, &a, &b), Ordering::Greater);
        let by_age_desc = [SortSpecifier::desc("age")];
        assert_eq!(compare_records(&by_age_desc, &a, &b), Ordering::Less);
        assert_eq!(compare_records(&[], &a, &b), Ordering::Equal);
    }
}
