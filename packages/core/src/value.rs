//! Runtime field values and records.
//!
//! [`FieldValue`] is the tagged union stored in record fields and carried in
//! criteria leaves. Equality and ordering are type-aware: `Int` and `Float`
//! compare numerically against each other, text compares lexicographically
//! (optionally case-folded), and temporal variants compare chronologically.
//!
//! [`Record`] is an insertion-ordered mapping of field name to value. Field
//! order is preserved through (de)serialization, and field names are unique
//! within a record (`set` replaces in place).

use std::cmp::Ordering;
use std::fmt;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::de::{MapAccess, SeqAccess, Visitor};
use serde::ser::{SerializeMap, SerializeSeq};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::schema::FieldType;

/// Datetime formats accepted when coercing text to a `DateTime` value.
/// Order matters: more specific formats first.
const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S",
];

/// Time-of-day formats accepted when coercing text to a `Time` value.
const TIME_FORMATS: &[&str] = &["%H:%M:%S%.f", "%H:%M:%S", "%H:%M"];

/// A typed runtime value held by a record field or a criterion leaf.
///
/// Serializes to the natural JSON representation; temporal variants use
/// ISO-8601 strings on the wire. Nested JSON objects are not valid field
/// values and are rejected on deserialization.
#[derive(Debug, Clone, Default)]
pub enum FieldValue {
    /// Absent / JSON null.
    #[default]
    Null,
    /// Boolean.
    Bool(bool),
    /// Signed 64-bit integer.
    Int(i64),
    /// 64-bit IEEE 754 float.
    Float(f64),
    /// UTF-8 text.
    Text(String),
    /// Calendar date (no time component).
    Date(NaiveDate),
    /// Date with time-of-day, no timezone.
    DateTime(NaiveDateTime),
    /// Time-of-day only.
    Time(NaiveTime),
    /// Ordered list of values; used by `inSet`-style criteria and
    /// multi-valued record fields.
    Array(Vec<FieldValue>),
}

impl FieldValue {
    /// Returns `true` for `Null`.
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, FieldValue::Null)
    }

    /// Returns `true` for `Null` or empty text ("blank" semantics).
    #[must_use]
    pub fn is_blank(&self) -> bool {
        match self {
            FieldValue::Null => true,
            FieldValue::Text(s) => s.is_empty(),
            _ => false,
        }
    }

    /// Borrows the text payload, or `None` for non-text variants.
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            FieldValue::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Renders a value as the text used for substring-style matching.
    ///
    /// Numbers render as their decimal display form (`10`, `1.5`); text
    /// passes through. Boolean and temporal values return `None` -- they are
    /// never subject to substring matching.
    #[must_use]
    pub fn render_text(&self) -> Option<String> {
        match self {
            FieldValue::Text(s) => Some(s.clone()),
            FieldValue::Int(n) => Some(n.to_string()),
            FieldValue::Float(n) => Some(n.to_string()),
            _ => None,
        }
    }

    /// Attempts to coerce this value to the given declared field type.
    ///
    /// Used when a criterion value arrives in a looser representation than
    /// the schema declares (e.g. an ISO date string against a `Date` field,
    /// or `"42"` against an `Integer` field). Returns `None` when the value
    /// cannot represent the target type.
    #[must_use]
    pub fn coerce_to(&self, field_type: FieldType) -> Option<FieldValue> {
        match (self, field_type) {
            (FieldValue::Null, _) => Some(FieldValue::Null),
            (v @ FieldValue::Text(_), FieldType::Text) => Some(v.clone()),
            (FieldValue::Int(n), FieldType::Text) => Some(FieldValue::Text(n.to_string())),
            (FieldValue::Float(n), FieldType::Text) => Some(FieldValue::Text(n.to_string())),
            (v @ FieldValue::Int(_), FieldType::Integer | FieldType::Float) => Some(v.clone()),
            (v @ FieldValue::Float(_), FieldType::Float | FieldType::Integer) => Some(v.clone()),
            (FieldValue::Text(s), FieldType::Integer) => {
                s.trim().parse::<i64>().ok().map(FieldValue::Int)
            }
            (FieldValue::Text(s), FieldType::Float) => {
                s.trim().parse::<f64>().ok().map(FieldValue::Float)
            }
            (v @ FieldValue::Bool(_), FieldType::Boolean) => Some(v.clone()),
            (FieldValue::Text(s), FieldType::Boolean) => match s.as_str() {
                "true" => Some(FieldValue::Bool(true)),
                "false" => Some(FieldValue::Bool(false)),
                _ => None,
            },
            (v @ FieldValue::Date(_), FieldType::Date) => Some(v.clone()),
            (FieldValue::DateTime(dt), FieldType::Date) => Some(FieldValue::Date(dt.date())),
            (FieldValue::Text(s), FieldType::Date) => {
                NaiveDate::parse_from_str(s, "%Y-%m-%d").ok().map(FieldValue::Date)
            }
            (v @ FieldValue::DateTime(_), FieldType::DateTime) => Some(v.clone()),
            (FieldValue::Date(d), FieldType::DateTime) => {
                Some(FieldValue::DateTime(d.and_hms_opt(0, 0, 0)?))
            }
            (FieldValue::Text(s), FieldType::DateTime) => DATETIME_FORMATS
                .iter()
                .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
                .map(FieldValue::DateTime),
            (v @ FieldValue::Time(_), FieldType::Time) => Some(v.clone()),
            (FieldValue::Text(s), FieldType::Time) => TIME_FORMATS
                .iter()
                .find_map(|fmt| NaiveTime::parse_from_str(s, fmt).ok())
                .map(FieldValue::Time),
            (FieldValue::Array(items), _) => {
                let coerced: Option<Vec<FieldValue>> =
                    items.iter().map(|item| item.coerce_to(field_type)).collect();
                coerced.map(FieldValue::Array)
            }
            _ => None,
        }
    }

    /// Type-aware ordering between two values.
    ///
    /// `Int`/`Float` compare numerically in any combination. Text compares
    /// lexicographically, case-folded when `case_insensitive` is set.
    /// Temporal variants compare chronologically. Mismatched or unordered
    /// kinds (arrays, null) return `None`.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn partial_cmp_value(&self, other: &Self, case_insensitive: bool) -> Option<Ordering> {
        match (self, other) {
            (FieldValue::Int(a), FieldValue::Int(b)) => Some(a.cmp(b)),
            (FieldValue::Float(a), FieldValue::Float(b)) => a.partial_cmp(b),
            (FieldValue::Int(a), FieldValue::Float(b)) => (*a as f64).partial_cmp(b),
            (FieldValue::Float(a), FieldValue::Int(b)) => a.partial_cmp(&(*b as f64)),
            (FieldValue::Text(a), FieldValue::Text(b)) => {
                if case_insensitive {
                    Some(a.to_lowercase().cmp(&b.to_lowercase()))
                } else {
                    Some(a.cmp(b))
                }
            }
            (FieldValue::Bool(a), FieldValue::Bool(b)) => Some(a.cmp(b)),
            (FieldValue::Date(a), FieldValue::Date(b)) => Some(a.cmp(b)),
            (FieldValue::DateTime(a), FieldValue::DateTime(b)) => Some(a.cmp(b)),
            (FieldValue::Time(a), FieldValue::Time(b)) => Some(a.cmp(b)),
            _ => None,
        }
    }

    /// Case-insensitive equality: text folds case, everything else defers to
    /// ordinary equality.
    #[must_use]
    pub fn eq_ignore_case(&self, other: &Self) -> bool {
        match (self, other) {
            (FieldValue::Text(a), FieldValue::Text(b)) => a.to_lowercase() == b.to_lowercase(),
            _ => self == other,
        }
    }

    /// Converts from a generic JSON value. Numbers become `Int` when they fit
    /// in `i64`, otherwise `Float`; strings stay text (temporal coercion is
    /// schema-driven, not sniffed). Objects are rejected.
    ///
    /// # Errors
    ///
    /// Returns the offending JSON fragment's description when the value
    /// contains an object.
    pub fn from_json(value: &serde_json::Value) -> Result<FieldValue, String> {
        match value {
            serde_json::Value::Null => Ok(FieldValue::Null),
            serde_json::Value::Bool(b) => Ok(FieldValue::Bool(*b)),
            serde_json::Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Ok(FieldValue::Int(i))
                } else if let Some(f) = n.as_f64() {
                    Ok(FieldValue::Float(f))
                } else {
                    Err(format!("unrepresentable number: {n}"))
                }
            }
            serde_json::Value::String(s) => Ok(FieldValue::Text(s.clone())),
            serde_json::Value::Array(items) => items
                .iter()
                .map(FieldValue::from_json)
                .collect::<Result<Vec<_>, _>>()
                .map(FieldValue::Array),
            serde_json::Value::Object(_) => {
                Err("nested objects are not valid field values".to_string())
            }
        }
    }
}

impl PartialEq for FieldValue {
    #[allow(clippy::cast_precision_loss)]
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (FieldValue::Null, FieldValue::Null) => true,
            (FieldValue::Bool(a), FieldValue::Bool(b)) => a == b,
            (FieldValue::Int(a), FieldValue::Int(b)) => a == b,
            (FieldValue::Float(a), FieldValue::Float(b)) => a == b,
            (FieldValue::Int(a), FieldValue::Float(b))
            | (FieldValue::Float(b), FieldValue::Int(a)) => (*a as f64) == *b,
            (FieldValue::Text(a), FieldValue::Text(b)) => a == b,
            (FieldValue::Date(a), FieldValue::Date(b)) => a == b,
            (FieldValue::DateTime(a), FieldValue::DateTime(b)) => a == b,
            (FieldValue::Time(a), FieldValue::Time(b)) => a == b,
            (FieldValue::Array(a), FieldValue::Array(b)) => a == b,
            _ => false,
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Null => write!(f, "null"),
            FieldValue::Bool(b) => write!(f, "{b}"),
            FieldValue::Int(n) => write!(f, "{n}"),
            FieldValue::Float(n) => write!(f, "{n}"),
            FieldValue::Text(s) => write!(f, "{s}"),
            FieldValue::Date(d) => write!(f, "{}", d.format("%Y-%m-%d")),
            FieldValue::DateTime(dt) => write!(f, "{}", dt.format("%Y-%m-%dT%H:%M:%S")),
            FieldValue::Time(t) => write!(f, "{}", t.format("%H:%M:%S")),
            FieldValue::Array(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ",")?;
                    }
                    write!(f, "{item}")?;
                }
                write!(f, "]")
            }
        }
    }
}

impl From<&str> for FieldValue {
    fn from(s: &str) -> Self {
        FieldValue::Text(s.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(s: String) -> Self {
        FieldValue::Text(s)
    }
}

impl From<i64> for FieldValue {
    fn from(n: i64) -> Self {
        FieldValue::Int(n)
    }
}

impl From<f64> for FieldValue {
    fn from(n: f64) -> Self {
        FieldValue::Float(n)
    }
}

impl From<bool> for FieldValue {
    fn from(b: bool) -> Self {
        FieldValue::Bool(b)
    }
}

impl Serialize for FieldValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            FieldValue::Null => serializer.serialize_unit(),
            FieldValue::Bool(b) => serializer.serialize_bool(*b),
            FieldValue::Int(n) => serializer.serialize_i64(*n),
            FieldValue::Float(n) => serializer.serialize_f64(*n),
            FieldValue::Text(s) => serializer.serialize_str(s),
            FieldValue::Date(d) => serializer.serialize_str(&d.format("%Y-%m-%d").to_string()),
            FieldValue::DateTime(dt) => {
                serializer.serialize_str(&dt.format("%Y-%m-%dT%H:%M:%S").to_string())
            }
            FieldValue::Time(t) => serializer.serialize_str(&t.format("%H:%M:%S").to_string()),
            FieldValue::Array(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
        }
    }
}

struct FieldValueVisitor;

impl<'de> Visitor<'de> for FieldValueVisitor {
    type Value = FieldValue;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a scalar field value or an array of them")
    }

    fn visit_unit<E: serde::de::Error>(self) -> Result<FieldValue, E> {
        Ok(FieldValue::Null)
    }

    fn visit_none<E: serde::de::Error>(self) -> Result<FieldValue, E> {
        Ok(FieldValue::Null)
    }

    fn visit_bool<E: serde::de::Error>(self, b: bool) -> Result<FieldValue, E> {
        Ok(FieldValue::Bool(b))
    }

    fn visit_i64<E: serde::de::Error>(self, n: i64) -> Result<FieldValue, E> {
        Ok(FieldValue::Int(n))
    }

    #[allow(clippy::cast_possible_wrap, clippy::cast_precision_loss)]
    fn visit_u64<E: serde::de::Error>(self, n: u64) -> Result<FieldValue, E> {
        if let Ok(i) = i64::try_from(n) {
            Ok(FieldValue::Int(i))
        } else {
            Ok(FieldValue::Float(n as f64))
        }
    }

    fn visit_f64<E: serde::de::Error>(self, n: f64) -> Result<FieldValue, E> {
        Ok(FieldValue::Float(n))
    }

    fn visit_str<E: serde::de::Error>(self, s: &str) -> Result<FieldValue, E> {
        Ok(FieldValue::Text(s.to_string()))
    }

    fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<FieldValue, A::Error> {
        let mut items = Vec::new();
        while let Some(item) = seq.next_element::<FieldValue>()? {
            items.push(item);
        }
        Ok(FieldValue::Array(items))
    }
}

impl<'de> Deserialize<'de> for FieldValue {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(FieldValueVisitor)
    }
}

/// An insertion-ordered mapping of field name to [`FieldValue`].
///
/// Field names are unique: [`Record::set`] replaces an existing field's value
/// in place rather than appending a duplicate. Serializes as a JSON object
/// preserving field order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Record {
    fields: Vec<(String, FieldValue)>,
}

impl Record {
    /// Creates an empty record.
    #[must_use]
    pub fn new() -> Self {
        Self { fields: Vec::new() }
    }

    /// Builds a record from name/value pairs. Later duplicates replace
    /// earlier ones, keeping the original position.
    #[must_use]
    pub fn from_pairs<I, N>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (N, FieldValue)>,
        N: Into<String>,
    {
        let mut record = Record::new();
        for (name, value) in pairs {
            record.set(name, value);
        }
        record
    }

    /// Returns the value for a field, or `None` when absent.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.fields
            .iter()
            .find(|(field, _)| field == name)
            .map(|(_, value)| value)
    }

    /// Returns `true` when the record carries the named field (even if null).
    #[must_use]
    pub fn contains_field(&self, name: &str) -> bool {
        self.fields.iter().any(|(field, _)| field == name)
    }

    /// Sets a field value, replacing in place when the field exists.
    pub fn set(&mut self, name: impl Into<String>, value: FieldValue) {
        let name = name.into();
        if let Some(slot) = self.fields.iter_mut().find(|(field, _)| *field == name) {
            slot.1 = value;
        } else {
            self.fields.push((name, value));
        }
    }

    /// Number of fields.
    #[must_use]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Whether the record has no fields.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Iterates fields in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &FieldValue)> {
        self.fields.iter().map(|(name, value)| (name.as_str(), value))
    }
}

impl Serialize for Record {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.fields.len()))?;
        for (name, value) in &self.fields {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}

struct RecordVisitor;

impl<'de> Visitor<'de> for RecordVisitor {
    type Value = Record;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a JSON object of field values")
    }

    fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Record, A::Error> {
        let mut record = Record::new();
        while let Some((name, value)) = map.next_entry::<String, FieldValue>()? {
            record.set(name, value);
        }
        Ok(record)
    }
}

impl<'de> Deserialize<'de> for Record {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_map(RecordVisitor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // ---- Equality ----

    #[test]
    fn int_and_float_compare_numerically() {
        assert_eq!(FieldValue::Int(10), FieldValue::Float(10.0));
        assert_eq!(FieldValue::Float(2.0), FieldValue::Int(2));
        assert_ne!(FieldValue::Int(10), FieldValue::Float(10.5));
    }

    #[test]
    fn mismatched_kinds_are_not_equal() {
        assert_ne!(FieldValue::Text("1".to_string()), FieldValue::Int(1));
        assert_ne!(FieldValue::Bool(true), FieldValue::Int(1));
        assert_ne!(FieldValue::Null, FieldValue::Text(String::new()));
    }

    #[test]
    fn eq_ignore_case_folds_text_only() {
        assert!(FieldValue::from("Alice").eq_ignore_case(&FieldValue::from("ALICE")));
        assert!(!FieldValue::from("Alice").eq_ignore_case(&FieldValue::from("Bob")));
        assert!(FieldValue::Int(3).eq_ignore_case(&FieldValue::Int(3)));
    }

    // ---- Ordering ----

    #[test]
    fn cross_numeric_ordering() {
        assert_eq!(
            FieldValue::Int(1).partial_cmp_value(&FieldValue::Float(1.5), false),
            Some(Ordering::Less)
        );
        assert_eq!(
            FieldValue::Float(3.0).partial_cmp_value(&FieldValue::Int(2), false),
            Some(Ordering::Greater)
        );
    }

    #[test]
    fn text_ordering_respects_case_flag() {
        let a = FieldValue::from("apple");
        let b = FieldValue::from("Banana");
        // Case-sensitive: 'B' < 'a' in ASCII
        assert_eq!(a.partial_cmp_value(&b, false), Some(Ordering::Greater));
        // Case-insensitive: "apple" < "banana"
        assert_eq!(a.partial_cmp_value(&b, true), Some(Ordering::Less));
    }

    #[test]
    fn unordered_kinds_return_none() {
        assert_eq!(
            FieldValue::Null.partial_cmp_value(&FieldValue::Int(1), false),
            None
        );
        assert_eq!(
            FieldValue::Array(vec![]).partial_cmp_value(&FieldValue::Array(vec![]), false),
            None
        );
    }

    // ---- Blank / text rendering ----

    #[test]
    fn blank_means_null_or_empty_text() {
        assert!(FieldValue::Null.is_blank());
        assert!(FieldValue::Text(String::new()).is_blank());
        assert!(!FieldValue::from("x").is_blank());
        assert!(!FieldValue::Int(0).is_blank());
    }

    #[test]
    fn render_text_covers_numbers_not_temporals() {
        assert_eq!(FieldValue::Int(10).render_text(), Some("10".to_string()));
        assert_eq!(FieldValue::Float(1.5).render_text(), Some("1.5".to_string()));
        assert_eq!(FieldValue::from("abc").render_text(), Some("abc".to_string()));
        assert_eq!(FieldValue::Bool(true).render_text(), None);
        let d = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        assert_eq!(FieldValue::Date(d).render_text(), None);
    }

    // ---- Coercion ----

    #[test]
    fn coerce_text_to_date() {
        let coerced = FieldValue::from("2024-03-15").coerce_to(FieldType::Date);
        assert_eq!(
            coerced,
            Some(FieldValue::Date(NaiveDate::from_ymd_opt(2024, 3, 15).unwrap()))
        );
        assert_eq!(FieldValue::from("not a date").coerce_to(FieldType::Date), None);
    }

    #[test]
    fn coerce_text_to_numeric() {
        assert_eq!(
            FieldValue::from("42").coerce_to(FieldType::Integer),
            Some(FieldValue::Int(42))
        );
        assert_eq!(
            FieldValue::from("1.25").coerce_to(FieldType::Float),
            Some(FieldValue::Float(1.25))
        );
        assert_eq!(FieldValue::from("ten").coerce_to(FieldType::Integer), None);
    }

    #[test]
    fn coerce_array_coerces_elements() {
        let arr = FieldValue::Array(vec![FieldValue::from("1"), FieldValue::from("2")]);
        assert_eq!(
            arr.coerce_to(FieldType::Integer),
            Some(FieldValue::Array(vec![FieldValue::Int(1), FieldValue::Int(2)]))
        );
    }

    // ---- Record basics ----

    #[test]
    fn record_preserves_insertion_order() {
        let record = Record::from_pairs([
            ("id", FieldValue::Int(1)),
            ("name", FieldValue::from("Alice")),
            ("active", FieldValue::Bool(true)),
        ]);
        let names: Vec<&str> = record.iter().map(|(name, _)| name).collect();
        assert_eq!(names, vec!["id", "name", "active"]);
    }

    #[test]
    fn record_set_replaces_in_place() {
        let mut record = Record::from_pairs([
            ("a", FieldValue::Int(1)),
            ("b", FieldValue::Int(2)),
        ]);
        record.set("a", FieldValue::Int(9));
        assert_eq!(record.len(), 2);
        assert_eq!(record.get("a"), Some(&FieldValue::Int(9)));
        let names: Vec<&str> = record.iter().map(|(name, _)| name).collect();
        assert_eq!(names, vec!["a", "b"]);
    }

    #[test]
    fn record_get_missing_field() {
        let record = Record::from_pairs([("a", FieldValue::Int(1))]);
        assert_eq!(record.get("zzz"), None);
        assert!(!record.contains_field("zzz"));
        assert!(record.contains_field("a"));
    }

    // ---- Serde round trips ----

    #[test]
    fn record_json_round_trip_preserves_order() {
        let json = r#"{"id":1,"name":"Alice","score":1.5,"tags":["x","y"],"gone":null}"#;
        let record: Record = serde_json::from_str(json).unwrap();
        assert_eq!(record.get("id"), Some(&FieldValue::Int(1)));
        assert_eq!(record.get("gone"), Some(&FieldValue::Null));
        let back = serde_json::to_string(&record).unwrap();
        assert_eq!(back, json);
    }

    #[test]
    fn temporal_values_serialize_as_iso_strings() {
        let d = NaiveDate::from_ymd_opt(2024, 3, 15).unwrap();
        assert_eq!(
            serde_json::to_string(&FieldValue::Date(d)).unwrap(),
            "\"2024-03-15\""
        );
    }

    #[test]
    fn nested_object_is_rejected() {
        let result: Result<Record, _> = serde_json::from_str(r#"{"a":{"b":1}}"#);
        assert!(result.is_err());
    }

    #[test]
    fn from_json_maps_number_kinds() {
        let v = serde_json::json!([1, 1.5, "x", true, null]);
        let fv = FieldValue::from_json(&v).unwrap();
        assert_eq!(
            fv,
            FieldValue::Array(vec![
                FieldValue::Int(1),
                FieldValue::Float(1.5),
                FieldValue::from("x"),
                FieldValue::Bool(true),
                FieldValue::Null,
            ])
        );
        assert!(FieldValue::from_json(&serde_json::json!({"a": 1})).is_err());
    }
}
