//! Field metadata: declared types, descriptors, and text-match policy.

use serde::{Deserialize, Serialize};

/// Declared type of a record field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    /// UTF-8 text.
    Text,
    /// Signed 64-bit integer.
    Integer,
    /// 64-bit IEEE 754 float.
    Float,
    /// Boolean.
    Boolean,
    /// Calendar date.
    Date,
    /// Date with time-of-day.
    #[serde(rename = "datetime")]
    DateTime,
    /// Time-of-day.
    Time,
}

impl FieldType {
    /// Whether values of this type compare only by exact equality
    /// (substring and pattern operators never apply).
    #[must_use]
    pub fn is_exact_only(self) -> bool {
        matches!(
            self,
            FieldType::Boolean | FieldType::Date | FieldType::DateTime | FieldType::Time
        )
    }

    /// Whether this is a numeric type.
    #[must_use]
    pub fn is_numeric(self) -> bool {
        matches!(self, FieldType::Integer | FieldType::Float)
    }
}

/// Policy governing case sensitivity and substring-vs-exact behavior for
/// text comparisons originating from simple criteria.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TextMatchStyle {
    /// Case-insensitive exact match.
    #[default]
    Exact,
    /// Case-sensitive exact match.
    ExactCase,
    /// Case-insensitive substring match.
    Substring,
    /// Case-insensitive prefix match.
    StartsWith,
}

impl TextMatchStyle {
    /// Whether a longer criterion string still selects a subset of the rows
    /// matched by a shorter one (the precondition for string-growth
    /// narrowing in criteria comparison).
    #[must_use]
    pub fn is_substring_capable(self) -> bool {
        matches!(self, TextMatchStyle::Substring | TextMatchStyle::StartsWith)
    }
}

/// Metadata for a single field of a datasource.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldDescriptor {
    /// Field name, unique within a schema.
    pub name: String,
    /// Declared type.
    #[serde(rename = "type")]
    pub field_type: FieldType,
    /// Whether this field is part of the (composable) primary key.
    #[serde(default)]
    pub primary_key: bool,
    /// Forces exact matching for this field regardless of the request- or
    /// datasource-level text-match style.
    #[serde(default)]
    pub ignore_text_match_style: bool,
}

impl FieldDescriptor {
    /// Creates a plain (non-key) descriptor.
    #[must_use]
    pub fn new(name: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            name: name.into(),
            field_type,
            primary_key: false,
            ignore_text_match_style: false,
        }
    }

    /// Marks the field as part of the primary key.
    #[must_use]
    pub fn primary_key(mut self) -> Self {
        self.primary_key = true;
        self
    }

    /// Marks the field as always matched exactly.
    #[must_use]
    pub fn ignore_text_match_style(mut self) -> Self {
        self.ignore_text_match_style = true;
        self
    }
}

/// An ordered collection of field descriptors for one datasource.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DataSchema {
    fields: Vec<FieldDescriptor>,
}

impl DataSchema {
    /// Builds a schema from descriptors. A later descriptor with a duplicate
    /// name replaces the earlier one.
    #[must_use]
    pub fn new(fields: impl IntoIterator<Item = FieldDescriptor>) -> Self {
        let mut schema = DataSchema { fields: Vec::new() };
        for descriptor in fields {
            if let Some(slot) = schema
                .fields
                .iter_mut()
                .find(|existing| existing.name == descriptor.name)
            {
                *slot = descriptor;
            } else {
                schema.fields.push(descriptor);
            }
        }
        schema
    }

    /// Looks up a descriptor by field name.
    #[must_use]
    pub fn field(&self, name: &str) -> Option<&FieldDescriptor> {
        self.fields.iter().find(|descriptor| descriptor.name == name)
    }

    /// Iterates descriptors in declaration order.
    pub fn fields(&self) -> impl Iterator<Item = &FieldDescriptor> {
        self.fields.iter()
    }

    /// Returns the primary-key descriptors in declaration order
    /// (possibly empty, possibly composite).
    #[must_use]
    pub fn primary_key_fields(&self) -> Vec<&FieldDescriptor> {
        self.fields.iter().filter(|descriptor| descriptor.primary_key).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exact_only_covers_boolean_and_temporals() {
        assert!(FieldType::Boolean.is_exact_only());
        assert!(FieldType::Date.is_exact_only());
        assert!(FieldType::DateTime.is_exact_only());
        assert!(FieldType::Time.is_exact_only());
        assert!(!FieldType::Text.is_exact_only());
        assert!(!FieldType::Integer.is_exact_only());
    }

    #[test]
    fn schema_lookup_and_key_fields() {
        let schema = DataSchema::new([
            FieldDescriptor::new("id", FieldType::Integer).primary_key(),
            FieldDescriptor::new("region", FieldType::Text).primary_key(),
            FieldDescriptor::new("name", FieldType::Text),
        ]);
        assert_eq!(schema.field("name").unwrap().field_type, FieldType::Text);
        assert!(schema.field("missing").is_none());
        let keys: Vec<&str> = schema
            .primary_key_fields()
            .iter()
            .map(|descriptor| descriptor.name.as_str())
            .collect();
        assert_eq!(keys, vec!["id", "region"]);
    }

    #[test]
    fn duplicate_descriptor_replaces() {
        let schema = DataSchema::new([
            FieldDescriptor::new("id", FieldType::Integer),
            FieldDescriptor::new("id", FieldType::Text),
        ]);
        assert_eq!(schema.fields().count(), 1);
        assert_eq!(schema.field("id").unwrap().field_type, FieldType::Text);
    }

    #[test]
    fn text_match_style_serde_names() {
        assert_eq!(
            serde_json::to_string(&TextMatchStyle::ExactCase).unwrap(),
            "\"exactCase\""
        );
        let style: TextMatchStyle = serde_json::from_str("\"startsWith\"").unwrap();
        assert_eq!(style, TextMatchStyle::StartsWith);
    }
}
