//! Criteria trees and their wire representation.
//!
//! A [`Criterion`] is either a leaf test against one field or a logical
//! combinator over subcriteria. The JSON shapes mirror the classic
//! advanced-criteria format: `{fieldName, operator, value}` leaves,
//! `{fieldName, operator, start, end}` ranges,
//! `{fieldName, operator, otherFieldName}` field-to-field comparisons, and
//! `{operator, criteria: [...]}` composites.
//!
//! [`SimpleCriteria`] is the flat `{field: value}` form; it converts to an
//! `and` composite with per-field operators chosen from the effective text
//! match style.

use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

use crate::error::CriteriaError;
use crate::operators::{OperatorId, ValueArity};
use crate::schema::{DataSchema, TextMatchStyle};
use crate::value::FieldValue;

/// One node of a criteria tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Criterion {
    /// Logical combinator over subcriteria.
    Composite {
        operator: OperatorId,
        criteria: Vec<Criterion>,
    },
    /// Range test with both bounds.
    Range {
        #[serde(rename = "fieldName")]
        field_name: String,
        operator: OperatorId,
        start: FieldValue,
        end: FieldValue,
    },
    /// Comparison against another field of the same record.
    FieldComparison {
        #[serde(rename = "fieldName")]
        field_name: String,
        operator: OperatorId,
        #[serde(rename = "otherFieldName")]
        other_field_name: String,
    },
    /// Comparison against a literal value. `value` is absent for null and
    /// blank tests.
    Comparison {
        #[serde(rename = "fieldName")]
        field_name: String,
        operator: OperatorId,
        #[serde(default, skip_serializing_if = "FieldValue::is_null")]
        value: FieldValue,
    },
}

impl Criterion {
    /// Literal-value leaf.
    pub fn comparison(field_name: impl Into<String>, operator: OperatorId, value: impl Into<FieldValue>) -> Self {
        Criterion::Comparison {
            field_name: field_name.into(),
            operator,
            value: value.into(),
        }
    }

    /// Range leaf with both bounds.
    pub fn range(
        field_name: impl Into<String>,
        operator: OperatorId,
        start: impl Into<FieldValue>,
        end: impl Into<FieldValue>,
    ) -> Self {
        Criterion::Range {
            field_name: field_name.into(),
            operator,
            start: start.into(),
            end: end.into(),
        }
    }

    /// Field-to-field leaf.
    pub fn field_comparison(
        field_name: impl Into<String>,
        operator: OperatorId,
        other_field_name: impl Into<String>,
    ) -> Self {
        Criterion::FieldComparison {
            field_name: field_name.into(),
            operator,
            other_field_name: other_field_name.into(),
        }
    }

    /// `and` composite.
    #[must_use]
    pub fn and(criteria: Vec<Criterion>) -> Self {
        Criterion::Composite {
            operator: OperatorId::And,
            criteria,
        }
    }

    /// `or` composite.
    #[must_use]
    pub fn or(criteria: Vec<Criterion>) -> Self {
        Criterion::Composite {
            operator: OperatorId::Or,
            criteria,
        }
    }

    /// `not` composite with a single child.
    #[must_use]
    pub fn negate(child: Criterion) -> Self {
        Criterion::Composite {
            operator: OperatorId::Not,
            criteria: vec![child],
        }
    }

    /// The operator at this node.
    #[must_use]
    pub fn operator(&self) -> OperatorId {
        match self {
            Criterion::Composite { operator, .. }
            | Criterion::Range { operator, .. }
            | Criterion::FieldComparison { operator, .. }
            | Criterion::Comparison { operator, .. } => *operator,
        }
    }

    /// Field name for leaf nodes; `None` for composites.
    #[must_use]
    pub fn field_name(&self) -> Option<&str> {
        match self {
            Criterion::Composite { .. } => None,
            Criterion::Range { field_name, .. }
            | Criterion::FieldComparison { field_name, .. }
            | Criterion::Comparison { field_name, .. } => Some(field_name),
        }
    }

    /// Whether this is the empty conjunction, which matches every record.
    /// An unconstrained request normalizes to this shape and is exempt from
    /// the empty-composite validation rule.
    #[must_use]
    pub fn is_unconstrained(&self) -> bool {
        matches!(
            self,
            Criterion::Composite { operator: OperatorId::And, criteria } if criteria.is_empty()
        )
    }

    /// Checks the tree is structurally sound before evaluation or fetch:
    /// composites are non-empty, `not` has exactly one child, and every
    /// leaf's shape matches its operator's value arity.
    ///
    /// # Errors
    ///
    /// [`CriteriaError`] naming the first offending node.
    pub fn validate(&self) -> Result<(), CriteriaError> {
        match self {
            Criterion::Composite { operator, criteria } => {
                if !operator.is_logical() {
                    return Err(CriteriaError::ArityMismatch {
                        operator: *operator,
                        expected: expected_shape(operator.value_arity()),
                        found: "subcriteria",
                    });
                }
                if criteria.is_empty() {
                    return Err(CriteriaError::EmptyComposite);
                }
                if *operator == OperatorId::Not && criteria.len() > 1 {
                    return Err(CriteriaError::NotArity(criteria.len()));
                }
                for child in criteria {
                    child.validate()?;
                }
                Ok(())
            }
            Criterion::Range { operator, .. } => match operator.value_arity() {
                ValueArity::Pair => Ok(()),
                arity => Err(CriteriaError::ArityMismatch {
                    operator: *operator,
                    expected: expected_shape(arity),
                    found: "start/end pair",
                }),
            },
            Criterion::FieldComparison { operator, .. } => match operator.value_arity() {
                ValueArity::FieldName => Ok(()),
                arity => Err(CriteriaError::ArityMismatch {
                    operator: *operator,
                    expected: expected_shape(arity),
                    found: "other field name",
                }),
            },
            Criterion::Comparison { operator, value, .. } => match operator.value_arity() {
                ValueArity::Single | ValueArity::None => Ok(()),
                ValueArity::Set => {
                    if matches!(value, FieldValue::Array(_)) {
                        Ok(())
                    } else {
                        Err(CriteriaError::ArityMismatch {
                            operator: *operator,
                            expected: "array value",
                            found: "single value",
                        })
                    }
                }
                arity => Err(CriteriaError::ArityMismatch {
                    operator: *operator,
                    expected: expected_shape(arity),
                    found: "single value",
                }),
            },
        }
    }
}

fn expected_shape(arity: ValueArity) -> &'static str {
    match arity {
        ValueArity::None => "no value",
        ValueArity::Single => "single value",
        ValueArity::Pair => "start/end pair",
        ValueArity::Set => "array value",
        ValueArity::FieldName => "other field name",
        ValueArity::SubCriteria => "subcriteria",
    }
}

/// Flat `{field: value}` criteria, preserving insertion order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SimpleCriteria {
    entries: Vec<(String, FieldValue)>,
}

impl SimpleCriteria {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<FieldValue>,
    {
        let mut criteria = Self::new();
        for (name, value) in pairs {
            criteria.insert(name, value);
        }
        criteria
    }

    /// Sets a field constraint, replacing any previous one in place.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<FieldValue>) {
        let name = name.into();
        let value = value.into();
        if let Some(entry) = self.entries.iter_mut().find(|(n, _)| *n == name) {
            entry.1 = value;
        } else {
            self.entries.push((name, value));
        }
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.entries.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &FieldValue)> {
        self.entries.iter().map(|(n, v)| (n.as_str(), v))
    }

    /// Converts to an `and` composite of per-field leaves.
    ///
    /// The operator for each text field follows the text-match style; fields
    /// of any other type (or absent from the schema) compare exactly with
    /// `equals`. Array values become `inSet` memberships.
    #[must_use]
    pub fn to_criterion(&self, schema: &DataSchema, style: TextMatchStyle) -> Criterion {
        let leaves = self
            .entries
            .iter()
            .map(|(name, value)| {
                let operator = simple_operator(schema, name, value, style);
                Criterion::Comparison {
                    field_name: name.clone(),
                    operator,
                    value: value.clone(),
                }
            })
            .collect();
        Criterion::and(leaves)
    }
}

fn simple_operator(
    schema: &DataSchema,
    name: &str,
    value: &FieldValue,
    style: TextMatchStyle,
) -> OperatorId {
    if matches!(value, FieldValue::Array(_)) {
        return OperatorId::InSet;
    }
    if value.is_null() {
        return OperatorId::IsNull;
    }
    let is_text = schema
        .field(name)
        .is_some_and(|field| field.field_type == crate::schema::FieldType::Text);
    if !is_text {
        return OperatorId::Equals;
    }
    match style {
        TextMatchStyle::Exact => OperatorId::IEquals,
        TextMatchStyle::ExactCase => OperatorId::Equals,
        TextMatchStyle::Substring => OperatorId::IContains,
        TextMatchStyle::StartsWith => OperatorId::IStartsWith,
    }
}

impl Serialize for SimpleCriteria {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (name, value) in &self.entries {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for SimpleCriteria {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct SimpleCriteriaVisitor;

        impl<'de> Visitor<'de> for SimpleCriteriaVisitor {
            type Value = SimpleCriteria;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a flat criteria object")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Self::Value, A::Error> {
                let mut criteria = SimpleCriteria::new();
                while let Some((name, value)) = map.next_entry::<String, FieldValue>()? {
                    criteria.insert(name, value);
                }
                Ok(criteria)
            }
        }

        deserializer.deserialize_map(SimpleCriteriaVisitor)
    }
}

/// Either criteria shape accepted at the request boundary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Criteria {
    /// Advanced `{operator, ...}` tree.
    Advanced(Criterion),
    /// Flat `{field: value}` object.
    Simple(SimpleCriteria),
}

impl Criteria {
    /// Normalizes to a criteria tree, converting the simple form through the
    /// schema and text-match style.
    #[must_use]
    pub fn into_criterion(self, schema: &DataSchema, style: TextMatchStyle) -> Criterion {
        match self {
            Criteria::Advanced(criterion) => criterion,
            Criteria::Simple(simple) => simple.to_criterion(schema, style),
        }
    }

    /// An empty `and` over nothing, matching every record once normalized.
    #[must_use]
    pub fn none() -> Self {
        Criteria::Simple(SimpleCriteria::new())
    }
}

impl Default for Criteria {
    fn default() -> Self {
        Criteria::none()
    }
}

impl From<Criterion> for Criteria {
    fn from(criterion: Criterion) -> Self {
        Criteria::Advanced(criterion)
    }
}

impl From<SimpleCriteria> for Criteria {
    fn from(simple: SimpleCriteria) -> Self {
        Criteria::Simple(simple)
    }
}
