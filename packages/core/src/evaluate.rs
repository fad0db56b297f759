//! Criterion evaluation against individual records.
//!
//! [`Evaluator`] borrows an [`OperatorRegistry`] and a [`DataSchema`] and
//! answers "does this record satisfy this criterion". Before an operator
//! runs, the evaluator resolves everything the operator should not have to
//! care about: field lookup, type coercion of record value and comparand,
//! forced-exact remapping for `ignoreTextMatchStyle` and primary-key fields,
//! and field-to-field references.

use crate::criteria::Criterion;
use crate::error::EvaluationError;
use crate::operators::{Comparand, EvalContext, OperatorId, OperatorRegistry, ValueArity};
use crate::schema::{DataSchema, FieldType};
use crate::value::{FieldValue, Record};

/// Knobs controlling leaf evaluation.
#[derive(Debug, Clone)]
pub struct MatchOptions {
    /// When a criterion names a field absent from the schema: `true` treats
    /// the leaf as satisfied (the constraint is dropped), `false` evaluates
    /// the operator against `Null`.
    pub drop_unknown_criteria: bool,
    /// Case sensitivity of forced-exact matching on `ignoreTextMatchStyle`
    /// fields.
    pub exact_is_case_sensitive: bool,
    /// Allows substring-style operators on primary-key fields instead of
    /// forcing case-sensitive exact matching.
    pub allow_multi_pk_match: bool,
}

impl Default for MatchOptions {
    fn default() -> Self {
        Self {
            drop_unknown_criteria: true,
            exact_is_case_sensitive: false,
            allow_multi_pk_match: false,
        }
    }
}

/// Shape of a leaf's comparison payload, borrowed from the criterion.
enum LeafPayload<'c> {
    Value(&'c FieldValue),
    Range(&'c FieldValue, &'c FieldValue),
    Field(&'c str),
}

/// Evaluates criteria trees against records.
#[derive(Debug, Clone, Copy)]
pub struct Evaluator<'a> {
    registry: &'a OperatorRegistry,
    schema: &'a DataSchema,
}

impl<'a> Evaluator<'a> {
    #[must_use]
    pub fn new(registry: &'a OperatorRegistry, schema: &'a DataSchema) -> Self {
        Self { registry, schema }
    }

    /// Whether `record` satisfies `criterion`.
    ///
    /// Composites short-circuit: `and` stops at the first false child, `or`
    /// at the first true one. An empty `and` matches everything; an empty
    /// `or` matches nothing.
    ///
    /// # Errors
    ///
    /// [`EvaluationError`] on unregistered operators, misplaced combinators,
    /// unsupported field types, or invalid regex patterns.
    pub fn evaluate(
        &self,
        record: &Record,
        criterion: &Criterion,
        options: &MatchOptions,
    ) -> Result<bool, EvaluationError> {
        match criterion {
            Criterion::Composite { operator, criteria } => match operator {
                OperatorId::And => {
                    for child in criteria {
                        if !self.evaluate(record, child, options)? {
                            return Ok(false);
                        }
                    }
                    Ok(true)
                }
                OperatorId::Or => {
                    for child in criteria {
                        if self.evaluate(record, child, options)? {
                            return Ok(true);
                        }
                    }
                    Ok(false)
                }
                OperatorId::Not => match criteria.first() {
                    Some(child) => Ok(!self.evaluate(record, child, options)?),
                    None => Ok(true),
                },
                other => Err(EvaluationError::CompoundOperator(*other)),
            },
            Criterion::Comparison {
                field_name,
                operator,
                value,
            } => self.evaluate_leaf(record, field_name, *operator, LeafPayload::Value(value), options),
            Criterion::Range {
                field_name,
                operator,
                start,
                end,
            } => self.evaluate_leaf(
                record,
                field_name,
                *operator,
                LeafPayload::Range(start, end),
                options,
            ),
            Criterion::FieldComparison {
                field_name,
                operator,
                other_field_name,
            } => self.evaluate_leaf(
                record,
                field_name,
                *operator,
                LeafPayload::Field(other_field_name),
                options,
            ),
        }
    }

    fn evaluate_leaf(
        &self,
        record: &Record,
        field_name: &str,
        operator: OperatorId,
        payload: LeafPayload<'_>,
        options: &MatchOptions,
    ) -> Result<bool, EvaluationError> {
        let descriptor = self.schema.field(field_name);
        if descriptor.is_none() && options.drop_unknown_criteria {
            return Ok(true);
        }
        let field_type = descriptor.map_or(FieldType::Text, |d| d.field_type);

        let mut operator = operator;
        if let Some(descriptor) = descriptor {
            let pk_forced = descriptor.primary_key && !options.allow_multi_pk_match;
            if pk_forced || descriptor.ignore_text_match_style {
                let case_sensitive = pk_forced
                    || options.exact_is_case_sensitive
                    || field_type != FieldType::Text;
                operator = operator.forced_exact(case_sensitive);
            }
        }
        let def = self.registry.lookup(operator)?;

        let raw = record.get(field_name).unwrap_or(&FieldValue::Null);
        let coerced_field = raw.coerce_to(field_type);
        let field_value = coerced_field.as_ref().unwrap_or(raw);

        // Owned storage for coerced comparands; the borrows below must not
        // outlive these.
        let owned_single;
        let owned_start;
        let owned_end;
        let owned_set: Vec<FieldValue>;
        let owned_other;

        let comparand = match payload {
            LeafPayload::Value(value) => match def.arity {
                ValueArity::None => Comparand::None,
                ValueArity::Set => {
                    let members = match value {
                        FieldValue::Array(items) => items.as_slice(),
                        single => std::slice::from_ref(single),
                    };
                    owned_set = members
                        .iter()
                        .map(|member| {
                            member
                                .coerce_to(field_type)
                                .unwrap_or_else(|| member.clone())
                        })
                        .collect();
                    Comparand::Set(&owned_set)
                }
                _ => {
                    // Substring-style operators keep the criterion value
                    // verbatim: a textual needle against a numeric field is
                    // meaningful and must not be coerced away.
                    if operator.is_substring_style() {
                        Comparand::Value(value)
                    } else {
                        owned_single = value.coerce_to(field_type);
                        Comparand::Value(owned_single.as_ref().unwrap_or(value))
                    }
                }
            },
            LeafPayload::Range(start, end) => {
                owned_start = start.coerce_to(field_type);
                owned_end = end.coerce_to(field_type);
                Comparand::Range {
                    start: owned_start.as_ref().unwrap_or(start),
                    end: owned_end.as_ref().unwrap_or(end),
                }
            }
            LeafPayload::Field(other_name) => {
                let other_raw = record.get(other_name).unwrap_or(&FieldValue::Null);
                let other_type = self
                    .schema
                    .field(other_name)
                    .map_or(field_type, |d| d.field_type);
                owned_other = other_raw.coerce_to(other_type);
                Comparand::Value(owned_other.as_ref().unwrap_or(other_raw))
            }
        };

        let ctx = EvalContext {
            operator,
            field_value,
            comparand,
            field_type,
        };
        def.evaluate(&ctx)
    }
}
