//! Operator identifiers, definitions, and the operator registry.
//!
//! [`OperatorId`] enumerates every built-in comparison, pattern, set, and
//! logical operator. The wire string (`"iContains"`, `"iregexp"`, ...) exists
//! only at the serde boundary; everything past deserialization dispatches on
//! the enum.
//!
//! [`OperatorRegistry`] maps each id to an [`OperatorDef`]: the value arity
//! the operator expects, the field types it applies to, and its evaluation
//! function. The registry is constructed once ([`OperatorRegistry::builtin`])
//! and passed by reference into evaluators -- there is no process-wide
//! mutable state. Registering a definition for an id replaces the built-in,
//! which is how custom matching semantics are installed.
//!
//! # Field-type rules
//!
//! Boolean and temporal fields only ever compare by exact equality: substring
//! and pattern operators applied to them evaluate to `false`. Numeric fields
//! participate in substring matching only when the criterion value is textual
//! (matching `"1"` against the decimal rendering of `10`); a numeric
//! criterion value against a numeric field is always an exact numeric
//! comparison. Case-insensitive equality on a non-text field is a
//! configuration error, never a silent fallback.

use std::cmp::Ordering;
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::EvaluationError;
use crate::pattern::{compile_wildcard, PatternAnchor};
use crate::schema::FieldType;
use crate::value::FieldValue;

/// Identifier of a comparison, pattern, set, field-to-field, or logical
/// operator. Serializes to the wire string used in criteria JSON.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[allow(clippy::module_name_repetitions)]
pub enum OperatorId {
    // equality
    Equals,
    IEquals,
    NotEqual,
    INotEqual,
    // ordering
    GreaterThan,
    LessThan,
    GreaterOrEqual,
    LessOrEqual,
    Between,
    IBetween,
    BetweenInclusive,
    IBetweenInclusive,
    // substring
    Contains,
    IContains,
    NotContains,
    INotContains,
    StartsWith,
    IStartsWith,
    NotStartsWith,
    INotStartsWith,
    EndsWith,
    IEndsWith,
    NotEndsWith,
    INotEndsWith,
    // wildcard patterns
    MatchesPattern,
    IMatchesPattern,
    ContainsPattern,
    IContainsPattern,
    StartsWithPattern,
    IStartsWithPattern,
    EndsWithPattern,
    IEndsWithPattern,
    // regular expressions
    Regexp,
    IRegexp,
    // null / blank tests
    IsNull,
    NotNull,
    IsBlank,
    NotBlank,
    // set membership
    InSet,
    NotInSet,
    // field-to-field
    EqualsField,
    IEqualsField,
    NotEqualField,
    INotEqualField,
    GreaterThanField,
    LessThanField,
    GreaterOrEqualField,
    LessOrEqualField,
    ContainsField,
    IContainsField,
    NotContainsField,
    INotContainsField,
    StartsWithField,
    IStartsWithField,
    NotStartsWithField,
    INotStartsWithField,
    EndsWithField,
    IEndsWithField,
    NotEndsWithField,
    INotEndsWithField,
    // logical combinators
    And,
    Or,
    Not,
}

impl OperatorId {
    /// All built-in operator ids, in catalog order.
    pub const ALL: &'static [OperatorId] = &[
        OperatorId::Equals,
        OperatorId::IEquals,
        OperatorId::NotEqual,
        OperatorId::INotEqual,
        OperatorId::GreaterThan,
        OperatorId::LessThan,
        OperatorId::GreaterOrEqual,
        OperatorId::LessOrEqual,
        OperatorId::Between,
        OperatorId::IBetween,
        OperatorId::BetweenInclusive,
        OperatorId::IBetweenInclusive,
        OperatorId::Contains,
        OperatorId::IContains,
        OperatorId::NotContains,
        OperatorId::INotContains,
        OperatorId::StartsWith,
        OperatorId::IStartsWith,
        OperatorId::NotStartsWith,
        OperatorId::INotStartsWith,
        OperatorId::EndsWith,
        OperatorId::IEndsWith,
        OperatorId::NotEndsWith,
        OperatorId::INotEndsWith,
        OperatorId::MatchesPattern,
        OperatorId::IMatchesPattern,
        OperatorId::ContainsPattern,
        OperatorId::IContainsPattern,
        OperatorId::StartsWithPattern,
        OperatorId::IStartsWithPattern,
        OperatorId::EndsWithPattern,
        OperatorId::IEndsWithPattern,
        OperatorId::Regexp,
        OperatorId::IRegexp,
        OperatorId::IsNull,
        OperatorId::NotNull,
        OperatorId::IsBlank,
        OperatorId::NotBlank,
        OperatorId::InSet,
        OperatorId::NotInSet,
        OperatorId::EqualsField,
        OperatorId::IEqualsField,
        OperatorId::NotEqualField,
        OperatorId::INotEqualField,
        OperatorId::GreaterThanField,
        OperatorId::LessThanField,
        OperatorId::GreaterOrEqualField,
        OperatorId::LessOrEqualField,
        OperatorId::ContainsField,
        OperatorId::IContainsField,
        OperatorId::NotContainsField,
        OperatorId::INotContainsField,
        OperatorId::StartsWithField,
        OperatorId::IStartsWithField,
        OperatorId::NotStartsWithField,
        OperatorId::INotStartsWithField,
        OperatorId::EndsWithField,
        OperatorId::IEndsWithField,
        OperatorId::NotEndsWithField,
        OperatorId::INotEndsWithField,
        OperatorId::And,
        OperatorId::Or,
        OperatorId::Not,
    ];

    /// Wire-format identifier string.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            OperatorId::Equals => "equals",
            OperatorId::IEquals => "iEquals",
            OperatorId::NotEqual => "notEqual",
            OperatorId::INotEqual => "iNotEqual",
            OperatorId::GreaterThan => "greaterThan",
            OperatorId::LessThan => "lessThan",
            OperatorId::GreaterOrEqual => "greaterOrEqual",
            OperatorId::LessOrEqual => "lessOrEqual",
            OperatorId::Between => "between",
            OperatorId::IBetween => "iBetween",
            OperatorId::BetweenInclusive => "betweenInclusive",
            OperatorId::IBetweenInclusive => "iBetweenInclusive",
            OperatorId::Contains => "contains",
            OperatorId::IContains => "iContains",
            OperatorId::NotContains => "notContains",
            OperatorId::INotContains => "iNotContains",
            OperatorId::StartsWith => "startsWith",
            OperatorId::IStartsWith => "iStartsWith",
            OperatorId::NotStartsWith => "notStartsWith",
            OperatorId::INotStartsWith => "iNotStartsWith",
            OperatorId::EndsWith => "endsWith",
            OperatorId::IEndsWith => "iEndsWith",
            OperatorId::NotEndsWith => "notEndsWith",
            OperatorId::INotEndsWith => "iNotEndsWith",
            OperatorId::MatchesPattern => "matchesPattern",
            OperatorId::IMatchesPattern => "iMatchesPattern",
            OperatorId::ContainsPattern => "containsPattern",
            OperatorId::IContainsPattern => "iContainsPattern",
            OperatorId::StartsWithPattern => "startsWithPattern",
            OperatorId::IStartsWithPattern => "iStartsWithPattern",
            OperatorId::EndsWithPattern => "endsWithPattern",
            OperatorId::IEndsWithPattern => "iEndsWithPattern",
            OperatorId::Regexp => "regexp",
            OperatorId::IRegexp => "iregexp",
            OperatorId::IsNull => "isNull",
            OperatorId::NotNull => "notNull",
            OperatorId::IsBlank => "isBlank",
            OperatorId::NotBlank => "notBlank",
            OperatorId::InSet => "inSet",
            OperatorId::NotInSet => "notInSet",
            OperatorId::EqualsField => "equalsField",
            OperatorId::IEqualsField => "iEqualsField",
            OperatorId::NotEqualField => "notEqualField",
            OperatorId::INotEqualField => "iNotEqualField",
            OperatorId::GreaterThanField => "greaterThanField",
            OperatorId::LessThanField => "lessThanField",
            OperatorId::GreaterOrEqualField => "greaterOrEqualField",
            OperatorId::LessOrEqualField => "lessOrEqualField",
            OperatorId::ContainsField => "containsField",
            OperatorId::IContainsField => "iContainsField",
            OperatorId::NotContainsField => "notContainsField",
            OperatorId::INotContainsField => "iNotContainsField",
            OperatorId::StartsWithField => "startsWithField",
            OperatorId::IStartsWithField => "iStartsWithField",
            OperatorId::NotStartsWithField => "notStartsWithField",
            OperatorId::INotStartsWithField => "iNotStartsWithField",
            OperatorId::EndsWithField => "endsWithField",
            OperatorId::IEndsWithField => "iEndsWithField",
            OperatorId::NotEndsWithField => "notEndsWithField",
            OperatorId::INotEndsWithField => "iNotEndsWithField",
            OperatorId::And => "and",
            OperatorId::Or => "or",
            OperatorId::Not => "not",
        }
    }

    /// The shape of comparison value this operator expects.
    #[must_use]
    pub fn value_arity(self) -> ValueArity {
        match self {
            OperatorId::IsNull | OperatorId::NotNull | OperatorId::IsBlank | OperatorId::NotBlank => {
                ValueArity::None
            }
            OperatorId::Between
            | OperatorId::IBetween
            | OperatorId::BetweenInclusive
            | OperatorId::IBetweenInclusive => ValueArity::Pair,
            OperatorId::InSet | OperatorId::NotInSet => ValueArity::Set,
            OperatorId::And | OperatorId::Or | OperatorId::Not => ValueArity::SubCriteria,
            other if other.takes_field_name() => ValueArity::FieldName,
            _ => ValueArity::Single,
        }
    }

    /// Whether this is a logical combinator (`and`/`or`/`not`).
    #[must_use]
    pub fn is_logical(self) -> bool {
        matches!(self, OperatorId::And | OperatorId::Or | OperatorId::Not)
    }

    /// Whether this operator compares against another field of the same
    /// record (`otherFieldName`) rather than a literal.
    #[must_use]
    pub fn takes_field_name(self) -> bool {
        matches!(
            self,
            OperatorId::EqualsField
                | OperatorId::IEqualsField
                | OperatorId::NotEqualField
                | OperatorId::INotEqualField
                | OperatorId::GreaterThanField
                | OperatorId::LessThanField
                | OperatorId::GreaterOrEqualField
                | OperatorId::LessOrEqualField
                | OperatorId::ContainsField
                | OperatorId::IContainsField
                | OperatorId::NotContainsField
                | OperatorId::INotContainsField
                | OperatorId::StartsWithField
                | OperatorId::IStartsWithField
                | OperatorId::NotStartsWithField
                | OperatorId::INotStartsWithField
                | OperatorId::EndsWithField
                | OperatorId::IEndsWithField
                | OperatorId::NotEndsWithField
                | OperatorId::INotEndsWithField
        )
    }

    /// Whether this operator belongs to the substring, wildcard-pattern, or
    /// regex families (the operators subject to forced-exact remapping).
    #[must_use]
    pub fn is_substring_style(self) -> bool {
        matches!(
            self,
            OperatorId::Contains
                | OperatorId::IContains
                | OperatorId::NotContains
                | OperatorId::INotContains
                | OperatorId::StartsWith
                | OperatorId::IStartsWith
                | OperatorId::NotStartsWith
                | OperatorId::INotStartsWith
                | OperatorId::EndsWith
                | OperatorId::IEndsWith
                | OperatorId::NotEndsWith
                | OperatorId::INotEndsWith
                | OperatorId::MatchesPattern
                | OperatorId::IMatchesPattern
                | OperatorId::ContainsPattern
                | OperatorId::IContainsPattern
                | OperatorId::StartsWithPattern
                | OperatorId::IStartsWithPattern
                | OperatorId::EndsWithPattern
                | OperatorId::IEndsWithPattern
                | OperatorId::Regexp
                | OperatorId::IRegexp
                | OperatorId::ContainsField
                | OperatorId::IContainsField
                | OperatorId::NotContainsField
                | OperatorId::INotContainsField
                | OperatorId::StartsWithField
                | OperatorId::IStartsWithField
                | OperatorId::NotStartsWithField
                | OperatorId::INotStartsWithField
                | OperatorId::EndsWithField
                | OperatorId::IEndsWithField
                | OperatorId::NotEndsWithField
                | OperatorId::INotEndsWithField
        )
    }

    /// Whether this operator negates its underlying test.
    #[must_use]
    pub fn is_negated(self) -> bool {
        matches!(
            self,
            OperatorId::NotEqual
                | OperatorId::INotEqual
                | OperatorId::NotContains
                | OperatorId::INotContains
                | OperatorId::NotStartsWith
                | OperatorId::INotStartsWith
                | OperatorId::NotEndsWith
                | OperatorId::INotEndsWith
                | OperatorId::NotInSet
                | OperatorId::NotNull
                | OperatorId::NotBlank
                | OperatorId::NotEqualField
                | OperatorId::INotEqualField
                | OperatorId::NotContainsField
                | OperatorId::INotContainsField
                | OperatorId::NotStartsWithField
                | OperatorId::INotStartsWithField
                | OperatorId::NotEndsWithField
                | OperatorId::INotEndsWithField
        )
    }

    /// Remaps a substring-style operator to its exact-match counterpart,
    /// preserving negation and field-reference flavor. Used when a field's
    /// `ignoreTextMatchStyle` flag or primary-key status forces exact
    /// matching. Operators outside the substring families pass through.
    #[must_use]
    pub fn forced_exact(self, case_sensitive: bool) -> OperatorId {
        if !self.is_substring_style() {
            return self;
        }
        match (self.takes_field_name(), self.is_negated(), case_sensitive) {
            (false, false, true) => OperatorId::Equals,
            (false, false, false) => OperatorId::IEquals,
            (false, true, true) => OperatorId::NotEqual,
            (false, true, false) => OperatorId::INotEqual,
            (true, false, true) => OperatorId::EqualsField,
            (true, false, false) => OperatorId::IEqualsField,
            (true, true, true) => OperatorId::NotEqualField,
            (true, true, false) => OperatorId::INotEqualField,
        }
    }
}

impl fmt::Display for OperatorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OperatorId {
    type Err = EvaluationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        OperatorId::ALL
            .iter()
            .copied()
            .find(|id| id.as_str() == s)
            .ok_or_else(|| EvaluationError::UnknownOperator(s.to_string()))
    }
}

impl Serialize for OperatorId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for OperatorId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Shape of the comparison value an operator expects in a criterion leaf.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueArity {
    /// No value (null/blank tests).
    None,
    /// A single literal value.
    Single,
    /// A `start`/`end` pair (range operators).
    Pair,
    /// An array of values (set membership).
    Set,
    /// The name of another field of the same record.
    FieldName,
    /// Nested subcriteria (logical combinators).
    SubCriteria,
}

/// The resolved comparison input for one leaf evaluation.
///
/// The evaluator resolves field lookups, type coercion, and field-to-field
/// references before handing this to the operator's evaluation function.
#[derive(Debug)]
pub struct EvalContext<'a> {
    /// The operator being applied (for error reporting).
    pub operator: OperatorId,
    /// The record's value for the criterion field (`Null` when absent).
    pub field_value: &'a FieldValue,
    /// The resolved comparison value.
    pub comparand: Comparand<'a>,
    /// Declared type of the criterion field.
    pub field_type: FieldType,
}

/// The comparison value side of an [`EvalContext`].
#[derive(Debug)]
pub enum Comparand<'a> {
    /// No value (null/blank tests).
    None,
    /// A single literal, or the resolved value of the other field for
    /// field-to-field operators.
    Value(&'a FieldValue),
    /// Range bounds.
    Range {
        start: &'a FieldValue,
        end: &'a FieldValue,
    },
    /// Set members.
    Set(&'a [FieldValue]),
}

/// Evaluation function type: given the resolved context, does the record's
/// field value satisfy the operator?
pub type EvalFn = Box<dyn Fn(&EvalContext<'_>) -> Result<bool, EvaluationError> + Send + Sync>;

/// A registered operator: identity, expected value shape, applicable field
/// types, and evaluation behavior.
pub struct OperatorDef {
    /// Operator identity.
    pub id: OperatorId,
    /// Expected comparison-value shape, checked at criteria validation.
    pub arity: ValueArity,
    /// Field types this operator can be offered for.
    pub applicable_types: Vec<FieldType>,
    eval: EvalFn,
}

impl OperatorDef {
    /// Creates a definition from an evaluation closure.
    pub fn new<F>(
        id: OperatorId,
        arity: ValueArity,
        applicable_types: Vec<FieldType>,
        eval: F,
    ) -> Self
    where
        F: Fn(&EvalContext<'_>) -> Result<bool, EvaluationError> + Send + Sync + 'static,
    {
        Self {
            id,
            arity,
            applicable_types,
            eval: Box::new(eval),
        }
    }

    /// Runs the operator against a resolved evaluation context.
    ///
    /// # Errors
    ///
    /// Propagates configuration errors from the evaluation function
    /// (unsupported field type, invalid pattern, misplaced combinator).
    pub fn evaluate(&self, ctx: &EvalContext<'_>) -> Result<bool, EvaluationError> {
        (self.eval)(ctx)
    }
}

impl fmt::Debug for OperatorDef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OperatorDef")
            .field("id", &self.id)
            .field("arity", &self.arity)
            .field("applicable_types", &self.applicable_types)
            .finish_non_exhaustive()
    }
}

/// Catalog of operator definitions, keyed by [`OperatorId`].
#[derive(Debug, Default)]
pub struct OperatorRegistry {
    defs: HashMap<OperatorId, OperatorDef>,
}

impl OperatorRegistry {
    /// An empty registry with no operators.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// A registry carrying the full built-in catalog.
    #[must_use]
    pub fn builtin() -> Self {
        let mut registry = OperatorRegistry::empty();
        register_builtins(&mut registry);
        registry
    }

    /// Registers a definition, replacing any previous one for the same id.
    pub fn register(&mut self, def: OperatorDef) {
        self.defs.insert(def.id, def);
    }

    /// Looks up an operator definition.
    ///
    /// # Errors
    ///
    /// [`EvaluationError::UnknownOperator`] when the id is not registered.
    pub fn lookup(&self, id: OperatorId) -> Result<&OperatorDef, EvaluationError> {
        self.defs
            .get(&id)
            .ok_or_else(|| EvaluationError::UnknownOperator(id.as_str().to_string()))
    }

    /// The operator ids applicable to a field type, in stable (wire-string)
    /// order.
    #[must_use]
    pub fn operators_for(&self, field_type: FieldType) -> Vec<OperatorId> {
        let mut ids: Vec<OperatorId> = self
            .defs
            .values()
            .filter(|def| def.applicable_types.contains(&field_type))
            .map(|def| def.id)
            .collect();
        ids.sort_by_key(|id| id.as_str());
        ids
    }
}

// ---------------------------------------------------------------------------
// Built-in semantics
// ---------------------------------------------------------------------------

const ALL_TYPES: [FieldType; 7] = [
    FieldType::Text,
    FieldType::Integer,
    FieldType::Float,
    FieldType::Boolean,
    FieldType::Date,
    FieldType::DateTime,
    FieldType::Time,
];

const ORDERABLE_TYPES: [FieldType; 6] = [
    FieldType::Text,
    FieldType::Integer,
    FieldType::Float,
    FieldType::Date,
    FieldType::DateTime,
    FieldType::Time,
];

/// Types on which substring-style matching can succeed. Boolean and temporal
/// fields still accept these operators structurally but always evaluate
/// false, so they are not advertised.
const TEXTUAL_TYPES: [FieldType; 3] = [FieldType::Text, FieldType::Integer, FieldType::Float];

fn equality(ci: bool, negate: bool) -> impl Fn(&EvalContext<'_>) -> Result<bool, EvaluationError> {
    move |ctx| {
        if ci && ctx.field_type != FieldType::Text {
            return Err(EvaluationError::UnsupportedFieldType {
                operator: ctx.operator,
                field_type: ctx.field_type,
            });
        }
        let Comparand::Value(value) = &ctx.comparand else {
            return Ok(false);
        };
        let matched = if ci {
            ctx.field_value.eq_ignore_case(value)
        } else {
            ctx.field_value == *value
        };
        Ok(matched != negate)
    }
}

fn ordering(accept: fn(Ordering) -> bool) -> impl Fn(&EvalContext<'_>) -> Result<bool, EvaluationError> {
    move |ctx| {
        let Comparand::Value(value) = &ctx.comparand else {
            return Ok(false);
        };
        match ctx.field_value.partial_cmp_value(value, false) {
            Some(ord) => Ok(accept(ord)),
            None => Ok(false),
        }
    }
}

fn between(inclusive: bool, ci: bool) -> impl Fn(&EvalContext<'_>) -> Result<bool, EvaluationError> {
    move |ctx| {
        let Comparand::Range { start, end } = &ctx.comparand else {
            return Ok(false);
        };
        let lo = ctx.field_value.partial_cmp_value(start, ci);
        let hi = ctx.field_value.partial_cmp_value(end, ci);
        match (lo, hi) {
            (Some(lo), Some(hi)) => Ok(if inclusive {
                lo != Ordering::Less && hi != Ordering::Greater
            } else {
                lo == Ordering::Greater && hi == Ordering::Less
            }),
            _ => Ok(false),
        }
    }
}

/// Position a substring needle must occupy within the haystack.
#[derive(Clone, Copy)]
enum TextPosition {
    Anywhere,
    Start,
    End,
}

fn substring(
    position: TextPosition,
    ci: bool,
    negate: bool,
) -> impl Fn(&EvalContext<'_>) -> Result<bool, EvaluationError> {
    move |ctx| {
        // Boolean/temporal fields never substring-match.
        if ctx.field_type.is_exact_only() {
            return Ok(false);
        }
        let Comparand::Value(value) = &ctx.comparand else {
            return Ok(false);
        };
        // Numeric criterion against a numeric field: exact comparison.
        if ctx.field_type.is_numeric() && value.as_text().is_none() {
            let matched = ctx.field_value == *value;
            return Ok(matched != negate);
        }
        let Some(needle) = value.render_text() else {
            return Ok(false);
        };
        let matched = match ctx.field_value.render_text() {
            None => false,
            Some(haystack) => {
                let (haystack, needle) = if ci {
                    (haystack.to_lowercase(), needle.to_lowercase())
                } else {
                    (haystack, needle)
                };
                match position {
                    TextPosition::Anywhere => haystack.contains(&needle),
                    TextPosition::Start => haystack.starts_with(&needle),
                    TextPosition::End => haystack.ends_with(&needle),
                }
            }
        };
        Ok(matched != negate)
    }
}

fn wildcard(
    anchor: PatternAnchor,
    ci: bool,
) -> impl Fn(&EvalContext<'_>) -> Result<bool, EvaluationError> {
    move |ctx| {
        if ctx.field_type.is_exact_only() {
            return Ok(false);
        }
        let Comparand::Value(value) = &ctx.comparand else {
            return Ok(false);
        };
        let Some(pattern) = value.as_text() else {
            return Ok(false);
        };
        let Some(haystack) = ctx.field_value.render_text() else {
            return Ok(false);
        };
        let re = compile_wildcard(pattern, anchor, ci)?;
        Ok(re.is_match(&haystack))
    }
}

fn regexp(ci: bool) -> impl Fn(&EvalContext<'_>) -> Result<bool, EvaluationError> {
    move |ctx| {
        if ctx.field_type.is_exact_only() {
            return Ok(false);
        }
        let Comparand::Value(value) = &ctx.comparand else {
            return Ok(false);
        };
        let Some(pattern) = value.as_text() else {
            return Ok(false);
        };
        let Some(haystack) = ctx.field_value.render_text() else {
            return Ok(false);
        };
        let expr = if ci {
            format!("(?i){pattern}")
        } else {
            pattern.to_string()
        };
        let re = Regex::new(&expr).map_err(|err| EvaluationError::InvalidPattern {
            pattern: pattern.to_string(),
            reason: err.to_string(),
        })?;
        Ok(re.is_match(&haystack))
    }
}

fn null_test(
    blank: bool,
    negate: bool,
) -> impl Fn(&EvalContext<'_>) -> Result<bool, EvaluationError> {
    move |ctx| {
        let matched = if blank {
            ctx.field_value.is_blank()
        } else {
            ctx.field_value.is_null()
        };
        Ok(matched != negate)
    }
}

fn set_membership(negate: bool) -> impl Fn(&EvalContext<'_>) -> Result<bool, EvaluationError> {
    move |ctx| {
        let Comparand::Set(members) = &ctx.comparand else {
            return Ok(false);
        };
        let matched = match ctx.field_value {
            // Array-valued field: match when any element is in the set.
            FieldValue::Array(items) => items
                .iter()
                .any(|item| members.iter().any(|member| member == item)),
            value => members.iter().any(|member| member == value),
        };
        Ok(matched != negate)
    }
}

fn misplaced_logical(ctx: &EvalContext<'_>) -> Result<bool, EvaluationError> {
    Err(EvaluationError::CompoundOperator(ctx.operator))
}

#[allow(clippy::too_many_lines)]
fn register_builtins(registry: &mut OperatorRegistry) {
    use OperatorId as Op;

    // equality (i-variants are text-only; exact ones apply everywhere)
    for (id, ci, negate) in [
        (Op::Equals, false, false),
        (Op::IEquals, true, false),
        (Op::NotEqual, false, true),
        (Op::INotEqual, true, true),
    ] {
        let types = if ci { vec![FieldType::Text] } else { ALL_TYPES.to_vec() };
        registry.register(OperatorDef::new(id, ValueArity::Single, types, equality(ci, negate)));
    }
    for (id, ci, negate) in [
        (Op::EqualsField, false, false),
        (Op::IEqualsField, true, false),
        (Op::NotEqualField, false, true),
        (Op::INotEqualField, true, true),
    ] {
        let types = if ci { vec![FieldType::Text] } else { ALL_TYPES.to_vec() };
        registry.register(OperatorDef::new(id, ValueArity::FieldName, types, equality(ci, negate)));
    }

    // ordering
    let ordering_ops: [(Op, ValueArity, fn(Ordering) -> bool); 8] = [
        (Op::GreaterThan, ValueArity::Single, |ord| ord == Ordering::Greater),
        (Op::LessThan, ValueArity::Single, |ord| ord == Ordering::Less),
        (Op::GreaterOrEqual, ValueArity::Single, |ord| ord != Ordering::Less),
        (Op::LessOrEqual, ValueArity::Single, |ord| ord != Ordering::Greater),
        (Op::GreaterThanField, ValueArity::FieldName, |ord| ord == Ordering::Greater),
        (Op::LessThanField, ValueArity::FieldName, |ord| ord == Ordering::Less),
        (Op::GreaterOrEqualField, ValueArity::FieldName, |ord| ord != Ordering::Less),
        (Op::LessOrEqualField, ValueArity::FieldName, |ord| ord != Ordering::Greater),
    ];
    for (id, arity, accept) in ordering_ops {
        registry.register(OperatorDef::new(id, arity, ORDERABLE_TYPES.to_vec(), ordering(accept)));
    }

    // ranges
    for (id, inclusive, ci) in [
        (Op::Between, false, false),
        (Op::IBetween, false, true),
        (Op::BetweenInclusive, true, false),
        (Op::IBetweenInclusive, true, true),
    ] {
        registry.register(OperatorDef::new(
            id,
            ValueArity::Pair,
            ORDERABLE_TYPES.to_vec(),
            between(inclusive, ci),
        ));
    }

    // substring family, literal and field-to-field flavors
    let substring_ops = [
        (Op::Contains, TextPosition::Anywhere, false, false),
        (Op::IContains, TextPosition::Anywhere, true, false),
        (Op::NotContains, TextPosition::Anywhere, false, true),
        (Op::INotContains, TextPosition::Anywhere, true, true),
        (Op::StartsWith, TextPosition::Start, false, false),
        (Op::IStartsWith, TextPosition::Start, true, false),
        (Op::NotStartsWith, TextPosition::Start, false, true),
        (Op::INotStartsWith, TextPosition::Start, true, true),
        (Op::EndsWith, TextPosition::End, false, false),
        (Op::IEndsWith, TextPosition::End, true, false),
        (Op::NotEndsWith, TextPosition::End, false, true),
        (Op::INotEndsWith, TextPosition::End, true, true),
    ];
    for (id, position, ci, negate) in substring_ops {
        registry.register(OperatorDef::new(
            id,
            ValueArity::Single,
            TEXTUAL_TYPES.to_vec(),
            substring(position, ci, negate),
        ));
    }
    let substring_field_ops = [
        (Op::ContainsField, TextPosition::Anywhere, false, false),
        (Op::IContainsField, TextPosition::Anywhere, true, false),
        (Op::NotContainsField, TextPosition::Anywhere, false, true),
        (Op::INotContainsField, TextPosition::Anywhere, true, true),
        (Op::StartsWithField, TextPosition::Start, false, false),
        (Op::IStartsWithField, TextPosition::Start, true, false),
        (Op::NotStartsWithField, TextPosition::Start, false, true),
        (Op::INotStartsWithField, TextPosition::Start, true, true),
        (Op::EndsWithField, TextPosition::End, false, false),
        (Op::IEndsWithField, TextPosition::End, true, false),
        (Op::NotEndsWithField, TextPosition::End, false, true),
        (Op::INotEndsWithField, TextPosition::End, true, true),
    ];
    for (id, position, ci, negate) in substring_field_ops {
        registry.register(OperatorDef::new(
            id,
            ValueArity::FieldName,
            TEXTUAL_TYPES.to_vec(),
            substring(position, ci, negate),
        ));
    }

    // wildcard patterns
    for (id, anchor, ci) in [
        (Op::MatchesPattern, PatternAnchor::Full, false),
        (Op::IMatchesPattern, PatternAnchor::Full, true),
        (Op::ContainsPattern, PatternAnchor::Contains, false),
        (Op::IContainsPattern, PatternAnchor::Contains, true),
        (Op::StartsWithPattern, PatternAnchor::Prefix, false),
        (Op::IStartsWithPattern, PatternAnchor::Prefix, true),
        (Op::EndsWithPattern, PatternAnchor::Suffix, false),
        (Op::IEndsWithPattern, PatternAnchor::Suffix, true),
    ] {
        registry.register(OperatorDef::new(
            id,
            ValueArity::Single,
            TEXTUAL_TYPES.to_vec(),
            wildcard(anchor, ci),
        ));
    }

    // regular expressions
    registry.register(OperatorDef::new(
        Op::Regexp,
        ValueArity::Single,
        TEXTUAL_TYPES.to_vec(),
        regexp(false),
    ));
    registry.register(OperatorDef::new(
        Op::IRegexp,
        ValueArity::Single,
        TEXTUAL_TYPES.to_vec(),
        regexp(true),
    ));

    // null / blank
    for (id, blank, negate) in [
        (Op::IsNull, false, false),
        (Op::NotNull, false, true),
        (Op::IsBlank, true, false),
        (Op::NotBlank, true, true),
    ] {
        registry.register(OperatorDef::new(
            id,
            ValueArity::None,
            ALL_TYPES.to_vec(),
            null_test(blank, negate),
        ));
    }

    // set membership
    registry.register(OperatorDef::new(
        Op::InSet,
        ValueArity::Set,
        ALL_TYPES.to_vec(),
        set_membership(false),
    ));
    registry.register(OperatorDef::new(
        Op::NotInSet,
        ValueArity::Set,
        ALL_TYPES.to_vec(),
        set_membership(true),
    ));

    // logical combinators: present in the catalog, dispatched by the
    // evaluator's recursion rather than as leaf tests
    for id in [Op::And, Op::Or, Op::Not] {
        registry.register(OperatorDef::new(
            id,
            ValueArity::SubCriteria,
            ALL_TYPES.to_vec(),
            misplaced_logical,
        ));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx<'a>(
        operator: OperatorId,
        field_value: &'a FieldValue,
        comparand: Comparand<'a>,
        field_type: FieldType,
    ) -> EvalContext<'a> {
        EvalContext {
            operator,
            field_value,
            comparand,
            field_type,
        }
    }

    fn eval(
        registry: &OperatorRegistry,
        operator: OperatorId,
        field_value: &FieldValue,
        comparand: Comparand<'_>,
        field_type: FieldType,
    ) -> Result<bool, EvaluationError> {
        registry
            .lookup(operator)?
            .evaluate(&ctx(operator, field_value, comparand, field_type))
    }

    // ---- Catalog / registry ----

    #[test]
    fn builtin_catalog_is_complete() {
        let registry = OperatorRegistry::builtin();
        for id in OperatorId::ALL {
            assert!(registry.lookup(*id).is_ok(), "missing builtin: {id}");
        }
    }

    #[test]
    fn empty_registry_reports_unknown_operator() {
        let registry = OperatorRegistry::empty();
        let err = registry.lookup(OperatorId::Equals).unwrap_err();
        assert!(matches!(err, EvaluationError::UnknownOperator(ref s) if s == "equals"));
    }

    #[test]
    fn register_replaces_builtin() {
        let mut registry = OperatorRegistry::builtin();
        registry.register(OperatorDef::new(
            OperatorId::Equals,
            ValueArity::Single,
            vec![FieldType::Text],
            |_| Ok(true),
        ));
        let always = eval(
            &registry,
            OperatorId::Equals,
            &FieldValue::from("a"),
            Comparand::Value(&FieldValue::from("b")),
            FieldType::Text,
        );
        assert!(always.unwrap());
    }

    #[test]
    fn operators_for_respects_applicability() {
        let registry = OperatorRegistry::builtin();
        let for_bool = registry.operators_for(FieldType::Boolean);
        assert!(for_bool.contains(&OperatorId::Equals));
        assert!(for_bool.contains(&OperatorId::IsNull));
        assert!(!for_bool.contains(&OperatorId::IContains));
        assert!(!for_bool.contains(&OperatorId::GreaterThan));

        let for_text = registry.operators_for(FieldType::Text);
        assert!(for_text.contains(&OperatorId::IEquals));
        assert!(for_text.contains(&OperatorId::MatchesPattern));
    }

    #[test]
    fn wire_ids_round_trip() {
        for id in OperatorId::ALL {
            let parsed: OperatorId = id.as_str().parse().unwrap();
            assert_eq!(parsed, *id);
        }
        assert!("frobnicate".parse::<OperatorId>().is_err());
        // Historical lowercase id
        assert_eq!("iregexp".parse::<OperatorId>().unwrap(), OperatorId::IRegexp);
    }

    // ---- Equality ----

    #[test]
    fn equals_is_exact_any_type() {
        let registry = OperatorRegistry::builtin();
        assert!(eval(
            &registry,
            OperatorId::Equals,
            &FieldValue::Int(10),
            Comparand::Value(&FieldValue::Int(10)),
            FieldType::Integer,
        )
        .unwrap());
        assert!(!eval(
            &registry,
            OperatorId::Equals,
            &FieldValue::from("Alice"),
            Comparand::Value(&FieldValue::from("alice")),
            FieldType::Text,
        )
        .unwrap());
        assert!(eval(
            &registry,
            OperatorId::NotEqual,
            &FieldValue::from("Alice"),
            Comparand::Value(&FieldValue::from("alice")),
            FieldType::Text,
        )
        .unwrap());
    }

    #[test]
    fn i_equals_folds_case_on_text() {
        let registry = OperatorRegistry::builtin();
        assert!(eval(
            &registry,
            OperatorId::IEquals,
            &FieldValue::from("Alice"),
            Comparand::Value(&FieldValue::from("ALICE")),
            FieldType::Text,
        )
        .unwrap());
    }

    #[test]
    fn i_equals_on_non_text_is_configuration_error() {
        let registry = OperatorRegistry::builtin();
        let err = eval(
            &registry,
            OperatorId::IEquals,
            &FieldValue::Int(1),
            Comparand::Value(&FieldValue::Int(1)),
            FieldType::Integer,
        )
        .unwrap_err();
        assert!(matches!(err, EvaluationError::UnsupportedFieldType { .. }));
    }

    // ---- Ordering and ranges ----

    #[test]
    fn ordering_operators() {
        let registry = OperatorRegistry::builtin();
        let five = FieldValue::Int(5);
        for (op, comparand, expected) in [
            (OperatorId::GreaterThan, FieldValue::Int(3), true),
            (OperatorId::GreaterThan, FieldValue::Int(5), false),
            (OperatorId::GreaterOrEqual, FieldValue::Int(5), true),
            (OperatorId::LessThan, FieldValue::Float(5.5), true),
            (OperatorId::LessOrEqual, FieldValue::Int(4), false),
        ] {
            assert_eq!(
                eval(&registry, op, &five, Comparand::Value(&comparand), FieldType::Integer)
                    .unwrap(),
                expected,
                "{op} vs {comparand:?}"
            );
        }
    }

    #[test]
    fn between_bounds() {
        let registry = OperatorRegistry::builtin();
        let lo = FieldValue::Int(1);
        let hi = FieldValue::Int(10);
        let range = || Comparand::Range { start: &lo, end: &hi };
        // exclusive
        assert!(eval(&registry, OperatorId::Between, &FieldValue::Int(5), range(), FieldType::Integer).unwrap());
        assert!(!eval(&registry, OperatorId::Between, &FieldValue::Int(1), range(), FieldType::Integer).unwrap());
        assert!(!eval(&registry, OperatorId::Between, &FieldValue::Int(10), range(), FieldType::Integer).unwrap());
        // inclusive
        assert!(eval(&registry, OperatorId::BetweenInclusive, &FieldValue::Int(1), range(), FieldType::Integer).unwrap());
        assert!(eval(&registry, OperatorId::BetweenInclusive, &FieldValue::Int(10), range(), FieldType::Integer).unwrap());
        assert!(!eval(&registry, OperatorId::BetweenInclusive, &FieldValue::Int(11), range(), FieldType::Integer).unwrap());
    }

    // ---- Substring ----

    #[test]
    fn substring_case_variants() {
        let registry = OperatorRegistry::builtin();
        let name = FieldValue::from("Alice");
        let needle = FieldValue::from("lic");
        assert!(eval(&registry, OperatorId::Contains, &name, Comparand::Value(&needle), FieldType::Text).unwrap());
        let upper = FieldValue::from("LIC");
        assert!(!eval(&registry, OperatorId::Contains, &name, Comparand::Value(&upper), FieldType::Text).unwrap());
        assert!(eval(&registry, OperatorId::IContains, &name, Comparand::Value(&upper), FieldType::Text).unwrap());
        assert!(eval(&registry, OperatorId::IStartsWith, &name, Comparand::Value(&FieldValue::from("al")), FieldType::Text).unwrap());
        assert!(eval(&registry, OperatorId::IEndsWith, &name, Comparand::Value(&FieldValue::from("CE")), FieldType::Text).unwrap());
        assert!(eval(&registry, OperatorId::INotContains, &name, Comparand::Value(&FieldValue::from("zzz")), FieldType::Text).unwrap());
    }

    #[test]
    fn substring_on_temporal_field_is_always_false() {
        let registry = OperatorRegistry::builtin();
        let d = FieldValue::Date(chrono::NaiveDate::from_ymd_opt(2024, 3, 15).unwrap());
        let needle = FieldValue::from("2024");
        assert!(!eval(&registry, OperatorId::Contains, &d, Comparand::Value(&needle), FieldType::Date).unwrap());
        assert!(!eval(&registry, OperatorId::IContains, &d, Comparand::Value(&needle), FieldType::Date).unwrap());
        // Negations do not sneak through either
        assert!(!eval(&registry, OperatorId::NotContains, &d, Comparand::Value(&needle), FieldType::Date).unwrap());
    }

    #[test]
    fn substring_on_boolean_field_is_always_false() {
        let registry = OperatorRegistry::builtin();
        let b = FieldValue::Bool(true);
        let needle = FieldValue::from("tru");
        assert!(!eval(&registry, OperatorId::Contains, &b, Comparand::Value(&needle), FieldType::Boolean).unwrap());
    }

    #[test]
    fn numeric_field_substring_only_for_textual_criterion() {
        let registry = OperatorRegistry::builtin();
        let hundred = FieldValue::Int(100);
        // Textual "1" matches as substring of "100"
        assert!(eval(&registry, OperatorId::Contains, &hundred, Comparand::Value(&FieldValue::from("1")), FieldType::Integer).unwrap());
        assert!(!eval(&registry, OperatorId::Contains, &hundred, Comparand::Value(&FieldValue::from("2")), FieldType::Integer).unwrap());
        // Numeric 1 against numeric field: exact comparison, not substring
        assert!(!eval(&registry, OperatorId::Contains, &hundred, Comparand::Value(&FieldValue::Int(1)), FieldType::Integer).unwrap());
        assert!(eval(&registry, OperatorId::Contains, &hundred, Comparand::Value(&FieldValue::Int(100)), FieldType::Integer).unwrap());
    }

    #[test]
    fn substring_null_field_matches_negations() {
        let registry = OperatorRegistry::builtin();
        let needle = FieldValue::from("x");
        assert!(!eval(&registry, OperatorId::Contains, &FieldValue::Null, Comparand::Value(&needle), FieldType::Text).unwrap());
        assert!(eval(&registry, OperatorId::NotContains, &FieldValue::Null, Comparand::Value(&needle), FieldType::Text).unwrap());
    }

    // ---- Patterns and regex ----

    #[test]
    fn matches_pattern_semantics() {
        let registry = OperatorRegistry::builtin();
        let pattern = FieldValue::from("foo*bar");
        assert!(eval(&registry, OperatorId::MatchesPattern, &FieldValue::from("foobazbar"), Comparand::Value(&pattern), FieldType::Text).unwrap());
        assert!(!eval(&registry, OperatorId::MatchesPattern, &FieldValue::from("barfoo"), Comparand::Value(&pattern), FieldType::Text).unwrap());
    }

    #[test]
    fn pattern_anchor_variants() {
        let registry = OperatorRegistry::builtin();
        let value = FieldValue::from("alphabet soup");
        assert!(eval(&registry, OperatorId::StartsWithPattern, &value, Comparand::Value(&FieldValue::from("alpha*")), FieldType::Text).unwrap());
        assert!(eval(&registry, OperatorId::EndsWithPattern, &value, Comparand::Value(&FieldValue::from("s?up")), FieldType::Text).unwrap());
        assert!(eval(&registry, OperatorId::ContainsPattern, &value, Comparand::Value(&FieldValue::from("hab?t")), FieldType::Text).unwrap());
        assert!(eval(&registry, OperatorId::IMatchesPattern, &FieldValue::from("ALPHA"), Comparand::Value(&FieldValue::from("alph?")), FieldType::Text).unwrap());
    }

    #[test]
    fn regexp_operators() {
        let registry = OperatorRegistry::builtin();
        let value = FieldValue::from("user-42");
        assert!(eval(&registry, OperatorId::Regexp, &value, Comparand::Value(&FieldValue::from(r"^user-\d+$")), FieldType::Text).unwrap());
        assert!(eval(&registry, OperatorId::IRegexp, &FieldValue::from("USER-42"), Comparand::Value(&FieldValue::from(r"^user-\d+$")), FieldType::Text).unwrap());
        let err = eval(&registry, OperatorId::Regexp, &value, Comparand::Value(&FieldValue::from("(unclosed")), FieldType::Text).unwrap_err();
        assert!(matches!(err, EvaluationError::InvalidPattern { .. }));
    }

    // ---- Null / blank ----

    #[test]
    fn null_and_blank_tests() {
        let registry = OperatorRegistry::builtin();
        let empty = FieldValue::Text(String::new());
        assert!(eval(&registry, OperatorId::IsNull, &FieldValue::Null, Comparand::None, FieldType::Text).unwrap());
        assert!(!eval(&registry, OperatorId::IsNull, &empty, Comparand::None, FieldType::Text).unwrap());
        assert!(eval(&registry, OperatorId::IsBlank, &empty, Comparand::None, FieldType::Text).unwrap());
        assert!(eval(&registry, OperatorId::IsBlank, &FieldValue::Null, Comparand::None, FieldType::Text).unwrap());
        assert!(eval(&registry, OperatorId::NotBlank, &FieldValue::from("x"), Comparand::None, FieldType::Text).unwrap());
        assert!(eval(&registry, OperatorId::NotNull, &empty, Comparand::None, FieldType::Text).unwrap());
    }

    // ---- Set membership ----

    #[test]
    fn in_set_scalar_field() {
        let registry = OperatorRegistry::builtin();
        let members = [FieldValue::from("A"), FieldValue::from("B")];
        assert!(eval(&registry, OperatorId::InSet, &FieldValue::from("A"), Comparand::Set(&members), FieldType::Text).unwrap());
        assert!(!eval(&registry, OperatorId::InSet, &FieldValue::from("C"), Comparand::Set(&members), FieldType::Text).unwrap());
        assert!(eval(&registry, OperatorId::NotInSet, &FieldValue::from("C"), Comparand::Set(&members), FieldType::Text).unwrap());
    }

    #[test]
    fn in_set_array_field_uses_intersection() {
        let registry = OperatorRegistry::builtin();
        let members = [FieldValue::from("blue"), FieldValue::from("red")];
        let tags = FieldValue::Array(vec![FieldValue::from("green"), FieldValue::from("red")]);
        assert!(eval(&registry, OperatorId::InSet, &tags, Comparand::Set(&members), FieldType::Text).unwrap());
        let other = FieldValue::Array(vec![FieldValue::from("green")]);
        assert!(!eval(&registry, OperatorId::InSet, &other, Comparand::Set(&members), FieldType::Text).unwrap());
    }

    // ---- Forced-exact remapping ----

    #[test]
    fn forced_exact_preserves_negation_and_flavor() {
        assert_eq!(OperatorId::IContains.forced_exact(false), OperatorId::IEquals);
        assert_eq!(OperatorId::IContains.forced_exact(true), OperatorId::Equals);
        assert_eq!(OperatorId::NotStartsWith.forced_exact(true), OperatorId::NotEqual);
        assert_eq!(OperatorId::INotEndsWith.forced_exact(false), OperatorId::INotEqual);
        assert_eq!(OperatorId::ContainsField.forced_exact(true), OperatorId::EqualsField);
        // Non-substring operators pass through
        assert_eq!(OperatorId::GreaterThan.forced_exact(true), OperatorId::GreaterThan);
        assert_eq!(OperatorId::IsNull.forced_exact(false), OperatorId::IsNull);
    }

    // ---- Logical operators as leaves ----

    #[test]
    fn logical_operator_as_leaf_errors() {
        let registry = OperatorRegistry::builtin();
        let err = eval(&registry, OperatorId::And, &FieldValue::Null, Comparand::None, FieldType::Text).unwrap_err();
        assert!(matches!(err, EvaluationError::CompoundOperator(OperatorId::And)));
    }
}
