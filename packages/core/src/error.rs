//! Error types for criteria validation and evaluation.
//!
//! Evaluation-time failures are configuration errors: they indicate a
//! misregistered or misapplied operator, not bad data, and are never retried.
//! Structural criteria failures are raised at submission time, before any
//! evaluation or fetch is attempted.

use crate::operators::OperatorId;
use crate::schema::FieldType;

/// Configuration errors raised while evaluating a criterion.
#[derive(Debug, thiserror::Error)]
pub enum EvaluationError {
    /// The referenced operator is not registered with the registry in use.
    #[error("unknown operator: {0}")]
    UnknownOperator(String),

    /// A registered operator was applied to a field type it does not
    /// support (e.g. case-insensitive equality on a non-text field).
    #[error("operator {operator} does not apply to {field_type:?} fields")]
    UnsupportedFieldType {
        operator: OperatorId,
        field_type: FieldType,
    },

    /// A `regexp`/`iregexp` criterion value failed to compile.
    #[error("invalid pattern {pattern:?}: {reason}")]
    InvalidPattern { pattern: String, reason: String },

    /// An operator appeared on the wrong kind of node: a logical combinator
    /// as a field test, or a field operator heading subcriteria.
    #[error("operator {0} is misplaced between compound and leaf position")]
    CompoundOperator(OperatorId),
}

/// Structural errors in a criteria tree, detected before evaluation.
#[derive(Debug, thiserror::Error)]
pub enum CriteriaError {
    /// A compound node carries no subcriteria.
    #[error("compound criterion has no subcriteria")]
    EmptyComposite,

    /// `not` combines anything other than exactly one subcriterion.
    #[error("operator \"not\" requires exactly one subcriterion, got {0}")]
    NotArity(usize),

    /// The criterion's shape does not match the operator's declared arity
    /// (e.g. `between` without both bounds, `inSet` without an array).
    #[error("operator {operator} requires {expected}, criterion carries {found}")]
    ArityMismatch {
        operator: OperatorId,
        expected: &'static str,
        found: &'static str,
    },
}
