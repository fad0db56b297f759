//! Recordset Core — field values, criteria trees, the operator catalog, and
//! client-side evaluation, filtering, and criteria comparison.

pub mod compare;
pub mod criteria;
pub mod error;
pub mod evaluate;
pub mod filter;
pub mod operators;
pub mod pattern;
pub mod schema;
pub mod value;

pub use compare::{CriteriaComparator, CriteriaOutcome, CriteriaPolicy};
pub use criteria::{Criteria, Criterion, SimpleCriteria};
pub use error::{CriteriaError, EvaluationError};
pub use evaluate::{Evaluator, MatchOptions};
pub use filter::FilterEngine;
pub use operators::{Comparand, EvalContext, OperatorDef, OperatorId, OperatorRegistry, ValueArity};
pub use schema::{DataSchema, FieldDescriptor, FieldType, TextMatchStyle};
pub use value::{FieldValue, Record};

#[cfg(test)]
mod tests {
    #[test]
    fn crate_loads() {
        // Empty body: if this test runs, the crate compiles and loads.
    }
}
