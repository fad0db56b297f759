//! Local filtering of cached record sets.
//!
//! When new criteria are at least as restrictive as the criteria a cache was
//! fetched under, the narrowed result can be produced locally instead of
//! re-fetching. [`FilterEngine`] applies a criteria tree to a slice of
//! records, preserving input order, and optionally slices the matches to a
//! paging window.

use std::ops::Range;

use tracing::debug;

use crate::criteria::Criterion;
use crate::error::EvaluationError;
use crate::evaluate::{Evaluator, MatchOptions};
use crate::operators::OperatorRegistry;
use crate::schema::DataSchema;
use crate::value::Record;

/// Applies criteria to in-memory records. Pure: input records are never
/// mutated, and equal inputs always produce equal outputs.
#[derive(Debug, Clone, Copy)]
pub struct FilterEngine<'a> {
    evaluator: Evaluator<'a>,
}

impl<'a> FilterEngine<'a> {
    #[must_use]
    pub fn new(registry: &'a OperatorRegistry, schema: &'a DataSchema) -> Self {
        Self {
            evaluator: Evaluator::new(registry, schema),
        }
    }

    /// Keeps the records matching `criterion`, in input order, then applies
    /// the optional `[start, end)` row window to the matches. An
    /// out-of-range window clamps rather than failing.
    ///
    /// # Errors
    ///
    /// The first [`EvaluationError`] hit; nothing is returned on partial
    /// failure.
    pub fn apply_filter(
        &self,
        records: &[Record],
        criterion: &Criterion,
        options: &MatchOptions,
        range: Option<Range<usize>>,
    ) -> Result<Vec<Record>, EvaluationError> {
        let mut matches = Vec::new();
        for record in records {
            if self.evaluator.evaluate(record, criterion, options)? {
                matches.push(record.clone());
            }
        }
        debug!(
            total = records.len(),
            matched = matches.len(),
            "applied local filter"
        );
        if let Some(range) = range {
            let start = range.start.min(matches.len());
            let end = range.end.min(matches.len()).max(start);
            matches = matches[start..end].to_vec();
        }
        Ok(matches)
    }
}
