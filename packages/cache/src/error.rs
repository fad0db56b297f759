//! Cache-layer error types.
//!
//! A failed fetch never mutates the cache: the window and state are exactly
//! as they were before the query, and the error is returned to the caller
//! without retry. A superseded response is not an error at all; it is
//! reported as a query outcome and logged at debug level.

use recordset_core::{CriteriaError, EvaluationError};

/// Failure of one fetch against the remote datasource.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    /// The datasource answered with a non-zero status code.
    #[error("fetch failed with status {code}")]
    Status { code: i32 },

    /// The fetch never produced an answer (connectivity, timeout, ...).
    #[error("fetch transport failure: {0}")]
    Transport(#[from] anyhow::Error),
}

/// Any failure surfaced by the cache manager.
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    /// Structurally malformed criteria, rejected before any fetch.
    #[error(transparent)]
    Criteria(#[from] CriteriaError),

    /// Operator configuration error hit while filtering locally.
    #[error(transparent)]
    Evaluation(#[from] EvaluationError),

    /// The remote fetch failed; the cache is untouched.
    #[error(transparent)]
    Fetch(#[from] FetchError),
}
