//! The cache manager: decides per query whether cached rows can answer
//! locally or a fetch is required, applies fetch responses, and folds in
//! data-change events.
//!
//! # Fetch superseding
//!
//! Every fetch carries a generation number. Issuing a new fetch or
//! invalidating the cache bumps the current generation, and a response whose
//! generation is no longer current is dropped silently
//! ([`QueryOutcome::Superseded`]). The split [`CacheManager::begin_fetch`] /
//! [`CacheManager::apply_fetch_response`] pair lets callers run the actual
//! fetch wherever they like while responses are applied on the cache-owning
//! task; [`CacheManager::query`] drives the pair for the common case.

use std::fmt;
use std::ops::Range;

use tracing::debug;

use recordset_core::{
    CriteriaComparator, CriteriaOutcome, Criterion, DataSchema, Evaluator, FilterEngine,
    OperatorRegistry, Record, TextMatchStyle,
};

use crate::clock::{ClockSource, SystemClock};
use crate::error::{CacheError, FetchError};
use crate::fetcher::DataFetcher;
use crate::request::{CacheSyncEvent, FetchRequest, FetchResponse, SortSpecifier, SyncOperation};
use crate::window::{record_key, CacheConfig, CacheState, CacheWindow};

/// Rows answering one query, with the advertised dataset size.
#[derive(Debug, Clone, PartialEq)]
pub struct RowsResult {
    pub records: Vec<Record>,
    /// Absolute row number of the first returned record.
    pub start_row: usize,
    pub total_rows: usize,
    /// `false` while the total is a progressive-loading estimate.
    pub total_rows_exact: bool,
}

/// Result of applying a fetch response.
#[derive(Debug, Clone, PartialEq)]
pub enum QueryOutcome {
    Rows(RowsResult),
    /// The response belonged to an orphaned generation and was dropped.
    Superseded,
}

/// A fetch the manager decided to issue. The caller runs
/// [`PendingFetch::request`] against its fetcher and hands the response back
/// to [`CacheManager::apply_fetch_response`].
#[derive(Debug, Clone)]
pub struct PendingFetch {
    /// Generation this fetch belongs to.
    pub generation: u64,
    /// The outgoing request, row range already extended by look-ahead.
    pub request: FetchRequest,
    criterion: Criterion,
    sort_by: Vec<SortSpecifier>,
    requested: Range<usize>,
    prior_state: CacheState,
}

/// What [`CacheManager::begin_fetch`] decided for one query.
#[derive(Debug, Clone)]
pub enum FetchPlan {
    /// Cached rows answer the query; nothing goes to the datasource.
    Local(RowsResult),
    /// A fetch must be issued.
    Remote(PendingFetch),
}

/// Owns one criteria-scoped cache window and the rules for keeping it.
pub struct CacheManager {
    registry: OperatorRegistry,
    schema: DataSchema,
    config: CacheConfig,
    clock: Box<dyn ClockSource>,
    window: Option<CacheWindow>,
    state: CacheState,
    generation: u64,
}

impl fmt::Debug for CacheManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CacheManager")
            .field("state", &self.state)
            .field("generation", &self.generation)
            .field("window", &self.window)
            .finish_non_exhaustive()
    }
}

impl CacheManager {
    #[must_use]
    pub fn new(registry: OperatorRegistry, schema: DataSchema, config: CacheConfig) -> Self {
        Self::with_clock(registry, schema, config, SystemClock)
    }

    /// Builds a manager with an injected clock, for max-age tests.
    #[must_use]
    pub fn with_clock(
        registry: OperatorRegistry,
        schema: DataSchema,
        config: CacheConfig,
        clock: impl ClockSource + 'static,
    ) -> Self {
        Self {
            registry,
            schema,
            config,
            clock: Box::new(clock),
            window: None,
            state: CacheState::Empty,
            generation: 0,
        }
    }

    #[must_use]
    pub fn state(&self) -> CacheState {
        self.state
    }

    #[must_use]
    pub fn window(&self) -> Option<&CacheWindow> {
        self.window.as_ref()
    }

    #[must_use]
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Validates and plans one query: either cached rows answer it, or a
    /// fetch must be issued. Issuing the plan bumps the generation, making
    /// any in-flight fetch obsolete.
    ///
    /// # Errors
    ///
    /// [`CacheError::Criteria`] on malformed criteria,
    /// [`CacheError::Evaluation`] if local filtering hits a configuration
    /// error.
    pub fn begin_fetch(&mut self, request: &FetchRequest) -> Result<FetchPlan, CacheError> {
        let style = request.text_match_style.unwrap_or(self.config.text_match_style);
        let criterion = request
            .criteria
            .clone()
            .into_criterion(&self.schema, style);
        if !criterion.is_unconstrained() {
            criterion.validate()?;
        }
        let requested = request.row_range();
        let prior_state = self.state;

        if let Some(window) = &self.window {
            if matches!(self.state, CacheState::Partial | CacheState::Complete)
                && window.over_age(self.clock.now(), self.config.max_age_ms)
            {
                debug!(
                    age_ms = self.clock.now().saturating_sub(window.created_at_ms),
                    "cache window over max age"
                );
                self.state = CacheState::Stale;
            }
        }

        if matches!(self.state, CacheState::Partial | CacheState::Complete) {
            if let Some(local) = self.try_local(&criterion, &requested, style)? {
                return Ok(FetchPlan::Local(local));
            }
        }

        self.generation += 1;
        self.state = CacheState::Loading;
        let mut outgoing = request.clone();
        outgoing.start_row = Some(requested.start);
        outgoing.end_row = Some(requested.end + self.config.look_ahead);
        debug!(
            generation = self.generation,
            start_row = requested.start,
            end_row = requested.end + self.config.look_ahead,
            "issuing fetch"
        );
        Ok(FetchPlan::Remote(PendingFetch {
            generation: self.generation,
            request: outgoing,
            criterion,
            sort_by: request.sort_by.clone(),
            requested,
            prior_state,
        }))
    }

    /// Attempts to answer from the window. `None` means a fetch is needed;
    /// on `Unrelated` criteria the window is kept until the replacing
    /// response arrives, so a failed fetch loses nothing.
    fn try_local(
        &mut self,
        criterion: &Criterion,
        requested: &Range<usize>,
        style: TextMatchStyle,
    ) -> Result<Option<RowsResult>, CacheError> {
        let policy = self.config.criteria_policy;
        let comparator = CriteriaComparator::new(policy, style);
        let Some(window) = self.window.as_mut() else {
            return Ok(None);
        };
        match comparator.compare(criterion, &window.criteria) {
            CriteriaOutcome::Unrelated => Ok(None),
            CriteriaOutcome::Equivalent => {
                if !window.covers(requested) {
                    return Ok(None);
                }
                debug!(start_row = requested.start, "answering locally from cache");
                Ok(Some(RowsResult {
                    records: window.rows_in(requested),
                    start_row: requested.start,
                    total_rows: window.total_rows,
                    total_rows_exact: window.total_rows_exact,
                }))
            }
            CriteriaOutcome::Narrower => {
                // Filtered rows renumber from zero, which is only sound when
                // the window itself starts there or holds everything.
                if !(window.complete || window.start_row == 0) {
                    return Ok(None);
                }
                let engine = FilterEngine::new(&self.registry, &self.schema);
                let matched =
                    engine.apply_filter(&window.records, criterion, &self.config.match_options, None)?;
                if !window.complete && requested.end > matched.len() {
                    return Ok(None);
                }
                let (total_rows, total_rows_exact) = if window.complete {
                    (matched.len(), true)
                } else {
                    (matched.len() + self.config.end_gap, false)
                };
                debug!(
                    matched = matched.len(),
                    "narrowed criteria satisfied from cache"
                );
                window.start_row = 0;
                window.records = matched;
                window.criteria = criterion.clone();
                window.total_rows = total_rows;
                window.total_rows_exact = total_rows_exact;
                Ok(Some(RowsResult {
                    records: window.rows_in(requested),
                    start_row: requested.start,
                    total_rows,
                    total_rows_exact,
                }))
            }
        }
    }

    /// Applies a fetch response. A response for a superseded generation is
    /// dropped silently; a non-OK status restores the pre-query state and
    /// surfaces as [`FetchError::Status`].
    ///
    /// # Errors
    ///
    /// [`CacheError::Fetch`] when the response status is non-zero.
    pub fn apply_fetch_response(
        &mut self,
        pending: PendingFetch,
        response: FetchResponse,
    ) -> Result<QueryOutcome, CacheError> {
        if pending.generation != self.generation {
            debug!(
                response_generation = pending.generation,
                current_generation = self.generation,
                "dropping superseded fetch response"
            );
            return Ok(QueryOutcome::Superseded);
        }
        if response.status != FetchResponse::STATUS_OK {
            self.state = pending.prior_state;
            return Err(FetchError::Status {
                code: response.status,
            }
            .into());
        }

        let fetch_range = pending.request.row_range();
        let requested_len = fetch_range.end - fetch_range.start;
        let response_len = response.data.len();

        let comparator = CriteriaComparator::new(
            self.config.criteria_policy,
            self.config.text_match_style,
        );
        let same_criteria = self.window.as_ref().is_some_and(|prev| {
            comparator.compare(&pending.criterion, &prev.criteria) == CriteriaOutcome::Equivalent
        });
        let prev_estimate = self
            .window
            .as_ref()
            .filter(|prev| same_criteria && !prev.total_rows_exact)
            .map(|prev| prev.total_rows);

        // A scroll under unchanged criteria extends the window; anything
        // else replaces it wholesale.
        let (start_row, records) = match self.window.take() {
            Some(prev)
                if same_criteria
                    && response.start_row >= prev.start_row
                    && response.start_row <= prev.end_row() =>
            {
                let keep = response.start_row - prev.start_row;
                let mut merged = prev.records;
                merged.truncate(keep);
                merged.extend(response.data);
                (prev.start_row, merged)
            }
            _ => (response.start_row, response.data),
        };

        let rows_known = start_row + records.len();
        let (total_rows, total_rows_exact) = match response.total_rows {
            Some(total) => (total, true),
            // A short page fixes the exact total; a full page keeps the
            // estimate rolling ahead of what is cached. An estimate never
            // moves backwards while the criteria stand; it only ever
            // shrinks to the exact total.
            None if response_len < requested_len => (rows_known, true),
            None => {
                let floor = prev_estimate.unwrap_or(0);
                ((rows_known + self.config.end_gap).max(floor), false)
            }
        };
        let complete = total_rows_exact && start_row == 0 && records.len() >= total_rows;

        let window = CacheWindow {
            start_row,
            records,
            total_rows,
            total_rows_exact,
            complete,
            criteria: pending.criterion,
            sort_by: pending.sort_by,
            created_at_ms: self.clock.now(),
        };
        self.state = if complete {
            CacheState::Complete
        } else {
            CacheState::Partial
        };
        let result = RowsResult {
            records: window.rows_in(&pending.requested),
            start_row: pending.requested.start,
            total_rows,
            total_rows_exact,
        };
        debug!(
            rows = window.records.len(),
            total_rows,
            total_rows_exact,
            "applied fetch response"
        );
        self.window = Some(window);
        Ok(QueryOutcome::Rows(result))
    }

    /// Rolls the state back after a failed fetch. The window was never
    /// touched, so cache contents are exactly as before the query.
    pub fn fetch_failed(&mut self, pending: &PendingFetch) {
        if pending.generation == self.generation {
            self.state = pending.prior_state;
        }
    }

    /// Plans, runs, and applies one query end to end.
    ///
    /// # Errors
    ///
    /// Everything [`CacheManager::begin_fetch`] and
    /// [`CacheManager::apply_fetch_response`] raise, plus transport errors
    /// from the fetcher.
    pub async fn query(
        &mut self,
        request: &FetchRequest,
        fetcher: &dyn DataFetcher,
    ) -> Result<QueryOutcome, CacheError> {
        match self.begin_fetch(request)? {
            FetchPlan::Local(rows) => Ok(QueryOutcome::Rows(rows)),
            FetchPlan::Remote(pending) => match fetcher.fetch(&pending.request).await {
                Ok(response) => self.apply_fetch_response(pending, response),
                Err(err) => {
                    self.fetch_failed(&pending);
                    Err(err.into())
                }
            },
        }
    }

    /// Folds a data-change event into the window without refetching. Events
    /// for records outside the window, or when no window exists, are no-ops.
    ///
    /// # Errors
    ///
    /// [`CacheError::Evaluation`] if matching a changed record against the
    /// applied criteria hits a configuration error.
    pub fn apply_sync(&mut self, event: &CacheSyncEvent) -> Result<(), CacheError> {
        if self.window.is_none() {
            return Ok(());
        }
        let key_fields: Vec<String> = self
            .schema
            .primary_key_fields()
            .iter()
            .map(|descriptor| descriptor.name.clone())
            .collect();
        for record in &event.data {
            match event.operation_type {
                SyncOperation::Add => self.sync_add(record)?,
                SyncOperation::Update => self.sync_update(record, &key_fields)?,
                SyncOperation::Remove => self.sync_remove(record, &key_fields),
            }
        }
        Ok(())
    }

    fn sync_add(&mut self, record: &Record) -> Result<(), CacheError> {
        let evaluator = Evaluator::new(&self.registry, &self.schema);
        let Some(window) = self.window.as_mut() else {
            return Ok(());
        };
        if evaluator.evaluate(record, &window.criteria, &self.config.match_options)? {
            window.insert_sorted(record.clone());
        }
        Ok(())
    }

    fn sync_update(&mut self, record: &Record, key_fields: &[String]) -> Result<(), CacheError> {
        let evaluator = Evaluator::new(&self.registry, &self.schema);
        let Some(window) = self.window.as_mut() else {
            return Ok(());
        };
        let Some(key) = record_key(record, key_fields) else {
            return Ok(());
        };
        let Some(at) = window.position_of_key(key_fields, &key) else {
            return Ok(());
        };
        if evaluator.evaluate(record, &window.criteria, &self.config.match_options)? {
            window.records[at] = record.clone();
        } else {
            // The updated record fell out of the filtered set.
            window.records.remove(at);
            window.total_rows = window.total_rows.saturating_sub(1);
        }
        Ok(())
    }

    fn sync_remove(&mut self, record: &Record, key_fields: &[String]) {
        let Some(window) = self.window.as_mut() else {
            return;
        };
        let Some(key) = record_key(record, key_fields) else {
            return;
        };
        if let Some(at) = window.position_of_key(key_fields, &key) {
            window.records.remove(at);
            window.total_rows = window.total_rows.saturating_sub(1);
        }
    }

    /// Discards the window and applied criteria unconditionally and orphans
    /// any in-flight fetch.
    pub fn invalidate(&mut self) {
        self.window = None;
        self.state = CacheState::Empty;
        self.generation += 1;
        debug!(generation = self.generation, "cache invalidated");
    }
}
