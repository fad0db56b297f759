//! The cached row window and its retention configuration.

use recordset_core::{CriteriaPolicy, Criterion, FieldValue, MatchOptions, Record, TextMatchStyle};

use crate::request::{compare_records, SortSpecifier};

/// Lifecycle of the cache for one criteria set.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CacheState {
    /// No rows and no applied criteria.
    #[default]
    Empty,
    /// A fetch is in flight; any previous window remains readable until the
    /// response lands.
    Loading,
    /// Rows cached for part of the result set.
    Partial,
    /// Every row of the result set is cached.
    Complete,
    /// The window outlived its max age and must be refetched.
    Stale,
}

/// Tuning knobs for cache retention and progressive loading.
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Retention policy applied when criteria change.
    pub criteria_policy: CriteriaPolicy,
    /// Default text-match style when a request does not override it.
    pub text_match_style: TextMatchStyle,
    /// Rows advertised past the known end while the true total is unknown.
    pub end_gap: usize,
    /// Extra rows fetched past the requested end of each page.
    pub look_ahead: usize,
    /// Window lifetime in milliseconds; `None` disables expiry.
    pub max_age_ms: Option<u64>,
    /// Evaluation defaults for local filtering.
    pub match_options: MatchOptions,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            criteria_policy: CriteriaPolicy::default(),
            text_match_style: TextMatchStyle::default(),
            end_gap: 75,
            look_ahead: 75,
            max_age_ms: None,
            match_options: MatchOptions::default(),
        }
    }
}

/// A contiguous run of cached rows `[start_row, start_row + len)` together
/// with the criteria and sort they were fetched under.
///
/// Invariant: every record in the window satisfies `criteria`, and
/// `total_rows` is at least the held row count.
#[derive(Debug, Clone)]
pub struct CacheWindow {
    pub start_row: usize,
    pub records: Vec<Record>,
    /// Advertised dataset size; an estimate unless `total_rows_exact`.
    pub total_rows: usize,
    pub total_rows_exact: bool,
    /// The window holds the entire result set.
    pub complete: bool,
    pub criteria: Criterion,
    pub sort_by: Vec<SortSpecifier>,
    /// Clock reading at creation, for max-age expiry.
    pub created_at_ms: u64,
}

impl CacheWindow {
    /// First row past the cached run.
    #[must_use]
    pub fn end_row(&self) -> usize {
        self.start_row + self.records.len()
    }

    /// Whether `[start, end)` can be answered from cached rows alone.
    #[must_use]
    pub fn covers(&self, range: &std::ops::Range<usize>) -> bool {
        self.complete || (range.start >= self.start_row && range.end <= self.end_row())
    }

    /// Cached rows for `[start, end)` in absolute row numbers, clamped to
    /// what is held.
    #[must_use]
    pub fn rows_in(&self, range: &std::ops::Range<usize>) -> Vec<Record> {
        let len = self.records.len();
        let lo = range.start.saturating_sub(self.start_row).min(len);
        let hi = range.end.saturating_sub(self.start_row).clamp(lo, len);
        self.records[lo..hi].to_vec()
    }

    /// Whether the window has outlived `max_age_ms` as of `now_ms`.
    #[must_use]
    pub fn over_age(&self, now_ms: u64, max_age_ms: Option<u64>) -> bool {
        max_age_ms.is_some_and(|max| now_ms.saturating_sub(self.created_at_ms) >= max)
    }

    /// Inserts a record at its sort position (after equal keys, preserving
    /// arrival order) and grows `total_rows`.
    pub fn insert_sorted(&mut self, record: Record) {
        let at = self
            .records
            .partition_point(|held| compare_records(&self.sort_by, held, &record) != std::cmp::Ordering::Greater);
        self.records.insert(at, record);
        self.total_rows += 1;
    }

    /// Index of the held record whose primary-key fields equal `key`.
    #[must_use]
    pub fn position_of_key(&self, key_fields: &[String], key: &[FieldValue]) -> Option<usize> {
        self.records.iter().position(|record| {
            key_fields
                .iter()
                .zip(key)
                .all(|(field, expected)| record.get(field) == Some(expected))
        })
    }
}

/// Extracts a record's primary-key values; `None` when any key field is
/// absent from the record.
#[must_use]
pub fn record_key(record: &Record, key_fields: &[String]) -> Option<Vec<FieldValue>> {
    key_fields
        .iter()
        .map(|field| record.get(field).cloned())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn window() -> CacheWindow {
        CacheWindow {
            start_row: 10,
            records: (10..15)
                .map(|i| Record::from_pairs([("id", FieldValue::Int(i)), ("name", FieldValue::from(format!("row{i}")))]))
                .collect(),
            total_rows: 40,
            total_rows_exact: false,
            complete: false,
            criteria: Criterion::and(vec![]),
            sort_by: vec![SortSpecifier::asc("id")],
            created_at_ms: 1_000,
        }
    }

    #[test]
    fn covers_only_held_rows_unless_complete() {
        let mut w = window();
        assert!(w.covers(&(10..15)));
        assert!(w.covers(&(11..13)));
        assert!(!w.covers(&(9..12)));
        assert!(!w.covers(&(12..16)));
        w.complete = true;
        assert!(w.covers(&(0..100)));
    }

    #[test]
    fn rows_in_clamps_to_held_range() {
        let w = window();
        let ids = |rows: Vec<Record>| -> Vec<i64> {
            rows.iter()
                .map(|r| match r.get("id") {
                    Some(FieldValue::Int(i)) => *i,
                    other => panic!("unexpected id {other:?}"),
                })
                .collect()
        };
        assert_eq!(ids(w.rows_in(&(11..13))), [11, 12]);
        assert_eq!(ids(w.rows_in(&(0..100))), [10, 11, 12, 13, 14]);
        assert!(w.rows_in(&(20..30)).is_empty());
    }

    #[test]
    fn insert_sorted_respects_sort_and_total() {
        let mut w = window();
        w.insert_sorted(Record::from_pairs([("id", FieldValue::Int(12)), ("name", FieldValue::from("new"))]));
        let ids: Vec<i64> = w
            .records
            .iter()
            .map(|r| match r.get("id") {
                Some(FieldValue::Int(i)) => *i,
                other => panic!("unexpected id {other:?}"),
            })
            .collect();
        assert_eq!(ids, [10, 11, 12, 12, 13, 14]);
        assert_eq!(w.total_rows, 41);
        // the new record lands after the equal key it ties with
        assert_eq!(
            w.records[3].get("name"),
            Some(&FieldValue::from("new"))
        );
    }

    #[test]
    fn key_lookup_and_extraction() {
        let w = window();
        let key_fields = vec!["id".to_string()];
        let key = vec![FieldValue::Int(12)];
        assert_eq!(w.position_of_key(&key_fields, &key), Some(2));
        assert_eq!(w.position_of_key(&key_fields, &[FieldValue::Int(99)]), None);

        let record = Record::from_pairs([("name", FieldValue::from("x"))]);
        assert_eq!(record_key(&record, &key_fields), None);
        let keyed = Record::from_pairs([("id", FieldValue::Int(5))]);
        assert_eq!(record_key(&keyed, &key_fields), Some(vec![FieldValue::Int(5)]));
    }

    #[test]
    fn over_age_uses_injected_clock_reading() {
        let w = window();
        assert!(!w.over_age(1_500, None));
        assert!(!w.over_age(1_499, Some(500)));
        assert!(w.over_age(1_500, Some(500)));
    }
}
