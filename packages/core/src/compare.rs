//! Criteria comparison for cache-retention decisions.
//!
//! When the criteria on a result set change, the cache can be kept if the new
//! criteria select a subset of what the old criteria selected. The comparator
//! answers that question conservatively: [`CriteriaOutcome::Narrower`] is only
//! reported for changes it can prove are restrictions (added conjuncts, grown
//! substrings); every uncertain case is [`CriteriaOutcome::Unrelated`] and
//! costs at most an unnecessary fetch, never a wrong local answer.

use serde::{Deserialize, Serialize};

use crate::criteria::Criterion;
use crate::schema::TextMatchStyle;
use crate::value::FieldValue;

/// Retention policy applied when criteria change.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CriteriaPolicy {
    /// Any change discards the cache; only exactly-equal criteria keep it.
    DropOnChange,
    /// Provably-narrower criteria keep the cache for local filtering.
    #[default]
    DropOnShortening,
}

/// Result of comparing new criteria against the criteria a cache was
/// fetched under.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CriteriaOutcome {
    /// Same selection; the cache stays as-is.
    Equivalent,
    /// The new criteria select a subset; the cache can be filtered locally.
    Narrower,
    /// No provable relationship; the cache must be dropped.
    Unrelated,
}

/// How a single node pair contributes to the overall outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Contribution {
    Equal,
    Narrowing,
    Unrelated,
}

/// Compares criteria trees under a policy and text-match style.
#[derive(Debug, Clone, Copy)]
pub struct CriteriaComparator {
    policy: CriteriaPolicy,
    style: TextMatchStyle,
}

impl CriteriaComparator {
    #[must_use]
    pub fn new(policy: CriteriaPolicy, style: TextMatchStyle) -> Self {
        Self { policy, style }
    }

    /// Relates `new` criteria to the `old` criteria of an existing cache.
    #[must_use]
    pub fn compare(&self, new: &Criterion, old: &Criterion) -> CriteriaOutcome {
        // A bare leaf compares like a single-conjunct `and`.
        let contribution = match (new, old) {
            (Criterion::Composite { .. }, Criterion::Composite { .. }) => self.node(new, old),
            (Criterion::Composite { .. }, leaf) => {
                self.node(new, &Criterion::and(vec![leaf.clone()]))
            }
            (leaf, Criterion::Composite { .. }) => {
                self.node(&Criterion::and(vec![leaf.clone()]), old)
            }
            (new_leaf, old_leaf) => self.node(new_leaf, old_leaf),
        };
        match contribution {
            Contribution::Equal => CriteriaOutcome::Equivalent,
            Contribution::Narrowing => match self.policy {
                CriteriaPolicy::DropOnShortening => CriteriaOutcome::Narrower,
                CriteriaPolicy::DropOnChange => CriteriaOutcome::Unrelated,
            },
            Contribution::Unrelated => CriteriaOutcome::Unrelated,
        }
    }

    fn node(&self, new: &Criterion, old: &Criterion) -> Contribution {
        match (new, old) {
            (
                Criterion::Composite {
                    operator: new_op,
                    criteria: new_children,
                },
                Criterion::Composite {
                    operator: old_op,
                    criteria: old_children,
                },
            ) => {
                if new_op != old_op {
                    return Contribution::Unrelated;
                }
                if *new_op == crate::operators::OperatorId::And {
                    self.conjunction(new_children, old_children)
                } else {
                    self.pairwise(new_children, old_children)
                }
            }
            (
                Criterion::Comparison {
                    field_name: new_field,
                    operator: new_op,
                    value: new_value,
                },
                Criterion::Comparison {
                    field_name: old_field,
                    operator: old_op,
                    value: old_value,
                },
            ) => {
                if new_field != old_field || new_op != old_op {
                    return Contribution::Unrelated;
                }
                self.value_contribution(new_value, old_value)
            }
            (
                Criterion::Range {
                    field_name: new_field,
                    operator: new_op,
                    start: new_start,
                    end: new_end,
                },
                Criterion::Range {
                    field_name: old_field,
                    operator: old_op,
                    start: old_start,
                    end: old_end,
                },
            ) => {
                if new_field == old_field
                    && new_op == old_op
                    && new_start == old_start
                    && new_end == old_end
                {
                    Contribution::Equal
                } else {
                    Contribution::Unrelated
                }
            }
            (
                Criterion::FieldComparison {
                    field_name: new_field,
                    operator: new_op,
                    other_field_name: new_other,
                },
                Criterion::FieldComparison {
                    field_name: old_field,
                    operator: old_op,
                    other_field_name: old_other,
                },
            ) => {
                if new_field == old_field && new_op == old_op && new_other == old_other {
                    Contribution::Equal
                } else {
                    Contribution::Unrelated
                }
            }
            _ => Contribution::Unrelated,
        }
    }

    /// `and` children pair by field name and operator rather than position:
    /// every old conjunct must survive in the new criteria, and new-only
    /// conjuncts narrow the selection.
    fn conjunction(&self, new_children: &[Criterion], old_children: &[Criterion]) -> Contribution {
        let mut matched = vec![false; new_children.len()];
        let mut narrowed = false;
        for old_child in old_children {
            let candidate = new_children
                .iter()
                .enumerate()
                .find(|(i, new_child)| !matched[*i] && pairable(new_child, old_child));
            let Some((i, new_child)) = candidate else {
                return Contribution::Unrelated;
            };
            matched[i] = true;
            match self.node(new_child, old_child) {
                Contribution::Unrelated => return Contribution::Unrelated,
                Contribution::Narrowing => narrowed = true,
                Contribution::Equal => {}
            }
        }
        if matched.iter().any(|m| !m) {
            narrowed = true;
        }
        if narrowed {
            Contribution::Narrowing
        } else {
            Contribution::Equal
        }
    }

    /// `or` and `not` children pair strictly by position and count. A
    /// narrower child under `not` broadens the overall selection, so only
    /// exact equality keeps the cache there.
    fn pairwise(&self, new_children: &[Criterion], old_children: &[Criterion]) -> Contribution {
        if new_children.len() != old_children.len() {
            return Contribution::Unrelated;
        }
        for (new_child, old_child) in new_children.iter().zip(old_children) {
            match self.node(new_child, old_child) {
                Contribution::Unrelated | Contribution::Narrowing => {
                    return Contribution::Unrelated;
                }
                Contribution::Equal => {}
            }
        }
        Contribution::Equal
    }

    fn value_contribution(&self, new: &FieldValue, old: &FieldValue) -> Contribution {
        match (new, old) {
            // Arrays compare as sets; membership changes never narrow.
            (FieldValue::Array(new_items), FieldValue::Array(old_items)) => {
                if equal_as_sets(new_items, old_items) {
                    Contribution::Equal
                } else {
                    Contribution::Unrelated
                }
            }
            (FieldValue::Text(new_text), FieldValue::Text(old_text)) => {
                if new_text == old_text {
                    return Contribution::Equal;
                }
                if self.policy == CriteriaPolicy::DropOnShortening
                    && self.style.is_substring_capable()
                    && new_text.len() > old_text.len()
                    && text_narrows(new_text, old_text, self.style)
                {
                    Contribution::Narrowing
                } else {
                    Contribution::Unrelated
                }
            }
            (new_value, old_value) => {
                if new_value == old_value {
                    Contribution::Equal
                } else {
                    Contribution::Unrelated
                }
            }
        }
    }
}

/// Whether two conjuncts constrain the same thing and should be compared.
fn pairable(new: &Criterion, old: &Criterion) -> bool {
    match (new, old) {
        (
            Criterion::Composite { operator: new_op, .. },
            Criterion::Composite { operator: old_op, .. },
        ) => new_op == old_op,
        _ => match (new.field_name(), old.field_name()) {
            (Some(new_field), Some(old_field)) => {
                new_field == old_field && new.operator() == old.operator()
            }
            _ => false,
        },
    }
}

fn text_narrows(new: &str, old: &str, style: TextMatchStyle) -> bool {
    let new = new.to_lowercase();
    let old = old.to_lowercase();
    match style {
        TextMatchStyle::Substring => new.contains(&old),
        TextMatchStyle::StartsWith => new.starts_with(&old),
        TextMatchStyle::Exact | TextMatchStyle::ExactCase => false,
    }
}

fn equal_as_sets(a: &[FieldValue], b: &[FieldValue]) -> bool {
    a.len() == b.len()
        && a.iter().all(|item| b.contains(item))
        && b.iter().all(|item| a.contains(item))
}
