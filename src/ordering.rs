//! Merge order for result sets.
//!
//! Rows are ordered by their `time` field as plain strings. This matches
//! chronological order only when the producer emits a sortable format such as
//! `2024-01-02T10:00` or `01일 10시 00분`; the aggregator assumes it and does
//! not check.
use crate::model::Row;
use std::cmp::Ordering;

pub fn compare(a: &Row, b: &Row) -> Ordering {
    a.time.cmp(&b.time)
}

/// Position at which `row` goes so that `rows` stays sorted and ties keep
/// arrival order (after every existing row with an equal `time`).
pub fn insertion_index(rows: &[Row], row: &Row) -> usize {
    rows.partition_point(|existing| compare(existing, row) != Ordering::Greater)
}

pub fn is_sorted(rows: &[Row]) -> bool {
    rows.windows(2)
        .all(|pair| compare(&pair[0], &pair[1]) != Ordering::Greater)
}
