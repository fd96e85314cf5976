//! Combining legacy and next-gen results for a range that straddles the
//! cutover. Inputs are never mutated; each merge returns a new value.

use std::collections::HashMap;

use chrono::NaiveDate;

use crate::report::{MetricSet, Row};
use crate::vocabulary::{MergePolicy, MetricKey};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum BucketKey {
    Day(NaiveDate),
    Position(usize),
}

/// Merge two row sequences bucket by bucket.
///
/// Dated rows share a bucket per day; every other row is its own bucket,
/// keyed by position in the combined sequence. Legacy rows go in first. A
/// next-gen row replaces an existing bucket only when its pageviews are
/// non-zero, since both backends emit zero-filled rows for days only one of
/// them has data for. Replaced buckets keep their first position.
pub fn merge_rows(legacy: &[Row], next_gen: &[Row]) -> Vec<Row> {
    let mut merged: Vec<Row> = Vec::with_capacity(legacy.len() + next_gen.len());
    let mut index: HashMap<BucketKey, usize> = HashMap::new();

    for (position, row) in legacy.iter().chain(next_gen).enumerate() {
        let key = row
            .day()
            .map(BucketKey::Day)
            .unwrap_or(BucketKey::Position(position));
        match index.get(&key) {
            None => {
                index.insert(key, merged.len());
                merged.push(row.clone());
            }
            Some(&slot) if row.metrics.get(MetricKey::Pageviews) != 0.0 => {
                merged[slot] = row.clone();
            }
            Some(_) => {}
        }
    }

    merged
}

/// Merge two single-period totals.
///
/// Keys are combined per [`MetricKey::merge_policy`]; source metrics without
/// a canonical name are summed.
pub fn merge_metrics(legacy: &MetricSet, next_gen: &MetricSet) -> MetricSet {
    let mut merged = MetricSet::new();

    for key in MetricKey::ALL {
        if !legacy.contains(key) && !next_gen.contains(key) {
            continue;
        }
        let (a, b) = (legacy.get(key), next_gen.get(key));
        let value = match key.merge_policy() {
            MergePolicy::Sum => a + b,
            MergePolicy::AverageIfBothPresent => average_if_both_present(a, b),
        };
        merged.set(key, value);
    }

    let names: Vec<&str> = legacy.unmapped_names().chain(next_gen.unmapped_names()).collect();
    for name in names {
        let value = legacy.unmapped(name).unwrap_or(0.0) + next_gen.unmapped(name).unwrap_or(0.0);
        merged.set_unmapped(name, value);
    }

    merged
}

fn average_if_both_present(a: f64, b: f64) -> f64 {
    if a > 0.0 && b > 0.0 {
        (a + b) / 2.0
    } else if a > 0.0 {
        a
    } else {
        b
    }
}
