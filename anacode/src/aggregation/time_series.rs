//! Bucketing of occurrences by document date.

use std::collections::{BTreeMap, HashMap};

use chrono::{Duration, NaiveDate};
use serde::Serialize;
use tracing::debug;

use crate::error::{AnacodeError, Result};

use super::Occurrences;

/// Occurrences of one name among documents dated within `[start, stop)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TimeBucket {
    pub start: NaiveDate,
    pub stop: NaiveDate,
    pub name: String,
    pub count: i64,
}

/// Counts occurrences of `names` per date bucket.
///
/// `dates` maps `doc_id` to the document's date; occurrences of undated
/// documents are skipped. Without an explicit `interval` the buckets span the
/// earliest to the latest date in `dates`. Buckets are `width` wide and
/// half-open; the last one is extended past the requested stop when `width`
/// does not divide the interval. Rows come out bucket by bucket, with names in
/// the order given.
pub fn make_time_series<S: AsRef<str>>(
    occurrences: &Occurrences<'_>,
    names: &[S],
    dates: &BTreeMap<i64, NaiveDate>,
    width: Duration,
    interval: Option<(NaiveDate, NaiveDate)>,
) -> Result<Vec<TimeBucket>> {
    if names.is_empty() {
        return Err(AnacodeError::invalid_argument(
            "at least one name is required",
        ));
    }
    let days = width.num_days();
    if days <= 0 || Duration::days(days) != width {
        return Err(AnacodeError::invalid_argument(format!(
            "bucket width must be a positive number of whole days, got {width}"
        )));
    }
    let (start, stop) = match interval {
        Some(bounds) => bounds,
        None => {
            let first = dates.values().min();
            let last = dates.values().max();
            match first.zip(last) {
                Some((first, last)) => (*first, *last),
                None => {
                    return Err(AnacodeError::empty_dataset(
                        "no document dates to derive the interval from",
                    ))
                }
            }
        }
    };
    if start > stop {
        return Err(AnacodeError::invalid_argument(format!(
            "interval start {start} is after stop {stop}"
        )));
    }

    let bounds = bucket_bounds(start, stop, width)?;
    let wanted: HashMap<&str, usize> = names
        .iter()
        .enumerate()
        .map(|(i, name)| (name.as_ref(), i))
        .collect();

    let mut counts = vec![vec![0_i64; names.len()]; bounds.len()];
    for row in occurrences.iter() {
        let Some(&column) = wanted.get(row.name) else {
            continue;
        };
        let Some(date) = dates.get(&row.doc_id) else {
            continue;
        };
        if let Some(bucket) = bounds.iter().position(|(lo, hi)| lo <= date && date < hi) {
            counts[bucket][column] += row.weight;
        }
    }

    let mut series = Vec::with_capacity(bounds.len() * names.len());
    for ((lo, hi), row) in bounds.iter().zip(counts) {
        for (name, count) in names.iter().zip(row) {
            series.push(TimeBucket {
                start: *lo,
                stop: *hi,
                name: name.as_ref().to_string(),
                count,
            });
        }
    }
    debug!(buckets = bounds.len(), names = names.len(), "built time series");
    Ok(series)
}

/// `[lo, lo + width)` ranges from `start` until one reaches `stop`.
fn bucket_bounds(
    start: NaiveDate,
    stop: NaiveDate,
    width: Duration,
) -> Result<Vec<(NaiveDate, NaiveDate)>> {
    let mut bounds = Vec::new();
    let mut lo = start;
    while lo < stop {
        let hi = lo.checked_add_signed(width).ok_or_else(|| {
            AnacodeError::invalid_argument(format!("bucket after {lo} is out of the date range"))
        })?;
        bounds.push((lo, hi));
        lo = hi;
    }
    Ok(bounds)
}
