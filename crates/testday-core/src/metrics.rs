// Metric resolution: turning a player's selected rows into metric values.

use crate::config::{Aggregation, MetricConfig};
use crate::sources::ingest::RawRow;
use std::collections::BTreeMap;
use tracing::trace;

/// Resolved values for one player in one source, keyed by metric id.
/// `None` marks a missing value, never zero.
pub type MetricValues = BTreeMap<String, Option<f64>>;

/// Sentinel vendors write for "not measured".
const NOT_AVAILABLE: &str = "N/A";

/// Parse a raw cell into a number. Thousands separators are accepted; blank,
/// `N/A`, unparseable and non-finite values are missing.
pub fn parse_metric_value(raw: &str) -> Option<f64> {
    let v = raw.trim();
    if v.is_empty() || v.eq_ignore_ascii_case(NOT_AVAILABLE) {
        return None;
    }
    let cleaned: String = v.chars().filter(|&c| c != ',').collect();
    cleaned.parse::<f64>().ok().filter(|x| x.is_finite())
}

fn metric_from_row(row: &RawRow, meta: &MetricConfig) -> Option<f64> {
    let raw = row.get(&meta.column)?;
    let value = parse_metric_value(raw);
    if value.is_none() && !raw.trim().is_empty() {
        trace!("treating {:?} in column '{}' as missing", raw, meta.column);
    }
    value.map(|v| meta.transform.apply(v))
}

/// Take every metric from the first selected row.
pub fn extract_metrics(rows: &[&RawRow], metrics: &BTreeMap<String, MetricConfig>) -> MetricValues {
    let first = rows.first();
    metrics
        .iter()
        .map(|(id, meta)| (id.clone(), first.and_then(|row| metric_from_row(row, meta))))
        .collect()
}

/// Reduce every present value of each metric across all selected rows.
pub fn aggregate_metrics(
    rows: &[&RawRow],
    metrics: &BTreeMap<String, MetricConfig>,
    aggregation: Aggregation,
) -> MetricValues {
    metrics
        .iter()
        .map(|(id, meta)| {
            let values: Vec<f64> = rows
                .iter()
                .filter_map(|row| metric_from_row(row, meta))
                .collect();
            (id.clone(), reduce(&values, aggregation))
        })
        .collect()
}

fn reduce(values: &[f64], aggregation: Aggregation) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let result = match aggregation {
        Aggregation::Min => values.iter().copied().fold(f64::INFINITY, f64::min),
        Aggregation::Max => values.iter().copied().fold(f64::NEG_INFINITY, f64::max),
        Aggregation::Avg => values.iter().sum::<f64>() / values.len() as f64,
    };
    Some(result)
}

/// Extraction when no aggregation is configured, aggregation otherwise.
pub fn resolve_metrics(
    rows: &[&RawRow],
    metrics: &BTreeMap<String, MetricConfig>,
    aggregation: Option<Aggregation>,
) -> MetricValues {
    match aggregation {
        Some(agg) => aggregate_metrics(rows, metrics, agg),
        None => extract_metrics(rows, metrics),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
