// Report assembly: per-player records and the output envelope.

use crate::config::{MappingConfig, ScoreRange};
use crate::names::IdAllocator;
use crate::pipeline::ResolvedSources;
use crate::scoring::{score_category, CategoryResult};
use crate::sources::temporal::format_instant;
use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;
use std::collections::BTreeMap;

/// Unit tag meaning "vendor-specific score"; displayed without a suffix.
const VENDOR_UNIT: &str = "vendor";

// ---------------------------------------------------------------------------
// Clock
// ---------------------------------------------------------------------------

/// Source of the report's generation time.
pub trait Clock {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall-clock time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A clock frozen at one instant.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<Utc>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

// ---------------------------------------------------------------------------
// Output types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Report {
    pub event: serde_json::Value,
    pub generated_at: String,
    pub score_range: ScoreRange,
    pub players: Vec<PlayerRecord>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerRecord {
    pub id: String,
    pub name: String,
    pub position: Option<String>,
    pub measured_at: Option<String>,
    pub categories: Vec<CategoryEntry>,
    pub sections: Vec<SectionEntry>,
    /// source id -> metric id -> value.
    pub metrics: BTreeMap<String, BTreeMap<String, MetricValue>>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricValue {
    pub value: Option<f64>,
    pub unit: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryEntry {
    pub id: String,
    pub label: String,
    pub score: Option<i64>,
    pub rank: Option<usize>,
    pub vendor: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SectionEntry {
    pub id: String,
    pub title: String,
    pub vendor: Option<String>,
    pub metrics: Vec<SectionMetric>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SectionMetric {
    pub id: String,
    pub label: String,
    pub value: Option<f64>,
    pub unit: Option<String>,
    pub display: Option<String>,
}

// ---------------------------------------------------------------------------
// Display helpers
// ---------------------------------------------------------------------------

/// Integral values keep one decimal (`15.0`); everything else uses the
/// shortest round-trip form.
pub fn format_number(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e16 {
        format!("{value:.1}")
    } else {
        format!("{value}")
    }
}

/// Human-readable value: `"<value> <unit>"`, or the bare value for unitless
/// and vendor-scored metrics.
pub fn display_value(value: Option<f64>, unit: Option<&str>) -> Option<String> {
    let value = format_number(value?);
    match unit {
        Some(unit) if !unit.is_empty() && unit != VENDOR_UNIT => Some(format!("{value} {unit}")),
        _ => Some(value),
    }
}

// ---------------------------------------------------------------------------
// Assembly
// ---------------------------------------------------------------------------

/// Score every configured category across the full player population.
fn score_categories(
    config: &MappingConfig,
    resolved: &ResolvedSources,
    names: &[String],
) -> Vec<CategoryResult> {
    config
        .categories
        .iter()
        .map(|category| {
            let values: BTreeMap<String, Option<f64>> = names
                .iter()
                .map(|name| {
                    let value = resolved.value(&category.source, name, &category.metric_id);
                    (name.clone(), value)
                })
                .collect();
            score_category(
                &values,
                category.direction,
                config.score_range,
                config.score_rounding,
            )
        })
        .collect()
}

fn metrics_block(
    config: &MappingConfig,
    resolved: &ResolvedSources,
    name: &str,
) -> BTreeMap<String, BTreeMap<String, MetricValue>> {
    let mut block = BTreeMap::new();
    for (source_id, by_player) in &resolved.metrics {
        let Some(values) = by_player.get(name) else {
            continue;
        };
        let defs = config.sources.get(source_id).map(|s| &s.metrics);
        let entries = values
            .iter()
            .map(|(metric_id, value)| {
                let unit = defs
                    .and_then(|d| d.get(metric_id))
                    .and_then(|m| m.unit.clone());
                (metric_id.clone(), MetricValue { value: *value, unit })
            })
            .collect();
        block.insert(source_id.clone(), entries);
    }
    block
}

fn section_entries(config: &MappingConfig, resolved: &ResolvedSources, name: &str) -> Vec<SectionEntry> {
    config
        .sections
        .iter()
        .map(|section| {
            let defs = config.sources.get(&section.source).map(|s| &s.metrics);
            let metrics = section
                .metric_ids
                .iter()
                .map(|metric_id| {
                    let def = defs.and_then(|d| d.get(metric_id));
                    let value = resolved.value(&section.source, name, metric_id);
                    let unit = def.and_then(|m| m.unit.clone());
                    SectionMetric {
                        id: metric_id.clone(),
                        label: def
                            .and_then(|m| m.label.clone())
                            .unwrap_or_else(|| metric_id.clone()),
                        value,
                        display: display_value(value, unit.as_deref()),
                        unit,
                    }
                })
                .collect();
            SectionEntry {
                id: section.id.clone(),
                title: section.title.clone(),
                vendor: section.vendor.clone(),
                metrics,
            }
        })
        .collect()
}

/// Fold resolved sources into the final report. Pure apart from the clock.
pub fn assemble_report(config: &MappingConfig, resolved: &ResolvedSources, clock: &dyn Clock) -> Report {
    let names = resolved.player_names();
    let category_results = score_categories(config, resolved, &names);
    let mut ids = IdAllocator::new();

    let players = names
        .iter()
        .map(|name| {
            let meta = resolved.players.get(name);
            let categories = config
                .categories
                .iter()
                .zip(&category_results)
                .map(|(category, result)| CategoryEntry {
                    id: category.id.clone(),
                    label: category.label.clone(),
                    score: result.score(name),
                    rank: result.rank(name),
                    vendor: category.vendor.clone(),
                })
                .collect();

            PlayerRecord {
                id: ids.allocate(name),
                name: name.clone(),
                position: meta.and_then(|m| m.position.clone()),
                measured_at: meta.and_then(|m| m.measured_at.as_ref()).map(format_instant),
                categories,
                sections: section_entries(config, resolved, name),
                metrics: metrics_block(config, resolved, name),
            }
        })
        .collect();

    Report {
        event: config.event.clone(),
        generated_at: clock.now().to_rfc3339_opts(SecondsFormat::Secs, true),
        score_range: config.score_range,
        players,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
