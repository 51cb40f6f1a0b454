// Batch pipeline: ingest and resolve every source, then score and assemble.
//
// All sources are resolved before any category is scored, since a category's
// population is the union of players across every source.

use crate::config::{MappingConfig, SourceConfig};
use crate::metrics::{resolve_metrics, MetricValues};
use crate::report::{assemble_report, Clock, Report};
use crate::sources::ingest::{read_rows, SourceReadError};
use crate::sources::select::{select_rows, SelectedRows};
use chrono::NaiveDateTime;
use std::collections::{BTreeMap, BTreeSet};
use thiserror::Error;
use tracing::{debug, info};

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("source `{source_id}` could not be read: {source}")]
    Source {
        source_id: String,
        source: SourceReadError,
    },
}

/// Identity details gathered across sources.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PlayerMeta {
    pub position: Option<String>,
    /// Latest timestamp seen in any source.
    pub measured_at: Option<NaiveDateTime>,
}

/// Everything the sources contribute, before scoring.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResolvedSources {
    /// source id -> canonical player name -> metric values.
    pub metrics: BTreeMap<String, BTreeMap<String, MetricValues>>,
    pub players: BTreeMap<String, PlayerMeta>,
}

impl ResolvedSources {
    /// Union of player names across all sources, sorted.
    pub fn player_names(&self) -> Vec<String> {
        let names: BTreeSet<&String> = self.metrics.values().flat_map(|m| m.keys()).collect();
        names.into_iter().cloned().collect()
    }

    /// A player's value for one metric, `None` when the player is absent
    /// from the source or the value is missing.
    pub fn value(&self, source_id: &str, player: &str, metric_id: &str) -> Option<f64> {
        self.metrics
            .get(source_id)?
            .get(player)?
            .get(metric_id)
            .copied()
            .flatten()
    }

    /// Fold one source's selected rows into the resolved set.
    pub fn add_source(
        &mut self,
        source_id: &str,
        selected: &BTreeMap<String, SelectedRows<'_>>,
        config: &SourceConfig,
    ) {
        let by_player = self.metrics.entry(source_id.to_string()).or_default();
        for (name, selection) in selected {
            let values = resolve_metrics(&selection.rows, &config.metrics, config.aggregate);
            by_player.insert(name.clone(), values);

            let meta = self.players.entry(name.clone()).or_default();
            if let Some(ts) = selection.latest {
                if meta.measured_at.map_or(true, |existing| ts > existing) {
                    meta.measured_at = Some(ts);
                }
            }
            if let Some(field) = &config.position_field {
                let position = selection
                    .rows
                    .iter()
                    .filter_map(|row| row.get(field))
                    .map(str::trim)
                    .find(|p| !p.is_empty());
                if let Some(position) = position {
                    meta.position = Some(position.to_string());
                }
            }
        }
    }
}

/// Read, select and resolve every configured source, in source id order.
pub fn resolve_sources(config: &MappingConfig) -> Result<ResolvedSources, ReportError> {
    let mut resolved = ResolvedSources::default();
    for (source_id, source) in &config.sources {
        let path = source.resolved_path();
        let rows = read_rows(&path, source.delimiter_byte(), source.header_skip).map_err(|e| {
            ReportError::Source {
                source_id: source_id.clone(),
                source: e,
            }
        })?;
        let selected = select_rows(&rows, source, &config.name_aliases);
        debug!(
            "source {}: {} rows read from {}",
            source_id,
            rows.len(),
            path.display()
        );
        info!("source {}: {} players resolved", source_id, selected.len());
        resolved.add_source(source_id, &selected, source);
    }
    Ok(resolved)
}

/// Full batch run: resolve all sources, then score and assemble the report.
pub fn build_report(config: &MappingConfig, clock: &dyn Clock) -> Result<Report, ReportError> {
    let resolved = resolve_sources(config)?;
    let report = assemble_report(config, &resolved, clock);
    info!(
        "report assembled: {} players, {} categories",
        report.players.len(),
        config.categories.len()
    );
    Ok(report)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{parse_json, RowSelect};
    use crate::sources::ingest::parse_rows;
    use std::collections::HashMap;

    fn source_config(text: &str) -> SourceConfig {
        let doc = format!(r#"{{"sources": {{"s": {text}}}}}"#);
        parse_json(&doc).unwrap().sources.remove("s").unwrap()
    }

    #[test]
    fn measured_at_is_max_across_sources() {
        let photon = source_config(
            r#"{"path": "p.csv", "player_field": "Name", "date_field": "Date", "format": "photon",
                "row_select": "latest", "metrics": {"v": {"column": "V"}}}"#,
        );
        let hawkin = source_config(
            r#"{"path": "h.csv", "player_field": "Athlete", "date_field": "Date", "time_field": "Time",
                "format": "hawkin", "metrics": {"w": {"column": "W"}}}"#,
        );
        assert_eq!(photon.row_select, RowSelect::Latest);

        let p_rows = parse_rows("Name,Date,V\nJane Doe,2026-01-10T08:00:00,1\n", b',', 0).unwrap();
        let h_rows = parse_rows("Athlete,Date,Time,W\nJane Doe,01/12/2026,07:15:00,2\n", b',', 0).unwrap();

        let mut resolved = ResolvedSources::default();
        let aliases = HashMap::new();
        resolved.add_source("photon", &select_rows(&p_rows, &photon, &aliases), &photon);
        resolved.add_source("hawkin", &select_rows(&h_rows, &hawkin, &aliases), &hawkin);

        let meta = &resolved.players["Jane Doe"];
        let expected = chrono::NaiveDate::from_ymd_opt(2026, 1, 12)
            .unwrap()
            .and_hms_opt(7, 15, 0)
            .unwrap();
        assert_eq!(meta.measured_at, Some(expected));
        assert_eq!(resolved.value("photon", "Jane Doe", "v"), Some(1.0));
        assert_eq!(resolved.value("hawkin", "Jane Doe", "w"), Some(2.0));
        assert_eq!(resolved.value("hawkin", "Nobody", "w"), None);
    }

    #[test]
    fn position_is_first_non_blank_in_selected_rows() {
        let src = source_config(
            r#"{"path": "p.csv", "player_field": "Name", "position_field": "Pos",
                "metrics": {"v": {"column": "V"}}}"#,
        );
        let rows = parse_rows("Name,Pos,V\nJane Doe, ,1\nJane Doe,WR,2\nJane Doe,CB,3\n", b',', 0).unwrap();

        let mut resolved = ResolvedSources::default();
        resolved.add_source("s", &select_rows(&rows, &src, &HashMap::new()), &src);
        assert_eq!(resolved.players["Jane Doe"].position.as_deref(), Some("WR"));
    }

    #[test]
    fn player_names_union_sorted() {
        let src = source_config(r#"{"path": "p.csv", "player_field": "Name"}"#);
        let a = parse_rows("Name\nZoe\nAmy\n", b',', 0).unwrap();
        let b = parse_rows("Name\nMia\nAmy\n", b',', 0).unwrap();

        let mut resolved = ResolvedSources::default();
        resolved.add_source("a", &select_rows(&a, &src, &HashMap::new()), &src);
        resolved.add_source("b", &select_rows(&b, &src, &HashMap::new()), &src);
        assert_eq!(resolved.player_names(), vec!["Amy", "Mia", "Zoe"]);
    }

    #[test]
    fn missing_source_file_is_fatal() {
        let path = std::env::temp_dir().join("testday_pipeline_missing.csv");
        let _ = std::fs::remove_file(&path);
        let doc = format!(
            r#"{{"sources": {{"gone": {{"path": {:?}, "player_field": "Name"}}}}}}"#,
            path.display().to_string()
        );
        let config = parse_json(&doc).unwrap();
        let err = resolve_sources(&config).unwrap_err();
        let ReportError::Source { source_id, .. } = err;
        assert_eq!(source_id, "gone");
    }
}
