// Per-player row selection.
//
// Two phases: a stable partition of the source's rows by canonical player
// name, then a stable descending sort by timestamp within each group (rows
// without a timestamp last) truncated according to the row-select policy.

use crate::config::{RowSelect, SourceConfig};
use crate::names::canonical_name;
use crate::sources::ingest::RawRow;
use crate::sources::temporal::TimestampFormat;
use chrono::NaiveDateTime;
use std::collections::{BTreeMap, HashMap};
use tracing::{debug, trace};

/// The rows chosen for one player from one source.
#[derive(Debug, Clone, PartialEq)]
pub struct SelectedRows<'a> {
    /// Most recent timestamp among the player's rows, if any parsed.
    pub latest: Option<NaiveDateTime>,
    /// Most recent first; a single row under `RowSelect::Latest`.
    pub rows: Vec<&'a RawRow>,
}

type Stamped<'a> = (Option<NaiveDateTime>, &'a RawRow);

/// Group rows by canonical name, keeping file order inside each group.
/// Rows with a blank player name are dropped.
fn partition_by_player<'a>(
    rows: &'a [RawRow],
    source: &SourceConfig,
    aliases: &HashMap<String, String>,
) -> BTreeMap<String, Vec<Stamped<'a>>> {
    let format = match source.date_field {
        Some(_) => TimestampFormat::from_tag(&source.format),
        None => TimestampFormat::Untimed,
    };

    let mut groups: BTreeMap<String, Vec<Stamped<'a>>> = BTreeMap::new();
    for row in rows {
        let raw_name = row.get(&source.player_field).unwrap_or("");
        if raw_name.trim().is_empty() {
            trace!("skipping row without player name");
            continue;
        }
        let name = canonical_name(raw_name, aliases);
        let date = source.date_field.as_deref().and_then(|f| row.get(f));
        let time = source.time_field.as_deref().and_then(|f| row.get(f));
        let timestamp = format.parse(date, time);
        if timestamp.is_none() && format != TimestampFormat::Untimed {
            debug!("no timestamp for a row of '{}' (date {:?})", name, date);
        }
        groups.entry(name).or_default().push((timestamp, row));
    }
    groups
}

/// Order one player's rows newest first. The sort is stable so rows with
/// equal (or no) timestamps stay in file order; `None` compares below any
/// instant and therefore lands last.
fn newest_first(mut items: Vec<Stamped<'_>>, policy: RowSelect) -> SelectedRows<'_> {
    items.sort_by(|a, b| b.0.cmp(&a.0));
    if policy == RowSelect::Latest {
        items.truncate(1);
    }
    SelectedRows {
        latest: items.first().and_then(|(ts, _)| *ts),
        rows: items.into_iter().map(|(_, row)| row).collect(),
    }
}

/// Select each player's rows from one source according to its policy.
pub fn select_rows<'a>(
    rows: &'a [RawRow],
    source: &SourceConfig,
    aliases: &HashMap<String, String>,
) -> BTreeMap<String, SelectedRows<'a>> {
    partition_by_player(rows, source, aliases)
        .into_iter()
        .map(|(name, items)| (name, newest_first(items, source.row_select)))
        .collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
