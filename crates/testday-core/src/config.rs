// Mapping configuration: sources, categories, sections, score range.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::warn;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config file not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("failed to parse config file {path}: {source}")]
    JsonParse {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("failed to parse config file {path}: {source}")]
    TomlParse {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("validation error for field `{field}`: {message}")]
    Validation { field: String, message: String },
}

// ---------------------------------------------------------------------------
// Tag-valued options
// ---------------------------------------------------------------------------

/// How a source narrows each player's rows before metric resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(from = "String")]
pub enum RowSelect {
    /// Keep only the most recent row per player.
    Latest,
    /// Keep every row, most recent first.
    #[default]
    All,
}

impl From<String> for RowSelect {
    fn from(tag: String) -> Self {
        match tag.as_str() {
            "latest" => RowSelect::Latest,
            _ => RowSelect::All,
        }
    }
}

/// Reduction applied across a player's selected rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(from = "String")]
pub enum Aggregation {
    Avg,
    Min,
    Max,
}

impl From<String> for Aggregation {
    fn from(tag: String) -> Self {
        match tag.as_str() {
            "min" => Aggregation::Min,
            "max" => Aggregation::Max,
            "avg" => Aggregation::Avg,
            other => {
                warn!("unknown aggregate '{}', falling back to avg", other);
                Aggregation::Avg
            }
        }
    }
}

/// Per-metric numeric transform applied after parsing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(from = "String")]
pub enum Transform {
    #[default]
    Identity,
    Abs,
}

impl From<String> for Transform {
    fn from(tag: String) -> Self {
        match tag.as_str() {
            "abs" => Transform::Abs,
            _ => Transform::Identity,
        }
    }
}

impl Transform {
    pub fn apply(self, value: f64) -> f64 {
        match self {
            Transform::Identity => value,
            Transform::Abs => value.abs(),
        }
    }
}

/// Whether larger raw values score higher or lower.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(from = "String")]
pub enum Direction {
    #[default]
    HigherIsBetter,
    LowerIsBetter,
}

impl From<String> for Direction {
    fn from(tag: String) -> Self {
        match tag.as_str() {
            "lower_is_better" => Direction::LowerIsBetter,
            _ => Direction::HigherIsBetter,
        }
    }
}

/// How a fractional score is turned into an integer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(from = "String")]
pub enum Rounding {
    #[default]
    Round,
    Floor,
    Ceil,
}

impl From<String> for Rounding {
    fn from(tag: String) -> Self {
        match tag.as_str() {
            "floor" => Rounding::Floor,
            "ceil" => Rounding::Ceil,
            _ => Rounding::Round,
        }
    }
}

// ---------------------------------------------------------------------------
// Document structs
// ---------------------------------------------------------------------------

/// The full mapping document.
#[derive(Debug, Clone, Deserialize)]
pub struct MappingConfig {
    #[serde(default)]
    pub name_aliases: HashMap<String, String>,
    pub sources: BTreeMap<String, SourceConfig>,
    #[serde(default)]
    pub categories: Vec<CategoryConfig>,
    #[serde(default)]
    pub sections: Vec<SectionConfig>,
    #[serde(default)]
    pub score_range: ScoreRange,
    #[serde(default)]
    pub score_rounding: Rounding,
    /// Free-form event metadata, copied verbatim into the report.
    #[serde(default = "empty_event")]
    pub event: serde_json::Value,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SourceConfig {
    pub path: PathBuf,
    #[serde(default = "default_delimiter")]
    pub delimiter: String,
    #[serde(default)]
    pub header_skip: usize,
    pub player_field: String,
    #[serde(default)]
    pub date_field: Option<String>,
    #[serde(default)]
    pub time_field: Option<String>,
    /// Vendor timestamp convention tag (`photon`, `hawkin`, ...).
    #[serde(default)]
    pub format: String,
    #[serde(default)]
    pub row_select: RowSelect,
    /// Absent means extraction from the first selected row.
    #[serde(default)]
    pub aggregate: Option<Aggregation>,
    #[serde(default)]
    pub metrics: BTreeMap<String, MetricConfig>,
    #[serde(default)]
    pub position_field: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MetricConfig {
    pub column: String,
    #[serde(default)]
    pub unit: Option<String>,
    #[serde(default)]
    pub transform: Transform,
    #[serde(default)]
    pub label: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CategoryConfig {
    pub id: String,
    pub label: String,
    pub source: String,
    pub metric_id: String,
    #[serde(default)]
    pub direction: Direction,
    #[serde(default)]
    pub vendor: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SectionConfig {
    pub id: String,
    pub title: String,
    pub source: String,
    pub metric_ids: Vec<String>,
    #[serde(default)]
    pub vendor: Option<String>,
}

/// Inclusive bounds every category score is mapped onto.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
pub struct ScoreRange {
    #[serde(default = "default_score_min")]
    pub min: f64,
    #[serde(default = "default_score_max")]
    pub max: f64,
}

impl Default for ScoreRange {
    fn default() -> Self {
        ScoreRange {
            min: default_score_min(),
            max: default_score_max(),
        }
    }
}

fn default_delimiter() -> String {
    ",".into()
}

fn default_score_min() -> f64 {
    70.0
}

fn default_score_max() -> f64 {
    95.0
}

fn empty_event() -> serde_json::Value {
    serde_json::Value::Object(serde_json::Map::new())
}

impl SourceConfig {
    /// The delimiter as a single byte. Only meaningful after validation.
    pub fn delimiter_byte(&self) -> u8 {
        self.delimiter.as_bytes().first().copied().unwrap_or(b',')
    }

    /// Source path with a leading `~/` expanded to the home directory.
    pub fn resolved_path(&self) -> PathBuf {
        expand_home(&self.path)
    }
}

// ---------------------------------------------------------------------------
// Loading logic
// ---------------------------------------------------------------------------

/// Load and validate a mapping document. `.toml` files are read as TOML,
/// everything else as JSON.
pub fn load_config(path: &Path) -> Result<MappingConfig, ConfigError> {
    let text = std::fs::read_to_string(path).map_err(|_| ConfigError::FileNotFound {
        path: path.to_path_buf(),
    })?;

    let is_toml = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("toml"));

    let config = if is_toml {
        parse_toml(&text).map_err(|e| ConfigError::TomlParse {
            path: path.to_path_buf(),
            source: e,
        })?
    } else {
        parse_json(&text).map_err(|e| ConfigError::JsonParse {
            path: path.to_path_buf(),
            source: e,
        })?
    };

    validate(&config)?;
    Ok(config)
}

/// Parse and validate a JSON mapping document held in memory.
pub fn parse_json_str(text: &str) -> Result<MappingConfig, ConfigError> {
    let config = parse_json(text).map_err(|e| ConfigError::JsonParse {
        path: PathBuf::from("<inline>"),
        source: e,
    })?;
    validate(&config)?;
    Ok(config)
}

pub(crate) fn parse_json(text: &str) -> Result<MappingConfig, serde_json::Error> {
    serde_json::from_str(text)
}

pub(crate) fn parse_toml(text: &str) -> Result<MappingConfig, toml::de::Error> {
    toml::from_str(text)
}

fn expand_home(path: &Path) -> PathBuf {
    let Ok(rest) = path.strip_prefix("~") else {
        return path.to_path_buf();
    };
    match directories::BaseDirs::new() {
        Some(dirs) => dirs.home_dir().join(rest),
        None => path.to_path_buf(),
    }
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

pub fn validate(config: &MappingConfig) -> Result<(), ConfigError> {
    for (source_id, source) in &config.sources {
        if source.delimiter.len() != 1 || !source.delimiter.is_ascii() {
            return Err(ConfigError::Validation {
                field: format!("sources.{source_id}.delimiter"),
                message: format!(
                    "must be a single ASCII character, got {:?}",
                    source.delimiter
                ),
            });
        }
        if source.player_field.trim().is_empty() {
            return Err(ConfigError::Validation {
                field: format!("sources.{source_id}.player_field"),
                message: "must not be empty".into(),
            });
        }
    }

    let range = config.score_range;
    if !range.min.is_finite() || !range.max.is_finite() {
        return Err(ConfigError::Validation {
            field: "score_range".into(),
            message: "bounds must be finite".into(),
        });
    }
    if range.min > range.max {
        return Err(ConfigError::Validation {
            field: "score_range".into(),
            message: format!("min ({}) must not exceed max ({})", range.min, range.max),
        });
    }

    for category in &config.categories {
        check_metric_ref(
            config,
            &format!("categories.{}", category.id),
            &category.source,
            &category.metric_id,
        )?;
    }

    for section in &config.sections {
        let field = format!("sections.{}", section.id);
        if !config.sources.contains_key(&section.source) {
            return Err(unknown_source(&field, &section.source));
        }
        for metric_id in &section.metric_ids {
            check_metric_ref(config, &field, &section.source, metric_id)?;
        }
    }

    Ok(())
}

fn check_metric_ref(
    config: &MappingConfig,
    field: &str,
    source_id: &str,
    metric_id: &str,
) -> Result<(), ConfigError> {
    let Some(source) = config.sources.get(source_id) else {
        return Err(unknown_source(field, source_id));
    };
    if !source.metrics.contains_key(metric_id) {
        return Err(ConfigError::Validation {
            field: field.to_string(),
            message: format!("source `{source_id}` has no metric `{metric_id}`"),
        });
    }
    Ok(())
}

fn unknown_source(field: &str, source_id: &str) -> ConfigError {
    ConfigError::Validation {
        field: field.to_string(),
        message: format!("references unknown source `{source_id}`"),
    }
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    const MINIMAL: &str = r#"{
        "sources": {
            "jump": {
                "path": "data/jump.csv",
                "player_field": "Name",
                "metrics": {"height": {"column": "Jump Height", "unit": "cm"}}
            }
        }
    }"#;

    #[test]
    fn minimal_json_gets_defaults() {
        let config = parse_json(MINIMAL).expect("should parse");
        validate(&config).expect("should validate");

        assert_eq!(config.score_range, ScoreRange { min: 70.0, max: 95.0 });
        assert_eq!(config.score_rounding, Rounding::Round);
        assert!(config.name_aliases.is_empty());
        assert!(config.categories.is_empty());
        assert_eq!(config.event, serde_json::json!({}));

        let jump = &config.sources["jump"];
        assert_eq!(jump.delimiter_byte(), b',');
        assert_eq!(jump.header_skip, 0);
        assert_eq!(jump.row_select, RowSelect::All);
        assert!(jump.aggregate.is_none());
        assert_eq!(jump.metrics["height"].transform, Transform::Identity);
    }

    #[test]
    fn tag_fallbacks() {
        let text = r#"{
            "score_rounding": "bankers",
            "sources": {
                "s": {
                    "path": "s.csv",
                    "player_field": "Name",
                    "row_select": "newest",
                    "aggregate": "median",
                    "metrics": {"m": {"column": "M", "transform": "sqrt"}}
                }
            },
            "categories": [
                {"id": "c", "label": "C", "source": "s", "metric_id": "m", "direction": "sideways"}
            ]
        }"#;
        let config = parse_json(text).unwrap();
        let s = &config.sources["s"];
        assert_eq!(config.score_rounding, Rounding::Round);
        assert_eq!(s.row_select, RowSelect::All);
        assert_eq!(s.aggregate, Some(Aggregation::Avg));
        assert_eq!(s.metrics["m"].transform, Transform::Identity);
        assert_eq!(config.categories[0].direction, Direction::HigherIsBetter);
    }

    #[test]
    fn missing_sources_is_parse_error() {
        assert!(parse_json(r#"{"categories": []}"#).is_err());
    }

    #[test]
    fn missing_player_field_is_parse_error() {
        let text = r#"{"sources": {"s": {"path": "s.csv"}}}"#;
        assert!(parse_json(text).is_err());
    }

    #[test]
    fn rejects_multichar_delimiter() {
        let text = r#"{"sources": {"s": {"path": "s.csv", "player_field": "Name", "delimiter": ";;"}}}"#;
        let config = parse_json(text).unwrap();
        let err = validate(&config).unwrap_err();
        assert!(matches!(err, ConfigError::Validation { ref field, .. } if field == "sources.s.delimiter"));
    }

    #[test]
    fn rejects_inverted_score_range() {
        let text = r#"{"score_range": {"min": 95, "max": 70}, "sources": {}}"#;
        let config = parse_json(text).unwrap();
        assert!(matches!(
            validate(&config),
            Err(ConfigError::Validation { ref field, .. }) if field == "score_range"
        ));
    }

    #[test]
    fn rejects_category_with_unknown_metric() {
        let text = r#"{
            "sources": {"s": {"path": "s.csv", "player_field": "Name", "metrics": {"m": {"column": "M"}}}},
            "categories": [{"id": "c", "label": "C", "source": "s", "metric_id": "nope"}]
        }"#;
        let config = parse_json(text).unwrap();
        assert!(validate(&config).is_err());
    }

    #[test]
    fn rejects_section_with_unknown_source() {
        let text = r#"{
            "sources": {},
            "sections": [{"id": "x", "title": "X", "source": "ghost", "metric_ids": []}]
        }"#;
        let config = parse_json(text).unwrap();
        assert!(validate(&config).is_err());
    }

    #[test]
    fn toml_document_parses() {
        let text = r#"
score_rounding = "ceil"

[score_range]
min = 60
max = 100

[event]
id = "combine-2026"

[sources.sprint]
path = "sprint.tsv"
delimiter = "\t"
header_skip = 2
player_field = "Athlete"
row_select = "latest"

[sources.sprint.metrics.split10]
column = "10m"
unit = "s"
"#;
        let config = parse_toml(text).expect("should parse toml");
        validate(&config).unwrap();
        assert_eq!(config.score_rounding, Rounding::Ceil);
        assert_eq!(config.score_range, ScoreRange { min: 60.0, max: 100.0 });
        assert_eq!(config.event["id"], "combine-2026");
        let sprint = &config.sources["sprint"];
        assert_eq!(sprint.delimiter_byte(), b'\t');
        assert_eq!(sprint.header_skip, 2);
        assert_eq!(sprint.row_select, RowSelect::Latest);
    }

    #[test]
    fn load_config_missing_file() {
        let path = std::env::temp_dir().join("testday_config_does_not_exist.json");
        let _ = fs::remove_file(&path);
        assert!(matches!(
            load_config(&path),
            Err(ConfigError::FileNotFound { .. })
        ));
    }

    #[test]
    fn load_config_from_disk_by_extension() {
        let dir = std::env::temp_dir().join("testday_config_by_extension");
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(&dir).unwrap();

        let json_path = dir.join("mapping.json");
        fs::write(&json_path, MINIMAL).unwrap();
        let config = load_config(&json_path).expect("json should load");
        assert!(config.sources.contains_key("jump"));

        // JSON content behind a .toml extension must fail as TOML.
        let toml_path = dir.join("mapping.toml");
        fs::write(&toml_path, MINIMAL).unwrap();
        assert!(matches!(
            load_config(&toml_path),
            Err(ConfigError::TomlParse { .. })
        ));

        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn relative_paths_untouched() {
        assert_eq!(expand_home(Path::new("data/a.csv")), PathBuf::from("data/a.csv"));
    }
}
