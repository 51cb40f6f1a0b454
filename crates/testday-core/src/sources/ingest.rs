// Delimited source file reading.
//
// Vendor exports often carry a preamble (device name, export date, ...) above
// the real header, so a configurable number of leading lines is discarded
// before the first remaining line is taken as the header.

use std::path::{Path, PathBuf};
use thiserror::Error;

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum SourceReadError {
    #[error("failed to read file {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("CSV error in {path}: {source}")]
    Csv { path: PathBuf, source: csv::Error },
}

// ---------------------------------------------------------------------------
// RawRow
// ---------------------------------------------------------------------------

/// One record as read from a source: field names paired with raw values, in
/// header order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawRow {
    fields: Vec<(String, String)>,
}

impl RawRow {
    pub fn new(fields: Vec<(String, String)>) -> Self {
        RawRow { fields }
    }

    /// Value of `field`, or `None` when the row has no such column.
    pub fn get(&self, field: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(name, _)| name == field)
            .map(|(_, value)| value.as_str())
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    fn is_blank(&self) -> bool {
        self.fields.iter().all(|(_, value)| value.trim().is_empty())
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for RawRow {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        RawRow::new(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

// ---------------------------------------------------------------------------
// Parsing
// ---------------------------------------------------------------------------

/// Drop the first `count` lines of `content`.
fn skip_lines(content: &str, count: usize) -> &str {
    let mut rest = content;
    for _ in 0..count {
        match rest.find('\n') {
            Some(idx) => rest = &rest[idx + 1..],
            None => return "",
        }
    }
    rest
}

/// Parse already-decoded file content into rows.
pub fn parse_rows(
    content: &str,
    delimiter: u8,
    header_skip: usize,
) -> Result<Vec<RawRow>, csv::Error> {
    let content = content.strip_prefix('\u{feff}').unwrap_or(content);
    let body = skip_lines(content, header_skip);
    if body.trim().is_empty() {
        return Ok(Vec::new());
    }

    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(true)
        .flexible(true)
        .from_reader(body.as_bytes());

    let headers = reader.headers()?.clone();
    let mut rows = Vec::new();
    for result in reader.records() {
        let record = result?;
        // Short records only carry the leading columns; surplus values past
        // the header have no field name and are dropped.
        let row: RawRow = headers
            .iter()
            .zip(record.iter())
            .map(|(name, value)| (name.to_string(), value.to_string()))
            .collect();
        if row.is_empty() || row.is_blank() {
            continue;
        }
        rows.push(row);
    }
    Ok(rows)
}

/// Read a source file into rows, honoring its delimiter and header-skip.
pub fn read_rows(
    path: &Path,
    delimiter: u8,
    header_skip: usize,
) -> Result<Vec<RawRow>, SourceReadError> {
    let content = std::fs::read_to_string(path).map_err(|e| SourceReadError::Io {
        path: path.to_path_buf(),
        source: e,
    })?;
    parse_rows(&content, delimiter, header_skip).map_err(|e| SourceReadError::Csv {
        path: path.to_path_buf(),
        source: e,
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
