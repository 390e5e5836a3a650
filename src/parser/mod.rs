//! Readers for the study's text inputs.
//!
//! Every source is parsed from its full text so that header/footer skipping
//! and malformed-row accounting live in one place. A row that fails
//! fixed-column parsing is recorded in [`Parsed::malformed`] and skipped.

pub mod design_matrix;
pub mod eventlist;
pub mod features;
pub mod measurements;
pub mod presentation;
pub mod prosody;

use csv::StringRecord;
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use tracing::debug;

use crate::constants::SourceColumn;
use crate::error::{PrepError, Result};
use crate::types::{MalformedRow, Parsed};

/// A parser for one kind of tabular source file
pub trait TableParser {
    type Row;

    fn parse(&self, path: &Path, text: &str) -> Result<Parsed<Self::Row>>;
}

/// Read a whole source file; a missing file becomes [`PrepError::MissingFile`]
pub fn read_source(path: &Path) -> Result<String> {
    let bytes = fs::read(path).map_err(|e| PrepError::io(path, e))?;
    // Exports from Windows tooling are not always valid UTF-8
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

/// Read and parse `path` with `parser`
pub fn load<P: TableParser>(parser: &P, path: &Path) -> Result<Parsed<P::Row>> {
    let text = read_source(path)?;
    let parsed = parser.parse(path, &text)?;
    debug!(
        path = %path.display(),
        rows = parsed.rows.len(),
        malformed = parsed.malformed.len(),
        "Parsed source"
    );
    Ok(parsed)
}

/// Non-blank lines after dropping `header` leading and `footer` trailing lines.
/// Line numbers are 1-based positions in the original file.
pub fn body_lines(text: &str, header: usize, footer: usize) -> Vec<(usize, &str)> {
    let lines: Vec<&str> = text.lines().collect();
    let end = lines.len().saturating_sub(footer);
    lines
        .into_iter()
        .enumerate()
        .take(end)
        .skip(header)
        .map(|(i, line)| (i + 1, line.trim_end_matches('\r')))
        .filter(|(_, line)| !line.trim().is_empty())
        .collect()
}

pub fn malformed(path: &Path, line: usize, reason: impl Into<String>) -> MalformedRow {
    MalformedRow {
        path: path.display().to_string(),
        line,
        reason: reason.into(),
    }
}

/// Column positions of a tab-separated header row
#[derive(Debug, Clone)]
pub struct HeaderIndex {
    names: Vec<String>,
}

impl HeaderIndex {
    pub fn from_tab_line(line: &str) -> Self {
        Self {
            names: line.split('\t').map(|s| s.to_string()).collect(),
        }
    }

    pub fn from_record(record: &StringRecord) -> Self {
        Self {
            names: record.iter().map(|s| s.to_string()).collect(),
        }
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn find(&self, column: &SourceColumn) -> Option<usize> {
        self.names
            .iter()
            .position(|h| h == column.literal)
            .or_else(|| self.names.iter().position(|h| column.matches(h)))
    }

    pub fn find_name(&self, name: &str) -> Option<usize> {
        self.names.iter().position(|h| h.trim() == name)
    }

    pub fn require(&self, column: &SourceColumn, path: &Path) -> Result<usize> {
        self.find(column).ok_or_else(|| PrepError::MissingColumn {
            path: path.to_path_buf(),
            column: column.literal.to_string(),
        })
    }

    pub fn require_name(&self, name: &str, path: &Path) -> Result<usize> {
        self.find_name(name).ok_or_else(|| PrepError::MissingColumn {
            path: path.to_path_buf(),
            column: name.to_string(),
        })
    }
}

/// Name-based access into CSV records
#[derive(Debug, Clone)]
pub struct CsvColumns {
    index: HashMap<String, usize>,
}

impl CsvColumns {
    pub fn new(headers: &StringRecord) -> Self {
        let mut index = HashMap::new();
        for (i, name) in headers.iter().enumerate() {
            index.entry(name.trim().to_string()).or_insert(i);
        }
        Self { index }
    }

    pub fn has(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    pub fn get<'r>(&self, record: &'r StringRecord, name: &str) -> Option<&'r str> {
        self.index.get(name).and_then(|i| record.get(*i))
    }

    /// First of several accepted header spellings
    pub fn get_any<'r>(&self, record: &'r StringRecord, names: &[&str]) -> Option<&'r str> {
        names.iter().find_map(|n| self.get(record, n))
    }
}

fn is_missing(field: &str) -> bool {
    let field = field.trim();
    field.is_empty() || field.eq_ignore_ascii_case("nan") || field.eq_ignore_ascii_case("na")
}

pub fn parse_f64(field: &str) -> std::result::Result<f64, String> {
    field
        .trim()
        .parse::<f64>()
        .map_err(|_| format!("'{}' is not a number", field.trim()))
}

pub fn parse_opt_f64(field: Option<&str>) -> std::result::Result<Option<f64>, String> {
    match field {
        Some(f) if !is_missing(f) => parse_f64(f).map(Some),
        _ => Ok(None),
    }
}

/// Integer fields sometimes arrive as `3.0` after a round trip through float columns
pub fn parse_integral(field: &str) -> std::result::Result<i64, String> {
    let trimmed = field.trim();
    if let Ok(v) = trimmed.parse::<i64>() {
        return Ok(v);
    }
    match trimmed.parse::<f64>() {
        Ok(v) if v.is_finite() && v.fract() == 0.0 => Ok(v as i64),
        _ => Err(format!("'{}' is not an integer", trimmed)),
    }
}

pub fn parse_opt_integral(field: Option<&str>) -> std::result::Result<Option<i64>, String> {
    match field {
        Some(f) if !is_missing(f) => parse_integral(f).map(Some),
        _ => Ok(None),
    }
}

pub fn parse_id(field: &str) -> std::result::Result<u32, String> {
    let v = parse_integral(field)?;
    u32::try_from(v).map_err(|_| format!("'{}' is not a valid id", field.trim()))
}

pub fn parse_opt_id(field: Option<&str>) -> std::result::Result<Option<u32>, String> {
    match field {
        Some(f) if !is_missing(f) => parse_id(f).map(Some),
        _ => Ok(None),
    }
}

pub fn opt_text(field: Option<&str>) -> Option<String> {
    field
        .map(str::trim)
        .filter(|f| !is_missing(f))
        .map(|f| f.to_string())
}
