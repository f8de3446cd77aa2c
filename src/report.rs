//! In-memory tabular reports.
//!
//! A [`TabularReport`] is an ordered list of uniquely named fields and a list of
//! rows holding one [`Cell`] per field. Both the generated profile and the
//! owner's expected report are loaded into this shape before they are merged.
//!
//! Cells are compared through their canonical string form (see
//! [`Cell::as_display`]), so an integer `5` and the text `"5"` are equal while
//! `5` and `5.0` are not.

use std::{collections::HashSet, fmt, path::Path};

use anyhow::{Context, Result};
use encoding_rs::Encoding;
use log::{info, warn};
use thiserror::Error;

use crate::io_utils;

/// Name of the field whose values identify the table column each row describes.
pub const JOIN_KEY: &str = "Column";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ReportError {
    #[error("Duplicate field '{0}' in report")]
    DuplicateField(String),
    #[error("Row {row} has {actual} cell(s) but the report defines {expected} field(s)")]
    RowWidth {
        row: usize,
        expected: usize,
        actual: usize,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Null,
    Integer(i64),
    Float(f64),
    Text(String),
}

impl Cell {
    pub fn text(value: impl Into<String>) -> Self {
        Cell::Text(value.into())
    }

    /// Treats an empty field as a null cell, anything else as text.
    pub fn from_raw(raw: &str) -> Self {
        if raw.is_empty() {
            Cell::Null
        } else {
            Cell::Text(raw.to_string())
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Cell::Null)
    }

    pub fn as_display(&self) -> String {
        match self {
            Cell::Null => String::new(),
            Cell::Integer(i) => i.to_string(),
            // Debug keeps the fractional part (`5.0`), which Display drops.
            Cell::Float(f) => format!("{f:?}"),
            Cell::Text(s) => s.clone(),
        }
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_display())
    }
}

impl From<i64> for Cell {
    fn from(value: i64) -> Self {
        Cell::Integer(value)
    }
}

impl From<f64> for Cell {
    fn from(value: f64) -> Self {
        Cell::Float(value)
    }
}

impl From<&str> for Cell {
    fn from(value: &str) -> Self {
        Cell::Text(value.to_string())
    }
}

impl From<String> for Cell {
    fn from(value: String) -> Self {
        Cell::Text(value)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TabularReport {
    fields: Vec<String>,
    rows: Vec<Vec<Cell>>,
}

impl TabularReport {
    pub fn new(fields: Vec<String>, rows: Vec<Vec<Cell>>) -> Result<Self, ReportError> {
        let mut seen = HashSet::with_capacity(fields.len());
        for field in &fields {
            if !seen.insert(field.as_str()) {
                return Err(ReportError::DuplicateField(field.clone()));
            }
        }
        for (idx, row) in rows.iter().enumerate() {
            if row.len() != fields.len() {
                return Err(ReportError::RowWidth {
                    row: idx,
                    expected: fields.len(),
                    actual: row.len(),
                });
            }
        }
        Ok(Self { fields, rows })
    }

    /// Builds a report whose shape the caller already guarantees.
    pub(crate) fn from_parts(fields: Vec<String>, rows: Vec<Vec<Cell>>) -> Self {
        debug_assert!(rows.iter().all(|row| row.len() == fields.len()));
        Self { fields, rows }
    }

    pub fn fields(&self) -> &[String] {
        &self.fields
    }

    pub fn rows(&self) -> &[Vec<Cell>] {
        &self.rows
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn field_count(&self) -> usize {
        self.fields.len()
    }

    pub fn field_index(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|field| field == name)
    }

    /// Returns the cells of a single field, top to bottom.
    pub fn column(&self, name: &str) -> Option<Vec<&Cell>> {
        let idx = self.field_index(name)?;
        Some(self.rows.iter().map(|row| &row[idx]).collect())
    }

    pub fn cell(&self, row: usize, field: &str) -> Option<&Cell> {
        let idx = self.field_index(field)?;
        self.rows.get(row).map(|cells| &cells[idx])
    }

    /// Finds the row whose join key renders as `key`.
    pub fn row_by_key(&self, key: &str) -> Option<&[Cell]> {
        let idx = self.field_index(JOIN_KEY)?;
        self.rows
            .iter()
            .find(|row| row[idx].as_display() == key)
            .map(Vec::as_slice)
    }

    /// Rows rendered as strings, in field order.
    pub fn display_rows(&self) -> Vec<Vec<String>> {
        self.rows
            .iter()
            .map(|row| row.iter().map(Cell::as_display).collect())
            .collect()
    }

    pub fn shape(&self) -> (usize, usize) {
        (self.rows.len(), self.fields.len())
    }
}

/// Reads a delimited report with a header row, keeping every value verbatim.
pub fn load_report(
    path: &Path,
    delimiter: u8,
    encoding: &'static Encoding,
) -> Result<TabularReport> {
    let mut reader = io_utils::open_csv_reader_from_path(path, delimiter, true)?;
    let headers = io_utils::reader_headers(&mut reader, encoding)
        .with_context(|| format!("Reading headers from {path:?}"))?;
    let mut rows = Vec::new();
    for (row_idx, record) in reader.byte_records().enumerate() {
        let record = record.with_context(|| format!("Reading row {} in {path:?}", row_idx + 2))?;
        let decoded = io_utils::decode_record(&record, encoding)?;
        rows.push(decoded.iter().map(|raw| Cell::from_raw(raw)).collect());
    }
    let report = TabularReport::new(headers, rows)
        .with_context(|| format!("Loading report from {path:?}"))?;
    let (row_count, field_count) = report.shape();
    if row_count > 1 && field_count > 1 {
        info!("Loaded report {path:?} with shape ({row_count}, {field_count})");
    } else {
        warn!("Report {path:?} has insufficient rows or columns ({row_count}, {field_count})");
    }
    Ok(report)
}
