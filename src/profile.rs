//! Column statistics profiler.
//!
//! Reads a delimited snapshot of the audited table and produces the generated
//! report: one row per table column, sorted by column name, with row count,
//! inferred datatype, null and non-null counts, distinct and duplicate counts
//! and the most frequent value.

use std::{
    collections::{HashMap, HashSet},
    fmt,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use chrono::{NaiveDate, NaiveDateTime};
use encoding_rs::Encoding;
use log::{debug, info};

use crate::{
    cli::ProfileArgs,
    export::{self, ExportTarget},
    io_utils, printable_delimiter,
    report::{Cell, JOIN_KEY, ReportError, TabularReport},
    table,
};

pub const PROFILE_FIELDS: [&str; 8] = [
    JOIN_KEY,
    "Num_Of_Rows",
    "Datatype",
    "Num_Of_Nulls",
    "Num_Of_Non_Nulls",
    "Num_Unique_Vals",
    "Num_Of_Duplicates",
    "Most_Occurring_Vals",
];

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%d/%m/%Y", "%m/%d/%Y", "%Y/%m/%d", "%d-%m-%Y"];
const TIMESTAMP_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InferredType {
    Integer,
    Float,
    Boolean,
    Date,
    Timestamp,
    Text,
}

impl InferredType {
    pub fn as_str(self) -> &'static str {
        match self {
            InferredType::Integer => "integer",
            InferredType::Float => "float",
            InferredType::Boolean => "boolean",
            InferredType::Date => "date",
            InferredType::Timestamp => "timestamp",
            InferredType::Text => "text",
        }
    }
}

impl fmt::Display for InferredType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub fn execute(args: &ProfileArgs) -> Result<()> {
    let delimiter = io_utils::resolve_input_delimiter(&args.input, args.format.delimiter);
    let encoding = io_utils::resolve_encoding(args.format.input_encoding.as_deref())?;
    info!(
        "Profiling '{}' with delimiter '{}'",
        args.input.display(),
        printable_delimiter(delimiter)
    );
    let report = profile_csv(&args.input, delimiter, encoding, args.limit)?;

    if args.table {
        table::print_report(&report, None, false);
        if args.output.is_none() {
            return Ok(());
        }
    }

    let output = args.output.clone().unwrap_or_else(|| PathBuf::from("-"));
    let output_delimiter = io_utils::resolve_output_delimiter(
        Some(output.as_path()),
        args.format.output_delimiter,
        delimiter,
    );
    let output_encoding = io_utils::resolve_encoding(args.format.output_encoding.as_deref())?;
    export::export_report(
        &report,
        &ExportTarget::File(output),
        output_delimiter,
        output_encoding,
    )?;
    Ok(())
}

pub fn profile_csv(
    path: &Path,
    delimiter: u8,
    encoding: &'static Encoding,
    row_limit: Option<usize>,
) -> Result<TabularReport> {
    let mut reader = io_utils::open_csv_reader_from_path(path, delimiter, true)?;
    let headers = io_utils::reader_headers(&mut reader, encoding)
        .with_context(|| format!("Reading headers from {path:?}"))?;
    let mut accumulator =
        ProfileAccumulator::new(&headers).with_context(|| format!("Profiling {path:?}"))?;

    for (row_idx, record) in reader.byte_records().enumerate() {
        if let Some(limit) = row_limit
            && row_idx >= limit
        {
            break;
        }
        let record = record.with_context(|| format!("Reading row {}", row_idx + 2))?;
        let decoded = io_utils::decode_record(&record, encoding)?;
        accumulator.ingest(&decoded);
    }

    let rows = accumulator.rows;
    let report = accumulator.finish();
    info!(
        "Profiled {} column(s) across {rows} row(s) from {path:?}",
        report.row_count()
    );
    Ok(report)
}

/// Profiles rows that are already in memory.
pub fn profile_table(
    headers: &[String],
    rows: &[Vec<String>],
) -> Result<TabularReport, ReportError> {
    let mut accumulator = ProfileAccumulator::new(headers)?;
    for row in rows {
        accumulator.ingest(row);
    }
    Ok(accumulator.finish())
}

struct ProfileAccumulator {
    rows: usize,
    columns: Vec<ColumnProfile>,
}

impl ProfileAccumulator {
    fn new(headers: &[String]) -> Result<Self, ReportError> {
        let mut seen = HashSet::with_capacity(headers.len());
        for header in headers {
            if !seen.insert(header.as_str()) {
                return Err(ReportError::DuplicateField(header.clone()));
            }
        }
        Ok(Self {
            rows: 0,
            columns: headers.iter().map(|name| ColumnProfile::new(name)).collect(),
        })
    }

    fn ingest(&mut self, record: &[String]) {
        self.rows += 1;
        for (idx, column) in self.columns.iter_mut().enumerate() {
            let raw = record.get(idx).map(|s| s.trim()).unwrap_or("");
            column.ingest(raw);
        }
    }

    fn finish(self) -> TabularReport {
        let rows = self.rows;
        let mut columns = self.columns;
        columns.sort_by(|a, b| a.name.cmp(&b.name));
        debug!(
            "Column names are [{}]",
            columns
                .iter()
                .map(|column| column.name.as_str())
                .collect::<Vec<_>>()
                .join(", ")
        );
        let report_rows = columns
            .into_iter()
            .map(|column| column.into_row(rows))
            .collect();
        TabularReport::from_parts(
            PROFILE_FIELDS.iter().map(|field| field.to_string()).collect(),
            report_rows,
        )
    }
}

struct ColumnProfile {
    name: String,
    nulls: usize,
    counts: HashMap<String, usize>,
    candidates: TypeCandidates,
}

impl ColumnProfile {
    fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            nulls: 0,
            counts: HashMap::new(),
            candidates: TypeCandidates::default(),
        }
    }

    fn ingest(&mut self, value: &str) {
        if value.is_empty() {
            self.nulls += 1;
            return;
        }
        self.candidates.observe(value);
        *self.counts.entry(value.to_string()).or_insert(0) += 1;
    }

    fn into_row(self, rows: usize) -> Vec<Cell> {
        let non_nulls = rows - self.nulls;
        let unique = self.counts.len();
        // Highest count wins; ties go to the smallest value.
        let top = self
            .counts
            .iter()
            .min_by(|a, b| b.1.cmp(a.1).then_with(|| a.0.cmp(b.0)))
            .map(|(value, _)| Cell::text(value.as_str()))
            .unwrap_or(Cell::Null);
        vec![
            Cell::Text(self.name),
            count(rows),
            Cell::text(self.candidates.resolve().as_str()),
            count(self.nulls),
            count(non_nulls),
            count(unique),
            count(non_nulls - unique),
            top,
        ]
    }
}

fn count(value: usize) -> Cell {
    Cell::Integer(i64::try_from(value).unwrap_or(i64::MAX))
}

#[derive(Debug, Clone, Copy)]
struct TypeCandidates {
    seen: bool,
    integer: bool,
    float: bool,
    boolean: bool,
    date: bool,
    timestamp: bool,
}

impl Default for TypeCandidates {
    fn default() -> Self {
        Self {
            seen: false,
            integer: true,
            float: true,
            boolean: true,
            date: true,
            timestamp: true,
        }
    }
}

impl TypeCandidates {
    fn observe(&mut self, value: &str) {
        self.seen = true;
        if self.integer && value.parse::<i64>().is_err() {
            self.integer = false;
        }
        // `f64::from_str` also takes "nan" and "inf"; only finite numerals count.
        if self.float && !value.parse::<f64>().is_ok_and(f64::is_finite) {
            self.float = false;
        }
        if self.boolean && !is_boolean(value) {
            self.boolean = false;
        }
        if self.date && !DATE_FORMATS
            .iter()
            .any(|fmt| NaiveDate::parse_from_str(value, fmt).is_ok())
        {
            self.date = false;
        }
        if self.timestamp && !TIMESTAMP_FORMATS
            .iter()
            .any(|fmt| NaiveDateTime::parse_from_str(value, fmt).is_ok())
        {
            self.timestamp = false;
        }
    }

    fn resolve(&self) -> InferredType {
        if !self.seen {
            InferredType::Text
        } else if self.integer {
            InferredType::Integer
        } else if self.float {
            InferredType::Float
        } else if self.boolean {
            InferredType::Boolean
        } else if self.date {
            InferredType::Date
        } else if self.timestamp {
            InferredType::Timestamp
        } else {
            InferredType::Text
        }
    }
}

fn is_boolean(value: &str) -> bool {
    matches!(
        value.to_ascii_lowercase().as_str(),
        "true" | "false" | "t" | "f" | "yes" | "no" | "y" | "n"
    )
}
