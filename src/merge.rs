//! Merges a generated column profile with the owner's expected report.
//!
//! Field names are reconciled first, then the join-key values of the rows. Rows
//! present on both sides are paired by key and compared cell by cell on their
//! string form; the owner's cell survives unless it differs, in which case it is
//! replaced by [`Sentinel::Mismatch`]. Anything present on only one side is kept
//! and tagged with the matching sentinel, so nothing is dropped from the output.

use std::{
    collections::{BTreeMap, HashSet},
    fmt,
};

use itertools::Itertools;
use serde::Serialize;
use thiserror::Error;

use crate::{
    diagnostics::Diagnostics,
    reconcile::{LabelKind, ReconcileError, Reconciliation, reconcile},
    report::{Cell, JOIN_KEY, TabularReport},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sentinel {
    Mismatch,
    MissingColumn,
    ExtraColumn,
    MissingParameter,
    ExtraParameter,
}

impl Sentinel {
    pub const ALL: [Sentinel; 5] = [
        Sentinel::Mismatch,
        Sentinel::MissingColumn,
        Sentinel::ExtraColumn,
        Sentinel::MissingParameter,
        Sentinel::ExtraParameter,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Sentinel::Mismatch => "MISMATCH",
            Sentinel::MissingColumn => "MISSING COLUMN",
            Sentinel::ExtraColumn => "EXTRA COLUMN",
            Sentinel::MissingParameter => "MISSING PARAMETER",
            Sentinel::ExtraParameter => "EXTRA PARAMETER",
        }
    }

    pub fn matches(value: &str) -> bool {
        Self::ALL.iter().any(|sentinel| sentinel.as_str() == value)
    }

    fn cell(self) -> Cell {
        Cell::text(self.as_str())
    }
}

impl fmt::Display for Sentinel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportSide {
    Generated,
    Owner,
}

impl fmt::Display for ReportSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReportSide::Generated => f.write_str("generated"),
            ReportSide::Owner => f.write_str("owner"),
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum MergeError {
    /// Raised through `?` by callers that reconcile with a kind given by name
    /// ([`crate::reconcile::reconcile_named`]); [`merge`] itself uses typed kinds.
    #[error("Report comparison failed: {0}")]
    Reconciliation(#[from] ReconcileError),
    #[error("Cannot compare reports: field 'Column' is not shared (common fields: [{}])", .common.join(", "))]
    MissingJoinKey { common: Vec<String> },
    #[error("Cannot compare reports: {side} report lists column '{value}' more than once")]
    DuplicateJoinKey { side: ReportSide, value: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MergeSummary {
    pub parameters: Reconciliation,
    pub columns: Reconciliation,
    pub mismatches: usize,
    pub rows: usize,
    pub fields: usize,
}

impl MergeSummary {
    pub fn has_discrepancies(&self) -> bool {
        self.mismatches > 0 || !self.parameters.is_exact() || !self.columns.is_exact()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CombinedReport {
    pub report: TabularReport,
    pub summary: MergeSummary,
}

pub fn merge(
    generated: &TabularReport,
    owner: &TabularReport,
    diagnostics: &dyn Diagnostics,
) -> Result<CombinedReport, MergeError> {
    let parameters = reconcile(
        generated.fields(),
        owner.fields(),
        LabelKind::Params,
        diagnostics,
    );
    diagnostics.info(&format!(
        "Common params: [{}], Missing params: [{}], Extra params: [{}]",
        parameters.common.iter().join(", "),
        parameters.missing.iter().join(", "),
        parameters.extra.iter().join(", ")
    ));

    if !parameters.common.iter().any(|field| field == JOIN_KEY) {
        diagnostics.warn(&format!(
            "Field '{JOIN_KEY}' not found in common parameters. Aborting comparison"
        ));
        return Err(MergeError::MissingJoinKey {
            common: parameters.common,
        });
    }

    // Join key first, remaining shared fields in the owner's order.
    let common: HashSet<&str> = parameters.common.iter().map(String::as_str).collect();
    let shared_fields: Vec<&str> = std::iter::once(JOIN_KEY)
        .chain(
            owner
                .fields()
                .iter()
                .map(String::as_str)
                .filter(|field| *field != JOIN_KEY && common.contains(field)),
        )
        .collect();
    let field_pairs = shared_fields
        .iter()
        .map(|field| {
            let owner_idx = owner.field_index(field);
            let generated_idx = generated.field_index(field);
            owner_idx.zip(generated_idx)
        })
        .collect::<Option<Vec<(usize, usize)>>>()
        .ok_or_else(|| MergeError::MissingJoinKey {
            common: parameters.common.clone(),
        })?;

    let owner_rows = keyed_rows(owner, ReportSide::Owner)?;
    let generated_rows = keyed_rows(generated, ReportSide::Generated)?;
    let owner_keys = owner_rows.keys().collect::<Vec<_>>();
    let generated_keys = generated_rows.keys().collect::<Vec<_>>();
    let columns = reconcile(
        &generated_keys,
        &owner_keys,
        LabelKind::Columns,
        diagnostics,
    );
    diagnostics.info(&format!(
        "Common cols: [{}], Missing cols: [{}], Extra cols: [{}]",
        columns.common.iter().join(", "),
        columns.missing.iter().join(", "),
        columns.extra.iter().join(", ")
    ));
    if columns.common.is_empty() {
        diagnostics.warn("No common columns found!");
    } else {
        diagnostics.info(&format!(
            "Checking for mismatches across {} common column(s)",
            columns.common.len()
        ));
    }

    let parameter_tail = parameters
        .missing
        .iter()
        .map(|_| Sentinel::MissingParameter.cell())
        .chain(
            parameters
                .extra
                .iter()
                .map(|_| Sentinel::ExtraParameter.cell()),
        )
        .collect::<Vec<_>>();

    let mut mismatches = 0usize;
    let mut rows = Vec::with_capacity(
        columns.common.len() + columns.missing.len() + columns.extra.len(),
    );
    for key in &columns.common {
        // Common keys come from both maps.
        let owner_row = owner_rows[key.as_str()];
        let generated_row = generated_rows[key.as_str()];
        let mut row = field_pairs
            .iter()
            .map(|&(owner_idx, generated_idx)| {
                let expected = &owner_row[owner_idx];
                let actual = &generated_row[generated_idx];
                if expected.as_display() == actual.as_display() {
                    expected.clone()
                } else {
                    mismatches += 1;
                    Sentinel::Mismatch.cell()
                }
            })
            .collect::<Vec<_>>();
        row.extend(parameter_tail.iter().cloned());
        rows.push(row);
    }

    if !columns.missing.is_empty() {
        diagnostics.info("Adding missing columns to the report");
        rows.extend(
            columns
                .missing
                .iter()
                .map(|key| {
                    placeholder_row(
                        key,
                        field_pairs.len(),
                        Sentinel::MissingColumn,
                        &parameter_tail,
                    )
                }),
        );
    }
    if !columns.extra.is_empty() {
        diagnostics.info("Adding extra columns to the report");
        rows.extend(
            columns
                .extra
                .iter()
                .map(|key| {
                    placeholder_row(
                        key,
                        field_pairs.len(),
                        Sentinel::ExtraColumn,
                        &parameter_tail,
                    )
                }),
        );
    }
    if mismatches > 0 {
        diagnostics.warn(&format!("Flagged {mismatches} mismatched value(s)"));
    }

    let fields = shared_fields
        .iter()
        .map(|field| field.to_string())
        .chain(parameters.missing.iter().cloned())
        .chain(parameters.extra.iter().cloned())
        .collect::<Vec<_>>();
    let report = TabularReport::from_parts(fields, rows);
    let (row_count, field_count) = report.shape();
    diagnostics.info(&format!(
        "Report generation complete! Shape ({row_count}, {field_count})"
    ));

    Ok(CombinedReport {
        report,
        summary: MergeSummary {
            parameters,
            columns,
            mismatches,
            rows: row_count,
            fields: field_count,
        },
    })
}

fn keyed_rows(
    report: &TabularReport,
    side: ReportSide,
) -> Result<BTreeMap<String, &[Cell]>, MergeError> {
    let mut keyed = BTreeMap::new();
    let Some(key_idx) = report.field_index(JOIN_KEY) else {
        return Ok(keyed);
    };
    for row in report.rows() {
        let key = row[key_idx].as_display();
        if keyed.contains_key(&key) {
            return Err(MergeError::DuplicateJoinKey { side, value: key });
        }
        keyed.insert(key, row.as_slice());
    }
    Ok(keyed)
}

fn placeholder_row(key: &str, width: usize, sentinel: Sentinel, tail: &[Cell]) -> Vec<Cell> {
    let mut row = Vec::with_capacity(width + tail.len());
    row.push(Cell::text(key));
    row.extend(std::iter::repeat_n(sentinel.cell(), width.saturating_sub(1)));
    row.extend(tail.iter().cloned());
    row
}
