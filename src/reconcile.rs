//! Set reconciliation of labels between a generated and an owner report.
//!
//! Used twice per merge: once over report field names ("parameters") and once
//! over the values of the join key ("columns").

use std::{collections::BTreeSet, fmt, str::FromStr};

use itertools::Itertools;
use serde::Serialize;
use thiserror::Error;

use crate::diagnostics::Diagnostics;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ReconcileError {
    #[error("Invalid reconciliation kind '{0}' (expected 'params' or 'columns')")]
    InvalidKind(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LabelKind {
    Params,
    Columns,
}

impl LabelKind {
    fn noun(self) -> &'static str {
        match self {
            LabelKind::Params => "parameters",
            LabelKind::Columns => "columns",
        }
    }

    fn capitalized(self) -> &'static str {
        match self {
            LabelKind::Params => "Parameters",
            LabelKind::Columns => "Columns",
        }
    }
}

impl FromStr for LabelKind {
    type Err = ReconcileError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "params" => Ok(LabelKind::Params),
            "columns" => Ok(LabelKind::Columns),
            _ => Err(ReconcileError::InvalidKind(value.to_string())),
        }
    }
}

impl fmt::Display for LabelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.noun())
    }
}

/// How the generated label set relates to the owner label set, judged by size
/// first and contents second.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Relationship {
    Exact,
    Extra,
    Fewer,
    Divergent,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Reconciliation {
    pub kind: LabelKind,
    pub relationship: Relationship,
    pub common: Vec<String>,
    pub missing: Vec<String>,
    pub extra: Vec<String>,
}

impl Reconciliation {
    pub fn is_exact(&self) -> bool {
        self.relationship == Relationship::Exact
    }
}

pub fn reconcile<S, T>(
    user: &[S],
    owner: &[T],
    kind: LabelKind,
    diagnostics: &dyn Diagnostics,
) -> Reconciliation
where
    S: AsRef<str>,
    T: AsRef<str>,
{
    let user: BTreeSet<&str> = user.iter().map(AsRef::as_ref).collect();
    let owner: BTreeSet<&str> = owner.iter().map(AsRef::as_ref).collect();

    let common = collect(user.intersection(&owner));
    let missing = collect(owner.difference(&user));
    let extra = collect(user.difference(&owner));

    let relationship = if user == owner {
        Relationship::Exact
    } else if user.len() > owner.len() {
        Relationship::Extra
    } else if user.len() < owner.len() {
        Relationship::Fewer
    } else {
        Relationship::Divergent
    };

    let capitalized = kind.capitalized();
    let noun = kind.noun();
    match relationship {
        Relationship::Exact => diagnostics.info(&format!("All {noun} found.")),
        Relationship::Extra => diagnostics.warn(&format!(
            "{capitalized} do not match. Extra {noun} found! [{}]. Generating report for common {noun}.",
            extra.iter().join(", ")
        )),
        Relationship::Fewer => diagnostics.warn(&format!(
            "{capitalized} do not match. Fewer {noun} found! [{}]. Generating report for common {noun}.",
            missing.iter().join(", ")
        )),
        Relationship::Divergent => diagnostics.warn(&format!(
            "{capitalized} do not match! Missing {noun}: [{}] Extra {noun}: [{}]. Generating report for common {noun}.",
            missing.iter().join(", "),
            extra.iter().join(", ")
        )),
    }

    Reconciliation {
        kind,
        relationship,
        common,
        missing,
        extra,
    }
}

/// Same as [`reconcile`], with the kind given by name (`params` or `columns`).
pub fn reconcile_named<S, T>(
    user: &[S],
    owner: &[T],
    kind: &str,
    diagnostics: &dyn Diagnostics,
) -> Result<Reconciliation, ReconcileError>
where
    S: AsRef<str>,
    T: AsRef<str>,
{
    let kind = kind.parse::<LabelKind>().inspect_err(|err| {
        diagnostics.error(&format!("{err}. Aborting reconciliation"));
    })?;
    Ok(reconcile(user, owner, kind, diagnostics))
}

fn collect<'a, 'b: 'a>(labels: impl Iterator<Item = &'a &'b str>) -> Vec<String> {
    labels.map(|label| label.to_string()).collect()
}
