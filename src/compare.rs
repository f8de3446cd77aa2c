//! `compare` and `audit` commands: load or profile the generated report, load
//! the owner's report, merge them and export the combined report.

use std::{
    fs::File,
    io::{BufWriter, IsTerminal, Write},
    path::Path,
};

use anyhow::{Context, Result};
use log::info;

use crate::{
    cli::{AuditArgs, CompareArgs, ReportArgs},
    diagnostics::LogDiagnostics,
    export::{self, ExportTarget},
    io_utils,
    merge::{self, MergeSummary},
    printable_delimiter, profile,
    report::{self, TabularReport},
    table,
};

pub fn execute(args: &CompareArgs) -> Result<()> {
    let encoding = io_utils::resolve_encoding(args.report.format.input_encoding.as_deref())?;
    let delimiter = io_utils::resolve_input_delimiter(&args.generated, args.report.format.delimiter);
    info!(
        "Loading generated report '{}' with delimiter '{}'",
        args.generated.display(),
        printable_delimiter(delimiter)
    );
    let generated = report::load_report(&args.generated, delimiter, encoding)
        .with_context(|| format!("Loading generated report {:?}", args.generated))?;
    compare_with_owner(&generated, &args.report)
}

pub fn execute_audit(args: &AuditArgs) -> Result<()> {
    let encoding = io_utils::resolve_encoding(args.report.format.input_encoding.as_deref())?;
    let delimiter = io_utils::resolve_input_delimiter(&args.input, args.report.format.delimiter);
    info!(
        "Profiling '{}' with delimiter '{}'",
        args.input.display(),
        printable_delimiter(delimiter)
    );
    let generated = profile::profile_csv(&args.input, delimiter, encoding, args.limit)
        .with_context(|| format!("Profiling {:?}", args.input))?;
    info!("Generated report with shape {:?}", generated.shape());
    compare_with_owner(&generated, &args.report)
}

fn compare_with_owner(generated: &TabularReport, args: &ReportArgs) -> Result<()> {
    let encoding = io_utils::resolve_encoding(args.format.input_encoding.as_deref())?;
    let delimiter = io_utils::resolve_input_delimiter(&args.owner, args.format.delimiter);
    let owner = report::load_report(&args.owner, delimiter, encoding)
        .with_context(|| format!("Loading owner report {:?}", args.owner))?;

    info!(
        "Comparing reports {:?} and {:?}",
        generated.shape(),
        owner.shape()
    );
    let combined =
        merge::merge(generated, &owner, &LogDiagnostics).context("Report comparison failed")?;

    if let Some(path) = &args.summary {
        write_summary(path, &combined.summary)?;
    }
    if args.table {
        table::print_report(&combined.report, None, std::io::stdout().is_terminal());
    }

    let output_encoding = io_utils::resolve_encoding(args.format.output_encoding.as_deref())?;
    let output_delimiter = io_utils::resolve_output_delimiter(
        args.output.as_deref(),
        args.format.output_delimiter,
        io_utils::DEFAULT_CSV_DELIMITER,
    );
    let target = match &args.output {
        Some(path) => ExportTarget::File(path.clone()),
        None => ExportTarget::Directory(args.output_dir.clone()),
    };
    let written = export::export_report(
        &combined.report,
        &target,
        output_delimiter,
        output_encoding,
    )?;
    info!(
        "Exported combined report {:?} to {:?} ({} mismatch(es))",
        combined.report.shape(),
        written,
        combined.summary.mismatches
    );
    Ok(())
}

fn write_summary(path: &Path, summary: &MergeSummary) -> Result<()> {
    let file = File::create(path).with_context(|| format!("Creating summary file {path:?}"))?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, summary)
        .with_context(|| format!("Writing summary to {path:?}"))?;
    writer
        .flush()
        .with_context(|| format!("Flushing summary {path:?}"))?;
    info!("Reconciliation summary written to {path:?}");
    Ok(())
}
