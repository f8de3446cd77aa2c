use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(
    author,
    version,
    about = "Audit a table's column profile against the owner's expected report",
    long_about = None
)]
pub struct Cli {
    /// Write logs to a timestamped file in this directory instead of stderr
    #[arg(long = "log-dir", global = true)]
    pub log_dir: Option<PathBuf>,
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Profile every column of a table snapshot into a generated report
    Profile(ProfileArgs),
    /// Compare a generated report with the owner's report and flag discrepancies
    Compare(CompareArgs),
    /// Profile a table snapshot and compare it with the owner's report in one run
    Audit(AuditArgs),
}

#[derive(Debug, Args)]
pub struct ProfileArgs {
    /// Table snapshot to profile (CSV/TSV, `-` for stdin)
    #[arg(short = 'i', long = "input")]
    pub input: PathBuf,
    /// Output file for the generated report (stdout if omitted)
    #[arg(short = 'o', long = "output")]
    pub output: Option<PathBuf>,
    /// Maximum number of data rows to profile
    #[arg(long)]
    pub limit: Option<usize>,
    #[command(flatten)]
    pub format: FormatArgs,
    /// Also render the report as a table on stdout
    #[arg(long = "table")]
    pub table: bool,
}

#[derive(Debug, Args)]
pub struct CompareArgs {
    /// Generated report (CSV/TSV)
    #[arg(short = 'g', long = "generated")]
    pub generated: PathBuf,
    #[command(flatten)]
    pub report: ReportArgs,
}

#[derive(Debug, Args)]
pub struct AuditArgs {
    /// Table snapshot to profile (CSV/TSV, `-` for stdin)
    #[arg(short = 'i', long = "input")]
    pub input: PathBuf,
    /// Maximum number of data rows to profile
    #[arg(long)]
    pub limit: Option<usize>,
    #[command(flatten)]
    pub report: ReportArgs,
}

#[derive(Debug, Args)]
pub struct ReportArgs {
    /// Owner's expected report (CSV/TSV)
    #[arg(short = 'r', long = "owner")]
    pub owner: PathBuf,
    /// Write the combined report to this exact path (`-` for stdout)
    #[arg(short = 'o', long = "output", conflicts_with = "output_dir")]
    pub output: Option<PathBuf>,
    /// Directory that receives a uniquely named `Report_*.csv`
    #[arg(long = "output-dir", default_value = "reports")]
    pub output_dir: PathBuf,
    /// Write the reconciliation summary as JSON to this path
    #[arg(long = "summary")]
    pub summary: Option<PathBuf>,
    #[command(flatten)]
    pub format: FormatArgs,
    /// Also render the combined report as a table on stdout
    #[arg(long = "table")]
    pub table: bool,
}

#[derive(Debug, Args)]
pub struct FormatArgs {
    /// CSV delimiter character for inputs (supports ',', 'tab', ';', '|')
    #[arg(long, value_parser = parse_delimiter)]
    pub delimiter: Option<u8>,
    /// Delimiter to use for output (defaults to the output extension, then ',')
    #[arg(long = "output-delimiter", value_parser = parse_delimiter)]
    pub output_delimiter: Option<u8>,
    /// Character encoding of input files (defaults to utf-8)
    #[arg(long = "input-encoding")]
    pub input_encoding: Option<String>,
    /// Character encoding for the output file/stdout (defaults to utf-8)
    #[arg(long = "output-encoding")]
    pub output_encoding: Option<String>,
}

pub fn parse_delimiter(value: &str) -> Result<u8, String> {
    match value {
        "tab" | "\t" => Ok(b'\t'),
        "comma" | "," => Ok(b','),
        "|" | "pipe" => Ok(b'|'),
        ";" | "semicolon" => Ok(b';'),
        other => {
            let mut chars = other.chars();
            let first = chars
                .next()
                .ok_or_else(|| "Delimiter cannot be empty".to_string())?;
            if chars.next().is_some() {
                return Err("Delimiter must be a single character".to_string());
            }
            if !first.is_ascii() {
                return Err("Delimiter must be ASCII".to_string());
            }
            Ok(first as u8)
        }
    }
}
