pub mod cli;
pub mod compare;
pub mod diagnostics;
pub mod export;
pub mod io_utils;
pub mod merge;
pub mod profile;
pub mod reconcile;
pub mod report;
pub mod table;

use std::{
    env,
    fs::{self, File},
    path::{Path, PathBuf},
    sync::OnceLock,
};

use anyhow::{Context, Result};
use chrono::Local;
use clap::Parser;
use env_logger::{Target, WriteStyle};
use log::{LevelFilter, debug};

use crate::cli::{Cli, Commands};

pub use crate::{
    diagnostics::{Diagnostics, LogDiagnostics, RecordingDiagnostics},
    merge::{CombinedReport, MergeError, MergeSummary, Sentinel, merge},
    reconcile::{LabelKind, ReconcileError, Reconciliation, reconcile},
    report::{Cell, JOIN_KEY, ReportError, TabularReport},
};

static LOGGER: OnceLock<()> = OnceLock::new();

fn init_logging(log_file: Option<File>) {
    LOGGER.get_or_init(|| {
        let mut builder = env_logger::Builder::from_env(env_logger::Env::default());
        if env::var("RUST_LOG").is_err() {
            builder.filter_module("table_audit", LevelFilter::Info);
        }
        if let Some(file) = log_file {
            builder
                .target(Target::Pipe(Box::new(file)))
                .write_style(WriteStyle::Never);
        }
        let _ = builder.format_timestamp_millis().try_init();
    });
}

fn open_log_file(dir: &Path) -> Result<(PathBuf, File)> {
    fs::create_dir_all(dir).with_context(|| format!("Creating log directory {dir:?}"))?;
    let path = dir.join(format!(
        "table_audit_{}.log",
        Local::now().format("%Y%m%d_%H%M%S")
    ));
    let file = File::create(&path).with_context(|| format!("Creating log file {path:?}"))?;
    Ok((path, file))
}

pub fn run() -> Result<()> {
    let cli = Cli::parse();
    let log_file = match &cli.log_dir {
        Some(dir) => Some(open_log_file(dir)?),
        None => None,
    };
    let log_path = log_file.as_ref().map(|(path, _)| path.clone());
    init_logging(log_file.map(|(_, file)| file));
    if let Some(path) = log_path {
        debug!("Logging to {path:?}");
    }
    match cli.command {
        Commands::Profile(args) => profile::execute(&args),
        Commands::Compare(args) => compare::execute(&args),
        Commands::Audit(args) => compare::execute_audit(&args),
    }
}

pub(crate) fn printable_delimiter(delimiter: u8) -> String {
    match delimiter {
        b',' => ",".to_string(),
        b'\t' => "\\t".to_string(),
        b'\n' => "\\n".to_string(),
        other => (other as char).to_string(),
    }
}
