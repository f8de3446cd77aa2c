//! Writes a combined report to disk.
//!
//! Reports exported into a directory get a timestamped name
//! (`Report_YYYYMMDD_HHMMSS.csv`). Files are created exclusively; when the name
//! is taken, a random six-character suffix is tried a few times before giving up.

use std::{
    fs::{self, OpenOptions},
    io::{self, Write},
    path::{Path, PathBuf},
};

use anyhow::{Context, Result, anyhow};
use chrono::Local;
use encoding_rs::Encoding;
use log::{error, info};
use uuid::Uuid;

use crate::{io_utils, report::TabularReport};

const MAX_RETRIES: usize = 3;
const SUFFIX_LEN: usize = 6;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExportTarget {
    /// Write exactly this path, replacing an existing file. `-` means stdout.
    File(PathBuf),
    /// Pick a unique report name inside this directory.
    Directory(PathBuf),
}

pub fn render_csv(
    report: &TabularReport,
    delimiter: u8,
    encoding: &'static Encoding,
) -> Result<Vec<u8>> {
    let mut writer = io_utils::buffered_csv_writer(delimiter);
    writer
        .write_record(report.fields())
        .context("Writing report headers")?;
    for row in report.display_rows() {
        writer.write_record(&row).context("Writing report row")?;
    }
    let buffer = writer
        .into_inner()
        .map_err(|err| anyhow!("Flushing report output: {}", err.error()))?;
    let text = String::from_utf8(buffer).context("Report output is not valid UTF-8")?;
    io_utils::encode_text(&text, encoding)
}

pub fn export_report(
    report: &TabularReport,
    target: &ExportTarget,
    delimiter: u8,
    encoding: &'static Encoding,
) -> Result<PathBuf> {
    let bytes = render_csv(report, delimiter, encoding)?;
    match target {
        ExportTarget::File(path) if io_utils::is_dash(path) => {
            let mut stdout = io::stdout().lock();
            stdout.write_all(&bytes).context("Writing report to stdout")?;
            stdout.flush().context("Flushing stdout")?;
            Ok(path.clone())
        }
        ExportTarget::File(path) => {
            fs::write(path, &bytes).with_context(|| format!("Writing report to {path:?}"))?;
            info!("The report was successfully generated at {path:?}");
            Ok(path.clone())
        }
        ExportTarget::Directory(dir) => {
            fs::create_dir_all(dir)
                .with_context(|| format!("Creating report directory {dir:?}"))?;
            let stamp = Local::now().format("%Y%m%d_%H%M%S").to_string();
            write_unique(dir, &bytes, &stamp, random_suffix)
        }
    }
}

fn write_unique(
    dir: &Path,
    bytes: &[u8],
    stamp: &str,
    mut suffix: impl FnMut() -> String,
) -> Result<PathBuf> {
    let mut candidate = dir.join(format!("Report_{stamp}.csv"));
    for attempt in 0..=MAX_RETRIES {
        match create_exclusive(&candidate, bytes) {
            Ok(()) => {
                info!("The report was successfully generated. Filename is {candidate:?}");
                return Ok(candidate);
            }
            Err(err) if err.kind() == io::ErrorKind::AlreadyExists => {
                if attempt == MAX_RETRIES {
                    break;
                }
                error!("A file named {candidate:?} already exists. Retrying...");
                candidate = dir.join(format!("Report_{}.csv", suffix()));
            }
            Err(err) => {
                return Err(err).with_context(|| format!("Creating report file {candidate:?}"));
            }
        }
    }
    Err(anyhow!(
        "Max retry attempt reached while choosing a report name in {dir:?}"
    ))
}

fn create_exclusive(path: &Path, bytes: &[u8]) -> io::Result<()> {
    let mut file = OpenOptions::new().write(true).create_new(true).open(path)?;
    file.write_all(bytes)?;
    file.flush()
}

fn random_suffix() -> String {
    Uuid::new_v4()
        .simple()
        .to_string()
        .to_ascii_uppercase()
        .chars()
        .take(SUFFIX_LEN)
        .collect()
}
