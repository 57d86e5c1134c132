//! Report rendering.
//!
//! Writes an already generated [`Report`] as `report.csv` and `index.html`
//! in an output directory, and optionally lists it on stdout.

pub mod console;
pub mod csv;
pub mod html;

use crate::env;
use crate::report::Report;
use std::fs::{self, File};
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::info;

#[derive(Error, Debug)]
pub enum OutputError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] ::csv::Error),
}

pub type Result<T> = std::result::Result<T, OutputError>;

/// Files written by [`write_reports`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportPaths {
    pub csv: PathBuf,
    pub html: PathBuf,
}

/// Write the HTML and CSV reports into `output_dir`, creating it if missing.
pub fn write_reports(report: &Report, output_dir: &Path) -> Result<ReportPaths> {
    fs::create_dir_all(output_dir)?;

    let paths = ReportPaths {
        csv: env::csv_report_path(output_dir),
        html: env::html_report_path(output_dir),
    };

    fs::write(&paths.html, html::render_html(report))?;
    csv::write_csv(report, BufWriter::new(File::create(&paths.csv)?))?;

    info!("Reports written to directory {}", output_dir.display());
    Ok(paths)
}

/// List the report's rows on stdout.
pub fn print_rows(report: &Report) -> Result<()> {
    console::write_rows(report, std::io::stdout().lock())
}
