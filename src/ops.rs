//! The three table operations behind the CLI subcommands.
//!
//! Each operation is a function of an explicit [`RunConfig`]; there is no
//! process-wide state. `create` builds the demonstration table from scratch,
//! `load` streams it back, `append_and_mutate` adds one row and rewrites the
//! second data row's city.

use std::path::PathBuf;

use chrono::{Local, NaiveDateTime, Timelike};
use log::{debug, info};

use crate::cell::{CellValue, Row};
use crate::editor::SheetEditor;
use crate::error::Result;
use crate::reader::{Rows, SheetReader};
use crate::writer::TableWriter;

/// Per-invocation settings, passed into every operation.
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub path: PathBuf,
    /// Go through every in-memory step but skip persistence.
    pub dry_run: bool,
}

impl RunConfig {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            dry_run: false,
        }
    }
}

pub const SHEET_NAME: &str = "Data";
pub const HEADER: [&str; 4] = ["Name", "Age", "City", "Date"];
pub const COLUMN_WIDTHS: [f64; 4] = [15.0, 10.0, 15.0, 20.0];
pub const UPDATED_CITY: &str = "Los Angeles";

/// City cell of the second data row (the header occupies row 1).
const MUTATED_CELL: &str = "C3";

/// Current local time at the second granularity the wire format keeps.
fn now() -> NaiveDateTime {
    let now = Local::now().naive_local();
    now.with_nanosecond(0).unwrap_or(now)
}

fn sample_rows() -> Vec<Row> {
    let stamp = now();
    vec![
        vec!["Alice".into(), 30.into(), "New York".into(), stamp.into()],
        vec!["Bob".into(), 25.into(), "San Francisco".into(), stamp.into()],
        vec!["Charlie".into(), 35.into(), "Boston".into(), stamp.into()],
    ]
}

/// Builds the demonstration workbook (styled header, three data rows, fixed
/// column widths) and persists it at `cfg.path`, overwriting any previous
/// file.
pub fn create(cfg: &RunConfig) -> Result<()> {
    let mut writer = TableWriter::new(SHEET_NAME);
    writer.header(HEADER);
    for row in sample_rows() {
        writer.append_row(row);
    }
    writer.column_widths(COLUMN_WIDTHS);

    if cfg.dry_run {
        info!(
            "dry run: would write sheet '{}' with {} data rows to {}",
            SHEET_NAME,
            writer.data_row_count(),
            cfg.path.display()
        );
        return Ok(());
    }
    writer.save(&cfg.path)?;
    debug!("created {}", cfg.path.display());
    Ok(())
}

/// Opens the workbook at `cfg.path` and returns its rows, header first.
pub fn load(cfg: &RunConfig) -> Result<Rows> {
    Ok(SheetReader::open(&cfg.path)?.rows())
}

/// Appends one data row and overwrites the second data row's city, then
/// saves the workbook back in place.
pub fn append_and_mutate(cfg: &RunConfig) -> Result<()> {
    let mut editor = SheetEditor::open(&cfg.path)?;

    editor.append_row(&["David".into(), 28.into(), "Chicago".into(), now().into()])?;
    editor.set_cell(MUTATED_CELL, &CellValue::Text(UPDATED_CITY.to_owned()))?;

    if cfg.dry_run {
        info!(
            "dry run: would append row {} and set {MUTATED_CELL} to \"{UPDATED_CITY}\" in {}",
            editor.last_row(),
            cfg.path.display()
        );
        return Ok(());
    }
    editor.save(&cfg.path)?;
    debug!("updated {}", cfg.path.display());
    Ok(())
}
