//! Workbook loading.
//!
//! This module reads an uploaded `.xlsx` payload into a [`Dataset`],
//! validating the header row before any record is built.

mod schema;

use schema::resolve_columns;

use crate::error::{DashboardError, MalformedInputError};
use crate::models::{Column, Dataset, Metric, Record};
use calamine::{Data, Range, Reader, Xlsx};
use std::io::Cursor;
use std::path::Path;
use tracing::{debug, info};

/// Load a workbook from disk.
///
/// `sheet` selects a worksheet by name; the first worksheet is used otherwise.
pub fn load_workbook(path: &Path, sheet: Option<&str>) -> Result<Dataset, DashboardError> {
    info!("Reading workbook: {}", path.display());

    let bytes = std::fs::read(path).map_err(|source| MalformedInputError::Read {
        path: path.to_path_buf(),
        source,
    })?;

    parse_workbook(bytes, sheet)
}

/// Parse a binary `.xlsx` payload into a dataset.
pub fn parse_workbook(bytes: Vec<u8>, sheet: Option<&str>) -> Result<Dataset, DashboardError> {
    debug!("Parsing {} byte workbook", bytes.len());

    let mut workbook: Xlsx<_> =
        Xlsx::new(Cursor::new(bytes)).map_err(MalformedInputError::from)?;

    let available = workbook.sheet_names().to_vec();
    let name = match sheet {
        Some(name) if available.iter().any(|s| s == name) => name.to_string(),
        Some(name) => {
            return Err(MalformedInputError::SheetNotFound {
                name: name.to_string(),
                available,
            }
            .into())
        }
        None => available
            .first()
            .cloned()
            .ok_or(MalformedInputError::NoWorksheets)?,
    };

    let range = workbook
        .worksheet_range(&name)
        .map_err(MalformedInputError::from)?;

    dataset_from_range(&name, &range)
}

/// Build a dataset from a worksheet range whose first row is the header.
pub fn dataset_from_range(sheet: &str, range: &Range<Data>) -> Result<Dataset, DashboardError> {
    let mut rows = range.rows();
    let header = rows
        .next()
        .ok_or_else(|| MalformedInputError::EmptySheet(sheet.to_string()))?;

    let columns = resolve_columns(sheet, header)?;

    // Sheet rows are 1-based; the header occupies the first row of the range.
    let first_data_row = range.start().map(|(row, _)| row as usize).unwrap_or(0) + 2;

    let mut records = Vec::new();
    for (offset, cells) in rows.enumerate() {
        if cells.iter().all(is_blank) {
            continue;
        }

        let cell = |column: Column| cells.get(columns.index(column)).unwrap_or(&Data::Empty);

        records.push(Record {
            row: first_data_row + offset,
            district: text_cell(cell(Column::District)),
            scheme_name: text_cell(cell(Column::SchemeName)).unwrap_or_default(),
            scheme_type: text_cell(cell(Column::SchemeType)).unwrap_or_default(),
            allocated_budget: metric_cell(cell(Column::AllocatedBudget)),
            utilised_budget: metric_cell(cell(Column::UtilisedBudget)),
            utilisation_pct: metric_cell(cell(Column::UtilisationPct)),
            status: text_cell(cell(Column::Status)).unwrap_or_default(),
        });
    }

    info!("Loaded {} records from worksheet '{}'", records.len(), sheet);
    Ok(Dataset::new(sheet, records))
}

fn is_blank(cell: &Data) -> bool {
    match cell {
        Data::Empty => true,
        Data::String(s) => s.trim().is_empty(),
        _ => false,
    }
}

/// Text value of a categorical cell, kept exactly as stored; blank cells
/// become `None`.
fn text_cell(cell: &Data) -> Option<String> {
    if is_blank(cell) {
        return None;
    }
    Some(cell_to_string(cell))
}

/// Numeric value of a metric cell. Never coerces: anything that is not a
/// number is kept as [`Metric::Invalid`].
fn metric_cell(cell: &Data) -> Metric {
    match cell {
        Data::Float(f) => Metric::Value(*f),
        Data::Int(n) => Metric::Value(*n as f64),
        Data::Empty => Metric::Missing,
        Data::String(s) => parse_metric_text(s),
        other => Metric::Invalid(cell_to_string(other)),
    }
}

/// Parse numbers stored as text, tolerating thousands separators.
fn parse_metric_text(raw: &str) -> Metric {
    let s = raw.trim();
    if s.is_empty() {
        return Metric::Missing;
    }
    if s.chars().any(|c| c.is_ascii_alphabetic()) {
        return Metric::Invalid(raw.to_string());
    }
    match s.replace(',', "").parse::<f64>() {
        Ok(v) if !v.is_nan() => Metric::Value(v),
        _ => Metric::Invalid(raw.to_string()),
    }
}

fn cell_to_string(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) => s.clone(),
        Data::Int(n) => n.to_string(),
        Data::Float(f) => format!("{}", f),
        Data::Bool(b) => b.to_string(),
        Data::Error(e) => format!("#ERR({:?})", e),
        Data::DateTime(dt) => format!("{}", dt),
        Data::DateTimeIso(s) => s.clone(),
        Data::DurationIso(s) => s.clone(),
    }
}
