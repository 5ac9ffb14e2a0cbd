//! Header validation.

use crate::error::SchemaError;
use crate::models::Column;
use calamine::Data;
use tracing::debug;

/// Position of every required column in the header row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnMap {
    indices: [usize; 7],
}

impl ColumnMap {
    /// Cell index of a column within a row.
    pub fn index(&self, column: Column) -> usize {
        self.indices[column as usize]
    }
}

/// Locate every required column in the header row.
///
/// Fails with a single [`SchemaError`] naming all missing columns.
pub fn resolve_columns(sheet: &str, header: &[Data]) -> Result<ColumnMap, SchemaError> {
    let found: Vec<String> = header
        .iter()
        .map(|cell| match cell {
            Data::String(s) => s.trim().to_string(),
            Data::Empty => String::new(),
            other => super::cell_to_string(other),
        })
        .collect();

    let mut indices = [0usize; 7];
    let mut missing = Vec::new();

    for column in Column::ALL {
        match found.iter().position(|h| column.matches(h)) {
            Some(index) => indices[column as usize] = index,
            None => missing.push(column),
        }
    }

    if !missing.is_empty() {
        return Err(SchemaError {
            sheet: sheet.to_string(),
            missing,
            found: found.into_iter().filter(|h| !h.is_empty()).collect(),
        });
    }

    debug!("Resolved columns for '{}': {:?}", sheet, indices);
    Ok(ColumnMap { indices })
}
