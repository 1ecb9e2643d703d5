//! Entity builders: one per machine-first table.
//!
//! Builders are strict. They validate their required columns, build one entity
//! per row in a stable order and fail on the first violation with an error
//! naming the table, row and field.

use crate::error::{BuildError, BuildResult, ModelError};
use crate::models::EntityMap;
use crate::table::{cell_str, Row, Table, LANGUAGE_PREFIX};

pub mod anomalies;
pub mod lists;
pub mod questions;
pub mod sections;

pub use anomalies::build_anomalies;
pub use lists::build_lists;
pub use questions::{build_question_types, build_questions};
pub use sections::build_sections;

/// Per-language texts of a row, keyed by language code (`lang_SYS` → `SYS`).
pub(crate) fn language_labels(table: &Table, row: &Row) -> EntityMap<String> {
    table
        .language_columns()
        .filter_map(|column| {
            cell_str(row, column).map(|text| (&column[LANGUAGE_PREFIX.len()..], text))
        })
        .collect()
}

/// A cell that must hold a value.
pub(crate) fn required_cell(
    table: &Table,
    line: usize,
    row: &Row,
    column: &str,
) -> BuildResult<String> {
    cell_str(row, column)
        .ok_or_else(|| BuildError::invalid_value(table.name(), line, column, "value is required"))
}

/// Attach table and row context to an entity invariant failure.
pub(crate) fn row_error(table: &Table, line: usize) -> impl Fn(ModelError) -> BuildError + '_ {
    move |source| BuildError::InvalidRow {
        table: table.name().to_string(),
        row: line,
        source,
    }
}
