//! Machine-first tables: named sheets of rows mapping column names to scalars.
//!
//! Rows are JSON objects, so tables can come from CSV files (all strings) or
//! from a JSON workbook (typed scalars) without the builders caring.

use serde_json::{Map, Value};

use crate::error::{BuildError, BuildResult, LoadError, LoadResult};
use crate::models::{EntityMap, Keyed};

/// Sheet names of the machine-first contract.
pub mod sheets {
    pub const QUESTIONS: &str = "QUESTIONS";
    pub const QUESTION_TYPES: &str = "QUESTION_TYPES";
    pub const SECTIONS: &str = "SECTIONS";
    pub const LISTS: &str = "LISTS";
    pub const VISIBILITY_RULES: &str = "VISIBILITY_RULES";
    pub const ANOMALIES: &str = "ANOMALIES";

    pub const REQUIRED: [&str; 6] = [
        QUESTIONS,
        QUESTION_TYPES,
        SECTIONS,
        LISTS,
        VISIBILITY_RULES,
        ANOMALIES,
    ];

    /// Sheets allowed to have no rows.
    pub const MAY_BE_EMPTY: [&str; 2] = [VISIBILITY_RULES, ANOMALIES];
}

/// Prefix of per-language label columns.
pub const LANGUAGE_PREFIX: &str = "lang_";

/// Label column of the mandatory system language.
pub const SYSTEM_LANGUAGE_COLUMN: &str = "lang_SYS";

/// A single row: column name to scalar.
pub type Row = Map<String, Value>;

// =============================================================================
// Table
// =============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    name: String,
    headers: Vec<String>,
    rows: Vec<Row>,
}

impl Table {
    pub fn new(name: impl Into<String>, headers: Vec<String>, rows: Vec<Row>) -> Self {
        Self {
            name: name.into(),
            headers,
            rows,
        }
    }

    /// Build a table from JSON objects; headers are the union of keys in
    /// first-seen order. Non-object records are ignored.
    pub fn from_records(name: impl Into<String>, records: Vec<Value>) -> Self {
        let mut headers: Vec<String> = Vec::new();
        let mut rows = Vec::with_capacity(records.len());
        for record in records {
            if let Value::Object(obj) = record {
                for key in obj.keys() {
                    if !headers.iter().any(|h| h == key) {
                        headers.push(key.clone());
                    }
                }
                rows.push(obj);
            }
        }
        Self::new(name, headers, rows)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn has_column(&self, column: &str) -> bool {
        self.headers.iter().any(|h| h == column)
    }

    /// Fail with a structural error naming every absent column.
    pub fn require_columns(&self, required: &[&str]) -> BuildResult<()> {
        let missing: Vec<String> = required
            .iter()
            .filter(|c| !self.has_column(c))
            .map(|c| c.to_string())
            .collect();
        if missing.is_empty() {
            Ok(())
        } else {
            Err(BuildError::MissingColumns {
                table: self.name.clone(),
                columns: missing,
            })
        }
    }

    /// Columns holding per-language labels, in header order.
    pub fn language_columns(&self) -> impl Iterator<Item = &str> {
        self.headers
            .iter()
            .map(String::as_str)
            .filter(|h| h.starts_with(LANGUAGE_PREFIX))
    }

    /// Rows paired with their spreadsheet row number (the header is row 1).
    pub fn numbered_rows(&self) -> impl Iterator<Item = (usize, &Row)> {
        self.rows.iter().enumerate().map(|(i, row)| (i + 2, row))
    }

    /// Rows stably sorted by the numeric `order` column when present, in
    /// table order otherwise. Rows without an order value sort last.
    pub fn rows_in_order(&self) -> BuildResult<Vec<(usize, &Row)>> {
        let mut rows: Vec<(usize, &Row)> = self.numbered_rows().collect();
        if !self.has_column("order") {
            return Ok(rows);
        }

        let mut keyed = Vec::with_capacity(rows.len());
        for (line, row) in rows.drain(..) {
            let order = match cell_number(row, "order") {
                Some(Ok(n)) => Some(n),
                Some(Err(raw)) => {
                    return Err(BuildError::invalid_value(
                        &self.name,
                        line,
                        "order",
                        format!("'{}' is not a number", raw),
                    ))
                }
                None => None,
            };
            keyed.push((order, line, row));
        }
        keyed.sort_by(|a, b| match (a.0, b.0) {
            (Some(x), Some(y)) => x.total_cmp(&y),
            (Some(_), None) => std::cmp::Ordering::Less,
            (None, Some(_)) => std::cmp::Ordering::Greater,
            (None, None) => std::cmp::Ordering::Equal,
        });
        Ok(keyed.into_iter().map(|(_, line, row)| (line, row)).collect())
    }
}

impl Keyed for Table {
    fn key(&self) -> &str {
        &self.name
    }
}

// =============================================================================
// Cell helpers
// =============================================================================

/// A cell as a normalized string. Empty, whitespace-only and `nan` cells
/// are absent; integral numbers print without a fractional part.
pub fn cell_str(row: &Row, column: &str) -> Option<String> {
    match row.get(column)? {
        Value::Null => None,
        Value::String(s) => {
            let s = s.trim();
            if s.is_empty() || s.eq_ignore_ascii_case("nan") {
                None
            } else {
                Some(s.to_string())
            }
        }
        Value::Number(n) => Some(match n.as_f64() {
            Some(f) if n.is_f64() && f.fract() == 0.0 && f.abs() < 1e15 => format!("{}", f as i64),
            _ => n.to_string(),
        }),
        Value::Bool(b) => Some(b.to_string()),
        other => Some(other.to_string()),
    }
}

/// A cell as a scalar value, with strings trimmed and absent cells `None`.
pub fn cell_value(row: &Row, column: &str) -> Option<Value> {
    match row.get(column)? {
        Value::String(_) => cell_str(row, column).map(Value::String),
        Value::Null => None,
        other => Some(other.clone()),
    }
}

/// A cell read as a number; `Err` carries the raw text when it is not one.
pub fn cell_number(row: &Row, column: &str) -> Option<Result<f64, String>> {
    match row.get(column)? {
        Value::Number(n) => n.as_f64().map(Ok),
        _ => cell_str(row, column).map(|s| s.parse::<f64>().map_err(|_| s)),
    }
}

/// A cell read as an integer; floats are accepted only when integral.
pub fn cell_integer(row: &Row, column: &str) -> Option<Result<i64, String>> {
    match row.get(column)? {
        Value::Number(n) => Some(match (n.as_i64(), n.as_f64()) {
            (Some(i), _) => Ok(i),
            (None, Some(f)) if f.fract() == 0.0 && f.abs() < 9.0e15 => Ok(f as i64),
            _ => Err(n.to_string()),
        }),
        _ => cell_str(row, column).map(|s| match s.parse::<i64>() {
            Ok(i) => Ok(i),
            Err(_) => match s.parse::<f64>() {
                Ok(f) if f.fract() == 0.0 && f.abs() < 9.0e15 => Ok(f as i64),
                _ => Err(s),
            },
        }),
    }
}

// =============================================================================
// Workbook
// =============================================================================

/// A set of named tables, as returned by a loader.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Workbook {
    tables: EntityMap<Table>,
}

impl Workbook {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_tables(tables: impl IntoIterator<Item = Table>) -> Self {
        Self {
            tables: EntityMap::from_entities(tables),
        }
    }

    pub fn insert(&mut self, table: Table) {
        self.tables.insert(table.name().to_string(), table);
    }

    pub fn get(&self, name: &str) -> Option<&Table> {
        self.tables.get(name)
    }

    pub fn sheet_names(&self) -> impl Iterator<Item = &str> {
        self.tables.keys()
    }

    /// Fail unless every machine-first sheet is present.
    pub fn check_required_sheets(&self) -> LoadResult<()> {
        let missing: Vec<String> = sheets::REQUIRED
            .iter()
            .filter(|name| !self.tables.contains_key(name))
            .map(|name| name.to_string())
            .collect();
        if missing.is_empty() {
            Ok(())
        } else {
            Err(LoadError::MissingSheets(missing))
        }
    }

    /// A required sheet; call after [`Workbook::check_required_sheets`].
    pub fn sheet(&self, name: &str) -> LoadResult<&Table> {
        self.get(name)
            .ok_or_else(|| LoadError::MissingSheets(vec![name.to_string()]))
    }
}
