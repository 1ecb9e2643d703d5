//! Validation of inputs and outputs.
//!
//! - [`tables`] - structural checks on a loaded workbook, run before building
//! - this module - JSON Schema (draft 7) conformance of the generated document
//!
//! # Embedded Schema
//!
//! The wire format schema is embedded at compile time from
//! `schemas/spec_v2.schema.json`; a schema file given at runtime replaces it.
//!
//! # Example
//!
//! ```rust,ignore
//! use qspec::validation::{default_schema, validate_document};
//!
//! let schema = default_schema()?;
//! validate_document(&schema, &spec.to_value()?)?;
//! ```

use serde_json::Value;
use std::path::Path;

use crate::error::{LoadError, SpecResult, ValidationError};

pub mod tables;

pub use tables::validate_workbook;

/// Name reported for the embedded schema.
pub const EMBEDDED_SCHEMA_NAME: &str = "spec_v2.schema.json (embedded)";

const EMBEDDED_SCHEMA: &str = include_str!("../../schemas/spec_v2.schema.json");

/// The embedded wire format schema.
pub fn default_schema() -> Result<Value, ValidationError> {
    serde_json::from_str(EMBEDDED_SCHEMA).map_err(|e| ValidationError::InvalidSchema {
        source_name: EMBEDDED_SCHEMA_NAME.to_string(),
        message: e.to_string(),
    })
}

/// Read a schema file.
pub fn load_schema<P: AsRef<Path>>(path: P) -> Result<Value, ValidationError> {
    let path = path.as_ref();
    let invalid = |message: String| ValidationError::InvalidSchema {
        source_name: path.display().to_string(),
        message,
    };
    let content = std::fs::read_to_string(path).map_err(|e| invalid(e.to_string()))?;
    serde_json::from_str(&content).map_err(|e| invalid(e.to_string()))
}

/// The schema at `path`, or the embedded one.
pub fn resolve_schema(path: Option<&Path>) -> Result<Value, ValidationError> {
    match path {
        Some(path) => load_schema(path),
        None => default_schema(),
    }
}

/// Validate a generated document, reporting every violation.
pub fn validate_document(schema: &Value, document: &Value) -> Result<(), ValidationError> {
    let validator =
        jsonschema::draft7::new(schema).map_err(|e| ValidationError::InvalidSchema {
            source_name: "schema".to_string(),
            message: e.to_string(),
        })?;

    let errors: Vec<String> = validator
        .iter_errors(document)
        .map(|e| e.to_string())
        .collect();

    if errors.is_empty() {
        Ok(())
    } else {
        Err(ValidationError::SchemaError { errors })
    }
}

/// Read a spec document from disk and validate it against the schema at
/// `schema_path`, or the embedded one.
pub fn validate_file<P: AsRef<Path>>(
    document_path: P,
    schema_path: Option<&Path>,
) -> SpecResult<()> {
    let path = document_path.as_ref();
    let display = path.display().to_string();
    let content = std::fs::read_to_string(path).map_err(|source| LoadError::Io {
        path: display.clone(),
        source,
    })?;
    let document: Value = serde_json::from_str(&content).map_err(|e| LoadError::Json {
        path: display,
        message: e.to_string(),
    })?;

    let schema = resolve_schema(schema_path)?;
    validate_document(&schema, &document)?;
    Ok(())
}
