//! Error types for the spec generation pipeline.
//!
//! The hierarchy mirrors the pipeline stages:
//!
//! - [`LoadError`] - reading tables from disk
//! - [`ModelError`] - entity invariants violated at construction
//! - [`BuildError`] - table-level builder failures (columns, keys, references)
//! - [`ValidationError`] - JSON Schema conformance of the final document
//! - [`ExportError`] - writing the document
//! - [`SpecError`] - top-level family every failure converts into
//!
//! Conversion is automatic via `From`, so `?` works across stage boundaries.

use thiserror::Error;

// =============================================================================
// Error classification
// =============================================================================

/// Coarse category of a failure, independent of the stage that raised it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Missing sheets or columns, empty mandatory tables.
    Structural,
    /// Dangling references: orphan sections, rule-less anomalies, untyped questions.
    Referential,
    /// Invalid enumerated values, bad weights, malformed entity fields.
    Value,
    /// Duplicate primary keys.
    Duplicate,
    /// The final document does not conform to the JSON Schema.
    Schema,
    /// Filesystem or decoding failures.
    Io,
}

// =============================================================================
// Loading Errors
// =============================================================================

/// Errors while loading input tables.
#[derive(Debug, Error)]
pub enum LoadError {
    /// Failed to read a file.
    #[error("Failed to read '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// CSV content could not be decoded.
    #[error("Invalid CSV in '{path}': {message}")]
    Csv { path: String, message: String },

    /// JSON workbook could not be decoded.
    #[error("Invalid JSON workbook '{path}': {message}")]
    Json { path: String, message: String },

    /// A required sheet is absent.
    #[error("Missing required sheets: {0:?}")]
    MissingSheets(Vec<String>),

    /// A sheet has no header row.
    #[error("Sheet '{0}' has no header row")]
    NoHeaders(String),

    /// The input path is neither a CSV directory nor a JSON workbook.
    #[error("Unsupported input '{0}': expected a directory of CSV files or a .json workbook")]
    UnsupportedInput(String),
}

// =============================================================================
// Model Errors
// =============================================================================

/// Entity invariant violations, raised by model constructors.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ModelError {
    /// A field holds a value outside its allowed set or shape.
    #[error("{entity}: {message}")]
    InvalidValue { entity: String, message: String },

    /// A collection that must not be empty is empty.
    #[error("{entity}: {message}")]
    Empty { entity: String, message: String },

    /// Two members of one entity share an identifier.
    #[error("{entity}: duplicate {what} '{key}'")]
    Duplicate {
        entity: String,
        what: String,
        key: String,
    },
}

impl ModelError {
    pub fn invalid(entity: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidValue {
            entity: entity.into(),
            message: message.into(),
        }
    }

    pub fn empty(entity: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Empty {
            entity: entity.into(),
            message: message.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidValue { .. } => ErrorKind::Value,
            Self::Empty { .. } => ErrorKind::Referential,
            Self::Duplicate { .. } => ErrorKind::Duplicate,
        }
    }
}

// =============================================================================
// Builder Errors
// =============================================================================

/// Errors while turning tables into entities.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum BuildError {
    /// Required columns are absent from a table.
    #[error("{table} missing columns: {columns:?}")]
    MissingColumns { table: String, columns: Vec<String> },

    /// A mandatory table has no rows.
    #[error("Sheet '{0}' must not be empty")]
    EmptyTable(String),

    /// A primary key occurs twice.
    #[error("{table}: duplicate {key}")]
    DuplicateKey { table: String, key: String },

    /// A reference does not resolve, or a required association is missing.
    #[error("{0}")]
    Referential(String),

    /// A cell holds an invalid value.
    #[error("{table} row {row}, field '{field}': {message}")]
    InvalidValue {
        table: String,
        row: usize,
        field: String,
        message: String,
    },

    /// An entity assembled from several rows violated its invariants.
    #[error("{0}")]
    Entity(#[from] ModelError),

    /// An entity built from a row violated its invariants.
    #[error("{table} row {row}: {source}")]
    InvalidRow {
        table: String,
        row: usize,
        #[source]
        source: ModelError,
    },
}

impl BuildError {
    pub fn invalid_value(
        table: impl Into<String>,
        row: usize,
        field: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::InvalidValue {
            table: table.into(),
            row,
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn duplicate(table: impl Into<String>, key: impl Into<String>) -> Self {
        Self::DuplicateKey {
            table: table.into(),
            key: key.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::MissingColumns { .. } | Self::EmptyTable(_) => ErrorKind::Structural,
            Self::DuplicateKey { .. } => ErrorKind::Duplicate,
            Self::Referential(_) => ErrorKind::Referential,
            Self::InvalidValue { .. } => ErrorKind::Value,
            Self::Entity(source) | Self::InvalidRow { source, .. } => source.kind(),
        }
    }
}

// =============================================================================
// Validation Errors
// =============================================================================

/// Errors during JSON Schema validation.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// The document violates the schema; one message per violation.
    #[error("Schema validation failed:\n{}", format_violations(.errors))]
    SchemaError { errors: Vec<String> },

    /// The schema itself could not be loaded or compiled.
    #[error("Invalid schema '{source_name}': {message}")]
    InvalidSchema {
        source_name: String,
        message: String,
    },
}

fn format_violations(errors: &[String]) -> String {
    errors
        .iter()
        .map(|e| format!("- {}", e))
        .collect::<Vec<_>>()
        .join("\n")
}

// =============================================================================
// Export Errors
// =============================================================================

/// Errors while writing the generated document.
#[derive(Debug, Error)]
pub enum ExportError {
    /// The parent directory of the output path does not exist.
    #[error("Output directory does not exist: {0}")]
    MissingDirectory(String),

    /// Serialization failed.
    #[error("Failed to serialize spec: {0}")]
    Serialize(#[from] serde_json::Error),

    /// Writing the file failed.
    #[error("Failed to write JSON file '{path}': {source}")]
    Write {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

// =============================================================================
// Spec Errors (top-level)
// =============================================================================

/// The single error family surfaced to callers of the pipeline.
#[derive(Debug, Error)]
pub enum SpecError {
    /// Input loading error.
    #[error("Load error: {0}")]
    Load(#[from] LoadError),

    /// Entity invariant error.
    #[error("Model error: {0}")]
    Model(#[from] ModelError),

    /// Table builder error.
    #[error("Build error: {0}")]
    Build(#[from] BuildError),

    /// Schema conformance error.
    #[error("{0}")]
    Validation(#[from] ValidationError),

    /// Export error.
    #[error("Export error: {0}")]
    Export(#[from] ExportError),

    /// Internal failure with no domain meaning, such as serializing an
    /// already validated spec.
    #[error("Unexpected error during spec generation: {0}")]
    Unexpected(String),
}

impl SpecError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Load(LoadError::MissingSheets(_)) | Self::Load(LoadError::NoHeaders(_)) => {
                ErrorKind::Structural
            }
            Self::Load(_) | Self::Export(_) | Self::Unexpected(_) => ErrorKind::Io,
            Self::Model(e) => e.kind(),
            Self::Build(e) => e.kind(),
            Self::Validation(_) => ErrorKind::Schema,
        }
    }
}

// =============================================================================
// Result Type Aliases
// =============================================================================

/// Result type for loading operations.
pub type LoadResult<T> = Result<T, LoadError>;

/// Result type for entity construction.
pub type ModelResult<T> = Result<T, ModelError>;

/// Result type for builders.
pub type BuildResult<T> = Result<T, BuildError>;

/// Result type for the whole pipeline.
pub type SpecResult<T> = Result<T, SpecError>;
