//! # QSpec - interview spec generation from machine-first tables
//!
//! QSpec turns the six tables of a machine-first workbook (questions, question
//! types, sections, lists, visibility rules, anomalies) into the compact JSON
//! spec consumed by the interview runtime.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐     ┌─────────────┐     ┌─────────────┐     ┌─────────────┐
//! │  CSV dir /  │────▶│   Parser    │────▶│  Builders   │────▶│  Spec JSON  │
//! │ JSON sheets │     │  (auto-enc) │     │ (rules+DSL) │     │ (validated) │
//! └─────────────┘     └─────────────┘     └─────────────┘     └─────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use qspec::{export_spec_to_json, generate_from_path, GeneratorConfig};
//!
//! let config = GeneratorConfig::from_env();
//! let generated = generate_from_path("tables/", &config)?;
//! export_spec_to_json(&generated.spec, "spec.json", config.pretty)?;
//! ```
//!
//! ## Modules
//!
//! - [`error`] - Hierarchical error types
//! - [`models`] - Domain entities (Spec, Section, Question, Rule, ...)
//! - [`table`] - Tables, workbooks and cell normalization
//! - [`parser`] - CSV / JSON workbook loading with auto-detection
//! - [`rules`] - Rule table indexing and the free-text visibility parser
//! - [`builder`] - Table to entity builders
//! - [`validation`] - Workbook checks and JSON Schema validation
//! - [`pipeline`] - End-to-end generation
//! - [`export`] - Writing the document
//! - [`config`] - Defaults and environment
//! - [`logs`] - Stage logging

// Core modules
pub mod error;
pub mod models;

// Input
pub mod parser;
pub mod table;

// Building
pub mod builder;
pub mod rules;

// Validation
pub mod validation;

// Generation
pub mod config;
pub mod export;
pub mod logs;
pub mod pipeline;

// =============================================================================
// Re-exports - Error types
// =============================================================================

pub use error::{
    BuildError,
    ErrorKind,
    ExportError,
    LoadError,
    ModelError,
    SpecError,
    SpecResult,
    ValidationError,
};

// =============================================================================
// Re-exports - Models
// =============================================================================

pub use models::{
    Anomaly,
    Condition,
    EntityMap,
    ListItem,
    Operator,
    Question,
    QuestionKind,
    Role,
    Rule,
    Section,
    Spec,
    SpecList,
    TypeDescriptor,
    ValueType,
};

// =============================================================================
// Re-exports - Tables & Parsing
// =============================================================================

pub use table::{Table, Workbook};

pub use parser::{
    decode_content,
    detect_delimiter,
    detect_encoding,
    load_csv_dir,
    load_json_workbook,
    load_workbook,
    parse_table,
};

// =============================================================================
// Re-exports - Rules
// =============================================================================

pub use rules::{
    build_rules,
    parse_visibility,
    parse_visibility_rule,
    resolve_visibility,
    ParseOutcome,
    RuleDict,
    TargetKey,
    TargetType,
    VisibilityOverrides,
};

// =============================================================================
// Re-exports - Builders
// =============================================================================

pub use builder::{build_anomalies, build_lists, build_questions, build_sections};

// =============================================================================
// Re-exports - Validation
// =============================================================================

pub use validation::{
    default_schema,
    load_schema,
    validate_document,
    validate_workbook,
};

// =============================================================================
// Re-exports - Pipeline
// =============================================================================

pub use config::GeneratorConfig;
pub use export::export_spec_to_json;
pub use pipeline::{generate_from_path, generate_spec, GeneratedSpec};
