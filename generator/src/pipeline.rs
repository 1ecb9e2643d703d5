//! End-to-end generation: workbook in, validated spec document out.
//!
//! Stages, in order:
//!
//! 1. structural validation of the workbook
//! 2. free-text `visibility` columns parsed into overrides
//! 3. flat rule table indexed by target
//! 4. questions, sections, lists, anomalies
//! 5. aggregate assembly and JSON Schema validation
//!
//! # Example
//!
//! ```rust,ignore
//! use qspec::{generate_from_path, GeneratorConfig};
//!
//! let generated = generate_from_path("tables/", &GeneratorConfig::from_env())?;
//! println!("{} sections", generated.spec.sections().len());
//! ```

use serde::Serialize;
use serde_json::Value;
use std::path::Path;

use crate::builder::{build_anomalies, build_lists, build_questions, build_sections};
use crate::builder::questions::question_ref;
use crate::config::GeneratorConfig;
use crate::error::{SpecError, SpecResult};
use crate::logs::{log_info, log_info_indent, log_success, log_warning};
use crate::models::{EntityMap, Spec};
use crate::parser::load_workbook;
use crate::rules::{build_rules, parse_visibility, RuleIndex, TargetKey, VisibilityOverrides};
use crate::table::{cell_str, sheets, Row, Table, Workbook};
use crate::validation::{resolve_schema, validate_document, validate_workbook};

/// Optional free-text rule column on `QUESTIONS`, `SECTIONS` and `ANOMALIES`.
pub const VISIBILITY_COLUMN: &str = "visibility";

/// Result of a generation run
#[derive(Debug, Clone, Serialize)]
pub struct GeneratedSpec {
    #[serde(skip)]
    pub spec: Spec,

    /// Wire document, already schema-validated
    pub document: Value,

    /// Non-fatal problems met while parsing free-text rules
    pub warnings: Vec<String>,
}

/// Load a workbook from disk and generate its spec.
pub fn generate_from_path<P: AsRef<Path>>(
    input: P,
    config: &GeneratorConfig,
) -> SpecResult<GeneratedSpec> {
    let input = input.as_ref();
    log_info(format!("Loading workbook {}", input.display()));
    let workbook = load_workbook(input)?;
    generate_spec(&workbook, config)
}

/// Generate a validated spec from loaded tables.
pub fn generate_spec(workbook: &Workbook, config: &GeneratorConfig) -> SpecResult<GeneratedSpec> {
    validate_workbook(workbook)?;
    log_success("Workbook structure valid");

    let (overrides, warnings) = collect_overrides(workbook)?;
    if !overrides.is_empty() {
        log_info_indent(format!("{} free-text visibility overrides", overrides.len()), 1);
    }

    let rules_table = workbook.sheet(sheets::VISIBILITY_RULES)?;
    let rules = if is_blank(rules_table) {
        RuleIndex::new()
    } else {
        build_rules(rules_table)?
    };
    log_info_indent(format!("{} rule targets", rules.len()), 1);

    let questions = build_questions(
        workbook.sheet(sheets::QUESTIONS)?,
        workbook.sheet(sheets::QUESTION_TYPES)?,
        &rules,
        &overrides,
    )?;
    log_info_indent(format!("{} questions", questions.len()), 1);

    let sections = build_sections(
        workbook.sheet(sheets::SECTIONS)?,
        questions,
        &rules,
        &overrides,
    )?;
    log_info_indent(format!("{} sections", sections.len()), 1);

    let lists = build_lists(workbook.sheet(sheets::LISTS)?)?;
    log_info_indent(format!("{} lists", lists.len()), 1);

    let anomalies_table = workbook.sheet(sheets::ANOMALIES)?;
    let anomalies = if anomalies_table.is_empty() {
        EntityMap::new()
    } else {
        build_anomalies(anomalies_table, &rules, &overrides)?
    };
    log_info_indent(format!("{} anomalies", anomalies.len()), 1);

    let spec = Spec::new(
        config.name.as_str(),
        config.version.as_str(),
        sections,
        lists,
        anomalies,
        config.notes.clone(),
    )?;

    let document = spec
        .to_value()
        .map_err(|e| SpecError::Unexpected(e.to_string()))?;
    let schema = resolve_schema(config.schema_path.as_deref())?;
    validate_document(&schema, &document)?;
    log_success(format!("Spec '{}' v{} generated", spec.name(), spec.version()));

    Ok(GeneratedSpec {
        spec,
        document,
        warnings,
    })
}

type TargetOf = fn(&Table, usize, &Row) -> SpecResult<Option<TargetKey>>;

/// Parse every non-empty `visibility` cell into an override for its target.
///
/// Returns the overrides and the parser warnings, each prefixed with its target.
pub fn collect_overrides(workbook: &Workbook) -> SpecResult<(VisibilityOverrides, Vec<String>)> {
    let mut overrides = VisibilityOverrides::new();
    let mut warnings = Vec::new();

    let sources: [(&str, TargetOf); 3] = [
        (sheets::QUESTIONS, question_target),
        (sheets::SECTIONS, section_target),
        (sheets::ANOMALIES, anomaly_target),
    ];

    for (sheet, target_of) in sources {
        let table = workbook.sheet(sheet)?;
        if !table.has_column(VISIBILITY_COLUMN) {
            continue;
        }
        for (line, row) in table.numbered_rows() {
            let text = match cell_str(row, VISIBILITY_COLUMN) {
                Some(text) => text,
                None => continue,
            };
            let key = match target_of(table, line, row)? {
                Some(key) => key,
                None => continue,
            };
            let outcome = parse_visibility(&text);
            for warning in outcome.warnings {
                let warning = format!("{}: {}", key, warning);
                log_warning(warning.as_str());
                warnings.push(warning);
            }
            overrides.insert(&key, outcome.rules);
        }
    }
    Ok((overrides, warnings))
}

fn question_target(table: &Table, line: usize, row: &Row) -> SpecResult<Option<TargetKey>> {
    Ok(Some(TargetKey::question(question_ref(table, line, row)?)))
}

fn section_target(_: &Table, _: usize, row: &Row) -> SpecResult<Option<TargetKey>> {
    Ok(cell_str(row, "section_code").map(TargetKey::section))
}

fn anomaly_target(_: &Table, _: usize, row: &Row) -> SpecResult<Option<TargetKey>> {
    Ok(cell_str(row, "anomaly_code").map(TargetKey::anomaly))
}

/// A sheet with neither headers nor rows.
fn is_blank(table: &Table) -> bool {
    table.is_empty() && table.headers().is_empty()
}
