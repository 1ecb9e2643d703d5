//! Structural checks on a loaded workbook.
//!
//! These run before any builder and catch whole-table problems early:
//! missing or empty sheets, questions without types or sections, duplicate
//! keys and enumerated values outside their sets.

use std::collections::HashSet;

use crate::builder::anomalies::ANOMALIES_REQUIRED_COLUMNS;
use crate::builder::lists::LISTS_REQUIRED_COLUMNS;
use crate::builder::questions::{
    question_ref, QUESTIONS_REQUIRED_COLUMNS, QUESTION_TYPES_REQUIRED_COLUMNS,
};
use crate::builder::sections::SECTIONS_REQUIRED_COLUMNS;
use crate::error::{BuildError, BuildResult, SpecResult};
use crate::models::{Operator, QuestionKind, ValueType};
use crate::rules::builder::REQUIRED_COLUMNS as RULES_REQUIRED_COLUMNS;
use crate::rules::TargetType;
use crate::table::{
    cell_integer, cell_str, sheets, Table, Workbook, SYSTEM_LANGUAGE_COLUMN,
};

/// Validate the structure of a machine-first workbook.
pub fn validate_workbook(workbook: &Workbook) -> SpecResult<()> {
    workbook.check_required_sheets()?;

    for name in sheets::REQUIRED {
        let table = workbook.sheet(name)?;
        if table.is_empty() && !sheets::MAY_BE_EMPTY.contains(&name) {
            return Err(BuildError::EmptyTable(name.to_string()).into());
        }
    }

    let questions = workbook.sheet(sheets::QUESTIONS)?;
    let question_types = workbook.sheet(sheets::QUESTION_TYPES)?;
    let sections = workbook.sheet(sheets::SECTIONS)?;

    validate_questions(questions)?;
    validate_question_types(question_types)?;
    validate_questions_have_types(questions, question_types)?;
    validate_sections(sections, questions)?;
    validate_lists(workbook.sheet(sheets::LISTS)?)?;
    validate_rules(workbook.sheet(sheets::VISIBILITY_RULES)?)?;
    validate_anomalies(workbook.sheet(sheets::ANOMALIES)?)?;
    Ok(())
}

fn validate_questions(table: &Table) -> BuildResult<()> {
    table.require_columns(&QUESTIONS_REQUIRED_COLUMNS)?;

    let mut seen = HashSet::new();
    for (line, row) in table.numbered_rows() {
        let reference = question_ref(table, line, row)?;
        if !seen.insert(reference.clone()) {
            return Err(BuildError::duplicate(
                table.name(),
                format!("question '{}'", reference),
            ));
        }
        if cell_str(row, SYSTEM_LANGUAGE_COLUMN).is_none() {
            return Err(BuildError::invalid_value(
                table.name(),
                line,
                SYSTEM_LANGUAGE_COLUMN,
                format!("question {} has no system language label", reference),
            ));
        }
    }
    Ok(())
}

fn validate_question_types(table: &Table) -> BuildResult<()> {
    table.require_columns(&QUESTION_TYPES_REQUIRED_COLUMNS)?;

    let mut seen = HashSet::new();
    for (line, row) in table.numbered_rows() {
        let reference = question_ref(table, line, row)?;
        if !seen.insert(reference.clone()) {
            return Err(BuildError::duplicate(
                table.name(),
                format!("type for question '{}'", reference),
            ));
        }
        let code = cell_str(row, "type").unwrap_or_default();
        if QuestionKind::from_code(&code).is_none() {
            return Err(BuildError::invalid_value(
                table.name(),
                line,
                "type",
                format!("invalid question type '{}' for {}", code, reference),
            ));
        }
    }
    Ok(())
}

fn validate_questions_have_types(questions: &Table, types: &Table) -> BuildResult<()> {
    let typed: HashSet<String> = types
        .numbered_rows()
        .map(|(line, row)| question_ref(types, line, row))
        .collect::<BuildResult<_>>()?;

    let mut missing = Vec::new();
    for (line, row) in questions.numbered_rows() {
        let reference = question_ref(questions, line, row)?;
        if !typed.contains(&reference) {
            missing.push(reference);
        }
    }
    if missing.is_empty() {
        Ok(())
    } else {
        Err(BuildError::Referential(format!(
            "Questions without types: {:?}",
            missing
        )))
    }
}

fn validate_sections(sections: &Table, questions: &Table) -> BuildResult<()> {
    sections.require_columns(&SECTIONS_REQUIRED_COLUMNS)?;

    let mut codes = HashSet::new();
    let mut orders = HashSet::new();
    for (_, row) in sections.numbered_rows() {
        if let Some(code) = cell_str(row, "section_code") {
            if !codes.insert(code.clone()) {
                return Err(BuildError::duplicate(
                    sections.name(),
                    format!("section '{}'", code),
                ));
            }
        }
        if let Some(order) = cell_str(row, "order") {
            if !orders.insert(order.clone()) {
                return Err(BuildError::duplicate(
                    sections.name(),
                    format!("order '{}'", order),
                ));
            }
        }
    }

    let mut orphans: Vec<String> = Vec::new();
    for (_, row) in questions.numbered_rows() {
        if let Some(section) = cell_str(row, "section") {
            if !codes.contains(&section) && !orphans.contains(&section) {
                orphans.push(section);
            }
        }
    }
    if orphans.is_empty() {
        Ok(())
    } else {
        Err(BuildError::Referential(format!(
            "Questions reference undefined sections: {:?}",
            orphans
        )))
    }
}

fn validate_lists(table: &Table) -> BuildResult<()> {
    table.require_columns(&LISTS_REQUIRED_COLUMNS)?;

    let mut seen = HashSet::new();
    for (_, row) in table.numbered_rows() {
        let key = (
            cell_str(row, "list_code").unwrap_or_default(),
            cell_str(row, "value").unwrap_or_default(),
        );
        if !seen.insert(key.clone()) {
            return Err(BuildError::duplicate(
                table.name(),
                format!("value '{}' in list '{}'", key.1, key.0),
            ));
        }
    }
    Ok(())
}

fn validate_rules(table: &Table) -> BuildResult<()> {
    if table.is_empty() && table.headers().is_empty() {
        return Ok(());
    }
    table.require_columns(&RULES_REQUIRED_COLUMNS)?;

    for (line, row) in table.numbered_rows() {
        let target_type = cell_str(row, "target_type").unwrap_or_default();
        if TargetType::from_code(&target_type).is_none() {
            return Err(BuildError::invalid_value(
                table.name(),
                line,
                "target_type",
                format!("invalid target_type '{}'", target_type),
            ));
        }
        let operator = cell_str(row, "operator").unwrap_or_default();
        if Operator::from_code(&operator).is_none() {
            return Err(BuildError::invalid_value(
                table.name(),
                line,
                "operator",
                format!("invalid operator '{}'", operator),
            ));
        }
        let value_type = cell_str(row, "value_type").unwrap_or_default();
        if ValueType::from_code(&value_type).is_none() {
            return Err(BuildError::invalid_value(
                table.name(),
                line,
                "value_type",
                format!("invalid value_type '{}'", value_type),
            ));
        }
    }
    Ok(())
}

fn validate_anomalies(table: &Table) -> BuildResult<()> {
    if table.is_empty() && table.headers().is_empty() {
        return Ok(());
    }
    table.require_columns(&ANOMALIES_REQUIRED_COLUMNS)?;

    let mut seen = HashSet::new();
    for (line, row) in table.numbered_rows() {
        if let Some(code) = cell_str(row, "anomaly_code") {
            if !seen.insert(code.clone()) {
                return Err(BuildError::duplicate(
                    table.name(),
                    format!("anomaly code '{}'", code),
                ));
            }
        }
        match cell_integer(row, "weight") {
            Some(Ok(w)) if w > 0 => {}
            _ => {
                return Err(BuildError::invalid_value(
                    table.name(),
                    line,
                    "weight",
                    "must be an integer greater than 0",
                ))
            }
        }
    }
    Ok(())
}
