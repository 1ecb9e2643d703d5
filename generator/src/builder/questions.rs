//! Questions and their type descriptors.

use serde_json::{Number, Value};
use std::collections::HashMap;

use super::{language_labels, required_cell, row_error};
use crate::error::{BuildError, BuildResult};
use crate::models::{EntityMap, Question, QuestionKind, TypeDescriptor};
use crate::rules::{resolve_visibility, RuleIndex, TargetKey, VisibilityOverrides};
use crate::table::{
    cell_integer, cell_number, cell_str, cell_value, Row, Table, SYSTEM_LANGUAGE_COLUMN,
};

pub const QUESTIONS_REQUIRED_COLUMNS: [&str; 4] =
    ["section", "q_num", "label", SYSTEM_LANGUAGE_COLUMN];
pub const QUESTION_TYPES_REQUIRED_COLUMNS: [&str; 3] = ["section", "q_num", "type"];

/// `"{section}-{q_num}"` of a row.
pub(crate) fn question_ref(table: &Table, line: usize, row: &Row) -> BuildResult<String> {
    let section = required_cell(table, line, row, "section")?;
    let number = required_cell(table, line, row, "q_num")?;
    Ok(format!("{}-{}", section, number))
}

/// Index `QUESTION_TYPES` by question ref. One type per question.
pub fn build_question_types(table: &Table) -> BuildResult<HashMap<String, TypeDescriptor>> {
    table.require_columns(&QUESTION_TYPES_REQUIRED_COLUMNS)?;

    let mut types = HashMap::with_capacity(table.len());
    for (line, row) in table.numbered_rows() {
        let reference = question_ref(table, line, row)?;
        if types.contains_key(&reference) {
            return Err(BuildError::duplicate(
                table.name(),
                format!("type for question '{}'", reference),
            ));
        }
        types.insert(reference, type_descriptor(table, line, row)?);
    }
    Ok(types)
}

fn type_descriptor(table: &Table, line: usize, row: &Row) -> BuildResult<TypeDescriptor> {
    let code = required_cell(table, line, row, "type")?;
    let kind = QuestionKind::from_code(&code).ok_or_else(|| {
        BuildError::invalid_value(
            table.name(),
            line,
            "type",
            format!("invalid question type '{}'", code),
        )
    })?;

    let mut descriptor = TypeDescriptor::new(kind);
    descriptor.min = bound(table, line, row, "min")?;
    descriptor.max = bound(table, line, row, "max")?;
    descriptor.default = cell_value(row, "default");
    descriptor.regex = cell_str(row, "regex");
    descriptor.list_code = cell_str(row, "list_code");
    descriptor.auto_code = cell_str(row, "auto_code");
    descriptor.choice_limit = match cell_integer(row, "choice_limit") {
        None => None,
        Some(Ok(n)) if n >= 0 && n <= u32::MAX as i64 => Some(n as u32),
        Some(Ok(n)) => {
            return Err(BuildError::invalid_value(
                table.name(),
                line,
                "choice_limit",
                format!("{} is out of range", n),
            ))
        }
        Some(Err(raw)) => {
            return Err(BuildError::invalid_value(
                table.name(),
                line,
                "choice_limit",
                format!("'{}' is not an integer", raw),
            ))
        }
    };
    Ok(descriptor)
}

/// A numeric bound; integral values are emitted as integers.
fn bound(table: &Table, line: usize, row: &Row, column: &str) -> BuildResult<Option<Value>> {
    match cell_number(row, column) {
        None => Ok(None),
        Some(Ok(n)) if n.fract() == 0.0 && n.abs() < 9.0e15 => Ok(Some(Value::from(n as i64))),
        Some(Ok(n)) => Ok(Number::from_f64(n).map(Value::Number)),
        Some(Err(raw)) => Err(BuildError::invalid_value(
            table.name(),
            line,
            column,
            format!("'{}' is not a number", raw),
        )),
    }
}

/// Build every question, keyed by ref, in `order` (or row) order.
pub fn build_questions(
    questions: &Table,
    question_types: &Table,
    rules: &RuleIndex,
    overrides: &VisibilityOverrides,
) -> BuildResult<EntityMap<Question>> {
    questions.require_columns(&QUESTIONS_REQUIRED_COLUMNS)?;
    let mut types = build_question_types(question_types)?;

    let mut built = EntityMap::new();
    for (line, row) in questions.rows_in_order()? {
        let section = required_cell(questions, line, row, "section")?;
        let number = required_cell(questions, line, row, "q_num")?;
        let reference = format!("{}-{}", section, number);

        if built.contains_key(&reference) {
            return Err(BuildError::duplicate(
                questions.name(),
                format!("question '{}'", reference),
            ));
        }
        let qtype = types.remove(&reference).ok_or_else(|| {
            BuildError::Referential(format!("Missing question type for {}", reference))
        })?;

        let roles: Vec<String> = cell_str(row, "roles")
            .map(|raw| {
                raw.split(',')
                    .map(str::trim)
                    .filter(|r| !r.is_empty())
                    .map(String::from)
                    .collect()
            })
            .unwrap_or_default();

        let visibility = resolve_visibility(rules, overrides, &TargetKey::question(&reference))
            .map_err(row_error(questions, line))?;

        let question = Question::new(
            &section,
            &number,
            cell_str(row, "label").unwrap_or_default(),
            language_labels(questions, row),
            qtype,
            &roles,
            visibility,
        )
        .map_err(row_error(questions, line))?;

        built.insert(reference, question);
    }
    Ok(built)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::rules::build_rules;
    use serde_json::json;

    fn questions_table(records: Vec<Value>) -> Table {
        Table::from_records("QUESTIONS", records)
    }

    fn types_table(records: Vec<Value>) -> Table {
        Table::from_records("QUESTION_TYPES", records)
    }

    fn question_row(section: &str, q_num: &str) -> Value {
        json!({
            "section": section,
            "q_num": q_num,
            "label": format!("Q_{}_{}", section, q_num),
            "lang_SYS": "How many units?",
            "roles": "e",
        })
    }

    fn build(questions: Vec<Value>, types: Vec<Value>) -> BuildResult<EntityMap<Question>> {
        build_questions(
            &questions_table(questions),
            &types_table(types),
            &RuleIndex::new(),
            &VisibilityOverrides::new(),
        )
    }

    #[test]
    fn test_question_with_rules() {
        let rules = build_rules(&Table::from_records(
            "VISIBILITY_RULES",
            vec![json!({
                "target_type": "question", "target_ref": "V-50", "r_ref": "I-10",
                "operator": "=", "value_type": "v", "value": "YES"
            })],
        ))
        .unwrap();
        let questions = build_questions(
            &questions_table(vec![question_row("V", "50")]),
            &types_table(vec![json!({"section": "V", "q_num": "50", "type": "N"})]),
            &rules,
            &VisibilityOverrides::new(),
        )
        .unwrap();

        let value = serde_json::to_value(questions.get("V-50").unwrap()).unwrap();
        assert_eq!(
            value,
            json!({
                "n": {"SYS": "How many units?"},
                "label": "Q_V_50",
                "t": [{"t": "N"}],
                "o": ["e"],
                "v": [{"r": "I-10", "o": "=", "t": "v", "v": "YES"}]
            })
        );
    }

    #[test]
    fn test_type_descriptor_fields() {
        let questions = build(
            vec![question_row("V", "10")],
            vec![json!({
                "section": "V", "q_num": "10", "type": "C",
                "min": "0", "max": "2.5", "list_code": "LST-TEST", "choice_limit": "3",
                "regex": "", "auto_code": "nan"
            })],
        )
        .unwrap();
        assert_eq!(
            serde_json::to_value(questions.get("V-10").unwrap().qtype()).unwrap(),
            json!({"t": "C", "-": 0, "+": 2.5, "o": "LST-TEST", "c": 3})
        );
    }

    #[test]
    fn test_duplicate_question_rejected() {
        let err = build(
            vec![question_row("V", "50"), question_row("V", "50")],
            vec![json!({"section": "V", "q_num": "50", "type": "N"})],
        )
        .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Duplicate);
    }

    #[test]
    fn test_missing_type_is_referential() {
        let err = build(vec![question_row("V", "50")], vec![]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Referential);
        assert!(err.to_string().contains("Missing question type for V-50"));
    }

    #[test]
    fn test_invalid_type_code() {
        let err = build(
            vec![question_row("V", "50")],
            vec![json!({"section": "V", "q_num": "50", "type": "X"})],
        )
        .unwrap_err();
        assert!(err.to_string().contains("invalid question type 'X'"));
    }

    #[test]
    fn test_invalid_role_names_row() {
        let mut row = question_row("V", "50");
        row["roles"] = json!("e, bp");
        let types = vec![json!({"section": "V", "q_num": "50", "type": "N"})];
        let err = build(vec![row], types).unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("QUESTIONS row 2"), "{}", msg);
        assert!(msg.contains("invalid role 'bp'"), "{}", msg);
    }

    #[test]
    fn test_non_numeric_bound_rejected() {
        let err = build(
            vec![question_row("V", "50")],
            vec![json!({"section": "V", "q_num": "50", "type": "N", "max": "many"})],
        )
        .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Value);
    }

    #[test]
    fn test_questions_follow_order_column() {
        let mut first = question_row("V", "20");
        first["order"] = json!("2");
        let mut second = question_row("V", "10");
        second["order"] = json!("1");
        let questions = build(
            vec![first, second],
            vec![
                json!({"section": "V", "q_num": "10", "type": "T"}),
                json!({"section": "V", "q_num": "20", "type": "T"}),
            ],
        )
        .unwrap();
        let keys: Vec<&str> = questions.keys().collect();
        assert_eq!(keys, vec!["V-10", "V-20"]);
    }
}
