use std::collections::HashMap;

use super::{required_cell, row_error};
use crate::error::{BuildError, BuildResult};
use crate::models::{EntityMap, Question, Section};
use crate::rules::{resolve_visibility, RuleIndex, TargetKey, VisibilityOverrides};
use crate::table::Table;

pub const SECTIONS_REQUIRED_COLUMNS: [&str; 3] = ["section_code", "section_label", "order"];

/// Build sections in `order` order, distributing the questions to the
/// section they declare. Questions keep their relative order.
pub fn build_sections(
    sections: &Table,
    questions: EntityMap<Question>,
    rules: &RuleIndex,
    overrides: &VisibilityOverrides,
) -> BuildResult<EntityMap<Section>> {
    sections.require_columns(&SECTIONS_REQUIRED_COLUMNS)?;

    let mut by_section: HashMap<String, Vec<Question>> = HashMap::new();
    let mut first_seen: Vec<String> = Vec::new();
    for (_, question) in questions {
        let code = question.section().to_string();
        if !by_section.contains_key(&code) {
            first_seen.push(code.clone());
        }
        by_section.entry(code).or_default().push(question);
    }

    let mut built = EntityMap::new();
    for (line, row) in sections.rows_in_order()? {
        let code = required_cell(sections, line, row, "section_code")?;
        if built.contains_key(&code) {
            return Err(BuildError::duplicate(
                sections.name(),
                format!("section '{}'", code),
            ));
        }

        let members = by_section
            .remove(&code)
            .ok_or_else(|| {
                BuildError::Referential(format!("Section '{}' has no questions", code))
            })?;

        let visibility = resolve_visibility(rules, overrides, &TargetKey::section(&code))
            .map_err(row_error(sections, line))?;

        let section = Section::new(
            code.as_str(),
            required_cell(sections, line, row, "section_label")?,
            members,
            visibility,
        )
        .map_err(row_error(sections, line))?;
        built.insert(code, section);
    }

    if let Some(orphan) = first_seen.iter().find(|code| by_section.contains_key(*code)) {
        return Err(BuildError::Referential(format!(
            "Questions reference undeclared section '{}'",
            orphan
        )));
    }

    Ok(built)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::models::{QuestionKind, TypeDescriptor};
    use serde_json::{json, Value};

    fn question(section: &str, number: &str) -> Question {
        let mut texts = EntityMap::new();
        texts.insert("SYS", "Text".to_string());
        Question::new(
            section,
            number,
            format!("Q_{}_{}", section, number),
            texts,
            TypeDescriptor::new(QuestionKind::Text),
            &[],
            vec![],
        )
        .unwrap()
    }

    fn questions(list: &[(&str, &str)]) -> EntityMap<Question> {
        EntityMap::from_entities(list.iter().map(|(s, n)| question(s, n)))
    }

    fn sections_table(records: Vec<Value>) -> Table {
        Table::from_records("SECTIONS", records)
    }

    fn build(records: Vec<Value>, qs: EntityMap<Question>) -> BuildResult<EntityMap<Section>> {
        build_sections(&sections_table(records), qs, &RuleIndex::new(), &VisibilityOverrides::new())
    }

    #[test]
    fn test_sections_sorted_by_order() {
        let sections = build(
            vec![
                json!({"section_code": "V", "section_label": "Volume", "order": "2"}),
                json!({"section_code": "I", "section_label": "Identity", "order": "1"}),
            ],
            questions(&[("V", "50"), ("I", "10"), ("V", "10")]),
        )
        .unwrap();
        let codes: Vec<&str> = sections.keys().collect();
        assert_eq!(codes, vec!["I", "V"]);
        let refs: Vec<&str> = sections
            .get("V")
            .unwrap()
            .questions()
            .iter()
            .map(Question::reference)
            .collect();
        assert_eq!(refs, vec!["V-50", "V-10"]);
    }

    #[test]
    fn test_section_without_questions_is_referential() {
        let err = build(
            vec![
                json!({"section_code": "V", "section_label": "Volume", "order": 1}),
                json!({"section_code": "W", "section_label": "Empty", "order": 2}),
            ],
            questions(&[("V", "50")]),
        )
        .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Referential);
        assert!(err.to_string().contains("Section 'W' has no questions"));
    }

    #[test]
    fn test_orphan_questions_rejected() {
        let err = build(
            vec![json!({"section_code": "V", "section_label": "Volume", "order": 1})],
            questions(&[("V", "50"), ("X", "1")]),
        )
        .unwrap_err();
        assert!(err.to_string().contains("undeclared section 'X'"));
    }

    #[test]
    fn test_duplicate_section_rejected() {
        let err = build(
            vec![
                json!({"section_code": "V", "section_label": "Volume", "order": 1}),
                json!({"section_code": "V", "section_label": "Again", "order": 2}),
            ],
            questions(&[("V", "50")]),
        )
        .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Duplicate);
    }

    #[test]
    fn test_section_override_visibility() {
        let mut overrides = VisibilityOverrides::new();
        overrides.insert(
            &TargetKey::section("V"),
            crate::rules::parse_visibility("I-10 e [\"YES\"]").rules,
        );
        let sections = build_sections(
            &sections_table(vec![json!({
                "section_code": "V", "section_label": "Volume", "order": 1
            })]),
            questions(&[("V", "50")]),
            &RuleIndex::new(),
            &overrides,
        )
        .unwrap();
        assert_eq!(
            serde_json::to_value(sections.get("V").unwrap()).unwrap()["v"],
            json!([{"r": "I-10", "o": "e", "t": "v", "v": "YES"}])
        );
    }
}
