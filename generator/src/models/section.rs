//! Sections: ordered pages of questions.

use serde::ser::{Serialize, SerializeMap, Serializer};
use std::collections::HashSet;

use super::{Keyed, Question, Rule};
use crate::error::{ModelError, ModelResult};

/// A section identified by an uppercase code.
#[derive(Debug, Clone, PartialEq)]
pub struct Section {
    code: String,
    name: String,
    questions: Vec<Question>,
    visibility: Vec<Rule>,
}

impl Section {
    pub fn new(
        code: impl Into<String>,
        name: impl Into<String>,
        questions: Vec<Question>,
        visibility: Vec<Rule>,
    ) -> ModelResult<Self> {
        let code = code.into();
        let name = name.into();

        if code.trim().is_empty() {
            return Err(ModelError::invalid(
                "Section",
                "code must be a non-empty string",
            ));
        }
        let entity = format!("Section '{}'", code);

        if !is_uppercase_code(&code) {
            return Err(ModelError::invalid(&entity, "code must be uppercase"));
        }
        if name.trim().is_empty() {
            return Err(ModelError::invalid(&entity, "name is required"));
        }
        if questions.is_empty() {
            return Err(ModelError::empty(
                &entity,
                "must contain at least one question",
            ));
        }

        let mut seen = HashSet::new();
        for q in &questions {
            if q.section() != code {
                return Err(ModelError::invalid(
                    &entity,
                    format!("question '{}' belongs to another section", q.reference()),
                ));
            }
            if !seen.insert(q.reference()) {
                return Err(ModelError::Duplicate {
                    entity,
                    what: "question ref".into(),
                    key: q.reference().to_string(),
                });
            }
        }

        Ok(Self {
            code,
            name,
            questions,
            visibility,
        })
    }

    pub fn code(&self) -> &str {
        &self.code
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn questions(&self) -> &[Question] {
        &self.questions
    }

    pub fn visibility(&self) -> &[Rule] {
        &self.visibility
    }
}

/// At least one cased character and no lowercase ones.
fn is_uppercase_code(code: &str) -> bool {
    code.chars().any(char::is_alphabetic) && !code.chars().any(char::is_lowercase)
}

impl Keyed for Section {
    fn key(&self) -> &str {
        &self.code
    }
}

/// One page entry: `{ "<q_num>": question }`.
struct PageEntry<'a>(&'a Question);

impl Serialize for PageEntry<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(1))?;
        map.serialize_entry(self.0.number(), self.0)?;
        map.end()
    }
}

impl Serialize for Section {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let len = if self.visibility.is_empty() { 2 } else { 3 };
        let mut map = serializer.serialize_map(Some(len))?;
        map.serialize_entry("n", &self.name)?;
        let pages: Vec<PageEntry<'_>> = self.questions.iter().map(PageEntry).collect();
        map.serialize_entry("p", &pages)?;
        if !self.visibility.is_empty() {
            map.serialize_entry("v", &self.visibility)?;
        }
        map.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{EntityMap, QuestionKind, TypeDescriptor};
    use serde_json::json;

    fn question(section: &str, number: &str) -> Question {
        let mut texts = EntityMap::new();
        texts.insert("SYS", format!("Question {}", number));
        Question::new(
            section,
            number,
            format!("{}-{}", section, number),
            texts,
            TypeDescriptor::new(QuestionKind::Text),
            &[],
            vec![],
        )
        .unwrap()
    }

    #[test]
    fn test_section_serialization() {
        let questions = vec![question("V", "50"), question("V", "10")];
        let section = Section::new("V", "Volume", questions, vec![]).unwrap();
        let value = serde_json::to_value(&section).unwrap();
        assert_eq!(value["n"], "Volume");
        assert_eq!(value["p"][0]["50"]["label"], "V-50");
        assert_eq!(value["p"][1]["10"]["label"], "V-10");
        assert!(value.get("v").is_none());
        assert_eq!(value["p"][0]["50"]["t"], json!([{"t": "T"}]));
    }

    #[test]
    fn test_empty_section_rejected() {
        let err = Section::new("V", "Volume", vec![], vec![]).unwrap_err();
        assert!(err.to_string().contains("at least one question"));
    }

    #[test]
    fn test_lowercase_code_rejected() {
        assert!(Section::new("v", "Volume", vec![question("v", "1")], vec![]).is_err());
    }

    #[test]
    fn test_duplicate_question_rejected() {
        let questions = vec![question("V", "1"), question("V", "1")];
        let err = Section::new("V", "Volume", questions, vec![]).unwrap_err();
        assert!(matches!(err, ModelError::Duplicate { .. }));
    }

    #[test]
    fn test_foreign_question_rejected() {
        assert!(Section::new("V", "Volume", vec![question("W", "1")], vec![]).is_err());
    }
}
