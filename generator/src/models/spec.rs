//! The aggregate spec document and its wire projection.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::ser::{Serialize, SerializeMap, Serializer};
use serde_json::Value;

use super::{Anomaly, EntityMap, Keyed, Section, SpecList};
use crate::error::{ModelError, ModelResult};

static VERSION_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\d+\.\d+\.\d+$").expect("valid regex"));

/// A complete interview spec.
///
/// Construction checks the cross-entity invariants:
/// - at least one section
/// - every map key equals the code of the entity stored under it
/// - every option-list reference of a question resolves to a list
#[derive(Debug, Clone, PartialEq)]
pub struct Spec {
    name: String,
    version: String,
    sections: EntityMap<Section>,
    lists: EntityMap<SpecList>,
    anomalies: EntityMap<Anomaly>,
    notes: Vec<String>,
}

impl Spec {
    pub fn new(
        name: impl Into<String>,
        version: impl Into<String>,
        sections: EntityMap<Section>,
        lists: EntityMap<SpecList>,
        anomalies: EntityMap<Anomaly>,
        notes: Vec<String>,
    ) -> ModelResult<Self> {
        let name = name.into();
        let version = version.into();

        if name.trim().is_empty() {
            return Err(ModelError::invalid("Spec", "name must be a non-empty string"));
        }
        if !VERSION_PATTERN.is_match(&version) {
            return Err(ModelError::invalid(
                "Spec",
                format!("version '{}' must look like MAJOR.MINOR.PATCH", version),
            ));
        }
        if sections.is_empty() {
            return Err(ModelError::empty(
                "Spec",
                "must contain at least one section",
            ));
        }

        check_keys("Section", &sections)?;
        check_keys("List", &lists)?;
        check_keys("Anomaly", &anomalies)?;

        for section in sections.values() {
            for question in section.questions() {
                if let Some(code) = &question.qtype().list_code {
                    if !lists.contains_key(code) {
                        return Err(ModelError::invalid(
                            format!("Question {}", question.reference()),
                            format!("references unknown list '{}'", code),
                        ));
                    }
                }
            }
        }

        Ok(Self {
            name,
            version,
            sections,
            lists,
            anomalies,
            notes,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn sections(&self) -> &EntityMap<Section> {
        &self.sections
    }

    pub fn lists(&self) -> &EntityMap<SpecList> {
        &self.lists
    }

    pub fn anomalies(&self) -> &EntityMap<Anomaly> {
        &self.anomalies
    }

    pub fn notes(&self) -> &[String] {
        &self.notes
    }

    /// Project the spec onto its wire document.
    pub fn to_value(&self) -> serde_json::Result<Value> {
        serde_json::to_value(self)
    }

    pub fn to_json(&self, pretty: bool) -> serde_json::Result<String> {
        if pretty {
            serde_json::to_string_pretty(self)
        } else {
            serde_json::to_string(self)
        }
    }
}

fn check_keys<T: Keyed>(what: &str, map: &EntityMap<T>) -> ModelResult<()> {
    match map.find_key_mismatch() {
        Some((key, code)) => Err(ModelError::invalid(
            "Spec",
            format!("{} code mismatch: key '{}' != code '{}'", what, key, code),
        )),
        None => Ok(()),
    }
}

impl Serialize for Spec {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(None)?;
        map.serialize_entry("n", &self.name)?;
        map.serialize_entry("v", &self.version)?;
        map.serialize_entry("s", &self.sections)?;
        if !self.lists.is_empty() {
            map.serialize_entry("l", &self.lists)?;
        }
        if !self.anomalies.is_empty() {
            map.serialize_entry("a", &self.anomalies)?;
        }
        if !self.notes.is_empty() {
            map.serialize_entry("notes", &self.notes)?;
        }
        map.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Condition, ListItem, Question, QuestionKind, Rule, TypeDescriptor};
    use serde_json::json;

    fn section(code: &str, list_code: Option<&str>) -> Section {
        let mut texts = EntityMap::new();
        texts.insert("SYS", "Text".to_string());
        let mut qtype = TypeDescriptor::new(QuestionKind::OneChoice);
        qtype.list_code = list_code.map(String::from);
        let q = Question::new(code, "10", "label", texts, qtype, &[], vec![]).unwrap();
        Section::new(code, "Name", vec![q], vec![]).unwrap()
    }

    fn list(code: &str) -> SpecList {
        let mut labels = EntityMap::new();
        labels.insert("SYS", "Yes".to_string());
        SpecList::new(code, vec![ListItem::new("Y", labels, None).unwrap()]).unwrap()
    }

    #[test]
    fn test_minimal_spec_omits_empty_collections() {
        let spec = Spec::new(
            "Spec",
            "2.0.0",
            EntityMap::from_entities([section("V", None)]),
            EntityMap::new(),
            EntityMap::new(),
            vec![],
        )
        .unwrap();
        let value = spec.to_value().unwrap();
        assert_eq!(value["n"], "Spec");
        assert_eq!(value["v"], "2.0.0");
        assert!(value.get("l").is_none());
        assert!(value.get("a").is_none());
        assert!(value.get("notes").is_none());
    }

    #[test]
    fn test_key_mismatch_rejected() {
        let mut sections = EntityMap::new();
        sections.insert("W", section("V", None));
        let err = Spec::new("Spec", "2.0.0", sections, EntityMap::new(), EntityMap::new(), vec![])
            .unwrap_err();
        assert!(err.to_string().contains("key 'W' != code 'V'"));
    }

    #[test]
    fn test_sections_required() {
        let empty = Spec::new(
            "Spec",
            "2.0.0",
            EntityMap::new(),
            EntityMap::new(),
            EntityMap::new(),
            vec![],
        );
        assert!(empty.is_err());
    }

    #[test]
    fn test_version_format() {
        let sections = EntityMap::from_entities([section("V", None)]);
        let bad_version =
            Spec::new("Spec", "v2", sections, EntityMap::new(), EntityMap::new(), vec![]);
        assert!(bad_version.is_err());
    }

    #[test]
    fn test_list_reference_must_resolve() {
        let sections = EntityMap::from_entities([section("V", Some("LST-YES-NO"))]);
        let err = Spec::new(
            "Spec",
            "2.0.0",
            sections.clone(),
            EntityMap::new(),
            EntityMap::new(),
            vec![],
        )
        .unwrap_err();
        assert!(err.to_string().contains("unknown list 'LST-YES-NO'"));

        let lists = EntityMap::from_entities([list("LST-YES-NO")]);
        assert!(Spec::new("Spec", "2.0.0", sections, lists, EntityMap::new(), vec![]).is_ok());
    }

    #[test]
    fn test_document_key_order() {
        let rule = Rule::single(Condition::new("I-10", "=", "v", json!("YES")).unwrap());
        let spec = Spec::new(
            "Spec",
            "2.0.0",
            EntityMap::from_entities([section("W", None), section("A", None)]),
            EntityMap::from_entities([list("LST-B")]),
            EntityMap::from_entities([Anomaly::new("ANO-A1", 5, vec![rule]).unwrap()]),
            vec!["generated".into()],
        )
        .unwrap();
        let json = spec.to_json(false).unwrap();
        let n = json.find("\"n\"").unwrap();
        let s = json.find("\"s\"").unwrap();
        let w = json.find("\"W\"").unwrap();
        let a = json.find("\"A\"").unwrap();
        let notes = json.find("\"notes\"").unwrap();
        assert!(n < s && s < w && w < a && a < notes);
    }
}
