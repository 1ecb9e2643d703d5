//! Questions and their type descriptors.

use serde::Serialize;
use serde_json::Value;

use super::{EntityMap, Keyed, Rule};
use crate::error::{ModelError, ModelResult};

// =============================================================================
// Question Kind
// =============================================================================

/// Answer kind of a question.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum QuestionKind {
    /// Single choice from a list (O).
    #[serde(rename = "O")]
    OneChoice,
    /// Free text (T).
    #[serde(rename = "T")]
    Text,
    /// Multi-line text (TM).
    #[serde(rename = "TM")]
    TextMultiline,
    /// Numeric (N).
    #[serde(rename = "N")]
    Numeric,
    /// Multiple choice (C).
    #[serde(rename = "C")]
    MultipleChoice,
    /// Integer (I).
    #[serde(rename = "I")]
    Integer,
    /// Automatically computed (A).
    #[serde(rename = "A")]
    Auto,
    /// Note or separator (-).
    #[serde(rename = "-")]
    Note,
}

impl QuestionKind {
    pub fn from_code(code: &str) -> Option<Self> {
        match code.trim() {
            "O" => Some(Self::OneChoice),
            "T" => Some(Self::Text),
            "TM" => Some(Self::TextMultiline),
            "N" => Some(Self::Numeric),
            "C" => Some(Self::MultipleChoice),
            "I" => Some(Self::Integer),
            "A" => Some(Self::Auto),
            "-" => Some(Self::Note),
            _ => None,
        }
    }

    pub fn to_code(&self) -> &'static str {
        match self {
            Self::OneChoice => "O",
            Self::Text => "T",
            Self::TextMultiline => "TM",
            Self::Numeric => "N",
            Self::MultipleChoice => "C",
            Self::Integer => "I",
            Self::Auto => "A",
            Self::Note => "-",
        }
    }
}

// =============================================================================
// Type Descriptor
// =============================================================================

/// The single type entry of a question (`t: [descriptor]` on the wire).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TypeDescriptor {
    #[serde(rename = "t")]
    pub kind: QuestionKind,
    #[serde(rename = "-", skip_serializing_if = "Option::is_none")]
    pub min: Option<Value>,
    #[serde(rename = "+", skip_serializing_if = "Option::is_none")]
    pub max: Option<Value>,
    #[serde(rename = "d", skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub regex: Option<String>,
    /// Code of the list holding the answer options.
    #[serde(rename = "o", skip_serializing_if = "Option::is_none")]
    pub list_code: Option<String>,
    #[serde(rename = "c", skip_serializing_if = "Option::is_none")]
    pub choice_limit: Option<u32>,
    /// Auto-code rule for computed answers.
    #[serde(rename = "i", skip_serializing_if = "Option::is_none")]
    pub auto_code: Option<String>,
}

impl TypeDescriptor {
    pub fn new(kind: QuestionKind) -> Self {
        Self {
            kind,
            min: None,
            max: None,
            default: None,
            regex: None,
            list_code: None,
            choice_limit: None,
            auto_code: None,
        }
    }
}

// =============================================================================
// Role
// =============================================================================

/// Audience tag deciding who sees a question.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Role {
    #[serde(rename = "e")]
    Enumerator,
    #[serde(rename = "b")]
    Backoffice,
    #[serde(rename = "u")]
    User,
    #[serde(rename = "h")]
    Hidden,
}

impl Role {
    pub fn from_code(code: &str) -> Option<Self> {
        match code.trim() {
            "e" => Some(Self::Enumerator),
            "b" => Some(Self::Backoffice),
            "u" => Some(Self::User),
            "h" => Some(Self::Hidden),
            _ => None,
        }
    }
}

// =============================================================================
// Question
// =============================================================================

/// A question identified by `"{section}-{number}"`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Question {
    #[serde(skip)]
    section: String,
    #[serde(skip)]
    number: String,
    #[serde(skip)]
    reference: String,
    #[serde(rename = "n")]
    texts: EntityMap<String>,
    label: String,
    #[serde(rename = "t", serialize_with = "serialize_single_type")]
    qtype: TypeDescriptor,
    #[serde(rename = "o", skip_serializing_if = "Vec::is_empty")]
    roles: Vec<Role>,
    #[serde(rename = "v", skip_serializing_if = "Vec::is_empty")]
    visibility: Vec<Rule>,
}

fn serialize_single_type<S: serde::Serializer>(
    qtype: &TypeDescriptor,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.collect_seq(std::iter::once(qtype))
}

impl Question {
    /// Build a question, rejecting empty identifiers, labels and texts, and
    /// any role code outside `e`, `b`, `u`, `h`.
    pub fn new(
        section: &str,
        number: &str,
        label: impl Into<String>,
        texts: EntityMap<String>,
        qtype: TypeDescriptor,
        roles: &[String],
        visibility: Vec<Rule>,
    ) -> ModelResult<Self> {
        let section = section.trim();
        let number = number.trim();
        if section.is_empty() || number.is_empty() {
            return Err(ModelError::invalid(
                "Question",
                "ref must be a non-empty '<section>-<number>'",
            ));
        }
        let reference = format!("{}-{}", section, number);
        let entity = format!("Question {}", reference);

        let label = label.into();
        if label.trim().is_empty() {
            return Err(ModelError::invalid(&entity, "label is required"));
        }

        if texts.is_empty() {
            return Err(ModelError::empty(
                &entity,
                "texts must contain at least one language",
            ));
        }
        if let Some((lang, _)) = texts.iter().find(|(_, text)| text.trim().is_empty()) {
            return Err(ModelError::invalid(
                &entity,
                format!("empty text for language '{}'", lang),
            ));
        }

        let roles = roles
            .iter()
            .map(|code| {
                Role::from_code(code)
                    .ok_or_else(|| ModelError::invalid(&entity, format!("invalid role '{}'", code)))
            })
            .collect::<ModelResult<Vec<_>>>()?;

        Ok(Self {
            section: section.to_string(),
            number: number.to_string(),
            reference,
            texts,
            label,
            qtype,
            roles,
            visibility,
        })
    }

    pub fn reference(&self) -> &str {
        &self.reference
    }

    pub fn section(&self) -> &str {
        &self.section
    }

    /// Question number within its section; the key used in section pages.
    pub fn number(&self) -> &str {
        &self.number
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn texts(&self) -> &EntityMap<String> {
        &self.texts
    }

    pub fn qtype(&self) -> &TypeDescriptor {
        &self.qtype
    }

    pub fn roles(&self) -> &[Role] {
        &self.roles
    }

    pub fn visibility(&self) -> &[Rule] {
        &self.visibility
    }
}

impl Keyed for Question {
    fn key(&self) -> &str {
        &self.reference
    }
}
