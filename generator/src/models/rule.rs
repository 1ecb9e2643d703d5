//! Visibility rules: atomic conditions and OR-groups.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

use crate::error::{ModelError, ModelResult};

// =============================================================================
// Operator
// =============================================================================

/// Comparison applied by a [`Condition`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Operator {
    #[serde(rename = "=")]
    Equals,
    #[serde(rename = "!")]
    NotEquals,
    #[serde(rename = ">")]
    Greater,
    #[serde(rename = "<")]
    Less,
    #[serde(rename = ">=")]
    GreaterOrEqual,
    #[serde(rename = "<=")]
    LessOrEqual,
    #[serde(rename = "e")]
    Exists,
    #[serde(rename = "!e")]
    NotExists,
}

impl Operator {
    pub const ALL: [Operator; 8] = [
        Self::Equals,
        Self::NotEquals,
        Self::Greater,
        Self::Less,
        Self::GreaterOrEqual,
        Self::LessOrEqual,
        Self::Exists,
        Self::NotExists,
    ];

    /// Parse the wire code (`=`, `!`, `>`, `<`, `>=`, `<=`, `e`, `!e`).
    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "=" => Some(Self::Equals),
            "!" => Some(Self::NotEquals),
            ">" => Some(Self::Greater),
            "<" => Some(Self::Less),
            ">=" => Some(Self::GreaterOrEqual),
            "<=" => Some(Self::LessOrEqual),
            "e" => Some(Self::Exists),
            "!e" => Some(Self::NotExists),
            _ => None,
        }
    }

    pub fn to_code(&self) -> &'static str {
        match self {
            Self::Equals => "=",
            Self::NotEquals => "!",
            Self::Greater => ">",
            Self::Less => "<",
            Self::GreaterOrEqual => ">=",
            Self::LessOrEqual => "<=",
            Self::Exists => "e",
            Self::NotExists => "!e",
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.to_code())
    }
}

// =============================================================================
// Value Type
// =============================================================================

/// Whether a condition's value is a literal or another entity's answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ValueType {
    /// Literal value (`v`).
    #[serde(rename = "v")]
    Value,
    /// Answer of another entity (`a`).
    #[serde(rename = "a")]
    Answer,
}

impl ValueType {
    pub const ALL: [ValueType; 2] = [Self::Value, Self::Answer];

    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "v" => Some(Self::Value),
            "a" => Some(Self::Answer),
            _ => None,
        }
    }

    pub fn to_code(&self) -> &'static str {
        match self {
            Self::Value => "v",
            Self::Answer => "a",
        }
    }
}

// =============================================================================
// Condition
// =============================================================================

/// Atomic comparison between a referenced entity and a value.
///
/// Serializes to `{"r", "o", "t", "v"}`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Condition {
    #[serde(rename = "r")]
    reference: String,
    #[serde(rename = "o")]
    operator: Operator,
    #[serde(rename = "t")]
    value_type: ValueType,
    #[serde(rename = "v")]
    value: Value,
}

impl Condition {
    /// Build a condition from its wire codes, failing on any code outside
    /// the enumerated sets.
    pub fn new(
        reference: impl Into<String>,
        operator: &str,
        value_type: &str,
        value: Value,
    ) -> ModelResult<Self> {
        let reference = reference.into();
        if reference.trim().is_empty() {
            return Err(ModelError::invalid(
                "Rule condition",
                "'ref' must be a non-empty string",
            ));
        }
        let entity = format!("Rule condition '{}'", reference);

        let operator = Operator::from_code(operator).ok_or_else(|| {
            ModelError::invalid(&entity, format!("invalid operator '{}'", operator))
        })?;
        let value_type = ValueType::from_code(value_type).ok_or_else(|| {
            ModelError::invalid(&entity, format!("invalid value type '{}'", value_type))
        })?;

        if value.is_array() || value.is_object() {
            return Err(ModelError::invalid(&entity, "value must be a scalar"));
        }

        Ok(Self {
            reference,
            operator,
            value_type,
            value,
        })
    }

    pub fn reference(&self) -> &str {
        &self.reference
    }

    pub fn operator(&self) -> Operator {
        self.operator
    }

    pub fn value_type(&self) -> ValueType {
        self.value_type
    }

    pub fn value(&self) -> &Value {
        &self.value
    }
}

// =============================================================================
// Rule
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
enum RuleKind {
    Single(Condition),
    AnyOf {
        #[serde(rename = "or")]
        conditions: Vec<Condition>,
    },
}

/// A single condition or a non-empty OR-group of conditions.
///
/// Rules attached to the same target are AND-combined by the consumer.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Rule {
    kind: RuleKind,
}

impl Rule {
    /// Build a rule from exactly one of `condition` or `or_conditions`.
    pub fn new(
        condition: Option<Condition>,
        or_conditions: Option<Vec<Condition>>,
    ) -> ModelResult<Self> {
        match (condition, or_conditions) {
            (Some(_), Some(_)) => Err(ModelError::invalid(
                "Rule",
                "cannot have both 'condition' and 'or_conditions'",
            )),
            (None, None) => Err(ModelError::invalid(
                "Rule",
                "must have either 'condition' or 'or_conditions'",
            )),
            (Some(condition), None) => Ok(Self::single(condition)),
            (None, Some(conditions)) => Self::any_of(conditions),
        }
    }

    pub fn single(condition: Condition) -> Self {
        Self {
            kind: RuleKind::Single(condition),
        }
    }

    pub fn any_of(conditions: Vec<Condition>) -> ModelResult<Self> {
        if conditions.is_empty() {
            return Err(ModelError::empty(
                "Rule",
                "OR rule must contain at least one condition",
            ));
        }
        Ok(Self {
            kind: RuleKind::AnyOf { conditions },
        })
    }

    /// The single condition, if this is not an OR-group.
    pub fn condition(&self) -> Option<&Condition> {
        match &self.kind {
            RuleKind::Single(c) => Some(c),
            RuleKind::AnyOf { .. } => None,
        }
    }

    /// The OR-group members, if this is an OR-group.
    pub fn or_conditions(&self) -> Option<&[Condition]> {
        match &self.kind {
            RuleKind::Single(_) => None,
            RuleKind::AnyOf { conditions } => Some(conditions),
        }
    }

    /// Every condition referenced by this rule, in order.
    pub fn conditions(&self) -> impl Iterator<Item = &Condition> {
        let slice: &[Condition] = match &self.kind {
            RuleKind::Single(c) => std::slice::from_ref(c),
            RuleKind::AnyOf { conditions } => conditions,
        };
        slice.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn cond(reference: &str, value: Value) -> Condition {
        Condition::new(reference, "=", "v", value).unwrap()
    }

    #[test]
    fn test_all_enumerated_pairs_construct() {
        for op in Operator::ALL {
            for vt in ValueType::ALL {
                let c = Condition::new("I-10", op.to_code(), vt.to_code(), json!("YES"));
                assert!(c.is_ok(), "{} / {}", op, vt.to_code());
            }
        }
    }

    #[test]
    fn test_out_of_set_codes_fail() {
        for op in ["==", "<>", "E", "", "not"] {
            assert!(Condition::new("I-10", op, "v", json!(1)).is_err(), "{}", op);
        }
        for vt in ["", "V", "x", "answer"] {
            assert!(Condition::new("I-10", "=", vt, json!(1)).is_err(), "{}", vt);
        }
    }

    #[test]
    fn test_empty_reference_fails() {
        assert!(Condition::new("  ", "=", "v", json!(1)).is_err());
    }

    #[test]
    fn test_non_scalar_value_fails() {
        assert!(Condition::new("I-10", "=", "v", json!(["A"])).is_err());
    }

    #[test]
    fn test_rule_requires_exactly_one_shape() {
        let c = cond("I-10", json!("A"));
        assert!(Rule::new(None, None).is_err());
        assert!(Rule::new(Some(c.clone()), Some(vec![c.clone()])).is_err());
        assert!(Rule::new(None, Some(vec![])).is_err());

        let single = Rule::new(Some(c.clone()), None).unwrap();
        assert!(single.condition().is_some());
        assert!(single.or_conditions().is_none());

        let group = Rule::new(None, Some(vec![c.clone(), c])).unwrap();
        assert!(group.condition().is_none());
        assert_eq!(group.or_conditions().unwrap().len(), 2);
    }

    #[test]
    fn test_condition_serialization() {
        let rule = Rule::single(cond("I-10", json!("YES")));
        assert_eq!(
            serde_json::to_value(&rule).unwrap(),
            json!({"r": "I-10", "o": "=", "t": "v", "v": "YES"})
        );
    }

    #[test]
    fn test_or_rule_serialization_keeps_order() {
        let rule = Rule::any_of(vec![cond("W-10", json!("B")), cond("W-10", json!("A"))]).unwrap();
        assert_eq!(
            serde_json::to_value(&rule).unwrap(),
            json!({"or": [
                {"r": "W-10", "o": "=", "t": "v", "v": "B"},
                {"r": "W-10", "o": "=", "t": "v", "v": "A"}
            ]})
        );
    }
}
