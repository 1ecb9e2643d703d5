//! Condition-dict intermediate form.
//!
//! The free-text parser produces these loose dicts (`{r, o, v}` with an
//! optional `t`); [`RuleDict::to_rule`] is the one place they become strict
//! [`Rule`]s.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ModelResult;
use crate::models::{Condition, Rule, ValueType};

/// A condition before validation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConditionDict {
    #[serde(rename = "r")]
    pub reference: String,
    #[serde(rename = "o")]
    pub operator: String,
    /// Absent means "compare with a literal value".
    #[serde(rename = "t", default, skip_serializing_if = "Option::is_none")]
    pub value_type: Option<String>,
    #[serde(rename = "v", default)]
    pub value: Value,
}

impl ConditionDict {
    pub fn new(reference: impl Into<String>, operator: impl Into<String>, value: Value) -> Self {
        Self {
            reference: reference.into(),
            operator: operator.into(),
            value_type: None,
            value,
        }
    }

    pub fn to_condition(&self) -> ModelResult<Condition> {
        let value_type = self
            .value_type
            .as_deref()
            .unwrap_or(ValueType::Value.to_code());
        Condition::new(
            self.reference.as_str(),
            &self.operator,
            value_type,
            self.value.clone(),
        )
    }
}

/// A single condition dict or an OR-group of them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RuleDict {
    AnyOf {
        #[serde(rename = "or")]
        conditions: Vec<ConditionDict>,
    },
    Condition(ConditionDict),
}

impl RuleDict {
    pub fn to_rule(&self) -> ModelResult<Rule> {
        match self {
            Self::Condition(c) => Ok(Rule::single(c.to_condition()?)),
            Self::AnyOf { conditions } => Rule::any_of(
                conditions
                    .iter()
                    .map(ConditionDict::to_condition)
                    .collect::<ModelResult<Vec<_>>>()?,
            ),
        }
    }
}

/// Convert a parsed rule list into validated rules, failing on the first bad one.
pub fn rules_from_dicts(dicts: &[RuleDict]) -> ModelResult<Vec<Rule>> {
    dicts.iter().map(RuleDict::to_rule).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_dict_shape() {
        let dict = RuleDict::Condition(ConditionDict::new("Q-10", "=", json!(1)));
        assert_eq!(serde_json::to_value(&dict).unwrap(), json!({"r": "Q-10", "o": "=", "v": 1}));

        let parsed: RuleDict =
            serde_json::from_value(json!({"or": [{"r": "Q-10", "o": "e", "v": "A"}]})).unwrap();
        assert!(matches!(parsed, RuleDict::AnyOf { ref conditions } if conditions.len() == 1));
    }

    #[test]
    fn test_value_type_defaults_to_literal() {
        let rule = RuleDict::Condition(ConditionDict::new("I-10", "=", json!("YES")))
            .to_rule()
            .unwrap();
        assert_eq!(
            serde_json::to_value(&rule).unwrap(),
            json!({"r": "I-10", "o": "=", "t": "v", "v": "YES"})
        );
    }

    #[test]
    fn test_answer_value_type_kept() {
        let mut dict = ConditionDict::new("I-10", ">", json!("I-20"));
        dict.value_type = Some("a".into());
        let condition = dict.to_condition().unwrap();
        assert_eq!(condition.value_type(), ValueType::Answer);
    }

    #[test]
    fn test_invalid_operator_fails_conversion() {
        let dicts = vec![RuleDict::Condition(ConditionDict::new("I-10", "==", json!(1)))];
        assert!(rules_from_dicts(&dicts).is_err());
    }

    #[test]
    fn test_or_group_conversion() {
        let dict = RuleDict::AnyOf {
            conditions: vec![
                ConditionDict::new("W-10", "e", json!("A")),
                ConditionDict::new("W-10", "e", json!("B")),
            ],
        };
        let rule = dict.to_rule().unwrap();
        assert_eq!(rule.or_conditions().map(|c| c.len()), Some(2));
    }
}
