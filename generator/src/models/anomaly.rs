use serde::Serialize;

use super::{Keyed, Rule};
use crate::error::{ModelError, ModelResult};

/// A weighted anomaly, triggered when all of its rules hold.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Anomaly {
    #[serde(skip)]
    code: String,
    #[serde(rename = "w")]
    weight: i64,
    #[serde(rename = "r")]
    rules: Vec<Rule>,
}

impl Anomaly {
    pub fn new(code: impl Into<String>, weight: i64, rules: Vec<Rule>) -> ModelResult<Self> {
        let code = code.into();
        if code.trim().is_empty() {
            return Err(ModelError::invalid(
                "Anomaly",
                "code must be a non-empty string",
            ));
        }
        let entity = format!("Anomaly '{}'", code);
        if weight <= 0 {
            return Err(ModelError::invalid(&entity, "weight must be greater than 0"));
        }
        if rules.is_empty() {
            return Err(ModelError::empty(&entity, "must contain at least one rule"));
        }
        Ok(Self {
            code,
            weight,
            rules,
        })
    }

    pub fn code(&self) -> &str {
        &self.code
    }

    pub fn weight(&self) -> i64 {
        self.weight
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }
}

impl Keyed for Anomaly {
    fn key(&self) -> &str {
        &self.code
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Condition;
    use serde_json::json;

    fn rule() -> Rule {
        Rule::single(Condition::new("I-10", "=", "v", json!("YES")).unwrap())
    }

    #[test]
    fn test_anomaly_serialization() {
        let anomaly = Anomaly::new("ANO-A1", 10, vec![rule()]).unwrap();
        assert_eq!(
            serde_json::to_value(&anomaly).unwrap(),
            json!({"w": 10, "r": [{"r": "I-10", "o": "=", "t": "v", "v": "YES"}]})
        );
    }

    #[test]
    fn test_weight_must_be_positive() {
        assert!(Anomaly::new("ANO-A1", 0, vec![rule()]).is_err());
        assert!(Anomaly::new("ANO-A1", -3, vec![rule()]).is_err());
    }

    #[test]
    fn test_rules_required() {
        let err = Anomaly::new("ANO-A1", 10, vec![]).unwrap_err();
        assert!(err.to_string().contains("at least one rule"));
    }
}
