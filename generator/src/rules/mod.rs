//! Visibility rule construction.
//!
//! Two producers feed the same [`Rule`] model:
//!
//! - [`builder`] - the flat `VISIBILITY_RULES` table, indexed by target
//! - [`visibility`] - free-text expressions, parsed leniently into [`RuleDict`]s
//!
//! Builders resolve an entity's rules with [`resolve_visibility`]: a free-text
//! override for the target replaces whatever the table defines.

use std::fmt;

use crate::error::ModelResult;
use crate::models::{EntityMap, Rule};

pub mod builder;
pub mod dict;
pub mod visibility;

pub use builder::build_rules;
pub use dict::{rules_from_dicts, ConditionDict, RuleDict};
pub use visibility::{parse_visibility, parse_visibility_rule, ParseOutcome};

// =============================================================================
// Target keys
// =============================================================================

/// Kind of entity a rule is attached to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TargetType {
    Question,
    Section,
    Anomaly,
}

impl TargetType {
    pub fn from_code(code: &str) -> Option<Self> {
        match code.trim() {
            "question" => Some(Self::Question),
            "section" => Some(Self::Section),
            "anomaly" => Some(Self::Anomaly),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Question => "question",
            Self::Section => "section",
            Self::Anomaly => "anomaly",
        }
    }
}

/// `"<target_type>:<target_ref>"`, e.g. `question:V-50`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TargetKey {
    pub target_type: TargetType,
    pub reference: String,
}

impl TargetKey {
    pub fn new(target_type: TargetType, reference: impl Into<String>) -> Self {
        Self {
            target_type,
            reference: reference.into(),
        }
    }

    pub fn question(reference: impl Into<String>) -> Self {
        Self::new(TargetType::Question, reference)
    }

    pub fn section(code: impl Into<String>) -> Self {
        Self::new(TargetType::Section, code)
    }

    pub fn anomaly(code: impl Into<String>) -> Self {
        Self::new(TargetType::Anomaly, code)
    }
}

impl fmt::Display for TargetKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.target_type.as_str(), self.reference)
    }
}

// =============================================================================
// Rule index and overrides
// =============================================================================

/// Rules of the flat table, keyed by target key string.
pub type RuleIndex = EntityMap<Vec<Rule>>;

/// Parsed free-text rules per target; an entry replaces the table's rules.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VisibilityOverrides {
    entries: EntityMap<Vec<RuleDict>>,
}

impl VisibilityOverrides {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an override; an empty rule list records nothing.
    pub fn insert(&mut self, key: &TargetKey, rules: Vec<RuleDict>) {
        if !rules.is_empty() {
            self.entries.insert(key.to_string(), rules);
        }
    }

    pub fn get(&self, key: &TargetKey) -> Option<&[RuleDict]> {
        self.entries.get(&key.to_string()).map(Vec::as_slice)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Rules for `key`: the override when present, the indexed rules otherwise.
pub fn resolve_visibility(
    index: &RuleIndex,
    overrides: &VisibilityOverrides,
    key: &TargetKey,
) -> ModelResult<Vec<Rule>> {
    match overrides.get(key) {
        Some(dicts) => rules_from_dicts(dicts),
        None => Ok(index.get(&key.to_string()).cloned().unwrap_or_default()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Condition;
    use serde_json::json;

    #[test]
    fn test_target_key_format() {
        assert_eq!(TargetKey::question("V-50").to_string(), "question:V-50");
        assert_eq!(TargetKey::section("W").to_string(), "section:W");
        assert_eq!(TargetKey::anomaly("ANO-A1").to_string(), "anomaly:ANO-A1");
        assert_eq!(TargetType::from_code("page"), None);
    }

    #[test]
    fn test_override_replaces_table_rules() {
        let mut index = RuleIndex::new();
        index.insert(
            "question:V-50",
            vec![Rule::single(Condition::new("I-10", "=", "v", json!("YES")).unwrap())],
        );
        let key = TargetKey::question("V-50");

        let table_only = resolve_visibility(&index, &VisibilityOverrides::new(), &key).unwrap();
        assert_eq!(table_only.len(), 1);

        let mut overrides = VisibilityOverrides::new();
        overrides.insert(&key, parse_visibility("Q-10 = 1 and Q-20 = 2").rules);
        let replaced = resolve_visibility(&index, &overrides, &key).unwrap();
        assert_eq!(
            serde_json::to_value(&replaced).unwrap(),
            json!([
                {"r": "Q-10", "o": "=", "t": "v", "v": 1},
                {"r": "Q-20", "o": "=", "t": "v", "v": 2}
            ])
        );
    }

    #[test]
    fn test_empty_override_is_not_recorded() {
        let mut overrides = VisibilityOverrides::new();
        overrides.insert(&TargetKey::section("W"), vec![]);
        assert!(overrides.is_empty());
    }

    #[test]
    fn test_unknown_target_has_no_rules() {
        let rules = resolve_visibility(
            &RuleIndex::new(),
            &VisibilityOverrides::new(),
            &TargetKey::anomaly("ANO-X"),
        )
        .unwrap();
        assert!(rules.is_empty());
    }
}
