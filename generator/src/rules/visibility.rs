//! Free-text visibility expressions.
//!
//! Accepted forms, per condition:
//!
//! ```text
//! W-10 e-or ["A", "B"]     one OR-group, one member per value
//! W-10 =-and ["A", "B"]    one sibling condition per value
//! W-10 e ["A"]             a single condition
//! W-10 ! ["A", "B"]        an OR-group (no explicit logic)
//! I-40 = "CO-1"            scalar comparison: =, !, <, >, <=, >=
//! ```
//!
//! Conditions combine at the top level with ` or ` (one OR-group) or
//! ` and ` (separate entries, AND-ed by the consumer). Parsing never fails:
//! fragments that cannot be read are dropped, and the ones that look like a
//! reference produce a warning.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use serde_json::{Number, Value};

use super::dict::{ConditionDict, RuleDict};
use crate::logs::log_warning;

static LOGIC_LIST: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^([A-Z]+-\d+)\s+([!=e])-(or|and)\s+\[(.+)\]$").expect("valid regex")
});
static PLAIN_LIST: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^([A-Z]+-\d+)\s+([!=e])\s+\[(.+)\]$").expect("valid regex"));
static SCALAR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^([A-Z]+-\d+)\s*([!=<>]+)\s*(.+)$").expect("valid regex"));
static REFERENCE_PREFIX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Z]+-\d+").expect("valid regex"));

const SCALAR_OPERATORS: [&str; 6] = ["=", "!", "<", ">", "<=", ">="];

/// Rules read from one expression plus the non-fatal problems met on the way.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ParseOutcome {
    pub rules: Vec<RuleDict>,
    pub warnings: Vec<String>,
}

/// One parsed fragment. `AllOf` only lives inside this module: it is
/// flattened into sibling entries before anything is returned.
#[derive(Debug)]
enum Fragment {
    Single(ConditionDict),
    AnyOf(Vec<ConditionDict>),
    AllOf(Vec<ConditionDict>),
}

/// Parse an expression, collecting warnings instead of logging them.
pub fn parse_visibility(text: &str) -> ParseOutcome {
    let mut outcome = ParseOutcome::default();
    let text = text.trim();
    if text.is_empty() || text.eq_ignore_ascii_case("nan") {
        return outcome;
    }

    if text.contains(" or ") {
        let mut group = Vec::new();
        for part in text.split(" or ").map(str::trim) {
            if part.contains(" and ") {
                outcome
                    .warnings
                    .push(format!("Cannot mix 'and' inside an 'or' expression: {}", part));
                continue;
            }
            match parse_fragment(part, &mut outcome.warnings) {
                Some(Fragment::Single(c)) => group.push(c),
                Some(Fragment::AnyOf(cs)) => group.extend(cs),
                Some(Fragment::AllOf(_)) => outcome
                    .warnings
                    .push(format!("Cannot use an '-and' list inside an 'or' expression: {}", part)),
                None => {}
            }
        }
        if !group.is_empty() {
            outcome.rules.push(RuleDict::AnyOf { conditions: group });
        }
    } else if text.contains(" and ") {
        for part in text.split(" and ").map(str::trim) {
            push_fragment(&mut outcome, part);
        }
    } else {
        push_fragment(&mut outcome, text);
    }

    outcome
}

/// Parse an expression and log every warning. Returns no rules when nothing
/// could be read.
pub fn parse_visibility_rule(text: &str) -> Vec<RuleDict> {
    let outcome = parse_visibility(text);
    for warning in &outcome.warnings {
        log_warning(warning.as_str());
    }
    outcome.rules
}

fn push_fragment(outcome: &mut ParseOutcome, part: &str) {
    match parse_fragment(part, &mut outcome.warnings) {
        Some(Fragment::Single(c)) => outcome.rules.push(RuleDict::Condition(c)),
        Some(Fragment::AnyOf(conditions)) => outcome.rules.push(RuleDict::AnyOf { conditions }),
        Some(Fragment::AllOf(cs)) => outcome
            .rules
            .extend(cs.into_iter().map(RuleDict::Condition)),
        None => {}
    }
}

fn parse_fragment(fragment: &str, warnings: &mut Vec<String>) -> Option<Fragment> {
    let fragment = fragment.trim();

    if let Some(caps) = LOGIC_LIST.captures(fragment) {
        let conditions = expand(&caps[1], &caps[2], &caps[4]);
        if conditions.is_empty() {
            warnings.push(format!("Empty value list in condition: {}", fragment));
            return None;
        }
        return Some(match &caps[3] {
            "or" => Fragment::AnyOf(conditions),
            _ => Fragment::AllOf(conditions),
        });
    }

    if let Some(caps) = PLAIN_LIST.captures(fragment) {
        let mut conditions = expand(&caps[1], &caps[2], &caps[3]);
        return match conditions.len() {
            0 => {
                warnings.push(format!("Empty value list in condition: {}", fragment));
                None
            }
            1 => conditions.pop().map(Fragment::Single),
            _ => Some(Fragment::AnyOf(conditions)),
        };
    }

    if let Some(caps) = SCALAR.captures(fragment) {
        let operator = &caps[2];
        if !SCALAR_OPERATORS.contains(&operator) {
            warnings.push(format!(
                "Unknown operator '{}' in condition: {}",
                operator, fragment
            ));
            return None;
        }
        return Some(Fragment::Single(ConditionDict::new(
            &caps[1],
            operator,
            parse_scalar(&caps[3]),
        )));
    }

    if fragment.chars().all(|c| c.is_ascii_digit()) || fragment.chars().count() < 3 {
        return None;
    }
    if REFERENCE_PREFIX.is_match(fragment) {
        warnings.push(format!("Could not parse condition: {}", fragment));
    }
    None
}

fn expand(reference: &str, operator: &str, values: &str) -> Vec<ConditionDict> {
    parse_list_values(values)
        .into_iter()
        .map(|v| ConditionDict::new(reference, operator, Value::String(v)))
        .collect()
}

/// Comma-separated values with surrounding quotes removed; list values stay strings.
fn parse_list_values(values: &str) -> Vec<String> {
    values
        .split(',')
        .map(|part| part.trim().trim_matches('"').trim_matches('\''))
        .filter(|part| !part.is_empty())
        .map(String::from)
        .collect()
}

/// Quoted text stays a string; otherwise integer, then finite float, then string.
fn parse_scalar(raw: &str) -> Value {
    let raw = raw.trim();
    let quoted = raw.len() >= 2
        && ((raw.starts_with('"') && raw.ends_with('"'))
            || (raw.starts_with('\'') && raw.ends_with('\'')));
    if quoted {
        return Value::String(raw[1..raw.len() - 1].to_string());
    }
    if let Ok(i) = raw.parse::<i64>() {
        return Value::from(i);
    }
    if let Some(n) = raw.parse::<f64>().ok().and_then(Number::from_f64) {
        return Value::Number(n);
    }
    Value::String(raw.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn parse(text: &str) -> Value {
        serde_json::to_value(parse_visibility(text).rules).unwrap()
    }

    #[test]
    fn test_scalar_condition() {
        assert_eq!(parse("Q-10 = 1"), json!([{"r": "Q-10", "o": "=", "v": 1}]));
        assert_eq!(parse("I-40 = \"CO-1\""), json!([{"r": "I-40", "o": "=", "v": "CO-1"}]));
        assert_eq!(parse("I-60 >= 2.5"), json!([{"r": "I-60", "o": ">=", "v": 2.5}]));
        assert_eq!(parse("I-80 = Yes"), json!([{"r": "I-80", "o": "=", "v": "Yes"}]));
        assert_eq!(parse("I-60>1000"), json!([{"r": "I-60", "o": ">", "v": 1000}]));
    }

    #[test]
    fn test_logic_lists() {
        assert_eq!(
            parse("Q-10 e-or [\"A\",\"B\"]"),
            json!([{"or": [
                {"r": "Q-10", "o": "e", "v": "A"},
                {"r": "Q-10", "o": "e", "v": "B"}
            ]}])
        );
        assert_eq!(
            parse("Q-10 e-and [\"A\",\"B\"]"),
            json!([
                {"r": "Q-10", "o": "e", "v": "A"},
                {"r": "Q-10", "o": "e", "v": "B"}
            ])
        );
    }

    #[test]
    fn test_plain_lists() {
        assert_eq!(parse("W-10 e [\"WCU-1\"]"), json!([{"r": "W-10", "o": "e", "v": "WCU-1"}]));
        assert_eq!(
            parse("W-10 ! ['A', 'B']"),
            json!([{"or": [
                {"r": "W-10", "o": "!", "v": "A"},
                {"r": "W-10", "o": "!", "v": "B"}
            ]}])
        );
    }

    #[test]
    fn test_top_level_or_merges_groups() {
        assert_eq!(
            parse("A-1 = 1 or B-2 e-or [\"X\", \"Y\"]"),
            json!([{"or": [
                {"r": "A-1", "o": "=", "v": 1},
                {"r": "B-2", "o": "e", "v": "X"},
                {"r": "B-2", "o": "e", "v": "Y"}
            ]}])
        );
    }

    #[test]
    fn test_top_level_and_flattens() {
        assert_eq!(
            parse("A-1 = 1 and B-2 =-and [\"X\", \"Y\"] and C-3 e-or [\"Z\", \"W\"]"),
            json!([
                {"r": "A-1", "o": "=", "v": 1},
                {"r": "B-2", "o": "=", "v": "X"},
                {"r": "B-2", "o": "=", "v": "Y"},
                {"or": [
                    {"r": "C-3", "o": "e", "v": "Z"},
                    {"r": "C-3", "o": "e", "v": "W"}
                ]}
            ])
        );
    }

    #[test]
    fn test_and_list_inside_or_is_dropped_with_warning() {
        let outcome = parse_visibility("A-1 e-and [\"X\", \"Y\"] or B-2 = 2");
        assert_eq!(
            serde_json::to_value(&outcome.rules).unwrap(),
            json!([{"or": [{"r": "B-2", "o": "=", "v": 2}]}])
        );
        assert_eq!(outcome.warnings.len(), 1);
    }

    #[test]
    fn test_empty_input() {
        assert!(parse_visibility("").rules.is_empty());
        assert!(parse_visibility("   ").rules.is_empty());
        assert!(parse_visibility("nan").rules.is_empty());
    }

    #[test]
    fn test_unrecognized_fragments() {
        let outcome = parse_visibility("Q-10 ~ something");
        assert!(outcome.rules.is_empty());
        assert_eq!(outcome.warnings, vec!["Could not parse condition: Q-10 ~ something"]);

        let silent = parse_visibility("42");
        assert!(silent.rules.is_empty());
        assert!(silent.warnings.is_empty());

        let prose = parse_visibility("shown when relevant");
        assert!(prose.rules.is_empty());
        assert!(prose.warnings.is_empty());
    }

    #[test]
    fn test_unknown_scalar_operator_dropped() {
        let outcome = parse_visibility("Q-10 == 1 and Q-20 = 2");
        assert_eq!(
            serde_json::to_value(&outcome.rules).unwrap(),
            json!([{"r": "Q-20", "o": "=", "v": 2}])
        );
        assert_eq!(outcome.warnings.len(), 1);
    }

    #[test]
    fn test_output_converts_to_rules() {
        let dicts = parse_visibility_rule("Q-10 e-or [\"A\",\"B\"]");
        let rules = crate::rules::rules_from_dicts(&dicts).unwrap();
        assert_eq!(rules.len(), 1);
        assert_eq!(rules[0].or_conditions().map(|c| c.len()), Some(2));
    }
}
