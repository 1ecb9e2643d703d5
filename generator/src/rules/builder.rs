//! Flat-table rule builder.
//!
//! Each `VISIBILITY_RULES` row holds one condition for one target. Rows of a
//! target without an `or_group` tag become one rule each; rows sharing a tag
//! become a single OR-rule placed where the group's first row appears.

use std::collections::HashMap;

use super::{RuleIndex, TargetKey, TargetType};
use crate::error::{BuildError, BuildResult};
use crate::logs::log_debug;
use crate::models::{Condition, EntityMap, Rule};
use crate::table::{cell_str, cell_value, Row, Table};

/// Columns every rule table must carry.
pub const REQUIRED_COLUMNS: [&str; 6] = [
    "target_type",
    "target_ref",
    "r_ref",
    "operator",
    "value_type",
    "value",
];

/// Optional column grouping rows of one target into an OR-rule.
pub const OR_GROUP_COLUMN: &str = "or_group";

enum Slot {
    Single(Condition),
    Group(Vec<Condition>),
}

#[derive(Default)]
struct TargetRules {
    slots: Vec<Slot>,
    groups: HashMap<String, usize>,
}

impl TargetRules {
    fn push(&mut self, group: Option<String>, condition: Condition) {
        match group {
            None => self.slots.push(Slot::Single(condition)),
            Some(tag) => match self.groups.get(&tag) {
                Some(&pos) => {
                    if let Slot::Group(members) = &mut self.slots[pos] {
                        members.push(condition);
                    }
                }
                None => {
                    self.groups.insert(tag, self.slots.len());
                    self.slots.push(Slot::Group(vec![condition]));
                }
            },
        }
    }

    fn into_rules(self) -> BuildResult<Vec<Rule>> {
        self.slots
            .into_iter()
            .map(|slot| match slot {
                Slot::Single(c) => Ok(Rule::single(c)),
                Slot::Group(members) => Rule::any_of(members)
                    .map_err(|e| BuildError::Referential(e.to_string())),
            })
            .collect()
    }
}

/// Build `target → [Rule]` from the flat rule table.
///
/// Targets keep the order of their first row.
pub fn build_rules(table: &Table) -> BuildResult<RuleIndex> {
    table.require_columns(&REQUIRED_COLUMNS)?;
    let grouped = table.has_column(OR_GROUP_COLUMN);

    let mut targets: EntityMap<TargetRules> = EntityMap::new();
    for (line, row) in table.numbered_rows() {
        let key = target_key(table, line, row)?;
        let condition = build_condition(table, line, row)?;
        let group = if grouped {
            cell_str(row, OR_GROUP_COLUMN)
        } else {
            None
        };

        let name = key.to_string();
        if !targets.contains_key(&name) {
            targets.insert(name.clone(), TargetRules::default());
        }
        if let Some(rules) = targets.get_mut(&name) {
            rules.push(group, condition);
        }
    }

    let mut index = RuleIndex::new();
    for (key, rules) in targets {
        index.insert(key, rules.into_rules()?);
    }
    log_debug(format!(
        "Built rules for {} targets from {} rows",
        index.len(),
        table.len()
    ));
    Ok(index)
}

fn target_key(table: &Table, line: usize, row: &Row) -> BuildResult<TargetKey> {
    let raw_type = cell_str(row, "target_type").ok_or_else(|| {
        BuildError::invalid_value(table.name(), line, "target_type", "value is required")
    })?;
    let target_type = TargetType::from_code(&raw_type).ok_or_else(|| {
        BuildError::invalid_value(
            table.name(),
            line,
            "target_type",
            format!(
                "invalid target type '{}' (expected question, section or anomaly)",
                raw_type
            ),
        )
    })?;
    let reference = cell_str(row, "target_ref").ok_or_else(|| {
        BuildError::invalid_value(table.name(), line, "target_ref", "value is required")
    })?;
    Ok(TargetKey::new(target_type, reference))
}

fn build_condition(table: &Table, line: usize, row: &Row) -> BuildResult<Condition> {
    Condition::new(
        cell_str(row, "r_ref").unwrap_or_default(),
        &cell_str(row, "operator").unwrap_or_default(),
        &cell_str(row, "value_type").unwrap_or_default(),
        cell_value(row, "value").unwrap_or(serde_json::Value::Null),
    )
    .map_err(|source| BuildError::InvalidRow {
        table: table.name().to_string(),
        row: line,
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};

    fn rule_table(records: Vec<Value>) -> Table {
        Table::from_records("VISIBILITY_RULES", records)
    }

    fn row(target: &str, r_ref: &str, value: &str, group: &str) -> Value {
        let (target_type, target_ref) = target.split_once(':').unwrap();
        json!({
            "target_type": target_type,
            "target_ref": target_ref,
            "r_ref": r_ref,
            "operator": "=",
            "value_type": "v",
            "value": value,
            "or_group": group,
        })
    }

    fn rules_json(index: &RuleIndex, key: &str) -> Value {
        serde_json::to_value(index.get(key).unwrap()).unwrap()
    }

    #[test]
    fn test_ungrouped_rows_one_rule_each() {
        let index = build_rules(&rule_table(vec![
            row("question:V-50", "I-10", "YES", ""),
            row("question:V-50", "I-20", "NO", ""),
        ]))
        .unwrap();
        assert_eq!(
            rules_json(&index, "question:V-50"),
            json!([
                {"r": "I-10", "o": "=", "t": "v", "v": "YES"},
                {"r": "I-20", "o": "=", "t": "v", "v": "NO"}
            ])
        );
    }

    #[test]
    fn test_grouped_rows_form_one_or_rule() {
        let index = build_rules(&rule_table(vec![
            row("section:W", "I-10", "A", "g1"),
            row("section:W", "I-30", "C", ""),
            row("section:W", "I-20", "B", "g1"),
        ]))
        .unwrap();
        assert_eq!(
            rules_json(&index, "section:W"),
            json!([
                {"or": [
                    {"r": "I-10", "o": "=", "t": "v", "v": "A"},
                    {"r": "I-20", "o": "=", "t": "v", "v": "B"}
                ]},
                {"r": "I-30", "o": "=", "t": "v", "v": "C"}
            ])
        );
    }

    #[test]
    fn test_targets_keep_first_row_order() {
        let index = build_rules(&rule_table(vec![
            row("question:Z-1", "I-10", "A", ""),
            row("anomaly:ANO-A1", "I-10", "A", ""),
            row("question:A-1", "I-10", "A", ""),
        ]))
        .unwrap();
        let keys: Vec<&str> = index.keys().collect();
        assert_eq!(keys, vec!["question:Z-1", "anomaly:ANO-A1", "question:A-1"]);
    }

    #[test]
    fn test_missing_columns() {
        let err = build_rules(&rule_table(vec![json!({"target_type": "question"})])).unwrap_err();
        assert!(matches!(err, BuildError::MissingColumns { .. }));
    }

    #[test]
    fn test_invalid_operator_names_row() {
        let mut bad = row("question:V-50", "I-10", "YES", "");
        bad["operator"] = json!("==");
        let err = build_rules(&rule_table(vec![row("question:V-50", "I-10", "YES", ""), bad]))
            .unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("row 3"), "{}", msg);
        assert!(msg.contains("invalid operator '=='"), "{}", msg);
    }

    #[test]
    fn test_invalid_target_type() {
        let mut bad = row("question:V-50", "I-10", "YES", "");
        bad["target_type"] = json!("page");
        let err = build_rules(&rule_table(vec![bad])).unwrap_err();
        assert!(err.to_string().contains("invalid target type 'page'"));
    }

    #[test]
    fn test_typed_values_pass_through() {
        let index = build_rules(&rule_table(vec![json!({
            "target_type": "anomaly",
            "target_ref": "ANO-A1",
            "r_ref": "I-60",
            "operator": ">",
            "value_type": "v",
            "value": 1000
        })]))
        .unwrap();
        assert_eq!(rules_json(&index, "anomaly:ANO-A1")[0]["v"], json!(1000));
    }
}
