use super::{required_cell, row_error};
use crate::error::{BuildError, BuildResult};
use crate::models::{Anomaly, EntityMap};
use crate::rules::{resolve_visibility, RuleIndex, TargetKey, VisibilityOverrides};
use crate::table::{cell_integer, Table};

pub const ANOMALIES_REQUIRED_COLUMNS: [&str; 2] = ["anomaly_code", "weight"];

/// Build anomalies in `order` (or row) order. Every anomaly needs at least one rule.
pub fn build_anomalies(
    table: &Table,
    rules: &RuleIndex,
    overrides: &VisibilityOverrides,
) -> BuildResult<EntityMap<Anomaly>> {
    table.require_columns(&ANOMALIES_REQUIRED_COLUMNS)?;

    let mut built = EntityMap::new();
    for (line, row) in table.rows_in_order()? {
        let code = required_cell(table, line, row, "anomaly_code")?;
        if built.contains_key(&code) {
            return Err(BuildError::duplicate(
                table.name(),
                format!("anomaly code '{}'", code),
            ));
        }

        let anomaly_rules = resolve_visibility(rules, overrides, &TargetKey::anomaly(&code))
            .map_err(row_error(table, line))?;
        if anomaly_rules.is_empty() {
            return Err(BuildError::Referential(format!(
                "Anomaly '{}' has no rules defined",
                code
            )));
        }

        let weight = match cell_integer(row, "weight") {
            Some(Ok(w)) => w,
            Some(Err(raw)) => {
                return Err(BuildError::invalid_value(
                    table.name(),
                    line,
                    "weight",
                    format!("'{}' is not an integer", raw),
                ))
            }
            None => {
                return Err(BuildError::invalid_value(
                    table.name(),
                    line,
                    "weight",
                    "value is required",
                ))
            }
        };

        let anomaly =
            Anomaly::new(code.as_str(), weight, anomaly_rules).map_err(row_error(table, line))?;
        built.insert(code, anomaly);
    }
    Ok(built)
}
