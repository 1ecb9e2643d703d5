use std::collections::{HashMap, HashSet};

use super::{language_labels, required_cell, row_error};
use crate::error::{BuildError, BuildResult};
use crate::models::{EntityMap, ListItem, SpecList};
use crate::table::{cell_str, Table, SYSTEM_LANGUAGE_COLUMN};

pub const LISTS_REQUIRED_COLUMNS: [&str; 3] = ["list_code", "value", SYSTEM_LANGUAGE_COLUMN];

/// Build option lists.
///
/// Lists appear in the order of their first row; items within a list follow
/// the `order` column. A `parent` must name a value of some list.
pub fn build_lists(table: &Table) -> BuildResult<EntityMap<SpecList>> {
    table.require_columns(&LISTS_REQUIRED_COLUMNS)?;

    let mut list_order: Vec<String> = Vec::new();
    for (line, row) in table.numbered_rows() {
        let code = required_cell(table, line, row, "list_code")?;
        if !list_order.contains(&code) {
            list_order.push(code);
        }
    }

    let mut items: HashMap<String, Vec<ListItem>> = HashMap::new();
    let mut seen: HashSet<(String, String)> = HashSet::new();
    for (line, row) in table.rows_in_order()? {
        let code = required_cell(table, line, row, "list_code")?;
        let value = required_cell(table, line, row, "value")?;
        if !seen.insert((code.clone(), value.clone())) {
            return Err(BuildError::duplicate(
                table.name(),
                format!("value '{}' in list '{}'", value, code),
            ));
        }

        let item = ListItem::new(value, language_labels(table, row), cell_str(row, "parent"))
            .map_err(row_error(table, line))?;
        items.entry(code).or_default().push(item);
    }

    let values: HashSet<&str> = seen.iter().map(|(_, v)| v.as_str()).collect();
    for item in list_order.iter().filter_map(|code| items.get(code)).flatten() {
        if let Some(parent) = item.parent() {
            if !values.contains(parent) {
                return Err(BuildError::Referential(format!(
                    "List item '{}' references unknown parent '{}'",
                    item.value(),
                    parent
                )));
            }
        }
    }

    let mut lists = EntityMap::new();
    for code in list_order {
        let members = items.remove(&code).unwrap_or_default();
        let list = SpecList::new(code.as_str(), members).map_err(BuildError::from)?;
        lists.insert(code, list);
    }
    Ok(lists)
}
