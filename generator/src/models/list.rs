//! Answer option lists.

use serde::{Serialize, Serializer};
use std::collections::HashSet;

use super::{EntityMap, Keyed};
use crate::error::{ModelError, ModelResult};

/// Every list code starts with this prefix.
pub const LIST_CODE_PREFIX: &str = "LST-";

/// One option of a list.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ListItem {
    #[serde(rename = "v")]
    value: String,
    #[serde(rename = "n")]
    labels: EntityMap<String>,
    /// Value of the parent item in a hierarchical list.
    #[serde(rename = "p", skip_serializing_if = "Option::is_none")]
    parent: Option<String>,
}

impl ListItem {
    pub fn new(
        value: impl Into<String>,
        labels: EntityMap<String>,
        parent: Option<String>,
    ) -> ModelResult<Self> {
        let value = value.into();
        if value.trim().is_empty() {
            return Err(ModelError::invalid(
                "ListItem",
                "value must be a non-empty string",
            ));
        }
        let entity = format!("ListItem '{}'", value);
        if labels.is_empty() {
            return Err(ModelError::empty(&entity, "labels must be a non-empty map"));
        }
        if labels.values().any(|text| text.trim().is_empty()) {
            return Err(ModelError::invalid(&entity, "invalid label format"));
        }
        Ok(Self {
            value,
            labels,
            parent,
        })
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    pub fn labels(&self) -> &EntityMap<String> {
        &self.labels
    }

    pub fn parent(&self) -> Option<&str> {
        self.parent.as_deref()
    }
}

/// A list of distinct-valued items, serialized as a plain array.
#[derive(Debug, Clone, PartialEq)]
pub struct SpecList {
    code: String,
    items: Vec<ListItem>,
}

impl SpecList {
    pub fn new(code: impl Into<String>, items: Vec<ListItem>) -> ModelResult<Self> {
        let code = code.into();
        if code.trim().is_empty() {
            return Err(ModelError::invalid("List", "code must be a non-empty string"));
        }
        let entity = format!("List '{}'", code);
        if !code.starts_with(LIST_CODE_PREFIX) {
            return Err(ModelError::invalid(
                &entity,
                format!("code must start with '{}'", LIST_CODE_PREFIX),
            ));
        }
        if items.is_empty() {
            return Err(ModelError::empty(&entity, "must contain at least one item"));
        }

        let mut seen = HashSet::new();
        for item in &items {
            if !seen.insert(item.value()) {
                return Err(ModelError::Duplicate {
                    entity,
                    what: "value".into(),
                    key: item.value().to_string(),
                });
            }
        }

        Ok(Self { code, items })
    }

    pub fn code(&self) -> &str {
        &self.code
    }

    pub fn items(&self) -> &[ListItem] {
        &self.items
    }
}

impl Keyed for SpecList {
    fn key(&self) -> &str {
        &self.code
    }
}

impl Serialize for SpecList {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(&self.items)
    }
}
