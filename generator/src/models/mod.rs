//! Domain models for the interview spec.
//!
//! - [`Condition`] / [`Rule`] - visibility and trigger rules
//! - [`Question`] - a question with its type descriptor and roles
//! - [`Section`] - an ordered page of questions
//! - [`SpecList`] / [`ListItem`] - answer option lists
//! - [`Anomaly`] - a weighted, rule-triggered scoring anomaly
//! - [`Spec`] - the aggregate document
//!
//! Every entity validates itself in its constructor and is immutable afterwards.

use serde::ser::{Serialize, SerializeMap, Serializer};
use std::collections::HashMap;

pub mod anomaly;
pub mod list;
pub mod question;
pub mod rule;
pub mod section;
pub mod spec;

pub use anomaly::Anomaly;
pub use list::{ListItem, SpecList};
pub use question::{Question, QuestionKind, Role, TypeDescriptor};
pub use rule::{Condition, Operator, Rule, ValueType};
pub use section::Section;
pub use spec::Spec;

/// Entities that carry their own natural identifier.
pub trait Keyed {
    fn key(&self) -> &str;
}

// =============================================================================
// Entity Map
// =============================================================================

/// Insertion-ordered map keyed by string identifiers.
///
/// Serializes as a JSON object whose members follow insertion order, which
/// keeps generated documents deterministic.
#[derive(Debug, Clone, PartialEq)]
pub struct EntityMap<T> {
    entries: Vec<(String, T)>,
    index: HashMap<String, usize>,
}

impl<T> EntityMap<T> {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
            index: HashMap::new(),
        }
    }

    /// Insert a value; an existing key keeps its position and gets the new
    /// value, which is returned as the old one.
    pub fn insert(&mut self, key: impl Into<String>, value: T) -> Option<T> {
        let key = key.into();
        match self.index.get(&key) {
            Some(&pos) => Some(std::mem::replace(&mut self.entries[pos].1, value)),
            None => {
                self.index.insert(key.clone(), self.entries.len());
                self.entries.push((key, value));
                None
            }
        }
    }

    pub fn get(&self, key: &str) -> Option<&T> {
        self.index.get(key).map(|&pos| &self.entries[pos].1)
    }

    pub fn get_mut(&mut self, key: &str) -> Option<&mut T> {
        match self.index.get(key) {
            Some(&pos) => Some(&mut self.entries[pos].1),
            None => None,
        }
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.index.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &T)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    pub fn values(&self) -> impl Iterator<Item = &T> {
        self.entries.iter().map(|(_, v)| v)
    }
}

impl<T> Default for EntityMap<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> IntoIterator for EntityMap<T> {
    type Item = (String, T);
    type IntoIter = std::vec::IntoIter<(String, T)>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

impl<K: Into<String>, T> FromIterator<(K, T)> for EntityMap<T> {
    fn from_iter<I: IntoIterator<Item = (K, T)>>(iter: I) -> Self {
        let mut map = Self::new();
        for (k, v) in iter {
            map.insert(k, v);
        }
        map
    }
}

impl<T: Keyed> EntityMap<T> {
    /// Key every entity by its own identifier.
    pub fn from_entities(entities: impl IntoIterator<Item = T>) -> Self {
        entities
            .into_iter()
            .map(|e| (e.key().to_string(), e))
            .collect()
    }

    /// First entry whose key differs from the entity's identifier.
    pub fn find_key_mismatch(&self) -> Option<(&str, &str)> {
        self.iter()
            .find(|(k, v)| *k != v.key())
            .map(|(k, v)| (k, v.key()))
    }
}

impl<T: Serialize> Serialize for EntityMap<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (k, v) in &self.entries {
            map.serialize_entry(k, v)?;
        }
        map.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insertion_order_preserved() {
        let mut map = EntityMap::new();
        map.insert("W", 1);
        map.insert("A", 2);
        map.insert("M", 3);
        assert_eq!(map.keys().collect::<Vec<_>>(), vec!["W", "A", "M"]);
        assert_eq!(serde_json::to_string(&map).unwrap(), r#"{"W":1,"A":2,"M":3}"#);
    }

    #[test]
    fn test_reinsert_keeps_position() {
        let mut map = EntityMap::new();
        map.insert("a", 1);
        map.insert("b", 2);
        assert_eq!(map.insert("a", 10), Some(1));
        assert_eq!(map.iter().collect::<Vec<_>>(), vec![("a", &10), ("b", &2)]);
        assert_eq!(map.len(), 2);
    }
}
