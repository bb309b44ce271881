//! Flat attribute maps keyed by dotted paths.

use indexmap::IndexMap;
use indexmap::map::{IntoIter, Iter};
use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::tree::{self, KEY_SEPARATOR, MetaTree};
use crate::value::MetaValue;

/// A mapping from dotted paths (e.g. `sidecar.SamplingFrequency`) to leaf values.
///
/// Produced by [`MetaTree::flatten`]; bidsmap runs store their attributes in
/// this shape.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FlatMap(IndexMap<String, MetaValue>);

impl FlatMap {
    /// Create an empty map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Check if there are no entries.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Get the value stored under a dotted key.
    pub fn get(&self, key: &str) -> Option<&MetaValue> {
        self.0.get(key)
    }

    /// Get the value under a dotted key, or the not-applicable sentinel.
    pub fn lookup(&self, key: &str) -> MetaValue {
        self.get(key).cloned().unwrap_or_default()
    }

    /// Check if a dotted key is present.
    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    /// Insert a value, returning the previous one.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<MetaValue>) -> Option<MetaValue> {
        self.0.insert(key.into(), value.into())
    }

    /// Remove an entry, keeping the order of the others.
    pub fn remove(&mut self, key: &str) -> Option<MetaValue> {
        self.0.shift_remove(key)
    }

    /// Overlay `other` on top of this map; its values win on collision.
    pub fn overlay(&mut self, other: FlatMap) {
        self.0.extend(other.0);
    }

    /// Iterate over entries in insertion order.
    pub fn iter(&self) -> Iter<'_, String, MetaValue> {
        self.0.iter()
    }

    /// Iterate over the dotted keys.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    /// Entries whose key lies under `namespace`, with the namespace stripped.
    pub fn namespace(&self, namespace: &str) -> FlatMap {
        let prefix = format!("{namespace}{KEY_SEPARATOR}");
        self.iter()
            .filter_map(|(key, value)| {
                key.strip_prefix(&prefix)
                    .map(|rest| (rest.to_string(), value.clone()))
            })
            .collect()
    }

    /// Rebuild the metadata tree these entries describe.
    pub fn unflatten(&self) -> Result<MetaTree, CoreError> {
        tree::unflatten(self)
    }
}

impl FromIterator<(String, MetaValue)> for FlatMap {
    fn from_iter<T: IntoIterator<Item = (String, MetaValue)>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl IntoIterator for FlatMap {
    type Item = (String, MetaValue);
    type IntoIter = IntoIter<String, MetaValue>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a> IntoIterator for &'a FlatMap {
    type Item = (&'a String, &'a MetaValue);
    type IntoIter = Iter<'a, String, MetaValue>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_defaults_to_sentinel() {
        let flat = FlatMap::new();
        assert!(flat.lookup("sidecar.PowerLineFrequency").is_not_applicable());
    }

    #[test]
    fn test_overlay_other_wins() {
        let mut base = FlatMap::new();
        base.insert("entities.subject", "A");
        base.insert("sidecar.SamplingFrequency", 500.0);

        let mut top = FlatMap::new();
        top.insert("entities.subject", "B");
        base.overlay(top);

        assert_eq!(base.lookup("entities.subject"), MetaValue::from("B"));
        assert_eq!(base.lookup("sidecar.SamplingFrequency"), MetaValue::Float(500.0));
        assert_eq!(base.len(), 2);
    }

    #[test]
    fn test_namespace() {
        let mut flat = FlatMap::new();
        flat.insert("entities.subject", "01");
        flat.insert("entities.task", "rest");
        flat.insert("sidecar.SamplingFrequency", 500.0);

        let entities = flat.namespace("entities");
        assert_eq!(entities.len(), 2);
        assert_eq!(entities.lookup("task"), MetaValue::from("rest"));
    }

    #[test]
    fn test_yaml_shape() {
        let yaml = "sidecar.SamplingFrequency: 2500.0\nsidecar.PowerLineFrequency: n/a\n";
        let flat: FlatMap = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(flat.lookup("sidecar.SamplingFrequency"), MetaValue::Float(2500.0));
        assert!(flat.get("sidecar.PowerLineFrequency").unwrap().is_not_applicable());
    }
}
