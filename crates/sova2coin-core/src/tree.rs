//! Hierarchical metadata trees addressed by dotted keys.
//!
//! A [`MetaTree`] is an insertion-ordered map from keys to [`MetaValue`]s.
//! Trees are combined with [`merge`] (right-biased deep merge) and turned
//! into [`FlatMap`]s with [`MetaTree::flatten`]. The reverse direction,
//! rebuilding a tree from dotted keys, is [`unflatten`].

use indexmap::IndexMap;
use indexmap::map::{IntoIter, Iter};
use serde::{Deserialize, Serialize, Serializer};

use crate::error::CoreError;
use crate::flat::FlatMap;
use crate::value::MetaValue;

/// Separator between the segments of a dotted key.
pub const KEY_SEPARATOR: char = '.';

/// A mapping from keys to scalar values or nested trees.
///
/// Keys are single path segments: they are never empty and never contain
/// [`KEY_SEPARATOR`], so each flattened key names exactly one leaf.
/// Deserialization and [`MetaTree::try_insert`] enforce this.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(try_from = "IndexMap<String, MetaValue>")]
pub struct MetaTree(IndexMap<String, MetaValue>);

impl MetaTree {
    /// Create an empty tree.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a tree from a list, keyed by stringified index.
    pub fn from_list(items: &[MetaValue]) -> Self {
        items
            .iter()
            .enumerate()
            .map(|(i, item)| (i.to_string(), item.clone()))
            .collect()
    }

    /// Wrap a leaf value in the chain of single-key trees named by `key`.
    ///
    /// `from_dotted("sidecar.SamplingFrequency", v)` yields
    /// `{sidecar: {SamplingFrequency: v}}`.
    pub fn from_dotted(key: &str, value: impl Into<MetaValue>) -> Result<Self, CoreError> {
        let segments: Vec<&str> = key.split(KEY_SEPARATOR).collect();
        if segments.iter().any(|s| s.is_empty()) {
            return Err(CoreError::invalid_key(key));
        }

        let mut value = value.into();
        for segment in segments.iter().skip(1).rev() {
            let mut wrapper = MetaTree::new();
            wrapper.insert(*segment, value);
            value = MetaValue::Tree(wrapper);
        }

        let mut tree = MetaTree::new();
        tree.insert(segments[0], value);
        Ok(tree)
    }

    /// Number of direct children.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Check if the tree has no children.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Get a direct child.
    pub fn get(&self, key: &str) -> Option<&MetaValue> {
        self.0.get(key)
    }

    /// Get a direct child mutably.
    pub fn get_mut(&mut self, key: &str) -> Option<&mut MetaValue> {
        self.0.get_mut(key)
    }

    /// Check if a direct child exists.
    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    /// Insert a direct child under a validated key.
    pub fn try_insert(
        &mut self,
        key: impl Into<String>,
        value: impl Into<MetaValue>,
    ) -> Result<Option<MetaValue>, CoreError> {
        let key = key.into();
        check_segment(&key)?;
        Ok(self.0.insert(key, value.into()))
    }

    /// Insert a direct child, returning the previous value.
    ///
    /// The key is not checked; use [`MetaTree::try_insert`] for keys that
    /// come from outside the crate.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<MetaValue>) -> Option<MetaValue> {
        self.0.insert(key.into(), value.into())
    }

    /// Remove a direct child, keeping the order of the others.
    pub fn remove(&mut self, key: &str) -> Option<MetaValue> {
        self.0.shift_remove(key)
    }

    /// Iterate over direct children in insertion order.
    pub fn iter(&self) -> Iter<'_, String, MetaValue> {
        self.0.iter()
    }

    /// Iterate over the keys of direct children.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    /// Look up a value by dotted path.
    pub fn get_path(&self, key: &str) -> Option<&MetaValue> {
        let mut segments = key.split(KEY_SEPARATOR);
        let mut current = self.get(segments.next()?)?;
        for segment in segments {
            current = match current {
                MetaValue::Tree(tree) => tree.get(segment)?,
                MetaValue::List(items) => items.get(segment.parse::<usize>().ok()?)?,
                _ => return None,
            };
        }
        Some(current)
    }

    /// Get a direct child that is itself a tree.
    pub fn subtree(&self, key: &str) -> Option<&MetaTree> {
        self.get(key).and_then(MetaValue::as_tree)
    }

    /// Deep-merge `other` on top of `self`, returning a new tree.
    ///
    /// Where both sides hold a tree the merge recurses; any other collision
    /// takes the value from `other`. Neither input is modified.
    pub fn merge(&self, other: &MetaTree) -> MetaTree {
        let mut merged = self.clone();
        merged.absorb(other.clone());
        merged
    }

    /// In-place, consuming variant of [`MetaTree::merge`].
    fn absorb(&mut self, other: MetaTree) {
        for (key, theirs) in other.0 {
            match theirs {
                MetaValue::Tree(theirs) => {
                    if let Some(MetaValue::Tree(ours)) = self.0.get_mut(&key) {
                        ours.absorb(theirs);
                    } else {
                        self.0.insert(key, MetaValue::Tree(theirs));
                    }
                }
                theirs => {
                    self.0.insert(key, theirs);
                }
            }
        }
    }

    /// Flatten into one entry per root-to-leaf path.
    pub fn flatten(&self) -> FlatMap {
        let mut flat = FlatMap::new();
        for (key, value) in self.iter() {
            flatten_into(key, value, &mut flat);
        }
        flat
    }

    /// Length of the longest root-to-leaf path.
    pub fn depth(&self) -> usize {
        self.iter()
            .map(|(_, value)| match value {
                MetaValue::Tree(tree) => 1 + tree.depth(),
                MetaValue::List(items) => 1 + MetaTree::from_list(items).depth(),
                _ => 1,
            })
            .max()
            .unwrap_or(0)
    }
}

fn check_segment(key: &str) -> Result<(), CoreError> {
    if key.is_empty() || key.contains(KEY_SEPARATOR) {
        return Err(CoreError::invalid_key(key));
    }
    Ok(())
}

fn flatten_into(prefix: &str, value: &MetaValue, flat: &mut FlatMap) {
    match value {
        MetaValue::Tree(tree) => {
            for (key, child) in tree.iter() {
                flatten_into(&format!("{prefix}{KEY_SEPARATOR}{key}"), child, flat);
            }
        }
        MetaValue::List(items) => {
            for (index, child) in items.iter().enumerate() {
                flatten_into(&format!("{prefix}{KEY_SEPARATOR}{index}"), child, flat);
            }
        }
        leaf => {
            flat.insert(prefix, leaf.clone());
        }
    }
}

/// Deep-merge two trees; `b` wins on scalar conflicts.
pub fn merge(a: &MetaTree, b: &MetaTree) -> MetaTree {
    a.merge(b)
}

/// Merge a sequence of trees left to right; later scalars win.
pub fn merge_all<I>(trees: I) -> MetaTree
where
    I: IntoIterator<Item = MetaTree>,
{
    let mut merged = MetaTree::new();
    for tree in trees {
        merged.absorb(tree);
    }
    merged
}

/// Rebuild a tree from a flat attribute map.
///
/// Every dotted key becomes its chain of single-key trees; the chains are
/// then combined with [`merge_all`].
pub fn unflatten(flat: &FlatMap) -> Result<MetaTree, CoreError> {
    let chains = flat
        .iter()
        .map(|(key, value)| MetaTree::from_dotted(key, value.clone()))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(merge_all(chains))
}

impl TryFrom<IndexMap<String, MetaValue>> for MetaTree {
    type Error = CoreError;

    fn try_from(map: IndexMap<String, MetaValue>) -> Result<Self, Self::Error> {
        for key in map.keys() {
            check_segment(key)?;
        }
        Ok(Self(map))
    }
}

impl Serialize for MetaTree {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.0.serialize(serializer)
    }
}

impl FromIterator<(String, MetaValue)> for MetaTree {
    fn from_iter<T: IntoIterator<Item = (String, MetaValue)>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl IntoIterator for MetaTree {
    type Item = (String, MetaValue);
    type IntoIter = IntoIter<String, MetaValue>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a> IntoIterator for &'a MetaTree {
    type Item = (&'a String, &'a MetaValue);
    type IntoIter = Iter<'a, String, MetaValue>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}
