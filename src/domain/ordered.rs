//! Ordered association list
//!
//! The declaration's document table is order-significant: layout is read
//! off it and reordering rewrites it. `OrderedMap` keeps entries in an
//! explicit `Vec` and exposes positional operations (`insert_at`,
//! `move_range`, `arrange`) instead of relying on a hash map's insertion
//! order.

use std::fmt;
use std::marker::PhantomData;
use std::ops::Range;

use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderedMap<K, V> {
    entries: Vec<(K, V)>,
}

impl<K, V> Default for OrderedMap<K, V> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
        }
    }
}

impl<K: PartialEq, V> OrderedMap<K, V> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&K, &V)> {
        self.entries.iter().map(|(k, v)| (k, v))
    }

    pub fn keys(&self) -> impl Iterator<Item = &K> {
        self.entries.iter().map(|(k, _)| k)
    }

    pub fn values(&self) -> impl Iterator<Item = &V> {
        self.entries.iter().map(|(_, v)| v)
    }

    pub fn values_mut(&mut self) -> impl Iterator<Item = &mut V> {
        self.entries.iter_mut().map(|(_, v)| v)
    }

    /// Position of `key`, if present
    pub fn position<Q>(&self, key: &Q) -> Option<usize>
    where
        K: PartialEq<Q>,
        Q: ?Sized,
    {
        self.entries.iter().position(|(k, _)| k == key)
    }

    pub fn contains_key<Q>(&self, key: &Q) -> bool
    where
        K: PartialEq<Q>,
        Q: ?Sized,
    {
        self.position(key).is_some()
    }

    pub fn get<Q>(&self, key: &Q) -> Option<&V>
    where
        K: PartialEq<Q>,
        Q: ?Sized,
    {
        self.position(key).map(|idx| &self.entries[idx].1)
    }

    pub fn get_mut<Q>(&mut self, key: &Q) -> Option<&mut V>
    where
        K: PartialEq<Q>,
        Q: ?Sized,
    {
        self.position(key).map(move |idx| &mut self.entries[idx].1)
    }

    /// Entry at a position
    pub fn get_index(&self, index: usize) -> Option<(&K, &V)> {
        self.entries.get(index).map(|(k, v)| (k, v))
    }

    /// Appends a new entry, or replaces the value in place when the key
    /// already exists. Returns the previous value.
    pub fn insert(&mut self, key: K, value: V) -> Option<V> {
        match self.position(&key) {
            Some(idx) => Some(std::mem::replace(&mut self.entries[idx].1, value)),
            None => {
                self.entries.push((key, value));
                None
            }
        }
    }

    /// Inserts an entry at `index` (clamped to the length). An existing
    /// entry with the same key is removed first.
    pub fn insert_at(&mut self, index: usize, key: K, value: V) -> Option<V> {
        let previous = self.remove(&key);
        let index = index.min(self.entries.len());
        self.entries.insert(index, (key, value));
        previous
    }

    /// Removes an entry, shifting later entries down
    pub fn remove<Q>(&mut self, key: &Q) -> Option<V>
    where
        K: PartialEq<Q>,
        Q: ?Sized,
    {
        self.position(key).map(|idx| self.entries.remove(idx).1)
    }

    /// Replaces the key of an entry without moving it. Fails (returns
    /// `false`) when `old` is missing or `new` is already taken.
    pub fn rename_key<Q>(&mut self, old: &Q, new: K) -> bool
    where
        K: PartialEq<Q>,
        Q: ?Sized,
    {
        if self.contains_key(&new) {
            return false;
        }
        match self.position(old) {
            Some(idx) => {
                self.entries[idx].0 = new;
                true
            }
            None => false,
        }
    }

    /// Moves the entries in `range` so that the block starts at `to`,
    /// where `to` is an index into the sequence with the block removed.
    pub fn move_range(&mut self, range: Range<usize>, to: usize) {
        if range.start >= range.end || range.end > self.entries.len() {
            return;
        }
        let block: Vec<(K, V)> = self.entries.drain(range).collect();
        let to = to.min(self.entries.len());
        let tail = self.entries.split_off(to);
        self.entries.extend(block);
        self.entries.extend(tail);
    }

    /// Rearranges entries to follow `keys`, which must name every existing
    /// key exactly once. Returns `false` (leaving the map unchanged)
    /// otherwise.
    pub fn arrange(&mut self, keys: &[K]) -> bool {
        if keys.len() != self.entries.len() {
            return false;
        }
        for (i, key) in keys.iter().enumerate() {
            if keys[..i].contains(key) || !self.contains_key(key) {
                return false;
            }
        }
        for (target, key) in keys.iter().enumerate() {
            if let Some(current) = self.position(key) {
                self.move_range(current..current + 1, target);
            }
        }
        true
    }
}

impl<K, V> IntoIterator for OrderedMap<K, V> {
    type Item = (K, V);
    type IntoIter = std::vec::IntoIter<(K, V)>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

impl<K: PartialEq, V> FromIterator<(K, V)> for OrderedMap<K, V> {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut map = Self::new();
        for (k, v) in iter {
            map.insert(k, v);
        }
        map
    }
}

impl<K: Serialize, V: Serialize> Serialize for OrderedMap<K, V> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (k, v) in &self.entries {
            map.serialize_entry(k, v)?;
        }
        map.end()
    }
}

struct OrderedMapVisitor<K, V>(PhantomData<(K, V)>);

impl<'de, K, V> Visitor<'de> for OrderedMapVisitor<K, V>
where
    K: Deserialize<'de> + PartialEq + fmt::Display,
    V: Deserialize<'de>,
{
    type Value = OrderedMap<K, V>;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("a mapping")
    }

    fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
        let mut map = OrderedMap::new();
        while let Some((key, value)) = access.next_entry::<K, V>()? {
            if map.contains_key(&key) {
                return Err(serde::de::Error::custom(format!("duplicate key `{}`", key)));
            }
            map.entries.push((key, value));
        }
        Ok(map)
    }
}

impl<'de, K, V> Deserialize<'de> for OrderedMap<K, V>
where
    K: Deserialize<'de> + PartialEq + fmt::Display,
    V: Deserialize<'de>,
{
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_map(OrderedMapVisitor(PhantomData))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> OrderedMap<String, u32> {
        ["a", "b", "c", "d"]
            .iter()
            .enumerate()
            .map(|(i, k)| (k.to_string(), i as u32))
            .collect()
    }

    fn keys(map: &OrderedMap<String, u32>) -> Vec<&str> {
        map.keys().map(String::as_str).collect()
    }

    #[test]
    fn insert_keeps_position_of_existing_key() {
        let mut map = sample();
        assert_eq!(map.insert("b".to_string(), 10), Some(1));
        assert_eq!(keys(&map), vec!["a", "b", "c", "d"]);
        assert_eq!(map.get("b"), Some(&10));
    }

    #[test]
    fn insert_at_places_entry() {
        let mut map = sample();
        map.insert_at(1, "x".to_string(), 9);
        assert_eq!(keys(&map), vec!["a", "x", "b", "c", "d"]);

        map.insert_at(100, "y".to_string(), 9);
        assert_eq!(keys(&map).last(), Some(&"y"));
    }

    #[test]
    fn rename_key_in_place() {
        let mut map = sample();
        assert!(map.rename_key("c", "z".to_string()));
        assert_eq!(keys(&map), vec!["a", "b", "z", "d"]);
        assert!(!map.rename_key("a", "b".to_string()));
        assert!(!map.rename_key("missing", "q".to_string()));
    }

    #[test]
    fn move_range_forward_and_back() {
        let mut map = sample();
        map.move_range(0..2, 2);
        assert_eq!(keys(&map), vec!["c", "d", "a", "b"]);

        map.move_range(3..4, 0);
        assert_eq!(keys(&map), vec!["b", "c", "d", "a"]);
    }

    #[test]
    fn arrange_requires_exact_key_set() {
        let mut map = sample();
        let order: Vec<String> = ["d", "b", "a", "c"].iter().map(|s| s.to_string()).collect();
        assert!(map.arrange(&order));
        assert_eq!(keys(&map), vec!["d", "b", "a", "c"]);
        assert_eq!(map.get("d"), Some(&3));

        let dup: Vec<String> = ["d", "d", "a", "c"].iter().map(|s| s.to_string()).collect();
        assert!(!map.arrange(&dup));
        assert_eq!(keys(&map), vec!["d", "b", "a", "c"]);
    }

    #[test]
    fn yaml_round_trip_keeps_order() {
        let yaml = "zeta: 1\nalpha: 2\nmid: 3\n";
        let map: OrderedMap<String, u32> = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(keys(&map), vec!["zeta", "alpha", "mid"]);
        assert_eq!(serde_yaml::to_string(&map).unwrap(), yaml);
    }
}
