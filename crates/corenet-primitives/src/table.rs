// Path: crates/corenet-primitives/src/table.rs
//! A keyed lookup table built on the same arena as [`crate::list`], used
//! where callers need O(1) lookup by key in addition to insertion order
//! (the cluster member table and transport registry both want this).

use std::collections::HashMap;
use std::hash::Hash;

use crate::list::{IntrusiveList, NodeId};

/// An insertion-ordered map: iteration follows insertion order like the
/// intrusive list it's built on, while `get`/`remove` are O(1) via an
/// auxiliary key index.
pub struct KeyedTable<K, V> {
    list: IntrusiveList<(K, V)>,
    index: HashMap<K, NodeId>,
}

impl<K, V> Default for KeyedTable<K, V> {
    fn default() -> Self {
        KeyedTable {
            list: IntrusiveList::new(),
            index: HashMap::new(),
        }
    }
}

impl<K: Eq + Hash + Clone, V> KeyedTable<K, V> {
    pub fn new() -> KeyedTable<K, V> {
        KeyedTable::default()
    }

    pub fn len(&self) -> usize {
        self.list.len()
    }

    pub fn is_empty(&self) -> bool {
        self.list.is_empty()
    }

    pub fn contains_key(&self, key: &K) -> bool {
        self.index.contains_key(key)
    }

    pub fn get(&self, key: &K) -> Option<&V> {
        let id = *self.index.get(key)?;
        self.list.get(id).map(|(_, v)| v)
    }

    pub fn get_mut(&mut self, key: &K) -> Option<&mut V> {
        let id = *self.index.get(key)?;
        self.list.get_mut(id).map(|(_, v)| v)
    }

    /// Inserts `value` under `key`, replacing and returning any prior
    /// value in place (preserving its position) rather than moving it to
    /// the end.
    pub fn insert(&mut self, key: K, value: V) -> Option<V> {
        if let Some(id) = self.index.get(&key).copied() {
            let slot = self.list.get_mut(id)?;
            Some(std::mem::replace(&mut slot.1, value))
        } else {
            let id = self.list.append((key.clone(), value));
            self.index.insert(key, id);
            None
        }
    }

    pub fn remove(&mut self, key: &K) -> Option<V> {
        let id = self.index.remove(key)?;
        self.list.unlink(id).map(|(_, v)| v)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&K, &V)> + '_ {
        self.list.iter().map(|(k, v)| (k, v))
    }

    pub fn values(&self) -> impl Iterator<Item = &V> + '_ {
        self.list.iter().map(|(_, v)| v)
    }

    pub fn keys(&self) -> impl Iterator<Item = &K> + '_ {
        self.list.iter().map(|(k, _)| k)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_get_remove() {
        let mut table: KeyedTable<String, i32> = KeyedTable::new();
        table.insert("a".into(), 1);
        table.insert("b".into(), 2);
        assert_eq!(table.get(&"a".to_string()), Some(&1));
        assert_eq!(table.len(), 2);
        assert_eq!(table.remove(&"a".to_string()), Some(1));
        assert!(!table.contains_key(&"a".to_string()));
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn insert_replaces_in_place() {
        let mut table: KeyedTable<&str, i32> = KeyedTable::new();
        table.insert("a", 1);
        table.insert("b", 2);
        table.insert("a", 99);
        assert_eq!(table.keys().copied().collect::<Vec<_>>(), vec!["a", "b"]);
        assert_eq!(table.get(&"a"), Some(&99));
    }

    #[test]
    fn iteration_preserves_insertion_order() {
        let mut table: KeyedTable<i32, &str> = KeyedTable::new();
        table.insert(3, "three");
        table.insert(1, "one");
        table.insert(2, "two");
        let keys: Vec<_> = table.keys().copied().collect();
        assert_eq!(keys, vec![3, 1, 2]);
    }
}
