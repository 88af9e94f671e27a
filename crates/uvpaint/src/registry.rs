//! Generational storage with stable insertion-order iteration
//!
//! Handles come from a `SlotMap`, so removed entries invalidate their keys.
//! Slot reuse would reorder a plain slotmap walk, so the registration order
//! is tracked separately and iteration follows it.

use std::fmt;

use slotmap::{Key, SlotMap};

pub struct Registry<K: Key, T> {
    slots: SlotMap<K, T>,
    order: Vec<K>,
}

impl<K: Key, T> Registry<K, T> {
    pub fn new() -> Self {
        Self {
            slots: SlotMap::with_key(),
            order: Vec::new(),
        }
    }

    /// Insert at the end of the iteration order
    pub fn insert(&mut self, value: T) -> K {
        let key = self.slots.insert(value);
        self.order.push(key);
        key
    }

    /// Remove an entry. Stale keys return `None`.
    pub fn remove(&mut self, key: K) -> Option<T> {
        let value = self.slots.remove(key)?;
        self.order.retain(|k| *k != key);
        Some(value)
    }

    pub fn get(&self, key: K) -> Option<&T> {
        self.slots.get(key)
    }

    pub fn get_mut(&mut self, key: K) -> Option<&mut T> {
        self.slots.get_mut(key)
    }

    pub fn contains(&self, key: K) -> bool {
        self.slots.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Iterate in insertion order
    pub fn iter(&self) -> impl Iterator<Item = (K, &T)> + '_ {
        self.order
            .iter()
            .filter_map(|&key| self.slots.get(key).map(|value| (key, value)))
    }

    /// Keys in insertion order, detached from the borrow so callers can
    /// mutate entries while walking them
    pub fn ids(&self) -> Vec<K> {
        self.order.clone()
    }

    /// Mutable walk in slot order
    pub fn values_mut(&mut self) -> impl Iterator<Item = &mut T> {
        self.slots.values_mut()
    }
}

impl<K: Key, T> Default for Registry<K, T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Key, T> fmt::Debug for Registry<K, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry")
            .field("len", &self.slots.len())
            .field("capacity", &self.slots.capacity())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ModelId;

    #[test]
    fn test_insertion_order_survives_reuse() {
        let mut registry: Registry<ModelId, &str> = Registry::new();
        let a = registry.insert("a");
        let b = registry.insert("b");
        let _c = registry.insert("c");

        registry.remove(a);
        // Recycles the first slot but must iterate last
        registry.insert("d");

        let order: Vec<_> = registry.iter().map(|(_, v)| *v).collect();
        assert_eq!(order, vec!["b", "c", "d"]);
        assert_eq!(registry.len(), 3);
        assert_eq!(registry.get(b), Some(&"b"));
    }

    #[test]
    fn test_stale_key_rejected() {
        let mut registry: Registry<ModelId, u32> = Registry::new();
        let a = registry.insert(1);
        assert_eq!(registry.remove(a), Some(1));
        let b = registry.insert(2);
        assert!(registry.get(a).is_none());
        assert!(registry.remove(a).is_none());
        assert_eq!(registry.get(b), Some(&2));
    }

    #[test]
    fn test_remove_middle_and_tail() {
        let mut registry: Registry<ModelId, u32> = Registry::new();
        let ids: Vec<_> = (0..4).map(|i| registry.insert(i)).collect();
        registry.remove(ids[1]);
        registry.remove(ids[3]);
        assert_eq!(registry.ids(), vec![ids[0], ids[2]]);
        registry.insert(9);
        let values: Vec<_> = registry.iter().map(|(_, v)| *v).collect();
        assert_eq!(values, vec![0, 2, 9]);
    }
}
