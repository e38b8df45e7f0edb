//! Keyed store with a fixed capacity.
//!
//! Open lessons and downloaded videos live only in process memory. Both are
//! kept in a [`BoundedStore`], which drops the oldest entry once the
//! configured capacity is reached.

use std::collections::{HashMap, VecDeque};
use uuid::Uuid;

#[derive(Debug)]
pub struct BoundedStore<V> {
    capacity: usize,
    entries: HashMap<Uuid, V>,
    /// Insertion order, oldest at the front.
    order: VecDeque<Uuid>,
}

impl<V> BoundedStore<V> {
    /// A capacity of 0 is treated as 1.
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            entries: HashMap::new(),
            order: VecDeque::new(),
        }
    }

    /// Insert `value`, returning the id of the entry evicted to make room.
    pub fn insert(&mut self, id: Uuid, value: V) -> Option<Uuid> {
        if self.entries.insert(id, value).is_some() {
            return None;
        }
        self.order.push_back(id);

        if self.order.len() > self.capacity {
            let oldest = self.order.pop_front()?;
            self.entries.remove(&oldest);
            return Some(oldest);
        }
        None
    }

    pub fn get(&self, id: &Uuid) -> Option<&V> {
        self.entries.get(id)
    }

    pub fn remove(&mut self, id: &Uuid) -> Option<V> {
        let value = self.entries.remove(id)?;
        self.order.retain(|entry| entry != id);
        Some(value)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_oldest_entry_is_evicted_at_capacity() {
        let mut store = BoundedStore::new(2);
        let (a, b, c) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());

        assert_eq!(store.insert(a, "a"), None);
        assert_eq!(store.insert(b, "b"), None);
        assert_eq!(store.insert(c, "c"), Some(a));

        assert_eq!(store.len(), 2);
        assert!(store.get(&a).is_none());
        assert_eq!(store.get(&b), Some(&"b"));
        assert_eq!(store.get(&c), Some(&"c"));
    }

    #[test]
    fn test_removed_entries_free_their_slot() {
        let mut store = BoundedStore::new(2);
        let (a, b, c) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());
        store.insert(a, 1);
        store.insert(b, 2);

        assert_eq!(store.remove(&a), Some(1));
        assert_eq!(store.remove(&a), None);
        assert_eq!(store.insert(c, 3), None);
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn test_reinserting_a_key_does_not_evict() {
        let mut store = BoundedStore::new(1);
        let a = Uuid::new_v4();
        store.insert(a, 1);

        assert_eq!(store.insert(a, 2), None);
        assert_eq!(store.get(&a), Some(&2));
        assert_eq!(BoundedStore::<u8>::new(0).capacity(), 1);
    }
}
