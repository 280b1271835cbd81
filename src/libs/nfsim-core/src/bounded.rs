//! Fixed-capacity containers
//!
//! Pools with a hard upper bound. Inserting past the bound hands the rejected
//! item back in a [`CapacityError`] instead of growing.

use std::collections::BTreeMap;
use thiserror::Error;

/// Insert rejected because the container is full
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("capacity {capacity} exceeded")]
pub struct CapacityError<T> {
    pub capacity: usize,
    pub item: T,
}

impl<T> CapacityError<T> {
    /// Take back the rejected item
    pub fn into_inner(self) -> T {
        self.item
    }
}

/// Vector with a fixed maximum length
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoundedVec<T> {
    items: Vec<T>,
    capacity: usize,
}

impl<T> BoundedVec<T> {
    pub fn new(capacity: usize) -> Self {
        Self {
            items: Vec::with_capacity(capacity),
            capacity,
        }
    }

    pub fn push(&mut self, item: T) -> Result<(), CapacityError<T>> {
        if self.is_full() {
            return Err(CapacityError {
                capacity: self.capacity,
                item,
            });
        }
        self.items.push(item);
        Ok(())
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.items.len() >= self.capacity
    }

    pub fn first(&self) -> Option<&T> {
        self.items.first()
    }

    pub fn get(&self, index: usize) -> Option<&T> {
        self.items.get(index)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.items.iter()
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }

    pub fn as_slice(&self) -> &[T] {
        &self.items
    }
}

impl<'a, T> IntoIterator for &'a BoundedVec<T> {
    type Item = &'a T;
    type IntoIter = std::slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

/// Ordered map with a fixed maximum number of entries
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoundedMap<K: Ord, V> {
    entries: BTreeMap<K, V>,
    capacity: usize,
}

impl<K: Ord, V> BoundedMap<K, V> {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: BTreeMap::new(),
            capacity,
        }
    }

    /// Insert a new key, or replace the value of an existing one.
    ///
    /// Only inserting a new key counts against the capacity.
    pub fn insert(&mut self, key: K, value: V) -> Result<Option<V>, CapacityError<(K, V)>> {
        if !self.entries.contains_key(&key) && self.is_full() {
            return Err(CapacityError {
                capacity: self.capacity,
                item: (key, value),
            });
        }
        Ok(self.entries.insert(key, value))
    }

    pub fn remove(&mut self, key: &K) -> Option<V> {
        self.entries.remove(key)
    }

    pub fn get(&self, key: &K) -> Option<&V> {
        self.entries.get(key)
    }

    pub fn contains_key(&self, key: &K) -> bool {
        self.entries.contains_key(key)
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.entries.len() >= self.capacity
    }

    pub fn iter(&self) -> std::collections::btree_map::Iter<'_, K, V> {
        self.entries.iter()
    }

    pub fn values(&self) -> std::collections::btree_map::Values<'_, K, V> {
        self.entries.values()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bounded_vec_rejects_past_capacity() {
        let mut v = BoundedVec::new(2);
        assert!(v.push(1).is_ok());
        assert!(v.push(2).is_ok());
        assert!(v.is_full());

        let err = v.push(3).unwrap_err();
        assert_eq!(err.capacity, 2);
        assert_eq!(err.into_inner(), 3);
        assert_eq!(v.as_slice(), &[1, 2]);
    }

    #[test]
    fn test_bounded_vec_first() {
        let mut v = BoundedVec::new(3);
        assert_eq!(v.first(), None);
        v.push("a").unwrap();
        v.push("b").unwrap();
        assert_eq!(v.first(), Some(&"a"));
        assert_eq!(v.iter().count(), 2);
    }

    #[test]
    fn test_bounded_map_capacity() {
        let mut m = BoundedMap::new(2);
        assert_eq!(m.insert(1, 'a'), Ok(None));
        assert_eq!(m.insert(2, 'b'), Ok(None));

        // Replacing an existing key is allowed when full
        assert_eq!(m.insert(2, 'c'), Ok(Some('b')));

        let err = m.insert(3, 'd').unwrap_err();
        assert_eq!(err.item, (3, 'd'));
        assert_eq!(m.len(), 2);

        assert_eq!(m.remove(&1), Some('a'));
        assert!(m.insert(3, 'd').is_ok());
        assert_eq!(m.get(&3), Some(&'d'));
    }

    #[test]
    fn test_capacity_error_display() {
        let err = CapacityError { capacity: 3, item: () };
        assert_eq!(err.to_string(), "capacity 3 exceeded");
    }
}
