//! Enumerable set with O(1) removal.
//!
//! Items live in a dense `Vec` for ordered enumeration; a side map records
//! each item's position. Removal swaps the last item into the hole and pops,
//! then fixes the moved item's index. Enumeration order is insertion order
//! until the first removal.

use std::collections::BTreeMap;

/// A set that can be listed in order and shrunk in constant time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexedSet<T: Ord + Clone> {
    items: Vec<T>,
    index: BTreeMap<T, usize>,
}

impl<T: Ord + Clone> Default for IndexedSet<T> {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            index: BTreeMap::new(),
        }
    }
}

impl<T: Ord + Clone> IndexedSet<T> {
    /// An empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert `item`. Returns `false` if it was already present.
    pub fn insert(&mut self, item: T) -> bool {
        if self.index.contains_key(&item) {
            return false;
        }
        self.index.insert(item.clone(), self.items.len());
        self.items.push(item);
        true
    }

    /// Remove `item`. Returns `false` if it was absent.
    pub fn remove(&mut self, item: &T) -> bool {
        let Some(pos) = self.index.remove(item) else {
            return false;
        };
        self.items.swap_remove(pos);
        if let Some(moved) = self.items.get(pos) {
            self.index.insert(moved.clone(), pos);
        }
        true
    }

    /// Whether `item` is present.
    pub fn contains(&self, item: &T) -> bool {
        self.index.contains_key(item)
    }

    /// Number of items.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether the set is empty.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Items in enumeration order.
    pub fn as_slice(&self) -> &[T] {
        &self.items
    }

    /// Iterate in enumeration order.
    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.items.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::collections::BTreeSet;

    #[test]
    fn test_insert_is_idempotent() {
        let mut s = IndexedSet::new();
        assert!(s.insert(1));
        assert!(!s.insert(1));
        assert_eq!(s.len(), 1);
    }

    #[test]
    fn test_remove_swaps_last_into_hole() {
        let mut s = IndexedSet::new();
        for i in [10, 20, 30, 40] {
            s.insert(i);
        }
        assert!(s.remove(&20));
        assert_eq!(s.as_slice(), &[10, 40, 30]);
        assert!(s.remove(&40));
        assert_eq!(s.as_slice(), &[10, 30]);
        assert!(!s.remove(&40));
    }

    #[test]
    fn test_remove_last_item() {
        let mut s = IndexedSet::new();
        s.insert("a");
        s.insert("b");
        assert!(s.remove(&"b"));
        assert_eq!(s.as_slice(), &["a"]);
        assert!(s.contains(&"a"));
    }

    proptest! {
        /// The set agrees with a BTreeSet model under any operation sequence,
        /// and the index map always points at the right slot.
        #[test]
        fn prop_matches_model(ops in prop::collection::vec((any::<bool>(), 0u8..16), 0..64)) {
            let mut s = IndexedSet::new();
            let mut model = BTreeSet::new();
            for (insert, v) in ops {
                if insert {
                    prop_assert_eq!(s.insert(v), model.insert(v));
                } else {
                    prop_assert_eq!(s.remove(&v), model.remove(&v));
                }
            }
            prop_assert_eq!(s.len(), model.len());
            for (i, item) in s.iter().enumerate() {
                prop_assert_eq!(s.index.get(item), Some(&i));
                prop_assert!(model.contains(item));
            }
        }
    }
}
