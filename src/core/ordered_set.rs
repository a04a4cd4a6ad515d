//! Insertion-ordered set.

use indexmap::IndexSet;
use std::hash::Hash;

/// Set that iterates in insertion order.
///
/// Used for the configuration, entry/exit sets and transition sets, where
/// both uniqueness and deterministic iteration matter.
///
/// # Example
///
/// ```rust
/// use statecraft::core::OrderedSet;
///
/// let mut set = OrderedSet::new();
/// set.insert("b");
/// set.insert("a");
/// set.insert("b");
///
/// assert_eq!(set.to_list(), vec!["b", "a"]);
/// ```
#[derive(Clone, Debug)]
pub struct OrderedSet<T> {
    items: IndexSet<T>,
}

impl<T: Copy + Eq + Hash> OrderedSet<T> {
    pub fn new() -> Self {
        Self {
            items: IndexSet::new(),
        }
    }

    /// Add `value`, returning `false` if it was already present.
    pub fn insert(&mut self, value: T) -> bool {
        self.items.insert(value)
    }

    /// Remove `value`, returning `true` if it was present.
    ///
    /// The remaining values keep their relative order.
    pub fn remove(&mut self, value: &T) -> bool {
        self.items.shift_remove(value)
    }

    pub fn contains(&self, value: &T) -> bool {
        self.items.contains(value)
    }

    /// Add every value of `other` not already present, in its order.
    pub fn union<I>(&mut self, other: I) -> &mut Self
    where
        I: IntoIterator<Item = T>,
    {
        self.items.extend(other);
        self
    }

    pub fn some<F>(&self, predicate: F) -> bool
    where
        F: FnMut(&T) -> bool,
    {
        self.items.iter().any(predicate)
    }

    pub fn every<F>(&self, predicate: F) -> bool
    where
        F: FnMut(&T) -> bool,
    {
        self.items.iter().all(predicate)
    }

    pub fn has_intersection(&self, other: &OrderedSet<T>) -> bool {
        !self.items.is_disjoint(&other.items)
    }

    pub fn to_list(&self) -> Vec<T> {
        self.items.iter().copied().collect()
    }

    pub fn iter(&self) -> indexmap::set::Iter<'_, T> {
        self.items.iter()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }
}

impl<T: Copy + Eq + Hash> Default for OrderedSet<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Copy + Eq + Hash> FromIterator<T> for OrderedSet<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        Self {
            items: iter.into_iter().collect(),
        }
    }
}

impl<'a, T> IntoIterator for &'a OrderedSet<T> {
    type Item = &'a T;
    type IntoIter = indexmap::set::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_ignores_duplicates() {
        let mut set = OrderedSet::new();

        assert!(set.insert(3));
        assert!(set.insert(1));
        assert!(!set.insert(3));

        assert_eq!(set.to_list(), vec![3, 1]);
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn remove_keeps_remaining_order() {
        let mut set: OrderedSet<u32> = [5, 2, 9, 4].into_iter().collect();

        assert!(set.remove(&2));
        assert!(!set.remove(&2));

        assert_eq!(set.to_list(), vec![5, 9, 4]);
        assert!(!set.contains(&2));
    }

    #[test]
    fn union_appends_new_values_in_order() {
        let mut set: OrderedSet<u32> = [1, 2].into_iter().collect();
        set.union([2, 7, 1, 8]);

        assert_eq!(set.to_list(), vec![1, 2, 7, 8]);
    }

    #[test]
    fn predicates_and_intersection() {
        let set: OrderedSet<u32> = [2, 4, 6].into_iter().collect();
        let odd: OrderedSet<u32> = [1, 3].into_iter().collect();
        let mixed: OrderedSet<u32> = [3, 4].into_iter().collect();

        assert!(set.every(|v| v % 2 == 0));
        assert!(set.some(|v| *v > 5));
        assert!(!set.some(|v| *v > 6));
        assert!(!set.has_intersection(&odd));
        assert!(set.has_intersection(&mixed));
    }

    #[test]
    fn empty_set_predicates() {
        let set: OrderedSet<u32> = OrderedSet::new();

        assert!(set.is_empty());
        assert!(set.every(|_| false));
        assert!(!set.some(|_| true));
    }

    #[test]
    fn clear_empties_the_set() {
        let mut set: OrderedSet<u32> = [1, 2, 3].into_iter().collect();
        set.clear();

        assert!(set.is_empty());
        assert!(set.insert(1));
    }

    #[test]
    fn removing_from_the_middle_of_a_large_set_keeps_order() {
        let mut set: OrderedSet<u32> = (0..1000).rev().collect();

        for value in (0..1000).filter(|v| v % 2 == 0) {
            assert!(set.remove(&value));
        }

        let remaining = set.to_list();
        assert_eq!(remaining.len(), 500);
        assert_eq!(remaining.first(), Some(&999));
        assert_eq!(remaining.last(), Some(&1));
        assert!(remaining.windows(2).all(|pair| pair[0] > pair[1]));
    }
}
