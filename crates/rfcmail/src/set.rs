//! Insertion-ordered set with value equality.

use std::slice;

/// Ordered collection that ignores values it already contains.
///
/// Membership is decided by `PartialEq`, so it works for types that are not
/// `Hash`, such as whole MIME parts. Lookup is linear.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderedSet<T> {
    items: Vec<T>,
}

impl<T: PartialEq> OrderedSet<T> {
    /// Creates an empty set.
    #[must_use]
    pub const fn new() -> Self {
        Self { items: Vec::new() }
    }

    /// Adds `item` unless an equal value is present. Returns true if added.
    pub fn insert(&mut self, item: T) -> bool {
        if self.items.contains(&item) {
            false
        } else {
            self.items.push(item);
            true
        }
    }

    /// Checks for an equal value.
    #[must_use]
    pub fn contains(&self, item: &T) -> bool {
        self.items.contains(item)
    }

    /// Removes every value.
    pub fn clear(&mut self) {
        self.items.clear();
    }

    /// Returns the number of values.
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Returns true if the set is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Returns the values in insertion order.
    #[must_use]
    pub fn as_slice(&self) -> &[T] {
        &self.items
    }

    /// Iterates over the values in insertion order.
    pub fn iter(&self) -> slice::Iter<'_, T> {
        self.items.iter()
    }
}

impl<T: PartialEq> Default for OrderedSet<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'a, T> IntoIterator for &'a OrderedSet<T> {
    type Item = &'a T;
    type IntoIter = slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

impl<T: PartialEq> FromIterator<T> for OrderedSet<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        let mut set = Self::new();
        for item in iter {
            set.insert(item);
        }
        set
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_deduplicates() {
        let mut set = OrderedSet::new();
        assert!(set.insert("b"));
        assert!(set.insert("a"));
        assert!(!set.insert("b"));

        assert_eq!(set.as_slice(), &["b", "a"]);
        assert_eq!(set.len(), 2);
        assert!(set.contains(&"a"));
    }

    #[test]
    fn test_clear() {
        let mut set: OrderedSet<i32> = [1, 2, 2, 3].into_iter().collect();
        assert_eq!(set.len(), 3);

        set.clear();
        assert!(set.is_empty());
    }

    #[test]
    fn test_iteration_order() {
        let set: OrderedSet<&str> = ["x", "y", "x", "z"].into_iter().collect();
        let collected: Vec<&str> = set.iter().copied().collect();
        assert_eq!(collected, vec!["x", "y", "z"]);

        let mut count = 0;
        for _ in &set {
            count += 1;
        }
        assert_eq!(count, 3);
    }
}
