//! Key Order Module
//!
//! Ordered set of keys used both for the controller's insertion order and as
//! the backing sequence of the recency log.

use std::collections::VecDeque;

// == Key Order ==
/// Tracks the order in which keys were last touched.
///
/// Keys are stored in a VecDeque where:
/// - Front = Oldest
/// - Back = Newest
///
/// A key appears at most once.
#[derive(Debug, Default, Clone)]
pub struct KeyOrder {
    order: VecDeque<String>,
}

impl KeyOrder {
    // == Constructor ==
    pub fn new() -> Self {
        Self {
            order: VecDeque::new(),
        }
    }

    // == Touch ==
    /// Marks a key as newest (moves to back).
    ///
    /// Returns true if the key was not tracked before.
    pub fn touch(&mut self, key: &str) -> bool {
        let existed = self.remove(key);
        self.order.push_back(key.to_string());
        !existed
    }

    // == Remove ==
    /// Removes a key from the order. Returns true if it was tracked.
    pub fn remove(&mut self, key: &str) -> bool {
        match self.order.iter().position(|k| k == key) {
            Some(index) => {
                self.order.remove(index);
                true
            }
            None => false,
        }
    }

    /// Returns and removes the least recently touched key.
    pub fn pop_oldest(&mut self) -> Option<String> {
        self.order.pop_front()
    }

    /// Keeps only keys for which `keep` returns true.
    pub fn retain<F: FnMut(&String) -> bool>(&mut self, keep: F) {
        self.order.retain(keep);
    }

    /// Iterates keys from newest to oldest.
    pub fn iter_newest_first(&self) -> impl Iterator<Item = &String> {
        self.order.iter().rev()
    }

    /// Copies keys out, oldest first.
    pub fn to_vec(&self) -> Vec<String> {
        self.order.iter().cloned().collect()
    }

    /// Empties the order, returning keys oldest first.
    pub fn drain(&mut self) -> Vec<String> {
        self.order.drain(..).collect()
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_order_new() {
        let order = KeyOrder::new();
        assert!(order.is_empty());
        assert_eq!(order.len(), 0);
        assert!(order.to_vec().is_empty());
    }

    #[test]
    fn test_touch_new_keys() {
        let mut order = KeyOrder::new();

        assert!(order.touch("a"));
        assert!(order.touch("b"));
        assert!(order.touch("c"));

        assert_eq!(order.to_vec(), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_touch_existing_key_moves_to_back() {
        let mut order = KeyOrder::new();

        order.touch("a");
        order.touch("b");
        order.touch("c");

        assert!(!order.touch("a"));

        assert_eq!(order.to_vec(), vec!["b", "c", "a"]);
    }

    #[test]
    fn test_touch_same_key_multiple_times() {
        let mut order = KeyOrder::new();

        order.touch("a");
        order.touch("a");
        order.touch("a");

        assert_eq!(order.len(), 1);
        assert_eq!(order.pop_oldest(), Some("a".to_string()));
        assert!(order.is_empty());
    }

    #[test]
    fn test_remove() {
        let mut order = KeyOrder::new();

        order.touch("a");
        order.touch("b");
        order.touch("c");

        assert!(order.remove("b"));
        assert!(!order.remove("nonexistent"));

        assert_eq!(order.to_vec(), vec!["a".to_string(), "c".to_string()]);
    }

    #[test]
    fn test_iter_newest_first() {
        let mut order = KeyOrder::new();

        order.touch("a");
        order.touch("b");
        order.touch("c");
        order.touch("a");

        let keys: Vec<&String> = order.iter_newest_first().collect();
        assert_eq!(keys, vec!["a", "c", "b"]);
    }

    #[test]
    fn test_retain_and_drain() {
        let mut order = KeyOrder::new();

        order.touch("event:1");
        order.touch("other:2");
        order.touch("event:3");

        order.retain(|k| k.starts_with("event:"));
        assert_eq!(order.drain(), vec!["event:1".to_string(), "event:3".to_string()]);
        assert!(order.is_empty());
    }
}
