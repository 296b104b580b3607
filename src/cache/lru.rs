//! LRU Map Module
//!
//! Keyed storage whose iteration order is recency order.
//!
//! A hash index points into a slab of nodes linked as a doubly linked list:
//! - Head = least recently used
//! - Tail = most recently used
//!
//! Insert, touch and removal from any position are O(1).

use std::collections::HashMap;

#[derive(Debug)]
struct Node<V> {
    key: String,
    /// `None` while the slot sits on the free list
    value: Option<V>,
    prev: Option<usize>,
    next: Option<usize>,
}

// == LRU Map ==
/// Ordered map with O(1) move-to-tail and O(1) removal.
#[derive(Debug)]
pub struct LruMap<V> {
    index: HashMap<String, usize>,
    slots: Vec<Node<V>>,
    free: Vec<usize>,
    head: Option<usize>,
    tail: Option<usize>,
}

impl<V> Default for LruMap<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V> LruMap<V> {
    // == Constructor ==
    /// Creates a new empty map.
    pub fn new() -> Self {
        Self {
            index: HashMap::new(),
            slots: Vec::new(),
            free: Vec::new(),
            head: None,
            tail: None,
        }
    }

    // == Insert ==
    /// Inserts `value` at the most recently used position.
    ///
    /// An existing entry for `key` is removed first and its value returned.
    pub fn insert(&mut self, key: String, value: V) -> Option<V> {
        let previous = self.remove(&key);

        let node = Node {
            key: key.clone(),
            value: Some(value),
            prev: None,
            next: None,
        };
        let idx = match self.free.pop() {
            Some(idx) => {
                self.slots[idx] = node;
                idx
            }
            None => {
                self.slots.push(node);
                self.slots.len() - 1
            }
        };

        self.attach_tail(idx);
        self.index.insert(key, idx);
        previous
    }

    // == Lookup ==

    pub fn get(&self, key: &str) -> Option<&V> {
        let idx = *self.index.get(key)?;
        self.slots[idx].value.as_ref()
    }

    /// Mutable lookup. Does not change recency order.
    pub fn get_mut(&mut self, key: &str) -> Option<&mut V> {
        let idx = *self.index.get(key)?;
        self.slots[idx].value.as_mut()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.index.contains_key(key)
    }

    // == Touch ==
    /// Moves `key` to the most recently used position.
    ///
    /// Returns false if the key is absent.
    pub fn touch(&mut self, key: &str) -> bool {
        match self.index.get(key) {
            Some(&idx) => {
                if self.tail != Some(idx) {
                    self.detach(idx);
                    self.attach_tail(idx);
                }
                true
            }
            None => false,
        }
    }

    // == Remove ==
    /// Removes `key` from any position.
    pub fn remove(&mut self, key: &str) -> Option<V> {
        let idx = self.index.remove(key)?;
        self.release(idx)
    }

    // == Pop Oldest ==
    /// Removes and returns the least recently used entry.
    pub fn pop_oldest(&mut self) -> Option<(String, V)> {
        let idx = self.head?;
        let key = std::mem::take(&mut self.slots[idx].key);
        self.index.remove(&key);
        self.release(idx).map(|value| (key, value))
    }

    /// Returns the least recently used key without removing it.
    pub fn peek_oldest(&self) -> Option<&str> {
        self.head.map(|idx| self.slots[idx].key.as_str())
    }

    // == Length ==

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    // == Clear ==
    /// Drops every entry and releases the slab.
    pub fn clear(&mut self) {
        self.index.clear();
        self.slots.clear();
        self.free.clear();
        self.head = None;
        self.tail = None;
    }

    // == Iteration ==
    /// Iterates from least to most recently used.
    pub fn iter(&self) -> Iter<'_, V> {
        Iter {
            map: self,
            cursor: self.head,
        }
    }

    // == Linking ==

    fn release(&mut self, idx: usize) -> Option<V> {
        self.detach(idx);
        let node = &mut self.slots[idx];
        node.key.clear();
        let value = node.value.take();
        self.free.push(idx);
        value
    }

    fn detach(&mut self, idx: usize) {
        let (prev, next) = {
            let node = &self.slots[idx];
            (node.prev, node.next)
        };

        match prev {
            Some(p) => self.slots[p].next = next,
            None => self.head = next,
        }
        match next {
            Some(n) => self.slots[n].prev = prev,
            None => self.tail = prev,
        }

        let node = &mut self.slots[idx];
        node.prev = None;
        node.next = None;
    }

    fn attach_tail(&mut self, idx: usize) {
        let old_tail = self.tail;
        {
            let node = &mut self.slots[idx];
            node.prev = old_tail;
            node.next = None;
        }
        match old_tail {
            Some(t) => self.slots[t].next = Some(idx),
            None => self.head = Some(idx),
        }
        self.tail = Some(idx);
    }
}

/// Recency-ordered iterator over an [`LruMap`].
pub struct Iter<'a, V> {
    map: &'a LruMap<V>,
    cursor: Option<usize>,
}

impl<'a, V> Iterator for Iter<'a, V> {
    type Item = (&'a str, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        let idx = self.cursor?;
        let node = &self.map.slots[idx];
        self.cursor = node.next;
        node.value.as_ref().map(|v| (node.key.as_str(), v))
    }
}
