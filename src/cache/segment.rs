//! Ordered segment: a slab-backed doubly linked list.
//!
//! Nodes live in a `Vec` of slots and link to each other by [`SlotId`], so
//! the cache index can hold a stable handle instead of a pointer. Freed slots
//! are recycled. The head is the most recently used end, the tail the least.
//!
//! All operations are O(1).

use crate::cache::entry::CacheEntry;

/// Stable handle to a node inside one [`Segment`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SlotId(u32);

struct Node {
    entry: CacheEntry,
    prev: Option<SlotId>,
    next: Option<SlotId>,
}

/// An ordered list of cache entries, most recent at the head.
#[derive(Default)]
pub struct Segment {
    slots: Vec<Option<Node>>,
    free: Vec<u32>,
    head: Option<SlotId>,
    tail: Option<SlotId>,
    len: usize,
}

impl Segment {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Insert an entry at the head. Returns its handle.
    pub fn push_front(&mut self, entry: CacheEntry) -> SlotId {
        let id = self.alloc(entry);
        self.link_front(id);
        self.len += 1;
        id
    }

    /// Move an existing node to the head. Returns false for a stale handle.
    pub fn move_to_front(&mut self, id: SlotId) -> bool {
        if self.node(id).is_none() {
            return false;
        }
        if self.head != Some(id) {
            self.unlink(id);
            self.link_front(id);
        }
        true
    }

    /// Remove and return the tail (least recently used) entry.
    pub fn pop_back(&mut self) -> Option<CacheEntry> {
        let tail = self.tail?;
        self.remove(tail)
    }

    /// Unlink a node by handle and return its entry.
    pub fn remove(&mut self, id: SlotId) -> Option<CacheEntry> {
        self.node(id)?;
        self.unlink(id);
        let node = self.slots[id.0 as usize].take()?;
        self.free.push(id.0);
        self.len -= 1;
        Some(node.entry)
    }

    pub fn get(&self, id: SlotId) -> Option<&CacheEntry> {
        self.node(id).map(|n| &n.entry)
    }

    /// The most recently used entry.
    pub fn front(&self) -> Option<&CacheEntry> {
        self.get(self.head?)
    }

    /// The least recently used entry.
    pub fn back(&self) -> Option<&CacheEntry> {
        self.get(self.tail?)
    }

    /// Iterate entries from head to tail.
    pub fn iter(&self) -> Iter<'_> {
        Iter {
            segment: self,
            current: self.head,
        }
    }

    fn alloc(&mut self, entry: CacheEntry) -> SlotId {
        let node = Node {
            entry,
            prev: None,
            next: None,
        };
        match self.free.pop() {
            Some(free) => {
                self.slots[free as usize] = Some(node);
                SlotId(free)
            }
            None => {
                // A segment never holds more than the cache capacity, which is
                // far below u32::MAX slots in practice.
                let raw = self.slots.len() as u32;
                self.slots.push(Some(node));
                SlotId(raw)
            }
        }
    }

    fn link_front(&mut self, id: SlotId) {
        let old_head = self.head;
        if let Some(node) = self.node_mut(id) {
            node.prev = None;
            node.next = old_head;
        }
        match old_head {
            Some(h) => {
                if let Some(node) = self.node_mut(h) {
                    node.prev = Some(id);
                }
            }
            None => self.tail = Some(id),
        }
        self.head = Some(id);
    }

    fn unlink(&mut self, id: SlotId) {
        let (prev, next) = match self.node(id) {
            Some(n) => (n.prev, n.next),
            None => return,
        };

        match prev {
            Some(p) => {
                if let Some(node) = self.node_mut(p) {
                    node.next = next;
                }
            }
            None => self.head = next,
        }
        match next {
            Some(n) => {
                if let Some(node) = self.node_mut(n) {
                    node.prev = prev;
                }
            }
            None => self.tail = prev,
        }

        if let Some(node) = self.node_mut(id) {
            node.prev = None;
            node.next = None;
        }
    }

    #[inline]
    fn node(&self, id: SlotId) -> Option<&Node> {
        self.slots.get(id.0 as usize)?.as_ref()
    }

    #[inline]
    fn node_mut(&mut self, id: SlotId) -> Option<&mut Node> {
        self.slots.get_mut(id.0 as usize)?.as_mut()
    }
}

/// Head-to-tail iterator over a [`Segment`].
pub struct Iter<'a> {
    segment: &'a Segment,
    current: Option<SlotId>,
}

impl<'a> Iterator for Iter<'a> {
    type Item = &'a CacheEntry;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.segment.node(self.current?)?;
        self.current = node.next;
        Some(&node.entry)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;

    fn entry(key: u64) -> CacheEntry {
        CacheEntry::new(key, Bytes::from(format!("v{key}")))
    }

    fn keys(segment: &Segment) -> Vec<u64> {
        segment.iter().map(|e| e.key).collect()
    }

    #[test]
    fn test_push_front_orders_newest_first() {
        let mut seg = Segment::new();
        seg.push_front(entry(1));
        seg.push_front(entry(2));
        seg.push_front(entry(3));

        assert_eq!(keys(&seg), vec![3, 2, 1]);
        assert_eq!(seg.front().unwrap().key, 3);
        assert_eq!(seg.back().unwrap().key, 1);
        assert_eq!(seg.len(), 3);
    }

    #[test]
    fn test_move_to_front() {
        let mut seg = Segment::new();
        let a = seg.push_front(entry(1));
        let b = seg.push_front(entry(2));
        seg.push_front(entry(3));

        assert!(seg.move_to_front(a));
        assert_eq!(keys(&seg), vec![1, 3, 2]);

        // middle node
        assert!(seg.move_to_front(b));
        assert_eq!(keys(&seg), vec![2, 1, 3]);

        // already at head
        assert!(seg.move_to_front(b));
        assert_eq!(keys(&seg), vec![2, 1, 3]);
        assert_eq!(seg.back().unwrap().key, 3);
    }

    #[test]
    fn test_pop_back_drains_lru_first() {
        let mut seg = Segment::new();
        for k in 1..=3 {
            seg.push_front(entry(k));
        }

        assert_eq!(seg.pop_back().unwrap().key, 1);
        assert_eq!(seg.pop_back().unwrap().key, 2);
        assert_eq!(seg.pop_back().unwrap().key, 3);
        assert!(seg.pop_back().is_none());
        assert!(seg.is_empty());
        assert!(seg.front().is_none());
    }

    #[test]
    fn test_remove_and_slot_reuse() {
        let mut seg = Segment::new();
        let a = seg.push_front(entry(1));
        seg.push_front(entry(2));

        assert_eq!(seg.remove(a).unwrap().key, 1);
        assert!(seg.remove(a).is_none());
        assert!(!seg.move_to_front(a));

        let c = seg.push_front(entry(3));
        assert_eq!(c, a);
        assert_eq!(seg.get(c).unwrap().key, 3);
        assert_eq!(keys(&seg), vec![3, 2]);
    }
}
