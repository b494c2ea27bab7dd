use std::cmp::Ordering;

use tacnav_core::Node;

/// An item that can live in an [`IndexedHeap`].
///
/// Each item stores its own position inside the heap so membership tests and
/// key updates never scan the heap array.
pub trait HeapItem {
    /// Position inside the heap array, or `None` when not queued.
    fn heap_index(&self) -> Option<usize>;
    fn set_heap_index(&mut self, idx: Option<usize>);
    /// Priority order: `Less` pops first.
    fn heap_cmp(&self, other: &Self) -> Ordering;
}

/// Grid nodes order by `f`, then by `h` so nodes nearer the goal win ties.
impl HeapItem for Node {
    #[inline]
    fn heap_index(&self) -> Option<usize> {
        self.raw_search().heap_index
    }

    #[inline]
    fn set_heap_index(&mut self, idx: Option<usize>) {
        self.raw_search_mut().heap_index = idx;
    }

    #[inline]
    fn heap_cmp(&self, other: &Self) -> Ordering {
        let (a, b) = (self.raw_search(), other.raw_search());
        a.f.total_cmp(&b.f).then_with(|| a.h.total_cmp(&b.h))
    }
}

/// Indexed binary min-heap over handles into a caller-owned slab.
///
/// The heap stores slab indices; the items themselves stay in the slab and
/// carry their heap position (see [`HeapItem`]). Every operation takes the
/// slab it was filled from.
#[derive(Clone, Debug, Default)]
pub struct IndexedHeap {
    items: Vec<usize>,
    capacity: usize,
}

impl IndexedHeap {
    /// A heap that can hold up to `capacity` handles without reallocating.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            items: Vec::with_capacity(capacity),
            capacity,
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Grow the reserved capacity to at least `capacity`.
    pub fn reserve_for(&mut self, capacity: usize) {
        if capacity > self.capacity {
            self.items.reserve(capacity - self.items.len());
            self.capacity = capacity;
        }
    }

    /// Handle of the minimum item.
    #[inline]
    pub fn peek(&self) -> Option<usize> {
        self.items.first().copied()
    }

    /// Whether `handle` is queued. O(1).
    #[inline]
    pub fn contains<T: HeapItem>(&self, slab: &[T], handle: usize) -> bool {
        slab.get(handle)
            .and_then(HeapItem::heap_index)
            .is_some_and(|pos| self.items.get(pos) == Some(&handle))
    }

    /// Queue `handle`. Returns `false` if it is already queued, out of the
    /// slab, or the heap is full.
    pub fn push<T: HeapItem>(&mut self, slab: &mut [T], handle: usize) -> bool {
        if handle >= slab.len() || self.items.len() >= self.capacity || self.contains(slab, handle)
        {
            return false;
        }
        let pos = self.items.len();
        self.items.push(handle);
        slab[handle].set_heap_index(Some(pos));
        self.sift_up(slab, pos);
        true
    }

    /// Remove and return the minimum handle.
    pub fn pop<T: HeapItem>(&mut self, slab: &mut [T]) -> Option<usize> {
        let last = self.items.len().checked_sub(1)?;
        self.swap(slab, 0, last);
        let top = self.items.pop()?;
        slab[top].set_heap_index(None);
        if !self.items.is_empty() {
            self.sift_down(slab, 0);
        }
        Some(top)
    }

    /// Restore order after `handle`'s key decreased.
    pub fn update<T: HeapItem>(&mut self, slab: &mut [T], handle: usize) {
        if let Some(pos) = slab.get(handle).and_then(HeapItem::heap_index) {
            if self.items.get(pos) == Some(&handle) {
                self.sift_up(slab, pos);
            }
        }
    }

    /// Empty the heap, clearing the stored index of every queued item.
    pub fn clear<T: HeapItem>(&mut self, slab: &mut [T]) {
        for &h in &self.items {
            if let Some(item) = slab.get_mut(h) {
                item.set_heap_index(None);
            }
        }
        self.items.clear();
    }

    fn swap<T: HeapItem>(&mut self, slab: &mut [T], a: usize, b: usize) {
        self.items.swap(a, b);
        slab[self.items[a]].set_heap_index(Some(a));
        slab[self.items[b]].set_heap_index(Some(b));
    }

    #[inline]
    fn less<T: HeapItem>(&self, slab: &[T], a: usize, b: usize) -> bool {
        slab[self.items[a]].heap_cmp(&slab[self.items[b]]) == Ordering::Less
    }

    fn sift_up<T: HeapItem>(&mut self, slab: &mut [T], mut pos: usize) {
        while pos > 0 {
            let parent = (pos - 1) / 2;
            if !self.less(slab, pos, parent) {
                break;
            }
            self.swap(slab, pos, parent);
            pos = parent;
        }
    }

    fn sift_down<T: HeapItem>(&mut self, slab: &mut [T], mut pos: usize) {
        let len = self.items.len();
        loop {
            let left = 2 * pos + 1;
            if left >= len {
                break;
            }
            let right = left + 1;
            let child = if right < len && self.less(slab, right, left) {
                right
            } else {
                left
            };
            if !self.less(slab, child, pos) {
                break;
            }
            self.swap(slab, pos, child);
            pos = child;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::{RngExt, SeedableRng};

    #[derive(Clone, Debug)]
    struct Item {
        key: f32,
        tie: f32,
        idx: Option<usize>,
    }

    impl HeapItem for Item {
        fn heap_index(&self) -> Option<usize> {
            self.idx
        }
        fn set_heap_index(&mut self, idx: Option<usize>) {
            self.idx = idx;
        }
        fn heap_cmp(&self, other: &Self) -> Ordering {
            self.key
                .total_cmp(&other.key)
                .then_with(|| self.tie.total_cmp(&other.tie))
        }
    }

    fn slab(keys: &[f32]) -> Vec<Item> {
        keys.iter()
            .map(|&key| Item {
                key,
                tie: 0.0,
                idx: None,
            })
            .collect()
    }

    fn check(heap: &IndexedHeap, slab: &[Item]) {
        for (pos, &h) in heap.items.iter().enumerate() {
            assert_eq!(slab[h].idx, Some(pos), "stale index for {h}");
            if pos > 0 {
                let parent = heap.items[(pos - 1) / 2];
                assert!(slab[parent].heap_cmp(&slab[h]) != Ordering::Greater);
            }
        }
    }

    #[test]
    fn pops_in_key_order() {
        let mut s = slab(&[5.0, 1.0, 4.0, 2.0, 3.0]);
        let mut heap = IndexedHeap::with_capacity(s.len());
        for i in 0..s.len() {
            assert!(heap.push(&mut s, i));
        }
        let order: Vec<usize> = std::iter::from_fn(|| heap.pop(&mut s)).collect();
        assert_eq!(order, vec![1, 3, 4, 2, 0]);
        assert!(s.iter().all(|i| i.idx.is_none()));
    }

    #[test]
    fn ties_break_on_secondary_key() {
        let mut s = slab(&[2.0, 2.0, 2.0]);
        s[0].tie = 3.0;
        s[1].tie = 1.0;
        s[2].tie = 2.0;
        let mut heap = IndexedHeap::with_capacity(3);
        for i in 0..3 {
            heap.push(&mut s, i);
        }
        assert_eq!(heap.pop(&mut s), Some(1));
        assert_eq!(heap.pop(&mut s), Some(2));
        assert_eq!(heap.pop(&mut s), Some(0));
    }

    #[test]
    fn update_moves_item_up() {
        let mut s = slab(&[1.0, 2.0, 3.0, 4.0]);
        let mut heap = IndexedHeap::with_capacity(4);
        for i in 0..4 {
            heap.push(&mut s, i);
        }
        s[3].key = 0.5;
        heap.update(&mut s, 3);
        check(&heap, &s);
        assert_eq!(heap.peek(), Some(3));
    }

    #[test]
    fn contains_and_duplicates() {
        let mut s = slab(&[1.0, 2.0]);
        let mut heap = IndexedHeap::with_capacity(2);
        assert!(!heap.contains(&s, 0));
        assert!(heap.push(&mut s, 0));
        assert!(heap.contains(&s, 0));
        assert!(!heap.push(&mut s, 0));
        assert!(!heap.push(&mut s, 7));
        assert_eq!(heap.len(), 1);
        heap.pop(&mut s);
        assert!(!heap.contains(&s, 0));
    }

    #[test]
    fn capacity_is_fixed() {
        let mut s = slab(&[1.0, 2.0, 3.0]);
        let mut heap = IndexedHeap::with_capacity(2);
        assert!(heap.push(&mut s, 0));
        assert!(heap.push(&mut s, 1));
        assert!(!heap.push(&mut s, 2));
        heap.reserve_for(3);
        assert!(heap.push(&mut s, 2));
    }

    #[test]
    fn stale_index_is_not_membership() {
        let mut s = slab(&[1.0, 2.0]);
        let heap = IndexedHeap::with_capacity(2);
        s[1].idx = Some(0);
        assert!(!heap.contains(&s, 1));
    }

    #[test]
    fn clear_resets_indices() {
        let mut s = slab(&[3.0, 1.0, 2.0]);
        let mut heap = IndexedHeap::with_capacity(3);
        for i in 0..3 {
            heap.push(&mut s, i);
        }
        heap.clear(&mut s);
        assert!(heap.is_empty());
        assert!(s.iter().all(|i| i.idx.is_none()));
    }

    #[test]
    fn random_operations_keep_invariants() {
        let mut rng = StdRng::seed_from_u64(42);
        let n = 200;
        let mut s: Vec<Item> = (0..n)
            .map(|_| Item {
                key: rng.random_range(0.0..100.0),
                tie: rng.random_range(0.0..10.0),
                idx: None,
            })
            .collect();
        let mut heap = IndexedHeap::with_capacity(n);

        for _ in 0..2000 {
            match rng.random_range(0..3) {
                0 => {
                    let h = rng.random_range(0..n);
                    let queued = heap.contains(&s, h);
                    assert_eq!(heap.push(&mut s, h), !queued);
                }
                1 => {
                    let before = heap.len();
                    if let Some(top) = heap.pop(&mut s) {
                        // nothing left may beat the popped item
                        for &h in &heap.items {
                            assert!(s[top].heap_cmp(&s[h]) != Ordering::Greater);
                        }
                        assert_eq!(heap.len(), before - 1);
                    }
                }
                _ => {
                    let h = rng.random_range(0..n);
                    if heap.contains(&s, h) {
                        s[h].key -= rng.random_range(0.0..20.0);
                        heap.update(&mut s, h);
                    }
                }
            }
            check(&heap, &s);
        }
    }
}
