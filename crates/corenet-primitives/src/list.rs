// Path: crates/corenet-primitives/src/list.rs
//! An intrusive doubly-linked list modeled as an arena of stable-id slots
//! rather than raw `prev`/`next` pointers, per the core's re-architecture
//! guidance: every cross-reference becomes a lookup instead of a pointer,
//! so the structure has no cycles and needs no `unsafe`.

/// A stable handle into an [`IntrusiveList`]. Indices are never reused
/// while the node they named is still present in the list, but may be
/// recycled once it has been unlinked.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct NodeId(usize);

struct Slot<T> {
    data: Option<T>,
    prev: Option<NodeId>,
    next: Option<NodeId>,
}

/// A doubly-linked list of `T`, addressable by stable [`NodeId`] handles.
///
/// Lists are never shared across threads without external synchronization,
/// matching the spec's ownership model for this primitive.
pub struct IntrusiveList<T> {
    slots: Vec<Slot<T>>,
    free: Vec<usize>,
    head: Option<NodeId>,
    tail: Option<NodeId>,
    len: usize,
}

impl<T> Default for IntrusiveList<T> {
    fn default() -> Self {
        IntrusiveList {
            slots: Vec::new(),
            free: Vec::new(),
            head: None,
            tail: None,
            len: 0,
        }
    }
}

impl<T> IntrusiveList<T> {
    pub fn new() -> IntrusiveList<T> {
        IntrusiveList::default()
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    fn alloc(&mut self, data: T) -> NodeId {
        let slot = Slot {
            data: Some(data),
            prev: None,
            next: None,
        };
        if let Some(idx) = self.free.pop() {
            self.slots[idx] = slot;
            NodeId(idx)
        } else {
            self.slots.push(slot);
            NodeId(self.slots.len() - 1)
        }
    }

    pub fn get(&self, id: NodeId) -> Option<&T> {
        self.slots.get(id.0).and_then(|s| s.data.as_ref())
    }

    pub fn get_mut(&mut self, id: NodeId) -> Option<&mut T> {
        self.slots.get_mut(id.0).and_then(|s| s.data.as_mut())
    }

    /// Appends `data` at the tail and returns its handle.
    pub fn append(&mut self, data: T) -> NodeId {
        let id = self.alloc(data);
        match self.tail {
            Some(tail) => {
                self.slots[tail.0].next = Some(id);
                self.slots[id.0].prev = Some(tail);
                self.tail = Some(id);
            }
            None => {
                self.head = Some(id);
                self.tail = Some(id);
            }
        }
        self.len += 1;
        id
    }

    /// Prepends `data` at the head and returns its handle.
    pub fn prepend(&mut self, data: T) -> NodeId {
        let id = self.alloc(data);
        match self.head {
            Some(head) => {
                self.slots[head.0].prev = Some(id);
                self.slots[id.0].next = Some(head);
                self.head = Some(id);
            }
            None => {
                self.head = Some(id);
                self.tail = Some(id);
            }
        }
        self.len += 1;
        id
    }

    fn node_at(&self, index: usize) -> Option<NodeId> {
        let mut cur = self.head;
        let mut i = 0;
        while let Some(id) = cur {
            if i == index {
                return Some(id);
            }
            cur = self.slots[id.0].next;
            i += 1;
        }
        None
    }

    /// Inserts `data` so it becomes the element at `index` (0-based),
    /// shifting the rest of the list down. `index >= len()` appends.
    pub fn insert_at(&mut self, index: usize, data: T) -> NodeId {
        if index == 0 {
            return self.prepend(data);
        }
        match self.node_at(index) {
            None => self.append(data),
            Some(next_id) => {
                let prev_id = self.slots[next_id.0].prev;
                let id = self.alloc(data);
                self.slots[id.0].prev = prev_id;
                self.slots[id.0].next = Some(next_id);
                self.slots[next_id.0].prev = Some(id);
                match prev_id {
                    Some(p) => self.slots[p.0].next = Some(id),
                    None => self.head = Some(id),
                }
                self.len += 1;
                id
            }
        }
    }

    /// Inserts `data` at the position a stable merge would place it,
    /// ordered by `cmp`. Stable: among equal elements, `data` lands after
    /// any existing equal element.
    pub fn insert_sorted<F>(&mut self, data: T, mut cmp: F) -> NodeId
    where
        F: FnMut(&T, &T) -> std::cmp::Ordering,
    {
        let mut cur = self.head;
        while let Some(id) = cur {
            let existing = match &self.slots[id.0].data {
                Some(v) => v,
                None => break,
            };
            if cmp(&data, existing) == std::cmp::Ordering::Less {
                let prev_id = self.slots[id.0].prev;
                let new_id = self.alloc(data);
                self.slots[new_id.0].prev = prev_id;
                self.slots[new_id.0].next = Some(id);
                self.slots[id.0].prev = Some(new_id);
                match prev_id {
                    Some(p) => self.slots[p.0].next = Some(new_id),
                    None => self.head = Some(new_id),
                }
                self.len += 1;
                return new_id;
            }
            cur = self.slots[id.0].next;
        }
        self.append(data)
    }

    /// Appends every element of `other` to the end of `self`, leaving
    /// `other` empty.
    pub fn concat(&mut self, other: &mut IntrusiveList<T>) {
        while let Some(head) = other.head {
            if let Some(data) = other.unlink(head) {
                self.append(data);
            }
        }
    }

    /// Unlinks the node and returns its data, without otherwise visiting
    /// or destroying any other node.
    pub fn unlink(&mut self, id: NodeId) -> Option<T> {
        let slot = self.slots.get_mut(id.0)?;
        let data = slot.data.take()?;
        let prev = slot.prev.take();
        let next = slot.next.take();
        match prev {
            Some(p) => self.slots[p.0].next = next,
            None => self.head = next,
        }
        match next {
            Some(n) => self.slots[n.0].prev = prev,
            None => self.tail = prev,
        }
        self.free.push(id.0);
        self.len -= 1;
        Some(data)
    }

    /// Unlinks and drops the node, matching the source library's
    /// unlink-then-free `delete_by_node` convention.
    pub fn delete(&mut self, id: NodeId) {
        self.unlink(id);
    }

    pub fn nth(&self, index: usize) -> Option<&T> {
        self.node_at(index).and_then(|id| self.get(id))
    }

    /// Returns the handles in list order.
    pub fn iter_ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        let mut cur = self.head;
        std::iter::from_fn(move || {
            let id = cur?;
            cur = self.slots[id.0].next;
            Some(id)
        })
    }

    pub fn iter(&self) -> impl Iterator<Item = &T> + '_ {
        self.iter_ids().filter_map(move |id| self.get(id))
    }
}

impl<T: PartialEq> IntrusiveList<T> {
    /// Removes the first node whose data equals `value`.
    pub fn remove_first_by_value(&mut self, value: &T) -> bool {
        let found = self.iter_ids().find(|id| self.get(*id) == Some(value));
        if let Some(id) = found {
            self.delete(id);
            true
        } else {
            false
        }
    }

    /// Removes every node whose data equals `value`.
    pub fn remove_all_by_value(&mut self, value: &T) -> usize {
        let matches: Vec<NodeId> = self
            .iter_ids()
            .filter(|id| self.get(*id) == Some(value))
            .collect();
        let count = matches.len();
        for id in matches {
            self.delete(id);
        }
        count
    }

    pub fn index_of(&self, value: &T) -> Option<usize> {
        self.iter().position(|v| v == value)
    }

    pub fn contains(&self, value: &T) -> bool {
        self.iter().any(|v| v == value)
    }
}

impl<T> IntrusiveList<T> {
    pub fn find<F: Fn(&T) -> bool>(&self, pred: F) -> Option<NodeId> {
        self.iter_ids().find(|id| self.get(*id).map(&pred).unwrap_or(false))
    }

    /// Stable merge sort over the list's current contents.
    pub fn sort<F>(&mut self, mut cmp: F)
    where
        F: FnMut(&T, &T) -> std::cmp::Ordering,
    {
        let mut items: Vec<T> = Vec::with_capacity(self.len);
        let ids: Vec<NodeId> = self.iter_ids().collect();
        for id in &ids {
            if let Some(v) = self.unlink(*id) {
                items.push(v);
            }
        }
        items.sort_by(&mut cmp);
        for item in items {
            self.append(item);
        }
    }

    /// Walks every node and calls `destroyer(data)`, then empties the
    /// list.
    pub fn free_full<F: FnMut(T)>(&mut self, mut destroyer: F) {
        while let Some(head) = self.head {
            if let Some(data) = self.unlink(head) {
                destroyer(data);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn append_and_iterate() {
        let mut list = IntrusiveList::new();
        list.append(1);
        list.append(2);
        list.append(3);
        assert_eq!(list.iter().copied().collect::<Vec<_>>(), vec![1, 2, 3]);
        assert_eq!(list.len(), 3);
    }

    #[test]
    fn prepend_and_insert_at() {
        let mut list = IntrusiveList::new();
        list.append(2);
        list.prepend(1);
        list.insert_at(1, 99);
        assert_eq!(list.iter().copied().collect::<Vec<_>>(), vec![1, 99, 2]);
    }

    #[test]
    fn insert_sorted_is_stable() {
        let mut list: IntrusiveList<(i32, &str)> = IntrusiveList::new();
        list.insert_sorted((1, "a"), |a, b| a.0.cmp(&b.0));
        list.insert_sorted((1, "b"), |a, b| a.0.cmp(&b.0));
        list.insert_sorted((0, "c"), |a, b| a.0.cmp(&b.0));
        let items: Vec<_> = list.iter().copied().collect();
        assert_eq!(items, vec![(0, "c"), (1, "a"), (1, "b")]);
    }

    #[test]
    fn remove_and_len_invariant() {
        let mut list = IntrusiveList::new();
        for v in 0..5 {
            list.append(v);
        }
        assert!(list.remove_first_by_value(&2));
        assert_eq!(list.len(), 4);
        assert_eq!(list.iter().copied().collect::<Vec<_>>(), vec![0, 1, 3, 4]);
        assert_eq!(list.index_of(&3), Some(2));
    }

    #[test]
    fn sort_is_stable_and_idempotent() {
        let mut list: IntrusiveList<(i32, &str)> = IntrusiveList::new();
        for item in [(2, "a"), (1, "b"), (2, "c"), (1, "d")] {
            list.append(item);
        }
        list.sort(|a, b| a.0.cmp(&b.0));
        let once: Vec<_> = list.iter().copied().collect();
        assert_eq!(once, vec![(1, "b"), (1, "d"), (2, "a"), (2, "c")]);
        let len_before = list.len();
        list.sort(|a, b| a.0.cmp(&b.0));
        assert_eq!(list.len(), len_before);
        let twice: Vec<_> = list.iter().copied().collect();
        assert_eq!(once, twice);
    }

    #[test]
    fn concat_drains_source() {
        let mut a = IntrusiveList::new();
        let mut b = IntrusiveList::new();
        a.append(1);
        b.append(2);
        b.append(3);
        a.concat(&mut b);
        assert_eq!(a.iter().copied().collect::<Vec<_>>(), vec![1, 2, 3]);
        assert!(b.is_empty());
    }

    #[test]
    fn free_full_visits_every_node() {
        let mut list = IntrusiveList::new();
        for v in 0..4 {
            list.append(v);
        }
        let mut seen = Vec::new();
        list.free_full(|v| seen.push(v));
        assert_eq!(seen, vec![0, 1, 2, 3]);
        assert!(list.is_empty());
    }
}
