//! Arena-backed FIFO list of check-list entries
//!
//! Entries are stored in slots of a `Vec` and chained into a doubly linked
//! list by index. Every slot carries a generation that is bumped when the
//! slot is vacated, so a [`CheckHandle`] to an erased entry is recognized as
//! stale instead of aliasing whatever entry reuses the slot later.

use std::rc::Weak;

use crate::Tick;
use crate::manager::CheckedList;

const NIL: usize = usize::MAX;

/// Opaque handle to one entry of a manager's check list.
///
/// Handles are returned by [`LruPoolManager::push_check_list`](crate::LruPoolManager::push_check_list)
/// and erase their entry in O(1). [`CheckHandle::DETACHED`] refers to no
/// entry at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CheckHandle {
    index: usize,
    generation: u64,
}

impl CheckHandle {
    /// Handle of an object that is not registered with any manager
    pub const DETACHED: CheckHandle = CheckHandle {
        index: NIL,
        generation: 0,
    };

    pub fn is_detached(&self) -> bool {
        self.index == NIL
    }
}

impl Default for CheckHandle {
    fn default() -> Self {
        Self::DETACHED
    }
}

/// One registered pooled object, tagged with the tick it was pushed at
#[derive(Clone)]
pub(crate) struct CheckItem {
    pub push_tick: Tick,
    pub list: Weak<dyn CheckedList>,
}

struct Slot {
    generation: u64,
    item: Option<CheckItem>,
    prev: usize,
    next: usize,
}

/// FIFO of [`CheckItem`]s. Insertion order is the global LRU order.
pub(crate) struct CheckList {
    slots: Vec<Slot>,
    free: Vec<usize>,
    head: usize,
    tail: usize,
    len: usize,
}

impl CheckList {
    pub fn new() -> Self {
        Self {
            slots: Vec::new(),
            free: Vec::new(),
            head: NIL,
            tail: NIL,
            len: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    /// Append at the tail
    pub fn push_back(&mut self, item: CheckItem) -> CheckHandle {
        let index = match self.free.pop() {
            Some(index) => {
                let slot = &mut self.slots[index];
                slot.item = Some(item);
                slot.prev = self.tail;
                slot.next = NIL;
                index
            }
            None => {
                self.slots.push(Slot {
                    generation: 0,
                    item: Some(item),
                    prev: self.tail,
                    next: NIL,
                });
                self.slots.len() - 1
            }
        };

        if self.tail == NIL {
            self.head = index;
        } else {
            self.slots[self.tail].next = index;
        }
        self.tail = index;
        self.len += 1;

        CheckHandle {
            index,
            generation: self.slots[index].generation,
        }
    }

    pub fn front(&self) -> Option<&CheckItem> {
        if self.head == NIL {
            return None;
        }
        self.slots[self.head].item.as_ref()
    }

    pub fn pop_front(&mut self) -> Option<CheckItem> {
        if self.head == NIL {
            return None;
        }
        self.unlink(self.head)
    }

    /// Remove the entry behind `handle`. Returns `None` for detached or
    /// stale handles.
    pub fn remove(&mut self, handle: CheckHandle) -> Option<CheckItem> {
        let slot = self.slots.get(handle.index)?;
        if slot.generation != handle.generation || slot.item.is_none() {
            return None;
        }
        self.unlink(handle.index)
    }

    fn unlink(&mut self, index: usize) -> Option<CheckItem> {
        let (prev, next, item) = {
            let slot = &mut self.slots[index];
            let item = slot.item.take()?;
            slot.generation = slot.generation.wrapping_add(1);
            (slot.prev, slot.next, item)
        };

        if prev == NIL {
            self.head = next;
        } else {
            self.slots[prev].next = next;
        }
        if next == NIL {
            self.tail = prev;
        } else {
            self.slots[next].prev = prev;
        }

        self.free.push(index);
        self.len -= 1;
        Some(item)
    }
}

impl Default for CheckList {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::rc::Rc;

    struct NoopList;

    impl CheckedList for NoopList {
        fn len(&self) -> usize {
            0
        }

        fn gc(&self) -> bool {
            false
        }
    }

    fn item(tick: Tick, list: &Rc<NoopList>) -> CheckItem {
        let list: Rc<dyn CheckedList> = list.clone();
        CheckItem {
            push_tick: tick,
            list: Rc::downgrade(&list),
        }
    }

    #[test]
    fn test_fifo_order() {
        let list = Rc::new(NoopList);
        let mut checks = CheckList::new();
        checks.push_back(item(1, &list));
        checks.push_back(item(2, &list));
        checks.push_back(item(3, &list));

        assert_eq!(checks.len(), 3);
        assert_eq!(checks.front().unwrap().push_tick, 1);
        assert_eq!(checks.pop_front().unwrap().push_tick, 1);
        assert_eq!(checks.pop_front().unwrap().push_tick, 2);
        assert_eq!(checks.pop_front().unwrap().push_tick, 3);
        assert!(checks.pop_front().is_none());
        assert_eq!(checks.len(), 0);
    }

    #[test]
    fn test_remove_from_middle() {
        let list = Rc::new(NoopList);
        let mut checks = CheckList::new();
        checks.push_back(item(1, &list));
        let middle = checks.push_back(item(2, &list));
        checks.push_back(item(3, &list));

        assert_eq!(checks.remove(middle).unwrap().push_tick, 2);
        assert_eq!(checks.pop_front().unwrap().push_tick, 1);
        assert_eq!(checks.pop_front().unwrap().push_tick, 3);
    }

    #[test]
    fn test_stale_handle_after_slot_reuse() {
        let list = Rc::new(NoopList);
        let mut checks = CheckList::new();
        let first = checks.push_back(item(1, &list));
        assert!(checks.remove(first).is_some());

        // The vacated slot is reused, the old handle must not hit it
        let second = checks.push_back(item(2, &list));
        assert!(checks.remove(first).is_none());
        assert_eq!(checks.len(), 1);
        assert_eq!(checks.remove(second).unwrap().push_tick, 2);
    }

    #[test]
    fn test_detached_handle() {
        let mut checks = CheckList::new();
        assert!(CheckHandle::DETACHED.is_detached());
        assert!(checks.remove(CheckHandle::DETACHED).is_none());
        assert!(checks.remove(CheckHandle::default()).is_none());
    }
}
