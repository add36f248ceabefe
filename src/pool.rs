//! Per-type LRU object pools

use std::cell::{Cell, RefCell};
use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::hash::Hash;
use std::rc::{Rc, Weak};

use crate::action::{DefaultAction, LruAction};
use crate::check_list::CheckHandle;
use crate::errors::{PoolError, PushError};
use crate::manager::{CheckedList, LruPoolManager};

/// One pooled object and its check-list registration
struct Wrapper<T> {
    object: T,
    handle: CheckHandle,
    seq: u64,
}

/// Keys whose list was emptied by eviction, drained by the owning pool
type EmptiedKeys<K> = Rc<RefCell<Vec<K>>>;

/// Objects pooled under one key. Front is the least recently pushed, back
/// the most recently pushed, so `seq` ascends from front to back.
struct KeyList<K, T, A> {
    key: K,
    cache: RefCell<VecDeque<Wrapper<T>>>,
    manager: RefCell<Option<Rc<LruPoolManager>>>,
    action: Rc<A>,
    emptied: EmptiedKeys<K>,
    next_seq: Cell<u64>,
}

impl<K, T, A: LruAction<T>> KeyList<K, T, A> {
    fn manager(&self) -> Option<Rc<LruPoolManager>> {
        self.manager.borrow().clone()
    }

    /// Erase every registration with the current manager and forget it
    fn clear_manager(&self) {
        let Some(manager) = self.manager.borrow_mut().take() else {
            return;
        };

        let handles: Vec<CheckHandle> = self
            .cache
            .borrow_mut()
            .iter_mut()
            .map(|wrapper| std::mem::take(&mut wrapper.handle))
            .collect();
        for handle in handles {
            manager.erase_check_list(handle);
        }
    }

    /// Pop the oldest object, erasing its registration
    fn evict_front(&self) -> bool {
        let Some(mut wrapper) = self.cache.borrow_mut().pop_front() else {
            return false;
        };

        if let Some(manager) = self.manager() {
            manager.erase_check_list(wrapper.handle);
        }

        self.action.gc(&mut wrapper.object);
        true
    }
}

impl<K, T, A> KeyList<K, T, A>
where
    K: Clone + 'static,
    T: 'static,
    A: LruAction<T> + 'static,
{
    fn new(
        key: K,
        manager: Option<Rc<LruPoolManager>>,
        action: Rc<A>,
        emptied: EmptiedKeys<K>,
    ) -> Rc<Self> {
        Rc::new(Self {
            key,
            cache: RefCell::new(VecDeque::new()),
            manager: RefCell::new(manager),
            action,
            emptied,
            next_seq: Cell::new(0),
        })
    }

    fn weak_self(self: &Rc<Self>) -> Weak<dyn CheckedList> {
        let list: Rc<dyn CheckedList> = self.clone();
        Rc::downgrade(&list)
    }

    fn push(self: &Rc<Self>, object: T) {
        let seq = self.next_seq.get();
        self.next_seq.set(seq + 1);

        self.cache.borrow_mut().push_back(Wrapper {
            object,
            handle: CheckHandle::DETACHED,
            seq,
        });

        // No borrow is held here, registering may evict from this very list
        if let Some(manager) = self.manager() {
            let handle = manager.push_check_list(self.weak_self());
            self.attach(&manager, seq, handle);
        }
    }

    /// Store `handle` on the object pushed as `seq`. If that object was
    /// already evicted while registering, the registration is dropped.
    fn attach(&self, manager: &LruPoolManager, seq: u64, handle: CheckHandle) {
        let mut cache = self.cache.borrow_mut();
        match cache.binary_search_by_key(&seq, |wrapper| wrapper.seq) {
            Ok(index) => cache[index].handle = handle,
            Err(_) => {
                drop(cache);
                manager.erase_check_list(handle);
            }
        }
    }

    fn pull(&self) -> Option<T> {
        let wrapper = self.cache.borrow_mut().pop_back()?;
        if let Some(manager) = self.manager() {
            manager.erase_check_list(wrapper.handle);
        }
        Some(wrapper.object)
    }

    /// Bind to `manager` and register every object, oldest first
    fn setup_manager(self: &Rc<Self>, manager: Rc<LruPoolManager>) {
        *self.manager.borrow_mut() = Some(Rc::clone(&manager));

        let seqs: Vec<u64> = self.cache.borrow().iter().map(|wrapper| wrapper.seq).collect();
        for seq in seqs {
            let handle = manager.push_check_list(self.weak_self());
            self.attach(&manager, seq, handle);
        }
    }
}

impl<K, T, A> CheckedList for KeyList<K, T, A>
where
    K: Clone + 'static,
    T: 'static,
    A: LruAction<T> + 'static,
{
    fn len(&self) -> usize {
        self.cache.borrow().len()
    }

    fn gc(&self) -> bool {
        if !self.evict_front() {
            return false;
        }

        if self.cache.borrow().is_empty() {
            self.emptied.borrow_mut().push(self.key.clone());
        }
        true
    }
}

impl<K, T, A> Drop for KeyList<K, T, A> {
    fn drop(&mut self) {
        let Some(manager) = self.manager.get_mut().take() else {
            return;
        };
        for wrapper in self.cache.get_mut().iter() {
            manager.erase_check_list(wrapper.handle);
        }
    }
}

/// Pool of recyclable objects of one type, keyed by `K`.
///
/// Objects pushed under the same key come back in LIFO order. All
/// accounting is delegated to the bound [`LruPoolManager`], which evicts
/// the least recently pushed objects across every pool it manages. The
/// hooks of `A` run on push, pull and eviction.
///
/// Dropping the pool deregisters its objects from the manager and then
/// evicts them through the `gc` hook.
///
/// # Examples
///
/// ```
/// use lru_objectpool::{LruPool, LruPoolManager};
///
/// let manager = LruPoolManager::create();
/// let mut pool: LruPool<usize, Vec<u8>> = LruPool::new();
/// pool.init(manager.clone());
///
/// pool.push(4096, vec![0; 4096]).unwrap();
/// pool.push(4096, vec![1; 4096]).unwrap();
/// assert_eq!(pool.size(), 2);
/// assert_eq!(manager.item_count(), 2);
///
/// // Most recently pushed first
/// assert_eq!(pool.pull(&4096).unwrap()[0], 1);
/// assert_eq!(pool.pull(&4096).unwrap()[0], 0);
/// assert!(pool.pull(&4096).is_none());
/// ```
pub struct LruPool<K, T, A = DefaultAction>
where
    T: 'static,
    A: LruAction<T> + 'static,
{
    data: HashMap<K, Rc<KeyList<K, T, A>>>,
    manager: Option<Rc<LruPoolManager>>,
    action: Rc<A>,
    emptied: EmptiedKeys<K>,
}

impl<K, T, A> LruPool<K, T, A>
where
    K: Eq + Hash + Clone + 'static,
    T: 'static,
    A: LruAction<T> + 'static,
{
    /// Create an unbound pool with the given hooks
    pub fn with_action(action: A) -> Self {
        Self {
            data: HashMap::new(),
            manager: None,
            action: Rc::new(action),
            emptied: Rc::new(RefCell::new(Vec::new())),
        }
    }

    /// Bind the pool to the manager that accounts for its objects
    pub fn init(&mut self, manager: Rc<LruPoolManager>) {
        self.set_manager(Some(manager));
    }

    /// Re-bind the pool. Objects already pooled are deregistered from the
    /// old manager and registered with the new one, oldest first.
    pub fn set_manager(&mut self, manager: Option<Rc<LruPoolManager>>) {
        let unchanged = match (&self.manager, &manager) {
            (Some(current), Some(next)) => Rc::ptr_eq(current, next),
            (None, None) => true,
            _ => false,
        };
        if unchanged {
            return;
        }

        for list in self.data.values() {
            list.clear_manager();
        }

        self.manager = manager;

        if let Some(manager) = &self.manager {
            for list in self.data.values() {
                list.setup_manager(Rc::clone(manager));
            }
        }
    }

    pub fn manager(&self) -> Option<&Rc<LruPoolManager>> {
        self.manager.as_ref()
    }

    pub fn is_initialized(&self) -> bool {
        self.manager.is_some()
    }

    /// Hand an object to the pool.
    ///
    /// May evict objects of any pool bound to the same manager, including
    /// this one. Fails if the pool was never bound, giving the object back.
    pub fn push(&mut self, key: K, mut object: T) -> Result<(), PushError<T>> {
        let Some(manager) = &self.manager else {
            return Err(PushError::new(PoolError::NotInitialized, object));
        };

        self.action.push(&mut object);

        let list = match self.data.get(&key) {
            Some(list) => Rc::clone(list),
            None => {
                let list = KeyList::new(
                    key.clone(),
                    Some(Rc::clone(manager)),
                    Rc::clone(&self.action),
                    Rc::clone(&self.emptied),
                );
                self.data.insert(key, Rc::clone(&list));
                list
            }
        };
        list.push(object);

        self.remove_emptied();
        Ok(())
    }

    /// Take the most recently pushed object under `key`, if any
    pub fn pull(&mut self, key: &K) -> Option<T> {
        self.remove_emptied();

        let list = Rc::clone(self.data.get(key)?);
        let object = list.pull();

        if list.is_empty() {
            self.data.remove(key);
        }

        let mut object = object?;
        self.action.pull(&mut object);
        self.action.reset(&mut object);
        Some(object)
    }

    /// Evict every pooled object through the `gc` hook
    pub fn clear(&mut self) {
        for list in self.data.values() {
            while list.evict_front() {}
        }
        self.data.clear();
        self.emptied.borrow_mut().clear();
    }

    /// Pooled objects across all keys
    pub fn size(&self) -> usize {
        self.data.values().map(|list| list.len()).sum()
    }

    /// Pooled objects under `key`
    pub fn key_size(&self, key: &K) -> usize {
        self.data.get(key).map_or(0, |list| list.len())
    }

    pub fn is_empty(&self) -> bool {
        self.data.values().all(|list| list.is_empty())
    }

    /// Keys that currently hold pooled objects. A key emptied by eviction
    /// may linger until the next push or pull on this pool.
    pub fn keys(&self) -> impl Iterator<Item = &K> {
        self.data.keys()
    }

    /// Drop the lists that eviction left empty
    fn remove_emptied(&mut self) {
        let keys = std::mem::take(&mut *self.emptied.borrow_mut());
        for key in keys {
            if self.data.get(&key).is_some_and(|list| list.is_empty()) {
                self.data.remove(&key);
            }
        }
    }
}

impl<K, T> LruPool<K, T>
where
    K: Eq + Hash + Clone + 'static,
    T: 'static,
{
    /// Create an unbound pool with no-op hooks
    pub fn new() -> Self {
        Self::with_action(DefaultAction)
    }
}

impl<K, T> Default for LruPool<K, T>
where
    K: Eq + Hash + Clone + 'static,
    T: 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K, T, A> Drop for LruPool<K, T, A>
where
    T: 'static,
    A: LruAction<T> + 'static,
{
    fn drop(&mut self) {
        for list in self.data.values() {
            list.clear_manager();
        }
        self.manager = None;

        for list in self.data.values() {
            while list.evict_front() {}
        }
    }
}

impl<K, T, A> fmt::Debug for LruPool<K, T, A>
where
    T: 'static,
    A: LruAction<T> + 'static,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LruPool")
            .field("keys", &self.data.len())
            .field("initialized", &self.manager.is_some())
            .finish_non_exhaustive()
    }
}
