//! Shared coordinator enforcing one capacity budget across many pools

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::fmt;
use std::rc::{Rc, Weak};
use std::sync::atomic::{AtomicUsize, Ordering};

use tracing::{debug, error, trace};

use crate::Tick;
use crate::check_list::{CheckHandle, CheckItem, CheckList};
use crate::config::ManagerConfiguration;
use crate::eviction::{AdaptiveBounds, StalenessWindow};
use crate::health::HealthStatus;
use crate::metrics::{ManagerMetrics, MetricsExporter, MetricsTracker};

/// Remaining per-call budget once a pool list refuses to evict
const REFUSED_EVICTION_BUDGET: usize = 10;

/// A pool-side list the manager can ask to shed its oldest object.
///
/// [`LruPool`](crate::LruPool) implements this for its per-key lists. The
/// manager only ever holds [`Weak`] references to implementors.
pub trait CheckedList {
    /// Objects held by the list
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Evict the least recently pushed object. The implementation erases
    /// that object's check-list entry. Returns `false` if there was nothing
    /// to evict.
    fn gc(&self) -> bool;
}

/// Global budget for pooled-but-idle objects shared by any number of
/// [`LruPool`](crate::LruPool)s.
///
/// The manager counts every pooled object of every bound pool and keeps one
/// FIFO check list of them in push order. Eviction walks that list from the
/// front, so the globally least recently pooled objects go first no matter
/// which pool owns them.
///
/// Eviction runs
/// - synchronously inside a push that lifts the count above
///   [`item_max_bound`](Self::item_max_bound),
/// - from [`proc`](Self::proc), for an unfinished pass or for entries older
///   than [`list_tick_timeout`](Self::list_tick_timeout),
/// - from [`gc`](Self::gc), which also adapts the bounds to the current load.
///
/// The manager is single threaded and shared through [`Rc`].
///
/// # Examples
///
/// ```
/// use lru_objectpool::{LruPool, LruPoolManager};
///
/// let manager = LruPoolManager::create();
/// manager.set_item_max_bound(2);
///
/// let mut pool = LruPool::new();
/// pool.init(manager.clone());
///
/// pool.push("a", 1).unwrap();
/// pool.push("b", 2).unwrap();
/// pool.push("c", 3).unwrap(); // over the bound, "a" is evicted
///
/// assert_eq!(manager.item_count(), 2);
/// assert_eq!(pool.pull(&"a"), None);
/// assert_eq!(pool.pull(&"c"), Some(3));
/// ```
pub struct LruPoolManager {
    bounds: Cell<AdaptiveBounds>,
    item_count: AtomicUsize,
    proc_item_count: Cell<usize>,
    gc_item: Cell<usize>,
    window: Cell<StalenessWindow>,
    last_proc_tick: Cell<Tick>,
    checked_list: RefCell<CheckList>,
    metrics: MetricsTracker,
}

impl LruPoolManager {
    /// Create a new manager with default bounds
    pub fn create() -> Rc<Self> {
        Rc::new(Self {
            bounds: Cell::new(AdaptiveBounds::default()),
            item_count: AtomicUsize::new(0),
            proc_item_count: Cell::new(usize::MAX),
            gc_item: Cell::new(0),
            window: Cell::new(StalenessWindow::default()),
            last_proc_tick: Cell::new(0),
            checked_list: RefCell::new(CheckList::new()),
            metrics: MetricsTracker::new(),
        })
    }

    /// Create a new manager from a configuration
    pub fn with_config(config: &ManagerConfiguration) -> Rc<Self> {
        let manager = Self::create();
        manager.update_bounds(|bounds| {
            bounds.set_item_adjust_max(config.item_adjust_max);
            bounds.set_item_adjust_min(config.item_adjust_min);
            bounds.set_item_min_bound(config.item_min_bound);
            bounds.set_item_max_bound(config.item_max_bound);
        });
        manager.set_proc_item_count(config.proc_item_count);
        manager.set_list_tick_timeout(config.list_tick_timeout);
        manager
    }

    /// Snapshot of the current settings
    pub fn config(&self) -> ManagerConfiguration {
        let bounds = self.bounds.get();
        ManagerConfiguration {
            item_min_bound: bounds.item_min_bound(),
            item_max_bound: bounds.item_max_bound(),
            proc_item_count: self.proc_item_count(),
            item_adjust_min: bounds.item_adjust_min(),
            item_adjust_max: bounds.item_adjust_max(),
            list_tick_timeout: self.list_tick_timeout(),
        }
    }

    /// Objects kept back by a manual GC
    pub fn item_min_bound(&self) -> usize {
        self.bounds.get().item_min_bound()
    }

    pub fn set_item_min_bound(&self, v: usize) {
        self.update_bounds(|bounds| bounds.set_item_min_bound(v));
    }

    /// Pooled object count above which a push triggers eviction
    pub fn item_max_bound(&self) -> usize {
        self.bounds.get().item_max_bound()
    }

    pub fn set_item_max_bound(&self, v: usize) {
        self.update_bounds(|bounds| bounds.set_item_max_bound(v));
    }

    /// Maximum objects evicted per `proc` call
    pub fn proc_item_count(&self) -> usize {
        self.proc_item_count.get()
    }

    pub fn set_proc_item_count(&self, v: usize) {
        self.proc_item_count.set(v);
    }

    /// Objects the unfinished eviction pass keeps, 0 when idle
    pub fn gc_item(&self) -> usize {
        self.gc_item.get()
    }

    pub fn set_gc_item(&self, v: usize) {
        self.gc_item.set(v);
    }

    pub fn item_adjust_min(&self) -> usize {
        self.bounds.get().item_adjust_min()
    }

    /// See [`AdaptiveBounds::set_item_adjust_min`]
    pub fn set_item_adjust_min(&self, v: usize) {
        self.update_bounds(|bounds| bounds.set_item_adjust_min(v));
    }

    pub fn item_adjust_max(&self) -> usize {
        self.bounds.get().item_adjust_max()
    }

    /// See [`AdaptiveBounds::set_item_adjust_max`]
    pub fn set_item_adjust_max(&self, v: usize) {
        self.update_bounds(|bounds| bounds.set_item_adjust_max(v));
    }

    pub fn list_tick_timeout(&self) -> Tick {
        self.window.get().timeout()
    }

    /// Entries older than `v` ticks get evicted by `proc`. 0 disables it.
    pub fn set_list_tick_timeout(&self, v: Tick) {
        self.window.set(StalenessWindow::new(v));
    }

    /// Tick passed to the latest `proc` call
    pub fn last_proc_tick(&self) -> Tick {
        self.last_proc_tick.get()
    }

    /// Objects currently pooled across every bound pool
    pub fn item_count(&self) -> usize {
        self.item_count.load(Ordering::Relaxed)
    }

    pub fn check_list_len(&self) -> usize {
        self.checked_list.borrow().len()
    }

    /// Manual GC, adapting the bounds to the current load first.
    ///
    /// Returns the number of objects evicted by this call.
    pub fn gc(&self) -> usize {
        MetricsTracker::increment(&self.metrics.gc_calls);

        if self.gc_item.get() == 0 {
            let item_count = self.item_count();
            let keep = self.update_bounds(|bounds| bounds.adapt(item_count));
            self.gc_item.set(keep);

            debug!(
                item_count,
                item_min_bound = keep,
                item_max_bound = self.item_max_bound(),
                "lru pool bounds adapted"
            );
        }

        self.proc(self.last_proc_tick.get())
    }

    /// Periodic processing. `tick` is in caller defined units and is only
    /// compared against the push ticks of check-list entries.
    ///
    /// Returns the number of objects evicted by this call.
    pub fn proc(&self, tick: Tick) -> usize {
        self.last_proc_tick.set(tick);
        MetricsTracker::increment(&self.metrics.proc_calls);

        if self.gc_item.get() == 0 && !self.front_is_stale() {
            return 0;
        }

        let mut reclaimed = 0;
        let mut left_item_num = self.proc_item_count.get();

        while left_item_num > 0 {
            let gc_item = self.gc_item.get();
            if gc_item != 0 && self.item_count() <= gc_item {
                self.gc_item.set(0);
            }

            if self.gc_item.get() == 0 && !self.front_is_stale() {
                break;
            }

            let front = self.checked_list.borrow().front().map(|item| item.list.clone());
            let Some(list) = front else {
                // Nothing left to evict, the counter must agree
                self.gc_item.set(0);
                self.item_count.store(0, Ordering::Relaxed);
                break;
            };

            let Some(list) = list.upgrade() else {
                self.checked_list.borrow_mut().pop_front();
                self.decrement_item_count();
                MetricsTracker::increment(&self.metrics.expired_entries);
                trace!("dropped check-list entry of a destroyed pool");
                continue;
            };

            if list.gc() {
                reclaimed += 1;
                left_item_num -= 1;
            } else {
                debug_assert!(list.is_empty(), "pool list refused eviction while holding objects");
                error!(
                    item_count = self.item_count(),
                    "pool list refused eviction, check list out of sync"
                );
                left_item_num = if left_item_num > REFUSED_EVICTION_BUDGET {
                    REFUSED_EVICTION_BUDGET
                } else {
                    left_item_num - 1
                };
            }
        }

        if reclaimed > 0 {
            self.metrics.record_reclaimed(reclaimed);
            debug!(tick, reclaimed, item_count = self.item_count(), "lru pool objects evicted");
        }

        reclaimed
    }

    /// Register one pooled object of `list`. Returns the handle that erases
    /// the registration again.
    ///
    /// Pushing over [`item_max_bound`](Self::item_max_bound) evicts down to
    /// the bound before returning, then grows the bound by one.
    pub fn push_check_list(&self, list: Weak<dyn CheckedList>) -> CheckHandle {
        let handle = self.checked_list.borrow_mut().push_back(CheckItem {
            push_tick: self.last_proc_tick.get(),
            list,
        });

        let item_count = self.item_count.fetch_add(1, Ordering::Relaxed) + 1;
        if item_count > self.item_max_bound() {
            MetricsTracker::increment(&self.metrics.pressure_events);
            self.inner_gc();

            // Sustained pressure slowly raises the bound
            if self.gc_item.get() == 0 && self.update_bounds(AdaptiveBounds::grow) {
                trace!(item_max_bound = self.item_max_bound(), "lru pool max bound grown");
            }
        }

        handle
    }

    /// Erase a registration made by [`push_check_list`](Self::push_check_list).
    /// Returns `false` if the handle is detached or already erased.
    pub fn erase_check_list(&self, handle: CheckHandle) -> bool {
        if handle.is_detached() {
            return false;
        }
        if self.checked_list.borrow_mut().remove(handle).is_none() {
            return false;
        }

        self.decrement_item_count();
        true
    }

    /// The handle that refers to no registration
    pub fn end_check_list(&self) -> CheckHandle {
        CheckHandle::DETACHED
    }

    /// Get manager metrics
    pub fn get_metrics(&self) -> ManagerMetrics {
        let bounds = self.bounds.get();
        let item_count = self.item_count();

        ManagerMetrics {
            item_count,
            check_list_len: self.check_list_len(),
            item_min_bound: bounds.item_min_bound(),
            item_max_bound: bounds.item_max_bound(),
            item_adjust_min: bounds.item_adjust_min(),
            item_adjust_max: bounds.item_adjust_max(),
            gc_item: self.gc_item(),
            total_reclaimed: self.metrics.total_reclaimed.load(Ordering::Relaxed),
            expired_entries: self.metrics.expired_entries.load(Ordering::Relaxed),
            proc_calls: self.metrics.proc_calls.load(Ordering::Relaxed),
            gc_calls: self.metrics.gc_calls.load(Ordering::Relaxed),
            pressure_events: self.metrics.pressure_events.load(Ordering::Relaxed),
            utilization: utilization(item_count, bounds.item_max_bound()),
        }
    }

    /// Export metrics
    pub fn export_metrics(&self) -> HashMap<String, String> {
        self.get_metrics().export()
    }

    /// Export metrics in Prometheus format
    pub fn export_metrics_prometheus(
        &self,
        manager_name: &str,
        tags: Option<&HashMap<String, String>>,
    ) -> String {
        MetricsExporter::export_prometheus(&self.get_metrics(), manager_name, tags)
    }

    /// Get health status
    pub fn get_health_status(&self) -> HealthStatus {
        let item_count = self.item_count();
        let drift = item_count.abs_diff(self.check_list_len());
        HealthStatus::new(item_count, self.item_max_bound(), self.gc_item() != 0, drift)
    }

    fn inner_gc(&self) -> usize {
        if self.gc_item.get() == 0 {
            self.gc_item.set(self.item_max_bound());
        }

        self.proc(self.last_proc_tick.get())
    }

    /// Whether an entry pushed at `tp` is still inside the staleness window
    fn check_tick(&self, tp: Tick) -> bool {
        self.window.get().is_fresh(self.last_proc_tick.get(), tp)
    }

    fn front_is_stale(&self) -> bool {
        match self.checked_list.borrow().front() {
            Some(item) => !self.check_tick(item.push_tick),
            None => false,
        }
    }

    fn decrement_item_count(&self) {
        // Saturate, a resync may already have zeroed the counter
        let count = self.item_count.load(Ordering::Relaxed);
        self.item_count.store(count.saturating_sub(1), Ordering::Relaxed);
    }

    fn update_bounds<R>(&self, f: impl FnOnce(&mut AdaptiveBounds) -> R) -> R {
        let mut bounds = self.bounds.get();
        let result = f(&mut bounds);
        self.bounds.set(bounds);
        result
    }
}

fn utilization(item_count: usize, item_max_bound: usize) -> f64 {
    if item_max_bound > 0 {
        item_count as f64 / item_max_bound as f64
    } else {
        0.0
    }
}

impl fmt::Debug for LruPoolManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LruPoolManager")
            .field("bounds", &self.bounds.get())
            .field("item_count", &self.item_count())
            .field("proc_item_count", &self.proc_item_count.get())
            .field("gc_item", &self.gc_item.get())
            .field("list_tick_timeout", &self.list_tick_timeout())
            .field("last_proc_tick", &self.last_proc_tick.get())
            .field("check_list_len", &self.check_list_len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// A list that holds `len` anonymous objects and erases the matching
    /// check-list entries on eviction
    struct FakeList {
        manager: Rc<LruPoolManager>,
        handles: RefCell<std::collections::VecDeque<CheckHandle>>,
    }

    impl FakeList {
        fn new(manager: &Rc<LruPoolManager>) -> Rc<Self> {
            Rc::new(Self {
                manager: Rc::clone(manager),
                handles: RefCell::new(Default::default()),
            })
        }

        fn push(self: &Rc<Self>) {
            let me: Rc<dyn CheckedList> = self.clone();
            let handle = self.manager.push_check_list(Rc::downgrade(&me));
            self.handles.borrow_mut().push_back(handle);
        }
    }

    impl CheckedList for FakeList {
        fn len(&self) -> usize {
            self.handles.borrow().len()
        }

        fn gc(&self) -> bool {
            let handle = self.handles.borrow_mut().pop_front();
            match handle {
                Some(handle) => {
                    self.manager.erase_check_list(handle);
                    true
                }
                None => false,
            }
        }
    }

    #[test]
    fn test_defaults() {
        let manager = LruPoolManager::create();
        assert_eq!(manager.item_min_bound(), 0);
        assert_eq!(manager.item_max_bound(), 1024);
        assert_eq!(manager.proc_item_count(), usize::MAX);
        assert_eq!(manager.item_adjust_min(), 256);
        assert_eq!(manager.item_adjust_max(), usize::MAX);
        assert_eq!(manager.gc_item(), 0);
        assert_eq!(manager.list_tick_timeout(), 0);
        assert_eq!(manager.item_count(), 0);
        assert_eq!(manager.config(), ManagerConfiguration::default());
    }

    #[test]
    fn test_erase_check_list() {
        let manager = LruPoolManager::create();
        let list = FakeList::new(&manager);
        list.push();
        list.push();
        assert_eq!(manager.item_count(), 2);

        let handle = list.handles.borrow_mut().pop_back().unwrap();
        assert!(manager.erase_check_list(handle));
        assert!(!manager.erase_check_list(handle));
        assert!(!manager.erase_check_list(manager.end_check_list()));
        assert_eq!(manager.item_count(), 1);
        assert_eq!(manager.check_list_len(), 1);
    }

    #[test]
    fn test_proc_idle_is_noop() {
        let manager = LruPoolManager::create();
        let list = FakeList::new(&manager);
        list.push();

        assert_eq!(manager.proc(100), 0);
        assert_eq!(manager.last_proc_tick(), 100);
        assert_eq!(manager.item_count(), 1);
    }

    #[test]
    fn test_expired_lists_are_reconciled() {
        let manager = LruPoolManager::create();
        manager.set_list_tick_timeout(5);

        let list = FakeList::new(&manager);
        for _ in 0..3 {
            list.push();
        }
        drop(list);
        assert_eq!(manager.item_count(), 3);

        assert_eq!(manager.proc(10), 0);
        assert_eq!(manager.item_count(), 0);
        assert_eq!(manager.check_list_len(), 0);
        assert_eq!(manager.get_metrics().expired_entries, 3);
    }

    #[test]
    fn test_pressure_evicts_oldest_across_lists() {
        let manager = LruPoolManager::create();
        manager.set_item_max_bound(3);

        let first = FakeList::new(&manager);
        let second = FakeList::new(&manager);
        first.push();
        second.push();
        second.push();
        first.push();

        // The first list's oldest object was the global front
        assert_eq!(manager.item_count(), 3);
        assert_eq!(first.len(), 1);
        assert_eq!(second.len(), 2);
        assert_eq!(manager.item_max_bound(), 4);
        assert_eq!(manager.get_metrics().pressure_events, 1);
    }

    #[test]
    fn test_budget_leaves_pass_pending() {
        let manager = LruPoolManager::create();
        let list = FakeList::new(&manager);
        for _ in 0..10 {
            list.push();
        }

        manager.set_proc_item_count(3);
        manager.set_item_max_bound(2);
        list.push();

        // 11 pooled, 3 evicted, the pass is left pending and the bound stays
        assert_eq!(manager.item_count(), 8);
        assert_eq!(manager.gc_item(), 2);
        assert_eq!(manager.item_max_bound(), 2);
        assert!(!manager.get_health_status().is_healthy());

        assert_eq!(manager.proc(1), 3);
        assert_eq!(manager.proc(2), 3);
        assert_eq!(manager.item_count(), 2);
        assert_eq!(manager.proc(3), 0);
        assert_eq!(manager.gc_item(), 0);
    }

    /// Claims to be empty and refuses every eviction
    struct RefusingList {
        gc_calls: Cell<usize>,
    }

    impl CheckedList for RefusingList {
        fn len(&self) -> usize {
            0
        }

        fn gc(&self) -> bool {
            self.gc_calls.set(self.gc_calls.get() + 1);
            false
        }
    }

    #[test]
    fn test_refused_eviction_caps_budget() {
        let manager = LruPoolManager::create();
        let list = Rc::new(RefusingList {
            gc_calls: Cell::new(0),
        });
        let weak: Weak<dyn CheckedList> = Rc::downgrade(&(list.clone() as Rc<dyn CheckedList>));
        for _ in 0..3 {
            manager.push_check_list(weak.clone());
        }
        manager.set_gc_item(1);

        // One refusal drops the unbounded budget to 10 more attempts
        assert_eq!(manager.proc(1), 0);
        assert_eq!(list.gc_calls.get(), 1 + REFUSED_EVICTION_BUDGET);
        assert_eq!(manager.item_count(), 3);
        assert_eq!(manager.check_list_len(), 3);
        assert_eq!(manager.gc_item(), 1);
        assert_eq!(manager.get_metrics().total_reclaimed, 0);

        // A small budget just counts down
        list.gc_calls.set(0);
        manager.set_proc_item_count(5);
        assert_eq!(manager.proc(2), 0);
        assert_eq!(list.gc_calls.get(), 5);
    }

    #[test]
    fn test_negative_timeout_evicts_everything() {
        let manager = LruPoolManager::create();
        manager.set_list_tick_timeout(-5);
        manager.proc(100);

        let list = FakeList::new(&manager);
        list.push();
        list.push();

        assert_eq!(manager.proc(100), 2);
        assert_eq!(manager.item_count(), 0);
    }

    #[test]
    fn test_with_config() {
        let config = ManagerConfiguration::new()
            .with_item_max_bound(64)
            .with_item_adjust(300, 100)
            .with_list_tick_timeout(30);
        let manager = LruPoolManager::with_config(&config);

        assert_eq!(manager.item_max_bound(), 64);
        assert_eq!(manager.item_adjust_max(), 301);
        assert_eq!(manager.item_adjust_min(), 300);
        assert_eq!(manager.list_tick_timeout(), 30);
    }
}
