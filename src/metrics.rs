//! Metrics collection and export for pool managers and pool hooks

use std::cell::Cell;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::action::LruAction;

/// Metrics data for a manager
///
/// # Examples
///
/// ```
/// use lru_objectpool::{LruPool, LruPoolManager};
///
/// let manager = LruPoolManager::create();
/// let mut pool = LruPool::new();
/// pool.init(manager.clone());
///
/// pool.push(1u32, String::from("a")).unwrap();
/// pool.push(1u32, String::from("b")).unwrap();
///
/// let metrics = manager.get_metrics();
/// assert_eq!(metrics.item_count, 2);
/// assert_eq!(metrics.check_list_len, 2);
/// assert_eq!(metrics.total_reclaimed, 0);
/// ```
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ManagerMetrics {
    /// Objects currently pooled across every bound pool
    pub item_count: usize,

    /// Live check-list entries
    pub check_list_len: usize,

    pub item_min_bound: usize,

    pub item_max_bound: usize,

    pub item_adjust_min: usize,

    pub item_adjust_max: usize,

    /// Remaining target of an unfinished eviction pass, 0 when idle
    pub gc_item: usize,

    /// Objects evicted since the manager was created
    pub total_reclaimed: usize,

    /// Check-list entries dropped because their pool was gone
    pub expired_entries: usize,

    /// Calls to `proc`, including the ones made by `gc`
    pub proc_calls: usize,

    /// Manual `gc` calls
    pub gc_calls: usize,

    /// Evictions triggered by a push over the max bound
    pub pressure_events: usize,

    /// Pool fill ratio against the max bound
    pub utilization: f64,
}

impl ManagerMetrics {
    /// Export metrics as a HashMap
    pub fn export(&self) -> HashMap<String, String> {
        let mut metrics = HashMap::new();
        metrics.insert("item_count".to_string(), self.item_count.to_string());
        metrics.insert("check_list_len".to_string(), self.check_list_len.to_string());
        metrics.insert("item_min_bound".to_string(), self.item_min_bound.to_string());
        metrics.insert("item_max_bound".to_string(), self.item_max_bound.to_string());
        metrics.insert("item_adjust_min".to_string(), self.item_adjust_min.to_string());
        metrics.insert("item_adjust_max".to_string(), self.item_adjust_max.to_string());
        metrics.insert("gc_item".to_string(), self.gc_item.to_string());
        metrics.insert("total_reclaimed".to_string(), self.total_reclaimed.to_string());
        metrics.insert("expired_entries".to_string(), self.expired_entries.to_string());
        metrics.insert("proc_calls".to_string(), self.proc_calls.to_string());
        metrics.insert("gc_calls".to_string(), self.gc_calls.to_string());
        metrics.insert("pressure_events".to_string(), self.pressure_events.to_string());
        metrics.insert("utilization".to_string(), format!("{:.2}", self.utilization));
        metrics
    }
}

/// Metrics exporter for Prometheus format
pub struct MetricsExporter;

impl MetricsExporter {
    /// Export metrics in Prometheus exposition format
    ///
    /// # Examples
    ///
    /// ```
    /// use lru_objectpool::LruPoolManager;
    /// use std::collections::HashMap;
    ///
    /// let manager = LruPoolManager::create();
    ///
    /// let mut tags = HashMap::new();
    /// tags.insert("service".to_string(), "world".to_string());
    ///
    /// let output = manager.export_metrics_prometheus("npc_cache", Some(&tags));
    /// assert!(output.contains("lrupool_items_pooled"));
    /// assert!(output.contains("service=\"world\""));
    /// ```
    pub fn export_prometheus(
        metrics: &ManagerMetrics,
        manager_name: &str,
        tags: Option<&HashMap<String, String>>,
    ) -> String {
        let mut output = String::new();
        let labels = Self::format_labels(manager_name, tags);

        // Gauge metrics
        output.push_str("# HELP lrupool_items_pooled Objects currently pooled\n");
        output.push_str("# TYPE lrupool_items_pooled gauge\n");
        output.push_str(&format!("lrupool_items_pooled{{{}}} {}\n", labels, metrics.item_count));

        output.push_str("# HELP lrupool_item_max_bound Pooled object count that triggers eviction\n");
        output.push_str("# TYPE lrupool_item_max_bound gauge\n");
        output.push_str(&format!("lrupool_item_max_bound{{{}}} {}\n", labels, metrics.item_max_bound));

        output.push_str("# HELP lrupool_item_min_bound Objects kept by a manual GC\n");
        output.push_str("# TYPE lrupool_item_min_bound gauge\n");
        output.push_str(&format!("lrupool_item_min_bound{{{}}} {}\n", labels, metrics.item_min_bound));

        output.push_str("# HELP lrupool_utilization Pooled objects against the max bound\n");
        output.push_str("# TYPE lrupool_utilization gauge\n");
        output.push_str(&format!("lrupool_utilization{{{}}} {:.2}\n", labels, metrics.utilization));

        // Counter metrics
        output.push_str("# HELP lrupool_items_reclaimed_total Objects evicted\n");
        output.push_str("# TYPE lrupool_items_reclaimed_total counter\n");
        output.push_str(&format!("lrupool_items_reclaimed_total{{{}}} {}\n", labels, metrics.total_reclaimed));

        output.push_str("# HELP lrupool_entries_expired_total Check-list entries of dropped pools\n");
        output.push_str("# TYPE lrupool_entries_expired_total counter\n");
        output.push_str(&format!("lrupool_entries_expired_total{{{}}} {}\n", labels, metrics.expired_entries));

        output.push_str("# HELP lrupool_proc_calls_total Processing calls\n");
        output.push_str("# TYPE lrupool_proc_calls_total counter\n");
        output.push_str(&format!("lrupool_proc_calls_total{{{}}} {}\n", labels, metrics.proc_calls));

        output.push_str("# HELP lrupool_gc_calls_total Manual GC calls\n");
        output.push_str("# TYPE lrupool_gc_calls_total counter\n");
        output.push_str(&format!("lrupool_gc_calls_total{{{}}} {}\n", labels, metrics.gc_calls));

        output.push_str("# HELP lrupool_pressure_events_total Pushes over the max bound\n");
        output.push_str("# TYPE lrupool_pressure_events_total counter\n");
        output.push_str(&format!("lrupool_pressure_events_total{{{}}} {}\n", labels, metrics.pressure_events));

        output
    }

    fn format_labels(manager_name: &str, tags: Option<&HashMap<String, String>>) -> String {
        let mut labels = vec![format!("manager=\"{}\"", manager_name)];

        if let Some(tags) = tags {
            for (key, value) in tags {
                labels.push(format!("{}=\"{}\"", key, value));
            }
        }

        labels.join(",")
    }
}

/// Internal metrics tracker
pub(crate) struct MetricsTracker {
    pub total_reclaimed: AtomicUsize,
    pub expired_entries: AtomicUsize,
    pub proc_calls: AtomicUsize,
    pub gc_calls: AtomicUsize,
    pub pressure_events: AtomicUsize,
}

impl MetricsTracker {
    pub fn new() -> Self {
        Self {
            total_reclaimed: AtomicUsize::new(0),
            expired_entries: AtomicUsize::new(0),
            proc_calls: AtomicUsize::new(0),
            gc_calls: AtomicUsize::new(0),
            pressure_events: AtomicUsize::new(0),
        }
    }

    pub fn record_reclaimed(&self, n: usize) {
        self.total_reclaimed.fetch_add(n, Ordering::Relaxed);
    }

    pub fn increment(counter: &AtomicUsize) {
        counter.fetch_add(1, Ordering::Relaxed);
    }
}

impl Default for MetricsTracker {
    fn default() -> Self {
        Self::new()
    }
}

/// Hook call counts collected by [`CountingAction`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ActionMetrics {
    pub pushed: usize,
    pub pulled: usize,
    pub reset: usize,
    pub collected: usize,
}

impl ActionMetrics {
    /// Export metrics as a HashMap
    pub fn export(&self) -> HashMap<String, String> {
        let mut metrics = HashMap::new();
        metrics.insert("pushed".to_string(), self.pushed.to_string());
        metrics.insert("pulled".to_string(), self.pulled.to_string());
        metrics.insert("reset".to_string(), self.reset.to_string());
        metrics.insert("collected".to_string(), self.collected.to_string());
        metrics
    }
}

/// Hooks that count how often each event fires
///
/// # Examples
///
/// ```
/// use lru_objectpool::{CountingAction, LruPool, LruPoolManager};
/// use std::rc::Rc;
///
/// let counters = Rc::new(CountingAction::new());
/// let mut pool = LruPool::with_action(Rc::clone(&counters));
/// pool.init(LruPoolManager::create());
///
/// pool.push(7u32, [0u8; 64]).unwrap();
/// pool.pull(&7).unwrap();
///
/// let metrics = counters.get_metrics();
/// assert_eq!(metrics.pushed, 1);
/// assert_eq!(metrics.pulled, 1);
/// assert_eq!(metrics.reset, 1);
/// ```
#[derive(Debug, Default)]
pub struct CountingAction {
    pushed: Cell<usize>,
    pulled: Cell<usize>,
    reset: Cell<usize>,
    collected: Cell<usize>,
}

impl CountingAction {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_metrics(&self) -> ActionMetrics {
        ActionMetrics {
            pushed: self.pushed.get(),
            pulled: self.pulled.get(),
            reset: self.reset.get(),
            collected: self.collected.get(),
        }
    }

    /// Zero every counter
    pub fn clear(&self) {
        self.pushed.set(0);
        self.pulled.set(0);
        self.reset.set(0);
        self.collected.set(0);
    }
}

fn bump(counter: &Cell<usize>) {
    counter.set(counter.get() + 1);
}

impl<T> LruAction<T> for CountingAction {
    fn push(&self, _obj: &mut T) {
        bump(&self.pushed);
    }

    fn pull(&self, _obj: &mut T) {
        bump(&self.pulled);
    }

    fn reset(&self, _obj: &mut T) {
        bump(&self.reset);
    }

    fn gc(&self, _obj: &mut T) {
        bump(&self.collected);
    }
}
