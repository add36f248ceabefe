//! Manager configuration options

use crate::Tick;

/// Configuration for [`LruPoolManager`](crate::LruPoolManager) behavior
///
/// # Examples
///
/// ```
/// use lru_objectpool::{LruPoolManager, ManagerConfiguration};
///
/// let config = ManagerConfiguration::new()
///     .with_item_max_bound(128)
///     .with_proc_item_count(16)
///     .with_list_tick_timeout(60);
///
/// let manager = LruPoolManager::with_config(&config);
/// assert_eq!(manager.item_max_bound(), 128);
/// assert_eq!(manager.proc_item_count(), 16);
/// assert_eq!(manager.list_tick_timeout(), 60);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct ManagerConfiguration {
    /// Objects kept back when a manual GC runs
    pub item_min_bound: usize,

    /// Pooled object count above which a push triggers eviction
    pub item_max_bound: usize,

    /// Maximum number of objects evicted by one `proc` call
    pub proc_item_count: usize,

    /// Floor the adaptive max bound never shrinks below
    pub item_adjust_min: usize,

    /// Ceiling the adaptive max bound never grows past
    pub item_adjust_max: usize,

    /// Staleness window in caller ticks, 0 disables time based eviction
    pub list_tick_timeout: Tick,
}

impl Default for ManagerConfiguration {
    fn default() -> Self {
        Self {
            item_min_bound: 0,
            item_max_bound: 1024,
            proc_item_count: usize::MAX,
            item_adjust_min: 256,
            item_adjust_max: usize::MAX,
            list_tick_timeout: 0,
        }
    }
}

impl ManagerConfiguration {
    /// Create a new configuration with default values
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_item_min_bound(mut self, bound: usize) -> Self {
        self.item_min_bound = bound;
        self
    }

    pub fn with_item_max_bound(mut self, bound: usize) -> Self {
        self.item_max_bound = bound;
        self
    }

    /// Cap the evictions done by a single `proc` call
    pub fn with_proc_item_count(mut self, count: usize) -> Self {
        self.proc_item_count = count;
        self
    }

    /// Set the floor and ceiling the adaptive max bound moves between
    ///
    /// # Examples
    ///
    /// ```
    /// use lru_objectpool::ManagerConfiguration;
    ///
    /// let config = ManagerConfiguration::new().with_item_adjust(8, 64);
    ///
    /// assert_eq!(config.item_adjust_min, 8);
    /// assert_eq!(config.item_adjust_max, 64);
    /// ```
    pub fn with_item_adjust(mut self, min: usize, max: usize) -> Self {
        self.item_adjust_min = min;
        self.item_adjust_max = max;
        self
    }

    pub fn with_list_tick_timeout(mut self, timeout: Tick) -> Self {
        self.list_tick_timeout = timeout;
        self
    }
}
