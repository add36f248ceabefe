//! # lru_objectpool
//!
//! Size-adaptive LRU object pools that share one global capacity budget.
//!
//! ## Features
//!
//! - Per-type pools keyed by any hashable key, LIFO per key
//! - One shared manager counting idle objects across every pool
//! - Eviction of the globally least recently pooled objects first
//! - Max bound that grows under sustained pressure and shrinks on manual GC
//! - Tick based staleness window driven by the caller's own clock
//! - Bounded work per processing call
//! - Lifecycle hooks for telemetry and object cleanup
//! - Metrics and Prometheus export, health status
//! - Optional tokio task driving periodic processing
//!
//! ## Quick Start
//!
//! ```rust
//! use lru_objectpool::{LruPool, LruPoolManager};
//!
//! let manager = LruPoolManager::create();
//!
//! let mut buffers: LruPool<usize, Vec<u8>> = LruPool::new();
//! buffers.init(manager.clone());
//!
//! let buf = buffers.pull(&1024).unwrap_or_else(|| Vec::with_capacity(1024));
//! // ... use the buffer ...
//! buffers.push(1024, buf).unwrap();
//!
//! // Once per frame
//! manager.proc(1);
//! assert_eq!(manager.item_count(), 1);
//! ```

mod action;
mod check_list;
mod config;
mod driver;
mod errors;
mod eviction;
mod health;
mod manager;
mod metrics;
mod pool;

/// Caller defined time unit used for staleness checks
pub type Tick = i64;

pub use action::{DefaultAction, LruAction};
pub use check_list::CheckHandle;
pub use config::ManagerConfiguration;
pub use driver::spawn_proc_task;
pub use errors::{PoolError, PushError};
pub use eviction::{AdaptiveBounds, StalenessWindow};
pub use health::HealthStatus;
pub use manager::{CheckedList, LruPoolManager};
pub use metrics::{ActionMetrics, CountingAction, ManagerMetrics, MetricsExporter};
pub use pool::LruPool;
