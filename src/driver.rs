//! Periodic `proc` driver for tokio local task sets

use std::rc::Weak;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{self, MissedTickBehavior};
use tracing::debug;

use crate::manager::LruPoolManager;

/// Spawn a local task calling [`LruPoolManager::proc`] once per `period`.
///
/// The tick passed to `proc` is a frame counter continuing from the
/// manager's [`last_proc_tick`](LruPoolManager::last_proc_tick), so
/// `list_tick_timeout` is measured in periods. The task holds only a weak
/// reference and finishes once the manager is dropped, yielding the total
/// number of objects it evicted.
///
/// Must be called from within a [`tokio::task::LocalSet`].
///
/// # Examples
///
/// ```
/// use lru_objectpool::{LruPool, LruPoolManager, spawn_proc_task};
/// use std::rc::Rc;
/// use std::time::Duration;
///
/// # tokio::runtime::Builder::new_current_thread().enable_time().build().unwrap().block_on(async {
/// let local = tokio::task::LocalSet::new();
/// local.run_until(async {
///     let manager = LruPoolManager::create();
///     manager.set_list_tick_timeout(1);
///
///     let mut pool = LruPool::new();
///     pool.init(manager.clone());
///     pool.push(0u8, "idle").unwrap();
///
///     let task = spawn_proc_task(Rc::downgrade(&manager), Duration::from_millis(1));
///     tokio::time::sleep(Duration::from_millis(50)).await;
///     assert_eq!(pool.size(), 0);
///
///     drop(pool);
///     drop(manager);
///     assert_eq!(task.await.unwrap(), 1);
/// }).await;
/// # });
/// ```
pub fn spawn_proc_task(manager: Weak<LruPoolManager>, period: Duration) -> JoinHandle<usize> {
    tokio::task::spawn_local(async move {
        let mut interval = time::interval(period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let mut reclaimed = 0;
        loop {
            interval.tick().await;

            let Some(manager) = manager.upgrade() else {
                break;
            };

            let tick = manager.last_proc_tick().wrapping_add(1);
            reclaimed += manager.proc(tick);
        }

        debug!(reclaimed, "lru pool proc task finished");
        reclaimed
    })
}
