use std::rc::Rc;
use std::time::Duration;

use lru_objectpool::{LruPool, LruPoolManager, ManagerConfiguration, spawn_proc_task};
use tokio::task::LocalSet;

#[tokio::test]
async fn test_proc_task_evicts_stale_objects() {
    let local = LocalSet::new();
    local
        .run_until(async {
            let manager = LruPoolManager::with_config(
                &ManagerConfiguration::new().with_list_tick_timeout(2),
            );
            let mut pool: LruPool<u8, String> = LruPool::new();
            pool.init(manager.clone());

            for key in 0..4 {
                pool.push(key, format!("idle-{key}")).unwrap();
            }

            let task = spawn_proc_task(Rc::downgrade(&manager), Duration::from_millis(1));
            tokio::time::sleep(Duration::from_millis(100)).await;

            assert_eq!(manager.item_count(), 0);
            assert_eq!(pool.size(), 0);
            assert!(manager.last_proc_tick() > 2);

            drop(pool);
            drop(manager);
            assert_eq!(task.await.unwrap(), 4);
        })
        .await;
}

#[tokio::test]
async fn test_proc_task_finishes_pending_pass() {
    let local = LocalSet::new();
    local
        .run_until(async {
            let manager = LruPoolManager::create();
            let mut pool: LruPool<u8, u64> = LruPool::new();
            pool.init(manager.clone());

            for value in 0..10 {
                pool.push(0, value).unwrap();
            }
            manager.set_proc_item_count(2);
            manager.set_item_max_bound(4);
            pool.push(0, 10).unwrap();

            // 11 pooled, only 2 evicted within the push
            assert_eq!(manager.item_count(), 9);
            assert_eq!(manager.gc_item(), 4);

            let task = spawn_proc_task(Rc::downgrade(&manager), Duration::from_millis(1));
            tokio::time::sleep(Duration::from_millis(100)).await;

            assert_eq!(manager.item_count(), 4);
            assert_eq!(manager.gc_item(), 0);
            assert_eq!(pool.pull(&0), Some(10));

            drop(pool);
            drop(manager);
            assert_eq!(task.await.unwrap(), 5);
        })
        .await;
}
