// lru_objectpool demo
// Simulates a few server frames recycling two kinds of objects through one
// shared manager.

use std::rc::Rc;

use lru_objectpool::{CountingAction, LruPool, LruPoolManager, ManagerConfiguration};
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

#[derive(Debug, Default)]
struct Packet {
    payload: Vec<u8>,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::DEBUG)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    info!("lru_objectpool v{}", env!("CARGO_PKG_VERSION"));

    let config = ManagerConfiguration::new()
        .with_item_max_bound(16)
        .with_item_adjust(4, 32)
        .with_proc_item_count(8)
        .with_list_tick_timeout(3);
    let manager = LruPoolManager::with_config(&config);

    let packet_hooks = Rc::new(CountingAction::new());
    let mut packets: LruPool<usize, Packet, Rc<CountingAction>> =
        LruPool::with_action(Rc::clone(&packet_hooks));
    packets.init(manager.clone());

    let mut names: LruPool<&str, String> = LruPool::new();
    names.init(manager.clone());

    for frame in 1..=10 {
        manager.proc(frame);

        for size in [64usize, 256, 1024] {
            let mut packet = packets.pull(&size).unwrap_or_default();
            packet.payload.resize(size, 0);
            packets.push(size, packet)?;
            packets.push(size, Packet::default())?;
        }

        if frame <= 2 {
            names.push("npc", format!("npc-{frame}"))?;
        }

        info!(
            frame,
            pooled = manager.item_count(),
            max_bound = manager.item_max_bound(),
            "frame done"
        );
    }

    info!(collected = manager.gc(), "manual gc");

    let health = manager.get_health_status();
    info!(healthy = health.is_healthy(), warnings = ?health.warnings, "health");

    for (key, value) in packet_hooks.get_metrics().export() {
        info!("packet hook {}: {}", key, value);
    }
    print!("{}", manager.export_metrics_prometheus("demo", None));

    Ok(())
}
