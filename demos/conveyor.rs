//! Simulated conveyor pass: items spawn at the left edge, drift right,
//! leave the frame, and get counted exactly once each.
//!
//! Run with `RUST_LOG=debug` to see register/evict breadcrumbs.

use beltrack::bbox::BBox;
use beltrack::{CentroidTracker, Detection, EntityStore, TrackerConfig};

const BELT_LEN: i32 = 640;
const SPEED: i32 = 18;

fn main() {
    env_logger::init();

    let mut tracker = CentroidTracker::new(TrackerConfig::new(5, 50.0));
    let mut store = EntityStore::new();
    let mut totals = [0u32; 3];

    // (class, x, y) of the simulated items currently on the belt
    let mut items: Vec<(i32, i32, i32)> = Vec::new();
    let mut spawned = 0;

    for frame in 0..60 {
        if frame % 12 == 0 && spawned < 5 {
            items.push((spawned % 3, 12, 160 + (spawned % 3) * 80));
            spawned += 1;
        }

        for item in items.iter_mut() {
            item.1 += SPEED;
        }
        items.retain(|item| item.1 < BELT_LEN);

        let dets: Vec<Detection> = items
            .iter()
            .map(|&(class, x, y)| Detection::new(class, BBox::ltwh(x - 12, y - 12, 24, 24)))
            .collect();

        let live = tracker.update(&dets).unwrap().clone();
        let evicted = store.reconcile(&live, &dets);

        let uncounted: Vec<u32> = store
            .all()
            .values()
            .filter(|e| !e.is_counted())
            .map(|e| e.id)
            .collect();

        for id in uncounted {
            if let Some(entity) = store.get_mut(id) {
                totals[entity.class as usize] += 1;
                entity.mark_counted();
            }
        }

        println!(
            "frame {:2}: {:2} live, {} left the belt, positions {}",
            frame,
            live.len(),
            evicted.len(),
            serde_json::to_string(&live.values().collect::<Vec<_>>()).unwrap(),
        );
    }

    println!("totals by class: {:?}", totals);
}
