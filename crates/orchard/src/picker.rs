//! Picker worker: the producer side of the crate.

use std::sync::Arc;

use rand::rngs::SmallRng;

use crate::engine::{EngineError, Resources};
use crate::events::{Worker, WorkerState};

/// Run one picker to completion.
///
/// Each cycle moves one fruit from the tree into the crate. The picker
/// exits when it finds the tree bare. Every acquisition is announced with
/// its `waiting` state first, unconditionally, so the stream always shows
/// the same shape whether or not the resource was contended.
pub(crate) async fn run_picker(
    id: u32,
    res: Arc<Resources>,
    mut rng: SmallRng,
) -> Result<(), EngineError> {
    let me = Worker::Picker(id);
    let mut picked = 0u32;

    loop {
        res.bus.record(me, WorkerState::WaitingTree);
        let mut tree = res.tree.lock().await;
        res.bus.record(me, WorkerState::AcquiredTree);

        let fruit = match tree.pick_random(&mut rng) {
            Some(fruit) => {
                // Announced under the tree lock so no other picker can
                // claim a fruit between the pick and its broadcast.
                res.bus.record(me, WorkerState::Picked(fruit));
                drop(tree);
                fruit
            }
            None => {
                drop(tree);
                break;
            }
        };
        picked += 1;

        res.bus.record(me, WorkerState::WaitingSlot);
        res.free_slots.acquire().await?.forget();
        res.bus.record(me, WorkerState::GotSlot);

        res.bus.record(me, WorkerState::WaitingCrate);
        let mut krate = res.krate.lock().await;
        res.bus.record(me, WorkerState::AcquiredCrate);

        let slot = krate.store(fruit);
        res.bus.record(me, WorkerState::Stored { fruit, slot });

        // The full check and the signal happen under the crate lock, so
        // the loader can never observe a crate that is both full and
        // already being refilled.
        if slot == res.krate.capacity() {
            res.bus.record(me, WorkerState::CrateFull);
            res.full_crates.add_permits(1);
        }
    }

    res.bus.record(me, WorkerState::Exiting);
    tracing::debug!(picker = id, picked, "Picker done");
    Ok(())
}
