//! Loader worker: drains full crates, and the final partial crate at
//! shutdown.

use std::sync::Arc;
use std::sync::atomic::Ordering;

use crate::engine::{EngineError, Resources};
use crate::events::{Worker, WorkerState};

/// Run the loader to completion.
///
/// The loader wakes once per full-crate signal, plus exactly once more for
/// the shutdown signal the coordinator releases after the last picker has
/// exited. The shutdown flag is read under the crate lock; since the flag
/// only goes up once every picker is gone, a set flag means no store can be
/// in flight and the partial-vs-full decision below is race free.
pub(crate) async fn run_loader(res: Arc<Resources>) -> Result<(), EngineError> {
    let me = Worker::Loader;
    let capacity = res.krate.capacity();
    let mut crates_loaded = 0u32;

    loop {
        res.bus.record(me, WorkerState::WaitingFull);
        res.full_crates.acquire().await?.forget();
        res.bus.record(me, WorkerState::GotFull);

        res.bus.record(me, WorkerState::WaitingCrate);
        let mut krate = res.krate.lock().await;
        res.bus.record(me, WorkerState::AcquiredCrate);

        // A full crate is a real pending signal even when the shutdown
        // flag is already up; only a strictly partial crate is terminal.
        if res.done.load(Ordering::SeqCst) && !krate.is_full() {
            if krate.occupied() > 0 {
                let drained = krate.drain();
                res.bus.record(me, WorkerState::Partial(drained.fruits));
            }
            res.bus.record(me, WorkerState::Exiting);
            drop(krate);
            break;
        }

        let drained = krate.drain();
        assert_eq!(
            drained.count, capacity,
            "full-crate signal for a crate holding {} of {} fruits",
            drained.count, capacity,
        );
        res.bus.record(me, WorkerState::Loading(drained.fruits));
        res.bus.record(me, WorkerState::EmptiedCrate);
        drop(krate);

        // Freed slots are handed back outside the crate lock, so a picker
        // woken by a new permit contends for the lock normally.
        for _ in 0..capacity {
            res.free_slots.add_permits(1);
        }
        res.bus.record(me, WorkerState::ResetSlots);
        crates_loaded += 1;
    }

    tracing::debug!(crates_loaded, "Loader done");
    Ok(())
}
