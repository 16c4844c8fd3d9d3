//! The crate: a bounded buffer of fruit slots shared by pickers and the
//! loader.

use tokio::sync::{Mutex, MutexGuard};

use crate::tree::FruitId;

/// Result of emptying the crate: how many slots were occupied and the
/// fruits they held, in slot order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Drained {
    pub count: usize,
    pub fruits: Vec<FruitId>,
}

/// The staging crate. Slots fill contiguously from 1 up to the capacity
/// fixed at construction; emptying frees all of them at once.
///
/// The crate itself does no blocking admission control. Callers are
/// expected to hold a free-slot permit before storing, which is what keeps
/// [`CrateGuard::store`] from ever seeing a full crate.
pub struct Crate {
    slots: Mutex<Vec<FruitId>>,
    capacity: usize,
}

impl Crate {
    pub fn new(capacity: usize) -> Self {
        Self {
            slots: Mutex::new(Vec::with_capacity(capacity)),
            capacity,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Acquire the crate lock, waiting until it is free.
    pub async fn lock(&self) -> CrateGuard<'_> {
        CrateGuard {
            slots: self.slots.lock().await,
            capacity: self.capacity,
        }
    }
}

/// Exclusive access to the crate.
pub struct CrateGuard<'a> {
    slots: MutexGuard<'a, Vec<FruitId>>,
    capacity: usize,
}

impl CrateGuard<'_> {
    /// Store one fruit in the next free slot and return the 1-based slot
    /// number just filled.
    ///
    /// Panics if every slot is already occupied. A store past capacity
    /// means a picker got here without a slot permit, and the run cannot
    /// be trusted after that.
    pub fn store(&mut self, fruit: FruitId) -> usize {
        assert!(
            self.slots.len() < self.capacity,
            "store into a full crate: {} fruits in {} slots",
            self.slots.len(),
            self.capacity,
        );
        self.slots.push(fruit);
        self.slots.len()
    }

    pub fn occupied(&self) -> usize {
        self.slots.len()
    }

    pub fn is_full(&self) -> bool {
        self.slots.len() == self.capacity
    }

    /// Empty every slot, returning what was held.
    pub fn drain(&mut self) -> Drained {
        let fruits: Vec<FruitId> = self.slots.drain(..).collect();
        Drained {
            count: fruits.len(),
            fruits,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn slots_fill_contiguously_from_one() {
        let krate = Crate::new(3);
        let mut guard = krate.lock().await;

        assert_eq!(guard.store(FruitId(7)), 1);
        assert_eq!(guard.store(FruitId(2)), 2);
        assert_eq!(guard.store(FruitId(9)), 3);
        assert_eq!(guard.occupied(), 3);
        assert!(guard.is_full());
    }

    #[tokio::test]
    async fn drain_returns_fruits_in_slot_order_and_resets() {
        let krate = Crate::new(4);
        let mut guard = krate.lock().await;
        guard.store(FruitId(5));
        guard.store(FruitId(1));

        let drained = guard.drain();
        assert_eq!(drained.count, 2);
        assert_eq!(drained.fruits, vec![FruitId(5), FruitId(1)]);
        assert_eq!(guard.occupied(), 0);
        assert!(!guard.is_full());
    }

    #[tokio::test]
    async fn drain_of_empty_crate_is_empty() {
        let krate = Crate::new(2);
        let mut guard = krate.lock().await;
        let drained = guard.drain();
        assert_eq!(drained.count, 0);
        assert!(drained.fruits.is_empty());
    }

    #[tokio::test]
    #[should_panic(expected = "store into a full crate")]
    async fn storing_past_capacity_panics() {
        let krate = Crate::new(1);
        let mut guard = krate.lock().await;
        guard.store(FruitId(1));
        guard.store(FruitId(2));
    }
}
