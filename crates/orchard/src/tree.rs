//! The tree: a shared pool of uniquely numbered fruits.

use rand::Rng;
use tokio::sync::{Mutex, MutexGuard};

/// Identifier of a single fruit, assigned densely from 1 when the tree is
/// planted. Displays as the bare number; event text adds its own `#`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FruitId(pub u32);

impl std::fmt::Display for FruitId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The shared pool of unpicked fruits.
///
/// All access goes through [`Tree::lock`], so holding a [`TreeGuard`] is
/// exclusive ownership of the pool.
pub struct Tree {
    fruits: Mutex<Vec<FruitId>>,
}

impl Tree {
    pub fn new(count: u32) -> Self {
        Self {
            fruits: Mutex::new((1..=count).map(FruitId).collect()),
        }
    }

    /// Acquire the tree lock, waiting until it is free.
    pub async fn lock(&self) -> TreeGuard<'_> {
        TreeGuard(self.fruits.lock().await)
    }
}

/// Exclusive access to the tree.
pub struct TreeGuard<'a>(MutexGuard<'a, Vec<FruitId>>);

impl TreeGuard<'_> {
    /// Remove and return a uniformly random fruit, or `None` when the tree
    /// is bare. An empty tree is the pickers' normal exit condition, not an
    /// error.
    pub fn pick_random(&mut self, rng: &mut impl Rng) -> Option<FruitId> {
        if self.0.is_empty() {
            return None;
        }
        let index = rng.gen_range(0..self.0.len());
        Some(self.0.swap_remove(index))
    }

    pub fn remaining(&self) -> usize {
        self.0.len()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use rand::SeedableRng;
    use rand::rngs::SmallRng;

    use super::*;

    #[tokio::test]
    async fn new_tree_holds_count_fruits() {
        let tree = Tree::new(5);
        assert_eq!(tree.lock().await.remaining(), 5);
    }

    #[tokio::test]
    async fn picking_drains_each_fruit_exactly_once() {
        let tree = Tree::new(8);
        let mut rng = SmallRng::seed_from_u64(1);
        let mut seen = BTreeSet::new();

        let mut guard = tree.lock().await;
        while let Some(fruit) = guard.pick_random(&mut rng) {
            assert!(seen.insert(fruit), "fruit {fruit} picked twice");
        }

        assert_eq!(guard.remaining(), 0);
        let expected: BTreeSet<FruitId> = (1..=8).map(FruitId).collect();
        assert_eq!(seen, expected);
    }

    #[tokio::test]
    async fn empty_tree_yields_none() {
        let tree = Tree::new(0);
        let mut rng = SmallRng::seed_from_u64(1);
        assert_eq!(tree.lock().await.pick_random(&mut rng), None);
    }
}
