//! Run parameters.

/// Fruits on the tree when no count is given.
pub const DEFAULT_FRUITS: u32 = 26;

/// Picker workers when no count is given.
pub const DEFAULT_PICKERS: u32 = 3;

/// Crate slots when no capacity is given.
pub const DEFAULT_CAPACITY: usize = 12;

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("at least one picker is required")]
    NoPickers,
    #[error("crate capacity must be at least 1")]
    NoCapacity,
}

/// Parameters of one simulation run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrchardConfig {
    /// Fruits initially on the tree, numbered `1..=fruits`.
    pub fruits: u32,
    /// Number of picker workers.
    pub pickers: u32,
    /// Crate slots.
    pub capacity: usize,
    /// Seed for fruit selection. `None` draws from entropy; with a seed,
    /// each picker derives its own generator from the seed and its id.
    pub seed: Option<u64>,
}

impl Default for OrchardConfig {
    fn default() -> Self {
        Self {
            fruits: DEFAULT_FRUITS,
            pickers: DEFAULT_PICKERS,
            capacity: DEFAULT_CAPACITY,
            seed: None,
        }
    }
}

impl OrchardConfig {
    pub fn new(fruits: u32, pickers: u32, capacity: usize) -> Self {
        Self {
            fruits,
            pickers,
            capacity,
            seed: None,
        }
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// A run needs at least one picker and one slot. Zero fruits is fine:
    /// the pickers exit immediately and the loader has nothing to drain.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.pickers == 0 {
            return Err(ConfigError::NoPickers);
        }
        if self.capacity == 0 {
            return Err(ConfigError::NoCapacity);
        }
        Ok(())
    }
}
