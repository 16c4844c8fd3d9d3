//! orchard: a bounded-crate producer/consumer simulation engine.
//!
//! N picker workers move uniquely numbered fruits from a shared tree into
//! a capacity-limited crate; one loader drains the crate each time it
//! fills and, at shutdown, drains the final partial crate exactly once.
//! Two counting semaphores coordinate the hand-off: `free_slots` admits
//! pickers, `full_crates` wakes the loader.
//!
//! Every state transition is broadcast as one fixed-width snapshot row on
//! the event stream, which an external visualizer (or the companion
//! `orchard-replay` crate) parses back. Stdout carries that stream;
//! diagnostics go to stderr via `tracing`.

mod bus;
mod loader;
mod picker;

pub mod config;
pub mod engine;
pub mod events;
pub mod storage;
pub mod tree;

pub use config::{ConfigError, OrchardConfig};
pub use engine::{EngineError, Simulation};
pub use events::{COLUMN_WIDTH, Worker, WorkerState};
pub use tree::FruitId;
