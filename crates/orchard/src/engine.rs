//! Simulation engine: shared resources, worker spawning, and the shutdown
//! handshake.

use std::io::{self, Write};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use rand::SeedableRng;
use rand::rngs::SmallRng;
use tokio::sync::Semaphore;

use crate::bus::EventBus;
use crate::config::{ConfigError, OrchardConfig};
use crate::loader::run_loader;
use crate::picker::run_picker;
use crate::storage::Crate;
use crate::tree::Tree;

#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    /// A semaphore was closed while a worker waited on it. The engine never
    /// closes its semaphores, so this means the runtime was torn down
    /// underneath the workers.
    #[error("semaphore closed: {0}")]
    Sync(#[from] tokio::sync::AcquireError),
    #[error("worker task failed: {0}")]
    Worker(#[from] tokio::task::JoinError),
}

/// Everything the workers share. Built once per run, handed out behind an
/// `Arc`.
pub(crate) struct Resources {
    pub(crate) tree: Tree,
    pub(crate) krate: Crate,
    /// Counts free crate slots. Pickers take (and forget) one per store;
    /// the loader returns a capacity's worth after each drain.
    pub(crate) free_slots: Semaphore,
    /// Counts drain-ready crates. Starts at zero; pickers release one per
    /// fill, the coordinator one extra at shutdown.
    pub(crate) full_crates: Semaphore,
    /// Raised by the coordinator once every picker has exited.
    pub(crate) done: AtomicBool,
    pub(crate) bus: EventBus,
}

/// A configured simulation run.
pub struct Simulation {
    config: OrchardConfig,
    out: Box<dyn Write + Send>,
}

impl Simulation {
    /// A simulation writing its event stream to stdout.
    pub fn new(config: OrchardConfig) -> Self {
        Self {
            config,
            out: Box::new(io::stdout()),
        }
    }

    /// Redirect the event stream, e.g. into a buffer for tests or a pipe
    /// to the visualizer.
    pub fn with_writer(mut self, out: Box<dyn Write + Send>) -> Self {
        self.out = out;
        self
    }

    /// Run the simulation to completion.
    ///
    /// Starts the loader first, then every picker, each as its own task.
    /// Once all pickers have been joined the coordinator raises the done
    /// flag and releases one extra full-crate permit, so the loader is
    /// guaranteed a final wakeup in which it drains any partial crate and
    /// exits. A failed worker never leaves the other side parked: the
    /// handshake runs whether or not the pickers succeeded.
    pub async fn run(self) -> Result<(), EngineError> {
        let config = self.config;
        config.validate()?;

        tracing::info!(
            fruits = config.fruits,
            pickers = config.pickers,
            capacity = config.capacity,
            seed = ?config.seed,
            "Starting orchard run"
        );

        let res = Arc::new(Resources {
            tree: Tree::new(config.fruits),
            krate: Crate::new(config.capacity),
            free_slots: Semaphore::new(config.capacity),
            full_crates: Semaphore::new(0),
            done: AtomicBool::new(false),
            bus: EventBus::new(config.pickers, self.out),
        });
        res.bus.emit_preamble();

        let loader = tokio::spawn(run_loader(Arc::clone(&res)));

        let mut pickers = Vec::with_capacity(config.pickers as usize);
        for id in 1..=config.pickers {
            let rng = match config.seed {
                Some(seed) => SmallRng::seed_from_u64(seed.wrapping_add(id as u64)),
                None => SmallRng::from_entropy(),
            };
            pickers.push(tokio::spawn(run_picker(id, Arc::clone(&res), rng)));
        }

        let mut failure: Option<EngineError> = None;
        for handle in pickers {
            if let Err(e) = flatten(handle.await) {
                tracing::error!(error = %e, "Picker failed");
                failure.get_or_insert(e);
            }
        }

        // All pickers are gone; from here the crate can only be drained.
        res.done.store(true, Ordering::SeqCst);
        res.full_crates.add_permits(1);

        if let Err(e) = flatten(loader.await) {
            tracing::error!(error = %e, "Loader failed");
            failure.get_or_insert(e);
        }

        match failure {
            Some(e) => Err(e),
            None => {
                tracing::info!("Orchard run complete");
                Ok(())
            }
        }
    }
}

fn flatten(
    joined: Result<Result<(), EngineError>, tokio::task::JoinError>,
) -> Result<(), EngineError> {
    joined.map_err(EngineError::from)?
}
