//! Stream accounting: replays a transcript into counters and checks the
//! conservation properties a complete run must satisfy.

use std::collections::BTreeSet;

use orchard::{FruitId, WorkerState};
use serde::Serialize;

use crate::parse::{parse_state, split_row};

/// A property the stream failed to uphold. The first violation found is
/// the one reported; later ones are usually knock-on effects.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ReplayError {
    #[error("fruit #{0} picked more than once")]
    DuplicatePick(FruitId),
    #[error("fruit #{0} stored more than once")]
    DuplicateStore(FruitId),
    #[error("fruit #{0} drained more than once")]
    DuplicateDrain(FruitId),
    #[error("fruit #{0} drained but never stored")]
    DrainedUnstored(FruitId),
    #[error("fruit #{fruit} stored in slot {slot}, expected slot {expected}")]
    SlotMismatch {
        fruit: FruitId,
        slot: usize,
        expected: usize,
    },
    #[error("drain lists {got:?} but the slots held {expected:?}")]
    DrainOrderMismatch {
        expected: Vec<FruitId>,
        got: Vec<FruitId>,
    },
    #[error("crate held {occupied} fruits with capacity {capacity}")]
    OverCapacity { occupied: usize, capacity: usize },
    #[error("a second partial drain of {0} fruits was announced")]
    SecondPartial(usize),
    #[error("loader exited after only {exited} of {pickers} pickers")]
    LoaderExitedEarly { exited: usize, pickers: usize },
    #[error("loader never exited")]
    NoLoaderExit,
    #[error("only {exited} of {pickers} pickers exited")]
    MissingPickerExits { exited: usize, pickers: usize },
    #[error("normal drain of {size} fruits, expected a full {capacity}")]
    ShortLoad { size: usize, capacity: usize },
    #[error("partial drain of {size} fruits is not smaller than capacity {capacity}")]
    OversizePartial { size: usize, capacity: usize },
    #[error("{seen} distinct fruit ids {phase}, expected {expected}")]
    IdSetMismatch {
        phase: &'static str,
        seen: usize,
        expected: usize,
    },
    #[error("drains account for {total} fruits, expected {expected}")]
    TotalMismatch { total: usize, expected: usize },
}

/// What a finished stream added up to.
///
/// `fruits_loaded` counts every fruit that left the crate, through full
/// loads and the final partial alike. Fields stay in alphabetical order
/// so the serialized form reads the same regardless of map ordering.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub crates_loaded: usize,
    pub fruits_loaded: usize,
    pub full_signals: usize,
    pub partial_fruits: Option<usize>,
    pub pickers: usize,
}

/// Replays snapshot rows, keeping per-worker previous states so that only
/// genuine transitions count. Rows that fail to split or parse are
/// discarded and tallied, never fatal.
pub struct Replay {
    workers: usize,
    prev: Vec<WorkerState>,
    picked: BTreeSet<FruitId>,
    stored: BTreeSet<FruitId>,
    drained: BTreeSet<FruitId>,
    /// Mirror of the crate's slot contents, rebuilt from store events.
    slots: Vec<FruitId>,
    max_occupied: usize,
    full_signals: usize,
    loads: Vec<usize>,
    partial: Option<usize>,
    pickers_exited: usize,
    loader_exited: bool,
    violations: Vec<ReplayError>,
    rows: usize,
    discarded: usize,
}

impl Replay {
    /// A replayer for a run with `pickers` pickers. Column order matches
    /// the engine: pickers 1..=N, then the loader.
    pub fn new(pickers: usize) -> Self {
        let workers = pickers + 1;
        Self {
            workers,
            prev: vec![WorkerState::Idle; workers],
            picked: BTreeSet::new(),
            stored: BTreeSet::new(),
            drained: BTreeSet::new(),
            slots: Vec::new(),
            max_occupied: 0,
            full_signals: 0,
            loads: Vec::new(),
            partial: None,
            pickers_exited: 0,
            loader_exited: false,
            violations: Vec::new(),
            rows: 0,
            discarded: 0,
        }
    }

    /// Feed one line of the stream. Headers, separators, and corrupt
    /// lines are dropped; well-formed rows update the tallies.
    pub fn feed(&mut self, line: &str) {
        let Some(cells) = split_row(line, self.workers) else {
            tracing::debug!(line, "Discarding non-snapshot line");
            self.discarded += 1;
            return;
        };

        let states = cells
            .iter()
            .map(|cell| parse_state(cell))
            .collect::<Option<Vec<_>>>();
        let Some(states) = states else {
            tracing::debug!(line, "Discarding row with unparseable cells");
            self.discarded += 1;
            return;
        };

        self.rows += 1;
        for (column, state) in states.into_iter().enumerate() {
            if state != self.prev[column] {
                self.on_transition(column, &state);
                self.prev[column] = state;
            }
        }
    }

    fn on_transition(&mut self, column: usize, state: &WorkerState) {
        let loader = column == self.workers - 1;
        match state {
            WorkerState::Picked(fruit) if !loader => {
                if !self.picked.insert(*fruit) {
                    self.violations.push(ReplayError::DuplicatePick(*fruit));
                }
            }
            WorkerState::Stored { fruit, slot } if !loader => {
                let expected = self.slots.len() + 1;
                if *slot != expected {
                    self.violations.push(ReplayError::SlotMismatch {
                        fruit: *fruit,
                        slot: *slot,
                        expected,
                    });
                }
                if !self.stored.insert(*fruit) {
                    self.violations.push(ReplayError::DuplicateStore(*fruit));
                }
                self.slots.push(*fruit);
                self.max_occupied = self.max_occupied.max(self.slots.len());
            }
            WorkerState::CrateFull if !loader => {
                self.full_signals += 1;
            }
            WorkerState::Loading(fruits) if loader => {
                self.absorb_drain(fruits);
                self.loads.push(fruits.len());
            }
            WorkerState::Partial(fruits) if loader => {
                self.absorb_drain(fruits);
                if self.partial.replace(fruits.len()).is_some() {
                    self.violations
                        .push(ReplayError::SecondPartial(fruits.len()));
                }
            }
            WorkerState::Exiting => {
                if loader {
                    self.loader_exited = true;
                    if self.pickers_exited != self.workers - 1 {
                        self.violations.push(ReplayError::LoaderExitedEarly {
                            exited: self.pickers_exited,
                            pickers: self.workers - 1,
                        });
                    }
                } else {
                    self.pickers_exited += 1;
                }
            }
            _ => {}
        }
    }

    fn absorb_drain(&mut self, fruits: &[FruitId]) {
        for fruit in fruits {
            if !self.stored.contains(fruit) {
                self.violations.push(ReplayError::DrainedUnstored(*fruit));
            }
            if !self.drained.insert(*fruit) {
                self.violations.push(ReplayError::DuplicateDrain(*fruit));
            }
        }
        if fruits != self.slots {
            self.violations.push(ReplayError::DrainOrderMismatch {
                expected: self.slots.clone(),
                got: fruits.to_vec(),
            });
        }
        self.slots.clear();
    }

    /// Whether the last snapshot showed every worker exiting, which is
    /// how a consumer knows the stream is over.
    pub fn finished(&self) -> bool {
        self.prev.iter().all(|state| *state == WorkerState::Exiting)
    }

    /// Current crate contents in slot order, as reconstructed from store
    /// events. Empties on each drain.
    pub fn crate_slots(&self) -> &[FruitId] {
        &self.slots
    }

    /// Rows accepted so far.
    pub fn rows(&self) -> usize {
        self.rows
    }

    /// Lines discarded so far, the preamble included.
    pub fn discarded(&self) -> usize {
        self.discarded
    }

    /// Check the whole-run properties for a run of `fruits` fruits and a
    /// crate of `capacity` slots. Call after the stream ends.
    pub fn verify(&self, fruits: u32, capacity: usize) -> Result<(), ReplayError> {
        if let Some(violation) = self.violations.first() {
            return Err(violation.clone());
        }
        if self.max_occupied > capacity {
            return Err(ReplayError::OverCapacity {
                occupied: self.max_occupied,
                capacity,
            });
        }
        if !self.loader_exited {
            return Err(ReplayError::NoLoaderExit);
        }
        if self.pickers_exited != self.workers - 1 {
            return Err(ReplayError::MissingPickerExits {
                exited: self.pickers_exited,
                pickers: self.workers - 1,
            });
        }
        for &size in &self.loads {
            if size != capacity {
                return Err(ReplayError::ShortLoad { size, capacity });
            }
        }
        if let Some(size) = self.partial {
            if size >= capacity {
                return Err(ReplayError::OversizePartial { size, capacity });
            }
        }

        let expected: BTreeSet<FruitId> = (1..=fruits).map(FruitId).collect();
        for (phase, seen) in [
            ("picked", &self.picked),
            ("stored", &self.stored),
            ("drained", &self.drained),
        ] {
            if *seen != expected {
                return Err(ReplayError::IdSetMismatch {
                    phase,
                    seen: seen.len(),
                    expected: expected.len(),
                });
            }
        }

        let total: usize = self.loads.iter().sum::<usize>() + self.partial.unwrap_or(0);
        if total != fruits as usize {
            return Err(ReplayError::TotalMismatch {
                total,
                expected: fruits as usize,
            });
        }

        Ok(())
    }

    pub fn summary(&self) -> RunSummary {
        RunSummary {
            crates_loaded: self.loads.len(),
            fruits_loaded: self.loads.iter().sum::<usize>() + self.partial.unwrap_or(0),
            full_signals: self.full_signals,
            partial_fruits: self.partial,
            pickers: self.workers - 1,
        }
    }
}
