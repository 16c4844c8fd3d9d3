//! Event broadcaster: the one channel through which the outside world
//! watches the simulation.
//!
//! The bus keeps the last announced state of every worker and, on each
//! transition, writes one snapshot row covering all of them. Its lock is
//! strictly innermost: workers may hold the tree or crate lock while
//! recording, and nothing in here acquires either, so the announce-inside-
//! the-critical-section pattern in the workers cannot deadlock.

use std::io::Write;
use std::sync::{Mutex, MutexGuard};

use crate::events::{COLUMN_WIDTH, Worker, WorkerState};

pub struct EventBus {
    inner: Mutex<BusInner>,
}

struct BusInner {
    workers: Vec<Worker>,
    states: Vec<WorkerState>,
    out: Box<dyn Write + Send>,
}

impl EventBus {
    /// Build a bus for `pickers` pickers plus the loader, writing snapshot
    /// rows to `out`. Column order is pickers 1..=N, then the loader.
    pub fn new(pickers: u32, out: Box<dyn Write + Send>) -> Self {
        let workers: Vec<Worker> = (1..=pickers)
            .map(Worker::Picker)
            .chain([Worker::Loader])
            .collect();
        let states = vec![WorkerState::Idle; workers.len()];
        Self {
            inner: Mutex::new(BusInner {
                workers,
                states,
                out,
            }),
        }
    }

    /// Write the header row and the separator line that precede the
    /// event stream.
    pub fn emit_preamble(&self) {
        let mut inner = self.lock_inner();
        let header = inner
            .workers
            .iter()
            .map(|worker| center(&worker.to_string()))
            .collect::<Vec<_>>()
            .join(" | ");
        let separator = "-".repeat(header.len());
        if let Err(e) = writeln!(inner.out, "{header}\n{separator}") {
            tracing::warn!(error = %e, "Failed to write stream preamble");
        }
    }

    /// Record one state transition and broadcast the resulting snapshot
    /// row. A failed write is logged and dropped; the simulation itself
    /// never stalls on a slow or broken consumer.
    pub fn record(&self, worker: Worker, state: WorkerState) {
        let mut inner = self.lock_inner();
        tracing::debug!(worker = %worker, state = %state, "Transition");

        let column = match worker {
            Worker::Picker(id) => (id as usize) - 1,
            Worker::Loader => inner.states.len() - 1,
        };
        inner.states[column] = state;

        let row = inner
            .states
            .iter()
            .map(|state| center(&state.to_string()))
            .collect::<Vec<_>>()
            .join(" | ");
        if let Err(e) = writeln!(inner.out, "{row}") {
            tracing::warn!(error = %e, "Failed to write snapshot row");
        }
    }

    fn lock_inner(&self) -> MutexGuard<'_, BusInner> {
        match self.inner.lock() {
            Ok(guard) => guard,
            Err(poisoned) => {
                tracing::error!("Event bus mutex poisoned, continuing with last known states");
                poisoned.into_inner()
            }
        }
    }
}

/// Center `text` in a cell of at least [`COLUMN_WIDTH`] characters. Longer
/// text is kept whole. Takes the state already formatted to a plain string
/// because custom `Display` impls ignore a `{:^width$}` applied to them.
fn center(text: &str) -> String {
    format!("{text:^width$}", width = COLUMN_WIDTH)
}

#[cfg(test)]
mod tests {
    use std::io;
    use std::sync::{Arc, Mutex};

    use crate::tree::FruitId;

    use super::*;

    #[derive(Clone, Default)]
    struct SharedBuf(Arc<Mutex<Vec<u8>>>);

    impl SharedBuf {
        fn contents(&self) -> String {
            String::from_utf8(self.0.lock().unwrap().clone()).unwrap()
        }
    }

    impl io::Write for SharedBuf {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn center_pads_to_column_width() {
        assert_eq!(center("idle"), "     idle      ");
        assert_eq!(center("waiting tree"), " waiting tree  ");
        assert_eq!(center("stored #8 in 3"), "stored #8 in 3 ");
        // Wider than a column: kept whole, never truncated.
        assert_eq!(center("stored #12 in 10"), "stored #12 in 10");
    }

    #[test]
    fn preamble_is_header_then_full_width_separator() {
        let buf = SharedBuf::default();
        let bus = EventBus::new(1, Box::new(buf.clone()));
        bus.emit_preamble();

        let out = buf.contents();
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0], concat!("   Picker-1    ", " | ", "    Loader     "));
        assert_eq!(lines[1], "-".repeat(lines[0].len()));
    }

    #[test]
    fn record_rewrites_the_whole_row() {
        let buf = SharedBuf::default();
        let bus = EventBus::new(2, Box::new(buf.clone()));

        bus.record(Worker::Picker(2), WorkerState::WaitingTree);
        bus.record(Worker::Loader, WorkerState::WaitingFull);

        let out = buf.contents();
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(
            lines[0],
            concat!("     idle      ", " | ", " waiting tree  ", " | ", "     idle      "),
        );
        assert_eq!(
            lines[1],
            concat!("     idle      ", " | ", " waiting tree  ", " | ", " waiting full  "),
        );
    }

    #[test]
    fn wide_states_widen_their_cell_only() {
        let buf = SharedBuf::default();
        let bus = EventBus::new(1, Box::new(buf.clone()));

        bus.record(
            Worker::Picker(1),
            WorkerState::Stored {
                fruit: FruitId(12),
                slot: 10,
            },
        );

        let out = buf.contents();
        assert_eq!(
            out.lines().next().unwrap(),
            concat!("stored #12 in 10", " | ", "     idle      "),
        );
    }

    #[test]
    fn write_errors_are_swallowed() {
        struct FailingWriter;

        impl io::Write for FailingWriter {
            fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
                Err(io::Error::new(io::ErrorKind::BrokenPipe, "gone"))
            }

            fn flush(&mut self) -> io::Result<()> {
                Ok(())
            }
        }

        let bus = EventBus::new(1, Box::new(FailingWriter));
        bus.emit_preamble();
        bus.record(Worker::Picker(1), WorkerState::Exiting);
    }
}
