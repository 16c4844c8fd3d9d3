//! Typed worker states and their wire text.
//!
//! The visualizer consumes fixed-width text rows, but the engine never
//! builds state strings ad hoc. Every transition is a [`WorkerState`]
//! value, and the `Display` impls here are the single place where those
//! values become wire text. The replay side parses the same strings back.

use std::fmt;

use crate::tree::FruitId;

/// Width of one snapshot column. States longer than this widen their cell;
/// consumers split on `|` and trim rather than counting characters.
pub const COLUMN_WIDTH: usize = 15;

/// One worker in the simulation. Pickers are numbered from 1; there is
/// exactly one loader.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Worker {
    Picker(u32),
    Loader,
}

impl fmt::Display for Worker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Worker::Picker(id) => write!(f, "Picker-{id}"),
            Worker::Loader => f.write_str("Loader"),
        }
    }
}

/// Current state of one worker, as broadcast on the event stream.
///
/// Drain variants carry the fruits in slot order; the wire form derives
/// its count from the list, so the two can never disagree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkerState {
    Idle,
    WaitingTree,
    AcquiredTree,
    Picked(FruitId),
    WaitingSlot,
    GotSlot,
    WaitingCrate,
    AcquiredCrate,
    Stored { fruit: FruitId, slot: usize },
    CrateFull,
    WaitingFull,
    GotFull,
    Loading(Vec<FruitId>),
    EmptiedCrate,
    Partial(Vec<FruitId>),
    ResetSlots,
    Exiting,
}

impl fmt::Display for WorkerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WorkerState::Idle => f.write_str("idle"),
            WorkerState::WaitingTree => f.write_str("waiting tree"),
            WorkerState::AcquiredTree => f.write_str("acquired tree"),
            WorkerState::Picked(fruit) => write!(f, "picked #{fruit}"),
            WorkerState::WaitingSlot => f.write_str("waiting slot"),
            WorkerState::GotSlot => f.write_str("got slot"),
            WorkerState::WaitingCrate => f.write_str("waiting crate"),
            WorkerState::AcquiredCrate => f.write_str("acquired crate"),
            WorkerState::Stored { fruit, slot } => write!(f, "stored #{fruit} in {slot}"),
            WorkerState::CrateFull => f.write_str("crate full"),
            WorkerState::WaitingFull => f.write_str("waiting full"),
            WorkerState::GotFull => f.write_str("got full"),
            WorkerState::Loading(fruits) => write_drain(f, "loading", fruits),
            WorkerState::EmptiedCrate => f.write_str("emptied crate"),
            WorkerState::Partial(fruits) => write_drain(f, "partial", fruits),
            WorkerState::ResetSlots => f.write_str("reset slots"),
            WorkerState::Exiting => f.write_str("exiting"),
        }
    }
}

fn write_drain(f: &mut fmt::Formatter<'_>, verb: &str, fruits: &[FruitId]) -> fmt::Result {
    write!(f, "{verb} {}", fruits.len())?;
    for fruit in fruits {
        write!(f, " {fruit}")?;
    }
    Ok(())
}
