//! Defensive parsing of snapshot rows and state cells.

use orchard::{FruitId, WorkerState};

/// Split one stream line into per-worker cells.
///
/// Returns `None` unless the line splits into exactly `workers`
/// pipe-delimited columns. The header row also has that many columns but
/// fails state parsing later; the separator line and corrupt fragments
/// fail here.
pub fn split_row(line: &str, workers: usize) -> Option<Vec<&str>> {
    let cells: Vec<&str> = line.split('|').map(str::trim).collect();
    if cells.len() == workers { Some(cells) } else { None }
}

/// Parse one trimmed cell back into a typed state. Unknown or malformed
/// text maps to `None`; the caller decides whether to discard the row.
pub fn parse_state(text: &str) -> Option<WorkerState> {
    match text {
        "idle" => Some(WorkerState::Idle),
        "waiting tree" => Some(WorkerState::WaitingTree),
        "acquired tree" => Some(WorkerState::AcquiredTree),
        "waiting slot" => Some(WorkerState::WaitingSlot),
        "got slot" => Some(WorkerState::GotSlot),
        "waiting crate" => Some(WorkerState::WaitingCrate),
        "acquired crate" => Some(WorkerState::AcquiredCrate),
        "crate full" => Some(WorkerState::CrateFull),
        "waiting full" => Some(WorkerState::WaitingFull),
        "got full" => Some(WorkerState::GotFull),
        "emptied crate" => Some(WorkerState::EmptiedCrate),
        "reset slots" => Some(WorkerState::ResetSlots),
        "exiting" => Some(WorkerState::Exiting),
        _ => {
            if let Some(rest) = text.strip_prefix("picked #") {
                return parse_fruit(rest).map(WorkerState::Picked);
            }
            if let Some(rest) = text.strip_prefix("stored #") {
                let (fruit, slot) = rest.split_once(" in ")?;
                return Some(WorkerState::Stored {
                    fruit: parse_fruit(fruit)?,
                    slot: slot.parse().ok()?,
                });
            }
            if let Some(rest) = text.strip_prefix("loading ") {
                return parse_drain(rest).map(WorkerState::Loading);
            }
            if let Some(rest) = text.strip_prefix("partial ") {
                return parse_drain(rest).map(WorkerState::Partial);
            }
            None
        }
    }
}

fn parse_fruit(text: &str) -> Option<FruitId> {
    text.parse().ok().map(FruitId)
}

/// `<count> <id> <id> ...` with the count matching the list length.
fn parse_drain(rest: &str) -> Option<Vec<FruitId>> {
    let mut tokens = rest.split_whitespace();
    let count: usize = tokens.next()?.parse().ok()?;
    let fruits = tokens.map(parse_fruit).collect::<Option<Vec<_>>>()?;
    if fruits.len() == count { Some(fruits) } else { None }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_requires_exact_column_count() {
        assert_eq!(
            split_row("  picked #3   |     idle     ", 2),
            Some(vec!["picked #3", "idle"]),
        );
        assert_eq!(split_row("---------------", 2), None);
        assert_eq!(split_row("a | b | c", 2), None);
        assert_eq!(split_row("", 2), None);
    }

    #[test]
    fn header_cells_split_but_do_not_parse() {
        let cells = split_row("   Picker-1     |     Loader     ", 2).unwrap();
        assert_eq!(parse_state(cells[0]), None);
        assert_eq!(parse_state(cells[1]), None);
    }

    #[test]
    fn fixed_states_round_trip() {
        for state in [
            WorkerState::Idle,
            WorkerState::WaitingTree,
            WorkerState::AcquiredTree,
            WorkerState::WaitingSlot,
            WorkerState::GotSlot,
            WorkerState::WaitingCrate,
            WorkerState::AcquiredCrate,
            WorkerState::CrateFull,
            WorkerState::WaitingFull,
            WorkerState::GotFull,
            WorkerState::EmptiedCrate,
            WorkerState::ResetSlots,
            WorkerState::Exiting,
        ] {
            assert_eq!(parse_state(&state.to_string()), Some(state));
        }
    }

    #[test]
    fn parameterized_states_parse() {
        assert_eq!(
            parse_state("picked #26"),
            Some(WorkerState::Picked(FruitId(26))),
        );
        assert_eq!(
            parse_state("stored #8 in 3"),
            Some(WorkerState::Stored {
                fruit: FruitId(8),
                slot: 3,
            }),
        );
        assert_eq!(
            parse_state("loading 3 4 9 1"),
            Some(WorkerState::Loading(vec![
                FruitId(4),
                FruitId(9),
                FruitId(1),
            ])),
        );
        assert_eq!(
            parse_state("partial 1 26"),
            Some(WorkerState::Partial(vec![FruitId(26)])),
        );
    }

    #[test]
    fn malformed_cells_are_rejected() {
        assert_eq!(parse_state(""), None);
        assert_eq!(parse_state("picking"), None);
        assert_eq!(parse_state("picked 8"), None);
        assert_eq!(parse_state("picked #x"), None);
        assert_eq!(parse_state("stored #8"), None);
        assert_eq!(parse_state("stored #8 in "), None);
        assert_eq!(parse_state("stored #8 in slot"), None);
        // Count disagreeing with the id list.
        assert_eq!(parse_state("loading 2 1"), None);
        assert_eq!(parse_state("partial 1 2 3"), None);
        assert_eq!(parse_state("loading x 1"), None);
    }
}
