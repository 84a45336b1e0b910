use crate::mkpar::ResolvedRows;
use crate::{Action, NonTerminalId, StateId, TerminalId};
use log::debug;

/// The compressed parse tables.
///
/// Each state has one entry in `action_index` and one in `goto_index`.  An action index entry
/// with its low bit set is a uniform row, stored inline as `(action.encode() << 1) | 1`;
/// otherwise it is `row << 1`, where `row` selects a row of `action_table`.  Goto index entries
/// are plain row numbers into `goto_table`.  Equal rows are stored once.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ParseTables {
    pub action_table: Vec<Vec<Action>>,
    pub action_index: Vec<i32>,
    pub goto_table: Vec<Vec<Action>>,
    pub goto_index: Vec<i32>,
}

/// Finds a row equal to `row` among those already stored.
fn matching_row(rows: &[Vec<Action>], row: &[Action]) -> Option<usize> {
    rows.iter().position(|r| r.as_slice() == row)
}

fn find_or_add_row(rows: &mut Vec<Vec<Action>>, row: &[Action]) -> usize {
    match matching_row(rows, row) {
        Some(i) => i,
        None => {
            rows.push(row.to_vec());
            rows.len() - 1
        }
    }
}

/// Returns the action if every cell of `row` holds it.
fn uniform_action(row: &[Action]) -> Option<Action> {
    let (&first, rest) = row.split_first()?;
    if rest.iter().all(|&a| a == first) {
        Some(first)
    } else {
        None
    }
}

pub fn compress(resolved: &ResolvedRows) -> ParseTables {
    let mut action_table: Vec<Vec<Action>> = Vec::new();
    let mut goto_table: Vec<Vec<Action>> = Vec::new();
    let mut action_index: Vec<i32> = Vec::with_capacity(resolved.rows.len());
    let mut goto_index: Vec<i32> = Vec::with_capacity(resolved.rows.len());

    for (state, rows) in resolved.rows.iter_enumerated() {
        goto_index.push(find_or_add_row(&mut goto_table, &rows.gotos) as i32);

        let entry = match uniform_action(&rows.actions) {
            Some(action) => (action.encode() << 1) | 1,
            None => (find_or_add_row(&mut action_table, &rows.actions) as i32) << 1,
        };
        debug!("s{}: action index {:#x}", state, entry);
        action_index.push(entry);
    }

    debug!(
        "packed {} states into {} action rows and {} goto rows",
        resolved.rows.len(),
        action_table.len(),
        goto_table.len()
    );

    ParseTables {
        action_table,
        action_index,
        goto_table,
        goto_index,
    }
}

impl ParseTables {
    pub fn nstates(&self) -> usize {
        self.action_index.len()
    }

    /// Decodes the action for `terminal` in `state`.  Returns `None` for an unknown state.
    pub fn action(&self, state: StateId, terminal: TerminalId) -> Option<Action> {
        let entry = *self.action_index.get(state.index())?;
        if entry & 1 == 1 {
            Action::decode(entry >> 1)
        } else {
            let row = self.action_table.get((entry >> 1) as usize)?;
            row.get(terminal.index()).copied()
        }
    }

    pub fn goto(&self, state: StateId, nt: NonTerminalId) -> Option<Action> {
        let row = *self.goto_index.get(state.index())?;
        self.goto_table.get(row as usize)?.get(nt.index()).copied()
    }

    pub fn encoded_action_table(&self) -> Vec<Vec<i32>> {
        encode_rows(&self.action_table)
    }

    pub fn encoded_goto_table(&self) -> Vec<Vec<i32>> {
        encode_rows(&self.goto_table)
    }
}

fn encode_rows(rows: &[Vec<Action>]) -> Vec<Vec<i32>> {
    rows.iter()
        .map(|row| row.iter().map(|a| a.encode()).collect())
        .collect()
}
