//! Read-only context grid supplied by the calling contract.

use crate::vm::errors::VmError;
use crate::vm::word::{caller_word, Caller, Word};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Context {
    rows: Vec<Vec<Word>>,
}

impl Context {
    pub fn new(rows: Vec<Vec<Word>>) -> Self {
        Self { rows }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    /// Context whose row 0 is `[caller, contract]`, followed by `rows`.
    pub fn with_base_row(caller: &Caller, contract: Word, rows: Vec<Vec<Word>>) -> Self {
        let mut all = Vec::with_capacity(rows.len() + 1);
        all.push(vec![caller_word(caller), contract]);
        all.extend(rows);
        Self { rows: all }
    }

    /// `context[row][column]`. A missing cell is an error, never zero.
    pub fn get(&self, row: usize, column: usize) -> Result<Word, VmError> {
        self.rows
            .get(row)
            .and_then(|r| r.get(column))
            .copied()
            .ok_or(VmError::ContextOutOfBounds { row, column })
    }

    pub fn rows(&self) -> &[Vec<Word>] {
        &self.rows
    }

    /// Row-major flattening, used by the debug tap.
    pub fn flatten(&self) -> Vec<Word> {
        self.rows.iter().flatten().copied().collect()
    }
}
