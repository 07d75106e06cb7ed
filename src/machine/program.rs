//! Intcode program encoding.
//!
//! A program is a single line of comma-separated base-10 signed integers,
//! optionally wrapped in whitespace. Cell `i` of the parsed program maps to
//! memory address `i` at load time. Parsing is strict: any non-integer token
//! is fatal before a single instruction executes.

use crate::machine::errors::MachineError;
use crate::machine::memory::Word;
use std::fmt;
use std::str::FromStr;

/// A parsed intcode program, ready to be loaded into machine memory.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Program {
    cells: Vec<Word>,
}

impl Program {
    /// Returns the loaded cells in program order.
    pub fn cells(&self) -> &[Word] {
        &self.cells
    }

    /// Returns the cell that will land at `addr`, if the program is that long.
    pub fn get(&self, addr: Word) -> Option<Word> {
        usize::try_from(addr)
            .ok()
            .and_then(|i| self.cells.get(i).copied())
    }

    /// Returns the number of cells.
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    /// Returns whether the program has no cells.
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
}

impl FromStr for Program {
    type Err = MachineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut cells = Vec::new();
        for (position, token) in s.trim().split(',').enumerate() {
            let token = token.trim();
            let value = token.parse::<Word>().map_err(|_| MachineError::ParseError {
                token: token.to_string(),
                position,
            })?;
            cells.push(value);
        }
        Ok(Self { cells })
    }
}

impl fmt::Display for Program {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for value in &self.cells {
            if !first {
                write!(f, ",")?;
            }
            write!(f, "{value}")?;
            first = false;
        }
        Ok(())
    }
}
