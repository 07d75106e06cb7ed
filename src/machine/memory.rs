//! Sparse program memory.
//!
//! Intcode programs legitimately read and write far past their loaded
//! length, so memory is an associative store rather than a flat array:
//! never-written addresses read as zero and writes create their slot
//! implicitly, with no upper bound and no resize operation.

use crate::machine::errors::MachineError;
use crate::machine::program::Program;
use std::collections::BTreeMap;
use std::fmt;

/// The machine word: every memory cell, address, and I/O value is one of
/// these. The full 64-bit signed range is required — output values routinely
/// exceed 32 bits.
pub type Word = i64;

/// Sparse address → word store, owned exclusively by one machine.
#[derive(Clone, Debug, Default)]
pub struct Memory {
    cells: BTreeMap<Word, Word>,
}

impl Memory {
    /// Creates an empty memory; every address reads as zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a memory image of `program`, cell `i` landing at address `i`.
    pub fn load(program: &Program) -> Self {
        let cells = program
            .cells()
            .iter()
            .enumerate()
            .map(|(addr, &value)| (addr as Word, value))
            .collect();
        Self { cells }
    }

    /// Reads the word at `addr`, zero for never-written cells.
    ///
    /// Returns [`MachineError::NegativeAddress`] for `addr < 0`.
    pub fn read(&self, addr: Word) -> Result<Word, MachineError> {
        if addr < 0 {
            return Err(MachineError::NegativeAddress { addr });
        }
        Ok(self.cells.get(&addr).copied().unwrap_or(0))
    }

    /// Writes `value` at `addr`, creating the cell if absent.
    ///
    /// Returns [`MachineError::NegativeAddress`] for `addr < 0`.
    pub fn write(&mut self, addr: Word, value: Word) -> Result<(), MachineError> {
        if addr < 0 {
            return Err(MachineError::NegativeAddress { addr });
        }
        self.cells.insert(addr, value);
        Ok(())
    }

    /// Returns the number of written cells.
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    /// Returns whether no cell has ever been written.
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
}

/// Serializes the written cells in ascending address order, comma-joined.
///
/// Immediately after [`Memory::load`] this reproduces the program text
/// exactly; once a program writes past its loaded length the image grows
/// accordingly.
impl fmt::Display for Memory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for value in self.cells.values() {
            if !first {
                write!(f, ",")?;
            }
            write!(f, "{value}")?;
            first = false;
        }
        Ok(())
    }
}
