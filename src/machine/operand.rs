//! Parameter addressing modes and operand resolution.

use crate::machine::errors::MachineError;
use crate::machine::memory::{Memory, Word};

/// How a decoded parameter maps to a value or an address.
#[repr(u8)]
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Mode {
    /// The raw word is an address.
    Position = 0,
    /// The raw word is the value itself. Read parameters only.
    Immediate = 1,
    /// The raw word plus the relative base is an address.
    Relative = 2,
}

impl TryFrom<Word> for Mode {
    type Error = MachineError;

    fn try_from(value: Word) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Mode::Position),
            1 => Ok(Mode::Immediate),
            2 => Ok(Mode::Relative),
            _ => Err(MachineError::InvalidMode {
                mode: value,
                addr: 0,
            }),
        }
    }
}

/// Materializes the parameters of a single instruction against memory.
///
/// Borrows the instruction pointer and relative base as they were when the
/// instruction was fetched; the executor must not advance the pointer until
/// every parameter has been resolved.
pub(crate) struct Resolver<'a> {
    memory: &'a Memory,
    ip: Word,
    relative_base: Word,
}

impl<'a> Resolver<'a> {
    pub(crate) fn new(memory: &'a Memory, ip: Word, relative_base: Word) -> Self {
        Self {
            memory,
            ip,
            relative_base,
        }
    }

    /// Resolves the parameter at 1-based `offset` as a readable value.
    pub(crate) fn value(&self, offset: Word, mode: Mode) -> Result<Word, MachineError> {
        let raw = self.memory.read(self.ip + offset)?;
        match mode {
            Mode::Position => self.memory.read(raw),
            Mode::Immediate => Ok(raw),
            Mode::Relative => self.memory.read(raw + self.relative_base),
        }
    }

    /// Resolves the parameter at 1-based `offset` as a write-target address.
    ///
    /// Immediate mode has no address to offer; requesting one is fatal
    /// rather than silently misinterpreted.
    pub(crate) fn address(&self, offset: Word, mode: Mode) -> Result<Word, MachineError> {
        let raw = self.memory.read(self.ip + offset)?;
        match mode {
            Mode::Position => Ok(raw),
            Mode::Immediate => Err(MachineError::ImmediateWrite { addr: self.ip }),
            Mode::Relative => Ok(raw + self.relative_base),
        }
    }
}
