use crate::machine::memory::Word;
use thiserror::Error;

/// Errors raised while loading or executing an intcode program.
///
/// Every variant is fatal: execution aborts and the error propagates to the
/// driver. Nothing is retried and no partial result is recovered.
#[derive(Debug, Error)]
pub enum MachineError {
    /// A program token is not a valid integer. Raised at load time, before
    /// any instruction executes.
    #[error("invalid program token {token:?} at position {position}")]
    ParseError { token: String, position: usize },
    /// The decoded opcode is not part of the instruction set.
    #[error("invalid opcode {opcode} at address {addr}")]
    InvalidOpcode { opcode: Word, addr: Word },
    /// A parameter mode digit is outside the known set {0, 1, 2}.
    #[error("invalid parameter mode {mode} at address {addr}")]
    InvalidMode { mode: Word, addr: Word },
    /// Immediate mode used for a write-target parameter.
    #[error("immediate-mode parameter of instruction at address {addr} cannot be a write target")]
    ImmediateWrite { addr: Word },
    /// A computed address is negative.
    #[error("negative address {addr}")]
    NegativeAddress { addr: Word },
    /// Input was requested but the input channel is closed and drained.
    #[error("input requested at address {addr} but the input channel is closed")]
    InputExhausted { addr: Word },
}
