//! Channel-driven intcode virtual machine.
//!
//! Executes programs encoded as comma-separated integers against a sparse,
//! auto-extending memory, exchanging values with a concurrently running
//! driver over blocking channel endpoints.
//!
//! # Architecture
//!
//! - **Memory**: sparse address → word store; never-written cells read zero,
//!   writes grow the store implicitly and without bound
//! - **Instruction format**: a packed word carries the opcode in its two
//!   lowest decimal digits and one addressing-mode digit per parameter
//!   (position, immediate, relative)
//! - **Registers**: the instruction pointer and the relative base, both
//!   owned by the executor
//! - **Execution model**: one thread of control per machine; the only
//!   suspension points are the input instruction (waiting for the driver)
//!   and the output instruction (waiting for the driver to accept)
//! - **I/O bridge**: one consuming input endpoint, one producing output
//!   endpoint; the output end closes on every terminal path, and machines
//!   compose into pipelines by sharing a channel
//! - **Step limit**: optional instruction cap as a valve against runaway
//!   programs
//!
//! # Modules
//!
//! - [`errors`]: load-time and execution error types
//! - [`io`]: channel endpoints and handshake semantics
//! - [`isa`]: instruction-set definition, decoding, and the pluggable model
//! - [`memory`]: sparse program memory
//! - [`operand`]: addressing modes and operand resolution
//! - [`program`]: intcode text parsing and serialization
//! - [`trace`]: injected execution observers
//! - [`vm`]: the fetch-decode-execute loop

pub mod errors;
pub mod io;
pub mod isa;
pub mod memory;
pub mod operand;
pub mod program;
pub mod trace;
pub mod vm;
