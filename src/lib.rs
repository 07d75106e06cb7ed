//! Intcode virtual machine library.
//!
//! Provides the execution core for comma-separated-integer ("intcode")
//! programs and the channel-based I/O contract external drivers program
//! against.

pub mod machine;
pub mod utils;
