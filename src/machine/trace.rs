//! Execution observers.
//!
//! Tracing is injected at machine construction instead of toggled through
//! process-wide state: the machine reports each step and I/O exchange to a
//! [`Tracer`], and the default observer does nothing.

use crate::debug;
use crate::machine::isa::Decoded;
use crate::machine::memory::Word;

/// Observer for machine execution events.
///
/// Every hook defaults to a no-op, so implementors override only what they
/// need. Machines move onto driver-spawned threads, hence `Send`.
pub trait Tracer: Send {
    /// Called after decode, before the instruction executes.
    fn on_step(&mut self, _ip: Word, _relative_base: Word, _decoded: &Decoded) {}

    /// Called when an input instruction consumed `value` for `addr`.
    fn on_input(&mut self, _addr: Word, _value: Word) {}

    /// Called when an output instruction produced `value`.
    fn on_output(&mut self, _value: Word) {}
}

/// The default tracer: observes nothing.
#[derive(Clone, Copy, Debug, Default)]
pub struct NopTracer;

impl Tracer for NopTracer {}

/// Logs every execution event at debug level.
#[derive(Clone, Copy, Debug, Default)]
pub struct LogTracer;

impl Tracer for LogTracer {
    fn on_step(&mut self, ip: Word, relative_base: Word, decoded: &Decoded) {
        debug!(
            "-- addr: {ip}; op: {}; base: {relative_base}",
            decoded.opcode.mnemonic()
        );
    }

    fn on_input(&mut self, addr: Word, value: Word) {
        debug!("SAV {value} => #{addr}");
    }

    fn on_output(&mut self, value: Word) {
        debug!("OUT {value}");
    }
}
