//! Core virtual machine implementation.
//!
//! The machine runs its fetch-decode-execute loop on a single thread of
//! control, suspending only when the input instruction waits for the driver
//! or the output instruction waits for the driver to accept. All arithmetic
//! uses wrapping semantics to prevent overflow panics.

use crate::machine::errors::MachineError;
use crate::machine::io::{unbounded, InputPort, OutputPort, Receiver, Sender};
use crate::machine::isa::{Decoded, InstructionSet, Model2019, Opcode};
use crate::machine::memory::{Memory, Word};
use crate::machine::operand::Resolver;
use crate::machine::program::Program;
use crate::machine::trace::{NopTracer, Tracer};
use std::thread;

/// Why a run stopped.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Outcome {
    /// The program executed the halt instruction.
    Halted,
    /// The configured step limit ran out before the program halted.
    StepLimit,
    /// The driver dropped the consuming end of the output channel.
    OutputClosed,
}

/// Intcode virtual machine.
///
/// Owns its memory exclusively; the only connection to the outside world is
/// the channel endpoint pair handed over at construction. The driver keeps
/// the opposite ends: the `Sender` paired with `input` and the `Receiver`
/// paired with `output`. Wiring one machine's output channel as another's
/// input channel composes pipelines.
pub struct Machine<M: InstructionSet = Model2019> {
    /// Sparse program memory.
    memory: Memory,
    /// Instruction pointer; always addresses the next instruction word.
    ip: Word,
    /// Origin register for relative-mode addressing.
    relative_base: Word,
    /// Consuming end of the input channel.
    input: InputPort,
    /// Producing end of the output channel.
    output: OutputPort,
    /// Instruction-set model decoding the words under the pointer.
    model: M,
    /// Execution observer.
    tracer: Box<dyn Tracer>,
    /// Optional cap on executed instructions.
    step_limit: Option<u64>,
    /// Instructions executed so far.
    steps: u64,
}

impl Machine<Model2019> {
    /// Creates a machine running the 2019 instruction set.
    pub fn new(program: &Program, input: Receiver<Word>, output: Sender<Word>) -> Self {
        Self::with_model(Model2019, program, input, output)
    }
}

impl<M: InstructionSet> Machine<M> {
    /// Creates a machine with a custom instruction-set model.
    pub fn with_model(
        model: M,
        program: &Program,
        input: Receiver<Word>,
        output: Sender<Word>,
    ) -> Self {
        Self {
            memory: Memory::load(program),
            ip: 0,
            relative_base: 0,
            input: InputPort::new(input),
            output: OutputPort::new(output),
            model,
            tracer: Box::new(NopTracer),
            step_limit: None,
            steps: 0,
        }
    }

    /// Caps the number of executed instructions.
    ///
    /// A safety valve against runaway programs, not part of the machine's
    /// semantics: behavior is unchanged until the cap is hit, then the run
    /// stops with [`Outcome::StepLimit`] and the output channel closes.
    pub fn with_step_limit(mut self, limit: u64) -> Self {
        self.step_limit = Some(limit);
        self
    }

    /// Replaces the default no-op tracer.
    pub fn with_tracer(mut self, tracer: impl Tracer + 'static) -> Self {
        self.tracer = Box::new(tracer);
        self
    }

    /// Overwrites a memory cell.
    ///
    /// Drivers use this before [`run`](Self::run) to switch a loaded
    /// program's operating mode.
    pub fn patch(&mut self, addr: Word, value: Word) -> Result<(), MachineError> {
        self.memory.write(addr, value)
    }

    /// Read access to program memory, typically for terminal-state
    /// inspection after the run.
    pub fn memory(&self) -> &Memory {
        &self.memory
    }

    /// Runs the fetch-decode-execute loop to a terminal outcome.
    ///
    /// The output channel closes on every terminal path — halt, step-limit
    /// cutoff, dropped output receiver, or fatal error — so a concurrently
    /// draining driver always terminates.
    pub fn run(&mut self) -> Result<Outcome, MachineError> {
        loop {
            match self.step() {
                Ok(None) => {
                    self.steps += 1;
                    if let Some(limit) = self.step_limit {
                        if self.steps >= limit {
                            self.output.close();
                            return Ok(Outcome::StepLimit);
                        }
                    }
                }
                Ok(Some(outcome)) => {
                    self.output.close();
                    return Ok(outcome);
                }
                Err(err) => {
                    self.output.close();
                    return Err(err);
                }
            }
        }
    }

    /// Fetches, decodes, and executes a single instruction.
    ///
    /// Returns `Some` when the instruction terminated the run.
    fn step(&mut self) -> Result<Option<Outcome>, MachineError> {
        let ip = self.ip;
        let word = self.memory.read(ip)?;
        let decoded = self.model.decode(word).map_err(|err| at_addr(err, ip))?;
        self.tracer.on_step(ip, self.relative_base, &decoded);
        self.exec(decoded)
    }

    fn exec(&mut self, d: Decoded) -> Result<Option<Outcome>, MachineError> {
        match d.opcode {
            Opcode::Add => {
                let (a, b, dst) = self.binary_params(&d)?;
                self.memory.write(dst, a.wrapping_add(b))?;
                self.advance(&d);
            }
            Opcode::Mul => {
                let (a, b, dst) = self.binary_params(&d)?;
                self.memory.write(dst, a.wrapping_mul(b))?;
                self.advance(&d);
            }
            Opcode::Input => {
                let dst = self.resolver().address(1, d.mode(1))?;
                let value = self
                    .input
                    .recv()
                    .ok_or(MachineError::InputExhausted { addr: self.ip })?;
                self.tracer.on_input(dst, value);
                self.memory.write(dst, value)?;
                self.advance(&d);
            }
            Opcode::Output => {
                let value = self.resolver().value(1, d.mode(1))?;
                self.tracer.on_output(value);
                if !self.output.send(value) {
                    return Ok(Some(Outcome::OutputClosed));
                }
                self.advance(&d);
            }
            Opcode::JumpIfTrue => {
                let (cond, target) = self.jump_params(&d)?;
                if cond != 0 {
                    self.ip = target;
                } else {
                    self.advance(&d);
                }
            }
            Opcode::JumpIfFalse => {
                let (cond, target) = self.jump_params(&d)?;
                if cond == 0 {
                    self.ip = target;
                } else {
                    self.advance(&d);
                }
            }
            Opcode::LessThan => {
                let (a, b, dst) = self.binary_params(&d)?;
                self.memory.write(dst, (a < b) as Word)?;
                self.advance(&d);
            }
            Opcode::Equals => {
                let (a, b, dst) = self.binary_params(&d)?;
                self.memory.write(dst, (a == b) as Word)?;
                self.advance(&d);
            }
            Opcode::AdjustBase => {
                let delta = self.resolver().value(1, d.mode(1))?;
                self.relative_base = self.relative_base.wrapping_add(delta);
                self.advance(&d);
            }
            Opcode::Halt => return Ok(Some(Outcome::Halted)),
        }
        Ok(None)
    }

    fn resolver(&self) -> Resolver<'_> {
        Resolver::new(&self.memory, self.ip, self.relative_base)
    }

    /// Resolves the (read, read, write) parameter triple shared by the
    /// arithmetic and comparison opcodes.
    fn binary_params(&self, d: &Decoded) -> Result<(Word, Word, Word), MachineError> {
        let r = self.resolver();
        Ok((
            r.value(1, d.mode(1))?,
            r.value(2, d.mode(2))?,
            r.address(3, d.mode(3))?,
        ))
    }

    /// Resolves the (condition, target) pair of the jump opcodes. The
    /// target is the operand's resolved value, not its address.
    fn jump_params(&self, d: &Decoded) -> Result<(Word, Word), MachineError> {
        let r = self.resolver();
        Ok((r.value(1, d.mode(1))?, r.value(2, d.mode(2))?))
    }

    /// Advances past the instruction and its parameters. Only called once
    /// every parameter has been resolved.
    fn advance(&mut self, d: &Decoded) {
        self.ip += d.opcode.width();
    }
}

/// Stamps a decode error with the address it occurred at.
fn at_addr(err: MachineError, addr: Word) -> MachineError {
    match err {
        MachineError::InvalidOpcode { opcode, .. } => MachineError::InvalidOpcode { opcode, addr },
        MachineError::InvalidMode { mode, .. } => MachineError::InvalidMode { mode, addr },
        other => other,
    }
}

/// Runs `program` to completion on the current thread, feeding it `inputs`
/// in order and collecting everything it outputs.
///
/// Convenience for drivers that know the full input sequence up front. The
/// input channel holds all of `inputs` before the run starts; outputs drain
/// on a collector thread so the rendezvous handshake never deadlocks.
pub fn gather_outputs(program: &Program, inputs: &[Word]) -> Result<Vec<Word>, MachineError> {
    let (in_tx, in_rx) = unbounded();
    let (out_tx, out_rx) = crate::machine::io::bounded(0);
    let mut machine = Machine::new(program, in_rx, out_tx);
    for &value in inputs {
        let _ = in_tx.send(value);
    }
    drop(in_tx);

    let collector = thread::spawn(move || {
        let mut outputs = Vec::new();
        while let Ok(value) = out_rx.recv() {
            outputs.push(value);
        }
        outputs
    });

    let result = machine.run();
    let outputs = collector.join().expect("collector thread panicked");
    result.map(|_| outputs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::machine::io::{bounded, unbounded};

    /// Runs `source` with buffered I/O, asserting a normal halt; returns
    /// the machine for terminal-state inspection plus the output sequence.
    fn run_program(source: &str, inputs: &[Word]) -> (Machine, Vec<Word>) {
        let program: Program = source.parse().expect("parse failed");
        let (in_tx, in_rx) = unbounded();
        let (out_tx, out_rx) = unbounded();
        for &value in inputs {
            in_tx.send(value).unwrap();
        }
        drop(in_tx);
        let mut machine = Machine::new(&program, in_rx, out_tx);
        let outcome = machine.run().expect("run failed");
        assert_eq!(outcome, Outcome::Halted);
        let outputs = out_rx.iter().collect();
        (machine, outputs)
    }

    fn terminal_memory(source: &str) -> String {
        run_program(source, &[]).0.memory().to_string()
    }

    fn run_expect_err(source: &str, inputs: &[Word]) -> MachineError {
        let program: Program = source.parse().expect("parse failed");
        let (in_tx, in_rx) = unbounded();
        let (out_tx, _out_rx) = unbounded();
        for &value in inputs {
            in_tx.send(value).unwrap();
        }
        drop(in_tx);
        Machine::new(&program, in_rx, out_tx)
            .run()
            .expect_err("expected error")
    }

    // ==================== Arithmetic ====================

    #[test]
    fn add_stores_at_the_resolved_address() {
        assert_eq!(terminal_memory("1,0,0,1,99"), "1,2,0,1,99");
    }

    #[test]
    fn mul_stores_at_the_resolved_address() {
        assert_eq!(terminal_memory("2,3,0,3,99"), "2,3,0,6,99");
    }

    #[test]
    fn immediate_mode_arithmetic() {
        // 1101: ADD with both read parameters immediate.
        assert_eq!(terminal_memory("1101,20,22,0,99"), "42,20,22,0,99");
    }

    #[test]
    fn add_wraps_instead_of_panicking() {
        let source = format!("1101,{},1,0,99", Word::MAX);
        let (machine, _) = run_program(&source, &[]);
        assert_eq!(machine.memory().read(0).unwrap(), Word::MIN);
    }

    // ==================== I/O ====================

    #[test]
    fn echo_round_trips_a_value() {
        let (_, outputs) = run_program("3,0,4,0,99", &[7]);
        assert_eq!(outputs, vec![7]);
    }

    #[test]
    fn inputs_are_consumed_in_supply_order() {
        // Reads two values, adds them, outputs the sum.
        let (_, outputs) = run_program("3,0,3,1,1,0,1,0,4,0,99", &[10, 20]);
        assert_eq!(outputs, vec![30]);
    }

    #[test]
    fn output_handles_64_bit_values() {
        let (_, outputs) = run_program("104,1125899906842624,99", &[]);
        assert_eq!(outputs, vec![1_125_899_906_842_624]);

        let (_, outputs) = run_program("1102,34915192,34915192,7,4,7,99,0", &[]);
        assert_eq!(outputs, vec![1_219_070_632_396_864]);
    }

    #[test]
    fn input_on_closed_channel_is_fatal() {
        assert!(matches!(
            run_expect_err("3,0,99", &[]),
            MachineError::InputExhausted { addr: 0 }
        ));
    }

    #[test]
    fn dropped_output_receiver_ends_the_run() {
        let program: Program = "104,1,104,2,99".parse().unwrap();
        let (_in_tx, in_rx) = unbounded();
        let (out_tx, out_rx) = bounded(0);
        let runner = thread::spawn(move || Machine::new(&program, in_rx, out_tx).run());

        assert_eq!(out_rx.recv().unwrap(), 1);
        drop(out_rx);
        assert_eq!(runner.join().unwrap().unwrap(), Outcome::OutputClosed);
    }

    // ==================== Jumps and comparisons ====================

    #[test]
    fn jump_if_true_jumps_to_the_resolved_value() {
        // JNZ 1, 7 lands on the OUT at address 7, skipping the OUT of 0.
        let (_, outputs) = run_program("1105,1,7,104,0,99,0,104,1,99", &[]);
        assert_eq!(outputs, vec![1]);
    }

    #[test]
    fn jump_if_true_falls_through_on_zero() {
        let (_, outputs) = run_program("1105,0,7,104,0,99,0,104,1,99", &[]);
        assert_eq!(outputs, vec![0]);
    }

    #[test]
    fn position_mode_jump_program_reports_nonzero_input() {
        let source = "3,12,6,12,15,1,13,14,13,4,13,99,-1,0,1,9";
        assert_eq!(run_program(source, &[0]).1, vec![0]);
        assert_eq!(run_program(source, &[13]).1, vec![1]);
    }

    #[test]
    fn immediate_mode_jump_program_reports_nonzero_input() {
        let source = "3,3,1105,-1,9,1101,0,0,12,4,12,99,1";
        assert_eq!(run_program(source, &[0]).1, vec![0]);
        assert_eq!(run_program(source, &[5]).1, vec![1]);
    }

    #[test]
    fn equals_eight_position_mode() {
        let source = "3,9,8,9,10,9,4,9,99,-1,8";
        assert_eq!(run_program(source, &[8]).1, vec![1]);
        assert_eq!(run_program(source, &[7]).1, vec![0]);
    }

    #[test]
    fn less_than_eight_immediate_mode() {
        let source = "3,3,1107,-1,8,3,4,3,99";
        assert_eq!(run_program(source, &[7]).1, vec![1]);
        assert_eq!(run_program(source, &[9]).1, vec![0]);
    }

    // ==================== Relative base ====================

    #[test]
    fn relative_write_past_the_loaded_length() {
        // ARB 2000, then ADD 5+6 into relative address 0 (= 2000).
        let (machine, _) = run_program("109,2000,21101,5,6,0,99", &[]);
        assert_eq!(machine.memory().read(2000).unwrap(), 11);
        assert_eq!(machine.memory().read(1500).unwrap(), 0);
    }

    #[test]
    fn quine_copies_itself_to_output() {
        let source = "109,1,204,-1,1001,100,1,100,1008,100,16,101,1006,101,0,99";
        let program: Program = source.parse().unwrap();
        let (_, outputs) = run_program(source, &[]);
        assert_eq!(outputs, program.cells());
    }

    #[test]
    fn never_written_cells_read_zero_through_output() {
        let (_, outputs) = run_program("4,100,99", &[]);
        assert_eq!(outputs, vec![0]);
    }

    // ==================== Decode and resolution faults ====================

    #[test]
    fn invalid_opcode_aborts_with_its_address() {
        assert!(matches!(
            run_expect_err("1101,1,1,0,77,0,0,0", &[]),
            MachineError::InvalidOpcode { opcode: 77, addr: 4 }
        ));
    }

    #[test]
    fn invalid_mode_digit_aborts() {
        assert!(matches!(
            run_expect_err("302,0,0,0,99", &[]),
            MachineError::InvalidMode { mode: 3, addr: 0 }
        ));
    }

    #[test]
    fn immediate_write_target_aborts() {
        assert!(matches!(
            run_expect_err("11101,1,1,0,99", &[]),
            MachineError::ImmediateWrite { addr: 0 }
        ));
    }

    #[test]
    fn negative_address_aborts() {
        assert!(matches!(
            run_expect_err("4,-1,99", &[]),
            MachineError::NegativeAddress { addr: -1 }
        ));
    }

    // ==================== Configuration ====================

    #[test]
    fn patch_switches_the_operating_mode_before_the_run() {
        let program: Program = "1,0,0,0,99".parse().unwrap();
        let (_in_tx, in_rx) = unbounded();
        let (out_tx, _out_rx) = unbounded();
        let mut machine = Machine::new(&program, in_rx, out_tx);
        machine.patch(0, 2).unwrap();
        machine.run().unwrap();
        assert_eq!(machine.memory().to_string(), "4,0,0,0,99");
    }

    #[test]
    fn step_limit_stops_a_runaway_program() {
        let program: Program = "1105,1,0,99".parse().unwrap();
        let (_in_tx, in_rx) = unbounded();
        let (out_tx, out_rx) = unbounded();
        let mut machine = Machine::new(&program, in_rx, out_tx).with_step_limit(10);
        assert_eq!(machine.run().unwrap(), Outcome::StepLimit);
        // The output channel closed on the way out.
        assert_eq!(out_rx.iter().count(), 0);
    }

    #[test]
    fn step_limit_does_not_fire_before_it_is_reached() {
        let program: Program = "1101,1,1,0,99".parse().unwrap();
        let (_in_tx, in_rx) = unbounded();
        let (out_tx, _out_rx) = unbounded();
        let mut machine = Machine::new(&program, in_rx, out_tx).with_step_limit(100);
        assert_eq!(machine.run().unwrap(), Outcome::Halted);
    }

    // ==================== Pipelines ====================

    #[test]
    fn chained_machines_preserve_end_to_end_ordering() {
        let producer: Program = "104,1,104,2,104,3,104,4,104,5,99".parse().unwrap();
        let echo_five: Program = "3,0,4,0,3,0,4,0,3,0,4,0,3,0,4,0,3,0,4,0,99".parse().unwrap();

        // A's output channel doubles as B's input channel.
        let (_a_in_tx, a_in_rx) = unbounded();
        let (link_tx, link_rx) = bounded(0);
        let (b_out_tx, b_out_rx) = unbounded();

        let a = thread::spawn(move || Machine::new(&producer, a_in_rx, link_tx).run());
        let b = thread::spawn(move || Machine::new(&echo_five, link_rx, b_out_tx).run());

        assert_eq!(a.join().unwrap().unwrap(), Outcome::Halted);
        assert_eq!(b.join().unwrap().unwrap(), Outcome::Halted);
        assert_eq!(b_out_rx.iter().collect::<Vec<_>>(), vec![1, 2, 3, 4, 5]);
    }

    #[test]
    fn gather_outputs_runs_the_whole_handshake() {
        let program: Program = "3,0,4,0,99".parse().unwrap();
        assert_eq!(gather_outputs(&program, &[42]).unwrap(), vec![42]);
    }

    #[test]
    fn gather_outputs_propagates_fatal_errors() {
        let program: Program = "3,0,99".parse().unwrap();
        assert!(matches!(
            gather_outputs(&program, &[]),
            Err(MachineError::InputExhausted { .. })
        ));
    }
}
