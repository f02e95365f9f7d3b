use std::fmt;

use thiserror::Error;
use tracing::debug;

use crate::constants::{Address, Word};

mod instructions;
pub mod io;
mod memory;

pub use self::instructions::{DecodeError, Instruction, Mode, Opcode};
pub use self::memory::{Memory, MemoryError};

use self::io::{Collector, Input, Output, Queue};
use self::memory::word_to_address;

/// Faults raised while executing a program.
///
/// All of them are local to one machine instance; a faulted machine never
/// corrupts or blocks sibling machines.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum RuntimeError {
    /// The word at the program counter does not decode to an instruction
    #[error("decode fault: {0}")]
    Decode(#[from] DecodeError),

    /// A memory access was resolved to an out-of-range index
    #[error("addressing fault: {0}")]
    Memory(#[from] MemoryError),

    /// A read instruction was executed with no available input
    #[error("input exhausted")]
    InputExhausted,

    /// A checked arithmetic operation overflowed the word width
    #[error("arithmetic overflow in {op}: {a}, {b}")]
    Overflow { op: Opcode, a: Word, b: Word },
}

type Result<T> = std::result::Result<T, RuntimeError>;

/// Execution state of a machine.
///
/// `Halted` is terminal and entered only by the halt opcode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    Running,
    Halted,
}

/// The Intcode machine.
///
/// Owns a mutable linear memory, a program counter and the two I/O
/// endpoints. The execution loop repeatedly decodes the instruction at the
/// program counter, applies its side effect and computes the next program
/// counter, until the halt opcode is reached.
pub struct Machine<I = Queue, O = Collector> {
    memory: Memory,
    pc: Address,
    state: State,
    cycles: usize,
    input: I,
    output: O,
}

impl<I, O> fmt::Debug for Machine<I, O> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Machine {{ pc: {}, state: {:?}, cycles: {}, memory: [...] }}",
            self.pc, self.state, self.cycles
        )
    }
}

impl Machine {
    /// Build a machine with an empty input queue and a collecting output.
    pub fn new(memory: impl Into<Memory>) -> Self {
        Self::with_io(memory, Queue::default(), Collector::default())
    }
}

impl<I: Input, O: Output> Machine<I, O> {
    /// Build a machine with explicit I/O endpoints.
    pub fn with_io(memory: impl Into<Memory>, input: I, output: O) -> Self {
        Self {
            memory: memory.into(),
            pc: 0,
            state: State::Running,
            cycles: 0,
            input,
            output,
        }
    }

    /// Override one memory slot before execution.
    ///
    /// # Errors
    ///
    /// It fails if the address is out of bounds.
    pub fn patch(&mut self, address: Address, value: Word) -> std::result::Result<(), MemoryError> {
        *self.memory.get_mut(address)? = value;
        Ok(())
    }

    /// Resolve a read parameter of the instruction at the program counter.
    ///
    /// Positional mode dereferences the operand once, immediate mode uses it
    /// literally.
    fn read_param(&self, instruction: &Instruction, param: usize) -> Result<Word> {
        let operand = self.memory.get(self.pc + 1 + param)?;
        match instruction.mode(param) {
            Mode::Immediate => Ok(operand),
            Mode::Positional => Ok(self.memory.get(word_to_address(operand)?)?),
        }
    }

    /// Resolve a write parameter and store a value through it.
    ///
    /// Write targets are always positional: the operand is the address
    /// written into.
    fn write_param(&mut self, param: usize, value: Word) -> Result<()> {
        let operand = self.memory.get(self.pc + 1 + param)?;
        let dest = word_to_address(operand)?;
        *self.memory.get_mut(dest)? = value;
        Ok(())
    }

    fn read_input(&mut self) -> Result<Word> {
        self.input.read().ok_or(RuntimeError::InputExhausted)
    }

    fn write_output(&mut self, value: Word) {
        self.output.write(value);
    }

    /// Advance the program counter past the current instruction
    fn advance(&mut self, width: usize) {
        self.pc += width;
    }

    /// Set the program counter to an explicit jump target
    fn jump(&mut self, address: Address) {
        debug!("Jumping to address {}", address);
        self.pc = address;
    }

    /// Decode and execute one instruction.
    ///
    /// Returns the state after the step. Stepping a halted machine is a
    /// no-op that reports `Halted` again.
    ///
    /// # Errors
    ///
    /// Surfaces decode faults, addressing faults, input exhaustion and
    /// arithmetic overflow. A fault leaves the machine in its pre-fault
    /// state apart from side effects already applied.
    #[tracing::instrument(skip(self), level = "debug")]
    pub fn step(&mut self) -> Result<State> {
        if self.state == State::Halted {
            return Ok(State::Halted);
        }

        let word = self.memory.get(self.pc)?;
        let instruction = Instruction::decode(word)?;
        debug!(pc = self.pc, "Executing instruction \"{}\"", instruction);

        let state = instruction.execute(self)?;
        self.cycles += 1;
        self.state = state;
        Ok(state)
    }

    /// Execute instructions until the machine halts.
    ///
    /// # Errors
    ///
    /// Stops at the first fault and surfaces it; the machine does not skip
    /// past undecodable instructions.
    #[tracing::instrument(skip(self))]
    pub fn run(&mut self) -> Result<()> {
        while self.step()? == State::Running {}
        Ok(())
    }

    #[must_use]
    pub fn state(&self) -> State {
        self.state
    }

    #[must_use]
    pub fn pc(&self) -> Address {
        self.pc
    }

    /// Number of instructions executed since construction
    #[must_use]
    pub fn cycles(&self) -> usize {
        self.cycles
    }

    #[must_use]
    pub fn memory(&self) -> &Memory {
        &self.memory
    }

    #[must_use]
    pub fn output(&self) -> &O {
        &self.output
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use crate::constants::{NOUN, RESULT, VERB};

    use super::*;

    #[test]
    fn step_test() {
        // Self-referential add: memory[0] = memory[0] + memory[0]
        let mut machine = Machine::new(vec![1, 0, 0, 0, 99]);

        assert_eq!(machine.step(), Ok(State::Running));
        assert_eq!(machine.memory().words(), &[2, 0, 0, 0, 99]);
        assert_eq!(machine.pc(), 4);

        assert_eq!(machine.step(), Ok(State::Halted));
        assert_eq!(machine.memory().words(), &[2, 0, 0, 0, 99]);
        assert_eq!(machine.state(), State::Halted);
    }

    #[test]
    fn step_after_halt_test() {
        let mut machine = Machine::new(vec![99]);
        assert_eq!(machine.step(), Ok(State::Halted));
        let cycles = machine.cycles();

        // Stepping a halted machine is a no-op
        assert_eq!(machine.step(), Ok(State::Halted));
        assert_eq!(machine.cycles(), cycles);
        assert_eq!(machine.pc(), 0);
    }

    #[test]
    fn run_test() {
        let mut machine = Machine::new(vec![1, 9, 10, 3, 2, 3, 11, 0, 99, 30, 40, 50]);
        machine.run().unwrap();
        assert_eq!(
            machine.memory().words(),
            &[3500, 9, 10, 70, 2, 3, 11, 0, 99, 30, 40, 50]
        );
        assert_eq!(machine.cycles(), 3);
    }

    #[test]
    fn immediate_mode_test() {
        // 1002: mul with the second parameter immediate
        let mut machine = Machine::new(vec![1002, 4, 3, 4, 33]);
        machine.run().unwrap();
        assert_eq!(machine.memory().words(), &[1002, 4, 3, 4, 99]);

        // add with modes (imm, pos): memory[5] = 10 + memory[6]
        let mut machine = Machine::new(vec![101, 10, 6, 5, 99, 0, 7]);
        machine.run().unwrap();
        assert_eq!(machine.memory().get(5), Ok(17));
    }

    #[test]
    fn compare_input_test() {
        // Outputs 1 when the input equals 8, 0 otherwise
        let program = vec![3, 9, 8, 9, 10, 9, 4, 9, 99, -1, 8];

        let mut machine = Machine::with_io(
            program.clone(),
            Queue::from(vec![8]),
            Collector::default(),
        );
        machine.run().unwrap();
        assert_eq!(machine.output().values(), &[1]);

        let mut machine =
            Machine::with_io(program, Queue::from(vec![7]), Collector::default());
        machine.run().unwrap();
        assert_eq!(machine.output().values(), &[0]);
    }

    #[test]
    fn jnz_fall_through_test() {
        // jnz with a = 0 falls through to pc + 3
        let mut machine = Machine::new(vec![1105, 0, 0, 99]);
        assert_eq!(machine.step(), Ok(State::Running));
        assert_eq!(machine.pc(), 3);

        // jnz with a != 0 jumps to the immediate target
        let mut machine = Machine::new(vec![1105, 1, 4, 0, 99]);
        assert_eq!(machine.step(), Ok(State::Running));
        assert_eq!(machine.pc(), 4);

        // jnz with a != 0 jumps to the positional target
        let mut machine = Machine::new(vec![5, 3, 4, 1, 6, 0, 99]);
        assert_eq!(machine.step(), Ok(State::Running));
        assert_eq!(machine.pc(), 6);
    }

    #[test]
    fn input_exhausted_test() {
        let mut machine = Machine::new(vec![3, 0, 99]);
        assert_eq!(machine.run(), Err(RuntimeError::InputExhausted));
    }

    #[test]
    fn addressing_fault_test() {
        // The first operand points at address 99, far past the end
        let program = vec![1, 99, 0, 0, 99];
        let mut machine = Machine::new(program.clone());
        assert_eq!(
            machine.run(),
            Err(RuntimeError::Memory(MemoryError::OutOfBounds(99)))
        );
        // The fault happened before any write; memory is not corrupted
        assert_eq!(machine.memory().words(), program.as_slice());

        // A negative word is never a valid address
        let mut machine = Machine::new(vec![1, -3, 0, 0, 99]);
        assert_eq!(
            machine.run(),
            Err(RuntimeError::Memory(MemoryError::NegativeAddress(-3)))
        );
    }

    #[test]
    fn decode_fault_test() {
        // Unknown opcodes stop the machine instead of being skipped
        let mut machine = Machine::new(vec![42, 0, 0]);
        assert_eq!(
            machine.run(),
            Err(RuntimeError::Decode(DecodeError::UnknownOpcode {
                word: 42,
                opcode: 42
            }))
        );
        assert_eq!(machine.state(), State::Running);
        assert_eq!(machine.pc(), 0);
    }

    #[test]
    fn overflow_test() {
        let mut machine = Machine::new(vec![1102, Word::MAX, 2, 0, 99]);
        assert_eq!(
            machine.run(),
            Err(RuntimeError::Overflow {
                op: Opcode::Mul,
                a: Word::MAX,
                b: 2
            })
        );
    }

    #[test]
    fn patch_test() {
        // Day-one convention: patch the noun and verb slots, run, read the
        // result slot back
        let mut machine = Machine::new(vec![1, 0, 0, 0, 99]);
        machine.patch(NOUN, 4).unwrap();
        machine.patch(VERB, 4).unwrap();
        machine.run().unwrap();
        assert_eq!(machine.memory().get(RESULT), Ok(99 + 99));

        let mut machine = Machine::new(vec![99]);
        assert_eq!(machine.patch(3, 0), Err(MemoryError::OutOfBounds(3)));
    }

    #[test]
    fn determinism_test() {
        let program = vec![1, 9, 10, 3, 2, 3, 11, 0, 4, 0, 99, 50];
        let mut first = Machine::new(program.clone());
        let mut second = Machine::new(program);
        first.run().unwrap();
        second.run().unwrap();
        assert_eq!(first.memory(), second.memory());
        assert_eq!(first.output(), second.output());
    }
}
