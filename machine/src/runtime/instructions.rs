use std::fmt;

use parse_display::Display;
use tracing::debug;

use crate::constants::Word;

use super::io::{Input, Output};
use super::memory::word_to_address;
use super::{Machine, RuntimeError, State};

/// Failure to decode the word at the program counter.
#[derive(Debug, thiserror::Error, Clone, Copy, PartialEq, Eq)]
pub enum DecodeError {
    #[error("unknown opcode {opcode} in word {word}")]
    UnknownOpcode { word: Word, opcode: Word },

    #[error("unknown addressing mode digit {digit} in word {word}")]
    UnknownMode { word: Word, digit: Word },
}

/// Addressing mode of a single parameter.
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// The operand is an address, dereferenced once
    #[display("pos")]
    Positional,

    /// The operand is used literally
    #[display("imm")]
    Immediate,
}

#[derive(Debug, Display, Clone, Copy, PartialEq, Eq)]
pub enum Opcode {
    /// `memory[dest] = a + b`
    #[display("add")]
    Add,

    /// `memory[dest] = a * b`
    #[display("mul")]
    Mul,

    /// `memory[dest] =` next input value
    #[display("read")]
    Read,

    /// Emit a value to the output
    #[display("write")]
    Write,

    /// Jump to the target if the operand is non-zero
    #[display("jnz")]
    Jnz,

    /// Jump to the target if the operand is zero
    #[display("jz")]
    Jz,

    /// `memory[dest] = (a < b) ? 1 : 0`
    #[display("lt")]
    Lt,

    /// `memory[dest] = (a == b) ? 1 : 0`
    #[display("cmp")]
    Cmp,

    /// Stop the machine
    #[display("halt")]
    Halt,
}

impl Opcode {
    /// Number of parameters the opcode consumes
    #[must_use]
    pub const fn params(self) -> usize {
        match self {
            Opcode::Add | Opcode::Mul | Opcode::Lt | Opcode::Cmp => 3,
            Opcode::Jnz | Opcode::Jz => 2,
            Opcode::Read | Opcode::Write => 1,
            Opcode::Halt => 0,
        }
    }

    /// Width of the whole instruction, opcode word included
    #[must_use]
    pub const fn width(self) -> usize {
        1 + self.params()
    }
}

/// A decoded instruction: the opcode plus its parameter mode vector.
///
/// Derived on the fly from the word at the program counter; instructions are
/// never stored in memory in decoded form. The mode vector is computed once
/// at decode time and reused by the operand resolver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Instruction {
    pub opcode: Opcode,
    modes: [Mode; 3],
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.opcode)?;
        for (i, mode) in self.modes.iter().take(self.opcode.params()).enumerate() {
            let sep = if i == 0 { ' ' } else { ',' };
            write!(f, "{sep}{mode}")?;
        }
        Ok(())
    }
}

impl Instruction {
    /// Split a word into an opcode and its addressing-mode digits.
    ///
    /// The opcode is `word mod 100`; mode digit *i* (0-indexed) is
    /// `(word / 10^(i+2)) mod 10`. Digits beyond the opcode's parameter
    /// count are ignored.
    ///
    /// # Errors
    ///
    /// It fails on an unknown opcode or an addressing-mode digit other than
    /// 0 or 1.
    pub fn decode(word: Word) -> Result<Self, DecodeError> {
        let opcode = match word % 100 {
            1 => Opcode::Add,
            2 => Opcode::Mul,
            3 => Opcode::Read,
            4 => Opcode::Write,
            5 => Opcode::Jnz,
            6 => Opcode::Jz,
            7 => Opcode::Lt,
            8 => Opcode::Cmp,
            99 => Opcode::Halt,
            opcode => return Err(DecodeError::UnknownOpcode { word, opcode }),
        };

        let mut digits = word / 100;
        let mut modes = [Mode::Positional; 3];
        for mode in modes.iter_mut().take(opcode.params()) {
            *mode = match digits % 10 {
                0 => Mode::Positional,
                1 => Mode::Immediate,
                digit => return Err(DecodeError::UnknownMode { word, digit }),
            };
            digits /= 10;
        }

        Ok(Self { opcode, modes })
    }

    /// Addressing mode of the given parameter slot
    pub(crate) fn mode(&self, param: usize) -> Mode {
        self.modes[param]
    }

    /// Execute the instruction
    ///
    /// Returns the machine state after the side effect: `Halted` for the
    /// halt opcode, `Running` for everything else. The program counter is
    /// advanced by the instruction width, or set to the resolved target for
    /// taken jumps.
    #[tracing::instrument(skip(machine), level = "debug")]
    pub(crate) fn execute<I: Input, O: Output>(
        &self,
        machine: &mut Machine<I, O>,
    ) -> Result<State, RuntimeError> {
        match self.opcode {
            Opcode::Add => {
                let a = machine.read_param(self, 0)?;
                let b = machine.read_param(self, 1)?;
                let res = a
                    .checked_add(b)
                    .ok_or(RuntimeError::Overflow { op: self.opcode, a, b })?;
                debug!("{} + {} = {}", a, b, res);
                machine.write_param(2, res)?;
                machine.advance(self.opcode.width());
            }

            Opcode::Mul => {
                let a = machine.read_param(self, 0)?;
                let b = machine.read_param(self, 1)?;
                let res = a
                    .checked_mul(b)
                    .ok_or(RuntimeError::Overflow { op: self.opcode, a, b })?;
                debug!("{} * {} = {}", a, b, res);
                machine.write_param(2, res)?;
                machine.advance(self.opcode.width());
            }

            Opcode::Read => {
                let value = machine.read_input()?;
                debug!("read => {}", value);
                machine.write_param(0, value)?;
                machine.advance(self.opcode.width());
            }

            Opcode::Write => {
                let value = machine.read_param(self, 0)?;
                debug!("write({})", value);
                machine.write_output(value);
                machine.advance(self.opcode.width());
            }

            Opcode::Jnz => {
                let a = machine.read_param(self, 0)?;
                let target = machine.read_param(self, 1)?;
                if a == 0 {
                    machine.advance(self.opcode.width());
                } else {
                    machine.jump(word_to_address(target)?);
                }
            }

            Opcode::Jz => {
                let a = machine.read_param(self, 0)?;
                let target = machine.read_param(self, 1)?;
                if a == 0 {
                    machine.jump(word_to_address(target)?);
                } else {
                    machine.advance(self.opcode.width());
                }
            }

            Opcode::Lt => {
                let a = machine.read_param(self, 0)?;
                let b = machine.read_param(self, 1)?;
                let res = Word::from(a < b);
                debug!("({} < {}) = {}", a, b, res);
                machine.write_param(2, res)?;
                machine.advance(self.opcode.width());
            }

            Opcode::Cmp => {
                let a = machine.read_param(self, 0)?;
                let b = machine.read_param(self, 1)?;
                let res = Word::from(a == b);
                debug!("({} == {}) = {}", a, b, res);
                machine.write_param(2, res)?;
                machine.advance(self.opcode.width());
            }

            // The program counter is left untouched; the Halted state is the
            // sole terminal condition.
            Opcode::Halt => return Ok(State::Halted),
        }

        Ok(State::Running)
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn decode_test() {
        let inst = Instruction::decode(1).unwrap();
        assert_eq!(inst.opcode, Opcode::Add);
        assert_eq!(inst.modes, [Mode::Positional; 3]);

        // 1002 = mul, first parameter positional, second immediate
        let inst = Instruction::decode(1002).unwrap();
        assert_eq!(inst.opcode, Opcode::Mul);
        assert_eq!(
            inst.modes,
            [Mode::Positional, Mode::Immediate, Mode::Positional]
        );

        // 101 = add, first parameter immediate
        let inst = Instruction::decode(101).unwrap();
        assert_eq!(inst.opcode, Opcode::Add);
        assert_eq!(
            inst.modes,
            [Mode::Immediate, Mode::Positional, Mode::Positional]
        );

        assert_eq!(Instruction::decode(99).unwrap().opcode, Opcode::Halt);
    }

    #[test]
    fn decode_failure_test() {
        assert_eq!(
            Instruction::decode(42),
            Err(DecodeError::UnknownOpcode {
                word: 42,
                opcode: 42
            })
        );
        assert_eq!(
            Instruction::decode(0),
            Err(DecodeError::UnknownOpcode { word: 0, opcode: 0 })
        );
        assert_eq!(
            Instruction::decode(-1),
            Err(DecodeError::UnknownOpcode {
                word: -1,
                opcode: -1
            })
        );
        // Mode digit 3 on the first parameter of an add
        assert_eq!(
            Instruction::decode(301),
            Err(DecodeError::UnknownMode { word: 301, digit: 3 })
        );
    }

    #[test]
    fn decode_ignores_unused_digits_test() {
        // halt takes no parameters; leading digits are simply unused
        let inst = Instruction::decode(1199).unwrap();
        assert_eq!(inst.opcode, Opcode::Halt);

        // write takes one parameter; the second digit is not consumed
        let inst = Instruction::decode(104).unwrap();
        assert_eq!(inst.opcode, Opcode::Write);
        assert_eq!(inst.mode(0), Mode::Immediate);
    }

    #[test]
    fn width_test() {
        assert_eq!(Opcode::Add.width(), 4);
        assert_eq!(Opcode::Jnz.width(), 3);
        assert_eq!(Opcode::Read.width(), 2);
        assert_eq!(Opcode::Halt.width(), 1);
    }

    #[test]
    fn display_test() {
        assert_eq!(
            Instruction::decode(1002).unwrap().to_string(),
            "mul pos,imm,pos"
        );
        assert_eq!(Instruction::decode(99).unwrap().to_string(), "halt");
        assert_eq!(Instruction::decode(104).unwrap().to_string(), "write imm");
    }
}
