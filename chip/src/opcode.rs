//! Opcode abstractions, functionality and constants.
use std::{convert::TryFrom, fmt};

use crate::{definitions::memory, OpcodeError};

/// the base mask used for generating all the other sub masks
pub(crate) const OPCODE_MASK_FFFF: u16 = u16::MAX;

/// the mask for the first twelve bits
pub(crate) const OPCODE_MASK_FFF0: u16 = OPCODE_MASK_FFFF << 4;

/// the mask for the first eight bits
pub(crate) const OPCODE_MASK_FF00: u16 = OPCODE_MASK_FFFF << 8;

/// the mask for the first four bits
pub(crate) const OPCODE_MASK_F000: u16 = OPCODE_MASK_FFFF << 12;

/// the mask for the last four bits
pub(crate) const OPCODE_MASK_000F: u16 = OPCODE_MASK_FFFF ^ OPCODE_MASK_FFF0;

/// the mask for the last eight bits
pub(crate) const OPCODE_MASK_00FF: u16 = OPCODE_MASK_FFFF ^ OPCODE_MASK_FF00;

/// the mask for the last twelve bits
pub(crate) const OPCODE_MASK_0FFF: u16 = OPCODE_MASK_FFFF ^ OPCODE_MASK_F000;

/// the size of a nibble
const NIBBLE: u16 = 4;

/// a wrapper type for u16 to make it clear what is meant to be used
pub type Opcode = u16;

/// These are special traits used to filter out information
/// from opcodes
pub trait OpcodeTrait {
    /// The opcode type, the highest nibble `T` of `TXYN`
    fn t(&self) -> u8;

    /// this is an opcode extractor for the opcode type `TNNN`
    /// - `T` is the opcode type
    /// - `NNN` is an address
    fn nnn(&self) -> u16;

    /// this is an opcode extractor for the opcode type `TXNN`
    /// - `T` is the opcode type
    /// - `X` is a register index
    /// - `NN` is a constant
    fn xnn(&self) -> (usize, u8);

    /// this is an opcode extractor for the opcode type `TXYN`
    /// - `T` is the opcode type
    /// - `X` is a register index
    /// - `Y` is a register index
    /// - `N` is a opcode subtype or constant
    fn xyn(&self) -> (usize, usize, u8);

    /// this is an opcode extractor for the opcode type `TXTT`
    /// - `T` is the opcode type
    /// - `X` is a register index
    fn x(&self) -> usize;
}

impl OpcodeTrait for Opcode {
    /// # Example
    /// ```rust
    /// # use chippy::opcode::*;
    /// const BASE_OPCODE: Opcode = 0x1EDA;
    /// assert_eq!(BASE_OPCODE.t(), 0x1);
    /// ```
    fn t(&self) -> u8 {
        ((self & OPCODE_MASK_F000) >> (3 * NIBBLE)) as u8
    }

    /// # Example
    /// ```rust
    /// # use chippy::opcode::*;
    ///  const BASE_OPCODE: Opcode = 0x1EDA;
    ///  assert_eq!(BASE_OPCODE.nnn(), 0xEDA)
    /// ```
    fn nnn(&self) -> u16 {
        self & OPCODE_MASK_0FFF
    }

    /// # Example
    /// ```rust
    /// # use chippy::opcode::*;
    /// const BASE_OPCODE: Opcode = 0x1EDA;
    /// assert_eq!(BASE_OPCODE.xnn(), (0xE, 0xDA));
    /// ```
    fn xnn(&self) -> (usize, u8) {
        let nn = (self & OPCODE_MASK_00FF) as u8;
        (self.x(), nn)
    }

    /// # Example
    /// ```rust
    /// # use chippy::opcode::*;
    ///  const BASE_OPCODE: Opcode = 0x1EDA;
    ///  assert_eq!(BASE_OPCODE.xyn(), (0xE, 0xD, 0xA));
    /// ```
    fn xyn(&self) -> (usize, usize, u8) {
        const MASK: u16 = OPCODE_MASK_00FF ^ OPCODE_MASK_000F;
        let y = ((self & MASK) >> NIBBLE) as usize;
        let n = (self & OPCODE_MASK_000F) as u8;
        (self.x(), y, n)
    }

    /// # Example
    /// ```rust
    /// # use chippy::opcode::*;
    ///  const BASE_OPCODE: Opcode = 0x1EDA;
    ///  assert_eq!(BASE_OPCODE.x(), 0xE);
    /// ```
    fn x(&self) -> usize {
        ((self & OPCODE_MASK_0FFF & OPCODE_MASK_FF00) >> (2 * NIBBLE)) as usize
    }
}

#[derive(Debug, PartialEq, Clone, Copy)]
/// Represents the program steps that the chip
/// can take after an instruction, the program counter
/// already points to the following instruction at
/// that time.
pub enum ProgramCounterStep {
    /// Continue with the following instruction
    Next,
    /// Will skip the following instruction
    Skip,
    /// Will run the current instruction again
    Repeat,
    /// Will simply move the program counter to the given location.
    Jump(u16),
}

impl ProgramCounterStep {
    /// Will return a Skip if the condition is true.
    ///
    /// # Example
    /// ```rust
    /// # use chippy::opcode::ProgramCounterStep;
    /// assert_eq!(ProgramCounterStep::Next, ProgramCounterStep::cond(false));
    /// assert_eq!(ProgramCounterStep::Skip, ProgramCounterStep::cond(true));
    /// ```
    #[inline]
    pub fn cond(cond: bool) -> Self {
        if cond {
            ProgramCounterStep::Skip
        } else {
            ProgramCounterStep::Next
        }
    }

    /// Where the program counter ends up when it currently is at `pointer`.
    ///
    /// # Example
    /// ```rust
    /// # use chippy::opcode::ProgramCounterStep;
    /// assert_eq!(ProgramCounterStep::Next.apply(0x202), 0x202);
    /// assert_eq!(ProgramCounterStep::Skip.apply(0x202), 0x204);
    /// assert_eq!(ProgramCounterStep::Repeat.apply(0x202), 0x200);
    /// assert_eq!(ProgramCounterStep::Jump(0x300).apply(0x202), 0x300);
    /// ```
    #[inline]
    pub fn apply(&self, pointer: u16) -> u16 {
        const SIZE: u16 = memory::opcodes::SIZE as u16;
        match *self {
            ProgramCounterStep::Next => pointer,
            ProgramCounterStep::Skip => pointer.wrapping_add(SIZE),
            ProgramCounterStep::Repeat => pointer.wrapping_sub(SIZE),
            ProgramCounterStep::Jump(target) => target,
        }
    }
}

/// Represents a step of the program counter
/// this requires the enum ProgramCounterStep
/// to work.
pub trait ProgramCounter {
    /// will move the program counter by a step.
    fn step(&mut self, step: ProgramCounterStep);
}

#[derive(Debug, PartialEq, Clone, Copy)]
/// Represents a command from the interpreter up to the host.
pub enum Operation {
    /// If no action has to be taken.
    None,
    /// The host shall pump its input and run the cycle again,
    /// the processor is waiting for a key press.
    Wait,
    /// The display changed and should be redrawn
    Draw,
}

/// The `8XYN` register to register operations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArithmeticOp {
    /// `8XY0` - `Vx = Vy`
    Assign,
    /// `8XY1` - `Vx |= Vy`
    Or,
    /// `8XY2` - `Vx &= Vy`
    And,
    /// `8XY3` - `Vx ^= Vy`
    Xor,
    /// `8XY4` - `Vx += Vy`, `VF` is the carry
    Add,
    /// `8XY5` - `Vx -= Vy`, `VF` is the "no borrow"
    Sub,
    /// `8XY6` - `Vx = Vy >> 1`
    ShiftRight,
    /// `8XY7` - `Vx = Vy - Vx`, `VF` is the "no borrow"
    SubN,
    /// `8XYE` - `Vx = Vy << 1`
    ShiftLeft,
}

/// A decoded instruction, the operands are already extracted from the opcode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Instruction {
    /// `0NNN` - Calls machine code routine ([RCA 1802](https://en.wikipedia.org/wiki/RCA_1802) for COSMAC VIP) at address `NNN`. Ignored.
    Sys { nnn: u16 },
    /// `00E0` - Clears the screen.
    Clear,
    /// `00EE` - Returns from a subroutine.
    Return,
    /// `1NNN` - Jumps to address `NNN`.
    Jump { nnn: u16 },
    /// `2NNN` - Calls subroutine at `NNN`.
    Call { nnn: u16 },
    /// `3XNN` - Skips the next instruction if `VX` equals `NN`.
    SkipEqual { x: usize, nn: u8 },
    /// `4XNN` - Skips the next instruction if `VX` doesn't equal `NN`.
    SkipNotEqual { x: usize, nn: u8 },
    /// `5XY0` - Skips the next instruction if `VX` equals `VY`.
    SkipEqualRegister { x: usize, y: usize },
    /// `6XNN` - Sets `VX` to `NN`.
    Load { x: usize, nn: u8 },
    /// `7XNN` - Adds `NN` to `VX`. (Carry flag is not changed)
    Add { x: usize, nn: u8 },
    /// `8XYN` - register to register arithmetic
    Arithmetic { op: ArithmeticOp, x: usize, y: usize },
    /// `9XY0` - Skips the next instruction if `VX` doesn't equal `VY`.
    SkipNotEqualRegister { x: usize, y: usize },
    /// `ANNN` - Sets `I` to the address `NNN`.
    LoadIndex { nnn: u16 },
    /// `BNNN` - Jumps to the address `NNN` plus `V0`.
    JumpOffset { nnn: u16 },
    /// `CXNN` - Sets `VX` to a random number masked by `NN`.
    Random { x: usize, nn: u8 },
    /// `DXYN` - Draws an `N` rows high sprite from `I` at `(VX, VY)`.
    Draw { x: usize, y: usize, n: u8 },
    /// `EX9E` - Skips the next instruction if the key stored in `VX` is pressed.
    SkipKeyPressed { x: usize },
    /// `EXA1` - Skips the next instruction if the key stored in `VX` isn't pressed.
    SkipKeyNotPressed { x: usize },
    /// `FX07` - Sets `VX` to the value of the delay timer.
    GetDelayTimer { x: usize },
    /// `FX0A` - A key press is awaited, and then stored in `VX`.
    AwaitKeyPress { x: usize },
    /// `FX15` - Sets the delay timer to `VX`.
    SetDelayTimer { x: usize },
    /// `FX18` - Sets the sound timer to `VX`.
    SetSoundTimer { x: usize },
    /// `FX1E` - Adds `VX` to `I`. `VF` is not affected.
    AddVxToI { x: usize },
    /// `FX29` - Sets `I` to the location of the font sprite for the character in `VX`.
    SetIToSprite { x: usize },
    /// `FX33` - Stores the binary-coded decimal representation of `VX` at `I`, `I+1` and `I+2`.
    StoreBcd { x: usize },
    /// `FX55` - Stores `V0` to `VX` (including `VX`) in memory starting at address `I`.
    StoreV0ToVx { x: usize },
    /// `FX65` - Fills `V0` to `VX` (including `VX`) with values from memory starting at address `I`.
    FillV0ToVx { x: usize },
}

impl TryFrom<Opcode> for Instruction {
    type Error = OpcodeError;

    /// The complete decode table, the outer match is over the highest
    /// nibble so it compiles down to a lookup table.
    fn try_from(opcode: Opcode) -> Result<Self, Self::Error> {
        let (x, y, n) = opcode.xyn();
        let (_, nn) = opcode.xnn();
        let nnn = opcode.nnn();

        let instruction = match opcode.t() {
            0x0 => match opcode {
                0x00E0 => Instruction::Clear,
                0x00EE => Instruction::Return,
                _ => Instruction::Sys { nnn },
            },
            0x1 => Instruction::Jump { nnn },
            0x2 => Instruction::Call { nnn },
            0x3 => Instruction::SkipEqual { x, nn },
            0x4 => Instruction::SkipNotEqual { x, nn },
            0x5 if n == 0 => Instruction::SkipEqualRegister { x, y },
            0x6 => Instruction::Load { x, nn },
            0x7 => Instruction::Add { x, nn },
            0x8 => {
                let op = match n {
                    0x0 => ArithmeticOp::Assign,
                    0x1 => ArithmeticOp::Or,
                    0x2 => ArithmeticOp::And,
                    0x3 => ArithmeticOp::Xor,
                    0x4 => ArithmeticOp::Add,
                    0x5 => ArithmeticOp::Sub,
                    0x6 => ArithmeticOp::ShiftRight,
                    0x7 => ArithmeticOp::SubN,
                    0xE => ArithmeticOp::ShiftLeft,
                    _ => return Err(OpcodeError::InvalidOpcode(opcode)),
                };
                Instruction::Arithmetic { op, x, y }
            }
            0x9 if n == 0 => Instruction::SkipNotEqualRegister { x, y },
            0xA => Instruction::LoadIndex { nnn },
            0xB => Instruction::JumpOffset { nnn },
            0xC => Instruction::Random { x, nn },
            0xD => Instruction::Draw { x, y, n },
            0xE => match nn {
                0x9E => Instruction::SkipKeyPressed { x },
                0xA1 => Instruction::SkipKeyNotPressed { x },
                _ => return Err(OpcodeError::InvalidOpcode(opcode)),
            },
            0xF => match nn {
                0x07 => Instruction::GetDelayTimer { x },
                0x0A => Instruction::AwaitKeyPress { x },
                0x15 => Instruction::SetDelayTimer { x },
                0x18 => Instruction::SetSoundTimer { x },
                0x1E => Instruction::AddVxToI { x },
                0x29 => Instruction::SetIToSprite { x },
                0x33 => Instruction::StoreBcd { x },
                0x55 => Instruction::StoreV0ToVx { x },
                0x65 => Instruction::FillV0ToVx { x },
                _ => return Err(OpcodeError::InvalidOpcode(opcode)),
            },
            _ => return Err(OpcodeError::InvalidOpcode(opcode)),
        };
        Ok(instruction)
    }
}

impl fmt::Display for Instruction {
    /// Disassembles the instruction into the classic mnemonics.
    ///
    /// # Example
    /// ```rust
    /// # use chippy::opcode::*;
    /// # use std::convert::TryFrom;
    /// let instruction = Instruction::try_from(0x8125u16).unwrap();
    /// assert_eq!(instruction.to_string(), "SUB V1, V2");
    /// ```
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Instruction::Sys { nnn } => write!(f, "SYS {:#05X}", nnn),
            Instruction::Clear => write!(f, "CLS"),
            Instruction::Return => write!(f, "RET"),
            Instruction::Jump { nnn } => write!(f, "JP {:#05X}", nnn),
            Instruction::Call { nnn } => write!(f, "CALL {:#05X}", nnn),
            Instruction::SkipEqual { x, nn } => write!(f, "SE V{:X}, {:#04X}", x, nn),
            Instruction::SkipNotEqual { x, nn } => write!(f, "SNE V{:X}, {:#04X}", x, nn),
            Instruction::SkipEqualRegister { x, y } => write!(f, "SE V{:X}, V{:X}", x, y),
            Instruction::Load { x, nn } => write!(f, "LD V{:X}, {:#04X}", x, nn),
            Instruction::Add { x, nn } => write!(f, "ADD V{:X}, {:#04X}", x, nn),
            Instruction::Arithmetic { op, x, y } => {
                let name = match op {
                    ArithmeticOp::Assign => "LD",
                    ArithmeticOp::Or => "OR",
                    ArithmeticOp::And => "AND",
                    ArithmeticOp::Xor => "XOR",
                    ArithmeticOp::Add => "ADD",
                    ArithmeticOp::Sub => "SUB",
                    ArithmeticOp::ShiftRight => "SHR",
                    ArithmeticOp::SubN => "SUBN",
                    ArithmeticOp::ShiftLeft => "SHL",
                };
                write!(f, "{} V{:X}, V{:X}", name, x, y)
            }
            Instruction::SkipNotEqualRegister { x, y } => write!(f, "SNE V{:X}, V{:X}", x, y),
            Instruction::LoadIndex { nnn } => write!(f, "LD I, {:#05X}", nnn),
            Instruction::JumpOffset { nnn } => write!(f, "JP V0, {:#05X}", nnn),
            Instruction::Random { x, nn } => write!(f, "RND V{:X}, {:#04X}", x, nn),
            Instruction::Draw { x, y, n } => write!(f, "DRW V{:X}, V{:X}, {}", x, y, n),
            Instruction::SkipKeyPressed { x } => write!(f, "SKP V{:X}", x),
            Instruction::SkipKeyNotPressed { x } => write!(f, "SKNP V{:X}", x),
            Instruction::GetDelayTimer { x } => write!(f, "LD V{:X}, DT", x),
            Instruction::AwaitKeyPress { x } => write!(f, "LD V{:X}, K", x),
            Instruction::SetDelayTimer { x } => write!(f, "LD DT, V{:X}", x),
            Instruction::SetSoundTimer { x } => write!(f, "LD ST, V{:X}", x),
            Instruction::AddVxToI { x } => write!(f, "ADD I, V{:X}", x),
            Instruction::SetIToSprite { x } => write!(f, "LD F, V{:X}", x),
            Instruction::StoreBcd { x } => write!(f, "LD B, V{:X}", x),
            Instruction::StoreV0ToVx { x } => write!(f, "LD [I], V{:X}", x),
            Instruction::FillV0ToVx { x } => write!(f, "LD V{:X}, [I]", x),
        }
    }
}
