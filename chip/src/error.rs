use thiserror::Error;

use crate::opcode::Opcode;

/// Every way a single processor cycle can fail. All of them are terminal
/// for the running program.
#[derive(Error, Debug, PartialEq, Clone)]
pub enum ProcessError {
    #[error("Invalid opcode state '{0}'.")]
    Opcode(#[from] OpcodeError),
    #[error("Invalid stack state '{0}'.")]
    Stack(#[from] StackError),
    #[error("Invalid memory access '{0}'.")]
    Memory(#[from] MemoryError),
    #[error("Invalid display access '{0}'.")]
    Display(#[from] DisplayError),
}

#[derive(Error, Debug, PartialEq, Clone, Copy)]
pub enum OpcodeError {
    #[error("An unsupported opcode was used {0:#06X?}.")]
    InvalidOpcode(Opcode),
}

#[derive(Error, Debug, PartialEq, Clone, Copy)]
pub enum StackError {
    #[error("Stack is empty!")]
    Empty,
}

#[derive(Error, Debug, PartialEq, Clone, Copy)]
pub enum MemoryError {
    #[error("Address {address:#06X} is out of bounds, the memory is {len} bytes long")]
    OutOfBounds { address: usize, len: usize },
    #[error("A rom of {len} bytes does not fit at offset {offset:#06X} into {capacity} bytes")]
    RomTooLarge {
        offset: usize,
        len: usize,
        capacity: usize,
    },
}

#[derive(Error, Debug, PartialEq, Clone, Copy)]
pub enum DisplayError {
    #[error("Pixel {index} is out of bounds, the display has {len} pixels")]
    OutOfBounds { index: usize, len: usize },
}
