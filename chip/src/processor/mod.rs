//! The full implementation of the chip8 processor, from the fetch decode
//! execute cycle to an option to pretty print its state.
mod chipset;
mod opcodes;
mod print;

/// reexport chipset structs and data for simpler usage
pub use chipset::*;
