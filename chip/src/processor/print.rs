//! The pretty print implementation for the [`Processor`](super::Processor), meant for debugging
//! a rom. This implementation was split up into this file for smaller file sizes and higher
//! cohesion.

use super::*;
use crate::{definitions::memory, timer::TimedWorker};
use std::fmt::{self, Write};

/// The length of the pretty print data
/// as a single instruction is u16 the octa
/// size will show how often the block shall
/// be repeated has to be bigger then 0
const HEX_PRINT_STEP: usize = 8;

/// The amount of registers shown in a single line
const REGISTER_PRINT_STEP: usize = 8;

/// The values that are used when there are at least two rows of zeros.
const ZERO_FILLER: &str = "...";

const INDENT_FILLAMENT: char = '\t';

impl<W: TimedWorker> fmt::Display for Processor<W> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "PC: {:#06X} I: {:#06X} OP: {:#06X}",
            self.program_counter, self.index_register, self.opcode
        )?;
        writeln!(
            f,
            "DT: {:#04X} ST: {:#04X}",
            self.delay_timer.value(),
            self.sound_timer.value()
        )?;

        writeln!(f, "Registers:")?;
        for (line, chunk) in self.registers.chunks(REGISTER_PRINT_STEP).enumerate() {
            f.write_char(INDENT_FILLAMENT)?;
            for (i, value) in chunk.iter().enumerate() {
                write!(f, "V{:X}: {:#04X} ", line * REGISTER_PRINT_STEP + i, value)?;
            }
            writeln!(f)?;
        }

        write!(f, "Stack:")?;
        for pointer in self.memory.stack() {
            write!(f, " {:#06X}", pointer)?;
        }
        writeln!(f)?;

        writeln!(f, "Memory:")?;
        memory_print(f, self.memory.data())
    }
}

/// Prints the ram as opcodes, `HEX_PRINT_STEP` per line. Consecutive lines
/// holding nothing but zeros are collapsed into a single filler line.
fn memory_print<T: Write>(f: &mut T, data: &[u8]) -> fmt::Result {
    const LINE: usize = HEX_PRINT_STEP * memory::opcodes::SIZE;

    let mut collapsed = false;
    for (i, chunk) in data.chunks(LINE).enumerate() {
        if chunk.iter().all(|byte| *byte == 0) {
            if !collapsed {
                f.write_char(INDENT_FILLAMENT)?;
                f.write_str(ZERO_FILLER)?;
                f.write_char('\n')?;
                collapsed = true;
            }
            continue;
        }
        collapsed = false;

        let from = i * LINE;
        let to = from + chunk.len() - 1;
        write!(f, "{}{:#06X} - {:#06X} :", INDENT_FILLAMENT, from, to)?;
        for opcode in chunk.chunks(memory::opcodes::SIZE) {
            let high = opcode[0];
            let low = opcode.get(1).copied().unwrap_or(0);
            write!(f, " {:#06X}", u16::from_be_bytes([high, low]))?;
        }
        f.write_char('\n')?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_print_collapses_zeros() {
        let mut data = vec![0u8; 64];
        data[0] = 0x12;
        data[1] = 0x00;
        data[63] = 0xEE;

        let mut text = String::new();
        memory_print(&mut text, &data).unwrap();

        let lines: Vec<_> = text.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("\t0x0000 - 0x000F : 0x1200 0x0000"));
        assert_eq!(lines[1], "\t...");
        assert!(lines[2].starts_with("\t0x0030 - 0x003F :"));
        assert!(lines[2].ends_with("0x00EE"));
    }
}
