//! The ram and the call stack of the chip.
use tinyvec::TinyVec;

use crate::{
    definitions::{cpu, display::fontset, memory},
    MemoryError, StackError,
};

/// - `0x000-0x1FF` - Chip 8 interpreter (contains font set in emu)
/// - `0x000-0x050` - Used for the built in `4x5` pixel font set (`0-F`)
/// - `0x200-0xFFF` - Program ROM and work RAM
///
/// The stack is only used to store return addresses when subroutines are called. The original
/// [RCA 1802](https://de.wikipedia.org/wiki/RCA1802) version allocated `48` bytes for up to
/// `12` levels of nesting, here the first `16` levels live inline and deeper nesting spills
/// onto the heap.
#[derive(Debug, Clone)]
pub struct Memory {
    data: Vec<u8>,
    stack: TinyVec<[u16; cpu::stack::INLINE]>,
}

impl Default for Memory {
    fn default() -> Self {
        Self::new()
    }
}

impl Memory {
    pub fn new() -> Self {
        Self {
            data: vec![0; memory::SIZE],
            stack: TinyVec::new(),
        }
    }

    /// The amount of bytes addressable
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn read(&self, address: usize) -> Result<u8, MemoryError> {
        self.data
            .get(address)
            .copied()
            .ok_or(MemoryError::OutOfBounds {
                address,
                len: self.data.len(),
            })
    }

    pub fn write(&mut self, address: usize, value: u8) -> Result<(), MemoryError> {
        let len = self.data.len();
        let cell = self
            .data
            .get_mut(address)
            .ok_or(MemoryError::OutOfBounds { address, len })?;
        *cell = value;
        Ok(())
    }

    /// Will push the return address onto the stack
    pub fn push_stack(&mut self, pointer: u16) {
        self.stack.push(pointer);
    }

    /// Will pop the last return address, an empty stack means the
    /// rom returned from a subroutine it never called.
    pub fn pop_stack(&mut self) -> Result<u16, StackError> {
        self.stack.pop().ok_or(StackError::Empty)
    }

    /// The return addresses, the last entry is the top of the stack
    pub fn stack(&self) -> &[u16] {
        &self.stack[..]
    }

    /// Will copy the rom verbatim into memory starting at `offset`.
    pub fn load_rom(&mut self, rom: &[u8], offset: usize) -> Result<(), MemoryError> {
        let capacity = self.data.len();
        let end = offset
            .checked_add(rom.len())
            .filter(|end| *end <= capacity)
            .ok_or(MemoryError::RomTooLarge {
                offset,
                len: rom.len(),
                capacity,
            })?;
        self.data[offset..end].copy_from_slice(rom);
        log::debug!("loaded {} bytes at {:#06X}", rom.len(), offset);
        Ok(())
    }

    /// Writes the hexadecimal font into the reserved interpreter area.
    pub fn load_fontset(&mut self) {
        let end = fontset::LOCATION + fontset::FONTSET.len();
        self.data[fontset::LOCATION..end].copy_from_slice(&fontset::FONTSET);
    }

    /// Zero fills the ram and empties the stack.
    pub fn clear(&mut self) {
        self.data.iter_mut().for_each(|cell| *cell = 0);
        self.stack.clear();
    }

    /// Read only view over the whole ram.
    pub fn data(&self) -> &[u8] {
        &self.data[..]
    }
}
